use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Role carried by a single client or workspace grant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Designer,
    Writer,
    Observer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Designer, Role::Writer, Role::Observer];

    /// Parse a stored role. Unknown values are `None` (treated as "no role").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "designer" => Some(Role::Designer),
            "writer" => Some(Role::Writer),
            "observer" => Some(Role::Observer),
            _ => None,
        }
    }

    /// Lowercase string for database / cookie storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Designer => "designer",
            Role::Writer => "writer",
            Role::Observer => "observer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role a session runs under.
///
/// `Unrestricted` is the marker given to super-admins whose default
/// selection does not resolve to a role. On the wire and in cookies it is
/// the string `"unrestricted"`; scoped roles use their own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ActiveRole {
    Unrestricted,
    Scoped(Role),
}

impl ActiveRole {
    pub const UNRESTRICTED: &'static str = "unrestricted";

    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveRole::Unrestricted => Self::UNRESTRICTED,
            ActiveRole::Scoped(role) => role.as_str(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s == Self::UNRESTRICTED {
            return Some(ActiveRole::Unrestricted);
        }
        Role::parse(s).map(ActiveRole::Scoped)
    }
}

impl fmt::Display for ActiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ActiveRole> for String {
    fn from(role: ActiveRole) -> Self {
        role.as_str().to_string()
    }
}

impl TryFrom<String> for ActiveRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ActiveRole::parse(&value).ok_or_else(|| format!("unknown role: {value}"))
    }
}

/// A group of dashboard pages gated together by the route guard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RouteGroup {
    Kit,
    AiWriting,
    Risk,
    AbTesting,
    SyntheticUsers,
    Strategy,
    Observer,
    Settings,
}

// ---------------------------------------------------------------------------
// Session DTOs
// ---------------------------------------------------------------------------

/// Profile fields of the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionUser {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub super_admin: bool,
}

/// A workspace the user holds an explicit grant for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AccessibleWorkspace {
    pub id: Uuid,
    pub name: String,
    pub role: Option<Role>,
}

/// A client the user holds a grant for, with the granted workspaces under it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AccessibleClient {
    pub id: Uuid,
    pub name: String,
    pub role: Option<Role>,
    pub workspaces: Vec<AccessibleWorkspace>,
}

/// Response of `GET /api/session`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionPayload {
    pub user: SessionUser,
    /// `"unrestricted"`, a role name, or null when no role applies.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, example = "designer"))]
    pub role: Option<ActiveRole>,
    pub has_access: bool,
    pub accessible_clients: Vec<AccessibleClient>,
    pub default_client_id: Option<Uuid>,
    pub default_workspace_id: Option<Uuid>,
}

/// Body of `PUT /api/session/defaults`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SetDefaultsRequest {
    pub client_id: Uuid,
    #[serde(default)]
    pub workspace_id: Option<Uuid>,
}

/// The stored default client/workspace pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionDefaults {
    pub client_id: Option<Uuid>,
    pub workspace_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Grant administration DTOs
// ---------------------------------------------------------------------------

/// Body of `PUT /api/admin/access/clients`. A null role keeps the
/// membership but grants no role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SetClientAccessRequest {
    pub user_id: i64,
    pub client_id: Uuid,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Body of `PUT /api/admin/access/workspaces`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SetWorkspaceAccessRequest {
    pub user_id: i64,
    pub workspace_id: Uuid,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClientAccessEntry {
    pub client_id: Uuid,
    pub client_name: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WorkspaceAccessEntry {
    pub workspace_id: Uuid,
    pub client_id: Uuid,
    pub workspace_name: String,
    pub role: Option<Role>,
}

/// Raw grants of one user, as seen by a super-admin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserAccessResponse {
    pub user: SessionUser,
    pub clients: Vec<ClientAccessEntry>,
    pub workspaces: Vec<WorkspaceAccessEntry>,
    pub defaults: SessionDefaults,
}
