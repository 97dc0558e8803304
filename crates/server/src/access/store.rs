use std::future::Future;

use shared_types::{AppError, Role, SessionDefaults};
use uuid::Uuid;

/// A user row, without grants.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub super_admin: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientRecord {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
}

/// One `client_access` row joined with its client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientGrant {
    pub client_id: Uuid,
    pub client_name: String,
    /// `None` when the stored role is NULL or not a known role.
    pub role: Option<Role>,
}

/// One `workspace_access` row joined with its workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceGrant {
    pub workspace_id: Uuid,
    pub client_id: Uuid,
    pub workspace_name: String,
    pub role: Option<Role>,
}

/// A stored default as seen on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultRef {
    #[default]
    Unset,
    Live(Uuid),
    /// The stored id points at a client/workspace that no longer exists.
    Dangling(Uuid),
}

impl DefaultRef {
    /// Build from a stored id and whether the referenced row still exists.
    pub fn from_lookup(id: Option<Uuid>, exists: bool) -> Self {
        match id {
            None => DefaultRef::Unset,
            Some(id) if exists => DefaultRef::Live(id),
            Some(id) => DefaultRef::Dangling(id),
        }
    }

    /// The id, if it still references a live row.
    pub fn live(&self) -> Option<Uuid> {
        match self {
            DefaultRef::Live(id) => Some(*id),
            DefaultRef::Unset | DefaultRef::Dangling(_) => None,
        }
    }
}

/// Everything the session needs about one user, read together.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessSnapshot {
    pub user: UserRecord,
    pub clients: Vec<ClientGrant>,
    pub workspaces: Vec<WorkspaceGrant>,
    pub default_client: DefaultRef,
    pub default_workspace: DefaultRef,
}

/// Persistence operations the access core depends on.
///
/// Methods return `Send` futures so that axum handlers generic over the
/// store stay `Send`.
pub trait AccessStore: Send + Sync + 'static {
    /// Load the user, every grant, and the stored defaults in one read.
    /// Returns `Ok(None)` when the user does not exist.
    fn load_snapshot(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<AccessSnapshot>, AppError>> + Send;

    fn find_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<UserRecord>, AppError>> + Send;

    fn find_client(
        &self,
        client_id: Uuid,
    ) -> impl Future<Output = Result<Option<ClientRecord>, AppError>> + Send;

    fn find_workspace(
        &self,
        workspace_id: Uuid,
    ) -> impl Future<Output = Result<Option<WorkspaceRecord>, AppError>> + Send;

    /// True if a `client_access` row exists, whatever its role.
    fn has_client_access(
        &self,
        user_id: i64,
        client_id: Uuid,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// True if a `workspace_access` row exists, whatever its role.
    fn has_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Atomically replace both default columns for the user.
    fn upsert_defaults(
        &self,
        user_id: i64,
        defaults: SessionDefaults,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn clear_defaults(&self, user_id: i64) -> impl Future<Output = Result<(), AppError>> + Send;

    fn set_client_access(
        &self,
        user_id: i64,
        client_id: Uuid,
        role: Option<Role>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Returns false when there was no grant to remove.
    fn remove_client_access(
        &self,
        user_id: i64,
        client_id: Uuid,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn set_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
        role: Option<Role>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn remove_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Cheap connectivity probe for the health check.
    fn ping(&self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Parse a stored role column. NULL and unknown values both mean "no role".
pub fn parse_stored_role(raw: Option<&str>) -> Option<Role> {
    let raw = raw?;
    let role = Role::parse(raw);
    if role.is_none() {
        tracing::warn!(role = raw, "Ignoring unknown stored role");
    }
    role
}
