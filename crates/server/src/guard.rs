//! Request-time gate in front of the dashboard pages.
//!
//! The guard never resolves roles itself: it trusts the verified access
//! token for identity and the signed role cookie written by the session
//! endpoint for the active role.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use shared_types::{ActiveRole, GuardConfig, Role, RouteGroup};

use crate::auth::cookies::{self, RoleCookie};
use crate::auth::jwt::Claims;

/// Pages reachable without a credential or role.
pub const PUBLIC_PATHS: [&str; 2] = ["/login", "/forbidden"];

/// Why a navigation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// Authenticated, but no role cookie and not a super-admin.
    NoRole,
    InsufficientPermissions,
}

impl ForbiddenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForbiddenReason::NoRole => "no-role",
            ForbiddenReason::InsufficientPermissions => "insufficient-permissions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectLogin {
        next: String,
    },
    Forbidden {
        reason: ForbiddenReason,
        route: String,
        role: Option<ActiveRole>,
    },
}

impl GuardDecision {
    /// Where to send the browser, or `None` to let the request through.
    pub fn redirect_target(&self) -> Option<String> {
        match self {
            GuardDecision::Allow => None,
            GuardDecision::RedirectLogin { next } => {
                Some(format!("/login?next={}", urlencoding::encode(next)))
            }
            GuardDecision::Forbidden {
                reason,
                route,
                role,
            } => {
                let mut target = format!(
                    "/forbidden?reason={}&route={}",
                    reason.as_str(),
                    urlencoding::encode(route)
                );
                if let Some(role) = role {
                    target.push_str("&role=");
                    target.push_str(&urlencoding::encode(role.as_str()));
                }
                Some(target)
            }
        }
    }
}

/// The caller as seen by the guard: a verified token's subject and flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub super_admin: bool,
}

impl From<&Claims> for Caller {
    fn from(claims: &Claims) -> Self {
        Caller {
            user_id: claims.sub,
            super_admin: claims.super_admin,
        }
    }
}

/// Static `{route prefix -> group}` and `{role -> allowed groups}` tables.
#[derive(Debug, Clone)]
pub struct GuardTable {
    /// Sorted longest prefix first.
    routes: Vec<(String, RouteGroup)>,
    roles: HashMap<Role, Vec<RouteGroup>>,
}

impl Default for GuardTable {
    fn default() -> Self {
        use RouteGroup::*;

        let routes = [
            ("/kits", Kit),
            ("/ai-writing", AiWriting),
            ("/risks", Risk),
            ("/ab-tests", AbTesting),
            ("/synthetic-users", SyntheticUsers),
            ("/strategy", Strategy),
            ("/observer", Observer),
            ("/settings", Settings),
        ];
        let roles = [
            (
                Role::Admin,
                vec![
                    Kit,
                    AiWriting,
                    Risk,
                    AbTesting,
                    SyntheticUsers,
                    Strategy,
                    Observer,
                    Settings,
                ],
            ),
            (
                Role::Designer,
                vec![Kit, AiWriting, Risk, AbTesting, SyntheticUsers, Strategy],
            ),
            (Role::Writer, vec![Kit, AiWriting]),
            (Role::Observer, vec![Observer, Kit]),
        ];

        GuardTable::new(
            routes.into_iter().map(|(p, g)| (p.to_string(), g)),
            roles,
        )
    }
}

impl GuardTable {
    pub fn new(
        routes: impl IntoIterator<Item = (String, RouteGroup)>,
        roles: impl IntoIterator<Item = (Role, Vec<RouteGroup>)>,
    ) -> Self {
        let mut routes: Vec<(String, RouteGroup)> = routes
            .into_iter()
            .map(|(prefix, group)| (normalize_prefix(&prefix), group))
            .collect();
        routes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        GuardTable {
            routes,
            roles: roles.into_iter().collect(),
        }
    }

    /// Build from the `[guard]` config section. Unknown role names are skipped.
    pub fn from_config(config: &GuardConfig) -> Self {
        let roles = config.roles.iter().filter_map(|(name, groups)| match Role::parse(name) {
            Some(role) => Some((role, groups.clone())),
            None => {
                tracing::warn!(role = %name, "Ignoring unknown role in guard config");
                None
            }
        });
        GuardTable::new(config.routes.clone(), roles)
    }

    /// The group of the longest route prefix matching `path` on a segment boundary.
    pub fn group_for(&self, path: &str) -> Option<RouteGroup> {
        self.routes
            .iter()
            .find(|(prefix, _)| prefix_matches(prefix, path))
            .map(|(_, group)| *group)
    }

    /// True if any role's list names the group. Unlisted groups are open.
    fn is_restricted(&self, group: RouteGroup) -> bool {
        self.roles.values().any(|groups| groups.contains(&group))
    }

    fn role_allows(&self, role: Role, group: RouteGroup) -> bool {
        self.roles
            .get(&role)
            .is_some_and(|groups| groups.contains(&group))
    }

    /// Decide one navigation.
    ///
    /// `target` is the path (and query) being requested; `role` is the
    /// verified role cookie, if any.
    pub fn decide(
        &self,
        target: &str,
        caller: Option<Caller>,
        role: Option<ActiveRole>,
    ) -> GuardDecision {
        let path = target.split('?').next().unwrap_or(target);
        if is_public(path) {
            return GuardDecision::Allow;
        }

        let Some(caller) = caller else {
            return GuardDecision::RedirectLogin {
                next: target.to_string(),
            };
        };

        let role = match role {
            Some(ActiveRole::Unrestricted) => return GuardDecision::Allow,
            Some(ActiveRole::Scoped(role)) => role,
            None if caller.super_admin => return GuardDecision::Allow,
            None => {
                return GuardDecision::Forbidden {
                    reason: ForbiddenReason::NoRole,
                    route: path.to_string(),
                    role: None,
                }
            }
        };

        match self.group_for(path) {
            Some(group) if self.is_restricted(group) && !self.role_allows(role, group) => {
                GuardDecision::Forbidden {
                    reason: ForbiddenReason::InsufficientPermissions,
                    route: path.to_string(),
                    role: Some(ActiveRole::Scoped(role)),
                }
            }
            _ => GuardDecision::Allow,
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| prefix_matches(public, path))
}

/// Combine the token's caller with its verified role cookie. A no-role
/// marker written by the session outranks the token's super-admin flag,
/// which may predate a demotion.
fn from_cookie(caller: Caller, cookie: RoleCookie) -> (Option<Caller>, Option<ActiveRole>) {
    match cookie {
        RoleCookie::Role(role) => (Some(caller), Some(role)),
        RoleCookie::NoRole => (
            Some(Caller {
                super_admin: false,
                ..caller
            }),
            None,
        ),
        RoleCookie::Missing => (Some(caller), None),
    }
}

/// Axum middleware gating page routes. Runs after `auth_middleware`.
pub async fn route_guard(
    State(table): State<Arc<GuardTable>>,
    req: Request,
    next: Next,
) -> Response {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let (caller, role) = match req.extensions().get::<Claims>() {
        Some(claims) => from_cookie(Caller::from(claims), cookies::extract_role(req.headers(), claims)),
        None => (None, None),
    };

    let decision = table.decide(&target, caller, role);
    tracing::debug!(
        path = %req.uri().path(),
        user_id = caller.map(|c| c.user_id),
        role = role.map(|r| r.as_str()),
        decision = ?decision,
        "Route guard decision"
    );

    match decision.redirect_target() {
        Some(location) => Redirect::to(&location).into_response(),
        None => next.run(req).await,
    }
}
