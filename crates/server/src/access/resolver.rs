use shared_types::{ActiveRole, Role};
use uuid::Uuid;

use super::store::{ClientGrant, WorkspaceGrant};

/// Resolve the role for a user's default selection.
///
/// Precedence, first match wins:
/// 1. a grant on the default workspace with a non-null role;
/// 2. a grant on the default client with a non-null role;
/// 3. no role.
///
/// The super-admin flag plays no part here; see [`session_role`].
pub fn resolve_role(
    clients: &[ClientGrant],
    workspaces: &[WorkspaceGrant],
    default_client: Option<Uuid>,
    default_workspace: Option<Uuid>,
) -> Option<Role> {
    let workspace_role = default_workspace.and_then(|id| {
        workspaces
            .iter()
            .filter(|grant| grant.workspace_id == id)
            .find_map(|grant| grant.role)
    });
    if workspace_role.is_some() {
        return workspace_role;
    }

    default_client.and_then(|id| {
        clients
            .iter()
            .filter(|grant| grant.client_id == id)
            .find_map(|grant| grant.role)
    })
}

/// Turn a resolved role into the session's active role.
///
/// A super-admin only becomes `Unrestricted` when the default selection
/// resolves to nothing; a resolved role always wins so that a super-admin
/// working inside a client sees that client's restrictions.
pub fn session_role(super_admin: bool, resolved: Option<Role>) -> Option<ActiveRole> {
    match resolved {
        Some(role) => Some(ActiveRole::Scoped(role)),
        None if super_admin => Some(ActiveRole::Unrestricted),
        None => None,
    }
}
