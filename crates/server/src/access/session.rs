use std::collections::BTreeMap;

use shared_types::{AccessibleClient, AccessibleWorkspace, AppError, SessionPayload, SessionUser};

use super::resolver::{resolve_role, session_role};
use super::store::{AccessSnapshot, AccessStore, DefaultRef};

/// Read everything about a user once and project it into the session payload.
pub async fn assemble_session<S: AccessStore>(
    store: &S,
    user_id: i64,
) -> Result<SessionPayload, AppError> {
    let snapshot = store
        .load_snapshot(user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Session user no longer exists"))?;

    Ok(project(snapshot))
}

/// Pure projection of a snapshot; split out so it can be tested without a store.
pub fn project(snapshot: AccessSnapshot) -> SessionPayload {
    let AccessSnapshot {
        user,
        clients,
        workspaces,
        default_client,
        default_workspace,
    } = snapshot;

    warn_if_dangling(user.id, "client", default_client);
    warn_if_dangling(user.id, "workspace", default_workspace);

    let default_client_id = default_client.live();
    let default_workspace_id = default_workspace.live();

    let resolved = resolve_role(&clients, &workspaces, default_client_id, default_workspace_id);
    let role = session_role(user.super_admin, resolved);

    let mut by_client: BTreeMap<_, Vec<AccessibleWorkspace>> = BTreeMap::new();
    for grant in &workspaces {
        by_client
            .entry(grant.client_id)
            .or_default()
            .push(AccessibleWorkspace {
                id: grant.workspace_id,
                name: grant.workspace_name.clone(),
                role: grant.role,
            });
    }

    let mut accessible_clients: Vec<AccessibleClient> = clients
        .into_iter()
        .map(|grant| {
            let mut workspaces = by_client.remove(&grant.client_id).unwrap_or_default();
            workspaces.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            AccessibleClient {
                id: grant.client_id,
                name: grant.client_name,
                role: grant.role,
                workspaces,
            }
        })
        .collect();
    accessible_clients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    let has_access = role.is_some() || !accessible_clients.is_empty();

    SessionPayload {
        user: SessionUser {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            super_admin: user.super_admin,
        },
        role,
        has_access,
        accessible_clients,
        default_client_id,
        default_workspace_id,
    }
}

fn warn_if_dangling(user_id: i64, resource: &str, default: DefaultRef) {
    if let DefaultRef::Dangling(id) = default {
        tracing::warn!(
            user_id,
            resource,
            id = %id,
            "InconsistentDefault: stored default references a deleted record, treating as unset"
        );
    }
}
