use shared_types::{AppError, SessionDefaults};
use uuid::Uuid;

use super::store::AccessStore;

/// Validate and store a user's default client/workspace.
///
/// Checks run in a fixed order so callers always see the same error for
/// the same bad input:
/// 1. the user holds a grant on the client (`Forbidden`, client);
/// 2. the workspace exists (`NotFound`, workspace);
/// 3. the workspace belongs to the client (`InvalidRelation`);
/// 4. the user holds a grant on the workspace (`Forbidden`, workspace).
///
/// A `None` workspace stores a client-only default and skips 2-4.
/// Nothing is written unless every check passes.
pub async fn set_defaults<S: AccessStore>(
    store: &S,
    user_id: i64,
    client_id: Uuid,
    workspace_id: Option<Uuid>,
) -> Result<SessionDefaults, AppError> {
    if !store.has_client_access(user_id, client_id).await? {
        return Err(AppError::forbidden("You do not have access to this client").with_resource("client"));
    }

    if let Some(workspace_id) = workspace_id {
        let workspace = store
            .find_workspace(workspace_id)
            .await?
            .ok_or_else(|| AppError::not_found("Workspace not found").with_resource("workspace"))?;

        if workspace.client_id != client_id {
            return Err(AppError::invalid_relation(format!(
                "Workspace {} does not belong to client {}",
                workspace_id, client_id
            )));
        }

        if !store.has_workspace_access(user_id, workspace_id).await? {
            return Err(AppError::forbidden("You do not have access to this workspace")
                .with_resource("workspace"));
        }
    }

    let defaults = SessionDefaults {
        client_id: Some(client_id),
        workspace_id,
    };
    store.upsert_defaults(user_id, defaults).await?;

    tracing::info!(
        user_id,
        client_id = %client_id,
        workspace_id = ?workspace_id,
        "Default selection updated"
    );

    Ok(defaults)
}

/// Reset both default columns.
pub async fn clear_defaults<S: AccessStore>(store: &S, user_id: i64) -> Result<(), AppError> {
    store.clear_defaults(user_id).await?;
    tracing::info!(user_id, "Default selection cleared");
    Ok(())
}
