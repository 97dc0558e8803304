use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared_types::{
    AppError, ClientAccessEntry, SessionDefaults, SessionUser, SetClientAccessRequest,
    SetWorkspaceAccessRequest, UserAccessResponse, WorkspaceAccessEntry,
};

use crate::access::{AccessBackend, AccessStore};
use crate::auth::extractors::SuperAdminRequired;

async fn require_user(store: &AccessBackend, user_id: i64) -> Result<(), AppError> {
    store
        .find_user(user_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("User not found").with_resource("user"))
}

async fn load_user_access(store: &AccessBackend, user_id: i64) -> Result<UserAccessResponse, AppError> {
    let snapshot = store
        .load_snapshot(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found").with_resource("user"))?;

    let mut clients: Vec<ClientAccessEntry> = snapshot
        .clients
        .into_iter()
        .map(|grant| ClientAccessEntry {
            client_id: grant.client_id,
            client_name: grant.client_name,
            role: grant.role,
        })
        .collect();
    clients.sort_by(|a, b| a.client_name.cmp(&b.client_name));

    let mut workspaces: Vec<WorkspaceAccessEntry> = snapshot
        .workspaces
        .into_iter()
        .map(|grant| WorkspaceAccessEntry {
            workspace_id: grant.workspace_id,
            client_id: grant.client_id,
            workspace_name: grant.workspace_name,
            role: grant.role,
        })
        .collect();
    workspaces.sort_by(|a, b| a.workspace_name.cmp(&b.workspace_name));

    Ok(UserAccessResponse {
        user: SessionUser {
            id: snapshot.user.id,
            email: snapshot.user.email,
            display_name: snapshot.user.display_name,
            super_admin: snapshot.user.super_admin,
        },
        clients,
        workspaces,
        defaults: SessionDefaults {
            client_id: snapshot.default_client.live(),
            workspace_id: snapshot.default_workspace.live(),
        },
    })
}

/// GET /api/admin/access/users/{user_id}
///
/// Raw grants and stored defaults of one user.
#[utoipa::path(
    get,
    path = "/api/admin/access/users/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User grants", body = UserAccessResponse),
        (status = 403, description = "Super-admin required", body = AppError),
        (status = 404, description = "User not found", body = AppError)
    ),
    tag = "admin"
)]
pub async fn get_user_access(
    State(store): State<AccessBackend>,
    _admin: SuperAdminRequired,
    Path(user_id): Path<i64>,
) -> Result<Json<UserAccessResponse>, AppError> {
    Ok(Json(load_user_access(&store, user_id).await?))
}

/// PUT /api/admin/access/clients
///
/// Grant (or re-role) a client membership.
#[utoipa::path(
    put,
    path = "/api/admin/access/clients",
    request_body = SetClientAccessRequest,
    responses(
        (status = 200, description = "Grant stored", body = UserAccessResponse),
        (status = 403, description = "Super-admin required", body = AppError),
        (status = 404, description = "User or client not found", body = AppError)
    ),
    tag = "admin"
)]
pub async fn set_client_access(
    State(store): State<AccessBackend>,
    admin: SuperAdminRequired,
    Json(body): Json<SetClientAccessRequest>,
) -> Result<Json<UserAccessResponse>, AppError> {
    require_user(&store, body.user_id).await?;
    if store.find_client(body.client_id).await?.is_none() {
        return Err(AppError::not_found("Client not found").with_resource("client"));
    }

    store
        .set_client_access(body.user_id, body.client_id, body.role)
        .await?;

    tracing::info!(
        admin_id = admin.0.sub,
        user_id = body.user_id,
        client_id = %body.client_id,
        role = body.role.map(|r| r.as_str()),
        "Client access granted"
    );

    Ok(Json(load_user_access(&store, body.user_id).await?))
}

/// DELETE /api/admin/access/clients/{user_id}/{client_id}
#[utoipa::path(
    delete,
    path = "/api/admin/access/clients/{user_id}/{client_id}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("client_id" = Uuid, Path, description = "Client UUID")
    ),
    responses(
        (status = 204, description = "Grant removed"),
        (status = 403, description = "Super-admin required", body = AppError),
        (status = 404, description = "No such grant", body = AppError)
    ),
    tag = "admin"
)]
pub async fn remove_client_access(
    State(store): State<AccessBackend>,
    admin: SuperAdminRequired,
    Path((user_id, client_id)): Path<(i64, Uuid)>,
) -> Result<StatusCode, AppError> {
    if !store.remove_client_access(user_id, client_id).await? {
        return Err(AppError::not_found("Client access not found").with_resource("client"));
    }

    tracing::info!(admin_id = admin.0.sub, user_id, client_id = %client_id, "Client access revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/admin/access/workspaces
///
/// Grant (or re-role) a workspace membership.
#[utoipa::path(
    put,
    path = "/api/admin/access/workspaces",
    request_body = SetWorkspaceAccessRequest,
    responses(
        (status = 200, description = "Grant stored", body = UserAccessResponse),
        (status = 403, description = "Super-admin required", body = AppError),
        (status = 404, description = "User or workspace not found", body = AppError)
    ),
    tag = "admin"
)]
pub async fn set_workspace_access(
    State(store): State<AccessBackend>,
    admin: SuperAdminRequired,
    Json(body): Json<SetWorkspaceAccessRequest>,
) -> Result<Json<UserAccessResponse>, AppError> {
    require_user(&store, body.user_id).await?;
    if store.find_workspace(body.workspace_id).await?.is_none() {
        return Err(AppError::not_found("Workspace not found").with_resource("workspace"));
    }

    store
        .set_workspace_access(body.user_id, body.workspace_id, body.role)
        .await?;

    tracing::info!(
        admin_id = admin.0.sub,
        user_id = body.user_id,
        workspace_id = %body.workspace_id,
        role = body.role.map(|r| r.as_str()),
        "Workspace access granted"
    );

    Ok(Json(load_user_access(&store, body.user_id).await?))
}

/// DELETE /api/admin/access/workspaces/{user_id}/{workspace_id}
#[utoipa::path(
    delete,
    path = "/api/admin/access/workspaces/{user_id}/{workspace_id}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("workspace_id" = Uuid, Path, description = "Workspace UUID")
    ),
    responses(
        (status = 204, description = "Grant removed"),
        (status = 403, description = "Super-admin required", body = AppError),
        (status = 404, description = "No such grant", body = AppError)
    ),
    tag = "admin"
)]
pub async fn remove_workspace_access(
    State(store): State<AccessBackend>,
    admin: SuperAdminRequired,
    Path((user_id, workspace_id)): Path<(i64, Uuid)>,
) -> Result<StatusCode, AppError> {
    if !store.remove_workspace_access(user_id, workspace_id).await? {
        return Err(AppError::not_found("Workspace access not found").with_resource("workspace"));
    }

    tracing::info!(
        admin_id = admin.0.sub,
        user_id,
        workspace_id = %workspace_id,
        "Workspace access revoked"
    );
    Ok(StatusCode::NO_CONTENT)
}
