use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use shared_types::{AppErrorKind, Role, SessionDefaults};
use uuid::Uuid;

use crate::common;
use server::access::{AccessStore, DefaultRef};

fn pair(client_id: Uuid, workspace_id: Option<Uuid>) -> SessionDefaults {
    SessionDefaults {
        client_id: Some(client_id),
        workspace_id,
    }
}

#[tokio::test]
async fn snapshot_reads_grants_and_flags_dangling_default() {
    let Some((store, pool, _guard)) = common::pg_store().await else {
        return;
    };
    let tenants = common::pg_tenants(&pool).await;
    let user = common::pg_user(&pool, "d@example.com", false).await;

    store
        .set_client_access(user, tenants.client_a, Some(Role::Admin))
        .await
        .unwrap();
    store
        .set_workspace_access(user, tenants.ws_a1, Some(Role::Designer))
        .await
        .unwrap();
    store
        .upsert_defaults(user, pair(tenants.client_a, Some(tenants.ws_a1)))
        .await
        .unwrap();

    sqlx::query("DELETE FROM workspaces WHERE id = $1")
        .bind(tenants.ws_a1)
        .execute(&pool)
        .await
        .unwrap();

    let snapshot = store.load_snapshot(user).await.unwrap().unwrap();
    assert_eq!(snapshot.user.email, "d@example.com");
    assert_eq!(snapshot.default_client, DefaultRef::Live(tenants.client_a));
    assert_eq!(snapshot.default_workspace, DefaultRef::Dangling(tenants.ws_a1));
    // The workspace grant went with the workspace
    assert!(snapshot.workspaces.is_empty());
    assert_eq!(snapshot.clients.len(), 1);
    assert_eq!(snapshot.clients[0].client_name, "Acme");
    assert_eq!(snapshot.clients[0].role, Some(Role::Admin));
}

#[tokio::test]
async fn snapshot_of_unknown_user_is_none() {
    let Some((store, _pool, _guard)) = common::pg_store().await else {
        return;
    };

    assert!(store.load_snapshot(4242).await.unwrap().is_none());
    assert!(store.find_user(4242).await.unwrap().is_none());
}

#[tokio::test]
async fn null_and_unknown_stored_roles_read_as_no_role() {
    let Some((store, pool, _guard)) = common::pg_store().await else {
        return;
    };
    let tenants = common::pg_tenants(&pool).await;
    let user = common::pg_user(&pool, "d@example.com", false).await;

    sqlx::query("INSERT INTO client_access (user_id, client_id, role) VALUES ($1, $2, NULL), ($1, $3, 'superuser')")
        .bind(user)
        .bind(tenants.client_a)
        .bind(tenants.client_b)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO workspace_access (user_id, workspace_id, role) VALUES ($1, $2, 'owner')")
        .bind(user)
        .bind(tenants.ws_b1)
        .execute(&pool)
        .await
        .unwrap();

    let snapshot = store.load_snapshot(user).await.unwrap().unwrap();
    assert_eq!(snapshot.clients.len(), 2);
    assert!(snapshot.clients.iter().all(|grant| grant.role.is_none()));
    assert_eq!(snapshot.workspaces.len(), 1);
    assert_eq!(snapshot.workspaces[0].client_id, tenants.client_b);
    assert_eq!(snapshot.workspaces[0].role, None);

    // Membership still counts for selection
    assert!(store.has_client_access(user, tenants.client_b).await.unwrap());
}

#[tokio::test]
async fn upsert_replaces_previous_defaults() {
    let Some((store, pool, _guard)) = common::pg_store().await else {
        return;
    };
    let tenants = common::pg_tenants(&pool).await;
    let user = common::pg_user(&pool, "d@example.com", false).await;

    store
        .upsert_defaults(user, pair(tenants.client_a, Some(tenants.ws_a1)))
        .await
        .unwrap();
    store
        .upsert_defaults(user, pair(tenants.client_b, None))
        .await
        .unwrap();

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM default_selections WHERE user_id = $1")
        .bind(user)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let snapshot = store.load_snapshot(user).await.unwrap().unwrap();
    assert_eq!(snapshot.default_client, DefaultRef::Live(tenants.client_b));
    assert_eq!(snapshot.default_workspace, DefaultRef::Unset);

    store.clear_defaults(user).await.unwrap();
    let snapshot = store.load_snapshot(user).await.unwrap().unwrap();
    assert_eq!(snapshot.default_client, DefaultRef::Unset);
}

#[tokio::test]
async fn regrant_replaces_role_and_revoke_reports_removal() {
    let Some((store, pool, _guard)) = common::pg_store().await else {
        return;
    };
    let tenants = common::pg_tenants(&pool).await;
    let user = common::pg_user(&pool, "d@example.com", false).await;

    store
        .set_client_access(user, tenants.client_b, Some(Role::Observer))
        .await
        .unwrap();
    store
        .set_client_access(user, tenants.client_b, Some(Role::Designer))
        .await
        .unwrap();
    store
        .set_workspace_access(user, tenants.ws_b1, None)
        .await
        .unwrap();

    let snapshot = store.load_snapshot(user).await.unwrap().unwrap();
    assert_eq!(snapshot.clients.len(), 1);
    assert_eq!(snapshot.clients[0].role, Some(Role::Designer));

    assert!(store.remove_client_access(user, tenants.client_b).await.unwrap());
    assert!(!store.remove_client_access(user, tenants.client_b).await.unwrap());
    assert!(!store.has_client_access(user, tenants.client_b).await.unwrap());

    assert!(store.has_workspace_access(user, tenants.ws_b1).await.unwrap());
    assert!(store.remove_workspace_access(user, tenants.ws_b1).await.unwrap());
    assert!(!store.remove_workspace_access(user, tenants.ws_b1).await.unwrap());
}

#[tokio::test]
async fn grant_to_missing_rows_is_not_found() {
    let Some((store, pool, _guard)) = common::pg_store().await else {
        return;
    };
    let tenants = common::pg_tenants(&pool).await;
    let user = common::pg_user(&pool, "d@example.com", false).await;

    let err = store
        .set_client_access(user, Uuid::new_v4(), Some(Role::Admin))
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::NotFound);
    assert_eq!(err.resource.as_deref(), Some("client"));

    let err = store
        .set_workspace_access(user + 1000, tenants.ws_a1, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::NotFound);
    assert_eq!(err.resource.as_deref(), Some("user"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_never_leave_mixed_pair() {
    let Some((store, pool, _guard)) = common::pg_store().await else {
        return;
    };
    let tenants = common::pg_tenants(&pool).await;
    let user = common::pg_user(&pool, "d@example.com", false).await;
    let pairs = [
        (tenants.client_a, tenants.ws_a1),
        (tenants.client_b, tenants.ws_b1),
    ];

    let writers: Vec<_> = (0..32)
        .map(|i| {
            let store = store.clone();
            let (client, workspace) = pairs[i % 2];
            tokio::spawn(async move { store.upsert_defaults(user, pair(client, Some(workspace))).await })
        })
        .collect();

    for _ in 0..32 {
        let snapshot = store.load_snapshot(user).await.unwrap().unwrap();
        if let (Some(c), Some(w)) = (snapshot.default_client.live(), snapshot.default_workspace.live()) {
            assert!(pairs.contains(&(c, w)), "mixed pair {c} / {w}");
        }
    }
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    let (c, w): (Option<Uuid>, Option<Uuid>) = sqlx::query_as(
        "SELECT default_client_id, default_workspace_id FROM default_selections WHERE user_id = $1",
    )
    .bind(user)
    .fetch_one(&pool)
    .await
    .unwrap();
    let last = (c.unwrap(), w.unwrap());
    assert!(pairs.contains(&last));
}

#[tokio::test]
async fn session_endpoints_work_over_postgres() {
    let Some((store, pool, _guard)) = common::pg_store().await else {
        return;
    };
    let tenants = common::pg_tenants(&pool).await;
    let user = common::pg_user(&pool, "d@example.com", false).await;
    store
        .set_client_access(user, tenants.client_a, Some(Role::Writer))
        .await
        .unwrap();
    let app = common::pg_app(store);
    let token = common::token_for(user, false);

    let (status, _, _) = common::put_json(
        &app,
        "/api/session/defaults",
        &token,
        json!({ "client_id": tenants.client_a }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = common::get(&app, "/api/session", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "writer");
    assert_eq!(body["default_client_id"], json!(tenants.client_a));

    let (_, _, health) = common::get(&app, "/health", None).await;
    assert_eq!(health["db"], "connected");
}
