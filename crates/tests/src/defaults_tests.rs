use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use shared_types::{Role, SessionDefaults};
use uuid::Uuid;

use crate::common::{self, Tenants};
use server::access::{AccessStore, MemoryAccessStore};
use server::auth::cookies::{RoleCookie, ROLE_COOKIE};

/// A non-admin user granted client A (admin) and workspace A1 (designer).
async fn seeded_user(store: &MemoryAccessStore) -> (i64, Tenants, String) {
    let tenants = common::seed_tenants(store);
    let user = store.insert_user("d@example.com", "D", false);
    store
        .set_client_access(user, tenants.client_a, Some(Role::Admin))
        .await
        .unwrap();
    store
        .set_workspace_access(user, tenants.ws_a1, Some(Role::Designer))
        .await
        .unwrap();
    let token = common::token_for(user, false);
    (user, tenants, token)
}

#[tokio::test]
async fn set_defaults_round_trips_through_session() {
    let (app, store) = common::test_app();
    let (user, tenants, token) = seeded_user(&store).await;

    let (status, headers, body) = common::put_json(
        &app,
        "/api/session/defaults",
        &token,
        json!({ "client_id": tenants.client_a, "workspace_id": tenants.ws_a1 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_id"], json!(tenants.client_a));
    assert_eq!(body["workspace_id"], json!(tenants.ws_a1));
    assert!(common::set_cookie_value(&headers, ROLE_COOKIE).is_some_and(|v| v.starts_with("designer.")));

    let (_, _, session) = common::get(&app, "/api/session", Some(&token)).await;
    assert_eq!(session["default_client_id"], json!(tenants.client_a));
    assert_eq!(session["default_workspace_id"], json!(tenants.ws_a1));

    assert_eq!(
        store.stored_defaults(user),
        Some(SessionDefaults {
            client_id: Some(tenants.client_a),
            workspace_id: Some(tenants.ws_a1),
        })
    );
}

#[tokio::test]
async fn workspace_of_other_client_is_invalid_relation_and_not_stored() {
    let (app, store) = common::test_app();
    let (user, tenants, token) = seeded_user(&store).await;
    store
        .set_workspace_access(user, tenants.ws_b1, Some(Role::Writer))
        .await
        .unwrap();

    let (status, _, body) = common::put_json(
        &app,
        "/api/session/defaults",
        &token,
        json!({ "client_id": tenants.client_a, "workspace_id": tenants.ws_b1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidRelation");
    assert_eq!(store.stored_defaults(user), None);
}

#[tokio::test]
async fn failed_update_keeps_previous_defaults() {
    let (app, store) = common::test_app();
    let (user, tenants, token) = seeded_user(&store).await;

    let (status, _, _) = common::put_json(
        &app,
        "/api/session/defaults",
        &token,
        json!({ "client_id": tenants.client_a, "workspace_id": tenants.ws_a1 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = common::put_json(
        &app,
        "/api/session/defaults",
        &token,
        json!({ "client_id": tenants.client_b }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(
        store.stored_defaults(user),
        Some(SessionDefaults {
            client_id: Some(tenants.client_a),
            workspace_id: Some(tenants.ws_a1),
        })
    );
}

#[tokio::test]
async fn client_without_grant_is_forbidden_before_workspace_checks() {
    let (app, store) = common::test_app();
    let (_, tenants, token) = seeded_user(&store).await;

    // Unknown workspace, but the client check fails first
    let (status, _, body) = common::put_json(
        &app,
        "/api/session/defaults",
        &token,
        json!({ "client_id": tenants.client_b, "workspace_id": Uuid::new_v4() }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["resource"], "client");
}

#[tokio::test]
async fn unknown_workspace_is_not_found() {
    let (app, store) = common::test_app();
    let (_, tenants, token) = seeded_user(&store).await;

    let (status, _, body) = common::put_json(
        &app,
        "/api/session/defaults",
        &token,
        json!({ "client_id": tenants.client_a, "workspace_id": Uuid::new_v4() }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["resource"], "workspace");
}

#[tokio::test]
async fn workspace_without_grant_is_forbidden() {
    let (app, store) = common::test_app();
    let (_, tenants, token) = seeded_user(&store).await;
    let ungranted = store.insert_workspace(tenants.client_a, "Acme Secret");

    let (status, _, body) = common::put_json(
        &app,
        "/api/session/defaults",
        &token,
        json!({ "client_id": tenants.client_a, "workspace_id": ungranted }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["resource"], "workspace");
}

#[tokio::test]
async fn null_role_grant_still_permits_selection() {
    let (app, store) = common::test_app();
    let tenants = common::seed_tenants(&store);
    let user = store.insert_user("o@example.com", "O", false);
    store
        .set_client_access(user, tenants.client_b, None)
        .await
        .unwrap();
    let token = common::token_for(user, false);

    let (status, headers, _) = common::put_json(
        &app,
        "/api/session/defaults",
        &token,
        json!({ "client_id": tenants.client_b }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = common::set_cookie_value(&headers, ROLE_COOKIE).expect("role cookie set");
    assert_eq!(common::cookie_role(&cookie, &token), RoleCookie::NoRole);
}

#[tokio::test]
async fn malformed_body_is_rejected_without_writing() {
    let (app, store) = common::test_app();
    let (user, _, token) = seeded_user(&store).await;

    let (status, _, _) = common::put_json(
        &app,
        "/api/session/defaults",
        &token,
        json!({ "client_id": "not-a-uuid" }),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(store.stored_defaults(user), None);
}

#[tokio::test]
async fn clear_defaults_removes_role() {
    let (app, store) = common::test_app();
    let (user, tenants, token) = seeded_user(&store).await;
    store
        .upsert_defaults(
            user,
            SessionDefaults {
                client_id: Some(tenants.client_a),
                workspace_id: None,
            },
        )
        .await
        .unwrap();

    let (status, headers, _) = common::delete(&app, "/api/session/defaults", &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let cookie = common::set_cookie_value(&headers, ROLE_COOKIE).expect("role cookie set");
    assert_eq!(common::cookie_role(&cookie, &token), RoleCookie::NoRole);
    assert_eq!(store.stored_defaults(user), None);

    let (_, _, session) = common::get(&app, "/api/session", Some(&token)).await;
    assert_eq!(session["role"], serde_json::Value::Null);
    assert_eq!(session["has_access"], true);
}

#[tokio::test]
async fn set_defaults_requires_authentication() {
    let (app, _store) = common::test_app();

    let (status, _, _) = common::send(
        &app,
        common::request(
            "PUT",
            "/api/session/defaults",
            None,
            None,
            Some(json!({ "client_id": Uuid::new_v4() })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
