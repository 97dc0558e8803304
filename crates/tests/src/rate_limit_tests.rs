use axum::http::StatusCode;
use crate::common;

#[tokio::test]
async fn test_rate_limit_returns_429_when_exceeded() {
    // Allow only 2 requests per 60s window
    let (app, store) = common::test_app_rate_limited(2);
    let user = store.insert_user("d@example.com", "D", false);
    let token = common::token_for(user, false);

    let (s1, _, _) = common::get(&app, "/api/session", Some(&token)).await;
    assert_eq!(s1, StatusCode::OK, "First request should pass");

    let (s2, _, _) = common::get(&app, "/api/session", Some(&token)).await;
    assert_eq!(s2, StatusCode::OK, "Second request should pass");

    let (s3, _, body) = common::get(&app, "/api/session", Some(&token)).await;
    assert_eq!(s3, StatusCode::TOO_MANY_REQUESTS, "Third request should be rate limited");
    assert_eq!(body["kind"], "RateLimited");
}

#[tokio::test]
async fn test_rate_limit_separate_users() {
    let (app, store) = common::test_app_rate_limited(1);
    let first = store.insert_user("a@example.com", "A", false);
    let second = store.insert_user("b@example.com", "B", false);
    let first_token = common::token_for(first, false);
    let second_token = common::token_for(second, false);

    let (s1, _, _) = common::get(&app, "/api/session", Some(&first_token)).await;
    assert_eq!(s1, StatusCode::OK);

    // Different user, different bucket
    let (s2, _, _) = common::get(&app, "/api/session", Some(&second_token)).await;
    assert_eq!(s2, StatusCode::OK);

    let (s3, _, _) = common::get(&app, "/api/session", Some(&first_token)).await;
    assert_eq!(s3, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_pages_are_not_rate_limited() {
    let (app, _store) = common::test_app_rate_limited(1);

    for _ in 0..3 {
        let (status, _) = common::navigate(&app, "/login", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
