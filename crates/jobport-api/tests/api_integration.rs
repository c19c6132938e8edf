//! API integration tests.
//!
//! Router-level tests driven through `tower::ServiceExt::oneshot`. Building
//! `AppState` needs the live backing services (Firestore, R2), so these are
//! gated behind `--ignored`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use jobport_api::{create_router, ApiConfig, AppState};

async fn test_app() -> axum::Router {
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env().expect("API config");
    let state = AppState::new(config).await.expect("app state");
    create_router(state, None)
}

#[tokio::test]
#[ignore = "requires live backing services"]
async fn test_health_endpoint() {
    let app = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires live backing services"]
async fn test_missing_token_is_unauthorized() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires live backing services"]
async fn test_garbage_token_is_unauthorized() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header("Authorization", "Bearer not-a-real-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires live backing services"]
async fn test_register_login_logout_flow() {
    let app = test_app().await;
    let email = format!("it-{}@example.com", uuid::Uuid::new_v4());

    // Register
    let body = serde_json::json!({
        "name": "Flow Test",
        "email": email,
        "phone": "555-0100",
        "password": "a sufficiently long password",
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["success"], true);
    let token = parsed["data"]["token"].as_str().unwrap().to_string();

    // A second registration with the same email conflicts.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Logout revokes the token...
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // ...so the same token is now rejected.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires live backing services"]
async fn test_job_views_increment_on_each_fetch() {
    let app = test_app().await;

    // Register an employer, have an admin-free path: employer must be
    // verified before posting, so this test drives the public read side
    // against a pre-seeded job id from the environment.
    let Some(job_id) = std::env::var("TEST_JOB_ID").ok() else {
        eprintln!("TEST_JOB_ID not set, skipping");
        return;
    };

    async fn fetch_views(app: axum::Router, job_id: &str) -> u64 {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/jobs/{}", job_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        parsed["data"]["views"].as_u64().unwrap()
    }

    let first = fetch_views(app.clone(), &job_id).await;
    let second = fetch_views(app, &job_id).await;
    assert_eq!(second, first + 1);
}
