//! API routes.

use axum::middleware;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{admin, applications, auth, employers, health, jobs, uploads, users};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/change-password", post(auth::change_password))
        .route("/request-reset", post(auth::request_password_reset))
        .route("/reset-password", post(auth::reset_password));

    let user_routes = Router::new()
        .route("/:id", get(users::get_user))
        .route("/:id", put(users::update_user))
        .route("/:id", delete(users::delete_user))
        .route("/:id/status", patch(users::toggle_user_status));

    let job_routes = Router::new()
        .route("/", get(jobs::list_jobs))
        .route("/", post(jobs::create_job))
        .route("/search", get(jobs::search_jobs))
        .route("/employer/:employer_id", get(jobs::jobs_by_employer))
        .route("/:id", get(jobs::get_job))
        .route("/:id", put(jobs::update_job))
        .route("/:id", delete(jobs::delete_job));

    let application_routes = Router::new()
        .route("/", post(applications::submit_application))
        .route("/job/:job_id", get(applications::applications_by_job))
        .route("/user/:user_id", get(applications::applications_by_user))
        .route(
            "/employer/:employer_id",
            get(applications::applications_by_employer),
        )
        .route("/:id", get(applications::get_application))
        .route("/:id/status", put(applications::update_application_status))
        .route("/:id", delete(applications::delete_application));

    let employer_routes = Router::new()
        .route("/register", post(employers::register_employer))
        .route("/login", post(employers::login_employer))
        .route("/", get(employers::list_employers))
        .route("/top", get(employers::top_employers))
        .route("/:id", get(employers::get_employer))
        .route("/:id", put(employers::update_employer))
        .route("/:id/verify", put(employers::verify_employer))
        .route("/:id", delete(employers::delete_employer));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/employers", get(admin::list_employers))
        .route("/jobs", get(admin::list_jobs))
        .route("/applications", get(admin::list_applications))
        .route("/users/:id", delete(admin::delete_user))
        .route("/employers/:id", delete(admin::delete_employer))
        .route("/applications/:id", delete(admin::delete_application))
        .route("/stats", get(admin::stats));

    let upload_routes = Router::new()
        .route("/avatar", post(uploads::upload_avatar))
        .route("/resume", post(uploads::upload_resume))
        .route("/logo", post(uploads::upload_logo));

    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/jobs", job_routes)
        .nest("/applications", application_routes)
        .nest("/employers", employer_routes)
        .nest("/admin", admin_routes)
        .nest("/uploads", upload_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Body size cap bounds multipart uploads as well.
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
