//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "jobport_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "jobport_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "jobport_http_requests_in_flight";

    pub const AUTH_FAILURES_TOTAL: &str = "jobport_auth_failures_total";
    pub const TOKENS_REVOKED_TOTAL: &str = "jobport_tokens_revoked_total";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "jobport_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an authentication rejection by its stable code.
pub fn record_auth_failure(code: &str) {
    counter!(names::AUTH_FAILURES_TOTAL, "code" => code.to_string()).increment(1);
}

/// Record a token entering the revocation registry.
pub fn record_token_revoked() {
    counter!(names::TOKENS_REVOKED_TOTAL).increment(1);
}

/// Record a rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    counter!(names::RATE_LIMIT_HITS_TOTAL, "endpoint" => endpoint.to_string()).increment(1);
}

/// Sanitize path for metrics labels (collapse ids to placeholders).
fn sanitize_path(path: &str) -> String {
    // UUIDs anywhere in the path
    let path = regex_lite::Regex::new(
        r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    )
    .unwrap()
    .replace_all(path, ":id");
    // Application ids are two UUIDs joined with an underscore; the
    // replacement above leaves ":id_:id".
    let path = path.replace(":id_:id", ":id");
    // Numeric ids
    let path = regex_lite::Regex::new(r"/[0-9]+(/|$)")
        .unwrap()
        .replace_all(&path, "/:id$1");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_collapses_uuids() {
        assert_eq!(
            sanitize_path("/api/jobs/550e8400-e29b-41d4-a716-446655440000"),
            "/api/jobs/:id"
        );
        assert_eq!(
            sanitize_path(
                "/api/applications/550e8400-e29b-41d4-a716-446655440000_660e8400-e29b-41d4-a716-446655440000"
            ),
            "/api/applications/:id"
        );
        assert_eq!(sanitize_path("/api/jobs"), "/api/jobs");
    }
}
