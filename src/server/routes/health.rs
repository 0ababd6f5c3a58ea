//! Liveness endpoints.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
}

/// Service health for load balancers and uptime probes.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResponse {
    status: &'static str,
    message: &'static str,
}

/// Lets the frontend confirm it can reach the backend.
pub async fn test_api() -> Json<TestResponse> {
    Json(TestResponse {
        status: "Prompt Optimizer API is working",
        message: "Backend connected",
    })
}
