//! Health API Lambda - liveness endpoint for the API gateway.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shared::http::{error_response, json_response, preflight_response, ApiResponse};

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
}

async fn handler(event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let raw_path = event.uri().path();
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);

    info!("Health request: {} {}", method, path);

    if method == "OPTIONS" {
        return preflight_response();
    }

    match (method, path) {
        ("GET", "/health") => json_response(
            200,
            &ApiResponse::success(HealthResponse {
                status: "healthy",
                service: "cs-inquiries-api",
                version: env!("CARGO_PKG_VERSION"),
                timestamp: chrono::Utc::now().to_rfc3339(),
            }),
        ),

        _ => error_response(404, "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    run(service_fn(handler)).await
}
