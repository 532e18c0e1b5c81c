//! Customer Auth API Lambda - self-service login.
//!
//! Customers authenticate with the email and password they attached to an
//! inquiry; the check runs against the argon2 hashes on their stored
//! inquiries, never plain text.
//!
//! Endpoints:
//! - POST /auth/customer/login

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shared::http::{error_response, json_response, preflight_response, ApiResponse};
use shared::parse_body;
use shared::password::verify_password;
use shared::{get_database_credentials, Config, InquiryStore, PgInquiryStore};

#[derive(Debug, Deserialize)]
struct CustomerLoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
struct CustomerUser {
    email: String,
    role: &'static str,
}

#[derive(Debug, Serialize)]
struct CustomerLoginResponse {
    user: CustomerUser,
}

struct AppState {
    store: PgInquiryStore,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env().map_err(|e| format!("Configuration error: {}", e))?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);

        let db_creds = get_database_credentials(&secrets_client, &config.db_secret_arn)
            .await
            .map_err(|e| format!("Failed to get DB credentials: {}", e))?;
        let pool = shared::db::create_pool(&config, &db_creds.username, &db_creds.password)
            .await
            .map_err(|e| format!("Failed to connect to database: {}", e))?;

        Ok(Self {
            store: PgInquiryStore::new(pool),
        })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let raw_path = event.uri().path();
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);

    info!("Customer auth request: {} {}", method, path);

    if method == "OPTIONS" {
        return preflight_response();
    }

    match (method, path) {
        ("POST", "/auth/customer/login") => {
            let request: CustomerLoginRequest = parse_body!(event.body());

            let (Some(email), Some(password)) = (request.email, request.password) else {
                return error_response(400, "Email and password are required");
            };

            let inquiries = match state.store.list_by_email(&email, 50).await {
                Ok(inquiries) => inquiries,
                Err(e) => return error_response(500, e.to_string()),
            };

            let verified = inquiries
                .iter()
                .filter_map(|i| i.customer_password_hash.as_deref())
                .any(|hash| verify_password(&password, hash));

            if !verified {
                return error_response(401, "Invalid email or password");
            }

            json_response(
                200,
                &ApiResponse::success(CustomerLoginResponse {
                    user: CustomerUser {
                        email,
                        role: "customer",
                    },
                }),
            )
        }

        _ => error_response(404, "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);
    let state_clone = state.clone();

    run(service_fn(move |event| {
        let state = state_clone.clone();
        async move { handler(state, event).await }
    }))
    .await
}
