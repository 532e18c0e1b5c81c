//! Auth API Lambda - staff login and token verification.
//!
//! Endpoints:
//! - POST /auth/login - Exchange staff credentials for a bearer token
//! - POST /auth/verify - Validate a bearer token

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shared::http::{error_response, json_response, preflight_response, ApiResponse};
use shared::parse_body;
use shared::password::verify_password;
use shared::secrets::StaffAccount;
use shared::{authorize, get_secret, get_staff_account, issue_token, Config};

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
struct UserInfo {
    email: String,
    name: String,
    role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    token_type: &'static str,
    user: UserInfo,
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    valid: bool,
    user: UserInfo,
}

struct AppState {
    jwt_secret: String,
    staff_account: StaffAccount,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env().map_err(|e| format!("Configuration error: {}", e))?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);

        let jwt_secret_arn = config
            .jwt_secret_arn
            .as_deref()
            .ok_or("JWT_SECRET_ARN not set")?;
        let jwt_secret = get_secret(&secrets_client, jwt_secret_arn)
            .await
            .map_err(|e| format!("Failed to get JWT secret: {}", e))?;

        let staff_secret_arn = config
            .staff_secret_arn
            .as_deref()
            .ok_or("STAFF_ACCOUNT_SECRET_ARN not set")?;
        let staff_account = get_staff_account(&secrets_client, staff_secret_arn)
            .await
            .map_err(|e| format!("Failed to get staff account: {}", e))?;

        Ok(Self {
            jwt_secret,
            staff_account,
        })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let raw_path = event.uri().path();
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);

    info!("Auth request: {} {}", method, path);

    if method == "OPTIONS" {
        return preflight_response();
    }

    match (method, path) {
        ("POST", "/auth/login") => {
            let request: LoginRequest = parse_body!(event.body());

            let (Some(email), Some(password)) = (request.email, request.password) else {
                return error_response(400, "Email and password are required");
            };

            let account = &state.staff_account;
            if email != account.email || !verify_password(&password, &account.password_hash) {
                warn!(email = %email, "Failed staff login attempt");
                return error_response(401, "Invalid email or password");
            }

            let access_token = issue_token(&state.jwt_secret, &account.email, &account.name, "admin")?;

            json_response(
                200,
                &ApiResponse::success(LoginResponse {
                    access_token,
                    token_type: "bearer",
                    user: UserInfo {
                        email: account.email.clone(),
                        name: account.name.clone(),
                        role: "admin".to_string(),
                    },
                }),
            )
        }

        ("POST", "/auth/verify") => match authorize(&state.jwt_secret, &event) {
            Ok(staff) => json_response(
                200,
                &ApiResponse::success(VerifyResponse {
                    valid: true,
                    user: UserInfo {
                        email: staff.email,
                        name: staff.name,
                        role: staff.role,
                    },
                }),
            ),
            Err(e) => error_response(401, e.to_string()),
        },

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
