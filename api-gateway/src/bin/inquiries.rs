//! Inquiries API Lambda - customer inquiry intake and lifecycle.
//!
//! Endpoints:
//! - POST /inquiries - Create an inquiry (AI response generated inline)
//! - GET /inquiries - List inquiries by company or by customer email
//! - GET /inquiries/{id} - Get a single inquiry
//! - PUT /inquiries/{id}/status - Update status (staff only)
//! - POST /inquiries/{id}/escalate - Escalate to a human

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use shared::http::{
    domain_error_response, error_response, json_response, preflight_response, ApiResponse,
};
use shared::models::{
    CreateInquiryRequest, EscalateRequest, ListInquiriesResponse, UpdateStatusRequest,
};
use shared::parse_body;
use shared::{
    authorize_admin, get_database_credentials, get_secret, BedrockInvoker, Config, InquiryService,
    ModelConfig, PgInquiryStore, ResponseGenerator, SesNotifier,
};

/// Application state, built once per Lambda container.
struct AppState {
    service: InquiryService<BedrockInvoker>,
    jwt_secret: String,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env().map_err(|e| format!("Configuration error: {}", e))?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);
        let bedrock_client = aws_sdk_bedrockruntime::Client::new(&aws_config);
        let ses_client = aws_sdk_ses::Client::new(&aws_config);

        let db_creds = get_database_credentials(&secrets_client, &config.db_secret_arn)
            .await
            .map_err(|e| format!("Failed to get DB credentials: {}", e))?;
        let pool = shared::db::create_pool(&config, &db_creds.username, &db_creds.password)
            .await
            .map_err(|e| format!("Failed to connect to database: {}", e))?;

        let jwt_secret_arn = config
            .jwt_secret_arn
            .as_deref()
            .ok_or("JWT_SECRET_ARN not set")?;
        let jwt_secret = get_secret(&secrets_client, jwt_secret_arn)
            .await
            .map_err(|e| format!("Failed to get JWT secret: {}", e))?;

        let store = Arc::new(PgInquiryStore::new(pool));
        let generator = ResponseGenerator::new(
            BedrockInvoker::new(bedrock_client),
            ModelConfig::from_env(),
        );
        let notifier = Arc::new(SesNotifier::new(
            ses_client,
            config.from_email.clone(),
            config.alert_email.clone(),
            config.alert_webhook_url.clone(),
        ));
        let company_context = std::env::var("COMPANY_CONTEXT").ok();

        Ok(Self {
            service: InquiryService::new(store, generator, notifier, company_context),
            jwt_secret,
        })
    }
}

fn parse_inquiry_id(segment: &str) -> Result<Uuid, Response<Body>> {
    Uuid::parse_str(segment).map_err(|_| {
        json_response(400, &ApiResponse::<()>::error("Invalid inquiry ID"))
            .expect("Failed to build response")
    })
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str().to_string();
    let raw_path = event.uri().path().to_string();
    // Strip /api stage prefix if present (API Gateway REST API includes stage in path)
    let path = raw_path.strip_prefix("/api").unwrap_or(&raw_path);

    info!("Inquiries request: {} {}", method, path);

    if method == "OPTIONS" {
        return preflight_response();
    }

    match (method.as_str(), path) {
        // Create inquiry
        ("POST", "/inquiries") => {
            let request: CreateInquiryRequest = parse_body!(event.body());

            let errors = request.validate();
            if !errors.is_empty() {
                return json_response(400, &ApiResponse::<()>::validation_errors(errors));
            }

            match state.service.create(request).await {
                Ok(created) => json_response(201, &ApiResponse::success(created)),
                Err(e) => domain_error_response(&e),
            }
        }

        // List inquiries by company or by customer email
        ("GET", "/inquiries") => {
            let params = event.query_string_parameters();
            let limit = params.first("limit").and_then(|l| l.parse::<i64>().ok());

            let result = if let Some(company_id) = params.first("companyId") {
                let status = params.first("status").map(str::to_string);
                state
                    .service
                    .list_by_company(company_id, status.as_deref(), limit)
                    .await
            } else if let Some(email) = params.first("email") {
                state.service.list_by_email(email, limit).await
            } else {
                return error_response(400, "Either companyId or email is required");
            };

            match result {
                Ok(inquiries) => {
                    let count = inquiries.len();
                    json_response(
                        200,
                        &ApiResponse::success(ListInquiriesResponse { inquiries, count }),
                    )
                }
                Err(e) => domain_error_response(&e),
            }
        }

        // Update status (staff only)
        _ if path.starts_with("/inquiries/") && path.ends_with("/status") && method == "PUT" => {
            if let Err(e) = authorize_admin(&state.jwt_secret, &event) {
                return domain_error_response(&e);
            }

            let segment = path
                .trim_start_matches("/inquiries/")
                .trim_end_matches("/status");
            let inquiry_id = match parse_inquiry_id(segment) {
                Ok(id) => id,
                Err(response) => return Ok(response),
            };

            let request: UpdateStatusRequest = parse_body!(event.body());

            match state.service.update_status(inquiry_id, request).await {
                Ok(updated) => json_response(200, &ApiResponse::success(updated)),
                Err(e) => domain_error_response(&e),
            }
        }

        // Escalate
        _ if path.starts_with("/inquiries/") && path.ends_with("/escalate") && method == "POST" => {
            let segment = path
                .trim_start_matches("/inquiries/")
                .trim_end_matches("/escalate");
            let inquiry_id = match parse_inquiry_id(segment) {
                Ok(id) => id,
                Err(response) => return Ok(response),
            };

            let request: EscalateRequest = if event.body().as_ref().is_empty() {
                EscalateRequest { reason: None }
            } else {
                parse_body!(event.body())
            };

            match state.service.escalate(inquiry_id, request.reason).await {
                Ok(escalated) => json_response(200, &ApiResponse::success(escalated)),
                Err(e) => domain_error_response(&e),
            }
        }

        // Get single inquiry
        _ if path.starts_with("/inquiries/") && method == "GET" => {
            let segment = path.trim_start_matches("/inquiries/");
            let inquiry_id = match parse_inquiry_id(segment) {
                Ok(id) => id,
                Err(response) => return Ok(response),
            };

            match state.service.get(inquiry_id).await {
                Ok(inquiry) => json_response(200, &ApiResponse::success(inquiry)),
                Err(e) => domain_error_response(&e),
            }
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
