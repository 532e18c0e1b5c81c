//! Configuration management for Lambda functions.

use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database host
    pub db_host: String,
    /// Database name
    pub db_name: String,
    /// ARN of the secret containing database credentials
    pub db_secret_arn: String,
    /// ARN of the secret containing the staff JWT signing key
    /// (only needed by Lambdas that issue or check staff tokens)
    pub jwt_secret_arn: Option<String>,
    /// ARN of the secret containing the staff login account
    pub staff_secret_arn: Option<String>,
    /// AWS region
    pub aws_region: String,
    /// Sender address for escalation emails
    pub from_email: String,
    /// Operator address that receives escalation alerts
    pub alert_email: String,
    /// Optional webhook for escalation alerts (ops channel)
    pub alert_webhook_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            db_host: env::var("DATABASE_HOST")?,
            db_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "cs_inquiries".to_string()),
            db_secret_arn: env::var("DATABASE_URL_SECRET_ARN")?,
            jwt_secret_arn: env::var("JWT_SECRET_ARN").ok(),
            staff_secret_arn: env::var("STAFF_ACCOUNT_SECRET_ARN").ok(),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            from_email: env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@cs-inquiries.app".to_string()),
            alert_email: env::var("ALERT_EMAIL")
                .unwrap_or_else(|_| "support-staff@cs-inquiries.app".to_string()),
            alert_webhook_url: env::var("ALERT_WEBHOOK_URL").ok(),
        })
    }
}
