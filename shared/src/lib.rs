//! Shared library for the customer-service inquiry Lambda functions.
//!
//! This crate provides the domain model, storage, AI response pipeline,
//! and common utilities used across all Lambda functions.

pub mod ai;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod password;
pub mod secrets;
pub mod store;

pub use ai::{BedrockInvoker, ModelConfig, ModelInvoker, ResponseGenerator};
pub use auth::{authorize, authorize_admin, issue_token, verify_token, AuthenticatedStaff};
pub use config::Config;
pub use error::{Error, Result};
pub use http::ApiResponse;
pub use lifecycle::InquiryService;
pub use models::{Inquiry, InquiryStatus, Urgency};
pub use notify::{EscalationNotifier, NoopNotifier, SesNotifier};
pub use secrets::{get_database_credentials, get_secret, get_staff_account, DatabaseCredentials};
pub use store::{InquiryStore, MemoryInquiryStore, PgInquiryStore};
