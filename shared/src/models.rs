//! Domain models for the inquiry service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minutes quoted to the customer at creation time.
pub const DEFAULT_RESPONSE_TIME_MINUTES: i32 = 15;
/// Minutes quoted once an inquiry needs a human.
pub const ESCALATED_RESPONSE_TIME_MINUTES: i32 = 120;

/// Lifecycle status of an inquiry.
///
/// Transitions only move forward:
/// `pending -> ai_responded -> {escalated, resolved}`, with `escalated`
/// also reachable directly from `pending` and `resolved` terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    Pending,
    AiResponded,
    Escalated,
    Resolved,
}

impl InquiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::Pending => "pending",
            InquiryStatus::AiResponded => "ai_responded",
            InquiryStatus::Escalated => "escalated",
            InquiryStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InquiryStatus::Pending),
            "ai_responded" => Some(InquiryStatus::AiResponded),
            "escalated" => Some(InquiryStatus::Escalated),
            "resolved" => Some(InquiryStatus::Resolved),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(&self, next: InquiryStatus) -> bool {
        use InquiryStatus::*;
        matches!(
            (self, next),
            (Pending, AiResponded) | (Pending, Escalated) | (AiResponded, Escalated)
                | (AiResponded, Resolved)
                | (Escalated, Resolved)
        )
    }
}

/// Customer-declared urgency of an inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Urgency::Low),
            "medium" => Some(Urgency::Medium),
            "high" => Some(Urgency::High),
            _ => None,
        }
    }
}

/// A customer inquiry tracked through its status lifecycle.
///
/// `customer_password_hash` is deliberately excluded from serialization so
/// no handler can leak it, regardless of which path returns the record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub inquiry_id: Uuid,
    pub company_id: String,
    pub customer_email: String,
    #[serde(skip_serializing)]
    pub customer_password_hash: Option<String>,
    pub category: String,
    pub urgency: Urgency,
    pub title: String,
    pub content: String,
    pub status: InquiryStatus,
    pub ai_response: Option<String>,
    pub human_response: Option<String>,
    pub escalation_reason: Option<String>,
    pub estimated_response_time: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Database row for an inquiry; status/urgency come back as text.
#[derive(Debug, sqlx::FromRow)]
pub struct InquiryRow {
    pub inquiry_id: Uuid,
    pub company_id: String,
    pub customer_email: String,
    pub customer_password_hash: Option<String>,
    pub category: String,
    pub urgency: String,
    pub title: String,
    pub content: String,
    pub status: String,
    pub ai_response: Option<String>,
    pub human_response: Option<String>,
    pub escalation_reason: Option<String>,
    pub estimated_response_time: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<InquiryRow> for Inquiry {
    fn from(row: InquiryRow) -> Self {
        Self {
            inquiry_id: row.inquiry_id,
            company_id: row.company_id,
            customer_email: row.customer_email,
            customer_password_hash: row.customer_password_hash,
            category: row.category,
            urgency: Urgency::parse(&row.urgency).unwrap_or(Urgency::Medium),
            title: row.title,
            content: row.content,
            status: InquiryStatus::parse(&row.status).unwrap_or(InquiryStatus::Pending),
            ai_response: row.ai_response,
            human_response: row.human_response,
            escalation_reason: row.escalation_reason,
            estimated_response_time: row.estimated_response_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
            resolved_at: row.resolved_at,
        }
    }
}

/// Request payload for `POST /inquiries`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInquiryRequest {
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_password: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
}

impl CreateInquiryRequest {
    /// Field-level validation; returns one message per failed check.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.company_id.as_deref().unwrap_or("").is_empty() {
            errors.push("companyId is required".to_string());
        }

        match self.customer_email.as_deref() {
            None | Some("") => errors.push("customerEmail is required".to_string()),
            Some(email) if !is_valid_email(email) => {
                errors.push("Invalid email format".to_string())
            }
            _ => {}
        }

        if self.title.as_deref().unwrap_or("").is_empty() {
            errors.push("title is required".to_string());
        }

        if self.content.as_deref().unwrap_or("").is_empty() {
            errors.push("content is required".to_string());
        }

        if let Some(urgency) = self.urgency.as_deref() {
            if Urgency::parse(urgency).is_none() {
                errors.push("urgency must be low, medium, or high".to_string());
            }
        }

        errors
    }
}

/// Request payload for `PUT /inquiries/{id}/status`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub human_response: Option<String>,
}

/// Request payload for `POST /inquiries/{id}/escalate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Response payload for a successful creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInquiryResponse {
    pub inquiry_id: Uuid,
    pub status: InquiryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,
    pub estimated_response_time: i32,
    /// Present when the inquiry was created but the AI response could not
    /// be persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Response payload for listings.
#[derive(Debug, Serialize)]
pub struct ListInquiriesResponse {
    pub inquiries: Vec<Inquiry>,
    pub count: usize,
}

/// Response payload for a successful escalation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateResponse {
    pub inquiry_id: Uuid,
    pub status: InquiryStatus,
    pub reason: String,
    pub email_sent: bool,
    pub estimated_response_time: i32,
}

/// Email sanity check matching the original validation rules: one `@`,
/// non-empty local part, dotted domain with a 2+ character suffix.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let Some(domain) = parts.next() else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}
