//! Inquiry persistence.
//!
//! Handlers depend on the [`InquiryStore`] trait rather than a concrete
//! backend; production uses Postgres, tests use [`MemoryInquiryStore`].
//! The store enforces the forward-only status state machine inside its
//! conditional updates, so concurrent writers cannot move an inquiry
//! backwards.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Inquiry, InquiryRow, InquiryStatus, ESCALATED_RESPONSE_TIME_MINUTES};
use crate::{Error, Result};

/// Column list shared by every query that returns full rows.
const INQUIRY_COLUMNS: &str = r#"
    inquiry_id, company_id, customer_email, customer_password_hash,
    category, urgency, title, content, status,
    ai_response, human_response, escalation_reason,
    estimated_response_time, created_at, updated_at, resolved_at
"#;

/// Persistence operations for inquiries. Each call is atomic at the
/// single-record level; there are no multi-record transactions.
#[async_trait]
pub trait InquiryStore: Send + Sync {
    /// Insert a new record. The caller guarantees a fresh id.
    async fn create(&self, inquiry: &Inquiry) -> Result<()>;

    /// Fetch by id.
    async fn get(&self, inquiry_id: Uuid) -> Result<Option<Inquiry>>;

    /// Attach the AI response and move `pending -> ai_responded`.
    async fn update_ai_response(&self, inquiry_id: Uuid, response: &str) -> Result<Inquiry>;

    /// Staff status change. Rejects transitions the state machine does not
    /// allow with [`Error::Conflict`]; sets `resolved_at` on resolution.
    async fn update_status(
        &self,
        inquiry_id: Uuid,
        status: InquiryStatus,
        human_response: Option<&str>,
    ) -> Result<Inquiry>;

    /// Move to `escalated` and record the reason. Conflict if the inquiry
    /// is already escalated or resolved.
    async fn escalate(&self, inquiry_id: Uuid, reason: &str) -> Result<Inquiry>;

    /// Inquiries for one company, optionally filtered by status.
    async fn list_by_company(
        &self,
        company_id: &str,
        status: Option<InquiryStatus>,
        limit: i64,
    ) -> Result<Vec<Inquiry>>;

    /// Inquiries submitted by one customer email.
    async fn list_by_email(&self, email: &str, limit: i64) -> Result<Vec<Inquiry>>;
}

/// Postgres-backed store.
pub struct PgInquiryStore {
    pool: PgPool,
}

impl PgInquiryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InquiryStore for PgInquiryStore {
    async fn create(&self, inquiry: &Inquiry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inquiries (
                inquiry_id, company_id, customer_email, customer_password_hash,
                category, urgency, title, content, status,
                estimated_response_time, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(inquiry.inquiry_id)
        .bind(&inquiry.company_id)
        .bind(&inquiry.customer_email)
        .bind(&inquiry.customer_password_hash)
        .bind(&inquiry.category)
        .bind(inquiry.urgency.as_str())
        .bind(&inquiry.title)
        .bind(&inquiry.content)
        .bind(inquiry.status.as_str())
        .bind(inquiry.estimated_response_time)
        .bind(inquiry.created_at)
        .bind(inquiry.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, inquiry_id: Uuid) -> Result<Option<Inquiry>> {
        let row: Option<InquiryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM inquiries WHERE inquiry_id = $1",
            INQUIRY_COLUMNS
        ))
        .bind(inquiry_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Inquiry::from))
    }

    async fn update_ai_response(&self, inquiry_id: Uuid, response: &str) -> Result<Inquiry> {
        let row: Option<InquiryRow> = sqlx::query_as(&format!(
            r#"
            UPDATE inquiries
            SET ai_response = $2, status = 'ai_responded', updated_at = NOW()
            WHERE inquiry_id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            INQUIRY_COLUMNS
        ))
        .bind(inquiry_id)
        .bind(response)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(r.into()),
            // Either the record is gone or the status already moved on.
            None => match self.get(inquiry_id).await? {
                Some(current) => Err(Error::Conflict(format!(
                    "Inquiry is no longer pending (status: {})",
                    current.status.as_str()
                ))),
                None => Err(Error::NotFound("Inquiry not found".to_string())),
            },
        }
    }

    async fn update_status(
        &self,
        inquiry_id: Uuid,
        status: InquiryStatus,
        human_response: Option<&str>,
    ) -> Result<Inquiry> {
        let current = self
            .get(inquiry_id)
            .await?
            .ok_or_else(|| Error::NotFound("Inquiry not found".to_string()))?;

        if !current.status.can_transition_to(status) {
            return Err(Error::Conflict(format!(
                "Cannot transition from {} to {}",
                current.status.as_str(),
                status.as_str()
            )));
        }

        // Conditional on the status we just observed; a concurrent writer
        // that moved the inquiry first wins.
        let row: Option<InquiryRow> = sqlx::query_as(&format!(
            r#"
            UPDATE inquiries
            SET status = $3,
                human_response = COALESCE($4, human_response),
                resolved_at = CASE WHEN $3 = 'resolved' THEN NOW() ELSE resolved_at END,
                updated_at = NOW()
            WHERE inquiry_id = $1 AND status = $2
            RETURNING {}
            "#,
            INQUIRY_COLUMNS
        ))
        .bind(inquiry_id)
        .bind(current.status.as_str())
        .bind(status.as_str())
        .bind(human_response)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Inquiry::from)
            .ok_or_else(|| Error::Conflict("Inquiry was modified concurrently".to_string()))
    }

    async fn escalate(&self, inquiry_id: Uuid, reason: &str) -> Result<Inquiry> {
        let row: Option<InquiryRow> = sqlx::query_as(&format!(
            r#"
            UPDATE inquiries
            SET status = 'escalated',
                escalation_reason = $2,
                estimated_response_time = $3,
                updated_at = NOW()
            WHERE inquiry_id = $1 AND status IN ('pending', 'ai_responded')
            RETURNING {}
            "#,
            INQUIRY_COLUMNS
        ))
        .bind(inquiry_id)
        .bind(reason)
        .bind(ESCALATED_RESPONSE_TIME_MINUTES)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(r.into()),
            None => match self.get(inquiry_id).await? {
                Some(current) if current.status == InquiryStatus::Escalated => {
                    Err(Error::Conflict("Inquiry is already escalated".to_string()))
                }
                Some(current) => Err(Error::Conflict(format!(
                    "Cannot escalate a {} inquiry",
                    current.status.as_str()
                ))),
                None => Err(Error::NotFound("Inquiry not found".to_string())),
            },
        }
    }

    async fn list_by_company(
        &self,
        company_id: &str,
        status: Option<InquiryStatus>,
        limit: i64,
    ) -> Result<Vec<Inquiry>> {
        let rows: Vec<InquiryRow> = match status {
            Some(status) => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {} FROM inquiries
                    WHERE company_id = $1 AND status = $2
                    ORDER BY created_at DESC
                    LIMIT $3
                    "#,
                    INQUIRY_COLUMNS
                ))
                .bind(company_id)
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {} FROM inquiries
                    WHERE company_id = $1
                    ORDER BY created_at DESC
                    LIMIT $2
                    "#,
                    INQUIRY_COLUMNS
                ))
                .bind(company_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(Inquiry::from).collect())
    }

    async fn list_by_email(&self, email: &str, limit: i64) -> Result<Vec<Inquiry>> {
        let rows: Vec<InquiryRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM inquiries
            WHERE customer_email = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            INQUIRY_COLUMNS
        ))
        .bind(email)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Inquiry::from).collect())
    }
}

/// In-memory store with the same semantics as the Postgres one.
///
/// Used by unit tests and local smoke runs; replaces the module-level dict
/// the original prototype kept.
#[derive(Default)]
pub struct MemoryInquiryStore {
    records: RwLock<HashMap<Uuid, Inquiry>>,
}

impl MemoryInquiryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InquiryStore for MemoryInquiryStore {
    async fn create(&self, inquiry: &Inquiry) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&inquiry.inquiry_id) {
            return Err(Error::Internal("Duplicate inquiry id".to_string()));
        }
        records.insert(inquiry.inquiry_id, inquiry.clone());
        Ok(())
    }

    async fn get(&self, inquiry_id: Uuid) -> Result<Option<Inquiry>> {
        Ok(self.records.read().await.get(&inquiry_id).cloned())
    }

    async fn update_ai_response(&self, inquiry_id: Uuid, response: &str) -> Result<Inquiry> {
        let mut records = self.records.write().await;
        let inquiry = records
            .get_mut(&inquiry_id)
            .ok_or_else(|| Error::NotFound("Inquiry not found".to_string()))?;

        if inquiry.status != InquiryStatus::Pending {
            return Err(Error::Conflict(format!(
                "Inquiry is no longer pending (status: {})",
                inquiry.status.as_str()
            )));
        }

        inquiry.ai_response = Some(response.to_string());
        inquiry.status = InquiryStatus::AiResponded;
        inquiry.updated_at = Utc::now();
        Ok(inquiry.clone())
    }

    async fn update_status(
        &self,
        inquiry_id: Uuid,
        status: InquiryStatus,
        human_response: Option<&str>,
    ) -> Result<Inquiry> {
        let mut records = self.records.write().await;
        let inquiry = records
            .get_mut(&inquiry_id)
            .ok_or_else(|| Error::NotFound("Inquiry not found".to_string()))?;

        if !inquiry.status.can_transition_to(status) {
            return Err(Error::Conflict(format!(
                "Cannot transition from {} to {}",
                inquiry.status.as_str(),
                status.as_str()
            )));
        }

        inquiry.status = status;
        if let Some(response) = human_response {
            inquiry.human_response = Some(response.to_string());
        }
        if status == InquiryStatus::Resolved {
            inquiry.resolved_at = Some(Utc::now());
        }
        inquiry.updated_at = Utc::now();
        Ok(inquiry.clone())
    }

    async fn escalate(&self, inquiry_id: Uuid, reason: &str) -> Result<Inquiry> {
        let mut records = self.records.write().await;
        let inquiry = records
            .get_mut(&inquiry_id)
            .ok_or_else(|| Error::NotFound("Inquiry not found".to_string()))?;

        match inquiry.status {
            InquiryStatus::Escalated => {
                return Err(Error::Conflict("Inquiry is already escalated".to_string()))
            }
            InquiryStatus::Resolved => {
                return Err(Error::Conflict("Cannot escalate a resolved inquiry".to_string()))
            }
            InquiryStatus::Pending | InquiryStatus::AiResponded => {}
        }

        inquiry.status = InquiryStatus::Escalated;
        inquiry.escalation_reason = Some(reason.to_string());
        inquiry.estimated_response_time = ESCALATED_RESPONSE_TIME_MINUTES;
        inquiry.updated_at = Utc::now();
        Ok(inquiry.clone())
    }

    async fn list_by_company(
        &self,
        company_id: &str,
        status: Option<InquiryStatus>,
        limit: i64,
    ) -> Result<Vec<Inquiry>> {
        let records = self.records.read().await;
        let mut matches: Vec<Inquiry> = records
            .values()
            .filter(|i| i.company_id == company_id)
            .filter(|i| status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(limit.max(0) as usize);
        Ok(matches)
    }

    async fn list_by_email(&self, email: &str, limit: i64) -> Result<Vec<Inquiry>> {
        let records = self.records.read().await;
        let mut matches: Vec<Inquiry> = records
            .values()
            .filter(|i| i.customer_email == email)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(limit.max(0) as usize);
        Ok(matches)
    }
}
