//! Inquiry lifecycle orchestration.
//!
//! One service object drives an inquiry through
//! `pending -> ai_responded -> {escalated, resolved}`: validation,
//! persistence, AI generation, escalation, and notification. Handlers stay
//! thin HTTP adapters over this type.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai::{ModelInvoker, ResponseGenerator};
use crate::models::{
    CreateInquiryRequest, CreateInquiryResponse, EscalateResponse, Inquiry, InquiryStatus,
    UpdateStatusRequest, Urgency, DEFAULT_RESPONSE_TIME_MINUTES,
};
use crate::notify::EscalationNotifier;
use crate::password::{hash_password, verify_password};
use crate::store::InquiryStore;
use crate::{Error, Result};

/// Listings never return more than this many records per request.
pub const MAX_LIST_LIMIT: i64 = 50;

/// Fallback reason recorded when the customer escalates without one.
pub const DEFAULT_ESCALATION_REASON: &str = "Customer requested human assistance";

/// Orchestrates validation, persistence, AI generation, and escalation.
pub struct InquiryService<I: ModelInvoker> {
    store: Arc<dyn InquiryStore>,
    generator: ResponseGenerator<I>,
    notifier: Arc<dyn EscalationNotifier>,
    /// Company blurb embedded into the AI prompt, if configured.
    company_context: Option<String>,
}

impl<I: ModelInvoker> InquiryService<I> {
    pub fn new(
        store: Arc<dyn InquiryStore>,
        generator: ResponseGenerator<I>,
        notifier: Arc<dyn EscalationNotifier>,
        company_context: Option<String>,
    ) -> Self {
        Self {
            store,
            generator,
            notifier,
            company_context,
        }
    }

    /// Create an inquiry: validate, persist as pending, generate the AI
    /// response, and attach it. A storage failure *after* the inquiry was
    /// created degrades to a partial success carrying a warning instead of
    /// erasing the creation.
    pub async fn create(&self, request: CreateInquiryRequest) -> Result<CreateInquiryResponse> {
        let errors = request.validate();
        if !errors.is_empty() {
            return Err(Error::Validation(errors.join(", ")));
        }

        let customer_password_hash = match request.customer_password.as_deref() {
            Some(password) if !password.is_empty() => Some(hash_password(password)?),
            _ => None,
        };

        let now = chrono::Utc::now();
        let inquiry = Inquiry {
            inquiry_id: Uuid::new_v4(),
            company_id: request.company_id.unwrap_or_default(),
            customer_email: request.customer_email.unwrap_or_default(),
            customer_password_hash,
            category: request.category.unwrap_or_else(|| "general".to_string()),
            urgency: request
                .urgency
                .as_deref()
                .and_then(Urgency::parse)
                .unwrap_or(Urgency::Medium),
            title: request.title.unwrap_or_default(),
            content: request.content.unwrap_or_default(),
            status: InquiryStatus::Pending,
            ai_response: None,
            human_response: None,
            escalation_reason: None,
            estimated_response_time: DEFAULT_RESPONSE_TIME_MINUTES,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        };

        // A failure here is fatal for the whole request; nothing was created.
        self.store.create(&inquiry).await?;
        info!(inquiry_id = %inquiry.inquiry_id, company_id = %inquiry.company_id, "Inquiry created");

        let ai_response = self
            .generator
            .generate(&inquiry, self.company_context.as_deref())
            .await;

        match self
            .store
            .update_ai_response(inquiry.inquiry_id, &ai_response)
            .await
        {
            Ok(updated) => Ok(CreateInquiryResponse {
                inquiry_id: updated.inquiry_id,
                status: updated.status,
                ai_response: updated.ai_response,
                estimated_response_time: updated.estimated_response_time,
                warning: None,
            }),
            Err(e) => {
                // The inquiry exists; surface the response text and a
                // warning rather than failing the creation.
                warn!(
                    inquiry_id = %inquiry.inquiry_id,
                    error = %e,
                    "Inquiry created but AI response could not be persisted"
                );
                Ok(CreateInquiryResponse {
                    inquiry_id: inquiry.inquiry_id,
                    status: InquiryStatus::Pending,
                    ai_response: Some(ai_response),
                    estimated_response_time: inquiry.estimated_response_time,
                    warning: Some(
                        "AI response could not be saved; the inquiry remains pending".to_string(),
                    ),
                })
            }
        }
    }

    /// Fetch one inquiry; a missing id is a reported not-found, never a 500.
    pub async fn get(&self, inquiry_id: Uuid) -> Result<Inquiry> {
        self.store
            .get(inquiry_id)
            .await?
            .ok_or_else(|| Error::NotFound("Inquiry not found".to_string()))
    }

    /// Inquiries for a company; empty results are an empty list, not an error.
    pub async fn list_by_company(
        &self,
        company_id: &str,
        status_filter: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<Inquiry>> {
        let status = match status_filter {
            Some(s) => Some(
                InquiryStatus::parse(s)
                    .ok_or_else(|| Error::Validation(format!("Invalid status filter: {}", s)))?,
            ),
            None => None,
        };

        self.store
            .list_by_company(company_id, status, clamp_limit(limit))
            .await
    }

    /// Customer self-service "my inquiries" view.
    pub async fn list_by_email(&self, email: &str, limit: Option<i64>) -> Result<Vec<Inquiry>> {
        self.store.list_by_email(email, clamp_limit(limit)).await
    }

    /// Staff status change. Unknown status values are validation errors;
    /// illegal transitions surface as conflicts from the store.
    pub async fn update_status(
        &self,
        inquiry_id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<Inquiry> {
        let status = InquiryStatus::parse(&request.status).ok_or_else(|| {
            Error::Validation(format!(
                "Invalid status: {} (expected pending, ai_responded, escalated, or resolved)",
                request.status
            ))
        })?;

        self.store
            .update_status(inquiry_id, status, request.human_response.as_deref())
            .await
    }

    /// Escalate to a human. The state change is the primary effect;
    /// operator notification is best-effort and never rolls it back.
    pub async fn escalate(
        &self,
        inquiry_id: Uuid,
        reason: Option<String>,
    ) -> Result<EscalateResponse> {
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ESCALATION_REASON.to_string());

        let escalated = self.store.escalate(inquiry_id, &reason).await?;

        let email_sent = match self.notifier.notify_escalation(&escalated, &reason).await {
            Ok(()) => true,
            Err(e) => {
                warn!(inquiry_id = %inquiry_id, error = %e, "Escalation notification failed");
                false
            }
        };

        Ok(EscalateResponse {
            inquiry_id: escalated.inquiry_id,
            status: escalated.status,
            reason,
            email_sent,
            estimated_response_time: escalated.estimated_response_time,
        })
    }

    /// Verify a customer's self-service credentials against the hashes
    /// stored on that email's inquiries.
    pub async fn verify_customer(&self, email: &str, password: &str) -> Result<bool> {
        let inquiries = self.store.list_by_email(email, MAX_LIST_LIMIT).await?;

        Ok(inquiries
            .iter()
            .filter_map(|i| i.customer_password_hash.as_deref())
            .any(|hash| verify_password(password, hash)))
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(MAX_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ModelConfig, ModelInvoker};
    use crate::notify::NoopNotifier;
    use crate::store::MemoryInquiryStore;
    use async_trait::async_trait;

    /// Invoker that always answers with the same text.
    struct CannedInvoker(&'static str);

    #[async_trait]
    impl ModelInvoker for CannedInvoker {
        async fn invoke(
            &self,
            _model_id: &str,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// Invoker that always fails, forcing the canned-text path.
    struct DownInvoker;

    #[async_trait]
    impl ModelInvoker for DownInvoker {
        async fn invoke(
            &self,
            _model_id: &str,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String> {
            Err(Error::Aws("model unavailable".to_string()))
        }
    }

    /// Store wrapper whose AI-response persistence always fails.
    struct BrokenAiUpdateStore(MemoryInquiryStore);

    #[async_trait]
    impl InquiryStore for BrokenAiUpdateStore {
        async fn create(&self, inquiry: &Inquiry) -> Result<()> {
            self.0.create(inquiry).await
        }
        async fn get(&self, inquiry_id: Uuid) -> Result<Option<Inquiry>> {
            self.0.get(inquiry_id).await
        }
        async fn update_ai_response(&self, _inquiry_id: Uuid, _response: &str) -> Result<Inquiry> {
            Err(Error::Database(sqlx::Error::PoolTimedOut))
        }
        async fn update_status(
            &self,
            inquiry_id: Uuid,
            status: InquiryStatus,
            human_response: Option<&str>,
        ) -> Result<Inquiry> {
            self.0.update_status(inquiry_id, status, human_response).await
        }
        async fn escalate(&self, inquiry_id: Uuid, reason: &str) -> Result<Inquiry> {
            self.0.escalate(inquiry_id, reason).await
        }
        async fn list_by_company(
            &self,
            company_id: &str,
            status: Option<InquiryStatus>,
            limit: i64,
        ) -> Result<Vec<Inquiry>> {
            self.0.list_by_company(company_id, status, limit).await
        }
        async fn list_by_email(&self, email: &str, limit: i64) -> Result<Vec<Inquiry>> {
            self.0.list_by_email(email, limit).await
        }
    }

    /// Notifier that always fails.
    struct FailingNotifier;

    #[async_trait]
    impl EscalationNotifier for FailingNotifier {
        async fn notify_escalation(&self, _inquiry: &Inquiry, _reason: &str) -> Result<()> {
            Err(Error::Aws("ses unavailable".to_string()))
        }
    }

    fn service_with(
        store: Arc<dyn InquiryStore>,
        notifier: Arc<dyn EscalationNotifier>,
    ) -> InquiryService<CannedInvoker> {
        InquiryService::new(
            store,
            ResponseGenerator::new(CannedInvoker("AI 답변입니다"), ModelConfig::default()),
            notifier,
            None,
        )
    }

    fn service() -> InquiryService<CannedInvoker> {
        service_with(Arc::new(MemoryInquiryStore::new()), Arc::new(NoopNotifier))
    }

    fn create_request() -> CreateInquiryRequest {
        CreateInquiryRequest {
            company_id: Some("c1".to_string()),
            customer_email: Some("a@b.com".to_string()),
            customer_password: None,
            category: None,
            title: Some("t".to_string()),
            content: Some("c".to_string()),
            urgency: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let svc = service();
        let created = svc.create(create_request()).await.unwrap();
        assert_eq!(created.status, InquiryStatus::AiResponded);
        assert_eq!(created.ai_response.as_deref(), Some("AI 답변입니다"));
        assert_eq!(created.estimated_response_time, DEFAULT_RESPONSE_TIME_MINUTES);

        let fetched = svc.get(created.inquiry_id).await.unwrap();
        assert_eq!(fetched.company_id, "c1");
        assert_eq!(fetched.category, "general");
        assert!(matches!(
            fetched.status,
            InquiryStatus::Pending | InquiryStatus::AiResponded
        ));
        assert!(fetched.created_at <= fetched.updated_at);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let svc = service();
        let request = CreateInquiryRequest {
            company_id: None,
            customer_email: Some("not-an-email".to_string()),
            customer_password: None,
            category: None,
            title: None,
            content: None,
            urgency: None,
        };
        let err = svc.create(request).await.unwrap_err();
        match err {
            Error::Validation(msg) => {
                assert!(msg.contains("companyId is required"));
                assert!(msg.contains("title is required"));
                assert!(msg.contains("content is required"));
                assert!(msg.contains("Invalid email format"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_with_unreachable_model_still_responds() {
        let svc = InquiryService::new(
            Arc::new(MemoryInquiryStore::new()),
            ResponseGenerator::new(DownInvoker, ModelConfig::default()),
            Arc::new(NoopNotifier),
            None,
        );
        let created = svc.create(create_request()).await.unwrap();
        // Canned text still counts as an AI response.
        assert_eq!(created.status, InquiryStatus::AiResponded);
        assert!(!created.ai_response.unwrap().trim().is_empty());
    }

    #[tokio::test]
    async fn test_create_survives_ai_persistence_failure() {
        let svc = service_with(
            Arc::new(BrokenAiUpdateStore(MemoryInquiryStore::new())),
            Arc::new(NoopNotifier),
        );
        let created = svc.create(create_request()).await.unwrap();
        assert_eq!(created.status, InquiryStatus::Pending);
        assert!(created.warning.is_some());
        assert!(created.ai_response.is_some());

        // The inquiry itself is visible.
        let fetched = svc.get(created.inquiry_id).await.unwrap();
        assert_eq!(fetched.status, InquiryStatus::Pending);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let svc = service();
        let err = svc.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_empty_company_is_empty_not_error() {
        let svc = service();
        let listed = svc.list_by_company("no-such-company", None, None).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_list_rejects_bad_status_filter() {
        let svc = service();
        let err = svc
            .list_by_company("c1", Some("sideways"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_limit_is_clamped() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(10)), 10);
        assert_eq!(clamp_limit(Some(500)), 50);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-3)), 1);
    }

    #[tokio::test]
    async fn test_update_status_rejects_unknown_value() {
        let svc = service();
        let created = svc.create(create_request()).await.unwrap();
        let err = svc
            .update_status(
                created.inquiry_id,
                UpdateStatusRequest {
                    status: "in_progress".to_string(),
                    human_response: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_resolve_with_human_response() {
        let svc = service();
        let created = svc.create(create_request()).await.unwrap();
        let resolved = svc
            .update_status(
                created.inquiry_id,
                UpdateStatusRequest {
                    status: "resolved".to_string(),
                    human_response: Some("처리 완료했습니다".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(resolved.status, InquiryStatus::Resolved);
        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.human_response.as_deref(), Some("처리 완료했습니다"));
    }

    #[tokio::test]
    async fn test_escalation_conflict_scenario() {
        let svc = service();
        let created = svc.create(create_request()).await.unwrap();

        let escalated = svc.escalate(created.inquiry_id, None).await.unwrap();
        assert_eq!(escalated.status, InquiryStatus::Escalated);
        assert_eq!(escalated.reason, DEFAULT_ESCALATION_REASON);
        assert_eq!(escalated.estimated_response_time, 120);
        assert!(escalated.email_sent);

        let err = svc
            .escalate(created.inquiry_id, Some("again".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Status unchanged by the rejected second escalation.
        let current = svc.get(created.inquiry_id).await.unwrap();
        assert_eq!(current.status, InquiryStatus::Escalated);
    }

    #[tokio::test]
    async fn test_escalation_survives_notification_failure() {
        let svc = service_with(
            Arc::new(MemoryInquiryStore::new()),
            Arc::new(FailingNotifier),
        );
        let created = svc.create(create_request()).await.unwrap();
        let escalated = svc.escalate(created.inquiry_id, None).await.unwrap();

        assert_eq!(escalated.status, InquiryStatus::Escalated);
        assert!(!escalated.email_sent);

        // The state change stuck.
        let current = svc.get(created.inquiry_id).await.unwrap();
        assert_eq!(current.status, InquiryStatus::Escalated);
    }

    #[tokio::test]
    async fn test_escalate_missing_inquiry() {
        let svc = service();
        let err = svc.escalate(Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_customer_credentials_round_trip() {
        let svc = service();
        let mut request = create_request();
        request.customer_password = Some("secret-pw".to_string());
        svc.create(request).await.unwrap();

        assert!(svc.verify_customer("a@b.com", "secret-pw").await.unwrap());
        assert!(!svc.verify_customer("a@b.com", "wrong-pw").await.unwrap());
        assert!(!svc.verify_customer("other@b.com", "secret-pw").await.unwrap());
    }

    #[tokio::test]
    async fn test_customer_without_password_cannot_login() {
        let svc = service();
        svc.create(create_request()).await.unwrap();
        assert!(!svc.verify_customer("a@b.com", "").await.unwrap());
    }
}
