//! Escalation notification delivery.
//!
//! Notification is best-effort by contract: the escalation state change
//! has already been persisted by the time anything here runs, and a
//! delivery failure must never roll it back.

use async_trait::async_trait;
use aws_sdk_ses::types::{Body, Content, Destination, Message};
use tracing::{info, warn};

use crate::models::Inquiry;
use crate::{Error, Result};

/// Sink for escalation alerts.
#[async_trait]
pub trait EscalationNotifier: Send + Sync {
    /// Notify a human operator that an inquiry needs attention.
    async fn notify_escalation(&self, inquiry: &Inquiry, reason: &str) -> Result<()>;
}

/// SES email to the operator address, plus an optional webhook post for
/// the ops channel.
pub struct SesNotifier {
    ses_client: aws_sdk_ses::Client,
    http_client: reqwest::Client,
    from_email: String,
    alert_email: String,
    webhook_url: Option<String>,
}

impl SesNotifier {
    pub fn new(
        ses_client: aws_sdk_ses::Client,
        from_email: String,
        alert_email: String,
        webhook_url: Option<String>,
    ) -> Self {
        Self {
            ses_client,
            http_client: reqwest::Client::new(),
            from_email,
            alert_email,
            webhook_url,
        }
    }

    async fn send_email(&self, inquiry: &Inquiry, reason: &str) -> Result<()> {
        let subject_text = format!("[긴급] 문의 에스컬레이션: {}", inquiry.title);
        let body_text = format!(
            "문의 ID: {}\n제목: {}\n고객 이메일: {}\n카테고리: {}\n에스컬레이션 사유: {}\n\n즉시 대응이 필요합니다.",
            inquiry.inquiry_id, inquiry.title, inquiry.customer_email, inquiry.category, reason
        );

        let subject = Content::builder()
            .data(subject_text)
            .charset("UTF-8")
            .build()
            .map_err(|e| Error::Aws(format!("Failed to build subject: {}", e)))?;

        let text_content = Content::builder()
            .data(body_text)
            .charset("UTF-8")
            .build()
            .map_err(|e| Error::Aws(format!("Failed to build body: {}", e)))?;

        let body = Body::builder().text(text_content).build();

        let message = Message::builder().subject(subject).body(body).build();

        let destination = Destination::builder()
            .to_addresses(&self.alert_email)
            .build();

        self.ses_client
            .send_email()
            .source(&self.from_email)
            .destination(destination)
            .message(message)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to send escalation email: {}", e)))?;

        Ok(())
    }

    async fn send_webhook(&self, url: &str, inquiry: &Inquiry, reason: &str) -> Result<()> {
        let payload = serde_json::json!({
            "text": format!(
                "Inquiry {} escalated: {} (reason: {})",
                inquiry.inquiry_id, inquiry.title, reason
            ),
        });

        let response = self
            .http_client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("Webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "Webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EscalationNotifier for SesNotifier {
    async fn notify_escalation(&self, inquiry: &Inquiry, reason: &str) -> Result<()> {
        self.send_email(inquiry, reason).await?;

        // The webhook is a secondary channel; failure only logs.
        if let Some(url) = &self.webhook_url {
            if let Err(e) = self.send_webhook(url, inquiry, reason).await {
                warn!(inquiry_id = %inquiry.inquiry_id, error = %e, "Escalation webhook failed");
            }
        }

        info!(inquiry_id = %inquiry.inquiry_id, "Escalation notification sent");
        Ok(())
    }
}

/// Log-only notifier for tests and local runs.
#[derive(Default)]
pub struct NoopNotifier;

#[async_trait]
impl EscalationNotifier for NoopNotifier {
    async fn notify_escalation(&self, inquiry: &Inquiry, reason: &str) -> Result<()> {
        info!(inquiry_id = %inquiry.inquiry_id, reason = %reason, "Escalation (noop notifier)");
        Ok(())
    }
}
