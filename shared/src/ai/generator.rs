//! AI response generation.
//!
//! Classifies the inquiry, selects a model tier, calls Bedrock, and
//! degrades through a fallback model and finally canned text. This module
//! never returns an error to its caller; a customer always gets a reply.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client as BedrockClient;
use std::time::Duration;
use tracing::{error, info, warn};

use super::classify::{classify_complexity, classify_priority};
use super::models::ModelConfig;
use crate::models::Inquiry;
use crate::{Error, Result};

/// Outbound model calls are cut off after one network round trip's worth
/// of patience; a timeout counts as an invocation failure.
const INVOKE_TIMEOUT: Duration = Duration::from_secs(25);

/// Prompt-in, text-out model invocation. Implemented by the Bedrock client
/// in production and by canned fakes in tests.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(
        &self,
        model_id: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String>;
}

/// Bedrock `invoke_model` with the Anthropic messages body format.
pub struct BedrockInvoker {
    client: BedrockClient,
}

impl BedrockInvoker {
    pub fn new(client: BedrockClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ModelInvoker for BedrockInvoker {
    async fn invoke(
        &self,
        model_id: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let body = serde_json::json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": [{
                "role": "user",
                "content": prompt,
            }],
        });

        let response = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(serde_json::to_vec(&body)?))
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Bedrock invocation failed: {}", e)))?;

        let payload: serde_json::Value = serde_json::from_slice(response.body().as_ref())?;

        payload["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Aws("Bedrock response had no text content".to_string()))
    }
}

/// Generates customer-facing responses for new inquiries.
pub struct ResponseGenerator<I: ModelInvoker> {
    invoker: I,
    config: ModelConfig,
}

impl<I: ModelInvoker> ResponseGenerator<I> {
    pub fn new(invoker: I, config: ModelConfig) -> Self {
        Self { invoker, config }
    }

    /// Produce a response for the inquiry. Infallible by contract: model
    /// failures degrade to the fallback tier and then to canned text.
    pub async fn generate(&self, inquiry: &Inquiry, company_context: Option<&str>) -> String {
        let complexity = classify_complexity(&inquiry.content, &inquiry.category);
        let priority = classify_priority(inquiry.urgency.as_str());
        let primary = self.config.select_model(complexity, priority).to_string();

        let prompt = build_prompt(inquiry, company_context);

        info!(
            inquiry_id = %inquiry.inquiry_id,
            model = %primary,
            complexity = ?complexity,
            priority = ?priority,
            "Generating AI response"
        );

        match self.try_invoke(&primary, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    inquiry_id = %inquiry.inquiry_id,
                    model = %primary,
                    error = %e,
                    "Primary model failed, retrying on fallback"
                );
                match self.try_invoke(&self.config.fallback_model, &prompt).await {
                    Ok(text) => text,
                    Err(e) => {
                        error!(
                            inquiry_id = %inquiry.inquiry_id,
                            model = %self.config.fallback_model,
                            error = %e,
                            "Fallback model failed, using canned response"
                        );
                        canned_response(&inquiry.category, &inquiry.title)
                    }
                }
            }
        }
    }

    /// One invocation with timeout; blank output counts as a failure.
    async fn try_invoke(&self, model_id: &str, prompt: &str) -> Result<String> {
        let call = self.invoker.invoke(
            model_id,
            prompt,
            self.config.max_tokens,
            self.config.temperature,
        );

        let text = tokio::time::timeout(INVOKE_TIMEOUT, call)
            .await
            .map_err(|_| Error::Aws(format!("Model {} timed out", model_id)))??;

        if text.trim().is_empty() {
            return Err(Error::Aws(format!("Model {} returned empty text", model_id)));
        }
        Ok(text)
    }
}

/// Build the customer-service prompt from the inquiry fields.
fn build_prompt(inquiry: &Inquiry, company_context: Option<&str>) -> String {
    let context = company_context.unwrap_or("일반적인 고객 서비스");

    format!(
        "당신은 {context}의 전문 고객 서비스 담당자입니다.\n\n\
         고객 문의:\n\
         제목: {title}\n\
         내용: {content}\n\
         카테고리: {category}\n\n\
         다음 지침을 따라 응답해주세요:\n\
         1. 친절하고 전문적인 톤으로 답변\n\
         2. 구체적이고 실행 가능한 해결책 제시\n\
         3. 한국어로 응답\n\
         4. 200자 이상의 상세한 설명\n\n\
         응답:",
        context = context,
        title = inquiry.title,
        content = inquiry.content,
        category = inquiry.category,
    )
}

/// Last-resort reply when both model calls fail. Varies by category so the
/// customer at least gets pointed at the right team.
fn canned_response(category: &str, title: &str) -> String {
    match category {
        "technical" => format!(
            "안녕하세요, '{title}' 문의 주셔서 감사합니다.\n\n\
             현재 시스템 문제로 즉시 답변을 드리기 어렵습니다. \
             기술 지원팀이 문의 내용을 확인한 뒤 빠른 시일 내에 직접 연락드리겠습니다. \
             서비스 상태는 상태 페이지에서도 확인하실 수 있습니다.\n\n\
             긴급한 사항이시라면 '사람과 연결' 버튼을 클릭해주세요.\n\n감사합니다."
        ),
        "billing" => format!(
            "안녕하세요, '{title}' 문의 주셔서 감사합니다.\n\n\
             현재 시스템 문제로 즉시 답변을 드리기 어렵습니다. \
             결제 관련 문의는 결제 담당자가 확인 후 영업일 기준 1일 이내에 연락드리겠습니다. \
             결제 내역은 마이페이지에서 확인하실 수 있습니다.\n\n\
             긴급한 사항이시라면 '사람과 연결' 버튼을 클릭해주세요.\n\n감사합니다."
        ),
        _ => format!(
            "안녕하세요, '{title}'에 대해 문의해주셔서 감사합니다.\n\n\
             죄송합니다. 현재 시스템에 일시적인 문제가 발생하여 즉시 답변을 드리기 어려운 상황입니다. \
             빠른 시일 내에 담당자가 직접 연락드리겠습니다.\n\n\
             긴급한 사항이시라면 '사람과 연결' 버튼을 클릭해주세요.\n\n감사합니다."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InquiryStatus, Urgency, DEFAULT_RESPONSE_TIME_MINUTES};
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn sample_inquiry(category: &str, content: &str) -> Inquiry {
        let now = Utc::now();
        Inquiry {
            inquiry_id: Uuid::new_v4(),
            company_id: "c1".to_string(),
            customer_email: "a@b.com".to_string(),
            customer_password_hash: None,
            category: category.to_string(),
            urgency: Urgency::Medium,
            title: "배송 문의".to_string(),
            content: content.to_string(),
            status: InquiryStatus::Pending,
            ai_response: None,
            human_response: None,
            escalation_reason: None,
            estimated_response_time: DEFAULT_RESPONSE_TIME_MINUTES,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    /// Records which models were asked and replies from a script.
    struct ScriptedInvoker {
        calls: Mutex<Vec<String>>,
        script: Mutex<Vec<Result<String>>>,
    }

    impl ScriptedInvoker {
        fn new(script: Vec<Result<String>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                script: Mutex::new(script),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelInvoker for ScriptedInvoker {
        async fn invoke(
            &self,
            model_id: &str,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String> {
            self.calls.lock().unwrap().push(model_id.to_string());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(Error::Aws("script exhausted".to_string()));
            }
            script.remove(0)
        }
    }

    fn generator(script: Vec<Result<String>>) -> ResponseGenerator<ScriptedInvoker> {
        let config = ModelConfig {
            default_model: "default".to_string(),
            fallback_model: "fallback".to_string(),
            fast_model: "fast".to_string(),
            ..ModelConfig::default()
        };
        ResponseGenerator::new(ScriptedInvoker::new(script), config)
    }

    #[tokio::test]
    async fn test_primary_success() {
        let gen = generator(vec![Ok("답변입니다".to_string())]);
        let inquiry = sample_inquiry("general", "hi");
        let response = gen.generate(&inquiry, None).await;
        assert_eq!(response, "답변입니다");
        // "hi" is simple and medium urgency, so the fast model was picked.
        assert_eq!(gen.invoker.calls(), vec!["fast"]);
    }

    #[tokio::test]
    async fn test_retries_once_on_fallback_model() {
        let gen = generator(vec![
            Err(Error::Aws("down".to_string())),
            Ok("폴백 답변".to_string()),
        ]);
        let inquiry = sample_inquiry("general", "hi");
        let response = gen.generate(&inquiry, None).await;
        assert_eq!(response, "폴백 답변");
        assert_eq!(gen.invoker.calls(), vec!["fast", "fallback"]);
    }

    #[tokio::test]
    async fn test_both_failures_yield_canned_text() {
        let gen = generator(vec![
            Err(Error::Aws("down".to_string())),
            Err(Error::Aws("also down".to_string())),
        ]);
        let inquiry = sample_inquiry("general", "hi");
        let response = gen.generate(&inquiry, None).await;
        assert!(!response.trim().is_empty());
        assert!(response.contains("배송 문의"));
    }

    #[tokio::test]
    async fn test_blank_output_treated_as_failure() {
        let gen = generator(vec![
            Ok("   \n ".to_string()),
            Ok("  ".to_string()),
        ]);
        let inquiry = sample_inquiry("general", "hi");
        let response = gen.generate(&inquiry, None).await;
        // Both calls returned whitespace, so we fall through to canned text.
        assert!(!response.trim().is_empty());
        assert_eq!(gen.invoker.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_canned_text_is_category_aware() {
        let make = |category: &str| {
            let category = category.to_string();
            async move {
                let gen = generator(vec![
                    Err(Error::Aws("down".to_string())),
                    Err(Error::Aws("down".to_string())),
                ]);
                gen.generate(&sample_inquiry(&category, "hi"), None).await
            }
        };

        let technical = make("technical").await;
        let billing = make("billing").await;
        let general = make("general").await;

        assert!(technical.contains("기술 지원팀"));
        assert!(billing.contains("결제"));
        assert_ne!(technical, general);
        assert_ne!(billing, general);
    }

    #[tokio::test]
    async fn test_prompt_carries_inquiry_fields() {
        let inquiry = sample_inquiry("technical", "API 연동이 안 됩니다");
        let prompt = build_prompt(&inquiry, Some("Acme 전자"));
        assert!(prompt.contains("Acme 전자"));
        assert!(prompt.contains("배송 문의"));
        assert!(prompt.contains("API 연동이 안 됩니다"));
        assert!(prompt.contains("technical"));
    }
}
