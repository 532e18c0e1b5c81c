//! Bedrock model tiers and selection strategy.
//!
//! Loaded once from `BEDROCK_*` environment variables at cold start and
//! shared read-only across invocations.

use std::env;

use super::classify::{Complexity, Priority};

/// How the service picks a model tier for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Always the default model.
    Fixed,
    /// Balance quality against complexity; priority dominates.
    Adaptive,
    /// Cheapest tier that fits the complexity.
    CostOptimized,
}

impl SelectionStrategy {
    /// Unknown strategy names fall back to `Fixed`.
    pub fn parse(s: &str) -> Self {
        match s {
            "adaptive" => SelectionStrategy::Adaptive,
            "cost_optimized" => SelectionStrategy::CostOptimized,
            _ => SelectionStrategy::Fixed,
        }
    }
}

/// Model tier configuration, immutable after construction.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Highest-quality tier, also the primary for complex/high-priority work.
    pub default_model: String,
    /// Mid tier used for ordinary inquiries and as the retry target.
    pub fallback_model: String,
    /// Cheap, fast tier for simple inquiries.
    pub fast_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub strategy: SelectionStrategy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_model: "anthropic.claude-3-5-sonnet-20241022-v2:0".to_string(),
            fallback_model: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
            fast_model: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            strategy: SelectionStrategy::Adaptive,
        }
    }
}

impl ModelConfig {
    /// Load from environment, keeping defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_model: env::var("BEDROCK_DEFAULT_MODEL").unwrap_or(defaults.default_model),
            fallback_model: env::var("BEDROCK_FALLBACK_MODEL").unwrap_or(defaults.fallback_model),
            fast_model: env::var("BEDROCK_FAST_MODEL").unwrap_or(defaults.fast_model),
            max_tokens: env::var("BEDROCK_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tokens),
            temperature: env::var("BEDROCK_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
            strategy: env::var("BEDROCK_SELECTION_STRATEGY")
                .map(|v| SelectionStrategy::parse(&v))
                .unwrap_or(defaults.strategy),
        }
    }

    /// Pick a model id for a request. Always returns one of the configured
    /// tiers; there is no error path here.
    pub fn select_model(&self, complexity: Complexity, priority: Priority) -> &str {
        match self.strategy {
            SelectionStrategy::Fixed => &self.default_model,
            SelectionStrategy::Adaptive => {
                // High priority always gets the best model, whatever the
                // complexity says.
                if priority == Priority::High {
                    return &self.default_model;
                }
                match complexity {
                    Complexity::Simple => &self.fast_model,
                    Complexity::Complex => &self.default_model,
                    Complexity::Medium => &self.fallback_model,
                }
            }
            SelectionStrategy::CostOptimized => match complexity {
                Complexity::Simple => &self.fast_model,
                _ => &self.default_model,
            },
        }
    }
}
