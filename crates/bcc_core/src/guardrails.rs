use regex::Regex;

use crate::config::GuardrailsConfig;
use crate::error::AppError;

/// Fixed rejection message for sensitive-keyword hits. Deliberately generic:
/// it must never reveal which keyword matched.
pub const SENSITIVE_REJECTION: &str = "For your security, we cannot process requests \
involving sensitive information through this channel. Please visit a branch or use \
secure authenticated channels.";

pub const EMPTY_REJECTION: &str = "Invalid or empty query.";

pub const LENGTH_REJECTION: &str = "Query exceeds maximum allowed length.";

const CARD_MASK: &str = "[CARD_MASKED]";
const EMAIL_MASK: &str = "[EMAIL_MASKED]";

/// Outcome of a guardrail check. `rejection_reason` is `Some` exactly when
/// `allowed` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardrailVerdict {
    pub allowed: bool,
    pub rejection_reason: Option<String>,
}

impl GuardrailVerdict {
    fn pass() -> Self {
        Self {
            allowed: true,
            rejection_reason: None,
        }
    }

    fn reject(reason: &str) -> Self {
        Self {
            allowed: false,
            rejection_reason: Some(reason.to_string()),
        }
    }
}

/// Pre-processing gate for incoming queries. Only the query is inspected;
/// generated output is never passed through here.
#[derive(Debug)]
pub struct Guardrails {
    reject_keywords: Vec<String>,
    max_query_length: usize,
    digit_run: Regex,
    grouped_card: Regex,
    email: Regex,
}

impl Guardrails {
    pub fn new(config: &GuardrailsConfig) -> Result<Self, AppError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                AppError::new("CONFIG_INVALID", "Failed to compile guardrail mask pattern")
                    .with_details(e.to_string())
            })
        };
        Ok(Self {
            reject_keywords: config
                .reject_queries_containing
                .iter()
                .map(|kw| kw.to_lowercase())
                .collect(),
            max_query_length: config.max_query_length,
            digit_run: compile(r"\b\d{10,16}\b")?,
            grouped_card: compile(r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b")?,
            email: compile(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")?,
        })
    }

    /// Check whether a query may enter the pipeline.
    ///
    /// The keyword test is a case-insensitive substring match; the verdict is
    /// identical regardless of keyword iteration order.
    pub fn check(&self, query: &str) -> GuardrailVerdict {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return GuardrailVerdict::reject(EMPTY_REJECTION);
        }

        if trimmed.chars().count() > self.max_query_length {
            return GuardrailVerdict::reject(LENGTH_REJECTION);
        }

        let lowered = trimmed.to_lowercase();
        if self.reject_keywords.iter().any(|kw| lowered.contains(kw)) {
            return GuardrailVerdict::reject(SENSITIVE_REJECTION);
        }

        GuardrailVerdict::pass()
    }

    /// Mask card-like numeric sequences and email addresses for diagnostic
    /// logging. Pure; never applied on the response path.
    pub fn sanitize_for_logging(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let masked = self.digit_run.replace_all(text, CARD_MASK);
        let masked = self.grouped_card.replace_all(&masked, CARD_MASK);
        self.email.replace_all(&masked, EMAIL_MASK).into_owned()
    }
}
