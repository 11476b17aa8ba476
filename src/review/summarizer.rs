//! Fan-in step: condense every persona review into one StructuredSummary.

use tracing::{debug, error, info, warn};

use crate::backend::{GenerationBackend, SharedBackend};

use super::prompt::{summary_prompt, SUMMARY_SYSTEM_PROMPT};
use super::subject::ProductContext;
use super::summary::StructuredSummary;

/// Summarizes collected reviews through a dedicated backend.
pub struct Summarizer {
    backend: SharedBackend,
}

impl Summarizer {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    /// Summarize `reviews`. Never fails: backend and parse errors yield a
    /// fallback summary.
    pub async fn summarize(&self, reviews: &[String], product: &ProductContext) -> StructuredSummary {
        if reviews.is_empty() {
            warn!(product = %product.name, "No reviews to summarize");
            return StructuredSummary::no_reviews();
        }

        let prompt = summary_prompt(reviews, product);
        debug!(reviews = reviews.len(), prompt_chars = prompt.len(), "Requesting summary");

        match self.backend.invoke_prompt(SUMMARY_SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => {
                debug!(raw = %raw, "Raw summary response");
                let summary = StructuredSummary::from_model_output(&raw);
                if !summary.is_fallback() {
                    info!(
                        sentiment = %summary.overall_sentiment,
                        purchase_intent = summary.purchase_intent_percentage,
                        "Summary generated"
                    );
                }
                summary
            }
            Err(e) => {
                error!(error = %e, backend = self.backend.name(), "Summary request failed");
                StructuredSummary::processing_failed(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backend::{MockBackend, MockConfig};

    fn context() -> ProductContext {
        ProductContext {
            name: "Lamp".into(),
            description: "A lamp".into(),
            price: "$20".into(),
            category: "Home".into(),
        }
    }

    #[tokio::test]
    async fn test_summarize_parses_backend_json() {
        let backend = Arc::new(MockBackend::new());
        let summarizer = Summarizer::new(backend.clone());

        let summary = summarizer
            .summarize(&["REVIEW: good".to_string()], &context())
            .await;

        assert!(!summary.is_fallback());
        assert_eq!(summary.overall_sentiment, "Positive");
        assert_eq!(backend.call_count(), 1);
        assert!(backend.prompts()[0].contains("Review 1: REVIEW: good"));
    }

    #[tokio::test]
    async fn test_empty_reviews_skip_backend() {
        let backend = Arc::new(MockBackend::new());
        let summarizer = Summarizer::new(backend.clone());

        let summary = summarizer.summarize(&[], &context()).await;
        assert!(summary.is_fallback());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unparsable_output_falls_back() {
        let backend = Arc::new(MockBackend::with_config(MockConfig {
            fixed_response: Some("I cannot help with that.".to_string()),
            ..Default::default()
        }));
        let summary = Summarizer::new(backend)
            .summarize(&["REVIEW: fine".to_string()], &context())
            .await;

        assert_eq!(summary, StructuredSummary::unparsable());
    }

    #[tokio::test]
    async fn test_backend_error_falls_back() {
        let backend = Arc::new(MockBackend::with_config(MockConfig {
            fail_all: true,
            ..Default::default()
        }));
        let summary = Summarizer::new(backend)
            .summarize(&["REVIEW: fine".to_string()], &context())
            .await;

        assert!(summary.is_fallback());
        assert_eq!(summary.key_strengths, vec!["Error processing review"]);
    }
}
