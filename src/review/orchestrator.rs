//! Fan-out step: one generation slot per selected persona.
//!
//! Slots run through `buffered(max_concurrency)`, so results come back in
//! selection order whatever the pool size. A failed or timed-out slot is
//! recorded and the remaining slots still run.

use std::time::Duration;

use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Error;
use crate::persona::SelectedPersona;

use super::reviewer::{PersonaReview, PersonaReviewer};
use super::subject::Product;

/// A slot that produced no review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFailure {
    /// Position in the selection
    pub slot: usize,
    pub persona: String,
    pub error: String,
}

/// Result of one orchestration pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewRun {
    /// Successful reviews, in selection order
    pub reviews: Vec<PersonaReview>,
    pub failures: Vec<ReviewFailure>,
}

impl ReviewRun {
    pub fn total(&self) -> usize {
        self.reviews.len() + self.failures.len()
    }

    pub fn success_count(&self) -> usize {
        self.reviews.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Review texts in selection order.
    pub fn texts(&self) -> Vec<String> {
        self.reviews.iter().map(|r| r.review.clone()).collect()
    }
}

/// Runs persona reviews with bounded concurrency and a per-call deadline.
#[derive(Debug, Clone)]
pub struct ReviewOrchestrator {
    max_concurrency: usize,
    timeout: Duration,
}

impl ReviewOrchestrator {
    pub fn new(max_concurrency: usize, timeout: Duration) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            timeout,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub async fn run(
        &self,
        product: &Product,
        personas: &[SelectedPersona],
        reviewer: &PersonaReviewer,
    ) -> ReviewRun {
        let subject = product.to_review_format();
        let backend = reviewer.backend();
        let timeout = self.timeout;

        info!(
            personas = personas.len(),
            backend = backend.name(),
            concurrency = self.max_concurrency,
            "Generating persona reviews"
        );

        let outcomes: Vec<_> = stream::iter(personas.iter().enumerate())
            .map(|(slot, persona)| {
                let backend = backend.clone();
                let subject = subject.as_str();
                async move {
                    let result = tokio::time::timeout(
                        timeout,
                        PersonaReviewer::review_with(&backend, persona, subject),
                    )
                    .await
                    .unwrap_or_else(|_| {
                        Err(Error::GenerationTimeout {
                            timeout_secs: timeout.as_secs(),
                        })
                    });
                    (slot, persona, result)
                }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut run = ReviewRun::default();
        for (slot, persona, result) in outcomes {
            match result {
                Ok(review) => run.reviews.push(review),
                Err(e) => {
                    warn!(
                        persona = %persona.name(),
                        slot,
                        error = %e,
                        "Persona review failed"
                    );
                    run.failures.push(ReviewFailure {
                        slot,
                        persona: persona.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            successful = run.success_count(),
            failed = run.failure_count(),
            "Persona reviews finished"
        );
        run
    }
}

impl Default for ReviewOrchestrator {
    fn default() -> Self {
        Self::new(1, Duration::from_secs(120))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::backend::{ChatMessage, GenerationBackend, MockBackend, MockConfig};
    use crate::persona::PersonaRecord;

    fn personas(n: usize) -> Vec<SelectedPersona> {
        (1..=n)
            .map(|i| {
                SelectedPersona::from(PersonaRecord {
                    name: format!("Persona{}", i),
                    age: 20 + i as u32,
                    profession: format!("Job{}", i),
                    nationality: "Canadian".into(),
                    salary_range: "50k".into(),
                    hobbies: BTreeSet::new(),
                    priorities: BTreeSet::new(),
                    constraints: BTreeSet::new(),
                    synthetic: false,
                })
            })
            .collect()
    }

    fn product() -> Product {
        Product::new("Lamp", "$20", "A desk lamp")
    }

    fn names(run: &ReviewRun) -> Vec<&str> {
        run.reviews.iter().map(|r| r.persona.name()).collect()
    }

    /// Answers later personas faster, and names the persona in the reply.
    struct StaggeredBackend;

    #[async_trait]
    impl GenerationBackend for StaggeredBackend {
        fn name(&self) -> &'static str {
            "staggered"
        }

        fn model(&self) -> &str {
            "staggered"
        }

        async fn invoke(&self, messages: &[ChatMessage]) -> crate::error::Result<String> {
            let system = &messages[0].content;
            let index: u64 = (1..=9)
                .find(|i| system.contains(&format!("job{}", i)))
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(60 - index * 10)).await;
            Ok(format!("REVIEW from job{}", index))
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_order() {
        let backend = Arc::new(MockBackend::with_config(MockConfig {
            fail_when_contains: Some("job3".to_string()),
            ..Default::default()
        }));
        let reviewer = PersonaReviewer::new(backend.clone());

        let run = ReviewOrchestrator::default()
            .run(&product(), &personas(5), &reviewer)
            .await;

        assert_eq!(run.total(), 5);
        assert_eq!(run.success_count(), 4);
        assert_eq!(run.failure_count(), 1);
        assert_eq!(names(&run), vec!["Persona1", "Persona2", "Persona4", "Persona5"]);
        assert_eq!(run.failures[0].slot, 2);
        assert_eq!(run.failures[0].persona, "Persona3");
        assert_eq!(backend.call_count(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_run_matches_sequential_order() {
        let reviewer = PersonaReviewer::new(Arc::new(StaggeredBackend));
        let people = personas(5);

        let sequential = ReviewOrchestrator::new(1, Duration::from_secs(5))
            .run(&product(), &people, &reviewer)
            .await;
        let pooled = ReviewOrchestrator::new(4, Duration::from_secs(5))
            .run(&product(), &people, &reviewer)
            .await;

        assert_eq!(names(&sequential), names(&pooled));
        assert_eq!(pooled.texts()[0], "REVIEW from job1");
        assert_eq!(pooled.texts()[4], "REVIEW from job5");
    }

    #[tokio::test]
    async fn test_timeout_is_per_persona_failure() {
        let backend = Arc::new(MockBackend::with_config(MockConfig {
            latency_ms: 200,
            ..Default::default()
        }));
        let reviewer = PersonaReviewer::new(backend);

        let run = ReviewOrchestrator::new(2, Duration::from_millis(20))
            .run(&product(), &personas(2), &reviewer)
            .await;

        assert_eq!(run.success_count(), 0);
        assert_eq!(run.failure_count(), 2);
        assert!(run.failures[0].error.contains("timed out"));
    }

    #[tokio::test]
    async fn test_empty_selection() {
        let reviewer = PersonaReviewer::new(Arc::new(MockBackend::new()));
        let run = ReviewOrchestrator::default()
            .run(&product(), &[], &reviewer)
            .await;
        assert_eq!(run.total(), 0);
    }

    #[test]
    fn test_zero_concurrency_is_sequential() {
        assert_eq!(ReviewOrchestrator::new(0, Duration::from_secs(1)).max_concurrency(), 1);
    }
}
