//! End-to-end review run: select, generate, summarize.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::backend::{BackendFactory, BackendType, GenerationBackend, ModelOverlay};
use crate::config::AppConfig;
use crate::error::Result;
use crate::persona::{PersonaSchema, PersonaSelector, PersonaStore, SelectedPersona};

use super::orchestrator::{ReviewFailure, ReviewOrchestrator};
use super::reviewer::{PersonaReview, PersonaReviewer};
use super::subject::{Product, ProductContext};
use super::summarizer::Summarizer;
use super::summary::StructuredSummary;

/// Caller-supplied parameters for one run.
#[derive(Debug, Clone)]
pub struct ReviewRequest<P: PersonaSchema> {
    pub criteria: P::Criteria,
    pub num_personas: usize,
    /// Backend identifier: gemini, openai, mock
    pub backend: String,
    /// Empty means use the configured key
    pub api_key: String,
    pub overlay: ModelOverlay,
    pub allow_backfill: bool,
}

impl<P: PersonaSchema> ReviewRequest<P> {
    /// Request populated from the configured defaults.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            criteria: P::Criteria::default(),
            num_personas: config.generation.default_count,
            backend: config.generation.backend.clone(),
            api_key: config.generation.api_key.clone(),
            overlay: ModelOverlay::new(),
            allow_backfill: config.personas.allow_backfill,
        }
    }
}

/// Identity of a single run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub total_personas: usize,
    pub successful_reviews: usize,
    pub failed_reviews: usize,
    pub ai_provider: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub product: ProductContext,
    pub summary: StructuredSummary,
    pub reviews: Vec<PersonaReview>,
    pub failures: Vec<ReviewFailure>,
    pub metadata: RunMetadata,
}

/// Owns one persona store and runs review requests against it.
pub struct ReviewManager<P: PersonaSchema> {
    config: AppConfig,
    selector: PersonaSelector<P>,
    orchestrator: ReviewOrchestrator,
}

impl<P: PersonaSchema> ReviewManager<P> {
    /// Load the persona store named by the configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = PersonaStore::<P>::load(&config.persona_file())?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    pub fn with_store(config: AppConfig, store: Arc<PersonaStore<P>>) -> Self {
        let selector = PersonaSelector::new(store).with_seed(config.personas.seed);
        let orchestrator = ReviewOrchestrator::new(
            config.generation.max_concurrency,
            config.generation_timeout(),
        );
        Self {
            config,
            selector,
            orchestrator,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Distinct values present in the persona store.
    pub fn available_criteria(&self) -> &P::Catalog {
        self.selector.store().catalog()
    }

    pub fn select(
        &self,
        criteria: &P::Criteria,
        count: usize,
        allow_backfill: bool,
    ) -> Result<Vec<SelectedPersona>> {
        self.selector.select(criteria, count, allow_backfill)
    }

    /// Run the full pipeline for one product.
    ///
    /// Selection and backend construction errors abort the run. Persona
    /// failures and summary problems are folded into the outcome.
    pub async fn generate_product_reviews(
        &self,
        product: &Product,
        request: &ReviewRequest<P>,
    ) -> Result<ReviewOutcome> {
        let context = RunContext::new();
        let span = info_span!(
            "review_run",
            run_id = %context.run_id,
            kind = %P::KIND,
            product = %product.name
        );
        self.run(product, request, context).instrument(span).await
    }

    async fn run(
        &self,
        product: &Product,
        request: &ReviewRequest<P>,
        context: RunContext,
    ) -> Result<ReviewOutcome> {
        let personas = self.select(&request.criteria, request.num_personas, request.allow_backfill)?;
        info!(
            requested = request.num_personas,
            selected = personas.len(),
            synthetic = personas.iter().filter(|p| p.is_synthetic()).count(),
            "Personas selected"
        );

        let defaults = self.config.backend_defaults();
        let backend_type: BackendType = request.backend.parse()?;
        let reviewer =
            PersonaReviewer::from_backend(backend_type, &request.api_key, &defaults, &request.overlay)?;

        let summary_key = if self.config.summarizer.api_key.is_empty() {
            request.api_key.as_str()
        } else {
            self.config.summarizer.api_key.as_str()
        };
        let summarizer = Summarizer::new(BackendFactory::create_by_name(
            &self.config.summarizer.backend,
            summary_key,
            &defaults,
            &self.config.summarizer_overlay(),
        )?);

        let run = self.orchestrator.run(product, &personas, &reviewer).await;

        let product_context = ProductContext::from(product);
        let summary = summarizer.summarize(&run.texts(), &product_context).await;

        let review_backend = reviewer.backend();
        let metadata = RunMetadata {
            run_id: context.run_id,
            total_personas: personas.len(),
            successful_reviews: run.success_count(),
            failed_reviews: run.failure_count(),
            ai_provider: review_backend.name().to_string(),
            model: review_backend.model().to_string(),
            started_at: context.started_at,
            finished_at: Utc::now(),
        };

        info!(
            total = metadata.total_personas,
            successful = metadata.successful_reviews,
            failed = metadata.failed_reviews,
            fallback_summary = summary.is_fallback(),
            "Review run complete"
        );

        Ok(ReviewOutcome {
            product: product_context,
            summary,
            reviews: run.reviews,
            failures: run.failures,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::persona::{AgeRange, ConsumerStore, ExpertRecord, ExpertStore, PersonaKind, PersonaRecord};

    const CSV: &str = "\
name,age,profession,nationality,salary_range,hobbies,priorities,constraints
Alice,29,Software engineer,Canadian,80k-100k,\"gaming, hiking\",quality,budget
Bruno,41,Teacher,Brazilian,40k-60k,reading,price,time
Chen,33,Software engineer,Chinese,100k-150k,\"gaming, cooking\",design,space
";

    fn mock_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.generation.backend = "mock".to_string();
        config.summarizer.backend = "mock".to_string();
        config.summarizer.model = "mock-summary".to_string();
        config.personas.seed = Some(7);
        config
    }

    fn manager() -> ReviewManager<PersonaRecord> {
        let store = ConsumerStore::from_reader(CSV.as_bytes()).unwrap();
        ReviewManager::with_store(mock_config(), Arc::new(store))
    }

    fn product() -> Product {
        Product::new("Desk Lamp", "$25", "An adjustable LED desk lamp")
    }

    fn request(manager: &ReviewManager<PersonaRecord>) -> ReviewRequest<PersonaRecord> {
        let mut request = ReviewRequest::from_config(manager.config());
        request.num_personas = 3;
        request
    }

    #[tokio::test]
    async fn test_full_run_with_mock_backend() {
        let manager = manager();
        let outcome = manager
            .generate_product_reviews(&product(), &request(&manager))
            .await
            .unwrap();

        assert_eq!(outcome.metadata.total_personas, 3);
        assert_eq!(outcome.metadata.successful_reviews, 3);
        assert_eq!(outcome.metadata.failed_reviews, 0);
        assert_eq!(outcome.metadata.ai_provider, "mock");
        assert_eq!(outcome.product.category, "N/A");
        assert!(!outcome.summary.is_fallback());
        assert!(outcome.metadata.finished_at >= outcome.metadata.started_at);
    }

    #[tokio::test]
    async fn test_partial_failure_still_summarizes() {
        let manager = manager();
        let mut request = request(&manager);
        request.criteria.professions = vec!["Software engineer".to_string()];
        request.allow_backfill = false;
        request
            .overlay
            .insert("fail_when_contains".to_string(), "chinese".into());

        let outcome = manager
            .generate_product_reviews(&product(), &request)
            .await
            .unwrap();

        assert_eq!(outcome.metadata.total_personas, 2);
        assert_eq!(outcome.metadata.successful_reviews, 1);
        assert_eq!(outcome.failures[0].persona, "Chen");
        assert!(!outcome.summary.is_fallback());
    }

    #[tokio::test]
    async fn test_all_failures_yield_fallback_summary() {
        let manager = manager();
        let mut request = request(&manager);
        request.overlay.insert("fail_all".to_string(), true.into());

        let outcome = manager
            .generate_product_reviews(&product(), &request)
            .await
            .unwrap();

        assert_eq!(outcome.metadata.successful_reviews, 0);
        assert_eq!(outcome.metadata.failed_reviews, 3);
        assert!(outcome.summary.is_fallback());
    }

    #[tokio::test]
    async fn test_unknown_backend_is_fatal() {
        let manager = manager();
        let mut request = request(&manager);
        request.backend = "claude".to_string();

        let err = manager
            .generate_product_reviews(&product(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedBackend(_)));
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal() {
        let manager = manager();
        let mut request = request(&manager);
        request.backend = "openai".to_string();
        request.api_key = String::new();

        let err = manager
            .generate_product_reviews(&product(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProviderInit { .. }));
    }

    #[tokio::test]
    async fn test_invalid_criteria_is_fatal() {
        let manager = manager();
        let mut request = request(&manager);
        request.criteria.age_range = Some(AgeRange::new(50, 20));

        let err = manager
            .generate_product_reviews(&product(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsatisfiableCriteria { .. }));
    }

    #[tokio::test]
    async fn test_expert_panel_run() {
        let csv = "\
name,age,profession,years_experience,industry_focus,expertise_areas,specializations
Iris,38,UX designer,12,E-commerce,\"UX/UI, Accessibility\",Figma
Jonas,45,Frontend engineer,20,Media,\"Performance, SEO\",React
";
        let store = ExpertStore::from_reader(csv.as_bytes()).unwrap();
        let manager: ReviewManager<ExpertRecord> =
            ReviewManager::with_store(mock_config(), Arc::new(store));

        let mut request = ReviewRequest::<ExpertRecord>::from_config(manager.config());
        request.num_personas = 3;
        request.criteria.desired_expertise = vec!["SEO".to_string()];

        let outcome = manager
            .generate_product_reviews(&product(), &request)
            .await
            .unwrap();

        assert_eq!(outcome.metadata.total_personas, 3);
        assert_eq!(outcome.metadata.successful_reviews, 3);
        assert_eq!(outcome.reviews[0].persona.name(), "Jonas");
        assert!(outcome
            .reviews
            .iter()
            .all(|r| r.persona.kind() == PersonaKind::Expert));
        assert!(outcome.reviews[1].persona.name().starts_with("Reviewer_"));
        assert!(manager.available_criteria().industry_focus.contains("Media"));
    }

    #[test]
    fn test_available_criteria() {
        let manager = manager();
        let catalog = manager.available_criteria();
        assert!(catalog.professions.contains("Teacher"));
        assert_eq!(catalog, manager.available_criteria());
    }
}
