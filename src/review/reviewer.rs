//! Generates one persona's review through the active backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::{
    BackendDefaults, BackendFactory, BackendType, GenerationBackend, ModelOverlay, SharedBackend,
};
use crate::error::{Error, Result};
use crate::persona::SelectedPersona;

use super::prompt::persona_system_prompt;
use super::session::GenerationSession;

/// One persona's completed review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaReview {
    pub persona: SelectedPersona,
    pub review: String,
    pub timestamp: DateTime<Utc>,
}

/// Holds the backend personas speak through.
pub struct PersonaReviewer {
    backend: SharedBackend,
}

impl PersonaReviewer {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Build the reviewer for a backend identifier.
    pub fn from_backend(
        backend_type: BackendType,
        credential: &str,
        defaults: &BackendDefaults,
        overlay: &ModelOverlay,
    ) -> Result<Self> {
        Ok(Self::new(BackendFactory::create(
            backend_type,
            credential,
            defaults,
            overlay,
        )?))
    }

    /// Current backend. Callers holding the returned handle keep using it
    /// after a switch.
    pub fn backend(&self) -> SharedBackend {
        self.backend.clone()
    }

    /// Replace the backend with a newly initialized one.
    ///
    /// On error the current backend stays in place.
    pub fn switch_backend(
        &mut self,
        backend_type: BackendType,
        credential: &str,
        defaults: &BackendDefaults,
        overlay: &ModelOverlay,
    ) -> Result<()> {
        let previous = self.backend.name();
        self.backend = BackendFactory::create(backend_type, credential, defaults, overlay)?;
        info!(from = previous, to = %backend_type, "Switched generation backend");
        Ok(())
    }

    /// Generate a review for `persona` using an explicit backend handle.
    pub async fn review_with(
        backend: &SharedBackend,
        persona: &SelectedPersona,
        subject: &str,
    ) -> Result<PersonaReview> {
        let mut session = GenerationSession::new(
            persona.name(),
            persona_system_prompt(&persona.profile()),
            subject.to_string(),
        );

        let output = backend.invoke(session.messages()).await.map_err(|e| match e {
            Error::Generation { message, .. } => Error::Generation {
                persona: Some(persona.name().to_string()),
                message,
            },
            other => other,
        })?;

        let review = session.finish(output).to_string();
        debug!(persona = %session.persona(), chars = review.len(), "Review generated");

        Ok(PersonaReview {
            persona: persona.clone(),
            review,
            timestamp: Utc::now(),
        })
    }

    /// Generate a review for `persona` with the current backend.
    pub async fn review(&self, persona: &SelectedPersona, subject: &str) -> Result<PersonaReview> {
        Self::review_with(&self.backend, persona, subject).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use crate::backend::MockBackend;
    use crate::persona::{ExpertRecord, PersonaKind, PersonaRecord};

    fn persona() -> SelectedPersona {
        SelectedPersona::from(PersonaRecord {
            name: "Alice".into(),
            age: 29,
            profession: "Chef".into(),
            nationality: "Canadian".into(),
            salary_range: "50k".into(),
            hobbies: BTreeSet::new(),
            priorities: BTreeSet::new(),
            constraints: BTreeSet::new(),
            synthetic: false,
        })
    }

    #[tokio::test]
    async fn test_review_records_persona() {
        let reviewer = PersonaReviewer::new(Arc::new(MockBackend::new()));
        let review = reviewer
            .review(&persona(), "Review this product: Lamp\nA lamp price: $5")
            .await
            .unwrap();

        assert_eq!(review.persona.name(), "Alice");
        assert!(review.review.starts_with("REVIEW: Lamp"));
    }

    #[tokio::test]
    async fn test_expert_review_uses_expert_prompt() {
        let backend = Arc::new(MockBackend::new());
        let shared: SharedBackend = backend.clone();
        let expert = SelectedPersona::from(ExpertRecord {
            name: "Reviewer_4821".into(),
            age: 44,
            profession: "Industrial designer".into(),
            years_experience: 18,
            industry_focus: "Consumer electronics".into(),
            expertise_areas: ["Ergonomics".to_string()].into_iter().collect(),
            specializations: BTreeSet::new(),
            synthetic: true,
        });

        let review = PersonaReviewer::review_with(&shared, &expert, "Review this product: Lamp")
            .await
            .unwrap();
        assert_eq!(review.persona.kind(), PersonaKind::Expert);
        assert_eq!(backend.call_count(), 1);

        let overlay: ModelOverlay =
            serde_json::from_str(r#"{"fail_when_contains": "18 years of experience"}"#).unwrap();
        let failing = PersonaReviewer::from_backend(
            BackendType::Mock,
            "",
            &BackendDefaults::default(),
            &overlay,
        )
        .unwrap();
        assert!(failing.review(&expert, "Review").await.is_err());
        assert!(failing.review(&persona(), "Review").await.is_ok());
    }

    #[tokio::test]
    async fn test_generation_error_names_persona() {
        let overlay: ModelOverlay = serde_json::from_str(r#"{"fail_all": true}"#).unwrap();
        let reviewer = PersonaReviewer::from_backend(
            BackendType::Mock,
            "",
            &BackendDefaults::default(),
            &overlay,
        )
        .unwrap();

        let err = reviewer.review(&persona(), "Review").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Generation { persona: Some(ref name), .. } if name == "Alice"
        ));
    }

    #[test]
    fn test_switch_backend() {
        let mut reviewer = PersonaReviewer::new(Arc::new(MockBackend::new()));
        let held = reviewer.backend();
        let defaults = BackendDefaults::default();

        reviewer
            .switch_backend(BackendType::OpenAi, "sk-test", &defaults, &ModelOverlay::new())
            .unwrap();
        assert_eq!(reviewer.backend().name(), "openai");
        assert_eq!(held.name(), "mock");

        let result =
            reviewer.switch_backend(BackendType::Gemini, "", &defaults, &ModelOverlay::new());
        assert!(result.is_err());
        assert_eq!(reviewer.backend().name(), "openai");
    }
}
