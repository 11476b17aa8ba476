//! Product review pipeline: persona reviews fan out through a generation
//! backend and fan back in through the summarizer.

pub mod manager;
pub mod orchestrator;
pub mod prompt;
pub mod reviewer;
pub mod session;
pub mod subject;
pub mod summarizer;
pub mod summary;

pub use manager::{ReviewManager, ReviewOutcome, ReviewRequest, RunContext, RunMetadata};
pub use orchestrator::{ReviewFailure, ReviewOrchestrator, ReviewRun};
pub use reviewer::{PersonaReview, PersonaReviewer};
pub use subject::{Product, ProductContext};
pub use summarizer::Summarizer;
pub use summary::{DemographicInsights, StructuredSummary};
