//! Persona system: validated persona stores and panel selection.
//!
//! A store loads one persona kind (consumers or expert reviewers) from a
//! CSV source; the selector builds a panel for one review run, synthesizing
//! extra personas when the store cannot satisfy the requested count.

pub mod criteria;
pub mod expert;
pub mod schema;
pub mod selector;
pub mod store;
pub mod types;

pub use criteria::{load_criteria, AgeRange, SelectionCriteria, YearRange};
pub use expert::{ExpertCatalog, ExpertCriteria, ExpertField, ExpertProfile, ExpertRecord};
pub use schema::{PanelCriteria, PersonaKind, PersonaSchema};
pub use selector::PersonaSelector;
pub use store::{ConsumerStore, ExpertStore, PersonaCatalog, PersonaStore};
pub use types::{ConsumerProfile, MultiField, PersonaRecord, ReviewerProfile, SelectedPersona};
