//! Persona kinds and the contract the store and selector work through.
//!
//! The store and the selection engine are generic over [`PersonaSchema`].
//! Each kind supplies its CSV columns, row parsing, catalog, criteria and
//! backfill synthesis; filtering, scoring order, trimming and name
//! allocation are shared.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::store::CsvRow;
use super::types::SelectedPersona;
use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Persona Kind
// ─────────────────────────────────────────────────────────────────

/// Which persona family a store holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaKind {
    /// Everyday shoppers described by demographics and lifestyle
    #[default]
    Consumer,
    /// Industry professionals described by experience and expertise
    Expert,
}

impl PersonaKind {
    pub fn name(&self) -> &'static str {
        match self {
            PersonaKind::Consumer => "consumer",
            PersonaKind::Expert => "expert",
        }
    }
}

impl fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PersonaKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "consumer" => Ok(PersonaKind::Consumer),
            "expert" => Ok(PersonaKind::Expert),
            other => Err(format!(
                "Unknown persona kind '{}'. Must be one of: consumer, expert",
                other
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Schema Traits
// ─────────────────────────────────────────────────────────────────

/// Selection rules for one persona kind.
pub trait PanelCriteria<P>:
    fmt::Debug + Clone + Default + Serialize + DeserializeOwned + Send + Sync
{
    /// Reject criteria no record could ever satisfy.
    fn validate(&self) -> Result<()>;

    /// Check the range and allow-list constraints.
    fn matches_scalars(&self, record: &P) -> bool;

    /// Summed overlap with the desired sets, or `None` when the record
    /// misses a threshold.
    fn score(&self, record: &P) -> Option<usize>;

    /// Whether any desired-set scoring applies.
    fn has_scoring(&self) -> bool;
}

/// A persona record type the store can load and the selector can backfill.
pub trait PersonaSchema:
    fmt::Debug + Clone + PartialEq + Serialize + Send + Sync + Into<SelectedPersona> + 'static
{
    const KIND: PersonaKind;

    /// Columns every source of this kind must provide.
    const REQUIRED_COLUMNS: &'static [&'static str];

    /// Prefix for synthesized names, followed by four digits.
    const SYNTHETIC_PREFIX: &'static str;

    type Criteria: PanelCriteria<Self>;

    /// Distinct observed values per field.
    type Catalog: fmt::Debug + Clone + Default + PartialEq + Serialize + Send + Sync;

    fn name(&self) -> &str;

    fn is_synthetic(&self) -> bool;

    /// Parse one validated CSV row.
    fn from_row(row: &CsvRow<'_>) -> Result<Self>;

    /// First required text field that is blank, if any.
    fn blank_field(&self) -> Option<&'static str>;

    fn build_catalog(records: &[Self]) -> Self::Catalog;

    /// Build a synthetic record that satisfies every present constraint.
    fn synthesize<G: Rng + ?Sized>(
        name: String,
        criteria: &Self::Criteria,
        catalog: &Self::Catalog,
        rng: &mut G,
    ) -> Result<Self>;
}
