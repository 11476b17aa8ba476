//! Core types for the persona system.
//!
//! A consumer persona is one synthetic shopper identity. Records come from
//! the persona store or are synthesized during backfill; both share the same
//! shape and are indistinguishable to the review pipeline apart from the
//! `synthetic` flag.

use std::collections::BTreeSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::criteria::{SelectionCriteria, DEFAULT_AGE_RANGE};
use super::expert::{ExpertProfile, ExpertRecord};
use super::schema::{PersonaKind, PersonaSchema};
use super::selector::{multi_values, pick_value};
use super::store::{CsvRow, PersonaCatalog};
use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Persona Fields
// ─────────────────────────────────────────────────────────────────

/// Columns every consumer persona source must provide.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "name",
    "age",
    "profession",
    "nationality",
    "salary_range",
    "hobbies",
    "priorities",
    "constraints",
];

/// The three multi-valued persona attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiField {
    Hobbies,
    Priorities,
    Constraints,
}

impl MultiField {
    /// Column / criteria key for this field.
    pub fn key(&self) -> &'static str {
        match self {
            MultiField::Hobbies => "hobbies",
            MultiField::Priorities => "priorities",
            MultiField::Constraints => "constraints",
        }
    }

    /// All multi-valued fields in column order.
    pub fn all() -> &'static [MultiField] {
        &[
            MultiField::Hobbies,
            MultiField::Priorities,
            MultiField::Constraints,
        ]
    }

    /// How many extra catalog values backfill pads with, as `(min, max)`.
    pub fn padding_range(&self) -> (usize, usize) {
        match self {
            MultiField::Hobbies => (1, 3),
            MultiField::Priorities | MultiField::Constraints => (1, 2),
        }
    }
}

impl fmt::Display for MultiField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Record
// ─────────────────────────────────────────────────────────────────

/// A consumer persona as held by the store or produced by backfill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaRecord {
    pub name: String,
    pub age: u32,
    pub profession: String,
    pub nationality: String,
    pub salary_range: String,
    pub hobbies: BTreeSet<String>,
    pub priorities: BTreeSet<String>,
    pub constraints: BTreeSet<String>,

    /// True for personas synthesized during backfill.
    #[serde(default)]
    pub synthetic: bool,
}

impl PersonaRecord {
    /// Values of one multi-valued attribute.
    pub fn multi(&self, field: MultiField) -> &BTreeSet<String> {
        match field {
            MultiField::Hobbies => &self.hobbies,
            MultiField::Priorities => &self.priorities,
            MultiField::Constraints => &self.constraints,
        }
    }

    /// Mutable access to one multi-valued attribute.
    pub fn multi_mut(&mut self, field: MultiField) -> &mut BTreeSet<String> {
        match field {
            MultiField::Hobbies => &mut self.hobbies,
            MultiField::Priorities => &mut self.priorities,
            MultiField::Constraints => &mut self.constraints,
        }
    }
}

/// Normalize a list-typed cell into a set.
///
/// Accepts plain delimited text (`"a, b"`) as well as list literals
/// (`"['a', 'b']"`). Blank items are dropped.
pub fn parse_multi_value(raw: &str) -> BTreeSet<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c| matches!(c, '[' | ']' | '\'' | '"'));

    trimmed
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn join_values(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl PersonaSchema for PersonaRecord {
    const KIND: PersonaKind = PersonaKind::Consumer;
    const REQUIRED_COLUMNS: &'static [&'static str] = REQUIRED_COLUMNS;
    const SYNTHETIC_PREFIX: &'static str = "RandomPersona_";

    type Criteria = SelectionCriteria;
    type Catalog = PersonaCatalog;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    fn from_row(row: &CsvRow<'_>) -> Result<Self> {
        let age = row.integer("age")?;
        Ok(Self {
            name: row.text("name")?,
            age,
            profession: row.text("profession")?,
            nationality: row.text("nationality")?,
            salary_range: row.text("salary_range")?,
            hobbies: row.values("hobbies"),
            priorities: row.values("priorities"),
            constraints: row.values("constraints"),
            synthetic: false,
        })
    }

    fn blank_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("profession", &self.profession),
            ("nationality", &self.nationality),
            ("salary_range", &self.salary_range),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(column, _)| column)
    }

    fn build_catalog(records: &[Self]) -> PersonaCatalog {
        PersonaCatalog::build(records)
    }

    fn synthesize<G: Rng + ?Sized>(
        name: String,
        criteria: &SelectionCriteria,
        catalog: &PersonaCatalog,
        rng: &mut G,
    ) -> Result<Self> {
        let age_range = criteria.age_range.unwrap_or(DEFAULT_AGE_RANGE);

        let mut record = PersonaRecord {
            name,
            age: rng.gen_range(age_range.min..=age_range.max),
            profession: pick_value(&criteria.professions, &catalog.professions, "profession", rng)?,
            nationality: pick_value(&criteria.nationalities, &catalog.nationalities, "nationality", rng)?,
            salary_range: pick_value(&criteria.salary_ranges, &catalog.salary_ranges, "salary_range", rng)?,
            hobbies: BTreeSet::new(),
            priorities: BTreeSet::new(),
            constraints: BTreeSet::new(),
            synthetic: true,
        };

        for field in MultiField::all() {
            *record.multi_mut(*field) = multi_values(
                &criteria.desired(*field),
                criteria.min_matching(*field),
                catalog.multi(*field),
                field.padding_range(),
                rng,
            );
        }

        Ok(record)
    }
}

// ─────────────────────────────────────────────────────────────────
// Selected Persona
// ─────────────────────────────────────────────────────────────────

/// Immutable view of a persona chosen for one review run.
///
/// Serialized with a `kind` tag next to the record's own fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SelectedPersona {
    Consumer(PersonaRecord),
    Expert(ExpertRecord),
}

impl SelectedPersona {
    pub fn kind(&self) -> PersonaKind {
        match self {
            SelectedPersona::Consumer(_) => PersonaKind::Consumer,
            SelectedPersona::Expert(_) => PersonaKind::Expert,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SelectedPersona::Consumer(record) => &record.name,
            SelectedPersona::Expert(record) => &record.name,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        match self {
            SelectedPersona::Consumer(record) => record.synthetic,
            SelectedPersona::Expert(record) => record.synthetic,
        }
    }

    pub fn as_consumer(&self) -> Option<&PersonaRecord> {
        match self {
            SelectedPersona::Consumer(record) => Some(record),
            SelectedPersona::Expert(_) => None,
        }
    }

    pub fn as_expert(&self) -> Option<&ExpertRecord> {
        match self {
            SelectedPersona::Expert(record) => Some(record),
            SelectedPersona::Consumer(_) => None,
        }
    }

    /// Render the prompt-facing profile.
    pub fn profile(&self) -> ReviewerProfile {
        match self {
            SelectedPersona::Consumer(record) => ReviewerProfile::Consumer(record.into()),
            SelectedPersona::Expert(record) => ReviewerProfile::Expert(record.into()),
        }
    }
}

impl From<PersonaRecord> for SelectedPersona {
    fn from(record: PersonaRecord) -> Self {
        SelectedPersona::Consumer(record)
    }
}

impl From<ExpertRecord> for SelectedPersona {
    fn from(record: ExpertRecord) -> Self {
        SelectedPersona::Expert(record)
    }
}

impl fmt::Display for SelectedPersona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectedPersona::Consumer(r) => {
                write!(f, "{} ({}, {}, {})", r.name, r.age, r.profession, r.nationality)
            }
            SelectedPersona::Expert(r) => write!(
                f,
                "{} ({}, {}, {} years)",
                r.name, r.age, r.profession, r.years_experience
            ),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Reviewer Profile
// ─────────────────────────────────────────────────────────────────

/// Persona as handed to prompt templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReviewerProfile {
    Consumer(ConsumerProfile),
    Expert(ExpertProfile),
}

/// Consumer persona with multi-valued fields rendered as comma-separated
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerProfile {
    pub name: String,
    pub age: u32,
    pub profession: String,
    pub nationality: String,
    pub salary_range: String,
    pub hobbies: String,
    pub priorities: String,
    pub constraints: String,
}

impl From<&PersonaRecord> for ConsumerProfile {
    fn from(record: &PersonaRecord) -> Self {
        Self {
            name: record.name.clone(),
            age: record.age,
            profession: record.profession.clone(),
            nationality: record.nationality.clone(),
            salary_range: record.salary_range.clone(),
            hobbies: join_values(&record.hobbies),
            priorities: join_values(&record.priorities),
            constraints: join_values(&record.constraints),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
