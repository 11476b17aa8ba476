//! Expert reviewer personas.
//!
//! An expert is an industry professional described by years of experience,
//! an industry focus and two multi-valued attributes: expertise areas and
//! specializations. Experts run through the same store and selection engine
//! as consumers.

use std::collections::BTreeSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::criteria::{allowed, check_range, check_threshold, overlap, YearRange};
use super::schema::{PanelCriteria, PersonaKind, PersonaSchema};
use super::selector::{multi_values, pick_value};
use super::store::CsvRow;
use super::types::join_values;
use crate::error::Result;

/// Columns every expert persona source must provide.
pub const EXPERT_COLUMNS: &[&str] = &[
    "name",
    "age",
    "profession",
    "expertise_areas",
    "years_experience",
    "specializations",
    "industry_focus",
];

/// Age bounds for synthesized experts when none are requested.
pub const DEFAULT_EXPERT_AGE_RANGE: YearRange = YearRange { min: 25, max: 65 };

/// Experience bounds for synthesized experts when none are requested.
pub const DEFAULT_EXPERIENCE_RANGE: YearRange = YearRange { min: 2, max: 20 };

// ─────────────────────────────────────────────────────────────────
// Expert Fields
// ─────────────────────────────────────────────────────────────────

/// The multi-valued expert attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertField {
    ExpertiseAreas,
    Specializations,
}

impl ExpertField {
    pub fn key(&self) -> &'static str {
        match self {
            ExpertField::ExpertiseAreas => "expertise_areas",
            ExpertField::Specializations => "specializations",
        }
    }

    pub fn all() -> &'static [ExpertField] {
        &[ExpertField::ExpertiseAreas, ExpertField::Specializations]
    }

    /// How many extra catalog values backfill pads with, as `(min, max)`.
    pub fn padding_range(&self) -> (usize, usize) {
        match self {
            ExpertField::ExpertiseAreas => (1, 3),
            ExpertField::Specializations => (3, 3),
        }
    }
}

impl fmt::Display for ExpertField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

// ─────────────────────────────────────────────────────────────────
// Expert Record
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertRecord {
    pub name: String,
    pub age: u32,
    pub profession: String,
    pub years_experience: u32,
    pub industry_focus: String,
    pub expertise_areas: BTreeSet<String>,
    pub specializations: BTreeSet<String>,

    /// True for experts synthesized during backfill.
    #[serde(default)]
    pub synthetic: bool,
}

impl ExpertRecord {
    pub fn multi(&self, field: ExpertField) -> &BTreeSet<String> {
        match field {
            ExpertField::ExpertiseAreas => &self.expertise_areas,
            ExpertField::Specializations => &self.specializations,
        }
    }

    pub fn multi_mut(&mut self, field: ExpertField) -> &mut BTreeSet<String> {
        match field {
            ExpertField::ExpertiseAreas => &mut self.expertise_areas,
            ExpertField::Specializations => &mut self.specializations,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────

/// Distinct observed values per expert field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpertCatalog {
    pub ages: BTreeSet<u32>,
    pub years_experience: BTreeSet<u32>,
    pub professions: BTreeSet<String>,
    pub industry_focus: BTreeSet<String>,
    pub expertise_areas: BTreeSet<String>,
    pub specializations: BTreeSet<String>,
}

impl ExpertCatalog {
    fn build(records: &[ExpertRecord]) -> Self {
        let mut catalog = Self::default();
        for record in records {
            catalog.ages.insert(record.age);
            catalog.years_experience.insert(record.years_experience);
            catalog.professions.insert(record.profession.clone());
            catalog.industry_focus.insert(record.industry_focus.clone());
            catalog
                .expertise_areas
                .extend(record.expertise_areas.iter().cloned());
            catalog
                .specializations
                .extend(record.specializations.iter().cloned());
        }
        catalog
    }

    pub fn multi(&self, field: ExpertField) -> &BTreeSet<String> {
        match field {
            ExpertField::ExpertiseAreas => &self.expertise_areas,
            ExpertField::Specializations => &self.specializations,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Criteria
// ─────────────────────────────────────────────────────────────────

fn default_min_matching() -> usize {
    1
}

/// Constraints an expert panel must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpertCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<YearRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_range: Option<YearRange>,

    #[serde(default)]
    pub professions: Vec<String>,

    #[serde(default)]
    pub industry_focus: Vec<String>,

    #[serde(default)]
    pub desired_expertise: Vec<String>,

    #[serde(default)]
    pub desired_specializations: Vec<String>,

    #[serde(default = "default_min_matching")]
    pub min_matching_expertise: usize,

    #[serde(default = "default_min_matching")]
    pub min_matching_specializations: usize,
}

impl Default for ExpertCriteria {
    fn default() -> Self {
        Self {
            age_range: None,
            experience_range: None,
            professions: Vec::new(),
            industry_focus: Vec::new(),
            desired_expertise: Vec::new(),
            desired_specializations: Vec::new(),
            min_matching_expertise: 1,
            min_matching_specializations: 1,
        }
    }
}

impl ExpertCriteria {
    pub fn desired(&self, field: ExpertField) -> BTreeSet<String> {
        let values = match field {
            ExpertField::ExpertiseAreas => &self.desired_expertise,
            ExpertField::Specializations => &self.desired_specializations,
        };
        values.iter().cloned().collect()
    }

    pub fn min_matching(&self, field: ExpertField) -> usize {
        match field {
            ExpertField::ExpertiseAreas => self.min_matching_expertise,
            ExpertField::Specializations => self.min_matching_specializations,
        }
    }
}

impl PanelCriteria<ExpertRecord> for ExpertCriteria {
    fn validate(&self) -> Result<()> {
        check_range("age_range", self.age_range)?;
        check_range("experience_range", self.experience_range)?;
        check_threshold(
            "expertise",
            self.desired(ExpertField::ExpertiseAreas).len(),
            self.min_matching_expertise,
        )?;
        check_threshold(
            "specializations",
            self.desired(ExpertField::Specializations).len(),
            self.min_matching_specializations,
        )
    }

    fn matches_scalars(&self, record: &ExpertRecord) -> bool {
        self.age_range.map_or(true, |r| r.contains(record.age))
            && self
                .experience_range
                .map_or(true, |r| r.contains(record.years_experience))
            && allowed(&self.professions, &record.profession)
            && allowed(&self.industry_focus, &record.industry_focus)
    }

    fn score(&self, record: &ExpertRecord) -> Option<usize> {
        ExpertField::all().iter().try_fold(0, |total, field| {
            overlap(record.multi(*field), &self.desired(*field), self.min_matching(*field))
                .map(|n| total + n)
        })
    }

    fn has_scoring(&self) -> bool {
        !self.desired_expertise.is_empty() || !self.desired_specializations.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────────────────────────

impl PersonaSchema for ExpertRecord {
    const KIND: PersonaKind = PersonaKind::Expert;
    const REQUIRED_COLUMNS: &'static [&'static str] = EXPERT_COLUMNS;
    const SYNTHETIC_PREFIX: &'static str = "Reviewer_";

    type Criteria = ExpertCriteria;
    type Catalog = ExpertCatalog;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    fn from_row(row: &CsvRow<'_>) -> Result<Self> {
        let age = row.integer("age")?;
        let years_experience = row.integer("years_experience")?;
        Ok(Self {
            name: row.text("name")?,
            age,
            profession: row.text("profession")?,
            years_experience,
            industry_focus: row.text("industry_focus")?,
            expertise_areas: row.values("expertise_areas"),
            specializations: row.values("specializations"),
            synthetic: false,
        })
    }

    fn blank_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("profession", &self.profession),
            ("industry_focus", &self.industry_focus),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(column, _)| column)
    }

    fn build_catalog(records: &[Self]) -> ExpertCatalog {
        ExpertCatalog::build(records)
    }

    fn synthesize<G: Rng + ?Sized>(
        name: String,
        criteria: &ExpertCriteria,
        catalog: &ExpertCatalog,
        rng: &mut G,
    ) -> Result<Self> {
        let ages = criteria.age_range.unwrap_or(DEFAULT_EXPERT_AGE_RANGE);
        let experience = criteria.experience_range.unwrap_or(DEFAULT_EXPERIENCE_RANGE);

        let mut record = ExpertRecord {
            name,
            age: rng.gen_range(ages.min..=ages.max),
            years_experience: rng.gen_range(experience.min..=experience.max),
            profession: pick_value(&criteria.professions, &catalog.professions, "profession", rng)?,
            industry_focus: pick_value(
                &criteria.industry_focus,
                &catalog.industry_focus,
                "industry_focus",
                rng,
            )?,
            expertise_areas: BTreeSet::new(),
            specializations: BTreeSet::new(),
            synthetic: true,
        };

        for field in ExpertField::all() {
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
// Prompt Profile
// ─────────────────────────────────────────────────────────────────

/// Expert as handed to prompt templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertProfile {
    pub name: String,
    pub age: u32,
    pub profession: String,
    pub years_experience: u32,
    pub industry_focus: String,
    pub expertise_areas: String,
    pub specializations: String,
}

impl From<&ExpertRecord> for ExpertProfile {
    fn from(record: &ExpertRecord) -> Self {
        Self {
            name: record.name.clone(),
            age: record.age,
            profession: record.profession.clone(),
            years_experience: record.years_experience,
            industry_focus: record.industry_focus.clone(),
            expertise_areas: join_values(&record.expertise_areas),
            specializations: join_values(&record.specializations),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
