//! Selection criteria for building a persona panel.
//!
//! Every constraint is optional. An absent constraint, or an empty list,
//! places no restriction on its field.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::schema::PanelCriteria;
use super::types::{MultiField, PersonaRecord};
use crate::error::{Error, Result};

/// Default age bounds used when backfill has no requested range.
pub const DEFAULT_AGE_RANGE: AgeRange = YearRange { min: 18, max: 80 };

// ─────────────────────────────────────────────────────────────────
// Year Range
// ─────────────────────────────────────────────────────────────────

/// Inclusive range over a whole-year field such as age or experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: u32,
    pub max: u32,
}

pub type AgeRange = YearRange;

impl YearRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age <= self.max
    }

    pub fn is_inverted(&self) -> bool {
        self.min > self.max
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for YearRange {
    type Err = String;

    /// Parses `MIN-MAX`, e.g. `25-35`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid range '{}'. Expected MIN-MAX", s))?;

        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| format!("Invalid value '{}' in range '{}'", v.trim(), s))
        };

        Ok(YearRange::new(parse(min)?, parse(max)?))
    }
}

/// Reject an inverted range.
pub(crate) fn check_range(field: &str, range: Option<YearRange>) -> Result<()> {
    match range {
        Some(range) if range.is_inverted() => Err(Error::unsatisfiable(
            field,
            format!("minimum {} is greater than maximum {}", range.min, range.max),
        )),
        _ => Ok(()),
    }
}

/// Reject a threshold larger than its desired set.
pub(crate) fn check_threshold(field: &str, desired: usize, threshold: usize) -> Result<()> {
    if desired > 0 && threshold > desired {
        return Err(Error::unsatisfiable(
            format!("min_matching_{}", field),
            format!(
                "threshold {} exceeds the {} desired value(s)",
                threshold, desired
            ),
        ));
    }
    Ok(())
}

/// Whether `value` passes an allow-list; an empty list allows everything.
pub(crate) fn allowed(list: &[String], value: &str) -> bool {
    list.is_empty() || list.iter().any(|v| v == value)
}

/// Overlap with `desired`, or `None` below `threshold`. An empty desired
/// set scores zero and never fails.
pub(crate) fn overlap(values: &BTreeSet<String>, desired: &BTreeSet<String>, threshold: usize) -> Option<usize> {
    if desired.is_empty() {
        return Some(0);
    }
    let count = values.intersection(desired).count();
    (count >= threshold).then_some(count)
}

/// Load criteria of any kind from a JSON or TOML file, chosen by extension.
pub fn load_criteria<C: DeserializeOwned>(path: &Path) -> Result<C> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    if is_toml {
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e),
            source: Some(e),
        })
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

// ─────────────────────────────────────────────────────────────────
// Selection Criteria
// ─────────────────────────────────────────────────────────────────

fn default_min_matching() -> usize {
    1
}

/// Constraints a persona panel must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<AgeRange>,

    #[serde(default)]
    pub professions: Vec<String>,

    #[serde(default)]
    pub nationalities: Vec<String>,

    #[serde(default)]
    pub salary_ranges: Vec<String>,

    #[serde(default)]
    pub desired_hobbies: Vec<String>,

    #[serde(default)]
    pub desired_priorities: Vec<String>,

    #[serde(default)]
    pub desired_constraints: Vec<String>,

    #[serde(default = "default_min_matching")]
    pub min_matching_hobbies: usize,

    #[serde(default = "default_min_matching")]
    pub min_matching_priorities: usize,

    #[serde(default = "default_min_matching")]
    pub min_matching_constraints: usize,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            age_range: None,
            professions: Vec::new(),
            nationalities: Vec::new(),
            salary_ranges: Vec::new(),
            desired_hobbies: Vec::new(),
            desired_priorities: Vec::new(),
            desired_constraints: Vec::new(),
            min_matching_hobbies: 1,
            min_matching_priorities: 1,
            min_matching_constraints: 1,
        }
    }
}

impl SelectionCriteria {
    /// Load criteria from a JSON or TOML file, chosen by extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        load_criteria(path)
    }

    /// Desired values for a multi-valued field, deduplicated.
    pub fn desired(&self, field: MultiField) -> BTreeSet<String> {
        let values = match field {
            MultiField::Hobbies => &self.desired_hobbies,
            MultiField::Priorities => &self.desired_priorities,
            MultiField::Constraints => &self.desired_constraints,
        };
        values.iter().cloned().collect()
    }

    /// Minimum number of desired values a record must share.
    pub fn min_matching(&self, field: MultiField) -> usize {
        match field {
            MultiField::Hobbies => self.min_matching_hobbies,
            MultiField::Priorities => self.min_matching_priorities,
            MultiField::Constraints => self.min_matching_constraints,
        }
    }
}

impl PanelCriteria<PersonaRecord> for SelectionCriteria {
    fn validate(&self) -> Result<()> {
        check_range("age_range", self.age_range)?;
        for field in MultiField::all() {
            check_threshold(field.key(), self.desired(*field).len(), self.min_matching(*field))?;
        }
        Ok(())
    }

    fn matches_scalars(&self, record: &PersonaRecord) -> bool {
        self.age_range.map_or(true, |r| r.contains(record.age))
            && allowed(&self.professions, &record.profession)
            && allowed(&self.nationalities, &record.nationality)
            && allowed(&self.salary_ranges, &record.salary_range)
    }

    fn score(&self, record: &PersonaRecord) -> Option<usize> {
        MultiField::all().iter().try_fold(0, |total, field| {
            overlap(record.multi(*field), &self.desired(*field), self.min_matching(*field))
                .map(|n| total + n)
        })
    }

    fn has_scoring(&self) -> bool {
        MultiField::all()
            .iter()
            .any(|field| !self.desired(*field).is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::types::parse_multi_value;

    fn record(age: u32, profession: &str, hobbies: &str) -> PersonaRecord {
        PersonaRecord {
            name: "Test".into(),
            age,
            profession: profession.into(),
            nationality: "Canadian".into(),
            salary_range: "50k-70k".into(),
            hobbies: parse_multi_value(hobbies),
            priorities: BTreeSet::new(),
            constraints: BTreeSet::new(),
            synthetic: false,
        }
    }

    #[test]
    fn test_age_range_parse() {
        let range: AgeRange = "25-35".parse().unwrap();
        assert_eq!(range, AgeRange::new(25, 35));
        assert!(range.contains(25));
        assert!(range.contains(35));
        assert!(!range.contains(36));

        assert!("25".parse::<AgeRange>().is_err());
        assert!("a-b".parse::<AgeRange>().is_err());
    }

    #[test]
    fn test_defaults_from_json() {
        let criteria: SelectionCriteria =
            serde_json::from_str(r#"{"professions": ["Nurse"]}"#).unwrap();
        assert_eq!(criteria.min_matching_hobbies, 1);
        assert_eq!(criteria.min_matching_constraints, 1);
        assert!(criteria.age_range.is_none());
        assert!(!criteria.has_scoring());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("criteria.toml");
        std::fs::write(
            &path,
            r#"
professions = ["Teacher"]
desired_hobbies = ["reading", "gardening"]
min_matching_hobbies = 2

[age_range]
min = 30
max = 50
"#,
        )
        .unwrap();

        let criteria = SelectionCriteria::from_file(&path).unwrap();
        assert_eq!(criteria.age_range, Some(AgeRange::new(30, 50)));
        assert_eq!(criteria.min_matching_hobbies, 2);
        assert!(criteria.has_scoring());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let criteria = SelectionCriteria {
            age_range: Some(AgeRange::new(40, 20)),
            ..Default::default()
        };
        assert!(matches!(
            criteria.validate(),
            Err(Error::UnsatisfiableCriteria { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_impossible_threshold() {
        let criteria = SelectionCriteria {
            desired_hobbies: vec!["chess".into()],
            min_matching_hobbies: 2,
            ..Default::default()
        };
        let err = criteria.validate().unwrap_err();
        assert!(err.to_string().contains("min_matching_hobbies"));
    }

    #[test]
    fn test_empty_lists_do_not_restrict() {
        let criteria = SelectionCriteria::default();
        assert!(criteria.matches_scalars(&record(99, "Anything", "")));
        assert_eq!(criteria.score(&record(99, "Anything", "")), Some(0));
    }

    #[test]
    fn test_scalar_and_score_filters() {
        let criteria = SelectionCriteria {
            age_range: Some(AgeRange::new(25, 35)),
            professions: vec!["Software engineer".into()],
            desired_hobbies: vec!["gaming".into(), "hiking".into()],
            ..Default::default()
        };

        let hit = record(30, "Software engineer", "gaming, hiking, chess");
        assert!(criteria.matches_scalars(&hit));
        assert_eq!(criteria.score(&hit), Some(2));

        let wrong_job = record(30, "Chef", "gaming");
        assert!(!criteria.matches_scalars(&wrong_job));

        let no_overlap = record(30, "Software engineer", "chess");
        assert_eq!(criteria.score(&no_overlap), None);
    }
}
