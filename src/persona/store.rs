//! Persona store backed by a CSV source.
//!
//! The store validates every record on load and caches the per-field catalog
//! of distinct values. It is read-only afterwards and is shared across runs
//! as `Arc<PersonaStore<P>>`.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use super::expert::ExpertRecord;
use super::schema::PersonaSchema;
use super::types::{parse_multi_value, MultiField, PersonaRecord};
use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────

/// Distinct observed values per consumer persona field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonaCatalog {
    pub ages: BTreeSet<u32>,
    pub professions: BTreeSet<String>,
    pub nationalities: BTreeSet<String>,
    pub salary_ranges: BTreeSet<String>,
    pub hobbies: BTreeSet<String>,
    pub priorities: BTreeSet<String>,
    pub constraints: BTreeSet<String>,
}

impl PersonaCatalog {
    pub(crate) fn build(records: &[PersonaRecord]) -> Self {
        let mut catalog = Self::default();
        for record in records {
            catalog.ages.insert(record.age);
            catalog.professions.insert(record.profession.clone());
            catalog.nationalities.insert(record.nationality.clone());
            catalog.salary_ranges.insert(record.salary_range.clone());
            catalog.hobbies.extend(record.hobbies.iter().cloned());
            catalog.priorities.extend(record.priorities.iter().cloned());
            catalog.constraints.extend(record.constraints.iter().cloned());
        }
        catalog
    }

    /// Union of values seen for one multi-valued field.
    pub fn multi(&self, field: MultiField) -> &BTreeSet<String> {
        match field {
            MultiField::Hobbies => &self.hobbies,
            MultiField::Priorities => &self.priorities,
            MultiField::Constraints => &self.constraints,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// CSV Rows
// ─────────────────────────────────────────────────────────────────

/// One data row with its required columns located.
pub struct CsvRow<'a> {
    number: usize,
    record: &'a csv::StringRecord,
    index: &'a HashMap<&'static str, usize>,
}

impl CsvRow<'_> {
    /// 1-based data row number, header excluded.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Raw trimmed cell, empty when absent.
    pub fn cell(&self, column: &str) -> &str {
        self.index
            .get(column)
            .and_then(|&idx| self.record.get(idx))
            .unwrap_or("")
    }

    /// Required non-empty text cell.
    pub fn text(&self, column: &str) -> Result<String> {
        let value = self.cell(column);
        if value.is_empty() {
            return Err(Error::schema(self.number, format!("'{}' is empty", column)));
        }
        Ok(value.to_string())
    }

    /// Required non-negative integer cell.
    pub fn integer(&self, column: &str) -> Result<u32> {
        let text = self.text(column)?;
        text.parse::<u32>().map_err(|_| {
            Error::schema(
                self.number,
                format!("{} '{}' is not a non-negative integer", column, text),
            )
        })
    }

    /// Multi-valued cell normalized into a set.
    pub fn values(&self, column: &str) -> BTreeSet<String> {
        parse_multi_value(self.cell(column))
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Store
// ─────────────────────────────────────────────────────────────────

/// Validated persona records of one kind, in source order.
#[derive(Debug, Clone)]
pub struct PersonaStore<P: PersonaSchema> {
    records: Vec<P>,
    names: HashSet<String>,
    catalog: P::Catalog,
}

pub type ConsumerStore = PersonaStore<PersonaRecord>;
pub type ExpertStore = PersonaStore<ExpertRecord>;

impl<P: PersonaSchema> PersonaStore<P> {
    /// Load a store from a CSV file with a header row.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let store = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            kind = %P::KIND,
            personas = store.len(),
            "Persona store loaded"
        );
        Ok(store)
    }

    /// Build a store from any CSV reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let missing: Vec<String> = P::REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingColumns { columns: missing });
        }

        let index: HashMap<&'static str, usize> = P::REQUIRED_COLUMNS
            .iter()
            .filter_map(|col| headers.iter().position(|h| h == col).map(|i| (*col, i)))
            .collect();

        let mut records = Vec::new();
        for (i, row) in csv_reader.records().enumerate() {
            let row = row?;
            records.push(P::from_row(&CsvRow {
                number: i + 1,
                record: &row,
                index: &index,
            })?);
        }

        debug!(records = records.len(), kind = %P::KIND, "Parsed persona source");
        Self::from_records(records)
    }

    /// Build a store from already-typed records.
    pub fn from_records(records: Vec<P>) -> Result<Self> {
        for (i, record) in records.iter().enumerate() {
            if let Some(column) = record.blank_field() {
                return Err(Error::schema(i + 1, format!("'{}' is empty", column)));
            }
        }

        let names = records.iter().map(|r| r.name().to_string()).collect();
        let catalog = P::build_catalog(&records);

        Ok(Self {
            records,
            names,
            catalog,
        })
    }

    /// Distinct values per field, computed at load.
    pub fn catalog(&self) -> &P::Catalog {
        &self.catalog
    }

    pub fn records(&self) -> &[P] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
name,age,profession,nationality,salary_range,hobbies,priorities,constraints,notes
Alice,29,Software engineer,Canadian,80k-100k,\"['gaming', 'hiking']\",\"['Quality']\",\"['Budget']\",x
Bruno,54,Chef,Italian,40k-60k,\"cooking, cycling\",Price,,y
";

    #[test]
    fn test_load_from_reader() {
        let store = ConsumerStore::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains_name("Alice"));
        assert!(!store.contains_name("Carol"));

        let alice = &store.records()[0];
        assert_eq!(alice.age, 29);
        assert!(alice.hobbies.contains("hiking"));
        assert!(!alice.synthetic);

        let bruno = &store.records()[1];
        assert!(bruno.constraints.is_empty());
    }

    #[test]
    fn test_headers_are_normalized() {
        let csv = " Name ,AGE,Profession,Nationality,Salary_Range,Hobbies,Priorities,Constraints\n\
                   Dee,40,Nurse,Irish,30k-50k,reading,Safety,Time\n";
        let store = ConsumerStore::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(store.records()[0].name, "Dee");
    }

    #[test]
    fn test_missing_columns_are_all_listed() {
        let csv = "name,age,profession,nationality,salary_range\nA,1,B,C,D\n";
        let err = ConsumerStore::from_reader(csv.as_bytes()).unwrap_err();
        match err {
            Error::MissingColumns { columns } => {
                assert_eq!(columns, vec!["hobbies", "priorities", "constraints"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_age_reports_row() {
        let csv = "name,age,profession,nationality,salary_range,hobbies,priorities,constraints\n\
                   A,30,B,C,D,,,\n\
                   E,old,F,G,H,,,\n";
        let err = ConsumerStore::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Schema { row: 2, .. }));
    }

    #[test]
    fn test_empty_scalar_rejected() {
        let csv = "name,age,profession,nationality,salary_range,hobbies,priorities,constraints\n\
                   A,30,,C,D,,,\n";
        let err = ConsumerStore::from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("profession"));
    }

    #[test]
    fn test_catalog_is_union_and_stable() {
        let store = ConsumerStore::from_reader(CSV.as_bytes()).unwrap();
        let first = store.catalog().clone();
        let second = store.catalog().clone();
        assert_eq!(first, second);

        let hobbies: Vec<_> = first.hobbies.iter().map(String::as_str).collect();
        assert_eq!(hobbies, vec!["cooking", "cycling", "gaming", "hiking"]);
        assert_eq!(first.professions.len(), 2);
        assert!(first.ages.contains(&54));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConsumerStore::load(Path::new("/nonexistent/personas.csv")).unwrap_err();
        assert!(matches!(err, Error::IoRead { .. }));
    }
}
