//! Criteria-based persona selection with synthetic backfill.
//!
//! Selection filters the store conjunctively, scores records on their overlap
//! with the desired multi-valued sets, synthesizes new personas when too few
//! records qualify, and trims an over-full panel either by score or by
//! uniform sampling. The engine is shared by every persona kind.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::schema::{PanelCriteria, PersonaSchema};
use super::store::PersonaStore;
use super::types::SelectedPersona;
use crate::error::{Error, Result};

const NAME_ATTEMPTS: usize = 64;

/// A candidate record and its total match score.
struct Candidate<P> {
    record: P,
    score: usize,
}

// ─────────────────────────────────────────────────────────────────
// Persona Selector
// ─────────────────────────────────────────────────────────────────

/// Builds persona panels from a shared store.
#[derive(Debug, Clone)]
pub struct PersonaSelector<P: PersonaSchema> {
    store: Arc<PersonaStore<P>>,
    seed: Option<u64>,
}

impl<P: PersonaSchema> PersonaSelector<P> {
    pub fn new(store: Arc<PersonaStore<P>>) -> Self {
        Self { store, seed: None }
    }

    /// Fix the RNG seed so repeated selections are reproducible.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn store(&self) -> &PersonaStore<P> {
        &self.store
    }

    /// Select `count` personas matching `criteria`.
    ///
    /// With `allow_backfill` the result always holds exactly `count`
    /// personas; otherwise it holds `min(count, matches)`.
    pub fn select(
        &self,
        criteria: &P::Criteria,
        count: usize,
        allow_backfill: bool,
    ) -> Result<Vec<SelectedPersona>> {
        Ok(self
            .select_records(criteria, count, allow_backfill)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Like [`select`](Self::select) but keeps the typed records.
    pub fn select_records(
        &self,
        criteria: &P::Criteria,
        count: usize,
        allow_backfill: bool,
    ) -> Result<Vec<P>> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.select_with_rng(criteria, count, allow_backfill, &mut rng)
    }

    /// Selection with a caller-provided RNG.
    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        criteria: &P::Criteria,
        count: usize,
        allow_backfill: bool,
        rng: &mut R,
    ) -> Result<Vec<P>> {
        criteria.validate()?;

        if count == 0 {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<Candidate<P>> = self
            .store
            .records()
            .iter()
            .filter(|record| criteria.matches_scalars(record))
            .filter_map(|record| {
                criteria.score(record).map(|score| Candidate {
                    record: record.clone(),
                    score,
                })
            })
            .collect();

        let matched = candidates.len();
        debug!(kind = %P::KIND, matched, requested = count, "Filtered persona store");

        if matched < count && allow_backfill {
            let synthesized = self.synthesize(criteria, count - matched, rng)?;
            info!(
                kind = %P::KIND,
                real = matched,
                synthesized = synthesized.len(),
                "Backfilled persona panel"
            );
            candidates.extend(synthesized);
        }

        if candidates.len() > count {
            candidates = if criteria.has_scoring() {
                // sort_by is stable: ties keep store order, then synthesis order
                candidates.sort_by(|a, b| b.score.cmp(&a.score));
                candidates.truncate(count);
                candidates
            } else {
                let mut picked = index::sample(rng, candidates.len(), count).into_vec();
                picked.sort_unstable();
                let mut slots: Vec<Option<Candidate<P>>> =
                    candidates.into_iter().map(Some).collect();
                picked
                    .into_iter()
                    .filter_map(|i| slots[i].take())
                    .collect()
            };
        }

        Ok(candidates.into_iter().map(|c| c.record).collect())
    }

    // ─────────────────────────────────────────────────────────────
    // Backfill
    // ─────────────────────────────────────────────────────────────

    fn synthesize<R: Rng + ?Sized>(
        &self,
        criteria: &P::Criteria,
        needed: usize,
        rng: &mut R,
    ) -> Result<Vec<Candidate<P>>> {
        let catalog = self.store.catalog();
        let mut used_names = HashSet::new();
        let mut synthesized = Vec::with_capacity(needed);

        for _ in 0..needed {
            let name = self.unique_name(&used_names, rng);
            used_names.insert(name.clone());

            let record = P::synthesize(name, criteria, catalog, rng)?;
            let score = criteria.score(&record).unwrap_or(0);
            synthesized.push(Candidate { record, score });
        }

        Ok(synthesized)
    }

    /// A `<prefix>NNNN` name unused by the store and this call.
    fn unique_name<R: Rng + ?Sized>(&self, used: &HashSet<String>, rng: &mut R) -> String {
        let prefix = P::SYNTHETIC_PREFIX;
        let free = |name: &String| !self.store.contains_name(name) && !used.contains(name);

        for _ in 0..NAME_ATTEMPTS {
            let name = format!("{}{}", prefix, rng.gen_range(1000..=9999));
            if free(&name) {
                return name;
            }
        }

        (1000u64..)
            .map(|n| format!("{}{}", prefix, n))
            .find(|name| free(name))
            .unwrap_or_else(|| format!("{}{}", prefix, uuid::Uuid::new_v4().simple()))
    }
}

/// Pick uniformly from the allow-list, or from the catalog when unrestricted.
pub(crate) fn pick_value<R: Rng + ?Sized>(
    allowed: &[String],
    catalog: &BTreeSet<String>,
    field: &str,
    rng: &mut R,
) -> Result<String> {
    let pool: Vec<&String> = if allowed.is_empty() {
        catalog.iter().collect()
    } else {
        allowed.iter().collect()
    };

    pool.choose(rng).map(|v| (*v).clone()).ok_or_else(|| {
        Error::Selection(format!(
            "cannot synthesize personas: no {} values available in the catalog",
            field
        ))
    })
}

/// Seed with exactly `threshold` desired values, then pad from the catalog.
pub(crate) fn multi_values<R: Rng + ?Sized>(
    desired: &BTreeSet<String>,
    threshold: usize,
    catalog: &BTreeSet<String>,
    (pad_min, pad_max): (usize, usize),
    rng: &mut R,
) -> BTreeSet<String> {
    let desired: Vec<&String> = desired.iter().collect();
    let mut values: BTreeSet<String> = desired
        .choose_multiple(rng, threshold.min(desired.len()))
        .map(|v| (*v).clone())
        .collect();

    let pool: Vec<&String> = catalog.iter().filter(|v| !values.contains(*v)).collect();
    let padding = rng.gen_range(pad_min..=pad_max).min(pool.len());
    values.extend(pool.choose_multiple(rng, padding).map(|v| (*v).clone()));

    values
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
