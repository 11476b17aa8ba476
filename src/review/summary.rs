//! Structured review summary and its resilient parser.
//!
//! The summary model is asked for strict JSON but routinely wraps it in prose
//! or code fences. Parsing starts at the first `{`, decodes a single JSON
//! value and ignores whatever follows. Anything that does not decode into the
//! schema becomes the fallback summary; parsing never fails outward.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::error::{Error, Result};

/// Maximum number of strengths and of concerns kept.
pub const MAX_KEY_POINTS: usize = 5;

/// Maximum number of common themes kept.
pub const MAX_THEMES: usize = 6;

const PARSE_SENTINEL: &str = "Unable to parse review";
const PROCESSING_SENTINEL: &str = "Error processing review";
const NO_REVIEWS_SENTINEL: &str = "No reviews available";

// ─────────────────────────────────────────────────────────────────
// Summary Types
// ─────────────────────────────────────────────────────────────────

/// Reviewer-group observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicInsights {
    pub profession_based: String,
    pub age_based: String,
    pub nationality_based: String,
}

impl DemographicInsights {
    fn uniform(text: &str) -> Self {
        Self {
            profession_based: text.to_string(),
            age_based: text.to_string(),
            nationality_based: text.to_string(),
        }
    }
}

/// Aggregate view of all persona reviews for one product.
///
/// Equality compares the serialized fields only, so a fallback summary
/// equals its own JSON round trip even though the flag is not carried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredSummary {
    pub overall_sentiment: String,
    pub purchase_intent_percentage: f64,
    pub confidence_score: f64,
    pub key_strengths: Vec<String>,
    pub key_concerns: Vec<String>,
    pub demographic_insights: DemographicInsights,
    pub common_themes: Vec<String>,
    pub recommendation: String,
    pub detailed_summary: String,

    /// Set on the fallback instances; not part of the wire format.
    #[serde(skip)]
    fallback: bool,
}

impl PartialEq for StructuredSummary {
    fn eq(&self, other: &Self) -> bool {
        self.overall_sentiment == other.overall_sentiment
            && self.purchase_intent_percentage == other.purchase_intent_percentage
            && self.confidence_score == other.confidence_score
            && self.key_strengths == other.key_strengths
            && self.key_concerns == other.key_concerns
            && self.demographic_insights == other.demographic_insights
            && self.common_themes == other.common_themes
            && self.recommendation == other.recommendation
            && self.detailed_summary == other.detailed_summary
    }
}

impl StructuredSummary {
    // ─────────────────────────────────────────────────────────────
    // Parsing
    // ─────────────────────────────────────────────────────────────

    /// Parse model output, returning the fallback summary on any failure.
    pub fn from_model_output(raw: &str) -> Self {
        match Self::parse(raw) {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, content = %raw, "Failed to parse summary output");
                Self::unparsable()
            }
        }
    }

    /// Strictly parse model output into a normalized summary.
    pub fn parse(raw: &str) -> Result<Self> {
        let start = raw
            .find('{')
            .ok_or_else(|| Error::SummaryParse("no JSON object in model output".to_string()))?;

        let value = serde_json::Deserializer::from_str(&raw[start..])
            .into_iter::<Value>()
            .next()
            .ok_or_else(|| Error::SummaryParse("empty JSON payload".to_string()))?
            .map_err(|e| Error::SummaryParse(format!("invalid JSON: {}", e)))?;

        if !value.is_object() {
            return Err(Error::SummaryParse("parsed JSON is not an object".to_string()));
        }

        let summary: StructuredSummary = serde_json::from_value(value)
            .map_err(|e| Error::SummaryParse(format!("schema mismatch: {}", e)))?;

        Ok(summary.normalized())
    }

    fn normalized(mut self) -> Self {
        self.purchase_intent_percentage = clamp_percentage(self.purchase_intent_percentage);
        self.confidence_score = clamp_percentage(self.confidence_score);
        self.key_strengths.truncate(MAX_KEY_POINTS);
        self.key_concerns.truncate(MAX_KEY_POINTS);
        self.common_themes.truncate(MAX_THEMES);
        self
    }

    /// Pretty-printed JSON form; parses back into an equal summary. The
    /// fallback flag is not serialized.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ─────────────────────────────────────────────────────────────
    // Fallbacks
    // ─────────────────────────────────────────────────────────────

    fn fallback(sentinel: &str, insights: &str, recommendation: &str, detailed: String) -> Self {
        Self {
            overall_sentiment: "Neutral".to_string(),
            purchase_intent_percentage: 0.0,
            confidence_score: 0.0,
            key_strengths: vec![sentinel.to_string()],
            key_concerns: vec![sentinel.to_string()],
            demographic_insights: DemographicInsights::uniform(insights),
            common_themes: vec![sentinel.to_string()],
            recommendation: recommendation.to_string(),
            detailed_summary: detailed,
            fallback: true,
        }
    }

    /// Summary used when the model output cannot be parsed.
    pub fn unparsable() -> Self {
        Self::fallback(
            PARSE_SENTINEL,
            PARSE_SENTINEL,
            "Unable to generate recommendation due to parsing error",
            "Unable to generate summary due to parsing error".to_string(),
        )
    }

    /// Summary used when the summary request itself failed.
    pub fn processing_failed(error: &Error) -> Self {
        Self::fallback(
            PROCESSING_SENTINEL,
            "Processing failed",
            "Unable to generate recommendation due to processing error",
            format!("Error occurred while processing reviews: {}", error),
        )
    }

    /// Summary used when no persona produced a review.
    pub fn no_reviews() -> Self {
        Self::fallback(
            NO_REVIEWS_SENTINEL,
            NO_REVIEWS_SENTINEL,
            "Unable to generate recommendation because no reviews were collected",
            "No reviews were collected for this run.".to_string(),
        )
    }

    /// Whether this is one of the fallback summaries.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

fn clamp_percentage(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
