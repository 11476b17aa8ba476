//! Plain-text rendering of a review outcome.

use std::fmt::Write;

use crate::review::ReviewOutcome;

const RULE_WIDTH: usize = 60;

/// Render the human-readable report for a finished run.
pub fn render(outcome: &ReviewOutcome) -> String {
    let mut out = String::new();
    let summary = &outcome.summary;
    let product = &outcome.product;
    let meta = &outcome.metadata;

    section(&mut out, "PRODUCT INFORMATION");
    let _ = writeln!(out, "Name: {}", product.name);
    let _ = writeln!(out, "Price: {}", product.price);
    let _ = writeln!(out, "Category: {}", product.category);
    let _ = writeln!(out, "Description: {}", product.description);

    section(&mut out, "REVIEW SUMMARY");
    let _ = writeln!(out, "Overall Sentiment: {}", summary.overall_sentiment);
    let _ = writeln!(out, "Purchase Intent: {:.1}%", summary.purchase_intent_percentage);
    let _ = writeln!(out, "Confidence Score: {:.1}%", summary.confidence_score);

    section(&mut out, "STRENGTHS");
    bullets(&mut out, &summary.key_strengths);

    section(&mut out, "CONCERNS");
    bullets(&mut out, &summary.key_concerns);

    section(&mut out, "DEMOGRAPHIC INSIGHTS");
    let insights = &summary.demographic_insights;
    let _ = writeln!(out, "Profession: {}", insights.profession_based);
    let _ = writeln!(out, "Age: {}", insights.age_based);
    let _ = writeln!(out, "Nationality: {}", insights.nationality_based);

    section(&mut out, "COMMON THEMES");
    bullets(&mut out, &summary.common_themes);

    section(&mut out, "RECOMMENDATION");
    let _ = writeln!(out, "{}", summary.recommendation);

    section(&mut out, "DETAILED SUMMARY");
    let _ = writeln!(out, "{}", summary.detailed_summary);

    section(&mut out, "ANALYSIS METADATA");
    let _ = writeln!(out, "Run ID: {}", meta.run_id);
    let _ = writeln!(out, "Total Personas: {}", meta.total_personas);
    let _ = writeln!(out, "Successful Reviews: {}", meta.successful_reviews);
    let _ = writeln!(out, "Failed Reviews: {}", meta.failed_reviews);
    let _ = writeln!(out, "AI Provider: {} ({})", meta.ai_provider, meta.model);

    if !outcome.failures.is_empty() {
        out.push('\n');
        for failure in &outcome.failures {
            let _ = writeln!(out, "  ! {}: {}", failure.persona, failure.error);
        }
    }

    out
}

fn section(out: &mut String, title: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
}

fn bullets(out: &mut String, items: &[String]) {
    for item in items {
        let _ = writeln!(out, "• {}", item);
    }
}
