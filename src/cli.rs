//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for review-panel.

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use crate::backend::parse_overlay_pair;
use crate::persona::{AgeRange, ExpertCriteria, PersonaKind, SelectionCriteria, YearRange};

/// review-panel - Synthetic consumer panels for product feedback
///
/// Selects personas from a CSV catalog, has each one review a product
/// through an LLM backend, and summarizes the panel's reaction.
#[derive(Parser, Debug)]
#[command(name = "review-panel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "REVIEW_PANEL_CONFIG")]
    pub config: Option<String>,

    /// Persona CSV file (overrides [personas] data_file)
    #[arg(long, global = true, value_name = "FILE")]
    pub personas: Option<String>,

    /// Persona family in the CSV file: consumer, expert
    #[arg(long, global = true, value_name = "KIND")]
    pub kind: Option<PersonaKind>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a persona panel against a product and summarize the reviews
    Review(ReviewArgs),

    /// Inspect the persona catalog and preview selections
    Personas {
        #[command(subcommand)]
        subcommand: PersonasSubcommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Display version and build information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct ReviewArgs {
    /// Product description file (JSON or TOML)
    #[arg(short, long, value_name = "FILE")]
    pub product: String,

    /// Selection criteria file (JSON or TOML); flags below refine it
    #[arg(long = "criteria", value_name = "FILE")]
    pub criteria_file: Option<String>,

    #[command(flatten)]
    pub criteria: CriteriaArgs,

    /// Number of personas on the panel
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Generation backend: gemini, openai, mock
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Credential for the generation backend
    #[arg(long)]
    pub api_key: Option<String>,

    /// Backend override as KEY=VALUE (repeatable), e.g. --set model=gpt-4o
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_overlay_pair)]
    pub overrides: Vec<(String, Value)>,

    /// Return only real personas, even if fewer than requested
    #[arg(long)]
    pub no_backfill: bool,

    /// Print the full outcome as JSON instead of the text report
    #[arg(long)]
    pub json: bool,
}

/// Criteria flags shared by `review` and `personas select`
///
/// Flags that do not apply to the active persona kind are ignored.
#[derive(Args, Debug, Clone, Default)]
pub struct CriteriaArgs {
    /// Inclusive age range
    #[arg(long, value_name = "MIN-MAX")]
    pub age: Option<AgeRange>,

    /// Inclusive years-of-experience range (expert)
    #[arg(long, value_name = "MIN-MAX")]
    pub experience: Option<YearRange>,

    /// Allowed industry focus (expert, repeatable)
    #[arg(long = "industry", value_name = "NAME")]
    pub industries: Vec<String>,

    /// Desired expertise area (expert, repeatable)
    #[arg(long = "expertise", value_name = "AREA")]
    pub expertise: Vec<String>,

    /// Desired specialization (expert, repeatable)
    #[arg(long = "specialization", value_name = "SKILL")]
    pub specializations: Vec<String>,

    #[arg(long, value_name = "N")]
    pub min_matching_expertise: Option<usize>,

    #[arg(long, value_name = "N")]
    pub min_matching_specializations: Option<usize>,

    /// Allowed profession (repeatable)
    #[arg(long = "profession", value_name = "NAME")]
    pub professions: Vec<String>,

    /// Allowed nationality (consumer, repeatable)
    #[arg(long = "nationality", value_name = "NAME")]
    pub nationalities: Vec<String>,

    /// Allowed salary range label (consumer, repeatable)
    #[arg(long = "salary-range", value_name = "LABEL")]
    pub salary_ranges: Vec<String>,

    /// Desired hobby (consumer, repeatable)
    #[arg(long = "hobby", value_name = "HOBBY")]
    pub hobbies: Vec<String>,

    /// Desired priority (consumer, repeatable)
    #[arg(long = "priority", value_name = "PRIORITY")]
    pub priorities: Vec<String>,

    /// Desired constraint (consumer, repeatable)
    #[arg(long = "constraint", value_name = "CONSTRAINT")]
    pub constraints: Vec<String>,

    #[arg(long, value_name = "N")]
    pub min_matching_hobbies: Option<usize>,

    #[arg(long, value_name = "N")]
    pub min_matching_priorities: Option<usize>,

    #[arg(long, value_name = "N")]
    pub min_matching_constraints: Option<usize>,
}

fn replace(target: &mut Vec<String>, given: &[String]) {
    if !given.is_empty() {
        *target = given.to_vec();
    }
}

impl CriteriaArgs {
    /// Apply the flags on top of `criteria`. Given lists replace file lists.
    pub fn apply(&self, criteria: &mut SelectionCriteria) {
        if self.age.is_some() {
            criteria.age_range = self.age;
        }
        replace(&mut criteria.professions, &self.professions);
        replace(&mut criteria.nationalities, &self.nationalities);
        replace(&mut criteria.salary_ranges, &self.salary_ranges);
        replace(&mut criteria.desired_hobbies, &self.hobbies);
        replace(&mut criteria.desired_priorities, &self.priorities);
        replace(&mut criteria.desired_constraints, &self.constraints);

        if let Some(n) = self.min_matching_hobbies {
            criteria.min_matching_hobbies = n;
        }
        if let Some(n) = self.min_matching_priorities {
            criteria.min_matching_priorities = n;
        }
        if let Some(n) = self.min_matching_constraints {
            criteria.min_matching_constraints = n;
        }
    }

    /// Apply the flags on top of expert `criteria`.
    pub fn apply_expert(&self, criteria: &mut ExpertCriteria) {
        if self.age.is_some() {
            criteria.age_range = self.age;
        }
        if self.experience.is_some() {
            criteria.experience_range = self.experience;
        }
        replace(&mut criteria.professions, &self.professions);
        replace(&mut criteria.industry_focus, &self.industries);
        replace(&mut criteria.desired_expertise, &self.expertise);
        replace(&mut criteria.desired_specializations, &self.specializations);

        if let Some(n) = self.min_matching_expertise {
            criteria.min_matching_expertise = n;
        }
        if let Some(n) = self.min_matching_specializations {
            criteria.min_matching_specializations = n;
        }
    }
}

/// Criteria types the command-line flags can refine.
pub trait ApplyFlags {
    fn apply_flags(&mut self, flags: &CriteriaArgs);
}

impl ApplyFlags for SelectionCriteria {
    fn apply_flags(&mut self, flags: &CriteriaArgs) {
        flags.apply(self);
    }
}

impl ApplyFlags for ExpertCriteria {
    fn apply_flags(&mut self, flags: &CriteriaArgs) {
        flags.apply_expert(self);
    }
}

/// Persona subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PersonasSubcommand {
    /// Print the distinct values available for each persona field (JSON)
    Catalog,

    /// Preview a persona selection without generating reviews (JSON)
    Select {
        /// Selection criteria file (JSON or TOML)
        #[arg(long = "criteria", value_name = "FILE")]
        criteria_file: Option<String>,

        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Number of personas to select
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Return only real personas
        #[arg(long)]
        no_backfill: bool,

        /// RNG seed for a reproducible selection
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}
