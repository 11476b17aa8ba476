//! review-panel - Synthetic consumer panels for product feedback
//!
//! Entry point for the review-panel binary. Loads configuration, installs
//! logging and dispatches to the requested command.

mod backend;
mod cli;
mod config;
mod error;
mod logging;
mod persona;
mod report;
mod review;
mod version;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::cli::{
    ApplyFlags, Cli, Commands, ConfigSubcommand, CriteriaArgs, PersonasSubcommand, ReviewArgs,
};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::persona::{
    ExpertRecord, PersonaKind, PersonaRecord, PersonaSchema, PersonaSelector, PersonaStore,
};
use crate::review::{Product, ReviewManager, ReviewRequest};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    // Commands that do not need the full setup
    match cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { ref subcommand } => {
            return handle_config_command(subcommand, cli.config.as_deref());
        }
        _ => {}
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(ref personas) = cli.personas {
        config.personas.data_file = personas.clone();
    }
    if let Some(kind) = cli.kind {
        config.personas.kind = kind;
    }

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    debug!(version = %build.full_version(), profile = %build.profile, "Starting review-panel");

    match (cli.command, config.personas.kind) {
        (Commands::Review(args), PersonaKind::Consumer) => {
            run_review::<PersonaRecord>(config, args)
        }
        (Commands::Review(args), PersonaKind::Expert) => run_review::<ExpertRecord>(config, args),
        (Commands::Personas { subcommand }, PersonaKind::Consumer) => {
            handle_personas_command::<PersonaRecord>(config, subcommand)
        }
        (Commands::Personas { subcommand }, PersonaKind::Expert) => {
            handle_personas_command::<ExpertRecord>(config, subcommand)
        }
        (Commands::Version | Commands::Config { .. }, _) => Ok(()),
    }
}

/// Build the async runtime for a review run
fn build_runtime(config: &AppConfig) -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(config.generation.max_concurrency.clamp(1, 8))
        .thread_name("review-panel")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))
}

/// Criteria from an optional file, refined by command-line flags
fn resolve_criteria<C>(file: Option<&str>, flags: &CriteriaArgs) -> Result<C>
where
    C: DeserializeOwned + Default + ApplyFlags,
{
    let mut criteria = match file {
        Some(path) => persona::load_criteria(Path::new(path))?,
        None => C::default(),
    };
    criteria.apply_flags(flags);
    Ok(criteria)
}

/// Run a review panel for one product
fn run_review<P>(config: AppConfig, args: ReviewArgs) -> Result<()>
where
    P: PersonaSchema,
    P::Criteria: ApplyFlags,
{
    let product = Product::from_file(Path::new(&args.product))?;

    let mut request = ReviewRequest::<P>::from_config(&config);
    request.criteria = resolve_criteria(args.criteria_file.as_deref(), &args.criteria)?;
    if let Some(count) = args.count {
        request.num_personas = count;
    }
    if let Some(backend) = args.backend {
        request.backend = backend;
    }
    if let Some(api_key) = args.api_key {
        request.api_key = api_key;
    }
    request.overlay = args.overrides.into_iter().collect();
    if args.no_backfill {
        request.allow_backfill = false;
    }

    info!(
        product = %product.name,
        personas = request.num_personas,
        kind = %P::KIND,
        backend = %request.backend,
        "Starting review run"
    );

    let runtime = build_runtime(&config)?;
    let manager = ReviewManager::<P>::new(config)?;
    let outcome = runtime.block_on(manager.generate_product_reviews(&product, &request))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", report::render(&outcome));
    }

    Ok(())
}

/// Handle persona subcommands
fn handle_personas_command<P>(config: AppConfig, subcommand: PersonasSubcommand) -> Result<()>
where
    P: PersonaSchema,
    P::Criteria: ApplyFlags,
{
    let store = Arc::new(PersonaStore::<P>::load(&config.persona_file())?);

    match subcommand {
        PersonasSubcommand::Catalog => {
            println!("{}", serde_json::to_string_pretty(store.catalog())?);
        }
        PersonasSubcommand::Select {
            criteria_file,
            criteria,
            count,
            no_backfill,
            seed,
        } => {
            let criteria: P::Criteria = resolve_criteria(criteria_file.as_deref(), &criteria)?;
            let selector = PersonaSelector::<P>::new(store).with_seed(seed.or(config.personas.seed));
            let selected = selector.select(
                &criteria,
                count.unwrap_or(config.generation.default_count),
                config.personas.allow_backfill && !no_backfill,
            )?;
            println!("{}", serde_json::to_string_pretty(&selected)?);
        }
    }

    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: &ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = AppConfig::load(config_path)?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), *force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate => {
            AppConfig::load(config_path)?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
