//! STAKEPLAN: command-line entry point.
//!
//! Loads configuration, initialises structured logging, then runs one
//! subcommand: compute a plan, rebuild one from actual deposits, manage the
//! betting journey for a plan, or serve the HTTP API.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

use stakeplan::allocator::random::SystemRandom;
use stakeplan::allocator::Allocator;
use stakeplan::api::{self, ApiState};
use stakeplan::config::AppConfig;
use stakeplan::journey::{parse_amount, Fingerprint, ProgressTracker};
use stakeplan::storage;
use stakeplan::types::{AllocationInput, Book, RoundingStep, StakePlan};

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(name = "stakeplan")]
#[command(author, version, about = "Two-book stake allocation planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a stake plan
    Allocate {
        #[command(flatten)]
        form: FormArgs,

        /// Random mode: random rounding, leftover redistribution and jitter
        #[arg(long)]
        random: bool,

        /// Seed for reproducible random mode
        #[arg(long)]
        seed: Option<u64>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rebuild a plan around deposits actually placed
    Reallocate {
        #[command(flatten)]
        form: FormArgs,

        #[arg(long)]
        deposit_a: f64,

        #[arg(long)]
        deposit_b: f64,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Track bets placed against a plan
    Journey {
        #[command(subcommand)]
        action: JourneyAction,
    },

    /// Serve the HTTP API
    Serve {
        /// Bind host (defaults to [server].host)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (defaults to [server].port)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum JourneyAction {
    /// Show progress and the next recommended action
    Show {
        #[command(flatten)]
        form: FormArgs,

        /// Measure against a plan rebuilt from these deposits
        #[arg(long, requires = "deposit_b")]
        deposit_a: Option<f64>,

        #[arg(long, requires = "deposit_a")]
        deposit_b: Option<f64>,
    },

    /// Log a placed bet
    Add {
        #[command(flatten)]
        form: FormArgs,

        /// Book the bet was placed on (A or B)
        #[arg(long)]
        book: Book,

        /// Amount staked
        #[arg(long)]
        amount: String,

        /// The bet used bonus credit
        #[arg(long)]
        bonus: bool,

        /// Book whose deposit funded the bet (defaults to --book)
        #[arg(long)]
        fund_source: Option<Book>,
    },

    /// Remove a logged bet by id
    Remove {
        #[command(flatten)]
        form: FormArgs,

        #[arg(long)]
        book: Book,

        #[arg(long)]
        id: String,
    },

    /// Delete every logged bet for a plan
    Clear {
        #[command(flatten)]
        form: FormArgs,
    },
}

/// Allocation form. Unset flags fall back to `[allocation]` in the config.
#[derive(Args, Debug, Default)]
struct FormArgs {
    #[arg(long)]
    budget: Option<f64>,

    #[arg(long)]
    odds_a: Option<f64>,

    #[arg(long)]
    odds_b: Option<f64>,

    /// Book A bonus, percent of deposit
    #[arg(long)]
    bonus_a: Option<f64>,

    /// Book B bonus, percent of deposit
    #[arg(long)]
    bonus_b: Option<f64>,

    /// Minimum odds for a book's bonus to be staked there
    #[arg(long)]
    min_odds_bonus: Option<f64>,

    /// Rounding step: 0, 10, 50 or 100
    #[arg(long)]
    rounding: Option<u32>,
}

impl FormArgs {
    fn apply(&self, base: AllocationInput) -> Result<AllocationInput> {
        let rounding_step = match self.rounding {
            Some(step) => RoundingStep::try_from(step)?,
            None => base.rounding_step,
        };
        Ok(AllocationInput {
            budget: self.budget.unwrap_or(base.budget),
            odds_a: self.odds_a.unwrap_or(base.odds_a),
            odds_b: self.odds_b.unwrap_or(base.odds_b),
            bonus_percent_a: self.bonus_a.unwrap_or(base.bonus_percent_a),
            bonus_percent_b: self.bonus_b.unwrap_or(base.bonus_percent_b),
            min_odds_for_bonus_a: self.min_odds_bonus.unwrap_or(base.min_odds_for_bonus_a),
            rounding_step,
            random_mode: base.random_mode,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load_or_default(&cli.config)?;

    init_logging();

    if let Err(e) = run(cli.command, &cfg).await {
        error!(error = %format!("{e:#}"), "Command failed");
        return Err(e);
    }
    Ok(())
}

async fn run(command: Commands, cfg: &AppConfig) -> Result<()> {
    let defaults = cfg.allocation.to_input();

    match command {
        Commands::Allocate {
            form,
            random,
            seed,
            json,
        } => {
            let input = AllocationInput {
                random_mode: random || seed.is_some() || defaults.random_mode,
                ..form.apply(defaults)?
            };
            let rng = match seed {
                Some(seed) => SystemRandom::seeded(seed),
                None => SystemRandom::new(),
            };
            let plan = Allocator::new(rng).allocate(&input)?;
            print_plan(&plan, json)?;
        }

        Commands::Reallocate {
            form,
            deposit_a,
            deposit_b,
            json,
        } => {
            let input = form.apply(defaults)?;
            let plan = Allocator::with_entropy().reallocate(deposit_a, deposit_b, &input)?;
            print_plan(&plan, json)?;
        }

        Commands::Journey { action } => run_journey(action, cfg, defaults).await?,

        Commands::Serve { host, port } => {
            let store = storage::open_store(&cfg.storage).await?;
            let state = Arc::new(ApiState::new(store));
            let host = host.unwrap_or_else(|| cfg.server.host.clone());
            let port = port.unwrap_or(cfg.server.port);
            api::serve(state, &host, port).await?;
        }
    }

    Ok(())
}

async fn run_journey(action: JourneyAction, cfg: &AppConfig, defaults: AllocationInput) -> Result<()> {
    let store = storage::open_store(&cfg.storage).await?;
    // Journey targets come from the deterministic plan for the form.
    let defaults = AllocationInput {
        random_mode: false,
        ..defaults
    };

    match action {
        JourneyAction::Show {
            form,
            deposit_a,
            deposit_b,
        } => {
            let input = form.apply(defaults)?;
            let mut allocator = Allocator::with_entropy();
            let plan = match (deposit_a, deposit_b) {
                (Some(a), Some(b)) => allocator.reallocate(a, b, &input)?,
                _ => allocator.allocate(&input)?,
            };
            let log = storage::load_journey(store.as_ref(), &plan.fingerprint()).await;

            println!("{plan}");
            for book in Book::ALL {
                for entry in &log.book(book).entries {
                    println!("  {book}: {entry}");
                }
            }
            println!("{}", ProgressTracker::new(&plan).report(&log));
        }

        JourneyAction::Add {
            form,
            book,
            amount,
            bonus,
            fund_source,
        } => {
            let fingerprint = Fingerprint::of_input(&form.apply(defaults)?);
            let amount = parse_amount(&amount)?;
            let mut log = storage::load_journey(store.as_ref(), &fingerprint).await;
            let entry = log.add_entry(book, amount, bonus, fund_source)?;
            storage::save_journey(store.as_ref(), &fingerprint, &log).await?;
            println!("{entry}");
        }

        JourneyAction::Remove { form, book, id } => {
            let fingerprint = Fingerprint::of_input(&form.apply(defaults)?);
            let mut log = storage::load_journey(store.as_ref(), &fingerprint).await;
            let removed = log
                .remove_entry(book, &id)
                .with_context(|| format!("No entry {id} on {book} in {fingerprint}"))?;
            storage::save_journey(store.as_ref(), &fingerprint, &log).await?;
            println!("Removed {removed}");
        }

        JourneyAction::Clear { form } => {
            let fingerprint = Fingerprint::of_input(&form.apply(defaults)?);
            let mut log = storage::load_journey(store.as_ref(), &fingerprint).await;
            storage::clear_journey(store.as_ref(), &fingerprint, &mut log).await?;
            info!(key = %fingerprint, "Journey cleared");
        }
    }

    Ok(())
}

fn print_plan(plan: &StakePlan, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(plan).context("Failed to serialise plan")?;
        println!("{out}");
    } else {
        println!("{plan}");
    }
    Ok(())
}

/// Initialise the `tracing` subscriber. Logs go to stderr so `--json`
/// output stays machine-readable.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stakeplan=info"));

    let json_logging = std::env::var("STAKEPLAN_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_form_overrides_defaults() {
        let form = FormArgs {
            budget: Some(5_000.0),
            rounding: Some(50),
            ..FormArgs::default()
        };
        let input = form.apply(AllocationInput::default()).unwrap();
        assert_eq!(input.budget, 5_000.0);
        assert_eq!(input.odds_a, 1.60);
        assert_eq!(input.rounding_step, RoundingStep::Fifty);
    }

    #[test]
    fn test_form_rejects_bad_rounding() {
        let form = FormArgs {
            rounding: Some(20),
            ..FormArgs::default()
        };
        assert!(form.apply(AllocationInput::default()).is_err());
    }

    #[test]
    fn test_book_flag_parses() {
        let cli = Cli::try_parse_from([
            "stakeplan", "journey", "add", "--book", "b", "--amount", "250",
        ])
        .unwrap();
        match cli.command {
            Commands::Journey {
                action: JourneyAction::Add { book, amount, .. },
            } => {
                assert_eq!(book, Book::B);
                assert_eq!(amount, "250");
            }
            _ => panic!("wrong subcommand"),
        }
    }
}
