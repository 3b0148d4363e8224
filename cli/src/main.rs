mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{cmd_ingredients, cmd_plan, cmd_recipes, cmd_session, load_session};
use crate::config::resolve_dataset;
use mealplan_core::service::DEFAULT_PLAN_SIZE;

#[derive(Parser)]
#[command(
    name = "mealplan",
    version,
    about = "Build meal plans from recipes that share ingredients",
    long_about = "Build meal plans from recipes that share ingredients.\n\n\
        Recipes come from a CSV with a 'Recipe Name' column and one or more\n\
        'Ingredients: <Category>' columns. Pick a few recipes you want to cook\n\
        and mealplan fills the rest of the week with recipes that reuse the\n\
        same ingredients."
)]
struct Cli {
    /// Recipe CSV to load (default: recipes.csv in the data directory)
    #[arg(short, long, global = true, env = "MEALPLAN_DATASET", value_name = "PATH")]
    file: Option<PathBuf>,
    /// Log planner decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List recipes, optionally filtered by name or ingredient
    Recipes {
        /// Text to look for in recipe names and ingredients
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every ingredient with its category and usage
    Ingredients {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build one meal plan around the given recipes
    Plan {
        /// Number of recipes in the plan
        #[arg(short = 'n', long, default_value_t = DEFAULT_PLAN_SIZE)]
        size: usize,
        /// Recipe to build the plan around (repeatable)
        #[arg(short, long = "seed", value_name = "RECIPE")]
        seeds: Vec<String>,
        /// Show a saved plan made of these recipes instead of searching (repeatable)
        #[arg(long = "saved", value_name = "RECIPE")]
        saved: Vec<String>,
        /// Seed the random tie-breaking for repeatable plans
        #[arg(long, value_name = "N")]
        rng_seed: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pick recipes, build and save meal plans interactively
    Session {
        /// Seed the random tie-breaking for repeatable plans
        #[arg(long, value_name = "N")]
        rng_seed: Option<u64>,
    },
    /// Start the JSON API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Seed the random tie-breaking for repeatable plans
        #[arg(long, value_name = "N")]
        rng_seed: Option<u64>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = resolve_dataset(cli.file)?;
    let session = load_session(&path)?;

    match cli.command {
        Commands::Recipes { search, json } => cmd_recipes(&session, search.as_deref(), json),
        Commands::Ingredients { json } => cmd_ingredients(&session, json),
        Commands::Plan {
            size,
            seeds,
            saved,
            rng_seed,
            json,
        } => cmd_plan(&session, size, seeds, saved, rng_seed, json),
        Commands::Session { rng_seed } => cmd_session(session, rng_seed),
        Commands::Serve {
            port,
            bind,
            rng_seed,
        } => server::start_server(session, port, &bind, rng_seed).await,
    }
}
