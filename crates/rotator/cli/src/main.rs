//! filter-rotator - template-driven rotation of recommendation filters
//!
//! Commands:
//! - `render`: resolve a `{{ }}` template at a given instant
//! - `eval`: evaluate an expression, optionally against a filter record
//! - `plan`: show what a rotation pass would create and delete
//! - `run`: apply rotation passes, once or on a fixed interval

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod inventory;
mod output;

use config::{CliConfig, Overrides};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "filter-rotator")]
#[command(about = "Create and retire recommendation filters from name/expression templates", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML, JSON or YAML)
    #[arg(short, long, env = "ROTATOR_CONFIG", global = true)]
    config: Option<String>,

    /// Log level
    #[arg(long, env = "ROTATOR_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "ROTATOR_LOG_JSON", global = true)]
    json: bool,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    output: OutputFormat,

    /// Dataset group owning the filters
    #[arg(long, global = true)]
    dataset_group_arn: Option<String>,

    /// Template for the current filter name
    #[arg(long, global = true)]
    name_template: Option<String>,

    /// Template for the current filter expression
    #[arg(long, global = true)]
    expression_template: Option<String>,

    /// Expression selecting filters to delete (empty disables deletion)
    #[arg(long, global = true)]
    delete_template: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template against `now`
    Render {
        template: String,

        /// Instant to render at (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<String>,
    },

    /// Evaluate an expression
    Eval {
        expression: String,

        /// Instant bound to `now` (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<String>,

        /// JSON file with one filter summary, bound as `filter.*`
        #[arg(long)]
        filter: Option<PathBuf>,
    },

    /// Show the decisions of one pass without applying them
    Plan {
        /// JSON inventory file
        #[arg(short, long)]
        inventory: PathBuf,

        #[arg(long)]
        now: Option<String>,
    },

    /// Plan and apply against a JSON inventory file
    Run {
        /// JSON inventory file, rewritten after each pass
        #[arg(short, long)]
        inventory: PathBuf,

        #[arg(long)]
        now: Option<String>,

        /// Repeat every N seconds until interrupted
        #[arg(long)]
        every: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.apply(&Overrides {
        dataset_group_arn: cli.dataset_group_arn.clone(),
        name_template: cli.name_template.clone(),
        expression_template: cli.expression_template.clone(),
        delete_template: cli.delete_template.clone(),
    });

    // Initialize tracing; logs go to stderr so stdout stays parseable
    let level = cli.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Render { template, now } => {
            commands::render::execute(&template, now.as_deref(), cli.output)?
        }
        Commands::Eval {
            expression,
            now,
            filter,
        } => {
            commands::eval::execute(&expression, now.as_deref(), filter.as_deref(), cli.output)
                .await?
        }
        Commands::Plan { inventory, now } => {
            commands::plan::execute(&config, &inventory, now.as_deref(), cli.output).await?
        }
        Commands::Run {
            inventory,
            now,
            every,
        } => {
            commands::run::execute(&config, &inventory, now.as_deref(), every, cli.output).await?
        }
    }

    Ok(())
}
