mod commands;
mod config;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::Step;
use datebook_core::EventEngine;
use tracing_subscriber::EnvFilter;

use crate::config::DatebookConfig;

#[derive(Parser)]
#[command(name = "datebook")]
#[command(about = "Compute calendar view ranges and list events from configured sources")]
struct Cli {
    /// Config file (default: ~/.config/datebook/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Time zone to use instead of the configured one ("local", "UTC" or an IANA name)
    #[arg(long, global = true)]
    time_zone: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the date ranges a view covers
    Profile {
        /// View type, e.g. dayGridMonth, timeGridWeek, listDay
        #[arg(short, long)]
        view: Option<String>,

        /// Anchor date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Navigate after setting up the view (repeatable)
        #[arg(long = "go", value_enum)]
        steps: Vec<Step>,

        #[arg(long)]
        json: bool,
    },
    /// List events of the configured sources
    Events {
        /// View type, e.g. dayGridMonth, timeGridWeek, listDay
        #[arg(short, long)]
        view: Option<String>,

        /// Anchor date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Navigate after setting up the view (repeatable)
        #[arg(long = "go", value_enum)]
        steps: Vec<Step>,

        /// Show events from this date instead of the view's start
        #[arg(long)]
        from: Option<String>,

        /// Show events until this date instead of the view's end
        #[arg(long)]
        to: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Format a date or a date range
    Format {
        start: String,

        end: Option<String>,

        /// Command string such as "{MMMM {D}}, YYYY", or a JSON object of options
        #[arg(short, long, default_value = "MMMM D, YYYY")]
        format: String,

        #[arg(long)]
        separator: Option<String>,

        /// Treat the end as exclusive
        #[arg(long)]
        end_exclusive: bool,
    },
    /// Show paths and the effective configuration
    Config {
        /// Print the effective configuration as TOML
        #[arg(long)]
        toml: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DATEBOOK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = DatebookConfig::load(cli.config.as_deref())?;
    if let Some(tz) = &cli.time_zone {
        config.calendar.time_zone = tz.parse()?;
    }

    match cli.command {
        Commands::Profile {
            view,
            date,
            steps,
            json,
        } => {
            let engine =
                commands::build_engine(config.calendar, view.as_deref(), date.as_deref(), &steps)?;
            commands::profile::run(&engine, json)
        }
        Commands::Events {
            view,
            date,
            steps,
            from,
            to,
            json,
        } => {
            let mut engine = commands::build_engine(
                config.calendar.clone(),
                view.as_deref(),
                date.as_deref(),
                &steps,
            )?;
            add_sources(&mut engine, &config)?;
            commands::events::run(&mut engine, from.as_deref(), to.as_deref(), json).await
        }
        Commands::Format {
            start,
            end,
            format,
            separator,
            end_exclusive,
        } => {
            let env = config.calendar.date_env()?;
            commands::format::run(&env, &start, end.as_deref(), &format, separator, end_exclusive)
        }
        Commands::Config { toml } => {
            let path = match cli.config {
                Some(path) => path,
                None => DatebookConfig::config_path()?,
            };
            commands::config::run(&config, &path, toml)
        }
    }
}

fn add_sources(engine: &mut EventEngine, config: &DatebookConfig) -> Result<()> {
    if config.sources.is_empty() {
        let path = DatebookConfig::config_path()?;
        anyhow::bail!(
            "No event sources configured.\n\n\
            Add one to {}:\n  \
            [[sources]]\n  \
            kind = \"ical\"\n  \
            url = \"webcal://example.com/team.ics\"",
            path.display()
        );
    }
    for source in &config.sources {
        let id = engine.add_source(source)?;
        tracing::debug!("Added source {}", id);
    }
    Ok(())
}
