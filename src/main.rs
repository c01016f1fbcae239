//! Fix-It server and admin CLI
//!
//! Run with: cargo run -- serve
//!
//! # Configuration
//!
//! A `config.toml` (see `fixit init-config`) plus environment overrides:
//! - `FIXIT_HOST`, `FIXIT_PORT`: Bind address (default: 0.0.0.0:8000)
//! - `DATABASE_URL`: SQLite database (default: sqlite://./fixit.db)
//! - `GEMINI_API_KEY`: Model API key (AI routes return 503 without it)
//! - `GEMINI_MODEL`: Model name (default: gemini-2.0-flash)
//! - `FIXIT_LOG_LEVEL`, `FIXIT_LOG_FORMAT`: Logging (or `RUST_LOG`)
//!
//! A `.env` file in the working directory is loaded first.

use anyhow::Context;
use clap::{Parser, Subcommand};
use fixit::ai::GeminiClient;
use fixit::api::{serve, AppState};
use fixit::config::{generate_default_config, Config, LoggingConfig};
use fixit::storage::{Store, TicketStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fixit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Maintenance triage and video audit backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: searched in the usual locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for listings (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the API server (default)
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate default config file
    InitConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List tickets
    Tickets {
        /// Filter by status (Open, Deflected, Escalated)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// List units with a move-in baseline
    Units,

    /// List captured leads
    Leads,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is normal outside development
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            init_tracing(&config.logging);
            let mut config = config;
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(config).await?;
        }

        Commands::InitConfig { output } => {
            let content = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &content)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", content);
                }
            }
        }

        Commands::Tickets { status } => {
            let store = open_store(&config)?;
            let status = status
                .map(|s| s.parse::<TicketStatus>())
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let tickets = store.list_tickets(status)?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&tickets)?);
            } else if tickets.is_empty() {
                println!("No tickets yet.");
            } else {
                println!(
                    "{:<6} {:<10} {:<7} {:<10} {:<8} {:<20} {}",
                    "ID", "Status", "Risk", "Priority", "Unit", "Name", "Summary"
                );
                println!("{}", "-".repeat(90));

                for t in tickets {
                    println!(
                        "{:<6} {:<10} {:<7} {:<10} {:<8} {:<20} {}",
                        t.id,
                        t.status.as_str(),
                        t.risk_level.as_str(),
                        t.priority.map(|p| p.as_str()).unwrap_or("-"),
                        t.unit_id.as_deref().unwrap_or("-"),
                        truncate(&t.name, 20),
                        truncate(t.summary.as_deref().unwrap_or("-"), 40)
                    );
                }
            }
        }

        Commands::Units => {
            let store = open_store(&config)?;
            let units = store.list_baselines()?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&units)?);
            } else if units.is_empty() {
                println!("No unit baselines yet. Run a move-in audit first.");
            } else {
                println!("{:<10} {:<22} {}", "Unit", "Last audit", "Baseline");
                println!("{}", "-".repeat(80));

                for u in units {
                    println!(
                        "{:<10} {:<22} {}",
                        u.unit_id,
                        u.last_audit_date.format("%Y-%m-%d %H:%M UTC"),
                        truncate(u.move_in_video_summary.as_deref().unwrap_or("-"), 46)
                    );
                }
            }
        }

        Commands::Leads => {
            let store = open_store(&config)?;
            let leads = store.list_leads()?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&leads)?);
            } else if leads.is_empty() {
                println!("No leads captured yet.");
            } else {
                println!(
                    "{:<6} {:<20} {:<16} {:<10} {:<12} {}",
                    "ID", "Name", "Phone", "Postal", "Category", "Estimate"
                );
                println!("{}", "-".repeat(80));

                for l in leads {
                    println!(
                        "{:<6} {:<20} {:<16} {:<10} {:<12} {}",
                        l.id,
                        truncate(&l.name, 20),
                        l.phone,
                        l.postal_code,
                        l.issue_category.as_deref().unwrap_or("-"),
                        l.ai_estimated_cost.as_deref().unwrap_or("-")
                    );
                }
            }
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting Fix-It API server v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(open_store(&config)?);
    match store.path() {
        Some(path) => tracing::info!("Database: {:?}", path),
        None => tracing::info!("Database: in-memory"),
    }

    let model = Arc::new(
        GeminiClient::new(config.model.to_gemini_config())
            .context("Failed to build model client")?,
    );
    tracing::info!("Model: {}", config.model.name);

    let state = AppState::new(store, model, config);
    serve(state).await?;

    tracing::info!("Fix-It API server stopped");
    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::from_database_url(&config.database.url)
        .with_context(|| format!("Failed to open database {}", config.database.url))
}

/// Initialize tracing; `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("fixit={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
