use anyhow::Result;
use clap::{Parser, Subcommand};
use focus_analytics::reports::format_duration;
use focus_analytics::{FocusService, ReportGenerator};
use focus_core::config::AppConfig;
use focus_core::timestamp::{format_utc, now_utc};
use focus_core::types::SessionId;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "focus_tracker=info,focus_server=info,focus_analytics=info,focus_store=info,warn";

#[derive(Parser)]
#[command(
    name = "focus-tracker",
    about = "Track focus sessions, distractions and streaks",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/focus-tracker/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the SQLite database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,
        /// Bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Start a new focus session
    Start,

    /// End a running session and print its summary
    End {
        /// Session id
        id: SessionId,
    },

    /// Log a distraction against a running session
    Distract {
        /// Session id
        id: SessionId,
    },

    /// Show the session that can be resumed, if any
    Active,

    /// Show the summary of an ended session
    Summary {
        /// Session id
        id: SessionId,
    },

    /// Show today's numbers and the daily trend
    Stats {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a markdown report of the trend window
    Report,

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env();
            config
        }
        None => AppConfig::load()?,
    };

    if let Some(db) = &cli.db {
        config.storage.path = Some(db.clone());
    }

    let command = cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    });

    match command {
        Commands::Serve { host, port } => {
            if let Some(h) = host {
                config.server.host = h;
            }
            if let Some(p) = port {
                config.server.port = p;
            }
            let store = focus_store::open(&config.storage)?;
            focus_server::serve(config, store).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, &config)?;
        }
        command => {
            let store = focus_store::open(&config.storage)?;
            let service = FocusService::new(store, &config.analytics)?;
            handle_session_command(command, &service)?;
        }
    }

    Ok(())
}

fn handle_session_command(command: Commands, service: &FocusService) -> Result<()> {
    let now = now_utc();
    match command {
        Commands::Start => {
            let session = service.start_session(now)?;
            println!(
                "Started session {} at {}",
                session.id,
                format_utc(&session.started_at)
            );
        }
        Commands::End { id } => {
            let ended = service.end_session(id, now)?;
            println!("Ended session {}", ended.session.id);
            print!("{}", ReportGenerator::session_report(&ended.summary));
        }
        Commands::Distract { id } => {
            let distraction = service.record_distraction(id, now)?;
            println!(
                "Distraction {} logged at {}",
                distraction.id,
                format_utc(&distraction.created_at)
            );
        }
        Commands::Active => match service.active_session(now)? {
            Some(active) => {
                let elapsed = active.session.age(now).num_seconds() as f64;
                println!(
                    "Session {} running for {} with {} distraction(s)",
                    active.session.id,
                    format_duration(elapsed),
                    active.distraction_count
                );
            }
            None => println!("No active session"),
        },
        Commands::Summary { id } => {
            let summary = service.session_summary(id)?;
            print!("{}", ReportGenerator::session_report(&summary));
        }
        Commands::Stats { json } => {
            let stats = service.stats(now)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Today: {} session(s)", stats.today_sessions);
                println!(
                    "Distractions per hour: {:.2}",
                    stats.today_distractions_per_hour
                );
                println!(
                    "Longest streak: {}",
                    format_duration(stats.today_longest_streak_seconds)
                );
                println!();
                for day in &stats.last_7_days {
                    println!(
                        "{}  {:>3} session(s)  {:>4} distraction(s)  {}",
                        day.date,
                        day.session_count,
                        day.total_distractions,
                        format_duration(day.longest_streak_seconds)
                    );
                }
            }
        }
        Commands::Report => {
            let stats = service.stats(now)?;
            print!("{}", ReportGenerator::weekly_report(&stats));
        }
        Commands::Serve { .. } | Commands::Config { .. } => {}
    }
    Ok(())
}

fn handle_config_command(action: Option<ConfigAction>, config: &AppConfig) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            let path = AppConfig::default_path();
            if AppConfig::init_at(&path)? {
                println!("Created default config at: {}", path.display());
            } else {
                println!("Config already exists at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", AppConfig::default_path().display());
        }
    }
    Ok(())
}
