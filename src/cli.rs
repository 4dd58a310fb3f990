use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::{
    aggregation::{format_duration, SessionSelection},
    db::{Database, KeyedStore},
    session::{MissingSessionPolicy, SessionManager},
    settings::{AnalyticsSettings, SettingsStore},
};

#[derive(Debug, Parser)]
#[command(name = "clickmap", version, about = "Session tracking and click heatmap analytics")]
pub struct Cli {
    /// SQLite file holding the analytics store
    #[arg(long, default_value = "clickmap.sqlite3")]
    pub db: PathBuf,

    /// Settings file (defaults to the database path with a `.settings.json` extension)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record one click into the open session
    Record {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(default_value_t = 1.0)]
        value: f64,
        /// Event time in Unix milliseconds (defaults to now)
        #[arg(long)]
        timestamp: Option<i64>,
    },
    /// Open a session if none is open
    Start,
    /// Close the open session and start a new one
    Reset,
    /// Show the open session
    Status,
    /// List closed sessions grouped by client
    Sessions,
    /// Print the analytics snapshot for a selection as JSON
    View {
        #[arg(long, default_value = "all")]
        session: String,
    },
    /// Delete a closed session
    Delete { session_id: String },
    /// Set the client identifier for future sessions and clicks
    SetIp { ip: String },
    /// Show or change the persisted settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Print the settings file location and its values
    Show,
    /// Choose what `record` does when no session is open
    SetPolicy {
        #[arg(value_enum)]
        policy: PolicyArg,
    },
    /// Client identifier used when none has been recorded
    SetFallbackIp { ip: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    AutoStart,
    Reject,
}

impl From<PolicyArg> for MissingSessionPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::AutoStart => MissingSessionPolicy::AutoStart,
            PolicyArg::Reject => MissingSessionPolicy::Reject,
        }
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| cli.db.with_extension("settings.json"));
    let settings = SettingsStore::new(settings_path)?;

    match cli.command {
        Command::Config { action } => configure(&settings, action.unwrap_or(ConfigAction::Show)),
        command => run_command(command, &cli.db, &settings.get()),
    }
}

fn run_command(command: Command, db: &Path, settings: &AnalyticsSettings) -> Result<()> {
    let database = Database::new(db.to_path_buf())?;
    let mut manager = SessionManager::from_settings(KeyedStore::new(database), settings);

    match command {
        Command::Record {
            x,
            y,
            value,
            timestamp,
        } => {
            let timestamp = timestamp
                .map(|ms| {
                    DateTime::<Utc>::from_timestamp_millis(ms)
                        .with_context(|| format!("timestamp {ms} is out of range"))
                })
                .transpose()?;
            let click = manager.record(x, y, value, timestamp)?;
            print_json(&click)?;
        }
        Command::Start => {
            let session = manager.start_session()?;
            print_json(&session)?;
        }
        Command::Reset => match manager.reset_session()? {
            Some(closed) => println!(
                "Closed session {} ({})",
                closed.session_id,
                format_duration(closed.duration_ms())
            ),
            None => println!("No open session; started a new one"),
        },
        Command::Status => {
            let state = manager.state()?;
            println!("{}", state.status().as_str());
            if let Some(session) = state.open_session() {
                print_json(session)?;
            }
        }
        Command::Sessions => {
            let view = manager.view(&SessionSelection::All)?;
            if view.groups.is_empty() {
                println!("No sessions recorded");
            }
            for group in &view.groups {
                println!("{}", group.label);
                for session in &group.sessions {
                    println!("  {}  {}", session.session_id, session.label);
                }
            }
        }
        Command::View { session } => {
            let view = manager.view(&SessionSelection::parse(&session))?;
            print_json(&view)?;
        }
        Command::Delete { session_id } => {
            if manager.delete_session(&session_id)? {
                println!("Deleted session {session_id}");
            } else {
                println!("No session {session_id}");
            }
        }
        Command::SetIp { ip } => {
            manager.set_client_ip(&ip)?;
            println!("Client identifier set to {}", manager.client_ip()?);
        }
        Command::Config { .. } => unreachable!("config runs without opening the store"),
    }

    Ok(())
}

/// Applies `action` to the settings file and prints the result.
pub fn configure(store: &SettingsStore, action: ConfigAction) -> Result<()> {
    let mut settings = store.get();
    match action {
        ConfigAction::Show => {}
        ConfigAction::SetPolicy { policy } => {
            settings.missing_session_policy = policy.into();
        }
        ConfigAction::SetFallbackIp { ip } => {
            let ip = ip.trim();
            ensure!(!ip.is_empty(), "fallback client identifier must not be blank");
            settings.fallback_client_ip = ip.to_string();
        }
    }

    if settings != store.get() {
        store.update(settings)?;
        // Show what actually landed on disk
        store.reload()?;
    }
    println!("# {}", store.path().display());
    print_json(&store.get())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
