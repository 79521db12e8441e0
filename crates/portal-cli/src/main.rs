//! Officials portal CLI.
//!
//! A thin command-line front end over `portal-core`: lists are served from
//! the local cache while fresh, writes go to the portal functions and drop
//! the cached lists they affect.

mod commands;
mod format;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use portal_core::auth::{self, CredentialStore, Session, SessionData};
use portal_core::cache::{spawn_janitor, DEFAULT_SWEEP_DELAY};
use portal_core::{Config, PortalClient};

use commands::{Filters, Resource, Scope};

/// Log file name inside the cache directory.
const LOG_FILE: &str = "portal.log";

/// Initialize the tracing subscriber for logging.
///
/// Human-readable output goes to stderr; when a log directory is available
/// the same events are appended to a file there. The returned guard must
/// live until exit so buffered lines are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[derive(Parser)]
#[command(
    name = "portal",
    about = "Officials portal client with an offline-friendly cache",
    version,
    after_help = "Environment:\n  PORTAL_API_URL               Base URL of the portal functions\n  PORTAL_USE_MOCK_DATA=true    Serve member fixtures when offline\n  RUST_LOG                     Log filter (default: warn)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List records (cached)
    List {
        resource: Resource,

        #[command(flatten)]
        filters: Filters,

        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Create a record from a JSON object
    Create { resource: Resource, json: String },

    /// Update a record; only the fields in the JSON object are written
    Update {
        resource: Resource,
        id: String,
        json: String,
    },

    /// Delete a record
    Delete {
        resource: Resource,
        id: String,

        #[command(flatten)]
        scope: Scope,
    },

    /// Drop one cache key, or every key starting with a prefix
    Invalidate {
        #[arg(required_unless_present = "prefix")]
        key: Option<String>,

        #[arg(long, conflicts_with = "key")]
        prefix: Option<String>,
    },

    /// Remove expired cache entries
    Sweep,

    /// Remove every cache entry
    Clear,

    /// Show cache contents and session status
    Stats,

    /// List resource names
    Resources,

    /// Store an access token for an account
    Login { email: String },

    /// Forget the token and clear the cache
    Logout,
}

fn print_records(value: &Value, json: bool) -> Result<()> {
    match value {
        Value::Array(items) if !json => {
            for item in items {
                println!("{}", format::table_row(item));
            }
            eprintln!("{} record(s)", items.len());
        }
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

/// Client for this run, carrying the keychain token when a session is live.
fn build_client(config: &Config, session: &Session) -> Result<PortalClient> {
    let client = PortalClient::new(config.client_config()?)?;
    let Some(email) = session.email().filter(|_| session.is_valid()) else {
        return Ok(client);
    };
    match CredentialStore::get_token(email) {
        Ok(token) => Ok(client.with_token(token)),
        Err(e) => {
            warn!(email = %email, error = %e, "No token in keychain; continuing signed out");
            Ok(client)
        }
    }
}

fn login(config: &mut Config, session: &mut Session, email: &str) -> Result<()> {
    let token = rpassword::prompt_password(format!("Access token for {}: ", email))
        .context("Failed to read token")?;
    let token = token.trim();
    if token.is_empty() {
        bail!("Token cannot be empty");
    }

    CredentialStore::store_token(email, token)?;
    session.update(SessionData::new(email, None));
    session.save()?;

    config.last_email = Some(email.to_string());
    config.save()?;

    info!(email = %email, "Signed in");
    eprintln!("Signed in as {}", email);
    Ok(())
}

async fn run(command: Command, mut config: Config, cache_dir: PathBuf) -> Result<()> {
    let mut session = Session::new(cache_dir);
    if let Err(e) = session.load() {
        warn!(error = %e, "Ignoring unreadable session file");
    }

    let client = build_client(&config, &session)?;
    let janitor = spawn_janitor(client.cache().clone(), DEFAULT_SWEEP_DELAY);

    match command {
        Command::List { resource, filters, json } => {
            let records = commands::list(&client, resource, &filters).await?;
            print_records(&records, json)?;
        }
        Command::Create { resource, json } => {
            let record = commands::create(&client, resource, &json).await?;
            print_records(&record, true)?;
        }
        Command::Update { resource, id, json } => {
            let record = commands::update(&client, resource, &id, &json).await?;
            print_records(&record, true)?;
        }
        Command::Delete { resource, id, scope } => {
            commands::delete(&client, resource, &id, &scope).await?;
            eprintln!("Deleted {} {}", resource.name(), id);
        }
        Command::Invalidate { key, prefix } => match (prefix, key) {
            (Some(prefix), _) => {
                let removed = client.invalidate_by_prefix(&prefix).await;
                eprintln!("Removed {} cache entr(ies) starting with '{}'", removed, prefix);
            }
            (None, Some(key)) => {
                client.invalidate(&key).await;
                eprintln!("Invalidated '{}'", key);
            }
            (None, None) => bail!("Give a cache key or --prefix"),
        },
        Command::Sweep => {
            let removed = client.cache().clear_expired();
            eprintln!("Removed {} expired cache entr(ies)", removed);
        }
        Command::Clear => {
            let removed = client.clear_all().await;
            eprintln!("Removed {} cache entr(ies)", removed);
        }
        Command::Stats => {
            let stats = client.cache().stats();
            let now = client.cache().now_millis();
            for key in &stats.keys {
                let status = match client.cache().get_entry(key) {
                    Some(entry) if entry.is_expired(now) => "expired".to_string(),
                    Some(entry) => format!(
                        "cached {}, {}s left",
                        entry.age_display(now),
                        entry.remaining_millis(now) / 1000
                    ),
                    None => "unreadable".to_string(),
                };
                println!("{:<40} {}", key, status);
            }
            eprintln!("{} entr(ies), {} bytes", stats.entries, stats.total_bytes);
            match session.data.as_ref().filter(|_| session.is_valid()) {
                Some(data) => eprintln!(
                    "Signed in as {} ({} min left)",
                    data.email,
                    data.minutes_until_expiry()
                ),
                None => eprintln!("Signed out"),
            }
        }
        Command::Resources => {
            for resource in Resource::ALL {
                println!("{}", resource.name());
            }
        }
        Command::Login { email } => login(&mut config, &mut session, &email)?,
        Command::Logout => {
            // An expired session is gone from disk but its token may not be.
            if session.email().is_none() {
                if let Some(email) = &config.last_email {
                    CredentialStore::delete(email)?;
                }
            }
            let removed = auth::logout(&mut session, &client).await?;
            eprintln!("Signed out; removed {} cache entr(ies)", removed);
        }
    }

    janitor.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let cache_dir = config
        .cache_dir()
        .unwrap_or_else(|_| PathBuf::from("./cache"));
    let log_dir = std::fs::create_dir_all(&cache_dir).ok().map(|_| cache_dir.as_path());
    let _guard = init_tracing(log_dir);
    info!(base_url = %config.base_url(), mock = config.use_mock_data, "Officials portal CLI starting");

    run(cli.command, config, cache_dir).await
}
