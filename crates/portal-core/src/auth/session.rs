use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SESSION_FILE: &str = "session.json";

/// Lifetime of an access token issued by the auth provider.
pub const DEFAULT_TOKEN_EXPIRY_MINUTES: i64 = 60;

/// Who is signed in. The token itself lives in the OS keychain, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub email: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_expiry")]
    pub expires_in_minutes: i64,
}

fn default_expiry() -> i64 {
    DEFAULT_TOKEN_EXPIRY_MINUTES
}

impl SessionData {
    pub fn new(email: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            email: email.into(),
            user_id,
            created_at: Utc::now(),
            expires_in_minutes: DEFAULT_TOKEN_EXPIRY_MINUTES,
        }
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::minutes(self.expires_in_minutes)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at() - Utc::now()).num_minutes().max(0)
    }
}

/// The signed-in account, backed by `session.json` in the cache directory.
pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir, data: None }
    }

    fn path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    /// Read `session.json`. An expired session is deleted and reported as
    /// absent.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e).context("Failed to read session file"),
        };
        let stored: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;

        if stored.is_expired() {
            debug!(email = %stored.email, "Discarding expired session");
            self.clear()?;
            return Ok(false);
        }
        self.data = Some(stored);
        Ok(true)
    }

    /// Write the current session; a no-op when signed out.
    pub fn save(&self) -> Result<()> {
        let Some(data) = &self.data else {
            return Ok(());
        };
        std::fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("Failed to create {}", self.cache_dir.display()))?;
        std::fs::write(self.path(), serde_json::to_string_pretty(data)?)
            .context("Failed to write session file")
    }

    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        match std::fs::remove_file(self.path()) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(e).context("Failed to remove session file")
            }
            _ => Ok(()),
        }
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// The live session, if any.
    fn active(&self) -> Option<&SessionData> {
        self.data.as_ref().filter(|d| !d.is_expired())
    }

    pub fn email(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.email.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.active().and_then(|d| d.user_id.as_deref())
    }

    pub fn is_valid(&self) -> bool {
        self.active().is_some()
    }
}
