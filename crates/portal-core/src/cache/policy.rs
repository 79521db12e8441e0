use std::collections::HashMap;
use std::time::Duration;

use super::keys::{self, ResourceKey};

/// TTL used for keys that have no policy entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

const fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

/// Maps a resource key to how long its cached data stays fresh.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    ttls: HashMap<String, Duration>,
    default_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        let table = [
            // Frequently changing
            (ResourceKey::Announcements, minutes(5)),
            (ResourceKey::CalendarEvents, minutes(10)),
            (ResourceKey::Members, minutes(15)),
            (ResourceKey::MemberActivities, minutes(10)),
            // Rarely changing
            (ResourceKey::RuleModifications, minutes(30)),
            (ResourceKey::Resources, minutes(30)),
            (ResourceKey::Newsletters, minutes(60)),
            // Public content
            (ResourceKey::PublicNews, minutes(10)),
            (ResourceKey::PublicTraining, minutes(15)),
            (ResourceKey::PublicResources, minutes(30)),
            (ResourceKey::PublicPages, minutes(30)),
            (ResourceKey::Officials, minutes(30)),
            (ResourceKey::ExecutiveTeam, minutes(30)),
        ];

        Self {
            ttls: table
                .into_iter()
                .map(|(key, ttl)| (key.as_str().to_string(), ttl))
                .collect(),
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl CachePolicy {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            ttls: HashMap::new(),
            default_ttl,
        }
    }

    pub fn with_ttl(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.set_ttl(key, ttl);
        self
    }

    pub fn set_ttl(&mut self, key: impl Into<String>, ttl: Duration) {
        self.ttls.insert(key.into(), ttl);
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Exact key first, then the key's family, then the default.
    pub fn ttl_for(&self, key: &str) -> Duration {
        self.ttls
            .get(key)
            .or_else(|| self.ttls.get(keys::family(key)))
            .copied()
            .unwrap_or(self.default_ttl)
    }
}
