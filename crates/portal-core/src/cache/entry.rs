use serde::{Deserialize, Serialize};

const MINUTE_MS: i64 = 60 * 1000;

/// A cached payload plus the bookkeeping needed to expire it.
///
/// Serialized as `{"data": ..., "timestamp": <epoch ms>, "ttl": <ms>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
    pub ttl: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, timestamp: i64, ttl: u64) -> Self {
        Self {
            data,
            timestamp,
            ttl,
        }
    }

    /// An entry is valid while `now - timestamp <= ttl`.
    pub fn is_expired(&self, now: i64) -> bool {
        now.saturating_sub(self.timestamp) > self.ttl_millis()
    }

    fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl).unwrap_or(i64::MAX)
    }

    pub fn age_minutes(&self, now: i64) -> i64 {
        (now - self.timestamp) / MINUTE_MS
    }

    /// Milliseconds left before expiry, zero once expired.
    pub fn remaining_millis(&self, now: i64) -> u64 {
        let left = self.timestamp.saturating_add(self.ttl_millis()) - now;
        left.max(0) as u64
    }

    pub fn age_display(&self, now: i64) -> String {
        let minutes = self.age_minutes(now);
        if minutes < 1 {
            // Covers clock skew too
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}
