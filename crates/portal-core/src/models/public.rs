//! Public website content managed from the portal.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct PublicNewsItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub slug: String,
    pub published_date: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub excerpt: String,
    /// Rich HTML.
    pub body: String,
    pub featured: bool,
    pub tags: Option<Vec<String>>,
    pub active: bool,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct PublicTrainingEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub slug: String,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub event_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    /// workshop, certification, refresher or meeting.
    pub event_type: Option<String>,
    pub description: String,
    pub registration_link: Option<String>,
    pub max_participants: Option<u32>,
    pub current_registrations: u32,
    pub instructor: Option<String>,
    pub requirements: Option<String>,
    pub active: bool,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

impl PublicTrainingEvent {
    /// Calendar day of the event, if `event_date` parses.
    pub fn event_day(&self) -> Option<NaiveDate> {
        let raw = self.event_date.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc).date_naive())
            .ok()
            .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
    }

    /// Happens today or later. Events with an unreadable date are never upcoming.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.event_day()
            .map(|day| day >= now.date_naive())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct PublicResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub slug: String,
    /// Rulebooks, Forms, Training Materials, Policies or Guides.
    pub category: String,
    pub description: String,
    pub file_url: Option<String>,
    pub external_link: Option<String>,
    pub last_updated: Option<String>,
    /// public, members or officials.
    pub access_level: Option<String>,
    pub active: bool,
    pub featured: bool,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

/// Editable page on the public site (`home`, `about`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct PublicPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub page_name: String,
    pub title: String,
    /// Page-specific structure, stored as JSON.
    #[cfg_attr(feature = "ts", ts(type = "Record<string, unknown>"))]
    pub content: Value,
    pub meta_description: Option<String>,
    pub last_edited_by: Option<String>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct Official {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Certification level, 1 to 5.
    pub level: Option<u8>,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub years_experience: Option<String>,
    pub email: Option<String>,
    pub availability: Option<String>,
    pub certifications: Option<Vec<String>>,
    pub active: bool,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct ExecutiveMember {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub position: String,
    pub email: String,
    pub image_url: Option<String>,
    pub bio: Option<String>,
    pub active: bool,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn training(date: &str) -> PublicTrainingEvent {
        PublicTrainingEvent {
            event_date: date.to_string(),
            active: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_is_upcoming_compares_calendar_days() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap();
        assert!(training("2025-03-10").is_upcoming(now));
        assert!(training("2025-04-01").is_upcoming(now));
        assert!(training("2025-03-11T02:00:00Z").is_upcoming(now));
        assert!(!training("2025-03-09").is_upcoming(now));
        assert!(!training("next tuesday").is_upcoming(now));
    }

    #[test]
    fn test_page_content_is_free_form() {
        let page: PublicPage = serde_json::from_value(serde_json::json!({
            "page_name": "home",
            "title": "Welcome",
            "content": { "heroTitle": "Officiating", "stats": [] }
        }))
        .unwrap();
        assert_eq!(page.content["heroTitle"], "Officiating");
    }
}
