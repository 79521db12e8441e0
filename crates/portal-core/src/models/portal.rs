//! Members-portal content: announcements, calendar, rules, newsletters, resources.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct Announcement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    /// general, rules, schedule, training or administrative.
    pub category: String,
    /// high, normal or low.
    pub priority: String,
    pub date: Option<String>,
    pub author: Option<String>,
    pub audience: Option<Vec<String>>,
    pub expires: Option<String>,
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
pub struct CalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// training, meeting, league or social.
    pub event_type: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub instructor: Option<String>,
    pub max_participants: Option<u32>,
    pub registration_link: Option<String>,
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
pub struct RuleModification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub category: String,
    pub summary: String,
    pub content: String,
    pub approved_by: Option<String>,
    pub date: Option<String>,
    pub slug: Option<String>,
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
pub struct Newsletter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub date: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub is_featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

/// A document, link or video in the members' resource library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct Resource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    /// file, link or video.
    pub resource_type: Option<String>,
    pub url: Option<String>,
    pub external_link: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    pub is_featured: bool,
    pub access_level: Option<String>,
    pub last_updated: Option<String>,
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
    use serde_json::json;

    #[test]
    fn test_unknown_columns_survive_round_trip() {
        let raw = json!({
            "id": "a1",
            "title": "Clinic moved",
            "content": "See you Thursday",
            "category": "schedule",
            "priority": "high",
            "pinned": true
        });
        let announcement: Announcement = serde_json::from_value(raw).unwrap();
        assert_eq!(announcement.extra.get("pinned"), Some(&json!(true)));

        let back = serde_json::to_value(&announcement).unwrap();
        assert_eq!(back["pinned"], json!(true));
        assert_eq!(back["priority"], json!("high"));
    }

    #[test]
    fn test_new_record_omits_server_columns() {
        let event = CalendarEvent {
            title: "Level 1 clinic".to_string(),
            ..Default::default()
        };
        let body = serde_json::to_value(&event).unwrap();
        assert!(body.get("id").is_none());
        assert!(body.get("created_at").is_none());
        assert_eq!(body["title"], json!("Level 1 clinic"));
    }

    #[test]
    fn test_missing_fields_default() {
        let resource: Resource = serde_json::from_value(json!({ "title": "Rulebook" })).unwrap();
        assert_eq!(resource.title, "Rulebook");
        assert!(!resource.is_featured);
        assert!(resource.id.is_none());
    }
}
