//! In-memory fixtures for members and activities.
//!
//! Only used when `use_mock_data` is switched on and the portal functions
//! cannot be reached at all. Changes live for the lifetime of the process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::models::{Member, MemberActivity};

pub struct MockData {
    members: Mutex<Vec<Member>>,
    activities: Mutex<Vec<MemberActivity>>,
    next_member: AtomicUsize,
    next_activity: AtomicUsize,
}

impl Default for MockData {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Overlay every field present in `changes` onto `current`.
fn merge<T: Serialize + DeserializeOwned + Clone>(current: &T, changes: &Value) -> T {
    let (Ok(Value::Object(mut base)), Value::Object(patch)) = (serde_json::to_value(current), changes)
    else {
        return current.clone();
    };
    for (key, value) in patch {
        base.insert(key.clone(), value.clone());
    }
    serde_json::from_value(Value::Object(base)).unwrap_or_else(|_| current.clone())
}

#[allow(clippy::too_many_arguments)]
fn fixture_member(
    n: usize,
    user_id: &str,
    name: &str,
    email: &str,
    level: u8,
    rank: i32,
    status: &str,
    role: &str,
    created_at: &str,
) -> Member {
    Member {
        id: Some(format!("mock-member-{}", n)),
        user_id: Some(user_id.to_string()),
        name: name.to_string(),
        email: email.to_string(),
        phone: Some(format!("(403) 555-0{}00", n)),
        certification_level: Some(format!("Level {}", level)),
        rank: Some(rank),
        status: Some(status.to_string()),
        role: Some(role.to_string()),
        province: Some("AB".to_string()),
        created_at: Some(created_at.to_string()),
        updated_at: Some(created_at.to_string()),
        ..Default::default()
    }
}

fn fixture_activity(n: usize, member: usize, kind: &str, date: &str, notes: &str) -> MemberActivity {
    MemberActivity {
        id: Some(format!("mock-activity-{}", n)),
        member_id: Some(format!("mock-member-{}", member)),
        activity_type: kind.to_string(),
        activity_date: date.to_string(),
        notes: Some(notes.to_string()),
        created_at: Some(format!("{}T19:00:00Z", date)),
        ..Default::default()
    }
}

impl MockData {
    pub fn new() -> Self {
        let members = vec![
            fixture_member(1, "dev-user-admin", "Development Admin User", "dev@example.com", 3, 5, "active", "admin", "2024-01-15T08:00:00Z"),
            fixture_member(2, "user-executive-1", "John Smith", "john.smith@example.com", 4, 8, "active", "executive", "2024-01-10T08:00:00Z"),
            fixture_member(3, "user-official-1", "Emily Johnson", "emily.johnson@example.com", 2, 3, "active", "official", "2024-02-01T08:00:00Z"),
            fixture_member(4, "user-official-2", "Robert Williams", "robert.williams@example.com", 5, 10, "active", "official", "2023-09-01T08:00:00Z"),
            fixture_member(5, "user-official-3", "Sarah Davis", "sarah.davis@example.com", 1, 1, "inactive", "official", "2024-01-20T08:00:00Z"),
        ];
        let activities = vec![
            fixture_activity(1, 1, "meeting", "2024-11-01", "Attended monthly executive meeting"),
            fixture_activity(2, 1, "training", "2024-11-08", "Completed Level 3 certification clinic"),
            fixture_activity(3, 1, "game", "2024-11-15", "Officiated U15 game"),
            fixture_activity(4, 2, "meeting", "2024-11-01", "Attended monthly executive meeting"),
            fixture_activity(5, 3, "training", "2024-10-25", "Completed intro to officiating workshop"),
            fixture_activity(6, 4, "certification", "2024-09-15", "Renewed Level 5 certification"),
        ];

        Self {
            next_member: AtomicUsize::new(members.len() + 1),
            next_activity: AtomicUsize::new(activities.len() + 1),
            members: Mutex::new(members),
            activities: Mutex::new(activities),
        }
    }

    // ===== Members =====

    pub fn members(&self) -> Vec<Member> {
        lock(&self.members).clone()
    }

    pub fn member_by_id(&self, id: &str) -> Option<Member> {
        lock(&self.members)
            .iter()
            .find(|m| m.id.as_deref() == Some(id))
            .cloned()
    }

    pub fn member_by_user_id(&self, user_id: &str) -> Option<Member> {
        lock(&self.members)
            .iter()
            .find(|m| m.user_id.as_deref() == Some(user_id))
            .cloned()
    }

    pub fn create_member(&self, member: &Member) -> Member {
        let now = timestamp();
        let created = Member {
            id: Some(format!(
                "mock-member-{}",
                self.next_member.fetch_add(1, Ordering::Relaxed)
            )),
            status: member.status.clone().or_else(|| Some("active".to_string())),
            role: Some(member.role_or_default().to_string()),
            created_at: Some(now.clone()),
            updated_at: Some(now),
            ..member.clone()
        };
        lock(&self.members).push(created.clone());
        created
    }

    /// Apply `changes` to the member with `id`; the id itself never changes.
    pub fn update_member(&self, id: &str, changes: &Value) -> Option<Member> {
        let mut members = lock(&self.members);
        let existing = members.iter_mut().find(|m| m.id.as_deref() == Some(id))?;
        let mut merged = merge(&*existing, changes);
        merged.id = Some(id.to_string());
        merged.updated_at = Some(timestamp());
        *existing = merged.clone();
        Some(merged)
    }

    /// Remove a member and their activities.
    pub fn delete_member(&self, id: &str) -> bool {
        let mut members = lock(&self.members);
        let before = members.len();
        members.retain(|m| m.id.as_deref() != Some(id));
        if members.len() == before {
            return false;
        }
        lock(&self.activities).retain(|a| a.member_id.as_deref() != Some(id));
        true
    }

    // ===== Activities =====

    pub fn activities(&self, member_id: Option<&str>) -> Vec<MemberActivity> {
        lock(&self.activities)
            .iter()
            .filter(|a| member_id.is_none() || a.member_id.as_deref() == member_id)
            .cloned()
            .collect()
    }

    pub fn create_activity(&self, activity: &MemberActivity) -> MemberActivity {
        let created = MemberActivity {
            id: Some(format!(
                "mock-activity-{}",
                self.next_activity.fetch_add(1, Ordering::Relaxed)
            )),
            created_at: Some(timestamp()),
            ..activity.clone()
        };
        lock(&self.activities).push(created.clone());
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixture_lookups() {
        let mock = MockData::new();
        assert_eq!(mock.members().len(), 5);
        assert_eq!(
            mock.member_by_user_id("user-official-1").unwrap().name,
            "Emily Johnson"
        );
        assert!(mock.member_by_id("mock-member-99").is_none());
        assert_eq!(mock.activities(Some("mock-member-1")).len(), 3);
        assert_eq!(mock.activities(None).len(), 6);
    }

    #[test]
    fn test_create_assigns_next_id() {
        let mock = MockData::new();
        let created = mock.create_member(&Member {
            name: "Pat Lee".to_string(),
            email: "pat@example.com".to_string(),
            ..Default::default()
        });
        assert_eq!(created.id.as_deref(), Some("mock-member-6"));
        assert_eq!(created.role.as_deref(), Some("official"));
        assert_eq!(created.status.as_deref(), Some("active"));
    }

    #[test]
    fn test_update_merges_and_keeps_id() {
        let mock = MockData::new();
        let updated = mock
            .update_member(
                "mock-member-3",
                &json!({ "id": "something-else", "rank": 4, "phone": null }),
            )
            .unwrap();
        assert_eq!(updated.id.as_deref(), Some("mock-member-3"));
        assert_eq!(updated.rank, Some(4));
        assert_eq!(updated.name, "Emily Johnson");
        assert_eq!(updated.user_id.as_deref(), Some("user-official-1"));
        assert!(updated.phone.is_none());
    }

    #[test]
    fn test_delete_member_cascades_to_activities() {
        let mock = MockData::new();
        assert!(mock.delete_member("mock-member-1"));
        assert!(mock.activities(Some("mock-member-1")).is_empty());
        assert!(!mock.delete_member("mock-member-1"));
    }
}
