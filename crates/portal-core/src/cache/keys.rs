//! Cache key construction.
//!
//! Reads and invalidations must agree on the exact key string, so every key
//! is built here and nowhere else.

use std::fmt;

/// Separator between a resource family and its parameter.
pub const KEY_SEPARATOR: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Announcements,
    CalendarEvents,
    Members,
    MemberActivities,
    RuleModifications,
    Resources,
    Newsletters,
    Evaluations,
    PublicNews,
    PublicTraining,
    PublicResources,
    PublicPages,
    Officials,
    ExecutiveTeam,
}

impl ResourceKey {
    pub const ALL: [ResourceKey; 14] = [
        ResourceKey::Announcements,
        ResourceKey::CalendarEvents,
        ResourceKey::Members,
        ResourceKey::MemberActivities,
        ResourceKey::RuleModifications,
        ResourceKey::Resources,
        ResourceKey::Newsletters,
        ResourceKey::Evaluations,
        ResourceKey::PublicNews,
        ResourceKey::PublicTraining,
        ResourceKey::PublicResources,
        ResourceKey::PublicPages,
        ResourceKey::Officials,
        ResourceKey::ExecutiveTeam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKey::Announcements => "announcements",
            ResourceKey::CalendarEvents => "calendarEvents",
            ResourceKey::Members => "members",
            ResourceKey::MemberActivities => "memberActivities",
            ResourceKey::RuleModifications => "ruleModifications",
            ResourceKey::Resources => "resources",
            ResourceKey::Newsletters => "newsletters",
            ResourceKey::Evaluations => "evaluations",
            ResourceKey::PublicNews => "publicNews",
            ResourceKey::PublicTraining => "publicTraining",
            ResourceKey::PublicResources => "publicResources",
            ResourceKey::PublicPages => "publicPages",
            ResourceKey::Officials => "officials",
            ResourceKey::ExecutiveTeam => "executiveTeam",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// The key scoped to a single entity id.
    pub fn scoped(&self, id: &str) -> String {
        format!("{}{}{}", self.as_str(), KEY_SEPARATOR, id)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Treat a blank id as no id, so `Some("")` keys and queries like `None`.
pub fn scope_id(id: Option<&str>) -> Option<&str> {
    id.filter(|id| !id.trim().is_empty())
}

/// `memberActivities` or `memberActivities_<member id>`.
pub fn member_activities(member_id: Option<&str>) -> String {
    match scope_id(member_id) {
        Some(id) => ResourceKey::MemberActivities.scoped(id),
        None => ResourceKey::MemberActivities.as_str().to_string(),
    }
}

/// Keys an activity write for `member_id` makes stale: the unscoped list
/// and, when known, the member's own list.
pub fn member_activity_invalidations(member_id: Option<&str>) -> Vec<String> {
    let mut keys = vec![member_activities(None)];
    if scope_id(member_id).is_some() {
        keys.push(member_activities(member_id));
    }
    keys
}

/// `resources` or `resources_featured`.
pub fn resources(featured: bool) -> String {
    if featured {
        ResourceKey::Resources.scoped("featured")
    } else {
        ResourceKey::Resources.as_str().to_string()
    }
}

/// `executiveTeam`, or `executiveTeam_all` for the list that includes inactive members.
pub fn executive_team(include_inactive: bool) -> String {
    if include_inactive {
        ResourceKey::ExecutiveTeam.scoped("all")
    } else {
        ResourceKey::ExecutiveTeam.as_str().to_string()
    }
}

/// `evaluations_member_<id>`, or plain `evaluations` for a blank id.
pub fn evaluations_for_member(member_id: &str) -> String {
    evaluations_scoped("member", member_id)
}

/// `evaluations_evaluator_<id>`, or plain `evaluations` for a blank id.
pub fn evaluations_for_evaluator(evaluator_id: &str) -> String {
    evaluations_scoped("evaluator", evaluator_id)
}

fn evaluations_scoped(scope: &str, id: &str) -> String {
    match scope_id(Some(id)) {
        Some(id) => ResourceKey::Evaluations.scoped(&format!("{}{}{}", scope, KEY_SEPARATOR, id)),
        None => ResourceKey::Evaluations.as_str().to_string(),
    }
}

/// Keys an evaluation write makes stale: the full list plus the member's and
/// evaluator's lists when known.
pub fn evaluation_invalidations(member_id: Option<&str>, evaluator_id: Option<&str>) -> Vec<String> {
    let mut keys = vec![ResourceKey::Evaluations.as_str().to_string()];
    if let Some(id) = scope_id(member_id) {
        keys.push(evaluations_for_member(id));
    }
    if let Some(id) = scope_id(evaluator_id) {
        keys.push(evaluations_for_evaluator(id));
    }
    keys
}

/// The resource family a key belongs to (`memberActivities_7` -> `memberActivities`).
pub fn family(key: &str) -> &str {
    key.split(KEY_SEPARATOR).next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameterized_keys() {
        assert_eq!(member_activities(None), "memberActivities");
        assert_eq!(member_activities(Some("42")), "memberActivities_42");
        assert_eq!(resources(false), "resources");
        assert_eq!(resources(true), "resources_featured");
        assert_eq!(executive_team(true), "executiveTeam_all");
        assert_eq!(evaluations_for_member("m1"), "evaluations_member_m1");
        assert_eq!(evaluations_for_evaluator("e1"), "evaluations_evaluator_e1");
    }

    #[test]
    fn test_blank_ids_use_unscoped_keys() {
        assert_eq!(member_activities(Some("")), "memberActivities");
        assert_eq!(member_activities(Some("  ")), "memberActivities");
        assert_eq!(evaluations_for_member(""), "evaluations");
        assert_eq!(evaluations_for_evaluator(""), "evaluations");
        assert_eq!(member_activity_invalidations(Some("")), vec!["memberActivities"]);
        assert_eq!(evaluation_invalidations(Some(""), None), vec!["evaluations"]);
    }

    #[test]
    fn test_invalidations_cover_read_keys() {
        let stale = member_activity_invalidations(Some("42"));
        assert!(stale.contains(&member_activities(None)));
        assert!(stale.contains(&member_activities(Some("42"))));

        let stale = evaluation_invalidations(Some("m1"), Some("e1"));
        assert_eq!(
            stale,
            vec!["evaluations", "evaluations_member_m1", "evaluations_evaluator_e1"]
        );
    }

    #[test]
    fn test_family() {
        assert_eq!(family("memberActivities_42"), "memberActivities");
        assert_eq!(family("evaluations_member_m1"), "evaluations");
        assert_eq!(family("members"), "members");
    }

    #[test]
    fn test_from_str_round_trip() {
        for key in ResourceKey::ALL {
            assert_eq!(ResourceKey::from_str(key.as_str()), Some(key));
        }
        assert_eq!(ResourceKey::from_str("nope"), None);
    }
}
