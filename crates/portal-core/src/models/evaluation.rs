use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Minimal member reference joined onto an evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct PersonRef {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// An uploaded game evaluation for a member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct Evaluation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub member_id: String,
    pub evaluator_id: Option<String>,
    pub evaluation_date: String,
    pub file_url: String,
    pub file_name: String,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub activity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<PersonRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<PersonRef>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_joined_people() {
        let evaluation: Evaluation = serde_json::from_value(json!({
            "id": "e1",
            "member_id": "m1",
            "evaluator_id": "m2",
            "evaluation_date": "2024-11-20",
            "file_url": "https://files.example.com/e1.pdf",
            "file_name": "e1.pdf",
            "member": { "id": "m1", "name": "Emily Johnson", "email": "emily@example.com" }
        }))
        .unwrap();
        assert_eq!(evaluation.member.unwrap().name, "Emily Johnson");
        assert!(evaluation.evaluator.is_none());
    }
}
