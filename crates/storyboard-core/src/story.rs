//! Story entity.
//!
//! # Purpose
//! Defines the single record type shown in the stories table. Records are
//! written by the external workflow and only ever read or deleted here.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user story carrying the generated agile definitions.
///
/// # Invariants
/// - `id` is unique and never reused.
/// - `clerk_user_id` is fixed at creation; it is the only ownership signal.
/// - No field is mutated after creation; the record is deleted whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Story {
    pub id: String,
    pub story_code: String,
    pub application_scope: String,
    pub definition_of_ready: String,
    pub definition_of_done: String,
    pub acceptance_criteria: String,
    #[serde(default)]
    pub technical_doc: Option<String>,
    pub clerk_user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Story {
    /// Case-insensitive substring match against `story_code`.
    ///
    /// An empty (or whitespace-only) needle matches every story.
    pub fn matches_code(&self, needle: &str) -> bool {
        let needle = needle.trim();
        if needle.is_empty() {
            return true;
        }
        self.story_code
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.clerk_user_id == user_id
    }
}

/// Order stories by `created_at`, newest first.
///
/// The sort is stable so stories sharing a timestamp keep the store's order.
pub fn sort_newest_first(stories: &mut [Story]) {
    stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn story(id: &str, code: &str, day: u32) -> Story {
        Story {
            id: id.to_string(),
            story_code: code.to_string(),
            application_scope: "scope".to_string(),
            definition_of_ready: String::new(),
            definition_of_done: String::new(),
            acceptance_criteria: String::new(),
            technical_doc: None,
            clerk_user_id: "user_1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn matches_code_is_case_insensitive_substring() {
        let s = story("1", "STORY-12", 1);
        assert!(s.matches_code("story-1"));
        assert!(s.matches_code("RY-12"));
        assert!(s.matches_code(""));
        assert!(s.matches_code("   "));
        assert!(!s.matches_code("story-2"));
    }

    #[test]
    fn matches_code_ignores_other_fields() {
        let s = story("abc", "A", 1);
        assert!(!s.matches_code("scope"));
        assert!(!s.matches_code("abc"));
    }

    #[test]
    fn sort_newest_first_orders_descending() {
        let mut stories = vec![story("a", "A", 2), story("b", "B", 5), story("c", "C", 1)];
        sort_newest_first(&mut stories);
        let ids: Vec<_> = stories.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn technical_doc_defaults_when_absent() {
        let json = serde_json::json!({
            "id": "1",
            "story_code": "A",
            "application_scope": "scope",
            "definition_of_ready": "dor",
            "definition_of_done": "dod",
            "acceptance_criteria": "ac",
            "clerk_user_id": "user_1",
            "created_at": "2024-01-01T00:00:00Z"
        });
        let parsed: Story = serde_json::from_value(json).expect("story");
        assert!(parsed.technical_doc.is_none());
    }
}
