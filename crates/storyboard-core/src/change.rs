//! Change notifications pushed from the store to connected clients.
//!
//! # Purpose
//! `ChangeEvent` is the wire payload carried by every relay frame. Its JSON
//! field names (`eventType`, `commit_timestamp`) match what realtime database
//! services publish, so a client can consume either source unchanged.
//!
//! # Notes
//! Events are transient and delivered at most once. Consumers treat them as
//! refresh triggers and never as a source of truth.
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "INSERT" => Some(ChangeKind::Insert),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// A single insert/update/delete notification for one table.
///
/// `new` and `old` are row images as published by the store. Either may be an
/// empty object (`{}`) when the operation has no such image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChangeEvent {
    #[serde(rename = "eventType")]
    pub event_type: ChangeKind,
    pub table: String,
    pub schema: String,
    #[serde(default = "empty_image")]
    pub new: Value,
    #[serde(default = "empty_image")]
    pub old: Value,
    pub commit_timestamp: String,
}

fn empty_image() -> Value {
    Value::Object(Default::default())
}

impl ChangeEvent {
    pub fn new(
        event_type: ChangeKind,
        schema: &str,
        table: &str,
        new: Option<Value>,
        old: Option<Value>,
        commit_timestamp: String,
    ) -> Self {
        Self {
            event_type,
            table: table.to_string(),
            schema: schema.to_string(),
            new: new.unwrap_or_else(empty_image),
            old: old.unwrap_or_else(empty_image),
            commit_timestamp,
        }
    }

    /// Id of the affected row, taken from `new` and falling back to `old`.
    pub fn record_id(&self) -> Option<&str> {
        self.new
            .get("id")
            .and_then(Value::as_str)
            .or_else(|| self.old.get("id").and_then(Value::as_str))
    }
}
