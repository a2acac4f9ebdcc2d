//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// A row from the `leads` table.
///
/// `stage` may hold either a stable stage key or, for legacy rows, a raw
/// display name that was current at write time. `score` and `category` are
/// derived from the resolved stage and are never authored independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbLead {
    pub id: String,
    pub parent_name: String,
    pub child_name: Option<String>,
    pub phone: String,
    pub alternate_phone: Option<String>,
    pub email: Option<String>,
    pub stage: String,
    pub score: i64,
    pub category: String,
    pub counsellor: Option<String>,
    /// Stage the lead was in before entering "No Response". Single-level;
    /// cleared on any transition out of "No Response".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Which pick-list a `settings` row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Stage,
    Source,
    Grade,
}

impl SettingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKind::Stage => "stage",
            SettingKind::Source => "source",
            SettingKind::Grade => "grade",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stage" => Some(SettingKind::Stage),
            "source" => Some(SettingKind::Source),
            "grade" => Some(SettingKind::Grade),
            _ => None,
        }
    }
}

/// A row from the `settings` table: one entry of an admin-editable catalog.
///
/// Stage rows populate every column; source/grade rows only use key and
/// display_name. The `key` is immutable once assigned; `display_name` may be
/// edited at any time without touching the lead rows that reference the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSetting {
    pub id: String,
    pub kind: SettingKind,
    pub key: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub score: i64,
    pub category: String,
    pub sort_order: i64,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Completion status of a follow-up occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FollowUpStatus {
    Done,
    NotDone,
}

impl FollowUpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUpStatus::Done => "done",
            FollowUpStatus::NotDone => "not_done",
        }
    }

    /// Unknown values read back as NotDone so a malformed row still shows up
    /// as something to act on.
    pub fn parse(s: &str) -> Self {
        match s {
            "done" => FollowUpStatus::Done,
            _ => FollowUpStatus::NotDone,
        }
    }
}

/// A row from the `follow_ups` table. One scheduled, independently
/// completable reminder attached to a lead. Not a queue, just a flat set
/// ordered by date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbFollowUp {
    pub id: String,
    pub lead_id: String,
    /// ISO date (YYYY-MM-DD) the follow-up is scheduled for.
    pub follow_up_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub status: FollowUpStatus,
    pub created_at: String,
}

/// A row from `counsellor_stage_achievements`: an append-only audit fact
/// that a counsellor reached a milestone stage for a lead. At most one row
/// per (counsellor_user_id, stage_key, lead_id), enforced by a unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbAchievement {
    pub id: String,
    pub counsellor_user_id: String,
    pub counsellor_name: String,
    pub stage_key: String,
    pub lead_id: String,
    pub achieved_at: String,
}

/// A row from the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbUser {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Role string: "admin", "user" (counsellor), "junior", "outsider".
    pub role: String,
    pub active: bool,
    pub created_at: String,
}

/// A row from the `logs` table: one append-only activity entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbLogEntry {
    pub id: String,
    pub record_id: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub created_at: String,
}

/// A row from `custom_field_values`. Owned by a lead; purged when the lead
/// is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCustomFieldValue {
    pub id: String,
    pub lead_id: String,
    pub field_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}
