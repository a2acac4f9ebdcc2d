//! Stage catalog and resolver.
//!
//! Funnel stages are admin-configurable: each has a stable key (assigned
//! once, immutable) and a display name that can be edited at any time.
//! Persisted lead rows store whatever value was current at write time, so a
//! lead may reference either a stable key (current rows) or an old display
//! name (legacy rows). The catalog resolves both consistently; resolution is
//! by key, never by copying the name onto the lead.
//!
//! The catalog is read-mostly, process-wide state. Admin edits replace the
//! whole snapshot rather than mutating entries in place, so readers never
//! observe a half-updated name/key mapping.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::db::{CrmDb, DbError, DbSetting, SettingKind};

/// Stage key of the distinguished "No Response" side-track (see
/// `services::leads` for the reactivation breadcrumb it drives).
pub const NO_RESPONSE: &str = "no_response";

/// Coarse bucket derived from the stage; drives which list a lead appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageCategory {
    New,
    Warm,
    Hot,
    Cold,
    Enrolled,
}

impl StageCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageCategory::New => "New",
            StageCategory::Warm => "Warm",
            StageCategory::Hot => "Hot",
            StageCategory::Cold => "Cold",
            StageCategory::Enrolled => "Enrolled",
        }
    }

    /// Unknown category strings default to New rather than failing; blocking
    /// a read on malformed catalog data would be worse than a cosmetic
    /// default.
    pub fn parse(s: &str) -> Self {
        match s {
            "Warm" => StageCategory::Warm,
            "Hot" => StageCategory::Hot,
            "Cold" => StageCategory::Cold,
            "Enrolled" => StageCategory::Enrolled,
            _ => StageCategory::New,
        }
    }
}

/// One funnel stage from the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub key: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub score: i64,
    pub category: StageCategory,
    pub sort_order: i64,
}

/// A raw stage value as stored on a lead row, classified once at the read
/// boundary. Downstream code works with the resolved key and never
/// re-derives from this union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawStageValue {
    /// The value is a known stable key.
    Key(String),
    /// The value is the display name of a known stage (legacy row written
    /// before keys were stored).
    LegacyName(String),
    /// The value matches neither a key nor a name. Degraded legacy-data
    /// mode: passed through opaquely.
    Opaque(String),
}

/// Outcome of resolving a raw stage value. Resolution never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStage {
    pub key: String,
    pub display_name: String,
    pub score: i64,
    pub category: StageCategory,
    /// False when the value resolved through the opaque pass-through path:
    /// a data-quality warning, not an error.
    pub known: bool,
}

/// Immutable lookup tables built from the active stage list. Cheap to clone
/// behind an `Arc`; replaced wholesale on reload.
#[derive(Debug)]
pub struct StageCatalog {
    key_to_stage: HashMap<String, Stage>,
    name_to_key: HashMap<String, String>,
    ordered_keys: Vec<String>,
    default_score: i64,
}

impl StageCatalog {
    pub fn new(stages: Vec<Stage>, default_score: i64) -> Self {
        let mut key_to_stage = HashMap::new();
        let mut name_to_key = HashMap::new();
        let mut ordered_keys = Vec::new();
        for stage in stages {
            name_to_key.insert(stage.display_name.clone(), stage.key.clone());
            ordered_keys.push(stage.key.clone());
            key_to_stage.insert(stage.key.clone(), stage);
        }
        Self {
            key_to_stage,
            name_to_key,
            ordered_keys,
            default_score,
        }
    }

    pub fn from_settings(rows: &[DbSetting], default_score: i64) -> Self {
        let stages = rows
            .iter()
            .map(|row| Stage {
                key: row.key.clone(),
                display_name: row.display_name.clone(),
                color: row.color.clone(),
                score: row.score,
                category: StageCategory::parse(&row.category),
                sort_order: row.sort_order,
            })
            .collect();
        Self::new(stages, default_score)
    }

    /// Classify a raw lead-row value: known key, legacy display name, or
    /// opaque pass-through.
    pub fn classify(&self, raw: &str) -> RawStageValue {
        if self.key_to_stage.contains_key(raw) {
            RawStageValue::Key(raw.to_string())
        } else if let Some(key) = self.name_to_key.get(raw) {
            RawStageValue::LegacyName(key.clone())
        } else {
            RawStageValue::Opaque(raw.to_string())
        }
    }

    /// Resolve a raw value to its canonical key, display name, score, and
    /// category. Never fails: an unresolvable value resolves to itself with
    /// the default score and category New, logged as a data-quality warning.
    pub fn resolve(&self, raw: &str) -> ResolvedStage {
        let key = match self.classify(raw) {
            RawStageValue::Key(key) => key,
            RawStageValue::LegacyName(key) => key,
            RawStageValue::Opaque(value) => {
                log::warn!("unresolvable stage value {value:?}; passing through as opaque key");
                return ResolvedStage {
                    key: value.clone(),
                    display_name: value,
                    score: self.default_score,
                    category: StageCategory::New,
                    known: false,
                };
            }
        };
        let stage = &self.key_to_stage[&key];
        ResolvedStage {
            key,
            display_name: stage.display_name.clone(),
            score: stage.score,
            category: stage.category,
            known: true,
        }
    }

    /// Canonical key for a raw value.
    pub fn resolve_key(&self, raw: &str) -> String {
        self.resolve(raw).key
    }

    /// Display name for a raw value.
    pub fn resolve_display_name(&self, raw: &str) -> String {
        self.resolve(raw).display_name
    }

    /// Score derived from a stage key (or any raw value).
    pub fn derive_score(&self, raw: &str) -> i64 {
        self.resolve(raw).score
    }

    /// Category derived from a stage key (or any raw value).
    pub fn derive_category(&self, raw: &str) -> StageCategory {
        self.resolve(raw).category
    }

    pub fn stage(&self, key: &str) -> Option<&Stage> {
        self.key_to_stage.get(key)
    }

    /// Active stages in catalog order.
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.ordered_keys
            .iter()
            .filter_map(|key| self.key_to_stage.get(key))
    }

    pub fn default_score(&self) -> i64 {
        self.default_score
    }
}

/// Process-wide catalog snapshot. All resolution calls read an `Arc`
/// snapshot; admin edits rebuild from storage and swap the whole snapshot.
pub struct SharedCatalog {
    inner: RwLock<Arc<StageCatalog>>,
    default_score: i64,
}

impl SharedCatalog {
    /// Build the initial snapshot from the settings collection.
    pub fn load(db: &CrmDb, default_score: i64) -> Result<Self, DbError> {
        let rows = db.get_active_settings(SettingKind::Stage)?;
        Ok(Self {
            inner: RwLock::new(Arc::new(StageCatalog::from_settings(&rows, default_score))),
            default_score,
        })
    }

    /// Current snapshot. Holders keep a consistent view even while a reload
    /// is in flight.
    pub fn snapshot(&self) -> Arc<StageCatalog> {
        self.inner.read().clone()
    }

    /// Rebuild from storage and replace the snapshot. Called after an admin
    /// edits the stage catalog.
    pub fn reload(&self, db: &CrmDb) -> Result<(), DbError> {
        let rows = db.get_active_settings(SettingKind::Stage)?;
        let fresh = Arc::new(StageCatalog::from_settings(&rows, self.default_score));
        *self.inner.write() = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use chrono::Utc;

    fn stage(key: &str, name: &str, score: i64, category: StageCategory) -> Stage {
        Stage {
            key: key.to_string(),
            display_name: name.to_string(),
            color: None,
            score,
            category,
            sort_order: 0,
        }
    }

    fn catalog() -> StageCatalog {
        StageCatalog::new(
            vec![
                stage("new_lead", "New Lead", 10, StageCategory::New),
                stage("meeting_booked", "Meeting Booked", 50, StageCategory::Warm),
                stage("admission", "Admission Done", 100, StageCategory::Enrolled),
                stage(NO_RESPONSE, "No Response", 0, StageCategory::Cold),
            ],
            0,
        )
    }

    #[test]
    fn test_resolve_by_key() {
        let cat = catalog();
        let resolved = cat.resolve("meeting_booked");
        assert_eq!(resolved.key, "meeting_booked");
        assert_eq!(resolved.display_name, "Meeting Booked");
        assert_eq!(resolved.score, 50);
        assert_eq!(resolved.category, StageCategory::Warm);
        assert!(resolved.known);
    }

    #[test]
    fn test_resolve_by_legacy_display_name() {
        let cat = catalog();
        assert_eq!(
            cat.classify("Meeting Booked"),
            RawStageValue::LegacyName("meeting_booked".to_string())
        );
        let resolved = cat.resolve("Meeting Booked");
        assert_eq!(resolved.key, "meeting_booked");
        assert_eq!(resolved.score, 50);
        assert!(resolved.known);
    }

    #[test]
    fn test_unresolvable_value_passes_through() {
        let cat = catalog();
        let resolved = cat.resolve("Hot Prospect (2019)");
        assert_eq!(resolved.key, "Hot Prospect (2019)");
        assert_eq!(resolved.display_name, "Hot Prospect (2019)");
        assert_eq!(resolved.score, 0);
        assert_eq!(resolved.category, StageCategory::New);
        assert!(!resolved.known, "opaque resolution is a warning, not a failure");
    }

    #[test]
    fn test_rename_resolves_new_name_without_lead_rewrites() {
        let db = test_db();
        let now = Utc::now().to_rfc3339();
        db.insert_setting(&crate::db::DbSetting {
            id: "set-new_lead".to_string(),
            kind: SettingKind::Stage,
            key: "new_lead".to_string(),
            display_name: "New Lead".to_string(),
            color: None,
            score: 10,
            category: "New".to_string(),
            sort_order: 1,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        })
        .expect("insert stage");

        let shared = SharedCatalog::load(&db, 0).expect("load");
        assert_eq!(
            shared.snapshot().resolve_display_name("new_lead"),
            "New Lead"
        );

        // Admin renames the stage; no lead rows are touched.
        db.rename_setting(
            SettingKind::Stage,
            "new_lead",
            "Fresh Enquiry",
            "2026-02-01T00:00:00Z",
        )
        .expect("rename");
        shared.reload(&db).expect("reload");

        // The same stored key now resolves to the new name.
        assert_eq!(
            shared.snapshot().resolve_display_name("new_lead"),
            "Fresh Enquiry"
        );
    }

    #[test]
    fn test_snapshot_is_stable_across_reload() {
        let db = test_db();
        let now = Utc::now().to_rfc3339();
        db.insert_setting(&crate::db::DbSetting {
            id: "set-new_lead".to_string(),
            kind: SettingKind::Stage,
            key: "new_lead".to_string(),
            display_name: "New Lead".to_string(),
            color: None,
            score: 10,
            category: "New".to_string(),
            sort_order: 1,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        })
        .expect("insert stage");

        let shared = SharedCatalog::load(&db, 0).expect("load");
        let held = shared.snapshot();

        db.rename_setting(
            SettingKind::Stage,
            "new_lead",
            "Fresh Enquiry",
            "2026-02-01T00:00:00Z",
        )
        .expect("rename");
        shared.reload(&db).expect("reload");

        // A snapshot taken before the reload keeps its consistent view.
        assert_eq!(held.resolve_display_name("new_lead"), "New Lead");
        assert_eq!(
            shared.snapshot().resolve_display_name("new_lead"),
            "Fresh Enquiry"
        );
    }

    #[test]
    fn test_category_parse_defaults_to_new() {
        assert_eq!(StageCategory::parse("Enrolled"), StageCategory::Enrolled);
        assert_eq!(StageCategory::parse("garbage"), StageCategory::New);
    }
}
