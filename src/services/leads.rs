//! Lead mutation engine.
//!
//! Stage transitions derive score and category from the resolved stage
//! (never authored independently) and maintain the single-level
//! `previous_stage` breadcrumb around the "No Response" side-track. "No
//! Response" is a side-track, not a dead end: a lead may enter and leave it
//! any number of times, and each entry overwrites the breadcrumb with the
//! most recent pre-entry stage. Only the latest escape path is remembered.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::logs::record_activity;
use crate::db::{CrmDb, DbError, DbLead};
use crate::services::access::{self, Viewer};
use crate::services::achievements::{self, RecordOutcome};
use crate::stages::{StageCatalog, StageCategory, NO_RESPONSE};

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("lead not found: {0}")]
    LeadNotFound(String),

    /// A lead sitting in "No Response" with no recorded escape path. Must be
    /// surfaced to the caller; it indicates a data or UI bug.
    #[error("no prior stage recorded for lead {0}")]
    NoPriorStage(String),

    #[error("viewer is not permitted to {0}")]
    NotPermitted(&'static str),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// The fields a stage transition emits for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTransition {
    /// Canonical stage key.
    pub stage: String,
    pub score: i64,
    pub category: StageCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_stage: Option<String>,
}

/// Compute the persistable outcome of moving `lead` to `new_stage`.
///
/// Pure with respect to storage. Breadcrumb rule: entering "No Response"
/// from elsewhere captures the old stage; leaving "No Response" clears the
/// breadcrumb; transitions between two non-"No Response" stages leave it
/// untouched.
pub fn apply_stage_transition(
    lead: &DbLead,
    new_stage: &str,
    catalog: &StageCatalog,
) -> StageTransition {
    let new = catalog.resolve(new_stage);
    let old_key = catalog.resolve_key(&lead.stage);

    let previous_stage = if new.key == NO_RESPONSE && old_key != NO_RESPONSE {
        Some(old_key)
    } else if old_key == NO_RESPONSE && new.key != NO_RESPONSE {
        None
    } else {
        lead.previous_stage.clone()
    };

    StageTransition {
        stage: new.key,
        score: new.score,
        category: new.category,
        previous_stage,
    }
}

/// Result of a persisted stage change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageChangeResult {
    pub transition: StageTransition,
    /// Present when the transition landed on a milestone stage and the
    /// recorder ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement: Option<RecordOutcome>,
}

/// Apply and persist a stage transition for one lead.
///
/// The transition (stage + derived score/category + breadcrumb) is persisted
/// first, in one statement; only then is the achievement recorder invoked,
/// since its milestone check reads the just-computed stage key. Storage
/// errors reject the whole transition; the history write is best-effort.
pub fn change_stage(
    db: &CrmDb,
    catalog: &StageCatalog,
    viewer: &Viewer,
    lead_id: &str,
    new_stage: &str,
) -> Result<StageChangeResult, TransitionError> {
    let lead = db
        .get_lead(lead_id)?
        .ok_or_else(|| TransitionError::LeadNotFound(lead_id.to_string()))?;

    if !access::can_edit(&lead, viewer) {
        return Err(TransitionError::NotPermitted("edit this lead"));
    }

    let transition = apply_stage_transition(&lead, new_stage, catalog);
    let old_key = catalog.resolve_key(&lead.stage);

    db.update_lead_stage(
        lead_id,
        &transition.stage,
        transition.score,
        transition.category.as_str(),
        transition.previous_stage.as_deref(),
        &Utc::now().to_rfc3339(),
    )?;

    record_activity(
        db,
        lead_id,
        "stage_changed",
        Some(&format!("{} → {}", old_key, transition.stage)),
    );

    // Milestone recording happens strictly after the transition is
    // persisted. A failure here must not un-persist the transition.
    let achievement = if achievements::is_milestone(&transition.stage) {
        match achievements::record(db, &viewer.user_id, &viewer.name, &transition.stage, lead_id)
        {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::warn!("achievement record failed for lead {lead_id}: {e}");
                None
            }
        }
    } else {
        None
    };

    Ok(StageChangeResult {
        transition,
        achievement,
    })
}

/// Reactivate a lead out of the "No Response" side-track, back to the stage
/// recorded in its breadcrumb. Fails with `NoPriorStage` when the breadcrumb
/// is absent.
pub fn reactivate(
    db: &CrmDb,
    catalog: &StageCatalog,
    viewer: &Viewer,
    lead_id: &str,
) -> Result<StageChangeResult, TransitionError> {
    let lead = db
        .get_lead(lead_id)?
        .ok_or_else(|| TransitionError::LeadNotFound(lead_id.to_string()))?;

    if !access::can_edit(&lead, viewer) {
        return Err(TransitionError::NotPermitted("edit this lead"));
    }

    let target = lead
        .previous_stage
        .clone()
        .ok_or_else(|| TransitionError::NoPriorStage(lead_id.to_string()))?;

    let result = change_stage(db, catalog, viewer, lead_id, &target)?;
    record_activity(db, lead_id, "reactivated", Some(&target));
    Ok(result)
}

/// Input for lead creation.
#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub parent_name: String,
    pub child_name: Option<String>,
    pub phone: String,
    pub alternate_phone: Option<String>,
    pub email: Option<String>,
    pub stage: String,
    pub counsellor: Option<String>,
    pub source: Option<String>,
    pub grade: Option<String>,
}

/// Create a lead. The initial stage is resolved through the catalog so the
/// derived score/category are consistent from the first write. The history
/// entry is best-effort; outbound notifications are fired separately by the
/// caller (see `notify::orchestrator::on_lead_created`).
pub fn create_lead(
    db: &CrmDb,
    catalog: &StageCatalog,
    input: NewLead,
) -> Result<DbLead, TransitionError> {
    if input.parent_name.trim().is_empty() {
        return Err(TransitionError::MissingField("parentName"));
    }
    if input.phone.trim().is_empty() {
        return Err(TransitionError::MissingField("phone"));
    }

    let resolved = catalog.resolve(&input.stage);
    let now = Utc::now().to_rfc3339();
    let lead = DbLead {
        id: Uuid::new_v4().to_string(),
        parent_name: input.parent_name,
        child_name: input.child_name,
        phone: input.phone,
        alternate_phone: input.alternate_phone,
        email: input.email,
        stage: resolved.key,
        score: resolved.score,
        category: resolved.category.as_str().to_string(),
        counsellor: input.counsellor,
        previous_stage: None,
        source: input.source,
        grade: input.grade,
        created_at: now.clone(),
        updated_at: now,
    };

    db.insert_lead(&lead)?;
    let details = serde_json::json!({
        "parentName": lead.parent_name,
        "stage": lead.stage,
        "counsellor": lead.counsellor,
    });
    record_activity(db, &lead.id, "created", Some(&details.to_string()));
    Ok(lead)
}

/// Bulk-reassign leads to a counsellor. Every targeted lead must be
/// reassignable by the viewer; the operation is rejected wholesale
/// otherwise, so a partial bulk edit is never persisted.
pub fn reassign_counsellor(
    db: &CrmDb,
    viewer: &Viewer,
    lead_ids: &[String],
    counsellor: &str,
) -> Result<usize, TransitionError> {
    for id in lead_ids {
        let lead = db
            .get_lead(id)?
            .ok_or_else(|| TransitionError::LeadNotFound(id.to_string()))?;
        if !access::can_reassign(&lead, viewer) {
            return Err(TransitionError::NotPermitted("reassign this lead"));
        }
    }

    let changed = db.reassign_leads(lead_ids, counsellor, &Utc::now().to_rfc3339())?;
    for id in lead_ids {
        record_activity(db, id, "reassigned", Some(counsellor));
    }
    Ok(changed)
}

/// Delete leads (admin only) together with their owned custom-field values
/// and follow-ups.
pub fn delete_leads(
    db: &CrmDb,
    viewer: &Viewer,
    lead_ids: &[String],
) -> Result<usize, TransitionError> {
    if !access::can_delete(viewer) {
        return Err(TransitionError::NotPermitted("delete leads"));
    }
    let deleted = db.delete_leads(lead_ids)?;
    for id in lead_ids {
        record_activity(db, id, "deleted", None);
    }
    Ok(deleted)
}
