//! Counsellor milestone achievements.
//!
//! Only a fixed allow-list of milestone stages is tracked; the business
//! question is "how many times has this counsellor reached each milestone",
//! and recording every stage transition would pollute that signal. Each
//! (counsellor, milestone, lead) fact is recorded at most once: a lead can
//! bounce in and out of a milestone stage (a meeting gets rebooked), but the
//! achievement counts "reached this milestone for this lead" once, not once
//! per bounce.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{CrmDb, DbAchievement, DbError};
use crate::services::access::Role;

/// Milestone stage keys tracked for counsellor performance.
pub const MILESTONE_STAGES: &[&str] = &["meeting_booked", "meeting_done", "admission"];

/// Whether a stage key counts toward counsellor milestones.
pub fn is_milestone(stage_key: &str) -> bool {
    MILESTONE_STAGES.contains(&stage_key)
}

/// Outcome of a record attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordOutcome {
    Recorded,
    /// The fact already existed; nothing was written.
    SkippedDuplicate,
    /// The stage is not on the milestone allow-list; nothing was written.
    SkippedUntracked,
}

/// Record that a counsellor reached a milestone stage for a lead.
///
/// The existence probe is a fast path; the unique index on
/// (counsellor_user_id, stage_key, lead_id) is the authoritative guard, and
/// a duplicate racing past the probe lands as a benign no-op there.
pub fn record(
    db: &CrmDb,
    counsellor_user_id: &str,
    counsellor_name: &str,
    stage_key: &str,
    lead_id: &str,
) -> Result<RecordOutcome, DbError> {
    if !is_milestone(stage_key) {
        return Ok(RecordOutcome::SkippedUntracked);
    }

    if db.achievement_exists(counsellor_user_id, stage_key, lead_id)? {
        return Ok(RecordOutcome::SkippedDuplicate);
    }

    let inserted = db.insert_achievement(&DbAchievement {
        id: Uuid::new_v4().to_string(),
        counsellor_user_id: counsellor_user_id.to_string(),
        counsellor_name: counsellor_name.to_string(),
        stage_key: stage_key.to_string(),
        lead_id: lead_id.to_string(),
        achieved_at: Utc::now().to_rfc3339(),
    })?;

    if inserted {
        Ok(RecordOutcome::Recorded)
    } else {
        Ok(RecordOutcome::SkippedDuplicate)
    }
}

/// Milestone counts for one counsellor over the aggregation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounsellorMilestones {
    pub counsellor_name: String,
    pub meeting_booked: u32,
    pub meeting_done: u32,
    pub admission: u32,
}

/// Aggregate achievement counts per counsellor over an optional inclusive
/// RFC 3339 window.
///
/// Achievements belonging to admin-role or deactivated accounts are
/// excluded: admins edit stages on behalf of counsellors, and those edits
/// must not inflate admin leaderboard numbers.
pub fn aggregate(
    db: &CrmDb,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<CounsellorMilestones>, DbError> {
    let users = db.get_all_users()?;
    let excluded: std::collections::HashSet<&str> = users
        .iter()
        .filter(|u| Role::parse(&u.role) == Role::Admin || !u.active)
        .map(|u| u.id.as_str())
        .collect();

    let achievements = db.get_achievements_between(from, to)?;

    let mut by_counsellor: std::collections::HashMap<String, CounsellorMilestones> =
        std::collections::HashMap::new();
    for achievement in achievements {
        if excluded.contains(achievement.counsellor_user_id.as_str()) {
            continue;
        }
        let entry = by_counsellor
            .entry(achievement.counsellor_user_id.clone())
            .or_insert_with(|| CounsellorMilestones {
                counsellor_name: achievement.counsellor_name.clone(),
                meeting_booked: 0,
                meeting_done: 0,
                admission: 0,
            });
        match achievement.stage_key.as_str() {
            "meeting_booked" => entry.meeting_booked += 1,
            "meeting_done" => entry.meeting_done += 1,
            "admission" => entry.admission += 1,
            other => log::warn!("achievement row with untracked stage key {other:?} ignored"),
        }
    }

    let mut rows: Vec<CounsellorMilestones> = by_counsellor.into_values().collect();
    rows.sort_by(|a, b| {
        (b.admission, b.meeting_done, b.meeting_booked)
            .cmp(&(a.admission, a.meeting_done, a.meeting_booked))
            .then_with(|| a.counsellor_name.cmp(&b.counsellor_name))
    });
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::db::DbUser;

    fn user(id: &str, name: &str, role: &str, active: bool) -> DbUser {
        DbUser {
            id: id.to_string(),
            name: name.to_string(),
            email: None,
            role: role.to_string(),
            active,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_record_is_idempotent() {
        let db = test_db();

        let first = record(&db, "u1", "Priya", "meeting_booked", "lead-1").expect("record");
        assert_eq!(first, RecordOutcome::Recorded);

        let second = record(&db, "u1", "Priya", "meeting_booked", "lead-1").expect("record");
        assert_eq!(second, RecordOutcome::SkippedDuplicate);

        let count: i32 = db
            .conn_ref()
            .query_row(
                "SELECT COUNT(*) FROM counsellor_stage_achievements",
                [],
                |r| r.get(0),
            )
            .expect("count");
        assert_eq!(count, 1, "exactly one stored achievement");
    }

    #[test]
    fn test_untracked_stage_skipped() {
        let db = test_db();
        let outcome = record(&db, "u1", "Priya", "new_lead", "lead-1").expect("record");
        assert_eq!(outcome, RecordOutcome::SkippedUntracked);

        let count: i32 = db
            .conn_ref()
            .query_row(
                "SELECT COUNT(*) FROM counsellor_stage_achievements",
                [],
                |r| r.get(0),
            )
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_same_milestone_different_leads_both_count() {
        let db = test_db();
        assert_eq!(
            record(&db, "u1", "Priya", "admission", "lead-1").expect("record"),
            RecordOutcome::Recorded
        );
        assert_eq!(
            record(&db, "u1", "Priya", "admission", "lead-2").expect("record"),
            RecordOutcome::Recorded
        );
    }

    #[test]
    fn test_aggregate_counts_and_exclusions() {
        let db = test_db();
        db.upsert_user(&user("u1", "Priya", "user", true))
            .expect("user");
        db.upsert_user(&user("u2", "Boss", "admin", true))
            .expect("user");
        db.upsert_user(&user("u3", "Former", "user", false))
            .expect("user");

        record(&db, "u1", "Priya", "meeting_booked", "lead-1").expect("record");
        record(&db, "u1", "Priya", "meeting_booked", "lead-2").expect("record");
        record(&db, "u1", "Priya", "admission", "lead-1").expect("record");
        // Admin edits on behalf of counsellors must not appear
        record(&db, "u2", "Boss", "admission", "lead-3").expect("record");
        // Deactivated account must not appear
        record(&db, "u3", "Former", "meeting_done", "lead-4").expect("record");

        let rows = aggregate(&db, None, None).expect("aggregate");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].counsellor_name, "Priya");
        assert_eq!(rows[0].meeting_booked, 2);
        assert_eq!(rows[0].meeting_done, 0);
        assert_eq!(rows[0].admission, 1);
    }

    #[test]
    fn test_aggregate_window_filters_by_achieved_at() {
        let db = test_db();
        db.upsert_user(&user("u1", "Priya", "user", true))
            .expect("user");

        // Backdate two achievements directly
        db.insert_achievement(&crate::db::DbAchievement {
            id: "a1".to_string(),
            counsellor_user_id: "u1".to_string(),
            counsellor_name: "Priya".to_string(),
            stage_key: "meeting_booked".to_string(),
            lead_id: "lead-1".to_string(),
            achieved_at: "2026-01-15T00:00:00Z".to_string(),
        })
        .expect("insert");
        db.insert_achievement(&crate::db::DbAchievement {
            id: "a2".to_string(),
            counsellor_user_id: "u1".to_string(),
            counsellor_name: "Priya".to_string(),
            stage_key: "meeting_booked".to_string(),
            lead_id: "lead-2".to_string(),
            achieved_at: "2026-03-15T00:00:00Z".to_string(),
        })
        .expect("insert");

        let rows = aggregate(
            &db,
            Some("2026-01-01T00:00:00Z"),
            Some("2026-01-31T23:59:59Z"),
        )
        .expect("aggregate");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].meeting_booked, 1);
    }
}
