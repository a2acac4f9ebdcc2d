//! Follow-up scheduling: picking the single "next" occurrence per lead.
//!
//! A naive "earliest date in window" pick surfaces a stale, completed
//! follow-up ahead of a newly scheduled pending one; a naive "earliest
//! pending" pick hides overdue items once a future one is scheduled. The
//! three-tier fallback keeps "what do I need to act on" the default answer
//! while degrading to "what happened" when nothing is pending.

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::{CrmDb, DbError, DbFollowUp, FollowUpStatus};

fn parse_date(raw: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            log::warn!("unparseable follow-up date {raw:?} excluded from selection");
            None
        }
    }
}

/// Select the single "next" follow-up to display for a lead, out of its
/// occurrences intersected with the reporting window.
///
/// Priority: (1) earliest pending occurrence dated today or later; (2) if
/// none, earliest pending occurrence regardless of date (overdue); (3) if
/// none, the earliest occurrence in the window even if done, so the row is
/// never empty while occurrences exist.
pub fn select_next<'a>(
    occurrences: &'a [DbFollowUp],
    window_start: NaiveDate,
    window_end: NaiveDate,
    today: NaiveDate,
) -> Option<&'a DbFollowUp> {
    let in_window: Vec<(&DbFollowUp, NaiveDate)> = occurrences
        .iter()
        .filter_map(|occ| parse_date(&occ.follow_up_date).map(|date| (occ, date)))
        .filter(|(_, date)| *date >= window_start && *date <= window_end)
        .collect();

    let earliest = |items: &[(&'a DbFollowUp, NaiveDate)]| -> Option<&'a DbFollowUp> {
        items
            .iter()
            .min_by(|(a, da), (b, db)| {
                da.cmp(db)
                    .then_with(|| a.created_at.cmp(&b.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|(occ, _)| *occ)
    };

    let pending_upcoming: Vec<_> = in_window
        .iter()
        .filter(|(occ, date)| occ.status != FollowUpStatus::Done && *date >= today)
        .cloned()
        .collect();
    if let Some(next) = earliest(&pending_upcoming) {
        return Some(next);
    }

    let pending: Vec<_> = in_window
        .iter()
        .filter(|(occ, _)| occ.status != FollowUpStatus::Done)
        .cloned()
        .collect();
    if let Some(overdue) = earliest(&pending) {
        return Some(overdue);
    }

    earliest(&in_window)
}

/// One lead's selected follow-up in a reporting window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadNextFollowUp {
    pub lead_id: String,
    pub next: DbFollowUp,
}

/// Build the reporting view for a window: every lead with at least one
/// occurrence in the window, mapped to its selected "next" occurrence.
pub fn window_report(
    db: &CrmDb,
    window_start: NaiveDate,
    window_end: NaiveDate,
    today: NaiveDate,
) -> Result<Vec<LeadNextFollowUp>, DbError> {
    let occurrences = db.get_follow_ups_in_window(
        &window_start.format("%Y-%m-%d").to_string(),
        &window_end.format("%Y-%m-%d").to_string(),
    )?;

    let mut by_lead: std::collections::BTreeMap<String, Vec<DbFollowUp>> =
        std::collections::BTreeMap::new();
    for occ in occurrences {
        by_lead.entry(occ.lead_id.clone()).or_default().push(occ);
    }

    let mut report = Vec::new();
    for (lead_id, occurrences) in by_lead {
        if let Some(next) = select_next(&occurrences, window_start, window_end, today) {
            report.push(LeadNextFollowUp {
                lead_id,
                next: next.clone(),
            });
        }
    }
    Ok(report)
}
