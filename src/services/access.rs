// Lead access filter: role-based visibility and edit permission.
//
// Visibility and edit rights are orthogonal (a junior counsellor sees
// everything but can change nothing), so they are independent predicates,
// never one combined flag. Applied identically regardless of which view
// requests the lead set.

use serde::{Deserialize, Serialize};

use crate::db::DbLead;

/// Viewer role. Counsellors are stored as role "user" in the users
/// collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Admin,
    Counsellor,
    JuniorCounsellor,
    Outsider,
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "user" => Role::Counsellor,
            "junior" => Role::JuniorCounsellor,
            _ => Role::Outsider,
        }
    }
}

/// The acting user, passed explicitly into every permission check.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user_id: String,
    /// Display name; lead ownership is matched against this (leads store
    /// their counsellor by display name, not by stable id).
    pub name: String,
    pub role: Role,
}

impl Viewer {
    pub fn new(user_id: &str, name: &str, role: Role) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: name.to_string(),
            role,
        }
    }
}

fn owns(lead: &DbLead, viewer: &Viewer) -> bool {
    lead.counsellor.as_deref() == Some(viewer.name.as_str())
}

/// Whether the viewer may see this lead at all.
pub fn is_visible(lead: &DbLead, viewer: &Viewer) -> bool {
    match viewer.role {
        Role::Admin | Role::JuniorCounsellor => true,
        Role::Counsellor | Role::Outsider => owns(lead, viewer),
    }
}

/// Whether the viewer may mutate this lead (stage changes, field edits).
pub fn can_edit(lead: &DbLead, viewer: &Viewer) -> bool {
    match viewer.role {
        Role::Admin => true,
        Role::Counsellor => owns(lead, viewer),
        Role::JuniorCounsellor | Role::Outsider => false,
    }
}

/// Whether the viewer may delete leads. Not per-lead: deletion is an
/// admin-only operation.
pub fn can_delete(viewer: &Viewer) -> bool {
    viewer.role == Role::Admin
}

/// Whether the viewer may reassign this lead to another counsellor.
pub fn can_reassign(lead: &DbLead, viewer: &Viewer) -> bool {
    match viewer.role {
        Role::Admin => true,
        Role::Counsellor => owns(lead, viewer),
        Role::JuniorCounsellor | Role::Outsider => false,
    }
}

/// A lead collection partitioned for one viewer. The filtered view is what
/// consuming views render; the unfiltered collection backs admin-only bulk
/// operations and must never leak into the filtered view.
#[derive(Debug)]
pub struct LeadScope {
    filtered: Vec<DbLead>,
    all: Vec<DbLead>,
}

impl LeadScope {
    /// Partition a freshly loaded lead set for a viewer.
    pub fn partition(leads: Vec<DbLead>, viewer: &Viewer) -> Self {
        let filtered = leads
            .iter()
            .filter(|lead| is_visible(lead, viewer))
            .cloned()
            .collect();
        Self {
            filtered,
            all: leads,
        }
    }

    /// The leads this viewer is allowed to see.
    pub fn filtered_leads(&self) -> &[DbLead] {
        &self.filtered
    }

    /// The unfiltered collection, gated to admin viewers. Returns None for
    /// any other role.
    pub fn all_leads_data(&self, viewer: &Viewer) -> Option<&[DbLead]> {
        if viewer.role == Role::Admin {
            Some(&self.all)
        } else {
            None
        }
    }
}
