//! AdmitFlow: lead lifecycle engine for a school-admissions CRM.
//!
//! Tracks leads (prospective families) through a sales funnel, assigns them
//! to counsellors, and fires outbound notifications as they progress. This
//! crate is the core behind the CRUD/view plumbing:
//!
//! - [`stages`]: the admin-editable stage catalog and the resolver that maps
//!   raw stage values (stable keys or legacy display names) to a canonical
//!   key, display name, score, and category.
//! - [`services::access`]: role-based visibility and edit permission.
//! - [`services::leads`]: stage transitions with the "No Response"
//!   reactivation breadcrumb, plus create / reassign / delete flows.
//! - [`services::achievements`]: idempotent counsellor milestone recording
//!   and leaderboard aggregation.
//! - [`services::follow_ups`]: three-tier "next follow-up" selection.
//! - [`notify`]: the best-effort lead-creation notification fan-out.
//!
//! The SQLite working store lives behind [`db`]; the campaign HTTP endpoint
//! behind the [`notify::CampaignSender`] seam.

pub mod db;
pub mod error;
mod migrations;
pub mod notify;
pub mod services;
pub mod stages;
