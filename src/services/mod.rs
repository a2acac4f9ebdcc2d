//! Business logic over the db layer. Every function takes the viewer and
//! its collaborators as explicit arguments; there is no ambient
//! current-user state.

pub mod access;
pub mod achievements;
pub mod follow_ups;
pub mod leads;
