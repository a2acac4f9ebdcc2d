//! Error classification for the lead lifecycle engine.
//!
//! Failures are classified by kind:
//! - DataQuality: unresolvable stage value, missing reactivation breadcrumb
//! - Validation: missing required fields, permission denials
//! - Transient: storage or outbound HTTP failures
//! - Invariant: duplicate achievement racing past the application check
//!
//! Storage errors during a stage transition are fatal to that transition;
//! notification and history failures never are.

use serde::Serialize;

use crate::notify::NotifyError;
use crate::services::leads::TransitionError;

/// Failure taxonomy of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorClass {
    DataQuality,
    Validation,
    Transient,
    Invariant,
}

/// Serializable failure surface handed to calling layers (views, API
/// plumbing). Carries the classification plus whether the surrounding
/// operation was aborted by this failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineFault {
    pub message: String,
    pub class: ErrorClass,
    /// True when the failure aborted the whole operation (no partial state
    /// was persisted); false for best-effort steps that were recorded and
    /// skipped past.
    pub fatal_to_operation: bool,
}

impl From<&TransitionError> for EngineFault {
    fn from(err: &TransitionError) -> Self {
        let (class, fatal) = match err {
            // A lead stuck in "No Response" with no escape path is a data or
            // UI bug; surface it, don't abort anything else.
            TransitionError::NoPriorStage(_) => (ErrorClass::DataQuality, false),
            TransitionError::LeadNotFound(_) => (ErrorClass::Validation, false),
            TransitionError::NotPermitted(_) => (ErrorClass::Validation, false),
            TransitionError::MissingField(_) => (ErrorClass::Validation, false),
            // Score/category/breadcrumb consistency must not be partially
            // applied, so storage failures reject the whole transition.
            TransitionError::Db(_) => (ErrorClass::Transient, true),
        };
        EngineFault {
            message: err.to_string(),
            class,
            fatal_to_operation: fatal,
        }
    }
}

impl From<&NotifyError> for EngineFault {
    fn from(err: &NotifyError) -> Self {
        let class = match err {
            NotifyError::MissingField(_) => ErrorClass::Validation,
            NotifyError::Http(_) | NotifyError::Api { .. } => ErrorClass::Transient,
        };
        // Notification failures block only their own step.
        EngineFault {
            message: err.to_string(),
            class,
            fatal_to_operation: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_classification() {
        let fault = EngineFault::from(&TransitionError::NoPriorStage("lead-1".into()));
        assert_eq!(fault.class, ErrorClass::DataQuality);
        assert!(!fault.fatal_to_operation);

        let fault = EngineFault::from(&TransitionError::Db(crate::db::DbError::Migration(
            "boom".into(),
        )));
        assert_eq!(fault.class, ErrorClass::Transient);
        assert!(fault.fatal_to_operation, "storage failure aborts the transition");
    }

    #[test]
    fn test_notify_classification_is_never_fatal() {
        let fault = EngineFault::from(&NotifyError::MissingField("phone"));
        assert_eq!(fault.class, ErrorClass::Validation);
        assert!(!fault.fatal_to_operation);

        let fault = EngineFault::from(&NotifyError::Api {
            status: 502,
            message: "bad gateway".into(),
        });
        assert_eq!(fault.class, ErrorClass::Transient);
        assert!(!fault.fatal_to_operation);
    }
}
