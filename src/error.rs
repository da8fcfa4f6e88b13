//! Error taxonomy for the workflow core.
//!
//! Every variant is recoverable: the controller records the message in
//! `PipelineState::error` and the user can retry the same action.

use crate::model::PipelineStep;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// Rejected on the client before any request was made.
    #[error("{0}")]
    Validation(String),

    /// Network failure or non-success response from the backend.
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("request timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    /// Success status, but the payload breaks the artifact invariants.
    #[error("unexpected response from the analytics service: {0}")]
    Decode(String),

    #[error(transparent)]
    EmptyState(#[from] EmptyStateError),

    #[error("step '{}' is not reachable from '{}'", .requested.title(), .active.title())]
    StepLocked {
        requested: PipelineStep,
        active: PipelineStep,
    },

    #[error("export failed: {0}")]
    Export(String),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for failures raised before any request left the client.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::EmptyState(_) | Self::StepLocked { .. }
        )
    }
}

/// A step was used before the artifact it depends on exists.
///
/// Views degrade to `guidance` plus a way back to `back_to`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{guidance}")]
pub struct EmptyStateError {
    pub step: PipelineStep,
    pub guidance: &'static str,
    pub back_to: PipelineStep,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_displays_only_the_extracted_message() {
        let err = WorkflowError::Transport {
            status: Some(400),
            message: "Only CSV files are accepted".into(),
        };
        assert_eq!(err.to_string(), "Only CSV files are accepted");
        assert!(!err.is_client_side());
    }

    #[test]
    fn timeout_message_is_human_readable() {
        let err = WorkflowError::Timeout(Duration::from_secs(90));
        assert_eq!(err.to_string(), "request timed out after 1m 30s");
        let err = WorkflowError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "request timed out after 250ms");
    }

    #[test]
    fn locked_step_names_both_steps() {
        let err = WorkflowError::StepLocked {
            requested: PipelineStep::Results,
            active: PipelineStep::View,
        };
        assert!(err.is_client_side());
        assert_eq!(
            err.to_string(),
            "step 'Results' is not reachable from 'Data Preview'"
        );
    }
}
