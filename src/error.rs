//! Error types for the execution engine
//!
//! Errors are split by how far they are allowed to travel:
//! - [`DriverError`] is what the automation driver reports.
//! - [`StepError`] is a statement-level failure. It never leaves the step
//!   executor; it is turned into a failed `StatementResult` there.
//! - [`RunError`] is a run-level failure and is returned to whoever started
//!   the device run.

use crate::runner::state::SuiteReport;
use thiserror::Error;

/// Errors surfaced by an automation driver session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("Element not found: {locator_type}={locator_value}")]
    ElementNotFound {
        locator_type: String,
        locator_value: String,
    },

    #[error("Failed to establish driver session: {0}")]
    Connect(String),

    #[error("Driver session lost: {0}")]
    SessionLost(String),

    #[error("{0}")]
    Invocation(String),

    #[error("{0} is not supported by this driver")]
    Unsupported(String),
}

impl DriverError {
    pub fn element_not_found(locator_type: &str, locator_value: &str) -> Self {
        Self::ElementNotFound {
            locator_type: locator_type.to_string(),
            locator_value: locator_value.to_string(),
        }
    }

    /// True when the session is gone and nothing else can run on it
    pub fn is_session_lost(&self) -> bool {
        matches!(self, Self::SessionLost(_))
    }
}

/// Statement-level failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Element not found: {locator_type}={locator_value}")]
    ElementNotFound {
        locator_type: String,
        locator_value: String,
    },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Assertion failed: expected {expected}, but got {actual}")]
    AssertionMismatch { actual: String, expected: String },

    #[error("{0}")]
    DriverInvocation(String),
}

impl From<DriverError> for StepError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::ElementNotFound {
                locator_type,
                locator_value,
            } => StepError::ElementNotFound {
                locator_type,
                locator_value,
            },
            other => StepError::DriverInvocation(other.to_string()),
        }
    }
}

/// The driver session went away in the middle of a statement
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Driver session lost: {0}")]
pub struct SessionLost(pub String);

/// Run-level failures for a single device run
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Session error on device '{device_id}': {source}")]
    Session {
        device_id: String,
        #[source]
        source: DriverError,
    },

    /// Results of the cases that completed before the disconnect are kept in
    /// `partial`.
    #[error("Session lost on device '{device_id}': {reason}")]
    SessionLost {
        device_id: String,
        reason: String,
        partial: Box<SuiteReport>,
    },
}

impl RunError {
    /// Report of whatever completed before the run was aborted
    pub fn partial_report(&self) -> Option<&SuiteReport> {
        match self {
            RunError::Session { .. } => None,
            RunError::SessionLost { partial, .. } => Some(partial),
        }
    }
}
