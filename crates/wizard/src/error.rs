use std::fmt;

use examdesk_gateway::GatewayError;

use crate::batch::Phase;

/// A staged draft the server rejected. Drafts before `index` were committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitError {
    pub index: usize,
    pub error: GatewayError,
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {} failed: {}", self.index + 1, self.error)
    }
}

impl std::error::Error for CommitError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    /// Client-side input problem. Nothing was sent.
    Validation { field: String, message: String },
    /// The action is not allowed in the current phase. Nothing changed.
    InvalidTransition { action: &'static str, phase: Phase },
    /// A batch commit stopped part way.
    Commit(CommitError),
    /// A lookup or update call failed.
    Gateway(GatewayError),
    /// Update flow used before a record was found.
    NoRecord,
}

impl WizardError {
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for WizardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { field, message } => write!(f, "{field}: {message}"),
            Self::InvalidTransition { action, phase } => {
                write!(f, "cannot {action} while {phase}")
            }
            Self::Commit(e) => write!(f, "batch stopped: {e}"),
            Self::Gateway(e) => write!(f, "{e}"),
            Self::NoRecord => write!(f, "no record loaded; search first"),
        }
    }
}

impl std::error::Error for WizardError {}

impl From<GatewayError> for WizardError {
    fn from(e: GatewayError) -> Self {
        Self::Gateway(e)
    }
}
