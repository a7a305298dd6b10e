//! Process-wide error state.
//!
//! The server keeps one [`ServerErrorState`] value and hands a snapshot of it
//! to every validation and code-action call. Transitions are pure functions so
//! they can be exercised without a live compiler.

use crate::probe::ProbeVerdict;

/// Kind of process-wide failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The configured compiler executable is missing or is not Lobster.
    InvalidExecutable,
}

/// Whether the server can currently validate documents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServerErrorState {
    #[default]
    None,
    Errored {
        kind: ErrorKind,
        message: Option<String>,
    },
}

/// Result of applying a probe verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The state after the verdict.
    pub state: ServerErrorState,
    /// Message to surface to the user, set only on the None -> errored edge.
    pub notify: Option<String>,
}

impl ServerErrorState {
    /// True when validation and code actions must be skipped.
    pub fn is_errored(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// The human-readable message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Errored { message, .. } => message.as_deref(),
        }
    }

    /// Apply a probe verdict.
    ///
    /// A valid verdict never clears an existing error; only [`Self::reset`]
    /// does. An invalid verdict records the first error and keeps it.
    pub fn after_probe(&self, verdict: &ProbeVerdict) -> Transition {
        match (self, verdict) {
            (Self::None, ProbeVerdict::Invalid(message)) => Transition {
                state: Self::Errored {
                    kind: ErrorKind::InvalidExecutable,
                    message: Some(message.clone()),
                },
                notify: Some(message.clone()),
            },
            (state, _) => Transition {
                state: state.clone(),
                notify: None,
            },
        }
    }

    /// State after a configuration change, before the new executable is probed.
    pub fn reset() -> Self {
        Self::None
    }
}
