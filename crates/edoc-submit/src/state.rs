//! # Submission State Machine
//!
//! ```text
//!             ┌──────────────── cancel ───────────────┐
//!             ▼                                       │
//!         Cancelled ◀── cancel ── Built ──▶ Validated ──▶ Submitted
//!                                  │  ▲                    │
//!                    local issues  │  │ rebuild            ├──▶ Accepted
//!                                  ▼  │                    ├──▶ TransportError
//!                        RejectedCorrectable ◀─────────────┤
//!                                  │                       │
//!                                  └──▶ RejectedFinal ◀────┘
//! ```
//!
//! Transitions are checked at runtime and every accepted transition is
//! appended to the history with its attempt number and reason.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a submission stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Signed, verification code attached, envelope assembled.
    Built,
    /// Passed local structural validation.
    Validated,
    /// Handed to the transport.
    Submitted,
    /// The remote service accepted the document.
    Accepted,
    /// Rejected with a known mechanical correction.
    RejectedCorrectable,
    /// Rejected with no automatic correction, or the correction cap was hit.
    RejectedFinal,
    /// Connectivity failure after the transport's own retries.
    TransportError,
    /// Cancellation observed at the top of an iteration.
    Cancelled,
}

impl SubmissionState {
    /// Whether no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::RejectedFinal | Self::TransportError | Self::Cancelled
        )
    }

    /// Whether `self → to` is an allowed transition.
    pub fn can_transition_to(&self, to: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, to),
            (Built, Validated)
                | (Built, RejectedCorrectable)
                | (Built, RejectedFinal)
                | (Built, Cancelled)
                | (Validated, Submitted)
                | (Submitted, Accepted)
                | (Submitted, RejectedCorrectable)
                | (Submitted, RejectedFinal)
                | (Submitted, TransportError)
                | (RejectedCorrectable, Built)
                | (RejectedCorrectable, RejectedFinal)
                | (RejectedCorrectable, Cancelled)
        )
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Built => "BUILT",
            Self::Validated => "VALIDATED",
            Self::Submitted => "SUBMITTED",
            Self::Accepted => "ACCEPTED",
            Self::RejectedCorrectable => "REJECTED_CORRECTABLE",
            Self::RejectedFinal => "REJECTED_FINAL",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Errors from invalid transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid submission transition for {document}: {from} -> {to}")]
    InvalidTransition {
        document: String,
        from: SubmissionState,
        to: SubmissionState,
    },
}

/// Record of a state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: SubmissionState,
    pub to: SubmissionState,
    /// Attempt the transition belongs to (1-based).
    pub attempt: u32,
    pub at: DateTime<Utc>,
    pub reason: String,
}

/// One document's run through the state machine.
#[derive(Debug, Clone)]
pub struct Submission {
    document_id: String,
    state: SubmissionState,
    attempt: u32,
    history: Vec<TransitionRecord>,
}

impl Submission {
    /// A run starting in `Built` at attempt 1.
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            state: SubmissionState::Built,
            attempt: 1,
            history: Vec::new(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub(crate) fn into_history(self) -> Vec<TransitionRecord> {
        self.history
    }

    /// Move to `to`, recording the reason.
    ///
    /// Re-entering `Built` starts the next attempt.
    pub fn transition(
        &mut self,
        to: SubmissionState,
        reason: impl Into<String>,
    ) -> Result<(), StateError> {
        if !self.state.can_transition_to(to) {
            return Err(StateError::InvalidTransition {
                document: self.document_id.clone(),
                from: self.state,
                to,
            });
        }
        if to == SubmissionState::Built {
            self.attempt += 1;
        }
        let reason = reason.into();
        tracing::debug!(
            doc_id = %self.document_id,
            attempt = self.attempt,
            from = %self.state,
            to = %to,
            reason = %reason,
            "submission transition"
        );
        self.history.push(TransitionRecord {
            from: self.state,
            to,
            attempt: self.attempt,
            at: Utc::now(),
            reason,
        });
        self.state = to;
        Ok(())
    }
}
