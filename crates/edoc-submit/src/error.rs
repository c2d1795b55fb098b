//! Controller error type.
//!
//! These are failures of the pipeline itself. Remote rejections and
//! connectivity failures are not errors here: they end the state machine
//! and are reported through [`crate::SubmissionOutcome`].

use edoc_core::DocumentError;
use edoc_crypto::{SignError, VerificationError};
use edoc_envelope::{EnvelopeError, QrError};
use edoc_transport::TransportError;
use thiserror::Error;

use crate::correction::{CorrectionAction, CorrectionError};
use crate::state::StateError;

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("correction for {document} failed ({action}): {source}")]
    Correction {
        document: String,
        action: CorrectionAction,
        source: CorrectionError,
    },

    #[error("signing failed: {0}")]
    Sign(#[from] SignError),

    /// A freshly signed document did not verify. Never tolerated.
    #[error("document {document} failed self-verification after signing: {source}")]
    Integrity {
        document: String,
        source: VerificationError,
    },

    #[error("verification code: {0}")]
    Qr(#[from] QrError),

    #[error("envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    /// A transport failure outside the connection/timeout class, such as an
    /// unbuildable endpoint.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("batch task failed: {0}")]
    Task(String),
}

impl SubmitError {
    /// Whether this is a failure to produce the envelope from the unsigned
    /// documents. After a correction has been applied, such a failure ends
    /// the run as a final rejection instead of an error.
    pub fn is_rebuild_failure(&self) -> bool {
        matches!(
            self,
            Self::Document(_)
                | Self::Correction { .. }
                | Self::Sign(_)
                | Self::Qr(_)
                | Self::Envelope(_)
        )
    }
}
