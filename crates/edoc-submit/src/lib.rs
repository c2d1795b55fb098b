//! # edoc-submit — Submission & Correction Controller
//!
//! Composes the pipeline crates into a response-driven state machine:
//! sign → verification code → assemble → validate → submit → classify, with
//! bounded corrective resubmission from a fresh unsigned copy.
//!
//! ## Crate Policy
//!
//! - Signing, assembly and validation are synchronous; the transport call is
//!   the only await point.
//! - Every correction is a tree edit on the unsigned document followed by a
//!   full re-sign. A signed document is never mutated.
//! - Codes and corrections come from [`CorrectionPolicy`], loadable from
//!   YAML; unknown codes are final.

pub mod cancel;
pub mod controller;
pub mod correction;
pub mod error;
pub mod outcome;
pub mod policy;
pub mod state;

pub use cancel::CancellationFlag;
pub use controller::{Controller, SubmissionConfig};
pub use correction::{CorrectionAction, CorrectionError};
pub use error::SubmitError;
pub use outcome::{ResponseCodeView, SubmissionOutcome};
pub use policy::{Classification, CodeTable, CorrectionPolicy, PolicyError, DEFAULT_MAX_ATTEMPTS};
pub use state::{StateError, Submission, SubmissionState, TransitionRecord};
