//! Final result of one document's submission.

use edoc_envelope::StructuralIssue;
use edoc_transport::{Environment, OperationKind, ResponseCode};
use serde::Serialize;

use crate::correction::CorrectionAction;
use crate::state::{SubmissionState, TransitionRecord};

/// Terminal state plus everything needed to explain it.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub document_id: String,
    pub operation: OperationKind,
    pub environment: Environment,
    /// Always terminal.
    pub state: SubmissionState,
    /// Last decoded response code, if the remote service answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseCodeView>,
    /// HTTP status of the last response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Last response body, redacted.
    #[serde(skip)]
    pub raw_body: Option<String>,
    /// Structural issues of the last local validation.
    #[serde(serialize_with = "serialize_issues")]
    pub issues: Vec<StructuralIssue>,
    /// Corrections applied, in order.
    pub corrections: Vec<CorrectionAction>,
    pub history: Vec<TransitionRecord>,
    /// Attempts made (1-based count).
    pub attempts: u32,
    /// Why the run ended.
    pub detail: String,
}

/// Serializable copy of a [`ResponseCode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseCodeView {
    pub code: String,
    pub message: String,
}

impl From<&ResponseCode> for ResponseCodeView {
    fn from(code: &ResponseCode) -> Self {
        Self {
            code: code.code.clone(),
            message: code.message.clone(),
        }
    }
}

fn serialize_issues<S: serde::Serializer>(
    issues: &[StructuralIssue],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(issues.iter().map(ToString::to_string))
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        self.state == SubmissionState::Accepted
    }

    /// The response code, if any.
    pub fn code(&self) -> Option<&str> {
        self.response.as_ref().map(|r| r.code.as_str())
    }
}

impl std::fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = match self.state {
            SubmissionState::Accepted => "accepted",
            SubmissionState::TransportError => "transport error",
            SubmissionState::Cancelled => "cancelled",
            _ => "rejected",
        };
        write!(
            f,
            "document {} {verdict} ({} on {}, attempt {})",
            self.document_id, self.operation, self.environment, self.attempts
        )?;
        match &self.response {
            Some(r) if r.message.is_empty() => write!(f, ": code {}", r.code)?,
            Some(r) => write!(f, ": code {} {}", r.code, r.message)?,
            None => write!(f, ": {}", self.detail)?,
        }
        if !self.issues.is_empty() {
            let issues: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
            write!(f, "; issues: {}", issues.join(", "))?;
        }
        if !self.corrections.is_empty() {
            let applied: Vec<String> = self.corrections.iter().map(ToString::to_string).collect();
            write!(f, "; corrections attempted: {}", applied.join(", "))?;
        }
        Ok(())
    }
}
