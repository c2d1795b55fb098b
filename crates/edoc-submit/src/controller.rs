//! # Submission & Correction Controller
//!
//! Drives one document, or one lot of documents sharing a batch envelope,
//! through the state machine in [`crate::state`]:
//!
//! 1. Check cancellation.
//! 2. Clone the unsigned business documents, apply every correction collected
//!    so far, sign, self-verify, attach the verification code, assemble. A
//!    rebuild that fails after a correction ends the run as a final
//!    rejection.
//! 3. Validate locally. Issues end the attempt without transmission, as
//!    correctable when every issue has a local correction.
//! 4. Submit through the [`Transport`], decode, classify the code.
//! 5. On a correctable code, loop from step 1 until `max_attempts`.
//!
//! Transport-class failures end the run: the transport's own retry policy
//! has already run, and connectivity retry is independent of correction
//! retry. A signed document is never edited; every attempt signs anew.

use std::sync::Arc;

use edoc_core::Document;
use edoc_crypto::{sign, verify, SigningIdentity};
use edoc_envelope::{
    assemble, generate, package, validate, AssemblyItem, Envelope, EnvelopeError, FieldSelection,
    Mode, OrderedFields, StructuralIssue, ValidationProfile, VerificationConfig,
    DEFAULT_ENTRY_NAME,
};
use edoc_transport::{
    DecodedResponse, Environment, OperationKind, Redactor, ResponseDecoder, SubmitRequest,
    Transport,
};
use tracing::Instrument;

use crate::cancel::CancellationFlag;
use crate::correction::CorrectionAction;
use crate::error::SubmitError;
use crate::outcome::SubmissionOutcome;
use crate::policy::{Classification, CorrectionPolicy};
use crate::state::{Submission, SubmissionState};

/// Explicit controller settings. No process-wide configuration is read.
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub environment: Environment,
    /// Single sends the envelope inline; batch sends a zip package.
    pub mode: Mode,
    pub policy: CorrectionPolicy,
    /// Envelope names, namespace and size limits.
    pub validation: ValidationProfile,
    /// Fields feeding the verification code.
    pub fields: FieldSelection,
    /// Archive entry name for batch packages.
    pub entry_name: String,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Test,
            mode: Mode::Single,
            policy: CorrectionPolicy::default(),
            validation: ValidationProfile::default(),
            fields: FieldSelection::default(),
            entry_name: DEFAULT_ENTRY_NAME.to_string(),
        }
    }
}

impl SubmissionConfig {
    /// Remote operation for the configured mode.
    pub fn operation(&self) -> OperationKind {
        operation_for(self.mode)
    }
}

/// Runs submissions. Cheap to share via `Arc`; holds no mutable state.
pub struct Controller {
    identity: Arc<dyn SigningIdentity>,
    transport: Arc<dyn Transport>,
    verification: VerificationConfig,
    selection: FieldSelection,
    decoder: ResponseDecoder,
    config: SubmissionConfig,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("identity", &self.identity.provider_name())
            .field("transport", &self.transport.transport_name())
            .field("verification", &self.verification)
            .field("config", &self.config)
            .finish()
    }
}

/// What one state machine submits: a single document, or a lot of them
/// sharing one batch envelope.
struct Unit<'a> {
    label: String,
    documents: &'a [Document],
    mode: Mode,
}

/// How an attempt ended.
enum Step {
    Finished,
    Correct(Vec<CorrectionAction>),
}

/// Mutable bookkeeping for one run.
struct Tracker {
    run: Submission,
    corrections: Vec<CorrectionAction>,
    issues: Vec<StructuralIssue>,
    response: Option<DecodedResponse>,
    http_status: Option<u16>,
    detail: String,
}

impl Tracker {
    fn new(document_id: &str) -> Self {
        Self {
            run: Submission::new(document_id),
            corrections: Vec::new(),
            issues: Vec::new(),
            response: None,
            http_status: None,
            detail: String::new(),
        }
    }

    fn finish(
        &mut self,
        state: SubmissionState,
        reason: impl Into<String>,
    ) -> Result<(), SubmitError> {
        let reason = reason.into();
        self.run.transition(state, reason.clone())?;
        self.detail = reason;
        Ok(())
    }

    fn into_outcome(self, operation: OperationKind, environment: Environment) -> SubmissionOutcome {
        let state = self.run.state();
        let attempts = self.run.attempt();
        let document_id = self.run.document_id().to_string();
        SubmissionOutcome {
            document_id,
            operation,
            environment,
            state,
            response: self.response.as_ref().map(|r| (&r.code).into()),
            http_status: self.http_status,
            raw_body: self.response.map(|r| r.body),
            issues: self.issues,
            corrections: self.corrections,
            history: self.run.into_history(),
            attempts,
            detail: self.detail,
        }
    }
}

impl Controller {
    /// Build a controller. The verification secret is registered with the
    /// response decoder's redactor.
    pub fn new(
        identity: Arc<dyn SigningIdentity>,
        transport: Arc<dyn Transport>,
        verification: VerificationConfig,
        config: SubmissionConfig,
    ) -> Self {
        let selection = match verification.secret_id_field() {
            Some(extra) => {
                let mut sources = config.fields.sources().to_vec();
                sources.push(extra);
                FieldSelection::new(sources)
            }
            None => config.fields.clone(),
        };
        let decoder =
            ResponseDecoder::new(Redactor::new().with_secret(verification.secret.expose()));
        Self {
            identity,
            transport,
            verification,
            selection,
            decoder,
            config,
        }
    }

    /// Use other element names for the response code and message.
    pub fn with_response_elements(
        mut self,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.decoder = self.decoder.with_elements(code, message);
        self
    }

    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    /// Run one document to a terminal state in the configured mode.
    ///
    /// Remote rejections, transport failures and cancellation are outcomes,
    /// and so is a rebuild that fails after a correction was applied: the
    /// run ends `RejectedFinal` with the last coded response kept. `Err`
    /// means the pipeline itself failed: a document that cannot be signed
    /// as given, or a signature that does not verify right after signing.
    pub async fn submit(
        &self,
        document: &Document,
        cancel: &CancellationFlag,
    ) -> Result<SubmissionOutcome, SubmitError> {
        let unit = Unit {
            label: document.id().to_string(),
            documents: std::slice::from_ref(document),
            mode: self.config.mode,
        };
        self.run(unit, cancel).await
    }

    /// Sign every document and send them together as one batch envelope.
    ///
    /// The lot runs a single state machine: corrections apply to every
    /// document, and the outcome's `document_id` lists the identifiers
    /// joined by commas. The configured mode is ignored.
    pub async fn submit_lot(
        &self,
        documents: &[Document],
        cancel: &CancellationFlag,
    ) -> Result<SubmissionOutcome, SubmitError> {
        if documents.is_empty() {
            return Err(EnvelopeError::EmptyBatch.into());
        }
        let ids: Vec<&str> = documents.iter().map(Document::id).collect();
        let unit = Unit {
            label: ids.join(","),
            documents,
            mode: Mode::Batch,
        };
        self.run(unit, cancel).await
    }

    /// Run independent state machines for several documents concurrently.
    /// Results are in input order.
    pub async fn submit_batch(
        self: &Arc<Self>,
        documents: Vec<Document>,
        cancel: &CancellationFlag,
    ) -> Vec<Result<SubmissionOutcome, SubmitError>> {
        let handles: Vec<_> = documents
            .into_iter()
            .map(|document| {
                let controller = Arc::clone(self);
                let cancel = cancel.clone();
                tokio::spawn(async move { controller.submit(&document, &cancel).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(e) => Err(SubmitError::Task(e.to_string())),
            });
        }
        results
    }

    async fn run(
        &self,
        unit: Unit<'_>,
        cancel: &CancellationFlag,
    ) -> Result<SubmissionOutcome, SubmitError> {
        let max_attempts = self.config.policy.max_attempts.max(1);
        let operation = operation_for(unit.mode);
        let mut tracker = Tracker::new(&unit.label);

        loop {
            if cancel.is_cancelled() {
                tracker.finish(SubmissionState::Cancelled, "cancellation requested")?;
                break;
            }
            if tracker.run.state() == SubmissionState::RejectedCorrectable {
                let reason = format!("rebuilding with {} corrections", tracker.corrections.len());
                tracker.run.transition(SubmissionState::Built, reason)?;
            }

            let span = tracing::info_span!(
                "attempt",
                doc_id = %unit.label,
                attempt = tracker.run.attempt(),
                operation = %operation,
                environment = %self.config.environment,
            );
            match self.attempt(&unit, &mut tracker).instrument(span).await? {
                Step::Finished => break,
                Step::Correct(actions) => {
                    if let Some(repeated) = actions.iter().find(|a| tracker.corrections.contains(a)) {
                        let reason = format!("correction already applied without effect: {repeated}");
                        tracker.finish(SubmissionState::RejectedFinal, reason)?;
                        break;
                    }
                    if tracker.run.attempt() >= max_attempts {
                        let reason = format!("correction limit of {max_attempts} attempts reached");
                        tracker.finish(SubmissionState::RejectedFinal, reason)?;
                        break;
                    }
                    tracker.corrections.extend(actions);
                }
            }
        }

        let outcome = tracker.into_outcome(operation, self.config.environment);
        tracing::info!(
            doc_id = %outcome.document_id,
            state = %outcome.state,
            attempts = outcome.attempts,
            code = outcome.code().unwrap_or("-"),
            "submission finished"
        );
        Ok(outcome)
    }

    async fn attempt(&self, unit: &Unit<'_>, tracker: &mut Tracker) -> Result<Step, SubmitError> {
        let envelope = match self.build(unit, &tracker.corrections) {
            Ok(envelope) => envelope,
            Err(e) if !tracker.corrections.is_empty() && e.is_rebuild_failure() => {
                tracing::warn!(doc_id = %unit.label, "rebuild after correction failed: {e}");
                tracker.finish(
                    SubmissionState::RejectedFinal,
                    format!("rebuild after correction failed: {e}"),
                )?;
                return Ok(Step::Finished);
            }
            Err(e) => return Err(e),
        };

        let issues = validate(&envelope, &self.config.validation);
        if !issues.is_empty() {
            let count = issues.len();
            let local: Option<Vec<CorrectionAction>> = issues
                .iter()
                .map(|i| i.correction().map(CorrectionAction::from))
                .collect();
            tracker.issues = issues;
            return match local {
                Some(actions) => {
                    let mut unique = Vec::with_capacity(actions.len());
                    for action in actions {
                        if !unique.contains(&action) {
                            unique.push(action);
                        }
                    }
                    tracker.run.transition(
                        SubmissionState::RejectedCorrectable,
                        format!("{count} structural issues with local corrections"),
                    )?;
                    Ok(Step::Correct(unique))
                }
                None => {
                    tracker.finish(
                        SubmissionState::RejectedFinal,
                        format!("{count} structural issues before transmission"),
                    )?;
                    Ok(Step::Finished)
                }
            };
        }
        tracker.issues.clear();
        tracker
            .run
            .transition(SubmissionState::Validated, "no structural issues")?;

        let payload = match unit.mode {
            Mode::Single => envelope.into_bytes(),
            Mode::Batch => package(&envelope, &self.config.entry_name)?,
        };
        let operation = operation_for(unit.mode);
        let request = SubmitRequest::new(payload, operation, self.config.environment);
        tracker.run.transition(
            SubmissionState::Submitted,
            format!("request {}", request.request_id),
        )?;

        let raw = match self.transport.submit(&request).await {
            Ok(raw) => raw,
            Err(e) if e.is_transport_class() => {
                tracing::warn!(request_id = %request.request_id, "transport failed: {e}");
                tracker.finish(SubmissionState::TransportError, e.to_string())?;
                return Ok(Step::Finished);
            }
            Err(e) => return Err(e.into()),
        };
        tracker.http_status = Some(raw.status);

        let decoded = match self.decoder.decode(&raw) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracker.finish(SubmissionState::RejectedFinal, e.to_string())?;
                return Ok(Step::Finished);
            }
        };
        let code = decoded.code.code.clone();
        let classification = self.config.policy.codes.classify(&code);
        tracker.response = Some(decoded);

        match classification {
            Classification::Accepted => {
                tracker.finish(SubmissionState::Accepted, format!("code {code}"))?;
                Ok(Step::Finished)
            }
            Classification::Correctable(action) => {
                tracker.run.transition(
                    SubmissionState::RejectedCorrectable,
                    format!("code {code}: {action}"),
                )?;
                Ok(Step::Correct(vec![action]))
            }
            Classification::Final => {
                tracker.finish(
                    SubmissionState::RejectedFinal,
                    format!("code {code} has no automatic correction"),
                )?;
                Ok(Step::Finished)
            }
        }
    }

    /// Fresh copies, corrections, sign, self-verify, verification code,
    /// assembly.
    fn build(
        &self,
        unit: &Unit<'_>,
        corrections: &[CorrectionAction],
    ) -> Result<Envelope, SubmitError> {
        let mut items = Vec::with_capacity(unit.documents.len());
        for document in unit.documents {
            items.push(self.prepare(document, corrections)?);
        }
        Ok(assemble(items, unit.mode, &self.config.validation.envelope)?)
    }

    fn prepare(
        &self,
        document: &Document,
        corrections: &[CorrectionAction],
    ) -> Result<AssemblyItem, SubmitError> {
        let mut root = document.root().clone();
        for correction in corrections {
            correction
                .apply(&mut root)
                .map_err(|source| SubmitError::Correction {
                    document: document.id().to_string(),
                    action: correction.clone(),
                    source,
                })?;
        }
        let signed = sign(Document::new(root)?, self.identity.as_ref())?;
        verify(&signed).map_err(|source| SubmitError::Integrity {
            document: signed.id().to_string(),
            source,
        })?;
        tracing::info!(
            doc_id = %signed.id(),
            digest = %signed.digest(),
            corrections = corrections.len(),
            "document signed"
        );

        let fields = OrderedFields::from_signed(&signed, &self.selection)?;
        let artifact = generate(
            &fields,
            &self.verification.secret,
            &self.verification.base_url,
        )?;
        Ok(AssemblyItem::new(signed).with_artifact(artifact))
    }
}

fn operation_for(mode: Mode) -> OperationKind {
    match mode {
        Mode::Single => OperationKind::ReceiveDocument,
        Mode::Batch => OperationKind::ReceiveBatch,
    }
}
