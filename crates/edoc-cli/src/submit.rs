//! # Submit Subcommand
//!
//! Runs documents through the submission and correction state machine
//! against the remote receiving service. In single mode each document gets
//! its own state machine and they run concurrently; in batch mode all
//! documents travel together in one lot. Ctrl-C requests cancellation,
//! which takes effect at the next attempt boundary.
//!
//! Settings come from the environment (`EDOC_TEST_URL`, `EDOC_QR_SECRET`,
//! `EDOC_IDENTITY_PATH`, ...) and the optional YAML correction policy.
//!
//! ```bash
//! edoc submit invoice.xml --environment test --policy codes.yaml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use edoc_envelope::{Mode, VerificationConfig};
use edoc_submit::{
    CancellationFlag, Controller, CorrectionPolicy, SubmissionConfig, SubmissionOutcome,
    SubmissionState,
};
use edoc_transport::{Environment, HttpTransport, TransportConfig};

use crate::input::{load_signing_identity, read_document};

/// Arguments for `edoc submit`.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Unsigned business documents.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Target environment: test or production.
    #[arg(long, default_value = "test")]
    pub environment: Environment,

    /// Transport mode: single (one request per document) or batch (one
    /// lot with every document).
    #[arg(long, default_value = "single")]
    pub mode: Mode,

    /// YAML response-code policy. Defaults to the built-in table.
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// PEM bundle with the private key and certificate chain.
    /// Defaults to `EDOC_IDENTITY_PATH`.
    #[arg(long)]
    pub identity: Option<PathBuf>,

    /// Emit outcomes as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute `edoc submit`.
pub fn run_submit(args: &SubmitArgs) -> Result<u8> {
    let policy = match &args.policy {
        Some(path) => CorrectionPolicy::load(path)
            .with_context(|| format!("loading policy {}", path.display()))?,
        None => CorrectionPolicy::default(),
    };
    let documents = args
        .inputs
        .iter()
        .map(|path| read_document(path))
        .collect::<Result<Vec<_>>>()?;

    let identity = load_signing_identity(args.identity.as_deref())?;
    let verification = VerificationConfig::from_env().context("loading verification settings")?;
    let transport_config = TransportConfig::from_env().context("loading transport settings")?;
    let transport = HttpTransport::new(transport_config).context("building HTTP client")?;

    let config = SubmissionConfig {
        environment: args.environment,
        mode: args.mode,
        policy,
        ..SubmissionConfig::default()
    };
    let controller = Arc::new(Controller::new(
        Arc::new(identity),
        Arc::new(transport),
        verification,
        config,
    ));

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let results = runtime.block_on(async {
        let cancel = CancellationFlag::new();
        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling remaining attempts");
                watcher.cancel();
            }
        });
        match args.mode {
            Mode::Single => controller.submit_batch(documents, &cancel).await,
            Mode::Batch => vec![controller.submit_lot(&documents, &cancel).await],
        }
    });

    report(&results, args.json)
}

/// Print outcomes and derive the exit code: 0 when every document was
/// accepted, 2 when any was not, 1 when the pipeline failed for any.
pub fn report(
    results: &[Result<SubmissionOutcome, edoc_submit::SubmitError>],
    json: bool,
) -> Result<u8> {
    let mut failed = false;
    let mut rejected = false;
    let mut outcomes = Vec::new();
    for result in results {
        match result {
            Ok(outcome) => {
                rejected |= outcome.state != SubmissionState::Accepted;
                if !json {
                    println!("{outcome}");
                }
                outcomes.push(outcome);
            }
            Err(e) => {
                failed = true;
                tracing::error!("{e}");
                eprintln!("  ERROR: {e}");
            }
        }
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    }
    Ok(match (failed, rejected) {
        (true, _) => 1,
        (false, true) => 2,
        (false, false) => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use edoc_submit::SubmitError;
    use edoc_transport::OperationKind;

    fn outcome(state: SubmissionState) -> SubmissionOutcome {
        SubmissionOutcome {
            document_id: "DOC-1".into(),
            operation: OperationKind::ReceiveDocument,
            environment: Environment::Test,
            state,
            response: None,
            http_status: None,
            raw_body: None,
            issues: vec![],
            corrections: vec![],
            history: vec![],
            attempts: 1,
            detail: "done".into(),
        }
    }

    #[test]
    fn all_accepted_exits_zero() {
        let results = vec![Ok(outcome(SubmissionState::Accepted))];
        assert_eq!(report(&results, false).unwrap(), 0);
    }

    #[test]
    fn any_rejection_exits_two() {
        let results = vec![
            Ok(outcome(SubmissionState::Accepted)),
            Ok(outcome(SubmissionState::RejectedFinal)),
        ];
        assert_eq!(report(&results, true).unwrap(), 2);
    }

    #[test]
    fn pipeline_failure_exits_one() {
        let results = vec![
            Ok(outcome(SubmissionState::TransportError)),
            Err(SubmitError::Task("panicked".into())),
        ];
        assert_eq!(report(&results, false).unwrap(), 1);
    }

    #[test]
    fn missing_input_fails_before_any_network_setup() {
        let args = SubmitArgs {
            inputs: vec![PathBuf::from("/nonexistent/doc.xml")],
            environment: Environment::Test,
            mode: Mode::Single,
            policy: None,
            identity: None,
            json: false,
        };
        assert!(run_submit(&args).is_err());
    }
}
