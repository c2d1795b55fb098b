//! # Assemble Subcommand
//!
//! Signs documents, attaches verification codes and wraps them into an
//! envelope, optionally packaged as a zip archive. The result is checked
//! by the structural validator before it is written.
//!
//! ```bash
//! edoc assemble --mode batch a.xml b.xml --zip -o lote.zip
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use edoc_crypto::SigningIdentity;
use edoc_envelope::{
    assemble, generate, package, validate, AssemblyItem, Envelope, EnvelopeProfile,
    FieldSelection, Mode, OrderedFields, ValidationProfile, VerificationConfig,
    DEFAULT_ENTRY_NAME,
};

use crate::input::{load_signing_identity, write_output};
use crate::sign::sign_file;

/// Arguments for `edoc assemble`.
#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// Unsigned business documents, in envelope order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Transport mode: single or batch.
    #[arg(long, default_value = "single")]
    pub mode: Mode,

    /// PEM bundle with the private key and certificate chain.
    /// Defaults to `EDOC_IDENTITY_PATH`.
    #[arg(long)]
    pub identity: Option<PathBuf>,

    /// Skip the verification-code group.
    #[arg(long)]
    pub no_qr: bool,

    /// Write a zip package instead of bare markup.
    #[arg(long)]
    pub zip: bool,

    /// Output file. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute `edoc assemble`.
pub fn run_assemble(args: &AssembleArgs) -> Result<u8> {
    let identity = load_signing_identity(args.identity.as_deref())?;
    let verification = if args.no_qr {
        None
    } else {
        Some(VerificationConfig::from_env().context("loading verification settings")?)
    };
    write_assembly(args, &identity, verification.as_ref())
}

/// Assemble, report structural issues and write the result. Exit code 2
/// when the envelope has issues.
pub fn write_assembly(
    args: &AssembleArgs,
    identity: &dyn SigningIdentity,
    verification: Option<&VerificationConfig>,
) -> Result<u8> {
    let envelope = assemble_files(&args.inputs, identity, verification, args.mode)?;

    let issues = validate(&envelope, &ValidationProfile::default());
    for issue in &issues {
        tracing::warn!(kind = issue.kind(), "{issue}");
        eprintln!("  ISSUE: {issue}");
    }

    let bytes = if args.zip {
        package(&envelope, DEFAULT_ENTRY_NAME).context("packaging envelope")?
    } else {
        envelope.as_bytes().to_vec()
    };
    write_output(args.output.as_deref(), &bytes)?;
    Ok(if issues.is_empty() { 0 } else { 2 })
}

/// Sign every file and assemble the results in order.
pub fn assemble_files(
    paths: &[PathBuf],
    identity: &dyn SigningIdentity,
    verification: Option<&VerificationConfig>,
    mode: Mode,
) -> Result<Envelope> {
    let selection = verification.map(|config| {
        let mut sources = FieldSelection::default().sources().to_vec();
        sources.extend(config.secret_id_field());
        FieldSelection::new(sources)
    });

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let signed = sign_file(path, identity)?;
        let item = match (verification, &selection) {
            (Some(config), Some(selection)) => {
                let fields = OrderedFields::from_signed(&signed, selection)
                    .with_context(|| format!("collecting verification fields of {}", path.display()))?;
                let artifact = generate(&fields, &config.secret, &config.base_url)
                    .context("deriving verification code")?;
                AssemblyItem::new(signed).with_artifact(artifact)
            }
            _ => AssemblyItem::new(signed),
        };
        items.push(item);
    }

    let envelope = assemble(items, mode, &EnvelopeProfile::default()).context("assembling envelope")?;
    tracing::info!(mode = %mode, documents = envelope.ids().len(), bytes = envelope.len(), "envelope assembled");
    Ok(envelope)
}
