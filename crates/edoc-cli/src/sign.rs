//! # Sign Subcommand
//!
//! Signs one business document and writes its canonical signed form.
//!
//! ```bash
//! edoc sign invoice.xml --identity issuer.pem -o invoice.signed.xml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use edoc_crypto::{sign, verify, SignedDocument, SigningIdentity};

use crate::input::{load_signing_identity, read_document, write_output};

/// Arguments for `edoc sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Unsigned business document.
    pub input: PathBuf,

    /// PEM bundle with the private key and certificate chain.
    /// Defaults to `EDOC_IDENTITY_PATH`.
    #[arg(long)]
    pub identity: Option<PathBuf>,

    /// Output file. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute `edoc sign`.
pub fn run_sign(args: &SignArgs) -> Result<u8> {
    let identity = load_signing_identity(args.identity.as_deref())?;
    let signed = sign_file(&args.input, &identity)?;
    write_output(args.output.as_deref(), signed.canonical().as_bytes())?;
    Ok(0)
}

/// Read, sign and self-verify one document.
pub fn sign_file(path: &std::path::Path, identity: &dyn SigningIdentity) -> Result<SignedDocument> {
    let document = read_document(path)?;
    let id = document.id().to_string();
    let signed = sign(document, identity).with_context(|| format!("signing document {id}"))?;
    verify(&signed).with_context(|| format!("document {id} failed verification after signing"))?;
    tracing::info!(
        doc_id = %id,
        digest = %signed.digest().to_base64(),
        "document signed"
    );
    Ok(signed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use edoc_crypto::load_identity;
    use std::path::Path;

    const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures");

    #[test]
    fn signs_the_fixture_document() {
        let identity = load_identity(
            format!("{FIXTURES}/issuer.identity.pem"),
            Some("fixture-passphrase"),
        )
        .unwrap();
        let signed = sign_file(Path::new(&format!("{FIXTURES}/document.xml")), &identity).unwrap();
        let text = signed.canonical().as_str();
        assert!(text.starts_with("<DE xmlns=\"http://ekuatia.set.gov.py/sifen/xsd\""));
        assert!(text.ends_with("</Signature></DE>"));
        assert_eq!(signed.root().last_element().unwrap().local_name(), "Signature");
    }

    #[test]
    fn signing_is_deterministic() {
        let identity = load_identity(
            format!("{FIXTURES}/issuer.identity.pem"),
            Some("fixture-passphrase"),
        )
        .unwrap();
        let path = format!("{FIXTURES}/document.xml");
        let first = sign_file(Path::new(&path), &identity).unwrap();
        let second = sign_file(Path::new(&path), &identity).unwrap();
        assert_eq!(first.canonical(), second.canonical());
    }
}
