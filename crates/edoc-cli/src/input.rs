//! File and identity helpers shared by the subcommands.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use edoc_core::{parse, Document};
use edoc_crypto::{load_identity, load_identity_from_env, RsaIdentity, IDENTITY_PASSPHRASE_ENV};
use edoc_envelope::unpack;

/// Zip local file header magic.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Read an unsigned business document. Indentation between elements is
/// dropped so that pretty-printed input signs the same as compact input.
pub fn read_document(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut root = parse(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    root.strip_inter_element_whitespace();
    Document::new(root).with_context(|| format!("{} is not a signable document", path.display()))
}

/// Read markup bytes, unpacking a zip package transparently.
///
/// Returns the bytes and whether they came from a package.
pub fn read_markup(path: &Path) -> Result<(Vec<u8>, bool)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.starts_with(ZIP_MAGIC) {
        let (entry, inner) =
            unpack(&bytes).with_context(|| format!("unpacking {}", path.display()))?;
        tracing::debug!(path = %path.display(), entry = %entry, "read packaged envelope");
        return Ok((inner, true));
    }
    Ok((bytes, false))
}

/// Load the signing identity from `path`, or from `EDOC_IDENTITY_PATH` when
/// no path is given. The passphrase always comes from
/// `EDOC_IDENTITY_PASSPHRASE`.
pub fn load_signing_identity(path: Option<&Path>) -> Result<RsaIdentity> {
    match path {
        Some(path) => {
            let passphrase = std::env::var(IDENTITY_PASSPHRASE_ENV).ok();
            load_identity(path, passphrase.as_deref())
                .with_context(|| format!("loading identity {}", path.display()))
        }
        None => load_identity_from_env().context("loading identity from environment"),
    }
}

/// Write to `path`, or to stdout when none is given.
pub fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.write_all(b"\n")?;
            Ok(())
        }
    }
}
