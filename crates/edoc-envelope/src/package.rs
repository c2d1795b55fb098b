//! Zip packaging for batch transport.
//!
//! A package is a single-entry deflate archive whose entry is exactly the
//! envelope bytes. Entry timestamps use the archive format's epoch, so the
//! same envelope always packages to the same bytes.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::assemble::Envelope;
use crate::error::EnvelopeError;

/// Entry name used when the caller has no preference.
pub const DEFAULT_ENTRY_NAME: &str = "lote.xml";

/// Compress an envelope into a single-entry zip archive.
pub fn package(envelope: &Envelope, entry_name: &str) -> Result<Vec<u8>, EnvelopeError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    writer.start_file(entry_name, options)?;
    writer.write_all(envelope.as_bytes())?;
    let archive = writer.finish()?.into_inner();
    tracing::debug!(
        entry = entry_name,
        envelope_bytes = envelope.len(),
        archive_bytes = archive.len(),
        "envelope packaged"
    );
    Ok(archive)
}

/// Extract the single entry of a package: `(entry name, bytes)`.
pub fn unpack(archive: &[u8]) -> Result<(String, Vec<u8>), EnvelopeError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    if zip.len() != 1 {
        return Err(EnvelopeError::Packaging(format!(
            "expected one archive entry, found {}",
            zip.len()
        )));
    }
    let mut entry = zip.by_index(0)?;
    let name = entry.name().to_string();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok((name, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::Mode;

    fn envelope() -> Envelope {
        Envelope::from_bytes(Mode::Batch, b"<rLoteDE xmlns=\"urn:x\"></rLoteDE>".to_vec())
    }

    #[test]
    fn package_holds_exact_envelope_bytes() {
        let archive = package(&envelope(), "lote.xml").unwrap();
        let (name, bytes) = unpack(&archive).unwrap();
        assert_eq!(name, "lote.xml");
        assert_eq!(bytes, envelope().as_bytes());
    }

    #[test]
    fn packaging_is_deterministic() {
        assert_eq!(
            package(&envelope(), DEFAULT_ENTRY_NAME).unwrap(),
            package(&envelope(), DEFAULT_ENTRY_NAME).unwrap()
        );
    }

    #[test]
    fn garbage_is_not_a_package() {
        assert!(matches!(
            unpack(b"not a zip"),
            Err(EnvelopeError::Packaging(_))
        ));
    }

    #[test]
    fn multi_entry_archive_is_rejected() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for name in ["a.xml", "b.xml"] {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(b"<a></a>").unwrap();
        }
        let archive = writer.finish().unwrap().into_inner();
        assert!(matches!(unpack(&archive), Err(EnvelopeError::Packaging(_))));
    }
}
