//! # Verify Subcommand
//!
//! Verifies every signed document found in a file: a bare signed document,
//! a single or batch envelope, or a zip package holding one.
//!
//! ```bash
//! edoc verify lote.zip
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use edoc_core::{parse, Element, NamespaceScope, ID_ATTRIBUTE};
use edoc_crypto::{verify_element, VerificationError};

use crate::input::read_markup;

/// Arguments for `edoc verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Signed document, envelope or package.
    pub input: PathBuf,
}

/// Verification verdict for one signed document.
#[derive(Debug)]
pub struct UnitVerdict {
    pub document_id: String,
    pub result: Result<(), VerificationError>,
}

/// Execute `edoc verify`.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let (bytes, _) = read_markup(&args.input)?;
    let root = parse(&bytes).with_context(|| format!("parsing {}", args.input.display()))?;
    let verdicts = verify_all(&root);
    if verdicts.is_empty() {
        bail!("{} contains no signed document", args.input.display());
    }

    let mut failed = 0usize;
    for verdict in &verdicts {
        match &verdict.result {
            Ok(()) => println!("  OK: {}", verdict.document_id),
            Err(e) => {
                failed += 1;
                println!("  FAIL: {} ({e})", verdict.document_id);
            }
        }
    }
    println!("{} verified, {failed} failed", verdicts.len() - failed);
    Ok(if failed == 0 { 0 } else { 2 })
}

/// Verify every element that directly holds a signature block, each in the
/// namespace scope of its ancestors.
pub fn verify_all(root: &Element) -> Vec<UnitVerdict> {
    let mut verdicts = Vec::new();
    let mut path = Vec::new();
    collect(root, &mut path, &mut verdicts);
    verdicts
}

fn collect<'a>(element: &'a Element, path: &mut Vec<&'a Element>, out: &mut Vec<UnitVerdict>) {
    if element.child("Signature").is_some() {
        let scope = NamespaceScope::along(path.iter().copied());
        out.push(UnitVerdict {
            document_id: element.attr(ID_ATTRIBUTE).unwrap_or("<no id>").to_string(),
            result: verify_element(element, &scope),
        });
        return;
    }
    path.push(element);
    for child in element.elements() {
        collect(child, path, out);
    }
    path.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use edoc_core::{Document, Element};
    use edoc_crypto::{load_identity, sign};

    const NS: &str = "http://ekuatia.set.gov.py/sifen/xsd";

    fn signed(id: &str) -> String {
        let identity = load_identity(
            concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/issuer.identity.pem"),
            Some("fixture-passphrase"),
        )
        .unwrap();
        let document = Document::new(
            Element::new("DE")
                .with_default_namespace(NS)
                .with_attr("Id", id)
                .with_child(Element::leaf("dTotGralOpe", "100")),
        )
        .unwrap();
        sign(document, &identity).unwrap().canonical().as_str().to_string()
    }

    #[test]
    fn verifies_bare_document() {
        let root = parse(signed("DOC-1").as_bytes()).unwrap();
        let verdicts = verify_all(&root);
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].document_id, "DOC-1");
        assert!(verdicts[0].result.is_ok());
    }

    #[test]
    fn verifies_each_unit_of_a_batch() {
        let markup = format!(
            "<rLoteDE xmlns=\"{NS}\"><rDE xmlns=\"{NS}\"><dVerFor>150</dVerFor>{}</rDE>\
             <rDE xmlns=\"{NS}\"><dVerFor>150</dVerFor>{}</rDE></rLoteDE>",
            signed("DOC-1"),
            signed("DOC-2")
        );
        let root = parse(markup.as_bytes()).unwrap();
        let verdicts = verify_all(&root);
        let ids: Vec<_> = verdicts.iter().map(|v| v.document_id.as_str()).collect();
        assert_eq!(ids, ["DOC-1", "DOC-2"]);
        assert!(verdicts.iter().all(|v| v.result.is_ok()));
    }

    #[test]
    fn tampered_content_fails() {
        let tampered = signed("DOC-1").replace(">100<", ">900<");
        let root = parse(tampered.as_bytes()).unwrap();
        let verdicts = verify_all(&root);
        assert!(matches!(
            verdicts[0].result,
            Err(VerificationError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn run_verify_reports_failure_with_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.xml");
        let bad = dir.path().join("bad.xml");
        std::fs::write(&good, signed("DOC-1")).unwrap();
        std::fs::write(&bad, signed("DOC-1").replace(">100<", ">900<")).unwrap();
        assert_eq!(run_verify(&VerifyArgs { input: good }).unwrap(), 0);
        assert_eq!(run_verify(&VerifyArgs { input: bad }).unwrap(), 2);
    }

    #[test]
    fn unsigned_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.xml");
        std::fs::write(&path, "<DE Id=\"X\"><a/></DE>").unwrap();
        assert!(run_verify(&VerifyArgs { input: path }).is_err());
    }
}
