//! # Validate Subcommand
//!
//! Runs the local structural validator over an assembled envelope. Zip
//! packages are unpacked first and validated in batch mode.
//!
//! ```bash
//! edoc validate rde.xml
//! edoc validate lote.zip --json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use edoc_envelope::{validate, Envelope, Mode, StructuralIssue, ValidationProfile};
use serde::Serialize;

use crate::input::read_markup;

/// Arguments for `edoc validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Envelope markup or zip package.
    pub input: PathBuf,

    /// Transport mode. Defaults to batch for packages, single otherwise.
    #[arg(long)]
    pub mode: Option<Mode>,

    /// Emit issues as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct IssueReport {
    kind: &'static str,
    message: String,
    correctable: bool,
}

impl From<&StructuralIssue> for IssueReport {
    fn from(issue: &StructuralIssue) -> Self {
        Self {
            kind: issue.kind(),
            message: issue.to_string(),
            correctable: issue.correction().is_some(),
        }
    }
}

/// Execute `edoc validate`.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let (bytes, packaged) = read_markup(&args.input)?;
    let mode = args
        .mode
        .unwrap_or(if packaged { Mode::Batch } else { Mode::Single });
    let envelope = Envelope::from_bytes(mode, bytes);
    let issues = validate(&envelope, &ValidationProfile::default());

    if args.json {
        let reports: Vec<IssueReport> = issues.iter().map(IssueReport::from).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else if issues.is_empty() {
        println!("OK: {} ({mode}, {} bytes)", args.input.display(), envelope.len());
    } else {
        for issue in &issues {
            println!("  ISSUE [{}]: {issue}", issue.kind());
        }
        println!("{} issue(s) in {}", issues.len(), args.input.display());
    }
    Ok(if issues.is_empty() { 0 } else { 2 })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://ekuatia.set.gov.py/sifen/xsd";

    fn write(markup: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.xml");
        std::fs::write(&path, markup).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_format_version_is_reported() {
        let (_dir, path) = write(&format!(
            "<rDE xmlns=\"{NS}\"><DE Id=\"DOC-1\"><a/><Signature xmlns=\"http://www.w3.org/2000/09/xmldsig#\"/></DE></rDE>"
        ));
        let args = ValidateArgs {
            input: path,
            mode: None,
            json: true,
        };
        assert_eq!(run_validate(&args).unwrap(), 2);
    }

    #[test]
    fn unparseable_input_is_an_issue_not_an_error() {
        let (_dir, path) = write("<rDE><DE>");
        let args = ValidateArgs {
            input: path,
            mode: Some(Mode::Single),
            json: false,
        };
        assert_eq!(run_validate(&args).unwrap(), 2);
    }

    #[test]
    fn issue_report_marks_local_corrections() {
        let issue = StructuralIssue::SubSecondTimestamp {
            element: "dFeEmiDE".into(),
            value: "2026-01-01T10:00:00.5".into(),
        };
        let report = IssueReport::from(&issue);
        assert!(report.correctable);
        assert_eq!(report.kind, issue.kind());
    }
}
