//! Structural validator tests over hand-built envelope bytes.
//!
//! The validator is purely structural, so these envelopes carry placeholder
//! signature blocks rather than real signatures.

use edoc_envelope::{
    validate, Envelope, LocalCorrection, Mode, StructuralIssue, ValidationProfile,
};

const NS: &str = "http://ekuatia.set.gov.py/sifen/xsd";
const SIG: &str = "<Signature xmlns=\"http://www.w3.org/2000/09/xmldsig#\"><SignedInfo></SignedInfo></Signature>";
const QR: &str = "<gCamFuFD><dCarQR>https://example/qr?F1&amp;cHashQR=AB</dCarQR></gCamFuFD>";

fn unit(id: &str, body: &str) -> String {
    format!(
        "<rDE xmlns=\"{NS}\"><dVerFor>150</dVerFor><DE Id=\"{id}\">{body}</DE>{QR}</rDE>"
    )
}

fn single(xml: String) -> Envelope {
    Envelope::from_bytes(Mode::Single, xml.into_bytes())
}

fn check(envelope: &Envelope) -> Vec<StructuralIssue> {
    validate(envelope, &ValidationProfile::default())
}

#[test]
fn well_formed_unit_has_no_issues() {
    let env = single(unit("DOC-1", &format!("<dDVId>7</dDVId>{SIG}")));
    assert_eq!(check(&env), vec![]);
}

#[test]
fn missing_format_version_is_reported_without_signature_issues() {
    let xml = format!("<rDE xmlns=\"{NS}\"><DE Id=\"DOC-1\"><a>1</a>{SIG}</DE>{QR}</rDE>");
    assert_eq!(
        check(&single(xml)),
        vec![StructuralIssue::MissingFormatVersion { unit: 1 }]
    );
}

#[test]
fn misplaced_format_version_counts_as_missing() {
    let xml = format!(
        "<rDE xmlns=\"{NS}\"><DE Id=\"DOC-1\">{SIG}</DE><dVerFor>150</dVerFor></rDE>"
    );
    assert!(check(&single(xml)).contains(&StructuralIssue::MissingFormatVersion { unit: 1 }));
}

#[test]
fn wrong_format_version_is_a_mismatch() {
    let xml = format!("<rDE xmlns=\"{NS}\"><dVerFor>140</dVerFor><DE Id=\"DOC-1\">{SIG}</DE></rDE>");
    assert_eq!(
        check(&single(xml)),
        vec![StructuralIssue::FormatVersionMismatch {
            unit: 1,
            expected: "150".into(),
            found: "140".into(),
        }]
    );
}

#[test]
fn missing_signature() {
    let env = single(unit("DOC-1", "<a>1</a>"));
    assert_eq!(
        check(&env),
        vec![StructuralIssue::MissingSignature {
            document: "DOC-1".into()
        }]
    );
}

#[test]
fn signature_not_last() {
    let env = single(unit("DOC-1", &format!("{SIG}<a>1</a>")));
    assert_eq!(
        check(&env),
        vec![StructuralIssue::SignatureNotLast {
            document: "DOC-1".into()
        }]
    );
}

#[test]
fn multiple_signatures() {
    let env = single(unit("DOC-1", &format!("<a>1</a>{SIG}{SIG}")));
    assert_eq!(
        check(&env),
        vec![StructuralIssue::MultipleSignatures {
            document: "DOC-1".into(),
            count: 2
        }]
    );
}

#[test]
fn signature_as_sibling_of_root_is_outside() {
    let xml = format!(
        "<rDE xmlns=\"{NS}\"><dVerFor>150</dVerFor><DE Id=\"DOC-1\"><a>1</a></DE>{SIG}</rDE>"
    );
    let issues = check(&single(xml));
    assert!(issues.contains(&StructuralIssue::SignatureOutsideRoot {
        parent: "rDE".into()
    }));
    assert!(issues.contains(&StructuralIssue::MissingSignature {
        document: "DOC-1".into()
    }));
}

#[test]
fn nested_signature_is_outside_root() {
    let env = single(unit("DOC-1", &format!("<g>{SIG}</g>{SIG}")));
    assert_eq!(
        check(&env),
        vec![StructuralIssue::SignatureOutsideRoot { parent: "g".into() }]
    );
}

#[test]
fn sub_second_timestamp_has_local_correction() {
    let env = single(unit(
        "DOC-1",
        &format!("<dFeEmiDE>2026-01-01T10:00:00.123</dFeEmiDE>{SIG}"),
    ));
    let issues = check(&env);
    assert_eq!(
        issues,
        vec![StructuralIssue::SubSecondTimestamp {
            element: "dFeEmiDE".into(),
            value: "2026-01-01T10:00:00.123".into(),
        }]
    );
    assert_eq!(
        issues[0].correction(),
        Some(LocalCorrection::TruncateTimestamp {
            element: "dFeEmiDE".into()
        })
    );
}

#[test]
fn decimal_amounts_are_not_timestamps() {
    let env = single(unit("DOC-1", &format!("<dTotGralOpe>100.50</dTotGralOpe>{SIG}")));
    assert!(check(&env).is_empty());
}

#[test]
fn profile_may_allow_fractional_digits() {
    let env = single(unit(
        "DOC-1",
        &format!("<dFeEmiDE>2026-01-01T10:00:00.1</dFeEmiDE>{SIG}"),
    ));
    let profile = ValidationProfile {
        max_fraction_digits: 3,
        ..ValidationProfile::default()
    };
    assert!(validate(&env, &profile).is_empty());
}

#[test]
fn verification_url_without_question_mark() {
    let xml = format!(
        "<rDE xmlns=\"{NS}\"><dVerFor>150</dVerFor><DE Id=\"DOC-1\">{SIG}</DE>\
         <gCamFuFD><dCarQR>https://example/qrF1&amp;cHashQR=AB</dCarQR></gCamFuFD></rDE>"
    );
    let issues = check(&single(xml));
    assert_eq!(issues.len(), 1);
    assert!(matches!(issues[0], StructuralIssue::VerificationUrlSeparator { .. }));
    assert_eq!(issues[0].correction(), None);
}

#[test]
fn single_and_batch_ceilings_are_distinct() {
    let profile = ValidationProfile {
        single_limit_bytes: 100,
        batch_limit_bytes: 10_000,
        ..ValidationProfile::default()
    };
    let body = unit("DOC-1", &format!("<a>1</a>{SIG}"));
    let size = body.len();

    let issues = validate(&single(body.clone()), &profile);
    assert_eq!(
        issues,
        vec![StructuralIssue::SizeExceeded {
            size,
            limit: 100,
            mode: Mode::Single
        }]
    );

    let batch = Envelope::from_bytes(Mode::Batch, format!("<rLoteDE xmlns=\"{NS}\">{body}</rLoteDE>").into_bytes());
    assert!(validate(&batch, &profile).is_empty());
}

#[test]
fn batch_wrapper_identifier_is_reported() {
    let xml = format!(
        "<rLoteDE xmlns=\"{NS}\" Id=\"L1\">{}</rLoteDE>",
        unit("DOC-1", SIG)
    );
    let env = Envelope::from_bytes(Mode::Batch, xml.into_bytes());
    assert_eq!(check(&env), vec![StructuralIssue::BatchWrapperIdentifier]);
}

#[test]
fn batch_units_are_checked_independently() {
    let xml = format!(
        "<rLoteDE xmlns=\"{NS}\">{}{}</rLoteDE>",
        unit("DOC-1", SIG),
        unit("DOC-2", "<a>1</a>")
    );
    let env = Envelope::from_bytes(Mode::Batch, xml.into_bytes());
    assert_eq!(
        check(&env),
        vec![StructuralIssue::MissingSignature {
            document: "DOC-2".into()
        }]
    );
}

#[test]
fn namespace_prefixes_are_reported() {
    let xml = format!(
        "<ns:rDE xmlns:ns=\"{NS}\"><ns:dVerFor>150</ns:dVerFor><ns:DE Id=\"DOC-1\">\
         <ds:Signature xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\"></ds:Signature></ns:DE></ns:rDE>"
    );
    let issues = check(&single(xml));
    let prefixed: Vec<_> = issues
        .iter()
        .filter_map(|i| match i {
            StructuralIssue::NamespacePrefix { element } => Some(element.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(prefixed, vec!["ns:rDE", "ns:DE", "ds:Signature"]);
}

#[test]
fn unparseable_bytes() {
    let env = single("<rDE><DE></rDE>".to_string());
    assert!(matches!(
        check(&env).as_slice(),
        [StructuralIssue::Unparseable { .. }]
    ));
}

#[test]
fn root_must_match_mode() {
    let env = Envelope::from_bytes(Mode::Batch, unit("DOC-1", SIG).into_bytes());
    assert_eq!(
        check(&env),
        vec![StructuralIssue::UnexpectedRoot {
            expected: "rLoteDE".into(),
            found: "rDE".into(),
        }]
    );
}

#[test]
fn missing_signable_root() {
    let xml = format!("<rDE xmlns=\"{NS}\"><dVerFor>150</dVerFor>{QR}</rDE>");
    assert_eq!(
        check(&single(xml)),
        vec![StructuralIssue::MissingSignableRoot { unit: 1 }]
    );
}

#[test]
fn issues_have_readable_messages() {
    let issue = StructuralIssue::SizeExceeded {
        size: 2_000_000,
        limit: 1_024_000,
        mode: Mode::Single,
    };
    assert_eq!(
        issue.to_string(),
        "single envelope is 2000000 bytes, limit 1024000"
    );
    assert_eq!(issue.kind(), "size_exceeded");
}
