//! Assembly tests against real signatures.
//!
//! Every envelope here is built from documents signed with the fixture
//! identity, then re-parsed to confirm the embedded signatures still verify
//! in their envelope scope.

use chrono::{TimeZone, Utc};
use edoc_core::{parse, Document, Element, NamespaceScope};
use edoc_crypto::{load_identity_at, sign, verify_element, RsaIdentity, SignedDocument};
use edoc_envelope::profile::DEFAULT_NAMESPACE;
use edoc_envelope::{
    assemble, generate, validate, AssemblyItem, EnvelopeError, EnvelopeProfile, FieldSelection,
    Mode, OrderedFields, Secret, ValidationProfile,
};
use url::Url;

fn identity() -> RsaIdentity {
    load_identity_at(
        concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/issuer.identity.pem"),
        Some("fixture-passphrase"),
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

fn business_root(id: &str) -> Element {
    Element::new("DE")
        .with_default_namespace(DEFAULT_NAMESPACE)
        .with_attr("Id", id)
        .with_child(Element::leaf("dDVId", "7"))
        .with_child(
            Element::new("gDatGralOpe").with_child(Element::leaf("dFeEmiDE", "2026-01-01T10:00:00")),
        )
        .with_child(Element::new("gEmis").with_child(Element::leaf("dRucEm", "80000000")))
}

fn signed(id: &str) -> SignedDocument {
    sign(Document::new(business_root(id)).unwrap(), &identity()).unwrap()
}

fn item(id: &str) -> AssemblyItem {
    let signed = signed(id);
    let fields = OrderedFields::from_signed(
        &signed,
        &FieldSelection::by_names(["Id", "dFeEmiDE", "dRucEm", "DigestValue"]),
    )
    .unwrap();
    let artifact = generate(
        &fields,
        &Secret::new("ABCD0000000000000000000000000000"),
        &Url::parse("https://example/qr").unwrap(),
    )
    .unwrap();
    AssemblyItem::new(signed).with_artifact(artifact)
}

// ── Single mode ──────────────────────────────────────────────────────

#[test]
fn single_envelope_has_strict_child_order() {
    let item = item("DOC-1");
    let canonical = item.signed().canonical().as_str().to_string();
    let url = item.artifact().unwrap().escaped();
    let envelope = assemble(vec![item], Mode::Single, &EnvelopeProfile::default()).unwrap();

    let expected = format!(
        "<rDE xmlns=\"{DEFAULT_NAMESPACE}\"><dVerFor>150</dVerFor>{canonical}\
         <gCamFuFD><dCarQR>{url}</dCarQR></gCamFuFD></rDE>"
    );
    assert_eq!(std::str::from_utf8(envelope.as_bytes()).unwrap(), expected);
    assert_eq!(envelope.ids(), &["DOC-1".to_string()]);
}

#[test]
fn embedded_signature_verifies_in_envelope_scope() {
    let envelope = assemble(vec![item("DOC-1")], Mode::Single, &EnvelopeProfile::default()).unwrap();
    let unit = parse(envelope.as_bytes()).unwrap();
    let root = unit.child("DE").unwrap();
    assert_eq!(root.last_element().unwrap().local_name(), "Signature");
    verify_element(root, &NamespaceScope::along([&unit])).unwrap();
}

#[test]
fn verification_url_is_unescaped_after_parsing() {
    let item = item("DOC-1");
    let url = item.artifact().unwrap().url().to_string();
    let envelope = assemble(vec![item], Mode::Single, &EnvelopeProfile::default()).unwrap();
    let unit = parse(envelope.as_bytes()).unwrap();
    assert_eq!(unit.find("dCarQR").unwrap().text(), url);
}

#[test]
fn item_without_artifact_omits_the_group() {
    let envelope = assemble(
        vec![AssemblyItem::new(signed("DOC-1"))],
        Mode::Single,
        &EnvelopeProfile::default(),
    )
    .unwrap();
    let unit = parse(envelope.as_bytes()).unwrap();
    assert!(unit.child("gCamFuFD").is_none());
    assert_eq!(unit.last_element().unwrap().local_name(), "DE");
}

#[test]
fn single_mode_rejects_two_documents() {
    let err = assemble(
        vec![item("DOC-1"), item("DOC-2")],
        Mode::Single,
        &EnvelopeProfile::default(),
    )
    .unwrap_err();
    assert_eq!(err, EnvelopeError::SingleModeCount(2));
}

#[test]
fn root_without_envelope_namespace_is_rejected() {
    let root = Element::new("DE")
        .with_attr("Id", "DOC-1")
        .with_child(Element::leaf("dDVId", "7"));
    let signed = sign(Document::new(root).unwrap(), &identity()).unwrap();
    let err = assemble(
        vec![AssemblyItem::new(signed)],
        Mode::Single,
        &EnvelopeProfile::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EnvelopeError::NamespaceMismatch { found, .. } if found.is_empty()));
}

// ── Batch mode ───────────────────────────────────────────────────────

#[test]
fn batch_wrapper_has_no_identifier_and_holds_every_unit() {
    let envelope = assemble(
        vec![item("DOC-1"), item("DOC-2"), item("DOC-3")],
        Mode::Batch,
        &EnvelopeProfile::default(),
    )
    .unwrap();
    let batch = parse(envelope.as_bytes()).unwrap();
    assert_eq!(batch.name(), "rLoteDE");
    assert!(batch.attributes().is_empty());
    let units: Vec<_> = batch.elements().collect();
    assert_eq!(units.len(), 3);
    for unit in units {
        assert_eq!(unit.elements().next().unwrap().name(), "dVerFor");
        let root = unit.child("DE").unwrap();
        verify_element(root, &NamespaceScope::along([&batch, unit])).unwrap();
    }
    assert_eq!(envelope.ids(), &["DOC-1", "DOC-2", "DOC-3"]);
}

#[test]
fn empty_batch_is_rejected() {
    assert_eq!(
        assemble(vec![], Mode::Batch, &EnvelopeProfile::default()).unwrap_err(),
        EnvelopeError::EmptyBatch
    );
}

#[test]
fn oversized_batch_is_rejected() {
    let profile = EnvelopeProfile {
        max_batch: 2,
        ..EnvelopeProfile::default()
    };
    let err = assemble(
        vec![item("DOC-1"), item("DOC-2"), item("DOC-3")],
        Mode::Batch,
        &profile,
    )
    .unwrap_err();
    assert_eq!(err, EnvelopeError::BatchTooLarge { count: 3, max: 2 });
}

#[test]
fn duplicate_identifiers_are_rejected() {
    let err = assemble(
        vec![item("DOC-1"), item("DOC-1")],
        Mode::Batch,
        &EnvelopeProfile::default(),
    )
    .unwrap_err();
    assert_eq!(err, EnvelopeError::DuplicateIdentifier("DOC-1".into()));
}

// ── Assembled output passes validation ───────────────────────────────

#[test]
fn assembled_envelopes_validate_cleanly() {
    let single = assemble(vec![item("DOC-1")], Mode::Single, &EnvelopeProfile::default()).unwrap();
    assert!(validate(&single, &ValidationProfile::default()).is_empty());

    let batch = assemble(
        vec![item("DOC-1"), item("DOC-2")],
        Mode::Batch,
        &EnvelopeProfile::default(),
    )
    .unwrap();
    assert!(validate(&batch, &ValidationProfile::default()).is_empty());
}

#[test]
fn signature_is_always_last_child_of_each_root() {
    for count in 1..=4 {
        let items = (1..=count).map(|n| item(&format!("DOC-{n}"))).collect();
        let envelope = assemble(items, Mode::Batch, &EnvelopeProfile::default()).unwrap();
        let batch = parse(envelope.as_bytes()).unwrap();
        for unit in batch.elements() {
            let root = unit.child("DE").unwrap();
            assert_eq!(root.last_element().unwrap().local_name(), "Signature");
        }
    }
}
