//! # End-to-End Submission Against a Mock Receiving Service
//!
//! Runs the real controller over the real HTTP transport against wiremock.
//! Covers the response-driven paths of the state machine: acceptance,
//! correction and resubmission, the correction bound, the local validation
//! gate, connectivity failure, and batch transmission.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use edoc_core::{Document, Element};
use edoc_crypto::{load_identity_at, SigningIdentity};
use edoc_envelope::{Mode, Secret, StructuralIssue, ValidationProfile, VerificationConfig};
use edoc_submit::{
    CancellationFlag, Controller, CorrectionPolicy, SubmissionConfig, SubmissionState,
};
use edoc_transport::{Environment, HttpTransport, OperationKind, TransportConfig};
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NS: &str = "http://ekuatia.set.gov.py/sifen/xsd";
const SECRET: &str = "ABCDEF0123456789ABCDEF0123456789";

const POLICY: &str = r#"
max_attempts: 3
correctable:
  "1313":
    insert_missing:
      parent: gOpeDE
      after: iTipEmi
      element: dDesTipEmi
      default_value: Normal
  "1401":
    reorder:
      parent: DE
      first: gTotSub
      second: gDatGralOpe
"#;

// ── Helpers ──────────────────────────────────────────────────────────

fn identity() -> Arc<dyn SigningIdentity> {
    Arc::new(
        load_identity_at(
            concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/issuer.identity.pem"),
            Some("fixture-passphrase"),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap(),
    )
}

fn document(id: &str, emitted: &str) -> Document {
    Document::new(
        Element::new("DE")
            .with_default_namespace(NS)
            .with_attr("Id", id)
            .with_child(Element::leaf("dDVId", "7"))
            .with_child(
                Element::new("gOpeDE")
                    .with_child(Element::leaf("iTipEmi", "1"))
                    .with_child(Element::leaf("dCodSeg", "123456789")),
            )
            .with_child(
                Element::new("gTimb")
                    .with_child(Element::leaf("iTiDE", "1"))
                    .with_child(Element::leaf("dEst", "001"))
                    .with_child(Element::leaf("dPunExp", "002")),
            )
            .with_child(
                Element::new("gDatGralOpe")
                    .with_child(Element::leaf("dFeEmiDE", emitted))
                    .with_child(Element::new("gEmis").with_child(Element::leaf("dRucEm", "80000000"))),
            )
            .with_child(Element::new("gTotSub").with_child(Element::leaf("dTotGralOpe", "100"))),
    )
    .unwrap()
}

fn response(code: &str, message: &str) -> String {
    format!(
        "<env:Envelope xmlns:env=\"http://www.w3.org/2003/05/soap-envelope\"><env:Body>\
         <ns2:rRetEnviDe xmlns:ns2=\"{NS}\"><ns2:rProtDe><ns2:gResProc>\
         <ns2:dCodRes>{code}</ns2:dCodRes><ns2:dMsgRes>{message}</ns2:dMsgRes>\
         </ns2:gResProc></ns2:rProtDe></ns2:rRetEnviDe></env:Body></env:Envelope>"
    )
}

fn controller(server: &MockServer, config: SubmissionConfig) -> Controller {
    let transport = HttpTransport::new(TransportConfig::local_mock(&server.uri()).unwrap()).unwrap();
    let verification = VerificationConfig::new(
        Url::parse("https://example/qr").unwrap(),
        Secret::new(SECRET),
    );
    Controller::new(identity(), Arc::new(transport), verification, config)
}

fn config(mode: Mode) -> SubmissionConfig {
    SubmissionConfig {
        environment: Environment::Test,
        mode,
        policy: CorrectionPolicy::from_yaml(POLICY).unwrap(),
        ..SubmissionConfig::default()
    }
}

// ── Scenarios ────────────────────────────────────────────────────────

#[tokio::test]
async fn accepted_on_first_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/de/ws/sync/recibe.wsdl"))
        .and(body_string_contains("<dVerFor>150</dVerFor><DE "))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("0260", "Aprobado")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = controller(&server, config(Mode::Single))
        .submit(&document("DOC-1", "2026-01-01T10:00:00"), &CancellationFlag::new())
        .await
        .unwrap();

    assert!(outcome.is_accepted());
    assert_eq!(outcome.code(), Some("0260"));
    assert_eq!(outcome.operation, OperationKind::ReceiveDocument);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn correctable_rejection_is_fixed_and_resubmitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<dDesTipEmi>Normal</dDesTipEmi>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("0260", "Aprobado")))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("1313", "Falta dDesTipEmi")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = controller(&server, config(Mode::Single))
        .submit(&document("DOC-1", "2026-01-01T10:00:00"), &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SubmissionState::Accepted);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.corrections.len(), 1);
    let states: Vec<_> = outcome.history.iter().map(|t| t.to).collect();
    assert!(states.contains(&SubmissionState::RejectedCorrectable));
    assert_eq!(states.last(), Some(&SubmissionState::Accepted));
}

#[tokio::test]
async fn correction_loop_stops_at_the_attempt_cap() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("dDesTipEmi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("1401", "Orden incorrecto")))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("1313", "Falta dDesTipEmi")))
        .expect(1)
        .mount(&server)
        .await;

    let mut capped = config(Mode::Single);
    capped.policy.max_attempts = 2;
    let outcome = controller(&server, capped)
        .submit(&document("DOC-1", "2026-01-01T10:00:00"), &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SubmissionState::RejectedFinal);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.code(), Some("1401"));
    assert!(outcome.detail.contains("limit of 2 attempts"));
}

#[tokio::test]
async fn unknown_code_is_final_without_resubmission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("0160", "XML mal formado")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = controller(&server, config(Mode::Single))
        .submit(&document("DOC-1", "2026-01-01T10:00:00"), &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SubmissionState::RejectedFinal);
    assert!(outcome.to_string().contains("code 0160 XML mal formado"));
}

#[tokio::test]
async fn structural_issue_blocks_transmission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("0260", "Aprobado")))
        .expect(0)
        .mount(&server)
        .await;

    let mut tiny = config(Mode::Single);
    tiny.validation = ValidationProfile {
        single_limit_bytes: 64,
        ..ValidationProfile::default()
    };
    let outcome = controller(&server, tiny)
        .submit(&document("DOC-1", "2026-01-01T10:00:00"), &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SubmissionState::RejectedFinal);
    assert!(matches!(outcome.issues[0], StructuralIssue::SizeExceeded { limit: 64, .. }));
}

#[tokio::test]
async fn subsecond_timestamp_is_fixed_before_first_transmission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<dFeEmiDE>2026-01-01T10:00:00</dFeEmiDE>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("0260", "Aprobado")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = controller(&server, config(Mode::Single))
        .submit(&document("DOC-1", "2026-01-01T10:00:00.250"), &CancellationFlag::new())
        .await
        .unwrap();

    assert!(outcome.is_accepted());
    assert_eq!(outcome.attempts, 2);
}

#[tokio::test]
async fn slow_service_ends_in_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(response("0260", "Aprobado"))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut transport_config = TransportConfig::local_mock(&server.uri()).unwrap();
    transport_config.read_timeout_secs = 1;
    let controller = Controller::new(
        identity(),
        Arc::new(HttpTransport::new(transport_config).unwrap()),
        VerificationConfig::new(Url::parse("https://example/qr").unwrap(), Secret::new(SECRET)),
        config(Mode::Single),
    );
    let outcome = controller
        .submit(&document("DOC-1", "2026-01-01T10:00:00"), &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SubmissionState::TransportError);
    assert!(outcome.response.is_none());
}

#[tokio::test]
async fn batch_mode_posts_a_package_to_the_batch_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/de/ws/async/recibe-lote.wsdl"))
        .and(body_string_contains("<rEnvioLote "))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("0300", "Lote recibido")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = controller(&server, config(Mode::Batch))
        .submit(&document("DOC-1", "2026-01-01T10:00:00"), &CancellationFlag::new())
        .await
        .unwrap();

    assert!(outcome.is_accepted());
    assert_eq!(outcome.operation, OperationKind::ReceiveBatch);
}

#[tokio::test]
async fn lot_is_posted_once_with_every_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/de/ws/async/recibe-lote.wsdl"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("0300", "Lote recibido")))
        .expect(1)
        .mount(&server)
        .await;

    let documents = [
        document("DOC-1", "2026-01-01T10:00:00"),
        document("DOC-2", "2026-01-01T10:00:00"),
        document("DOC-3", "2026-01-01T10:00:00"),
    ];
    let outcome = controller(&server, config(Mode::Single))
        .submit_lot(&documents, &CancellationFlag::new())
        .await
        .unwrap();

    assert!(outcome.is_accepted());
    assert_eq!(outcome.document_id, "DOC-1,DOC-2,DOC-3");
    assert_eq!(outcome.operation, OperationKind::ReceiveBatch);
}

#[tokio::test]
async fn correction_that_cannot_be_applied_keeps_the_remote_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("1401", "Orden incorrecto")))
        .expect(1)
        .mount(&server)
        .await;

    let mut unfit = config(Mode::Single);
    unfit.policy = CorrectionPolicy::from_yaml(
        "correctable:\n  '1401':\n    reorder:\n      parent: gCamItem\n      first: dCodInt\n      second: dDesProSer\n",
    )
    .unwrap();
    let outcome = controller(&server, unfit)
        .submit(&document("DOC-1", "2026-01-01T10:00:00"), &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SubmissionState::RejectedFinal);
    assert_eq!(outcome.code(), Some("1401"));
    assert!(outcome
        .to_string()
        .contains("code 1401 Orden incorrecto; corrections attempted: move <dCodInt> before <dDesProSer> in <gCamItem>"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_documents_finish_independently() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("Id=\"DOC-2\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("0160", "XML mal formado")))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("0260", "Aprobado")))
        .mount(&server)
        .await;

    let controller = Arc::new(controller(&server, config(Mode::Single)));
    let documents = vec![
        document("DOC-1", "2026-01-01T10:00:00"),
        document("DOC-2", "2026-01-01T10:00:00"),
        document("DOC-3", "2026-01-01T10:00:00"),
    ];
    let results = controller
        .submit_batch(documents, &CancellationFlag::new())
        .await;

    let states: Vec<_> = results.into_iter().map(|r| r.unwrap().state).collect();
    assert_eq!(
        states,
        [
            SubmissionState::Accepted,
            SubmissionState::RejectedFinal,
            SubmissionState::Accepted
        ]
    );
}

#[tokio::test]
async fn cancelled_run_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("0260", "Aprobado")))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationFlag::new();
    cancel.cancel();
    let outcome = controller(&server, config(Mode::Single))
        .submit(&document("DOC-1", "2026-01-01T10:00:00"), &cancel)
        .await
        .unwrap();
    assert_eq!(outcome.state, SubmissionState::Cancelled);
}
