//! SOAP 1.2 request bodies.
//!
//! | Operation | Body element | `xDE` content |
//! |-----------|--------------|---------------|
//! | `ReceiveDocument` | `rEnviDe` | envelope bytes, inline |
//! | `ReceiveBatch` | `rEnvioLote` | base64 of the zip package |

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::request::{OperationKind, SubmitRequest};

/// SOAP 1.2 envelope namespace.
pub const SOAP_NAMESPACE: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Content type for SOAP 1.2 requests.
pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

/// Namespace of the remote service's request elements.
pub const DEFAULT_SERVICE_NAMESPACE: &str = "http://ekuatia.set.gov.py/sifen/xsd";

fn body_element(operation: OperationKind) -> &'static str {
    match operation {
        OperationKind::ReceiveDocument => "rEnviDe",
        OperationKind::ReceiveBatch => "rEnvioLote",
    }
}

/// Wrap a request's payload in a SOAP 1.2 envelope.
pub fn wrap(request: &SubmitRequest, service_namespace: &str) -> Vec<u8> {
    let element = body_element(request.operation);
    let mut out = Vec::with_capacity(request.payload.len() + 512);
    out.extend_from_slice(b"<soap:Envelope xmlns:soap=\"");
    out.extend_from_slice(SOAP_NAMESPACE.as_bytes());
    out.extend_from_slice(b"\"><soap:Header/><soap:Body><");
    out.extend_from_slice(element.as_bytes());
    out.extend_from_slice(b" xmlns=\"");
    out.extend_from_slice(edoc_core::escape_attribute(service_namespace).as_bytes());
    out.extend_from_slice(b"\"><dId>");
    out.extend_from_slice(request.numeric_id().to_string().as_bytes());
    out.extend_from_slice(b"</dId><xDE>");
    match request.operation {
        OperationKind::ReceiveDocument => out.extend_from_slice(&request.payload),
        OperationKind::ReceiveBatch => {
            out.extend_from_slice(STANDARD.encode(&request.payload).as_bytes())
        }
    }
    out.extend_from_slice(b"</xDE></");
    out.extend_from_slice(element.as_bytes());
    out.extend_from_slice(b"></soap:Body></soap:Envelope>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Environment;

    fn request(operation: OperationKind, payload: &[u8]) -> SubmitRequest {
        SubmitRequest::new(payload.to_vec(), operation, Environment::Test)
    }

    #[test]
    fn single_payload_is_inline_and_byte_exact() {
        let payload = b"<rDE xmlns=\"urn:x\"><dVerFor>150</dVerFor></rDE>";
        let req = request(OperationKind::ReceiveDocument, payload);
        let body = String::from_utf8(wrap(&req, DEFAULT_SERVICE_NAMESPACE)).unwrap();
        assert!(body.contains(&format!(
            "<xDE>{}</xDE>",
            std::str::from_utf8(payload).unwrap()
        )));
        assert!(body.contains("<rEnviDe xmlns=\"http://ekuatia.set.gov.py/sifen/xsd\">"));
        assert!(body.contains(&format!("<dId>{}</dId>", req.numeric_id())));
    }

    #[test]
    fn batch_payload_is_base64() {
        let req = request(OperationKind::ReceiveBatch, b"PK\x03\x04zip");
        let body = String::from_utf8(wrap(&req, DEFAULT_SERVICE_NAMESPACE)).unwrap();
        assert!(body.contains(&format!("<xDE>{}</xDE>", STANDARD.encode(b"PK\x03\x04zip"))));
        assert!(body.contains("<rEnvioLote "));
    }

    #[test]
    fn wrapped_body_is_well_formed() {
        let req = request(OperationKind::ReceiveDocument, b"<rDE xmlns=\"urn:x\"></rDE>");
        let root = edoc_core::parse(&wrap(&req, DEFAULT_SERVICE_NAMESPACE)).unwrap();
        assert_eq!(root.name(), "soap:Envelope");
        assert!(root.find("rDE").is_some());
    }
}
