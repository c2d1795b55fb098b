//! # Response Decoding
//!
//! Maps a [`RawResponse`] to the remote service's coded result. Codes are
//! short numeric strings found in the profile's code element; the message
//! element next to it carries the human-readable reason.
//!
//! Everything that leaves this module passes through a [`Redactor`], so a
//! configured secret never surfaces, even when the remote service echoes a
//! malformed request back in its response.

use zeroize::Zeroizing;

use crate::error::DecodeError;
use crate::request::RawResponse;

/// Replacement text for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Removes configured secret values from text.
#[derive(Clone, Default)]
pub struct Redactor {
    secrets: Vec<Zeroizing<String>>,
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

impl Redactor {
    /// A redactor with no secrets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret value. Empty values are ignored.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(Zeroizing::new(secret));
        }
        self
    }

    /// Replace every occurrence of every secret.
    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for secret in &self.secrets {
            if out.contains(secret.as_str()) {
                out = out.replace(secret.as_str(), REDACTED);
            }
        }
        out
    }
}

/// Coded result from the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCode {
    /// Short numeric code, e.g. `0260`.
    pub code: String,
    /// Reason text, redacted.
    pub message: String,
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.code)
        } else {
            write!(f, "{} ({})", self.code, self.message)
        }
    }
}

/// A decoded response: code, HTTP status and the redacted raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedResponse {
    pub code: ResponseCode,
    pub status: u16,
    pub body: String,
}

/// Locates the code and message elements in response bodies.
#[derive(Debug, Clone)]
pub struct ResponseDecoder {
    code_element: String,
    message_element: String,
    redactor: Redactor,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self {
            code_element: "dCodRes".to_string(),
            message_element: "dMsgRes".to_string(),
            redactor: Redactor::new(),
        }
    }
}

impl ResponseDecoder {
    /// Decoder for the default `dCodRes` / `dMsgRes` elements.
    pub fn new(redactor: Redactor) -> Self {
        Self {
            redactor,
            ..Self::default()
        }
    }

    /// Use other element names for code and message.
    pub fn with_elements(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.code_element = code.into();
        self.message_element = message.into();
        self
    }

    /// The redactor applied to decoded text.
    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// Decode a raw response.
    ///
    /// The first code element in document order wins; its message is the
    /// first message element among its siblings, falling back to the first
    /// in the document.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Unparseable`] if the body is not well-formed.
    /// - [`DecodeError::MissingCode`] if no code element exists.
    /// - [`DecodeError::EmptyCode`] if the code element is empty.
    pub fn decode(&self, response: &RawResponse) -> Result<DecodedResponse, DecodeError> {
        let status = response.status;
        let root = edoc_core::parse(&response.body).map_err(|e| DecodeError::Unparseable {
            status,
            reason: self.redactor.redact(&e.to_string()),
        })?;

        let parent = root
            .descendants()
            .find(|e| e.child(&self.code_element).is_some());
        let code_element = match parent {
            Some(parent) => parent.child(&self.code_element),
            None => root.find(&self.code_element),
        }
        .ok_or_else(|| DecodeError::MissingCode {
            status,
            element: self.code_element.clone(),
        })?;

        let code = code_element.text().trim().to_string();
        if code.is_empty() {
            return Err(DecodeError::EmptyCode {
                status,
                element: self.code_element.clone(),
            });
        }

        let message = parent
            .and_then(|p| p.child(&self.message_element))
            .or_else(|| root.find(&self.message_element))
            .map(|m| m.text().trim().to_string())
            .unwrap_or_default();

        let decoded = DecodedResponse {
            code: ResponseCode {
                code,
                message: self.redactor.redact(&message),
            },
            status,
            body: self.redactor.redact(&String::from_utf8_lossy(&response.body)),
        };
        tracing::debug!(code = %decoded.code.code, status, "response decoded");
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCEPTED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
  <env:Header/>
  <env:Body>
    <ns2:rRetEnviDe xmlns:ns2="http://ekuatia.set.gov.py/sifen/xsd">
      <ns2:rProtDe>
        <ns2:Id>DOC-1</ns2:Id>
        <ns2:dEstRes>Aprobado</ns2:dEstRes>
        <ns2:gResProc>
          <ns2:dCodRes>0260</ns2:dCodRes>
          <ns2:dMsgRes>Autorizacion del DE satisfactoria</ns2:dMsgRes>
        </ns2:gResProc>
      </ns2:rProtDe>
    </ns2:rRetEnviDe>
  </env:Body>
</env:Envelope>"#;

    #[test]
    fn decodes_prefixed_soap_response() {
        let decoded = ResponseDecoder::default()
            .decode(&RawResponse::new(200, ACCEPTED))
            .unwrap();
        assert_eq!(decoded.code.code, "0260");
        assert_eq!(decoded.code.message, "Autorizacion del DE satisfactoria");
        assert_eq!(decoded.status, 200);
    }

    #[test]
    fn message_comes_from_the_code_siblings() {
        let body = "<r><dMsgRes>outer</dMsgRes><g><dCodRes>0160</dCodRes><dMsgRes>inner</dMsgRes></g></r>";
        let decoded = ResponseDecoder::default()
            .decode(&RawResponse::new(200, body))
            .unwrap();
        assert_eq!(decoded.code.message, "inner");
    }

    #[test]
    fn non_2xx_with_code_still_decodes() {
        let body = "<r><dCodRes>0160</dCodRes><dMsgRes>XML mal formado</dMsgRes></r>";
        let decoded = ResponseDecoder::default()
            .decode(&RawResponse::new(400, body))
            .unwrap();
        assert_eq!(decoded.code.code, "0160");
        assert_eq!(decoded.status, 400);
    }

    #[test]
    fn html_error_page_is_unparseable() {
        let err = ResponseDecoder::default()
            .decode(&RawResponse::new(502, "<html><body>Bad Gateway<br></body></html>"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Unparseable { status: 502, .. }));
    }

    #[test]
    fn missing_and_empty_codes() {
        let decoder = ResponseDecoder::default();
        assert!(matches!(
            decoder.decode(&RawResponse::new(200, "<r><x>1</x></r>")),
            Err(DecodeError::MissingCode { .. })
        ));
        assert!(matches!(
            decoder.decode(&RawResponse::new(200, "<r><dCodRes> </dCodRes></r>")),
            Err(DecodeError::EmptyCode { .. })
        ));
    }

    #[test]
    fn echoed_secret_is_redacted_everywhere() {
        let body = "<r><dCodRes>0160</dCodRes><dMsgRes>bad hash for S3CR3T-VALUE</dMsgRes><echo>S3CR3T-VALUE</echo></r>";
        let decoder = ResponseDecoder::new(Redactor::new().with_secret("S3CR3T-VALUE"));
        let decoded = decoder.decode(&RawResponse::new(200, body)).unwrap();
        assert!(!decoded.code.message.contains("S3CR3T-VALUE"));
        assert!(!decoded.body.contains("S3CR3T-VALUE"));
        assert!(decoded.body.contains(REDACTED));
        assert!(!format!("{decoder:?}").contains("S3CR3T"));
    }

    #[test]
    fn custom_element_names() {
        let decoder = ResponseDecoder::default().with_elements("code", "msg");
        let decoded = decoder
            .decode(&RawResponse::new(200, "<r><code>7</code><msg>m</msg></r>"))
            .unwrap();
        assert_eq!(decoded.code.to_string(), "7 (m)");
    }

    #[test]
    fn empty_secret_redacts_nothing() {
        assert_eq!(Redactor::new().with_secret("").redact("abc"), "abc");
    }
}
