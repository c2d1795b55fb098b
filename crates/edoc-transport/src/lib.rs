//! # edoc-transport — Remote Service Transport
//!
//! The thin collaborator between the submission controller and the remote
//! validation service:
//!
//! - [`Transport`]: the async seam the controller submits through.
//! - [`HttpTransport`]: SOAP 1.2 over HTTPS (reqwest, rustls) with connect
//!   and request timeouts, retrying transport-class failures only.
//! - [`ResponseDecoder`]: maps response bodies to coded results, redacting
//!   configured secrets.
//!
//! Transport retry (connectivity) is independent of the controller's
//! correction retry (structural rejection). A response with any HTTP status
//! is a response, not a transport error.

pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod request;
pub(crate) mod retry;
pub mod soap;

pub use config::{ConfigError, TransportConfig};
pub use decode::{DecodedResponse, Redactor, ResponseCode, ResponseDecoder, REDACTED};
pub use error::{DecodeError, TransportError};
pub use http::{HttpTransport, Transport};
pub use request::{Environment, OperationKind, RawResponse, SubmitRequest, UnknownEnvironment};
