//! The transport seam and its HTTPS implementation.
//!
//! [`Transport`] is the only blocking call in the pipeline. Implementations
//! are `Send + Sync` and designed to be shared via `Arc` across async tasks.
//!
//! [`HttpTransport`] wraps a `reqwest::Client` with connect and request
//! timeouts. Transport-class failures are retried with exponential backoff;
//! any HTTP response, including non-2xx, is returned as a [`RawResponse`]
//! for the decoder and never retried.

use async_trait::async_trait;

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::request::{RawResponse, SubmitRequest};
use crate::retry::{retry_send, RetryPolicy};
use crate::soap;

/// Hands payloads to the remote service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit one request and return the raw response.
    async fn submit(&self, request: &SubmitRequest) -> Result<RawResponse, TransportError>;

    /// Human-readable name for logs.
    fn transport_name(&self) -> &str;
}

/// SOAP-over-HTTPS transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
    service_namespace: String,
}

impl HttpTransport {
    /// Create a new transport from configuration.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::CONTENT_TYPE,
                    reqwest::header::HeaderValue::from_static(soap::SOAP_CONTENT_TYPE),
                );
                headers
            })
            .build()
            .map_err(|e| TransportError::ClientInit(e.to_string()))?;
        Ok(Self {
            client,
            config,
            service_namespace: soap::DEFAULT_SERVICE_NAMESPACE.to_string(),
        })
    }

    /// Use a different namespace for the SOAP body elements.
    pub fn with_service_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.service_namespace = namespace.into();
        self
    }

    fn endpoint_for(&self, request: &SubmitRequest) -> Result<url::Url, TransportError> {
        let base = self.config.endpoint(request.environment);
        let path = request.operation.path();
        // Url::join replaces the last segment unless the base ends in '/'.
        let base = if base.path().ends_with('/') {
            base.clone()
        } else {
            let mut with_slash = base.clone();
            with_slash.set_path(&format!("{}/", base.path()));
            with_slash
        };
        base.join(path).map_err(|e| TransportError::Endpoint {
            base: base.to_string(),
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(&self, request: &SubmitRequest) -> Result<RawResponse, TransportError> {
        let url = self.endpoint_for(request)?;
        let body = soap::wrap(request, &self.service_namespace);
        let policy = RetryPolicy {
            retries: self.config.retries,
            base_delay: std::time::Duration::from_millis(self.config.base_delay_ms),
        };

        tracing::info!(
            request_id = %request.request_id,
            operation = %request.operation,
            environment = %request.environment,
            payload_bytes = request.payload.len(),
            "submitting to remote service"
        );

        let resp = retry_send(policy, || self.client.post(url.clone()).body(body.clone()).send())
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;

        let status = resp.status().as_u16();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;

        tracing::debug!(
            request_id = %request.request_id,
            status,
            body_bytes = bytes.len(),
            "remote service responded"
        );
        Ok(RawResponse::new(status, bytes.to_vec()))
    }

    fn transport_name(&self) -> &str {
        "HttpTransport"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Environment, OperationKind};

    #[test]
    fn endpoint_keeps_base_path() {
        let mut config = TransportConfig::local_mock("http://127.0.0.1:9000/api").unwrap();
        config.production_url = url::Url::parse("https://prod.example/").unwrap();
        let transport = HttpTransport::new(config).unwrap();

        let single = SubmitRequest::new(vec![], OperationKind::ReceiveDocument, Environment::Test);
        assert_eq!(
            transport.endpoint_for(&single).unwrap().as_str(),
            "http://127.0.0.1:9000/api/de/ws/sync/recibe.wsdl"
        );

        let batch = SubmitRequest::new(vec![], OperationKind::ReceiveBatch, Environment::Production);
        assert_eq!(
            transport.endpoint_for(&batch).unwrap().as_str(),
            "https://prod.example/de/ws/async/recibe-lote.wsdl"
        );
    }
}
