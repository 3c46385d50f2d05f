//! reqwest-backed transport
//!
//! Builds the URL from the configured base and the endpoint path, sends GET
//! parameters as a query string and POST parameters as a form body, and lets
//! the configured `Signer` attach the credential. Quota headers are parsed on
//! every response, including failures.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::credential::{Consumer, Credential};
use crate::error::{Result, TransportError};
use crate::quota::QuotaHeaders;
use crate::request::{ApiRequest, HttpMethod, RawResponse};
use crate::Transport;

/// Attaches a credential to an outgoing request.
pub trait Signer: Send + Sync {
    fn sign(
        &self,
        request: reqwest::RequestBuilder,
        consumer: &Consumer,
        credential: &Credential,
    ) -> reqwest::RequestBuilder;
}

/// Sends the access token as an OAuth 2.0 bearer token.
#[derive(Debug, Default, Clone, Copy)]
pub struct BearerSigner;

impl Signer for BearerSigner {
    fn sign(
        &self,
        request: reqwest::RequestBuilder,
        _consumer: &Consumer,
        credential: &Credential,
    ) -> reqwest::RequestBuilder {
        request.bearer_auth(credential.key())
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    consumer: Consumer,
    signer: Arc<dyn Signer>,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        consumer: Consumer,
        signer: Arc<dyn Signer>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            consumer,
            signer,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    #[instrument(skip_all, fields(path = request.endpoint.path))]
    async fn send(&self, credential: &Credential, request: &ApiRequest) -> Result<RawResponse> {
        let url = self.url(request.endpoint.path);
        let builder = self
            .client
            .request(request.endpoint.method.as_reqwest(), &url);
        let builder = match request.endpoint.method {
            HttpMethod::Get => builder.query(&request.params),
            HttpMethod::Post => builder.form(&request.params),
        };
        let builder = self.signer.sign(builder, &self.consumer, credential);

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let quota = QuotaHeaders::from_headers(response.headers());

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            warn!(status = status.as_u16(), "remote returned error status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
                quota,
            });
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        debug!(
            status = status.as_u16(),
            remaining = quota.map(|q| q.remaining),
            "request completed"
        );
        Ok(RawResponse {
            status: status.as_u16(),
            body,
            quota,
        })
    }
}

impl Transport for HttpTransport {
    fn execute<'a>(
        &'a self,
        credential: &'a Credential,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'a>> {
        Box::pin(self.send(credential, request))
    }
}
