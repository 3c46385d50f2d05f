//! Scripted in-memory transport for client tests

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use transport::{ApiRequest, Credential, QuotaHeaders, RawResponse, Transport, TransportError};

type Handler = Box<dyn Fn(&Credential, &ApiRequest) -> transport::Result<RawResponse> + Send + Sync>;

/// A call as the remote saw it.
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub(crate) token: String,
    pub(crate) path: &'static str,
    pub(crate) params: Vec<(&'static str, String)>,
}

impl RecordedCall {
    pub(crate) fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

pub(crate) struct MockTransport {
    handler: Handler,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub(crate) fn new(
        handler: impl Fn(&Credential, &ApiRequest) -> transport::Result<RawResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Access-token keys in call order.
    pub(crate) fn tokens(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.token).collect()
    }
}

impl Transport for MockTransport {
    fn execute<'a>(
        &'a self,
        credential: &'a Credential,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = transport::Result<RawResponse>> + Send + 'a>> {
        self.calls.lock().unwrap().push(RecordedCall {
            token: credential.key().to_string(),
            path: request.endpoint.path,
            params: request.params.clone(),
        });
        let result = (self.handler)(credential, request);
        Box::pin(async move { result })
    }
}

pub(crate) fn ok(body: serde_json::Value) -> transport::Result<RawResponse> {
    Ok(RawResponse {
        status: 200,
        body,
        quota: None,
    })
}

pub(crate) fn ok_with_quota(body: serde_json::Value, quota: QuotaHeaders) -> transport::Result<RawResponse> {
    Ok(RawResponse {
        status: 200,
        body,
        quota: Some(quota),
    })
}

pub(crate) fn status(code: u16, body: &str) -> transport::Result<RawResponse> {
    Err(TransportError::Status {
        status: code,
        body: body.to_string(),
        quota: None,
    })
}

/// A 429 carrying the remote's quota headers.
pub(crate) fn rate_limited(quota: QuotaHeaders) -> transport::Result<RawResponse> {
    Err(TransportError::Status {
        status: 429,
        body: r#"{"errors":[{"code":88,"message":"Rate limit exceeded"}]}"#.to_string(),
        quota: Some(quota),
    })
}

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
