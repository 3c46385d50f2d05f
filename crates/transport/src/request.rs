//! Request and response shapes crossing the transport boundary

use crate::quota::QuotaHeaders;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

/// A remote operation: HTTP method, path relative to the API base URL, and the
/// rate-limit family the server accounts it under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: &'static str,
    pub family: &'static str,
}

impl Endpoint {
    pub const fn get(path: &'static str, family: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            family,
        }
    }

    pub const fn post(path: &'static str, family: &'static str) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            family,
        }
    }
}

/// One call: an endpoint plus ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub params: Vec<(&'static str, String)>,
}

impl ApiRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
        }
    }

    /// Set a parameter, replacing any earlier value under the same name.
    pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.set(name, value);
        self
    }

    /// Set a parameter only when a value is present.
    pub fn param_opt<V: ToString>(self, name: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    pub fn set(&mut self, name: &'static str, value: impl ToString) {
        let value = value.to_string();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Decoded response from a successful call.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: serde_json::Value,
    pub quota: Option<QuotaHeaders>,
}
