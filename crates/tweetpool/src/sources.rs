//! Page and batch sources backing the client's lazy operations

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use token_pool::PinGuard;
use transport::{ApiRequest, Endpoint};

use crate::chunked::BatchSource;
use crate::cursor::{Page, PageSource};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};

/// Status timelines, paged backwards by `max_id`.
pub(crate) struct TimelineSource {
    dispatcher: Arc<Dispatcher>,
    request: ApiRequest,
    page_size: usize,
    /// Held for the cursor's whole life when the timeline is user-scoped.
    pin: Option<PinGuard>,
}

impl TimelineSource {
    pub(crate) fn new(
        dispatcher: Arc<Dispatcher>,
        request: ApiRequest,
        page_size: usize,
        pin: Option<PinGuard>,
    ) -> Self {
        Self {
            dispatcher,
            request: request.param("count", page_size),
            page_size,
            pin,
        }
    }
}

impl PageSource for TimelineSource {
    type Item = Value;

    fn fetch<'a>(
        &'a self,
        token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<Page<Value>>> + Send + 'a>> {
        Box::pin(async move {
            let request = self.request.clone().param_opt("max_id", token);
            let response = self.dispatcher.call(&request, self.pin.as_ref()).await?;
            timeline_page(response.body)
        })
    }

    fn page_size(&self) -> Option<usize> {
        Some(self.page_size)
    }
}

/// Next `max_id` is one below the smallest id on the page.
fn timeline_page(body: Value) -> Result<Page<Value>> {
    let Value::Array(items) = body else {
        return Err(Error::Response("timeline response is not an array".into()));
    };
    let next = items
        .iter()
        .filter_map(|status| status.get("id").and_then(Value::as_u64))
        .min()
        .and_then(|min| min.checked_sub(1))
        .map(|max_id| max_id.to_string());
    Ok(Page { items, next })
}

/// Relationship id lists, paged by the server's opaque cursor.
pub(crate) struct IdsSource {
    dispatcher: Arc<Dispatcher>,
    request: ApiRequest,
    page_size: usize,
}

impl IdsSource {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>, endpoint: Endpoint, user_id: u64, page_size: usize) -> Self {
        Self {
            dispatcher,
            request: ApiRequest::new(endpoint)
                .param("user_id", user_id)
                .param("count", page_size),
            page_size,
        }
    }
}

impl PageSource for IdsSource {
    type Item = u64;

    fn fetch<'a>(
        &'a self,
        token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<Page<u64>>> + Send + 'a>> {
        Box::pin(async move {
            let request = self.request.clone().param("cursor", token.unwrap_or("-1"));
            let response = self.dispatcher.call(&request, None).await?;
            ids_page(&response.body)
        })
    }

    fn page_size(&self) -> Option<usize> {
        Some(self.page_size)
    }
}

/// A `next_cursor` of "0" marks the last page.
fn ids_page(body: &Value) -> Result<Page<u64>> {
    let ids = body
        .get("ids")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Response("id list response has no ids array".into()))?;
    let items = ids
        .iter()
        .map(|id| {
            id.as_u64()
                .or_else(|| id.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| Error::Response(format!("invalid id in id list: {id}")))
        })
        .collect::<Result<Vec<u64>>>()?;

    let next = match body.get("next_cursor_str").and_then(Value::as_str) {
        Some(cursor) => Some(cursor.to_string()),
        None => body.get("next_cursor").and_then(Value::as_i64).map(|c| c.to_string()),
    }
    .filter(|cursor| cursor != "0");
    Ok(Page { items, next })
}

/// Bulk user lookup, one call per batch of ids or screen names.
pub(crate) struct LookupSource {
    dispatcher: Arc<Dispatcher>,
    endpoint: Endpoint,
    param: &'static str,
}

impl LookupSource {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>, endpoint: Endpoint, param: &'static str) -> Self {
        Self {
            dispatcher,
            endpoint,
            param,
        }
    }
}

impl BatchSource for LookupSource {
    type Input = String;
    type Item = Value;

    fn fetch_batch<'a>(
        &'a self,
        batch: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>>> + Send + 'a>> {
        Box::pin(async move {
            let request = ApiRequest::new(self.endpoint).param(self.param, batch.join(","));
            let response = self.dispatcher.call(&request, None).await?;
            match response.body {
                Value::Array(users) => Ok(users),
                _ => Err(Error::Response("lookup response is not an array".into())),
            }
        })
    }
}
