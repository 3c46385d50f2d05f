//! Client facade over the pooled credentials
//!
//! The session (tracker + dispatcher) is built lazily on the first call, which
//! also freezes the credential pool. Rotating operations draw any eligible
//! credential per request; user-scoped operations pin that user's credential
//! for the duration of the call and release it on every exit path.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_json::Value;
use token_pool::{CredentialPool, RateLimitTracker, TrackerConfig};
use tracing::{info, instrument};
use transport::{ApiRequest, Credential, Endpoint, Transport};

use crate::chunked::{ChunkedFetcher, DEFAULT_BATCH_SIZE};
use crate::cursor::Cursor;
use crate::dispatch::Dispatcher;
use crate::endpoints::{
    FOLLOWERS_IDS, FRIENDS_IDS, HOME_TIMELINE, STATUSES_UPDATE, USER_TIMELINE, USERS_LOOKUP,
    USERS_SHOW, default_family_limits,
};
use crate::error::{Error, Result};
use crate::selector::{UserRef, UserSelector};
use crate::sources::{IdsSource, LookupSource, TimelineSource};

/// Client tuning. `Default` carries the remote's documented limits.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub tracker: TrackerConfig,
    /// Statuses requested per timeline page.
    pub timeline_page_size: usize,
    /// Users requested per bulk lookup call.
    pub lookup_batch_size: usize,
    /// Ids requested per relationship page.
    pub ids_page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig {
                wait_on_rate_limit: false,
                families: default_family_limits(),
                pin_wait: Duration::ZERO,
            },
            timeline_page_size: 200,
            lookup_batch_size: DEFAULT_BATCH_SIZE,
            ids_page_size: 5000,
        }
    }
}

enum Session {
    Pending(CredentialPool),
    Ready(Arc<Dispatcher>),
}

pub struct Client {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    session: Mutex<Session>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            session: Mutex::new(Session::Pending(CredentialPool::new())),
        }
    }

    /// Register the access token owned by `user_id`. Only valid before the
    /// first call.
    pub fn add_access_token(&self, user_id: impl Into<String>, credential: Credential) -> Result<()> {
        match &mut *self.lock() {
            Session::Pending(pool) => Ok(pool.add(user_id, credential)?),
            Session::Ready(_) => Err(Error::Configuration(
                "access tokens must be added before the first call".into(),
            )),
        }
    }

    /// Single user read with a rotating credential.
    #[instrument(skip(self))]
    pub async fn get_user(&self, user: &UserRef) -> Result<Value> {
        let (name, value) = user.param();
        let request = ApiRequest::new(USERS_SHOW).param(name, value);
        Ok(self.dispatcher().call(&request, None).await?.body)
    }

    /// Bulk user read, one call per batch, results in selector order.
    pub fn lookup_users(&self, selector: UserSelector) -> Result<BoxStream<'static, Result<Value>>> {
        let source = LookupSource::new(self.dispatcher(), USERS_LOOKUP, selector.param_name());
        let fetcher = ChunkedFetcher::new(source, selector.into_values(), self.config.lookup_batch_size)?;
        Ok(fetcher.into_stream().boxed())
    }

    /// Statuses posted by `user_id`, newest first, at most `count` when set.
    pub fn user_timeline(
        &self,
        user_id: u64,
        since_id: Option<u64>,
        count: Option<usize>,
    ) -> BoxStream<'static, Result<Value>> {
        let request = ApiRequest::new(USER_TIMELINE)
            .param("user_id", user_id)
            .param_opt("since_id", since_id);
        let source = TimelineSource::new(self.dispatcher(), request, self.config.timeline_page_size, None);
        Cursor::new(source).into_items(count).boxed()
    }

    /// `user_id`'s personalized timeline, read with their own credential.
    ///
    /// The credential stays pinned until the returned stream ends, fails or
    /// is dropped.
    #[instrument(skip(self))]
    pub async fn home_timeline(
        &self,
        user_id: &str,
        since_id: Option<u64>,
        count: Option<usize>,
    ) -> Result<BoxStream<'static, Result<Value>>> {
        let dispatcher = self.dispatcher();
        let pin = dispatcher.tracker().pin(user_id).await?;
        let request = ApiRequest::new(HOME_TIMELINE).param_opt("since_id", since_id);
        let source = TimelineSource::new(dispatcher, request, self.config.timeline_page_size, Some(pin));
        Ok(Cursor::new(source).into_items(count).boxed())
    }

    /// Pages of ids `user_id` follows.
    pub fn friends_ids(&self, user_id: u64) -> BoxStream<'static, Result<Vec<u64>>> {
        self.id_pages(FRIENDS_IDS, user_id)
    }

    /// Pages of ids following `user_id`.
    pub fn followers_ids(&self, user_id: u64) -> BoxStream<'static, Result<Vec<u64>>> {
        self.id_pages(FOLLOWERS_IDS, user_id)
    }

    fn id_pages(&self, endpoint: Endpoint, user_id: u64) -> BoxStream<'static, Result<Vec<u64>>> {
        let source = IdsSource::new(self.dispatcher(), endpoint, user_id, self.config.ids_page_size);
        Cursor::new(source).into_pages().boxed()
    }

    /// Post `text` as `user_id`.
    #[instrument(skip(self, text))]
    pub async fn update_status(&self, user_id: &str, text: &str) -> Result<Value> {
        let dispatcher = self.dispatcher();
        let pin = dispatcher.tracker().pin(user_id).await?;
        let request = ApiRequest::new(STATUSES_UPDATE).param("status", text);
        let response = dispatcher.call(&request, Some(&pin)).await;
        drop(pin);
        Ok(response?.body)
    }

    /// Pool health and per-credential windows.
    pub fn pool_status(&self) -> Value {
        self.dispatcher().tracker().status()
    }

    pub fn is_pinned(&self, user_id: &str) -> bool {
        self.dispatcher().tracker().is_pinned(user_id)
    }

    fn dispatcher(&self) -> Arc<Dispatcher> {
        let mut session = self.lock();
        let dispatcher = match &mut *session {
            Session::Ready(dispatcher) => return dispatcher.clone(),
            Session::Pending(pool) => {
                let pool = std::mem::take(pool);
                info!(access_tokens = pool.len(), "starting client session");
                let tracker = Arc::new(RateLimitTracker::new(pool, self.config.tracker.clone()));
                Arc::new(Dispatcher::new(self.transport.clone(), tracker))
            }
        };
        *session = Session::Ready(dispatcher.clone());
        dispatcher
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
