//! Lazy pagination over one paged remote operation
//!
//! A `Cursor` owns a `PageSource` and the continuation state between pages.
//! Pages are fetched strictly one at a time and only when the consumer pulls.
//! The sequence ends when the server stops returning a continuation token, when
//! a page comes back shorter than the requested page size, or when a fetch
//! fails. An ended cursor stays ended; start over with a new cursor.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;
use futures_util::stream;
use tracing::debug;

use crate::error::Result;

/// One page as returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token for the following page. `None` or empty ends the sequence.
    pub next: Option<String>,
}

/// A single-page fetch with fixed parameters.
pub trait PageSource: Send + Sync {
    type Item: Send;

    /// Fetch the page at `token`, or the first page when `token` is `None`.
    fn fetch<'a>(
        &'a self,
        token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<Page<Self::Item>>> + Send + 'a>>;

    /// Requested page size. A shorter page is treated as the last one.
    fn page_size(&self) -> Option<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Start,
    Next(String),
    Done,
}

pub struct Cursor<S: PageSource> {
    source: S,
    phase: Phase,
    buffer: VecDeque<S::Item>,
    yielded: usize,
    max_items: Option<usize>,
    pages_fetched: usize,
}

impl<S: PageSource> Cursor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            phase: Phase::Start,
            buffer: VecDeque::new(),
            yielded: 0,
            max_items: None,
            pages_fetched: 0,
        }
    }

    /// Items handed out by `next_item` so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// True once no further page will be requested and nothing is buffered.
    pub fn is_exhausted(&self) -> bool {
        self.phase == Phase::Done && self.buffer.is_empty()
    }

    /// Next page of items. Items left over from a page partly consumed through
    /// `next_item` come back first as their own page.
    pub async fn next_page(&mut self) -> Result<Option<Vec<S::Item>>> {
        if !self.buffer.is_empty() {
            return Ok(Some(self.buffer.drain(..).collect()));
        }

        let token = match &self.phase {
            Phase::Done => return Ok(None),
            Phase::Start => None,
            Phase::Next(token) => Some(token.clone()),
        };

        let page = match self.source.fetch(token.as_deref()).await {
            Ok(page) => page,
            Err(e) => {
                self.phase = Phase::Done;
                return Err(e);
            }
        };
        self.pages_fetched += 1;

        let short = self
            .source
            .page_size()
            .is_some_and(|size| page.items.len() < size);
        self.phase = match page.next {
            Some(next) if !next.is_empty() && !short => Phase::Next(next),
            _ => Phase::Done,
        };
        debug!(
            page = self.pages_fetched,
            items = page.items.len(),
            last = self.phase == Phase::Done,
            "page fetched"
        );

        if page.items.is_empty() {
            self.phase = Phase::Done;
            return Ok(None);
        }
        Ok(Some(page.items))
    }

    /// Next single item, honoring the cap set by `items`.
    pub async fn next_item(&mut self) -> Result<Option<S::Item>> {
        if self.max_items.is_some_and(|max| self.yielded >= max) {
            return Ok(None);
        }
        if self.buffer.is_empty() {
            match self.next_page().await? {
                Some(items) => self.buffer.extend(items),
                None => return Ok(None),
            }
        }
        let item = self.buffer.pop_front();
        if item.is_some() {
            self.yielded += 1;
        }
        Ok(item)
    }

    /// Lazy sequence of at most `limit` further items, or all remaining items
    /// when `limit` is `None`.
    pub fn items(&mut self, limit: Option<usize>) -> impl Stream<Item = Result<S::Item>> + Send + '_ {
        self.max_items = limit.map(|n| self.yielded.saturating_add(n));
        stream::try_unfold(self, |cursor| async move {
            let item = cursor.next_item().await?;
            Ok(item.map(|item| (item, cursor)))
        })
    }

    /// Lazy sequence of raw pages.
    pub fn pages(&mut self) -> impl Stream<Item = Result<Vec<S::Item>>> + Send + '_ {
        stream::try_unfold(self, |cursor| async move {
            let page = cursor.next_page().await?;
            Ok(page.map(|page| (page, cursor)))
        })
    }

    /// Owning form of `items`, for returning from an operation.
    pub fn into_items(mut self, limit: Option<usize>) -> impl Stream<Item = Result<S::Item>> + Send {
        self.max_items = limit.map(|n| self.yielded.saturating_add(n));
        stream::try_unfold(self, |mut cursor| async move {
            let item = cursor.next_item().await?;
            Ok(item.map(|item| (item, cursor)))
        })
    }

    /// Owning form of `pages`.
    pub fn into_pages(self) -> impl Stream<Item = Result<Vec<S::Item>>> + Send {
        stream::try_unfold(self, |mut cursor| async move {
            let page = cursor.next_page().await?;
            Ok(page.map(|page| (page, cursor)))
        })
    }
}
