//! Multi-account, rate-limit-aware API client
//!
//! Spreads calls across a pool of access tokens and hides pagination and bulk
//! batching behind lazy streams:
//! - `Cursor` walks a paged endpoint one page at a time, on demand
//! - `ChunkedFetcher` splits bulk lookups into batches of at most 100
//! - `Client` composes both over the pooled tracker, pinning a user's own
//!   credential for calls that must run as that user
//!
//! Nothing runs in the background: requests are issued only while a caller is
//! awaiting a call or pulling a stream.

pub mod chunked;
pub mod client;
pub mod cursor;
mod dispatch;
pub mod endpoints;
pub mod error;
pub mod selector;
mod sources;
#[cfg(test)]
mod testing;

pub use chunked::{BatchSource, ChunkedFetcher, DEFAULT_BATCH_SIZE};
pub use client::{Client, ClientConfig};
pub use cursor::{Cursor, Page, PageSource};
pub use error::{Error, Result};
pub use selector::{UserRef, UserSelector};
