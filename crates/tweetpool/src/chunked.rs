//! Bulk requests split into bounded batches
//!
//! Inputs are cut into ordered batches of at most `batch_size`; each batch is
//! one remote call. Results come back as one flat lazy sequence. A batch is
//! only requested once every item of the previous batch has been pulled, and
//! the first failing batch ends the sequence.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;
use futures_util::stream;
use tracing::debug;

use crate::error::{Error, Result};

/// Upper bound the remote accepts per bulk call.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// One bulk call over a slice of inputs.
pub trait BatchSource: Send + Sync {
    type Input: Send + Sync;
    type Item: Send;

    fn fetch_batch<'a>(
        &'a self,
        batch: &'a [Self::Input],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Self::Item>>> + Send + 'a>>;
}

pub struct ChunkedFetcher<S: BatchSource> {
    source: S,
    inputs: Vec<S::Input>,
    batch_size: usize,
    offset: usize,
}

impl<S: BatchSource> ChunkedFetcher<S> {
    /// Fails with `InvalidArgument` for an empty input list or a zero batch size.
    pub fn new(source: S, inputs: Vec<S::Input>, batch_size: usize) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::InvalidArgument("bulk request needs at least one item".into()));
        }
        if batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be greater than 0".into()));
        }
        Ok(Self {
            source,
            inputs,
            batch_size,
            offset: 0,
        })
    }

    /// Total batches the inputs split into.
    pub fn batch_count(&self) -> usize {
        self.inputs.len().div_ceil(self.batch_size)
    }

    /// Results of the next batch, or `None` once every batch has been fetched
    /// or one has failed.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<S::Item>>> {
        if self.offset >= self.inputs.len() {
            return Ok(None);
        }
        let end = (self.offset + self.batch_size).min(self.inputs.len());
        debug!(
            batch = self.offset / self.batch_size + 1,
            of = self.batch_count(),
            size = end - self.offset,
            "fetching batch"
        );

        match self.source.fetch_batch(&self.inputs[self.offset..end]).await {
            Ok(items) => {
                self.offset = end;
                Ok(Some(items))
            }
            Err(e) => {
                self.offset = self.inputs.len();
                Err(e)
            }
        }
    }

    /// Flat lazy sequence over every batch's results, in input order.
    pub fn into_stream(self) -> impl Stream<Item = Result<S::Item>> + Send {
        stream::try_unfold((self, VecDeque::new()), |(mut fetcher, mut buffer)| async move {
            loop {
                if let Some(item) = buffer.pop_front() {
                    return Ok(Some((item, (fetcher, buffer))));
                }
                match fetcher.next_batch().await? {
                    Some(items) => buffer.extend(items),
                    None => return Ok(None),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{StreamExt, TryStreamExt};
    use std::sync::{Arc, Mutex};

    /// Echoes every input back and records each batch it was asked for.
    #[derive(Clone, Default)]
    struct Echo {
        batches: Arc<Mutex<Vec<Vec<u32>>>>,
        fail_on_batch: Option<usize>,
    }

    impl BatchSource for Echo {
        type Input = u32;
        type Item = u32;

        fn fetch_batch<'a>(
            &'a self,
            batch: &'a [u32],
        ) -> Pin<Box<dyn Future<Output = Result<Vec<u32>>> + Send + 'a>> {
            Box::pin(async move {
                let index = {
                    let mut batches = self.batches.lock().unwrap();
                    batches.push(batch.to_vec());
                    batches.len() - 1
                };
                if self.fail_on_batch == Some(index) {
                    return Err(Error::Transport {
                        status: 500,
                        body: "internal error".into(),
                    });
                }
                Ok(batch.to_vec())
            })
        }
    }

    #[tokio::test]
    async fn splits_250_into_100_100_50() {
        let source = Echo::default();
        let inputs: Vec<u32> = (0..250).collect();
        let fetcher = ChunkedFetcher::new(source.clone(), inputs.clone(), DEFAULT_BATCH_SIZE).unwrap();
        assert_eq!(fetcher.batch_count(), 3);

        let results: Vec<u32> = fetcher.into_stream().try_collect().await.unwrap();

        assert_eq!(results, inputs);
        let batches = source.batches.lock().unwrap();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(batches.concat(), inputs);
    }

    #[tokio::test]
    async fn early_stop_skips_later_batches() {
        let source = Echo::default();
        let fetcher = ChunkedFetcher::new(source.clone(), (0..250).collect(), 100).unwrap();

        let first: Vec<u32> = fetcher.into_stream().take(10).try_collect().await.unwrap();

        assert_eq!(first, (0..10).collect::<Vec<_>>());
        assert_eq!(source.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_batch_ends_sequence_after_earlier_results() {
        let source = Echo {
            fail_on_batch: Some(1),
            ..Echo::default()
        };
        let fetcher = ChunkedFetcher::new(source.clone(), (0..30).collect(), 10).unwrap();

        let results: Vec<Result<u32>> = fetcher.into_stream().collect().await;

        assert_eq!(results.len(), 11);
        assert!(results[..10].iter().all(Result::is_ok));
        assert!(matches!(results[10], Err(Error::Transport { status: 500, .. })));
        assert_eq!(source.batches.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn next_batch_returns_none_after_failure() {
        let source = Echo {
            fail_on_batch: Some(0),
            ..Echo::default()
        };
        let mut fetcher = ChunkedFetcher::new(source, vec![1, 2, 3], 2).unwrap();
        assert!(fetcher.next_batch().await.is_err());
        assert!(fetcher.next_batch().await.unwrap().is_none());
    }

    #[test]
    fn empty_input_is_invalid() {
        let err = ChunkedFetcher::new(Echo::default(), Vec::new(), 100).err().unwrap();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn zero_batch_size_is_invalid() {
        let err = ChunkedFetcher::new(Echo::default(), vec![1], 0).err().unwrap();
        assert!(err.to_string().contains("batch size"));
    }

    #[test]
    fn exact_multiple_has_no_trailing_batch() {
        let fetcher = ChunkedFetcher::new(Echo::default(), (0..200).collect(), 100).unwrap();
        assert_eq!(fetcher.batch_count(), 2);
    }
}
