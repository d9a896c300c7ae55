//! Progress-tracking stream wrapper for upload bodies.

use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Minimum percentage advance between two progress observations
pub const PROGRESS_STEP_PERCENT: f64 = 2.0;

/// Observation emitted by [`ProgressStream`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    Advanced {
        transferred: u64,
        total: u64,
        percent: f64,
    },
    Completed {
        transferred: u64,
    },
}

/// Callback for progress observations
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Stream wrapper that counts bytes passing through and reports progress.
///
/// Chunks are forwarded as soon as the inner stream yields them. A `total` of
/// zero means the length is unknown and only completion is reported.
pub struct ProgressStream<S> {
    inner: S,
    total: u64,
    bytes_transferred: u64,
    last_percent: f64,
    completed: bool,
    callback: ProgressCallback,
}

impl<S> ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>>,
{
    /// Create a new progress stream over a body of `total` bytes
    pub fn new(inner: S, total: u64, callback: ProgressCallback) -> Self {
        Self {
            inner,
            total,
            bytes_transferred: 0,
            last_percent: 0.0,
            completed: false,
            callback,
        }
    }

    /// Get total bytes transferred
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    fn record(&mut self, chunk_size: u64) {
        self.bytes_transferred += chunk_size;

        if self.total == 0 {
            return;
        }

        let percent = (self.bytes_transferred as f64 / self.total as f64) * 100.0;
        if percent - self.last_percent > PROGRESS_STEP_PERCENT {
            self.last_percent = percent;
            (self.callback)(ProgressEvent::Advanced {
                transferred: self.bytes_transferred,
                total: self.total,
                percent: percent.min(100.0),
            });
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Unpin,
{
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let inner = Pin::new(&mut self.inner);

        match inner.poll_next(cx) {
            Poll::Ready(Some(Ok(bytes))) => {
                self.record(bytes.len() as u64);
                Poll::Ready(Some(Ok(bytes)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => {
                if !self.completed {
                    self.completed = true;
                    (self.callback)(ProgressEvent::Completed {
                        transferred: self.bytes_transferred,
                    });
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
