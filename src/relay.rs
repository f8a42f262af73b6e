//! Byte-capped relay of the upstream event stream
//!
//! The upstream's SSE framing is never parsed: chunks are forwarded exactly as they arrive. The
//! wrapper only counts bytes, and once the running total passes the cap it ends the stream after
//! yielding the chunk that crossed it.
//!
//! The inner stream is dropped as soon as the relay is finished with it (cap reached, upstream
//! end, or upstream read error), which releases the upstream connection without waiting for the
//! caller to go away.

use bytes::Bytes;
use futures_util::Stream;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tracing::{debug, warn};

pub struct CappedStream<S> {
    inner: Option<S>,
    sent: usize,
    cap: usize,
}

impl<S> CappedStream<S> {
    pub fn new(inner: S, cap: usize) -> Self {
        Self {
            inner: Some(inner),
            sent: 0,
            cap,
        }
    }

    /// Bytes yielded so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Whether the upstream has been released.
    pub fn is_finished(&self) -> bool {
        self.inner.is_none()
    }
}

impl<S, E> Stream for CappedStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match ready!(Pin::new(inner).poll_next(cx)) {
            Some(Ok(chunk)) => {
                this.sent += chunk.len();
                if this.sent > this.cap {
                    debug!(
                        sent = this.sent,
                        cap = this.cap,
                        "Relay cap exceeded, closing upstream"
                    );
                    this.inner = None;
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                // Headers are already out, so there is nothing useful to tell the caller.
                warn!(error = %e, sent = this.sent, "Upstream stream failed mid-relay");
                this.inner = None;
                Poll::Ready(None)
            }
            None => {
                debug!(sent = this.sent, "Upstream stream finished");
                this.inner = None;
                Poll::Ready(None)
            }
        }
    }
}
