//! Positional pairing of two independently timed producers.
//!
//! The Nth item of the left producer is combined only with the Nth item of
//! the right producer. Whichever side runs ahead has its items held in its
//! own buffer until the other side catches up; nothing is dropped or
//! coalesced. The first `Err` from either side ends the pairing.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};

struct PairingBuffer<T, E> {
    stream: BoxStream<'static, Result<T, E>>,
    buffer: VecDeque<T>,
    done: bool,
}

impl<T, E> PairingBuffer<T, E> {
    fn new(stream: BoxStream<'static, Result<T, E>>) -> Self {
        Self {
            stream,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Pull at most one item from the producer into the buffer.
    fn pull(&mut self, cx: &mut Context<'_>) -> Result<(), E> {
        if self.done {
            return Ok(());
        }
        match self.stream.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(item))) => self.buffer.push_back(item),
            Poll::Ready(Some(Err(err))) => {
                self.done = true;
                return Err(err);
            }
            Poll::Ready(None) => self.done = true,
            Poll::Pending => {}
        }
        Ok(())
    }

    fn exhausted(&self) -> bool {
        self.done && self.buffer.is_empty()
    }
}

/// Zip of two fallible producers with explicit per-side buffers.
pub struct PairedStream<A, B, E> {
    left: PairingBuffer<A, E>,
    right: PairingBuffer<B, E>,
    finished: bool,
}

impl<A, B, E> PairedStream<A, B, E> {
    /// Pair `left` with `right` positionally.
    pub fn new(
        left: BoxStream<'static, Result<A, E>>,
        right: BoxStream<'static, Result<B, E>>,
    ) -> Self {
        Self {
            left: PairingBuffer::new(left),
            right: PairingBuffer::new(right),
            finished: false,
        }
    }

    /// Items held back on each side, waiting for a partner.
    pub fn pending_counts(&self) -> (usize, usize) {
        (self.left.buffer.len(), self.right.buffer.len())
    }

    fn fail(&mut self, err: E) -> Poll<Option<Result<(A, B), E>>> {
        self.finished = true;
        Poll::Ready(Some(Err(err)))
    }
}

impl<A, B, E> Stream for PairedStream<A, B, E> {
    type Item = Result<(A, B), E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        if let Err(err) = this.left.pull(cx) {
            return this.fail(err);
        }
        if let Err(err) = this.right.pull(cx) {
            return this.fail(err);
        }

        if !this.left.buffer.is_empty() && !this.right.buffer.is_empty() {
            if let (Some(a), Some(b)) = (this.left.buffer.pop_front(), this.right.buffer.pop_front())
            {
                return Poll::Ready(Some(Ok((a, b))));
            }
        }

        if this.left.exhausted() || this.right.exhausted() {
            this.finished = true;
            return Poll::Ready(None);
        }

        // The empty side returned Pending above and registered the waker.
        Poll::Pending
    }
}

impl<A, B, E> Unpin for PairedStream<A, B, E> {}
