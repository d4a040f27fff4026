//! One writable sink in front of many consumers.
//!
//! [`FanOut`] is a [`Sink`] of [`Bytes`] chunks that forwards every chunk to
//! each of its consumers. It is only ready for the next chunk once *every*
//! live consumer reports its own readiness, so the source is never read
//! further ahead than the slowest consumer allows, and no consumer can see
//! chunk `n + 1` before all of them have accepted chunk `n`.
//!
//! A consumer that fails is set aside with its error and the others carry on;
//! the sink itself only fails once there is nobody left to write to.
//! Failures are handed back via [`FanOut::into_failures`].

use bytes::Bytes;
use futures::Sink;
use std::fmt::Display;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

enum Slot<S, E> {
    Open(S),
    Closed,
    Failed(E),
}

pub struct FanOut<S: Sink<Bytes>> {
    slots: Vec<Slot<S, S::Error>>,
}

// Consumers are only ever pinned through `Pin::new`, which needs `S: Unpin`
// anyway; nothing in the fan-out itself is structurally pinned.
impl<S: Sink<Bytes>> Unpin for FanOut<S> {}

impl<S> FanOut<S>
where
    S: Sink<Bytes> + Unpin,
    S::Error: Display,
{
    /// An empty set of consumers makes a sink that accepts and discards
    /// everything.
    pub fn new(consumers: impl IntoIterator<Item = S>) -> Self {
        Self { slots: consumers.into_iter().map(Slot::Open).collect() }
    }

    /// Total number of consumers, failed or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of consumers that haven't failed.
    pub fn healthy(&self) -> usize {
        self.slots.iter().filter(|slot| !matches!(slot, Slot::Failed(_))).count()
    }

    /// The consumers that failed, by their position in the original list.
    pub fn into_failures(self) -> Vec<(usize, S::Error)> {
        self.slots
            .into_iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Failed(err) => Some((index, err)),
                _ => None,
            })
            .collect()
    }

    fn fail(&mut self, index: usize, err: S::Error) {
        tracing::warn!(consumer = index, error = %err, "Fan-out consumer failed; continuing without it");
        self.slots[index] = Slot::Failed(err);
    }

    fn status(&self) -> io::Result<()> {
        if !self.slots.is_empty() && self.healthy() == 0 {
            return Err(io::Error::other("every fan-out consumer has failed"));
        }
        Ok(())
    }

    /// Poll every open consumer (even once one of them is pending, so that
    /// they all register for wake-ups) and only report ready once all are.
    fn poll_each<F>(&mut self, cx: &mut Context<'_>, mut poll: F) -> Poll<io::Result<()>>
    where
        F: FnMut(Pin<&mut S>, &mut Context<'_>) -> Poll<Result<(), S::Error>>,
    {
        let mut pending = false;
        for index in 0..self.slots.len() {
            let Slot::Open(sink) = &mut self.slots[index] else {
                continue;
            };
            match poll(Pin::new(sink), cx) {
                Poll::Ready(Ok(())) => {},
                Poll::Ready(Err(err)) => self.fail(index, err),
                Poll::Pending => pending = true,
            }
        }
        if pending {
            return Poll::Pending;
        }
        Poll::Ready(self.status())
    }
}

impl<S> Sink<Bytes> for FanOut<S>
where
    S: Sink<Bytes> + Unpin,
    S::Error: Display,
{
    type Error = io::Error;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().poll_each(cx, |sink, cx| sink.poll_ready(cx))
    }

    fn start_send(self: Pin<&mut Self>, chunk: Bytes) -> io::Result<()> {
        let this = self.get_mut();
        for index in 0..this.slots.len() {
            let Slot::Open(sink) = &mut this.slots[index] else {
                continue;
            };
            // Cloning `Bytes` is a reference count bump, not a copy.
            if let Err(err) = Pin::new(sink).start_send(chunk.clone()) {
                this.fail(index, err);
            }
        }
        this.status()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().poll_each(cx, |sink, cx| sink.poll_flush(cx))
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let mut pending = false;
        for index in 0..this.slots.len() {
            let Slot::Open(sink) = &mut this.slots[index] else {
                continue;
            };
            // Drain before ending: some sinks (channels, for one) close
            // without waiting for what was sent before.
            let polled = match Pin::new(&mut *sink).poll_flush(cx) {
                Poll::Ready(Ok(())) => Pin::new(sink).poll_close(cx),
                other => other,
            };
            match polled {
                Poll::Ready(Ok(())) => this.slots[index] = Slot::Closed,
                Poll::Ready(Err(err)) => this.fail(index, err),
                Poll::Pending => pending = true,
            }
        }
        if pending {
            return Poll::Pending;
        }
        Poll::Ready(this.status())
    }
}
