//! # Source
//!
//! External sources feed data into the document while it is being written.
//!
//! A source in [`SourceMode::Bytes`] is written as one JSON string holding the
//! concatenation of everything it produces. A source in [`SourceMode::Items`] is
//! written as an array, each item serialized as a full value (it may itself be an
//! object, a pending value or another source).
//!
//! The engine keeps a source paused unless it is waiting on it for data, so a
//! source that honours [`Readable::pause`] never gets ahead of the consumer.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::channel::mpsc;
use futures::stream::LocalBoxStream;
use futures::{SinkExt, Stream, StreamExt};

use crate::encode;
use crate::value::{Value, ValueKind};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceMode {
    /// Bytes or text, concatenated into one string.
    Bytes,
    /// Arbitrary values, written as array elements.
    Items,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceStatus {
    Paused,
    /// Producing data whether or not anyone reads it.
    Flowing,
    Ended,
}

/// One unit of data read from a source.
#[derive(Debug)]
pub enum Chunk {
    Bytes(Bytes),
    Text(String),
    Item(Value),
}

impl From<Bytes> for Chunk {
    fn from(b: Bytes) -> Self {
        Chunk::Bytes(b)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(b: Vec<u8>) -> Self {
        Chunk::Bytes(Bytes::from(b))
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Chunk::Text(s)
    }
}

impl From<&'static str> for Chunk {
    fn from(s: &'static str) -> Self {
        Chunk::Text(s.to_owned())
    }
}

impl From<Value> for Chunk {
    fn from(v: Value) -> Self {
        Chunk::Item(v)
    }
}

/// A pull-readable external source.
///
/// `poll_read` follows the usual `Stream` contract: `Ready(None)` means the
/// source has ended, `Pending` means the waker in `cx` will be called once
/// data is available.
pub trait Readable {
    fn mode(&self) -> SourceMode;

    fn status(&self) -> SourceStatus;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Reads the next chunk. `size_hint` is the amount of output the consumer
    /// asked for, if it said.
    fn poll_read(
        &mut self,
        cx: &mut Context<'_>,
        size_hint: Option<usize>,
    ) -> Poll<Option<Result<Chunk, BoxError>>>;

    /// Drops any waker or listener the engine left behind. Must not close the
    /// source.
    fn detach(&mut self) {}
}

/// A shared handle to a [`Readable`], storable in a [`Value`].
#[derive(Clone)]
pub struct Source(Rc<RefCell<dyn Readable>>);

impl Source {
    pub fn new<R: Readable + 'static>(readable: R) -> Self {
        Source(Rc::new(RefCell::new(readable)))
    }

    /// A source fed through a bounded channel. Sends wait while `capacity`
    /// chunks are buffered and unread; dropping the sender ends the source.
    pub fn channel(mode: SourceMode, capacity: usize) -> (SourceSender, Source) {
        let (tx, rx) = mpsc::channel(capacity);
        let source = Source::new(StreamSource::new(mode, rx.boxed_local()));
        (SourceSender(tx), source)
    }

    pub fn mode(&self) -> SourceMode {
        self.0.borrow().mode()
    }

    pub fn status(&self) -> SourceStatus {
        self.0.borrow().status()
    }

    pub fn ptr_eq(&self, other: &Source) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn kind(&self) -> ValueKind {
        match self.mode() {
            SourceMode::Bytes => ValueKind::ByteSource,
            SourceMode::Items => ValueKind::ItemSource,
        }
    }

    pub(crate) fn pause(&self) {
        self.0.borrow_mut().pause();
    }

    pub(crate) fn detach(&self) {
        self.0.borrow_mut().detach();
    }

    /// Resumes the source for exactly one read and pauses it again as soon as
    /// that read produced something.
    pub(crate) fn poll_drain(
        &self,
        cx: &mut Context<'_>,
        size_hint: Option<usize>,
    ) -> Poll<Option<Result<Chunk, BoxError>>> {
        let mut readable = self.0.borrow_mut();
        readable.resume();
        let polled = readable.poll_read(cx, size_hint);
        if polled.is_ready() {
            readable.pause();
        }
        polled
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<dyn Readable>> {
        Rc::downgrade(&self.0)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("mode", &self.mode())
            .field("status", &self.status())
            .finish()
    }
}

/// The producing half of [`Source::channel`].
#[derive(Clone)]
pub struct SourceSender(mpsc::Sender<Result<Chunk, BoxError>>);

impl SourceSender {
    pub async fn send(&mut self, chunk: impl Into<Chunk>) -> Result<(), mpsc::SendError> {
        self.0.send(Ok(chunk.into())).await
    }

    /// Fails the source; the serialization reading it ends with that error.
    pub async fn fail(&mut self, error: impl Into<BoxError>) -> Result<(), mpsc::SendError> {
        self.0.send(Err(error.into())).await
    }
}

/// Adapts a [`Stream`] to [`Readable`].
///
/// Streams only make progress when polled, so pausing just records the state.
pub struct StreamSource {
    stream: LocalBoxStream<'static, Result<Chunk, BoxError>>,
    mode: SourceMode,
    status: SourceStatus,
}

impl StreamSource {
    pub fn new(mode: SourceMode, stream: LocalBoxStream<'static, Result<Chunk, BoxError>>) -> Self {
        Self {
            stream,
            mode,
            status: SourceStatus::Paused,
        }
    }

    pub fn items<S, V, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<V, E>> + 'static,
        V: Into<Value>,
        E: Into<BoxError>,
    {
        let stream = stream.map(|item| item.map(|v| Chunk::Item(v.into())).map_err(Into::into));
        Self::new(SourceMode::Items, stream.boxed_local())
    }

    pub fn bytes<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + 'static,
        B: Into<Bytes>,
        E: Into<BoxError>,
    {
        let stream = stream.map(|item| item.map(|b| Chunk::Bytes(b.into())).map_err(Into::into));
        Self::new(SourceMode::Bytes, stream.boxed_local())
    }
}

impl Readable for StreamSource {
    fn mode(&self) -> SourceMode {
        self.mode
    }

    fn status(&self) -> SourceStatus {
        self.status
    }

    fn pause(&mut self) {
        if self.status != SourceStatus::Ended {
            self.status = SourceStatus::Paused;
        }
    }

    fn resume(&mut self) {
        if self.status != SourceStatus::Ended {
            self.status = SourceStatus::Flowing;
        }
    }

    fn poll_read(
        &mut self,
        cx: &mut Context<'_>,
        _size_hint: Option<usize>,
    ) -> Poll<Option<Result<Chunk, BoxError>>> {
        if self.status == SourceStatus::Ended {
            return Poll::Ready(None);
        }
        let polled = self.stream.poll_next_unpin(cx);
        if let Poll::Ready(None) = polled {
            self.status = SourceStatus::Ended;
        }
        polled
    }
}

const REPLACEMENT: &str = "\u{fffd}";

/// Decodes UTF-8 split arbitrarily across chunks, escaping as it goes.
/// Invalid sequences become U+FFFD.
#[derive(Default)]
pub(crate) struct Utf8Carry {
    partial: Vec<u8>,
}

impl Utf8Carry {
    pub(crate) fn decode_into(&mut self, bytes: &[u8], out: &mut String) {
        let joined;
        let mut rest = if self.partial.is_empty() {
            bytes
        } else {
            self.partial.extend_from_slice(bytes);
            joined = std::mem::take(&mut self.partial);
            &joined[..]
        };

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    encode::escape_into(text, out);
                    return;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    // valid_up_to guarantees this prefix is UTF-8
                    if let Ok(text) = std::str::from_utf8(valid) {
                        encode::escape_into(text, out);
                    }
                    match err.error_len() {
                        Some(bad) => {
                            encode::escape_into(REPLACEMENT, out);
                            rest = &tail[bad..];
                        }
                        None => {
                            self.partial = tail.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flushes a trailing incomplete sequence.
    pub(crate) fn finish_into(&mut self, out: &mut String) {
        if !self.partial.is_empty() {
            self.partial.clear();
            encode::escape_into(REPLACEMENT, out);
        }
    }
}
