//! # Stream
//!
//! [`JsonStream`] is the pull side of the stringifier: every poll advances the
//! engine until a chunk is ready, the engine has to wait, or the document is
//! complete.
//!
//! ```
//! use futures::executor::block_on_stream;
//! use json_stream_stringify::{JsonStream, Object};
//!
//! let object = Object::from_iter([("a", 1), ("b", 2)]);
//! let stream = JsonStream::builder(object).indent(2).build();
//! let text: String = block_on_stream(stream).map(Result::unwrap).collect();
//! assert_eq!(text, "{\n  \"a\": 1,\n  \"b\": 2\n}");
//! ```

use std::fmt;
use std::io;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::poll_fn;
use futures::io::AsyncRead;
use futures::stream::{FusedStream, Stream, TryStreamExt};
use tracing::debug;

use crate::classify::Replacer;
use crate::engine::{DiagnosticHook, Engine, Step};
use crate::error::{Diagnostic, Error};
use crate::options::{CycleMode, Indent, Options};
use crate::value::Value;

/// A JSON document produced incrementally from a [`Value`].
///
/// Yields `Ok` chunks of text until the document is complete. A fatal error
/// is yielded once as `Err`, after which the stream ends.
pub struct JsonStream {
    engine: Engine,
    chunk_size: usize,
    finished: bool,
}

impl JsonStream {
    /// Stringifies `value` with default [`Options`].
    pub fn new(value: impl Into<Value>) -> Self {
        Self::builder(value).build()
    }

    pub fn builder(value: impl Into<Value>) -> Builder {
        Builder {
            value: value.into(),
            options: Options::default(),
            replacer: None,
            on_diagnostic: None,
        }
    }

    /// Pulls the next chunk, aiming for about `size_hint` bytes instead of the
    /// configured chunk size. The hint is passed on to external sources.
    pub async fn next_chunk(&mut self, size_hint: usize) -> Option<Result<String, Error>> {
        poll_fn(|cx| self.poll_chunk(cx, Some(size_hint))).await
    }

    /// Stops the traversal. Open sources are detached but left open, and the
    /// stream yields nothing more.
    pub fn cancel(&mut self) {
        if !self.finished {
            debug!("stream cancelled");
            self.finish();
        }
    }

    /// Non-fatal problems met so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.engine.diagnostics()
    }

    /// Whether the output may not faithfully represent the input.
    pub fn is_lossy(&self) -> bool {
        !self.engine.diagnostics().is_empty()
    }

    /// Adapts the stream into a byte reader. Errors are reported as
    /// [`io::ErrorKind::Other`] carrying the error message only; the typed
    /// [`Error`], its path and its source chain are lost. Poll the stream
    /// itself when those are needed.
    pub fn into_async_read(self) -> impl AsyncRead {
        fn into_io(err: Error) -> io::Error {
            io::Error::new(io::ErrorKind::Other, err.to_string())
        }
        self.map_err(into_io).into_async_read()
    }

    fn poll_chunk(&mut self, cx: &mut Context<'_>, size_hint: Option<usize>) -> Poll<Option<Result<String, Error>>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let target = size_hint.unwrap_or(self.chunk_size).max(1);

        loop {
            if self.engine.buffered() >= target {
                return Poll::Ready(Some(Ok(self.engine.take_output())));
            }
            match self.engine.step(cx, size_hint) {
                Poll::Ready(Ok(Step::Continue)) => {}
                Poll::Ready(Ok(Step::Done)) => {
                    let chunk = self.engine.take_output();
                    self.finish();
                    return Poll::Ready((!chunk.is_empty()).then_some(Ok(chunk)));
                }
                Poll::Ready(Err(err)) => {
                    debug!(path = %err.path(), "stringify failed: {}", err);
                    self.finish();
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Pending => {
                    if self.engine.buffered() == 0 {
                        return Poll::Pending;
                    }
                    // hand out what we have; the source waits until the next pull
                    self.engine.park();
                    return Poll::Ready(Some(Ok(self.engine.take_output())));
                }
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.engine.teardown();
    }
}

impl Stream for JsonStream {
    type Item = Result<String, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_chunk(cx, None)
    }
}

impl FusedStream for JsonStream {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

impl Drop for JsonStream {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for JsonStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonStream")
            .field("chunk_size", &self.chunk_size)
            .field("buffered", &self.engine.buffered())
            .field("finished", &self.finished)
            .finish()
    }
}

/// Configures a [`JsonStream`].
pub struct Builder {
    value: Value,
    options: Options,
    replacer: Option<Replacer>,
    on_diagnostic: Option<DiagnosticHook>,
}

impl Builder {
    pub fn replacer(mut self, replacer: Replacer) -> Self {
        self.replacer = Some(replacer);
        self
    }

    pub fn indent(mut self, indent: impl Into<Indent>) -> Self {
        self.options.indent = indent.into();
        self
    }

    pub fn cycle(mut self, mode: CycleMode) -> Self {
        self.options.cycle = mode;
        self
    }

    /// Nesting depth from which composites are written in one step, without
    /// waiting on async values or sources inside them.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = Some(depth);
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.options.chunk_size = size;
        self
    }

    /// Replaces every serializable setting at once.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Called for each [`Diagnostic`] as soon as it is raised.
    pub fn on_diagnostic(mut self, hook: impl Fn(&Diagnostic) + 'static) -> Self {
        self.on_diagnostic = Some(Rc::new(hook));
        self
    }

    pub fn build(self) -> JsonStream {
        let chunk_size = self.options.chunk_size;
        JsonStream {
            engine: Engine::new(self.value, &self.options, self.replacer, self.on_diagnostic),
            chunk_size,
            finished: false,
        }
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("value", &self.value)
            .field("options", &self.options)
            .field("replacer", &self.replacer)
            .finish_non_exhaustive()
    }
}
