#![forbid(unsafe_code)]
#![forbid(bare_trait_objects)]
//! # JSON Stream Stringify
//!
//! This library turns a graph of values into JSON text produced a piece at a
//! time, on demand, as the consumer pulls chunks.
//!
//! The main use is writing JSON documents that would not otherwise fit in RAM,
//! or whose parts only become available over time.
//!
//! ## Values
//!
//! A [`Value`] is close to what JSON can hold, with a few additions:
//! shared arrays and objects that may refer to each other or to themselves,
//! [`AsyncValue`]s that settle later, and [`Source`]s that produce either
//! the bytes of a string or the items of an array.
//!
//! ## Backpressure
//!
//! Nothing is read ahead. A source is only resumed while the consumer is
//! waiting on the stream, and is paused again as soon as it delivered.
//!
//! ## Cycles
//!
//! By default a value that contains itself is an error. With
//! [`CycleMode::Reference`] every repeated array, object or source is replaced
//! by a `{"$ref": "$[...]"}` marker naming where it was first written.
//!
//! ## Sync and Async
//!
//! [`JsonStream`] is a [`futures::Stream`] of text chunks. [`Emitter`] and
//! [`to_string`] drive it on the calling thread; [`emit_async`] copies it into
//! an [`AsyncWrite`](futures::io::AsyncWrite).

mod classify;
mod collapse;
pub mod emit;
pub mod encode;
mod engine;
mod error;
mod options;
mod path;
mod pending;
mod registry;
mod source;
mod stream;
mod value;

use futures::executor::block_on;
use futures::TryStreamExt;

pub use classify::{Replacer, ToJson};
pub use emit::{emit_async, EmitError, Emitter};
pub use error::{Diagnostic, Error};
pub use options::{CycleMode, Indent, Options, DEFAULT_CHUNK_SIZE};
pub use path::{Key, Path};
pub use pending::{AsyncValue, Rejection};
pub use source::{BoxError, Chunk, Readable, Source, SourceMode, SourceSender, SourceStatus, StreamSource};
pub use stream::{Builder, JsonStream};
pub use value::{Array, BigInt, Object, Opaque, ParseBigIntError, Value, ValueKind};

/// Stringifies `value` into one string with default [`Options`].
///
/// Async values are awaited on the calling thread.
pub fn to_string(value: impl Into<Value>) -> Result<String, Error> {
    to_string_with(value, Options::default())
}

pub fn to_string_with(value: impl Into<Value>, options: Options) -> Result<String, Error> {
    block_on(JsonStream::builder(value).options(options).build().try_collect())
}
