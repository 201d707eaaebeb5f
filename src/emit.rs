use std::io::{self, Write};

use futures::executor::block_on_stream;
use futures::io::{AsyncWrite, AsyncWriteExt};
use futures::StreamExt;
use thiserror::Error;

use crate::error::Error;
use crate::stream::JsonStream;
use crate::value::Value;

/// Failure while writing a document to a destination.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error(transparent)]
    Json(#[from] Error),
    #[error("failed to write output")]
    Io(#[from] io::Error),
}

/// Writes whole documents to an [`io::Write`], blocking the calling thread.
///
/// Consecutive documents are separated by a newline. A document with no
/// text, such as an absent root, writes nothing at all.
///
/// Async values inside the document are driven by a local executor, so they
/// must not depend on a runtime such as tokio's. Use [`emit_async`] from
/// within a runtime.
pub struct Emitter<W: Write> {
    dst: W,
    started: bool,
}

impl<W: Write> Emitter<W> {
    /// Constructs a new Emitter that will write to the provided Write.
    pub fn new(dst: W) -> Self {
        Self { dst, started: false }
    }

    pub fn emit(&mut self, value: impl Into<Value>) -> Result<(), EmitError> {
        self.emit_stream(JsonStream::new(value))
    }

    /// Writes every chunk of `stream`. Chunks already written stay written if
    /// the stream fails part way.
    pub fn emit_stream(&mut self, stream: JsonStream) -> Result<(), EmitError> {
        let mut first = true;
        for chunk in block_on_stream(stream) {
            let chunk = chunk?;
            if first && self.started {
                self.dst.write_all(b"\n")?;
            }
            first = false;
            self.started = true;
            self.dst.write_all(chunk.as_bytes())?;
        }
        self.dst.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.dst
    }

    pub fn into_inner(self) -> W {
        self.dst
    }
}

/// Copies every chunk of `stream` into `dst`, then flushes it.
pub async fn emit_async<W>(mut stream: JsonStream, dst: &mut W) -> Result<(), EmitError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(chunk) = stream.next().await {
        dst.write_all(chunk?.as_bytes()).await?;
    }
    dst.flush().await?;
    Ok(())
}
