use std::task::{Context, Poll};

use json_stream_stringify::*;

struct Countdown(u32);

impl Readable for Countdown {
    fn mode(&self) -> SourceMode {
        SourceMode::Items
    }

    fn status(&self) -> SourceStatus {
        if self.0 == 0 {
            SourceStatus::Ended
        } else {
            SourceStatus::Paused
        }
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn poll_read(&mut self, _: &mut Context<'_>, _: Option<usize>) -> Poll<Option<Result<Chunk, BoxError>>> {
        if self.0 == 0 {
            return Poll::Ready(None);
        }
        self.0 -= 1;
        Poll::Ready(Some(Ok(Chunk::Item(Value::from(self.0)))))
    }
}

fn main() {
    let mut out = Vec::new();
    Emitter::new(&mut out).emit(Source::new(Countdown(3))).unwrap();
    assert_eq!(out, b"[2,1,0]");
}
