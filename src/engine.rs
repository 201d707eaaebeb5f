//! # Engine
//!
//! The traversal state machine behind [`JsonStream`](crate::JsonStream).
//!
//! Nesting is kept on an explicit stack of frames rather than the call stack,
//! so arbitrarily deep documents never recurse. Only the top frame is active;
//! each [`Engine::step`] advances it by one member, one element or one read,
//! appending text to an internal buffer. A frame is popped as soon as its
//! value is complete, so siblings are always written strictly in order.
//!
//! The index-0 frame is the root sentinel. Popping back to it ends the
//! document.
//!
//! Object members are written lazily: when a member is picked, only a pending
//! prefix (separator, indentation, key) is recorded. The prefix is flushed by
//! the first text its value writes, so members whose value turns out to be
//! absent, possibly only after an async value settles, leave no trace.

use std::mem;
use std::rc::Rc;
use std::task::{Context, Poll};

use tracing::{debug, trace, warn};

use crate::classify::{classify, Classified, Replacer};
use crate::collapse::Collapse;
use crate::encode;
use crate::error::{Diagnostic, Error};
use crate::options::Options;
use crate::path::{Key, Path};
use crate::pending::AsyncValue;
use crate::registry::{Identity, Registry, Visit};
use crate::source::{BoxError, Chunk, Source, SourceStatus, Utf8Carry};
use crate::value::{Array, Object, Value};

pub(crate) type DiagnosticHook = Rc<dyn Fn(&Diagnostic)>;

pub(crate) enum Step {
    Continue,
    Done,
}

struct Frame {
    kind: FrameKind,
    depth: usize,
    /// Indentation of this frame's members.
    indent: String,
    /// How the parent reached this frame; `None` for the document root.
    key: Option<Key>,
    /// Registry entry to release on pop.
    tracked: Option<usize>,
}

enum FrameKind {
    Root {
        value: Option<Value>,
    },
    Array {
        array: Array,
        next: usize,
        len: usize,
    },
    Object {
        object: Object,
        next: usize,
        len: usize,
        written: bool,
    },
    /// Stands in for a value that has not settled; replaced by it once it has.
    Await {
        value: AsyncValue,
        key: Key,
        container: Value,
    },
    Bytes {
        source: Source,
        carry: Utf8Carry,
    },
    Items {
        source: Source,
        next: usize,
    },
}

/// An object member whose key has not been written yet.
struct Member {
    frame: usize,
    key: Rc<str>,
}

pub(crate) struct Engine {
    stack: Vec<Frame>,
    registry: Registry,
    replacer: Option<Replacer>,
    unit: Option<String>,
    max_depth: Option<usize>,
    member: Option<Member>,
    out: String,
    diagnostics: Vec<Diagnostic>,
    on_diagnostic: Option<DiagnosticHook>,
}

fn path_of(stack: &[Frame], key: Option<&Key>) -> Path {
    stack
        .iter()
        .filter_map(|frame| frame.key.clone())
        .chain(key.cloned())
        .collect()
}

impl Engine {
    pub(crate) fn new(
        value: Value,
        options: &Options,
        replacer: Option<Replacer>,
        on_diagnostic: Option<DiagnosticHook>,
    ) -> Self {
        let root = Frame {
            kind: FrameKind::Root { value: Some(value) },
            depth: 0,
            indent: String::new(),
            key: None,
            tracked: None,
        };
        Self {
            stack: vec![root],
            registry: Registry::new(options.cycle),
            replacer,
            unit: options.indent.unit(),
            max_depth: options.max_depth,
            member: None,
            out: String::new(),
            diagnostics: Vec::new(),
            on_diagnostic,
        }
    }

    pub(crate) fn buffered(&self) -> usize {
        self.out.len()
    }

    pub(crate) fn take_output(&mut self) -> String {
        mem::take(&mut self.out)
    }

    pub(crate) fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Advances the top frame by one unit of work.
    ///
    /// `Pending` means the top frame waits on an async value or a source and
    /// the waker in `cx` has been registered with it.
    pub(crate) fn step(
        &mut self,
        cx: &mut Context<'_>,
        size_hint: Option<usize>,
    ) -> Poll<Result<Step, Error>> {
        let Some(top) = self.stack.len().checked_sub(1) else {
            return Poll::Ready(Ok(Step::Done));
        };

        let result = match &mut self.stack[top].kind {
            FrameKind::Root { value } => match value.take() {
                Some(value) => {
                    let container = Value::Object(Object::from_iter([("", value.clone())]));
                    self.visit(value, Key::root(), &container)
                }
                None => return Poll::Ready(Ok(Step::Done)),
            },

            FrameKind::Array { array, next, len } => {
                if *next >= *len {
                    self.close();
                    Ok(())
                } else {
                    let index = *next;
                    *next += 1;
                    let element = array.get(index).unwrap_or_default();
                    let container = Value::Array(array.clone());
                    self.separator(top, index);
                    self.visit(element, Key::Index(index), &container)
                }
            }

            FrameKind::Object {
                object, next, len, ..
            } => {
                if *next >= *len {
                    self.close();
                    Ok(())
                } else {
                    let at = *next;
                    *next += 1;
                    let container = Value::Object(object.clone());
                    match object.entry(at) {
                        Some((name, value)) if self.includes(&name) => {
                            self.member = Some(Member {
                                frame: top,
                                key: name.clone(),
                            });
                            self.visit(value, Key::Name(name), &container)
                        }
                        _ => Ok(()),
                    }
                }
            }

            FrameKind::Await { value, .. } => match value.poll_settle(cx) {
                Poll::Pending => {
                    debug!(depth = top, "waiting for async value");
                    return Poll::Pending;
                }
                Poll::Ready(Ok(settled)) => match self.stack.pop() {
                    Some(Frame {
                        kind: FrameKind::Await { key, container, .. },
                        ..
                    }) => self.visit(settled, key, &container),
                    _ => Ok(()),
                },
                Poll::Ready(Err(reason)) => Err(Error::Rejected {
                    path: path_of(&self.stack, None),
                    reason,
                }),
            },

            FrameKind::Bytes { source, .. } => {
                let source = source.clone();
                match source.poll_drain(cx, size_hint) {
                    Poll::Pending => {
                        debug!(depth = top, "waiting for byte source");
                        return Poll::Pending;
                    }
                    Poll::Ready(Some(Ok(chunk))) => self.bytes(top, &source, chunk),
                    Poll::Ready(Some(Err(err))) => Err(self.source_error(&source, err)),
                    Poll::Ready(None) => {
                        self.close();
                        Ok(())
                    }
                }
            }

            FrameKind::Items { source, next } => {
                let index = *next;
                let source = source.clone();
                match source.poll_drain(cx, size_hint) {
                    Poll::Pending => {
                        debug!(depth = top, "waiting for item source");
                        return Poll::Pending;
                    }
                    Poll::Ready(Some(Ok(chunk))) => {
                        if let FrameKind::Items { next, .. } = &mut self.stack[top].kind {
                            *next += 1;
                        }
                        let item = match chunk {
                            Chunk::Item(value) => value,
                            Chunk::Text(text) => Value::from(text),
                            Chunk::Bytes(bytes) => Value::from(String::from_utf8_lossy(&bytes).into_owned()),
                        };
                        self.separator(top, index);
                        self.visit(item, Key::Index(index), &Value::Source(source))
                    }
                    Poll::Ready(Some(Err(err))) => Err(self.source_error(&source, err)),
                    Poll::Ready(None) => {
                        self.close();
                        Ok(())
                    }
                }
            }
        };

        Poll::Ready(result.map(|()| Step::Continue))
    }

    /// Pauses the source being drained, if any, while the engine is not
    /// waiting on it.
    pub(crate) fn park(&mut self) {
        if let Some(Frame {
            kind: FrameKind::Bytes { source, .. } | FrameKind::Items { source, .. },
            ..
        }) = self.stack.last()
        {
            source.pause();
        }
    }

    /// Drops every open frame and all buffered output. Open sources are paused
    /// and detached, never closed.
    pub(crate) fn teardown(&mut self) {
        while let Some(frame) = self.stack.pop() {
            if let FrameKind::Bytes { source, .. } | FrameKind::Items { source, .. } = &frame.kind {
                source.pause();
                source.detach();
            }
        }
        self.registry.clear();
        self.member = None;
        self.out.clear();
        trace!("engine torn down");
    }

    fn includes(&self, name: &str) -> bool {
        self.replacer.as_ref().map_or(true, |r| r.includes(name))
    }

    fn visit(&mut self, value: Value, key: Key, container: &Value) -> Result<(), Error> {
        let classified = classify(value, &key, container, self.replacer.as_ref());
        let (at_root, depth) = match self.stack.last() {
            Some(frame) => (matches!(frame.kind, FrameKind::Root { .. }), frame.depth + 1),
            None => (true, 1),
        };
        let segment = if at_root { None } else { Some(key.clone()) };

        let classified = match classified {
            Classified::Primitive(value) => return self.primitive(value, &key, at_root, segment),
            Classified::Async(value) => {
                let container = container.clone();
                self.push(FrameKind::Await { value, key, container }, depth - 1, segment, None);
                return Ok(());
            }
            composite => composite,
        };

        let Some(identity) = Identity::of(&classified) else {
            return Ok(());
        };
        let addr = identity.addr;
        let stack = &self.stack;
        match self.registry.enter(identity, || path_of(stack, segment.as_ref())) {
            Visit::First => {}
            Visit::Circular => {
                return Err(Error::CircularStructure {
                    kind: classified.kind(),
                    identity: addr,
                    path: path_of(&self.stack, segment.as_ref()),
                })
            }
            Visit::Repeated(first) => {
                trace!(path = %first, "writing reference");
                self.write(&first.reference_marker());
                return Ok(());
            }
        }

        if let Some(max) = self.max_depth {
            if depth >= max && matches!(classified, Classified::Array(_) | Classified::Object(_)) {
                let result = self.collapse(classified, depth, segment);
                self.registry.leave(addr);
                return result;
            }
        }

        match classified {
            Classified::Array(array) => {
                let len = array.len();
                if len == 0 {
                    self.write("[]");
                    self.registry.leave(addr);
                } else {
                    self.write("[");
                    self.push(FrameKind::Array { array, next: 0, len }, depth, segment, Some(addr));
                }
            }
            Classified::Object(object) => {
                let len = object.len();
                self.write("{");
                let kind = FrameKind::Object {
                    object,
                    next: 0,
                    len,
                    written: false,
                };
                self.push(kind, depth, segment, Some(addr));
            }
            Classified::ByteSource(source) => {
                self.attach(&source, segment.as_ref());
                self.write("\"");
                let kind = FrameKind::Bytes {
                    source,
                    carry: Utf8Carry::default(),
                };
                self.push(kind, depth, segment, Some(addr));
            }
            Classified::ItemSource(source) => {
                self.attach(&source, segment.as_ref());
                self.write("[");
                self.push(FrameKind::Items { source, next: 0 }, depth, segment, Some(addr));
            }
            Classified::Primitive(_) | Classified::Async(_) => {}
        }
        Ok(())
    }

    fn primitive(&mut self, value: Value, key: &Key, at_root: bool, segment: Option<Key>) -> Result<(), Error> {
        if value.is_undefined() {
            // absent: null in arrays, skipped in objects and at the root
            if !at_root && matches!(key, Key::Index(_)) {
                self.write("null");
            }
            return Ok(());
        }
        self.flush_member();
        encode::primitive_into(&value, &mut self.out).map_err(|kind| Error::UnsupportedPrimitive {
            kind,
            path: path_of(&self.stack, segment.as_ref()),
        })
    }

    fn collapse(&mut self, classified: Classified, depth: usize, segment: Option<Key>) -> Result<(), Error> {
        let mut path = path_of(&self.stack, segment.as_ref());
        debug!(%path, depth, "writing subtree past max depth in one step");
        let mut text = String::new();
        Collapse {
            registry: &mut self.registry,
            replacer: self.replacer.as_ref(),
            unit: self.unit.as_deref(),
            path: &mut path,
            out: &mut text,
        }
        .composite(classified, depth)?;
        self.write(&text);
        Ok(())
    }

    fn attach(&mut self, source: &Source, segment: Option<&Key>) {
        let status = source.status();
        source.pause();
        if status == SourceStatus::Paused {
            return;
        }
        let (kind, identity, path) = (source.kind(), source.addr(), path_of(&self.stack, segment));
        let diagnostic = match status {
            SourceStatus::Ended => Diagnostic::StreamAlreadyEnded { kind, identity, path },
            _ => Diagnostic::StreamFlowing { kind, identity, path },
        };
        warn!(path = %diagnostic.path(), "{}", diagnostic);
        if let Some(hook) = &self.on_diagnostic {
            hook(&diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }

    fn bytes(&mut self, top: usize, source: &Source, chunk: Chunk) -> Result<(), Error> {
        if let Chunk::Item(item) = &chunk {
            if !matches!(item, Value::String(_)) {
                let err = BoxError::from(format!("byte source produced a {} item", item.kind()));
                return Err(self.source_error(source, err));
            }
        }
        let Some(Frame {
            kind: FrameKind::Bytes { carry, .. },
            ..
        }) = self.stack.get_mut(top)
        else {
            return Ok(());
        };
        match chunk {
            Chunk::Bytes(bytes) => carry.decode_into(&bytes, &mut self.out),
            Chunk::Text(text) => {
                carry.finish_into(&mut self.out);
                encode::escape_into(&text, &mut self.out);
            }
            Chunk::Item(Value::String(text)) => {
                carry.finish_into(&mut self.out);
                encode::escape_into(&text, &mut self.out);
            }
            Chunk::Item(_) => {}
        }
        Ok(())
    }

    fn source_error(&self, source: &Source, err: BoxError) -> Error {
        Error::Source {
            kind: source.kind(),
            identity: source.addr(),
            path: path_of(&self.stack, None),
            source: err,
        }
    }

    fn push(&mut self, kind: FrameKind, depth: usize, key: Option<Key>, tracked: Option<usize>) {
        let indent = match &self.unit {
            Some(unit) => unit.repeat(depth),
            None => String::new(),
        };
        trace!(depth, "push frame");
        self.stack.push(Frame {
            kind,
            depth,
            indent,
            key,
            tracked,
        });
    }

    /// Writes the closing text of the top frame and pops it.
    fn close(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let top = self.stack.len();
        let parent_indent = self.stack.last().map_or("", |parent| parent.indent.as_str());
        let newline = |out: &mut String| {
            if self.unit.is_some() {
                out.push('\n');
                out.push_str(parent_indent);
            }
        };

        match frame.kind {
            FrameKind::Array { .. } => {
                newline(&mut self.out);
                self.out.push(']');
            }
            FrameKind::Object { written, .. } => {
                if self.member.as_ref().is_some_and(|m| m.frame == top) {
                    self.member = None;
                }
                if written {
                    newline(&mut self.out);
                }
                self.out.push('}');
            }
            FrameKind::Items { next, .. } => {
                if next > 0 {
                    newline(&mut self.out);
                }
                self.out.push(']');
            }
            FrameKind::Bytes { mut carry, .. } => {
                carry.finish_into(&mut self.out);
                self.out.push('"');
            }
            FrameKind::Root { .. } | FrameKind::Await { .. } => {}
        }

        if let Some(addr) = frame.tracked {
            self.registry.leave(addr);
        }
        trace!(depth = frame.depth, "pop frame");
    }

    fn separator(&mut self, top: usize, index: usize) {
        if index > 0 {
            self.out.push(',');
        }
        if self.unit.is_some() {
            self.out.push('\n');
            self.out.push_str(&self.stack[top].indent);
        }
    }

    fn write(&mut self, text: &str) {
        self.flush_member();
        self.out.push_str(text);
    }

    fn flush_member(&mut self) {
        let Some(member) = self.member.take() else {
            return;
        };
        let Some(Frame {
            kind: FrameKind::Object { written, .. },
            indent,
            ..
        }) = self.stack.get_mut(member.frame)
        else {
            return;
        };
        if *written {
            self.out.push(',');
        }
        *written = true;
        if self.unit.is_some() {
            self.out.push('\n');
            self.out.push_str(indent);
        }
        encode::quote_into(&member.key, &mut self.out);
        self.out.push(':');
        if self.unit.is_some() {
            self.out.push(' ');
        }
    }
}
