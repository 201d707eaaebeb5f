//! Recursive writer for subtrees nested deeper than
//! [`Options::max_depth`](crate::Options::max_depth).
//!
//! Past the limit a composite is written in a single engine step. Async
//! values that have already settled are used as-is. Anything that would
//! still have to wait, pending values and sources alike, is written as `{}`.

use tracing::debug;

use crate::classify::{classify, Classified, Replacer};
use crate::encode;
use crate::error::Error;
use crate::path::{Key, Path};
use crate::registry::{Identity, Registry, Visit};
use crate::value::{Array, Object, Value};

pub(crate) struct Collapse<'a> {
    pub(crate) registry: &'a mut Registry,
    pub(crate) replacer: Option<&'a Replacer>,
    pub(crate) unit: Option<&'a str>,
    /// Path of the composite being written.
    pub(crate) path: &'a mut Path,
    pub(crate) out: &'a mut String,
}

impl Collapse<'_> {
    /// Writes a composite already entered in the registry by the caller.
    pub(crate) fn composite(&mut self, classified: Classified, depth: usize) -> Result<(), Error> {
        match classified {
            Classified::Array(array) => self.array(&array, depth),
            Classified::Object(object) => self.object(&object, depth),
            other => self.child(other, depth),
        }
    }

    fn array(&mut self, array: &Array, depth: usize) -> Result<(), Error> {
        let len = array.len();
        if len == 0 {
            self.out.push_str("[]");
            return Ok(());
        }
        let container = Value::Array(array.clone());
        self.out.push('[');
        for index in 0..len {
            if index > 0 {
                self.out.push(',');
            }
            self.newline(depth);
            let key = Key::Index(index);
            let element = array.get(index).unwrap_or_default();
            let classified = self.settle(classify(element, &key, &container, self.replacer), &key, &container)?;
            if classified.is_absent() {
                self.out.push_str("null");
                continue;
            }
            self.path.push(key);
            self.child(classified, depth + 1)?;
            self.path.pop();
        }
        self.newline(depth - 1);
        self.out.push(']');
        Ok(())
    }

    fn object(&mut self, object: &Object, depth: usize) -> Result<(), Error> {
        let container = Value::Object(object.clone());
        let mut written = false;
        self.out.push('{');
        for at in 0..object.len() {
            let Some((name, value)) = object.entry(at) else {
                break;
            };
            if !self.replacer.map_or(true, |r| r.includes(&name)) {
                continue;
            }
            let key = Key::Name(name);
            let classified = self.settle(classify(value, &key, &container, self.replacer), &key, &container)?;
            if classified.is_absent() {
                continue;
            }
            if written {
                self.out.push(',');
            }
            written = true;
            self.newline(depth);
            if let Key::Name(name) = &key {
                encode::quote_into(name, self.out);
            }
            self.out.push(':');
            if self.unit.is_some() {
                self.out.push(' ');
            }
            self.path.push(key);
            self.child(classified, depth + 1)?;
            self.path.pop();
        }
        if written {
            self.newline(depth - 1);
        }
        self.out.push('}');
        Ok(())
    }

    /// Unwraps async values that have settled by now. One still pending is
    /// returned unchanged.
    fn settle(&self, mut classified: Classified, key: &Key, container: &Value) -> Result<Classified, Error> {
        while let Classified::Async(pending) = &classified {
            match pending.settled_now() {
                Some(Ok(value)) => classified = classify(value, key, container, self.replacer),
                Some(Err(reason)) => {
                    let mut path = self.path.clone();
                    path.push(key.clone());
                    return Err(Error::Rejected { path, reason });
                }
                None => break,
            }
        }
        Ok(classified)
    }

    fn child(&mut self, classified: Classified, depth: usize) -> Result<(), Error> {
        let composite = match classified {
            Classified::Primitive(value) => {
                return encode::primitive_into(&value, self.out).map_err(|kind| Error::UnsupportedPrimitive {
                    kind,
                    path: self.path.clone(),
                });
            }
            waiting @ (Classified::Async(_) | Classified::ByteSource(_) | Classified::ItemSource(_)) => {
                debug!(path = %self.path, kind = %waiting.kind(), "cannot wait past max depth");
                self.out.push_str("{}");
                return Ok(());
            }
            composite => composite,
        };

        let kind = composite.kind();
        let Some(identity) = Identity::of(&composite) else {
            return Ok(());
        };
        let addr = identity.addr;
        let path = &*self.path;
        match self.registry.enter(identity, || path.clone()) {
            Visit::First => {}
            Visit::Circular => {
                return Err(Error::CircularStructure {
                    kind,
                    identity: addr,
                    path: self.path.clone(),
                })
            }
            Visit::Repeated(first) => {
                self.out.push_str(&first.reference_marker());
                return Ok(());
            }
        }
        let result = self.composite(composite, depth);
        self.registry.leave(addr);
        result
    }

    fn newline(&mut self, depth: usize) {
        if let Some(unit) = self.unit {
            self.out.push('\n');
            for _ in 0..depth {
                self.out.push_str(unit);
            }
        }
    }
}
