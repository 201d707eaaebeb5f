//! Replacer and hook application, and the closed set of shapes the engine acts on.

use std::fmt;
use std::rc::Rc;

use crate::path::Key;
use crate::pending::AsyncValue;
use crate::source::{Source, SourceMode};
use crate::value::{Array, Object, Value, ValueKind};

/// A custom serialization hook, the counterpart of a `toJSON` method.
///
/// The returned value is serialized in place of the original. It is not
/// hooked again.
pub trait ToJson {
    fn to_json(&self, key: &Key) -> Value;
}

impl<F: Fn(&Key) -> Value> ToJson for F {
    fn to_json(&self, key: &Key) -> Value {
        self(key)
    }
}

type ReplacerFn = dyn Fn(&Key, Value, &Value) -> Value;

/// Rewrites values before they are serialized.
#[derive(Clone)]
pub enum Replacer {
    /// Called with the key, the value and its container for every node,
    /// the root included (with an empty key and a `{"": root}` container).
    Function(Rc<ReplacerFn>),
    /// Only object members with one of these keys are serialized.
    Include(Vec<String>),
}

impl Replacer {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Key, Value, &Value) -> Value + 'static,
    {
        Replacer::Function(Rc::new(f))
    }

    pub fn include<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Replacer::Include(keys.into_iter().map(Into::into).collect())
    }

    /// Whether an object member named `key` passes the include list.
    pub(crate) fn includes(&self, key: &str) -> bool {
        match self {
            Replacer::Function(_) => true,
            Replacer::Include(keys) => keys.iter().any(|k| k == key),
        }
    }
}

impl fmt::Debug for Replacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacer::Function(_) => f.write_str("Replacer::Function"),
            Replacer::Include(keys) => f.debug_tuple("Replacer::Include").field(keys).finish(),
        }
    }
}

/// What the engine does with a value once replacer and hook have run.
pub(crate) enum Classified {
    /// Scalars, plus [`Value::Undefined`] for anything absent.
    Primitive(Value),
    Array(Array),
    Object(Object),
    Async(AsyncValue),
    ByteSource(Source),
    ItemSource(Source),
}

impl Classified {
    pub(crate) fn kind(&self) -> ValueKind {
        match self {
            Classified::Primitive(value) => value.kind(),
            Classified::Array(_) => ValueKind::Array,
            Classified::Object(_) => ValueKind::Object,
            Classified::Async(_) => ValueKind::Async,
            Classified::ByteSource(_) => ValueKind::ByteSource,
            Classified::ItemSource(_) => ValueKind::ItemSource,
        }
    }

    pub(crate) fn is_absent(&self) -> bool {
        matches!(self, Classified::Primitive(Value::Undefined))
    }
}

/// Applies the replacer function, then the value's own hook, then sorts the
/// result into one of the [`Classified`] shapes.
pub(crate) fn classify(
    value: Value,
    key: &Key,
    container: &Value,
    replacer: Option<&Replacer>,
) -> Classified {
    let value = match replacer {
        Some(Replacer::Function(f)) => f(key, value, container),
        _ => value,
    };
    let value = match value {
        Value::Custom(hook) => hook.to_json(key),
        value => value,
    };

    match value {
        Value::Array(array) => Classified::Array(array),
        Value::Object(object) => Classified::Object(object),
        Value::Async(pending) => Classified::Async(pending),
        Value::Source(source) => match source.mode() {
            SourceMode::Bytes => Classified::ByteSource(source),
            SourceMode::Items => Classified::ItemSource(source),
        },
        Value::Opaque(_) | Value::Custom(_) | Value::Undefined => Classified::Primitive(Value::Undefined),
        primitive => Classified::Primitive(primitive),
    }
}
