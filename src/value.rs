//! # Value
//!
//! The in-memory graph a [`JsonStream`](crate::JsonStream) serializes.
//!
//! Arrays, objects and sources are shared handles: cloning one clones the handle,
//! not the contents, so the same node can be reachable through several paths and
//! a node can (directly or indirectly) contain itself. Identity is the handle's
//! allocation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use futures::Stream;
use thiserror::Error;

use crate::classify::ToJson;
use crate::path::Key;
use crate::pending::AsyncValue;
use crate::source::{BoxError, Source, StreamSource};

/// Largest integer an `f64` holds exactly, 2^53 - 1.
const MAX_SAFE_INTEGER: i128 = 9_007_199_254_740_991;

#[derive(Clone, Default)]
pub enum Value {
    /// No value at all. Omitted from objects, `null` in arrays.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(BigInt),
    String(Rc<str>),
    Array(Array),
    Object(Object),
    /// A value carrying its own serialization hook.
    Custom(Rc<dyn ToJson>),
    /// A value that is not available yet.
    Async(AsyncValue),
    /// An external byte or item source.
    Source(Source),
    /// A host value with no JSON form; treated as absent.
    Opaque(Opaque),
}

/// Host values that have no JSON representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opaque {
    Function,
    Symbol,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Undefined,
    Null,
    Bool,
    Number,
    BigInt,
    String,
    Array,
    Object,
    Custom,
    Async,
    ByteSource,
    ItemSource,
    Opaque,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::BigInt => "bigint",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Custom => "custom value",
            ValueKind::Async => "async value",
            ValueKind::ByteSource => "byte source",
            ValueKind::ItemSource => "item source",
            ValueKind::Opaque => "opaque value",
        })
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::BigInt(_) => ValueKind::BigInt,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Custom(_) => ValueKind::Custom,
            Value::Async(_) => ValueKind::Async,
            Value::Source(source) => source.kind(),
            Value::Opaque(_) => ValueKind::Opaque,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Wraps a value that serializes through its own [`ToJson`] hook.
    pub fn custom<T: ToJson + 'static>(hook: T) -> Self {
        Value::Custom(Rc::new(hook))
    }

    /// A source whose items are serialized as the elements of an array.
    pub fn items<S, V, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<V, E>> + 'static,
        V: Into<Value>,
        E: Into<BoxError>,
    {
        Value::Source(Source::new(StreamSource::items(stream)))
    }

    /// A source whose bytes are concatenated into a single string.
    pub fn bytes<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + 'static,
        B: Into<bytes::Bytes>,
        E: Into<BoxError>,
    {
        Value::Source(Source::new(StreamSource::bytes(stream)))
    }

    /// Converts anything serde can serialize, going through `serde_json::Value`.
    pub fn from_serialize<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Value::from)
    }
}

impl fmt::Debug for Value {
    // Shallow on purpose: graphs may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::BigInt(n) => f.debug_tuple("BigInt").field(&n.as_str()).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(a) => f.debug_struct("Array").field("len", &a.len()).finish(),
            Value::Object(o) => f.debug_struct("Object").field("len", &o.len()).finish(),
            Value::Custom(_) => f.write_str("Custom"),
            Value::Async(_) => f.write_str("Async"),
            Value::Source(s) => f.debug_tuple("Source").field(&s.mode()).finish(),
            Value::Opaque(o) => f.debug_tuple("Opaque").field(o).finish(),
        }
    }
}

/// A shared, growable array.
#[derive(Clone, Default)]
pub struct Array(Rc<RefCell<Vec<Value>>>);

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().push(value.into());
    }

    /// Sets the element at `index`, leaving holes as [`Value::Undefined`].
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let mut items = self.0.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value.into();
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<Vec<Value>>> {
        Rc::downgrade(&self.0)
    }
}

impl<V: Into<Value>> FromIterator<V> for Array {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Array(Rc::new(RefCell::new(iter.into_iter().map(Into::into).collect())))
    }
}

#[derive(Default)]
pub(crate) struct Entries {
    entries: Vec<(Rc<str>, Value)>,
    index: HashMap<Rc<str>, usize>,
}

/// A shared object whose members keep their insertion order.
#[derive(Clone, Default)]
pub struct Object(Rc<RefCell<Entries>>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a member; an existing key keeps its position and gets the new value.
    pub fn insert(&self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        let mut inner = self.0.borrow_mut();
        let Entries { entries, index } = &mut *inner;
        match index.get(&key) {
            Some(&at) => Some(std::mem::replace(&mut entries[at].1, value)),
            None => {
                index.insert(key.clone(), entries.len());
                entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let inner = self.0.borrow();
        inner.index.get(key).map(|&at| inner.entries[at].1.clone())
    }

    /// The member at position `at` in insertion order.
    pub fn entry(&self, at: usize) -> Option<(Rc<str>, Value)> {
        self.0.borrow().entries.get(at).cloned()
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        self.0.borrow().entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<Entries>> {
        Rc::downgrade(&self.0)
    }
}

impl<K: Into<Rc<str>>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = Object::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

/// An integer of any size, kept as its decimal digits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BigInt(Rc<str>);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid integer literal {0:?}")]
pub struct ParseBigIntError(String);

impl BigInt {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BigInt {
    type Err = ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseBigIntError(s.to_owned()));
        }
        let digits = digits.trim_start_matches('0');
        let normalized = match (negative, digits.is_empty()) {
            (_, true) => String::from("0"),
            (true, false) => format!("-{}", digits),
            (false, false) => digits.to_owned(),
        };
        Ok(BigInt(Rc::from(normalized)))
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! bigint_from {
    ($($t:ty),*) => {$(
        impl From<$t> for BigInt {
            fn from(n: $t) -> Self {
                BigInt(Rc::from(n.to_string()))
            }
        }
    )*};
}

bigint_from!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! value_from_small_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(f64::from(n))
            }
        }
    )*};
}

value_from_small_int!(i8, i16, i32, u8, u16, u32);

// Integers past 2^53 would be rounded as f64, so they become BigInt instead.
macro_rules! value_from_wide_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(n: $t) -> Self {
                match i128::try_from(n) {
                    Ok(wide) if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&wide) => {
                        Value::Number(wide as f64)
                    }
                    _ => Value::BigInt(BigInt::from(n)),
                }
            }
        }
    )*};
}

value_from_wide_int!(i64, i128, isize, u64, u128, usize);

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInt(n)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<AsyncValue> for Value {
    fn from(a: AsyncValue) -> Self {
        Value::Async(a)
    }
}

impl From<Source> for Value {
    fn from(s: Source) -> Self {
        Value::Source(s)
    }
}

impl From<Opaque> for Value {
    fn from(o: Opaque) -> Self {
        Value::Opaque(o)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::from(i)
                } else if let Some(u) = n.as_u64() {
                    Value::from(u)
                } else {
                    Value::Number(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Name(name) => Value::String(name),
            Key::Index(index) => Value::from(index),
        }
    }
}
