//! Serialization settings that can live in a configuration file.
//!
//! The replacer and the diagnostic callback are code, so they are set on the
//! [`Builder`](crate::Builder) instead.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Whitespace inserted between tokens.
///
/// Deserializes from `null`, a number of spaces, or a string used verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Indent {
    /// Compact output.
    #[default]
    None,
    Spaces(usize),
    Text(String),
}

impl Indent {
    /// The text repeated once per nesting level, if any.
    pub fn unit(&self) -> Option<String> {
        match self {
            Indent::None | Indent::Spaces(0) => None,
            Indent::Spaces(n) => Some(" ".repeat(*n)),
            Indent::Text(text) if text.is_empty() => None,
            Indent::Text(text) => Some(text.clone()),
        }
    }
}

impl From<usize> for Indent {
    fn from(n: usize) -> Self {
        Indent::Spaces(n)
    }
}

impl From<&str> for Indent {
    fn from(text: &str) -> Self {
        Indent::Text(text.to_owned())
    }
}

impl From<String> for Indent {
    fn from(text: String) -> Self {
        Indent::Text(text)
    }
}

/// What to do when a node is reached that has been seen before.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleMode {
    /// Fail with [`Error::CircularStructure`](crate::Error::CircularStructure)
    /// when a node contains itself. Shared, non-circular nodes are written out
    /// in full every time.
    #[default]
    Error,
    /// Write every node once; later occurrences become `{"$ref":"<path>"}`
    /// markers pointing at the first one.
    Reference,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub indent: Indent,
    pub cycle: CycleMode,
    /// Composites nested this deep or deeper are written in one step.
    pub max_depth: Option<usize>,
    /// Output is handed out in chunks of roughly this many bytes.
    pub chunk_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            indent: Indent::None,
            cycle: CycleMode::Error,
            max_depth: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
