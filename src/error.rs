use thiserror::Error;

use crate::path::Path;
use crate::pending::Rejection;
use crate::source::BoxError;
use crate::value::ValueKind;

/// A failure that ends serialization. No output follows it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("converting circular structure to JSON: {kind} at {path} contains itself")]
    CircularStructure {
        kind: ValueKind,
        /// Address of the node, stable while it is alive.
        identity: usize,
        path: Path,
    },

    #[error("{kind} at {path} failed")]
    Source {
        kind: ValueKind,
        identity: usize,
        path: Path,
        #[source]
        source: BoxError,
    },

    #[error("async value at {path} was rejected: {reason}")]
    Rejected {
        path: Path,
        #[source]
        reason: Rejection,
    },

    #[error("{kind} at {path} reached the primitive encoder")]
    UnsupportedPrimitive { kind: ValueKind, path: Path },
}

impl Error {
    pub fn path(&self) -> &Path {
        match self {
            Error::CircularStructure { path, .. }
            | Error::Source { path, .. }
            | Error::Rejected { path, .. }
            | Error::UnsupportedPrimitive { path, .. } => path,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Error::CircularStructure { kind, .. }
            | Error::Source { kind, .. }
            | Error::UnsupportedPrimitive { kind, .. } => *kind,
            Error::Rejected { .. } => ValueKind::Async,
        }
    }
}

/// A problem that does not stop serialization but may have lost data.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("{kind} at {path} had ended before it was serialized; its data is lost")]
    StreamAlreadyEnded {
        kind: ValueKind,
        identity: usize,
        path: Path,
    },

    #[error("{kind} at {path} was flowing before it was serialized; data may have been lost, pausing it")]
    StreamFlowing {
        kind: ValueKind,
        identity: usize,
        path: Path,
    },
}

impl Diagnostic {
    pub fn path(&self) -> &Path {
        match self {
            Diagnostic::StreamAlreadyEnded { path, .. } | Diagnostic::StreamFlowing { path, .. } => path,
        }
    }
}
