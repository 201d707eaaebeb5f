//! Tracks the arrays, objects and sources already entered, keyed by the
//! address of their allocation.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Weak;

use crate::classify::Classified;
use crate::options::CycleMode;
use crate::path::Path;
use crate::source::Readable;
use crate::value::{Entries, Value};

/// A node's address plus a weak handle that pins the address (not the node)
/// for as long as the registry remembers it.
pub(crate) struct Identity {
    pub(crate) addr: usize,
    handle: Handle,
}

pub(crate) enum Handle {
    Array(Weak<RefCell<Vec<Value>>>),
    Object(Weak<RefCell<Entries>>),
    Source(Weak<RefCell<dyn Readable>>),
}

impl Handle {
    fn is_alive(&self) -> bool {
        match self {
            Handle::Array(weak) => weak.strong_count() > 0,
            Handle::Object(weak) => weak.strong_count() > 0,
            Handle::Source(weak) => weak.strong_count() > 0,
        }
    }
}

impl Identity {
    pub(crate) fn of(classified: &Classified) -> Option<Identity> {
        let (addr, handle) = match classified {
            Classified::Array(array) => (array.addr(), Handle::Array(array.downgrade())),
            Classified::Object(object) => (object.addr(), Handle::Object(object.downgrade())),
            Classified::ByteSource(source) | Classified::ItemSource(source) => {
                (source.addr(), Handle::Source(source.downgrade()))
            }
            Classified::Primitive(_) | Classified::Async(_) => return None,
        };
        Some(Identity { addr, handle })
    }
}

pub(crate) enum Visit {
    First,
    /// The node is one of its own ancestors.
    Circular,
    /// The node was already written at this path.
    Repeated(Path),
}

pub(crate) enum Registry {
    /// Nodes currently open, for [`CycleMode::Error`].
    Ancestors(HashSet<usize>),
    /// Every node written so far with the path it was first written at, for
    /// [`CycleMode::Reference`].
    References(HashMap<usize, (Handle, Path)>),
}

impl Registry {
    pub(crate) fn new(mode: CycleMode) -> Self {
        match mode {
            CycleMode::Error => Registry::Ancestors(HashSet::new()),
            CycleMode::Reference => Registry::References(HashMap::new()),
        }
    }

    /// Records that the node is being entered at the path `path` computes.
    /// The path is only computed when it needs to be remembered.
    pub(crate) fn enter(&mut self, identity: Identity, path: impl FnOnce() -> Path) -> Visit {
        match self {
            Registry::Ancestors(open) => {
                if open.insert(identity.addr) {
                    Visit::First
                } else {
                    Visit::Circular
                }
            }
            Registry::References(seen) => {
                if let Some((handle, first)) = seen.get(&identity.addr) {
                    if handle.is_alive() {
                        return Visit::Repeated(first.clone());
                    }
                }
                seen.insert(identity.addr, (identity.handle, path()));
                Visit::First
            }
        }
    }

    /// Records that the node at `addr` has been written completely.
    pub(crate) fn leave(&mut self, addr: usize) {
        if let Registry::Ancestors(open) = self {
            open.remove(&addr);
        }
    }

    pub(crate) fn clear(&mut self) {
        match self {
            Registry::Ancestors(open) => open.clear(),
            Registry::References(seen) => seen.clear(),
        }
    }
}
