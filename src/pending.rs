//! Values that settle later.

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::{self, LocalBoxFuture, Shared};
use futures::FutureExt;
use thiserror::Error;

use crate::value::Value;

type Settle = Shared<LocalBoxFuture<'static, Result<Value, Rejection>>>;

/// A value that is not available yet.
///
/// Any future can back it. The future runs at most once: clones share the
/// outcome, so the same pending value may appear several times in a graph.
#[derive(Clone)]
pub struct AsyncValue {
    settle: Settle,
}

impl AsyncValue {
    /// A value produced by a fallible future. An `Err` rejects the value and
    /// ends serialization with [`Error::Rejected`](crate::Error::Rejected).
    pub fn new<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<Value, E>> + 'static,
        E: StdError + 'static,
    {
        let settle = async move { future.await.map_err(Rejection::new) };
        Self {
            settle: settle.boxed_local().shared(),
        }
    }

    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Value> + 'static,
    {
        Self {
            settle: future.map(Ok::<Value, Rejection>).boxed_local().shared(),
        }
    }

    pub fn resolved(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            settle: future::ready(Ok::<Value, Rejection>(value)).boxed_local().shared(),
        }
    }

    pub fn rejected(reason: impl StdError + 'static) -> Self {
        let reason = Rejection::new(reason);
        Self {
            settle: future::ready(Err::<Value, Rejection>(reason)).boxed_local().shared(),
        }
    }

    pub(crate) fn poll_settle(&mut self, cx: &mut Context<'_>) -> Poll<Result<Value, Rejection>> {
        self.settle.poll_unpin(cx)
    }

    /// The outcome if the value can settle without waiting.
    pub(crate) fn settled_now(&self) -> Option<Result<Value, Rejection>> {
        self.settle.clone().now_or_never()
    }
}

impl fmt::Debug for AsyncValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncValue")
            .field("settled", &self.settle.peek().is_some())
            .finish()
    }
}

/// The reason an [`AsyncValue`] failed.
#[derive(Clone)]
pub struct Rejection(Rc<dyn StdError>);

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

impl Rejection {
    pub fn new(reason: impl StdError + 'static) -> Self {
        Rejection(Rc::new(reason))
    }

    pub fn message(reason: impl Into<String>) -> Self {
        Rejection(Rc::new(Message(reason.into())))
    }

    pub fn reason(&self) -> &(dyn StdError + 'static) {
        &*self.0
    }
}

impl fmt::Debug for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl StdError for Rejection {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}
