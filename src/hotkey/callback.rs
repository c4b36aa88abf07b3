//! User callbacks and the single invocation path they share

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::combination::Combination;
use super::error::CallbackFailure;
use crate::chord::ChordSequence;

type Handler = dyn Fn() -> anyhow::Result<()> + Send + Sync;

/// Shared zero-argument handler bound to a hotkey or chord sequence
#[derive(Clone)]
pub struct Callback(Arc<Handler>);

impl Callback {
    /// Wrap a fallible handler
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wrap a handler that cannot fail
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::new(move || {
            f();
            Ok(())
        })
    }

    /// Run the handler, converting errors and panics into a [`CallbackFailure`]
    pub fn invoke(&self) -> Result<(), CallbackFailure> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.0)())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(CallbackFailure::Failed(e)),
            Err(payload) => Err(CallbackFailure::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// What caused a callback to fire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// A direct combination from the binding table
    Combination(Combination),
    /// A chord suffix typed after the activator
    Sequence(ChordSequence),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Combination(c) => write!(f, "{}", c),
            Trigger::Sequence(s) => write!(f, "chord {}", s),
        }
    }
}

/// A callback waiting to run once the dispatch lock is released
#[derive(Debug, Clone)]
pub(crate) struct Pending {
    pub trigger: Trigger,
    pub callback: Callback,
}

impl Pending {
    pub fn new(trigger: Trigger, callback: Callback) -> Self {
        Self { trigger, callback }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_invoke_ok() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let cb = Callback::from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(cb.invoke().is_ok());
        assert!(cb.clone().invoke().is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invoke_error_is_captured() {
        let cb = Callback::new(|| anyhow::bail!("sound device missing"));
        let err = cb.invoke().unwrap_err();
        assert!(matches!(err, CallbackFailure::Failed(_)));
        assert!(err.to_string().contains("sound device missing"));
    }

    #[test]
    fn test_invoke_panic_is_captured() {
        let cb = Callback::from_fn(|| panic!("overlay exploded"));
        let err = cb.invoke().unwrap_err();
        match err {
            CallbackFailure::Panicked(msg) => assert_eq!(msg, "overlay exploded"),
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_trigger_display() {
        let combo = Combination::parse("ctrl+alt+1").unwrap();
        assert_eq!(Trigger::Combination(combo).to_string(), "<ctrl>+<alt>+1");
        let seq = ChordSequence::parse(["g", "h"]).unwrap();
        assert_eq!(Trigger::Sequence(seq).to_string(), "chord g+h");
    }
}
