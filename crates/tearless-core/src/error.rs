#![forbid(unsafe_code)]

//! Selector failure type.
//!
//! Selectors may fail (the Rust rendition of a throwing projection). A
//! failure captured on the notification path has to outlive the call that
//! produced it and may be reported twice (once when captured, once when the
//! next render chains it), so [`SelectorFault`] is an `Rc`-shared wrapper
//! that clones cheaply.

use std::error::Error;
use std::fmt;
use std::rc::Rc;

/// Plain-text selector failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

/// A cheaply cloneable selector failure.
#[derive(Clone)]
pub struct SelectorFault {
    inner: Rc<dyn Error + 'static>,
}

impl SelectorFault {
    /// Wrap an arbitrary error.
    pub fn new<E: Error + 'static>(error: E) -> Self {
        Self {
            inner: Rc::new(error),
        }
    }

    /// Build a fault from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Whether two handles refer to the same captured failure.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Borrow the wrapped error.
    #[must_use]
    pub fn inner(&self) -> &(dyn Error + 'static) {
        &*self.inner
    }
}

impl fmt::Debug for SelectorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for SelectorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl Error for SelectorFault {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source()
    }
}
