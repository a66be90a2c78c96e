#![forbid(unsafe_code)]

//! Dispatcher accessor.

use tearless_core::Dispatcher;

use crate::context::BindingContext;

/// The dispatch function of the store in `cx`.
///
/// Every call against the same store returns a handle to the same function,
/// so callers may use it as a memoization dependency.
#[must_use]
pub fn use_dispatcher<S, A>(cx: &BindingContext<S, A>) -> Dispatcher<S, A> {
    cx.store().dispatcher()
}
