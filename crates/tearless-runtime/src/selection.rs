#![forbid(unsafe_code)]

//! Read-a-slice bindings.
//!
//! A [`SelectionBinding`] is the per-use-site record behind "render this
//! component from `selector(state)`". It coordinates selector invocation,
//! latest-value caching, error capture, and forced re-render requests.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──render──▶ Rendering ──commit──▶ Subscribed ──render──▶ Rendering ─┐
//!                     │                      ▲                             │
//!                  discard                   └────────────commit───────────┘
//!                     ▼
//!                   (previous phase)          any phase ──unmount──▶ Unsubscribed
//! ```
//!
//! 1. **Render** ([`SelectionBinding::render`]): the selector runs inline
//!    against the current snapshot and the result is staged. A failure is
//!    returned to the host, chained with the error captured on the
//!    notification path, if any.
//! 2. **Commit** ([`SelectionBinding::commit`]): the staged selector and value
//!    become the latest ones and the captured error is cleared. Refreshing on
//!    every commit (not only the first) is what keeps a prop-only re-render
//!    from leaving a stale cached value behind.
//! 3. **First commit** also attaches the node below the nearest ancestor
//!    binding and runs one manual update check to cover the window between
//!    the render-time read and the subscription going live.
//! 4. **Notification**: the latest selector runs against one snapshot. A
//!    failure is captured and a render is requested; a value equal to the
//!    cached one (by the binding's equality) is ignored; anything else is
//!    cached and a render is requested.
//! 5. **Unmount**: a did-detach flag is raised before the node detaches, so an
//!    in-flight cascade that still holds the listener does nothing.
//!
//! # Invariants
//!
//! 1. A render is requested iff the selection differs from the last committed
//!    or last accepted one, plus at most one request right after mount.
//! 2. The cached selector/value are written only by `commit` and by the
//!    notification listener, never by `render`.
//! 3. After `unmount`, the listener never requests a render.

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use tearless_core::{SelectorFault, ShallowEq};
use tracing::{debug, trace};

use crate::context::BindingContext;
use crate::subscription::SubscriptionNode;

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// A projection from the store state to one slice.
pub struct Selector<S, T> {
    select: Rc<dyn Fn(&Rc<S>) -> Result<T, SelectorFault>>,
}

impl<S, T> Selector<S, T> {
    /// An infallible selector.
    pub fn new(f: impl Fn(&Rc<S>) -> T + 'static) -> Self {
        Self {
            select: Rc::new(move |state| Ok(f(state))),
        }
    }

    /// A selector that may fail.
    pub fn fallible<E: Error + 'static>(f: impl Fn(&Rc<S>) -> Result<T, E> + 'static) -> Self {
        Self {
            select: Rc::new(move |state| f(state).map_err(SelectorFault::new)),
        }
    }

    /// Run the selector.
    ///
    /// # Errors
    ///
    /// Returns the selector's own failure.
    pub fn select(&self, state: &Rc<S>) -> Result<T, SelectorFault> {
        (self.select)(state)
    }
}

impl<S> Selector<S, Rc<S>> {
    /// Select the whole state.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            select: Rc::new(|state| Ok(Rc::clone(state))),
        }
    }
}

impl<S, T> Clone for Selector<S, T> {
    fn clone(&self) -> Self {
        Self {
            select: Rc::clone(&self.select),
        }
    }
}

impl<S, T> fmt::Debug for Selector<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ForceUpdate
// ---------------------------------------------------------------------------

/// Host primitive that schedules one re-render of the owning instance.
///
/// Hosts coalesce bursts: several requests before the next render produce a
/// single render.
#[derive(Clone)]
pub struct ForceUpdate(Rc<dyn Fn()>);

impl ForceUpdate {
    /// Wrap a scheduling callback.
    pub fn new(request: impl Fn() + 'static) -> Self {
        Self(Rc::new(request))
    }

    /// A primitive that schedules nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Ask the host for a re-render.
    #[inline]
    pub fn request(&self) {
        (self.0)();
    }
}

impl fmt::Debug for ForceUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForceUpdate").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SelectionError
// ---------------------------------------------------------------------------

/// Failure surfaced from a render-time selection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SelectionError {
    /// The selector failed while rendering.
    #[error(
        "an error occurred while selecting the store state: {source}{}",
        correlation(.correlated)
    )]
    Selector {
        /// The render-time failure.
        source: SelectorFault,
        /// A failure captured earlier on the notification path.
        correlated: Option<SelectorFault>,
    },
    /// The binding was read after it was unmounted.
    #[error("selection read after the binding was unmounted")]
    Unmounted,
}

fn correlation(correlated: &Option<SelectorFault>) -> String {
    match correlated {
        Some(prior) => format!("; it may be correlated with an earlier error: {prior}"),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// SelectionBinding
// ---------------------------------------------------------------------------

/// Observable phase of a [`SelectionBinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, never committed, nothing staged.
    Idle,
    /// A render result is staged and awaiting commit or discard.
    Rendering,
    /// Committed at least once and listening for store changes.
    Subscribed,
    /// Torn down. Terminal.
    Unsubscribed,
}

/// Equality used to decide whether a selection changed.
pub type Equality<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Cells shared between the render path and the notification listener.
struct Latest<S, T> {
    selector: RefCell<Option<Selector<S, T>>>,
    selected: RefCell<Option<T>>,
    error: RefCell<Option<SelectorFault>>,
    detached: Cell<bool>,
    equality: Equality<T>,
    force_update: ForceUpdate,
}

impl<S, T> Latest<S, T> {
    fn check_for_updates(&self, state: &Rc<S>) {
        if self.detached.get() {
            trace!("notification after unmount ignored");
            return;
        }
        let selector = self.selector.borrow().clone();
        let Some(selector) = selector else {
            return;
        };

        match selector.select(state) {
            Ok(next) => {
                let unchanged = self
                    .selected
                    .borrow()
                    .as_ref()
                    .is_some_and(|prev| (self.equality)(&next, prev));
                if unchanged {
                    trace!("selection unchanged; render skipped");
                    return;
                }
                *self.selected.borrow_mut() = Some(next);
                debug!("selection changed; render requested");
            }
            Err(fault) => {
                debug!(error = %fault, "selector failed during notification; render requested");
                *self.error.borrow_mut() = Some(fault);
            }
        }
        self.force_update.request();
    }
}

/// Per-use-site selection record.
///
/// # Usage
///
/// ```ignore
/// let mut binding = SelectionBinding::new(&cx, ForceUpdate::new(schedule_me));
///
/// // render phase
/// let label = binding.render(Selector::new(|s: &Rc<State>| s.title.clone()))?;
///
/// // commit phase, once the host has accepted this render
/// binding.commit();
/// ```
pub struct SelectionBinding<S, A, T> {
    context: BindingContext<S, A>,
    node: SubscriptionNode,
    latest: Rc<Latest<S, T>>,
    staged: Option<(Selector<S, T>, T)>,
    subscribed: bool,
}

impl<S: 'static, A: 'static, T: Clone + ShallowEq + 'static> SelectionBinding<S, A, T> {
    /// Binding that compares selections with [`ShallowEq`].
    #[must_use]
    pub fn new(context: &BindingContext<S, A>, force_update: ForceUpdate) -> Self {
        Self::with_equality(context, force_update, |a: &T, b: &T| a.shallow_eq(b))
    }
}

impl<S: 'static, A: 'static, T: Clone + 'static> SelectionBinding<S, A, T> {
    /// Binding with a custom equality.
    #[must_use]
    pub fn with_equality(
        context: &BindingContext<S, A>,
        force_update: ForceUpdate,
        equality: impl Fn(&T, &T) -> bool + 'static,
    ) -> Self {
        Self {
            context: context.clone(),
            node: SubscriptionNode::new(),
            latest: Rc::new(Latest {
                selector: RefCell::new(None),
                selected: RefCell::new(None),
                error: RefCell::new(None),
                detached: Cell::new(false),
                equality: Rc::new(equality),
                force_update,
            }),
            staged: None,
            subscribed: false,
        }
    }

    /// Render-phase read: run `selector` against the current state and stage
    /// the result for [`commit`](Self::commit).
    ///
    /// # Errors
    ///
    /// - [`SelectionError::Selector`] when the selector fails; carries the
    ///   error captured on the notification path, if any.
    /// - [`SelectionError::Unmounted`] after [`unmount`](Self::unmount).
    pub fn render(&mut self, selector: Selector<S, T>) -> Result<T, SelectionError> {
        if self.latest.detached.get() {
            return Err(SelectionError::Unmounted);
        }
        let state = self.context.store().get_state();
        match selector.select(&state) {
            Ok(value) => {
                self.staged = Some((selector, value.clone()));
                Ok(value)
            }
            Err(source) => {
                self.staged = None;
                let correlated = self.latest.error.borrow().clone();
                Err(SelectionError::Selector { source, correlated })
            }
        }
    }

    /// Commit-phase refresh. Subscribes on the first commit.
    pub fn commit(&mut self) {
        let Some((selector, value)) = self.staged.take() else {
            return;
        };
        if self.latest.detached.get() {
            return;
        }

        *self.latest.selector.borrow_mut() = Some(selector);
        *self.latest.selected.borrow_mut() = Some(value);
        self.latest.error.borrow_mut().take();

        if !self.subscribed {
            self.subscribe();
        }
    }

    fn subscribe(&mut self) {
        self.subscribed = true;
        let store = Rc::clone(self.context.store());

        let latest = Rc::clone(&self.latest);
        let source = Rc::clone(&store);
        self.node
            .set_listener(move || latest.check_for_updates(&source.get_state()));
        self.node.attach(self.context.node(), &store);
        trace!(node = self.node.id().get(), "selection subscribed");

        self.latest.check_for_updates(&store.get_state());
    }

    /// Drop the staged render result without committing it.
    pub fn discard(&mut self) {
        self.staged = None;
    }

    /// Tear down: raise the did-detach flag, then detach the node.
    pub fn unmount(&mut self) {
        if self.latest.detached.replace(true) {
            return;
        }
        self.staged = None;
        self.node.detach();
        self.node.clear_listener();
        trace!(node = self.node.id().get(), "selection unsubscribed");
    }
}

impl<S, A, T> SelectionBinding<S, A, T> {
    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.latest.detached.get() {
            Phase::Unsubscribed
        } else if self.staged.is_some() {
            Phase::Rendering
        } else if self.subscribed {
            Phase::Subscribed
        } else {
            Phase::Idle
        }
    }

    /// This binding's subscription node.
    #[must_use]
    pub fn node(&self) -> &SubscriptionNode {
        &self.node
    }

    /// Context for descendants: same store, this binding's node.
    #[must_use]
    pub fn child_context(&self) -> BindingContext<S, A> {
        self.context.nested(self.node.clone())
    }

    /// The error captured on the notification path since the last commit.
    #[must_use]
    pub fn captured_error(&self) -> Option<SelectorFault> {
        self.latest.error.borrow().clone()
    }
}

impl<S, A, T: Clone> SelectionBinding<S, A, T> {
    /// The cached selection (last committed or last accepted notification).
    #[must_use]
    pub fn latest_selected(&self) -> Option<T> {
        self.latest.selected.borrow().clone()
    }
}

impl<S, A, T> Drop for SelectionBinding<S, A, T> {
    fn drop(&mut self) {
        if !self.latest.detached.replace(true) {
            self.node.detach();
            self.node.clear_listener();
        }
    }
}

impl<S, A, T> fmt::Debug for SelectionBinding<S, A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionBinding")
            .field("phase", &self.phase())
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}
