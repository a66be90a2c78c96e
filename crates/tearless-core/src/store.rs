#![forbid(unsafe_code)]

//! Centrally-dispatched state container.
//!
//! [`Store`] is the contract the binding runtime consumes: read a snapshot,
//! dispatch an action, subscribe a listener. [`ReducerStore`] is the reference
//! implementation: a pure reducer over immutable `Rc<S>` snapshots.
//!
//! # Architecture
//!
//! `ReducerStore` is a cheap-clone handle over `Rc<StoreInner>`. Listeners are
//! kept in registration order; each notification pass walks a snapshot of the
//! list and skips entries that were unsubscribed mid-pass.
//!
//! Re-entrant dispatch never nests notification passes:
//!
//! - From inside a listener, the action is reduced immediately and the new
//!   state is returned, but broadcasting is left to the outer pass loop, which
//!   sees the advanced generation counter and runs one more full pass.
//! - From inside a reducer, the action is queued and reduced right after the
//!   running reducer returns.
//!
//! # Invariants
//!
//! 1. `get_state()` returns the same `Rc` between two reductions.
//! 2. Every reduction is followed by at least one full notification pass that
//!    starts after it (unless the pass cap is hit).
//! 3. A listener is never invoked while a previous invocation of the same pass
//!    loop is still on the stack.
//! 4. [`Store::dispatcher`] returns handles that are [`Dispatcher::ptr_eq`]
//!    across calls and across clones of the store handle.
//!
//! # Failure Modes
//!
//! - Listener cascade exceeding [`StoreConfig::max_notify_passes`]: logged at
//!   `warn`, remaining generations are marked as broadcast.
//! - Reducer panic: propagates; the re-entrancy flags are restored by guards.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::config::StoreConfig;

/// Callback invoked after every state change.
pub type Listener = Rc<dyn Fn()>;

/// Shared, type-erased store handle.
pub type StoreRef<S, A> = Rc<dyn Store<S, A>>;

/// Pure state transition.
pub trait Reducer<S, A> {
    /// Compute the next state from the current one and an action.
    fn reduce(&self, state: &S, action: &A) -> S;
}

impl<S, A, F> Reducer<S, A> for F
where
    F: Fn(&S, &A) -> S,
{
    #[inline]
    fn reduce(&self, state: &S, action: &A) -> S {
        self(state, action)
    }
}

/// The state container contract.
pub trait Store<S, A> {
    /// Current state snapshot.
    fn get_state(&self) -> Rc<S>;

    /// Reduce `action` and notify listeners before returning the new state.
    fn dispatch(&self, action: A) -> Rc<S>;

    /// Register a listener. Dropping the returned handle unsubscribes.
    fn subscribe(&self, listener: Listener) -> StoreSubscription;

    /// The store's dispatch function as a referentially stable handle.
    fn dispatcher(&self) -> Dispatcher<S, A>;
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// A store's dispatch function.
///
/// Cloning shares the underlying function; [`ptr_eq`](Self::ptr_eq) tells
/// whether two handles are the same function.
pub struct Dispatcher<S, A> {
    dispatch: Rc<dyn Fn(A) -> Rc<S>>,
}

impl<S, A> Dispatcher<S, A> {
    /// Wrap a dispatch function.
    pub fn new(dispatch: impl Fn(A) -> Rc<S> + 'static) -> Self {
        Self {
            dispatch: Rc::new(dispatch),
        }
    }

    /// Dispatch an action, returning the resulting state.
    #[inline]
    pub fn dispatch(&self, action: A) -> Rc<S> {
        (self.dispatch)(action)
    }

    /// Whether both handles wrap the same function.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.dispatch, &other.dispatch)
    }
}

impl<S, A> Clone for Dispatcher<S, A> {
    fn clone(&self) -> Self {
        Self {
            dispatch: Rc::clone(&self.dispatch),
        }
    }
}

impl<S, A> fmt::Debug for Dispatcher<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("ptr", &Rc::as_ptr(&self.dispatch).cast::<()>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// StoreSubscription
// ---------------------------------------------------------------------------

/// RAII handle for a store listener.
///
/// [`unsubscribe`](Self::unsubscribe) is idempotent; dropping the handle
/// unsubscribes if that has not happened yet.
#[must_use = "dropping this handle unsubscribes the listener"]
pub struct StoreSubscription {
    cancel: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl StoreSubscription {
    /// Build a handle that runs `cancel` once on unsubscribe.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: RefCell::new(Some(Box::new(cancel))),
        }
    }

    /// Remove the listener. Later calls do nothing.
    pub fn unsubscribe(&self) {
        let cancel = self.cancel.borrow_mut().take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Whether the listener is still registered through this handle.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.borrow().is_some()
    }
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for StoreSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ReducerStore
// ---------------------------------------------------------------------------

struct ListenerEntry {
    id: u64,
    active: Cell<bool>,
    listener: Listener,
}

/// Raises a flag for the lifetime of the guard.
struct FlagGuard<'a>(&'a Cell<bool>);

impl<'a> FlagGuard<'a> {
    fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct StoreInner<S, A> {
    state: RefCell<Rc<S>>,
    reducer: Box<dyn Reducer<S, A>>,
    listeners: RefCell<Vec<Rc<ListenerEntry>>>,
    next_listener_id: Cell<u64>,
    generation: Cell<u64>,
    broadcast: Cell<u64>,
    reducing: Cell<bool>,
    notifying: Cell<bool>,
    deferred: RefCell<VecDeque<A>>,
    config: StoreConfig,
}

impl<S: 'static, A: 'static> StoreInner<S, A> {
    fn get_state(&self) -> Rc<S> {
        Rc::clone(&self.state.borrow())
    }

    fn dispatch(&self, action: A) -> Rc<S> {
        if self.reducing.get() {
            trace!("dispatch from inside a reducer deferred");
            self.deferred.borrow_mut().push_back(action);
            return self.get_state();
        }

        self.reduce(action);

        if self.notifying.get() {
            trace!(
                generation = self.generation.get(),
                "dispatch during notification; broadcast left to the running pass loop"
            );
            return self.get_state();
        }

        self.notify_until_settled();
        self.get_state()
    }

    fn reduce(&self, action: A) {
        let _reducing = FlagGuard::raise(&self.reducing);
        let mut next = Some(action);
        while let Some(action) = next {
            let current = self.get_state();
            let reduced = self.reducer.reduce(&current, &action);
            *self.state.borrow_mut() = Rc::new(reduced);
            self.generation.set(self.generation.get() + 1);
            next = self.deferred.borrow_mut().pop_front();
        }
    }

    fn notify_until_settled(&self) {
        let _notifying = FlagGuard::raise(&self.notifying);
        let limit = self.config.pass_limit();
        let mut passes = 0;

        while self.broadcast.get() != self.generation.get() {
            if passes == limit {
                warn!(
                    passes,
                    generation = self.generation.get(),
                    "store notification cascade hit the pass limit"
                );
                self.broadcast.set(self.generation.get());
                break;
            }
            passes += 1;
            self.broadcast.set(self.generation.get());

            let snapshot: SmallVec<[Rc<ListenerEntry>; 8]> =
                self.listeners.borrow().iter().cloned().collect();
            trace!(
                generation = self.generation.get(),
                listeners = snapshot.len(),
                pass = passes,
                "notifying store listeners"
            );
            for entry in snapshot {
                if entry.active.get() {
                    (entry.listener)();
                }
            }
        }
    }

    fn subscribe(self: &Rc<Self>, listener: Listener) -> StoreSubscription {
        let id = self.next_listener_id.get();
        self.next_listener_id.set(id + 1);
        let entry = Rc::new(ListenerEntry {
            id,
            active: Cell::new(true),
            listener,
        });
        self.listeners.borrow_mut().push(Rc::clone(&entry));
        trace!(listener = id, "store listener subscribed");

        let store = Rc::downgrade(self);
        StoreSubscription::new(move || {
            entry.active.set(false);
            if let Some(store) = store.upgrade() {
                store.listeners.borrow_mut().retain(|e| e.id != id);
                trace!(listener = id, "store listener unsubscribed");
            }
        })
    }
}

/// Reference [`Store`] driven by a pure [`Reducer`].
///
/// # Usage
///
/// ```
/// use tearless_core::{ReducerStore, Store};
///
/// let store = ReducerStore::new(0_i64, |n: &i64, delta: &i64| n + delta);
/// store.dispatch(2);
/// assert_eq!(*store.get_state(), 2);
/// ```
pub struct ReducerStore<S, A> {
    inner: Rc<StoreInner<S, A>>,
    dispatcher: Dispatcher<S, A>,
}

impl<S: 'static, A: 'static> ReducerStore<S, A> {
    /// Create a store with the default configuration.
    pub fn new(initial: S, reducer: impl Reducer<S, A> + 'static) -> Self {
        Self::with_config(initial, reducer, StoreConfig::default())
    }

    /// Create a store with an explicit configuration.
    pub fn with_config(
        initial: S,
        reducer: impl Reducer<S, A> + 'static,
        config: StoreConfig,
    ) -> Self {
        let inner = Rc::new(StoreInner {
            state: RefCell::new(Rc::new(initial)),
            reducer: Box::new(reducer),
            listeners: RefCell::new(Vec::new()),
            next_listener_id: Cell::new(0),
            generation: Cell::new(0),
            broadcast: Cell::new(0),
            reducing: Cell::new(false),
            notifying: Cell::new(false),
            deferred: RefCell::new(VecDeque::new()),
            config,
        });
        let target = Rc::clone(&inner);
        let dispatcher = Dispatcher::new(move |action| target.dispatch(action));
        Self { inner, dispatcher }
    }

    /// Erase the concrete type into a shared [`StoreRef`].
    #[must_use]
    pub fn into_ref(self) -> StoreRef<S, A> {
        Rc::new(self)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Number of reductions performed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> StoreConfig {
        self.inner.config
    }
}

impl<S: 'static, A: 'static> Store<S, A> for ReducerStore<S, A> {
    fn get_state(&self) -> Rc<S> {
        self.inner.get_state()
    }

    fn dispatch(&self, action: A) -> Rc<S> {
        self.inner.dispatch(action)
    }

    fn subscribe(&self, listener: Listener) -> StoreSubscription {
        self.inner.subscribe(listener)
    }

    fn dispatcher(&self) -> Dispatcher<S, A> {
        self.dispatcher.clone()
    }
}

impl<S, A> Clone for ReducerStore<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<S: fmt::Debug, A> fmt::Debug for ReducerStore<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerStore")
            .field("state", &*self.inner.state.borrow())
            .field("generation", &self.inner.generation.get())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}
