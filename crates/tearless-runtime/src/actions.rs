#![forbid(unsafe_code)]

//! Binding action creators to a dispatcher.
//!
//! An action creator is a pure function from call arguments to an action.
//! Binding composes it with a [`Dispatcher`]: the bound callable forwards its
//! arguments to the creator and dispatches the result, discarding the
//! returned state.
//!
//! Creators come in three shapes, modeled as one tagged union
//! ([`ActionCreators`]); binding preserves the shape:
//!
//! | Input | Output |
//! |-------|--------|
//! | `Single(creator)` | `Single(bound)` |
//! | `List(creators)` | `List(bound)`, same length and order |
//! | `Map(name -> creator)` | `Map(name -> bound)`, same keys |
//!
//! Multi-argument creators take a tuple as `Args`.
//!
//! # Memoization
//!
//! [`ActionBinder`] keeps the last bound result and reuses it while both the
//! dispatcher and the dependency list are unchanged. Dependencies compare
//! element-wise by [`ShallowEq`] (one level, identity per element). Omitting
//! the dependency list recomputes on every call.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tearless_core::{Dispatcher, ShallowEq};
use tracing::trace;

// ---------------------------------------------------------------------------
// Creators
// ---------------------------------------------------------------------------

/// A function from call arguments to an action.
pub struct ActionCreator<Args, A>(Rc<dyn Fn(Args) -> A>);

impl<Args, A> ActionCreator<Args, A> {
    /// Wrap a creator function.
    pub fn new(create: impl Fn(Args) -> A + 'static) -> Self {
        Self(Rc::new(create))
    }

    /// Build the action without dispatching it.
    #[inline]
    pub fn create(&self, args: Args) -> A {
        (self.0)(args)
    }
}

impl<Args, A> Clone for ActionCreator<Args, A> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<Args, A> fmt::Debug for ActionCreator<Args, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCreator").finish_non_exhaustive()
    }
}

/// One creator, an ordered collection, or a named mapping.
pub enum ActionCreators<Args, A> {
    /// A single creator.
    Single(ActionCreator<Args, A>),
    /// Positional creators.
    List(Vec<ActionCreator<Args, A>>),
    /// Named creators.
    Map(BTreeMap<String, ActionCreator<Args, A>>),
}

impl<Args, A> ActionCreators<Args, A> {
    /// A single creator from a function.
    pub fn single(create: impl Fn(Args) -> A + 'static) -> Self {
        Self::Single(ActionCreator::new(create))
    }

    /// A positional collection.
    pub fn list(creators: impl IntoIterator<Item = ActionCreator<Args, A>>) -> Self {
        Self::List(creators.into_iter().collect())
    }

    /// A named mapping.
    pub fn map<K: Into<String>>(
        creators: impl IntoIterator<Item = (K, ActionCreator<Args, A>)>,
    ) -> Self {
        Self::Map(
            creators
                .into_iter()
                .map(|(name, creator)| (name.into(), creator))
                .collect(),
        )
    }
}

impl<Args, A> Clone for ActionCreators<Args, A> {
    fn clone(&self) -> Self {
        match self {
            Self::Single(c) => Self::Single(c.clone()),
            Self::List(cs) => Self::List(cs.clone()),
            Self::Map(cs) => Self::Map(cs.clone()),
        }
    }
}

impl<Args, A> fmt::Debug for ActionCreators<Args, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(_) => f.write_str("Single"),
            Self::List(cs) => f.debug_tuple("List").field(&cs.len()).finish(),
            Self::Map(cs) => f.debug_list().entries(cs.keys()).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bound actions
// ---------------------------------------------------------------------------

/// A creator composed with a dispatcher.
pub struct BoundAction<Args>(Rc<dyn Fn(Args)>);

impl<Args> BoundAction<Args> {
    /// Create the action from `args` and dispatch it.
    #[inline]
    pub fn call(&self, args: Args) {
        (self.0)(args);
    }

    /// Whether both handles wrap the same callable.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<Args> Clone for BoundAction<Args> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<Args> fmt::Debug for BoundAction<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundAction").finish_non_exhaustive()
    }
}

/// Bound callables in the shape of their creators.
pub enum BoundActions<Args> {
    /// From [`ActionCreators::Single`].
    Single(BoundAction<Args>),
    /// From [`ActionCreators::List`].
    List(Vec<BoundAction<Args>>),
    /// From [`ActionCreators::Map`].
    Map(BTreeMap<String, BoundAction<Args>>),
}

impl<Args> BoundActions<Args> {
    /// The callable, for the single shape.
    #[must_use]
    pub fn single(&self) -> Option<&BoundAction<Args>> {
        match self {
            Self::Single(bound) => Some(bound),
            _ => None,
        }
    }

    /// The callable at `index`, for the collection shape.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&BoundAction<Args>> {
        match self {
            Self::List(bound) => bound.get(index),
            _ => None,
        }
    }

    /// The callable named `name`, for the mapping shape.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoundAction<Args>> {
        match self {
            Self::Map(bound) => bound.get(name),
            _ => None,
        }
    }

    /// Number of callables.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::List(bound) => bound.len(),
            Self::Map(bound) => bound.len(),
        }
    }

    /// Whether there are no callables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<Args> fmt::Debug for BoundActions<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(_) => f.write_str("Single"),
            Self::List(bound) => f.debug_tuple("List").field(&bound.len()).finish(),
            Self::Map(bound) => f.debug_list().entries(bound.keys()).finish(),
        }
    }
}

fn bind_one<S: 'static, Args: 'static, A: 'static>(
    creator: &ActionCreator<Args, A>,
    dispatcher: &Dispatcher<S, A>,
) -> BoundAction<Args> {
    let creator = creator.clone();
    let dispatcher = dispatcher.clone();
    BoundAction(Rc::new(move |args| {
        let _ = dispatcher.dispatch(creator.create(args));
    }))
}

/// Bind every creator in `creators` to `dispatcher`, preserving shape.
#[must_use]
pub fn bind_action_creators<S: 'static, Args: 'static, A: 'static>(
    creators: &ActionCreators<Args, A>,
    dispatcher: &Dispatcher<S, A>,
) -> BoundActions<Args> {
    match creators {
        ActionCreators::Single(creator) => BoundActions::Single(bind_one(creator, dispatcher)),
        ActionCreators::List(creators) => BoundActions::List(
            creators
                .iter()
                .map(|creator| bind_one(creator, dispatcher))
                .collect(),
        ),
        ActionCreators::Map(creators) => BoundActions::Map(
            creators
                .iter()
                .map(|(name, creator)| (name.clone(), bind_one(creator, dispatcher)))
                .collect(),
        ),
    }
}

// ---------------------------------------------------------------------------
// ActionBinder
// ---------------------------------------------------------------------------

struct Memo<S, A, Args, D> {
    dispatcher: Dispatcher<S, A>,
    deps: D,
    bound: Rc<BoundActions<Args>>,
}

/// Per-use-site memo of bound actions.
pub struct ActionBinder<S, A, Args, D> {
    memo: Option<Memo<S, A, Args, D>>,
}

impl<S: 'static, A: 'static, Args: 'static, D: ShallowEq> ActionBinder<S, A, Args, D> {
    /// An empty binder.
    #[must_use]
    pub fn new() -> Self {
        Self { memo: None }
    }

    /// Bound actions for `creators`.
    ///
    /// Returns the previous result (same `Rc`) when `deps` is `Some` and
    /// shallow-equal to the previous call's deps and `dispatcher` is the same
    /// function. `None` recomputes every call and forgets the memo.
    pub fn bind(
        &mut self,
        creators: &ActionCreators<Args, A>,
        dispatcher: &Dispatcher<S, A>,
        deps: Option<D>,
    ) -> Rc<BoundActions<Args>> {
        let Some(deps) = deps else {
            self.memo = None;
            return Rc::new(bind_action_creators(creators, dispatcher));
        };

        if let Some(memo) = &self.memo {
            if memo.dispatcher.ptr_eq(dispatcher) && memo.deps.shallow_eq(&deps) {
                return Rc::clone(&memo.bound);
            }
        }

        trace!("action binder deps changed; rebinding");
        let bound = Rc::new(bind_action_creators(creators, dispatcher));
        self.memo = Some(Memo {
            dispatcher: dispatcher.clone(),
            deps,
            bound: Rc::clone(&bound),
        });
        bound
    }
}

impl<S: 'static, A: 'static, Args: 'static, D: ShallowEq> Default for ActionBinder<S, A, Args, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A, Args, D> fmt::Debug for ActionBinder<S, A, Args, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionBinder")
            .field("memoized", &self.memo.is_some())
            .finish()
    }
}
