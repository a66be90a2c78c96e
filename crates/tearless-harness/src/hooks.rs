#![forbid(unsafe_code)]

//! Hook slots and the render context handed to components.
//!
//! Hooks are stored per instance in call order. The first render of an
//! instance creates its slots; every later render must request the same kinds
//! in the same order, or the pass fails with
//! [`RenderError::HookOrder`].
//!
//! Each slot follows the host's two-phase protocol: whatever a render stages
//! is either committed (parent-before-child, before any later notification)
//! or discarded with the rest of a failed pass.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tearless_core::{Dispatcher, ShallowEq};
use tearless_runtime::{
    ActionBinder, ActionCreators, BindingContext, BoundActions, ForceUpdate, SelectionBinding,
    Selector, use_dispatcher,
};

use crate::error::RenderError;

/// Deferred side effect, run after a pass commits.
pub(crate) type Effect = Box<dyn FnOnce()>;

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

pub(crate) trait HookSlot: Any {
    fn kind(&self) -> &'static str;

    fn commit(&mut self, _effects: &mut Vec<Effect>) {}

    fn discard(&mut self) {}

    fn unmount(&mut self) {}

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct SelectionSlot<S, A, T>(SelectionBinding<S, A, T>);

impl<S: 'static, A: 'static, T: Clone + 'static> HookSlot for SelectionSlot<S, A, T> {
    fn kind(&self) -> &'static str {
        "selection"
    }

    fn commit(&mut self, _effects: &mut Vec<Effect>) {
        self.0.commit();
    }

    fn discard(&mut self) {
        self.0.discard();
    }

    fn unmount(&mut self) {
        self.0.unmount();
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct ActionsSlot<S, A, Args, D>(ActionBinder<S, A, Args, D>);

impl<S: 'static, A: 'static, Args: 'static, D: 'static> HookSlot for ActionsSlot<S, A, Args, D> {
    fn kind(&self) -> &'static str {
        "bound-actions"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct StateSlot<T>(Rc<RefCell<T>>);

impl<T: 'static> HookSlot for StateSlot<T> {
    fn kind(&self) -> &'static str {
        "state"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct EffectSlot<D> {
    deps: Option<D>,
    staged: Option<(Option<D>, Effect)>,
}

impl<D: 'static> HookSlot for EffectSlot<D> {
    fn kind(&self) -> &'static str {
        "effect"
    }

    fn commit(&mut self, effects: &mut Vec<Effect>) {
        if let Some((deps, effect)) = self.staged.take() {
            self.deps = deps;
            effects.push(effect);
        }
    }

    fn discard(&mut self) {
        self.staged = None;
    }

    fn unmount(&mut self) {
        self.staged = None;
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// StateHandle
// ---------------------------------------------------------------------------

/// Setter for a [`RenderCx::use_state`] cell. Every `set` schedules a
/// re-render of the owning instance.
pub struct StateHandle<T> {
    cell: Rc<RefCell<T>>,
    force_update: ForceUpdate,
}

impl<T> StateHandle<T> {
    /// Replace the value.
    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
        self.force_update.request();
    }

    /// Update the value in place.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.cell.borrow_mut());
        self.force_update.request();
    }
}

impl<T> Clone for StateHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            force_update: self.force_update.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHandle")
            .field("value", &*self.cell.borrow())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RenderCx
// ---------------------------------------------------------------------------

/// Per-render access to hooks and the binding context.
pub struct RenderCx<'a, S, A> {
    hooks: &'a mut Vec<Box<dyn HookSlot>>,
    cursor: usize,
    mounting: bool,
    context: BindingContext<S, A>,
    child_context: Option<BindingContext<S, A>>,
    force_update: ForceUpdate,
}

impl<'a, S: 'static, A: 'static> RenderCx<'a, S, A> {
    pub(crate) fn new(
        hooks: &'a mut Vec<Box<dyn HookSlot>>,
        mounting: bool,
        context: BindingContext<S, A>,
        force_update: ForceUpdate,
    ) -> Self {
        Self {
            hooks,
            cursor: 0,
            mounting,
            context,
            child_context: None,
            force_update,
        }
    }

    fn slot<H: HookSlot>(
        &mut self,
        kind: &'static str,
        init: impl FnOnce() -> H,
    ) -> Result<&mut H, RenderError> {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.hooks.len() {
            if !self.mounting {
                return Err(RenderError::HookOrder {
                    index,
                    expected: "nothing",
                    found: kind,
                });
            }
            self.hooks.push(Box::new(init()));
        }
        let expected = self.hooks[index].kind();
        self.hooks[index]
            .as_any_mut()
            .downcast_mut::<H>()
            .ok_or(RenderError::HookOrder {
                index,
                expected,
                found: kind,
            })
    }

    /// Ends the render: an update must have requested every slot.
    pub(crate) fn finish(&self) -> Result<(), RenderError> {
        match self.hooks.get(self.cursor) {
            Some(unused) if !self.mounting => Err(RenderError::HookOrder {
                index: self.cursor,
                expected: unused.kind(),
                found: "nothing",
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn take_child_context(&mut self) -> Option<BindingContext<S, A>> {
        self.child_context.take()
    }

    fn select_with<T: Clone + 'static>(
        &mut self,
        selector: Selector<S, T>,
        init: impl FnOnce(&BindingContext<S, A>, ForceUpdate) -> SelectionBinding<S, A, T>,
    ) -> Result<T, RenderError> {
        // Each selection nests below the previous one, so one component's
        // selections settle in call order before any child is notified.
        let context = self.child_context().clone();
        let force_update = self.force_update.clone();
        let slot = self.slot("selection", move || {
            SelectionSlot(init(&context, force_update))
        })?;
        let selected = slot.0.render(selector);
        self.child_context = Some(slot.0.child_context());
        Ok(selected?)
    }

    /// Read a slice of the store state; re-render when it changes by
    /// [`ShallowEq`].
    ///
    /// # Errors
    ///
    /// [`RenderError::Selection`] when the selector fails, and
    /// [`RenderError::HookOrder`] on a hook-order mismatch.
    pub fn use_selection<T: Clone + ShallowEq + 'static>(
        &mut self,
        selector: Selector<S, T>,
    ) -> Result<T, RenderError> {
        self.select_with(selector, SelectionBinding::new)
    }

    /// [`use_selection`](Self::use_selection) with a custom equality.
    ///
    /// The equality is fixed by the first render.
    ///
    /// # Errors
    ///
    /// As for [`use_selection`](Self::use_selection).
    pub fn use_selection_with<T: Clone + 'static>(
        &mut self,
        selector: Selector<S, T>,
        equality: impl Fn(&T, &T) -> bool + 'static,
    ) -> Result<T, RenderError> {
        self.select_with(selector, move |cx, force| {
            SelectionBinding::with_equality(cx, force, equality)
        })
    }

    /// The whole state snapshot, compared with [`ShallowEq`]: a new snapshot
    /// that is shallow-equal to the last one does not re-render.
    ///
    /// # Errors
    ///
    /// [`RenderError::HookOrder`] on a hook-order mismatch.
    pub fn use_whole_state(&mut self) -> Result<Rc<S>, RenderError>
    where
        S: ShallowEq,
    {
        self.use_selection(Selector::identity())
    }

    /// Selection plus the store's dispatcher.
    ///
    /// # Errors
    ///
    /// As for [`use_selection`](Self::use_selection).
    pub fn use_store<T: Clone + ShallowEq + 'static>(
        &mut self,
        selector: Selector<S, T>,
    ) -> Result<(T, Dispatcher<S, A>), RenderError> {
        let selected = self.use_selection(selector)?;
        Ok((selected, self.use_dispatcher()))
    }

    /// The store's stable dispatcher. Uses no hook slot.
    #[must_use]
    pub fn use_dispatcher(&self) -> Dispatcher<S, A> {
        use_dispatcher(&self.context)
    }

    /// Bind `creators` to the store, memoized on `deps`.
    ///
    /// # Errors
    ///
    /// [`RenderError::HookOrder`] on a hook-order mismatch.
    pub fn use_bound_actions<Args: 'static, D: ShallowEq + 'static>(
        &mut self,
        creators: &ActionCreators<Args, A>,
        deps: Option<D>,
    ) -> Result<Rc<BoundActions<Args>>, RenderError> {
        let dispatcher = self.use_dispatcher();
        let slot = self.slot("bound-actions", || {
            ActionsSlot::<S, A, Args, D>(ActionBinder::new())
        })?;
        Ok(slot.0.bind(creators, &dispatcher, deps))
    }

    /// Instance-local state. `initial` is used on the first render only.
    ///
    /// # Errors
    ///
    /// [`RenderError::HookOrder`] on a hook-order mismatch.
    pub fn use_state<T: Clone + 'static>(
        &mut self,
        initial: impl FnOnce() -> T,
    ) -> Result<(T, StateHandle<T>), RenderError> {
        let force_update = self.force_update.clone();
        let slot = self.slot("state", || StateSlot(Rc::new(RefCell::new(initial()))))?;
        let value = slot.0.borrow().clone();
        let handle = StateHandle {
            cell: Rc::clone(&slot.0),
            force_update,
        };
        Ok((value, handle))
    }

    /// Run `effect` after this render commits, when `deps` changed since the
    /// last committed run. `None` runs after every commit.
    ///
    /// # Errors
    ///
    /// [`RenderError::HookOrder`] on a hook-order mismatch.
    pub fn use_effect<D: ShallowEq + 'static>(
        &mut self,
        deps: Option<D>,
        effect: impl FnOnce() + 'static,
    ) -> Result<(), RenderError> {
        let slot = self.slot("effect", || EffectSlot::<D> {
            deps: None,
            staged: None,
        })?;
        let unchanged = match (&deps, &slot.deps) {
            (Some(next), Some(prev)) => next.shallow_eq(prev),
            _ => false,
        };
        slot.staged = if unchanged {
            None
        } else {
            let effect: Effect = Box::new(effect);
            Some((deps, effect))
        };
        Ok(())
    }

    /// The context this instance was rendered in.
    #[must_use]
    pub fn context(&self) -> &BindingContext<S, A> {
        &self.context
    }

    /// The context children receive: the last selection's node so far, or the
    /// incoming context before any selection.
    #[must_use]
    pub fn child_context(&self) -> &BindingContext<S, A> {
        self.child_context.as_ref().unwrap_or(&self.context)
    }

    /// Schedule a re-render of this instance.
    pub fn force_update(&self) {
        self.force_update.request();
    }
}

impl<S, A> fmt::Debug for RenderCx<'_, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderCx")
            .field("cursor", &self.cursor)
            .field("hooks", &self.hooks.len())
            .field("mounting", &self.mounting)
            .finish_non_exhaustive()
    }
}
