#![forbid(unsafe_code)]

//! Reference host for the render/commit contract.
//!
//! [`Host`] owns a component instance tree bound to one store and drives it
//! in passes:
//!
//! 1. **Collect**: take the set of instances that requested a re-render and
//!    keep the ones with no dirty ancestor (an ancestor's render re-renders
//!    its whole subtree). Shallowest first.
//! 2. **Render**: render each dirty root and its subtree into a work-in-progress
//!    record. Children reconcile by key (or position when unkeyed).
//! 3. **Commit** or **discard**: on success, unmount removed subtrees
//!    child-before-parent, apply the new tree, commit hooks parent-before-child,
//!    then run deferred effects. On failure, discard every staged hook and drop
//!    instances created by the pass; the committed tree is untouched.
//!
//! A flush repeats passes until nothing is dirty. Force updates requested in
//! the same burst land in one set, so they coalesce into one render.
//!
//! # Invariants
//!
//! 1. A parent's hooks commit before its children's.
//! 2. Teardown unmounts children before their parent.
//! 3. A failed pass leaves no trace in the committed tree.
//!
//! # Failure Modes
//!
//! - A component that schedules a render on every commit never settles; the
//!   flush fails with [`RenderError::Unsettled`] after
//!   [`HostConfig::max_flush_passes`] passes and the instances stay dirty.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::mem;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use tearless_core::StoreRef;
use tearless_runtime::{BindingContext, ForceUpdate, Provider, SubscriptionNode};
use tracing::{debug, debug_span, trace, warn};

use crate::config::HostConfig;
use crate::error::RenderError;
use crate::hooks::{Effect, HookSlot, RenderCx};
use crate::view::{Component, Element};

/// Identifier of a mounted component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Raw id value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

struct Instance<S, A> {
    parent: Option<InstanceId>,
    depth: usize,
    key: String,
    component: Rc<dyn Component<S, A>>,
    context: BindingContext<S, A>,
    force_update: ForceUpdate,
    hooks: Vec<Box<dyn HookSlot>>,
    children: Vec<InstanceId>,
    text: String,
    mounted: bool,
}

struct Rendered {
    id: InstanceId,
    text: String,
    children: Vec<InstanceId>,
}

/// Work-in-progress record of one pass.
struct Wip<S, A> {
    /// Pre-order.
    rendered: Vec<InstanceId>,
    components: Vec<(InstanceId, Rc<dyn Component<S, A>>)>,
    views: Vec<Rendered>,
    removed: Vec<InstanceId>,
}

impl<S, A> Default for Wip<S, A> {
    fn default() -> Self {
        Self {
            rendered: Vec::new(),
            components: Vec::new(),
            views: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// A component tree bound to one store.
pub struct Host<S, A> {
    provider: Provider<S, A>,
    config: HostConfig,
    instances: AHashMap<InstanceId, Instance<S, A>>,
    root: Option<InstanceId>,
    dirty: Rc<RefCell<BTreeSet<InstanceId>>>,
    next_id: u64,
}

impl<S: 'static, A: 'static> Host<S, A> {
    /// Host with the default configuration.
    #[must_use]
    pub fn new(store: StoreRef<S, A>) -> Self {
        Self::with_config(store, HostConfig::default())
    }

    /// Host with an explicit configuration.
    #[must_use]
    pub fn with_config(store: StoreRef<S, A>, config: HostConfig) -> Self {
        Self {
            provider: Provider::new(store),
            config,
            instances: AHashMap::new(),
            root: None,
            dirty: Rc::new(RefCell::new(BTreeSet::new())),
            next_id: 1,
        }
    }

    /// Mount `root`, replacing any previous tree, and flush.
    ///
    /// # Errors
    ///
    /// Any render failure. The tree is left empty.
    pub fn mount(&mut self, root: Element<S, A>) -> Result<(), RenderError> {
        self.unmount();
        let key = root.key.unwrap_or_default();
        let context = self.provider.context();
        let id = self.create_instance(None, 0, key, root.component, context);
        self.root = Some(id);
        self.dirty.borrow_mut().insert(id);

        let result = self.flush();
        if self.instances.get(&id).is_none_or(|instance| !instance.mounted) {
            self.root = None;
        }
        result
    }

    /// Render and commit until nothing is dirty.
    ///
    /// # Errors
    ///
    /// The first render failure, or [`RenderError::Unsettled`].
    pub fn flush(&mut self) -> Result<(), RenderError> {
        let limit = self.config.pass_limit();
        for pass in 0..limit {
            let dirty = mem::take(&mut *self.dirty.borrow_mut());
            let roots = self.dirty_roots(&dirty);
            if roots.is_empty() {
                return Ok(());
            }

            let _span = debug_span!("flush_pass", pass, roots = roots.len()).entered();
            let mut wip = Wip::default();
            for &id in &roots {
                let Some(component) = self.instances.get(&id).map(|i| Rc::clone(&i.component))
                else {
                    continue;
                };
                if let Err(err) = self.render_instance(id, component, &mut wip) {
                    debug!(error = %err, "render pass failed; discarding");
                    self.rollback(wip);
                    self.dirty
                        .borrow_mut()
                        .extend(roots.iter().filter(|id| self.instances.contains_key(*id)));
                    return Err(err);
                }
            }
            self.commit(wip);
        }

        if self.dirty.borrow().is_empty() {
            return Ok(());
        }
        warn!(passes = limit, "flush hit the pass limit before settling");
        Err(RenderError::Unsettled { passes: limit })
    }

    /// Dispatch through the store, then flush.
    ///
    /// # Errors
    ///
    /// As for [`flush`](Self::flush).
    pub fn dispatch(&mut self, action: A) -> Result<Rc<S>, RenderError> {
        let state = self.provider.store().dispatch(action);
        self.flush()?;
        Ok(state)
    }

    /// Run `f` (event handlers, bound actions, state setters), then flush.
    ///
    /// # Errors
    ///
    /// As for [`flush`](Self::flush).
    pub fn act<R>(&mut self, f: impl FnOnce() -> R) -> Result<R, RenderError> {
        let out = f();
        self.flush()?;
        Ok(out)
    }

    /// Unmount the whole tree, children before parents.
    pub fn unmount(&mut self) {
        if let Some(root) = self.root.take() {
            self.unmount_subtree(root);
        }
        self.dirty.borrow_mut().clear();
    }

    fn create_instance(
        &mut self,
        parent: Option<InstanceId>,
        depth: usize,
        key: String,
        component: Rc<dyn Component<S, A>>,
        context: BindingContext<S, A>,
    ) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        let dirty = Rc::clone(&self.dirty);
        let force_update = ForceUpdate::new(move || {
            dirty.borrow_mut().insert(id);
        });
        self.instances.insert(
            id,
            Instance {
                parent,
                depth,
                key,
                component,
                context,
                force_update,
                hooks: Vec::new(),
                children: Vec::new(),
                text: String::new(),
                mounted: false,
            },
        );
        trace!(instance = id.0, depth, "instance created");
        id
    }

    fn dirty_roots(&self, dirty: &BTreeSet<InstanceId>) -> Vec<InstanceId> {
        let mut roots: Vec<(usize, InstanceId)> = dirty
            .iter()
            .filter_map(|id| {
                let instance = self.instances.get(id)?;
                let mut parent = instance.parent;
                while let Some(p) = parent {
                    if dirty.contains(&p) {
                        return None;
                    }
                    parent = self.instances.get(&p).and_then(|i| i.parent);
                }
                Some((instance.depth, *id))
            })
            .collect();
        roots.sort_unstable();
        roots.into_iter().map(|(_, id)| id).collect()
    }

    fn render_instance(
        &mut self,
        id: InstanceId,
        component: Rc<dyn Component<S, A>>,
        wip: &mut Wip<S, A>,
    ) -> Result<(), RenderError> {
        let Some(instance) = self.instances.get_mut(&id) else {
            return Ok(());
        };
        wip.rendered.push(id);
        let mut hooks = mem::take(&mut instance.hooks);
        let context = instance.context.clone();
        let force_update = instance.force_update.clone();
        let mounting = !instance.mounted;
        let depth = instance.depth;
        let previous = instance.children.clone();

        let (result, child_context) = {
            let mut cx = RenderCx::new(&mut hooks, mounting, context.clone(), force_update);
            let result = component
                .render(&mut cx)
                .and_then(|view| cx.finish().map(|()| view));
            (result, cx.take_child_context().unwrap_or(context))
        };
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.hooks = hooks;
        }
        let view = result?;

        let mut by_key: AHashMap<String, InstanceId> = previous
            .iter()
            .filter_map(|child| self.instances.get(child).map(|i| (i.key.clone(), *child)))
            .collect();
        let mut seen = AHashSet::with_capacity(view.children.len());
        let mut children = Vec::with_capacity(view.children.len());

        for (index, element) in view.children.into_iter().enumerate() {
            let key = element.key.unwrap_or_else(|| format!("#{index}"));
            if !seen.insert(key.clone()) {
                return Err(RenderError::DuplicateKey { key });
            }
            let child = match by_key.remove(&key) {
                Some(existing) => existing,
                None => self.create_instance(
                    Some(id),
                    depth + 1,
                    key,
                    Rc::clone(&element.component),
                    child_context.clone(),
                ),
            };
            wip.components.push((child, Rc::clone(&element.component)));
            children.push(child);
            self.render_instance(child, element.component, wip)?;
        }

        let mut removed: Vec<InstanceId> = by_key.into_iter().map(|(_, child)| child).collect();
        removed.sort_unstable();
        wip.removed.extend(removed);
        wip.views.push(Rendered {
            id,
            text: view.text,
            children,
        });
        Ok(())
    }

    fn rollback(&mut self, wip: Wip<S, A>) {
        for id in wip.rendered.iter().rev() {
            let Some(instance) = self.instances.get_mut(id) else {
                continue;
            };
            for hook in instance.hooks.iter_mut().rev() {
                hook.discard();
            }
            if !instance.mounted {
                self.instances.remove(id);
            }
        }
    }

    fn commit(&mut self, wip: Wip<S, A>) {
        for id in wip.removed {
            self.unmount_subtree(id);
        }
        for (id, component) in wip.components {
            if let Some(instance) = self.instances.get_mut(&id) {
                instance.component = component;
            }
        }
        for view in wip.views {
            if let Some(instance) = self.instances.get_mut(&view.id) {
                instance.text = view.text;
                instance.children = view.children;
            }
        }

        let mut effects: Vec<Effect> = Vec::new();
        for id in &wip.rendered {
            let Some(instance) = self.instances.get_mut(id) else {
                continue;
            };
            if !instance.mounted {
                instance.mounted = true;
                trace!(instance = id.0, "instance mounted");
            }
            for hook in &mut instance.hooks {
                hook.commit(&mut effects);
            }
        }
        for effect in effects {
            effect();
        }
    }
}

impl<S, A> Host<S, A> {
    fn unmount_subtree(&mut self, id: InstanceId) {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(instance) = self.instances.get(&next) {
                order.push(next);
                stack.extend(instance.children.iter().rev().copied());
            }
        }
        for id in order.into_iter().rev() {
            if let Some(mut instance) = self.instances.remove(&id) {
                for hook in instance.hooks.iter_mut().rev() {
                    hook.unmount();
                }
                trace!(instance = id.0, "instance unmounted");
            }
        }
    }

    /// Committed text of every instance, pre-order, empty texts skipped.
    #[must_use]
    pub fn output(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<InstanceId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some(instance) = self.instances.get(&id) else {
                continue;
            };
            if !instance.text.is_empty() {
                out.push(instance.text.clone());
            }
            stack.extend(instance.children.iter().rev().copied());
        }
        out
    }

    /// Number of live instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// The root instance, if mounted.
    #[must_use]
    pub fn root(&self) -> Option<InstanceId> {
        self.root
    }

    /// The root subscription node every top-level binding attaches to.
    #[must_use]
    pub fn root_node(&self) -> &SubscriptionNode {
        self.provider.root()
    }

    /// The store this host renders.
    #[must_use]
    pub fn store(&self) -> &StoreRef<S, A> {
        self.provider.store()
    }

    /// Whether any instance is waiting for a render.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.dirty.borrow().is_empty()
    }
}

impl<S, A> Drop for Host<S, A> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            self.unmount_subtree(root);
        }
    }
}

impl<S, A> fmt::Debug for Host<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("instances", &self.instances.len())
            .field("root", &self.root)
            .field("dirty", &self.dirty.borrow().len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::View;
    use tearless_core::ReducerStore;
    use tracing_test::traced_test;

    fn host(max_flush_passes: usize) -> Host<u8, u8> {
        let store = ReducerStore::new(0_u8, |n: &u8, d: &u8| n.wrapping_add(*d));
        Host::with_config(
            store.into_ref(),
            HostConfig::default().max_flush_passes(max_flush_passes),
        )
    }

    #[traced_test]
    #[test]
    fn pass_limit_is_logged() {
        let mut host = host(2);
        let err = host
            .mount(Element::new(|cx: &mut RenderCx<'_, u8, u8>| {
                cx.force_update();
                Ok(View::empty())
            }))
            .unwrap_err();
        assert!(matches!(err, RenderError::Unsettled { passes: 2 }));
        assert!(logs_contain("flush hit the pass limit"));
    }

    #[test]
    fn dirty_roots_skip_descendants_of_dirty_ancestors() {
        let mut host = host(8);
        host.mount(Element::new(|_: &mut RenderCx<'_, u8, u8>| {
            Ok(View::empty().child(Element::new(|_: &mut RenderCx<'_, u8, u8>| {
                Ok(View::text("leaf"))
            })))
        }))
        .unwrap();
        let root = host.root().unwrap();
        let leaf = host.instances.get(&root).unwrap().children[0];

        let dirty = BTreeSet::from([leaf, root]);
        assert_eq!(host.dirty_roots(&dirty), vec![root]);
        assert_eq!(host.dirty_roots(&BTreeSet::from([leaf])), vec![leaf]);
    }

    #[test]
    fn effects_run_parent_first_after_commit() {
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        let (p, c) = (Rc::clone(&order), Rc::clone(&order));
        let mut host = host(8);
        host.mount(Element::new(move |cx: &mut RenderCx<'_, u8, u8>| {
            let p = Rc::clone(&p);
            cx.use_effect(Some(()), move || p.borrow_mut().push("parent effect"))?;
            let c = Rc::clone(&c);
            Ok(View::empty().child(Element::new(move |cx: &mut RenderCx<'_, u8, u8>| {
                let c = Rc::clone(&c);
                cx.use_effect(Some(()), move || c.borrow_mut().push("child effect"))?;
                Ok(View::empty())
            })))
        }))
        .unwrap();

        assert_eq!(*order.borrow(), vec!["parent effect", "child effect"]);
        host.unmount();
        assert_eq!(host.instance_count(), 0);
        assert!(!host.has_pending());
    }
}
