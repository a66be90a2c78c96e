#![forbid(unsafe_code)]

//! Explicit binding context.
//!
//! Bindings discover their store and nearest ancestor subscription node
//! through a [`BindingContext`] handed down the component tree by the host,
//! never through global state. A [`Provider`] owns the root node for one
//! store attachment point and hands out the root context.
//!
//! # Usage
//!
//! ```ignore
//! let provider = Provider::new(store.into_ref());
//! let root_cx = provider.context();
//!
//! // A component that binds to the store passes its own node down.
//! let child_cx = root_cx.nested(binding.node().clone());
//! ```

use std::fmt;
use std::rc::Rc;

use tearless_core::StoreRef;

use crate::subscription::SubscriptionNode;

/// Store handle plus the nearest ancestor binding's subscription node.
pub struct BindingContext<S, A> {
    store: StoreRef<S, A>,
    node: Option<SubscriptionNode>,
}

impl<S, A> BindingContext<S, A> {
    /// Context without an ancestor node: bindings attach to the store directly.
    #[must_use]
    pub fn new(store: StoreRef<S, A>) -> Self {
        Self { store, node: None }
    }

    /// The shared store handle.
    #[must_use]
    pub fn store(&self) -> &StoreRef<S, A> {
        &self.store
    }

    /// The nearest ancestor node, if any.
    #[must_use]
    pub fn node(&self) -> Option<&SubscriptionNode> {
        self.node.as_ref()
    }

    /// Context for descendants of a binding that owns `node`.
    #[must_use]
    pub fn nested(&self, node: SubscriptionNode) -> Self {
        Self {
            store: Rc::clone(&self.store),
            node: Some(node),
        }
    }
}

impl<S, A> Clone for BindingContext<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
            node: self.node.clone(),
        }
    }
}

impl<S, A> fmt::Debug for BindingContext<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContext")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

/// Owner of the root subscription node for one store attachment point.
///
/// The root node subscribes to the store on construction and unsubscribes
/// when the provider is dropped.
pub struct Provider<S, A> {
    context: BindingContext<S, A>,
    root: SubscriptionNode,
}

impl<S: 'static, A: 'static> Provider<S, A> {
    /// Attach a fresh root node to `store`.
    #[must_use]
    pub fn new(store: StoreRef<S, A>) -> Self {
        let root = SubscriptionNode::new();
        root.attach(None, &store);
        Self {
            context: BindingContext {
                store,
                node: Some(root.clone()),
            },
            root,
        }
    }
}

impl<S, A> Provider<S, A> {
    /// Context for top-level bindings.
    #[must_use]
    pub fn context(&self) -> BindingContext<S, A> {
        self.context.clone()
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &SubscriptionNode {
        &self.root
    }

    /// The store this provider is attached to.
    #[must_use]
    pub fn store(&self) -> &StoreRef<S, A> {
        &self.context.store
    }
}

impl<S, A> Drop for Provider<S, A> {
    fn drop(&mut self) {
        self.root.detach();
    }
}

impl<S, A> fmt::Debug for Provider<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider").field("root", &self.root).finish()
    }
}
