#![forbid(unsafe_code)]

//! Hierarchical fan-out of store notifications.
//!
//! A [`SubscriptionNode`] exists per store-consuming binding. Nodes form a tree
//! that mirrors the component tree, skipping components that do not bind to
//! the store. Exactly one root node per attachment point is subscribed to the
//! store directly; every other node is registered with its nearest binding
//! ancestor.
//!
//! # Notification Order
//!
//! [`SubscriptionNode::notify`] runs the node's own listener first and only
//! then visits its children, depth-first, in attach order. A parent therefore
//! decides whether to re-render before any descendant looks at the new state.
//!
//! The walk uses an explicit work stack rather than call recursion, and each
//! child's attachment is re-checked when it is popped:
//!
//! - a child detached while the pass is running is not visited;
//! - a node whose own listener detaches it does not pass the notification
//!   on to its children;
//! - a child attached while the pass is running is not visited (it will read
//!   fresh state on its own next render).
//!
//! # Invariants
//!
//! 1. A node is attached to at most one target (parent node or store).
//! 2. `attach` on an attached node is a no-op.
//! 3. A parent's listener runs before any of its children's listeners within
//!    one `notify` call.
//!
//! # Failure Modes
//!
//! - Detaching a node that still has children neither notifies nor fails; the
//!   children stay linked to the detached node and stop receiving
//!   notifications. Teardown proceeds child-before-parent, so this does not
//!   happen during normal operation.
//! - Dropping every handle to an attached node without detaching leaves it
//!   reachable from its parent; owners detach on drop.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;
use tearless_core::{Listener, Store, StoreRef, StoreSubscription};
use tracing::{debug, trace};

/// Global counter for node ids.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a subscription node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

enum Link {
    Detached,
    Child(Weak<NodeInner>),
    Store(StoreSubscription),
}

struct NodeInner {
    id: NodeId,
    listener: RefCell<Option<Listener>>,
    children: RefCell<Vec<Rc<NodeInner>>>,
    link: RefCell<Link>,
}

impl NodeInner {
    fn is_attached(&self) -> bool {
        !matches!(&*self.link.borrow(), Link::Detached)
    }

    fn is_child_of(&self, parent: &Rc<NodeInner>) -> bool {
        match &*self.link.borrow() {
            Link::Child(p) => std::ptr::eq(p.as_ptr(), Rc::as_ptr(parent)),
            _ => false,
        }
    }

    fn notify(start: &Rc<NodeInner>) {
        let mut stack: SmallVec<[(Rc<NodeInner>, Option<Rc<NodeInner>>); 16]> = SmallVec::new();
        stack.push((Rc::clone(start), None));

        while let Some((node, scheduled_by)) = stack.pop() {
            if let Some(parent) = &scheduled_by {
                if !node.is_child_of(parent) {
                    trace!(node = node.id.0, "skipping node detached mid-notify");
                    continue;
                }
            }

            let children: SmallVec<[Rc<NodeInner>; 8]> =
                node.children.borrow().iter().cloned().collect();

            let attached = node.is_attached();
            let listener = node.listener.borrow().clone();
            if let Some(listener) = listener {
                listener();
            }
            if attached && !node.is_attached() {
                trace!(node = node.id.0, "node detached by its own listener; children skipped");
                continue;
            }

            for child in children.into_iter().rev() {
                stack.push((child, Some(Rc::clone(&node))));
            }
        }
    }
}

/// A node in the notification tree.
///
/// Cloning yields another handle to the same node.
#[derive(Clone)]
pub struct SubscriptionNode {
    inner: Rc<NodeInner>,
}

impl SubscriptionNode {
    /// Create a detached node without a listener.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(NodeInner {
                id: NodeId::next(),
                listener: RefCell::new(None),
                children: RefCell::new(Vec::new()),
                link: RefCell::new(Link::Detached),
            }),
        }
    }

    /// This node's id.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Install the callback run at the start of every notification.
    pub fn set_listener(&self, listener: impl Fn() + 'static) {
        *self.inner.listener.borrow_mut() = Some(Rc::new(listener));
    }

    /// Remove the callback.
    pub fn clear_listener(&self) {
        self.inner.listener.borrow_mut().take();
    }

    /// Attach below `parent`, or directly to `store` when there is no parent.
    pub fn attach<S: 'static, A: 'static>(
        &self,
        parent: Option<&SubscriptionNode>,
        store: &StoreRef<S, A>,
    ) {
        match parent {
            Some(parent) => self.attach_to_node(parent),
            None => self.attach_to_store(&**store),
        }
    }

    /// Register as a child of `parent`.
    pub fn attach_to_node(&self, parent: &SubscriptionNode) {
        if self.is_attached() {
            trace!(node = self.inner.id.0, "attach ignored; node already attached");
            return;
        }
        if Rc::ptr_eq(&self.inner, &parent.inner) {
            debug!(node = self.inner.id.0, "refusing to attach a node to itself");
            return;
        }
        parent.inner.children.borrow_mut().push(Rc::clone(&self.inner));
        *self.inner.link.borrow_mut() = Link::Child(Rc::downgrade(&parent.inner));
        trace!(
            node = self.inner.id.0,
            parent = parent.inner.id.0,
            "subscription node attached"
        );
    }

    /// Register as a root listener of `store`.
    pub fn attach_to_store<S, A>(&self, store: &dyn Store<S, A>) {
        if self.is_attached() {
            trace!(node = self.inner.id.0, "attach ignored; node already attached");
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let subscription = store.subscribe(Rc::new(move || {
            if let Some(node) = weak.upgrade() {
                NodeInner::notify(&node);
            }
        }));
        *self.inner.link.borrow_mut() = Link::Store(subscription);
        trace!(node = self.inner.id.0, "root subscription node attached to store");
    }

    /// Detach from the parent node or store. Safe to call repeatedly.
    pub fn detach(&self) {
        let link = self.inner.link.replace(Link::Detached);
        match link {
            Link::Detached => return,
            Link::Child(parent) => {
                if let Some(parent) = parent.upgrade() {
                    parent
                        .children
                        .borrow_mut()
                        .retain(|child| !Rc::ptr_eq(child, &self.inner));
                }
            }
            Link::Store(subscription) => subscription.unsubscribe(),
        }

        let orphans = self.inner.children.borrow().len();
        if orphans > 0 {
            debug!(
                node = self.inner.id.0,
                orphans, "detached a node that still has children"
            );
        }
        trace!(node = self.inner.id.0, "subscription node detached");
    }

    /// Run this node's listener, then cascade to still-attached children.
    pub fn notify(&self) {
        NodeInner::notify(&self.inner);
    }

    /// Whether the node is attached to a parent or the store.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !matches!(&*self.inner.link.borrow(), Link::Detached)
    }

    /// Whether the node is subscribed to the store directly.
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(&*self.inner.link.borrow(), Link::Store(_))
    }

    /// The parent node, if attached below one that is still alive.
    #[must_use]
    pub fn parent(&self) -> Option<SubscriptionNode> {
        match &*self.inner.link.borrow() {
            Link::Child(parent) => parent.upgrade().map(|inner| SubscriptionNode { inner }),
            _ => None,
        }
    }

    /// Number of attached children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    /// Whether both handles refer to the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for SubscriptionNode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriptionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let link = match &*self.inner.link.borrow() {
            Link::Detached => "detached",
            Link::Child(_) => "child",
            Link::Store(_) => "root",
        };
        f.debug_struct("SubscriptionNode")
            .field("id", &self.inner.id.0)
            .field("link", &link)
            .field("children", &self.inner.children.borrow().len())
            .finish()
    }
}
