#![forbid(unsafe_code)]

//! Subscription and synchronization core for tear-free store bindings.
//!
//! A component tree binds to one [`Store`](tearless_core::Store) through three
//! capabilities:
//!
//! - **read a slice**: [`SelectionBinding`] runs a [`Selector`] during render,
//!   caches the committed selection, and requests a re-render only when a
//!   store notification changes it;
//! - **get a dispatcher**: [`use_dispatcher`] returns the store's stable
//!   dispatch handle;
//! - **bind action creators**: [`ActionBinder`] composes creators with the
//!   dispatcher and memoizes the result on a dependency list.
//!
//! Notifications fan out through a tree of [`SubscriptionNode`]s mirroring
//! the binding tree, so a parent always settles before its children observe
//! new state. Bindings find their store and ancestor node through an explicit
//! [`BindingContext`]; a [`Provider`] owns the root node.
//!
//! The runtime does not render anything. A host supplies the render/commit
//! checkpoints and a [`ForceUpdate`] primitive; `tearless-harness` is a
//! reference host.

pub mod actions;
pub mod context;
pub mod dispatch;
pub mod selection;
pub mod subscription;

pub use actions::{
    ActionBinder, ActionCreator, ActionCreators, BoundAction, BoundActions, bind_action_creators,
};
pub use context::{BindingContext, Provider};
pub use dispatch::use_dispatcher;
pub use selection::{Equality, ForceUpdate, Phase, SelectionBinding, SelectionError, Selector};
pub use subscription::{NodeId, SubscriptionNode};
