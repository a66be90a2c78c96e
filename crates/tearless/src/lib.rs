#![forbid(unsafe_code)]

//! Tear-free bindings between a component tree and a central store.
//!
//! This crate re-exports the workspace behind one name:
//!
//! - [`core`]: the store, dispatcher, and equality primitives.
//! - [`runtime`]: subscription nodes, selection bindings, the dispatcher
//!   accessor, and action binders.
//! - [`harness`] (feature `harness`, on by default): a reference host that
//!   renders and commits components against the runtime.
//!
//! Most code only needs the [`prelude`].
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use tearless::prelude::*;
//!
//! let store = ReducerStore::new(vec![1_u32, 2, 3], |items: &Vec<u32>, id: &u32| {
//!     items.iter().copied().filter(|i| i != id).collect()
//! });
//! let mut host = Host::new(store.into_ref());
//! host.mount(Element::new(|cx| {
//!     let len = cx.use_selection(Selector::new(|s: &Rc<Vec<u32>>| s.len()))?;
//!     Ok(View::text(len.to_string()))
//! }))
//! .unwrap();
//!
//! host.dispatch(2).unwrap();
//! assert_eq!(host.output(), vec!["2"]);
//! ```

pub use tearless_core as core;
#[cfg(feature = "harness")]
pub use tearless_harness as harness;
pub use tearless_runtime as runtime;

pub use tearless_core::{
    Dispatcher, IdentityEq, ReducerStore, SelectorFault, ShallowEq, Store, StoreConfig, StoreRef,
    StoreSubscription, shallow_equal,
};
pub use tearless_runtime::{
    ActionBinder, ActionCreator, ActionCreators, BindingContext, BoundAction, BoundActions,
    ForceUpdate, Provider, SelectionBinding, SelectionError, Selector, SubscriptionNode,
    bind_action_creators, use_dispatcher,
};

/// Common imports for binding components to a store.
pub mod prelude {
    pub use tearless_core::{
        Dispatcher, IdentityEq, ReducerStore, ShallowEq, Store, StoreRef, shallow_equal,
    };
    pub use tearless_runtime::{
        ActionCreator, ActionCreators, BindingContext, BoundActions, Provider, SelectionError,
        Selector, use_dispatcher,
    };

    #[cfg(feature = "harness")]
    pub use tearless_harness::{Element, Host, RenderCx, RenderError, StateHandle, View};
}
