#![forbid(unsafe_code)]

//! Reference host and test harness for tearless bindings.
//!
//! The runtime crate needs a host that renders, commits, and tears down
//! components. [`Host`] is a small, deterministic one: components are
//! closures that return a [`View`] (a text plus child [`Element`]s), hooks are
//! reached through [`RenderCx`], and output is the committed text of every
//! instance in tree order.
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use tearless_core::ReducerStore;
//! use tearless_harness::{Element, Host, View};
//! use tearless_runtime::Selector;
//!
//! let store = ReducerStore::new(0_i32, |n: &i32, d: &i32| n + d);
//! let mut host = Host::new(store.into_ref());
//! host.mount(Element::new(|cx| {
//!     let n = cx.use_selection(Selector::new(|s: &Rc<i32>| **s))?;
//!     Ok(View::text(n.to_string()))
//! }))
//! .unwrap();
//!
//! host.dispatch(2).unwrap();
//! assert_eq!(host.output(), vec!["2"]);
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod host;
pub mod view;

pub use config::{DEFAULT_MAX_FLUSH_PASSES, HostConfig};
pub use error::RenderError;
pub use hooks::{RenderCx, StateHandle};
pub use host::{Host, InstanceId};
pub use view::{Component, Element, View};
