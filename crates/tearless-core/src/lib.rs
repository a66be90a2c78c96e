#![forbid(unsafe_code)]

//! Core collaborators for tearless state bindings.
//!
//! This crate holds the pieces the binding runtime consumes but does not own:
//!
//! - [`store`]: the centrally-dispatched state container ([`Store`],
//!   [`ReducerStore`], [`Dispatcher`], [`StoreSubscription`]).
//! - [`equality`]: one-level identity and shallow comparison used to decide
//!   whether a selected slice changed.
//! - [`error`]: the shared selector failure type.
//! - [`config`]: store tuning knobs.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`); a store and every
//! binding attached to it live on one thread.

pub mod config;
pub mod equality;
pub mod error;
pub mod store;

pub use config::StoreConfig;
#[cfg(feature = "policy-config")]
pub use config::ConfigError;
pub use equality::{IdentityEq, ShallowEq, shallow_equal};
pub use error::SelectorFault;
pub use store::{Dispatcher, Listener, Reducer, ReducerStore, Store, StoreRef, StoreSubscription};
