#![forbid(unsafe_code)]

//! Host render failures.

use std::error::Error;

use tearless_runtime::SelectionError;

/// Why a flush failed. The failed pass is discarded wholesale.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A render-time selection failed.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// A component called its hooks in a different order or number than on
    /// its first render.
    #[error("hook {index} changed between renders: expected {expected}, found {found}")]
    HookOrder {
        /// Call-order position of the mismatching hook.
        index: usize,
        /// Hook kind recorded on the first render.
        expected: &'static str,
        /// Hook kind requested now.
        found: &'static str,
    },

    /// Two children of one parent share a key.
    #[error("duplicate child key {key:?}")]
    DuplicateKey {
        /// The repeated key.
        key: String,
    },

    /// Renders kept scheduling more renders.
    #[error("render did not settle after {passes} passes")]
    Unsettled {
        /// Passes run before giving up.
        passes: usize,
    },

    /// A component reported its own failure.
    #[error("component failed: {0}")]
    Component(#[source] Box<dyn Error + 'static>),
}

impl RenderError {
    /// Wrap a component's own error.
    pub fn component<E: Error + 'static>(err: E) -> Self {
        Self::Component(Box::new(err))
    }
}
