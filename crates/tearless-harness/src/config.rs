#![forbid(unsafe_code)]

//! Host tuning.

/// Default bound on render/commit passes per flush.
pub const DEFAULT_MAX_FLUSH_PASSES: usize = 32;

/// Host configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    /// Render/commit passes a single flush may run before it gives up with
    /// [`RenderError::Unsettled`](crate::RenderError::Unsettled).
    pub max_flush_passes: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_flush_passes: DEFAULT_MAX_FLUSH_PASSES,
        }
    }
}

impl HostConfig {
    /// Set the pass bound.
    #[must_use]
    pub fn max_flush_passes(mut self, passes: usize) -> Self {
        self.max_flush_passes = passes;
        self
    }

    pub(crate) fn pass_limit(&self) -> usize {
        self.max_flush_passes.max(1)
    }
}
