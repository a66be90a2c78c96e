#![forbid(unsafe_code)]

//! Store configuration.
//!
//! With the `policy-config` feature, [`StoreConfig`] can be loaded from a
//! TOML document:
//!
//! ```toml
//! max_notify_passes = 16
//! ```

/// Default cap on consecutive notification passes for one top-level dispatch.
pub const DEFAULT_MAX_NOTIFY_PASSES: usize = 64;

/// Tuning knobs for a [`ReducerStore`](crate::ReducerStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct StoreConfig {
    /// Maximum number of notification passes a single top-level dispatch may
    /// run when listeners keep dispatching. Zero is treated as one.
    pub max_notify_passes: usize,
}

impl StoreConfig {
    /// Set the notification pass cap.
    #[must_use]
    pub fn max_notify_passes(mut self, passes: usize) -> Self {
        self.max_notify_passes = passes;
        self
    }

    /// Effective pass cap (never zero).
    #[must_use]
    pub(crate) fn pass_limit(&self) -> usize {
        self.max_notify_passes.max(1)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_notify_passes: DEFAULT_MAX_NOTIFY_PASSES,
        }
    }
}

/// Error returned when a policy document cannot be parsed.
#[cfg(feature = "policy-config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid TOML or has unexpected fields.
    #[error("invalid store policy: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(feature = "policy-config")]
impl StoreConfig {
    /// Parse a store policy from TOML. Missing keys fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the input is malformed.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }
}
