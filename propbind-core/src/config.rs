//! Per-binding options.
//!
//! Options are plain data so binding declarations can live in configuration:
//!
//! ```rust
//! use propbind_core::BindOptions;
//!
//! let opts: BindOptions = serde_json::from_str(r#"{"always_trigger": true}"#).unwrap();
//! assert!(opts.always_trigger);
//! assert!(!opts.skip_immediate_invoke);
//! ```

use serde::{Deserialize, Serialize};

/// How a single registration behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BindOptions {
    /// Deliver even when the change was written through the engine's own
    /// [`write_path`](crate::BindingHost::write_path).
    pub always_trigger: bool,

    /// Do not deliver the current value when the binding is created.
    pub skip_immediate_invoke: bool,
}

impl BindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always_trigger(mut self) -> Self {
        self.always_trigger = true;
        self
    }

    pub fn skip_immediate_invoke(mut self) -> Self {
        self.skip_immediate_invoke = true;
        self
    }
}
