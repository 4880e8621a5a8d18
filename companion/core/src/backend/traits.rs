//! Model Runtime Traits
//!
//! Trait definitions for the on-device model runtime. Hosts implement
//! [`ModelLoader`] once for their runtime; the core handles when handles are
//! created, reused and closed.
//!
//! # Design Philosophy
//!
//! Both traits are blocking. Loading a model and generating text are long,
//! CPU/GPU-bound native calls, and the core runs them on its own dedicated
//! worker thread rather than on an async executor.

use serde::{Deserialize, Serialize};

/// Default top-k sampling bound passed to the runtime
pub const DEFAULT_MAX_TOP_K: u32 = 64;

/// Options applied when constructing a handle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Upper bound on top-k sampling
    pub max_top_k: u32,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            max_top_k: DEFAULT_MAX_TOP_K,
        }
    }
}

impl ModelOptions {
    /// Set the top-k bound
    #[must_use]
    pub fn with_max_top_k(mut self, max_top_k: u32) -> Self {
        self.max_top_k = max_top_k.max(1);
        self
    }
}

/// A loaded model instance
///
/// Expensive to create and stateful; the session keeps one alive across
/// requests and is the only code that calls [`ModelHandle::close`].
pub trait ModelHandle: Send {
    /// Run the model on `prompt` and return the generated text
    fn generate(&mut self, prompt: &str) -> anyhow::Result<String>;

    /// Release the runtime resources behind this handle
    ///
    /// Called at most once. The handle is dropped afterwards whether or not
    /// this succeeds.
    fn close(&mut self) -> anyhow::Result<()>;
}

/// Factory for model handles
///
/// Implement this trait to plug in a model runtime.
pub trait ModelLoader: Send + Sync {
    /// Runtime name for logs (e.g., "mediapipe", "llama.cpp")
    fn name(&self) -> &str;

    /// Load the model stored at `model_path`
    fn load(&self, model_path: &str, options: &ModelOptions)
        -> anyhow::Result<Box<dyn ModelHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_options_builder() {
        let options = ModelOptions::default();
        assert_eq!(options.max_top_k, DEFAULT_MAX_TOP_K);

        let options = options.with_max_top_k(16);
        assert_eq!(options.max_top_k, 16);

        let options = ModelOptions::default().with_max_top_k(0);
        assert_eq!(options.max_top_k, 1);
    }
}
