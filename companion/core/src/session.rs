//! Inference Session
//!
//! Owns the lifecycle of the model handle. A handle is created lazily on the
//! first request, reused while the requested model path stays the same,
//! rebuilt when the path changes, and closed on [`InferenceSession::release`]
//! or drop.
//!
//! # Failure Handling
//!
//! - A failed load leaves the session empty, so the next call retries from
//!   scratch.
//! - A failed generation leaves the handle in place; one bad request does not
//!   throw away a loaded model.
//! - Close failures are logged and swallowed. The slot is cleared either way.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::backend::{ModelHandle, ModelLoader, ModelOptions};
use crate::error::CompanionError;

/// A live handle and the path it was built from
struct ActiveModel {
    model_path: String,
    handle: Box<dyn ModelHandle>,
}

/// Lazily-constructed, reusable model handle
pub struct InferenceSession {
    loader: Arc<dyn ModelLoader>,
    options: ModelOptions,
    active: Option<ActiveModel>,
}

impl InferenceSession {
    /// Create an empty session; nothing is loaded until [`Self::ensure_ready`]
    pub fn new(loader: Arc<dyn ModelLoader>, options: ModelOptions) -> Self {
        Self {
            loader,
            options,
            active: None,
        }
    }

    /// Make sure a handle built from `model_path` is loaded
    ///
    /// No-op when the current handle already came from `model_path`.
    /// Otherwise any existing handle is released first and a new one loaded.
    ///
    /// # Errors
    ///
    /// Returns [`CompanionError::SessionInit`] if the runtime fails to load
    /// the model. The session is left empty in that case.
    pub fn ensure_ready(&mut self, model_path: &str) -> Result<(), CompanionError> {
        if let Some(active) = &self.active {
            if active.model_path == model_path {
                debug!(model_path, "Reusing existing model handle");
                return Ok(());
            }
            info!(
                from = %active.model_path,
                to = model_path,
                "Model path changed, releasing previous handle"
            );
            self.release();
        }

        info!(model_path, runtime = self.loader.name(), "Loading model");
        let started = Instant::now();
        let handle = self
            .loader
            .load(model_path, &self.options)
            .map_err(|source| CompanionError::SessionInit {
                model_path: model_path.to_string(),
                source,
            })?;

        info!(
            model_path,
            elapsed = ?started.elapsed(),
            "Model loaded"
        );
        self.active = Some(ActiveModel {
            model_path: model_path.to_string(),
            handle,
        });
        Ok(())
    }

    /// Generate text for `instruction` with the loaded handle
    ///
    /// # Errors
    ///
    /// Returns [`CompanionError::NotReady`] if nothing is loaded, or
    /// [`CompanionError::Inference`] if the model fails. The handle stays
    /// loaded either way.
    pub fn infer(&mut self, instruction: &str) -> Result<String, CompanionError> {
        let active = self.active.as_mut().ok_or(CompanionError::NotReady)?;

        let started = Instant::now();
        let text = active
            .handle
            .generate(instruction)
            .map_err(CompanionError::Inference)?;

        debug!(
            model_path = %active.model_path,
            prompt_len = instruction.len(),
            response_len = text.len(),
            elapsed = ?started.elapsed(),
            "Inference complete"
        );
        Ok(text)
    }

    /// Close the handle if one is loaded
    ///
    /// Safe to call repeatedly. Close errors are logged, not returned.
    pub fn release(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        match active.handle.close() {
            Ok(()) => info!(model_path = %active.model_path, "Model handle released"),
            Err(e) => {
                let err = CompanionError::Release(e);
                warn!(model_path = %active.model_path, error = %err, "Ignoring release failure");
            }
        }
    }

    /// Whether a handle is loaded
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.active.is_some()
    }

    /// Path of the loaded model, if any
    #[must_use]
    pub fn model_path(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.model_path.as_str())
    }
}

impl Drop for InferenceSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for InferenceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceSession")
            .field("runtime", &self.loader.name())
            .field("options", &self.options)
            .field("model_path", &self.model_path())
            .finish()
    }
}
