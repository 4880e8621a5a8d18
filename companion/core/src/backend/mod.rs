//! Model Runtime Integration
//!
//! This module defines the seam between the core and whatever runtime
//! actually hosts the language model on the device. The core never loads
//! weights or tokenizes text itself; it asks a [`ModelLoader`] for a
//! [`ModelHandle`] and drives that handle.
//!
//! # Usage
//!
//! ```ignore
//! use companion_core::backend::{ModelLoader, ModelOptions};
//!
//! let mut handle = loader.load("/data/models/pet.task", &ModelOptions::default())?;
//! let text = handle.generate("You are a cat. \n\nUser: hi")?;
//! handle.close()?;
//! ```

mod traits;

pub use traits::{ModelHandle, ModelLoader, ModelOptions, DEFAULT_MAX_TOP_K};
