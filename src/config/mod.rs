// src/config/mod.rs

//! Runtime settings for cmdpipe.
//!
//! Responsibilities:
//! - Define the settings model (`model.rs`).
//! - Load an optional TOML file and apply `CMDPIPE_*` overrides (`loader.rs`).
//! - Validate the result (`validate.rs`).
//!
//! Settings are passed explicitly into the dispatcher, the executor and the
//! broker, so independent instances can coexist in one process.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{apply_env_overrides, load_from_path, load_settings};
pub use model::{RawSettings, Settings};
