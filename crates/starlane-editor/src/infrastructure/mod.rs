//! Infrastructure layer: storage tiers, stores, files, settings and the
//! terminal.
//!
//! Each sub-module implements a trait defined in `crate::application` or
//! provides an adapter the binary wires together.

pub mod console;
pub mod files;
pub mod kv;
pub mod settings;
pub mod store;
pub mod token_cache;
