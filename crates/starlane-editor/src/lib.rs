//! # starlane-editor
//!
//! Editing session, persistence and command-line front end for the Starlane
//! link dashboard.
//!
//! ```text
//! application/     EditorSession, GroupOrderEditor, ItemEditor, save protocol
//!   ↕ traits (ConfigStore, TokenStore, TokenPrompt, Confirm)
//! infrastructure/  HTTP and local stores, token tiers, files, settings, console
//! ```
//!
//! The binary in `main.rs` and the integration tests in `tests/` share this
//! module tree.

pub mod application;
pub mod infrastructure;

pub use application::session::EditorSession;
pub use application::sync::{load_dashboard, save_session, ConfigStore, LoadError, SaveError};
