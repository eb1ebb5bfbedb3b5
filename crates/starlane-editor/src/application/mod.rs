//! Application layer: the editing use cases.
//!
//! Everything here is independent of how the configuration is stored or how
//! the user is prompted.  Those collaborators arrive as trait objects
//! ([`sync::ConfigStore`], [`sync::TokenStore`], [`prompt::TokenPrompt`],
//! [`prompt::Confirm`]) implemented in `crate::infrastructure`.

pub mod group_order;
pub mod item_editor;
pub mod prompt;
pub mod session;
pub mod sync;
pub mod working_copy;
