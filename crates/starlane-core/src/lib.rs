//! # starlane-core
//!
//! Shared library for the Starlane link dashboard containing the editable
//! configuration model, the drag-and-drop ordering heuristic, and the
//! read-only dashboard projection.
//!
//! It has zero dependencies on network sockets, storage, or any rendering
//! surface, so every rule here can be unit-tested in isolation.
//!
//! # Architecture overview (for beginners)
//!
//! Starlane renders named groups of bookmark-like items (name, URL, icon)
//! loaded from a JSON document, and lets an administrator edit that document
//! through a settings panel.  This crate is the shared foundation.  It defines:
//!
//! - **`domain::config`** – The canonical [`ConfigModel`] plus its
//!   normalisation, validation and JSON (de)serialisation rules.
//!
//! - **`domain::ordering`** – The pure position heuristic that decides where a
//!   dragged group lands in the ordered group list.
//!
//! - **`domain::dashboard`** – The projection of a validated model onto link
//!   cards, group sections and sidebar entries, including the live text filter.

pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `starlane_core::ConfigModel` instead of `starlane_core::domain::config::ConfigModel`.
pub use domain::config::{
    normalize, parse, serialize, validate_group_name, Background, BackgroundType, ConfigModel,
    FormatError, Group, Item, Theme, ValidationError,
};
pub use domain::dashboard::{DashboardPage, DashboardView};
pub use domain::ordering::{insertion_index, SlotBox};
