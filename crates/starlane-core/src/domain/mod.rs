//! Domain entities for Starlane.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the application is the **domain**.  Domain code has
//! no imports from HTTP clients, storage back-ends or rendering surfaces, and
//! can be compiled and tested on any platform without external setup.
//!
//! The editor (`starlane-editor`) depends on these types, but nothing here
//! depends on the editor.

/// The configuration document: groups, items and page settings.
///
/// See [`config::ConfigModel`] for the main type.
pub mod config;

/// Read-only projection of a configuration onto the dashboard display.
pub mod dashboard;

/// Drag-and-drop insertion heuristic.
pub mod ordering;
