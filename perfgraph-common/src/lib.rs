//! Common functionality for the perfgraph crates.
//!
//! Currently this crate hosts the macros that implement string-based `serde` support for the
//! small, closed enums used across the workspace (line types, consolidation functions, scalar
//! kinds, symbolic colors).

#![warn(missing_docs)]

mod macros;
