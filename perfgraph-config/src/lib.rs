//! Configuration for the perfgraph CLI.
//!
//! The configuration lives in a folder containing `config.yml`. Besides logging and display
//! settings, it lists plugin bundles: YAML or JSON files that declare metrics, translations,
//! graphs and perfometers. [`Config::plugins`] loads all bundles into the registries used for
//! translation and graph selection.

#![warn(missing_docs)]

mod bundle;
mod config;

pub use self::bundle::*;
pub use self::config::*;
