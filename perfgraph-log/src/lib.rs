//! Logging facade for perfgraph.
//!
//! # Setup
//!
//! To enable logging, invoke the [`init`] function with a [`LogConfig`]. The configuration
//! implements `serde` traits, so it can be read from the `logging` section of the configuration
//! file. This requires the `init` feature.
//!
//! ```
//! # #[cfg(feature = "init")] {
//! use perfgraph_log::LogConfig;
//!
//! let log_config = LogConfig {
//!     enable_backtraces: true,
//!     ..LogConfig::default()
//! };
//!
//! perfgraph_log::init(&log_config);
//! # }
//! ```
//!
//! # Logging
//!
//! The facade re-exports the five logging macros of `tracing`: [`error!`], [`warn!`], [`info!`],
//! [`debug!`] and [`trace!`].
//!
//! ## Conventions
//!
//! Log messages start lowercase and end without punctuation. Prefer short and precise log
//! messages over verbose text, and attach context as structured fields:
//!
//! - [`error!`] for bugs and invalid behavior.
//! - [`warn!`] for undesirable input that is recovered from, such as dropped perfdata fields.
//! - [`info!`] for messages relevant to the average user.
//! - [`debug!`] for messages usually relevant to debugging.
//! - [`trace!`] for full auxiliary information.
//!
//! ```
//! let error = std::io::Error::other("oh no!");
//! perfgraph_log::warn!(
//!     error = &error as &dyn std::error::Error,
//!     field = "load1=abc",
//!     "dropping perfdata field"
//! );
//! ```
//!
//! ## Logging Error Types
//!
//! To format an error together with all of its causes, use the [`LogError`] wrapper.
//!
//! ```
//! use perfgraph_log::LogError;
//!
//! let custom_error = std::io::Error::other("oh no!");
//! perfgraph_log::error!("operation failed: {}", LogError(&custom_error));
//! ```
//!
//! # Testing
//!
//! For unit testing there is a separate initialization macro [`init_test!`] that should be called
//! at the beginning of the test. It logs to the test runner and enables all levels for the
//! calling crate. This requires the `test` feature.

#![warn(missing_docs)]

#[cfg(feature = "init")]
mod setup;
#[cfg(feature = "init")]
pub use setup::*;

#[cfg(feature = "test")]
mod test;
#[cfg(feature = "test")]
pub use test::*;

mod utils;
pub use utils::*;

#[doc(inline)]
pub use tracing::{Level, debug, error, info, trace, warn};
