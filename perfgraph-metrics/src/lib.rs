//! Parsing of performance data and translation into metrics.
//!
//! Monitoring checks report their measurements as performance data ("perfdata"), a whitespace
//! separated list of `name=value;warn;crit;min;max` fields. This crate turns such strings into
//! a table of [`TranslatedMetric`]s in three steps:
//!
//!  1. [`parse_perf_data`] splits the string into [`RawSample`]s.
//!  2. The [`TranslationTable`] of the [`MetricRegistry`] renames and scales each sample according
//!     to the rules of its check command.
//!  3. The [`MetricRegistry`] resolves title, unit and color of each canonical metric name.
//!
//! [`translate_metrics`] runs the last two steps:
//!
//! ```
//! use perfgraph_base_schema::units::UnitRegistry;
//! use perfgraph_metrics::{
//!     MetricRegistry, ParseOptions, ResolutionContext, parse_perf_data, translate_metrics,
//! };
//!
//! let registry = MetricRegistry::new();
//! let units = UnitRegistry::new();
//!
//! let perf_data = parse_perf_data("load1=0.42;4;8;0;", None, ParseOptions::default()).unwrap();
//! let metrics = translate_metrics(
//!     &perf_data.samples,
//!     perf_data.check_command.as_deref(),
//!     &registry,
//!     &units,
//!     ResolutionContext::new(),
//! );
//!
//! let load = metrics.get("load1").unwrap();
//! assert_eq!(load.value, 0.42);
//! assert_eq!(load.title, "Load1");
//! ```

#![warn(missing_docs)]

mod info;
mod perfdata;
mod registry;
mod translated;
mod translation;

pub use self::info::*;
pub use self::perfdata::*;
pub use self::registry::*;
pub use self::translated::*;
pub use self::translation::*;
