//! Graph templates and perfometers.
//!
//! Graphs come from two sources, both kept in a [`GraphRegistry`]:
//!
//!  - Plugins declare [`GraphPlugin`]s built from [`Quantity`](perfgraph_expression::Quantity)
//!    objects. They are converted into a [`GraphTemplate`] whenever needed.
//!  - The legacy `graph_info` table holds [`RawGraphTemplate`]s with textual expressions, which
//!    are parsed once on registration.
//!
//! For a check result, [`get_graph_templates`] selects the templates whose metrics are available,
//! adds lines for predictive metrics and creates generic templates for every metric that is not
//! drawn otherwise. [`find_matching_perfometer`] selects the perfometer in the same way.
//!
//! ```
//! use perfgraph_base_schema::units::UnitRegistry;
//! use perfgraph_graphs::{GraphRegistry, RawGraphTemplate, get_graph_templates};
//! use perfgraph_metrics::{
//!     MetricRegistry, ParseOptions, ResolutionContext, parse_perf_data, translate_metrics,
//! };
//!
//! let mut graphs = GraphRegistry::new();
//! let raw: RawGraphTemplate =
//!     serde_json::from_str(r#"{"id": "cpu", "metrics": [["user", "stack"], ["system", "stack"]]}"#)
//!         .unwrap();
//! graphs.register_legacy_graph(&raw).unwrap();
//!
//! let registry = MetricRegistry::new();
//! let units = UnitRegistry::new();
//! let perf_data = parse_perf_data("user=1 system=2 load=3", None, ParseOptions::default()).unwrap();
//! let metrics = translate_metrics(
//!     &perf_data.samples,
//!     None,
//!     &registry,
//!     &units,
//!     ResolutionContext::new(),
//! );
//!
//! let ids: Vec<String> = get_graph_templates(&graphs, &registry, &metrics, &units)
//!     .into_iter()
//!     .map(|template| template.id)
//!     .collect();
//! assert_eq!(ids, ["cpu", "METRIC_load"]);
//! ```

#![warn(missing_docs)]

mod applicability;
mod legacy;
mod perfometer;
mod plugin;
mod registry;
mod template;

pub use self::applicability::*;
pub use self::legacy::*;
pub use self::perfometer::*;
pub use self::plugin::*;
pub use self::registry::*;
pub use self::template::*;
