//! Metric expressions and their evaluation.
//!
//! Derived quantities of graphs and perfometers are described by [`MetricExpression`]s. There
//! are two ways to build them:
//!
//!  - Textual expressions in reverse polish notation, such as `user,system,+#ff0000`, are parsed
//!    with [`parse_expression`]. Comparisons such as `fs_used,fs_size,>` are parsed with
//!    [`parse_conditional_expression`] into a [`ConditionalMetricExpression`].
//!  - Plugins declare [`Quantity`] objects, which are converted with [`Quantity::to_expression`].
//!
//! Expressions are evaluated against a table of translated metrics:
//!
//! ```
//! use perfgraph_base_schema::units::UnitRegistry;
//! use perfgraph_expression::parse_expression;
//! use perfgraph_metrics::{
//!     MetricRegistry, ParseOptions, ResolutionContext, parse_perf_data, translate_metrics,
//! };
//!
//! let units = UnitRegistry::new();
//! let perf_data = parse_perf_data("fs_used=20;;;0;80", None, ParseOptions::default()).unwrap();
//! let metrics = translate_metrics(
//!     &perf_data.samples,
//!     None,
//!     &MetricRegistry::new(),
//!     &units,
//!     ResolutionContext::new(),
//! );
//!
//! let evaluated = parse_expression("fs_used(%)")
//!     .unwrap()
//!     .evaluate(&metrics, &units)
//!     .unwrap();
//!
//! assert_eq!(evaluated.value, 25.0);
//! assert_eq!(evaluated.render(), "25 %");
//! ```

#![warn(missing_docs)]

mod condition;
mod evaluate;
mod expression;
mod quantity;
mod rpn;
mod title;

pub use self::condition::*;
pub use self::evaluate::*;
pub use self::expression::*;
pub use self::quantity::*;
pub use self::rpn::*;
pub use self::title::*;
