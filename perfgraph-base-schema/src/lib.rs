//! Basic types shared by the perfgraph crates.
//!
//! - [`metrics`]: the [`MetricName`](metrics::MetricName) type and predictive-metric prefixes.
//! - [`units`]: unit specifications, the [`UnitRegistry`](units::UnitRegistry) and the number
//!   formatter behind [`UnitInfo::render`](units::UnitInfo::render).
//! - [`color`]: the symbolic [`Color`](color::Color) palette and the legacy `NN/a` palette.

#![warn(missing_docs)]

pub mod color;
pub mod metrics;
pub mod units;
