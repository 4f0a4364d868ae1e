//! Conditions comparing two metric expressions.
//!
//! The root type is [`ConditionalMetricExpression`].

use perfgraph_base_schema::metrics::MetricName;
use perfgraph_base_schema::units::UnitRegistry;
use perfgraph_metrics::TranslatedMetrics;
use serde::{Deserialize, Serialize};

use crate::{EvaluationError, MetricExpression};

macro_rules! impl_cmp_condition {
    ($struct_name:ident, $operator:tt, $doc:literal) => {
        #[doc = $doc]
        ///
        /// Only the values are compared, units and colors are ignored.
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        pub struct $struct_name {
            /// The left hand side.
            pub left: MetricExpression,
            /// The right hand side.
            pub right: MetricExpression,
        }

        impl $struct_name {
            fn evaluate(
                &self,
                metrics: &TranslatedMetrics,
                units: &UnitRegistry,
            ) -> Result<bool, EvaluationError> {
                let left = self.left.evaluate(metrics, units)?;
                let right = self.right.evaluate(metrics, units)?;
                Ok(left.value $operator right.value)
            }

            fn operands(&self) -> [&MetricExpression; 2] {
                [&self.left, &self.right]
            }
        }
    };
}

impl_cmp_condition!(GreaterThan, >, "A condition that applies `>`.");
impl_cmp_condition!(GreaterEqualThan, >=, "A condition that applies `>=`.");
impl_cmp_condition!(LessThan, <, "A condition that applies `<`.");
impl_cmp_condition!(LessEqualThan, <=, "A condition that applies `<=`.");

/// A comparison of two metric expressions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum ConditionalMetricExpression {
    /// A condition that applies `>`.
    GreaterThan(GreaterThan),
    /// A condition that applies `>=`.
    GreaterEqualThan(GreaterEqualThan),
    /// A condition that applies `<`.
    LessThan(LessThan),
    /// A condition that applies `<=`.
    LessEqualThan(LessEqualThan),
}

impl ConditionalMetricExpression {
    /// Evaluates both sides and compares their values.
    pub fn evaluate(
        &self,
        metrics: &TranslatedMetrics,
        units: &UnitRegistry,
    ) -> Result<bool, EvaluationError> {
        match self {
            Self::GreaterThan(condition) => condition.evaluate(metrics, units),
            Self::GreaterEqualThan(condition) => condition.evaluate(metrics, units),
            Self::LessThan(condition) => condition.evaluate(metrics, units),
            Self::LessEqualThan(condition) => condition.evaluate(metrics, units),
        }
    }

    /// Returns the names of all metrics referenced by either side.
    pub fn metric_names(&self) -> Vec<&MetricName> {
        let [left, right] = match self {
            Self::GreaterThan(condition) => condition.operands(),
            Self::GreaterEqualThan(condition) => condition.operands(),
            Self::LessThan(condition) => condition.operands(),
            Self::LessEqualThan(condition) => condition.operands(),
        };

        let mut names = left.metric_names();
        for name in right.metric_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}
