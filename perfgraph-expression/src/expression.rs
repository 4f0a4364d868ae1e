//! The metric expression tree.
//!
//! The root type is [`MetricExpression`].

use std::str::FromStr;

use itertools::Itertools;
use perfgraph_base_schema::metrics::MetricName;
use perfgraph_base_schema::units::UnitSpec;
use perfgraph_common::{impl_display_as_str, impl_str_serde};
use perfgraph_metrics::ScalarKind;
use serde::{Deserialize, Serialize};

/// The function used to consolidate time series of a metric.
///
/// Consolidation only matters when fetching historic data, it does not change the evaluated value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConsolidationFunction {
    /// The maximum of each interval.
    Max,
    /// The minimum of each interval.
    Min,
    /// The average of each interval.
    Average,
}

impl ConsolidationFunction {
    /// Returns the name of the function as used in expression suffixes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Min => "min",
            Self::Average => "average",
        }
    }
}

/// Error returned when parsing an unknown [`ConsolidationFunction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown consolidation function")]
pub struct ParseConsolidationFunctionError;

impl FromStr for ConsolidationFunction {
    type Err = ParseConsolidationFunctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "max" => Self::Max,
            "min" => Self::Min,
            "average" => Self::Average,
            _ => return Err(ParseConsolidationFunctionError),
        })
    }
}

impl_display_as_str!(ConsolidationFunction);
impl_str_serde!(ConsolidationFunction, "a consolidation function");

/// A reference to a translated metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// The canonical name of the metric.
    pub name: MetricName,
    /// The consolidation function for time series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidation: Option<ConsolidationFunction>,
}

impl Metric {
    /// Creates a reference to the metric without a consolidation function.
    pub fn new(name: impl Into<MetricName>) -> Self {
        Self {
            name: name.into(),
            consolidation: None,
        }
    }
}

/// A constant value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    /// The value.
    pub value: f64,
    /// The unit of the value, neutral if not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitSpec>,
    /// The color as `#rrggbb`, black if not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// One of the scalars of a metric, such as its warning level.
///
/// The kind of scalar is determined by the [`MetricExpression`] variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalarOf {
    /// The metric the scalar belongs to.
    pub metric: Metric,
    /// The color as `#rrggbb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The sum of several expressions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sum {
    /// The summands. The sum has the unit of the first one.
    pub terms: Vec<MetricExpression>,
    /// The color as `#rrggbb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The product of several expressions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// The factors.
    pub factors: Vec<MetricExpression>,
    /// The unit of the product.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitSpec>,
    /// The color as `#rrggbb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The difference of two expressions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    /// The value subtracted from. The difference has its unit.
    pub minuend: Box<MetricExpression>,
    /// The value that is subtracted.
    pub subtrahend: Box<MetricExpression>,
    /// The color as `#rrggbb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The quotient of two expressions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fraction {
    /// The numerator.
    pub dividend: Box<MetricExpression>,
    /// The denominator.
    pub divisor: Box<MetricExpression>,
    /// The unit of the quotient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitSpec>,
    /// The color as `#rrggbb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// One expression as percentage of another.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Percent {
    /// The part.
    pub percent_value: Box<MetricExpression>,
    /// The whole.
    pub base_value: Box<MetricExpression>,
}

/// The operands of a variadic function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operands {
    /// The operands in order.
    pub operands: Vec<MetricExpression>,
}

/// An expression over translated metrics.
///
/// Expressions are built by parsing textual RPN expressions (see
/// [`parse_expression`](crate::parse_expression)), from declarative
/// [`Quantity`](crate::Quantity) objects, or directly through the constructors on this type.
/// They are evaluated with [`MetricExpression::evaluate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum MetricExpression {
    /// The value of a metric.
    Metric(Metric),
    /// A constant value.
    Constant(Constant),
    /// The warning level of a metric.
    WarningOf(ScalarOf),
    /// The critical level of a metric.
    CriticalOf(ScalarOf),
    /// The lower bound of a metric.
    MinimumOf(ScalarOf),
    /// The upper bound of a metric.
    MaximumOf(ScalarOf),
    /// The sum of several expressions.
    Sum(Sum),
    /// The product of several expressions.
    Product(Product),
    /// The difference of two expressions.
    Difference(Difference),
    /// The quotient of two expressions.
    Fraction(Fraction),
    /// One expression as percentage of another.
    Percent(Percent),
    /// The smallest of several expressions.
    Minimum(Operands),
    /// The largest of several expressions.
    Maximum(Operands),
    /// The arithmetic mean of several expressions.
    Average(Operands),
    /// The result of the first of several expressions.
    Merge(Operands),
}

impl MetricExpression {
    /// Returns an expression for the value of a metric.
    pub fn metric(name: impl Into<MetricName>) -> Self {
        Self::Metric(Metric::new(name))
    }

    /// Returns a constant without unit and color.
    pub fn constant(value: f64) -> Self {
        Self::Constant(Constant {
            value,
            unit: None,
            color: None,
        })
    }

    /// Returns an expression for a scalar of a metric.
    pub fn scalar(kind: ScalarKind, metric: Metric) -> Self {
        let scalar = ScalarOf {
            metric,
            color: None,
        };

        match kind {
            ScalarKind::Warn => Self::WarningOf(scalar),
            ScalarKind::Crit => Self::CriticalOf(scalar),
            ScalarKind::Min => Self::MinimumOf(scalar),
            ScalarKind::Max => Self::MaximumOf(scalar),
        }
    }

    /// Returns the sum of the given terms.
    pub fn sum(terms: Vec<Self>) -> Self {
        Self::Sum(Sum { terms, color: None })
    }

    /// Returns the product of the given factors.
    pub fn product(factors: Vec<Self>) -> Self {
        Self::Product(Product {
            factors,
            unit: None,
            color: None,
        })
    }

    /// Returns `minuend - subtrahend`.
    pub fn difference(minuend: Self, subtrahend: Self) -> Self {
        Self::Difference(Difference {
            minuend: Box::new(minuend),
            subtrahend: Box::new(subtrahend),
            color: None,
        })
    }

    /// Returns `dividend / divisor`.
    pub fn fraction(dividend: Self, divisor: Self) -> Self {
        Self::Fraction(Fraction {
            dividend: Box::new(dividend),
            divisor: Box::new(divisor),
            unit: None,
            color: None,
        })
    }

    /// Returns `percent_value` as percentage of `base_value`.
    pub fn percent(percent_value: Self, base_value: Self) -> Self {
        Self::Percent(Percent {
            percent_value: Box::new(percent_value),
            base_value: Box::new(base_value),
        })
    }

    /// Returns the smallest of the given operands.
    pub fn minimum(operands: Vec<Self>) -> Self {
        Self::Minimum(Operands { operands })
    }

    /// Returns the largest of the given operands.
    pub fn maximum(operands: Vec<Self>) -> Self {
        Self::Maximum(Operands { operands })
    }

    /// Returns the arithmetic mean of the given operands.
    pub fn average(operands: Vec<Self>) -> Self {
        Self::Average(Operands { operands })
    }

    /// Returns an expression evaluating to its first operand, errors included.
    pub fn merge(operands: Vec<Self>) -> Self {
        Self::Merge(Operands { operands })
    }

    /// Returns the scalar kind and scalar if this is a scalar expression.
    pub fn as_scalar(&self) -> Option<(ScalarKind, &ScalarOf)> {
        match self {
            Self::WarningOf(scalar) => Some((ScalarKind::Warn, scalar)),
            Self::CriticalOf(scalar) => Some((ScalarKind::Crit, scalar)),
            Self::MinimumOf(scalar) => Some((ScalarKind::Min, scalar)),
            Self::MaximumOf(scalar) => Some((ScalarKind::Max, scalar)),
            _ => None,
        }
    }

    /// Returns the direct children of this expression.
    fn children(&self) -> Vec<&Self> {
        match self {
            Self::Metric(_)
            | Self::Constant(_)
            | Self::WarningOf(_)
            | Self::CriticalOf(_)
            | Self::MinimumOf(_)
            | Self::MaximumOf(_) => Vec::new(),
            Self::Sum(sum) => sum.terms.iter().collect(),
            Self::Product(product) => product.factors.iter().collect(),
            Self::Difference(difference) => vec![&*difference.minuend, &*difference.subtrahend],
            Self::Fraction(fraction) => vec![&*fraction.dividend, &*fraction.divisor],
            Self::Percent(percent) => vec![&*percent.percent_value, &*percent.base_value],
            Self::Minimum(operands)
            | Self::Maximum(operands)
            | Self::Average(operands)
            | Self::Merge(operands) => operands.operands.iter().collect(),
        }
    }

    fn collect_metric_names<'a>(&'a self, names: &mut Vec<&'a MetricName>) {
        match self {
            Self::Metric(metric) => names.push(&metric.name),
            _ => match self.as_scalar() {
                Some((_, scalar)) => names.push(&scalar.metric.name),
                None => {
                    for child in self.children() {
                        child.collect_metric_names(names);
                    }
                }
            },
        }
    }

    /// Returns the names of all metrics referenced by this expression.
    ///
    /// Names are returned in the order they appear, each name once. Metrics referenced through
    /// their scalars are included.
    pub fn metric_names(&self) -> Vec<&MetricName> {
        let mut names = Vec::new();
        self.collect_metric_names(&mut names);
        names.into_iter().unique().collect()
    }

    /// Returns all scalars referenced by this expression in the order they appear.
    pub fn scalars(&self) -> Vec<(&MetricName, ScalarKind)> {
        match self.as_scalar() {
            Some((kind, scalar)) => vec![(&scalar.metric.name, kind)],
            None => self
                .children()
                .into_iter()
                .flat_map(|child| child.scalars())
                .collect(),
        }
    }

    /// Returns `true` if this expression does not depend on metric values.
    ///
    /// Constants and scalars are scalar expressions, so are all composite expressions of them.
    pub fn is_scalar(&self) -> bool {
        match self {
            Self::Metric(_) => false,
            Self::Constant(_) => true,
            _ if self.as_scalar().is_some() => true,
            _ => self.children().into_iter().all(Self::is_scalar),
        }
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    fn metric(name: &str) -> MetricExpression {
        MetricExpression::metric(name)
    }

    #[test]
    fn test_metric_names() {
        let expression = MetricExpression::sum(vec![
            metric("user"),
            MetricExpression::difference(
                metric("system"),
                MetricExpression::scalar(ScalarKind::Warn, Metric::new("user")),
            ),
            MetricExpression::constant(1.0),
        ]);

        let names: Vec<&str> = expression.metric_names().into_iter().map(|n| &**n).collect();
        assert_eq!(names, ["user", "system"]);
    }

    #[test]
    fn test_scalars() {
        let expression = MetricExpression::percent(
            MetricExpression::scalar(ScalarKind::Crit, Metric::new("fs_used")),
            MetricExpression::scalar(ScalarKind::Max, Metric::new("fs_size")),
        );

        assert_eq!(
            expression.scalars(),
            [
                (&MetricName::from("fs_used"), ScalarKind::Crit),
                (&MetricName::from("fs_size"), ScalarKind::Max),
            ]
        );
    }

    #[test]
    fn test_is_scalar() {
        assert!(MetricExpression::constant(3.0).is_scalar());
        assert!(!metric("load1").is_scalar());
        assert!(MetricExpression::maximum(vec![
            MetricExpression::scalar(ScalarKind::Max, Metric::new("load1")),
            MetricExpression::constant(1.0),
        ])
        .is_scalar());
        assert!(!MetricExpression::fraction(metric("a"), MetricExpression::constant(2.0)).is_scalar());
    }

    #[test]
    fn test_consolidation_function() {
        assert_eq!("average".parse(), Ok(ConsolidationFunction::Average));
        assert!("avg".parse::<ConsolidationFunction>().is_err());
    }

    #[test]
    fn test_serialize() {
        let expression = MetricExpression::fraction(
            MetricExpression::Metric(Metric {
                name: "if_in_octets".into(),
                consolidation: Some(ConsolidationFunction::Max),
            }),
            MetricExpression::constant(8.0),
        );

        insta::assert_json_snapshot!(expression, @r#"
        {
          "type": "fraction",
          "dividend": {
            "type": "metric",
            "name": "if_in_octets",
            "consolidation": "max"
          },
          "divisor": {
            "type": "constant",
            "value": 8.0
          }
        }
        "#);
    }

    #[test]
    fn test_deserialize() {
        let expression: MetricExpression = serde_yaml::from_str(
            r##"
type: sum
terms:
  - {type: metric, name: user}
  - {type: warning_of, metric: {name: user}, color: "#ffd000"}
"##,
        )
        .unwrap();

        assert_eq!(
            expression,
            MetricExpression::sum(vec![
                metric("user"),
                MetricExpression::WarningOf(ScalarOf {
                    metric: Metric::new("user"),
                    color: Some("#ffd000".to_owned()),
                }),
            ])
        );
    }
}
