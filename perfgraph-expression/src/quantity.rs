use perfgraph_base_schema::color::{self, Color};
use perfgraph_base_schema::metrics::MetricName;
use perfgraph_base_schema::units::UnitSpec;
use perfgraph_metrics::{MetricRegistry, ScalarKind};
use serde::{Deserialize, Serialize};

use crate::{Constant, Difference, Fraction, Metric, MetricExpression, Product, ScalarOf, Sum};

/// A quantity declared by a graph or perfometer plugin.
///
/// A plain string refers to a metric by name, objects declare derived quantities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    /// The value of a metric.
    Metric(MetricName),
    /// A derived quantity.
    Declared(Box<DeclaredQuantity>),
}

/// A derived quantity of a plugin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DeclaredQuantity {
    /// A constant value.
    Constant {
        /// The title.
        title: String,
        /// The unit of the value.
        unit: UnitSpec,
        /// The color.
        color: Color,
        /// The value.
        value: f64,
    },
    /// The warning level of a metric.
    WarningOf {
        /// The metric name.
        metric: MetricName,
    },
    /// The critical level of a metric.
    CriticalOf {
        /// The metric name.
        metric: MetricName,
    },
    /// The lower bound of a metric.
    MinimumOf {
        /// The metric name.
        metric: MetricName,
        /// The color.
        color: Color,
    },
    /// The upper bound of a metric.
    MaximumOf {
        /// The metric name.
        metric: MetricName,
        /// The color.
        color: Color,
    },
    /// The sum of several quantities.
    Sum {
        /// The title.
        title: String,
        /// The color.
        color: Color,
        /// The summands.
        summands: Vec<Quantity>,
    },
    /// The product of several quantities.
    Product {
        /// The title.
        title: String,
        /// The unit of the product.
        unit: UnitSpec,
        /// The color.
        color: Color,
        /// The factors.
        factors: Vec<Quantity>,
    },
    /// The difference of two quantities.
    Difference {
        /// The title.
        title: String,
        /// The color.
        color: Color,
        /// The quantity subtracted from.
        minuend: Quantity,
        /// The quantity that is subtracted.
        subtrahend: Quantity,
    },
    /// The quotient of two quantities.
    Fraction {
        /// The title.
        title: String,
        /// The unit of the quotient.
        unit: UnitSpec,
        /// The color.
        color: Color,
        /// The numerator.
        dividend: Quantity,
        /// The denominator.
        divisor: Quantity,
    },
}

impl Quantity {
    /// Converts the quantity into an expression.
    pub fn to_expression(&self) -> MetricExpression {
        let declared = match self {
            Self::Metric(name) => return MetricExpression::metric(name.clone()),
            Self::Declared(declared) => &**declared,
        };

        match declared {
            DeclaredQuantity::Constant {
                unit, color, value, ..
            } => MetricExpression::Constant(Constant {
                value: *value,
                unit: Some(unit.clone()),
                color: Some(color::parse_color(*color)),
            }),
            DeclaredQuantity::WarningOf { metric } => {
                MetricExpression::scalar(ScalarKind::Warn, Metric::new(metric.clone()))
            }
            DeclaredQuantity::CriticalOf { metric } => {
                MetricExpression::scalar(ScalarKind::Crit, Metric::new(metric.clone()))
            }
            DeclaredQuantity::MinimumOf { metric, color } => MetricExpression::MinimumOf(ScalarOf {
                metric: Metric::new(metric.clone()),
                color: Some(color::parse_color(*color)),
            }),
            DeclaredQuantity::MaximumOf { metric, color } => MetricExpression::MaximumOf(ScalarOf {
                metric: Metric::new(metric.clone()),
                color: Some(color::parse_color(*color)),
            }),
            DeclaredQuantity::Sum {
                color, summands, ..
            } => MetricExpression::Sum(Sum {
                terms: summands.iter().map(Self::to_expression).collect(),
                color: Some(color::parse_color(*color)),
            }),
            DeclaredQuantity::Product {
                unit,
                color,
                factors,
                ..
            } => MetricExpression::Product(Product {
                factors: factors.iter().map(Self::to_expression).collect(),
                unit: Some(unit.clone()),
                color: Some(color::parse_color(*color)),
            }),
            DeclaredQuantity::Difference {
                color,
                minuend,
                subtrahend,
                ..
            } => MetricExpression::Difference(Difference {
                minuend: Box::new(minuend.to_expression()),
                subtrahend: Box::new(subtrahend.to_expression()),
                color: Some(color::parse_color(*color)),
            }),
            DeclaredQuantity::Fraction {
                unit,
                color,
                dividend,
                divisor,
                ..
            } => MetricExpression::Fraction(Fraction {
                dividend: Box::new(dividend.to_expression()),
                divisor: Box::new(divisor.to_expression()),
                unit: Some(unit.clone()),
                color: Some(color::parse_color(*color)),
            }),
        }
    }

    /// Returns the display title of the quantity.
    ///
    /// Metrics and their bounds are titled after the metric, warning and critical levels are
    /// prefixed accordingly. Derived quantities carry their own title.
    pub fn title(&self, registry: &MetricRegistry) -> String {
        let declared = match self {
            Self::Metric(name) => return registry.title(name),
            Self::Declared(declared) => &**declared,
        };

        match declared {
            DeclaredQuantity::WarningOf { metric } => {
                format!("Warning of {}", registry.title(metric))
            }
            DeclaredQuantity::CriticalOf { metric } => {
                format!("Critical of {}", registry.title(metric))
            }
            DeclaredQuantity::MinimumOf { metric, .. }
            | DeclaredQuantity::MaximumOf { metric, .. } => registry.title(metric),
            DeclaredQuantity::Constant { title, .. }
            | DeclaredQuantity::Sum { title, .. }
            | DeclaredQuantity::Product { title, .. }
            | DeclaredQuantity::Difference { title, .. }
            | DeclaredQuantity::Fraction { title, .. } => title.clone(),
        }
    }

    fn collect<'a>(
        &'a self,
        names: &mut Vec<&'a MetricName>,
        scalars: &mut Vec<(&'a MetricName, ScalarKind)>,
    ) {
        let declared = match self {
            Self::Metric(name) => {
                names.push(name);
                return;
            }
            Self::Declared(declared) => &**declared,
        };

        let (metric, kind) = match declared {
            DeclaredQuantity::Constant { .. } => return,
            DeclaredQuantity::WarningOf { metric } => (metric, ScalarKind::Warn),
            DeclaredQuantity::CriticalOf { metric } => (metric, ScalarKind::Crit),
            DeclaredQuantity::MinimumOf { metric, .. } => (metric, ScalarKind::Min),
            DeclaredQuantity::MaximumOf { metric, .. } => (metric, ScalarKind::Max),
            DeclaredQuantity::Sum {
                summands: quantities,
                ..
            }
            | DeclaredQuantity::Product {
                factors: quantities,
                ..
            } => {
                for quantity in quantities {
                    quantity.collect(names, scalars);
                }
                return;
            }
            DeclaredQuantity::Difference {
                minuend: left,
                subtrahend: right,
                ..
            }
            | DeclaredQuantity::Fraction {
                dividend: left,
                divisor: right,
                ..
            } => {
                left.collect(names, scalars);
                right.collect(names, scalars);
                return;
            }
        };

        names.push(metric);
        scalars.push((metric, kind));
    }

    /// Returns the names of all metrics the quantity refers to, including those of scalars.
    pub fn metric_names(&self) -> Vec<&MetricName> {
        let mut names = Vec::new();
        self.collect(&mut names, &mut Vec::new());
        names
    }

    /// Returns all scalars the quantity refers to.
    pub fn scalars(&self) -> Vec<(&MetricName, ScalarKind)> {
        let mut scalars = Vec::new();
        self.collect(&mut Vec::new(), &mut scalars);
        scalars
    }
}

impl From<&str> for Quantity {
    fn from(name: &str) -> Self {
        Self::Metric(name.into())
    }
}

impl From<DeclaredQuantity> for Quantity {
    fn from(quantity: DeclaredQuantity) -> Self {
        Self::Declared(Box::new(quantity))
    }
}

#[cfg(test)]
mod tests {
    use perfgraph_metrics::DeclaredMetric;
    use similar_asserts::assert_eq;

    use super::*;

    fn registry() -> MetricRegistry {
        let mut registry = MetricRegistry::new();
        registry.register_metric(DeclaredMetric {
            name: "metric-name".into(),
            title: "Title".to_owned(),
            unit: UnitSpec::neutral(),
            color: Color::Blue,
            help: None,
        });
        registry
    }

    fn graph_lines() -> Vec<Quantity> {
        serde_yaml::from_str(
            r#"
- metric-name
- {type: constant, title: Constant, unit: {notation: {type: decimal, symbol: ""}}, color: BLUE, value: 10}
- {type: warning_of, metric: metric-name}
- {type: critical_of, metric: metric-name}
- {type: minimum_of, metric: metric-name, color: BLUE}
- {type: sum, title: Sum, color: BLUE, summands: [metric-name]}
- type: difference
  title: Difference
  color: BLUE
  minuend: metric-name
  subtrahend: {type: maximum_of, metric: other, color: RED}
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_titles() {
        let registry = registry();
        let titles: Vec<String> = graph_lines()
            .iter()
            .map(|quantity| quantity.title(&registry))
            .collect();

        assert_eq!(
            titles,
            [
                "Title",
                "Constant",
                "Warning of Title",
                "Critical of Title",
                "Title",
                "Sum",
                "Difference",
            ]
        );
    }

    #[test]
    fn test_to_expression() {
        let lines = graph_lines();

        assert_eq!(
            lines[1].to_expression(),
            MetricExpression::Constant(Constant {
                value: 10.0,
                unit: Some(UnitSpec::neutral()),
                color: Some("#1e90ff".to_owned()),
            })
        );
        assert_eq!(
            lines[2].to_expression(),
            MetricExpression::scalar(ScalarKind::Warn, Metric::new("metric-name"))
        );
        assert_eq!(
            lines[6].to_expression(),
            MetricExpression::Difference(Difference {
                minuend: Box::new(MetricExpression::metric("metric-name")),
                subtrahend: Box::new(MetricExpression::MaximumOf(ScalarOf {
                    metric: Metric::new("other"),
                    color: Some(color::parse_color(Color::Red)),
                })),
                color: Some("#1e90ff".to_owned()),
            })
        );
    }

    #[test]
    fn test_names_and_scalars() {
        let lines = graph_lines();

        let names: Vec<&str> = lines[6].metric_names().into_iter().map(|n| &**n).collect();
        assert_eq!(names, ["metric-name", "other"]);

        assert_eq!(
            lines[6].scalars(),
            [(&MetricName::from("other"), ScalarKind::Max)]
        );
        assert!(lines[1].metric_names().is_empty());
    }
}
