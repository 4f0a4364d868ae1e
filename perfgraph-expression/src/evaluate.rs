use std::sync::Arc;

use perfgraph_base_schema::color::{self, BLACK, CRIT_COLOR, WARN_COLOR};
use perfgraph_base_schema::metrics::MetricName;
use perfgraph_base_schema::units::{UnitInfo, UnitRegistry, UnitSpec};
use perfgraph_metrics::{ScalarKind, TranslatedMetric, TranslatedMetrics};

use crate::{Metric, MetricExpression, Operands, ScalarOf};

/// The result of evaluating a [`MetricExpression`].
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluated {
    /// The value.
    pub value: f64,
    /// The unit the value is rendered in.
    pub unit: Arc<UnitInfo>,
    /// The color as `#rrggbb`.
    pub color: String,
}

impl Evaluated {
    /// Renders the value with its unit.
    pub fn render(&self) -> String {
        self.unit.render(self.value)
    }
}

/// An error returned when an expression cannot be evaluated.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// The expression references a metric that is not in the table.
    #[error("undefined metric '{name}'")]
    MissingMetric {
        /// The name of the missing metric.
        name: MetricName,
    },
    /// The expression references a scalar the metric does not have.
    #[error("metric '{name}' has no {scalar} value")]
    MissingScalar {
        /// The name of the metric.
        name: MetricName,
        /// The missing scalar.
        scalar: ScalarKind,
    },
    /// The divisor of a fraction or the base of a percentage is zero.
    #[error("division by zero")]
    DivisionByZero,
    /// A variadic expression has no operands.
    #[error("{operator} without operands")]
    EmptyOperands {
        /// The name of the expression.
        operator: &'static str,
    },
}

impl EvaluationError {
    /// Returns the name of the metric that caused the error, if any.
    pub fn metric_name(&self) -> Option<&MetricName> {
        match self {
            Self::MissingMetric { name } | Self::MissingScalar { name, .. } => Some(name),
            Self::DivisionByZero | Self::EmptyOperands { .. } => None,
        }
    }
}

/// Returns the right unit if the left one is neutral.
fn unit_left_neutral(left: Arc<UnitInfo>, right: &Arc<UnitInfo>) -> Arc<UnitInfo> {
    if left.is_neutral() {
        Arc::clone(right)
    } else {
        left
    }
}

fn explicit_unit(
    units: &UnitRegistry,
    explicit: Option<&UnitSpec>,
    derived: Arc<UnitInfo>,
) -> Arc<UnitInfo> {
    match explicit {
        Some(spec) => units.parse_or_add_unit(spec),
        None => derived,
    }
}

fn explicit_color(explicit: Option<&String>, derived: String) -> String {
    match explicit {
        Some(color) => color.clone(),
        None => derived,
    }
}

impl Metric {
    fn lookup<'a>(
        &self,
        metrics: &'a TranslatedMetrics,
    ) -> Result<&'a TranslatedMetric, EvaluationError> {
        metrics
            .get(&self.name)
            .ok_or_else(|| EvaluationError::MissingMetric {
                name: self.name.clone(),
            })
    }

    fn evaluate(&self, metrics: &TranslatedMetrics) -> Result<Evaluated, EvaluationError> {
        let metric = self.lookup(metrics)?;
        Ok(Evaluated {
            value: metric.value,
            unit: Arc::clone(&metric.unit),
            color: metric.color.clone(),
        })
    }
}

impl ScalarOf {
    fn evaluate(
        &self,
        kind: ScalarKind,
        metrics: &TranslatedMetrics,
    ) -> Result<Evaluated, EvaluationError> {
        let metric = self.metric.lookup(metrics)?;
        let value = metric
            .scalar
            .get(kind)
            .ok_or_else(|| EvaluationError::MissingScalar {
                name: self.metric.name.clone(),
                scalar: kind,
            })?;

        let color = match (&self.color, kind) {
            (Some(color), _) => color.clone(),
            (None, ScalarKind::Warn) => WARN_COLOR.to_owned(),
            (None, ScalarKind::Crit) => CRIT_COLOR.to_owned(),
            (None, ScalarKind::Min | ScalarKind::Max) => metric.color.clone(),
        };

        Ok(Evaluated {
            value,
            unit: Arc::clone(&metric.unit),
            color,
        })
    }
}

impl Operands {
    /// Evaluates all operands, failing on the first error.
    fn evaluate_all(
        &self,
        operator: &'static str,
        metrics: &TranslatedMetrics,
        units: &UnitRegistry,
    ) -> Result<Vec<Evaluated>, EvaluationError> {
        if self.operands.is_empty() {
            return Err(EvaluationError::EmptyOperands { operator });
        }

        self.operands
            .iter()
            .map(|operand| operand.evaluate(metrics, units))
            .collect()
    }
}

/// Picks the winner of a minimum or maximum.
///
/// A neutral unit or black color of the winner gives way to the loser's.
fn min_max(
    operands: Vec<Evaluated>,
    operator: &'static str,
    wins: fn(f64, f64) -> bool,
) -> Result<Evaluated, EvaluationError> {
    let mut operands = operands.into_iter();
    let mut result = operands
        .next()
        .ok_or(EvaluationError::EmptyOperands { operator })?;

    for operand in operands {
        let (mut winner, loser) = if wins(operand.value, result.value) {
            (operand, result)
        } else {
            (result, operand)
        };

        if winner.unit.is_neutral() {
            winner.unit = loser.unit;
        }
        if winner.color == BLACK {
            winner.color = loser.color;
        }

        result = winner;
    }

    Ok(result)
}

/// Adds up evaluated terms, starting from the first one.
fn sum(terms: Vec<Evaluated>, operator: &'static str) -> Result<Evaluated, EvaluationError> {
    let mut terms = terms.into_iter();
    let mut result = terms
        .next()
        .ok_or(EvaluationError::EmptyOperands { operator })?;

    for term in terms {
        result.value += term.value;
        result.color = color::choose_operator_color(&result.color, &term.color);
    }

    Ok(result)
}

impl MetricExpression {
    /// Evaluates the expression against a table of translated metrics.
    ///
    /// Units given explicitly in the expression are registered in `units`.
    ///
    /// # Errors
    ///
    /// Fails with [`EvaluationError::MissingMetric`] or [`EvaluationError::MissingScalar`] if a
    /// referenced metric or scalar is not available. Fractions and percentages with a zero divisor
    /// fail with [`EvaluationError::DivisionByZero`].
    pub fn evaluate(
        &self,
        metrics: &TranslatedMetrics,
        units: &UnitRegistry,
    ) -> Result<Evaluated, EvaluationError> {
        match self {
            Self::Metric(metric) => metric.evaluate(metrics),
            Self::Constant(constant) => Ok(Evaluated {
                value: constant.value,
                unit: match &constant.unit {
                    Some(spec) => units.parse_or_add_unit(spec),
                    None => units.neutral(),
                },
                color: explicit_color(constant.color.as_ref(), BLACK.to_owned()),
            }),
            Self::WarningOf(scalar) => scalar.evaluate(ScalarKind::Warn, metrics),
            Self::CriticalOf(scalar) => scalar.evaluate(ScalarKind::Crit, metrics),
            Self::MinimumOf(scalar) => scalar.evaluate(ScalarKind::Min, metrics),
            Self::MaximumOf(scalar) => scalar.evaluate(ScalarKind::Max, metrics),
            Self::Sum(expression) => {
                let terms = expression
                    .terms
                    .iter()
                    .map(|term| term.evaluate(metrics, units))
                    .collect::<Result<Vec<_>, _>>()?;

                let mut result = sum(terms, "sum")?;
                result.color = explicit_color(expression.color.as_ref(), result.color);
                Ok(result)
            }
            Self::Product(expression) => {
                let mut factors = expression.factors.iter();
                let first = factors
                    .next()
                    .ok_or(EvaluationError::EmptyOperands {
                        operator: "product",
                    })?
                    .evaluate(metrics, units)?;

                let mut result = first;
                for factor in factors {
                    let factor = factor.evaluate(metrics, units)?;
                    result.value *= factor.value;
                    result.unit = unit_left_neutral(result.unit, &factor.unit);
                    result.color = color::choose_operator_color(&result.color, &factor.color);
                }

                result.unit = explicit_unit(units, expression.unit.as_ref(), result.unit);
                result.color = explicit_color(expression.color.as_ref(), result.color);
                Ok(result)
            }
            Self::Difference(expression) => {
                let minuend = expression.minuend.evaluate(metrics, units)?;
                let subtrahend = expression.subtrahend.evaluate(metrics, units)?;

                Ok(Evaluated {
                    value: minuend.value - subtrahend.value,
                    color: explicit_color(
                        expression.color.as_ref(),
                        color::choose_operator_color(&minuend.color, &subtrahend.color),
                    ),
                    unit: minuend.unit,
                })
            }
            Self::Fraction(expression) => {
                let dividend = expression.dividend.evaluate(metrics, units)?;
                let divisor = expression.divisor.evaluate(metrics, units)?;
                if divisor.value == 0.0 {
                    return Err(EvaluationError::DivisionByZero);
                }

                Ok(Evaluated {
                    value: dividend.value / divisor.value,
                    unit: explicit_unit(
                        units,
                        expression.unit.as_ref(),
                        unit_left_neutral(dividend.unit, &divisor.unit),
                    ),
                    color: explicit_color(
                        expression.color.as_ref(),
                        color::choose_operator_color(&dividend.color, &divisor.color),
                    ),
                })
            }
            Self::Percent(expression) => {
                let percent_value = expression.percent_value.evaluate(metrics, units)?;
                let base_value = expression.base_value.evaluate(metrics, units)?;
                if base_value.value == 0.0 {
                    return Err(EvaluationError::DivisionByZero);
                }

                Ok(Evaluated {
                    value: 100.0 * percent_value.value / base_value.value,
                    unit: units.percent(),
                    color: percent_value.color,
                })
            }
            Self::Minimum(operands) => min_max(
                operands.evaluate_all("minimum", metrics, units)?,
                "minimum",
                |candidate, current| candidate < current,
            ),
            Self::Maximum(operands) => min_max(
                operands.evaluate_all("maximum", metrics, units)?,
                "maximum",
                |candidate, current| candidate > current,
            ),
            Self::Average(operands) => {
                let count = operands.operands.len() as f64;
                let mut result = sum(operands.evaluate_all("average", metrics, units)?, "average")?;
                result.value /= count;
                Ok(result)
            }
            // Every successful evaluation yields a value, so the first operand decides.
            Self::Merge(operands) => match operands.operands.first() {
                Some(operand) => operand.evaluate(metrics, units),
                None => Err(EvaluationError::EmptyOperands { operator: "merge" }),
            },
        }
    }
}
