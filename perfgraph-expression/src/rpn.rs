//! Parser for textual metric expressions.
//!
//! Expressions are written in reverse polish notation with comma separated tokens, for example
//! `user,system,+` or `fs_used(%)`. An expression may end in an explicit unit (`@bytes`) and an
//! explicit color (`#00ff00`), in this order.

use std::fmt;

use itertools::Itertools;
use perfgraph_base_schema::metrics::MetricName;
use perfgraph_base_schema::units::{UnitRegistry, UnitSpec};
use perfgraph_metrics::{ScalarKind, TranslatedMetrics};
use serde::Serialize;

use crate::{
    ConditionalMetricExpression, ConsolidationFunction, Evaluated, EvaluationError,
    GreaterEqualThan, GreaterThan, LessEqualThan, LessThan, Metric, MetricExpression,
};

/// The reason a textual expression could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseExpressionErrorKind {
    /// An operator found less than two operands on the stack.
    #[error("too few operands for '{0}'")]
    TooFewOperands(String),
    /// More than one value remained on the stack.
    #[error("too many operands left")]
    TooManyOperands,
    /// Two consecutive commas or a trailing comma.
    #[error("empty token")]
    EmptyToken,
    /// A token starting like a number is not a number.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    /// The `@unit` suffix names an unknown unit.
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    /// The `:scalar` suffix names an unknown scalar.
    #[error("unknown scalar '{0}'")]
    UnknownScalar(String),
    /// A comparison was used as operand of another operator.
    #[error("conditional used as operand")]
    ConditionalAsOperand,
    /// A condition was expected but the expression does not compare anything.
    #[error("missing relational operator")]
    MissingRelationalOperator,
}

/// An error returned when parsing a textual expression.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid expression '{expression}': {kind}")]
pub struct ParseExpressionError {
    expression: String,
    #[source]
    kind: ParseExpressionErrorKind,
}

impl ParseExpressionError {
    fn new(expression: &str, kind: ParseExpressionErrorKind) -> Self {
        Self {
            expression: expression.to_owned(),
            kind,
        }
    }

    /// Returns the expression that failed to parse.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Returns the reason of the error.
    pub fn kind(&self) -> &ParseExpressionErrorKind {
        &self.kind
    }
}

/// A parsed textual expression together with its explicit unit and color.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedExpression {
    /// The expression tree.
    pub expression: MetricExpression,
    /// The unit given with `@unit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitSpec>,
    /// The color given with `#rrggbb`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ParsedExpression {
    /// Evaluates the expression and applies the explicit unit and color.
    pub fn evaluate(
        &self,
        metrics: &TranslatedMetrics,
        units: &UnitRegistry,
    ) -> Result<Evaluated, EvaluationError> {
        let mut evaluated = self.expression.evaluate(metrics, units)?;
        if let Some(unit) = &self.unit {
            evaluated.unit = units.parse_or_add_unit(unit);
        }
        if let Some(color) = &self.color {
            evaluated.color.clone_from(color);
        }
        Ok(evaluated)
    }
}

impl From<MetricExpression> for ParsedExpression {
    fn from(expression: MetricExpression) -> Self {
        Self {
            expression,
            unit: None,
            color: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl Operator {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "+" => Self::Add,
            "-" => Self::Subtract,
            "*" => Self::Multiply,
            "/" => Self::Divide,
            "MIN" => Self::Min,
            "MAX" => Self::Max,
            ">" => Self::Greater,
            ">=" => Self::GreaterEqual,
            "<" => Self::Less,
            "<=" => Self::LessEqual,
            _ => return None,
        })
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::LessEqual => "<=",
        }
    }

    fn apply(self, left: MetricExpression, right: MetricExpression) -> Node {
        let expression = match self {
            Self::Add => MetricExpression::sum(vec![left, right]),
            Self::Subtract => MetricExpression::difference(left, right),
            Self::Multiply => MetricExpression::product(vec![left, right]),
            Self::Divide => MetricExpression::fraction(left, right),
            Self::Min => MetricExpression::minimum(vec![left, right]),
            Self::Max => MetricExpression::maximum(vec![left, right]),
            Self::Greater => {
                return Node::Condition(ConditionalMetricExpression::GreaterThan(GreaterThan {
                    left,
                    right,
                }));
            }
            Self::GreaterEqual => {
                return Node::Condition(ConditionalMetricExpression::GreaterEqualThan(
                    GreaterEqualThan { left, right },
                ));
            }
            Self::Less => {
                return Node::Condition(ConditionalMetricExpression::LessThan(LessThan {
                    left,
                    right,
                }));
            }
            Self::LessEqual => {
                return Node::Condition(ConditionalMetricExpression::LessEqualThan(
                    LessEqualThan { left, right },
                ));
            }
        };

        Node::Expression(expression)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum Node {
    Expression(MetricExpression),
    Condition(ConditionalMetricExpression),
}

impl Node {
    fn into_expression(self) -> Result<MetricExpression, ParseExpressionErrorKind> {
        match self {
            Self::Expression(expression) => Ok(expression),
            Self::Condition(_) => Err(ParseExpressionErrorKind::ConditionalAsOperand),
        }
    }
}

/// Splits the explicit color and unit off the end of an expression.
fn split_expression(
    text: &str,
) -> Result<(&str, Option<UnitSpec>, Option<String>), ParseExpressionErrorKind> {
    let (text, color) = match text.rsplit_once('#') {
        Some((text, color)) => (text, Some(format!("#{color}"))),
        None => (text, None),
    };

    let (text, unit) = match text.rsplit_once('@') {
        Some((text, name)) => {
            let unit = UnitSpec::from_legacy_name(name)
                .ok_or_else(|| ParseExpressionErrorKind::UnknownUnit(name.to_owned()))?;
            (text, Some(unit))
        }
        None => (text, None),
    };

    Ok((text, unit, color))
}

/// Parses a single operand token.
///
/// Tokens starting with a digit or `-` are constants. Everything else is a metric name with
/// optional suffixes: a consolidation function (`.max`), percent of maximum (`(%)`) and a scalar
/// (`:warn`).
fn parse_operand(token: &str) -> Result<MetricExpression, ParseExpressionErrorKind> {
    if token.is_empty() {
        return Err(ParseExpressionErrorKind::EmptyToken);
    }

    if token.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return token
            .parse()
            .map(MetricExpression::constant)
            .map_err(|_| ParseExpressionErrorKind::InvalidNumber(token.to_owned()));
    }

    let (token, consolidation) = match token.rsplit_once('.') {
        Some((name, suffix)) => match suffix.parse::<ConsolidationFunction>() {
            Ok(consolidation) => (name, Some(consolidation)),
            Err(_) => (token, None),
        },
        None => (token, None),
    };

    let (token, percent) = match token.strip_suffix("(%)") {
        Some(name) => (name, true),
        None => (token, false),
    };

    let (name, scalar) = match token.split_once(':') {
        Some((name, scalar)) => {
            let kind = scalar
                .parse::<ScalarKind>()
                .map_err(|_| ParseExpressionErrorKind::UnknownScalar(scalar.to_owned()))?;
            (name, Some(kind))
        }
        None => (token, None),
    };

    if name.is_empty() {
        return Err(ParseExpressionErrorKind::EmptyToken);
    }

    let metric = Metric {
        name: MetricName::from(name),
        consolidation,
    };

    let value = match scalar {
        Some(kind) => MetricExpression::scalar(kind, metric.clone()),
        None => MetricExpression::Metric(metric.clone()),
    };

    if percent {
        let base_value = MetricExpression::scalar(ScalarKind::Max, metric);
        Ok(MetricExpression::percent(value, base_value))
    } else {
        Ok(value)
    }
}

/// Runs the stack machine over the comma separated tokens.
fn parse_rpn(text: &str) -> Result<Node, ParseExpressionErrorKind> {
    let mut stack = Vec::new();

    for token in text.split(',') {
        let Some(operator) = Operator::parse(token) else {
            stack.push(Node::Expression(parse_operand(token)?));
            continue;
        };

        let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
            return Err(ParseExpressionErrorKind::TooFewOperands(operator.to_string()));
        };

        let node = operator.apply(left.into_expression()?, right.into_expression()?);
        stack.push(node);
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(node), true) => Ok(node),
        _ => Err(ParseExpressionErrorKind::TooManyOperands),
    }
}

/// Parses a textual expression.
///
/// # Examples
///
/// ```
/// use perfgraph_expression::{MetricExpression, parse_expression};
///
/// let parsed = parse_expression("user,system,+#ff8800").unwrap();
/// assert_eq!(
///     parsed.expression,
///     MetricExpression::sum(vec![
///         MetricExpression::metric("user"),
///         MetricExpression::metric("system"),
///     ])
/// );
/// assert_eq!(parsed.color.as_deref(), Some("#ff8800"));
/// ```
///
/// # Errors
///
/// Returns an error if the expression is malformed or if it is a comparison. Use
/// [`parse_conditional_expression`] for comparisons.
pub fn parse_expression(text: &str) -> Result<ParsedExpression, ParseExpressionError> {
    parse_styled(text).map_err(|kind| ParseExpressionError::new(text, kind))
}

fn parse_styled(text: &str) -> Result<ParsedExpression, ParseExpressionErrorKind> {
    let (rpn, unit, color) = split_expression(text)?;
    Ok(ParsedExpression {
        expression: parse_rpn(rpn)?.into_expression()?,
        unit,
        color,
    })
}

/// Parses a textual comparison such as `fs_used,fs_size,0.9,*,>`.
///
/// An explicit unit or color on the expression is accepted and ignored.
pub fn parse_conditional_expression(
    text: &str,
) -> Result<ConditionalMetricExpression, ParseExpressionError> {
    parse_condition(text).map_err(|kind| ParseExpressionError::new(text, kind))
}

fn parse_condition(text: &str) -> Result<ConditionalMetricExpression, ParseExpressionErrorKind> {
    let (rpn, _, _) = split_expression(text)?;
    match parse_rpn(rpn)? {
        Node::Condition(condition) => Ok(condition),
        Node::Expression(_) => Err(ParseExpressionErrorKind::MissingRelationalOperator),
    }
}

/// Returns the names of the metrics used in a textual expression without fully parsing it.
///
/// Operators, constants and malformed tokens are skipped. Each name is returned once, in the
/// order of its first use.
pub fn metrics_used_in_definition(definition: &str) -> Vec<MetricName> {
    let rpn = definition
        .split_once('#')
        .map_or(definition, |(rpn, _)| rpn);
    let rpn = rpn.split_once('@').map_or(rpn, |(rpn, _)| rpn);

    rpn.split(',')
        .filter(|token| Operator::parse(token).is_none())
        .filter_map(|token| parse_operand(token).ok())
        .flat_map(|expression| {
            expression
                .metric_names()
                .into_iter()
                .cloned()
                .collect::<Vec<_>>()
        })
        .unique()
        .collect()
}

/// An error returned by [`evaluate_expression`].
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// The expression could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseExpressionError),
    /// The expression could not be evaluated.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Parses and evaluates a textual expression.
pub fn evaluate_expression(
    text: &str,
    metrics: &TranslatedMetrics,
    units: &UnitRegistry,
) -> Result<Evaluated, ExpressionError> {
    Ok(parse_expression(text)?.evaluate(metrics, units)?)
}
