//! Graph templates in the legacy `graph_info` format.
//!
//! Legacy templates describe their lines with textual expressions, see
//! [`parse_expression`](perfgraph_expression::parse_expression).

use perfgraph_base_schema::metrics::MetricName;
use perfgraph_expression::{
    ConsolidationFunction, MetricExpression, ParseExpressionError, ParsedExpression,
    parse_expression,
};
use perfgraph_metrics::ScalarKind;
use serde::{Deserialize, Serialize};

use crate::{GraphRange, GraphTemplate, LineType, MetricDefinition, ScalarDefinition};

/// Prefix of the ids assigned to legacy templates registered without an id.
pub const MANUAL_TEMPLATE_PREFIX: &str = "manual_graph_template_";

/// A line of a legacy template: `[expression, line_type]` or `[expression, line_type, title]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawMetricDefinition {
    /// A line with a title.
    Titled(String, LineType, String),
    /// A line titled after its first metric.
    Plain(String, LineType),
}

/// A horizontal rule of a legacy template: `expression` or `[expression, title]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    /// A rule titled after the scalar it shows.
    Plain(String),
    /// A rule with a title.
    Titled(String, String),
}

/// One end of a legacy range: a number or a textual expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRangeBound {
    /// A fixed number.
    Value(f64),
    /// A textual expression.
    Expression(String),
}

impl RawRangeBound {
    fn parse(&self) -> Result<ParsedExpression, ParseExpressionError> {
        match self {
            Self::Value(value) => Ok(MetricExpression::constant(*value).into()),
            Self::Expression(expression) => parse_expression(expression),
        }
    }
}

/// An entry of the legacy `graph_info` table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawGraphTemplate {
    /// The id of the template, assigned automatically if missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The title, may contain `%(expression)` placeholders.
    pub title: Option<String>,
    /// The lines and areas.
    pub metrics: Vec<RawMetricDefinition>,
    /// The horizontal rules.
    pub scalars: Vec<RawScalar>,
    /// Metrics whose presence disables the template.
    pub conflicting_metrics: Vec<MetricName>,
    /// Metrics that may be missing.
    pub optional_metrics: Vec<MetricName>,
    /// The consolidation function for time series.
    pub consolidation_function: Option<ConsolidationFunction>,
    /// The fixed range as `[min, max]`.
    pub range: Option<(RawRangeBound, RawRangeBound)>,
    /// Whether lines that are constantly zero are hidden.
    pub omit_zero_metrics: bool,
}

fn scalar_title(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Warn => "Warning",
        ScalarKind::Crit => "Critical",
        ScalarKind::Min => "Minimum",
        ScalarKind::Max => "Maximum",
    }
}

impl RawScalar {
    fn parse(&self) -> Result<ScalarDefinition, ParseExpressionError> {
        let (text, title) = match self {
            Self::Plain(text) => (text, None),
            Self::Titled(text, title) => (text, Some(title)),
        };

        let expression = parse_expression(text)?;
        let title = match title {
            Some(title) => title.clone(),
            None => match expression.expression.as_scalar() {
                Some((kind, _)) => scalar_title(kind).to_owned(),
                None => text.clone(),
            },
        };

        Ok(ScalarDefinition {
            expression,
            title,
            line_type: LineType::Line,
        })
    }
}

impl RawMetricDefinition {
    fn parse(&self) -> Result<MetricDefinition, ParseExpressionError> {
        Ok(match self {
            Self::Titled(text, line_type, title) => {
                MetricDefinition::new(parse_expression(text)?, *line_type).with_title(title)
            }
            Self::Plain(text, line_type) => {
                MetricDefinition::new(parse_expression(text)?, *line_type)
            }
        })
    }
}

impl RawGraphTemplate {
    /// Parses all expressions and builds the graph template with the given id.
    pub fn to_template(
        &self,
        id: impl Into<String>,
    ) -> Result<GraphTemplate, ParseExpressionError> {
        let range = match &self.range {
            Some((min, max)) => Some(GraphRange::Fixed {
                min: min.parse()?,
                max: max.parse()?,
            }),
            None => None,
        };

        Ok(GraphTemplate {
            id: id.into(),
            title: self.title.clone().unwrap_or_default(),
            scalars: self
                .scalars
                .iter()
                .map(RawScalar::parse)
                .collect::<Result<_, _>>()?,
            conflicting_metrics: self.conflicting_metrics.clone(),
            optional_metrics: self.optional_metrics.clone(),
            consolidation_function: self.consolidation_function,
            range,
            omit_zero_metrics: self.omit_zero_metrics,
            metrics: self
                .metrics
                .iter()
                .map(RawMetricDefinition::parse)
                .collect::<Result<_, _>>()?,
        })
    }
}
