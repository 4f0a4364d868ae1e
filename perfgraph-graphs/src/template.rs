//! Graph templates and their evaluation.

use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;

use itertools::Itertools;
use perfgraph_base_schema::metrics::MetricName;
use perfgraph_base_schema::units::{UnitInfo, UnitRegistry};
use perfgraph_common::{impl_display_as_str, impl_str_serde};
use perfgraph_expression::{
    ConsolidationFunction, EvaluationError, Metric, MetricExpression, ParsedExpression,
    replace_expressions,
};
use perfgraph_metrics::{ScalarKind, TranslatedMetrics};
use serde::Serialize;

/// Prefix of the ids of graph templates generated for a single metric.
pub const GENERIC_TEMPLATE_PREFIX: &str = "METRIC_";

/// How a metric is drawn in a graph.
///
/// Negative line types are drawn downwards from the zero line, as in the lower half of
/// bidirectional graphs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineType {
    /// A line.
    Line,
    /// A filled area.
    Area,
    /// An area stacked onto the previous stack or area.
    Stack,
    /// A line below the zero line.
    NegativeLine,
    /// A filled area below the zero line.
    NegativeArea,
    /// A stacked area below the zero line.
    NegativeStack,
}

impl LineType {
    /// Returns the name of the line type as used in graph definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Area => "area",
            Self::Stack => "stack",
            Self::NegativeLine => "-line",
            Self::NegativeArea => "-area",
            Self::NegativeStack => "-stack",
        }
    }

    /// Returns `true` if the metric is drawn below the zero line.
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Self::NegativeLine | Self::NegativeArea | Self::NegativeStack
        )
    }

    /// Returns the same line type on the other side of the zero line.
    pub fn mirrored(self) -> Self {
        match self {
            Self::Line => Self::NegativeLine,
            Self::Area => Self::NegativeArea,
            Self::Stack => Self::NegativeStack,
            Self::NegativeLine => Self::Line,
            Self::NegativeArea => Self::Area,
            Self::NegativeStack => Self::Stack,
        }
    }

    /// Returns the line type of predictive metrics overlaid on a metric of this line type.
    pub fn predictive(self) -> Self {
        if self.is_negative() {
            Self::NegativeLine
        } else {
            Self::Line
        }
    }
}

/// Error returned when parsing an unknown [`LineType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown line type")]
pub struct ParseLineTypeError;

impl FromStr for LineType {
    type Err = ParseLineTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "line" => Self::Line,
            "area" => Self::Area,
            "stack" => Self::Stack,
            "-line" => Self::NegativeLine,
            "-area" => Self::NegativeArea,
            "-stack" => Self::NegativeStack,
            _ => return Err(ParseLineTypeError),
        })
    }
}

impl_display_as_str!(LineType);
impl_str_serde!(LineType, "a line type");

/// Returns the title of the first metric the expression refers to.
fn default_title(expression: &MetricExpression, metrics: &TranslatedMetrics) -> String {
    expression
        .metric_names()
        .first()
        .and_then(|name| metrics.get(name))
        .map(|metric| metric.title.clone())
        .unwrap_or_default()
}

/// A line or area of a graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricDefinition {
    /// The expression computing the values.
    pub expression: ParsedExpression,
    /// How the values are drawn.
    pub line_type: LineType,
    /// The title, defaults to the title of the first metric in the expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl MetricDefinition {
    /// Creates a definition without a title.
    pub fn new(expression: impl Into<ParsedExpression>, line_type: LineType) -> Self {
        Self {
            expression: expression.into(),
            line_type,
            title: None,
        }
    }

    /// Sets the title of the definition.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Returns the names of the metrics the definition refers to.
    pub fn metric_names(&self) -> Vec<&MetricName> {
        self.expression.expression.metric_names()
    }

    /// Evaluates the expression of this definition.
    pub fn evaluate(
        &self,
        metrics: &TranslatedMetrics,
        units: &UnitRegistry,
    ) -> Result<EvaluatedQuantity, EvaluationError> {
        let evaluated = self.expression.evaluate(metrics, units)?;
        let title = match &self.title {
            Some(title) => title.clone(),
            None => default_title(&self.expression.expression, metrics),
        };

        Ok(EvaluatedQuantity {
            title,
            unit: evaluated.unit,
            color: evaluated.color,
            value: evaluated.value,
            line_type: self.line_type,
        })
    }
}

/// A horizontal rule of a graph, usually a warning or critical level.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScalarDefinition {
    /// The expression computing the value.
    pub expression: ParsedExpression,
    /// The title.
    pub title: String,
    /// How the rule is drawn.
    pub line_type: LineType,
}

impl ScalarDefinition {
    /// Evaluates the expression of this scalar.
    pub fn evaluate(
        &self,
        metrics: &TranslatedMetrics,
        units: &UnitRegistry,
    ) -> Result<EvaluatedQuantity, EvaluationError> {
        let evaluated = self.expression.evaluate(metrics, units)?;
        Ok(EvaluatedQuantity {
            title: self.title.clone(),
            unit: evaluated.unit,
            color: evaluated.color,
            value: evaluated.value,
            line_type: self.line_type,
        })
    }
}

/// The vertical range of a graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum GraphRange {
    /// The graph covers at least this range and grows with the values.
    Minimal {
        /// The lower end.
        min: ParsedExpression,
        /// The upper end.
        max: ParsedExpression,
    },
    /// The graph covers exactly this range.
    Fixed {
        /// The lower end.
        min: ParsedExpression,
        /// The upper end.
        max: ParsedExpression,
    },
}

impl GraphRange {
    /// Returns the expressions of the lower and the upper end.
    pub fn bounds(&self) -> (&ParsedExpression, &ParsedExpression) {
        match self {
            Self::Minimal { min, max } | Self::Fixed { min, max } => (min, max),
        }
    }
}

/// A graph and the lines and rules drawn in it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphTemplate {
    /// The unique id of the template.
    pub id: String,
    /// The title, may contain `%(expression)` placeholders.
    pub title: String,
    /// Horizontal rules.
    pub scalars: Vec<ScalarDefinition>,
    /// The template does not apply if any of these metrics exist.
    pub conflicting_metrics: Vec<MetricName>,
    /// Metrics that may be missing without disqualifying the template.
    pub optional_metrics: Vec<MetricName>,
    /// The consolidation function for time series, defaults to the maximum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consolidation_function: Option<ConsolidationFunction>,
    /// The vertical range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<GraphRange>,
    /// Whether lines that are constantly zero are hidden.
    pub omit_zero_metrics: bool,
    /// The lines and areas.
    pub metrics: Vec<MetricDefinition>,
}

impl GraphTemplate {
    /// Creates an empty template with the given id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            scalars: Vec::new(),
            conflicting_metrics: Vec::new(),
            optional_metrics: Vec::new(),
            consolidation_function: None,
            range: None,
            omit_zero_metrics: false,
            metrics: Vec::new(),
        }
    }

    /// Creates the template of a graph showing a single metric and its levels.
    ///
    /// # Examples
    ///
    /// ```
    /// use perfgraph_graphs::{GraphTemplate, LineType};
    ///
    /// let template = GraphTemplate::generic(&"load1".into(), "CPU load");
    /// assert_eq!(template.id, "METRIC_load1");
    /// assert_eq!(template.metrics[0].line_type, LineType::Area);
    /// assert_eq!(template.scalars[0].title, "Warning");
    /// ```
    pub fn generic(name: &MetricName, title: impl Into<String>) -> Self {
        let scalar = |kind, title: &str| ScalarDefinition {
            expression: MetricExpression::scalar(kind, Metric::new(name.clone())).into(),
            title: title.to_owned(),
            line_type: LineType::Line,
        };

        Self {
            scalars: vec![
                scalar(ScalarKind::Warn, "Warning"),
                scalar(ScalarKind::Crit, "Critical"),
            ],
            metrics: vec![MetricDefinition::new(
                MetricExpression::metric(name.clone()),
                LineType::Area,
            )],
            ..Self::new(format!("{GENERIC_TEMPLATE_PREFIX}{name}"), title)
        }
    }

    /// Returns the names of all metrics drawn by this template, in order of first use.
    ///
    /// Scalars and the range are not considered.
    pub fn metric_names(&self) -> Vec<&MetricName> {
        self.metrics
            .iter()
            .flat_map(MetricDefinition::metric_names)
            .unique()
            .collect()
    }

    /// Returns `true` if the error is caused by a metric that may be missing.
    pub(crate) fn is_optional(&self, error: &EvaluationError) -> bool {
        error
            .metric_name()
            .is_some_and(|name| self.optional_metrics.contains(name))
    }

    /// Evaluates the lines, rules, range and title of this template.
    ///
    /// Lines referring to missing optional metrics are left out. Rules that cannot be evaluated,
    /// for instance because a check reports no levels, are left out as well.
    pub fn evaluate(
        &self,
        metrics: &TranslatedMetrics,
        units: &UnitRegistry,
    ) -> Result<EvaluatedGraphTemplate, GraphError> {
        let mut evaluated_metrics = Vec::with_capacity(self.metrics.len());
        for definition in &self.metrics {
            match definition.evaluate(metrics, units) {
                Ok(quantity) => evaluated_metrics.push(quantity),
                Err(error) if self.is_optional(&error) => continue,
                Err(error) => return Err(GraphError::evaluation(&self.id, error, metrics)),
            }
        }

        let scalars = self
            .scalars
            .iter()
            .filter_map(|scalar| match scalar.evaluate(metrics, units) {
                Ok(quantity) => Some(quantity),
                Err(error) => {
                    perfgraph_log::debug!(
                        error = &error as &dyn Error,
                        template = self.id.as_str(),
                        "skipping graph scalar"
                    );
                    None
                }
            })
            .collect();

        let range = match get_graph_range(self, metrics, units) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        };

        Ok(EvaluatedGraphTemplate {
            id: self.id.clone(),
            title: replace_expressions(&self.title, metrics, units),
            scalars,
            consolidation_function: self
                .consolidation_function
                .unwrap_or(ConsolidationFunction::Max),
            range,
            omit_zero_metrics: self.omit_zero_metrics,
            metrics: evaluated_metrics,
        })
    }
}

/// Evaluates the range of a graph template.
///
/// Returns `(None, None)` if the template has no range or if either end cannot be evaluated, in
/// which case the range follows the displayed values.
pub fn get_graph_range(
    template: &GraphTemplate,
    metrics: &TranslatedMetrics,
    units: &UnitRegistry,
) -> (Option<f64>, Option<f64>) {
    let Some(range) = &template.range else {
        return (None, None);
    };

    let (min, max) = range.bounds();
    match (min.evaluate(metrics, units), max.evaluate(metrics, units)) {
        (Ok(min), Ok(max)) => (Some(min.value), Some(max.value)),
        _ => (None, None),
    }
}

/// An evaluated line, area or rule of a graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluatedQuantity {
    /// The title.
    pub title: String,
    /// The unit of the value.
    pub unit: Arc<UnitInfo>,
    /// The color as `#rrggbb`.
    pub color: String,
    /// The current value.
    pub value: f64,
    /// How the quantity is drawn.
    pub line_type: LineType,
}

impl EvaluatedQuantity {
    /// Renders the value with its unit.
    pub fn render(&self) -> String {
        self.unit.render(self.value)
    }
}

/// A graph template evaluated against the metrics of a check result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluatedGraphTemplate {
    /// The id of the template.
    pub id: String,
    /// The title with all placeholders replaced.
    pub title: String,
    /// The horizontal rules that could be evaluated.
    pub scalars: Vec<EvaluatedQuantity>,
    /// The consolidation function for time series.
    pub consolidation_function: ConsolidationFunction,
    /// The vertical range as `(min, max)`.
    pub range: Option<(f64, f64)>,
    /// Whether lines that are constantly zero are hidden.
    pub omit_zero_metrics: bool,
    /// The lines and areas.
    pub metrics: Vec<EvaluatedQuantity>,
}

/// An error returned when looking up or evaluating graph templates.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// No template with the requested id exists.
    #[error("there is no graph template with the id '{0}'")]
    TemplateNotFound(String),
    /// A template refers to a metric or level that the check result does not have.
    #[error(
        "graph recipe '{template}' uses undefined metric '{metric}', available are: {}",
        .available.join(", ")
    )]
    UndefinedMetric {
        /// The id of the template.
        template: String,
        /// The name of the missing metric.
        metric: MetricName,
        /// The sorted names of all metrics of the check result.
        available: Vec<String>,
    },
    /// A line of the template cannot be evaluated.
    #[error("graph recipe '{template}' cannot be evaluated")]
    Evaluation {
        /// The id of the template.
        template: String,
        /// The evaluation error.
        #[source]
        source: EvaluationError,
    },
}

impl GraphError {
    fn evaluation(template: &str, error: EvaluationError, metrics: &TranslatedMetrics) -> Self {
        match error.metric_name() {
            Some(metric) => Self::UndefinedMetric {
                template: template.to_owned(),
                metric: metric.clone(),
                available: metrics.names().map(|name| name.to_string()).collect(),
            },
            None => Self::Evaluation {
                template: template.to_owned(),
                source: error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use perfgraph_metrics::{
        MetricRegistry, ParseOptions, ResolutionContext, parse_perf_data, translate_metrics,
    };
    use similar_asserts::assert_eq;

    use super::*;

    fn translate(perf_data: &str, units: &UnitRegistry) -> TranslatedMetrics {
        let perf_data = parse_perf_data(perf_data, None, ParseOptions::default()).unwrap();
        translate_metrics(
            &perf_data.samples,
            None,
            &MetricRegistry::new(),
            units,
            ResolutionContext::new(),
        )
    }

    fn rules(template: &GraphTemplate, perf_data: &str) -> Vec<(String, String)> {
        let units = UnitRegistry::new();
        let metrics = translate(perf_data, &units);
        template
            .evaluate(&metrics, &units)
            .unwrap()
            .scalars
            .iter()
            .map(|scalar| (scalar.title.clone(), scalar.render()))
            .collect()
    }

    #[test]
    fn test_line_type_roundtrip() {
        for line_type in ["line", "area", "stack", "-line", "-area", "-stack"] {
            let parsed: LineType = line_type.parse().unwrap();
            assert_eq!(parsed.as_str(), line_type);
            assert_eq!(parsed.mirrored().mirrored(), parsed);
        }

        assert_eq!("dashed".parse::<LineType>(), Err(ParseLineTypeError));
    }

    #[test]
    fn test_predictive_line_type() {
        assert_eq!(LineType::Area.predictive(), LineType::Line);
        assert_eq!(LineType::Stack.predictive(), LineType::Line);
        assert_eq!(LineType::NegativeArea.predictive(), LineType::NegativeLine);
        assert_eq!(LineType::NegativeStack.predictive(), LineType::NegativeLine);
    }

    #[test]
    fn test_rules_without_levels() {
        let template = GraphTemplate::generic(&"one".into(), "One");
        assert!(rules(&template, "one=5;;;;").is_empty());
    }

    #[test]
    fn test_rules_with_levels() {
        let template = GraphTemplate::generic(&"one".into(), "One");
        assert_eq!(
            rules(&template, "one=5;7;10;;"),
            [
                ("Warning".to_owned(), "7".to_owned()),
                ("Critical".to_owned(), "10".to_owned()),
            ]
        );
    }

    #[test]
    fn test_evaluate_default_title() {
        let units = UnitRegistry::new();
        let metrics = translate("user=1 system=2", &units);

        let mut template = GraphTemplate::new("cpu", "CPU utilization");
        template.metrics.push(MetricDefinition::new(
            MetricExpression::sum(vec![
                MetricExpression::metric("user"),
                MetricExpression::metric("system"),
            ]),
            LineType::Area,
        ));
        template.metrics.push(
            MetricDefinition::new(MetricExpression::metric("system"), LineType::Line)
                .with_title("Kernel"),
        );

        let evaluated = template.evaluate(&metrics, &units).unwrap();
        let lines: Vec<(&str, f64)> = evaluated
            .metrics
            .iter()
            .map(|line| (line.title.as_str(), line.value))
            .collect();

        assert_eq!(lines, [("User", 3.0), ("Kernel", 2.0)]);
        assert_eq!(evaluated.consolidation_function, ConsolidationFunction::Max);
    }

    #[test]
    fn test_evaluate_undefined_metric() {
        let units = UnitRegistry::new();
        let metrics = translate("user=1 system=2", &units);

        let mut template = GraphTemplate::new("io", "Disk IO");
        template.metrics.push(MetricDefinition::new(
            MetricExpression::metric("disk_read"),
            LineType::Area,
        ));

        let error = template.evaluate(&metrics, &units).unwrap_err();
        assert_eq!(
            error.to_string(),
            "graph recipe 'io' uses undefined metric 'disk_read', available are: system, user"
        );
    }

    #[test]
    fn test_evaluate_optional_metric() {
        let units = UnitRegistry::new();
        let metrics = translate("user=1", &units);

        let mut template = GraphTemplate::new("cpu", "CPU");
        template.optional_metrics.push("steal".into());
        template.metrics = vec![
            MetricDefinition::new(MetricExpression::metric("user"), LineType::Stack),
            MetricDefinition::new(MetricExpression::metric("steal"), LineType::Stack),
        ];

        let evaluated = template.evaluate(&metrics, &units).unwrap();
        assert_eq!(evaluated.metrics.len(), 1);
    }

    #[test]
    fn test_graph_range() {
        let units = UnitRegistry::new();
        let metrics = translate("fs_used=20;;;0;80", &units);

        let mut template = GraphTemplate::new("fs", "Filesystem");
        assert_eq!(get_graph_range(&template, &metrics, &units), (None, None));

        template.range = Some(GraphRange::Fixed {
            min: MetricExpression::constant(0.0).into(),
            max: MetricExpression::scalar(ScalarKind::Max, Metric::new("fs_used")).into(),
        });
        assert_eq!(
            get_graph_range(&template, &metrics, &units),
            (Some(0.0), Some(80.0))
        );

        template.range = Some(GraphRange::Minimal {
            min: MetricExpression::constant(0.0).into(),
            max: MetricExpression::scalar(ScalarKind::Warn, Metric::new("fs_used")).into(),
        });
        assert_eq!(get_graph_range(&template, &metrics, &units), (None, None));
    }

    #[test]
    fn test_evaluate_title() {
        let units = UnitRegistry::new();
        let metrics = translate("load1=5;120;240;0;25", &units);

        let mut template = GraphTemplate::generic(&"load1".into(), "");
        template.title = "CPU Load - %(load1:max@count) CPU Cores".to_owned();

        let evaluated = template.evaluate(&metrics, &units).unwrap();
        assert_eq!(evaluated.title, "CPU Load - 25 CPU Cores");
    }
}
