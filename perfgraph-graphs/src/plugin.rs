//! Graphs declared by plugins.

use perfgraph_base_schema::metrics::MetricName;
use perfgraph_expression::{MetricExpression, Quantity};
use perfgraph_metrics::{MetricRegistry, ScalarKind};
use serde::{Deserialize, Serialize};

use crate::{GraphRange, GraphTemplate, LineType, MetricDefinition, ScalarDefinition};

/// One end of a range, either a fixed number or a quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    /// A fixed number.
    Value(f64),
    /// A quantity evaluated against the metrics.
    Quantity(Quantity),
}

impl Bound {
    /// Converts the bound into an expression.
    pub fn to_expression(&self) -> MetricExpression {
        match self {
            Self::Value(value) => MetricExpression::constant(*value),
            Self::Quantity(quantity) => quantity.to_expression(),
        }
    }

    /// Returns the names of all metrics the bound refers to.
    pub fn metric_names(&self) -> Vec<&MetricName> {
        match self {
            Self::Value(_) => Vec::new(),
            Self::Quantity(quantity) => quantity.metric_names(),
        }
    }

    /// Returns all scalars the bound refers to.
    pub fn scalars(&self) -> Vec<(&MetricName, ScalarKind)> {
        match self {
            Self::Value(_) => Vec::new(),
            Self::Quantity(quantity) => quantity.scalars(),
        }
    }
}

impl From<f64> for Bound {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

/// The range a graph covers at least.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinimalRange {
    /// The lower end.
    pub lower: Bound,
    /// The upper end.
    pub upper: Bound,
}

/// A graph declared by a plugin.
///
/// Compound lines are stacked areas, simple lines are drawn as lines. Warning, critical, minimum
/// and maximum levels among the simple lines become horizontal rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// The unique name of the graph.
    pub name: String,
    /// The title.
    pub title: String,
    /// The range the graph covers at least.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimal_range: Option<MinimalRange>,
    /// Quantities drawn as stacked areas.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compound_lines: Vec<Quantity>,
    /// Quantities drawn as lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub simple_lines: Vec<Quantity>,
    /// Metrics that may be missing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional: Vec<MetricName>,
    /// Metrics whose presence disables the graph.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicting: Vec<MetricName>,
}

/// The definitions of one graph, split by kind.
struct Lines {
    compound: Vec<MetricDefinition>,
    simple: Vec<MetricDefinition>,
    scalars: Vec<ScalarDefinition>,
}

impl Graph {
    fn lines(&self, registry: &MetricRegistry, negative: bool) -> Lines {
        let orient = |line_type: LineType| {
            if negative {
                line_type.mirrored()
            } else {
                line_type
            }
        };

        let definition = |quantity: &Quantity, line_type| MetricDefinition {
            expression: quantity.to_expression().into(),
            line_type: orient(line_type),
            title: Some(quantity.title(registry)),
        };

        let compound = self
            .compound_lines
            .iter()
            .map(|quantity| definition(quantity, LineType::Stack))
            .collect();

        let mut simple = Vec::new();
        let mut scalars = Vec::new();
        for quantity in &self.simple_lines {
            let expression = quantity.to_expression();
            if expression.is_scalar() {
                scalars.push(ScalarDefinition {
                    expression: expression.into(),
                    title: quantity.title(registry),
                    line_type: orient(LineType::Line),
                });
            } else {
                simple.push(definition(quantity, LineType::Line));
            }
        }

        Lines {
            compound,
            simple,
            scalars,
        }
    }

    fn range_bounds(&self) -> Option<(MetricExpression, MetricExpression)> {
        let range = self.minimal_range.as_ref()?;
        Some((range.lower.to_expression(), range.upper.to_expression()))
    }

    /// Builds the graph template of this graph.
    pub fn to_template(&self, registry: &MetricRegistry) -> GraphTemplate {
        let Lines {
            mut compound,
            simple,
            scalars,
        } = self.lines(registry, false);
        compound.extend(simple);

        GraphTemplate {
            scalars,
            conflicting_metrics: self.conflicting.clone(),
            optional_metrics: self.optional.clone(),
            range: self.range_bounds().map(|(min, max)| GraphRange::Minimal {
                min: min.into(),
                max: max.into(),
            }),
            metrics: compound,
            ..GraphTemplate::new(&self.name, &self.title)
        }
    }
}

fn concat(lower: &[MetricName], upper: &[MetricName]) -> Vec<MetricName> {
    lower.iter().chain(upper).cloned().collect()
}

/// Two graphs drawn above and below the zero line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BidirectionalGraph {
    /// The unique name of the graph.
    pub name: String,
    /// The title.
    pub title: String,
    /// The graph drawn below the zero line.
    pub lower: Graph,
    /// The graph drawn above the zero line.
    pub upper: Graph,
}

impl BidirectionalGraph {
    /// Builds the graph template of this graph.
    ///
    /// Areas come first, then lines, the lower half before the upper half in each group. The
    /// range spans the ranges of both halves.
    pub fn to_template(&self, registry: &MetricRegistry) -> GraphTemplate {
        let lower = self.lower.lines(registry, true);
        let upper = self.upper.lines(registry, false);

        let metrics = lower
            .compound
            .into_iter()
            .chain(upper.compound)
            .chain(lower.simple)
            .chain(upper.simple)
            .collect();

        let (mins, maxs): (Vec<_>, Vec<_>) = [&self.lower, &self.upper]
            .into_iter()
            .filter_map(Graph::range_bounds)
            .unzip();
        let range = (!mins.is_empty()).then(|| GraphRange::Minimal {
            min: MetricExpression::minimum(mins).into(),
            max: MetricExpression::maximum(maxs).into(),
        });

        GraphTemplate {
            scalars: lower.scalars.into_iter().chain(upper.scalars).collect(),
            conflicting_metrics: concat(&self.lower.conflicting, &self.upper.conflicting),
            optional_metrics: concat(&self.lower.optional, &self.upper.optional),
            range,
            metrics,
            ..GraphTemplate::new(&self.name, &self.title)
        }
    }
}

/// A graph declared by a plugin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum GraphPlugin {
    /// A single graph.
    Graph(Graph),
    /// Two graphs drawn above and below the zero line.
    Bidirectional(BidirectionalGraph),
}

impl GraphPlugin {
    /// Returns the unique name of the graph.
    pub fn name(&self) -> &str {
        match self {
            Self::Graph(graph) => &graph.name,
            Self::Bidirectional(graph) => &graph.name,
        }
    }

    /// Returns the title of the graph.
    pub fn title(&self) -> &str {
        match self {
            Self::Graph(graph) => &graph.title,
            Self::Bidirectional(graph) => &graph.title,
        }
    }

    /// Builds the graph template of this graph.
    pub fn to_template(&self, registry: &MetricRegistry) -> GraphTemplate {
        match self {
            Self::Graph(graph) => graph.to_template(registry),
            Self::Bidirectional(graph) => graph.to_template(registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use perfgraph_base_schema::color::Color;
    use perfgraph_base_schema::units::UnitSpec;
    use perfgraph_expression::{Metric, ScalarOf};
    use perfgraph_metrics::DeclaredMetric;
    use similar_asserts::assert_eq;

    use super::*;

    fn registry(names: &[&str]) -> MetricRegistry {
        let mut registry = MetricRegistry::new();
        for name in names {
            registry.register_metric(DeclaredMetric {
                name: (*name).into(),
                title: "Title".to_owned(),
                unit: UnitSpec::neutral(),
                color: Color::Black,
                help: None,
            });
        }
        registry
    }

    fn summary(template: &GraphTemplate) -> Vec<String> {
        template
            .metrics
            .iter()
            .map(|definition| {
                let names = definition.metric_names();
                format!("{} {}", definition.line_type, names[0])
            })
            .collect()
    }

    #[test]
    fn test_simple_lines_split_scalars() {
        let graph: Graph = serde_yaml::from_str(
            r#"
name: name
title: Title
simple_lines:
  - metric-name-1
  - {type: warning_of, metric: metric-name-2}
  - {type: critical_of, metric: metric-name-3}
  - {type: maximum_of, metric: metric-name-4, color: BLUE}
  - {type: sum, title: Sum, color: BLUE, summands: [metric-name-5]}
optional: [metric-name-opt]
conflicting: [metric-name-confl]
"#,
        )
        .unwrap();

        let template = graph.to_template(&registry(&["metric-name-1", "metric-name-2"]));

        assert_eq!(summary(&template), ["line metric-name-1", "line metric-name-5"]);
        assert_eq!(template.metrics[1].title.as_deref(), Some("Sum"));

        let scalars: Vec<&str> = template
            .scalars
            .iter()
            .map(|scalar| scalar.title.as_str())
            .collect();
        assert_eq!(
            scalars,
            ["Warning of Title", "Critical of Metric-Name-3", "Metric-Name-4"]
        );
        assert_eq!(
            template.scalars[2].expression.expression,
            MetricExpression::MaximumOf(ScalarOf {
                metric: Metric::new("metric-name-4"),
                color: Some("#1e90ff".to_owned()),
            })
        );

        assert_eq!(template.optional_metrics, [MetricName::from("metric-name-opt")]);
        assert_eq!(template.conflicting_metrics, [MetricName::from("metric-name-confl")]);
        assert_eq!(template.range, None);
    }

    #[test]
    fn test_compound_lines_keep_scalars() {
        let graph: Graph = serde_yaml::from_str(
            r#"
name: name
title: Title
compound_lines:
  - metric-name-1
  - {type: warning_of, metric: metric-name-2}
minimal_range: {lower: 0, upper: 100.0}
"#,
        )
        .unwrap();

        let template = graph.to_template(&MetricRegistry::new());

        assert_eq!(
            summary(&template),
            ["stack metric-name-1", "stack metric-name-2"]
        );
        assert!(template.scalars.is_empty());
        assert_eq!(
            template.range,
            Some(GraphRange::Minimal {
                min: MetricExpression::constant(0.0).into(),
                max: MetricExpression::constant(100.0).into(),
            })
        );
    }

    #[test]
    fn test_bidirectional() {
        let graph: GraphPlugin = serde_yaml::from_str(
            r#"
type: bidirectional
name: name
title: Title
lower:
  name: name-lower
  title: Title lower
  compound_lines: [l1]
  simple_lines: [l2, {type: warning_of, metric: l3}]
  optional: [opt-l]
  conflicting: [confl-l]
  minimal_range: {lower: 1, upper: 10}
upper:
  name: name-upper
  title: Title upper
  compound_lines: [u1]
  simple_lines: [u2, {type: critical_of, metric: u3}]
  optional: [opt-u]
  conflicting: [confl-u]
"#,
        )
        .unwrap();

        assert_eq!(graph.name(), "name");
        let template = graph.to_template(&MetricRegistry::new());

        assert_eq!(template.id, "name");
        assert_eq!(template.title, "Title");
        assert_eq!(
            summary(&template),
            ["-stack l1", "stack u1", "-line l2", "line u2"]
        );

        let scalars: Vec<String> = template
            .scalars
            .iter()
            .map(|scalar| format!("{} {}", scalar.line_type, scalar.title))
            .collect();
        assert_eq!(scalars, ["-line Warning of L3", "line Critical of U3"]);

        assert_eq!(
            template.optional_metrics,
            [MetricName::from("opt-l"), MetricName::from("opt-u")]
        );
        assert_eq!(
            template.conflicting_metrics,
            [MetricName::from("confl-l"), MetricName::from("confl-u")]
        );
        assert_eq!(
            template.range,
            Some(GraphRange::Minimal {
                min: MetricExpression::minimum(vec![MetricExpression::constant(1.0)]).into(),
                max: MetricExpression::maximum(vec![MetricExpression::constant(10.0)]).into(),
            })
        );
    }

    #[test]
    fn test_bidirectional_without_range() {
        let graph = BidirectionalGraph {
            name: "name".to_owned(),
            title: "Title".to_owned(),
            lower: Graph {
                name: "lower".to_owned(),
                title: "Lower".to_owned(),
                minimal_range: None,
                compound_lines: vec![],
                simple_lines: vec!["l".into()],
                optional: vec![],
                conflicting: vec![],
            },
            upper: Graph {
                name: "upper".to_owned(),
                title: "Upper".to_owned(),
                minimal_range: None,
                compound_lines: vec![],
                simple_lines: vec!["u".into()],
                optional: vec![],
                conflicting: vec![],
            },
        };

        let template = graph.to_template(&MetricRegistry::new());
        assert_eq!(template.range, None);
        assert_eq!(summary(&template), ["-line l", "line u"]);
    }
}
