//! Selection of the graph templates that apply to a check result.

use std::collections::HashSet;
use std::error::Error;

use perfgraph_base_schema::metrics::{MetricName, PredictionKind};
use perfgraph_base_schema::units::UnitRegistry;
use perfgraph_expression::MetricExpression;
use perfgraph_metrics::{MetricRegistry, TranslatedMetrics};

use crate::{
    EvaluatedGraphTemplate, GENERIC_TEMPLATE_PREFIX, GraphError, GraphRegistry, GraphTemplate,
    MetricDefinition,
};

/// Reduces a template to the lines that can be drawn.
///
/// Returns `None` if a conflicting metric exists, if a line refers to a missing metric that is
/// not optional, or if no line is left.
fn applicable_template(
    mut template: GraphTemplate,
    metrics: &TranslatedMetrics,
    units: &UnitRegistry,
) -> Option<GraphTemplate> {
    if template
        .conflicting_metrics
        .iter()
        .any(|name| metrics.contains(name))
    {
        return None;
    }

    let definitions = std::mem::take(&mut template.metrics);
    for definition in definitions {
        match definition.evaluate(metrics, units) {
            Ok(_) => template.metrics.push(definition),
            Err(error) if template.is_optional(&error) => {
                perfgraph_log::trace!(
                    error = &error as &dyn Error,
                    template = template.id.as_str(),
                    "dropping optional graph line"
                );
            }
            Err(_) => return None,
        }
    }

    (!template.metrics.is_empty()).then_some(template)
}

/// Appends lines for the predictive metrics of all metrics drawn by the template.
fn add_predictive_metrics(template: &mut GraphTemplate, metrics: &TranslatedMetrics) {
    let referenced: HashSet<&MetricName> = template
        .metrics
        .iter()
        .flat_map(MetricDefinition::metric_names)
        .collect();

    let mut seen = HashSet::new();
    let mut overlays = Vec::new();

    for definition in &template.metrics {
        for name in definition.metric_names() {
            if name.prediction().is_some() || !seen.insert(name) {
                continue;
            }

            for kind in [PredictionKind::Upper, PredictionKind::Lower] {
                let predictive = name.predictive(kind);
                if metrics.contains(&predictive) && !referenced.contains(&predictive) {
                    overlays.push(MetricDefinition::new(
                        MetricExpression::metric(predictive),
                        definition.line_type.predictive(),
                    ));
                }
            }
        }
    }

    template.metrics.extend(overlays);
}

/// Returns the graph templates to draw for a check result.
///
/// Registered templates come first, in registration order, reduced to the lines that can be drawn
/// and extended by lines for predictive metrics. Every metric not drawn by any of them gets a
/// generic template, in the order of the metric names, unless its translation disables automatic
/// graphs.
pub fn get_graph_templates(
    graphs: &GraphRegistry,
    registry: &MetricRegistry,
    metrics: &TranslatedMetrics,
    units: &UnitRegistry,
) -> Vec<GraphTemplate> {
    if metrics.is_empty() {
        return Vec::new();
    }

    let mut templates: Vec<GraphTemplate> = graphs
        .templates(registry)
        .into_iter()
        .filter_map(|template| applicable_template(template, metrics, units))
        .collect();

    for template in &mut templates {
        add_predictive_metrics(template, metrics);
    }

    let graphed: HashSet<&MetricName> = templates
        .iter()
        .flat_map(GraphTemplate::metric_names)
        .collect();

    let implicit: Vec<GraphTemplate> = metrics
        .iter()
        .filter(|(name, metric)| metric.auto_graph && !graphed.contains(name))
        .map(|(name, metric)| GraphTemplate::generic(name, metric.title.clone()))
        .collect();

    templates.extend(implicit);
    templates
}

/// Returns the graph template with the given id.
///
/// Ids starting with `METRIC_` refer to the generic template of the metric named by the rest of
/// the id, which always exists.
pub fn get_graph_template(
    graphs: &GraphRegistry,
    registry: &MetricRegistry,
    id: &str,
) -> Result<GraphTemplate, GraphError> {
    if let Some(name) = id.strip_prefix(GENERIC_TEMPLATE_PREFIX) {
        let name = MetricName::from(name);
        let title = registry.title(&name);
        return Ok(GraphTemplate::generic(&name, title));
    }

    graphs
        .template(id, registry)
        .ok_or_else(|| GraphError::TemplateNotFound(id.to_owned()))
}

/// Returns the ids and titles of all registered templates, sorted by title.
///
/// Templates without a title are listed with their id.
pub fn graph_template_choices(
    graphs: &GraphRegistry,
    registry: &MetricRegistry,
) -> Vec<(String, String)> {
    let mut choices: Vec<(String, String)> = graphs
        .templates(registry)
        .into_iter()
        .map(|template| {
            let title = if template.title.is_empty() {
                template.id.clone()
            } else {
                template.title
            };
            (template.id, title)
        })
        .collect();

    choices.sort_by(|(_, a), (_, b)| a.cmp(b));
    choices
}

/// Evaluates all graph templates that apply to a check result.
///
/// Templates that fail to evaluate are logged and skipped.
pub fn evaluate_graph_templates(
    graphs: &GraphRegistry,
    registry: &MetricRegistry,
    metrics: &TranslatedMetrics,
    units: &UnitRegistry,
) -> Vec<EvaluatedGraphTemplate> {
    get_graph_templates(graphs, registry, metrics, units)
        .iter()
        .filter_map(|template| match template.evaluate(metrics, units) {
            Ok(evaluated) => Some(evaluated),
            Err(error) => {
                perfgraph_log::warn!(
                    error = &error as &dyn Error,
                    template = template.id.as_str(),
                    "failed to evaluate graph template"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use perfgraph_metrics::{
        ParseOptions, ResolutionContext, TranslationRule, parse_perf_data, translate_metrics,
    };
    use similar_asserts::assert_eq;

    use super::*;
    use crate::{LineType, RawGraphTemplate};

    struct Fixture {
        graphs: GraphRegistry,
        registry: MetricRegistry,
        units: UnitRegistry,
    }

    impl Fixture {
        fn new(templates: &str) -> Self {
            let raw: Vec<RawGraphTemplate> = serde_yaml::from_str(templates).unwrap();
            let mut graphs = GraphRegistry::new();
            for template in &raw {
                graphs.register_legacy_graph(template).unwrap();
            }

            Self {
                graphs,
                registry: MetricRegistry::new(),
                units: UnitRegistry::new(),
            }
        }

        fn translate(&self, perf_data: &str, check_command: Option<&str>) -> TranslatedMetrics {
            let perf_data = parse_perf_data(perf_data, None, ParseOptions::default()).unwrap();
            translate_metrics(
                &perf_data.samples,
                check_command,
                &self.registry,
                &self.units,
                ResolutionContext::new(),
            )
        }

        fn templates(&self, perf_data: &str) -> Vec<GraphTemplate> {
            let metrics = self.translate(perf_data, None);
            get_graph_templates(&self.graphs, &self.registry, &metrics, &self.units)
        }

        fn ids(&self, perf_data: &str) -> Vec<String> {
            self.templates(perf_data)
                .into_iter()
                .map(|template| template.id)
                .collect()
        }
    }

    fn cpu_fixture() -> Fixture {
        Fixture::new(
            r#"
- id: util_fallback
  metrics: [[util, area]]
  conflicting_metrics: [user]
- id: cpu_utilization
  metrics: [[user, stack], [system, stack], [steal, stack]]
  optional_metrics: [steal]
"#,
        )
    }

    #[test]
    fn test_empty_table() {
        assert!(cpu_fixture().templates("").is_empty());
    }

    #[test]
    fn test_conflicting_metrics() {
        let fixture = cpu_fixture();

        assert_eq!(fixture.ids("util=3"), ["util_fallback"]);
        assert_eq!(
            fixture.ids("user=1 system=2 util=3"),
            ["cpu_utilization", "METRIC_util"]
        );
    }

    #[test]
    fn test_optional_metrics() {
        let fixture = cpu_fixture();

        let templates = fixture.templates("user=1 system=2");
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].metrics.len(), 2);

        let templates = fixture.templates("user=1 system=2 steal=0");
        assert_eq!(templates[0].metrics.len(), 3);

        assert_eq!(fixture.ids("user=1"), ["METRIC_user"]);
    }

    #[test]
    fn test_predictive_metrics() {
        let fixture = Fixture::new(
            r#"
- id: load
  metrics: [[load1, area], [load5, "-area"], ["load1:warn", line]]
"#,
        );

        let templates = fixture.templates(
            "load1=1;2 predict_load1=2 predict_lower_load1=0.5 load5=2 predict_lower_load5=1",
        );
        assert_eq!(templates.len(), 1);

        let lines: Vec<String> = templates[0]
            .metrics
            .iter()
            .map(|definition| {
                format!("{} {}", definition.line_type, definition.metric_names()[0])
            })
            .collect();

        assert_eq!(
            lines,
            [
                "area load1",
                "-area load5",
                "line load1",
                "line predict_load1",
                "line predict_lower_load1",
                "-line predict_lower_load5",
            ]
        );
    }

    #[test]
    fn test_implicit_templates_sorted() {
        let mut fixture = Fixture::new("[]");
        fixture
            .registry
            .translations_mut()
            .insert(
                "check_mk-test",
                "hidden",
                TranslationRule {
                    auto_graph: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        let metrics = fixture.translate("zeta=1 hidden=1 alpha=2", Some("check_mk-test"));
        let templates =
            get_graph_templates(&fixture.graphs, &fixture.registry, &metrics, &fixture.units);

        let ids: Vec<&str> = templates
            .iter()
            .map(|template| template.id.as_str())
            .collect();
        assert_eq!(ids, ["METRIC_alpha", "METRIC_zeta"]);

        assert_eq!(templates[0].title, "Alpha");
        assert_eq!(templates[0].metrics[0].line_type, LineType::Area);
        let scalars: Vec<&str> = templates[0]
            .scalars
            .iter()
            .map(|scalar| scalar.title.as_str())
            .collect();
        assert_eq!(scalars, ["Warning", "Critical"]);
    }

    #[test]
    fn test_get_graph_template() {
        let fixture = cpu_fixture();

        let template =
            get_graph_template(&fixture.graphs, &fixture.registry, "METRIC_mem_used").unwrap();
        assert_eq!(template.id, "METRIC_mem_used");
        assert_eq!(template.title, "Mem_Used");

        let template =
            get_graph_template(&fixture.graphs, &fixture.registry, "cpu_utilization").unwrap();
        assert_eq!(template.metrics.len(), 3);

        let error = get_graph_template(&fixture.graphs, &fixture.registry, "nope").unwrap_err();
        assert_eq!(
            error.to_string(),
            "there is no graph template with the id 'nope'"
        );
    }

    #[test]
    fn test_choices() {
        let fixture = Fixture::new(
            r#"
- {id: b, title: Memory}
- {id: a, title: CPU}
- {id: c}
"#,
        );

        assert_eq!(
            graph_template_choices(&fixture.graphs, &fixture.registry),
            [
                ("a".to_owned(), "CPU".to_owned()),
                ("b".to_owned(), "Memory".to_owned()),
                ("c".to_owned(), "c".to_owned()),
            ]
        );
    }

    #[test]
    fn test_evaluate_graph_templates() {
        let fixture = cpu_fixture();
        let metrics = fixture.translate("user=1 system=2", None);

        let evaluated =
            evaluate_graph_templates(&fixture.graphs, &fixture.registry, &metrics, &fixture.units);

        insta::assert_debug_snapshot!(
            evaluated
                .iter()
                .flat_map(|template| &template.metrics)
                .map(|line| (line.title.as_str(), line.line_type.as_str(), line.render()))
                .collect::<Vec<_>>(),
            @r#"
        [
            (
                "User",
                "stack",
                "1",
            ),
            (
                "System",
                "stack",
                "2",
            ),
        ]
        "#
        );
    }
}
