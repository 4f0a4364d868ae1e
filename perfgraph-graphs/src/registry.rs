use indexmap::IndexMap;
use perfgraph_expression::ParseExpressionError;
use perfgraph_metrics::MetricRegistry;

use crate::{
    GraphPlugin, GraphTemplate, MANUAL_TEMPLATE_PREFIX, PerfometerPlugin, RawGraphTemplate,
};

/// Registry of graphs and perfometers.
///
/// The registry is built once from the plugin configuration and is read-only afterwards. Graph
/// templates are rebuilt from it for every request, see [`GraphRegistry::templates`].
#[derive(Debug, Default)]
pub struct GraphRegistry {
    graphs: IndexMap<String, GraphPlugin>,
    legacy: IndexMap<String, GraphTemplate>,
    perfometers: IndexMap<String, PerfometerPlugin>,
    manual_index: usize,
}

impl GraphRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a graph, replacing a previous graph of the same name.
    pub fn register_graph(&mut self, graph: GraphPlugin) {
        self.graphs.insert(graph.name().to_owned(), graph);
    }

    /// Registers a legacy graph template and returns its id.
    ///
    /// Templates without an id are named `manual_graph_template_<n>`, counting from zero.
    pub fn register_legacy_graph(
        &mut self,
        raw: &RawGraphTemplate,
    ) -> Result<String, ParseExpressionError> {
        let id = match &raw.id {
            Some(id) => id.clone(),
            None => {
                let id = format!("{MANUAL_TEMPLATE_PREFIX}{}", self.manual_index);
                self.manual_index += 1;
                id
            }
        };

        let template = raw.to_template(id.clone())?;
        self.legacy.insert(id.clone(), template);
        Ok(id)
    }

    /// Registers a perfometer, replacing a previous perfometer of the same name.
    pub fn register_perfometer(&mut self, perfometer: PerfometerPlugin) {
        self.perfometers.insert(perfometer.name().to_owned(), perfometer);
    }

    /// Returns the registered graphs in registration order.
    pub fn graphs(&self) -> impl Iterator<Item = &GraphPlugin> {
        self.graphs.values()
    }

    /// Returns the perfometers in registration order.
    pub fn perfometers(&self) -> impl Iterator<Item = &PerfometerPlugin> {
        self.perfometers.values()
    }

    /// Returns `true` if a graph or legacy template with the given id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.graphs.contains_key(id) || self.legacy.contains_key(id)
    }

    /// Builds the graph template with the given id.
    pub fn template(&self, id: &str, registry: &MetricRegistry) -> Option<GraphTemplate> {
        match self.graphs.get(id) {
            Some(graph) => Some(graph.to_template(registry)),
            None => self.legacy.get(id).cloned(),
        }
    }

    /// Builds all graph templates.
    ///
    /// Graphs declared by plugins come first in registration order, followed by legacy templates
    /// whose id is not taken by a plugin graph.
    pub fn templates(&self, registry: &MetricRegistry) -> Vec<GraphTemplate> {
        let legacy = self
            .legacy
            .iter()
            .filter(|(id, _)| !self.graphs.contains_key(id.as_str()))
            .map(|(_, template)| template.clone());

        self.graphs
            .values()
            .map(|graph| graph.to_template(registry))
            .chain(legacy)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::Graph;

    fn graph(name: &str, title: &str) -> GraphPlugin {
        GraphPlugin::Graph(Graph {
            name: name.to_owned(),
            title: title.to_owned(),
            minimal_range: None,
            compound_lines: vec![],
            simple_lines: vec!["metric".into()],
            optional: vec![],
            conflicting: vec![],
        })
    }

    fn legacy(id: Option<&str>, title: &str) -> RawGraphTemplate {
        RawGraphTemplate {
            id: id.map(str::to_owned),
            title: Some(title.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn test_manual_ids() {
        let mut registry = GraphRegistry::new();

        let ids = [
            registry.register_legacy_graph(&legacy(None, "A")).unwrap(),
            registry.register_legacy_graph(&legacy(Some("b"), "B")).unwrap(),
            registry.register_legacy_graph(&legacy(None, "C")).unwrap(),
        ];

        assert_eq!(
            ids,
            ["manual_graph_template_0", "b", "manual_graph_template_1"]
        );
        assert!(registry.contains("manual_graph_template_1"));
    }

    #[test]
    fn test_plugin_graphs_win() {
        let mut registry = GraphRegistry::new();
        registry
            .register_legacy_graph(&legacy(Some("cpu"), "Legacy CPU"))
            .unwrap();
        registry
            .register_legacy_graph(&legacy(Some("mem"), "Legacy memory"))
            .unwrap();
        registry.register_graph(graph("cpu", "CPU"));
        registry.register_graph(graph("disk", "Disk"));

        let metrics = MetricRegistry::new();
        let templates: Vec<(String, String)> = registry
            .templates(&metrics)
            .into_iter()
            .map(|template| (template.id, template.title))
            .collect();

        assert_eq!(
            templates,
            [
                ("cpu".to_owned(), "CPU".to_owned()),
                ("disk".to_owned(), "Disk".to_owned()),
                ("mem".to_owned(), "Legacy memory".to_owned()),
            ]
        );
        assert_eq!(
            registry.template("cpu", &metrics).map(|template| template.title),
            Some("CPU".to_owned())
        );
        assert_eq!(registry.template("missing", &metrics), None);
    }
}
