use std::error::Error;
use std::path::Path;

use indexmap::IndexMap;
use perfgraph_base_schema::metrics::MetricName;
use perfgraph_base_schema::units::{TemperatureUnit, UnitRegistry};
use perfgraph_graphs::{GraphPlugin, GraphRegistry, PerfometerPlugin, RawGraphTemplate};
use perfgraph_metrics::{
    DeclaredMetric, LegacyMetricInfo, MetricRegistry, Translation, TranslationRule,
};
use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::config::{ConfigFormat, load_file};

/// A file declaring metrics, translations, graphs and perfometers.
///
/// Bundles are YAML files, or JSON files if their extension is `.json`. All sections are
/// optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PluginBundle {
    /// Declared metrics.
    pub metrics: Vec<DeclaredMetric>,
    /// Declarative translations of perfdata names.
    pub translations: Vec<Translation>,
    /// Declared graphs.
    pub graphs: Vec<GraphPlugin>,
    /// Declared perfometers.
    pub perfometers: Vec<PerfometerPlugin>,
    /// Entries of the legacy metric info table by metric name.
    pub metric_info: IndexMap<MetricName, LegacyMetricInfo>,
    /// Legacy graph templates.
    pub graph_info: Vec<RawGraphTemplate>,
    /// Legacy translation rules by check command and perfdata name.
    pub check_metrics: IndexMap<String, IndexMap<String, TranslationRule>>,
}

impl PluginBundle {
    /// Loads a bundle from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_file(path, ConfigFormat::from_path(path))
    }
}

/// The registries built from all plugin bundles.
#[derive(Debug, Default)]
pub struct Plugins {
    /// Metric declarations and translations.
    pub metrics: MetricRegistry,
    /// Graphs and perfometers.
    pub graphs: GraphRegistry,
    /// Units used by the declared metrics.
    pub units: UnitRegistry,
}

impl Plugins {
    /// Creates empty registries displaying temperatures in the given unit.
    pub fn new(temperature_unit: TemperatureUnit) -> Self {
        Self {
            metrics: MetricRegistry::new(),
            graphs: GraphRegistry::new(),
            units: UnitRegistry::with_temperature_unit(temperature_unit),
        }
    }

    /// Registers everything declared in a bundle.
    ///
    /// Translation rules with invalid regular expressions and legacy graph templates with invalid
    /// expressions are logged and skipped.
    pub fn add_bundle(&mut self, bundle: &PluginBundle) {
        for metric in &bundle.metrics {
            self.units.parse_or_add_unit(&metric.unit);
            self.metrics.register_metric(metric.clone());
        }

        for (name, info) in &bundle.metric_info {
            self.metrics.register_legacy_metric_info(name.clone(), info.clone());
        }

        let translations = self.metrics.translations_mut();
        for (check_command, rules) in &bundle.check_metrics {
            for (key, rule) in rules {
                if let Err(error) = translations.insert(check_command, key, rule.clone()) {
                    perfgraph_log::warn!(
                        error = &error as &dyn Error,
                        check_command = check_command.as_str(),
                        "skipping translation rule"
                    );
                }
            }
        }

        for translation in &bundle.translations {
            translations.add_translation(translation);
        }

        for graph in &bundle.graphs {
            self.graphs.register_graph(graph.clone());
        }

        for raw in &bundle.graph_info {
            if let Err(error) = self.graphs.register_legacy_graph(raw) {
                perfgraph_log::warn!(
                    error = &error as &dyn Error,
                    id = raw.id.as_deref(),
                    "skipping graph template"
                );
            }
        }

        for perfometer in &bundle.perfometers {
            self.graphs.register_perfometer(perfometer.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use perfgraph_expression::parse_expression;
    use perfgraph_metrics::{ParseOptions, ResolutionContext, parse_perf_data, translate_metrics};
    use similar_asserts::assert_eq;

    use super::*;
    use crate::{Config, ConfigErrorKind};

    const BUNDLE: &str = r#"
metrics:
  - name: mem_used
    title: Used memory
    unit: {notation: {type: iec, symbol: B}, precision: {type: auto, digits: 2}}
    color: BLUE

translations:
  - name: memory
    check_commands: [{type: passive_check, name: mem}]
    translations:
      used: {type: rename_to, name: mem_used}

graphs:
  - type: graph
    name: memory
    title: Memory
    compound_lines: [mem_used]

graph_info:
  - id: broken
    metrics: [["a,+", line]]
  - title: Free memory
    metrics: [[mem_free, area]]

metric_info:
  mem_free:
    title: Free memory
    unit: bytes
    color: "21/a"

check_metrics:
  check_mk-mem_legacy:
    free: {name: mem_free}
    "~(": {name: broken}
"#;

    fn write_config(dir: &Path) {
        fs::write(dir.join("config.yml"), "plugins: [bundle.yml]").unwrap();
        fs::write(dir.join("bundle.yml"), BUNDLE).unwrap();
    }

    #[test]
    fn test_load_plugins() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path());

        let plugins = Config::from_path(dir.path()).unwrap().plugins().unwrap();

        assert_eq!(plugins.metrics.title("mem_used"), "Used memory");
        assert_eq!(plugins.metrics.title("mem_free"), "Free memory");
        assert!(plugins.graphs.contains("memory"));
        assert!(!plugins.graphs.contains("broken"));
        assert!(plugins.graphs.contains("manual_graph_template_0"));

        let perf_data = parse_perf_data(
            "used=1024 free=2048",
            Some("check_mk-mem"),
            ParseOptions::default(),
        )
        .unwrap();
        let metrics = translate_metrics(
            &perf_data.samples,
            perf_data.check_command.as_deref(),
            &plugins.metrics,
            &plugins.units,
            ResolutionContext::new(),
        );

        let evaluated = parse_expression("mem_used")
            .unwrap()
            .evaluate(&metrics, &plugins.units)
            .unwrap();
        assert_eq!(evaluated.value, 1024.0);
        assert_eq!(evaluated.render(), "1 KiB");
    }

    #[test]
    fn test_legacy_translations() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path());

        let plugins = Config::from_path(dir.path()).unwrap().plugins().unwrap();
        let translations = plugins.metrics.translations();

        assert_eq!(
            translations
                .perfvar_translation("free", Some("check_mk-mem_legacy"))
                .name
                .as_deref(),
            Some("mem_free")
        );
        assert_eq!(
            translations
                .perfvar_translation("used", Some("check_mk-mem"))
                .name
                .as_deref(),
            Some("mem_used")
        );
    }

    #[test]
    fn test_json_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        let json = r#"{"graph_info": [{"id": "cpu", "metrics": [["user", "area"]]}]}"#;
        fs::write(&path, json).unwrap();

        let bundle = PluginBundle::load(&path).unwrap();
        assert_eq!(bundle.graph_info.len(), 1);
        assert!(bundle.metrics.is_empty());

        fs::write(&path, "graph_info: []").unwrap();
        let error = PluginBundle::load(&path).unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::BadJson);
    }

    #[test]
    fn test_later_bundles_win() {
        let mut plugins = Plugins::default();

        let first: PluginBundle =
            serde_yaml::from_str("graph_info: [{id: cpu, title: First}]").unwrap();
        let second: PluginBundle =
            serde_yaml::from_str("graph_info: [{id: cpu, title: Second}]").unwrap();
        plugins.add_bundle(&first);
        plugins.add_bundle(&second);

        let template = plugins.graphs.template("cpu", &plugins.metrics).unwrap();
        assert_eq!(template.title, "Second");
    }
}
