use indexmap::IndexMap;
use perfgraph_base_schema::color::Color;
use perfgraph_base_schema::metrics::MetricName;
use perfgraph_base_schema::units::UnitSpec;
use serde::{Deserialize, Serialize};

use crate::TranslationTable;

/// A metric declared by a plugin.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DeclaredMetric {
    /// The canonical metric name.
    pub name: MetricName,
    /// The metric title.
    pub title: String,
    /// The unit of the metric.
    pub unit: UnitSpec,
    /// The color of the metric.
    pub color: Color,
    /// An optional help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// An entry of the legacy `metric_info` table.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LegacyMetricInfo {
    /// The metric title.
    pub title: String,
    /// The name of the unit in the legacy unit table, for example `bytes` or `%`.
    #[serde(default)]
    pub unit: String,
    /// The color, either `#rrggbb` or a legacy palette color like `23/a`.
    pub color: String,
    /// An optional help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// Registry of metric declarations and check command translations.
///
/// The registry is built once from the plugin configuration and is read-only afterwards.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    metrics: IndexMap<MetricName, DeclaredMetric>,
    legacy: IndexMap<MetricName, LegacyMetricInfo>,
    translations: TranslationTable,
}

impl MetricRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a declared metric, replacing a previous declaration of the same name.
    pub fn register_metric(&mut self, metric: DeclaredMetric) {
        self.metrics.insert(metric.name.clone(), metric);
    }

    /// Registers an entry of the legacy metric info table.
    pub fn register_legacy_metric_info(
        &mut self,
        name: impl Into<MetricName>,
        info: LegacyMetricInfo,
    ) {
        self.legacy.insert(name.into(), info);
    }

    /// Returns the declared metric with the given name.
    pub fn metric(&self, name: &str) -> Option<&DeclaredMetric> {
        self.metrics.get(name)
    }

    /// Returns the legacy metric info with the given name.
    pub fn legacy_metric_info(&self, name: &str) -> Option<&LegacyMetricInfo> {
        self.legacy.get(name)
    }

    /// Returns `true` if the metric is declared or has legacy metric info.
    pub fn is_known(&self, name: &str) -> bool {
        self.metrics.contains_key(name) || self.legacy.contains_key(name)
    }

    /// Returns the title of a metric without resolving its unit and color.
    ///
    /// Unknown metrics are titled after their name.
    pub fn title(&self, name: &str) -> String {
        if let Some(metric) = self.metric(name) {
            return metric.title.clone();
        }

        match self.legacy_metric_info(name) {
            Some(info) => info.title.clone(),
            None => MetricName::from(name).default_title(),
        }
    }

    /// Returns the translation table.
    pub fn translations(&self) -> &TranslationTable {
        &self.translations
    }

    /// Returns the translation table for registering rules.
    pub fn translations_mut(&mut self) -> &mut TranslationTable {
        &mut self.translations
    }

    /// Replaces the translation table.
    pub fn set_translations(&mut self, translations: TranslationTable) {
        self.translations = translations;
    }
}

#[cfg(test)]
mod tests {
    use perfgraph_base_schema::units::{Notation, Precision};
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_parse_declared_metric() {
        let metric: DeclaredMetric = serde_yaml::from_str(
            r#"
name: service_costs_eur
title: Service costs per day
unit:
  notation: {type: decimal, symbol: "€"}
  precision: {type: strict, digits: 2}
color: BLUE
"#,
        )
        .unwrap();

        assert_eq!(
            metric,
            DeclaredMetric {
                name: "service_costs_eur".into(),
                title: "Service costs per day".to_owned(),
                unit: UnitSpec::new(
                    Notation::Decimal {
                        symbol: "€".to_owned()
                    },
                    Precision::Strict { digits: 2 },
                ),
                color: Color::Blue,
                help: None,
            }
        );
    }

    #[test]
    fn test_register() {
        let mut registry = MetricRegistry::new();
        assert!(!registry.is_known("mem_used"));

        registry.register_legacy_metric_info(
            "mem_used",
            LegacyMetricInfo {
                title: "Used memory".to_owned(),
                unit: "bytes".to_owned(),
                color: "#80ff40".to_owned(),
                help: None,
            },
        );

        assert!(registry.is_known("mem_used"));
        assert!(registry.metric("mem_used").is_none());
        assert_eq!(registry.legacy_metric_info("mem_used").unwrap().unit, "bytes");
    }

    #[test]
    fn test_title() {
        let mut registry = MetricRegistry::new();
        registry.register_legacy_metric_info(
            "mem_used",
            LegacyMetricInfo {
                title: "Used memory".to_owned(),
                unit: "bytes".to_owned(),
                color: "#80ff40".to_owned(),
                help: None,
            },
        );

        assert_eq!(registry.title("mem_used"), "Used memory");
        assert_eq!(registry.title("if_in_bps"), "If_In_Bps");
    }
}
