use std::sync::Arc;

use perfgraph_base_schema::color::{self, LEGACY_PALETTE_SIZE};
use perfgraph_base_schema::metrics::{MetricName, split_prediction};
use perfgraph_base_schema::units::{UnitInfo, UnitRegistry};
use serde::Serialize;

use crate::MetricRegistry;

/// Title, unit and color of a metric.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricInfo {
    /// The metric name.
    pub name: MetricName,
    /// The metric title.
    pub title: String,
    /// The unit of the metric.
    pub unit: Arc<UnitInfo>,
    /// The color as `#rrggbb`.
    pub color: String,
    /// An optional help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// Color assignment state of one metric translation.
///
/// Metrics without metric info get successive colors of the legacy palette, and predictive metrics
/// get successive gray tones. A context must not be reused across check results, otherwise the
/// colors of a metric would depend on what was translated before.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    palette_index: usize,
    predictive_index: usize,
}

impl ResolutionContext {
    /// Creates a context that starts with the first colors.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_palette_color(&mut self) -> String {
        self.palette_index = (self.palette_index + 1) % LEGACY_PALETTE_SIZE;
        color::parse_color_into_hexrgb(&color::palette_color_by_index(self.palette_index, 'a'))
    }

    fn next_gray(&mut self) -> String {
        self.predictive_index += 1;
        let v = (self.predictive_index * 15) % 136 + 60;
        format!("#{v:02x}{v:02x}{v:02x}")
    }
}

impl MetricRegistry {
    /// Resolves title, unit and color of a metric.
    ///
    /// The metric info is looked up in this order:
    ///
    ///  1. Predictive metrics resolve their base metric and are shown in gray.
    ///  2. Declared metrics.
    ///  3. The legacy metric info table.
    ///  4. Unknown metrics are titled after their name, have no unit and get the next palette
    ///     color.
    pub fn resolve(
        &self,
        name: &str,
        context: &mut ResolutionContext,
        units: &UnitRegistry,
    ) -> MetricInfo {
        if let (Some(kind), base_name) = split_prediction(name) {
            let base = self.resolve(base_name, context, units);
            return MetricInfo {
                name: name.into(),
                title: format!("Prediction of {} ({})", base.title, kind.levels()),
                unit: base.unit,
                color: context.next_gray(),
                help: None,
            };
        }

        if let Some(metric) = self.metric(name) {
            return MetricInfo {
                name: metric.name.clone(),
                title: metric.title.clone(),
                unit: units.parse_or_add_unit(&metric.unit),
                color: color::parse_color(metric.color),
                help: metric.help.clone(),
            };
        }

        if let Some(info) = self.legacy_metric_info(name) {
            let unit = units.legacy_unit(&info.unit).unwrap_or_else(|| {
                perfgraph_log::warn!(metric = name, unit = info.unit.as_str(), "unknown legacy unit");
                units.neutral()
            });

            return MetricInfo {
                name: name.into(),
                title: info.title.clone(),
                unit,
                color: color::parse_color_into_hexrgb(&info.color),
                help: info.help.clone(),
            };
        }

        let name = MetricName::from(name);
        MetricInfo {
            title: name.default_title(),
            name,
            unit: units.neutral(),
            color: context.next_palette_color(),
            help: None,
        }
    }
}
