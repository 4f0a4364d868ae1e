use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use perfgraph_base_schema::metrics::MetricName;
use perfgraph_base_schema::units::{UnitInfo, UnitRegistry};
use perfgraph_common::{impl_display_as_str, impl_str_serde};
use serde::Serialize;
use smallvec::{SmallVec, smallvec};

use crate::{MetricRegistry, RawSample, ResolutionContext};

/// The kind of a scalar attached to a metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    /// The warning level.
    Warn,
    /// The critical level.
    Crit,
    /// The lower bound of the value range.
    Min,
    /// The upper bound of the value range.
    Max,
}

impl ScalarKind {
    /// All scalar kinds in perfdata order.
    pub const ALL: [Self; 4] = [Self::Warn, Self::Crit, Self::Min, Self::Max];

    /// Returns the name of the scalar, for example `warn`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Crit => "crit",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// Error returned when parsing an unknown [`ScalarKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseScalarKindError;

impl fmt::Display for ParseScalarKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown scalar, expected one of warn, crit, min or max")
    }
}

impl std::error::Error for ParseScalarKindError {}

impl FromStr for ScalarKind {
    type Err = ParseScalarKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "warn" => Self::Warn,
            "crit" => Self::Crit,
            "min" => Self::Min,
            "max" => Self::Max,
            _ => return Err(ParseScalarKindError),
        })
    }
}

impl_display_as_str!(ScalarKind);
impl_str_serde!(ScalarKind, "a scalar kind");

/// The scalars of a translated metric.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Scalars {
    /// The warning level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warn: Option<f64>,
    /// The critical level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crit: Option<f64>,
    /// The lower bound of the value range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// The upper bound of the value range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Scalars {
    /// Returns the scalar of the given kind.
    pub fn get(&self, kind: ScalarKind) -> Option<f64> {
        match kind {
            ScalarKind::Warn => self.warn,
            ScalarKind::Crit => self.crit,
            ScalarKind::Min => self.min,
            ScalarKind::Max => self.max,
        }
    }

    /// Returns a mutable reference to the scalar of the given kind.
    pub fn get_mut(&mut self, kind: ScalarKind) -> &mut Option<f64> {
        match kind {
            ScalarKind::Warn => &mut self.warn,
            ScalarKind::Crit => &mut self.crit,
            ScalarKind::Min => &mut self.min,
            ScalarKind::Max => &mut self.max,
        }
    }

    /// Returns `true` if the scalar of the given kind is present.
    pub fn contains(&self, kind: ScalarKind) -> bool {
        self.get(kind).is_some()
    }
}

/// A metric after translation, scaling and metric info resolution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TranslatedMetric {
    /// The names of all perfdata fields that were translated into this metric.
    pub orig_name: SmallVec<[MetricName; 1]>,
    /// The scaled and converted value.
    pub value: f64,
    /// The scaled and converted bounds.
    pub scalar: Scalars,
    /// The scale factors applied, one per original name.
    pub scale: SmallVec<[f64; 1]>,
    /// Whether a graph is created for this metric if no graph template covers it.
    pub auto_graph: bool,
    /// The metric title.
    pub title: String,
    /// The unit of the value and the scalars.
    pub unit: Arc<UnitInfo>,
    /// The color as `#rrggbb`.
    pub color: String,
}

/// The table of translated metrics of one check result, keyed by canonical name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TranslatedMetrics(BTreeMap<MetricName, TranslatedMetric>);

impl TranslatedMetrics {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the metric with the given canonical name.
    pub fn get(&self, name: &str) -> Option<&TranslatedMetric> {
        self.0.get(name)
    }

    /// Returns `true` if a metric with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Inserts a metric, replacing any previous metric of the same name.
    pub fn insert(&mut self, name: MetricName, metric: TranslatedMetric) {
        self.0.insert(name, metric);
    }

    /// Returns the number of metrics.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over metric names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &MetricName> {
        self.0.keys()
    }

    /// Iterates over metrics in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&MetricName, &TranslatedMetric)> {
        self.0.iter()
    }

    fn merge(&mut self, name: MetricName, metric: TranslatedMetric) {
        match self.0.get_mut(&name) {
            Some(existing) => {
                let mut orig_name = std::mem::take(&mut existing.orig_name);
                let mut scale = std::mem::take(&mut existing.scale);
                orig_name.extend(metric.orig_name.iter().cloned());
                scale.extend(metric.scale.iter().copied());
                *existing = TranslatedMetric {
                    orig_name,
                    scale,
                    ..metric
                };
            }
            None => {
                self.0.insert(name, metric);
            }
        }
    }
}

impl<'a> IntoIterator for &'a TranslatedMetrics {
    type Item = (&'a MetricName, &'a TranslatedMetric);
    type IntoIter = std::collections::btree_map::Iter<'a, MetricName, TranslatedMetric>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Translates raw samples into the table of metrics.
///
/// Each sample is renamed and scaled according to the translation rules of the check command,
/// then title, unit and color are resolved through the registry. Samples that translate to the
/// same name are merged: their original names and scales are collected, while value, scalars and
/// metric info are taken from the last sample.
///
/// The resolution context assigns colors to metrics without metric info. Pass a new context for
/// every translated check result, so that colors do not depend on earlier calls.
pub fn translate_metrics(
    samples: &[RawSample],
    check_command: Option<&str>,
    registry: &MetricRegistry,
    units: &UnitRegistry,
    mut context: ResolutionContext,
) -> TranslatedMetrics {
    let rules = registry
        .translations()
        .lookup_metric_translations_for_check_command(check_command);

    let mut translated = TranslatedMetrics::new();
    for sample in samples {
        let info = match rules {
            Some(rules) => rules.translate(&sample.lookup_metric_name),
            None => Default::default(),
        };

        let base_name = info.name.unwrap_or_else(|| sample.lookup_metric_name.clone());
        let name = match sample.metric_name.prediction() {
            Some((kind, _)) => base_name.predictive(kind),
            None => base_name,
        };

        let metric_info = registry.resolve(&name, &mut context, units);
        let unit = metric_info.unit;

        let mut scalar = Scalars::default();
        for kind in ScalarKind::ALL {
            *scalar.get_mut(kind) = sample
                .bound(kind)
                .map(|bound| unit.convert(bound.as_f64() * info.scale));
        }

        let metric = TranslatedMetric {
            orig_name: smallvec![sample.metric_name.clone()],
            value: unit.convert(sample.value.as_f64() * info.scale),
            scalar,
            scale: smallvec![info.scale],
            auto_graph: info.auto_graph,
            title: metric_info.title,
            unit,
            color: metric_info.color,
        };

        translated.merge(name, metric);
    }

    translated
}
