//! Perfometers declared by plugins and their applicability.
//!
//! A perfometer is a compact bar showing one or a few quantities of a check result. Only the
//! first perfometer whose metrics are all available is shown, see [`find_matching_perfometer`].

use perfgraph_base_schema::metrics::MetricName;
use perfgraph_expression::Quantity;
use perfgraph_metrics::{ScalarKind, TranslatedMetrics};
use serde::{Deserialize, Serialize};

use crate::Bound;

/// One end of the focus range of a perfometer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum FocusBound {
    /// Values beyond this end are cut off.
    Closed(Bound),
    /// Values beyond this end are shown compressed.
    Open(Bound),
}

impl FocusBound {
    /// Returns the bound regardless of whether it is open or closed.
    pub fn bound(&self) -> &Bound {
        match self {
            Self::Closed(bound) | Self::Open(bound) => bound,
        }
    }
}

/// The range of values a perfometer shows in detail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FocusRange {
    /// The lower end.
    pub lower: FocusBound,
    /// The upper end.
    pub upper: FocusBound,
}

/// A single bar showing stacked segments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Perfometer {
    /// The unique name of the perfometer.
    pub name: String,
    /// The range of values shown in detail.
    pub focus_range: FocusRange,
    /// The quantities stacked in the bar.
    pub segments: Vec<Quantity>,
}

/// Two bars growing to the left and to the right.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BidirectionalPerfometer {
    /// The unique name of the perfometer.
    pub name: String,
    /// The bar growing to the left.
    pub left: Perfometer,
    /// The bar growing to the right.
    pub right: Perfometer,
}

/// Two bars stacked on top of each other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackedPerfometer {
    /// The unique name of the perfometer.
    pub name: String,
    /// The lower bar.
    pub lower: Perfometer,
    /// The upper bar.
    pub upper: Perfometer,
}

/// A perfometer declared by a plugin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PerfometerPlugin {
    /// A single bar.
    Perfometer(Perfometer),
    /// Two bars growing to the left and to the right.
    Bidirectional(BidirectionalPerfometer),
    /// Two bars stacked on top of each other.
    Stacked(StackedPerfometer),
}

#[derive(Debug, Default)]
struct References<'a> {
    metric_names: Vec<&'a MetricName>,
    scalars: Vec<(&'a MetricName, ScalarKind)>,
}

impl<'a> References<'a> {
    fn collect_quantity(&mut self, quantity: &'a Quantity) {
        self.metric_names.extend(quantity.metric_names());
        self.scalars.extend(quantity.scalars());
    }

    fn collect_bound(&mut self, bound: &'a FocusBound) {
        self.metric_names.extend(bound.bound().metric_names());
        self.scalars.extend(bound.bound().scalars());
    }

    fn collect_perfometer(&mut self, perfometer: &'a Perfometer) {
        self.collect_bound(&perfometer.focus_range.lower);
        self.collect_bound(&perfometer.focus_range.upper);
        for segment in &perfometer.segments {
            self.collect_quantity(segment);
        }
    }

    fn all_present(&self, metrics: &TranslatedMetrics) -> bool {
        if self.metric_names.is_empty() {
            return false;
        }

        let names_present = self.metric_names.iter().all(|name| metrics.contains(name));
        let scalars_present = self.scalars.iter().all(|(name, kind)| {
            metrics
                .get(name)
                .is_some_and(|metric| metric.scalar.contains(*kind))
        });

        names_present && scalars_present
    }
}

impl PerfometerPlugin {
    /// Returns the unique name of the perfometer.
    pub fn name(&self) -> &str {
        match self {
            Self::Perfometer(perfometer) => &perfometer.name,
            Self::Bidirectional(perfometer) => &perfometer.name,
            Self::Stacked(perfometer) => &perfometer.name,
        }
    }

    /// Returns the single bars of this perfometer.
    pub fn bars(&self) -> Vec<&Perfometer> {
        match self {
            Self::Perfometer(perfometer) => vec![perfometer],
            Self::Bidirectional(perfometer) => vec![&perfometer.left, &perfometer.right],
            Self::Stacked(perfometer) => vec![&perfometer.lower, &perfometer.upper],
        }
    }

    fn references(&self) -> References<'_> {
        let mut references = References::default();
        for bar in self.bars() {
            references.collect_perfometer(bar);
        }
        references
    }

    /// Returns the names of all metrics the perfometer refers to, including those of levels.
    pub fn metric_names(&self) -> Vec<&MetricName> {
        self.references().metric_names
    }

    /// Returns `true` if all metrics and levels of the perfometer are available.
    ///
    /// A perfometer that refers to no metric at all never applies.
    pub fn is_applicable(&self, metrics: &TranslatedMetrics) -> bool {
        !metrics.is_empty() && self.references().all_present(metrics)
    }
}

/// Returns the first applicable perfometer.
pub fn find_matching_perfometer<'a>(
    perfometers: impl IntoIterator<Item = &'a PerfometerPlugin>,
    metrics: &TranslatedMetrics,
) -> Option<&'a PerfometerPlugin> {
    if metrics.is_empty() {
        return None;
    }

    perfometers
        .into_iter()
        .find(|perfometer| perfometer.is_applicable(metrics))
}

#[cfg(test)]
mod tests {
    use perfgraph_base_schema::units::UnitRegistry;
    use perfgraph_metrics::{
        MetricRegistry, ParseOptions, ResolutionContext, parse_perf_data, translate_metrics,
    };
    use similar_asserts::assert_eq;

    use super::*;

    fn translate(perf_data: &str) -> TranslatedMetrics {
        let perf_data = parse_perf_data(perf_data, None, ParseOptions::default()).unwrap();
        translate_metrics(
            &perf_data.samples,
            None,
            &MetricRegistry::new(),
            &UnitRegistry::new(),
            ResolutionContext::new(),
        )
    }

    fn perfometer(yaml: &str) -> PerfometerPlugin {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn fs_perfometer() -> PerfometerPlugin {
        perfometer(
            r#"
type: perfometer
name: fs_used_percent
focus_range:
  lower: {type: closed, value: 0}
  upper: {type: closed, value: {type: maximum_of, metric: fs_size, color: GRAY}}
segments: [fs_used]
"#,
        )
    }

    #[test]
    fn test_applicable() {
        let perfometer = fs_perfometer();

        assert!(perfometer.is_applicable(&translate("fs_used=10;;;;100 fs_size=100;;;;200")));
        assert!(!perfometer.is_applicable(&translate("fs_used=10;;;;100 fs_size=100;;;;")));
        assert!(!perfometer.is_applicable(&translate("fs_used=10;;;;100")));
        assert!(!perfometer.is_applicable(&TranslatedMetrics::new()));
    }

    #[test]
    fn test_metric_names() {
        let perfometer = fs_perfometer();
        let names: Vec<&str> = perfometer
            .metric_names()
            .into_iter()
            .map(|name| &**name)
            .collect();
        assert_eq!(names, ["fs_size", "fs_used"]);
    }

    #[test]
    fn test_without_metrics() {
        let perfometer = perfometer(
            r#"
type: perfometer
name: constant
focus_range:
  lower: {type: closed, value: 0}
  upper: {type: open, value: 100}
segments:
  - {type: constant, title: Ten, unit: {notation: {type: decimal, symbol: ""}}, color: BLUE, value: 10}
"#,
        );

        assert!(!perfometer.is_applicable(&translate("fs_used=10")));
    }

    #[test]
    fn test_warning_levels() {
        let perfometer = perfometer(
            r#"
type: bidirectional
name: levels
left:
  name: left
  focus_range: {lower: {type: closed, value: 0}, upper: {type: open, value: 100}}
  segments: [read]
right:
  name: right
  focus_range: {lower: {type: closed, value: 0}, upper: {type: open, value: 100}}
  segments: [{type: warning_of, metric: write}]
"#,
        );

        assert!(perfometer.is_applicable(&translate("read=1 write=2;5")));
        assert!(!perfometer.is_applicable(&translate("read=1 write=2")));
    }

    #[test]
    fn test_find_matching() {
        let perfometers = [
            perfometer(
                r#"
type: stacked
name: stacked
lower:
  name: lower
  focus_range: {lower: {type: closed, value: 0}, upper: {type: open, value: 100}}
  segments: [read]
upper:
  name: upper
  focus_range: {lower: {type: closed, value: 0}, upper: {type: open, value: 100}}
  segments: [write]
"#,
            ),
            fs_perfometer(),
            perfometer(
                r#"
type: perfometer
name: read
focus_range: {lower: {type: closed, value: 0}, upper: {type: open, value: 100}}
segments: [read]
"#,
            ),
        ];

        let name = |perf_data| {
            find_matching_perfometer(&perfometers, &translate(perf_data))
                .map(PerfometerPlugin::name)
        };

        assert_eq!(name("read=1 write=2"), Some("stacked"));
        assert_eq!(name("read=1"), Some("read"));
        assert_eq!(name("other=1"), None);
        assert_eq!(name(""), None);
    }
}
