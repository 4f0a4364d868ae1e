use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The kind of a synthetic predictive metric.
///
/// Predictive metrics carry the forecast band of a base metric and are named by prefixing the base
/// metric name, for instance `predict_load1` or `predict_lower_load1`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PredictionKind {
    /// The upper levels of the prediction, prefix `predict_`.
    Upper,
    /// The lower levels of the prediction, prefix `predict_lower_`.
    Lower,
}

impl PredictionKind {
    /// Returns the name prefix of this prediction kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Upper => "predict_",
            Self::Lower => "predict_lower_",
        }
    }

    /// Returns the human readable description used in titles.
    pub fn levels(&self) -> &'static str {
        match self {
            Self::Upper => "upper levels",
            Self::Lower => "lower levels",
        }
    }
}

/// Splits a predictive prefix off a metric name.
///
/// `predict_lower_` is checked before `predict_`, since the latter is a prefix of the former.
///
/// # Examples
///
/// ```
/// use perfgraph_base_schema::metrics::{PredictionKind, split_prediction};
///
/// assert_eq!(split_prediction("predict_lower_load1"), (Some(PredictionKind::Lower), "load1"));
/// assert_eq!(split_prediction("predict_load1"), (Some(PredictionKind::Upper), "load1"));
/// assert_eq!(split_prediction("load1"), (None, "load1"));
/// ```
pub fn split_prediction(name: &str) -> (Option<PredictionKind>, &str) {
    for kind in [PredictionKind::Lower, PredictionKind::Upper] {
        if let Some(base) = name.strip_prefix(kind.prefix()) {
            return (Some(kind), base);
        }
    }
    (None, name)
}

/// Optimized string representation of a metric name.
///
/// The metric name can be efficiently cloned, which matters since names are copied into every
/// translated metric, expression and graph definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MetricName(Arc<str>);

impl MetricName {
    /// Returns the prediction kind and base name if this is a predictive metric.
    pub fn prediction(&self) -> Option<(PredictionKind, &str)> {
        match split_prediction(self) {
            (Some(kind), base) => Some((kind, base)),
            (None, _) => None,
        }
    }

    /// Returns the name without any predictive prefix.
    pub fn base_name(&self) -> &str {
        split_prediction(self).1
    }

    /// Creates the name of the predictive metric of the given kind for this metric.
    ///
    /// # Examples
    ///
    /// ```
    /// use perfgraph_base_schema::metrics::{MetricName, PredictionKind};
    ///
    /// let name = MetricName::from("load1");
    /// assert_eq!(name.predictive(PredictionKind::Lower), "predict_lower_load1");
    /// ```
    pub fn predictive(&self, kind: PredictionKind) -> MetricName {
        MetricName::from(format!("{}{}", kind.prefix(), self))
    }

    /// Returns the word-capitalized name used as title for unknown metrics.
    ///
    /// Every letter that follows a non-letter is uppercased, all other letters are lowercased.
    ///
    /// # Examples
    ///
    /// ```
    /// use perfgraph_base_schema::metrics::MetricName;
    ///
    /// assert_eq!(MetricName::from("if_in_bps").default_title(), "If_In_Bps");
    /// assert_eq!(MetricName::from("load1x").default_title(), "Load1X");
    /// ```
    pub fn default_title(&self) -> String {
        let mut title = String::with_capacity(self.len());
        let mut previous_cased = false;

        for c in self.chars() {
            if c.is_alphabetic() {
                if previous_cased {
                    title.extend(c.to_lowercase());
                } else {
                    title.extend(c.to_uppercase());
                }
                previous_cased = true;
            } else {
                title.push(c);
                previous_cased = false;
            }
        }

        title
    }
}

impl PartialEq<str> for MetricName {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for MetricName {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for MetricName {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<Arc<str>> for MetricName {
    fn from(value: Arc<str>) -> Self {
        Self(value)
    }
}

impl From<&str> for MetricName {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl std::ops::Deref for MetricName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl AsRef<str> for MetricName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl std::borrow::Borrow<str> for MetricName {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_prediction() {
        let name = MetricName::from("predict_lower_mem_used");
        assert_eq!(name.prediction(), Some((PredictionKind::Lower, "mem_used")));
        assert_eq!(name.base_name(), "mem_used");

        let name = MetricName::from("mem_used");
        assert_eq!(name.prediction(), None);
        assert_eq!(name.base_name(), "mem_used");
    }

    #[test]
    fn test_default_title() {
        assert_eq!(MetricName::from("foo").default_title(), "Foo");
        assert_eq!(MetricName::from("11.26").default_title(), "11.26");
        assert_eq!(MetricName::from("CPU load").default_title(), "Cpu Load");
    }

    #[test]
    fn test_serde_transparent() {
        let name: MetricName = serde_json::from_str(r#""fs_used""#).unwrap();
        assert_eq!(name, "fs_used");
        assert_eq!(serde_json::to_string(&name).unwrap(), r#""fs_used""#);
    }
}
