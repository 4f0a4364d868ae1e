use std::error::Error;
use std::fmt;

use perfgraph_base_schema::metrics::{MetricName, split_prediction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ScalarKind;

/// A number reported in perfdata.
///
/// Values are parsed as integers first and fall back to floating point numbers.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Number {
    /// An integral number, for example `5`.
    Int(i64),
    /// A floating point number, for example `5.6`.
    Float(f64),
}

impl Number {
    /// Parses an integer or float, returning `None` for anything else.
    pub fn parse(string: &str) -> Option<Self> {
        if let Ok(int) = string.parse() {
            return Some(Self::Int(int));
        }
        string.parse().ok().map(Self::Float)
    }

    /// Returns the number as float.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(int) => int as f64,
            Self::Float(float) => float,
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(int) => int.fmt(f),
            Self::Float(float) => float.fmt(f),
        }
    }
}

/// A single field of performance data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RawSample {
    /// The sanitized name as reported by the check.
    pub metric_name: MetricName,
    /// The name used to look up translations, without predictive prefix.
    pub lookup_metric_name: MetricName,
    /// The measured value.
    pub value: Number,
    /// The unit text following the value, empty if there is none.
    pub unit_text: String,
    /// Warning level.
    pub warn: Option<Number>,
    /// Critical level.
    pub crit: Option<Number>,
    /// Lower bound of the value range.
    pub min: Option<Number>,
    /// Upper bound of the value range.
    pub max: Option<Number>,
}

impl RawSample {
    /// Creates a sample without unit and bounds.
    pub fn new(metric_name: impl Into<MetricName>, value: impl Into<Number>) -> Self {
        let metric_name = metric_name.into();
        let lookup_metric_name = MetricName::from(split_prediction(&metric_name).1);

        Self {
            metric_name,
            lookup_metric_name,
            value: value.into(),
            unit_text: String::new(),
            warn: None,
            crit: None,
            min: None,
            max: None,
        }
    }

    /// Returns the bound of the given kind.
    pub fn bound(&self, kind: ScalarKind) -> Option<Number> {
        match kind {
            ScalarKind::Warn => self.warn,
            ScalarKind::Crit => self.crit,
            ScalarKind::Min => self.min,
            ScalarKind::Max => self.max,
        }
    }
}

/// An error raised for a malformed perfdata string.
///
/// Malformed fields are skipped during parsing. This error is only returned in debug mode, see
/// [`ParseOptions`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PerfDataError {
    /// The string contains an unterminated quote or a trailing escape character.
    #[error("unbalanced quotes in perfdata '{perf_data}'")]
    UnbalancedQuotes {
        /// The full perfdata string.
        perf_data: String,
    },
    /// A field does not contain a `=`.
    #[error("malformed perfdata field '{field}': expected name=value")]
    MissingValue {
        /// The offending field.
        field: String,
    },
    /// A metric name cannot be used in expressions.
    #[error("invalid metric name '{name}': must not contain a comma")]
    InvalidMetricName {
        /// The offending name.
        name: String,
    },
}

/// Options for [`parse_perf_data`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Return the first error instead of skipping malformed fields.
    pub debug: bool,
}

/// The result of [`parse_perf_data`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PerfData {
    /// The successfully parsed fields in order.
    pub samples: Vec<RawSample>,
    /// The check command, either as passed in or as found at the end of the perfdata.
    pub check_command: Option<String>,
}

/// Parses a perfdata string into samples.
///
/// A trailing `[check_command]` token in the perfdata overrides the passed check command. Either
/// one is normalized with [`parse_check_command`].
///
/// Malformed fields are logged and skipped, unless [`ParseOptions::debug`] is set.
///
/// # Examples
///
/// ```
/// use perfgraph_metrics::{Number, ParseOptions, parse_perf_data};
///
/// let perf_data = parse_perf_data("rta=0.5ms;200;500;0 pl=0%;80;100;; [check_ping]", None,
///     ParseOptions::default()).unwrap();
///
/// assert_eq!(perf_data.check_command.as_deref(), Some("check_ping"));
/// assert_eq!(perf_data.samples[0].value, Number::Float(0.5));
/// assert_eq!(perf_data.samples[0].unit_text, "ms");
/// assert_eq!(perf_data.samples[1].max, None);
/// ```
pub fn parse_perf_data(
    perf_data: &str,
    check_command: Option<&str>,
    options: ParseOptions,
) -> Result<PerfData, PerfDataError> {
    let mut check_command = check_command.map(parse_check_command);

    let Some(mut parts) = split_perf_data(perf_data) else {
        let error = PerfDataError::UnbalancedQuotes {
            perf_data: perf_data.to_owned(),
        };
        if options.debug {
            return Err(error);
        }
        perfgraph_log::warn!(error = &error as &dyn Error, "failed to split perfdata");
        return Ok(PerfData {
            samples: Vec::new(),
            check_command,
        });
    };

    if let Some(command) = parts
        .last()
        .and_then(|last| last.strip_prefix('['))
        .and_then(|last| last.strip_suffix(']'))
    {
        check_command = Some(parse_check_command(command));
        parts.pop();
    }

    let mut samples = Vec::with_capacity(parts.len());
    for part in &parts {
        match parse_field(part) {
            Ok(Some(sample)) => samples.push(sample),
            Ok(None) => (),
            Err(error) if options.debug => return Err(error),
            Err(error) => {
                perfgraph_log::warn!(
                    error = &error as &dyn Error,
                    perf_data,
                    "failed to parse perfdata"
                );
            }
        }
    }

    Ok(PerfData {
        samples,
        check_command,
    })
}

/// Parses a single `name=value;warn;crit;min;max` field.
///
/// Returns `Ok(None)` for fields without a usable value.
fn parse_field(field: &str) -> Result<Option<RawSample>, PerfDataError> {
    let (name, values) = field
        .split_once('=')
        .ok_or_else(|| PerfDataError::MissingValue {
            field: field.to_owned(),
        })?;

    let mut values = values.split(';');
    let value_text = values.next().unwrap_or_default();

    let Some((number, unit_text)) = split_unit(value_text) else {
        return Ok(None);
    };
    let Some(value) = Number::parse(number) else {
        return Ok(None);
    };

    let mut bound = || values.next().and_then(Number::parse);

    let mut sample = RawSample::new(sanitize_name(name), value);
    sample.unit_text = unit_text.to_owned();
    sample.warn = bound();
    sample.crit = bound();
    sample.min = bound();
    sample.max = bound();

    Ok(Some(sample))
}

/// Splits a value text into the leading number and the unit.
///
/// Returns `None` if the text is blank or does not start with a number.
fn split_unit(text: &str) -> Option<(&str, &str)> {
    if text.trim().is_empty() {
        return None;
    }

    let cut = text
        .find(|c: char| !matches!(c, '0'..='9' | '.' | ',' | '-'))
        .unwrap_or(text.len());

    match text.split_at(cut) {
        ("", _) => None,
        split => Some(split),
    }
}

/// Removes quotes and replaces characters that cannot appear in metric names.
fn sanitize_name(name: &str) -> String {
    name.replace(['"', '\''], "")
        .replace([' ', ':', '/', '\\'], "_")
}

/// Splits a string into words like a POSIX shell.
///
/// Single quotes group verbatim, double quotes group and allow escaping `"`, `\`, `$` and `` ` ``,
/// and a backslash outside quotes escapes the next character. Returns `None` for unterminated
/// quotes and a trailing backslash.
pub fn split_perf_data(perf_data: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = perf_data.chars();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '\'' => break,
                        c => word.push(c),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => match chars.next()? {
                            c @ ('"' | '\\' | '$' | '`') => word.push(c),
                            '\n' => (),
                            c => {
                                word.push('\\');
                                word.push(c);
                            }
                        },
                        c => word.push(c),
                    }
                }
            }
            '\\' => {
                in_word = true;
                word.push(chars.next()?);
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }

    if in_word {
        words.push(word);
    }

    Some(words)
}

/// Normalizes a check command for translation lookups.
///
/// Custom checks of the form `check-mk-custom!<command> <args>` running the `check_ping` plugin
/// map to `check_ping`, since their perfdata matches that plugin. For all other commands the
/// arguments after `!` are dropped and dots are replaced by underscores.
///
/// # Examples
///
/// ```
/// use perfgraph_metrics::parse_check_command;
///
/// assert_eq!(parse_check_command("check-mk-custom!./check_ping -H localhost"), "check_ping");
/// assert_eq!(parse_check_command("check-mk-custom!foobar"), "check-mk-custom");
/// assert_eq!(parse_check_command("check_mk-df.fs!x"), "check_mk-df_fs");
/// ```
pub fn parse_check_command(check_command: &str) -> String {
    if let Some(arguments) = check_command.strip_prefix("check-mk-custom!") {
        let plugin = arguments.split_whitespace().next().unwrap_or_default();
        if plugin.rsplit('/').next() == Some("check_ping") {
            return "check_ping".to_owned();
        }
    }

    check_command
        .split('!')
        .next()
        .unwrap_or(check_command)
        .replace('.', "_")
}

/// Creates samples with value `1` for a list of metric names.
///
/// This is used where only the names of available metrics are known, for example to list the
/// graphs a check could produce. Names containing a comma are rejected, since they cannot be
/// referenced in expressions.
pub fn samples_from_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<RawSample>, PerfDataError> {
    names
        .into_iter()
        .map(|name| {
            if name.contains(',') {
                return Err(PerfDataError::InvalidMetricName {
                    name: name.to_owned(),
                });
            }
            Ok(RawSample::new(name, Number::Int(1)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    fn sample(name: &str, value: i64, unit: &str, bounds: [Option<Number>; 4]) -> RawSample {
        let [warn, crit, min, max] = bounds;
        RawSample {
            unit_text: unit.to_owned(),
            warn,
            crit,
            min,
            max,
            ..RawSample::new(name, Number::Int(value))
        }
    }

    fn int(value: i64) -> Option<Number> {
        Some(Number::Int(value))
    }

    fn float(value: f64) -> Option<Number> {
        Some(Number::Float(value))
    }

    fn parse(perf_data: &str, check_command: Option<&str>) -> PerfData {
        parse_perf_data(perf_data, check_command, ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_split_perf_data() {
        assert_eq!(split_perf_data("he lo").unwrap(), ["he", "lo"]);
        assert_eq!(split_perf_data("'há li'").unwrap(), ["há li"]);
        assert_eq!(split_perf_data("hé ßß").unwrap(), ["hé", "ßß"]);
        assert_eq!(split_perf_data("  a\\ b \"c \\\"d\"").unwrap(), ["a b", "c \"d"]);
        assert_eq!(split_perf_data("'it''s'").unwrap(), ["its"]);
        assert_eq!(split_perf_data("''").unwrap(), [""]);
        assert_eq!(split_perf_data("'open"), None);
        assert_eq!(split_perf_data("trailing\\"), None);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse("", None), PerfData::default());
    }

    #[test]
    fn test_parse_check_command_from_perf_data() {
        let perf_data = parse("hi=6 [ihe]", Some("ter"));
        assert_eq!(perf_data.samples, vec![sample("hi", 6, "", [None; 4])]);
        assert_eq!(perf_data.check_command.as_deref(), Some("ihe"));

        let perf_data = parse("hi=l6 [ihe]", Some("ter"));
        assert!(perf_data.samples.is_empty());
        assert_eq!(perf_data.check_command.as_deref(), Some("ihe"));
    }

    #[test]
    fn test_parse_strips_check_command_arguments() {
        let perf_data = parse("hi=5 no=6", Some("check_http!-H checkmk.com"));
        assert_eq!(perf_data.check_command.as_deref(), Some("check_http"));
        assert_eq!(
            perf_data.samples,
            vec![
                sample("hi", 5, "", [None; 4]),
                sample("no", 6, "", [None; 4]),
            ]
        );
    }

    #[test]
    fn test_parse_normalizes_check_command() {
        let perf_data = parse("x=1 [check_mk-df.fs]", None);
        assert_eq!(perf_data.check_command.as_deref(), Some("check_mk-df_fs"));

        let perf_data = parse("x=1", Some("check_mk-df.fs"));
        assert_eq!(perf_data.check_command.as_deref(), Some("check_mk-df_fs"));

        let perf_data = parse("rta=1", Some("check-mk-custom!./check_ping -H h"));
        assert_eq!(perf_data.check_command.as_deref(), Some("check_ping"));

        let perf_data = parse("x=1", Some("check-mk-custom!./check_foo"));
        assert_eq!(perf_data.check_command.as_deref(), Some("check-mk-custom"));
    }

    #[test]
    fn test_parse_bounds() {
        let perf_data = parse("hi=5;6;7;8;9 'not here'=6;5.6;;;", Some("test"));
        assert_eq!(
            perf_data.samples,
            vec![
                sample("hi", 5, "", [int(6), int(7), int(8), int(9)]),
                sample("not_here", 6, "", [float(5.6), None, None, None]),
            ]
        );
        assert_eq!(perf_data.check_command.as_deref(), Some("test"));
    }

    #[test]
    fn test_parse_units() {
        let perf_data = parse("hi=5G;;;; 'not here'=6M;5.6;;;", Some("test"));
        assert_eq!(
            perf_data.samples,
            vec![
                sample("hi", 5, "G", [None; 4]),
                sample("not_here", 6, "M", [float(5.6), None, None, None]),
            ]
        );
    }

    #[test]
    fn test_parse_numeric_name() {
        let perf_data = parse("11.26=6;;;;", Some("check_mk-local"));
        assert_eq!(perf_data.samples, vec![sample("11.26", 6, "", [None; 4])]);
    }

    #[test]
    fn test_parse_predictive_lookup_name() {
        let perf_data = parse("predict_load1=2.5 'C:/ used'=1", None);
        assert_eq!(perf_data.samples[0].metric_name, "predict_load1");
        assert_eq!(perf_data.samples[0].lookup_metric_name, "load1");
        assert_eq!(perf_data.samples[1].metric_name, "C___used");
    }

    #[test]
    fn test_parse_drops_useless_fields() {
        let perf_data = parse("a= b=1,5 c=- d=3;x;4", None);
        assert_eq!(perf_data.samples, vec![sample("d", 3, "", [None, int(4), None, None])]);
    }

    #[test]
    fn test_parse_malformed_field() {
        perfgraph_log::init_test!();

        let perf_data = parse("hi ho=1", None);
        assert_eq!(perf_data.samples, vec![sample("ho", 1, "", [None; 4])]);

        let error = parse_perf_data("hi ho", None, ParseOptions { debug: true }).unwrap_err();
        assert_eq!(error.to_string(), "malformed perfdata field 'hi': expected name=value");
    }

    #[test]
    fn test_parse_unbalanced_quotes() {
        assert!(parse("'hi=5", Some("test")).samples.is_empty());

        let result = parse_perf_data("'hi=5", None, ParseOptions { debug: true });
        assert!(matches!(result, Err(PerfDataError::UnbalancedQuotes { .. })));
    }

    #[test]
    fn test_parse_check_command() {
        assert_eq!(parse_check_command("check-mk-custom!foobar"), "check-mk-custom");
        assert_eq!(parse_check_command("check-mk-custom!check_ping"), "check_ping");
        assert_eq!(parse_check_command("check-mk-custom!./check_ping"), "check_ping");
        assert_eq!(parse_check_command("check_mk-lnx_if"), "check_mk-lnx_if");
    }

    #[test]
    fn test_samples_from_names() {
        let samples = samples_from_names(["user", "system"]).unwrap();
        assert_eq!(samples, vec![sample("user", 1, "", [None; 4]), sample("system", 1, "", [None; 4])]);

        let error = samples_from_names(["a,b"]).unwrap_err();
        assert_eq!(error, PerfDataError::InvalidMetricName { name: "a,b".to_owned() });
    }

    #[test]
    fn test_number_parse() {
        assert_eq!(Number::parse("45"), Some(Number::Int(45)));
        assert_eq!(Number::parse("45.0"), Some(Number::Float(45.0)));
        assert_eq!(Number::parse("-3"), Some(Number::Int(-3)));
        assert_eq!(Number::parse("1,5"), None);
        assert_eq!(Number::parse(""), None);
    }
}
