use std::error::Error;
use std::sync::LazyLock;

use perfgraph_base_schema::units::UnitRegistry;
use perfgraph_metrics::TranslatedMetrics;
use regex::{Captures, Regex};

use crate::evaluate_expression;

static EXPRESSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\(([^)]*)\)").unwrap());

/// Replaces embedded expressions in a title with their rendered values.
///
/// Expressions are written as `%(expression)`, for instance in
/// `CPU Load - %(load1:max@count) CPU Cores`. If any expression fails to evaluate, the title is
/// cut before its first `" - "`.
///
/// # Examples
///
/// ```
/// use perfgraph_base_schema::units::UnitRegistry;
/// use perfgraph_expression::replace_expressions;
/// use perfgraph_metrics::TranslatedMetrics;
///
/// let title = replace_expressions(
///     "Load - %(load1:max) cores",
///     &TranslatedMetrics::new(),
///     &UnitRegistry::new(),
/// );
/// assert_eq!(title, "Load");
/// ```
pub fn replace_expressions(
    text: &str,
    metrics: &TranslatedMetrics,
    units: &UnitRegistry,
) -> String {
    let mut failed = false;

    let replaced = EXPRESSION_REGEX.replace_all(text, |captures: &Captures<'_>| {
        match evaluate_expression(&captures[1], metrics, units) {
            Ok(evaluated) => evaluated.render(),
            Err(error) => {
                perfgraph_log::debug!(
                    error = &error as &dyn Error,
                    title = text,
                    "failed to evaluate title expression"
                );
                failed = true;
                String::new()
            }
        }
    });

    if failed {
        let title = text.split_once(" - ").map_or(text, |(title, _)| title);
        return title.trim().to_owned();
    }

    replaced.into_owned()
}
