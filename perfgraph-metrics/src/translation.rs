use std::collections::{BTreeSet, HashMap};
use std::error::Error;

use indexmap::IndexMap;
use perfgraph_base_schema::metrics::MetricName;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of translation keys that are regular expressions.
const PATTERN_PREFIX: char = '~';

/// An error building the translation table.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// A `~`-prefixed key is not a valid regular expression.
    #[error("invalid translation pattern '{pattern}'")]
    InvalidPattern {
        /// The pattern without the `~` prefix.
        pattern: String,
        /// The error of the regex compiler.
        #[source]
        source: regex::Error,
    },
}

/// How to translate a perfdata field of a check into a metric.
///
/// This is the entry format of the legacy `check_metrics` table.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TranslationRule {
    /// The canonical metric name, defaults to the perfdata name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<MetricName>,
    /// Factor applied to the value and bounds, defaults to `1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Whether to create a graph for the metric if no template covers it, defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_graph: Option<bool>,
    /// Marks translations kept only for old data, with the version that deprecated them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
}

/// The effective translation of a single perfdata field.
#[derive(Clone, Debug, PartialEq)]
pub struct TranslationInfo {
    /// The translated name, `None` if the field keeps its name.
    pub name: Option<MetricName>,
    /// Factor applied to the value and bounds.
    pub scale: f64,
    /// Whether to create a graph for the metric if no template covers it.
    pub auto_graph: bool,
}

impl Default for TranslationInfo {
    fn default() -> Self {
        Self {
            name: None,
            scale: 1.0,
            auto_graph: true,
        }
    }
}

impl From<&TranslationRule> for TranslationInfo {
    fn from(rule: &TranslationRule) -> Self {
        Self {
            name: rule.name.clone(),
            scale: rule.scale.unwrap_or(1.0),
            auto_graph: rule.auto_graph.unwrap_or(true),
        }
    }
}

#[derive(Debug)]
struct PatternRule {
    pattern: String,
    regex: Regex,
    rule: TranslationRule,
}

/// The translation rules of one check command.
///
/// Rules for exact perfdata names are checked first. If none applies, rules with a `~`-prefixed
/// regular expression are tried in registration order. Expressions match at the start of the
/// name.
#[derive(Debug, Default)]
pub struct CheckTranslations {
    exact: IndexMap<MetricName, TranslationRule>,
    patterns: Vec<PatternRule>,
}

impl CheckTranslations {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule for a perfdata name or a `~`-prefixed regular expression.
    ///
    /// Adding a rule for an existing key replaces the previous rule.
    pub fn insert(&mut self, key: &str, rule: TranslationRule) -> Result<(), TranslationError> {
        let Some(pattern) = key.strip_prefix(PATTERN_PREFIX) else {
            self.exact.insert(key.into(), rule);
            return Ok(());
        };

        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
            TranslationError::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            }
        })?;

        let pattern_rule = PatternRule {
            pattern: pattern.to_owned(),
            regex,
            rule,
        };

        match self.patterns.iter_mut().find(|p| p.pattern == pattern) {
            Some(existing) => *existing = pattern_rule,
            None => self.patterns.push(pattern_rule),
        }

        Ok(())
    }

    /// Returns the rule that applies to a perfdata name.
    pub fn find_matching_translation(&self, name: &str) -> Option<&TranslationRule> {
        if let Some(rule) = self.exact.get(name) {
            return Some(rule);
        }

        self.patterns
            .iter()
            .find(|p| p.regex.is_match(name))
            .map(|p| &p.rule)
    }

    /// Returns the effective translation of a perfdata name.
    pub fn translate(&self, name: &str) -> TranslationInfo {
        self.find_matching_translation(name)
            .map(TranslationInfo::from)
            .unwrap_or_default()
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A check command a declarative translation applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum CheckCommand {
    /// A check plugin run by the monitoring agent.
    PassiveCheck(String),
    /// An active check.
    ActiveCheck(String),
    /// A host check command.
    HostCheckCommand(String),
    /// A classical monitoring plugin.
    NagiosPlugin(String),
}

impl CheckCommand {
    /// Returns the check command string used for lookups.
    ///
    /// # Examples
    ///
    /// ```
    /// use perfgraph_metrics::CheckCommand;
    ///
    /// assert_eq!(CheckCommand::PassiveCheck("lnx_if".into()).command(), "check_mk-lnx_if");
    /// assert_eq!(CheckCommand::NagiosPlugin("ping".into()).command(), "check_ping");
    /// ```
    pub fn command(&self) -> String {
        match self {
            Self::PassiveCheck(name) => format!("check_mk-{name}"),
            Self::ActiveCheck(name) => format!("check_mk_active-{name}"),
            Self::HostCheckCommand(name) => format!("check-mk-{name}"),
            Self::NagiosPlugin(name) => format!("check_{name}"),
        }
    }
}

/// A single declarative translation of a perfdata name.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranslationKind {
    /// Renames the metric.
    RenameTo {
        /// The new name.
        name: MetricName,
    },
    /// Scales value and bounds.
    ScaleBy {
        /// The scale factor.
        factor: f64,
    },
    /// Renames the metric and scales value and bounds.
    RenameToAndScaleBy {
        /// The new name.
        name: MetricName,
        /// The scale factor.
        factor: f64,
    },
}

impl From<&TranslationKind> for TranslationRule {
    fn from(kind: &TranslationKind) -> Self {
        let (name, scale) = match kind {
            TranslationKind::RenameTo { name } => (Some(name.clone()), None),
            TranslationKind::ScaleBy { factor } => (None, Some(*factor)),
            TranslationKind::RenameToAndScaleBy { name, factor } => {
                (Some(name.clone()), Some(*factor))
            }
        };

        Self {
            name,
            scale,
            ..Default::default()
        }
    }
}

/// Declarative translations of perfdata names for a group of check commands.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Translation {
    /// Unique name of the translation.
    pub name: String,
    /// The check commands the translations apply to.
    pub check_commands: Vec<CheckCommand>,
    /// Translations by perfdata name or `~`-prefixed regular expression.
    pub translations: IndexMap<String, TranslationKind>,
}

/// Translation rules of all check commands.
#[derive(Debug, Default)]
pub struct TranslationTable {
    commands: HashMap<String, CheckTranslations>,
}

impl TranslationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from the legacy `check_metrics` format.
    ///
    /// Rules with invalid regular expressions are logged and skipped.
    pub fn from_legacy(check_metrics: &IndexMap<String, IndexMap<String, TranslationRule>>) -> Self {
        let mut table = Self::new();
        for (check_command, rules) in check_metrics {
            for (key, rule) in rules {
                table.insert_or_log(check_command, key, rule.clone());
            }
        }
        table
    }

    /// Adds a rule for a check command.
    pub fn insert(
        &mut self,
        check_command: &str,
        key: &str,
        rule: TranslationRule,
    ) -> Result<(), TranslationError> {
        self.commands
            .entry(check_command.to_owned())
            .or_default()
            .insert(key, rule)
    }

    /// Adds all rules of a declarative translation.
    ///
    /// Rules with invalid regular expressions are logged and skipped.
    pub fn add_translation(&mut self, translation: &Translation) {
        for check_command in &translation.check_commands {
            let command = check_command.command();
            for (key, kind) in &translation.translations {
                self.insert_or_log(&command, key, kind.into());
            }
        }
    }

    fn insert_or_log(&mut self, check_command: &str, key: &str, rule: TranslationRule) {
        if let Err(error) = self.insert(check_command, key, rule) {
            perfgraph_log::warn!(
                error = &error as &dyn Error,
                check_command,
                "skipping translation rule"
            );
        }
    }

    /// Returns the rules for a check command.
    ///
    /// Management board checks `check_mk-mgmt_<name>` fall back to the rules of `check_mk-<name>`.
    pub fn lookup_metric_translations_for_check_command(
        &self,
        check_command: Option<&str>,
    ) -> Option<&CheckTranslations> {
        let check_command = check_command?;
        if let Some(rules) = self.commands.get(check_command) {
            return Some(rules);
        }

        let name = check_command.strip_prefix("check_mk-mgmt_")?;
        self.commands.get(&format!("check_mk-{name}"))
    }

    /// Returns the effective translation of a perfdata name for a check command.
    pub fn perfvar_translation(&self, name: &str, check_command: Option<&str>) -> TranslationInfo {
        self.lookup_metric_translations_for_check_command(check_command)
            .map(|rules| rules.translate(name))
            .unwrap_or_default()
    }

    /// Returns all perfdata names that are translated into the canonical name, including the name
    /// itself.
    ///
    /// Only rules for exact names are considered.
    pub fn reverse_translate_metric_name(&self, canonical_name: &str) -> BTreeSet<MetricName> {
        let mut names = BTreeSet::from([MetricName::from(canonical_name)]);
        for rules in self.commands.values() {
            for (orig_name, rule) in &rules.exact {
                if rule.name.as_ref().is_some_and(|name| name == canonical_name) {
                    names.insert(orig_name.clone());
                }
            }
        }
        names
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.commands.values().all(CheckTranslations::is_empty)
    }
}
