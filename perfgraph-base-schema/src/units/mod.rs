//! Units of measurement and number formatting.
//!
//! A unit is specified by a [`UnitSpec`], the combination of a [`Notation`] (which decides how
//! large and small numbers are scaled and which prefixes are used) and a [`Precision`] (which
//! decides how many digits are shown). Specifications are turned into [`UnitInfo`] descriptors by
//! the [`UnitRegistry`], which caches one descriptor per distinct specification.
//!
//! ```
//! use perfgraph_base_schema::units::{Notation, Precision, UnitRegistry, UnitSpec};
//!
//! let registry = UnitRegistry::new();
//! let unit = registry.parse_or_add_unit(&UnitSpec::new(
//!     Notation::Iec { symbol: "B".into() },
//!     Precision::Auto { digits: 2 },
//! ));
//!
//! assert_eq!(unit.id, "IECNotation_B_AutoPrecision_2");
//! assert_eq!(unit.render(123456.789), "120.56 KiB");
//! ```

mod format;
mod registry;

use serde::{Deserialize, Serialize};

pub use self::registry::*;

/// Describes how values are scaled and which prefixes are used when rendering them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notation {
    /// Plain decimal numbers without any prefix.
    Decimal {
        /// The unit symbol, may be empty.
        symbol: String,
    },
    /// Decimal SI prefixes from yocto to yotta.
    Si {
        /// The unit symbol, may be empty.
        symbol: String,
    },
    /// Binary IEC prefixes (`Ki`, `Mi`, ...) for large numbers.
    Iec {
        /// The unit symbol, may be empty.
        symbol: String,
    },
    /// Scientific notation with one leading digit, for example `1.23e+5`.
    StandardScientific {
        /// The unit symbol, may be empty.
        symbol: String,
    },
    /// Scientific notation with exponents that are multiples of three, for example `123.46e+3`.
    EngineeringScientific {
        /// The unit symbol, may be empty.
        symbol: String,
    },
    /// Durations in seconds, scaled to days, hours, minutes, milliseconds or microseconds.
    Time,
}

impl Notation {
    /// Returns the unit symbol of this notation.
    pub fn symbol(&self) -> &str {
        match self {
            Self::Decimal { symbol }
            | Self::Si { symbol }
            | Self::Iec { symbol }
            | Self::StandardScientific { symbol }
            | Self::EngineeringScientific { symbol } => symbol,
            Self::Time => "s",
        }
    }

    /// Returns the name of the notation as used in unit identifiers.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Decimal { .. } => "DecimalNotation",
            Self::Si { .. } => "SINotation",
            Self::Iec { .. } => "IECNotation",
            Self::StandardScientific { .. } => "StandardScientificNotation",
            Self::EngineeringScientific { .. } => "EngineeringScientificNotation",
            Self::Time => "TimeNotation",
        }
    }

    /// Returns the name of the matching formatter of the client-side renderer.
    fn js_formatter(&self) -> &'static str {
        match self {
            Self::Decimal { .. } => "DecimalFormatter",
            Self::Si { .. } => "SIFormatter",
            Self::Iec { .. } => "IECFormatter",
            Self::StandardScientific { .. } => "StandardScientificFormatter",
            Self::EngineeringScientific { .. } => "EngineeringScientificFormatter",
            Self::Time => "TimeFormatter",
        }
    }
}

/// Controls the number of fractional digits shown when rendering a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Precision {
    /// Shows at least `digits` digits, and as many more as needed to show the first non-zero
    /// digit of the fractional part.
    Auto {
        /// The minimum number of fractional digits.
        digits: u8,
    },
    /// Shows at most `digits` digits, possibly rounding the fractional part away entirely.
    Strict {
        /// The maximum number of fractional digits.
        digits: u8,
    },
}

impl Precision {
    /// Returns the configured number of digits.
    pub fn digits(&self) -> u8 {
        match *self {
            Self::Auto { digits } | Self::Strict { digits } => digits,
        }
    }

    /// Returns the name of the precision as used in unit identifiers.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Auto { .. } => "AutoPrecision",
            Self::Strict { .. } => "StrictPrecision",
        }
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::Auto { digits: 2 }
    }
}

/// The full specification of a unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct UnitSpec {
    /// Scaling and prefix rules.
    pub notation: Notation,
    /// Digits rule.
    #[serde(default)]
    pub precision: Precision,
}

impl UnitSpec {
    /// Creates a new unit specification.
    pub fn new(notation: Notation, precision: Precision) -> Self {
        Self {
            notation,
            precision,
        }
    }

    /// The unit of plain numbers without a symbol.
    ///
    /// Constants and unknown metrics use this unit.
    pub fn neutral() -> Self {
        Self::decimal("")
    }

    /// The percentage unit used by percent expressions.
    pub fn percent() -> Self {
        Self::decimal("%")
    }

    /// A decimal unit with the given symbol and two digits of automatic precision.
    pub fn decimal(symbol: &str) -> Self {
        Self::new(
            Notation::Decimal {
                symbol: symbol.to_owned(),
            },
            Precision::default(),
        )
    }

    /// Returns the deterministic identifier of this unit.
    ///
    /// The identifier is composed of the notation, the symbol, the precision and its digits, for
    /// instance `DecimalNotation__AutoPrecision_2` for the neutral unit.
    pub fn id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.notation.class_name(),
            self.notation.symbol(),
            self.precision.class_name(),
            self.precision.digits()
        )
    }

    /// Looks up the specification of a unit from the legacy unit table by its name.
    ///
    /// Legacy metric definitions and the `@unit` suffix of textual expressions refer to units by
    /// these short names.
    ///
    /// # Examples
    ///
    /// ```
    /// use perfgraph_base_schema::units::UnitSpec;
    ///
    /// assert_eq!(UnitSpec::from_legacy_name("%"), Some(UnitSpec::percent()));
    /// assert_eq!(UnitSpec::from_legacy_name("furlongs"), None);
    /// ```
    pub fn from_legacy_name(name: &str) -> Option<Self> {
        let auto = Precision::Auto { digits: 2 };
        let (notation, precision) = match name {
            "" => (decimal(""), auto),
            "count" => (decimal(""), Precision::Strict { digits: 2 }),
            "%" => (decimal("%"), auto),
            "s" => (Notation::Time, auto),
            "1/s" => (decimal("1/s"), auto),
            "hz" => (si("Hz"), auto),
            "bytes" => (iec("B"), auto),
            "bytes/s" => (iec("B/s"), auto),
            "bytes/d" => (iec("B/d"), auto),
            "bits/s" => (si("bit/s"), auto),
            "c" => (decimal("°C"), auto),
            "a" => (si("A"), auto),
            "v" => (si("V"), auto),
            "w" => (si("W"), auto),
            "va" => (si("VA"), auto),
            "wh" => (si("Wh"), auto),
            "dbm" => (decimal("dBm"), auto),
            "db" => (decimal("dB"), auto),
            "ppm" => (decimal("ppm"), auto),
            "%/m" => (decimal("%/m"), auto),
            "bar" => (si("bar"), auto),
            "l/s" => (si("l/s"), auto),
            "rpm" => (decimal("rpm"), auto),
            _ => return None,
        };

        Some(Self::new(notation, precision))
    }
}

fn decimal(symbol: &str) -> Notation {
    Notation::Decimal {
        symbol: symbol.to_owned(),
    }
}

fn si(symbol: &str) -> Notation {
    Notation::Si {
        symbol: symbol.to_owned(),
    }
}

fn iec(symbol: &str) -> Notation {
    Notation::Iec {
        symbol: symbol.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_unit_id() {
        assert_eq!(UnitSpec::neutral().id(), "DecimalNotation__AutoPrecision_2");
        assert_eq!(
            UnitSpec::new(Notation::Time, Precision::Strict { digits: 0 }).id(),
            "TimeNotation_s_StrictPrecision_0"
        );
    }

    #[test]
    fn test_parse_unit_spec_yaml() {
        let yaml = r#"
notation:
  type: si
  symbol: bit/s
precision:
  type: strict
  digits: 1
"#;
        let spec: UnitSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            spec,
            UnitSpec::new(si("bit/s"), Precision::Strict { digits: 1 })
        );
    }

    #[test]
    fn test_parse_unit_spec_default_precision() {
        let spec: UnitSpec = serde_json::from_str(r#"{"notation": {"type": "time"}}"#).unwrap();
        assert_eq!(spec, UnitSpec::new(Notation::Time, Precision::Auto { digits: 2 }));
    }

    #[test]
    fn test_legacy_count_differs_from_neutral() {
        let count = UnitSpec::from_legacy_name("count").unwrap();
        assert_eq!(count.notation.symbol(), "");
        assert!(count.id() != UnitSpec::neutral().id());
    }
}
