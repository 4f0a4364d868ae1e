use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{UnitSpec, format};

/// The temperature unit values are displayed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    /// Degrees Celsius, the unit checks report in.
    #[default]
    Celsius,
    /// Degrees Fahrenheit.
    Fahrenheit,
}

/// A conversion applied to values and their bounds before they are rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitConversion {
    /// Converts degrees Celsius to degrees Fahrenheit.
    CelsiusToFahrenheit,
}

impl UnitConversion {
    /// Converts a single value.
    pub fn convert(self, value: f64) -> f64 {
        match self {
            Self::CelsiusToFahrenheit => value * 1.8 + 32.0,
        }
    }
}

/// A registered unit with its render functions.
///
/// Unit infos are created through [`UnitRegistry::parse_or_add_unit`] and shared as
/// `Arc<UnitInfo>`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnitInfo {
    /// Identifier derived from the specification, see [`UnitSpec::id`].
    pub id: String,
    /// Human readable title.
    pub title: String,
    /// Symbol shown after rendered values.
    ///
    /// This differs from the symbol of the unit spec if a conversion is applied.
    pub symbol: String,
    /// The unit spec this unit was built from.
    pub spec: UnitSpec,
    /// Conversion applied to values before rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<UnitConversion>,
}

impl UnitInfo {
    fn new(spec: &UnitSpec, temperature_unit: TemperatureUnit) -> Self {
        let id = spec.id();
        let mut symbol = spec.notation.symbol().to_owned();
        let mut conversion = None;

        if symbol == "°C" && temperature_unit == TemperatureUnit::Fahrenheit {
            symbol = "°F".to_owned();
            conversion = Some(UnitConversion::CelsiusToFahrenheit);
        }

        Self {
            id,
            title: symbol.clone(),
            symbol,
            spec: spec.clone(),
            conversion,
        }
    }

    /// Returns `true` if this unit has no symbol.
    ///
    /// Neutral units give way to the other operand's unit in products and fractions.
    pub fn is_neutral(&self) -> bool {
        self.symbol.is_empty()
    }

    /// Applies the unit conversion to a value, if there is one.
    pub fn convert(&self, value: f64) -> f64 {
        match self.conversion {
            Some(conversion) => conversion.convert(value),
            None => value,
        }
    }

    /// Renders a value including its symbol.
    pub fn render(&self, value: f64) -> String {
        format::render(
            value,
            &self.spec.notation,
            &self.symbol,
            self.spec.precision,
        )
    }

    /// Returns a snippet for the client-side number renderer that renders values like
    /// [`render`](Self::render).
    pub fn js_render(&self) -> String {
        format!(
            "v => new cmk.number_format.{}({:?}, new cmk.number_format.{}({})).render(v)",
            self.spec.notation.js_formatter(),
            self.symbol,
            self.spec.precision.class_name(),
            self.spec.precision.digits(),
        )
    }
}

impl fmt::Display for UnitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Append-only registry of units, keyed by their identifier.
///
/// Registering the same specification twice returns the same shared [`UnitInfo`].
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Mutex<BTreeMap<String, Arc<UnitInfo>>>,
    temperature_unit: TemperatureUnit,
}

impl UnitRegistry {
    /// Creates an empty registry that displays temperatures in Celsius.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry that displays temperatures in the given unit.
    pub fn with_temperature_unit(temperature_unit: TemperatureUnit) -> Self {
        Self {
            units: Mutex::default(),
            temperature_unit,
        }
    }

    /// Returns the configured temperature unit.
    pub fn temperature_unit(&self) -> TemperatureUnit {
        self.temperature_unit
    }

    /// Returns the unit for a specification, registering it on first use.
    pub fn parse_or_add_unit(&self, spec: &UnitSpec) -> Arc<UnitInfo> {
        let id = spec.id();
        let mut units = self.units.lock();
        if let Some(unit) = units.get(&id) {
            return Arc::clone(unit);
        }

        let unit = Arc::new(UnitInfo::new(spec, self.temperature_unit));
        units.insert(id, Arc::clone(&unit));
        unit
    }

    /// Returns the unit for a name of the legacy unit table.
    ///
    /// See [`UnitSpec::from_legacy_name`] for the known names.
    pub fn legacy_unit(&self, name: &str) -> Option<Arc<UnitInfo>> {
        UnitSpec::from_legacy_name(name).map(|spec| self.parse_or_add_unit(&spec))
    }

    /// Returns the neutral unit.
    pub fn neutral(&self) -> Arc<UnitInfo> {
        self.parse_or_add_unit(&UnitSpec::neutral())
    }

    /// Returns the percentage unit.
    pub fn percent(&self) -> Arc<UnitInfo> {
        self.parse_or_add_unit(&UnitSpec::percent())
    }

    /// Looks up a registered unit by its identifier.
    pub fn get(&self, id: &str) -> Option<Arc<UnitInfo>> {
        self.units.lock().get(id).cloned()
    }

    /// Returns the number of registered units.
    pub fn len(&self) -> usize {
        self.units.lock().len()
    }

    /// Returns `true` if no unit has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.units.lock().is_empty()
    }
}
