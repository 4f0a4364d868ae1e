use super::{Notation, Precision};

/// Scaled number together with the prefixed symbol it is shown with.
struct Scaled {
    value: f64,
    suffix: String,
}

impl Scaled {
    fn plain(value: f64, symbol: &str) -> Self {
        Self::prefixed(value, "", symbol)
    }

    fn prefixed(value: f64, prefix: &str, symbol: &str) -> Self {
        Self {
            value,
            suffix: format!("{prefix}{symbol}"),
        }
    }
}

const SI_SMALL: [(i32, &str); 8] = [
    (-24, "y"),
    (-21, "z"),
    (-18, "a"),
    (-15, "f"),
    (-12, "p"),
    (-9, "n"),
    (-6, "µ"),
    (-3, "m"),
];

const SI_LARGE: [(i32, &str); 8] = [
    (24, "Y"),
    (21, "Z"),
    (18, "E"),
    (15, "P"),
    (12, "T"),
    (9, "G"),
    (6, "M"),
    (3, "k"),
];

const IEC_LARGE: [(i32, &str); 8] = [
    (8, "Yi"),
    (7, "Zi"),
    (6, "Ei"),
    (5, "Pi"),
    (4, "Ti"),
    (3, "Gi"),
    (2, "Mi"),
    (1, "Ki"),
];

const TIME_LARGE: [(f64, &str); 3] = [(86400.0, "d"), (3600.0, "h"), (60.0, "min")];

/// Renders a value according to a notation and precision, using `symbol` as the unit symbol.
pub(super) fn render(value: f64, notation: &Notation, symbol: &str, precision: Precision) -> String {
    if !value.is_finite() {
        return join(&value.to_string(), symbol);
    }

    if value < 0.0 {
        return format!("-{}", render(value.abs(), notation, symbol, precision));
    }

    if value == 0.0 || value == 1.0 {
        return join(&value.to_string(), symbol);
    }

    match notation {
        Notation::StandardScientific { .. } => return scientific(value, symbol, precision, 1),
        Notation::EngineeringScientific { .. } => return scientific(value, symbol, precision, 3),
        _ => (),
    }

    let scaled = if value < 1.0 {
        small_number(value, notation, symbol)
    } else {
        large_number(value, notation, symbol)
    };

    join(&apply_precision(scaled.value, precision), &scaled.suffix)
}

fn exponent(value: f64) -> i32 {
    value.log10().floor() as i32
}

fn small_number(value: f64, notation: &Notation, symbol: &str) -> Scaled {
    match notation {
        Notation::Si { .. } => {
            let exponent = exponent(value);
            match SI_SMALL.iter().find(|(threshold, _)| exponent <= *threshold) {
                Some(&(threshold, prefix)) => {
                    Scaled::prefixed(value / 10f64.powi(threshold), prefix, symbol)
                }
                None => Scaled::plain(value, symbol),
            }
        }
        Notation::Time => {
            let exponent = exponent(value);
            if exponent <= -6 {
                Scaled::plain(value * 1e6, "µs")
            } else if exponent <= -3 {
                Scaled::plain(value * 1e3, "ms")
            } else {
                Scaled::plain(value, "s")
            }
        }
        _ => Scaled::plain(value, symbol),
    }
}

fn large_number(value: f64, notation: &Notation, symbol: &str) -> Scaled {
    match notation {
        Notation::Si { .. } => {
            let exponent = exponent(value);
            match SI_LARGE.iter().find(|(threshold, _)| exponent >= *threshold) {
                Some(&(threshold, prefix)) => {
                    Scaled::prefixed(value / 10f64.powi(threshold), prefix, symbol)
                }
                None => Scaled::plain(value, symbol),
            }
        }
        Notation::Iec { .. } => {
            let found = IEC_LARGE
                .iter()
                .find(|(power, _)| value >= 1024f64.powi(*power));
            match found {
                Some(&(power, prefix)) => {
                    Scaled::prefixed(value / 1024f64.powi(power), prefix, symbol)
                }
                None => Scaled::plain(value, symbol),
            }
        }
        Notation::Time => match TIME_LARGE.iter().find(|(seconds, _)| value >= *seconds) {
            Some(&(seconds, suffix)) => Scaled::plain(value / seconds, suffix),
            None => Scaled::plain(value, "s"),
        },
        _ => Scaled::plain(value, symbol),
    }
}

/// Renders `value` as `mantissa e±exponent`, with the exponent a multiple of `step`.
fn scientific(value: f64, symbol: &str, precision: Precision, step: i32) -> String {
    let exponent = exponent(value).div_euclid(step) * step;
    let mantissa = apply_precision(value / 10f64.powi(exponent), precision);
    let sign = if exponent < 0 { '-' } else { '+' };
    join(
        &format!("{mantissa}e{sign}{}", exponent.unsigned_abs()),
        symbol,
    )
}

/// Formats a non-negative value with the number of fractional digits the precision asks for.
///
/// Trailing zeros and a dangling decimal point are removed.
pub(super) fn apply_precision(value: f64, precision: Precision) -> String {
    let fraction = value.fract();
    if fraction == 0.0 {
        return value.to_string();
    }

    let digits = match precision {
        Precision::Auto { digits } => {
            let magnitude = fraction.log10().ceil().abs() as usize;
            if magnitude == 0 {
                usize::from(digits)
            } else {
                usize::from(digits).max(magnitude + 1)
            }
        }
        Precision::Strict { digits } => usize::from(digits),
    };

    let formatted = format!("{value:.digits$}");
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_owned()
    } else {
        formatted
    }
}

fn join(number: &str, suffix: &str) -> String {
    format!("{number} {suffix}").trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    fn decimal() -> Notation {
        Notation::Decimal {
            symbol: "unit".into(),
        }
    }

    fn si() -> Notation {
        Notation::Si {
            symbol: "unit".into(),
        }
    }

    fn iec() -> Notation {
        Notation::Iec {
            symbol: "unit".into(),
        }
    }

    const AUTO: Precision = Precision::Auto { digits: 2 };

    #[test]
    fn test_render_zero_and_one() {
        assert_eq!(render(0.0, &decimal(), "unit", AUTO), "0 unit");
        assert_eq!(render(1.0, &decimal(), "unit", AUTO), "1 unit");
        assert_eq!(render(0.0, &Notation::Time, "s", AUTO), "0 s");
        assert_eq!(render(1.0, &decimal(), "", AUTO), "1");
    }

    #[test]
    fn test_render_precision() {
        let auto = Precision::Auto { digits: 0 };
        let strict = Precision::Strict { digits: 0 };
        assert_eq!(render(0.006789, &decimal(), "unit", auto), "0.007 unit");
        assert_eq!(render(0.006789, &decimal(), "unit", strict), "0 unit");
        assert_eq!(render(12.5, &decimal(), "unit", Precision::Strict { digits: 3 }), "12.5 unit");
    }

    #[test]
    fn test_render_negative() {
        assert_eq!(render(-123456.789, &si(), "unit", AUTO), "-123.46 kunit");
        assert_eq!(render(-1.0, &decimal(), "unit", AUTO), "-1 unit");
    }

    #[test]
    fn test_render_si() {
        assert_eq!(render(999.999, &si(), "unit", AUTO), "1000 unit");
        assert_eq!(render(123456.789, &si(), "unit", AUTO), "123.46 kunit");
        assert_eq!(render(0.001234, &si(), "unit", AUTO), "1.23 munit");
        assert_eq!(render(2.5e-9, &si(), "unit", AUTO), "2.5 nunit");
        assert_eq!(render(0.5, &si(), "unit", AUTO), "0.5 unit");
    }

    #[test]
    fn test_render_iec() {
        assert_eq!(render(1023.999, &iec(), "unit", AUTO), "1024 unit");
        assert_eq!(render(123456.789, &iec(), "unit", AUTO), "120.56 Kiunit");
        assert_eq!(render(1048576.0, &iec(), "B", AUTO), "1 MiB");
        assert_eq!(render(0.25, &iec(), "B", AUTO), "0.25 B");
    }

    #[test]
    fn test_render_time() {
        assert_eq!(render(86399.999, &Notation::Time, "s", AUTO), "24 h");
        assert_eq!(render(172800.0, &Notation::Time, "s", AUTO), "2 d");
        assert_eq!(render(90.0, &Notation::Time, "s", AUTO), "1.5 min");
        assert_eq!(render(42.0, &Notation::Time, "s", AUTO), "42 s");
        assert_eq!(render(0.0025, &Notation::Time, "s", AUTO), "2.5 ms");
        assert_eq!(render(0.0000045, &Notation::Time, "s", AUTO), "4.5 µs");
    }

    #[test]
    fn test_render_scientific() {
        let standard = Notation::StandardScientific {
            symbol: "unit".into(),
        };
        let engineering = Notation::EngineeringScientific {
            symbol: "unit".into(),
        };
        assert_eq!(render(123456.789, &standard, "unit", AUTO), "1.23e+5 unit");
        assert_eq!(render(0.00000123, &standard, "unit", AUTO), "1.23e-6 unit");
        assert_eq!(render(123456.789, &engineering, "unit", AUTO), "123.46e+3 unit");
        assert_eq!(render(0.0000123, &engineering, "unit", AUTO), "12.3e-6 unit");
    }

    #[test]
    fn test_render_non_finite() {
        assert_eq!(render(f64::INFINITY, &decimal(), "unit", AUTO), "inf unit");
        assert_eq!(render(f64::NAN, &decimal(), "", AUTO), "NaN");
    }
}
