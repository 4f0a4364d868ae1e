//! Colors of metrics, graphs and perfometers.
//!
//! Colors are passed around as lowercase `#rrggbb` strings. They are either chosen from the
//! symbolic [`Color`] palette of declarative plugins, or from the legacy palette which addresses
//! colors as `NN/a` and `NN/b` (see [`parse_color_into_hexrgb`]).

use std::fmt;
use std::str::FromStr;

use perfgraph_common::{impl_display_as_str, impl_str_serde};
use thiserror::Error;

/// Color assigned to warning levels.
pub const WARN_COLOR: &str = "#ffff00";
/// Color assigned to critical levels.
pub const CRIT_COLOR: &str = "#ff0000";
/// Fallback for color strings that cannot be resolved.
pub const FALLBACK_COLOR: &str = "#808080";
/// Black, which acts as transparent when colors of operands are combined.
pub const BLACK: &str = "#000000";

/// Returns the fixed color of a scalar, if it has one.
pub fn scalar_color(scalar: &str) -> Option<&'static str> {
    match scalar {
        "warn" => Some(WARN_COLOR),
        "crit" => Some(CRIT_COLOR),
        _ => None,
    }
}

/// Error returned when parsing a [`Color`] or an [`Rgb`] value fails.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid color specification '{0}'")]
pub struct ParseColorError(pub String);

macro_rules! colors {
    ($($variant:ident => ($name:literal, $r:literal, $g:literal, $b:literal),)*) => {
        /// The closed set of symbolic colors available to declarative plugins.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Color {
            $(
                #[allow(missing_docs)]
                $variant,
            )*
        }

        impl Color {
            /// All symbolic colors in declaration order.
            pub const ALL: &'static [Color] = &[$(Self::$variant,)*];

            /// Returns the symbolic name of the color, for example `LIGHT_RED`.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Returns the red, green and blue components of the color.
            pub fn rgb(self) -> (u8, u8, u8) {
                match self {
                    $(Self::$variant => ($r, $g, $b),)*
                }
            }
        }

        impl FromStr for Color {
            type Err = ParseColorError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($name) {
                        return Ok(Self::$variant);
                    }
                )*
                Err(ParseColorError(s.to_owned()))
            }
        }
    };
}

colors! {
    LightRed => ("LIGHT_RED", 255, 112, 112),
    Red => ("RED", 204, 0, 0),
    DarkRed => ("DARK_RED", 122, 0, 0),
    LightOrange => ("LIGHT_ORANGE", 255, 150, 100),
    Orange => ("ORANGE", 255, 110, 33),
    DarkOrange => ("DARK_ORANGE", 204, 77, 0),
    LightYellow => ("LIGHT_YELLOW", 255, 255, 120),
    Yellow => ("YELLOW", 245, 245, 0),
    DarkYellow => ("DARK_YELLOW", 170, 170, 0),
    LightGreen => ("LIGHT_GREEN", 135, 255, 135),
    Green => ("GREEN", 55, 250, 55),
    DarkGreen => ("DARK_GREEN", 0, 143, 0),
    LightBlue => ("LIGHT_BLUE", 71, 71, 255),
    Blue => ("BLUE", 30, 144, 255),
    DarkBlue => ("DARK_BLUE", 0, 0, 184),
    LightCyan => ("LIGHT_CYAN", 150, 255, 255),
    Cyan => ("CYAN", 30, 230, 230),
    DarkCyan => ("DARK_CYAN", 0, 150, 150),
    LightPurple => ("LIGHT_PURPLE", 163, 71, 255),
    Purple => ("PURPLE", 120, 0, 240),
    DarkPurple => ("DARK_PURPLE", 80, 0, 163),
    LightPink => ("LIGHT_PINK", 255, 160, 240),
    Pink => ("PINK", 255, 100, 255),
    DarkPink => ("DARK_PINK", 204, 0, 204),
    LightBrown => ("LIGHT_BROWN", 230, 180, 140),
    Brown => ("BROWN", 191, 133, 72),
    DarkBrown => ("DARK_BROWN", 128, 64, 0),
    LightGray => ("LIGHT_GRAY", 200, 200, 200),
    Gray => ("GRAY", 164, 164, 164),
    DarkGray => ("DARK_GRAY", 121, 121, 121),
    Black => ("BLACK", 0, 0, 0),
    White => ("WHITE", 255, 255, 255),
}

impl_display_as_str!(Color);
impl_str_serde!(Color, "a symbolic color name");

/// Renders a symbolic color as lowercase `#rrggbb`.
pub fn parse_color(color: Color) -> String {
    let (r, g, b) = color.rgb();
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// A color with red, green and blue components between `0.0` and `1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    /// Red component.
    pub r: f64,
    /// Green component.
    pub g: f64,
    /// Blue component.
    pub b: f64,
}

impl Rgb {
    /// Creates a color from its components.
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Parses a `#rrggbb` string.
    pub fn parse(color: &str) -> Result<Self, ParseColorError> {
        let error = || ParseColorError(color.to_owned());
        let hex = color.strip_prefix('#').ok_or_else(error)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(error());
        }

        let component = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map(|c| f64::from(c) / 255.0)
                .map_err(|_| error())
        };

        Ok(Self::new(component(0..2)?, component(2..4)?, component(4..6)?))
    }

    /// Converts a color from the HSV color space.
    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        if s == 0.0 {
            return Self::new(v, v, v);
        }

        let i = (h * 6.0) as i64;
        let f = (h * 6.0) - i as f64;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        match i.rem_euclid(6) {
            0 => Self::new(v, t, p),
            1 => Self::new(q, v, p),
            2 => Self::new(p, v, t),
            3 => Self::new(p, q, v),
            4 => Self::new(t, p, v),
            _ => Self::new(v, p, q),
        }
    }

    /// Renders the color as lowercase `#rrggbb`, truncating the components.
    pub fn render(&self) -> String {
        let channel = |c: f64| (c * 255.0).clamp(0.0, 255.0) as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }

    /// Returns the average of two colors.
    pub fn mix(self, other: Self) -> Self {
        Self::new(
            (self.r + other.r) / 2.0,
            (self.g + other.g) / 2.0,
            (self.b + other.b) / 2.0,
        )
    }

    /// Makes the color darker, `v` ranges from `0.0` (unchanged) to `1.0` (black).
    pub fn darken(self, v: f64) -> Self {
        let darken = |x: f64| x * (1.0 - v);
        Self::new(darken(self.r), darken(self.g), darken(self.b))
    }

    /// Makes the color lighter, `v` ranges from `0.0` (unchanged) to `1.0` (white).
    pub fn lighten(self, v: f64) -> Self {
        let lighten = |x: f64| x + (1.0 - x) * v;
        Self::new(lighten(self.r), lighten(self.g), lighten(self.b))
    }

    /// Moves the color towards the middle gray: bright colors are darkened, dark ones lightened.
    pub fn fade(self, v: f64) -> Self {
        if self.gray() > 0.5 {
            self.darken(v)
        } else {
            self.lighten(v)
        }
    }

    fn gray(&self) -> f64 {
        0.21 * self.r + 0.72 * self.g + 0.07 * self.b
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Combines the colors of two operands.
///
/// Black operands are transparent. Other colors are mixed. Unparseable colors yield the other
/// operand's color.
pub fn choose_operator_color(a: &str, b: &str) -> String {
    if a == BLACK {
        return b.to_owned();
    }
    if b == BLACK {
        return a.to_owned();
    }

    match (Rgb::parse(a), Rgb::parse(b)) {
        (Ok(a), Ok(b)) => a.mix(b).render(),
        (Ok(_), Err(_)) => a.to_owned(),
        (Err(_), _) => b.to_owned(),
    }
}

/// The legacy palette, as sorted keys with their HSV values.
///
/// Keys in the `1x` range are red, `2x` yellow, `3x` green, `4x` blue and `5x` special colors.
const LEGACY_PALETTE: [(&str, (f64, f64, f64)); 27] = [
    ("11", (0.775, 1.0, 1.0)),
    ("12", (0.8, 1.0, 1.0)),
    ("13", (0.83, 1.0, 1.0)),
    ("14", (0.05, 1.0, 1.0)),
    ("15", (0.08, 1.0, 1.0)),
    ("16", (0.105, 1.0, 1.0)),
    ("21", (0.13, 1.0, 1.0)),
    ("22", (0.14, 1.0, 1.0)),
    ("23", (0.155, 1.0, 1.0)),
    ("24", (0.185, 1.0, 1.0)),
    ("25", (0.21, 1.0, 1.0)),
    ("26", (0.25, 1.0, 1.0)),
    ("31", (0.45, 1.0, 1.0)),
    ("32", (0.5, 1.0, 1.0)),
    ("33", (0.515, 1.0, 1.0)),
    ("34", (0.53, 1.0, 1.0)),
    ("35", (0.55, 1.0, 1.0)),
    ("36", (0.57, 1.0, 1.0)),
    ("41", (0.59, 1.0, 1.0)),
    ("42", (0.62, 1.0, 1.0)),
    ("43", (0.66, 1.0, 1.0)),
    ("44", (0.71, 1.0, 1.0)),
    ("45", (0.73, 1.0, 1.0)),
    ("46", (0.75, 1.0, 1.0)),
    ("51", (0.0, 0.0, 0.5)),
    ("52", (0.067, 0.7, 0.5)),
    ("53", (0.083, 0.8, 0.55)),
];

/// Number of entries in the legacy palette.
pub const LEGACY_PALETTE_SIZE: usize = LEGACY_PALETTE.len();

/// Returns the legacy color at position `index` of the sorted palette, for example `12/a`.
///
/// The index wraps around the palette.
pub fn palette_color_by_index(index: usize, shading: char) -> String {
    let (key, _) = LEGACY_PALETTE[index % LEGACY_PALETTE_SIZE];
    format!("{key}/{shading}")
}

/// Resolves a color string to `#rrggbb`.
///
/// Strings starting with `#` are passed through. Legacy colors of the form `NN/a` resolve through
/// the legacy palette, where shading `b` darkens colors of the yellow and green area and
/// desaturates all others. Everything else resolves to gray.
pub fn parse_color_into_hexrgb(color: &str) -> String {
    if color.starts_with('#') {
        return color.to_owned();
    }

    let Some((key, shading)) = color.split_once('/') else {
        return FALLBACK_COLOR.to_owned();
    };

    let Some(&(_, (h, mut s, mut v))) = LEGACY_PALETTE.iter().find(|(k, _)| *k == key) else {
        return FALLBACK_COLOR.to_owned();
    };

    if shading == "b" {
        if key.starts_with(['2', '3']) {
            v *= 0.8;
        } else {
            s *= 0.6;
        }
    }

    Rgb::from_hsv(h, s, v).render()
}

const COLOR_WHEEL_SIZE: usize = 48;

/// Returns a color for the `index`-th of `total` curves in one graph.
///
/// The first 48 indices are legacy palette colors chosen for high contrast between neighbours.
/// Beyond that, distinct RGB values are generated.
pub fn indexed_color(index: usize, total: usize) -> String {
    if index < COLOR_WHEEL_SIZE {
        let base = (index % 4) + 1;
        let tone = ((index / 4) % 6) + 1;
        let shading = if index % 8 < 4 { 'a' } else { 'b' };
        return format!("{base}{tone}/{shading}");
    }

    let index = index - COLOR_WHEEL_SIZE;
    let base_color = index % 7;
    let extra = total.saturating_sub(COLOR_WHEEL_SIZE).max(1) as f64;
    let delta = (255.0 / (extra / 7.0)).trunc();
    let offset = (255.0 - delta * ((index as f64 / 7.0) + 1.0))
        .trunc()
        .clamp(0.0, 255.0) as u8;

    let channel = |on: bool| if on { offset } else { 0 };
    let r = channel(matches!(base_color, 0 | 3 | 4 | 6));
    let g = channel(matches!(base_color, 1 | 3 | 5 | 6));
    let b = channel(matches!(base_color, 2 | 4 | 5 | 6));
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Sections of the hue circle with their relative share of generated colors.
const HUE_DISTRIBUTION: [(f64, f64); 10] = [
    (0.1, 10.0),
    (0.2, 10.0),
    (0.3, 5.0),
    (0.4, 2.0),
    (0.5, 5.0),
    (0.6, 20.0),
    (0.7, 10.0),
    (0.8, 20.0),
    (0.9, 20.0),
    (1.0, 20.0),
];

/// Returns `n` colors that are visually as different as possible.
pub fn n_different_colors(n: usize) -> Vec<String> {
    let total_weight: f64 = HUE_DISTRIBUTION.iter().map(|(_, weight)| weight).sum();
    (0..n)
        .map(|i| {
            let weight_index = (i as f64 * total_weight / n as f64).trunc();
            Rgb::from_hsv(hue_by_weight_index(weight_index), 1.0, 1.0).render()
        })
        .collect()
}

fn hue_by_weight_index(mut weight_index: f64) -> f64 {
    let mut section_begin = 0.0;
    for (section_end, section_weight) in HUE_DISTRIBUTION {
        if weight_index < section_weight {
            return section_begin + (weight_index / section_weight) * (section_end - section_begin);
        }
        weight_index -= section_weight;
        section_begin = section_end;
    }
    section_begin
}
