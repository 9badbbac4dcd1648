use std::fmt;
use std::str::FromStr;

/// Normalised RGB colour multiplied into masked pixels.
///
/// Values are stored in `[0, 1]` per channel. A `Tint` is a plain value: the
/// colour control replaces it wholesale on every change instead of editing
/// channels in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tint {
    rgb: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("colour value must not be empty")]
    Empty,
    #[error("colour '{0}' must start with '#'")]
    MissingHash(String),
    #[error("colour '{0}' must have exactly six hex digits (#rrggbb)")]
    BadLength(String),
    #[error("colour '{0}' contains a non-hex digit")]
    BadDigit(String),
}

impl Tint {
    pub const WHITE: Tint = Tint {
        rgb: [1.0, 1.0, 1.0],
    };
    pub const BLACK: Tint = Tint {
        rgb: [0.0, 0.0, 0.0],
    };

    /// Builds a tint from normalised channels, clamping each into `[0, 1]`.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            rgb: [clamp_unit(r), clamp_unit(g), clamp_unit(b)],
        }
    }

    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        Self {
            rgb: rgb.map(|channel| f32::from(channel) / 255.0),
        }
    }

    /// Parses a `#rrggbb` string. Surrounding whitespace is ignored and hex
    /// digits are case-insensitive.
    pub fn from_hex(value: &str) -> Result<Self, ColorParseError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ColorParseError::Empty);
        }
        let digits = trimmed
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError::MissingHash(trimmed.to_string()))?;
        if digits.len() != 6 {
            return Err(ColorParseError::BadLength(trimmed.to_string()));
        }
        if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(ColorParseError::BadDigit(trimmed.to_string()));
        }

        let mut rgb = [0u8; 3];
        for (index, slot) in rgb.iter_mut().enumerate() {
            let start = index * 2;
            *slot = u8::from_str_radix(&digits[start..start + 2], 16)
                .map_err(|_| ColorParseError::BadDigit(trimmed.to_string()))?;
        }
        Ok(Self::from_rgb8(rgb))
    }

    pub fn rgb(&self) -> [f32; 3] {
        self.rgb
    }

    pub fn to_rgb8(&self) -> [u8; 3] {
        self.rgb.map(|channel| (channel * 255.0).round() as u8)
    }

    /// Decodes the sRGB-encoded channels to linear light.
    pub fn to_linear(self) -> Self {
        Self {
            rgb: self.rgb.map(srgb_to_linear),
        }
    }

    pub(crate) fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: f64::from(self.rgb[0]),
            g: f64::from(self.rgb[1]),
            b: f64::from(self.rgb[2]),
            a: 1.0,
        }
    }
}

impl Default for Tint {
    /// White leaves masked pixels unchanged until a colour is chosen.
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for Tint {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Tint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.to_rgb8();
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lower_and_upper_case_hex() {
        let lower = Tint::from_hex("#ff8000").unwrap();
        let upper = Tint::from_hex("#FF8000").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_rgb8(), [255, 128, 0]);
        assert_eq!(lower.rgb()[0], 1.0);
        assert_eq!(lower.rgb()[2], 0.0);
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let tint: Tint = "  #00ff00\n".parse().unwrap();
        assert_eq!(tint.to_rgb8(), [0, 255, 0]);
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(Tint::from_hex(""), Err(ColorParseError::Empty));
        assert!(matches!(
            Tint::from_hex("ff0000"),
            Err(ColorParseError::MissingHash(_))
        ));
        assert!(matches!(
            Tint::from_hex("#fff"),
            Err(ColorParseError::BadLength(_))
        ));
        assert!(matches!(
            Tint::from_hex("#gg0000"),
            Err(ColorParseError::BadDigit(_))
        ));
        assert!(matches!(
            Tint::from_hex("#ff00é"),
            Err(ColorParseError::BadLength(_)) | Err(ColorParseError::BadDigit(_))
        ));
    }

    #[test]
    fn displays_as_hex() {
        assert_eq!(Tint::from_rgb8([18, 52, 171]).to_string(), "#1234ab");
        assert_eq!(Tint::default().to_string(), "#ffffff");
    }

    #[test]
    fn linear_decode_follows_srgb_curve() {
        let linear = Tint::from_rgb8([0, 128, 255]).to_linear().rgb();
        assert_eq!(linear[0], 0.0);
        assert!((linear[1] - 0.2158).abs() < 1e-3);
        assert!((linear[2] - 1.0).abs() < 1e-6);
        let white = Tint::WHITE.to_linear().rgb();
        assert!(white.iter().all(|channel| (channel - 1.0).abs() < 1e-6));
    }

    #[test]
    fn new_clamps_channels() {
        let tint = Tint::new(-1.0, 2.0, f32::NAN);
        assert_eq!(tint.rgb(), [0.0, 1.0, 0.0]);
    }
}
