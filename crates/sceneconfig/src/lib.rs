use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// An `#rrggbb` colour as stored in the scene file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor(pub [u8; 3]);

impl HexColor {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix('#')
            .ok_or_else(|| format!("colour '{trimmed}' must start with '#'"))?;
        if digits.len() != 6 || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(format!("colour '{trimmed}' must be #rrggbb"));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|err| format!("colour '{trimmed}': {err}"))
        };
        Ok(Self([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }

    pub fn rgb(self) -> [u8; 3] {
        self.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;
        impl<'de> de::Visitor<'de> for Visitor {
            type Value = HexColor;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a colour string like \"#ff8800\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                HexColor::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

impl Serialize for HexColor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SceneConfig {
    pub version: u32,
    #[serde(default)]
    pub inputs: Inputs,
    #[serde(default)]
    pub canvas: Canvas,
    #[serde(default)]
    pub tint: TintSection,
}

/// Image and mask sources: file paths or `http(s)://` URLs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Inputs {
    pub image: Option<String>,
    pub mask: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Canvas {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub clear_color: Option<HexColor>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TintSection {
    pub color: Option<HexColor>,
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Canvas size when both dimensions are set.
    pub fn canvas_size(&self) -> Option<(u32, u32)> {
        Some((self.canvas.width?, self.canvas.height?))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        for (name, value) in [("width", self.canvas.width), ("height", self.canvas.height)] {
            if value == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "canvas.{name} must be greater than zero"
                )));
            }
        }
        if self.canvas.width.is_some() != self.canvas.height.is_some() {
            return Err(ConfigError::Invalid(
                "canvas.width and canvas.height must be set together".into(),
            ));
        }

        for (name, value) in [("image", &self.inputs.image), ("mask", &self.inputs.mask)] {
            if value.as_deref().is_some_and(|source| source.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "inputs.{name} may not be empty"
                )));
            }
        }

        Ok(())
    }
}
