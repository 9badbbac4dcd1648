use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::{ColorSpaceMode, Tint};

#[derive(Parser, Debug)]
#[command(
    name = "wallhue",
    author,
    version,
    about = "Recolour the masked region of an image with a tint"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a preview window. Each stdin line (`#rrggbb`) changes the tint.
    View(SceneArgs),
    /// Render offscreen and write the composite to a PNG.
    Render(RenderArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SceneArgs {
    /// Base image: a file path, `file://` URL, or `http(s)://` URL.
    #[arg(long, value_name = "SOURCE")]
    pub image: Option<String>,

    /// Grayscale mask; its red channel above 0.5 selects tinted pixels.
    #[arg(long, value_name = "SOURCE")]
    pub mask: Option<String>,

    /// Initial tint as `#rrggbb`.
    #[arg(long, value_name = "HEX", value_parser = parse_tint)]
    pub color: Option<Tint>,

    /// Canvas size (e.g. `1920x1440`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Scene file (TOML) supplying defaults for the flags above.
    #[arg(long, value_name = "PATH", env = "WALLHUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_color_space,
        default_value = "auto"
    )]
    pub color_space: ColorSpaceMode,

    /// Background shown until both textures have loaded.
    #[arg(long, value_name = "HEX", value_parser = parse_tint)]
    pub clear_color: Option<Tint>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    /// Where to write the PNG.
    #[arg(long, short, value_name = "PATH")]
    pub output: PathBuf,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_tint(value: &str) -> Result<Tint, String> {
    Tint::from_hex(value).map_err(|err| err.to_string())
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_render_subcommand() {
        let cli = Cli::try_parse_from([
            "wallhue",
            "render",
            "--image",
            "photo.jpg",
            "--color",
            "#FF0000",
            "--color-space",
            "linear",
            "-o",
            "out.png",
        ])
        .unwrap();

        let Command::Render(args) = cli.command else {
            panic!("expected render subcommand");
        };
        assert_eq!(args.scene.image.as_deref(), Some("photo.jpg"));
        assert_eq!(
            args.scene.color.map(|tint| tint.to_rgb8()),
            Some([255, 0, 0])
        );
        assert_eq!(args.scene.color_space, ColorSpaceMode::Linear);
        assert_eq!(args.output, PathBuf::from("out.png"));
    }

    #[test]
    fn render_requires_output() {
        assert!(Cli::try_parse_from(["wallhue", "render"]).is_err());
    }

    #[test]
    fn rejects_malformed_colour_flag() {
        let err = Cli::try_parse_from(["wallhue", "view", "--color", "red"]).unwrap_err();
        assert!(err.to_string().contains("must start with '#'"));
    }

    #[test]
    fn color_space_aliases() {
        assert_eq!(parse_color_space(" SRGB "), Ok(ColorSpaceMode::Linear));
        assert_eq!(parse_color_space("gamma"), Ok(ColorSpaceMode::Gamma));
        assert!(parse_color_space("").is_err());
        assert!(parse_color_space("hdr").is_err());
    }
}
