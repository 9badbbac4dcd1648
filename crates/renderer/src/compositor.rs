//! State-change observer that decides when a frame is drawn.
//!
//! `Compositor` owns the gate, the current tint and the per-texture load
//! status. Runtimes feed it transitions (a load finished, a load failed, the
//! colour control changed) and it forwards renders to a [`RenderDriver`]. The
//! GPU renderers implement the trait; tests use a recording driver.

use anyhow::Result;
use tracing::{debug, error, warn};

use crate::color::{ColorParseError, Tint};
use crate::gate::LoadGate;
use crate::loader::{LoadEvent, LoadedTexture};
use crate::types::{TextureRole, TextureStatus};

/// Uniform values read by one render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub tint: Tint,
}

/// Draws the composite onto some canvas.
pub trait RenderDriver {
    /// Takes ownership of decoded pixels and makes them sampleable.
    fn attach_texture(&mut self, texture: LoadedTexture) -> Result<()>;

    /// Draws the composite with the supplied uniforms. Must be idempotent.
    fn render(&mut self, frame: &FrameState) -> Result<()>;

    /// Shows the background while the gate is closed. Never samples textures.
    fn present_background(&mut self) -> Result<()> {
        Ok(())
    }
}

/// What a state transition led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rendered,
    Waiting,
    Rejected,
}

pub struct Compositor<D> {
    driver: D,
    gate: LoadGate,
    tint: Tint,
    status: [TextureStatus; 2],
}

impl<D: RenderDriver> Compositor<D> {
    pub fn new(driver: D, tint: Tint) -> Self {
        Self {
            driver,
            gate: LoadGate::new(),
            tint,
            status: [TextureStatus::Pending, TextureStatus::Pending],
        }
    }

    /// Applies one loader outcome.
    ///
    /// A success attaches the texture, sets its gate token and attempts a
    /// render. A failure is logged and leaves the gate closed for good.
    pub fn handle_load(&mut self, event: LoadEvent) -> Result<Outcome> {
        let LoadEvent { role, outcome } = event;
        if self.status(role).is_settled() {
            warn!(%role, "ignoring duplicate load result");
            return Ok(Outcome::Rejected);
        }

        match outcome {
            Ok(texture) => {
                let (width, height) = texture.dimensions();
                self.driver.attach_texture(texture)?;
                self.status[role.index()] = TextureStatus::Loaded { width, height };
                self.gate.mark_loaded(role);
                self.render_if_open()
            }
            Err(err) => {
                error!(%role, error = %err, "failed to load texture");
                self.status[role.index()] = TextureStatus::Failed(err.to_string());
                Ok(Outcome::Waiting)
            }
        }
    }

    /// Replaces the tint and re-renders if the gate is open.
    pub fn set_tint(&mut self, tint: Tint) -> Result<Outcome> {
        debug!(%tint, previous = %self.tint, "tint changed");
        self.tint = tint;
        self.render_if_open()
    }

    /// Parses raw colour-control input. Malformed input keeps the previous
    /// tint and skips the render.
    pub fn apply_color_input(&mut self, raw: &str) -> Result<Outcome> {
        match Tint::from_hex(raw) {
            Ok(tint) => self.set_tint(tint),
            Err(err) => {
                self.log_rejected_color(raw, &err);
                Ok(Outcome::Rejected)
            }
        }
    }

    /// Redraws the current state, e.g. after the window was exposed.
    pub fn redraw(&mut self) -> Result<Outcome> {
        if self.gate.is_open() {
            self.render_if_open()
        } else {
            self.driver.present_background()?;
            Ok(Outcome::Waiting)
        }
    }

    pub fn tint(&self) -> Tint {
        self.tint
    }

    pub fn frame(&self) -> FrameState {
        FrameState { tint: self.tint }
    }

    pub fn status(&self, role: TextureRole) -> &TextureStatus {
        &self.status[role.index()]
    }

    pub fn is_open(&self) -> bool {
        self.gate.is_open()
    }

    /// True once neither texture is still pending.
    pub fn is_settled(&self) -> bool {
        self.status.iter().all(TextureStatus::is_settled)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    fn render_if_open(&mut self) -> Result<Outcome> {
        let frame = self.frame();
        if self.gate.check_and_render(&mut self.driver, &frame)? {
            Ok(Outcome::Rendered)
        } else {
            Ok(Outcome::Waiting)
        }
    }

    fn log_rejected_color(&self, raw: &str, err: &ColorParseError) {
        warn!(input = raw, error = %err, kept = %self.tint, "ignoring invalid colour input");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadError;
    use image::{Rgba, RgbaImage};
    use std::path::PathBuf;

    #[derive(Default)]
    struct RecordingDriver {
        attached: Vec<TextureRole>,
        frames: Vec<FrameState>,
        backgrounds: usize,
    }

    impl RenderDriver for RecordingDriver {
        fn attach_texture(&mut self, texture: LoadedTexture) -> Result<()> {
            self.attached.push(texture.role);
            Ok(())
        }

        fn render(&mut self, frame: &FrameState) -> Result<()> {
            assert_eq!(
                self.attached.len(),
                2,
                "render issued before both textures were attached"
            );
            self.frames.push(*frame);
            Ok(())
        }

        fn present_background(&mut self) -> Result<()> {
            self.backgrounds += 1;
            Ok(())
        }
    }

    fn loaded(role: TextureRole) -> LoadEvent {
        LoadEvent {
            role,
            outcome: Ok(LoadedTexture {
                role,
                origin: format!("{role}.png"),
                pixels: RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255])),
            }),
        }
    }

    fn failed(role: TextureRole) -> LoadEvent {
        LoadEvent {
            role,
            outcome: Err(LoadError::Io {
                path: PathBuf::from("data/missing.jpg"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }

    #[test]
    fn first_render_waits_for_both_orderings() {
        for order in [
            [TextureRole::Image, TextureRole::Mask],
            [TextureRole::Mask, TextureRole::Image],
        ] {
            let mut compositor = Compositor::new(RecordingDriver::default(), Tint::WHITE);
            assert_eq!(
                compositor.handle_load(loaded(order[0])).unwrap(),
                Outcome::Waiting
            );
            assert!(compositor.driver().frames.is_empty());
            assert_eq!(
                compositor.handle_load(loaded(order[1])).unwrap(),
                Outcome::Rendered
            );
            assert_eq!(compositor.driver().frames.len(), 1);
        }
    }

    #[test]
    fn both_loads_queued_before_processing_render_once() {
        let events = vec![loaded(TextureRole::Mask), loaded(TextureRole::Image)];
        let mut compositor = Compositor::new(RecordingDriver::default(), Tint::WHITE);
        for event in events {
            compositor.handle_load(event).unwrap();
        }
        assert_eq!(compositor.driver().frames.len(), 1);
        assert!(compositor.is_settled());
    }

    #[test]
    fn image_failure_blocks_rendering_forever() {
        let mut compositor = Compositor::new(RecordingDriver::default(), Tint::WHITE);
        compositor.handle_load(failed(TextureRole::Image)).unwrap();
        compositor.handle_load(loaded(TextureRole::Mask)).unwrap();
        assert_eq!(
            compositor.apply_color_input("#ff0000").unwrap(),
            Outcome::Waiting
        );
        assert_eq!(compositor.redraw().unwrap(), Outcome::Waiting);

        assert!(compositor.driver().frames.is_empty());
        assert!(!compositor.is_open());
        assert!(compositor.is_settled());
        assert!(matches!(
            compositor.status(TextureRole::Image),
            TextureStatus::Failed(_)
        ));
        assert_eq!(
            compositor.status(TextureRole::Mask),
            &TextureStatus::Loaded {
                width: 2,
                height: 2
            }
        );
    }

    #[test]
    fn colour_change_re_renders_with_new_tint_only() {
        let mut compositor = Compositor::new(RecordingDriver::default(), Tint::WHITE);
        compositor.handle_load(loaded(TextureRole::Image)).unwrap();
        compositor.handle_load(loaded(TextureRole::Mask)).unwrap();

        assert_eq!(
            compositor.apply_color_input("#ff0000").unwrap(),
            Outcome::Rendered
        );
        assert_eq!(
            compositor.apply_color_input("#0000ff").unwrap(),
            Outcome::Rendered
        );

        let frames = &compositor.driver().frames;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].tint.to_rgb8(), [255, 0, 0]);
        assert_eq!(frames[2].tint.to_rgb8(), [0, 0, 255]);
    }

    #[test]
    fn malformed_colour_keeps_previous_tint() {
        let mut compositor = Compositor::new(RecordingDriver::default(), Tint::WHITE);
        compositor.handle_load(loaded(TextureRole::Image)).unwrap();
        compositor.handle_load(loaded(TextureRole::Mask)).unwrap();
        compositor.apply_color_input("#123456").unwrap();

        for bad in ["", "red", "#12345", "#12345g"] {
            assert_eq!(
                compositor.apply_color_input(bad).unwrap(),
                Outcome::Rejected
            );
        }
        assert_eq!(compositor.tint().to_rgb8(), [0x12, 0x34, 0x56]);
        assert_eq!(compositor.driver().frames.len(), 2);
    }

    #[test]
    fn tint_before_load_is_used_by_first_render() {
        let mut compositor = Compositor::new(RecordingDriver::default(), Tint::WHITE);
        assert_eq!(
            compositor.apply_color_input("#00ff00").unwrap(),
            Outcome::Waiting
        );
        compositor.handle_load(loaded(TextureRole::Image)).unwrap();
        compositor.handle_load(loaded(TextureRole::Mask)).unwrap();
        assert_eq!(compositor.driver().frames[0].tint.to_rgb8(), [0, 255, 0]);
    }

    #[test]
    fn redraw_shows_background_until_open() {
        let mut compositor = Compositor::new(RecordingDriver::default(), Tint::WHITE);
        compositor.redraw().unwrap();
        assert_eq!(compositor.driver().backgrounds, 1);

        compositor.handle_load(loaded(TextureRole::Image)).unwrap();
        compositor.handle_load(loaded(TextureRole::Mask)).unwrap();
        assert_eq!(compositor.redraw().unwrap(), Outcome::Rendered);
        assert_eq!(compositor.driver().backgrounds, 1);
    }

    #[test]
    fn duplicate_results_are_ignored() {
        let mut compositor = Compositor::new(RecordingDriver::default(), Tint::WHITE);
        compositor.handle_load(loaded(TextureRole::Image)).unwrap();
        assert_eq!(
            compositor.handle_load(failed(TextureRole::Image)).unwrap(),
            Outcome::Rejected
        );
        assert_eq!(compositor.driver().attached, vec![TextureRole::Image]);
    }
}
