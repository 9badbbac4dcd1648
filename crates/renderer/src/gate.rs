use tracing::info;

use crate::compositor::{FrameState, RenderDriver};
use crate::types::TextureRole;

/// Joins the two texture completion tokens.
///
/// Each token flips to set once and never resets. The gate is open when both
/// tokens are set; from then on every [`LoadGate::check_and_render`] call
/// renders.
#[derive(Debug, Default, Clone)]
pub struct LoadGate {
    tokens: [bool; 2],
}

impl LoadGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records completion for `role`. Returns `true` when this call opened
    /// the gate.
    pub fn mark_loaded(&mut self, role: TextureRole) -> bool {
        let was_open = self.is_open();
        let slot = &mut self.tokens[role.index()];
        if *slot {
            return false;
        }
        *slot = true;

        let opened = !was_open && self.is_open();
        if opened {
            info!("both textures loaded; render gate open");
        }
        opened
    }

    pub fn is_open(&self) -> bool {
        self.tokens.iter().all(|token| *token)
    }

    /// Renders through `driver` if both tokens are set. Returns whether a
    /// render was issued.
    pub fn check_and_render<D>(&self, driver: &mut D, frame: &FrameState) -> anyhow::Result<bool>
    where
        D: RenderDriver + ?Sized,
    {
        if !self.is_open() {
            return Ok(false);
        }
        driver.render(frame)?;
        Ok(true)
    }
}
