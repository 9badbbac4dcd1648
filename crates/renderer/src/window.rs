use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::compositor::{Compositor, Outcome};
use crate::gpu::SurfaceRenderer;
use crate::loader::{spawn_load, LoadEvent};
use crate::types::{RendererConfig, TextureRole};

/// Messages the window's event loop receives from other threads.
#[derive(Debug)]
pub enum ViewerEvent {
    /// A texture loader finished, successfully or not.
    Load(LoadEvent),
    /// A line of colour-control input, e.g. `#ff8800`.
    ColorInput(String),
    /// Colour-control input reached end of file.
    InputClosed,
}

/// Opens the preview window and runs its event loop until it is closed.
///
/// Texture loads are started before the loop runs; their results come back as
/// [`ViewerEvent::Load`] and are applied on the loop thread, so the gate and
/// the tint are only ever touched from one place.
pub fn run_window(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::<ViewerEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(config.canvas_size.0, config.canvas_size.1);
    let window = WindowBuilder::new()
        .with_title("wallhue")
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let renderer = SurfaceRenderer::new(
        window.as_ref(),
        window.inner_size(),
        config.color_space,
        config.clear_color,
    )
    .map_err(|err| anyhow!("failed to initialise window renderer: {err}"))?;
    let profile = renderer.adapter_profile();
    info!(
        adapter = %profile.name,
        backend = ?profile.backend,
        width = window_size.width,
        height = window_size.height,
        "preview window ready"
    );
    let mut compositor = Compositor::new(renderer, config.tint);

    for role in TextureRole::ALL {
        let proxy = proxy.clone();
        spawn_load(role, config.source(role).clone(), move |event| {
            if proxy.send_event(ViewerEvent::Load(event)).is_err() {
                debug!(%role, "event loop closed before load result was delivered");
            }
        })?;
    }
    let _input = spawn_color_input(proxy)?;

    let mut failure: Option<anyhow::Error> = None;
    let run_result = event_loop.run(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        let step = match event {
            Event::UserEvent(ViewerEvent::Load(load)) => compositor.handle_load(load),
            Event::UserEvent(ViewerEvent::ColorInput(line)) => {
                compositor.apply_color_input(&line)
            }
            Event::UserEvent(ViewerEvent::InputClosed) => {
                debug!("colour input closed; window stays open");
                Ok(Outcome::Waiting)
            }
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                    Ok(Outcome::Waiting)
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key: Key::Named(NamedKey::Escape),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => {
                    elwt.exit();
                    Ok(Outcome::Waiting)
                }
                WindowEvent::Resized(new_size) => {
                    compositor.driver_mut().resize(new_size);
                    window.request_redraw();
                    Ok(Outcome::Waiting)
                }
                WindowEvent::RedrawRequested => compositor.redraw(),
                _ => Ok(Outcome::Waiting),
            },
            _ => Ok(Outcome::Waiting),
        };

        if let Err(err) = step {
            error!(error = %err, "render failed; closing preview");
            failure = Some(err);
            elwt.exit();
        }
    });

    if let Some(err) = failure {
        return Err(err);
    }
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

/// Forwards stdin lines to the event loop as colour-control input.
fn spawn_color_input(proxy: EventLoopProxy<ViewerEvent>) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("wallhue-color-input".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(error = %err, "failed to read colour input");
                        break;
                    }
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if proxy
                    .send_event(ViewerEvent::ColorInput(trimmed.to_string()))
                    .is_err()
                {
                    return;
                }
            }
            let _ = proxy.send_event(ViewerEvent::InputClosed);
        })?;
    Ok(handle)
}
