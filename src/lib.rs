// ============================================================================
// CRATE CONFIGURATION & IMPORTS
// ============================================================================

pub mod adjust;
pub mod assets;
pub mod bus;
pub mod compositor;
pub mod config;
pub mod graphics;
pub mod instrument;
pub mod instruments;
pub mod knobs;
pub mod overlay;
pub mod panel;
pub mod selector;

// External crate imports
use anyhow::Result;
use log::{info, warn};
use pixels::{Pixels, SurfaceTexture};

// Standard library imports
use std::time::{Duration, Instant};

// Window management imports
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

// ============================================================================
// PUBLIC API - RE-EXPORTS
// ============================================================================

pub use bus::{SimulatedBus, VariableBus};
pub use config::{Color, PanelConfig, Placement};
pub use graphics::Surface;
pub use instrument::Instrument;
pub use knobs::{KnobInput, VirtualKnobs};
pub use overlay::StatusOverlay;
pub use panel::Panel;

// ============================================================================
// KEYBOARD STAND-INS FOR THE HARDWARE KNOBS
// ============================================================================

/// What a key does on the desktop, where there are no encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Turn the encoder wired to `pin` by raw ticks.
    Turn { pin: u8, ticks: i32 },
    /// Hold the push button on `pin` while the key is down.
    Push { pin: u8 },
    FocusNext,
    /// Move or resize the focused gauge.
    Nudge { dx: i32, dy: i32, dsize: i32 },
    ToggleLink,
}

const DETENT: i32 = config::DETENT_TICKS;
const NUDGE: i32 = 10;

pub fn key_action(code: KeyCode) -> Option<KeyAction> {
    use KeyAction::*;
    let action = match code {
        // Nav select and adjust knobs and their pushes
        KeyCode::KeyQ => Turn { pin: 8, ticks: DETENT },
        KeyCode::KeyA => Turn { pin: 8, ticks: -DETENT },
        KeyCode::KeyW => Turn { pin: 20, ticks: DETENT },
        KeyCode::KeyS => Turn { pin: 20, ticks: -DETENT },
        KeyCode::KeyE => Push { pin: 12 },
        KeyCode::KeyD => Push { pin: 16 },
        // Heading bug
        KeyCode::KeyZ => Turn { pin: 2, ticks: -DETENT },
        KeyCode::KeyX => Turn { pin: 2, ticks: DETENT },
        // OBS
        KeyCode::KeyC => Turn { pin: 11, ticks: -DETENT },
        KeyCode::KeyV => Turn { pin: 11, ticks: DETENT },
        // Trim wheel and flaps lever
        KeyCode::KeyT => Turn { pin: 14, ticks: -1 },
        KeyCode::KeyG => Turn { pin: 14, ticks: 1 },
        KeyCode::KeyR => Turn { pin: 18, ticks: -8 },
        KeyCode::KeyF => Turn { pin: 18, ticks: 8 },

        KeyCode::Tab => FocusNext,
        KeyCode::ArrowLeft => Nudge { dx: -NUDGE, dy: 0, dsize: 0 },
        KeyCode::ArrowRight => Nudge { dx: NUDGE, dy: 0, dsize: 0 },
        KeyCode::ArrowUp => Nudge { dx: 0, dy: -NUDGE, dsize: 0 },
        KeyCode::ArrowDown => Nudge { dx: 0, dy: NUDGE, dsize: 0 },
        KeyCode::Equal | KeyCode::NumpadAdd => Nudge { dx: 0, dy: 0, dsize: NUDGE },
        KeyCode::Minus | KeyCode::NumpadSubtract => Nudge { dx: 0, dy: 0, dsize: -NUDGE },
        KeyCode::KeyL => ToggleLink,
        _ => return None,
    };
    Some(action)
}

fn apply_key(
    action: KeyAction,
    state: ElementState,
    repeat: bool,
    panel: &mut Panel,
    bus: &mut SimulatedBus,
    knobs: Option<&mut VirtualKnobs>,
) {
    let pressed = state == ElementState::Pressed;
    match action {
        KeyAction::Push { pin } => {
            if repeat {
                return;
            }
            if let Some(knobs) = knobs {
                if let Some(handle) = knobs.find(pin) {
                    if pressed {
                        knobs.press(handle);
                    } else {
                        knobs.release(handle);
                    }
                }
            }
        }
        _ if !pressed => {}
        KeyAction::Turn { pin, ticks } => {
            if let Some(knobs) = knobs {
                if let Some(handle) = knobs.find(pin) {
                    knobs.turn(handle, ticks);
                }
            }
        }
        KeyAction::FocusNext => panel.focus_next(),
        KeyAction::Nudge { dx, dy, dsize } => panel.nudge_focused(dx, dy, dsize),
        KeyAction::ToggleLink => {
            let up = !bus.link_up();
            info!("simulator link {}", if up { "restored" } else { "dropped" });
            bus.set_link(up);
        }
    }
}

// ============================================================================
// WINDOW LOOP
// ============================================================================

/// Open the panel window and drive it until closed.
///
/// The frame buffer is kept at the panel's logical size and scaled to the
/// window by `pixels`, so gauge placements are always in logical pixels.
pub fn run_window(
    title: &str,
    mut panel: Panel,
    mut bus: SimulatedBus,
    mut knobs: Option<VirtualKnobs>,
) -> Result<()> {
    let logical_width = panel.config().window_width;
    let logical_height = panel.config().window_height;

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title(title)
        .with_inner_size(LogicalSize::new(
            logical_width as f64,
            logical_height as f64,
        ))
        .with_resizable(false)
        .build(&event_loop)?;

    let window = std::sync::Arc::new(window);
    let window_clone = window.clone();

    let size = window.inner_size();
    let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
    let mut pixels = Pixels::new(logical_width as u32, logical_height as u32, surface_texture)?;
    let mut frame = Surface::new(logical_width, logical_height);

    let target_fps = panel.config().max_framerate.max(1.0);
    let frame_duration = Duration::from_secs_f64(1.0 / target_fps);
    let mut last_frame = Instant::now();

    info!(
        "panel {}x{} at {} fps, {} gauges",
        logical_width,
        logical_height,
        target_fps,
        panel.instruments().len()
    );

    event_loop.run(move |event, window_target| {
        window_target.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                        warn!("failed to resize surface: {}", e);
                    }
                }
                WindowEvent::Focused(focused) => {
                    panel.set_active(focused);
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(code),
                            state,
                            repeat,
                            ..
                        },
                    ..
                } => {
                    if let Some(action) = key_action(code) {
                        apply_key(action, state, repeat, &mut panel, &mut bus, knobs.as_mut());
                    }
                }
                WindowEvent::RedrawRequested => {
                    let input = knobs.as_mut().map(|k| k as &mut dyn KnobInput);
                    panel.tick(&mut bus, input, &mut frame, Instant::now());

                    let target = pixels.frame_mut();
                    if target.len() == frame.data().len() {
                        target.copy_from_slice(frame.data());
                    }
                    if let Err(e) = pixels.render() {
                        warn!("render failed: {}", e);
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                if last_frame.elapsed() >= frame_duration {
                    window_clone.request_redraw();
                    last_frame = Instant::now();
                }
            }
            _ => {}
        }
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knob_keys_come_in_opposing_pairs() {
        let pairs = [
            (KeyCode::KeyQ, KeyCode::KeyA),
            (KeyCode::KeyW, KeyCode::KeyS),
            (KeyCode::KeyX, KeyCode::KeyZ),
            (KeyCode::KeyV, KeyCode::KeyC),
            (KeyCode::KeyG, KeyCode::KeyT),
            (KeyCode::KeyF, KeyCode::KeyR),
        ];
        for (up, down) in pairs {
            match (key_action(up), key_action(down)) {
                (
                    Some(KeyAction::Turn { pin: a, ticks: ta }),
                    Some(KeyAction::Turn { pin: b, ticks: tb }),
                ) => {
                    assert_eq!(a, b);
                    assert_eq!(ta, -tb);
                }
                other => panic!("{:?}/{:?} mapped to {:?}", up, down, other),
            }
        }
    }

    #[test]
    fn unbound_keys_do_nothing() {
        assert_eq!(key_action(KeyCode::KeyY), None);
        assert_eq!(key_action(KeyCode::Escape), None);
    }

    #[test]
    fn push_key_holds_button_until_release() {
        let mut bus = SimulatedBus::still();
        let mut knobs = VirtualKnobs::new();
        let handle = knobs.add(crate::knobs::KnobPins::button(12));
        let mut panel = Panel::new(PanelConfig::default(), Vec::new());

        let action = KeyAction::Push { pin: 12 };
        apply_key(action, ElementState::Pressed, false, &mut panel, &mut bus, Some(&mut knobs));
        assert_eq!(knobs.read(handle), Some(1));
        apply_key(action, ElementState::Pressed, true, &mut panel, &mut bus, Some(&mut knobs));
        assert_eq!(knobs.read(handle), None);
        apply_key(action, ElementState::Released, false, &mut panel, &mut bus, Some(&mut knobs));
        assert_eq!(knobs.read(handle), Some(2));
    }

    #[test]
    fn link_key_toggles_connectivity() {
        let mut bus = SimulatedBus::still();
        let mut panel = Panel::new(PanelConfig::default(), Vec::new());
        assert!(bus.update());
        apply_key(KeyAction::ToggleLink, ElementState::Pressed, false, &mut panel, &mut bus, None);
        assert!(!bus.update());
        apply_key(KeyAction::ToggleLink, ElementState::Released, false, &mut panel, &mut bus, None);
        assert!(!bus.update());
        apply_key(KeyAction::ToggleLink, ElementState::Pressed, false, &mut panel, &mut bus, None);
        assert!(bus.update());
    }
}
