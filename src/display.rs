/*!
display.rs - Windowed front end (winit + pixels).

Runs the console at ~60 Hz: each redraw renders one frame through the VDP
and presents it scaled into the window. Key transitions are delivered to the
controller as event codes; Escape closes the window.

Key map:

```text
Player 1: Enter, A, S, D, Up, Down, Left, Right
Player 2: Numpad0, Z, X, C, Numpad5, Numpad2, Numpad1, Numpad3
```

in the order Start, A, B, C, Up, Down, Left, Right.
*/

use std::time::{Duration, Instant};

use pixels::{Pixels, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::controller::{Button, Player, event_code};
use crate::error::{Error, Result};
use crate::machine::Machine;
use crate::vdp::{self, HEIGHT, PIXELS, WIDTH};

const SCALE: u32 = 2;

const FRAME_DURATION: Duration = Duration::from_micros(16_639);

/// Controller button bound to `key`, if any.
pub fn map_key(key: KeyCode) -> Option<(Player, Button)> {
    use Button::*;
    use Player::*;
    let mapped = match key {
        KeyCode::Enter => (One, Start),
        KeyCode::KeyA => (One, A),
        KeyCode::KeyS => (One, B),
        KeyCode::KeyD => (One, C),
        KeyCode::ArrowUp => (One, Up),
        KeyCode::ArrowDown => (One, Down),
        KeyCode::ArrowLeft => (One, Left),
        KeyCode::ArrowRight => (One, Right),

        KeyCode::Numpad0 => (Two, Start),
        KeyCode::KeyZ => (Two, A),
        KeyCode::KeyX => (Two, B),
        KeyCode::KeyC => (Two, C),
        KeyCode::Numpad5 => (Two, Up),
        KeyCode::Numpad2 => (Two, Down),
        KeyCode::Numpad1 => (Two, Left),
        KeyCode::Numpad3 => (Two, Right),
        _ => return None,
    };
    Some(mapped)
}

struct App {
    vm: Machine,
    title: String,
    frame: Vec<u32>,
    window: Option<&'static Window>,
    pixels: Option<Pixels<'static>>,
    last_frame_time: Instant,
    error: Option<Error>,
}

impl App {
    fn new(vm: Machine, title: String) -> Self {
        Self {
            vm,
            title,
            frame: vec![0; PIXELS],
            window: None,
            pixels: None,
            last_frame_time: Instant::now(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: Error) {
        log::error!("{e}");
        self.error = Some(e);
        event_loop.exit();
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if let Some((player, button)) = map_key(key) {
            self.vm.press(event_code(player, button, pressed));
        }
    }

    fn update_pixels(&mut self) {
        let Some(pixels) = self.pixels.as_mut() else {
            return;
        };
        vdp::to_rgba(&self.frame, pixels.frame_mut());
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let size = winit::dpi::LogicalSize::new(WIDTH as u32 * SCALE, HEIGHT as u32 * SCALE);
        let attrs = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(size)
            .with_resizable(false);

        let window = match event_loop.create_window(attrs) {
            Ok(w) => w,
            Err(e) => return self.fail(event_loop, Error::Display(e.to_string())),
        };
        let window: &'static Window = Box::leak(Box::new(window));
        let inner = window.inner_size();
        let surface = SurfaceTexture::new(inner.width, inner.height, window);
        match Pixels::new(WIDTH as u32, HEIGHT as u32, surface) {
            Ok(pixels) => self.pixels = Some(pixels),
            Err(e) => return self.fail(event_loop, Error::Display(e.to_string())),
        }
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                let pressed = event.state == ElementState::Pressed;
                if key == KeyCode::Escape && pressed {
                    event_loop.exit();
                    return;
                }
                if !event.repeat {
                    self.handle_key(key, pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                if now.duration_since(self.last_frame_time) >= FRAME_DURATION {
                    self.vm.render(&mut self.frame);
                    self.update_pixels();
                    self.last_frame_time = now;
                }
                if let Some(pixels) = self.pixels.as_ref() {
                    if let Err(e) = pixels.render() {
                        self.fail(event_loop, Error::Display(e.to_string()));
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window {
            window.request_redraw();
        }
    }
}

/// Open a window titled `title` and run `vm` until the window closes.
pub fn run(vm: Machine, title: &str) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|e| Error::Display(e.to_string()))?;
    let mut app = App::new(vm, title.to_string());
    event_loop
        .run_app(&mut app)
        .map_err(|e| Error::Display(e.to_string()))?;
    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_both_pads() {
        assert_eq!(map_key(KeyCode::Enter), Some((Player::One, Button::Start)));
        assert_eq!(map_key(KeyCode::KeyD), Some((Player::One, Button::C)));
        assert_eq!(map_key(KeyCode::Numpad1), Some((Player::Two, Button::Left)));
        assert_eq!(map_key(KeyCode::Escape), None);

        let (p, b) = map_key(KeyCode::Numpad3).unwrap();
        assert_eq!(event_code(p, b, true), 0x8F);
    }
}
