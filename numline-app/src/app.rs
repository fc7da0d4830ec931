use ab_glyph::FontVec;
use anyhow::{Result, anyhow, bail};
use numline_core::{InputSnapshot, Key, Palette, Presenter, Scene, Viewport};
use numline_render::SkiaRenderer;
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::time::Duration;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Window, WindowId},
};

/// Attempts at pumping the event loop before giving up on window creation.
const CREATE_ATTEMPTS: usize = 100;

/// Fullscreen window that renders scenes and collects input for the session.
///
/// The event loop is pumped once per `poll_input`; `present` returns after
/// the frame is queued with vsync, which paces the session loops.
pub struct WindowPresenter {
    event_loop: EventLoop<()>,
    state: WindowState,
}

impl WindowPresenter {
    pub fn new(palette: Palette, font: Option<FontVec>, monitor_width_cm: f64) -> Result<Self> {
        let event_loop = EventLoop::new()?;
        let mut presenter = Self {
            event_loop,
            state: WindowState::new(palette, font, monitor_width_cm),
        };

        for _ in 0..CREATE_ATTEMPTS {
            presenter.pump(Some(Duration::from_millis(10)))?;
            if presenter.state.surface.is_some() {
                return Ok(presenter);
            }
        }
        bail!("window was not created")
    }

    fn pump(&mut self, timeout: Option<Duration>) -> Result<()> {
        let status = self.event_loop.pump_app_events(timeout, &mut self.state);
        if let Some(e) = self.state.error.take() {
            return Err(e);
        }
        if let PumpStatus::Exit(code) = status {
            bail!("event loop exited with code {code}");
        }
        if self.state.close_requested {
            bail!("window closed");
        }
        Ok(())
    }
}

impl Presenter for WindowPresenter {
    fn poll_input(&mut self) -> Result<InputSnapshot> {
        self.pump(Some(Duration::ZERO))?;
        let s = &mut self.state;
        let size = s.size.unwrap_or(PhysicalSize::new(1, 1));
        let viewport = Viewport::new(size.width, size.height, s.monitor_width_cm);
        Ok(InputSnapshot {
            pointer: viewport.to_cm(s.cursor.x, s.cursor.y),
            pointer_down: s.button_down,
            pointer_pressed: std::mem::take(&mut s.button_pressed),
            keys: std::mem::take(&mut s.keys),
        })
    }

    fn present(&mut self, scene: &Scene<'_>) -> Result<()> {
        let surface = self
            .state
            .surface
            .as_mut()
            .ok_or_else(|| anyhow!("no window to present to"))?;
        let stats = surface.renderer.render_frame(scene, surface.pixels.frame_mut())?;
        surface.pixels.render()?;
        tracing::trace!(
            draw_us = stats.draw.as_micros() as u64,
            total_us = stats.total.as_micros() as u64,
            "frame rendered"
        );
        Ok(())
    }

    fn discard_pointer_presses(&mut self) -> Result<()> {
        // Deliver events queued during the pause before dropping their presses.
        self.pump(Some(Duration::ZERO))?;
        self.state.drop_pointer_presses();
        Ok(())
    }
}

struct Surface {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    renderer: SkiaRenderer,
}

struct WindowState {
    palette: Palette,
    font: Option<FontVec>,
    monitor_width_cm: f64,
    surface: Option<Surface>,
    size: Option<PhysicalSize<u32>>,

    cursor: PhysicalPosition<f64>,
    button_down: bool,
    button_pressed: bool,
    keys: Vec<Key>,

    close_requested: bool,
    error: Option<anyhow::Error>,
}

impl WindowState {
    fn new(palette: Palette, font: Option<FontVec>, monitor_width_cm: f64) -> Self {
        Self {
            palette,
            font,
            monitor_width_cm,
            surface: None,
            size: None,
            cursor: PhysicalPosition::new(0.0, 0.0),
            button_down: false,
            button_pressed: false,
            keys: Vec::new(),
            close_requested: false,
            error: None,
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("No monitor available"))?;
        let refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let window_attributes = Window::default_attributes()
            .with_title("Number line")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor))))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let size = window.inner_size();

        tracing::info!(
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            refresh_rate,
            "display configured"
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        let pixels = Pixels::new(size.width, size.height, surface_texture)?;
        let renderer = SkiaRenderer::new(size.width, size.height, self.palette, self.font.take())?;
        if !renderer.has_font() {
            tracing::warn!("no font loaded, text will not be drawn");
        }

        window.set_cursor_visible(true);
        window.request_redraw();

        self.size = Some(size);
        self.surface = Some(Surface {
            window,
            pixels,
            renderer,
        });
        Ok(())
    }

    fn on_left_button(&mut self, state: ElementState) {
        let down = state == ElementState::Pressed;
        if down && !self.button_down {
            self.button_pressed = true;
        }
        self.button_down = down;
    }

    /// Forgets the pending press edge. The held state and keys are kept.
    fn drop_pointer_presses(&mut self) {
        self.button_pressed = false;
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) -> Result<()> {
        if new_size.width == 0 || new_size.height == 0 {
            return Ok(());
        }
        self.size = Some(new_size);
        if let Some(surface) = &mut self.surface {
            surface
                .pixels
                .resize_surface(new_size.width, new_size.height)?;
            surface
                .pixels
                .resize_buffer(new_size.width, new_size.height)?;
            surface.renderer.resize(new_size.width, new_size.height)?;
        }
        tracing::info!(width = new_size.width, height = new_size.height, "display resized");
        Ok(())
    }
}

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::Space => Key::Space,
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Return,
        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        KeyCode::F5 => Key::F5,
        KeyCode::F6 => Key::F6,
        KeyCode::F7 => Key::F7,
        KeyCode::F8 => Key::F8,
        KeyCode::F9 => Key::F9,
        KeyCode::F10 => Key::F10,
        KeyCode::F11 => Key::F11,
        KeyCode::F12 => Key::F12,
        _ => return None,
    })
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.error = Some(e.context("failed to create window and surface"));
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close_requested = true,
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed() && !event.repeat =>
            {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = map_key(code) {
                        self.keys.push(key);
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => self.cursor = position,
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.on_left_button(state),
            WindowEvent::Resized(size) => {
                if let Err(e) = self.handle_resize(size) {
                    self.error = Some(e);
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = self.surface.as_ref().map(|s| s.window.inner_size());
                if let Some(size) = size {
                    if let Err(e) = self.handle_resize(size) {
                        self.error = Some(e);
                    }
                }
            }
            _ => {}
        }
    }
}
