//! Runtime state the event loop in `main.rs` drives: the tower controller
//! bound to the GPU surface, plus whichever camera glide is in flight.

use std::time::{Duration, Instant};

use tower_core::{CameraTween, Controller, Direction, FloorId, RenderSurface};
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    keyboard::{Key, NamedKey},
    window::Window,
};

use super::GpuTower;

struct ActiveGlide {
    tween: CameraTween,
    started: Instant,
}

pub struct ViewerState {
    controller: Controller<GpuTower>,
    glide_duration: Duration,
    glide: Option<ActiveGlide>,
}

impl ViewerState {
    pub fn new(controller: Controller<GpuTower>, glide_duration: Duration) -> Self {
        Self {
            controller,
            glide_duration,
            glide: None,
        }
    }

    pub fn window(&self) -> &Window {
        self.controller.surface().window()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.controller.surface().size()
    }

    pub fn is_animating(&self) -> bool {
        self.glide.is_some()
    }

    /// Swapchain first, then the controller re-derives geometry and re-snaps.
    /// A glide in flight is dropped; the re-snap already lands on its target.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.controller.surface_mut().resize_surface(new_size);
        self.rescale();
    }

    /// Zoom or monitor change: same logical size, different pixel ratio.
    pub fn rescale(&mut self) {
        self.glide = None;
        if let Err(err) = self.controller.on_resize() {
            log::error!("[viewer] resize failed: {err}");
        }
    }

    /// Returns true when the key was consumed.
    pub fn handle_key(&mut self, key: &Key) -> bool {
        let target = match key {
            Key::Named(NamedKey::ArrowUp) | Key::Named(NamedKey::PageUp) => {
                self.controller.neighbor(Direction::Up)
            }
            Key::Named(NamedKey::ArrowDown) | Key::Named(NamedKey::PageDown) => {
                self.controller.neighbor(Direction::Down)
            }
            Key::Named(NamedKey::Home) => self.top_floor(),
            Key::Named(NamedKey::End) => self.bottom_floor(),
            _ => return false,
        };
        if let Some(floor) = target {
            self.move_to(floor);
        }
        true
    }

    fn top_floor(&self) -> Option<FloorId> {
        self.controller.context()?.stack.top()
    }

    fn bottom_floor(&self) -> Option<FloorId> {
        self.controller.context()?.stack.bottom()
    }

    fn move_to(&mut self, floor: FloorId) {
        if self.controller.current_floor() == Some(floor) {
            return;
        }
        if self.glide_duration.is_zero() {
            if let Err(err) = self.controller.snap_to(floor) {
                log::warn!("[viewer] {err}");
            }
            return;
        }
        let on_screen = self
            .glide
            .as_ref()
            .map(|glide| glide.tween.sample(glide.started.elapsed()));
        match self
            .controller
            .glide_from(floor, on_screen, self.glide_duration)
        {
            Ok(tween) => {
                self.glide = Some(ActiveGlide {
                    tween,
                    started: Instant::now(),
                });
                self.window().request_redraw();
            }
            Err(err) => log::warn!("[viewer] {err}"),
        }
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        if let Some(glide) = self.glide.as_ref() {
            let elapsed = glide.started.elapsed();
            let offset = glide.tween.sample(elapsed);
            let finished = glide.tween.is_finished(elapsed);
            self.controller.surface_mut().set_stack_translation(-offset);
            if finished {
                self.glide = None;
            }
        }
        let car_row = self
            .controller
            .context()
            .and_then(|context| context.current_row());
        self.controller.surface_mut().render(car_row)
    }
}
