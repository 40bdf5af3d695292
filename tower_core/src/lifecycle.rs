//! Startup and resize sequencing.
//!
//! The controller owns the surface and, once configuration has loaded, a
//! [`TowerContext`] holding the stack, car and camera. Everything runs on the
//! caller's thread; the only await point is the configuration load.

use std::time::Duration;

use crate::{
    FloorId,
    camera::{Camera, CameraTween, middle_slot},
    car::{CarState, Direction},
    config::{self, Config, ConfigSource},
    error::TowerError,
    metrics::{FrameMetrics, ViewportMetrics},
    stack::FloorStack,
    surface::{RenderSurface, ViewportStyle},
};

pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
    Resizing,
    Failed,
}

/// All session state, owned by the controller.
#[derive(Debug)]
pub struct TowerContext<N> {
    pub config: Config,
    pub metrics: ViewportMetrics,
    pub stack: FloorStack<N>,
    pub car: CarState,
    pub camera: Camera,
}

impl<N> TowerContext<N> {
    /// Row of the car's floor counted from the top of the stack.
    pub fn current_row(&self) -> Option<usize> {
        self.car
            .current_floor
            .and_then(|floor| self.stack.index_of(floor))
    }
}

pub struct Controller<S: RenderSurface> {
    surface: S,
    phase: Phase,
    context: Option<TowerContext<S::Node>>,
}

impl<S: RenderSurface> Controller<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            phase: Phase::Uninitialized,
            context: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn context(&self) -> Option<&TowerContext<S::Node>> {
        self.context.as_ref()
    }

    pub fn current_floor(&self) -> Option<FloorId> {
        self.context.as_ref()?.car.current_floor
    }

    pub fn world_offset(&self) -> f64 {
        self.context
            .as_ref()
            .map(|context| context.camera.world_offset())
            .unwrap_or(0.0)
    }

    /// Load configuration and bring the tower up. Calling it again restarts
    /// the session from scratch.
    pub async fn start(
        &mut self,
        source: &ConfigSource,
        timeout: Duration,
    ) -> Result<(), TowerError> {
        self.phase = Phase::Loading;
        log::info!("[lifecycle] loading configuration from {}", source.name());
        match config::load_with_timeout(source, timeout).await {
            Ok(config) => self.start_with_config(config),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Bring the tower up from an already loaded configuration.
    pub fn start_with_config(&mut self, config: Config) -> Result<(), TowerError> {
        self.phase = Phase::Loading;
        self.context = None;

        let metrics = ViewportMetrics::new(&config.viewport);
        let frame = metrics.snapshot(&self.surface);
        apply_viewport_style(&mut self.surface, &frame, config.viewport.car_width);

        let stack = FloorStack::build(&config.floors, &mut self.surface);
        let mut car = CarState::new(config.elevator.capacity);
        car.current_floor = initial_floor(stack.ordered_ids(), metrics.visible_floor_count());

        let mut camera = Camera::default();
        if let Err(err) = camera.apply_target(car.current_floor, &stack, &frame, &mut self.surface) {
            return Err(self.fail(err));
        }

        log::info!(
            "[lifecycle] ready: {} floors, visible {}, floor height {}px ({:?}), start floor {:?}",
            stack.len(),
            metrics.visible_floor_count(),
            frame.floor_height,
            metrics.mode(),
            car.current_floor
        );

        self.context = Some(TowerContext {
            config,
            metrics,
            stack,
            car,
            camera,
        });
        self.phase = Phase::Ready;
        Ok(())
    }

    fn fail(&mut self, err: TowerError) -> TowerError {
        log::error!("[lifecycle] startup failed: {err}");
        self.phase = Phase::Failed;
        self.context = None;
        err
    }

    /// Re-derive geometry after the host viewport changed and re-snap the
    /// camera to the current floor. The stack is not rebuilt.
    pub fn on_resize(&mut self) -> Result<(), TowerError> {
        if self.phase != Phase::Ready {
            log::debug!("[lifecycle] resize ignored in phase {:?}", self.phase);
            return Ok(());
        }
        let Some(context) = self.context.as_mut() else {
            return Ok(());
        };
        self.phase = Phase::Resizing;

        let frame = context.metrics.snapshot(&self.surface);
        apply_viewport_style(&mut self.surface, &frame, context.config.viewport.car_width);
        let result = context.camera.apply_target(
            context.car.current_floor,
            &context.stack,
            &frame,
            &mut self.surface,
        );

        self.phase = Phase::Ready;
        result.map(|_| ())
    }

    /// Move the car to `floor_id` and snap the camera there.
    ///
    /// Unknown floors leave the car and camera where they were. Before startup
    /// has finished there is no stack, so every floor is unknown.
    pub fn snap_to(&mut self, floor_id: FloorId) -> Result<f64, TowerError> {
        let context = self
            .context
            .as_mut()
            .ok_or(TowerError::UnknownFloor(floor_id))?;
        let frame = context.metrics.snapshot(&self.surface);
        let offset = context
            .camera
            .apply(floor_id, &context.stack, &frame, &mut self.surface)?;
        update_car(&mut context.car, floor_id, &context.stack);
        Ok(offset)
    }

    /// Same as [`Controller::snap_to`] but returns a tween for the host to play.
    pub fn glide_to(
        &mut self,
        floor_id: FloorId,
        duration: Duration,
    ) -> Result<CameraTween, TowerError> {
        self.glide_from(floor_id, None, duration)
    }

    /// Like [`Controller::glide_to`], starting from `on_screen`, the offset a
    /// glide still in flight is currently showing.
    pub fn glide_from(
        &mut self,
        floor_id: FloorId,
        on_screen: Option<f64>,
        duration: Duration,
    ) -> Result<CameraTween, TowerError> {
        let context = self
            .context
            .as_mut()
            .ok_or(TowerError::UnknownFloor(floor_id))?;
        let frame = context.metrics.snapshot(&self.surface);
        let tween =
            context
                .camera
                .tween_to(floor_id, on_screen, &context.stack, &frame, duration)?;
        update_car(&mut context.car, floor_id, &context.stack);
        Ok(tween)
    }

    /// Adjacent floor in `direction`, or `None` at either end of the stack.
    pub fn neighbor(&self, direction: Direction) -> Option<FloorId> {
        let context = self.context.as_ref()?;
        let current = context.car.current_floor?;
        context.stack.neighbor(current, direction)
    }

    /// Snap one floor up or down. Returns the new floor, or `None` when already
    /// at the end of the stack.
    pub fn step(&mut self, direction: Direction) -> Result<Option<FloorId>, TowerError> {
        let Some(next) = self.neighbor(direction) else {
            return Ok(None);
        };
        self.snap_to(next)?;
        Ok(Some(next))
    }

    /// Current frame geometry, when the tower is up.
    pub fn frame(&self) -> Option<FrameMetrics> {
        let context = self.context.as_ref()?;
        Some(context.metrics.snapshot(&self.surface))
    }
}

fn apply_viewport_style<S: RenderSurface + ?Sized>(
    surface: &mut S,
    frame: &FrameMetrics,
    car_width: f64,
) {
    surface.apply_style(ViewportStyle {
        viewport_height: frame.round(frame.viewport_height),
        floor_height: frame.floor_height,
        car_width,
    });
}

fn update_car<N>(car: &mut CarState, floor_id: FloorId, stack: &FloorStack<N>) {
    if let (Some(from), Some(to)) = (
        car.current_floor.and_then(|floor| stack.index_of(floor)),
        stack.index_of(floor_id),
    ) {
        if to < from {
            car.direction = Direction::Up;
        } else if to > from {
            car.direction = Direction::Down;
        }
    }
    car.current_floor = Some(floor_id);
}

/// Floor shown at startup: the one sitting in the middle slot. A stack that
/// ends exactly at the slot falls back to its bottom floor; a shorter one
/// starts at the top.
pub fn initial_floor(ordered_ids: &[FloorId], visible_floor_count: u32) -> Option<FloorId> {
    let slot = middle_slot(visible_floor_count);
    ordered_ids
        .get(slot)
        .or_else(|| {
            if ordered_ids.len() < slot {
                ordered_ids.first()
            } else {
                ordered_ids.last()
            }
        })
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_floor_prefers_middle_slot() {
        assert_eq!(initial_floor(&[5, 4, 3, 2, 1], 5), Some(3));
        assert_eq!(initial_floor(&[3, 2, 1], 5), Some(1));
        assert_eq!(initial_floor(&[9], 5), Some(9));
        assert_eq!(initial_floor(&[], 5), None);
        assert_eq!(initial_floor(&[3, 2, 1], 1), Some(3));
    }

    #[test]
    fn stack_ending_at_middle_slot_starts_at_bottom() {
        // slot 2, two floors
        assert_eq!(initial_floor(&[2, 1], 5), Some(1));
        // slot 3, three floors
        assert_eq!(initial_floor(&[3, 2, 1], 7), Some(1));
        // slot 5, five floors
        assert_eq!(initial_floor(&[5, 4, 3, 2, 1], 11), Some(1));
    }

    #[test]
    fn stack_shorter_than_middle_slot_starts_at_top() {
        // slot 3, two floors
        assert_eq!(initial_floor(&[2, 1], 7), Some(2));
        // slot 5, three floors
        assert_eq!(initial_floor(&[8, 6, 4], 11), Some(8));
    }
}
