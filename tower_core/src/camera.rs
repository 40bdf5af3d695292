//! Camera math: where the floor stack has to sit so a target floor lands in
//! the middle row of the viewport, and how that offset reaches the surface.

use std::time::Duration;

use crate::{
    FloorId,
    error::TowerError,
    metrics::{FrameMetrics, round_to_device_pixel},
    stack::FloorStack,
    surface::RenderSurface,
};

/// Viewport row (from the top) a targeted floor is placed in when unclamped.
pub fn middle_slot(visible_floor_count: u32) -> usize {
    (visible_floor_count / 2) as usize
}

/// Largest offset that still keeps the bottom floor at the bottom edge.
pub fn max_offset(stack_len: usize, frame: &FrameMetrics) -> f64 {
    let overflow = stack_len as f64 - f64::from(frame.visible_floor_count);
    (overflow * frame.floor_height).max(0.0)
}

/// Offset before clamping. Non-decreasing as the index moves down the stack.
pub fn desired_offset(index: usize, frame: &FrameMetrics) -> f64 {
    let slot = middle_slot(frame.visible_floor_count);
    (index as f64 - slot as f64) * frame.floor_height
}

/// Pixel offset that puts `floor_id` in the middle slot, clamped to the stack.
pub fn offset_for_floor(
    floor_id: FloorId,
    ordered_ids: &[FloorId],
    frame: &FrameMetrics,
) -> Result<f64, TowerError> {
    let index = ordered_ids
        .iter()
        .position(|&id| id == floor_id)
        .ok_or(TowerError::UnknownFloor(floor_id))?;
    let desired = desired_offset(index, frame);
    Ok(desired.clamp(0.0, max_offset(ordered_ids.len(), frame)))
}

/// World offset plus the last translation written to the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    world_offset: f64,
    translation: f64,
}

impl Camera {
    pub fn world_offset(&self) -> f64 {
        self.world_offset
    }

    /// Last translation handed to the surface (negative moves the stack up).
    pub fn translation(&self) -> f64 {
        self.translation
    }

    /// Snap instantly to `floor_id`. Returns the new world offset.
    pub fn apply<N, S>(
        &mut self,
        floor_id: FloorId,
        stack: &FloorStack<N>,
        frame: &FrameMetrics,
        surface: &mut S,
    ) -> Result<f64, TowerError>
    where
        S: RenderSurface + ?Sized,
    {
        let offset = offset_for_floor(floor_id, stack.ordered_ids(), frame)?;
        self.world_offset = offset;
        self.write(frame, surface);
        log::debug!(
            "[camera] snap floor={} offset={} translate={}",
            floor_id,
            offset,
            self.translation
        );
        Ok(offset)
    }

    /// Position for an optional target. No target (empty stack) rests at zero.
    pub fn apply_target<N, S>(
        &mut self,
        target: Option<FloorId>,
        stack: &FloorStack<N>,
        frame: &FrameMetrics,
        surface: &mut S,
    ) -> Result<f64, TowerError>
    where
        S: RenderSurface + ?Sized,
    {
        match target {
            Some(floor_id) => self.apply(floor_id, stack, frame, surface),
            None => {
                self.world_offset = 0.0;
                self.write(frame, surface);
                Ok(0.0)
            }
        }
    }

    fn write<S: RenderSurface + ?Sized>(&mut self, frame: &FrameMetrics, surface: &mut S) {
        // 0.0 - x keeps a resting camera at +0 instead of -0.
        self.translation = 0.0 - frame.round(self.world_offset);
        surface.set_stack_translation(self.translation);
    }

    /// Start an animated move to `floor_id`.
    ///
    /// `from` is the offset currently on screen; `None` starts from the last
    /// committed translation. The world offset jumps to the destination
    /// immediately; the returned tween only drives intermediate translations.
    pub fn tween_to<N>(
        &mut self,
        floor_id: FloorId,
        from: Option<f64>,
        stack: &FloorStack<N>,
        frame: &FrameMetrics,
        duration: Duration,
    ) -> Result<CameraTween, TowerError> {
        let offset = offset_for_floor(floor_id, stack.ordered_ids(), frame)?;
        let from = from.unwrap_or(-self.translation);
        self.world_offset = offset;
        let tween = CameraTween::new(from, offset, duration, frame.device_pixel_ratio);
        self.translation = 0.0 - tween.target();
        Ok(tween)
    }
}

/// Eased camera move (cubic ease-out) that lands on the same rounded offset
/// an instant snap would.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTween {
    from: f64,
    to: f64,
    duration: Duration,
    device_pixel_ratio: f64,
}

impl CameraTween {
    pub fn new(from: f64, to: f64, duration: Duration, device_pixel_ratio: f64) -> Self {
        Self {
            from,
            to,
            duration,
            device_pixel_ratio,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Rounded offset the tween ends on.
    pub fn target(&self) -> f64 {
        round_to_device_pixel(self.to, self.device_pixel_ratio)
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    /// Offset (positive, pixels) at `elapsed`, snapped to a device pixel.
    pub fn sample(&self, elapsed: Duration) -> f64 {
        if self.is_finished(elapsed) {
            return self.target();
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let eased = 1.0 - (1.0 - t).powi(3);
        let value = self.from + (self.to - self.from) * eased;
        round_to_device_pixel(value, self.device_pixel_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::FloorConfig, surface::RecordingSurface};

    fn frame(visible: u32, floor_height: f64, ratio: f64) -> FrameMetrics {
        FrameMetrics {
            viewport_height: f64::from(visible) * floor_height,
            floor_height,
            device_pixel_ratio: ratio,
            visible_floor_count: visible,
        }
    }

    fn stack(count: i64, surface: &mut RecordingSurface) -> FloorStack<usize> {
        let floors: Vec<FloorConfig> = (1..=count)
            .map(|id| FloorConfig {
                id,
                background: None,
            })
            .collect();
        FloorStack::build(&floors, surface)
    }

    #[test]
    fn middle_slot_is_half_rounded_down() {
        assert_eq!(middle_slot(1), 0);
        assert_eq!(middle_slot(3), 1);
        assert_eq!(middle_slot(4), 2);
        assert_eq!(middle_slot(5), 2);
    }

    #[test]
    fn stack_that_fits_never_moves() {
        let ids = [5, 4, 3, 2, 1];
        let frame = frame(5, 120.0, 1.0);
        assert_eq!(offset_for_floor(3, &ids, &frame).unwrap(), 0.0);
        assert_eq!(offset_for_floor(1, &ids, &frame).unwrap(), 0.0);
        assert_eq!(max_offset(ids.len(), &frame), 0.0);
    }

    #[test]
    fn tall_stack_pins_to_the_end() {
        let ids: Vec<FloorId> = (1..=10).rev().collect();
        let frame = frame(5, 120.0, 1.0);
        // index 7 is floor 3
        assert_eq!(offset_for_floor(3, &ids, &frame).unwrap(), 600.0);
        assert_eq!(max_offset(ids.len(), &frame), 600.0);
        // index 4 is floor 6: unclamped, lands in slot 2
        assert_eq!(offset_for_floor(6, &ids, &frame).unwrap(), 240.0);
    }

    #[test]
    fn top_and_bottom_clamp() {
        let frame = frame(5, 120.0, 1.0);
        for count in 1..=20 {
            let ids: Vec<FloorId> = (1..=count).rev().collect();
            let max = max_offset(ids.len(), &frame);
            assert_eq!(offset_for_floor(count, &ids, &frame).unwrap(), 0.0);
            assert_eq!(offset_for_floor(1, &ids, &frame).unwrap(), max);
        }
    }

    #[test]
    fn offsets_stay_in_range_and_are_monotonic() {
        for visible in 1..=7 {
            let frame = frame(visible, 97.0, 1.0);
            for count in 0..=15 {
                let ids: Vec<FloorId> = (1..=count).rev().collect();
                let max = max_offset(ids.len(), &frame);
                let mut previous_desired = f64::NEG_INFINITY;
                for (index, &id) in ids.iter().enumerate() {
                    let offset = offset_for_floor(id, &ids, &frame).unwrap();
                    assert!((0.0..=max).contains(&offset));
                    let desired = desired_offset(index, &frame);
                    assert!(desired >= previous_desired);
                    previous_desired = desired;
                }
            }
        }
    }

    #[test]
    fn unknown_floor_fails_fast() {
        let frame = frame(5, 120.0, 1.0);
        let err = offset_for_floor(42, &[3, 2, 1], &frame).unwrap_err();
        assert!(matches!(err, TowerError::UnknownFloor(42)));
        assert!(!err.is_fatal());
        assert!(matches!(
            offset_for_floor(1, &[], &frame),
            Err(TowerError::UnknownFloor(1))
        ));
    }

    #[test]
    fn apply_writes_rounded_translation_and_is_idempotent() {
        let mut surface = RecordingSurface::new(0.0, 1.5);
        let stack = stack(10, &mut surface);
        let frame = frame(5, 100.3, 1.5);
        let mut camera = Camera::default();

        let first = camera.apply(4, &stack, &frame, &mut surface).unwrap();
        let first_translation = surface.translation();
        let second = camera.apply(4, &stack, &frame, &mut surface).unwrap();

        // floor 4 sits at index 6: (6 - 2) * 100.3
        assert!((first - 401.2).abs() < 1e-9);
        assert_eq!(first, second);
        assert_eq!(first_translation, surface.translation());
        assert_eq!(surface.translation(), -round_to_device_pixel(401.2, 1.5));
        assert_eq!(camera.translation(), surface.translation());
    }

    #[test]
    fn unknown_floor_leaves_camera_untouched() {
        let mut surface = RecordingSurface::new(0.0, 1.0);
        let stack = stack(10, &mut surface);
        let frame = frame(5, 120.0, 1.0);
        let mut camera = Camera::default();
        camera.apply(2, &stack, &frame, &mut surface).unwrap();
        let before = camera;

        assert!(camera.apply(99, &stack, &frame, &mut surface).is_err());
        assert_eq!(camera, before);
    }

    #[test]
    fn empty_target_rests_at_zero() {
        let mut surface = RecordingSurface::new(600.0, 2.0);
        let stack = stack(0, &mut surface);
        let frame = frame(5, 120.0, 2.0);
        let mut camera = Camera::default();
        assert_eq!(camera.apply_target(None, &stack, &frame, &mut surface).unwrap(), 0.0);
        assert_eq!(surface.translation(), 0.0);
        assert!(surface.translation().is_sign_positive());
    }

    #[test]
    fn tween_converges_on_snapped_offset() {
        let mut surface = RecordingSurface::new(0.0, 1.25);
        let stack = stack(12, &mut surface);
        let frame = frame(5, 111.1, 1.25);
        let mut camera = Camera::default();
        camera.apply(12, &stack, &frame, &mut surface).unwrap();

        let tween = camera
            .tween_to(1, None, &stack, &frame, Duration::from_millis(400))
            .unwrap();
        let snapped = offset_for_floor(1, stack.ordered_ids(), &frame).unwrap();
        assert_eq!(tween.sample(Duration::ZERO), 0.0);
        assert_eq!(tween.sample(Duration::from_millis(400)), frame.round(snapped));
        assert_eq!(tween.sample(Duration::from_secs(5)), frame.round(snapped));
        assert_eq!(camera.world_offset(), snapped);
        assert_eq!(camera.translation(), -frame.round(snapped));

        let mut previous = 0.0;
        for ms in (0..=400).step_by(20) {
            let value = tween.sample(Duration::from_millis(ms));
            assert!(value >= previous);
            assert_eq!(value, frame.round(value));
            previous = value;
        }
    }

    #[test]
    fn retargeted_tween_starts_from_on_screen_offset() {
        let mut surface = RecordingSurface::new(0.0, 1.0);
        let stack = stack(10, &mut surface);
        let frame = frame(5, 120.0, 1.0);
        let mut camera = Camera::default();
        camera.apply(10, &stack, &frame, &mut surface).unwrap();

        let first = camera
            .tween_to(1, None, &stack, &frame, Duration::from_millis(400))
            .unwrap();
        let on_screen = first.sample(Duration::from_millis(100));
        assert!(on_screen > 0.0 && on_screen < first.target());

        let second = camera
            .tween_to(5, Some(on_screen), &stack, &frame, Duration::from_millis(400))
            .unwrap();
        assert_eq!(second.sample(Duration::ZERO), on_screen);
        assert_eq!(second.target(), 360.0);
        assert_eq!(camera.world_offset(), 360.0);
        assert_eq!(camera.translation(), -360.0);
    }

    #[test]
    fn apply_and_tween_agree_with_offset_for_floor() {
        let mut surface = RecordingSurface::new(0.0, 1.5);
        let stack = stack(9, &mut surface);
        let frame = frame(3, 87.3, 1.5);
        for &id in stack.ordered_ids() {
            let expected = offset_for_floor(id, stack.ordered_ids(), &frame).unwrap();
            let mut snapped = Camera::default();
            assert_eq!(snapped.apply(id, &stack, &frame, &mut surface).unwrap(), expected);
            let mut glided = Camera::default();
            glided
                .tween_to(id, None, &stack, &frame, Duration::from_millis(50))
                .unwrap();
            assert_eq!(glided.world_offset(), expected);
        }
    }

    #[test]
    fn zero_length_tween_is_a_snap() {
        let tween = CameraTween::new(0.0, 333.3, Duration::ZERO, 2.0);
        assert!(tween.is_finished(Duration::ZERO));
        assert_eq!(tween.sample(Duration::ZERO), 333.5);
    }
}
