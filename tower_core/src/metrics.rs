//! Per-frame viewport geometry.
//!
//! Nothing in here is cached: every read goes back to the surface so values
//! taken after a resize always reflect the new window.

use crate::{config::ViewportConfig, surface::RenderSurface};

/// How the height of one floor is obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloorHeightMode {
    /// `floor(viewport_height / visible_floor_count)`.
    Derived,
    /// Fixed height from configuration, in logical pixels.
    Configured(f64),
}

/// Geometry captured for a single camera computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMetrics {
    pub viewport_height: f64,
    pub floor_height: f64,
    pub device_pixel_ratio: f64,
    pub visible_floor_count: u32,
}

impl FrameMetrics {
    pub fn round(&self, value: f64) -> f64 {
        round_to_device_pixel(value, self.device_pixel_ratio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    mode: FloorHeightMode,
    visible_floor_count: u32,
}

impl ViewportMetrics {
    pub fn new(viewport: &ViewportConfig) -> Self {
        Self {
            mode: viewport.floor_height_mode(),
            visible_floor_count: viewport.visible_floor_count.max(1),
        }
    }

    pub fn mode(&self) -> FloorHeightMode {
        self.mode
    }

    pub fn visible_floor_count(&self) -> u32 {
        self.visible_floor_count
    }

    pub fn viewport_height<S: RenderSurface + ?Sized>(&self, surface: &S) -> f64 {
        let height = surface.viewport_height();
        if height.is_finite() { height.max(0.0) } else { 0.0 }
    }

    pub fn device_pixel_ratio<S: RenderSurface + ?Sized>(&self, surface: &S) -> f64 {
        normalize_ratio(surface.device_pixel_ratio())
    }

    pub fn floor_height<S: RenderSurface + ?Sized>(&self, surface: &S) -> f64 {
        match self.mode {
            FloorHeightMode::Derived => {
                (self.viewport_height(surface) / f64::from(self.visible_floor_count)).floor()
            }
            FloorHeightMode::Configured(height) => height,
        }
    }

    pub fn snapshot<S: RenderSurface + ?Sized>(&self, surface: &S) -> FrameMetrics {
        FrameMetrics {
            viewport_height: self.viewport_height(surface),
            floor_height: self.floor_height(surface),
            device_pixel_ratio: self.device_pixel_ratio(surface),
            visible_floor_count: self.visible_floor_count,
        }
    }
}

/// Snap a logical pixel value to the nearest physical pixel.
///
/// Must be applied to everything written to the stack transform and to the
/// viewport height before it goes back into styling, otherwise seams show up
/// between adjacent floors at fractional ratios.
pub fn round_to_device_pixel(value: f64, device_pixel_ratio: f64) -> f64 {
    let ratio = normalize_ratio(device_pixel_ratio);
    (value * ratio).round() / ratio
}

fn normalize_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;

    fn derived(visible: u32) -> ViewportMetrics {
        ViewportMetrics::new(&ViewportConfig {
            visible_floor_count: visible,
            ..ViewportConfig::default()
        })
    }

    #[test]
    fn derived_floor_height_tracks_viewport() {
        let metrics = derived(5);
        let mut surface = RecordingSurface::new(1000.0, 1.0);
        assert_eq!(metrics.floor_height(&surface), 200.0);

        surface.resize(1003.0, 1.0);
        assert_eq!(metrics.floor_height(&surface), 200.0);

        surface.resize(724.0, 2.0);
        assert_eq!(metrics.floor_height(&surface), 144.0);
    }

    #[test]
    fn configured_floor_height_ignores_viewport() {
        let metrics = ViewportMetrics::new(&ViewportConfig {
            visible_floor_count: 5,
            floor_height: Some(120.0),
            ..ViewportConfig::default()
        });
        let surface = RecordingSurface::new(333.0, 1.5);
        assert_eq!(metrics.floor_height(&surface), 120.0);
        assert_eq!(metrics.mode(), FloorHeightMode::Configured(120.0));
    }

    #[test]
    fn snapshot_reads_current_surface() {
        let metrics = derived(3);
        let mut surface = RecordingSurface::new(900.0, 1.25);
        let before = metrics.snapshot(&surface);
        assert_eq!(before.floor_height, 300.0);
        assert_eq!(before.device_pixel_ratio, 1.25);

        surface.resize(450.0, 2.0);
        let after = metrics.snapshot(&surface);
        assert_eq!(after.viewport_height, 450.0);
        assert_eq!(after.floor_height, 150.0);
        assert_eq!(after.device_pixel_ratio, 2.0);
    }

    #[test]
    fn bad_ratios_fall_back_to_one() {
        let metrics = derived(5);
        for ratio in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let surface = RecordingSurface::new(500.0, ratio);
            assert_eq!(metrics.device_pixel_ratio(&surface), 1.0);
        }
        assert_eq!(round_to_device_pixel(10.4, 0.0), 10.0);
    }

    #[test]
    fn rounds_to_physical_pixels() {
        assert_eq!(round_to_device_pixel(10.3, 1.0), 10.0);
        assert_eq!(round_to_device_pixel(10.3, 2.0), 10.5);
        assert_eq!(round_to_device_pixel(10.3, 1.25), 10.4);
        assert_eq!(round_to_device_pixel(240.0, 1.5), 240.0);
    }

    #[test]
    fn rounding_is_idempotent() {
        let ratios = [1.0, 1.1, 1.25, 4.0 / 3.0, 1.5, 1.75, 2.0, 2.25, 3.0];
        for &ratio in &ratios {
            for step in 0..2000 {
                let value = step as f64 * 0.37 - 120.0;
                let once = round_to_device_pixel(value, ratio);
                let twice = round_to_device_pixel(once, ratio);
                assert_eq!(once, twice, "value {value} ratio {ratio}");
            }
        }
    }
}
