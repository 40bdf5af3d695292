use tower_core::ViewportStyle;
use winit::dpi::PhysicalSize;

use super::shaders::{CameraUniform, QuadInstance};

/// One quad per floor, top to bottom, followed by the car outline when the
/// car sits on a floor of the stack.
pub(super) fn tower_instances(
    style: &ViewportStyle,
    viewport_width: f32,
    floor_count: usize,
    car_row: Option<usize>,
) -> Vec<QuadInstance> {
    let floor_height = style.floor_height as f32;
    let mut instances: Vec<QuadInstance> = (0..floor_count)
        .map(|row| QuadInstance {
            rect: [0.0, row as f32 * floor_height, viewport_width, floor_height],
        })
        .collect();

    if let Some(row) = car_row.filter(|&row| row < floor_count) {
        let car_width = (style.car_width as f32).min(viewport_width);
        instances.push(QuadInstance {
            rect: [
                (viewport_width - car_width) / 2.0,
                row as f32 * floor_height,
                car_width,
                floor_height,
            ],
        });
    }
    instances
}

pub(super) fn camera_uniform(
    size: PhysicalSize<u32>,
    device_pixel_ratio: f64,
    translate_y: f64,
) -> CameraUniform {
    let scale = device_pixel_ratio as f32;
    CameraUniform {
        viewport: [
            size.width.max(1) as f32 / scale,
            size.height.max(1) as f32 / scale,
        ],
        translate_y: translate_y as f32,
        scale,
    }
}
