//! The seam between the camera core and whatever draws the floors.

use std::path::PathBuf;

use crate::{
    FloorId, assets,
    error::AssetMissingWarning,
    stack::FloorSpec,
};

/// Styling values written back to the host whenever geometry is (re)derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportStyle {
    /// Viewport height in logical pixels, already snapped to a device pixel.
    pub viewport_height: f64,
    pub floor_height: f64,
    pub car_width: f64,
}

/// Host rendering environment.
///
/// Geometry reads are expected to reflect the host's current state on every
/// call; the core never caches them across resizes.
pub trait RenderSurface {
    /// Handle to the visual node created for one floor.
    type Node;

    /// Measured height of the viewport container, in logical pixels.
    fn viewport_height(&self) -> f64;

    /// Physical pixels per logical pixel.
    fn device_pixel_ratio(&self) -> f64;

    fn apply_style(&mut self, style: ViewportStyle);

    /// Drop every floor node created so far.
    fn clear_floors(&mut self);

    /// Create the node for one floor. Called top to bottom.
    fn create_floor_node(&mut self, floor: &FloorSpec) -> Self::Node;

    /// Translate the stack container vertically. Negative values move it up.
    fn set_stack_translation(&mut self, translate_y: f64);
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Style(ViewportStyle),
    ClearFloors,
    CreateFloor { id: FloorId, background: String },
    Translate(f64),
}

/// In-memory surface with fixed geometry that records every write.
///
/// Drives headless runs and tests. When an asset root is set, each created
/// floor has its background resolved against it and misses are reported.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    viewport_height: f64,
    device_pixel_ratio: f64,
    asset_root: Option<PathBuf>,
    calls: Vec<SurfaceCall>,
    floors: Vec<FloorSpec>,
    style: Option<ViewportStyle>,
    translation: f64,
    missing_assets: Vec<AssetMissingWarning>,
}

impl RecordingSurface {
    pub fn new(viewport_height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            viewport_height,
            device_pixel_ratio,
            asset_root: None,
            calls: Vec::new(),
            floors: Vec::new(),
            style: None,
            translation: 0.0,
            missing_assets: Vec::new(),
        }
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    /// Simulate the host resizing the viewport or changing zoom.
    pub fn resize(&mut self, viewport_height: f64, device_pixel_ratio: f64) {
        self.viewport_height = viewport_height;
        self.device_pixel_ratio = device_pixel_ratio;
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn floors(&self) -> &[FloorSpec] {
        &self.floors
    }

    pub fn style(&self) -> Option<ViewportStyle> {
        self.style
    }

    pub fn translation(&self) -> f64 {
        self.translation
    }

    pub fn missing_assets(&self) -> &[AssetMissingWarning] {
        &self.missing_assets
    }
}

impl RenderSurface for RecordingSurface {
    type Node = usize;

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    fn apply_style(&mut self, style: ViewportStyle) {
        self.style = Some(style);
        self.calls.push(SurfaceCall::Style(style));
    }

    fn clear_floors(&mut self) {
        self.floors.clear();
        self.calls.push(SurfaceCall::ClearFloors);
    }

    fn create_floor_node(&mut self, floor: &FloorSpec) -> usize {
        if let Some(root) = self.asset_root.as_deref() {
            if let Err(warning) = assets::resolve_background(root, floor) {
                warning.report();
                self.missing_assets.push(warning);
            }
        }
        self.calls.push(SurfaceCall::CreateFloor {
            id: floor.id,
            background: floor.background.clone(),
        });
        self.floors.push(floor.clone());
        self.floors.len() - 1
    }

    fn set_stack_translation(&mut self, translate_y: f64) {
        self.translation = translate_y;
        self.calls.push(SurfaceCall::Translate(translate_y));
    }
}
