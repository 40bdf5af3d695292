//! Viewport camera for a vertically stacked building.
//!
//! The crate turns a JSON building description into an ordered floor stack,
//! derives per-frame geometry from whatever host draws the floors, and snaps
//! the stack so a requested floor lands in the middle row of the viewport
//! without scrolling past either end. Rendering itself stays behind the
//! [`RenderSurface`] trait so the same math drives the wgpu viewer, headless
//! runs, and tests.

pub mod assets;
pub mod camera;
pub mod car;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod stack;
pub mod surface;

pub use camera::{Camera, CameraTween, middle_slot, offset_for_floor};
pub use car::{CarState, Direction, Rider};
pub use config::{Config, ConfigSource, ElevatorConfig, FloorConfig, ViewportConfig};
pub use error::{AssetMissingWarning, TowerError};
pub use lifecycle::{Controller, Phase, TowerContext};
pub use metrics::{FloorHeightMode, FrameMetrics, ViewportMetrics, round_to_device_pixel};
pub use stack::{FloorEntry, FloorSpec, FloorStack, RiderQueue};
pub use surface::{RecordingSurface, RenderSurface, SurfaceCall, ViewportStyle};

/// Floor identifiers as they appear in the configuration document.
pub type FloorId = i64;
