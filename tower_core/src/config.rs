//! Typed view over the building configuration document.
//!
//! The document is read in two passes: first as untyped JSON (any failure
//! there is a load error), then into the raw serde structs below, which are
//! validated into [`Config`]. Missing or malformed fields are shape errors.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use serde_json::Value;

use crate::{FloorId, error::TowerError, metrics::FloorHeightMode};

pub const DEFAULT_VISIBLE_FLOOR_COUNT: u32 = 5;
pub const DEFAULT_CAR_WIDTH: f64 = 200.0;

/// Where the configuration document comes from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Inline { name: String, json: String },
}

impl ConfigSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn inline(name: impl Into<String>, json: impl Into<String>) -> Self {
        Self::Inline {
            name: name.into(),
            json: json.into(),
        }
    }

    /// Human readable label used in errors and logs.
    pub fn name(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Inline { name, .. } => name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub floors: Vec<FloorConfig>,
    pub elevator: ElevatorConfig,
    pub viewport: ViewportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorConfig {
    pub id: FloorId,
    pub background: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElevatorConfig {
    pub capacity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    pub visible_floor_count: u32,
    /// Fixed floor height in logical pixels. `None` derives it from the viewport.
    pub floor_height: Option<f64>,
    pub car_width: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            visible_floor_count: DEFAULT_VISIBLE_FLOOR_COUNT,
            floor_height: None,
            car_width: DEFAULT_CAR_WIDTH,
        }
    }
}

impl ViewportConfig {
    pub fn floor_height_mode(&self) -> FloorHeightMode {
        match self.floor_height {
            Some(height) => FloorHeightMode::Configured(height),
            None => FloorHeightMode::Derived,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    floors: Option<Vec<RawFloor>>,
    #[serde(default)]
    elevator: Option<RawElevator>,
    #[serde(default)]
    viewport: Option<RawViewport>,
}

#[derive(Debug, Deserialize)]
struct RawFloor {
    id: FloorId,
    #[serde(default, alias = "backgroundImage")]
    bg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawElevator {
    #[serde(default)]
    capacity: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawViewport {
    #[serde(default, alias = "visibleFloors")]
    visible_floor_count: Option<i64>,
    #[serde(default)]
    floor_height: Option<f64>,
    #[serde(default)]
    car_width: Option<f64>,
}

impl RawConfig {
    fn validate(self) -> Result<Config, TowerError> {
        let raw_floors = self
            .floors
            .ok_or_else(|| TowerError::shape("missing required field `floors`"))?;
        let capacity = self
            .elevator
            .and_then(|elevator| elevator.capacity)
            .ok_or_else(|| TowerError::shape("missing required field `elevator.capacity`"))?;
        let capacity = u32::try_from(capacity)
            .ok()
            .filter(|capacity| *capacity > 0)
            .ok_or_else(|| {
                TowerError::shape(format!(
                    "`elevator.capacity` must be a positive integer (got {capacity})"
                ))
            })?;

        let mut seen = HashSet::with_capacity(raw_floors.len());
        let mut floors = Vec::with_capacity(raw_floors.len());
        for floor in raw_floors {
            if !seen.insert(floor.id) {
                return Err(TowerError::shape(format!("duplicate floor id {}", floor.id)));
            }
            floors.push(FloorConfig {
                id: floor.id,
                background: floor.bg,
            });
        }

        let viewport = match self.viewport {
            Some(raw) => raw.validate()?,
            None => ViewportConfig::default(),
        };

        Ok(Config {
            floors,
            elevator: ElevatorConfig { capacity },
            viewport,
        })
    }
}

impl RawViewport {
    fn validate(self) -> Result<ViewportConfig, TowerError> {
        let visible_floor_count = match self.visible_floor_count {
            Some(count) => u32::try_from(count)
                .ok()
                .filter(|count| *count > 0)
                .ok_or_else(|| {
                    TowerError::shape(format!(
                        "`viewport.visibleFloorCount` must be a positive integer (got {count})"
                    ))
                })?,
            None => DEFAULT_VISIBLE_FLOOR_COUNT,
        };
        let floor_height = match self.floor_height {
            Some(height) => Some(positive("viewport.floorHeight", height)?),
            None => None,
        };
        let car_width = match self.car_width {
            Some(width) => positive("viewport.carWidth", width)?,
            None => DEFAULT_CAR_WIDTH,
        };
        Ok(ViewportConfig {
            visible_floor_count,
            floor_height,
            car_width,
        })
    }
}

fn positive(field: &str, value: f64) -> Result<f64, TowerError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(TowerError::shape(format!(
            "`{field}` must be a positive number (got {value})"
        )))
    }
}

impl Config {
    pub fn from_json_str(source_name: &str, json: &str) -> Result<Self, TowerError> {
        let value: Value =
            serde_json::from_str(json).map_err(|err| TowerError::load(source_name, err))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, TowerError> {
        if !value.is_object() {
            return Err(TowerError::shape("document root must be a JSON object"));
        }
        let raw: RawConfig =
            serde_json::from_value(value).map_err(|err| TowerError::shape(err.to_string()))?;
        raw.validate()
    }
}

/// Blocking load, for callers without a runtime.
pub fn load(source: &ConfigSource) -> Result<Config, TowerError> {
    match source {
        ConfigSource::File(path) => {
            let data = read_file(path)?;
            Config::from_json_str(&source.name(), &data)
        }
        ConfigSource::Inline { name, json } => Config::from_json_str(name, json),
    }
}

fn read_file(path: &Path) -> Result<String, TowerError> {
    fs::read_to_string(path).map_err(|err| TowerError::load(path.display().to_string(), err))
}

pub async fn load_async(source: &ConfigSource) -> Result<Config, TowerError> {
    match source {
        ConfigSource::File(path) => {
            let data = tokio::fs::read_to_string(path)
                .await
                .map_err(|err| TowerError::load(source.name(), err))?;
            Config::from_json_str(&source.name(), &data)
        }
        ConfigSource::Inline { name, json } => Config::from_json_str(name, json),
    }
}

/// Load with an upper bound on how long the read may take. Expiry is a load error.
pub async fn load_with_timeout(
    source: &ConfigSource,
    timeout: Duration,
) -> Result<Config, TowerError> {
    match tokio::time::timeout(timeout, load_async(source)).await {
        Ok(result) => result,
        Err(_) => Err(TowerError::load(
            source.name(),
            format!("timed out after {} ms", timeout.as_millis()),
        )),
    }
}
