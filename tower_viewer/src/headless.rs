//! Window-less run: bring the tower up against a fixed-size recording surface
//! and report the resulting layout.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::runtime::Runtime;
use tower_core::{ConfigSource, Controller, FloorId, RecordingSurface, RenderSurface};

use crate::cli::Args;

#[derive(Debug, Serialize)]
pub struct LayoutReport {
    pub viewport_height: f64,
    pub device_pixel_ratio: f64,
    pub floor_height: f64,
    pub visible_floor_count: u32,
    pub current_floor: Option<FloorId>,
    pub current_background: Option<String>,
    pub world_offset: f64,
    pub translation: f64,
    pub floors: Vec<FloorRow>,
    pub missing_assets: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FloorRow {
    pub id: FloorId,
    pub row: usize,
    pub background: String,
}

impl LayoutReport {
    /// `None` until the controller has reached the ready phase.
    pub fn capture(controller: &Controller<RecordingSurface>) -> Option<Self> {
        let context = controller.context()?;
        let frame = controller.frame()?;
        let surface = controller.surface();
        Some(Self {
            viewport_height: surface.viewport_height(),
            device_pixel_ratio: frame.device_pixel_ratio,
            floor_height: frame.floor_height,
            visible_floor_count: frame.visible_floor_count,
            current_floor: controller.current_floor(),
            current_background: controller
                .current_floor()
                .and_then(|floor| context.stack.entry(floor))
                .map(|entry| entry.spec.background.clone()),
            world_offset: controller.world_offset(),
            translation: surface.translation(),
            floors: context
                .stack
                .iter()
                .enumerate()
                .map(|(row, entry)| FloorRow {
                    id: entry.spec.id,
                    row,
                    background: entry.spec.background.clone(),
                })
                .collect(),
            missing_assets: surface
                .missing_assets()
                .iter()
                .map(|warning| warning.to_string())
                .collect(),
        })
    }

    pub fn print_summary(&self) {
        println!(
            "Tower ready: {} floors, {} visible at {}px (viewport {}px @ {}x)",
            self.floors.len(),
            self.visible_floor_count,
            self.floor_height,
            self.viewport_height,
            self.device_pixel_ratio
        );
        match self.current_floor {
            Some(floor) => println!(
                "  car on floor {floor}, camera offset {}px (translate {}px)",
                self.world_offset, self.translation
            ),
            None => println!("  stack is empty; camera parked at 0px"),
        }
        if let Some(background) = self.current_background.as_deref() {
            println!("  background {background}");
        }
        if !self.missing_assets.is_empty() {
            println!("  {} floor backgrounds missing:", self.missing_assets.len());
            for missing in &self.missing_assets {
                println!("    {missing}");
            }
        }
    }

    pub fn write_json(&self, destination: &Path) -> Result<()> {
        let encoded = serde_json::to_vec_pretty(self).context("encoding layout report")?;
        fs::write(destination, encoded)
            .with_context(|| format!("writing layout report to {}", destination.display()))
    }
}

pub fn run(args: &Args, runtime: &Runtime, source: &ConfigSource, timeout: Duration) -> Result<()> {
    let surface = RecordingSurface::new(f64::from(args.height), args.scale_factor)
        .with_asset_root(args.resolved_asset_root());
    let mut controller = Controller::new(surface);
    runtime
        .block_on(controller.start(source, timeout))
        .with_context(|| format!("starting tower from {}", source.name()))?;
    if let Some(floor) = args.start_floor {
        controller
            .snap_to(floor)
            .with_context(|| format!("snapping to --start-floor {floor}"))?;
    }

    let report = LayoutReport::capture(&controller).context("tower did not reach ready")?;
    report.print_summary();
    if let Some(path) = args.report.as_ref() {
        report.write_json(path)?;
        println!("Layout report written to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;
    use tower_core::Phase;

    const CONFIG: &str = r#"{
        "floors": [{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}, {"id": 5}, {"id": 6}],
        "elevator": {"capacity": 4},
        "viewport": {"visibleFloorCount": 3}
    }"#;

    fn ready_controller() -> Controller<RecordingSurface> {
        let mut controller = Controller::new(RecordingSurface::new(450.0, 2.0));
        let config = tower_core::config::Config::from_json_str("inline", CONFIG)
            .expect("parse inline config");
        controller.start_with_config(config).expect("start tower");
        controller
    }

    #[test]
    fn report_reflects_the_ready_tower() {
        let mut controller = ready_controller();
        let report = LayoutReport::capture(&controller).expect("ready report");
        assert_eq!(report.floor_height, 150.0);
        assert_eq!(report.visible_floor_count, 3);
        // middle slot of three rows is the second floor from the top
        assert_eq!(report.current_floor, Some(5));
        assert_eq!(
            report.current_background.as_deref(),
            Some("assets/floors/floor5.png")
        );
        assert_eq!(report.world_offset, 0.0);
        let ids: Vec<FloorId> = report.floors.iter().map(|floor| floor.id).collect();
        assert_eq!(ids, vec![6, 5, 4, 3, 2, 1]);
        assert_eq!(report.floors[5].row, 5);
        assert_eq!(report.floors[5].background, "assets/floors/floor1.png");

        controller.snap_to(1).expect("snap to bottom");
        let bottom = LayoutReport::capture(&controller).expect("report after snap");
        assert_eq!(bottom.world_offset, 450.0);
        assert_eq!(bottom.translation, -450.0);
        assert_eq!(
            bottom.current_background.as_deref(),
            Some("assets/floors/floor1.png")
        );
    }

    #[test]
    fn report_requires_a_ready_tower() {
        let controller = Controller::new(RecordingSurface::new(450.0, 1.0));
        assert_eq!(controller.phase(), Phase::Uninitialized);
        assert!(LayoutReport::capture(&controller).is_none());
    }

    #[test]
    fn report_serializes_to_json() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("layout.json");
        let report = LayoutReport::capture(&ready_controller()).expect("ready report");
        report.write_json(&path).expect("write report");

        let value: Value =
            serde_json::from_slice(&fs::read(&path).expect("read report")).expect("parse report");
        assert_eq!(value["current_floor"], 5);
        assert_eq!(value["floors"].as_array().map(Vec::len), Some(6));
        assert_eq!(value["floors"][0]["id"], 6);
    }
}
