use std::path::PathBuf;

use clap::Parser;
use tower_core::FloorId;

#[derive(Parser, Debug)]
#[command(
    about = "Renders a building's floor stack and snaps the camera between floors",
    version
)]
pub struct Args {
    /// Building configuration JSON (floors, elevator capacity, viewport)
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Directory floor backgrounds are resolved against; defaults to the config's directory
    #[arg(long)]
    pub asset_root: Option<PathBuf>,

    /// Floor to snap to once the stack is built, instead of the middle one
    #[arg(long, allow_negative_numbers = true)]
    pub start_floor: Option<FloorId>,

    /// Give up on loading the configuration after this many milliseconds
    #[arg(long, default_value_t = 5000)]
    pub config_timeout_ms: u64,

    /// Animate floor changes over this many milliseconds; 0 snaps instantly
    #[arg(long, default_value_t = 350)]
    pub glide_ms: u64,

    /// Logical window width
    #[arg(long, default_value_t = 480)]
    pub width: u32,

    /// Logical window height (the viewport the floors are fitted into)
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Skip creating a winit window; lay the tower out against a fixed-size surface
    #[arg(long)]
    pub headless: bool,

    /// Device pixel ratio used by --headless
    #[arg(long, default_value_t = 1.0)]
    pub scale_factor: f64,

    /// When set with --headless, write the computed layout as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl Args {
    pub fn resolved_asset_root(&self) -> PathBuf {
        if let Some(root) = self.asset_root.as_ref() {
            return root.clone();
        }
        self.config
            .parent()
            .map(|parent| parent.to_path_buf())
            .unwrap_or_default()
    }
}
