//! Floor background paths.

use std::path::{Path, PathBuf};

use crate::{FloorId, error::AssetMissingWarning, stack::FloorSpec};

pub const FLOOR_ASSET_DIR: &str = "assets/floors";
pub const DEFAULT_FLOOR_EXTENSION: &str = "png";

/// Background used when the configuration names none for a floor.
pub fn default_background(id: FloorId) -> String {
    format!("{FLOOR_ASSET_DIR}/floor{id}.{DEFAULT_FLOOR_EXTENSION}")
}

/// Resolve a floor's background against `root`, reporting files that do not exist.
pub fn resolve_background(root: &Path, floor: &FloorSpec) -> Result<PathBuf, AssetMissingWarning> {
    let background = Path::new(&floor.background);
    let path = if background.is_absolute() {
        background.to_path_buf()
    } else {
        root.join(background)
    };
    if path.is_file() {
        Ok(path)
    } else {
        Err(AssetMissingWarning {
            floor: floor.id,
            path,
            reason: "file not found".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn default_background_follows_floor_naming() {
        assert_eq!(default_background(7), "assets/floors/floor7.png");
        assert_eq!(default_background(-1), "assets/floors/floor-1.png");
    }

    #[test]
    fn resolves_existing_and_reports_missing() {
        let dir = tempdir().expect("tempdir");
        let floors_dir = dir.path().join(FLOOR_ASSET_DIR);
        fs::create_dir_all(&floors_dir).expect("create asset dir");
        fs::write(floors_dir.join("floor1.png"), b"png").expect("write asset");

        let present = FloorSpec {
            id: 1,
            background: default_background(1),
        };
        assert_eq!(
            resolve_background(dir.path(), &present).expect("asset exists"),
            floors_dir.join("floor1.png")
        );

        let missing = FloorSpec {
            id: 2,
            background: default_background(2),
        };
        let warning = resolve_background(dir.path(), &missing).unwrap_err();
        assert_eq!(warning.floor, 2);
        assert_eq!(warning.path, floors_dir.join("floor2.png"));
        assert!(warning.to_string().contains("floor 2"));
    }
}
