use std::path::PathBuf;

use thiserror::Error;

use crate::FloorId;

/// Failures surfaced by the camera core.
#[derive(Debug, Error)]
pub enum TowerError {
    /// The configuration document could not be read, timed out, or is not JSON.
    #[error("failed to load configuration from {source_name}: {reason}")]
    ConfigLoad { source_name: String, reason: String },
    /// The document parsed but required fields are missing or invalid.
    #[error("configuration shape error: {0}")]
    ConfigShape(String),
    /// A camera request named a floor that is not part of the stack.
    #[error("floor {0} is not part of the floor stack")]
    UnknownFloor(FloorId),
}

impl TowerError {
    pub(crate) fn load(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ConfigLoad {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::ConfigShape(message.into())
    }

    /// Load and shape failures abort startup; camera failures only abort the call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigShape(_))
    }
}

/// A floor background that could not be found or decoded.
///
/// Never returned as an error from startup; hosts log it and keep rendering
/// with a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing image for floor {floor}: {} ({reason})", .path.display())]
pub struct AssetMissingWarning {
    pub floor: FloorId,
    pub path: PathBuf,
    pub reason: String,
}

impl AssetMissingWarning {
    /// Emit the warning through the `log` facade.
    pub fn report(&self) {
        log::warn!("[assets] {self}");
    }
}
