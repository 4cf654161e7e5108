// Volume / disk models

use serde::{Deserialize, Serialize};

/// A mounted volume as reported by the enumeration source, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    pub mount_path: String,
    /// Device node or source name the volume was mounted from (e.g. "/dev/sda1").
    pub device: String,
    pub is_internal: bool,
    pub is_browsable: bool,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    /// Whole-disk identifier when known (e.g. "disk4" rather than "disk4s1").
    pub identifier: String,
    pub name: String,
    pub mount_path: String,
    pub is_internal: bool,
    pub is_ejectable: bool,
    pub total_bytes: u64,
    /// Never exceeds `total_bytes`.
    pub used_bytes: u64,
}

impl Disk {
    pub fn from_volume(volume: &Volume, identifier: String, is_ejectable: bool) -> Self {
        Self {
            identifier,
            name: volume.name.clone(),
            mount_path: volume.mount_path.clone(),
            is_internal: volume.is_internal,
            is_ejectable,
            total_bytes: volume.total_bytes,
            used_bytes: volume.total_bytes.saturating_sub(volume.available_bytes),
        }
    }

    pub fn usage_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.used_bytes as f64 / self.total_bytes as f64).clamp(0.0, 1.0)
    }
}
