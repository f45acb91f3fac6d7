//! Registry-wide device counts.

use serde::{Deserialize, Serialize};

/// Device counts reported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatistics {
    pub total_device_count: i64,
    pub enabled_device_count: i64,
    pub disabled_device_count: i64,
}
