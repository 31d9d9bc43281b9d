// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! File-backed platform inventory.
//!
//! ```yaml
//! platforms:
//!   - id: 1
//!     name: weather-api
//!     type: REST
//!     metadata: { base_endpoint: "https://api.example.com", auth: { type: api_key, api_key: "${API_KEY}" } }
//! resources:
//!   - id: 10
//!     platform_id: 1
//!     name: current
//!     type: rest_endpoint
//!     details: '{"method":"GET","path":"/stations/:device_alias"}'
//! devices:
//!   - { device_id: 42, platform_id: 1, alias: "ST-042" }
//! ```
//!
//! `metadata` and `details` may be JSON strings or inline objects. Inline
//! objects are serialized back to JSON text; neither form is interpreted here.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use conduit_core::types::{DeviceLink, Platform, PlatformStore, Resource};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::{LoadError, LoadResult};
use crate::format::{load_file, resolve_placeholders, ConfigFormat};

// =============================================================================
// Raw file layout
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInventory {
    #[serde(default)]
    platforms: Vec<RawPlatform>,
    #[serde(default)]
    resources: Vec<RawResource>,
    #[serde(default)]
    devices: Vec<DeviceLink>,
}

#[derive(Debug, Deserialize)]
struct RawPlatform {
    id: i64,
    name: String,
    #[serde(rename = "type")]
    platform_type: String,
    metadata: Value,
    #[serde(default = "active")]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct RawResource {
    id: i64,
    platform_id: i64,
    name: String,
    #[serde(rename = "type")]
    resource_type: String,
    details: Value,
}

fn active() -> bool {
    true
}

fn json_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Parsed and cross-checked inventory contents.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Platforms.
    pub platforms: Vec<Platform>,
    /// Resources.
    pub resources: Vec<Resource>,
    /// Device links.
    pub devices: Vec<DeviceLink>,
}

impl Inventory {
    /// Loads and checks an inventory file.
    pub fn load(path: &Path) -> LoadResult<Self> {
        let raw: RawInventory = load_file(path)?;
        Self::from_raw(raw)
    }

    /// Parses and checks inventory text.
    pub fn parse(content: &str, format: ConfigFormat) -> LoadResult<Self> {
        let raw: RawInventory = format.parse("<string>", &resolve_placeholders(content))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawInventory) -> LoadResult<Self> {
        let inventory = Inventory {
            platforms: raw
                .platforms
                .into_iter()
                .map(|p| Platform {
                    id: p.id,
                    name: p.name,
                    platform_type: p.platform_type,
                    metadata: json_text(p.metadata),
                    is_active: p.is_active,
                })
                .collect(),
            resources: raw
                .resources
                .into_iter()
                .map(|r| Resource {
                    id: r.id,
                    platform_id: r.platform_id,
                    name: r.name,
                    resource_type: r.resource_type,
                    details: json_text(r.details),
                })
                .collect(),
            devices: raw.devices,
        };
        inventory.check()?;
        Ok(inventory)
    }

    /// Checks identifier uniqueness and platform references.
    ///
    /// - platform and resource ids are unique
    /// - resources and device links point at a known platform
    /// - resource names are unique per platform (they key fetch results)
    /// - a device has at most one link per platform
    /// - an alias is unique per platform
    pub fn check(&self) -> LoadResult<()> {
        let mut platform_ids = HashSet::new();
        for platform in &self.platforms {
            if !platform_ids.insert(platform.id) {
                return Err(LoadError::duplicate("platform id", platform.id));
            }
        }

        let mut resource_ids = HashSet::new();
        let mut resource_names = HashSet::new();
        for resource in &self.resources {
            if !resource_ids.insert(resource.id) {
                return Err(LoadError::duplicate("resource id", resource.id));
            }
            if !platform_ids.contains(&resource.platform_id) {
                return Err(LoadError::DanglingReference {
                    kind: "resource",
                    id: resource.id.to_string(),
                    platform_id: resource.platform_id,
                });
            }
            if resource.name.trim().is_empty() {
                return Err(LoadError::validation(
                    format!("resources[{}].name", resource.id),
                    "must not be empty",
                ));
            }
            if !resource_names.insert((resource.platform_id, resource.name.as_str())) {
                return Err(LoadError::duplicate(
                    "resource name",
                    format!("{}@{}", resource.name, resource.platform_id),
                ));
            }
        }

        let mut links = HashSet::new();
        let mut aliases = HashSet::new();
        for link in &self.devices {
            let id = format!("{}@{}", link.device_id, link.platform_id);
            if !platform_ids.contains(&link.platform_id) {
                return Err(LoadError::DanglingReference {
                    kind: "device link",
                    id,
                    platform_id: link.platform_id,
                });
            }
            if link.alias.trim().is_empty() {
                return Err(LoadError::validation(format!("devices[{}].alias", id), "must not be empty"));
            }
            if !links.insert((link.device_id, link.platform_id)) {
                return Err(LoadError::duplicate("device link", id));
            }
            if !aliases.insert((link.platform_id, link.alias.as_str())) {
                return Err(LoadError::duplicate(
                    "alias",
                    format!("{}@{}", link.alias, link.platform_id),
                ));
            }
        }

        Ok(())
    }
}

// =============================================================================
// FileInventory
// =============================================================================

/// In-memory [`PlatformStore`] over a loaded inventory.
#[derive(Debug, Clone, Default)]
pub struct FileInventory {
    platforms: BTreeMap<i64, Platform>,
    resources: BTreeMap<i64, Resource>,
    devices: HashMap<(i64, i64), DeviceLink>,
}

impl FileInventory {
    /// Loads an inventory file into a store.
    pub fn load(path: &Path) -> LoadResult<Self> {
        let store = Self::from(Inventory::load(path)?);
        info!(
            path = %path.display(),
            platforms = store.platforms.len(),
            resources = store.resources.len(),
            devices = store.devices.len(),
            "Inventory loaded"
        );
        Ok(store)
    }

    /// Number of platforms.
    pub fn platform_count(&self) -> usize {
        self.platforms.len()
    }
}

impl From<Inventory> for FileInventory {
    fn from(inventory: Inventory) -> Self {
        Self {
            platforms: inventory.platforms.into_iter().map(|p| (p.id, p)).collect(),
            resources: inventory.resources.into_iter().map(|r| (r.id, r)).collect(),
            devices: inventory
                .devices
                .into_iter()
                .map(|d| ((d.device_id, d.platform_id), d))
                .collect(),
        }
    }
}

#[async_trait]
impl PlatformStore for FileInventory {
    async fn platform(&self, id: i64) -> Option<Platform> {
        self.platforms.get(&id).cloned()
    }

    async fn resource(&self, id: i64) -> Option<Resource> {
        self.resources.get(&id).cloned()
    }

    async fn resources_for(&self, platform_id: i64) -> Vec<Resource> {
        self.resources
            .values()
            .filter(|r| r.platform_id == platform_id)
            .cloned()
            .collect()
    }

    async fn device_link(&self, device_id: i64, platform_id: i64) -> Option<DeviceLink> {
        self.devices.get(&(device_id, platform_id)).cloned()
    }
}
