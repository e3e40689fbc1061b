// Copyright 2026 the buildings-map contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Persistent configuration stored as TOML via confy. Every field has a
//! serde default so old or partial config files keep loading.

use serde::{Deserialize, Serialize};

use crate::map::BaseLayer;
use building_client::DEFAULT_API_URL;

/// Default map center: Nairobi city center.
pub const DEFAULT_CENTER_LAT: f64 = -1.2921;
pub const DEFAULT_CENTER_LON: f64 = 36.8219;

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Buildings API endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base tile layer active at startup
    #[serde(default = "default_base_layer")]
    pub base_layer: BaseLayer,

    /// Initial map center latitude
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,

    /// Initial map center longitude
    #[serde(default = "default_center_lon")]
    pub center_lon: f64,

    /// Initial map zoom level
    #[serde(default = "default_zoom")]
    pub default_zoom: f32,

    /// Timeout for the building fetch, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

// Default value functions for serde
fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_base_layer() -> BaseLayer {
    BaseLayer::OpenStreetMap
}

fn default_center_lat() -> f64 {
    DEFAULT_CENTER_LAT
}

fn default_center_lon() -> f64 {
    DEFAULT_CENTER_LON
}

fn default_zoom() -> f32 {
    15.0
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            base_layer: default_base_layer(),
            center_lat: default_center_lat(),
            center_lon: default_center_lon(),
            default_zoom: default_zoom(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load("buildings-map", "config")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store("buildings-map", "config", self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path("buildings-map", "config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let config = AppConfig::default();
        assert_eq!(config.api_url, "http://127.0.0.1:8000/api/v1/building/");
        assert_eq!(config.base_layer, BaseLayer::OpenStreetMap);
        assert!((config.center_lat - -1.2921).abs() < 1e-9);
        assert!((config.center_lon - 36.8219).abs() < 1e-9);
        assert!((config.default_zoom - 15.0).abs() < f32::EPSILON);
        assert_eq!(config.fetch_timeout_secs, 10);
    }

    #[test]
    fn test_saved_layer_survives_reload() {
        let path = std::env::temp_dir().join(format!(
            "buildings-map-config-test-{}.toml",
            std::process::id()
        ));
        let mut config = AppConfig::default();
        config.base_layer = BaseLayer::GoogleHybrid;
        confy::store_path(&path, &config).unwrap();
        let reloaded: AppConfig = confy::load_path(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(reloaded.base_layer, BaseLayer::GoogleHybrid);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"default_zoom": 12.0}"#).unwrap();
        assert!((config.default_zoom - 12.0).abs() < f32::EPSILON);
        assert_eq!(config.api_url, AppConfig::default().api_url);
        assert_eq!(config.base_layer, BaseLayer::OpenStreetMap);
    }
}
