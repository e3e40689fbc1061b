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

//! Base tile layer registry.
//!
//! Two selectable base layers: standard OpenStreetMap tiles and Google
//! hybrid satellite tiles. Exactly one is active at a time; the active
//! choice lives on the application state, not here.

use serde::{Deserialize, Serialize};

/// A selectable full-map background tile source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BaseLayer {
    OpenStreetMap,
    GoogleHybrid,
}

impl BaseLayer {
    pub const ALL: [BaseLayer; 2] = [BaseLayer::OpenStreetMap, BaseLayer::GoogleHybrid];

    /// Tile URL for the given slippy-map coordinates.
    pub fn tile_url(&self, x: u32, y: u32, zoom: u8) -> String {
        match self {
            BaseLayer::OpenStreetMap => {
                format!("https://tile.openstreetmap.org/{zoom}/{x}/{y}.png")
            }
            BaseLayer::GoogleHybrid => {
                // Subdomain load balancing across mt0-mt3, keyed by tile coordinates
                let subdomain = ["mt0", "mt1", "mt2", "mt3"][((x + y) % 4) as usize];
                format!("http://{subdomain}.google.com/vt?lyrs=s,h&x={x}&y={y}&z={zoom}")
            }
        }
    }

    pub fn max_zoom(&self) -> u8 {
        match self {
            BaseLayer::OpenStreetMap => 19,
            BaseLayer::GoogleHybrid => 20,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BaseLayer::OpenStreetMap => "Open Street Maps",
            BaseLayer::GoogleHybrid => "Google Hybrid",
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            BaseLayer::OpenStreetMap => "© OpenStreetMap contributors",
            BaseLayer::GoogleHybrid => "Imagery © Google",
        }
    }

    /// Stable identifier used for cache directories and config values.
    pub fn slug(&self) -> &'static str {
        match self {
            BaseLayer::OpenStreetMap => "openstreetmap",
            BaseLayer::GoogleHybrid => "google-hybrid",
        }
    }
}
