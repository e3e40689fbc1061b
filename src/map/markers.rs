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

//! Marker icon resolution and texture loading.
//!
//! Icons are fetched once from their remote URL, cached on disk under a
//! SHA256-based filename, and converted to egui textures. While an icon is
//! still loading, a painted fallback pin keeps markers visible.

use log::warn;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use building_client::Building;

/// The shared blue marker used for every building by default.
pub const DEFAULT_ICON_URL: &str =
    "https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/marker-icon-blue.png";

/// A marker icon definition: image source plus placement geometry.
///
/// The anchor is the pixel within the icon that must land on the marker's
/// geographic coordinate. Anchors outside the icon rect are clamped when the
/// marker is placed.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerIcon {
    pub url: String,
    /// Rendered size in screen pixels [width, height].
    pub size: [f32; 2],
    /// Anchor point in icon pixels [x, y], measured from the top-left.
    pub anchor: [f32; 2],
}

impl MarkerIcon {
    /// The standard blue building marker.
    #[must_use]
    pub fn default_blue() -> Self {
        Self {
            url: DEFAULT_ICON_URL.to_owned(),
            size: [15.0, 25.0],
            anchor: [12.0, 41.0],
        }
    }

    /// Screen rect for this icon when its anchor sits at `pos`.
    #[must_use]
    pub fn rect_at(&self, pos: egui::Pos2) -> egui::Rect {
        let ax = self.anchor[0].clamp(0.0, self.size[0]);
        let ay = self.anchor[1].clamp(0.0, self.size[1]);
        egui::Rect::from_min_size(
            egui::pos2(pos.x - ax, pos.y - ay),
            egui::vec2(self.size[0], self.size[1]),
        )
    }
}

/// Maps a building to the icon it should be drawn with.
///
/// Implementations must always return a usable icon; "no icon" is not a
/// valid answer.
pub trait IconResolver {
    fn resolve(&self, building: &Building) -> MarkerIcon;
}

/// Resolver returning the shared blue icon for every building.
#[derive(Debug, Default)]
pub struct DefaultIconResolver;

impl IconResolver for DefaultIconResolver {
    fn resolve(&self, _building: &Building) -> MarkerIcon {
        MarkerIcon::default_blue()
    }
}

/// Loads marker icon images into egui textures, with a disk cache.
pub struct MarkerTextures {
    cache_dir: PathBuf,
    textures: Arc<Mutex<HashMap<String, egui::TextureHandle>>>,
    loading: Arc<Mutex<HashSet<String>>>,
}

impl MarkerTextures {
    pub fn new() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("buildings-map")
            .join("icons");

        if let Err(e) = fs::create_dir_all(&cache_dir) {
            warn!("failed to create icon cache directory: {e}");
        }

        Self {
            cache_dir,
            textures: Arc::new(Mutex::new(HashMap::new())),
            loading: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn cache_path(cache_dir: &Path, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        cache_dir.join(format!("{hash}.png"))
    }

    /// Get the texture for an icon, starting a background download on first use.
    ///
    /// Returns `None` while the image is not available yet; the caller should
    /// draw the fallback pin instead.
    pub fn get_or_load(&self, ctx: &egui::Context, icon: &MarkerIcon) -> Option<egui::TextureHandle> {
        {
            let textures = self.textures.lock().unwrap();
            if let Some(texture) = textures.get(&icon.url) {
                return Some(texture.clone());
            }
        }

        let cache_path = Self::cache_path(&self.cache_dir, &icon.url);
        if let Ok(bytes) = fs::read(&cache_path) {
            if let Some(texture) = load_texture_from_bytes(ctx, &bytes, &icon.url) {
                self.textures
                    .lock()
                    .unwrap()
                    .insert(icon.url.clone(), texture.clone());
                return Some(texture);
            }
        }

        {
            let mut loading = self.loading.lock().unwrap();
            if loading.contains(&icon.url) {
                return None;
            }
            loading.insert(icon.url.clone());
        }

        let url = icon.url.clone();
        let textures = self.textures.clone();
        let loading = self.loading.clone();
        let ctx = ctx.clone();

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    warn!("failed to start icon download runtime: {e}");
                    loading.lock().unwrap().remove(&url);
                    return;
                }
            };
            rt.block_on(async {
                match download_icon(&url).await {
                    Ok(bytes) => {
                        if let Err(e) = fs::write(&cache_path, &bytes) {
                            warn!("failed to cache marker icon: {e}");
                        }
                        if let Some(texture) = load_texture_from_bytes(&ctx, &bytes, &url) {
                            textures.lock().unwrap().insert(url.clone(), texture);
                            ctx.request_repaint();
                        }
                    }
                    Err(e) => warn!("failed to download marker icon: {e}"),
                }
                loading.lock().unwrap().remove(&url);
            });
        });

        None
    }
}

impl Default for MarkerTextures {
    fn default() -> Self {
        Self::new()
    }
}

async fn download_icon(url: &str) -> Result<Vec<u8>, String> {
    let response = reqwest::get(url).await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    let bytes = response.bytes().await.map_err(|e| e.to_string())?;
    Ok(bytes.to_vec())
}

fn load_texture_from_bytes(
    ctx: &egui::Context,
    bytes: &[u8],
    url: &str,
) -> Option<egui::TextureHandle> {
    let image = image::load_from_memory(bytes).ok()?;
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &rgba.into_raw());

    Some(ctx.load_texture(
        format!("marker_icon_{url}"),
        color_image,
        egui::TextureOptions::LINEAR,
    ))
}

/// Painted stand-in while the icon texture is unavailable.
pub fn draw_fallback_pin(painter: &egui::Painter, pos: egui::Pos2, selected: bool) {
    let head = pos - egui::vec2(0.0, 10.0);
    let color = if selected {
        egui::Color32::from_rgb(255, 120, 60)
    } else {
        egui::Color32::from_rgb(60, 110, 220)
    };
    painter.line_segment([pos, head], egui::Stroke::new(2.0, color));
    painter.circle_filled(head, 5.0, color);
    painter.circle_stroke(head, 5.0, egui::Stroke::new(1.0, egui::Color32::WHITE));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn building_at(lat: f64, lon: f64) -> Building {
        Building {
            pk: None,
            latitude: lat,
            longitude: lon,
            comment: None,
            county: None,
            district: None,
            rent: None,
            payment_details: None,
            occupancy: None,
        }
    }

    #[test]
    fn test_default_resolver_always_returns_the_blue_icon() {
        let resolver = DefaultIconResolver;
        let icon = resolver.resolve(&building_at(-1.29, 36.82));
        assert_eq!(icon.url, DEFAULT_ICON_URL);
        assert!(icon.size[0] > 0.0 && icon.size[1] > 0.0);
        assert_eq!(icon, resolver.resolve(&building_at(0.0, 0.0)));
    }

    #[test]
    fn test_icon_anchor_is_clamped_to_the_icon_rect() {
        // The stock anchor (12, 41) exceeds the 15x25 rendered size; the
        // bottom edge must still end up on the marker position
        let icon = MarkerIcon::default_blue();
        let pos = egui::pos2(100.0, 200.0);
        let rect = icon.rect_at(pos);

        assert_eq!(rect.width(), 15.0);
        assert_eq!(rect.height(), 25.0);
        assert!((rect.max.y - pos.y).abs() < f32::EPSILON);
        assert!(rect.min.x <= pos.x && pos.x <= rect.max.x);
    }

    #[test]
    fn test_interior_anchor_is_preserved() {
        let icon = MarkerIcon {
            url: DEFAULT_ICON_URL.to_owned(),
            size: [20.0, 20.0],
            anchor: [10.0, 10.0],
        };
        let rect = icon.rect_at(egui::pos2(50.0, 50.0));
        assert_eq!(rect.center(), egui::pos2(50.0, 50.0));
    }
}
