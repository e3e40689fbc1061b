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

//! Application state and UI.
//!
//! [`BuildingsApp`] is the single application context: it owns the config,
//! the fetch state, the per-layer tile managers, the marker textures, and
//! the viewport. Nothing in this crate lives in module-level state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use building_client::{Building, ClientConfig};
use eframe::egui;
use log::warn;

use crate::config::AppConfig;
use crate::fetch::{spawn_fetch, FetchState};
use crate::map::{BaseLayer, DefaultIconResolver, IconResolver, MarkerTextures, TileManager, WebMercator};

const TILE_PIXEL_SIZE: f32 = 256.0;
const MIN_ZOOM: f32 = 1.0;
const MARKER_CLICK_RADIUS: f32 = 12.0;

pub struct BuildingsApp {
    config: AppConfig,
    fetch_state: Arc<Mutex<FetchState>>,
    active_layer: BaseLayer,
    tile_managers: HashMap<BaseLayer, TileManager>,
    marker_textures: MarkerTextures,
    icon_resolver: Box<dyn IconResolver>,
    map_center_lat: f64,
    map_center_lon: f64,
    map_zoom_level: f32, // Float for smoother pinch-zoom
    selected_building: Option<usize>,
}

impl BuildingsApp {
    pub fn new(config: AppConfig, ctx: &egui::Context) -> Self {
        let fetch_state = Arc::new(Mutex::new(FetchState::Pending));
        spawn_fetch(fetch_state.clone(), client_config(&config), ctx.clone());

        Self {
            map_center_lat: config.center_lat,
            map_center_lon: config.center_lon,
            map_zoom_level: config.default_zoom,
            active_layer: config.base_layer,
            tile_managers: HashMap::new(),
            marker_textures: MarkerTextures::new(),
            icon_resolver: Box::new(DefaultIconResolver),
            fetch_state,
            selected_building: None,
            config,
        }
    }

    /// Re-arm the one-shot fetch after a failure.
    fn retry_fetch(&mut self, ctx: &egui::Context) {
        *self.fetch_state.lock().unwrap() = FetchState::Pending;
        self.selected_building = None;
        spawn_fetch(
            self.fetch_state.clone(),
            client_config(&self.config),
            ctx.clone(),
        );
    }

    /// Buildings to render this frame; cloned so the lock is released quickly.
    fn loaded_buildings(&self) -> Option<Vec<Building>> {
        match &*self.fetch_state.lock().unwrap() {
            FetchState::Loaded(collection) => Some(collection.buildings.clone()),
            FetchState::Pending | FetchState::Failed(_) => None,
        }
    }

    fn draw_map(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(
            egui::vec2(ui.available_width(), ui.available_height()),
            egui::Sense::click_and_drag(),
        );

        let rect = response.rect;
        let center = rect.center();

        painter.rect_filled(rect, egui::CornerRadius::ZERO, egui::Color32::from_rgb(200, 220, 240));

        let max_zoom = self.active_layer.max_zoom() as f32;

        // Handle pinch-zoom gesture
        let zoom_delta = ui.ctx().input(|i| i.zoom_delta());
        if (zoom_delta - 1.0).abs() > 0.001 {
            self.map_zoom_level += zoom_delta.log2();
        }
        self.map_zoom_level = self.map_zoom_level.clamp(MIN_ZOOM, max_zoom);

        let tile_zoom_level = self.map_zoom_level.round() as u8;

        let tile_manager = self
            .tile_managers
            .entry(self.active_layer)
            .or_insert_with(|| TileManager::new(self.active_layer));

        let visible_tiles = tile_manager.get_visible_tiles(
            self.map_center_lat,
            self.map_center_lon,
            tile_zoom_level,
            rect.width(),
            rect.height(),
        );

        for (tile_coord, offset_x, offset_y) in visible_tiles {
            if let Some(texture) = tile_manager.get_tile(tile_coord, ui.ctx()) {
                let tile_rect = egui::Rect::from_min_size(
                    egui::pos2(center.x + offset_x, center.y + offset_y),
                    egui::vec2(TILE_PIXEL_SIZE, TILE_PIXEL_SIZE),
                );

                painter.image(
                    texture.id(),
                    tile_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
        }

        // Handle dragging with Mercator distortion correction
        if response.dragged() {
            let delta = response.drag_delta();

            let scale = 2.0_f64.powf(self.map_zoom_level as f64);
            let lat_per_pixel = 180.0 / (TILE_PIXEL_SIZE as f64 * scale);
            let lon_per_pixel = 360.0 / (TILE_PIXEL_SIZE as f64 * scale);

            let cos_lat = self.map_center_lat.to_radians().cos();

            self.map_center_lat += delta.y as f64 * lat_per_pixel;
            self.map_center_lon -= delta.x as f64 * lon_per_pixel / cos_lat.max(0.1);

            self.map_center_lat = self.map_center_lat.clamp(-85.0, 85.0);
        }

        let center_lat = self.map_center_lat;
        let center_lon = self.map_center_lon;
        let to_screen = move |lat: f64, lon: f64| -> egui::Pos2 {
            let tile_x = WebMercator::lon_to_x(lon, tile_zoom_level);
            let tile_y = WebMercator::lat_to_y(lat, tile_zoom_level);

            let center_tile_x = WebMercator::lon_to_x(center_lon, tile_zoom_level);
            let center_tile_y = WebMercator::lat_to_y(center_lat, tile_zoom_level);

            let pixel_x = (tile_x - center_tile_x) * TILE_PIXEL_SIZE as f64;
            let pixel_y = (tile_y - center_tile_y) * TILE_PIXEL_SIZE as f64;

            egui::pos2(center.x + pixel_x as f32, center.y + pixel_y as f32)
        };

        // Draw one marker per building; nothing is drawn unless the fetch
        // finished successfully
        if let Some(buildings) = self.loaded_buildings() {
            for (index, building) in buildings.iter().enumerate() {
                let pos = to_screen(building.latitude, building.longitude);
                if !rect.expand(40.0).contains(pos) {
                    continue;
                }

                let selected = self.selected_building == Some(index);
                let icon = self.icon_resolver.resolve(building);

                if let Some(texture) = self.marker_textures.get_or_load(ui.ctx(), &icon) {
                    if selected {
                        painter.circle_filled(
                            pos,
                            MARKER_CLICK_RADIUS,
                            egui::Color32::from_rgba_unmultiplied(255, 160, 60, 90),
                        );
                    }
                    painter.image(
                        texture.id(),
                        icon.rect_at(pos),
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                } else {
                    crate::map::markers::draw_fallback_pin(&painter, pos, selected);
                }

                if selected {
                    draw_marker_label(&painter, pos, building);
                }

                if response.clicked() {
                    if let Some(click_pos) = response.interact_pointer_pos() {
                        if click_pos.distance(pos) <= MARKER_CLICK_RADIUS {
                            self.selected_building = Some(index);
                        }
                    }
                }
            }
        }

        painter.text(
            rect.left_top() + egui::vec2(10.0, 10.0),
            egui::Align2::LEFT_TOP,
            "Drag to pan | Pinch to zoom",
            egui::FontId::proportional(12.0),
            egui::Color32::BLACK,
        );

        // Attribution for the active base layer
        painter.text(
            rect.right_bottom() + egui::vec2(-10.0, -10.0),
            egui::Align2::RIGHT_BOTTOM,
            self.active_layer.attribution(),
            egui::FontId::proportional(10.0),
            egui::Color32::from_black_alpha(180),
        );

        if let Some((message, is_error)) = self.status_message(tile_manager_status(
            self.tile_managers.get(&self.active_layer),
        )) {
            draw_status_bubble(&painter, rect, &message, is_error);
        }
    }

    /// Status text for the bubble at the top of the map, most severe first.
    fn status_message(&self, tile_status: TileStatus) -> Option<(String, bool)> {
        match &*self.fetch_state.lock().unwrap() {
            FetchState::Failed(reason) => {
                return Some((format!("Buildings unavailable: {reason}"), true));
            }
            FetchState::Pending => return Some(("Loading buildings...".to_owned(), false)),
            FetchState::Loaded(_) => {}
        }

        match tile_status {
            TileStatus::Errors(count) => Some((format!("Failed to load {count} tiles"), true)),
            TileStatus::Loading => Some(("Loading map tiles...".to_owned(), false)),
            TileStatus::Idle => None,
        }
    }

    fn draw_layer_switcher(&mut self, ctx: &egui::Context) {
        let previous_layer = self.active_layer;
        egui::Window::new("Base Layer")
            .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 40.0))
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| {
                for layer in BaseLayer::ALL {
                    ui.radio_value(&mut self.active_layer, layer, layer.display_name());
                }
            });

        // Remember the choice for the next run
        if self.active_layer != previous_layer {
            self.config.base_layer = self.active_layer;
            if let Err(e) = self.config.save() {
                warn!("failed to save config: {e}");
            }
        }
    }

    fn draw_building_list(&mut self, ctx: &egui::Context) {
        let screen_height = ctx.content_rect().height();
        egui::Window::new("Buildings")
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
            .default_width(300.0)
            .max_height(screen_height - 40.0)
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| {
                enum Summary {
                    Pending,
                    Failed(String),
                    Loaded(Vec<Building>, String),
                }

                let summary = match &*self.fetch_state.lock().unwrap() {
                    FetchState::Pending => Summary::Pending,
                    FetchState::Failed(reason) => Summary::Failed(reason.clone()),
                    FetchState::Loaded(collection) => Summary::Loaded(
                        collection.buildings.clone(),
                        collection.fetched_at.format("%H:%M:%S UTC").to_string(),
                    ),
                };

                match summary {
                    Summary::Pending => {
                        ui.label("Loading buildings...");
                    }
                    Summary::Failed(reason) => {
                        ui.colored_label(egui::Color32::from_rgb(220, 80, 80), reason);
                        if ui.button("Retry").clicked() {
                            self.retry_fetch(ctx);
                        }
                    }
                    Summary::Loaded(buildings, fetched_at) => {
                        ui.horizontal(|ui| {
                            ui.label(
                                egui::RichText::new(format!("TOTAL: {}", buildings.len()))
                                    .color(egui::Color32::from_rgb(150, 150, 150))
                                    .size(10.0)
                                    .monospace(),
                            );
                            ui.label(
                                egui::RichText::new(format!("fetched {fetched_at}"))
                                    .color(egui::Color32::from_rgb(120, 120, 120))
                                    .size(10.0),
                            );
                        });
                        ui.add_space(4.0);
                        self.draw_building_entries(ui, &buildings);
                    }
                }
            });
    }

    fn draw_building_entries(&mut self, ui: &mut egui::Ui, buildings: &[Building]) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.push_id("building_list", |ui| {
                for (index, building) in buildings.iter().enumerate() {
                    let is_selected = self.selected_building == Some(index);

                    let frame = if is_selected {
                        egui::Frame::group(ui.style())
                            .fill(egui::Color32::from_rgba_unmultiplied(100, 140, 180, 60))
                    } else {
                        egui::Frame::group(ui.style())
                    };

                    let response = frame.show(ui, |ui| {
                        ui.horizontal(|ui| {
                            let (occupancy_color, occupancy_symbol) = match building.occupancy {
                                Some(true) => (egui::Color32::from_rgb(220, 100, 100), "●"),
                                Some(false) => (egui::Color32::from_rgb(100, 220, 100), "○"),
                                None => (egui::Color32::from_rgb(150, 150, 150), "─"),
                            };
                            ui.label(
                                egui::RichText::new(occupancy_symbol)
                                    .color(occupancy_color)
                                    .size(12.0),
                            );
                            ui.label(
                                egui::RichText::new(building.label())
                                    .color(egui::Color32::from_rgb(200, 220, 255))
                                    .size(11.0)
                                    .strong(),
                            );
                        });

                        if let Some(ref rent) = building.rent {
                            ui.label(
                                egui::RichText::new(format!("RENT {rent}"))
                                    .color(egui::Color32::from_rgb(180, 180, 180))
                                    .size(9.0)
                                    .monospace(),
                            );
                        }

                        ui.label(
                            egui::RichText::new(format!(
                                "{:>8.4}° {:>9.4}°",
                                building.latitude, building.longitude
                            ))
                            .color(egui::Color32::from_rgb(120, 120, 120))
                            .size(8.5)
                            .monospace(),
                        );
                    });

                    if response.response.clicked() {
                        self.selected_building = Some(index);
                        self.map_center_lat = building.latitude;
                        self.map_center_lon = building.longitude;
                    }

                    ui.add_space(3.0);
                }
            });
        });
    }
}

impl eframe::App for BuildingsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.draw_map(ui);
            });

        self.draw_layer_switcher(ctx);
        self.draw_building_list(ctx);
    }
}

fn client_config(config: &AppConfig) -> ClientConfig {
    ClientConfig {
        base_url: config.api_url.clone(),
        timeout: Duration::from_secs(config.fetch_timeout_secs),
    }
}

enum TileStatus {
    Idle,
    Loading,
    Errors(usize),
}

fn tile_manager_status(manager: Option<&TileManager>) -> TileStatus {
    match manager {
        Some(manager) if manager.error_count() > 0 => TileStatus::Errors(manager.error_count()),
        Some(manager) if manager.has_loading_tiles() => TileStatus::Loading,
        _ => TileStatus::Idle,
    }
}

fn draw_marker_label(painter: &egui::Painter, pos: egui::Pos2, building: &Building) {
    let mut text = building.label();
    if let Some(ref rent) = building.rent {
        text.push_str(&format!(" | {rent}"));
    }

    let text_pos = pos + egui::vec2(10.0, -12.0);
    let galley = painter.layout_no_wrap(
        text.clone(),
        egui::FontId::proportional(11.0),
        egui::Color32::WHITE,
    );

    let padding = egui::vec2(3.0, 2.0);
    let box_rect = egui::Rect::from_min_size(
        text_pos - egui::vec2(padding.x, galley.size().y / 2.0 + padding.y),
        galley.size() + padding * 2.0,
    );
    painter.rect_filled(
        box_rect,
        egui::CornerRadius::same(2),
        egui::Color32::from_rgba_unmultiplied(0, 0, 0, 180),
    );

    painter.text(
        text_pos,
        egui::Align2::LEFT_CENTER,
        text,
        egui::FontId::proportional(11.0),
        egui::Color32::WHITE,
    );
}

fn draw_status_bubble(painter: &egui::Painter, rect: egui::Rect, message: &str, is_error: bool) {
    let bg_color = if is_error {
        egui::Color32::from_rgb(220, 50, 50)
    } else {
        egui::Color32::from_rgb(255, 200, 100)
    };

    let bubble_pos = rect.center_top() + egui::vec2(0.0, 20.0);
    let galley = painter.layout_no_wrap(
        message.to_owned(),
        egui::FontId::proportional(12.0),
        egui::Color32::WHITE,
    );

    let padding = egui::vec2(12.0, 6.0);
    let bubble_rect = egui::Rect::from_center_size(bubble_pos, galley.size() + padding * 2.0);

    painter.rect_filled(bubble_rect, egui::CornerRadius::same(5), bg_color);
    painter.text(
        bubble_pos,
        egui::Align2::CENTER_CENTER,
        message,
        egui::FontId::proportional(12.0),
        egui::Color32::WHITE,
    );
}
