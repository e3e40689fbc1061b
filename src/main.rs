//! Buildings map viewer.
//!
//! Renders an interactive map of rental buildings served by the rentals
//! management API: two selectable base tile layers, one background fetch of
//! the building list, one marker per building.

mod app;
mod config;
mod fetch;
mod map;

use app::BuildingsApp;
use clap::Parser;
use config::AppConfig;
use eframe::egui;
use log::{info, warn};
use map::BaseLayer;

#[derive(Parser, Debug)]
#[command(name = "buildings-map", version, about = "Interactive map of rental buildings")]
struct Args {
    /// Buildings API endpoint (overrides the config file for this session)
    #[arg(long)]
    api_url: Option<String>,

    /// Initial map center latitude
    #[arg(long)]
    lat: Option<f64>,

    /// Initial map center longitude
    #[arg(long)]
    lon: Option<f64>,

    /// Initial zoom level
    #[arg(long)]
    zoom: Option<f32>,

    /// Base tile layer shown at startup
    #[arg(long, value_enum)]
    layer: Option<BaseLayer>,
}

fn main() -> Result<(), eframe::Error> {
    env_logger::init();
    let args = Args::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("failed to load config, using defaults: {e}");
        AppConfig::default()
    });
    if let Ok(path) = AppConfig::get_config_path() {
        info!("config file: {}", path.display());
    }

    // CLI flags override the config for this session only
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }
    if let Some(lat) = args.lat {
        config.center_lat = lat;
    }
    if let Some(lon) = args.lon {
        config.center_lon = lon;
    }
    if let Some(zoom) = args.zoom {
        config.default_zoom = zoom;
    }
    if let Some(layer) = args.layer {
        config.base_layer = layer;
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Buildings Map"),
        ..Default::default()
    };

    eframe::run_native(
        "Buildings Map",
        options,
        Box::new(move |cc| Ok(Box::new(BuildingsApp::new(config, &cc.egui_ctx)))),
    )
}
