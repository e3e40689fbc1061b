//! Map rendering: base layers, tile management, and markers.
//!
//! This module provides the tile layer registry, tile fetching and caching
//! with Web Mercator projection, and marker icon handling.

pub mod layers;
pub mod markers;
pub mod tiles;

pub use layers::BaseLayer;
pub use markers::{DefaultIconResolver, IconResolver, MarkerTextures};
pub use tiles::{TileManager, WebMercator};
