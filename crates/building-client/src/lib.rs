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

//! Client library for the rentals management buildings API.
//!
//! This library fetches building locations from the REST endpoint served by
//! the rentals management backend and decodes them into plain Rust types.
//! It has two layers that can be used independently:
//!
//! - **Client layer**: one HTTP GET with a configured timeout, returning a
//!   tagged result. Network failures, non-2xx statuses, and malformed bodies
//!   are distinct [`FetchError`] variants; error text is never handed to the
//!   GeoJSON parser.
//! - **Collection layer**: GeoJSON decoding into [`BuildingCollection`].
//!   The backend double-encodes its body (a JSON string containing GeoJSON),
//!   so the decoder accepts both the wrapped and the raw form. Features with
//!   a missing or non-point geometry are skipped with a warning, never a
//!   failure.
//!
//! # Quick start
//!
//! ```no_run
//! use building_client::{BuildingClient, ClientConfig};
//!
//! # async fn run() -> Result<(), building_client::FetchError> {
//! let client = BuildingClient::new(ClientConfig::default())?;
//! let collection = client.fetch_buildings().await?;
//! for building in &collection.buildings {
//!     println!("{:?}: {}, {}", building.district, building.latitude, building.longitude);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod collection;

pub use client::{BuildingClient, ClientConfig, FetchError, DEFAULT_API_URL};
pub use collection::{Building, BuildingCollection};
