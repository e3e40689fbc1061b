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

//! HTTP client for the buildings API.
//!
//! Issues a single GET with a bounded timeout and returns a tagged result.
//! Every failure mode is a distinct [`FetchError`] variant, so callers can
//! always tell a failed fetch from a successful empty collection.

use std::time::Duration;

use geojson::GeoJson;
use log::debug;
use reqwest::StatusCode;
use thiserror::Error;

use crate::collection::BuildingCollection;

/// Default endpoint served by the rentals management backend.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/v1/building/";

/// Default request timeout. A hung connection fails instead of waiting forever.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while fetching and decoding building data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response: refused connection, DNS
    /// failure, or timeout.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server returned HTTP {0}")]
    Status(StatusCode),

    /// The response body is not GeoJSON in either the raw or the
    /// string-wrapped form.
    #[error("response body is not valid GeoJSON: {0}")]
    Malformed(String),

    /// The body is valid GeoJSON but not a `FeatureCollection`.
    #[error("expected a FeatureCollection, got a {0}")]
    NotACollection(&'static str),
}

/// Connection settings for [`BuildingClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full URL of the building list endpoint.
    pub base_url: String,
    /// Timeout applied to the whole request.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Client for the buildings endpoint.
#[derive(Debug, Clone)]
pub struct BuildingClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl BuildingClient {
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Fetch the full building list.
    ///
    /// One GET, no retries. The caller decides whether and when to try again.
    pub async fn fetch_buildings(&self) -> Result<BuildingCollection, FetchError> {
        debug!("fetching buildings from {}", self.config.base_url);

        let response = self.http.get(&self.config.base_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        match decode_body(&body)? {
            GeoJson::FeatureCollection(fc) => Ok(BuildingCollection::from_features(fc)),
            GeoJson::Feature(_) => Err(FetchError::NotACollection("Feature")),
            GeoJson::Geometry(_) => Err(FetchError::NotACollection("Geometry")),
        }
    }
}

/// Decode a response body as GeoJSON.
///
/// The backend serializes with Django's geojson serializer and then wraps the
/// result in a DRF `Response`, so the body on the wire is usually a JSON
/// string *containing* GeoJSON. Raw GeoJSON is accepted too.
fn decode_body(body: &str) -> Result<GeoJson, FetchError> {
    match body.parse::<GeoJson>() {
        Ok(geojson) => Ok(geojson),
        Err(direct_err) => match serde_json::from_str::<String>(body) {
            Ok(inner) => inner
                .parse::<GeoJson>()
                .map_err(|e| FetchError::Malformed(e.to_string())),
            Err(_) => Err(FetchError::Malformed(direct_err.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    const ONE_BUILDING: &str = r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[36.82,-1.29]},"properties":{}}]}"#;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Runtime::new().unwrap().block_on(future)
    }

    /// Serve one canned HTTP response on an ephemeral port, returning the URL.
    fn serve_once(status_line: &str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let status_line = status_line.to_owned();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/api/v1/building/")
    }

    fn fetch_from(url: String) -> Result<BuildingCollection, FetchError> {
        let client = BuildingClient::new(ClientConfig {
            base_url: url,
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        block_on(client.fetch_buildings())
    }

    #[test]
    fn test_fetch_ok() {
        let url = serve_once("200 OK", ONE_BUILDING.to_owned());
        let collection = fetch_from(url).unwrap();
        assert_eq!(collection.len(), 1);
        assert!((collection.buildings[0].latitude - -1.29).abs() < 1e-9);
        assert!((collection.buildings[0].longitude - 36.82).abs() < 1e-9);
    }

    #[test]
    fn test_fetch_double_encoded_body() {
        // The real backend sends the GeoJSON as a JSON string
        let wrapped = serde_json::to_string(ONE_BUILDING).unwrap();
        let url = serve_once("200 OK", wrapped);
        let collection = fetch_from(url).unwrap();
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_fetch_empty_collection_is_ok() {
        let url = serve_once(
            "200 OK",
            r#"{"type":"FeatureCollection","features":[]}"#.to_owned(),
        );
        let collection = fetch_from(url).unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_non_ok_status_is_a_failure() {
        let url = serve_once("500 Internal Server Error", String::new());
        match fetch_from(url) {
            Err(FetchError::Status(status)) => assert_eq!(status.as_u16(), 500),
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[test]
    fn test_not_found_status() {
        let url = serve_once("404 Not Found", r#"{"detail":"not found"}"#.to_owned());
        match fetch_from(url) {
            Err(FetchError::Status(status)) => assert_eq!(status.as_u16(), 404),
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[test]
    fn test_connection_refused_is_transport() {
        // Bind to learn a free port, then drop the listener before fetching
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        match fetch_from(format!("http://{addr}/api/v1/building/")) {
            Err(FetchError::Transport(_)) => {}
            other => panic!("expected Transport error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_collection_body() {
        let url = serve_once(
            "200 OK",
            r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},"properties":{}}"#
                .to_owned(),
        );
        match fetch_from(url) {
            Err(FetchError::NotACollection(kind)) => assert_eq!(kind, "Feature"),
            other => panic!("expected NotACollection error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_body() {
        let url = serve_once("200 OK", "status: 500".to_owned());
        assert!(matches!(fetch_from(url), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_decode_body_rejects_error_text() {
        // A quoted error message is a valid JSON string but not GeoJSON; it
        // must never reach the renderer as data
        assert!(matches!(
            decode_body(r#""connection refused""#),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_body_accepts_both_forms() {
        assert!(decode_body(ONE_BUILDING).is_ok());
        let wrapped = serde_json::to_string(ONE_BUILDING).unwrap();
        assert!(decode_body(&wrapped).is_ok());
    }
}
