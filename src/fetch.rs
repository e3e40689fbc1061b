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

//! Background building fetch.
//!
//! The fetch runs once per app start on its own thread. The result lands in
//! a shared [`FetchState`] and the UI is woken with a repaint request. A
//! failed fetch is terminal until the user explicitly retries; the map keeps
//! showing tiles only.

use std::sync::{Arc, Mutex};

use building_client::{BuildingClient, ClientConfig};
use log::{info, warn};

/// Lifecycle of the one-shot building fetch.
#[derive(Debug)]
pub enum FetchState {
    /// Request in flight (or not started yet).
    Pending,
    /// Fetch and decode succeeded.
    Loaded(building_client::BuildingCollection),
    /// Fetch failed; human-readable reason for the status bubble.
    Failed(String),
}

impl FetchState {
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchState::Failed(_))
    }
}

/// Spawn the fetch thread, storing its tagged result into `state`.
pub fn spawn_fetch(state: Arc<Mutex<FetchState>>, config: ClientConfig, ctx: egui::Context) {
    std::thread::spawn(move || {
        let result = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(async {
                let client = BuildingClient::new(config)?;
                client.fetch_buildings().await
            }),
            Err(e) => {
                warn!("failed to start fetch runtime: {e}");
                *state.lock().unwrap() = FetchState::Failed(e.to_string());
                ctx.request_repaint();
                return;
            }
        };

        let next = match result {
            Ok(collection) => {
                info!(
                    "loaded {} buildings ({} features skipped)",
                    collection.len(),
                    collection.skipped
                );
                FetchState::Loaded(collection)
            }
            Err(e) => {
                warn!("building fetch failed: {e}");
                FetchState::Failed(e.to_string())
            }
        };

        *state.lock().unwrap() = next;
        ctx.request_repaint();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    fn serve_once(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/api/v1/building/")
    }

    fn wait_for_settled(state: &Arc<Mutex<FetchState>>) {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            {
                let state = state.lock().unwrap();
                if !matches!(*state, FetchState::Pending) {
                    return;
                }
            }
            assert!(Instant::now() < deadline, "fetch never settled");
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_successful_fetch_reaches_loaded() {
        let url = serve_once(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[36.82,-1.29]},"properties":{}}]}"#,
        );
        let state = Arc::new(Mutex::new(FetchState::Pending));
        spawn_fetch(
            state.clone(),
            ClientConfig {
                base_url: url,
                timeout: Duration::from_secs(5),
            },
            egui::Context::default(),
        );

        wait_for_settled(&state);
        let settled = state.lock().unwrap();
        match &*settled {
            FetchState::Loaded(collection) => assert_eq!(collection.len(), 1),
            FetchState::Failed(e) => panic!("fetch failed: {e}"),
            FetchState::Pending => unreachable!(),
        }
    }

    #[test]
    fn test_refused_connection_reaches_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let state = Arc::new(Mutex::new(FetchState::Pending));
        spawn_fetch(
            state.clone(),
            ClientConfig {
                base_url: format!("http://{addr}/api/v1/building/"),
                timeout: Duration::from_secs(5),
            },
            egui::Context::default(),
        );

        wait_for_settled(&state);
        assert!(state.lock().unwrap().is_failed());
    }
}
