// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kubernetes API stand-in.

use std::sync::Mutex;
use std::time::Duration;

use galaxy_bridge::{KubeApi, KubeRequest, KubeResponse};
use galaxy_core::GalaxyError;
use serde_json::{Value, json};

/// Answers every request with a fixed response and records what was asked.
#[derive(Debug)]
pub struct StubKube {
    response: KubeResponse,
    requests: Mutex<Vec<KubeRequest>>,
    delay: Duration,
}

impl Default for StubKube {
    fn default() -> Self {
        Self::with_body(json!({"kind": "PodList", "items": []}))
    }
}

impl StubKube {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(body: Value) -> Self {
        Self {
            response: KubeResponse { status: 200, body },
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<KubeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl KubeApi for StubKube {
    fn call(&self, request: &KubeRequest) -> Result<KubeResponse, GalaxyError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(self.response.clone())
    }
}
