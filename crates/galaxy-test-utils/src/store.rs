// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`PluginStore`] for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use galaxy_core::{GalaxyError, PluginId, PluginIdentity, PluginStatus, PluginStore};

#[derive(Debug, Clone)]
struct Installation {
    identity: PluginIdentity,
    status: Option<PluginStatus>,
}

/// A [`PluginStore`] backed by a map. IDs are assigned from 1 upward unless
/// inserted explicitly.
#[derive(Debug, Default)]
pub struct MemoryPluginStore {
    installations: Mutex<BTreeMap<PluginId, Installation>>,
    failing: AtomicBool,
}

impl MemoryPluginStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an installation under a fixed ID.
    pub fn insert(&self, id: PluginId, identity: PluginIdentity, status: Option<PluginStatus>) {
        self.installations
            .lock()
            .unwrap()
            .insert(id, Installation { identity, status });
    }

    /// Make every subsequent call fail with a persistence error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Status as last written, for assertions.
    pub fn status_of(&self, id: PluginId) -> Option<PluginStatus> {
        self.installations
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|i| i.status)
    }

    pub fn len(&self) -> usize {
        self.installations.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), GalaxyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GalaxyError::persistence("store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl PluginStore for MemoryPluginStore {
    async fn find_plugin_id(
        &self,
        identity: &PluginIdentity,
    ) -> Result<Option<PluginId>, GalaxyError> {
        self.check()?;
        Ok(self
            .installations
            .lock()
            .unwrap()
            .iter()
            .find(|(_, i)| &i.identity == identity)
            .map(|(id, _)| *id))
    }

    async fn is_installed(&self, id: PluginId) -> Result<bool, GalaxyError> {
        self.check()?;
        Ok(self.installations.lock().unwrap().contains_key(&id))
    }

    async fn plugin_status(&self, id: PluginId) -> Result<Option<PluginStatus>, GalaxyError> {
        self.check()?;
        Ok(self.status_of(id))
    }

    async fn set_plugin_status(
        &self,
        id: PluginId,
        status: PluginStatus,
    ) -> Result<(), GalaxyError> {
        self.check()?;
        match self.installations.lock().unwrap().get_mut(&id) {
            Some(installation) => {
                installation.status = Some(status);
                Ok(())
            }
            None => Err(GalaxyError::persistence(format!(
                "plugin {id} is not installed"
            ))),
        }
    }

    async fn create_installation(
        &self,
        identity: &PluginIdentity,
        status: PluginStatus,
    ) -> Result<PluginId, GalaxyError> {
        if let Some(id) = self.find_plugin_id(identity).await? {
            return Ok(id);
        }
        let mut installations = self.installations.lock().unwrap();
        let id = PluginId(installations.keys().last().map_or(1, |last| last.0 + 1));
        installations.insert(
            id,
            Installation {
                identity: identity.clone(),
                status: Some(status),
            },
        );
        Ok(id)
    }

    async fn delete_installation(&self, id: PluginId) -> Result<(), GalaxyError> {
        self.check()?;
        self.installations.lock().unwrap().remove(&id);
        Ok(())
    }
}
