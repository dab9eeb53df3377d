// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed store behavior across reopen.

use galaxy_core::{PluginIdentity, PluginStatus, PluginStore};
use galaxy_storage::SqlitePluginStore;

fn identity() -> PluginIdentity {
    PluginIdentity {
        name: "pod-viewer".to_string(),
        version: "0.3.1".to_string(),
        author: "Ops".to_string(),
        description: "Lists pods".to_string(),
    }
}

#[tokio::test]
async fn status_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/galaxy.db");

    let id = {
        let store = SqlitePluginStore::open(&path).await.unwrap();
        let id = store
            .create_installation(&identity(), PluginStatus::Active)
            .await
            .unwrap();
        store
            .set_plugin_status(id, PluginStatus::Inactive)
            .await
            .unwrap();
        id
    };

    let store = SqlitePluginStore::open(&path).await.unwrap();
    assert_eq!(store.find_plugin_id(&identity()).await.unwrap(), Some(id));
    assert_eq!(
        store.plugin_status(id).await.unwrap(),
        Some(PluginStatus::Inactive)
    );
}

#[tokio::test]
async fn store_is_usable_as_trait_object() {
    let store: std::sync::Arc<dyn PluginStore> =
        std::sync::Arc::new(SqlitePluginStore::open_in_memory().await.unwrap());
    let id = store
        .create_installation(&identity(), PluginStatus::Inactive)
        .await
        .unwrap();
    assert!(store.is_installed(id).await.unwrap());
    store.delete_installation(id).await.unwrap();
    assert!(!store.is_installed(id).await.unwrap());
}
