// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin manager lifecycle tests against real guest modules.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use galaxy_bridge::PluginRuntime;
use galaxy_core::{GalaxyError, HttpMethod, PluginId, PluginStatus, RouteRecord};
use galaxy_plugin::PluginManager;
use galaxy_test_utils::fixtures::{self, STATUS_BODY};
use galaxy_test_utils::{MemoryPluginStore, PluginDirBuilder, StubKube};
use serde_json::{Value, json};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    store: Arc<MemoryPluginStore>,
    kube: Arc<StubKube>,
    manager: PluginManager,
}

impl Fixture {
    fn new() -> Self {
        Self::with_kube(StubKube::new())
    }

    fn with_kube(kube: StubKube) -> Self {
        let store = Arc::new(MemoryPluginStore::new());
        let kube = Arc::new(kube);
        let manager = PluginManager::new(
            PluginRuntime::new().unwrap(),
            store.clone(),
            kube.clone(),
        );
        Self {
            dir: TempDir::new().unwrap(),
            store,
            kube,
            manager,
        }
    }

    fn builder(&self, name: &str, id: i64) -> PluginDirBuilder {
        PluginDirBuilder::new(self.dir.path(), name, PluginId(id))
    }

    fn install(&self, builder: PluginDirBuilder, status: Option<PluginStatus>) -> PathBuf {
        self.store.insert(builder.id(), builder.identity(), status);
        builder.build()
    }
}

fn status_plugin(fx: &Fixture, id: i64) -> PathBuf {
    fx.install(
        fx.builder("status", id).route("GET", "/status", "status_handler"),
        None,
    )
}

#[tokio::test]
async fn load_then_invoke_route_handler() {
    let fx = Fixture::new();
    let folder = status_plugin(&fx, 1);

    let plugin = fx.manager.load(&folder).await.unwrap();
    assert_eq!(plugin.id(), PluginId(1));
    assert_eq!(plugin.status(), PluginStatus::Active);

    let resolved = fx
        .manager
        .resolve(PluginId(1), HttpMethod::Get, "/status")
        .unwrap()
        .expect("route registered");
    assert_eq!(resolved.handler, "status_handler");
    let out = resolved.plugin.invoke(&resolved.handler, b"{}").unwrap();
    assert_eq!(out, STATUS_BODY.as_bytes());
}

#[tokio::test]
async fn disable_marks_plugin_inactive_and_persists() {
    let fx = Fixture::new();
    let folder = status_plugin(&fx, 2);
    fx.manager.load(&folder).await.unwrap();

    fx.manager.disable(PluginId(2)).await.unwrap();
    let resolved = fx
        .manager
        .resolve(PluginId(2), HttpMethod::Get, "/status")
        .unwrap()
        .unwrap();
    assert!(!resolved.plugin.is_active());
    assert_eq!(fx.store.status_of(PluginId(2)), Some(PluginStatus::Inactive));

    fx.manager.enable(PluginId(2)).await.unwrap();
    assert!(resolved.plugin.is_active());
    assert_eq!(fx.store.status_of(PluginId(2)), Some(PluginStatus::Active));
}

#[tokio::test]
async fn status_change_for_unknown_plugin_fails() {
    let fx = Fixture::new();
    let err = fx.manager.disable(PluginId(99)).await.unwrap_err();
    assert!(matches!(err, GalaxyError::PluginNotFound(PluginId(99))));
}

#[tokio::test]
async fn failed_persist_leaves_status_unchanged() {
    let fx = Fixture::new();
    let folder = status_plugin(&fx, 3);
    let plugin = fx.manager.load(&folder).await.unwrap();

    fx.store.set_failing(true);
    let err = fx.manager.disable(PluginId(3)).await.unwrap_err();
    assert!(matches!(err, GalaxyError::Persistence { .. }));
    assert!(plugin.is_active());
}

#[tokio::test]
async fn initial_status_comes_from_store() {
    let fx = Fixture::new();
    let folder = fx.install(
        fx.builder("sleepy", 4).route("GET", "/status", "status_handler"),
        Some(PluginStatus::Inactive),
    );
    let plugin = fx.manager.load(&folder).await.unwrap();
    assert_eq!(plugin.status(), PluginStatus::Inactive);
}

#[tokio::test]
async fn loading_twice_keeps_one_instance_and_closes_the_first() {
    let fx = Fixture::new();
    let folder = status_plugin(&fx, 5);

    let first = fx.manager.load(&folder).await.unwrap();
    let second = fx.manager.load(&folder).await.unwrap();

    assert!(first.is_closed());
    assert!(!second.is_closed());
    assert_eq!(fx.manager.list().unwrap().len(), 1);
    assert!(Arc::ptr_eq(&fx.manager.get(PluginId(5)).unwrap().unwrap(), &second));
    assert_eq!(fx.manager.routes(PluginId(5)).unwrap().len(), 1);
    assert!(matches!(
        first.invoke("status_handler", b""),
        Err(GalaxyError::PluginNotFound(_))
    ));
}

#[tokio::test]
async fn failed_reload_keeps_previous_instance() {
    let fx = Fixture::new();
    let folder = status_plugin(&fx, 6);
    let original = fx.manager.load(&folder).await.unwrap();

    std::fs::write(folder.join("status.wasm"), fixtures::invalid_wasm()).unwrap();
    let err = fx.manager.load(&folder).await.unwrap_err();
    assert!(matches!(err, GalaxyError::Binary { .. }));

    assert!(!original.is_closed());
    let out = fx
        .manager
        .invoke(PluginId(6), "status_handler", b"")
        .unwrap();
    assert_eq!(out, STATUS_BODY.as_bytes());
}

#[tokio::test]
async fn register_routes_is_idempotent() {
    let fx = Fixture::new();
    let folder = fx.install(
        fx.builder("routes", 7)
            .route("GET", "/status", "status_handler")
            .route("POST", "/echo", "echo"),
        None,
    );
    let plugin = fx.manager.load(&folder).await.unwrap();

    assert!(!fx.manager.register_routes(&plugin).unwrap());
    let routes = fx.manager.routes(PluginId(7)).unwrap();
    assert_eq!(
        routes,
        vec![
            RouteRecord {
                method: HttpMethod::Get,
                path: "/status".into()
            },
            RouteRecord {
                method: HttpMethod::Post,
                path: "/echo".into()
            },
        ]
    );
}

#[tokio::test]
async fn disabled_backend_registers_no_routes() {
    let fx = Fixture::new();
    let folder = fx.install(
        fx.builder("quiet", 8)
            .route("GET", "/status", "status_handler")
            .backend_enabled(false),
        None,
    );
    fx.manager.load(&folder).await.unwrap();
    assert!(fx.manager.routes(PluginId(8)).unwrap().is_empty());
}

#[tokio::test]
async fn uninstalled_plugin_fails_with_persistence_error() {
    let fx = Fixture::new();
    let folder = fx.builder("stranger", 9).build();
    let err = fx.manager.load(&folder).await.unwrap_err();
    assert!(matches!(err, GalaxyError::Persistence { .. }));
    assert!(err.to_string().contains("not installed"));
    assert!(fx.manager.list().unwrap().is_empty());
}

#[tokio::test]
async fn folder_id_must_match_installation() {
    let fx = Fixture::new();
    let builder = fx.builder("moved", 10);
    fx.store.insert(PluginId(11), builder.identity(), None);
    let folder = builder.build();

    let err = fx.manager.load(&folder).await.unwrap_err();
    assert!(matches!(err, GalaxyError::Persistence { .. }));
}

#[tokio::test]
async fn missing_binary_is_binary_error() {
    let fx = Fixture::new();
    let folder = fx.install(fx.builder("hollow", 12).without_wasm(), None);
    let err = fx.manager.load(&folder).await.unwrap_err();
    assert!(matches!(err, GalaxyError::Binary { .. }));
    assert!(!fx.manager.is_loaded(PluginId(12)).unwrap());
}

#[tokio::test]
async fn manifest_wasm_override_is_used() {
    let fx = Fixture::new();
    let folder = fx.install(fx.builder("custom", 13).wasm_file("main.wasm"), None);
    assert!(folder.join("main.wasm").is_file());
    fx.manager.load(&folder).await.unwrap();
}

#[tokio::test]
async fn entrypoint_runs_on_load() {
    let fx = Fixture::new();
    let folder = fx.install(fx.builder("booted", 14).entrypoint("init"), None);
    let plugin = fx.manager.load(&folder).await.unwrap();
    assert_eq!(plugin.storage_value("boot").as_deref(), Some("yes"));
}

#[tokio::test]
async fn failing_entrypoint_aborts_load() {
    let fx = Fixture::new();
    let folder = fx.install(
        fx.builder("crashy", 15)
            .entrypoint("init")
            .route("GET", "/status", "status_handler")
            .wasm(fixtures::failing_init_guest()),
        None,
    );
    let err = fx.manager.load(&folder).await.unwrap_err();
    assert!(matches!(err, GalaxyError::Binary { .. }));
    assert!(!fx.manager.is_loaded(PluginId(15)).unwrap());
    assert!(fx.manager.routes(PluginId(15)).unwrap().is_empty());
}

#[tokio::test]
async fn memory_limit_below_initial_memory_fails() {
    let fx = Fixture::new();
    let folder = fx.install(fx.builder("tight", 16).memory_limit("64Ki"), None);
    let err = fx.manager.load(&folder).await.unwrap_err();
    assert!(matches!(err, GalaxyError::Binary { .. }));
}

#[tokio::test]
async fn unload_removes_instance_and_routes() {
    let fx = Fixture::new();
    let folder = status_plugin(&fx, 17);
    let plugin = fx.manager.load(&folder).await.unwrap();

    assert!(fx.manager.unload(PluginId(17)).unwrap());
    assert!(plugin.is_closed());
    assert!(fx.manager.routes(PluginId(17)).unwrap().is_empty());
    assert!(fx
        .manager
        .resolve(PluginId(17), HttpMethod::Get, "/status")
        .unwrap()
        .is_none());

    assert!(!fx.manager.unload(PluginId(17)).unwrap());
    assert!(!plugin.close());
}

#[tokio::test]
async fn unload_does_not_wait_for_a_busy_handler() {
    let fx = Fixture::with_kube(StubKube::new().with_delay(Duration::from_millis(600)));
    let folder = fx.install(fx.builder("busy", 24).permission("*"), None);
    let plugin = fx.manager.load(&folder).await.unwrap();

    let busy = Arc::clone(&plugin);
    let call = tokio::task::spawn_blocking(move || {
        busy.invoke("k8s_proxy", br#"{"path":"/api/v1/pods"}"#)
    });
    while fx.kube.requests().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let started = Instant::now();
    assert!(fx.manager.unload(PluginId(24)).unwrap());
    assert!(started.elapsed() < Duration::from_millis(200));
    assert!(plugin.is_closed());
    assert!(plugin.holds_instance());

    let out = call.await.unwrap().unwrap();
    let response: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(response["status"], 200);
    assert!(!plugin.holds_instance());
    assert!(matches!(
        plugin.invoke("echo", b"{}"),
        Err(GalaxyError::PluginNotFound(PluginId(24)))
    ));
}

#[tokio::test]
async fn manifest_wasm_path_outside_folder_is_refused() {
    let fx = Fixture::new();
    let outside = fx.install(fx.builder("donor", 25), None);
    let escape = outside.join("donor.wasm");
    let folder = fx.install(
        fx.builder("escape", 26)
            .wasm_file(escape.to_str().unwrap())
            .without_wasm(),
        None,
    );

    let err = fx.manager.load(&folder).await.unwrap_err();
    assert!(matches!(err, GalaxyError::Manifest { .. }));
    assert!(!fx.manager.is_loaded(PluginId(26)).unwrap());
}

#[tokio::test]
async fn uninstall_all_removes_every_installation() {
    let fx = Fixture::new();
    let a = status_plugin(&fx, 18);
    let b = fx.install(fx.builder("other", 19), None);
    fx.manager.load(&a).await.unwrap();
    fx.manager.load(&b).await.unwrap();

    fx.manager.uninstall_all().await.unwrap();
    assert!(fx.manager.list().unwrap().is_empty());
    assert!(fx.store.is_empty());
}

#[tokio::test]
async fn invoke_reports_missing_function_and_traps() {
    let fx = Fixture::new();
    let folder = status_plugin(&fx, 20);
    fx.manager.load(&folder).await.unwrap();

    assert!(matches!(
        fx.manager.invoke(PluginId(20), "nope", b""),
        Err(GalaxyError::FunctionNotFound { .. })
    ));
    assert!(matches!(
        fx.manager.invoke(PluginId(20), "trap", b""),
        Err(GalaxyError::Execution { .. })
    ));
    assert_eq!(fx.manager.invoke(PluginId(20), "empty", b"x").unwrap(), b"{}");
    assert!(matches!(
        fx.manager.invoke(PluginId(21), "echo", b""),
        Err(GalaxyError::PluginNotFound(PluginId(21)))
    ));
}

#[tokio::test]
async fn host_calls_respect_permissions_and_config() {
    let fx = Fixture::new();
    let folder = fx.install(
        fx.builder("kube", 22)
            .permission("/api/v1/pods")
            .config("namespace", json!("default"))
            .config("interval", json!(30)),
        None,
    );
    fx.manager.load(&folder).await.unwrap();

    let out = fx
        .manager
        .invoke(PluginId(22), "k8s_proxy", br#"{"path":"/api/v1/pods"}"#)
        .unwrap();
    let response: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(response["status"], 200);
    assert_eq!(fx.kube.requests().len(), 1);

    let denied = fx
        .manager
        .invoke(PluginId(22), "k8s_proxy", b"/api/v1/secrets")
        .unwrap();
    assert_eq!(denied, b"{}");
    assert_eq!(fx.kube.requests().len(), 1);

    let traversal = fx
        .manager
        .invoke(PluginId(22), "k8s_proxy", b"/api/v1/pods/%2e%2e/secrets")
        .unwrap();
    assert_eq!(traversal, b"{}");
    assert_eq!(fx.kube.requests().len(), 1);

    let config: Value =
        serde_json::from_slice(&fx.manager.invoke(PluginId(22), "get_config", b"").unwrap())
            .unwrap();
    assert_eq!(config, json!({"namespace": "default", "interval": 30}));
}

#[tokio::test]
async fn summaries_describe_loaded_plugins() {
    let fx = Fixture::new();
    let folder = status_plugin(&fx, 23);
    fx.manager.load(&folder).await.unwrap();

    let summaries = fx.manager.summaries().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].name, "status");
    assert_eq!(summaries[0].routes.len(), 1);

    let value = serde_json::to_value(&summaries[0]).unwrap();
    assert_eq!(value["status"], "active");
    assert_eq!(value["routes"][0]["method"], "GET");
    assert!(value.get("loadedAt").is_some());
}
