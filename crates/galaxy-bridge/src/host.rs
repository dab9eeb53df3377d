// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host functions exported to plugins in the `env` namespace.
//!
//! | import | signature | result |
//! |---|---|---|
//! | `host_k8s_api_call` | `(ptr, len) -> i64` | packed JSON response, 0 on failure |
//! | `host_log` | `(ptr, len)` | none |
//! | `host_get_config` | `(ptr) -> i64` | packed JSON object of configuration defaults |
//! | `host_storage_get` | `(ptr, len) -> i64` | packed value, 0 if absent |
//! | `host_storage_set` | `(kptr, klen, vptr, vlen) -> i32` | 1 stored, 0 rejected |
//!
//! None of these ever trap. Out-of-range pointers, invalid UTF-8, permission
//! denials and upstream errors are logged on the host and surface to the
//! guest as a zero result.

use std::collections::HashMap;
use std::sync::Arc;

use galaxy_core::{GalaxyError, PluginId};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use wasmtime::{Caller, Extern, Linker, StoreLimits, StoreLimitsBuilder};

use crate::abi::{GuestPtr, guest_len, pack};
use crate::kube::{KubeApi, KubeRequest};
use crate::memory::{self, ALLOCATE_EXPORT, GuestMemory};
use crate::permissions::Permissions;

/// Import namespace for every host function.
pub const HOST_MODULE: &str = "env";

/// Largest value `host_storage_set` accepts.
pub const MAX_STORAGE_VALUE_BYTES: usize = 1024 * 1024;

/// Most keys a single plugin may hold in host storage.
pub const MAX_STORAGE_KEYS: usize = 1024;

/// Configuration defaults exposed through `host_get_config`.
pub type PluginConfigValues = Map<String, Value>;

/// Per-plugin state carried by each wasmtime store.
pub struct HostState {
    plugin_id: PluginId,
    plugin_name: String,
    permissions: Permissions,
    config: PluginConfigValues,
    storage: HashMap<String, String>,
    kube: Arc<dyn KubeApi>,
    limits: StoreLimits,
}

impl HostState {
    pub fn new(
        plugin_id: PluginId,
        plugin_name: impl Into<String>,
        permissions: Permissions,
        config: PluginConfigValues,
        kube: Arc<dyn KubeApi>,
    ) -> Self {
        Self {
            plugin_id,
            plugin_name: plugin_name.into(),
            permissions,
            config,
            storage: HashMap::new(),
            kube,
            limits: StoreLimits::default(),
        }
    }

    /// Cap the guest's linear memory at `bytes`.
    pub fn with_memory_limit(mut self, bytes: Option<usize>) -> Self {
        let mut builder = StoreLimitsBuilder::new();
        if let Some(bytes) = bytes {
            builder = builder.memory_size(bytes);
        }
        self.limits = builder.build();
        self
    }

    pub fn plugin_id(&self) -> PluginId {
        self.plugin_id
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Value the plugin stored under `key`, if any.
    pub fn storage_value(&self, key: &str) -> Option<&str> {
        self.storage.get(key).map(String::as_str)
    }

    pub(crate) fn limits_mut(&mut self) -> &mut StoreLimits {
        &mut self.limits
    }
}

/// Register every host function in `linker`.
pub fn define_host_functions(linker: &mut Linker<HostState>) -> Result<(), GalaxyError> {
    linker
        .func_wrap(
            HOST_MODULE,
            "host_k8s_api_call",
            |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> i64 {
                k8s_api_call(&mut caller, ptr, len)
            },
        )
        .map_err(linker_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "host_log",
            |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                if let Some(message) = read_guest_string(&mut caller, ptr, len, "host_log") {
                    let state = caller.data();
                    info!(
                        plugin_id = %state.plugin_id,
                        plugin = %state.plugin_name,
                        plugin_log = %message,
                        "plugin log"
                    );
                }
            },
        )
        .map_err(linker_err)?;

    // The argument is reserved; the whole configuration object is returned.
    linker
        .func_wrap(
            HOST_MODULE,
            "host_get_config",
            |mut caller: Caller<'_, HostState>, _ptr: i32| -> i64 {
                match serde_json::to_vec(&caller.data().config) {
                    Ok(bytes) => deliver(&mut caller, &bytes, "host_get_config"),
                    Err(e) => {
                        warn!(plugin_id = %caller.data().plugin_id, error = %e, "failed to encode plugin configuration");
                        0
                    }
                }
            },
        )
        .map_err(linker_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "host_storage_get",
            |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> i64 {
                let Some(key) = read_guest_string(&mut caller, ptr, len, "host_storage_get") else {
                    return 0;
                };
                match caller.data().storage.get(&key).cloned() {
                    Some(value) => deliver(&mut caller, value.as_bytes(), "host_storage_get"),
                    None => {
                        debug!(plugin_id = %caller.data().plugin_id, key = %key, "storage miss");
                        0
                    }
                }
            },
        )
        .map_err(linker_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "host_storage_set",
            |mut caller: Caller<'_, HostState>,
             key_ptr: i32,
             key_len: i32,
             val_ptr: i32,
             val_len: i32|
             -> i32 {
                let Some(key) = read_guest_string(&mut caller, key_ptr, key_len, "host_storage_set")
                else {
                    return 0;
                };
                if guest_len(val_len).is_some_and(|len| len as usize > MAX_STORAGE_VALUE_BYTES) {
                    warn!(plugin_id = %caller.data().plugin_id, key = %key, len = val_len, "storage value too large");
                    return 0;
                }
                let Some(value) = read_guest_string(&mut caller, val_ptr, val_len, "host_storage_set")
                else {
                    return 0;
                };

                let state = caller.data_mut();
                if key.is_empty() {
                    warn!(plugin_id = %state.plugin_id, "storage key must not be empty");
                    return 0;
                }
                if !state.storage.contains_key(&key) && state.storage.len() >= MAX_STORAGE_KEYS {
                    warn!(plugin_id = %state.plugin_id, key = %key, "storage key limit reached");
                    return 0;
                }
                state.storage.insert(key, value);
                1
            },
        )
        .map_err(linker_err)?;

    Ok(())
}

fn k8s_api_call(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> i64 {
    let Some(arg) = read_guest_string(caller, ptr, len, "host_k8s_api_call") else {
        return 0;
    };
    let plugin_id = caller.data().plugin_id;

    let request = match KubeRequest::parse(&arg) {
        Ok(request) => request,
        Err(e) => {
            warn!(plugin_id = %plugin_id, error = %e, "malformed kubernetes request from plugin");
            return 0;
        }
    };

    if !caller.data().permissions.allows(&request.path) {
        let denied = GalaxyError::PermissionDenied {
            plugin_id,
            resource: request.path.clone(),
        };
        warn!(plugin_id = %plugin_id, error = %denied, "kubernetes API call denied");
        return 0;
    }

    let kube = Arc::clone(&caller.data().kube);
    debug!(plugin_id = %plugin_id, method = %request.method, path = %request.path, "kubernetes API call");
    let response = match kube.call(&request) {
        Ok(response) => response,
        Err(e) => {
            warn!(plugin_id = %plugin_id, path = %request.path, error = %e, "kubernetes API call failed");
            return 0;
        }
    };

    match serde_json::to_vec(&response) {
        Ok(bytes) => deliver(caller, &bytes, "host_k8s_api_call"),
        Err(e) => {
            warn!(plugin_id = %plugin_id, error = %e, "failed to encode kubernetes response");
            0
        }
    }
}

/// Read a UTF-8 argument from the calling module's memory, logging any failure.
fn read_guest_string(
    caller: &mut Caller<'_, HostState>,
    ptr: i32,
    len: i32,
    function: &'static str,
) -> Option<String> {
    let plugin_id = caller.data().plugin_id;
    let Some(memory) = GuestMemory::from_caller(caller) else {
        warn!(plugin_id = %plugin_id, function, "plugin has no exported memory");
        return None;
    };
    let Some(len) = guest_len(len) else {
        warn!(plugin_id = %plugin_id, function, len, "negative length from plugin");
        return None;
    };

    let bytes = match memory.read(&*caller, GuestPtr::from_raw(ptr), len) {
        Ok(bytes) => bytes,
        Err(fault) => {
            warn!(plugin_id = %plugin_id, function, error = %fault, "rejected guest memory read");
            return None;
        }
    };

    match String::from_utf8(bytes) {
        Ok(s) => Some(s),
        Err(_) => {
            warn!(plugin_id = %plugin_id, function, "plugin argument is not valid UTF-8");
            None
        }
    }
}

/// Copy `bytes` into a buffer obtained from the caller's own `allocate`
/// export and return the packed pointer/length, or 0 on any failure.
fn deliver(caller: &mut Caller<'_, HostState>, bytes: &[u8], function: &'static str) -> i64 {
    let plugin_id = caller.data().plugin_id;
    match write_to_caller(caller, bytes) {
        Ok(packed) => packed,
        Err(reason) => {
            warn!(plugin_id = %plugin_id, function, error = %reason, "failed to return data to plugin");
            0
        }
    }
}

fn write_to_caller(caller: &mut Caller<'_, HostState>, bytes: &[u8]) -> Result<i64, String> {
    let memory = GuestMemory::from_caller(caller).ok_or("plugin has no exported memory")?;
    let allocate = caller
        .get_export(ALLOCATE_EXPORT)
        .and_then(Extern::into_func)
        .ok_or("plugin does not export `allocate`")?
        .typed::<i32, i32>(&*caller)
        .map_err(|e| format!("`allocate` has the wrong signature: {e}"))?;
    let len = u32::try_from(bytes.len()).map_err(|_| "response too large".to_string())?;

    let ptr = memory::allocate(&mut *caller, &allocate, len).map_err(|f| f.to_string())?;
    memory
        .write(&mut *caller, ptr, bytes)
        .map_err(|f| f.to_string())?;
    Ok(pack(ptr, len))
}

fn linker_err(e: wasmtime::Error) -> GalaxyError {
    GalaxyError::Internal(format!("failed to define host function: {e}"))
}
