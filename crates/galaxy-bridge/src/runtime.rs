// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WASM engine wrapper: compilation, instantiation, and handler invocation.
//!
//! The [`Engine`] and [`Linker`] are shared by every plugin. Each loaded plugin
//! gets one long-lived [`PluginInstance`] owning its own [`Store`], so host
//! storage and guest globals persist between handler calls.

use galaxy_core::{GalaxyError, MemoryFault};
use tracing::{debug, info};
use wasmtime::{Config, Engine, Instance, Linker, Module, Store};

use crate::abi::{EMPTY_RESULT, unpack};
use crate::host::{HostState, define_host_functions};
use crate::memory::{self, ALLOCATE_EXPORT, GuestMemory};

/// Shared engine plus the linker carrying the host functions.
#[derive(Clone)]
pub struct PluginRuntime {
    engine: Engine,
    linker: Linker<HostState>,
}

impl PluginRuntime {
    pub fn new() -> Result<Self, GalaxyError> {
        let config = Config::new();
        let engine = Engine::new(&config)
            .map_err(|e| GalaxyError::Internal(format!("failed to create wasmtime engine: {e}")))?;

        let mut linker = Linker::new(&engine);
        define_host_functions(&mut linker)?;

        info!("WASM plugin runtime initialized");
        Ok(Self { engine, linker })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Compile a plugin binary. The resulting module is cheap to clone.
    pub fn compile(&self, wasm: &[u8]) -> Result<Module, GalaxyError> {
        Module::new(&self.engine, wasm).map_err(|e| GalaxyError::Binary {
            message: format!("failed to compile WASM module: {e:#}"),
            source: None,
        })
    }

    /// Instantiate `module` in a fresh store and run its start function.
    ///
    /// `entrypoint` names an exported `() -> ()` function run once after
    /// instantiation; a module that does not export it is left as is.
    pub fn instantiate(
        &self,
        module: &Module,
        state: HostState,
        entrypoint: Option<&str>,
    ) -> Result<PluginInstance, GalaxyError> {
        let plugin_id = state.plugin_id();
        let mut store = Store::new(&self.engine, state);
        store.limiter(|state| state.limits_mut());

        let instance =
            self.linker
                .instantiate(&mut store, module)
                .map_err(|e| GalaxyError::Binary {
                    message: format!("failed to instantiate plugin {plugin_id}: {e:#}"),
                    source: None,
                })?;

        if let Some(name) = entrypoint.filter(|name| !name.is_empty()) {
            match instance.get_func(&mut store, name) {
                Some(func) => {
                    let start = func.typed::<(), ()>(&store).map_err(|e| GalaxyError::Binary {
                        message: format!("entrypoint `{name}` has the wrong signature: {e}"),
                        source: None,
                    })?;
                    start.call(&mut store, ()).map_err(|e| GalaxyError::Binary {
                        message: format!("entrypoint `{name}` failed: {e:#}"),
                        source: None,
                    })?;
                }
                None => debug!(plugin_id = %plugin_id, entrypoint = name, "entrypoint not exported, skipping"),
            }
        }

        Ok(PluginInstance { store, instance })
    }
}

/// A live guest instance with its store.
pub struct PluginInstance {
    store: Store<HostState>,
    instance: Instance,
}

impl PluginInstance {
    pub fn state(&self) -> &HostState {
        self.store.data()
    }

    /// Whether the guest exports a function called `name`.
    pub fn exports_function(&mut self, name: &str) -> bool {
        self.instance.get_func(&mut self.store, name).is_some()
    }

    /// Call handler `function` with `input` and return the bytes it produced.
    ///
    /// The input is copied into a buffer from the guest's `allocate`, the
    /// handler receives `(ptr, len)` and returns a packed pointer/length. A
    /// zero pointer or length yields `{}`.
    pub fn invoke(&mut self, function: &str, input: &[u8]) -> Result<Vec<u8>, GalaxyError> {
        let plugin_id = self.store.data().plugin_id();

        let handler = self
            .instance
            .get_func(&mut self.store, function)
            .ok_or_else(|| GalaxyError::FunctionNotFound {
                plugin_id,
                function: function.to_string(),
            })?
            .typed::<(i32, i32), i64>(&self.store)
            .map_err(|e| GalaxyError::Binary {
                message: format!("handler `{function}` has the wrong signature: {e}"),
                source: None,
            })?;

        let memory = GuestMemory::from_instance(&mut self.store, &self.instance).ok_or_else(|| {
            GalaxyError::Memory(MemoryFault::Allocation(
                "plugin has no exported memory".to_string(),
            ))
        })?;
        let allocate = self
            .instance
            .get_typed_func::<i32, i32>(&mut self.store, ALLOCATE_EXPORT)
            .map_err(|e| {
                GalaxyError::Memory(MemoryFault::Allocation(format!(
                    "missing or invalid `allocate` export: {e}"
                )))
            })?;

        let len = u32::try_from(input.len()).map_err(|_| {
            GalaxyError::Memory(MemoryFault::Allocation("input too large".to_string()))
        })?;
        let ptr = memory::allocate(&mut self.store, &allocate, len).map_err(GalaxyError::Memory)?;
        memory
            .write(&mut self.store, ptr, input)
            .map_err(GalaxyError::Memory)?;

        let packed = handler
            .call(&mut self.store, (ptr.to_raw(), len as i32))
            .map_err(|e| GalaxyError::Execution {
                message: format!("handler `{function}` of plugin {plugin_id} trapped: {e:#}"),
            })?;

        let (result_ptr, result_len) = unpack(packed);
        if result_ptr.is_null() || result_len == 0 {
            return Ok(EMPTY_RESULT.to_vec());
        }
        memory
            .read(&self.store, result_ptr, result_len)
            .map_err(GalaxyError::Memory)
    }
}
