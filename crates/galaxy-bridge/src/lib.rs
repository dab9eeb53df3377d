// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host bridge between Galaxy and its sandboxed WASM plugins.
//!
//! Guests export `allocate(size) -> ptr` and handlers of shape
//! `(ptr, len) -> packed` where `packed = (result_ptr << 32) | result_len`.
//! The host exposes a fixed set of functions in the `env` namespace. Every
//! access to guest memory goes through [`GuestMemory`], which uses the
//! engine's checked accessors, so an adversarial offset can never reach host
//! memory.

pub mod abi;
pub mod host;
pub mod kube;
pub mod memory;
pub mod permissions;
pub mod runtime;

pub use abi::{GuestPtr, pack, unpack};
pub use host::{HostState, PluginConfigValues};
pub use kube::{HttpKubeApi, KubeApi, KubeRequest, KubeResponse};
pub use memory::GuestMemory;
pub use permissions::Permissions;
pub use runtime::{PluginInstance, PluginRuntime};
