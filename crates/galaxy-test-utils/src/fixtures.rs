// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guest modules used across integration tests.
//!
//! The demo guest imports every host function and exports:
//!
//! | export | behavior |
//! |---|---|
//! | `init` | logs `started` and stores `boot = yes` |
//! | `echo` | returns its input |
//! | `status_handler` | returns the fixed status body |
//! | `k8s_proxy` | forwards its input to `host_k8s_api_call` |
//! | `get_config` | returns `host_get_config` |
//! | `storage_get` | looks its input up with `host_storage_get` |
//! | `log_input` | logs its input, returns nothing |
//! | `empty` | returns `(0, 0)` |
//! | `trap` | executes `unreachable` |

/// Body returned by `status_handler` in [`demo_guest`].
pub const STATUS_BODY: &str = r#"{"status":"ok"}"#;

/// The demo guest with the default status body.
pub fn demo_guest() -> Vec<u8> {
    guest_with_status(STATUS_BODY)
}

/// The demo guest whose `status_handler` returns `body`.
pub fn guest_with_status(body: &str) -> Vec<u8> {
    let escaped = body.replace('\\', "\\\\").replace('"', "\\\"");
    let len = body.len();
    wat::parse_str(format!(
        r##"(module
            (import "env" "host_k8s_api_call" (func $k8s (param i32 i32) (result i64)))
            (import "env" "host_log" (func $log (param i32 i32)))
            (import "env" "host_get_config" (func $config (param i32) (result i64)))
            (import "env" "host_storage_get" (func $get (param i32 i32) (result i64)))
            (import "env" "host_storage_set" (func $set (param i32 i32 i32 i32) (result i32)))
            (memory (export "memory") 2)
            (global $next (mut i32) (i32.const 8192))
            (data (i32.const 64) "started")
            (data (i32.const 80) "boot")
            (data (i32.const 96) "yes")
            (data (i32.const 1024) "{escaped}")
            (func (export "allocate") (param $size i32) (result i32)
                (local $ptr i32)
                (local.set $ptr (global.get $next))
                (global.set $next (i32.add (global.get $next) (local.get $size)))
                (local.get $ptr))
            (func $pack (param $ptr i32) (param $len i32) (result i64)
                (i64.or
                    (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))
                    (i64.extend_i32_u (local.get $len))))
            (func (export "init")
                (call $log (i32.const 64) (i32.const 7))
                (drop (call $set (i32.const 80) (i32.const 4) (i32.const 96) (i32.const 3))))
            (func (export "echo") (param $ptr i32) (param $len i32) (result i64)
                (call $pack (local.get $ptr) (local.get $len)))
            (func (export "status_handler") (param i32 i32) (result i64)
                (call $pack (i32.const 1024) (i32.const {len})))
            (func (export "k8s_proxy") (param $ptr i32) (param $len i32) (result i64)
                (call $k8s (local.get $ptr) (local.get $len)))
            (func (export "get_config") (param i32 i32) (result i64)
                (call $config (i32.const 0)))
            (func (export "storage_get") (param $ptr i32) (param $len i32) (result i64)
                (call $get (local.get $ptr) (local.get $len)))
            (func (export "log_input") (param $ptr i32) (param $len i32) (result i64)
                (call $log (local.get $ptr) (local.get $len))
                (i64.const 0))
            (func (export "empty") (param i32 i32) (result i64)
                (i64.const 0))
            (func (export "trap") (param i32 i32) (result i64)
                unreachable))"##
    ))
    .expect("demo guest is valid WAT")
}

/// A guest whose `init` export traps.
pub fn failing_init_guest() -> Vec<u8> {
    wat::parse_str(
        r#"(module
            (memory (export "memory") 1)
            (func (export "allocate") (param i32) (result i32) (i32.const 1024))
            (func (export "init") unreachable))"#,
    )
    .expect("failing guest is valid WAT")
}

/// Bytes that are not a WebAssembly module.
pub fn invalid_wasm() -> Vec<u8> {
    b"definitely not wasm".to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_assemble() {
        assert!(demo_guest().starts_with(b"\0asm"));
        assert!(guest_with_status(r#"{"version":2}"#).starts_with(b"\0asm"));
        assert!(failing_init_guest().starts_with(b"\0asm"));
    }
}
