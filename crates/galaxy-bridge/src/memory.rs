// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounds-checked access to a guest's linear memory.

use galaxy_core::MemoryFault;
use wasmtime::{AsContext, AsContextMut, Caller, Extern, Instance, Memory, TypedFunc};

use crate::abi::GuestPtr;

/// Name of the guest export that hands out buffers for host-written data.
pub const ALLOCATE_EXPORT: &str = "allocate";

/// Name of the guest's exported linear memory.
pub const MEMORY_EXPORT: &str = "memory";

/// A guest's exported memory, accessed only through checked reads and writes.
#[derive(Debug, Clone, Copy)]
pub struct GuestMemory {
    memory: Memory,
}

impl GuestMemory {
    pub fn new(memory: Memory) -> Self {
        Self { memory }
    }

    /// The memory of the module that is calling into a host function.
    pub fn from_caller<T>(caller: &mut Caller<'_, T>) -> Option<Self> {
        caller
            .get_export(MEMORY_EXPORT)
            .and_then(Extern::into_memory)
            .map(Self::new)
    }

    pub fn from_instance(store: impl AsContextMut, instance: &Instance) -> Option<Self> {
        instance.get_memory(store, MEMORY_EXPORT).map(Self::new)
    }

    /// Current size of the guest memory in bytes.
    pub fn size(&self, store: impl AsContext) -> usize {
        self.memory.data_size(store)
    }

    /// Copy `len` bytes starting at `ptr` out of the guest.
    pub fn read(
        &self,
        store: impl AsContext,
        ptr: GuestPtr,
        len: u32,
    ) -> Result<Vec<u8>, MemoryFault> {
        let fault = MemoryFault::Read {
            ptr: ptr.offset(),
            len,
        };
        // Checked before allocating so a hostile length cannot size a host buffer.
        let end = u64::from(ptr.offset()) + u64::from(len);
        if end > self.memory.data_size(&store) as u64 {
            return Err(fault);
        }

        let mut buf = vec![0u8; len as usize];
        self.memory
            .read(&store, ptr.offset() as usize, &mut buf)
            .map_err(|_| fault)?;
        Ok(buf)
    }

    /// Copy `bytes` into the guest starting at `ptr`.
    pub fn write(
        &self,
        mut store: impl AsContextMut,
        ptr: GuestPtr,
        bytes: &[u8],
    ) -> Result<(), MemoryFault> {
        let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        self.memory
            .write(&mut store, ptr.offset() as usize, bytes)
            .map_err(|_| MemoryFault::Write {
                ptr: ptr.offset(),
                len,
            })
    }
}

/// Ask the guest for a `len`-byte buffer through its `allocate` export.
pub fn allocate(
    store: impl AsContextMut,
    allocate: &TypedFunc<i32, i32>,
    len: u32,
) -> Result<GuestPtr, MemoryFault> {
    let size = i32::try_from(len)
        .map_err(|_| MemoryFault::Allocation(format!("{len} bytes exceeds guest address space")))?;
    allocate
        .call(store, size)
        .map(GuestPtr::from_raw)
        .map_err(|e| MemoryFault::Allocation(format!("{e:#}")))
}
