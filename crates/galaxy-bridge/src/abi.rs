// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guest pointer type and the packed pointer/length return convention.

use std::fmt;

/// Result returned to callers when a handler reports no content.
pub const EMPTY_RESULT: &[u8] = b"{}";

/// An offset into a guest's linear memory.
///
/// Only [`GuestMemory`](crate::GuestMemory) can dereference it; there is no
/// conversion to a host pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuestPtr(u32);

impl GuestPtr {
    pub const NULL: GuestPtr = GuestPtr(0);

    /// Reinterpret an `i32` received from the guest as an unsigned offset.
    pub fn from_raw(raw: i32) -> Self {
        GuestPtr(raw as u32)
    }

    pub fn offset(self) -> u32 {
        self.0
    }

    /// The `i32` representation passed back into the guest.
    pub fn to_raw(self) -> i32 {
        self.0 as i32
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for GuestPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Pack a guest pointer and length into the `i64` handler return value.
pub fn pack(ptr: GuestPtr, len: u32) -> i64 {
    ((u64::from(ptr.0) << 32) | u64::from(len)) as i64
}

/// Split a packed handler return value into pointer and length.
pub fn unpack(packed: i64) -> (GuestPtr, u32) {
    let bits = packed as u64;
    (GuestPtr((bits >> 32) as u32), bits as u32)
}

/// Convert a guest-supplied `i32` length to `u32`, rejecting negatives.
pub fn guest_len(raw: i32) -> Option<u32> {
    u32::try_from(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_places_pointer_in_high_bits() {
        let packed = pack(GuestPtr::from_raw(0x1000), 42);
        assert_eq!(packed, (0x1000_i64 << 32) | 42);
        assert_eq!(unpack(packed), (GuestPtr::from_raw(0x1000), 42));
    }

    #[test]
    fn zero_unpacks_to_null() {
        let (ptr, len) = unpack(0);
        assert!(ptr.is_null());
        assert_eq!(len, 0);
    }

    #[test]
    fn high_offsets_survive_sign_bit() {
        let ptr = GuestPtr::from_raw(-16);
        assert_eq!(ptr.offset(), u32::MAX - 15);
        let (back, len) = unpack(pack(ptr, u32::MAX));
        assert_eq!(back, ptr);
        assert_eq!(len, u32::MAX);
    }

    #[test]
    fn negative_lengths_are_rejected() {
        assert_eq!(guest_len(-1), None);
        assert_eq!(guest_len(12), Some(12));
    }
}
