// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Far-side access seam for device-memory regions.
// Author: Lukas Bower

use core::ptr;
use core::sync::atomic::Ordering;

use super::barrier;

mod sealed {
    pub trait Sealed {}
}

/// Scalar width that may be moved across a region boundary in one access.
pub trait IoWord: Copy + sealed::Sealed {
    /// Access width in bytes.
    const WIDTH: usize;
}

macro_rules! io_word {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}
            impl IoWord for $ty {
                const WIDTH: usize = core::mem::size_of::<$ty>();
            }
        )*
    };
}

io_word!(u8, u16, u32, u64);

/// Performs the accesses that reach device memory.
///
/// The defaults issue volatile loads and stores and the architecture barrier
/// for the requested ordering. Integrators override them to route accesses
/// through a different path; tests override them to observe the exact access
/// sequence.
pub trait MemoryBus {
    /// Issue a barrier with the strength of `order`. Never called with
    /// `Relaxed`.
    fn fence(&self, order: Ordering) {
        barrier::io_fence(order);
    }

    /// Load one `W` from device memory.
    ///
    /// # Safety
    ///
    /// `addr` must be valid for reads of `W` and aligned to `W::WIDTH`.
    unsafe fn load<W: IoWord>(&self, addr: *const W) -> W {
        unsafe { ptr::read_volatile(addr) }
    }

    /// Store one `W` to device memory.
    ///
    /// # Safety
    ///
    /// `addr` must be valid for writes of `W` and aligned to `W::WIDTH`.
    unsafe fn store<W: IoWord>(&self, addr: *mut W, value: W) {
        unsafe { ptr::write_volatile(addr, value) }
    }
}

/// Bus using volatile accesses and architecture barriers.
#[derive(Debug, Default, Clone, Copy)]
pub struct VolatileBus;

impl MemoryBus for VolatileBus {}
