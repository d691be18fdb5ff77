// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Architecture-neutral memory barriers for device-memory transfers.
// Author: Lukas Bower

use core::sync::atomic::{fence, Ordering};

/// Order CPU accesses around a device transfer with the strength of `order`.
///
/// `Relaxed` issues nothing.
#[inline(always)]
pub fn io_fence(order: Ordering) {
    match order {
        Ordering::Relaxed => {}
        Ordering::Release => {
            fence(Ordering::Release);
            #[cfg(target_arch = "aarch64")]
            unsafe {
                core::arch::asm!("dmb ishst", options(nostack, preserves_flags));
            }
        }
        other => {
            fence(other);
            #[cfg(target_arch = "aarch64")]
            unsafe {
                core::arch::asm!("dmb ish", options(nostack, preserves_flags));
            }
        }
    }
}
