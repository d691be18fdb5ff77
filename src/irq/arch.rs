// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Bare-metal local interrupt masking for supported architectures.
// Author: Lukas Bower
#![allow(unsafe_code)]

use core::arch::asm;

use super::{IrqControl, IrqToken};

/// Masks interrupts on the executing core through the architecture's
/// interrupt-enable state.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalIrq;

impl LocalIrq {
    /// Construct the controller.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[cfg(target_arch = "aarch64")]
impl IrqControl for LocalIrq {
    #[inline(always)]
    fn save_disable(&self) -> IrqToken {
        let daif: usize;
        unsafe {
            asm!("mrs {0}, daif", "msr daifset, #2", out(reg) daif, options(nostack, preserves_flags));
        }
        IrqToken::from_raw(daif)
    }

    #[inline(always)]
    fn restore(&self, token: IrqToken) {
        unsafe {
            asm!("msr daif, {0}", in(reg) token.into_raw(), options(nostack, preserves_flags));
        }
    }
}

#[cfg(target_arch = "x86_64")]
impl IrqControl for LocalIrq {
    #[inline(always)]
    fn save_disable(&self) -> IrqToken {
        let rflags: usize;
        unsafe {
            asm!("pushfq", "pop {0}", "cli", out(reg) rflags);
        }
        IrqToken::from_raw(rflags)
    }

    #[inline(always)]
    fn restore(&self, token: IrqToken) {
        const IF: usize = 1 << 9;
        if token.into_raw() & IF != 0 {
            unsafe {
                asm!("sti", options(nostack));
            }
        }
    }
}

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
impl IrqControl for LocalIrq {
    #[inline(always)]
    fn save_disable(&self) -> IrqToken {
        let mstatus: usize;
        unsafe {
            asm!("csrrci {0}, mstatus, 8", out(reg) mstatus, options(nostack));
        }
        IrqToken::from_raw(mstatus)
    }

    #[inline(always)]
    fn restore(&self, token: IrqToken) {
        const MIE: usize = 1 << 3;
        if token.into_raw() & MIE != 0 {
            unsafe {
                asm!("csrsi mstatus, 8", options(nostack));
            }
        }
    }
}
