// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Local interrupt masking used to bound registry critical sections.
// Author: Lukas Bower

//! Save-and-disable / restore of the local interrupt mask.
//!
//! Masking local interrupts is the only exclusion mechanism the registry
//! relies on for interrupt context. It protects against preemption on the
//! current core only; the registry additionally keeps its tables behind a
//! spin lock taken inside the masked section so hosted builds get the same
//! scope with real threads.

use portable_atomic::{AtomicUsize, Ordering};

#[cfg(all(
    target_os = "none",
    any(
        target_arch = "aarch64",
        target_arch = "x86_64",
        target_arch = "riscv32",
        target_arch = "riscv64"
    )
))]
mod arch;

#[cfg(all(
    target_os = "none",
    any(
        target_arch = "aarch64",
        target_arch = "x86_64",
        target_arch = "riscv32",
        target_arch = "riscv64"
    )
))]
pub use arch::LocalIrq;

/// Interrupt control used on the current target.
#[cfg(all(
    target_os = "none",
    any(
        target_arch = "aarch64",
        target_arch = "x86_64",
        target_arch = "riscv32",
        target_arch = "riscv64"
    )
))]
pub type PlatformIrq = LocalIrq;

/// Interrupt control used on the current target.
#[cfg(not(all(
    target_os = "none",
    any(
        target_arch = "aarch64",
        target_arch = "x86_64",
        target_arch = "riscv32",
        target_arch = "riscv64"
    )
)))]
pub type PlatformIrq = HostIrq;

/// Opaque interrupt state captured by [`IrqControl::save_disable`].
///
/// The token must be handed back to [`IrqControl::restore`] on the same core,
/// in LIFO order with any nested sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "dropping the token leaves interrupts masked"]
pub struct IrqToken(usize);

impl IrqToken {
    /// Wrap a raw saved mask value.
    pub const fn from_raw(bits: usize) -> Self {
        Self(bits)
    }

    /// Raw saved mask value.
    #[must_use]
    pub const fn into_raw(self) -> usize {
        self.0
    }
}

/// Core-local interrupt masking primitive.
pub trait IrqControl {
    /// Mask local interrupts, returning the state to restore.
    fn save_disable(&self) -> IrqToken;

    /// Restore the interrupt state captured by `save_disable`.
    fn restore(&self, token: IrqToken);
}

impl<T: IrqControl + ?Sized> IrqControl for &T {
    #[inline(always)]
    fn save_disable(&self) -> IrqToken {
        (**self).save_disable()
    }

    #[inline(always)]
    fn restore(&self, token: IrqToken) {
        (**self).restore(token);
    }
}

/// Run `f` with local interrupts masked.
#[inline]
pub fn with_masked<I, R>(irq: &I, f: impl FnOnce() -> R) -> R
where
    I: IrqControl + ?Sized,
{
    let token = irq.save_disable();
    let out = f();
    irq.restore(token);
    out
}

/// Hosted stand-in for interrupt masking.
///
/// There are no interrupts to mask on a host, so this only tracks nesting
/// depth and the number of sections entered. The counters let tests check that
/// handlers run unmasked and that each mutation takes exactly one section.
#[derive(Debug, Default)]
pub struct HostIrq {
    depth: AtomicUsize,
    sections: AtomicUsize,
}

impl HostIrq {
    /// Fresh controller with no section entered.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            depth: AtomicUsize::new(0),
            sections: AtomicUsize::new(0),
        }
    }

    /// Whether a masked section is currently open.
    #[must_use]
    pub fn is_masked(&self) -> bool {
        self.depth.load(Ordering::Acquire) != 0
    }

    /// Total number of sections entered since construction.
    #[must_use]
    pub fn sections(&self) -> usize {
        self.sections.load(Ordering::Acquire)
    }
}

impl IrqControl for HostIrq {
    fn save_disable(&self) -> IrqToken {
        self.sections.fetch_add(1, Ordering::AcqRel);
        IrqToken(self.depth.fetch_add(1, Ordering::AcqRel))
    }

    fn restore(&self, token: IrqToken) {
        let previous = self.depth.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > token.0, "irq restore without matching save");
    }
}
