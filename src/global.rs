// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Process-wide registry instance and no-argument dispatch entry point.
// Author: Lukas Bower

//! Process-wide registry.

use crate::event::EventRegistry;
use crate::irq::PlatformIrq;

static REGISTRY: EventRegistry<'static, PlatformIrq> = EventRegistry::new(PlatformIrq::new());

/// Process-wide registry. Records registered here must be `'static`.
pub fn registry() -> &'static EventRegistry<'static, PlatformIrq> {
    &REGISTRY
}

/// Dispatch the process-wide registry. Safe to call from an interrupt
/// epilogue as long as it is not re-entered from a handler.
pub fn dispatch() {
    REGISTRY.dispatch();
}
