// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Poll-driven events for hardware without a usable interrupt.
// Author: Lukas Bower

//! Poll events.

use crate::error::{Error, Result};
use crate::event::{Event, EventId, EventRegistry, Task};
use crate::irq::IrqControl;

/// Readiness check called with the argument stored in the [`PollEvent`].
pub type PollFn = fn(usize) -> bool;

/// An event raised when a polled condition becomes ready.
#[derive(Debug)]
pub struct PollEvent {
    event: Event,
    poll: PollFn,
    arg: usize,
}

impl PollEvent {
    /// Poll event checking `poll(arg)`.
    #[must_use]
    pub const fn new(poll: PollFn, arg: usize) -> Self {
        Self {
            event: Event::new(),
            poll,
            arg,
        }
    }

    /// Event raised when the condition is ready.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Register and enable the event.
    pub fn init<'r, I: IrqControl>(&'r self, registry: &EventRegistry<'r, I>) -> Result<EventId> {
        let id = registry.init_event(&self.event)?;
        registry.enable_event(&self.event)?;
        Ok(id)
    }

    /// Unregister the event.
    pub fn deinit<I: IrqControl>(&self, registry: &EventRegistry<'_, I>) {
        registry.uninit_event(&self.event);
    }

    /// Subscribe `task` to readiness.
    pub fn register<I: IrqControl>(&self, registry: &EventRegistry<'_, I>, task: &Task) -> Result<()> {
        registry.register_handler(task, &self.event)
    }

    /// Drop the subscription of `task`.
    pub fn unregister<I: IrqControl>(
        &self,
        registry: &EventRegistry<'_, I>,
        task: &Task,
    ) -> Result<()> {
        registry.unregister_handler(task, &self.event)
    }

    /// Check the condition up to `attempts` times, at least once.
    ///
    /// On the first ready check the event is set and one dispatch is run.
    /// Fails with [`Error::Timeout`] if the condition never became ready.
    pub fn poll<I: IrqControl>(&self, registry: &EventRegistry<'_, I>, attempts: u32) -> Result<()> {
        for _ in 0..attempts.max(1) {
            if (self.poll)(self.arg) {
                registry.set_event(&self.event)?;
                registry.dispatch();
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(Error::Timeout)
    }
}
