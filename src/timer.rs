// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Timer wrapper binding a hardware timer backend to one registry event.
// Author: Lukas Bower

//! Timer events.
//!
//! A [`Timer`] owns one [`Event`] and a [`TimerBackend`] that arms the actual
//! hardware. The backend's expiry interrupt calls [`Timer::expire`], which
//! marks the event pending; subscribed tasks run on the next dispatch.

use portable_atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::event::{Event, EventId, EventRegistry, Task};
use crate::irq::IrqControl;

/// Hardware side of a [`Timer`].
pub trait TimerBackend {
    /// Arm the hardware to fire when the counter reaches `expire` ticks.
    fn start(&self, expire: u64) -> Result<()>;

    /// Disarm the hardware.
    fn stop(&self);
}

/// One event fired by a hardware timer.
#[derive(Debug)]
pub struct Timer<B> {
    event: Event,
    expire: AtomicU64,
    backend: B,
}

impl<B: TimerBackend> Timer<B> {
    /// Timer expiring at `expire` ticks, armed through `backend`.
    pub const fn new(expire: u64, backend: B) -> Self {
        Self {
            event: Event::new(),
            expire: AtomicU64::new(expire),
            backend,
        }
    }

    /// Event fired on expiry.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Hardware backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register the timer's event. The event starts disabled.
    pub fn init<'r, I: IrqControl>(&'r self, registry: &EventRegistry<'r, I>) -> Result<EventId> {
        registry.init_event(&self.event)
    }

    /// Disarm the backend and unregister the event.
    pub fn deinit<I: IrqControl>(&self, registry: &EventRegistry<'_, I>) {
        if registry.is_enabled(&self.event) {
            self.backend.stop();
        }
        registry.uninit_event(&self.event);
    }

    /// Subscribe `task` to expiries.
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

    /// Enable the event and arm the backend.
    ///
    /// If the backend refuses, the event is disabled again and the backend's
    /// error is returned.
    pub fn start<I: IrqControl>(&self, registry: &EventRegistry<'_, I>) -> Result<()> {
        registry.enable_event(&self.event)?;
        let expire = self.expire_value();
        if let Err(err) = self.backend.start(expire) {
            log::warn!("[timer] backend refused expire={expire}: {err}");
            registry.disable_event(&self.event)?;
            return Err(err);
        }
        Ok(())
    }

    /// Disarm the backend and disable the event. A pending expiry stays
    /// pending.
    pub fn stop<I: IrqControl>(&self, registry: &EventRegistry<'_, I>) -> Result<()> {
        self.backend.stop();
        registry.disable_event(&self.event)
    }

    /// Expiry hook, usually called from the timer interrupt.
    pub fn expire<I: IrqControl>(&self, registry: &EventRegistry<'_, I>) -> Result<()> {
        registry.set_event(&self.event)
    }

    /// Change the expiry used by the next [`Timer::start`].
    pub fn set_expire(&self, expire: u64) {
        self.expire.store(expire, Ordering::Relaxed);
    }

    /// Expiry used by the next [`Timer::start`].
    pub fn expire_value(&self) -> u64 {
        self.expire.load(Ordering::Relaxed)
    }
}
