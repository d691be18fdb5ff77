// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Event/task tables, identifier allocation and the event state machine.
// Author: Lukas Bower

use core::ptr;

use portable_atomic::Ordering;
use spin::Mutex;

use super::{Event, EventId, Task, TaskBinding, TaskHandler, TaskId, UNREGISTERED};
use crate::bitmap::Bitmap;
use crate::config::{EVENT_WORDS, MAX_EVENTS, MAX_TASKS, TASK_WORDS};
use crate::error::{Error, Result};
use crate::irq::{self, HostIrq, IrqControl};

/// Slot tables and state bits guarded by the registry's critical section.
pub(super) struct Tables<'r> {
    pub(super) events: [Option<&'r Event>; MAX_EVENTS],
    pub(super) tasks: [Option<&'r Task>; MAX_TASKS],
    pub(super) bindings: [TaskBinding; MAX_TASKS],
    pub(super) registered: Bitmap<EVENT_WORDS>,
    pub(super) enabled: Bitmap<EVENT_WORDS>,
    pub(super) pending: Bitmap<EVENT_WORDS>,
    pub(super) task_map: Bitmap<TASK_WORDS>,
}

impl<'r> Tables<'r> {
    const fn new() -> Self {
        Self {
            events: [None; MAX_EVENTS],
            tasks: [None; MAX_TASKS],
            bindings: [TaskBinding::EMPTY; MAX_TASKS],
            registered: Bitmap::new(),
            enabled: Bitmap::new(),
            pending: Bitmap::new(),
            task_map: Bitmap::new(),
        }
    }

    /// Identifier of `event` if it is registered in these tables.
    pub(super) fn event_index(&self, event: &Event) -> Result<usize> {
        let id = event.raw_id();
        match self.events.get(id) {
            Some(Some(slot)) if ptr::eq(*slot, event) && self.registered.test(id) => Ok(id),
            _ => Err(Error::InvalidArgument),
        }
    }

    /// Identifier of `task` if it is registered in these tables.
    pub(super) fn task_index(&self, task: &Task) -> Result<usize> {
        let id = task.raw_id();
        match self.tasks.get(id) {
            Some(Some(slot)) if ptr::eq(*slot, task) && self.task_map.test(id) => Ok(id),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// Fixed-capacity registry of events and tasks.
///
/// Every mutation runs inside one critical section: local interrupts are
/// masked through `I` and the tables are locked for the duration of a single
/// read-modify-write. The registry can be built in a `static` through
/// [`EventRegistry::new`].
pub struct EventRegistry<'r, I = HostIrq> {
    irq: I,
    tables: Mutex<Tables<'r>>,
}

impl<I> core::fmt::Debug for EventRegistry<'_, I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("max_events", &MAX_EVENTS)
            .field("max_tasks", &MAX_TASKS)
            .finish_non_exhaustive()
    }
}

impl Default for EventRegistry<'_, HostIrq> {
    fn default() -> Self {
        Self::new(HostIrq::new())
    }
}

impl<'r, I: IrqControl> EventRegistry<'r, I> {
    /// Empty registry masking interrupts through `irq`.
    #[must_use]
    pub const fn new(irq: I) -> Self {
        Self {
            irq,
            tables: Mutex::new(Tables::new()),
        }
    }

    /// Interrupt controller used for critical sections.
    pub fn irq(&self) -> &I {
        &self.irq
    }

    /// Run `f` with interrupts masked and the tables locked.
    pub(super) fn critical<R>(&self, f: impl FnOnce(&mut Tables<'r>) -> R) -> R {
        irq::with_masked(&self.irq, || f(&mut *self.tables.lock()))
    }

    /// Register `event` and assign it the lowest free identifier.
    ///
    /// The event starts disabled and not pending.
    pub fn init_event(&self, event: &'r Event) -> Result<EventId> {
        let result = self.critical(|tables| {
            if event.raw_id() != UNREGISTERED {
                return Err(Error::InvalidArgument);
            }
            let id = tables
                .registered
                .next_clear(0, MAX_EVENTS)
                .ok_or(Error::ResourceExhausted)?;
            tables.registered.set(id);
            tables.enabled.clear(id);
            tables.pending.clear(id);
            tables.events[id] = Some(event);
            event.tasks.clear_all();
            event.id.store(id, Ordering::Release);
            Ok(EventId(id))
        });
        if result == Err(Error::ResourceExhausted) {
            log::debug!("[event] event table exhausted ({MAX_EVENTS} slots)");
        }
        result
    }

    /// Unregister `event`, dropping its state and every subscription.
    ///
    /// Does nothing if `event` is not registered here.
    pub fn uninit_event(&self, event: &Event) {
        self.critical(|tables| {
            let Ok(id) = tables.event_index(event) else {
                return;
            };
            for task_id in event.tasks.snapshot().iter() {
                if let Some(task) = tables.tasks[task_id] {
                    task.events.clear(id);
                }
            }
            event.tasks.clear_all();
            tables.registered.clear(id);
            tables.enabled.clear(id);
            tables.pending.clear(id);
            tables.events[id] = None;
            event.id.store(UNREGISTERED, Ordering::Release);
        });
    }

    /// Mark `event` pending. Idempotent.
    pub fn set_event(&self, event: &Event) -> Result<()> {
        self.critical(|tables| {
            let id = tables.event_index(event)?;
            tables.pending.set(id);
            Ok(())
        })
    }

    /// Clear the pending mark of `event`. Idempotent.
    pub fn clear_event(&self, event: &Event) -> Result<()> {
        self.critical(|tables| {
            let id = tables.event_index(event)?;
            tables.pending.clear(id);
            Ok(())
        })
    }

    /// Allow `event` to trigger its subscribers on the next dispatch.
    ///
    /// A pending event is not dispatched here; it waits for
    /// [`EventRegistry::dispatch`].
    pub fn enable_event(&self, event: &Event) -> Result<()> {
        self.critical(|tables| {
            let id = tables.event_index(event)?;
            tables.enabled.set(id);
            Ok(())
        })
    }

    /// Suppress dispatch of `event`. Its pending mark is kept.
    pub fn disable_event(&self, event: &Event) -> Result<()> {
        self.critical(|tables| {
            let id = tables.event_index(event)?;
            tables.enabled.clear(id);
            Ok(())
        })
    }

    /// Whether `event` is registered with this registry.
    pub fn is_registered(&self, event: &Event) -> bool {
        self.critical(|tables| tables.event_index(event).is_ok())
    }

    /// Whether `event` is registered here and enabled.
    pub fn is_enabled(&self, event: &Event) -> bool {
        self.critical(|tables| {
            tables
                .event_index(event)
                .is_ok_and(|id| tables.enabled.test(id))
        })
    }

    /// Whether `event` is registered here and pending.
    pub fn is_pending(&self, event: &Event) -> bool {
        self.critical(|tables| {
            tables
                .event_index(event)
                .is_ok_and(|id| tables.pending.test(id))
        })
    }

    /// Register `task` with its handler and argument, assigning the lowest
    /// free identifier.
    pub fn init_task(
        &self,
        task: &'r Task,
        handler: Option<TaskHandler>,
        arg: usize,
    ) -> Result<TaskId> {
        let result = self.critical(|tables| {
            if task.raw_id() != UNREGISTERED {
                return Err(Error::InvalidArgument);
            }
            let id = tables
                .task_map
                .next_clear(0, MAX_TASKS)
                .ok_or(Error::ResourceExhausted)?;
            tables.task_map.set(id);
            tables.tasks[id] = Some(task);
            tables.bindings[id] = TaskBinding { handler, arg };
            task.events.clear_all();
            task.id.store(id, Ordering::Release);
            Ok(TaskId(id))
        });
        if result == Err(Error::ResourceExhausted) {
            log::debug!("[event] task table exhausted ({MAX_TASKS} slots)");
        }
        result
    }

    /// Handler bound to `task` at registration.
    pub fn task_handler(&self, task: &Task) -> Result<Option<TaskHandler>> {
        self.critical(|tables| {
            let id = tables.task_index(task)?;
            Ok(tables.bindings[id].handler)
        })
    }

    /// Argument bound to `task` at registration.
    pub fn task_arg(&self, task: &Task) -> Result<usize> {
        self.critical(|tables| {
            let id = tables.task_index(task)?;
            Ok(tables.bindings[id].arg)
        })
    }

    /// Unregister `task`, dropping every subscription it holds.
    ///
    /// Does nothing if `task` is not registered here.
    pub fn uninit_task(&self, task: &Task) {
        self.critical(|tables| {
            let Ok(id) = tables.task_index(task) else {
                return;
            };
            for event_id in task.events.snapshot().iter() {
                if let Some(event) = tables.events[event_id] {
                    event.tasks.clear(id);
                }
            }
            task.events.clear_all();
            tables.task_map.clear(id);
            tables.tasks[id] = None;
            tables.bindings[id] = TaskBinding::EMPTY;
            task.id.store(UNREGISTERED, Ordering::Release);
        });
    }
}
