// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Event and task records plus the registry that dispatches between them.
// Author: Lukas Bower

//! Interrupt-safe event/task registry.
//!
//! Records ([`Event`], [`Task`]) are owned by the caller and usually embedded
//! in a driver, timer or poll structure. The [`EventRegistry`] borrows them for
//! as long as they are registered, hands out small integer identifiers, keeps
//! the registered / enabled / pending state per event and resolves pending
//! events to their subscriber tasks in [`EventRegistry::dispatch`].

mod dispatch;
mod registry;
mod relation;

use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::bitmap::AtomicBitmap;
use crate::config::{EVENT_WORDS, TASK_WORDS};

pub use registry::EventRegistry;

/// Identifier stored in a record that is not registered anywhere.
pub const UNREGISTERED: usize = usize::MAX;

/// Identifier assigned to a registered [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(usize);

impl EventId {
    /// Table index backing this identifier.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Identifier assigned to a registered [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(usize);

impl TaskId {
    /// Table index backing this identifier.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Value returned by a task handler. The dispatcher records nothing from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStatus {
    /// The handler did not act on the event.
    NotHandled,
    /// The handler consumed the event.
    Handled,
}

/// Callback invoked once per triggering event with the task and its argument.
pub type TaskHandler = fn(&Task, usize) -> HandlerStatus;

/// A condition that tasks can subscribe to.
#[derive(Debug)]
pub struct Event {
    id: AtomicUsize,
    tasks: AtomicBitmap<TASK_WORDS>,
}

impl Event {
    /// Unregistered event with no subscribers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            id: AtomicUsize::new(UNREGISTERED),
            tasks: AtomicBitmap::new(),
        }
    }

    /// Identifier assigned at registration, if any.
    #[must_use]
    pub fn id(&self) -> Option<EventId> {
        match self.id.load(Ordering::Acquire) {
            UNREGISTERED => None,
            raw => Some(EventId(raw)),
        }
    }

    /// Whether the task with `task` identifier is subscribed to this event.
    #[must_use]
    pub fn has_subscriber(&self, task: TaskId) -> bool {
        self.tasks.test(task.0)
    }

    fn raw_id(&self) -> usize {
        self.id.load(Ordering::Acquire)
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler and argument bound to a task identifier while it is registered.
#[derive(Debug, Clone, Copy)]
struct TaskBinding {
    handler: Option<TaskHandler>,
    arg: usize,
}

impl TaskBinding {
    const EMPTY: Self = Self {
        handler: None,
        arg: 0,
    };
}

/// A unit of work invoked by the dispatcher when a subscribed event fires.
///
/// The handler and argument given to [`EventRegistry::init_task`] are kept in
/// the registry's task table, so reading them never takes a lock outside the
/// registry's critical section.
#[derive(Debug)]
pub struct Task {
    id: AtomicUsize,
    events: AtomicBitmap<EVENT_WORDS>,
    priority: AtomicU8,
}

impl Task {
    /// Unregistered task with no handler.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            id: AtomicUsize::new(UNREGISTERED),
            events: AtomicBitmap::new(),
            priority: AtomicU8::new(0),
        }
    }

    /// Identifier assigned at registration, if any.
    #[must_use]
    pub fn id(&self) -> Option<TaskId> {
        match self.id.load(Ordering::Acquire) {
            UNREGISTERED => None,
            raw => Some(TaskId(raw)),
        }
    }

    /// Whether this task is subscribed to the event with `event` identifier.
    #[must_use]
    pub fn is_subscribed(&self, event: EventId) -> bool {
        self.events.test(event.0)
    }

    /// Reserved scheduling priority. Dispatch order ignores it.
    #[must_use]
    pub fn priority(&self) -> u8 {
        self.priority.load(Ordering::Relaxed)
    }

    /// Store the reserved scheduling priority.
    pub fn set_priority(&self, priority: u8) {
        self.priority.store(priority, Ordering::Relaxed);
    }

    fn raw_id(&self) -> usize {
        self.id.load(Ordering::Acquire)
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}
