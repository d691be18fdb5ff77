// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Snapshot pending events under the critical section and run their tasks.
// Author: Lukas Bower

//! Two-phase dispatcher.
//!
//! Phase one runs with interrupts masked: every event that is both enabled and
//! pending is recorded in ascending identifier order together with a copy of
//! its subscriber set, each subscribed task slot is resolved once, and the
//! event's pending mark is consumed. Phase two runs with interrupts restored
//! and calls the handlers event by event, subscribers in ascending order.
//!
//! The snapshot is sized by the table capacities, so one call always covers
//! every event that was active when it started.

use heapless::Vec;

use super::registry::Tables;
use super::{EventRegistry, Task, TaskHandler};
use crate::bitmap::Bitmap;
use crate::config::{MAX_EVENTS, MAX_TASKS, TASK_WORDS};
use crate::irq::IrqControl;

/// Task slot and binding resolved during the snapshot.
#[derive(Clone, Copy)]
struct Runner<'r> {
    task: &'r Task,
    handler: Option<TaskHandler>,
    arg: usize,
}

/// Work captured under the critical section for one dispatch call.
struct Snapshot<'r> {
    fired: Vec<(usize, Bitmap<TASK_WORDS>), MAX_EVENTS>,
    runners: [Option<Runner<'r>>; MAX_TASKS],
}

impl<'r> Tables<'r> {
    fn snapshot(&mut self) -> Snapshot<'r> {
        let mut snapshot = Snapshot {
            fired: Vec::new(),
            runners: [None; MAX_TASKS],
        };
        let active = self.enabled.and(&self.pending);

        for event_id in active.iter() {
            let Some(event) = self.events[event_id] else {
                continue;
            };
            let subscribers = event.tasks.snapshot();
            for task_id in subscribers.iter() {
                if snapshot.runners[task_id].is_some() {
                    continue;
                }
                let binding = self.bindings[task_id];
                snapshot.runners[task_id] = self.tasks[task_id].map(|task| Runner {
                    task,
                    handler: binding.handler,
                    arg: binding.arg,
                });
            }
            // At most MAX_EVENTS identifiers can be active.
            let recorded = snapshot.fired.push((event_id, subscribers));
            debug_assert!(recorded.is_ok());
            self.pending.clear(event_id);
        }
        snapshot
    }
}

impl<I: IrqControl> EventRegistry<'_, I> {
    /// Run every task subscribed to an enabled, pending event.
    ///
    /// A task subscribed to several such events runs once per event. Handlers
    /// execute with interrupts restored and may call back into the registry,
    /// but must not re-enter `dispatch`. Events set by a handler are picked up
    /// by the next call.
    pub fn dispatch(&self) {
        let snapshot = self.critical(Tables::snapshot);

        for (event_id, subscribers) in &snapshot.fired {
            #[cfg(feature = "dispatch-trace")]
            log::trace!(
                "[dispatch] event {event_id} fired for {} task(s)",
                subscribers.count()
            );
            for task_id in subscribers.iter() {
                let Some(runner) = snapshot.runners[task_id] else {
                    continue;
                };
                let Some(handler) = runner.handler else {
                    log::error!(
                        "[dispatch] task {task_id} has no handler for event {event_id}; skipping"
                    );
                    continue;
                };
                #[cfg(feature = "dispatch-trace")]
                log::trace!("[dispatch] run task {task_id} arg={:#x}", runner.arg);
                let _status = handler(runner.task, runner.arg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use portable_atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::event::{Event, HandlerStatus};

    static RUNS: AtomicUsize = AtomicUsize::new(0);

    fn count(_task: &Task, _arg: usize) -> HandlerStatus {
        RUNS.fetch_add(1, Ordering::SeqCst);
        HandlerStatus::Handled
    }

    #[test]
    fn snapshot_resolves_each_task_once() {
        let events = [Event::new(), Event::new()];
        let task = Task::new();
        let registry: EventRegistry<'_> = EventRegistry::default();
        registry.init_task(&task, Some(count), 3).unwrap();
        for event in &events {
            registry.init_event(event).unwrap();
            registry.register_handler(&task, event).unwrap();
            registry.enable_event(event).unwrap();
            registry.set_event(event).unwrap();
        }

        let snapshot = registry.critical(Tables::snapshot);
        assert_eq!(snapshot.fired.len(), 2);
        assert_eq!(snapshot.runners.iter().flatten().count(), 1);
        assert_eq!(snapshot.runners[0].map(|runner| runner.arg), Some(3));
        assert!(!registry.is_pending(&events[0]));
        assert!(!registry.is_pending(&events[1]));
    }
}
