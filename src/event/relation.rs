// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Many-to-many subscription relation between tasks and events.
// Author: Lukas Bower

use super::{Event, EventRegistry, Task};
use crate::error::Result;
use crate::irq::IrqControl;

impl<I: IrqControl> EventRegistry<'_, I> {
    /// Subscribe `task` to `event`.
    ///
    /// Both records must be registered here. The two sides of the relation
    /// are written in the same critical section.
    pub fn register_handler(&self, task: &Task, event: &Event) -> Result<()> {
        self.critical(|tables| {
            let event_id = tables.event_index(event)?;
            let task_id = tables.task_index(task)?;
            event.tasks.set(task_id);
            task.events.set(event_id);
            Ok(())
        })
    }

    /// Drop the subscription of `task` to `event`.
    ///
    /// Fails with `InvalidArgument` without touching either side if one of the
    /// records is not registered here.
    pub fn unregister_handler(&self, task: &Task, event: &Event) -> Result<()> {
        self.critical(|tables| {
            let event_id = tables.event_index(event)?;
            let task_id = tables.task_index(task)?;
            event.tasks.clear(task_id);
            task.events.clear(event_id);
            Ok(())
        })
    }
}
