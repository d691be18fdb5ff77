// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Crate root for the metalcore event dispatcher and ordered I/O substrate.
// Author: Lukas Bower
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(deprecated)]
#![warn(missing_docs)]

//! Hardware-abstraction substrate for drivers running on embedded and
//! heterogeneous-processing targets.
//!
//! Two subsystems carry the weight:
//!
//! - [`event`]: fixed-capacity event and task tables, a many-to-many
//!   subscription relation, and a dispatcher that snapshots pending work with
//!   interrupts masked before calling handlers with interrupts restored.
//! - [`io`]: block read/write/fill over memory-mapped regions, honouring a
//!   memory ordering and, for device memory, only issuing naturally aligned
//!   word or byte accesses to the far side.
//!
//! Everything is allocation-free. Table sizes are fixed at build time (see
//! [`config`]). The [`timer`] and [`poll`] layers each wrap one event, and
//! [`global`] exposes a process-wide registry for integrators that want a
//! single `dispatch()` entry point.

pub mod bitmap;
pub mod config;
pub mod error;
pub mod event;
pub mod global;
pub mod io;
pub mod irq;
pub mod poll;
pub mod timer;

pub use error::{transfer_status, Error, Result};
pub use event::{Event, EventId, EventRegistry, HandlerStatus, Task, TaskHandler, TaskId};
pub use io::{IoOps, IoRegion, IoWord, MemFlags, MemoryBus, Strategy, VolatileBus};
pub use irq::{HostIrq, IrqControl, IrqToken, PlatformIrq};
pub use poll::{PollEvent, PollFn};
pub use timer::{Timer, TimerBackend};
