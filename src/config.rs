// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Build-time capacities for the event and task tables.
// Author: Lukas Bower

//! Build-time table capacities.
//!
//! The values are generated by `build.rs` from `METALCORE_MAX_EVENTS` and
//! `METALCORE_MAX_TASKS`. Both table sizes are multiples of
//! [`BITS_PER_WORD`] so the state bitmaps have no partial words.

use static_assertions::const_assert;

include!(concat!(env!("OUT_DIR"), "/capacity.rs"));

/// Width in bits of one bitmap word.
pub const BITS_PER_WORD: usize = usize::BITS as usize;

/// Words backing a bitmap indexed by event identifier.
pub const EVENT_WORDS: usize = MAX_EVENTS / BITS_PER_WORD;

/// Words backing a bitmap indexed by task identifier.
pub const TASK_WORDS: usize = MAX_TASKS / BITS_PER_WORD;

const_assert!(MAX_EVENTS > 0);
const_assert!(MAX_TASKS > 0);
const_assert!(MAX_EVENTS % BITS_PER_WORD == 0);
const_assert!(MAX_TASKS % BITS_PER_WORD == 0);
