// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Resolve build-time table capacities and emit them into OUT_DIR.
// Author: Lukas Bower

//! Build script that fixes the registry capacities for the target.
//!
//! Capacities come from the environment so integrators can size the tables
//! without patching the crate:
//!
//! - `METALCORE_MAX_EVENTS` (default 64)
//! - `METALCORE_MAX_TASKS` (default 64)

use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_MAX_EVENTS: usize = 64;
const DEFAULT_MAX_TASKS: usize = 64;

fn main() {
    println!("cargo:rerun-if-env-changed=METALCORE_MAX_EVENTS");
    println!("cargo:rerun-if-env-changed=METALCORE_MAX_TASKS");
    println!("cargo:rerun-if-changed=build.rs");

    let word_bits = env::var("CARGO_CFG_TARGET_POINTER_WIDTH")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(64);

    let max_events = capacity("METALCORE_MAX_EVENTS", DEFAULT_MAX_EVENTS);
    let max_tasks = capacity("METALCORE_MAX_TASKS", DEFAULT_MAX_TASKS);

    for (name, value) in [
        ("METALCORE_MAX_EVENTS", max_events),
        ("METALCORE_MAX_TASKS", max_tasks),
    ] {
        if value == 0 || value % word_bits != 0 {
            panic!(
                "{name}={value} must be a non-zero multiple of the target word width ({word_bits} bits)"
            );
        }
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    let generated = format!(
        "/// Capacity of the event table.\n\
         pub const MAX_EVENTS: usize = {max_events};\n\
         /// Capacity of the task table.\n\
         pub const MAX_TASKS: usize = {max_tasks};\n"
    );
    fs::write(out_dir.join("capacity.rs"), generated).expect("write capacity.rs");
}

fn capacity(var: &str, default: usize) -> usize {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .unwrap_or_else(|err| panic!("{var}={raw:?} is not a valid capacity: {err}")),
        Err(_) => default,
    }
}
