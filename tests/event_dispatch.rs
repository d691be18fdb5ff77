// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Validate snapshot-then-invoke dispatch ordering and coverage.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use metalcore::config::{MAX_EVENTS, MAX_TASKS};
use metalcore::{Event, EventRegistry, HandlerStatus, HostIrq, IrqControl, IrqToken, Task};

static ORDER: Mutex<Vec<usize>> = Mutex::new(Vec::new());

fn record_order(_task: &Task, arg: usize) -> HandlerStatus {
    ORDER.lock().expect("order lock").push(arg);
    HandlerStatus::Handled
}

#[test]
fn task_on_two_active_events_runs_twice_in_event_order() {
    let first = Event::new();
    let second = Event::new();
    let shared = Task::new();
    let late = Task::new();
    let registry: EventRegistry<'_> = EventRegistry::default();

    registry.init_event(&first).expect("init first");
    registry.init_event(&second).expect("init second");
    registry.init_task(&shared, Some(record_order), 10).expect("init shared");
    registry.init_task(&late, Some(record_order), 20).expect("init late");
    registry.register_handler(&late, &second).expect("late -> second");
    registry.register_handler(&shared, &second).expect("shared -> second");
    registry.register_handler(&shared, &first).expect("shared -> first");

    for event in [&first, &second] {
        registry.enable_event(event).expect("enable");
        registry.set_event(event).expect("set");
    }
    registry.dispatch();

    assert_eq!(*ORDER.lock().expect("order lock"), vec![10, 10, 20]);
    assert!(!registry.is_pending(&first));
    assert!(!registry.is_pending(&second));

    registry.dispatch();
    assert_eq!(ORDER.lock().expect("order lock").len(), 3);
}

static DEFERRED_CALLS: AtomicUsize = AtomicUsize::new(0);

fn count_deferred(_task: &Task, _arg: usize) -> HandlerStatus {
    DEFERRED_CALLS.fetch_add(1, Ordering::SeqCst);
    HandlerStatus::Handled
}

#[test]
fn disabled_event_waits_for_enable_and_next_dispatch() {
    let event = Event::new();
    let task = Task::new();
    let registry: EventRegistry<'_> = EventRegistry::default();
    registry.init_event(&event).expect("init event");
    registry.init_task(&task, Some(count_deferred), 0).expect("init task");
    registry.register_handler(&task, &event).expect("subscribe");

    registry.set_event(&event).expect("set");
    registry.dispatch();
    assert_eq!(DEFERRED_CALLS.load(Ordering::SeqCst), 0);
    assert!(registry.is_pending(&event));

    registry.enable_event(&event).expect("enable");
    assert_eq!(DEFERRED_CALLS.load(Ordering::SeqCst), 0);
    registry.dispatch();
    assert_eq!(DEFERRED_CALLS.load(Ordering::SeqCst), 1);
    assert!(!registry.is_pending(&event));
}

static FLOOD_CALLS: AtomicUsize = AtomicUsize::new(0);

fn count_flood(_task: &Task, _arg: usize) -> HandlerStatus {
    FLOOD_CALLS.fetch_add(1, Ordering::SeqCst);
    HandlerStatus::Handled
}

#[test]
fn one_dispatch_covers_every_active_event() {
    let events: Vec<Event> = (0..MAX_EVENTS).map(|_| Event::new()).collect();
    let tasks: Vec<Task> = (0..MAX_TASKS).map(|_| Task::new()).collect();
    let registry: EventRegistry<'_> = EventRegistry::default();

    for task in &tasks {
        registry.init_task(task, Some(count_flood), 0).expect("init task");
    }
    for event in &events {
        registry.init_event(event).expect("init event");
        for task in &tasks {
            registry.register_handler(task, event).expect("subscribe");
        }
        registry.enable_event(event).expect("enable");
        registry.set_event(event).expect("set");
    }

    registry.dispatch();
    assert_eq!(FLOOD_CALLS.load(Ordering::SeqCst), MAX_EVENTS * MAX_TASKS);
    for event in &events {
        assert!(!registry.is_pending(event));
    }

    registry.dispatch();
    assert_eq!(FLOOD_CALLS.load(Ordering::SeqCst), MAX_EVENTS * MAX_TASKS);
}

static UNMASKED_IRQ: HostIrq = HostIrq::new();
static RAN_MASKED: AtomicBool = AtomicBool::new(false);
static UNMASKED_CALLS: AtomicUsize = AtomicUsize::new(0);

fn observe_mask(_task: &Task, _arg: usize) -> HandlerStatus {
    if UNMASKED_IRQ.is_masked() {
        RAN_MASKED.store(true, Ordering::SeqCst);
    }
    UNMASKED_CALLS.fetch_add(1, Ordering::SeqCst);
    HandlerStatus::NotHandled
}

#[test]
fn handlers_run_with_interrupts_restored() {
    let event = Event::new();
    let task = Task::new();
    let registry = EventRegistry::new(&UNMASKED_IRQ);
    registry.init_event(&event).expect("init event");
    registry.init_task(&task, Some(observe_mask), 0).expect("init task");
    registry.register_handler(&task, &event).expect("subscribe");
    registry.enable_event(&event).expect("enable");
    registry.set_event(&event).expect("set");

    let before = UNMASKED_IRQ.sections();
    registry.dispatch();
    assert_eq!(UNMASKED_CALLS.load(Ordering::SeqCst), 1);
    assert!(!RAN_MASKED.load(Ordering::SeqCst));
    assert_eq!(UNMASKED_IRQ.sections() - before, 1);
}

static REARM_REGISTRY: EventRegistry<'static> = EventRegistry::new(HostIrq::new());
static REARM_EVENT: Event = Event::new();
static REARM_TASK: Task = Task::new();
static REARM_CALLS: AtomicUsize = AtomicUsize::new(0);

fn rearm(_task: &Task, _arg: usize) -> HandlerStatus {
    if REARM_CALLS.fetch_add(1, Ordering::SeqCst) == 0 {
        REARM_REGISTRY.set_event(&REARM_EVENT).expect("re-arm from handler");
    }
    HandlerStatus::Handled
}

#[test]
fn handler_rearming_its_event_runs_on_next_dispatch() {
    REARM_REGISTRY.init_event(&REARM_EVENT).expect("init event");
    REARM_REGISTRY
        .init_task(&REARM_TASK, Some(rearm), 0)
        .expect("init task");
    REARM_REGISTRY
        .register_handler(&REARM_TASK, &REARM_EVENT)
        .expect("subscribe");
    REARM_REGISTRY.enable_event(&REARM_EVENT).expect("enable");
    REARM_REGISTRY.set_event(&REARM_EVENT).expect("set");

    REARM_REGISTRY.dispatch();
    assert_eq!(REARM_CALLS.load(Ordering::SeqCst), 1);
    assert!(REARM_REGISTRY.is_pending(&REARM_EVENT));

    REARM_REGISTRY.dispatch();
    assert_eq!(REARM_CALLS.load(Ordering::SeqCst), 2);
    assert!(!REARM_REGISTRY.is_pending(&REARM_EVENT));
}

#[test]
fn unsubscribed_task_is_not_invoked() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    fn count(_task: &Task, _arg: usize) -> HandlerStatus {
        CALLS.fetch_add(1, Ordering::SeqCst);
        HandlerStatus::Handled
    }

    let event = Event::new();
    let task = Task::new();
    let registry: EventRegistry<'_> = EventRegistry::default();
    registry.init_event(&event).expect("init event");
    registry.init_task(&task, Some(count), 0).expect("init task");
    registry.register_handler(&task, &event).expect("subscribe");
    registry.unregister_handler(&task, &event).expect("unsubscribe");
    registry.enable_event(&event).expect("enable");
    registry.set_event(&event).expect("set");

    registry.dispatch();
    assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    assert!(!registry.is_pending(&event));
}

/// Interrupt control that takes one pending interrupt the moment the
/// outermost masked section ends, the way a real core would.
struct DeferredIrq {
    depth: AtomicUsize,
    raised: AtomicBool,
}

impl DeferredIrq {
    const fn new() -> Self {
        Self {
            depth: AtomicUsize::new(0),
            raised: AtomicBool::new(false),
        }
    }

    fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }
}

impl IrqControl for DeferredIrq {
    fn save_disable(&self) -> IrqToken {
        IrqToken::from_raw(self.depth.fetch_add(1, Ordering::SeqCst))
    }

    fn restore(&self, token: IrqToken) {
        self.depth.store(token.into_raw(), Ordering::SeqCst);
        if token.into_raw() == 0 && self.raised.swap(false, Ordering::SeqCst) {
            // Interrupt epilogue.
            ISR_REGISTRY.dispatch();
        }
    }
}

static ISR_REGISTRY: EventRegistry<'static, DeferredIrq> = EventRegistry::new(DeferredIrq::new());
static ISR_EVENT: Event = Event::new();
static ISR_TASK: Task = Task::new();
static ISR_SEEN_ARG: AtomicUsize = AtomicUsize::new(0);

fn read_own_binding(task: &Task, arg: usize) -> HandlerStatus {
    let bound = ISR_REGISTRY.task_arg(task).expect("binding readable from handler");
    ISR_SEEN_ARG.store(bound + arg, Ordering::SeqCst);
    HandlerStatus::Handled
}

#[test]
fn dispatch_from_interrupt_epilogue_after_binding_read() {
    ISR_REGISTRY.init_event(&ISR_EVENT).expect("init event");
    ISR_REGISTRY
        .init_task(&ISR_TASK, Some(read_own_binding), 21)
        .expect("init task");
    ISR_REGISTRY
        .register_handler(&ISR_TASK, &ISR_EVENT)
        .expect("subscribe");
    ISR_REGISTRY.enable_event(&ISR_EVENT).expect("enable");
    ISR_REGISTRY.set_event(&ISR_EVENT).expect("set");

    ISR_REGISTRY.irq().raise();
    assert_eq!(ISR_REGISTRY.task_arg(&ISR_TASK), Ok(21));
    assert!(ISR_REGISTRY.task_handler(&ISR_TASK).expect("registered").is_some());

    assert_eq!(ISR_SEEN_ARG.load(Ordering::SeqCst), 42);
    assert!(!ISR_REGISTRY.is_pending(&ISR_EVENT));
}
