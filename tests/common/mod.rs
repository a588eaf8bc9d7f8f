//! Helpers shared by the kernel integration tests
//!
//! Tests drive one `Kernel` value directly. The "running" task is whatever
//! `switch_context` last dispatched; a test plays that task by calling
//! kernel operations, then calls [`run`] where the hardware would take
//! PendSV.

#![allow(dead_code)]

use rtcore::config::CFG_MINIMAL_STACK_SIZE;
use rtcore::{Kernel, KernelConfig, OsPrio, OsStkElement, TaskId};

pub fn stack() -> &'static mut [OsStkElement] {
    Box::leak(vec![0; CFG_MINIMAL_STACK_SIZE].into_boxed_slice())
}

pub fn task_body(_: *mut ()) -> ! {
    loop {
        std::hint::spin_loop();
    }
}

/// Kernel with its idle task, not yet started
pub fn kernel() -> Kernel {
    kernel_with(KernelConfig::DEFAULT)
}

pub fn kernel_with(config: KernelConfig) -> Kernel {
    let mut k = Kernel::new(config);
    k.init(stack()).unwrap();
    k
}

pub fn spawn(k: &mut Kernel, name: &'static str, prio: OsPrio) -> TaskId {
    k.task_create(stack(), name, task_body, core::ptr::null_mut(), prio)
        .unwrap()
}

/// Perform the pending context switch, if any
pub fn run(k: &mut Kernel) -> Option<TaskId> {
    k.switch_context()
}

/// One tick interrupt, followed by the switch it requested
pub fn tick(k: &mut Kernel) {
    let mut isr = k.isr();
    isr.tick();
    if isr.exit() {
        run(k);
    }
}

pub fn ticks(k: &mut Kernel, n: u32) {
    for _ in 0..n {
        tick(k);
    }
}

pub fn prio_of(k: &Kernel, task: TaskId) -> OsPrio {
    k.task_info(task).unwrap().prio
}
