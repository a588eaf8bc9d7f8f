//! rtcore: a small real-time kernel in Rust
//!
//! A statically allocated kernel for single-core Cortex-M parts providing:
//! - Fixed-priority preemptive scheduling with optional time slicing
//! - Queues, semaphores, mutexes with priority inheritance, queue sets
//! - Direct-to-task notifications
//! - Tick-based delays and timeouts
//! - Software timers run by a service task
//!
//! The scheduler itself is the [`Kernel`] value, which is pure and can be
//! driven on the host; [`os`] wraps one global instance for the target.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

// Kernel critical sections raise BASEPRI to the system-call ceiling instead
// of masking every interrupt, so interrupts above the ceiling keep their
// latency. They must not call into the kernel.
#[cfg(target_arch = "arm")]
mod cs_impl {
    use critical_section::{set_impl, Impl, RawRestoreState};

    use crate::critical::{mask_kernel_interrupts, unmask_kernel_interrupts};

    struct BasepriCriticalSection;
    set_impl!(BasepriCriticalSection);

    unsafe impl Impl for BasepriCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            mask_kernel_interrupts()
        }

        unsafe fn release(outermost: RawRestoreState) {
            if outermost {
                unsafe { unmask_kernel_interrupts() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod os;
pub mod port;
pub mod sync;
#[cfg(feature = "timers")]
pub mod timer;

// ============ Re-exports ============

pub use crate::core::{config, critical, cs_cell, error, kernel, list, object, prio, sched, task, time, types};

pub use crate::core::config::KernelConfig;
pub use crate::core::error::{OsError, OsResult};
pub use crate::core::kernel::{Isr, Kernel, OsHooks};
pub use crate::core::time::{ms_to_ticks, Deadline};
pub use crate::core::types::*;
pub use crate::sync::queue::Queue;

#[cfg(feature = "sem")]
pub use crate::sync::sem;
#[cfg(feature = "mutex")]
pub use crate::sync::mutex;
#[cfg(feature = "notify")]
pub use crate::sync::notify::{self, NotifyAction};
#[cfg(feature = "queue-set")]
pub use crate::sync::queue_set;

#[cfg(feature = "timers")]
pub use crate::timer::{TimerCallback, TimerCommand, TimerId, TimerPool, TimerService};
