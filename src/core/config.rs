//! Compile-time configuration for rtcore
//!
//! These constants fix priority levels, stack sizes, pool sizes and interrupt
//! priorities. They follow the application's kernel configuration header;
//! the optional subsystems themselves are selected with Cargo features.

use crate::types::{OsPrio, OsTick};

/// Number of priority levels (0 = lowest, `CFG_MAX_PRIORITIES - 1` = most urgent)
pub const CFG_MAX_PRIORITIES: usize = 32;

/// Preemptive scheduling is always on; kept for parity with the config header
pub const CFG_USE_PREEMPTION: bool = true;

/// CPU core clock in Hz, used to program the tick timer
pub const CFG_CPU_CLOCK_HZ: u32 = 16_000_000;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Minimum task stack size, in stack words
pub const CFG_MINIMAL_STACK_SIZE: usize = 128;

/// Task names are truncated to this many bytes
pub const CFG_MAX_TASK_NAME_LEN: usize = 10;

/// Idle task yields to other priority-0 tasks each time round its loop
pub const CFG_IDLE_SHOULD_YIELD: bool = true;

/// Round-robin among equal priorities on tick
pub const CFG_USE_TIME_SLICING: bool = false;

/// Ticks in one time slice when time slicing is enabled
pub const CFG_TIME_SLICE_TICKS: OsTick = 1;

/// Stack overflow detection level (0 = off, 1 = bounds, 2 = bounds + guard words)
pub const CFG_CHECK_FOR_STACK_OVERFLOW: u8 = 1;

/// Number of named entries in the queue registry
pub const CFG_QUEUE_REGISTRY_SIZE: usize = 8;

/// Task control blocks available, idle and timer tasks included
pub const CFG_MAX_TASKS: usize = 16;

/// Kernel objects (queues, semaphores, mutexes, queue sets) available
pub const CFG_MAX_OBJECTS: usize = 32;

/// Total queued-handle capacity of one queue set
pub const CFG_QUEUE_SET_LENGTH: usize = 16;

/// Software timers available (at most 32, one bit each in the id pool)
pub const CFG_MAX_TIMERS: usize = 16;

/// Timer service task priority
pub const CFG_TIMER_TASK_PRIORITY: OsPrio = (CFG_MAX_PRIORITIES - 1) as OsPrio;

/// Timer command queue length
pub const CFG_TIMER_QUEUE_LENGTH: usize = 5;

/// Timer service task stack depth, in stack words
pub const CFG_TIMER_TASK_STACK_DEPTH: usize = 2000 / core::mem::size_of::<u32>();

/// Idle task stack depth, in stack words
pub const CFG_IDLE_TASK_STACK_DEPTH: usize = 2000 / core::mem::size_of::<u32>();

/// Idle task priority
pub const CFG_PRIO_IDLE: OsPrio = 0;

/// Implemented NVIC priority bits
pub const CFG_PRIO_BITS: u8 = 4;

/// Lowest interrupt priority (used for the tick and context switch exceptions)
pub const CFG_LIBRARY_LOWEST_INTERRUPT_PRIORITY: u8 = 15;

/// Highest interrupt priority allowed to call `FromISR` operations
pub const CFG_LIBRARY_MAX_SYSCALL_INTERRUPT_PRIORITY: u8 = 4;

/// Kernel interrupt priority as written to the priority registers
pub const CFG_KERNEL_INTERRUPT_PRIORITY: u8 =
    CFG_LIBRARY_LOWEST_INTERRUPT_PRIORITY << (8 - CFG_PRIO_BITS);

/// BASEPRI ceiling used by kernel critical sections
pub const CFG_MAX_SYSCALL_INTERRUPT_PRIORITY: u8 =
    CFG_LIBRARY_MAX_SYSCALL_INTERRUPT_PRIORITY << (8 - CFG_PRIO_BITS);

/// Scheduling policy chosen when the kernel is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KernelConfig {
    /// Rotate equal-priority tasks when a slice expires
    pub use_time_slicing: bool,
    /// Slice length in ticks
    pub time_slice_ticks: OsTick,
    /// Idle task gives way to other priority-0 tasks
    pub idle_should_yield: bool,
    /// Stack overflow detection level
    pub check_stack_overflow: u8,
}

impl KernelConfig {
    /// Configuration built from the `CFG_*` constants
    pub const DEFAULT: KernelConfig = KernelConfig {
        use_time_slicing: CFG_USE_TIME_SLICING,
        time_slice_ticks: CFG_TIME_SLICE_TICKS,
        idle_should_yield: CFG_IDLE_SHOULD_YIELD,
        check_stack_overflow: CFG_CHECK_FOR_STACK_OVERFLOW,
    };

    /// Same configuration with time slicing switched on
    pub const fn with_time_slicing(mut self, slice: OsTick) -> Self {
        self.use_time_slicing = true;
        self.time_slice_ticks = if slice == 0 { 1 } else { slice };
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
