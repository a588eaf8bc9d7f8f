//! Synchronization primitives
//!
//! Queues, semaphores, mutexes, queue sets and task notifications, all on
//! the shared blocking machinery in `wait`.

mod wait;

pub mod queue;

#[cfg(feature = "sem")]
pub mod sem;

#[cfg(feature = "mutex")]
pub mod mutex;

#[cfg(feature = "queue-set")]
pub mod queue_set;

#[cfg(feature = "notify")]
pub mod notify;
