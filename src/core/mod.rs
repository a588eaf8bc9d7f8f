//! Core kernel modules
//!
//! Kernel state, scheduler, tasks, time, and the object arena the
//! synchronization primitives are built on.

pub mod config;
pub mod critical;
pub mod cs_cell;
pub mod error;
pub mod kernel;
pub mod list;
pub mod object;
pub mod prio;
pub mod sched;
pub mod task;
pub mod time;
pub mod types;
