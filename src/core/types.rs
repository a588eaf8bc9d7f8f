//! Core type definitions for rtcore
//!
//! These types provide strong typing for kernel handles, task states and
//! wait outcomes.

/// Task priority (0 = lowest, higher = more urgent)
pub type OsPrio = u8;

/// Tick counter type
pub type OsTick = u32;

/// Semaphore counter type
pub type OsSemCtr = u32;

/// Nesting counter
pub type OsNestingCtr = u8;

/// Stack element type
pub type OsStkElement = u32;

/// Task notification value
pub type OsNotifyValue = u32;

/// Handle to a task control block
///
/// The generation changes every time the slot is reused, so a handle kept
/// after its task was deleted is rejected instead of aliasing a new task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId {
    pub(crate) index: u8,
    pub(crate) generation: u16,
}

impl TaskId {
    /// Slot index inside the task arena
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// Handle to a kernel object (queue, semaphore, mutex or queue set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ObjId {
    pub(crate) index: u8,
    pub(crate) generation: u16,
}

impl ObjId {
    /// Slot index inside the object arena
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// How long a blocking call may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timeout {
    /// Fail immediately if the call would block
    NoWait,
    /// Wait at most this many ticks
    Ticks(OsTick),
    /// Wait indefinitely
    Forever,
}

impl Timeout {
    /// `Ticks(0)` is the same as `NoWait`
    #[inline]
    pub fn ticks(ticks: OsTick) -> Self {
        if ticks == 0 {
            Timeout::NoWait
        } else {
            Timeout::Ticks(ticks)
        }
    }
}

/// Task state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsTaskState {
    /// Runnable, waiting for the CPU
    Ready = 0,
    /// Currently executing
    Running = 1,
    /// Waiting on a delay, a kernel object or a notification
    Blocked = 2,
    /// Removed from scheduling until resumed
    Suspended = 3,
    /// Terminal; the slot is reclaimed later
    Deleted = 4,
}

/// Which wait list of an object a task sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitSide {
    /// Waiting for space (queue senders)
    Send,
    /// Waiting for data, a count or ownership
    Receive,
}

/// What a blocked task is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OsPendOn {
    Nothing,
    Delay,
    Object(ObjId, WaitSide),
    Notification,
}

/// Why a blocked task was made ready again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsPendStatus {
    /// Still waiting, or never waited
    Pending = 0,
    /// The awaited condition was signalled; retry the operation
    Ok = 1,
    /// Ownership was handed over directly (mutexes)
    Granted = 2,
    /// Pend was aborted (explicit wake or suspension)
    Abort = 3,
    /// Object was deleted while pending
    Del = 4,
    /// Timeout occurred
    Timeout = 5,
}

/// Snapshot of one task, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: &'static str,
    pub state: OsTaskState,
    pub base_prio: OsPrio,
    pub prio: OsPrio,
    /// Stack words never touched since creation
    pub stack_high_water: usize,
}
