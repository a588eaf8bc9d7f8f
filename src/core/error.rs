//! Kernel error codes
//!
//! Every fallible call returns `OsResult`. Codes keep stable numeric values
//! so they can be logged as plain integers.

/// Why a kernel call did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    // blocking
    /// The caller was placed on a wait list; yield and call again
    Blocked = 1,

    // interrupt context
    /// Blocking call made from an interrupt handler
    PendIsr = 10001,

    // mutex
    /// Unlock by a task that does not hold the mutex
    MutexNotOwner = 22401,
    /// Relock of a non-recursive mutex by its holder
    MutexOwner = 22402,
    /// Recursive lock depth exhausted
    MutexOvf = 22404,

    // objects
    /// The object was deleted while the caller waited on it
    ObjDel = 24002,
    /// Handle does not name a live object
    ObjInvalid = 24003,
    /// The handle names a different kind of object
    ObjType = 24004,
    /// All object slots are in use
    ObjPoolFull = 24005,
    /// All registry entries are in use
    RegistryFull = 24006,

    // os state
    /// The scheduler has not been started
    OsNotRunning = 24201,
    /// Init or start called twice
    OsRunning = 24202,
    /// Start called before init
    OsNotInit = 24203,

    // pend
    /// The wait was cancelled by abort, suspend or delete
    PendAbort = 25001,
    /// Resource unavailable and the caller asked not to wait
    PendWouldBlock = 25008,

    // priority
    /// Priority out of range or reserved for idle
    PrioInvalid = 25203,

    // queue
    /// No free slot in the queue
    QFull = 26001,
    /// Nothing to receive
    QEmpty = 26002,
    /// Queue capacity out of range
    QSize = 26003,

    // queue set
    /// Member already belongs to a set
    SetMember = 26101,
    /// Member is not in this set
    SetNotMember = 26102,
    /// Member must be empty to join or leave a set
    SetMemberNotEmpty = 26103,
    /// Set capacity would not cover all members
    SetFull = 26104,

    // notification
    /// A notification is already pending and overwriting is not allowed
    NotifyPending = 26201,

    // scheduler
    /// Blocking call while the scheduler is locked
    SchedLocked = 28003,
    /// Unlock without a matching lock
    SchedNotLocked = 28004,
    /// Lock depth exhausted
    LockNestingOvf = 28006,

    // semaphore
    /// Semaphore already at its maximum count
    SemOvf = 28101,

    // stack
    /// Stack region below the minimum size
    StkSizeInvalid = 28208,

    // task
    /// The idle task cannot be deleted
    TaskDelIdle = 29004,
    /// Handle does not name a live task
    TaskInvalid = 29007,
    /// All task slots are in use
    TaskNoMoreTcb = 29008,
    /// Abort on a task that is not waiting
    TaskNotBlocked = 29009,
    /// Resume on a task that is not suspended
    TaskNotSuspended = 29011,
    /// The idle task cannot be suspended
    TaskSuspendIdle = 29019,

    // time
    /// A periodic delay needs a non-zero period
    TimeZeroDly = 29301,

    // timeout
    /// A bounded wait ran out
    Timeout = 29401,

    // timer
    /// Timer pool exhausted
    TmrPoolFull = 29502,
    /// Timer period of zero ticks
    TmrInvalidPeriod = 29504,
    /// Handle does not name a live timer
    TmrInvalid = 29506,
}

/// Result of a kernel call
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    /// Contract violations: continuing would risk corrupting scheduler state
    pub fn is_programming_error(self) -> bool {
        matches!(
            self,
            OsError::PendIsr
                | OsError::MutexNotOwner
                | OsError::MutexOwner
                | OsError::ObjInvalid
                | OsError::ObjType
                | OsError::TaskInvalid
                | OsError::TaskDelIdle
                | OsError::TaskSuspendIdle
                | OsError::SchedNotLocked
                | OsError::TmrInvalid
        )
    }

    /// A bounded wait ended without the condition being met
    #[inline]
    pub fn is_timeout(self) -> bool {
        self == OsError::Timeout
    }

    /// Static pool exhausted at creation time
    pub fn is_exhaustion(self) -> bool {
        matches!(
            self,
            OsError::ObjPoolFull
                | OsError::RegistryFull
                | OsError::TaskNoMoreTcb
                | OsError::TmrPoolFull
        )
    }
}

impl core::fmt::Display for OsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            OsError::Blocked => "caller blocked",
            OsError::PendIsr => "blocking call from interrupt",
            OsError::MutexNotOwner => "mutex not held by caller",
            OsError::MutexOwner => "mutex already held by caller",
            OsError::MutexOvf => "mutex recursion overflow",
            OsError::ObjDel => "object deleted while waiting",
            OsError::ObjInvalid => "invalid object handle",
            OsError::ObjType => "wrong object type",
            OsError::ObjPoolFull => "object pool full",
            OsError::RegistryFull => "registry full",
            OsError::OsNotRunning => "scheduler not running",
            OsError::OsRunning => "kernel already running",
            OsError::OsNotInit => "kernel not initialized",
            OsError::PendAbort => "wait aborted",
            OsError::PendWouldBlock => "would block",
            OsError::PrioInvalid => "invalid priority",
            OsError::QFull => "queue full",
            OsError::QEmpty => "queue empty",
            OsError::QSize => "invalid queue size",
            OsError::SetMember => "already in a queue set",
            OsError::SetNotMember => "not in this queue set",
            OsError::SetMemberNotEmpty => "queue set member not empty",
            OsError::SetFull => "queue set too small",
            OsError::NotifyPending => "notification pending",
            OsError::SchedLocked => "scheduler locked",
            OsError::SchedNotLocked => "scheduler not locked",
            OsError::LockNestingOvf => "scheduler lock overflow",
            OsError::SemOvf => "semaphore overflow",
            OsError::StkSizeInvalid => "stack too small",
            OsError::TaskDelIdle => "cannot delete idle task",
            OsError::TaskInvalid => "invalid task handle",
            OsError::TaskNoMoreTcb => "task table full",
            OsError::TaskNotBlocked => "task not blocked",
            OsError::TaskNotSuspended => "task not suspended",
            OsError::TaskSuspendIdle => "cannot suspend idle task",
            OsError::TimeZeroDly => "zero period",
            OsError::Timeout => "timed out",
            OsError::TmrPoolFull => "timer pool full",
            OsError::TmrInvalidPeriod => "invalid timer period",
            OsError::TmrInvalid => "invalid timer handle",
        };
        write!(f, "{} ({})", text, *self as u16)
    }
}
