//! Time management module
//!
//! Provides the tick handler, task delays and the bookkeeping behind bounded
//! waits. Tasks with a deadline sit on one delay list sorted by wake tick,
//! so each tick only looks at the head.

use crate::config::CFG_TICK_RATE_HZ;
use crate::error::{OsError, OsResult};
use crate::kernel::{Isr, Kernel};
use crate::types::{OsPendOn, OsPendStatus, OsTick, Timeout};

/// Convert milliseconds to ticks, rounding up so short delays are not lost
#[inline]
pub const fn ms_to_ticks(ms: u32) -> OsTick {
    let ticks = (ms as u64 * CFG_TICK_RATE_HZ as u64).div_ceil(1000);
    if ticks > OsTick::MAX as u64 {
        OsTick::MAX
    } else {
        ticks as OsTick
    }
}

/// `now` is at or past `wake` on the wrapping tick line
#[inline]
pub(crate) fn tick_reached(now: OsTick, wake: OsTick) -> bool {
    now.wrapping_sub(wake) as i32 >= 0
}

/// Wait budget of one blocking call
///
/// Created once when the call starts and handed to every retry, so a waiter
/// woken without getting what it wanted only waits for the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deadline {
    timeout: Timeout,
    start: OsTick,
    /// The call has already blocked at least once
    pub(crate) blocked: bool,
    /// The wait timed out; the retry gets one last attempt
    pub(crate) expired: bool,
}

impl Deadline {
    /// A zero-tick budget is the same as not waiting at all
    pub fn new(timeout: Timeout, now: OsTick) -> Self {
        let timeout = match timeout {
            Timeout::Ticks(0) => Timeout::NoWait,
            other => other,
        };
        Deadline {
            timeout,
            start: now,
            blocked: false,
            expired: false,
        }
    }

    /// Deadline for a call that must not block
    pub const NO_WAIT: Deadline = Deadline {
        timeout: Timeout::NoWait,
        start: 0,
        blocked: false,
        expired: false,
    };

    #[inline]
    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    #[inline]
    pub fn has_blocked(&self) -> bool {
        self.blocked
    }

    /// Absolute wake tick for a bounded wait, or `None` if unbounded
    ///
    /// `Err(Timeout)` once a bounded wait has used up its budget.
    pub(crate) fn wake_tick(&self, now: OsTick) -> OsResult<Option<OsTick>> {
        match self.timeout {
            Timeout::NoWait => Err(OsError::Timeout),
            Timeout::Forever => Ok(None),
            Timeout::Ticks(n) => {
                if now.wrapping_sub(self.start) >= n {
                    Err(OsError::Timeout)
                } else {
                    Ok(Some(self.start.wrapping_add(n)))
                }
            }
        }
    }
}

impl Kernel {
    /// Start a deadline at the current tick
    #[inline]
    pub fn deadline(&self, timeout: Timeout) -> Deadline {
        Deadline::new(timeout, self.tick)
    }

    /// Advance time by one tick
    ///
    /// Wakes every task whose wait ended and applies time slicing. Returns
    /// `true` if a context switch is now due.
    pub(crate) fn tick_increment(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.tick = self.tick.wrapping_add(1);
        let now = self.tick;

        let mut woken = false;
        while let Some(head) = self.tick_list.head() {
            if !tick_reached(now, self.tasks[head].wake_tick) {
                break;
            }
            woken |= self.wake_task(head, OsPendStatus::Timeout);
        }

        if self.time_slice_tick() {
            woken = true;
        }
        self.reschedule();
        woken || self.switch_pending
    }

    /// Insert a task on the delay list in wake-tick order
    pub(crate) fn tick_list_insert(&mut self, idx: usize, wake: OsTick) {
        let now = self.tick;
        self.tasks[idx].wake_tick = wake;
        self.tick_list.insert_ordered(&mut self.tasks, idx, |new, cur| {
            new.wake_tick.wrapping_sub(now) < cur.wake_tick.wrapping_sub(now)
        });
    }

    pub(crate) fn tick_list_remove(&mut self, idx: usize) {
        if self.tasks[idx].tick_links.is_linked() {
            self.tick_list.remove(&mut self.tasks, idx);
        }
    }

    /// Block the running task for `ticks` ticks
    ///
    /// A zero delay only yields.
    pub fn delay(&mut self, ticks: OsTick) -> OsResult<()> {
        if ticks == 0 {
            return self.yield_now();
        }
        let mut deadline = self.deadline(Timeout::Ticks(ticks));
        match self.block_current(&mut deadline, OsPendOn::Delay, OsError::Timeout) {
            OsError::Blocked => Ok(()),
            err => Err(err),
        }
    }

    /// Block until `*last_wake + period`, then advance `*last_wake`
    ///
    /// Gives a fixed execution frequency regardless of how long the task ran
    /// since it last woke. Returns `false` if the wake time had already
    /// passed and the task did not block.
    pub fn delay_until(&mut self, last_wake: &mut OsTick, period: OsTick) -> OsResult<bool> {
        if period == 0 {
            return Err(OsError::TimeZeroDly);
        }
        let now = self.tick;
        let prev = *last_wake;
        let wake = prev.wrapping_add(period);
        *last_wake = wake;

        // Wake time still ahead of `now`, allowing for either value wrapping
        let should_delay = if now < prev {
            wake < prev && wake > now
        } else {
            wake < prev || wake > now
        };
        if !should_delay {
            return Ok(false);
        }

        self.delay(wake.wrapping_sub(now)).map(|()| true)
    }

    /// Wake a delayed or blocked task early; its wait ends with
    /// [`OsError::PendAbort`]
    pub fn task_abort_wait(&mut self, task: crate::types::TaskId) -> OsResult<()> {
        let idx = self.task_check(task)?;
        if !self.tasks[idx].is_blocked() {
            return Err(OsError::TaskNotBlocked);
        }
        self.wake_task(idx, OsPendStatus::Abort);
        Ok(())
    }
}

impl Isr<'_> {
    /// Tick interrupt entry
    pub fn tick(&mut self) -> bool {
        let due = self.kernel.tick_increment();
        self.note(due)
    }
}
