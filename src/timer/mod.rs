//! Software timers
//!
//! Timers belong to the timer service, which runs as an ordinary task at
//! `CFG_TIMER_TASK_PRIORITY`. Other tasks and interrupts never touch timer
//! state: they reserve an id from the lock-free [`TimerPool`] and send
//! [`TimerCommand`]s through the timer command queue. The service keeps the
//! active timers in a min-heap keyed on expiry, runs callbacks in its own
//! task context and reloads periodic timers, catching up any periods it
//! missed so no expiry is skipped.

use heapless::binary_heap::{BinaryHeap, Min};
use heapless::Vec;
use portable_atomic::{AtomicU32, Ordering};

use crate::config::{CFG_MAX_TIMERS, CFG_TIMER_QUEUE_LENGTH};
use crate::error::{OsError, OsResult};
use crate::sync::queue::Queue;
use crate::types::{OsTick, Timeout};

const _: () = assert!(CFG_MAX_TIMERS <= 32, "timer pool is a 32-bit map");

/// Handle to a software timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerId(u8);

impl TimerId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Function run by the timer service when a timer expires
pub type TimerCallback = fn(TimerId);

/// Lock-free allocator of timer ids
pub struct TimerPool {
    used: AtomicU32,
}

impl TimerPool {
    const MASK: u32 = if CFG_MAX_TIMERS >= 32 {
        u32::MAX
    } else {
        (1 << CFG_MAX_TIMERS) - 1
    };

    pub const fn new() -> Self {
        TimerPool {
            used: AtomicU32::new(0),
        }
    }

    /// Claim a free id
    pub fn reserve(&self) -> OsResult<TimerId> {
        let mut slot = 0;
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let free = !used & Self::MASK;
                if free == 0 {
                    return None;
                }
                slot = free.trailing_zeros();
                Some(used | 1 << slot)
            })
            .map_err(|_| OsError::TmrPoolFull)?;
        Ok(TimerId(slot as u8))
    }

    /// Give an id back
    pub fn release(&self, id: TimerId) {
        self.used.fetch_and(!(1 << id.0), Ordering::AcqRel);
    }

    #[inline]
    pub fn is_reserved(&self, id: TimerId) -> bool {
        id.index() < CFG_MAX_TIMERS && self.used.load(Ordering::Acquire) & (1 << id.0) != 0
    }

    /// Ids currently reserved
    pub fn in_use(&self) -> usize {
        self.used.load(Ordering::Acquire).count_ones() as usize
    }
}

impl Default for TimerPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Request to the timer service
///
/// `issued` is the tick at which the request was made; expiry is measured
/// from it, not from when the service gets round to it.
#[derive(Debug, Clone, Copy)]
pub enum TimerCommand {
    Create {
        id: TimerId,
        period: OsTick,
        auto_reload: bool,
        callback: TimerCallback,
    },
    Start { id: TimerId, issued: OsTick },
    Reset { id: TimerId, issued: OsTick },
    Stop { id: TimerId },
    ChangePeriod { id: TimerId, period: OsTick, issued: OsTick },
    Delete { id: TimerId },
}

impl TimerCommand {
    /// Define a timer; it stays dormant until started
    pub fn create(
        id: TimerId,
        period: OsTick,
        auto_reload: bool,
        callback: TimerCallback,
    ) -> OsResult<Self> {
        if period == 0 {
            return Err(OsError::TmrInvalidPeriod);
        }
        Ok(TimerCommand::Create {
            id,
            period,
            auto_reload,
            callback,
        })
    }

    /// Change the period and (re)start the timer
    pub fn change_period(id: TimerId, period: OsTick, issued: OsTick) -> OsResult<Self> {
        if period == 0 {
            return Err(OsError::TmrInvalidPeriod);
        }
        Ok(TimerCommand::ChangePeriod { id, period, issued })
    }

    /// Timer the command is about
    pub fn id(&self) -> TimerId {
        match *self {
            TimerCommand::Create { id, .. }
            | TimerCommand::Start { id, .. }
            | TimerCommand::Reset { id, .. }
            | TimerCommand::Stop { id }
            | TimerCommand::ChangePeriod { id, .. }
            | TimerCommand::Delete { id } => id,
        }
    }
}

/// The timer command queue
pub type TimerQueue = Queue<TimerCommand, CFG_TIMER_QUEUE_LENGTH>;

#[derive(Clone, Copy)]
struct TimerSlot {
    callback: Option<TimerCallback>,
    period: OsTick,
    auto_reload: bool,
    active: bool,
    /// Expiry on the service's 64-bit time line
    expiry: u64,
}

impl TimerSlot {
    const EMPTY: TimerSlot = TimerSlot {
        callback: None,
        period: 0,
        auto_reload: false,
        active: false,
        expiry: 0,
    };
}

/// Timer state owned by the timer service task
pub struct TimerService {
    slots: [TimerSlot; CFG_MAX_TIMERS],
    heap: BinaryHeap<(u64, u8), Min, CFG_MAX_TIMERS>,
    /// Ticks on a line that does not wrap
    now: u64,
    last: OsTick,
}

impl TimerService {
    pub const fn new(now: OsTick) -> Self {
        TimerService {
            slots: [TimerSlot::EMPTY; CFG_MAX_TIMERS],
            heap: BinaryHeap::new(),
            now: now as u64,
            last: now,
        }
    }

    /// Advance the 64-bit time line to `now`
    fn sample(&mut self, now: OsTick) -> u64 {
        self.now += now.wrapping_sub(self.last) as u64;
        self.last = now;
        self.now
    }

    /// Place an earlier tick on the 64-bit time line
    fn extend(&self, issued: OsTick) -> u64 {
        self.now.saturating_sub(self.last.wrapping_sub(issued) as u64)
    }

    /// Apply one command
    pub fn process_command(&mut self, cmd: TimerCommand, now: OsTick) {
        self.sample(now);
        let idx = cmd.id().index();
        if idx >= CFG_MAX_TIMERS {
            return;
        }

        match cmd {
            TimerCommand::Create {
                period,
                auto_reload,
                callback,
                ..
            } => {
                self.unschedule(idx);
                self.slots[idx] = TimerSlot {
                    callback: Some(callback),
                    period,
                    auto_reload,
                    active: false,
                    expiry: 0,
                };
            }
            TimerCommand::Start { issued, .. } | TimerCommand::Reset { issued, .. } => {
                if self.slots[idx].callback.is_some() {
                    let expiry = self.extend(issued) + self.slots[idx].period as u64;
                    self.schedule(idx, expiry);
                }
            }
            TimerCommand::ChangePeriod { period, issued, .. } => {
                if self.slots[idx].callback.is_some() {
                    self.slots[idx].period = period;
                    let expiry = self.extend(issued) + period as u64;
                    self.schedule(idx, expiry);
                }
            }
            TimerCommand::Stop { .. } => self.unschedule(idx),
            TimerCommand::Delete { .. } => {
                self.unschedule(idx);
                self.slots[idx] = TimerSlot::EMPTY;
            }
        }
    }

    fn schedule(&mut self, idx: usize, expiry: u64) {
        self.unschedule(idx);
        let slot = &mut self.slots[idx];
        slot.active = true;
        slot.expiry = expiry;
        // One entry per timer at most, so the heap never overflows
        let _ = self.heap.push((expiry, idx as u8));
    }

    fn unschedule(&mut self, idx: usize) {
        if !self.slots[idx].active {
            return;
        }
        self.slots[idx].active = false;

        let mut kept: Vec<(u64, u8), CFG_MAX_TIMERS> = Vec::new();
        while let Some(entry) = self.heap.pop() {
            if entry.1 as usize != idx {
                let _ = kept.push(entry);
            }
        }
        for entry in kept {
            let _ = self.heap.push(entry);
        }
    }

    /// Run the callbacks of every timer due at `now`
    ///
    /// A periodic timer that fell behind fires once for each period it
    /// missed. Returns the number of callbacks run.
    pub fn expire_due(&mut self, now: OsTick) -> usize {
        let now = self.sample(now);
        let mut fired = 0;

        while let Some(&(expiry, id)) = self.heap.peek() {
            if expiry > now {
                break;
            }
            self.heap.pop();

            let idx = id as usize;
            let slot = self.slots[idx];
            let Some(callback) = slot.callback else {
                continue;
            };
            if !slot.active || slot.expiry != expiry {
                continue;
            }

            let mut runs = 1;
            if slot.auto_reload {
                let period = slot.period as u64;
                let mut next = expiry + period;
                while next <= now {
                    runs += 1;
                    next += period;
                }
                self.slots[idx].expiry = next;
                let _ = self.heap.push((next, id));
            } else {
                self.slots[idx].active = false;
            }

            crate::trace!("timer {} expired", id);
            for _ in 0..runs {
                callback(TimerId(id));
            }
            fired += runs;
        }
        fired
    }

    /// Ticks until the earliest expiry, `None` with no timer active
    pub fn next_expiry_in(&self, now: OsTick) -> Option<OsTick> {
        let now = self.now + now.wrapping_sub(self.last) as u64;
        self.heap
            .peek()
            .map(|&(expiry, _)| expiry.saturating_sub(now).min(OsTick::MAX as u64) as OsTick)
    }

    /// How long the service may block on its command queue
    pub fn wait_timeout(&self, now: OsTick) -> Timeout {
        match self.next_expiry_in(now) {
            None => Timeout::Forever,
            Some(ticks) => Timeout::ticks(ticks),
        }
    }

    #[inline]
    pub fn is_active(&self, id: TimerId) -> bool {
        self.slots.get(id.index()).is_some_and(|s| s.active)
    }

    /// Period of a created timer
    pub fn period(&self, id: TimerId) -> Option<OsTick> {
        self.slots
            .get(id.index())
            .filter(|s| s.callback.is_some())
            .map(|s| s.period)
    }

    /// Next expiry of an active timer, on the wrapping tick line
    pub fn expiry_tick(&self, id: TimerId) -> Option<OsTick> {
        self.slots
            .get(id.index())
            .filter(|s| s.active)
            .map(|s| s.expiry as OsTick)
    }

    /// Timers currently counting down
    pub fn active_count(&self) -> usize {
        self.heap.len()
    }
}
