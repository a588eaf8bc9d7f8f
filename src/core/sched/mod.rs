//! Scheduler module
//!
//! Priority-based preemptive scheduling with optional round-robin among
//! equal priorities. The running task stays at the head of its ready list;
//! a switch is due whenever the head of the highest non-empty level is some
//! other task.

mod rdy_list;

pub use rdy_list::ReadyQueue;

use crate::error::{OsError, OsResult};
use crate::kernel::Kernel;
use crate::types::{OsPendOn, OsPrio, OsTaskState, TaskId};

impl Kernel {
    /// Put a task on the tail of its ready list
    pub(crate) fn ready_insert(&mut self, idx: usize) {
        crate::kassert!(!self.tasks[idx].sched_links.is_linked(), "task already on a list");
        self.tasks[idx].task_state = OsTaskState::Ready;
        self.ready.insert_tail(&mut self.tasks, idx);
    }

    /// Take a runnable task off its ready list
    #[inline]
    pub(crate) fn ready_remove(&mut self, idx: usize) {
        self.ready.remove(&mut self.tasks, idx);
    }

    /// The task that should be running: head of the highest non-empty level
    #[inline]
    pub fn highest_ready(&self) -> Option<TaskId> {
        self.ready.highest().map(|idx| self.task_id(idx))
    }

    /// Main scheduling point
    ///
    /// Requests a context switch if the running task is no longer the most
    /// urgent ready task. Called after anything that changes readiness.
    pub(crate) fn reschedule(&mut self) {
        if !self.running {
            return;
        }
        let next = self.ready.highest();
        if next.is_some() && next != self.current_index() {
            self.switch_pending = true;
        }
    }

    /// Perform a pending switch
    ///
    /// Deferred while the scheduler is locked. Returns the task now running.
    pub fn switch_context(&mut self) -> Option<TaskId> {
        if !self.running || self.sched_lock > 0 {
            return None;
        }
        self.switch_pending = false;

        let next = self.ready.highest()?;
        if Some(next) != self.current_index() {
            crate::trace!("switch to {}", self.tasks[next].name);
        }
        self.dispatch(next);
        Some(self.task_id(next))
    }

    /// Give the CPU to the next ready task of the same priority
    pub fn yield_now(&mut self) -> OsResult<()> {
        let cur = self.current_idx()?;
        if self.tasks[cur].is_ready() {
            self.ready.move_to_tail(&mut self.tasks, cur);
        }
        self.reschedule();
        Ok(())
    }

    /// Disable task switching; nests
    pub fn sched_lock(&mut self) -> OsResult<()> {
        if !self.running {
            return Err(OsError::OsNotRunning);
        }
        self.sched_lock = self
            .sched_lock
            .checked_add(1)
            .ok_or(OsError::LockNestingOvf)?;
        Ok(())
    }

    /// Re-enable task switching once every lock has been released
    ///
    /// Returns the remaining nesting depth.
    pub fn sched_unlock(&mut self) -> OsResult<u8> {
        if !self.running {
            return Err(OsError::OsNotRunning);
        }
        if self.sched_lock == 0 {
            return Err(OsError::SchedNotLocked);
        }
        self.sched_lock -= 1;
        if self.sched_lock == 0 {
            self.reschedule();
        }
        Ok(self.sched_lock)
    }

    /// Round-robin bookkeeping for one tick
    ///
    /// Returns `true` when the running task's slice expired and it was moved
    /// behind an equal-priority peer.
    pub(crate) fn time_slice_tick(&mut self) -> bool {
        if !self.config.use_time_slicing {
            return false;
        }
        let Some(cur) = self.current_index() else {
            return false;
        };
        if self.tasks[cur].task_state != OsTaskState::Running {
            return false;
        }

        let tcb = &mut self.tasks[cur];
        tcb.time_quanta_ctr = tcb.time_quanta_ctr.saturating_sub(1);
        if tcb.time_quanta_ctr > 0 {
            return false;
        }
        tcb.time_quanta_ctr = self.config.time_slice_ticks;

        let prio = tcb.prio;
        if self.ready.count_at(prio) < 2 {
            return false;
        }
        self.ready.move_to_tail(&mut self.tasks, cur);
        true
    }

    /// Change a task's effective priority, keeping whichever list it sits on
    /// ordered
    ///
    /// A running task keeps its place at the head of its new level; other
    /// ready tasks join the tail. Waiters are re-sorted on their wait list.
    pub(crate) fn change_prio(&mut self, idx: usize, prio: OsPrio) {
        if self.tasks[idx].prio == prio {
            return;
        }

        let tcb = &self.tasks[idx];
        if tcb.is_ready() {
            self.ready.remove(&mut self.tasks, idx);
            self.tasks[idx].prio = prio;
            if Some(idx) == self.current_index() {
                self.ready.insert_head(&mut self.tasks, idx);
            } else {
                self.ready.insert_tail(&mut self.tasks, idx);
            }
        } else if let (OsTaskState::Blocked, OsPendOn::Object(obj, side)) = (tcb.task_state, tcb.pend_on) {
            let list = self.objects[obj.index()].wait_list(side);
            list.remove(&mut self.tasks, idx);
            self.tasks[idx].prio = prio;
            list.insert_ordered(&mut self.tasks, idx, |new, cur| new.prio > cur.prio);
        } else {
            self.tasks[idx].prio = prio;
        }
    }
}
