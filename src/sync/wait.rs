//! Blocking and waking
//!
//! The common machinery under every primitive. A task that cannot proceed
//! is taken off the ready queue and put on an object's wait list (highest
//! effective priority first, FIFO among equals) and, for a bounded wait, on
//! the delay list. Whoever satisfies the wait, or the tick handler, or an
//! abort, puts it back with a wake reason; the blocked call is then retried
//! and reads that reason.

use crate::config::CFG_MAX_TASKS;
use crate::error::{OsError, OsResult};
use crate::kernel::Kernel;
use crate::object::ObjKind;
use crate::task::NotifyState;
use crate::time::Deadline;
use crate::types::{ObjId, OsPendOn, OsPendStatus, OsPrio, OsTaskState, WaitSide};

impl Kernel {
    /// Block the running task
    ///
    /// Returns the error the caller should report: `immediate` when the
    /// deadline allows no waiting, `Timeout` when a retried wait ran out of
    /// budget or its last attempt after a timeout failed, or `Blocked` once
    /// the task is parked and a switch requested.
    pub(crate) fn block_current(
        &mut self,
        deadline: &mut Deadline,
        pend_on: OsPendOn,
        immediate: OsError,
    ) -> OsError {
        if deadline.expired {
            return OsError::Timeout;
        }
        if deadline.timeout() == crate::types::Timeout::NoWait {
            return immediate;
        }
        let Some(cur) = self.current_index() else {
            return OsError::OsNotRunning;
        };
        if !self.running {
            return OsError::OsNotRunning;
        }
        if self.sched_lock > 0 {
            return OsError::SchedLocked;
        }
        let wake = match deadline.wake_tick(self.tick) {
            Ok(wake) => wake,
            Err(err) => return err,
        };

        self.ready_remove(cur);
        let tcb = &mut self.tasks[cur];
        tcb.task_state = OsTaskState::Blocked;
        tcb.pend_on = pend_on;
        tcb.pend_status = OsPendStatus::Pending;

        if let OsPendOn::Object(obj, side) = pend_on {
            self.objects[obj.index()]
                .wait_list(side)
                .insert_ordered(&mut self.tasks, cur, |new, cur| new.prio > cur.prio);
        }
        if let Some(wake) = wake {
            self.tick_list_insert(cur, wake);
        }
        deadline.blocked = true;

        if let Some(holder) = self.mutex_holder_of(pend_on) {
            self.refresh_priority(holder);
        }
        self.reschedule();
        OsError::Blocked
    }

    /// Read the outcome of an earlier block, if this call blocked
    ///
    /// `Ok(true)` means the resource was handed over directly and the call
    /// is complete; `Ok(false)` means try again. A timed-out wait also tries
    /// again once, since the resource may have arrived on the same tick; if
    /// it has not, the attempt ends in `Timeout`.
    pub(crate) fn resume_wait(&mut self, deadline: &mut Deadline) -> OsResult<bool> {
        if !deadline.blocked {
            return Ok(false);
        }
        let cur = self.current_idx()?;
        let tcb = &mut self.tasks[cur];
        let status = core::mem::replace(&mut tcb.pend_status, OsPendStatus::Pending);
        match status {
            OsPendStatus::Pending | OsPendStatus::Ok => Ok(false),
            OsPendStatus::Granted => Ok(true),
            OsPendStatus::Timeout => {
                deadline.expired = true;
                Ok(false)
            }
            OsPendStatus::Abort => Err(OsError::PendAbort),
            OsPendStatus::Del => Err(OsError::ObjDel),
        }
    }

    /// Make a blocked task ready again with the given wake reason
    ///
    /// Returns `true` if it is more urgent than the running task.
    pub(crate) fn wake_task(&mut self, idx: usize, status: OsPendStatus) -> bool {
        if !self.tasks[idx].is_blocked() {
            return false;
        }

        let pend_on = self.tasks[idx].pend_on;
        if let OsPendOn::Object(obj, side) = pend_on {
            self.objects[obj.index()]
                .wait_list(side)
                .remove(&mut self.tasks, idx);
        }
        self.tick_list_remove(idx);

        let tcb = &mut self.tasks[idx];
        tcb.pend_status = status;
        tcb.pend_on = OsPendOn::Nothing;
        if pend_on == OsPendOn::Notification && tcb.notify_state == NotifyState::Waiting {
            tcb.notify_state = NotifyState::NotWaiting;
        }
        self.ready_insert(idx);

        // A waiter leaving without the mutex no longer lends its priority
        if status != OsPendStatus::Granted {
            if let Some(holder) = self.mutex_holder_of(pend_on) {
                self.refresh_priority(holder);
            }
        }

        let preempts = match self.current_index() {
            Some(cur) => self.tasks[idx].prio > self.tasks[cur].prio,
            None => false,
        };
        self.reschedule();
        preempts
    }

    /// Wake the most urgent waiter on one side of an object
    pub(crate) fn wake_head(&mut self, obj: ObjId, side: WaitSide) -> bool {
        match self.objects[obj.index()].wait_list_head(side) {
            Some(idx) => self.wake_task(idx, OsPendStatus::Ok),
            None => false,
        }
    }

    /// An item (or count) was added: tell the set it belongs to, or the
    /// first receiver
    pub(crate) fn post_item(&mut self, obj: ObjId) -> bool {
        let o = &mut self.objects[obj.index()];
        o.len += 1;
        let set = o.set;
        match set {
            Some(set) => self.set_post(set, obj),
            None => self.wake_head(obj, WaitSide::Receive),
        }
    }

    /// An item (or count) was removed: tell the first sender
    pub(crate) fn take_item(&mut self, obj: ObjId) -> bool {
        let o = &mut self.objects[obj.index()];
        o.len = o.len.saturating_sub(1);
        self.wake_head(obj, WaitSide::Send)
    }

    /// Record a ready member in its set and wake one set waiter
    pub(crate) fn set_post(&mut self, set: ObjId, member: ObjId) -> bool {
        let s = &mut self.objects[set.index()];
        if let ObjKind::QueueSet { ready, .. } = &mut s.kind {
            // Set capacity covers every member's capacity, so this cannot fail
            if ready.push_back(member).is_ok() {
                s.len += 1;
            }
        }
        self.wake_head(set, WaitSide::Receive)
    }

    // ============ Priority inheritance ============

    /// Holder of the mutex a wait is on
    fn mutex_holder_of(&self, pend_on: OsPendOn) -> Option<usize> {
        match pend_on {
            OsPendOn::Object(obj, WaitSide::Receive) => match self.objects[obj.index()].kind {
                ObjKind::Mutex {
                    holder: Some(holder),
                    ..
                } => Some(holder.index()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Priority a task is owed: its base priority raised to the most urgent
    /// waiter of every mutex it holds
    pub(crate) fn required_priority(&self, idx: usize) -> OsPrio {
        let id = self.task_id(idx);
        self.objects
            .iter()
            .filter(|o| matches!(o.kind, ObjKind::Mutex { holder: Some(h), .. } if h == id))
            .filter_map(|o| o.receivers.head())
            .map(|w| self.tasks[w].prio)
            .fold(self.tasks[idx].base_prio, OsPrio::max)
    }

    /// Bring a task's effective priority in line with what it is owed, and
    /// pass the change along the chain of mutex holders it waits on
    pub(crate) fn refresh_priority(&mut self, idx: usize) {
        let mut idx = idx;
        // A chain can visit each task at most once
        for _ in 0..CFG_MAX_TASKS {
            let prio = self.required_priority(idx);
            if prio == self.tasks[idx].prio {
                return;
            }
            crate::trace!(
                "task {} priority {} -> {}",
                self.tasks[idx].name,
                self.tasks[idx].prio,
                prio
            );
            self.change_prio(idx, prio);

            match self.mutex_holder_of(self.tasks[idx].pend_on) {
                Some(holder) if holder != idx => idx = holder,
                _ => return,
            }
        }
    }
}
