//! Direct-to-task notifications
//!
//! Every task carries one notification word and a pending flag. Notifying
//! updates the word and wakes the task if it is waiting on it, which makes
//! it a lighter binary/counting semaphore or event group for the one task
//! that owns it.

use crate::error::{OsError, OsResult};
use crate::kernel::{Isr, Kernel};
use crate::task::NotifyState;
use crate::time::Deadline;
use crate::types::{OsNotifyValue, OsPendOn, OsPendStatus, TaskId};

/// How a notification updates the target's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotifyAction {
    /// Only mark the notification pending
    NoAction,
    /// OR the value in
    SetBits(OsNotifyValue),
    /// Add one
    Increment,
    /// Replace the value unconditionally
    SetValueWithOverwrite(OsNotifyValue),
    /// Replace the value unless a notification is already pending
    SetValueWithoutOverwrite(OsNotifyValue),
}

impl Kernel {
    /// Notify a task
    ///
    /// Fails with [`OsError::NotifyPending`] only for
    /// `SetValueWithoutOverwrite` when the previous notification has not been
    /// consumed; the value is then left alone.
    pub fn notify(&mut self, task: TaskId, action: NotifyAction) -> OsResult<()> {
        self.notify_inner(task, action).map(|_| ())
    }

    /// Increment the target's value, semaphore-style
    #[inline]
    pub fn notify_give(&mut self, task: TaskId) -> OsResult<()> {
        self.notify(task, NotifyAction::Increment)
    }

    fn notify_inner(&mut self, task: TaskId, action: NotifyAction) -> OsResult<bool> {
        let idx = self.task_check(task)?;
        let tcb = &mut self.tasks[idx];
        let previous = tcb.notify_state;

        match action {
            NotifyAction::NoAction => {}
            NotifyAction::SetBits(bits) => tcb.notify_value |= bits,
            NotifyAction::Increment => tcb.notify_value = tcb.notify_value.wrapping_add(1),
            NotifyAction::SetValueWithOverwrite(value) => tcb.notify_value = value,
            NotifyAction::SetValueWithoutOverwrite(value) => {
                if previous == NotifyState::Received {
                    return Err(OsError::NotifyPending);
                }
                tcb.notify_value = value;
            }
        }
        tcb.notify_state = NotifyState::Received;

        let waiting = previous == NotifyState::Waiting
            && tcb.is_blocked()
            && tcb.pend_on == OsPendOn::Notification;
        if waiting {
            return Ok(self.wake_task(idx, OsPendStatus::Ok));
        }
        Ok(false)
    }

    /// Wait for a notification and return the value
    ///
    /// Bits in `clear_on_entry` are cleared before waiting if no notification
    /// is pending yet; bits in `clear_on_exit` are cleared after the value is
    /// read.
    pub fn notify_wait(
        &mut self,
        clear_on_entry: OsNotifyValue,
        clear_on_exit: OsNotifyValue,
        deadline: &mut Deadline,
    ) -> OsResult<OsNotifyValue> {
        self.resume_wait(deadline)?;
        let cur = self.current_idx()?;
        let tcb = &mut self.tasks[cur];

        if tcb.notify_state == NotifyState::Received {
            let value = tcb.notify_value;
            tcb.notify_value &= !clear_on_exit;
            tcb.notify_state = NotifyState::NotWaiting;
            return Ok(value);
        }

        if !deadline.blocked {
            tcb.notify_value &= !clear_on_entry;
        }
        tcb.notify_state = NotifyState::Waiting;
        let err = self.block_current(deadline, OsPendOn::Notification, OsError::PendWouldBlock);
        if err != OsError::Blocked {
            self.tasks[cur].notify_state = NotifyState::NotWaiting;
        }
        Err(err)
    }

    /// Wait for the value to become non-zero, then clear or decrement it
    ///
    /// Returns the value before it was consumed.
    pub fn notify_take(&mut self, clear_on_exit: bool, deadline: &mut Deadline) -> OsResult<OsNotifyValue> {
        self.resume_wait(deadline)?;
        let cur = self.current_idx()?;
        let tcb = &mut self.tasks[cur];

        if tcb.notify_value != 0 {
            let value = tcb.notify_value;
            tcb.notify_value = if clear_on_exit { 0 } else { value - 1 };
            tcb.notify_state = NotifyState::NotWaiting;
            return Ok(value);
        }

        tcb.notify_state = NotifyState::Waiting;
        let err = self.block_current(deadline, OsPendOn::Notification, OsError::PendWouldBlock);
        if err != OsError::Blocked {
            self.tasks[cur].notify_state = NotifyState::NotWaiting;
        }
        Err(err)
    }

    /// Drop a pending notification without reading it
    ///
    /// Returns `true` if one was pending.
    pub fn notify_state_clear(&mut self, task: TaskId) -> OsResult<bool> {
        let idx = self.task_check(task)?;
        let tcb = &mut self.tasks[idx];
        let was_pending = tcb.notify_state == NotifyState::Received;
        if was_pending {
            tcb.notify_state = NotifyState::NotWaiting;
        }
        Ok(was_pending)
    }

    /// Clear bits of a task's value, returning the value before
    pub fn notify_value_clear(&mut self, task: TaskId, bits: OsNotifyValue) -> OsResult<OsNotifyValue> {
        let idx = self.task_check(task)?;
        let tcb = &mut self.tasks[idx];
        let value = tcb.notify_value;
        tcb.notify_value &= !bits;
        Ok(value)
    }
}

impl Isr<'_> {
    /// Notify from interrupt context
    pub fn notify(&mut self, task: TaskId, action: NotifyAction) -> OsResult<bool> {
        let woken = self.kernel.notify_inner(task, action)?;
        Ok(self.note(woken))
    }

    /// Increment the target's value from interrupt context
    pub fn notify_give(&mut self, task: TaskId) -> OsResult<bool> {
        self.notify(task, NotifyAction::Increment)
    }
}
