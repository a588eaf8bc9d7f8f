//! Mutex implementation with priority inheritance
//!
//! While a task waits on a mutex, the holder runs at no less than the
//! waiter's effective priority, so a medium-priority task cannot stretch the
//! inversion. The boost follows chains of holders blocked on further
//! mutexes and is recomputed whenever a waiter arrives, leaves or a mutex is
//! released. On release ownership passes straight to the most urgent waiter.

use crate::error::{OsError, OsResult};
use crate::kernel::Kernel;
use crate::object::{Kind, ObjKind};
use crate::time::Deadline;
use crate::types::{ObjId, OsPendOn, TaskId, WaitSide};

impl Kernel {
    /// Create a mutex; a recursive one may be re-locked by its holder
    pub fn mutex_create(&mut self, recursive: bool) -> OsResult<ObjId> {
        let id = self.object_alloc(
            ObjKind::Mutex {
                holder: None,
                depth: 0,
                recursive,
            },
            1,
        )?;
        crate::debug!("mutex {} created", id.index);
        Ok(id)
    }

    /// Acquire the mutex
    ///
    /// If another task holds it, the caller blocks and the holder inherits
    /// the caller's priority. A timed-out or aborted wait leaves the mutex
    /// untouched and takes the lent priority back.
    pub fn mutex_lock(&mut self, id: ObjId, deadline: &mut Deadline) -> OsResult<()> {
        if self.resume_wait(deadline)? {
            return Ok(());
        }
        self.object_check(id, Kind::Mutex)?;
        let cur = self.current_idx()?;
        let me = self.task_id(cur);

        let obj = &mut self.objects[id.index()];
        if let ObjKind::Mutex {
            holder,
            depth,
            recursive,
        } = &mut obj.kind
        {
            match *holder {
                None => {
                    *holder = Some(me);
                    *depth = 1;
                    obj.len = 0;
                    return Ok(());
                }
                Some(h) if h == me => {
                    if !*recursive {
                        return Err(OsError::MutexOwner);
                    }
                    *depth = depth.checked_add(1).ok_or(OsError::MutexOvf)?;
                    return Ok(());
                }
                Some(_) => {}
            }
        }

        Err(self.block_current(
            deadline,
            OsPendOn::Object(id, WaitSide::Receive),
            OsError::PendWouldBlock,
        ))
    }

    /// Release the mutex
    ///
    /// A recursive mutex is released once per successful lock. The final
    /// release hands it to the most urgent waiter and drops the caller back
    /// to the priority its remaining mutexes require.
    pub fn mutex_unlock(&mut self, id: ObjId) -> OsResult<()> {
        self.object_check(id, Kind::Mutex)?;
        let cur = self.current_idx()?;
        let me = self.task_id(cur);

        if let ObjKind::Mutex { holder, depth, .. } = &mut self.objects[id.index()].kind {
            if *holder != Some(me) {
                return Err(OsError::MutexNotOwner);
            }
            if *depth > 1 {
                *depth -= 1;
                return Ok(());
            }
        }

        self.mutex_release(id);
        self.refresh_priority(cur);
        self.reschedule();
        Ok(())
    }

    /// Pass the mutex to its most urgent waiter, or leave it free
    pub(crate) fn mutex_release(&mut self, id: ObjId) {
        let next = self.objects[id.index()].receivers.head();
        let next_id = next.map(|idx| self.task_id(idx));

        let obj = &mut self.objects[id.index()];
        if let ObjKind::Mutex { holder, depth, .. } = &mut obj.kind {
            *holder = next_id;
            *depth = if next_id.is_some() { 1 } else { 0 };
        }
        obj.len = if next_id.is_some() { 0 } else { 1 };

        if let Some(next) = next {
            self.wake_task(next, crate::types::OsPendStatus::Granted);
            // The new holder may owe priority to the waiters left behind
            self.refresh_priority(next);
        }
    }

    /// Current holder, if any
    pub fn mutex_holder(&self, id: ObjId) -> OsResult<Option<TaskId>> {
        self.object_check(id, Kind::Mutex)?;
        match self.objects[id.index()].kind {
            ObjKind::Mutex { holder, .. } => Ok(holder),
            _ => Err(OsError::ObjType),
        }
    }

    /// Nested lock count of the holder
    pub fn mutex_depth(&self, id: ObjId) -> OsResult<u8> {
        self.object_check(id, Kind::Mutex)?;
        match self.objects[id.index()].kind {
            ObjKind::Mutex { depth, .. } => Ok(depth),
            _ => Err(OsError::ObjType),
        }
    }

    /// Delete a mutex; waiters fail with [`OsError::ObjDel`]
    pub fn mutex_delete(&mut self, id: ObjId) -> OsResult<()> {
        self.object_delete(id, Kind::Mutex)
    }

    /// Hand every mutex held by a task to its next waiter
    pub(crate) fn mutex_release_all(&mut self, idx: usize) {
        let id = self.task_id(idx);
        for slot in 0..self.objects.len() {
            let held = matches!(
                self.objects[slot].kind,
                ObjKind::Mutex { holder: Some(h), .. } if h == id
            );
            if held {
                let obj = ObjId {
                    index: slot as u8,
                    generation: self.objects[slot].generation,
                };
                self.mutex_release(obj);
            }
        }
    }
}
