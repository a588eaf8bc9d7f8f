//! Semaphore implementation
//!
//! A counting semaphore is a queue of zero-sized items: the kernel object's
//! item count is the semaphore count and its capacity the maximum count.
//! Binary semaphores are the special case with a maximum of one.

use crate::error::{OsError, OsResult};
use crate::kernel::{Isr, Kernel};
use crate::object::{Kind, ObjKind};
use crate::time::Deadline;
use crate::types::{ObjId, OsPendOn, OsSemCtr, WaitSide};

impl Kernel {
    /// Create a counting semaphore
    pub fn sem_create(&mut self, max: OsSemCtr, initial: OsSemCtr) -> OsResult<ObjId> {
        if max == 0 || initial > max {
            return Err(OsError::QSize);
        }
        let id = self.object_alloc(ObjKind::Semaphore, max)?;
        self.objects[id.index()].len = initial;
        crate::debug!("semaphore {} created, {}/{}", id.index, initial, max);
        Ok(id)
    }

    /// Create a binary semaphore, initially empty
    #[inline]
    pub fn sem_create_binary(&mut self) -> OsResult<ObjId> {
        self.sem_create(1, 0)
    }

    /// Take one count, blocking while the count is zero
    pub fn sem_take(&mut self, id: ObjId, deadline: &mut Deadline) -> OsResult<()> {
        self.resume_wait(deadline)?;
        self.object_check(id, Kind::Semaphore)?;

        if self.objects[id.index()].len > 0 {
            self.take_item(id);
            return Ok(());
        }

        Err(self.block_current(
            deadline,
            OsPendOn::Object(id, WaitSide::Receive),
            OsError::PendWouldBlock,
        ))
    }

    /// Give one count; fails at the maximum count
    pub fn sem_give(&mut self, id: ObjId) -> OsResult<()> {
        self.sem_give_inner(id).map(|_| ())
    }

    fn sem_give_inner(&mut self, id: ObjId) -> OsResult<bool> {
        self.object_check(id, Kind::Semaphore)?;
        let obj = &self.objects[id.index()];
        if obj.len >= obj.capacity {
            return Err(OsError::SemOvf);
        }
        Ok(self.post_item(id))
    }

    /// Current count
    pub fn sem_count(&self, id: ObjId) -> OsResult<OsSemCtr> {
        self.object_check(id, Kind::Semaphore)?;
        Ok(self.objects[id.index()].len)
    }

    /// Delete a semaphore; waiters fail with [`OsError::ObjDel`]
    pub fn sem_delete(&mut self, id: ObjId) -> OsResult<()> {
        self.object_delete(id, Kind::Semaphore)
    }
}

impl Isr<'_> {
    /// Give from interrupt context; returns whether a switch is advisable
    pub fn sem_give(&mut self, id: ObjId) -> OsResult<bool> {
        let woken = self.kernel.sem_give_inner(id)?;
        Ok(self.note(woken))
    }

    /// Take without blocking from interrupt context
    pub fn sem_take(&mut self, id: ObjId) -> OsResult<bool> {
        self.kernel.object_check(id, Kind::Semaphore)?;
        if self.kernel.objects[id.index()].len == 0 {
            return Err(OsError::PendWouldBlock);
        }
        let woken = self.kernel.take_item(id);
        Ok(self.note(woken))
    }
}
