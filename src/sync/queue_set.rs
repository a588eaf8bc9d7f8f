//! Queue sets
//!
//! A set lets one task wait on several queues and semaphores at once. Each
//! item posted to a member queues the member's handle on the set, so one
//! wake-up corresponds to exactly one item; the caller then does a
//! non-blocking receive on the member it was given.

use heapless::Deque;

use crate::config::CFG_QUEUE_SET_LENGTH;
use crate::error::{OsError, OsResult};
use crate::kernel::{Isr, Kernel};
use crate::object::{Kind, ObjKind};
use crate::time::Deadline;
use crate::types::{ObjId, OsPendOn, OsSemCtr, WaitSide};

impl Kernel {
    /// Create a set able to hold `length` pending member events
    pub fn set_create(&mut self, length: usize) -> OsResult<ObjId> {
        if length == 0 || length > CFG_QUEUE_SET_LENGTH {
            return Err(OsError::QSize);
        }
        self.object_alloc(
            ObjKind::QueueSet {
                ready: Deque::new(),
                reserved: 0,
            },
            length as OsSemCtr,
        )
    }

    /// Add an empty queue or semaphore to a set
    ///
    /// The set must have room for every item its members could hold at once.
    pub fn set_add(&mut self, set: ObjId, member: ObjId) -> OsResult<()> {
        self.object_check(set, Kind::QueueSet)?;
        self.object_check(member, Kind::Member)?;

        let m = &self.objects[member.index()];
        if m.set.is_some() {
            return Err(OsError::SetMember);
        }
        if m.len != 0 {
            return Err(OsError::SetMemberNotEmpty);
        }
        let capacity = m.capacity as usize;

        let s = &mut self.objects[set.index()];
        let length = s.capacity as usize;
        if let ObjKind::QueueSet { reserved, .. } = &mut s.kind {
            if *reserved + capacity > length {
                return Err(OsError::SetFull);
            }
            *reserved += capacity;
        }
        self.objects[member.index()].set = Some(set);
        Ok(())
    }

    /// Take an empty member out of its set
    pub fn set_remove(&mut self, set: ObjId, member: ObjId) -> OsResult<()> {
        self.object_check(set, Kind::QueueSet)?;
        self.object_check(member, Kind::Member)?;

        let m = &self.objects[member.index()];
        if m.set != Some(set) {
            return Err(OsError::SetNotMember);
        }
        if m.len != 0 {
            return Err(OsError::SetMemberNotEmpty);
        }
        self.set_detach(set, member);
        Ok(())
    }

    /// Wait for any member to receive an item; returns that member
    pub fn set_select(&mut self, set: ObjId, deadline: &mut Deadline) -> OsResult<ObjId> {
        self.resume_wait(deadline)?;
        self.object_check(set, Kind::QueueSet)?;

        if let Some(member) = self.set_pop(set) {
            return Ok(member);
        }
        Err(self.block_current(
            deadline,
            OsPendOn::Object(set, WaitSide::Receive),
            OsError::PendWouldBlock,
        ))
    }

    fn set_pop(&mut self, set: ObjId) -> Option<ObjId> {
        let s = &mut self.objects[set.index()];
        let ObjKind::QueueSet { ready, .. } = &mut s.kind else {
            return None;
        };
        let member = ready.pop_front()?;
        s.len = s.len.saturating_sub(1);
        Some(member)
    }

    fn set_pending(&self, set: ObjId) -> usize {
        match &self.objects[set.index()].kind {
            ObjKind::QueueSet { ready, .. } => ready.len(),
            _ => 0,
        }
    }

    /// Member events waiting to be selected
    pub fn set_len(&self, set: ObjId) -> OsResult<usize> {
        self.object_check(set, Kind::QueueSet)?;
        Ok(self.set_pending(set))
    }

    /// Set a member belongs to
    pub fn set_of(&self, member: ObjId) -> OsResult<Option<ObjId>> {
        self.object_check(member, Kind::Member)?;
        Ok(self.objects[member.index()].set)
    }

    /// Delete a set; members are released and waiters fail with
    /// [`OsError::ObjDel`]
    pub fn set_delete(&mut self, set: ObjId) -> OsResult<()> {
        self.object_delete(set, Kind::QueueSet)
    }
}

impl Isr<'_> {
    /// Non-blocking select from interrupt context
    pub fn set_select(&mut self, set: ObjId) -> OsResult<Option<ObjId>> {
        self.kernel.object_check(set, Kind::QueueSet)?;
        Ok(self.kernel.set_pop(set))
    }
}
