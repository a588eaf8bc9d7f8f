//! Kernel object arena
//!
//! Queues, semaphores, mutexes and queue sets share one slot type: a pair of
//! priority-ordered wait lists plus an item counter bounded by a capacity.
//! Kind-specific state (mutex holder, queue-set contents) rides in
//! [`ObjKind`]. Objects are addressed by generation-checked [`ObjId`]s.

use heapless::Deque;

use crate::config::{CFG_MAX_OBJECTS, CFG_QUEUE_SET_LENGTH};
use crate::error::{OsError, OsResult};
use crate::kernel::Kernel;
use crate::list::{LinkKind, TaskList};
use crate::types::{ObjId, OsNestingCtr, OsPendStatus, OsSemCtr, TaskId, WaitSide};

/// Kind tag plus kind-specific state
#[derive(Debug)]
pub(crate) enum ObjKind {
    Free,
    Queue,
    Semaphore,
    Mutex {
        holder: Option<TaskId>,
        depth: OsNestingCtr,
        recursive: bool,
    },
    QueueSet {
        /// Members that received an item, in arrival order
        ready: Deque<ObjId, CFG_QUEUE_SET_LENGTH>,
        /// Sum of member capacities
        reserved: usize,
    },
}

/// Kernel object slot
#[derive(Debug)]
pub(crate) struct KObject {
    pub(crate) generation: u16,
    pub(crate) kind: ObjKind,
    /// Items queued, or the semaphore count
    pub(crate) len: OsSemCtr,
    pub(crate) capacity: OsSemCtr,
    /// Tasks waiting for space
    pub(crate) senders: TaskList,
    /// Tasks waiting for data, a count, ownership or a set member
    pub(crate) receivers: TaskList,
    /// Queue set this object is a member of
    pub(crate) set: Option<ObjId>,
}

impl KObject {
    pub(crate) const VACANT: KObject = KObject {
        generation: 0,
        kind: ObjKind::Free,
        len: 0,
        capacity: 0,
        senders: TaskList::new(LinkKind::Sched),
        receivers: TaskList::new(LinkKind::Sched),
        set: None,
    };

    #[inline]
    pub(crate) fn wait_list(&mut self, side: WaitSide) -> &mut TaskList {
        match side {
            WaitSide::Send => &mut self.senders,
            WaitSide::Receive => &mut self.receivers,
        }
    }

    #[inline]
    pub(crate) fn is_free(&self) -> bool {
        matches!(self.kind, ObjKind::Free)
    }
}

/// Kind selector used by handle validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Queue,
    Semaphore,
    Mutex,
    QueueSet,
    /// Anything a queue set may contain
    Member,
}

impl Kind {
    fn matches(self, kind: &ObjKind) -> bool {
        match (self, kind) {
            (Kind::Queue, ObjKind::Queue)
            | (Kind::Semaphore, ObjKind::Semaphore)
            | (Kind::Mutex, ObjKind::Mutex { .. })
            | (Kind::QueueSet, ObjKind::QueueSet { .. }) => true,
            (Kind::Member, ObjKind::Queue | ObjKind::Semaphore) => true,
            _ => false,
        }
    }
}

impl Kernel {
    /// Claim a free object slot
    pub(crate) fn object_alloc(&mut self, kind: ObjKind, capacity: OsSemCtr) -> OsResult<ObjId> {
        let index = self
            .objects
            .iter()
            .position(KObject::is_free)
            .ok_or(OsError::ObjPoolFull)?;

        let obj = &mut self.objects[index];
        let generation = obj.generation;
        *obj = KObject::VACANT;
        obj.generation = generation;
        obj.kind = kind;
        obj.capacity = capacity;

        Ok(ObjId {
            index: index as u8,
            generation,
        })
    }

    /// Validate a handle and its kind
    pub(crate) fn object_check(&self, id: ObjId, kind: Kind) -> OsResult<()> {
        let obj = self
            .objects
            .get(id.index())
            .filter(|o| o.generation == id.generation && !o.is_free())
            .ok_or(OsError::ObjInvalid)?;
        if kind.matches(&obj.kind) {
            Ok(())
        } else {
            Err(OsError::ObjType)
        }
    }

    #[inline]
    pub(crate) fn obj(&self, id: ObjId) -> &KObject {
        &self.objects[id.index()]
    }

    #[inline]
    pub(crate) fn obj_mut(&mut self, id: ObjId) -> &mut KObject {
        &mut self.objects[id.index()]
    }

    /// Delete an object, waking every waiter with [`OsPendStatus::Del`]
    pub(crate) fn object_delete(&mut self, id: ObjId, kind: Kind) -> OsResult<()> {
        self.object_check(id, kind)?;

        if let Some(set) = self.obj(id).set {
            self.set_detach(set, id);
        }
        if let ObjKind::QueueSet { .. } = self.obj(id).kind {
            for member in self.objects.iter_mut().filter(|o| o.set == Some(id)) {
                member.set = None;
            }
        }

        for side in [WaitSide::Send, WaitSide::Receive] {
            while let Some(idx) = self.obj(id).wait_list_head(side) {
                self.wake_task(idx, OsPendStatus::Del);
            }
        }

        let holder = match self.obj(id).kind {
            ObjKind::Mutex { holder, .. } => holder,
            _ => None,
        };

        self.registry_remove(id);
        let obj = self.obj_mut(id);
        let generation = obj.generation.wrapping_add(1);
        *obj = KObject::VACANT;
        obj.generation = generation;

        if let Some(holder) = holder {
            self.refresh_priority(holder.index());
        }
        self.reschedule();
        Ok(())
    }

    /// Drop a member's queued entries and capacity from its set
    pub(crate) fn set_detach(&mut self, set: ObjId, member: ObjId) {
        let capacity = self.obj(member).capacity as usize;
        self.obj_mut(member).set = None;
        if let ObjKind::QueueSet { reserved, .. } = &mut self.obj_mut(set).kind {
            *reserved = reserved.saturating_sub(capacity);
        }
        self.set_purge(set, member);
    }

    /// Forget the entries a member has queued in its set, keeping membership
    pub(crate) fn set_purge(&mut self, set: ObjId, member: ObjId) {
        let s = self.obj_mut(set);
        if let ObjKind::QueueSet { ready, .. } = &mut s.kind {
            for _ in 0..ready.len() {
                if let Some(entry) = ready.pop_front() {
                    if entry != member {
                        // Capacity is unchanged, so re-queuing cannot fail
                        let _ = ready.push_back(entry);
                    }
                }
            }
            s.len = ready.len() as OsSemCtr;
        }
    }

    // ============ Queue registry ============

    /// Attach a name to an object for debugger-style lookup
    pub fn registry_add(&mut self, id: ObjId, name: &'static str) -> OsResult<()> {
        self.object_check_any(id)?;
        if let Some(entry) = self.registry.iter_mut().find(|(obj, _)| *obj == id) {
            entry.1 = name;
            return Ok(());
        }
        self.registry
            .push((id, name))
            .map_err(|_| OsError::RegistryFull)
    }

    /// Name registered for an object
    pub fn registry_name(&self, id: ObjId) -> Option<&'static str> {
        self.registry
            .iter()
            .find(|(obj, _)| *obj == id)
            .map(|&(_, name)| name)
    }

    /// Object registered under a name
    pub fn registry_find(&self, name: &str) -> Option<ObjId> {
        self.registry
            .iter()
            .find(|(_, n)| *n == name)
            .map(|&(id, _)| id)
    }

    pub(crate) fn registry_remove(&mut self, id: ObjId) {
        if let Some(pos) = self.registry.iter().position(|(obj, _)| *obj == id) {
            self.registry.swap_remove(pos);
        }
    }

    fn object_check_any(&self, id: ObjId) -> OsResult<()> {
        self.objects
            .get(id.index())
            .filter(|o| o.generation == id.generation && !o.is_free())
            .map(|_| ())
            .ok_or(OsError::ObjInvalid)
    }

    /// Objects currently allocated
    pub fn objects_in_use(&self) -> usize {
        self.objects.iter().filter(|o| !o.is_free()).count()
    }
}

impl KObject {
    #[inline]
    pub(crate) fn wait_list_head(&self, side: WaitSide) -> Option<usize> {
        match side {
            WaitSide::Send => self.senders.head(),
            WaitSide::Receive => self.receivers.head(),
        }
    }
}

/// Object arena type used by the kernel
pub(crate) type ObjectArena = [KObject; CFG_MAX_OBJECTS];
