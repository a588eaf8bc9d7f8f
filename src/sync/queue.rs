//! Message queues
//!
//! A [`Queue`] owns its item storage, a fixed-capacity ring of `N` copies of
//! `T`, while the kernel object it is bound to tracks the count and the two
//! wait lists. Every operation takes the kernel so the two stay in step.

use heapless::Deque;

use crate::error::{OsError, OsResult};
use crate::kernel::{Isr, Kernel};
use crate::object::{Kind, ObjKind};
use crate::time::Deadline;
use crate::types::{ObjId, OsPendOn, OsSemCtr, WaitSide};

/// Bounded FIFO of `N` items of `T`
pub struct Queue<T: Copy, const N: usize> {
    id: ObjId,
    items: Deque<T, N>,
}

impl<T: Copy, const N: usize> Queue<T, N> {
    /// Allocate the kernel object for a new, empty queue
    pub fn create(kernel: &mut Kernel) -> OsResult<Self> {
        if N == 0 || N > OsSemCtr::MAX as usize {
            return Err(OsError::QSize);
        }
        let id = kernel.object_alloc(ObjKind::Queue, N as OsSemCtr)?;
        crate::debug!("queue {} created, capacity {}", id.index, N);
        Ok(Queue {
            id,
            items: Deque::new(),
        })
    }

    /// Kernel object handle, used for queue sets and the registry
    #[inline]
    pub fn id(&self) -> ObjId {
        self.id
    }

    /// Append an item, blocking while the queue is full
    pub fn send(&mut self, kernel: &mut Kernel, item: T, deadline: &mut Deadline) -> OsResult<()> {
        self.send_inner(kernel, item, deadline, false)
    }

    /// Put an item at the head, blocking while the queue is full
    pub fn send_to_front(
        &mut self,
        kernel: &mut Kernel,
        item: T,
        deadline: &mut Deadline,
    ) -> OsResult<()> {
        self.send_inner(kernel, item, deadline, true)
    }

    fn send_inner(
        &mut self,
        kernel: &mut Kernel,
        item: T,
        deadline: &mut Deadline,
        front: bool,
    ) -> OsResult<()> {
        kernel.resume_wait(deadline)?;
        kernel.object_check(self.id, Kind::Queue)?;

        if self.push(kernel, item, front).is_some() {
            return Ok(());
        }
        Err(kernel.block_current(
            deadline,
            OsPendOn::Object(self.id, WaitSide::Send),
            OsError::QFull,
        ))
    }

    /// Store an item if there is room; `Some(woken)` on success
    fn push(&mut self, kernel: &mut Kernel, item: T, front: bool) -> Option<bool> {
        let stored = if front {
            self.items.push_front(item)
        } else {
            self.items.push_back(item)
        };
        stored.ok()?;
        Some(kernel.post_item(self.id))
    }

    /// Replace the only item of a one-slot queue, never blocking
    pub fn overwrite(&mut self, kernel: &mut Kernel, item: T) -> OsResult<bool> {
        if N != 1 {
            return Err(OsError::QSize);
        }
        kernel.object_check(self.id, Kind::Queue)?;
        if let Some(slot) = self.items.front_mut() {
            *slot = item;
            return Ok(false);
        }
        Ok(self.push(kernel, item, false).unwrap_or(false))
    }

    /// Remove the oldest item, blocking while the queue is empty
    pub fn receive(&mut self, kernel: &mut Kernel, deadline: &mut Deadline) -> OsResult<T> {
        kernel.resume_wait(deadline)?;
        kernel.object_check(self.id, Kind::Queue)?;

        if let Some((item, _)) = self.pop(kernel) {
            return Ok(item);
        }
        Err(kernel.block_current(
            deadline,
            OsPendOn::Object(self.id, WaitSide::Receive),
            OsError::QEmpty,
        ))
    }

    fn pop(&mut self, kernel: &mut Kernel) -> Option<(T, bool)> {
        let item = self.items.pop_front()?;
        Some((item, kernel.take_item(self.id)))
    }

    /// Copy the oldest item without removing it
    pub fn peek(&self, kernel: &Kernel) -> OsResult<T> {
        kernel.object_check(self.id, Kind::Queue)?;
        self.items.front().copied().ok_or(OsError::QEmpty)
    }

    /// Discard every item; blocked senders are released to try again
    pub fn reset(&mut self, kernel: &mut Kernel) -> OsResult<()> {
        kernel.object_check(self.id, Kind::Queue)?;
        self.items.clear();
        kernel.objects[self.id.index()].len = 0;
        if let Some(set) = kernel.objects[self.id.index()].set {
            kernel.set_purge(set, self.id);
        }
        while let Some(idx) = kernel.objects[self.id.index()].senders.head() {
            kernel.wake_task(idx, crate::types::OsPendStatus::Ok);
        }
        Ok(())
    }

    #[inline]
    pub fn messages_waiting(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn spaces_available(&self) -> usize {
        N - self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.is_full()
    }

    /// Free the kernel object; blocked tasks fail with [`OsError::ObjDel`]
    pub fn delete(self, kernel: &mut Kernel) -> OsResult<()> {
        kernel.object_delete(self.id, Kind::Queue)
    }

    /// Append from interrupt context; fails immediately when full
    pub fn send_from_isr(&mut self, isr: &mut Isr<'_>, item: T) -> OsResult<bool> {
        isr.kernel.object_check(self.id, Kind::Queue)?;
        let woken = self.push(isr.kernel, item, false).ok_or(OsError::QFull)?;
        Ok(isr.note(woken))
    }

    /// Head insert from interrupt context
    pub fn send_to_front_from_isr(&mut self, isr: &mut Isr<'_>, item: T) -> OsResult<bool> {
        isr.kernel.object_check(self.id, Kind::Queue)?;
        let woken = self.push(isr.kernel, item, true).ok_or(OsError::QFull)?;
        Ok(isr.note(woken))
    }

    /// Remove from interrupt context; fails immediately when empty
    pub fn receive_from_isr(&mut self, isr: &mut Isr<'_>) -> OsResult<(T, bool)> {
        isr.kernel.object_check(self.id, Kind::Queue)?;
        let (item, woken) = self.pop(isr.kernel).ok_or(OsError::QEmpty)?;
        Ok((item, isr.note(woken)))
    }
}
