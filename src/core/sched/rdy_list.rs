//! Ready queue - one FIFO list of TCBs per priority level
//!
//! Tasks are added to the tail and scheduled from the head. The priority
//! bitmap mirrors which levels are non-empty so the highest ready level is
//! found without walking the lists.

use crate::config::CFG_MAX_PRIORITIES;
use crate::list::{LinkKind, TaskList};
use crate::prio::ReadyMask;
use crate::task::OsTcb;
use crate::types::OsPrio;

/// Per-priority ready lists plus the priority bitmap
#[derive(Debug)]
pub struct ReadyQueue {
    lists: [TaskList; CFG_MAX_PRIORITIES],
    mask: ReadyMask,
}

impl ReadyQueue {
    /// Create an empty ready queue
    pub const fn new() -> Self {
        ReadyQueue {
            lists: [TaskList::new(LinkKind::Sched); CFG_MAX_PRIORITIES],
            mask: ReadyMask::EMPTY,
        }
    }

    /// Append a task at the tail of the list for its effective priority
    pub fn insert_tail(&mut self, tasks: &mut [OsTcb], idx: usize) {
        let prio = tasks[idx].prio;
        self.lists[prio as usize].push_back(tasks, idx);
        self.mask.set(prio);
    }

    /// Insert a task ahead of its peers
    pub fn insert_head(&mut self, tasks: &mut [OsTcb], idx: usize) {
        let prio = tasks[idx].prio;
        self.lists[prio as usize].insert_ordered(tasks, idx, |_, _| true);
        self.mask.set(prio);
    }

    /// Remove a task from the list for its effective priority
    pub fn remove(&mut self, tasks: &mut [OsTcb], idx: usize) {
        let prio = tasks[idx].prio;
        let list = &mut self.lists[prio as usize];
        list.remove(tasks, idx);
        if list.is_empty() {
            self.mask.clear(prio);
        }
    }

    /// Head of the highest non-empty level
    #[inline]
    pub fn highest(&self) -> Option<usize> {
        let prio = self.mask.highest()?;
        self.lists[prio as usize].head()
    }

    /// Move a specific task to the tail of its level
    pub fn move_to_tail(&mut self, tasks: &mut [OsTcb], idx: usize) {
        let list = &mut self.lists[tasks[idx].prio as usize];
        list.remove(tasks, idx);
        list.push_back(tasks, idx);
    }

    /// Number of ready tasks at a level
    #[inline]
    pub fn count_at(&self, prio: OsPrio) -> usize {
        self.lists[prio as usize].len()
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}
