//! Task Control Block (TCB) definition
//!
//! The TCB contains all the information needed to manage a task. TCBs live
//! in the kernel's task arena; lists link them by slot index.

use core::ptr::NonNull;

use crate::list::{LinkKind, Linked, Links};
use crate::types::{
    OsNotifyValue, OsPendOn, OsPendStatus, OsPrio, OsStkElement, OsTaskState, OsTick,
};

/// Word written over a fresh stack so untouched words can be counted
pub(crate) const STACK_FILL: OsStkElement = 0xA5A5_A5A5;

/// Words at the low end of the stack checked by level-2 overflow detection
pub(crate) const STACK_GUARD_WORDS: usize = 4;

/// Statically allocated stack owned by one task
#[derive(Debug, Clone, Copy)]
pub(crate) struct StackRegion {
    base: NonNull<OsStkElement>,
    len: usize,
}

impl StackRegion {
    pub(crate) fn new(stack: &'static mut [OsStkElement]) -> Self {
        stack.fill(STACK_FILL);
        StackRegion {
            // SAFETY: slices are never null
            base: unsafe { NonNull::new_unchecked(stack.as_mut_ptr()) },
            len: stack.len(),
        }
    }

    #[inline]
    pub(crate) fn start(&self) -> usize {
        self.base.as_ptr() as usize
    }

    #[inline]
    pub(crate) fn end(&self) -> usize {
        self.start() + self.len * core::mem::size_of::<OsStkElement>()
    }

    #[inline]
    pub(crate) fn contains(&self, sp: usize) -> bool {
        sp >= self.start() && sp <= self.end()
    }

    /// Stack words still holding the fill pattern, counted from the limit
    pub(crate) fn high_water_mark(&self) -> usize {
        (0..self.len)
            // SAFETY: index is inside the region handed over at creation
            .take_while(|&i| unsafe { self.base.as_ptr().add(i).read_volatile() } == STACK_FILL)
            .count()
    }

    /// The guard words at the stack limit are untouched
    pub(crate) fn guard_intact(&self) -> bool {
        self.high_water_mark() >= STACK_GUARD_WORDS.min(self.len)
    }

    #[inline]
    pub(crate) fn as_mut_ptr(&self) -> *mut OsStkElement {
        self.base.as_ptr()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

/// Notification slot state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotifyState {
    NotWaiting,
    Waiting,
    Received,
}

/// Task Control Block
pub struct OsTcb {
    // ============ Slot bookkeeping ============
    /// Bumped every time the slot is freed
    pub(crate) generation: u16,
    /// Slot holds a task (any state, Deleted included)
    pub(crate) in_use: bool,

    // ============ Task identification ============
    pub(crate) name: &'static str,

    // ============ Stack ============
    /// Saved stack pointer
    pub(crate) stk_ptr: usize,
    pub(crate) stack: Option<StackRegion>,

    // ============ Priority ============
    /// Effective priority (raised by inheritance)
    pub(crate) prio: OsPrio,
    /// Base priority
    pub(crate) base_prio: OsPrio,

    // ============ State ============
    pub(crate) task_state: OsTaskState,

    // ============ List links ============
    /// Ready list or object wait list
    pub(crate) sched_links: Links,
    /// Delay list
    pub(crate) tick_links: Links,
    /// Absolute tick at which a bounded wait ends
    pub(crate) wake_tick: OsTick,

    // ============ Pend ============
    pub(crate) pend_on: OsPendOn,
    pub(crate) pend_status: OsPendStatus,

    // ============ Time slicing ============
    pub(crate) time_quanta_ctr: OsTick,

    // ============ Notification ============
    pub(crate) notify_value: OsNotifyValue,
    pub(crate) notify_state: NotifyState,
}

impl OsTcb {
    /// An unused slot
    pub const VACANT: OsTcb = OsTcb {
        generation: 0,
        in_use: false,
        name: "",
        stk_ptr: 0,
        stack: None,
        prio: 0,
        base_prio: 0,
        task_state: OsTaskState::Deleted,
        sched_links: Links::NONE,
        tick_links: Links::NONE,
        wake_tick: 0,
        pend_on: OsPendOn::Nothing,
        pend_status: OsPendStatus::Pending,
        time_quanta_ctr: 0,
        notify_value: 0,
        notify_state: NotifyState::NotWaiting,
    };

    /// Reset the slot for a new task, keeping its generation
    pub(crate) fn init(&mut self, name: &'static str, prio: OsPrio, stack: StackRegion) {
        let generation = self.generation;
        *self = Self::VACANT;
        self.generation = generation;
        self.in_use = true;
        self.name = name;
        self.prio = prio;
        self.base_prio = prio;
        self.stack = Some(stack);
        self.task_state = OsTaskState::Ready;
    }

    /// Free the slot; old handles stop matching
    pub(crate) fn release(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self::VACANT;
        self.generation = generation;
    }

    /// Check if task is runnable (ready or running)
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.task_state, OsTaskState::Ready | OsTaskState::Running)
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.task_state == OsTaskState::Blocked
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn prio(&self) -> OsPrio {
        self.prio
    }

    #[inline]
    pub fn base_prio(&self) -> OsPrio {
        self.base_prio
    }

    #[inline]
    pub fn state(&self) -> OsTaskState {
        self.task_state
    }
}

impl Linked for OsTcb {
    #[inline]
    fn links(&self, kind: LinkKind) -> &Links {
        match kind {
            LinkKind::Sched => &self.sched_links,
            LinkKind::Tick => &self.tick_links,
        }
    }

    #[inline]
    fn links_mut(&mut self, kind: LinkKind) -> &mut Links {
        match kind {
            LinkKind::Sched => &mut self.sched_links,
            LinkKind::Tick => &mut self.tick_links,
        }
    }
}

// SAFETY: the stack region is owned exclusively by this TCB and only
// touched with the kernel borrowed inside a critical section
unsafe impl Send for OsTcb {}
