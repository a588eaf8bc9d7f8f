//! Kernel state and lifecycle
//!
//! Every scheduler structure lives in one owned [`Kernel`] value: the task
//! arena, the ready queue, the delay list, the kernel object arena and the
//! queue registry. All operations are methods on it and never touch
//! hardware; the `os` module wraps a global instance for use on target.

use heapless::Vec;

use crate::config::{
    KernelConfig, CFG_MAX_OBJECTS, CFG_MAX_TASKS, CFG_PRIO_IDLE,
    CFG_QUEUE_REGISTRY_SIZE,
};
use crate::error::{OsError, OsResult};
use crate::list::{LinkKind, TaskList};
use crate::object::{KObject, ObjectArena};
use crate::sched::ReadyQueue;
use crate::task::OsTcb;
use crate::types::{ObjId, OsNestingCtr, OsStkElement, OsTaskState, OsTick, TaskId, TaskInfo};

/// Application callbacks invoked by the kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct OsHooks {
    /// Called from the idle task on every pass of its loop
    pub idle: Option<fn()>,
    /// Called when a task's stack check fails, before the kernel halts
    pub stack_overflow: Option<fn(TaskId, &'static str)>,
}

impl OsHooks {
    pub const NONE: OsHooks = OsHooks {
        idle: None,
        stack_overflow: None,
    };
}

/// Scheduler and synchronization state
pub struct Kernel {
    pub(crate) tasks: [OsTcb; CFG_MAX_TASKS],
    pub(crate) ready: ReadyQueue,
    /// Blocked tasks with a bounded wait, ordered by wake tick
    pub(crate) tick_list: TaskList,
    pub(crate) objects: ObjectArena,
    pub(crate) registry: Vec<(ObjId, &'static str), CFG_QUEUE_REGISTRY_SIZE>,
    pub(crate) current: Option<u8>,
    pub(crate) idle: Option<u8>,
    pub(crate) tick: OsTick,
    pub(crate) running: bool,
    pub(crate) sched_lock: OsNestingCtr,
    pub(crate) switch_pending: bool,
    pub(crate) hooks: OsHooks,
    pub(crate) config: KernelConfig,
}

impl Kernel {
    /// An empty kernel; nothing runs until [`init`](Self::init) and
    /// [`start`](Self::start)
    pub const fn new(config: KernelConfig) -> Self {
        Kernel {
            tasks: [OsTcb::VACANT; CFG_MAX_TASKS],
            ready: ReadyQueue::new(),
            tick_list: TaskList::new(LinkKind::Tick),
            objects: [KObject::VACANT; CFG_MAX_OBJECTS],
            registry: Vec::new(),
            current: None,
            idle: None,
            tick: 0,
            running: false,
            sched_lock: 0,
            switch_pending: false,
            hooks: OsHooks::NONE,
            config,
        }
    }

    /// Create the idle task
    ///
    /// Must be called once before [`start`](Self::start).
    pub fn init(&mut self, idle_stack: &'static mut [OsStkElement]) -> OsResult<TaskId> {
        if self.running {
            return Err(OsError::OsRunning);
        }
        if self.idle.is_some() {
            return Err(OsError::OsRunning);
        }

        let id = self.task_create(
            idle_stack,
            "IDLE",
            crate::os::idle_task,
            core::ptr::null_mut(),
            CFG_PRIO_IDLE,
        )?;
        self.idle = Some(id.index);
        crate::debug!("idle task created in slot {}", id.index);
        Ok(id)
    }

    /// Select the first task to run
    ///
    /// Returns the task whose context the port must restore first.
    pub fn start(&mut self) -> OsResult<TaskId> {
        if self.idle.is_none() {
            return Err(OsError::OsNotInit);
        }
        if self.running {
            return Err(OsError::OsRunning);
        }

        self.running = true;
        self.switch_pending = false;
        let first = self.ready.highest().ok_or(OsError::OsNotInit)?;
        self.dispatch(first);
        crate::info!("scheduler started, first task {}", self.tasks[first].name);
        Ok(self.task_id(first))
    }

    /// Make `next` the running task
    pub(crate) fn dispatch(&mut self, next: usize) {
        if let Some(cur) = self.current_index() {
            if cur != next && self.tasks[cur].task_state == OsTaskState::Running {
                self.tasks[cur].task_state = OsTaskState::Ready;
            }
        }
        let tcb = &mut self.tasks[next];
        if tcb.task_state != OsTaskState::Running {
            tcb.time_quanta_ctr = self.config.time_slice_ticks;
        }
        tcb.task_state = OsTaskState::Running;
        self.current = Some(next as u8);
    }

    /// Save the outgoing task's stack pointer, switch, and return the
    /// incoming task's stack pointer
    ///
    /// This is the scheduler half of the context-switch trampoline. A failed
    /// stack check calls the overflow hook and halts. A zero `saved_sp`
    /// means no task context was saved, as on the very first switch.
    pub fn switch_from(&mut self, saved_sp: usize) -> usize {
        if let Some(cur) = self.current_index().filter(|_| saved_sp != 0) {
            let tcb = &mut self.tasks[cur];
            tcb.stk_ptr = saved_sp;
            if tcb.in_use && !self.stack_ok(cur) {
                let id = self.task_id(cur);
                let name = self.tasks[cur].name;
                crate::error!("stack overflow in task {}", name);
                if let Some(hook) = self.hooks.stack_overflow {
                    hook(id, name);
                }
                panic!("stack overflow in task {}", name);
            }
        }

        self.switch_context();
        self.current_index()
            .map(|cur| self.tasks[cur].stk_ptr)
            .unwrap_or(saved_sp)
    }

    /// Stack pointer inside the task's region and, at level 2, guard words
    /// intact
    pub(crate) fn stack_ok(&self, idx: usize) -> bool {
        let level = self.config.check_stack_overflow;
        if level == 0 {
            return true;
        }
        let tcb = &self.tasks[idx];
        let Some(stack) = tcb.stack else {
            return true;
        };
        if !stack.contains(tcb.stk_ptr) {
            return false;
        }
        level < 2 || stack.guard_intact()
    }

    // ============ Hooks ============

    pub fn set_idle_hook(&mut self, hook: fn()) {
        self.hooks.idle = Some(hook);
    }

    pub fn set_stack_overflow_hook(&mut self, hook: fn(TaskId, &'static str)) {
        self.hooks.stack_overflow = Some(hook);
    }

    #[inline]
    pub fn hooks(&self) -> OsHooks {
        self.hooks
    }

    // ============ Accessors ============

    /// Kernel configuration
    #[inline]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.idle.is_some()
    }

    /// Ticks since start, wrapping
    #[inline]
    pub fn tick_count(&self) -> OsTick {
        self.tick
    }

    /// A context switch has been requested and not yet performed
    #[inline]
    pub fn is_switch_pending(&self) -> bool {
        self.switch_pending
    }

    #[inline]
    pub fn sched_lock_nesting(&self) -> OsNestingCtr {
        self.sched_lock
    }

    /// Currently running task
    #[inline]
    pub fn current(&self) -> Option<TaskId> {
        self.current_index().map(|idx| self.task_id(idx))
    }

    /// The idle task
    #[inline]
    pub fn idle_task(&self) -> Option<TaskId> {
        self.idle.map(|idx| self.task_id(idx as usize))
    }

    #[inline]
    pub(crate) fn current_index(&self) -> Option<usize> {
        self.current.map(usize::from)
    }

    /// Running task slot; task-context operations fail before start
    #[inline]
    pub(crate) fn current_idx(&self) -> OsResult<usize> {
        self.current_index().ok_or(OsError::OsNotRunning)
    }

    #[inline]
    pub(crate) fn task_id(&self, idx: usize) -> TaskId {
        TaskId {
            index: idx as u8,
            generation: self.tasks[idx].generation,
        }
    }

    /// Resolve a handle to a live task slot
    pub(crate) fn task_check(&self, id: TaskId) -> OsResult<usize> {
        self.tasks
            .get(id.index())
            .filter(|t| {
                t.in_use && t.generation == id.generation && t.task_state != OsTaskState::Deleted
            })
            .map(|_| id.index())
            .ok_or(OsError::TaskInvalid)
    }

    /// Snapshot of one task
    pub fn task_info(&self, id: TaskId) -> OsResult<TaskInfo> {
        let idx = self.task_check(id)?;
        let tcb = &self.tasks[idx];
        Ok(TaskInfo {
            id,
            name: tcb.name,
            state: tcb.task_state,
            base_prio: tcb.base_prio,
            prio: tcb.prio,
            stack_high_water: tcb.stack.map_or(0, |s| s.high_water_mark()),
        })
    }

    /// Live tasks, idle included
    pub fn task_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.in_use && t.task_state != OsTaskState::Deleted)
            .count()
    }

    /// Interrupt-context view of the kernel
    #[inline]
    pub fn isr(&mut self) -> Isr<'_> {
        Isr {
            kernel: self,
            yield_required: false,
        }
    }
}

/// Interrupt-context capability
///
/// Only exposes operations that never block. Each reports whether it made a
/// task more urgent than the interrupted one ready; [`exit`](Isr::exit)
/// turns the accumulated flag into a pending context switch.
pub struct Isr<'k> {
    pub(crate) kernel: &'k mut Kernel,
    yield_required: bool,
}

impl<'k> Isr<'k> {
    /// Record a wake-up result
    #[inline]
    pub(crate) fn note(&mut self, woken: bool) -> bool {
        self.yield_required |= woken;
        woken
    }

    /// A switch should be requested when the interrupt returns
    #[inline]
    pub fn yield_required(&self) -> bool {
        self.yield_required
    }

    #[inline]
    pub fn tick_count(&self) -> OsTick {
        self.kernel.tick
    }

    /// Leave interrupt context, requesting a switch if one is due
    pub fn exit(self) -> bool {
        if self.yield_required {
            self.kernel.switch_pending = true;
        }
        self.yield_required || self.kernel.switch_pending
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(KernelConfig::DEFAULT)
    }
}
