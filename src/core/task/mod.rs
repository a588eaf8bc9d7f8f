//! Task management module
//!
//! Provides task creation, deletion, suspension and priority control. Tasks
//! live in the kernel's fixed task arena; a [`TaskId`] names a slot plus the
//! generation it was created in.

mod tcb;

pub use tcb::{NotifyState, OsTcb};
pub(crate) use tcb::StackRegion;

use crate::config::{CFG_MAX_PRIORITIES, CFG_MAX_TASK_NAME_LEN, CFG_MINIMAL_STACK_SIZE, CFG_PRIO_IDLE};
use crate::error::{OsError, OsResult};
use crate::kernel::{Isr, Kernel};
use crate::types::{OsPendStatus, OsPrio, OsStkElement, OsTaskState, TaskId};

/// Task entry point function type
pub type OsTaskFn = fn(*mut ()) -> !;

/// Cut a name to the configured length on a character boundary
pub(crate) fn truncate_name(name: &'static str) -> &'static str {
    if name.len() <= CFG_MAX_TASK_NAME_LEN {
        return name;
    }
    let mut end = CFG_MAX_TASK_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

impl Kernel {
    /// Create a task on a caller-provided static stack
    ///
    /// The stack is painted so its high-water mark can be measured later. If
    /// the new task is more urgent than the running one, a switch is
    /// requested.
    ///
    /// # Example
    /// ```ignore
    /// static mut TASK_STK: [OsStkElement; 256] = [0; 256];
    ///
    /// fn my_task(_: *mut ()) -> ! {
    ///     loop { /* ... */ }
    /// }
    ///
    /// let id = kernel.task_create(
    ///     unsafe { &mut *core::ptr::addr_of_mut!(TASK_STK) },
    ///     "worker",
    ///     my_task,
    ///     core::ptr::null_mut(),
    ///     5,
    /// )?;
    /// ```
    pub fn task_create(
        &mut self,
        stack: &'static mut [OsStkElement],
        name: &'static str,
        task_fn: OsTaskFn,
        arg: *mut (),
        prio: OsPrio,
    ) -> OsResult<TaskId> {
        if prio as usize >= CFG_MAX_PRIORITIES {
            return Err(OsError::PrioInvalid);
        }
        if stack.len() < CFG_MINIMAL_STACK_SIZE {
            return Err(OsError::StkSizeInvalid);
        }
        let idx = self
            .tasks
            .iter()
            .position(|t| !t.in_use)
            .ok_or(OsError::TaskNoMoreTcb)?;

        let region = StackRegion::new(stack);
        // SAFETY: the region was handed over for the lifetime of the task
        let sp = unsafe {
            crate::port::os_task_stk_init(task_fn, arg, region.as_mut_ptr(), region.len())
        };

        let tcb = &mut self.tasks[idx];
        tcb.init(truncate_name(name), prio, region);
        tcb.stk_ptr = sp;
        tcb.time_quanta_ctr = self.config.time_slice_ticks;

        self.ready_insert(idx);
        self.reschedule();

        let id = self.task_id(idx);
        crate::debug!("task {} created at priority {}", self.tasks[idx].name, prio);
        Ok(id)
    }

    /// Delete a task
    ///
    /// A task deleting itself keeps its slot until the idle task reclaims it,
    /// since it is still running on its stack. Any other task is unlinked
    /// and its slot freed at once. Mutexes it holds pass to their next
    /// waiter.
    pub fn task_delete(&mut self, task: TaskId) -> OsResult<()> {
        let idx = self.task_check(task)?;
        if Some(idx as u8) == self.idle {
            return Err(OsError::TaskDelIdle);
        }

        self.task_unlink(idx);
        #[cfg(feature = "mutex")]
        self.mutex_release_all(idx);

        if Some(idx) == self.current_index() {
            self.tasks[idx].task_state = OsTaskState::Deleted;
        } else {
            self.tasks[idx].release();
        }
        crate::debug!("task {} deleted", idx);
        self.reschedule();
        Ok(())
    }

    /// Take a task off every list it is on
    fn task_unlink(&mut self, idx: usize) {
        match self.tasks[idx].task_state {
            OsTaskState::Ready | OsTaskState::Running => self.ready_remove(idx),
            OsTaskState::Blocked => {
                self.wake_task(idx, OsPendStatus::Del);
                self.ready_remove(idx);
            }
            OsTaskState::Suspended | OsTaskState::Deleted => {}
        }
    }

    /// Suspend a task until [`task_resume`](Self::task_resume)
    ///
    /// A blocked task's wait is cancelled and ends with
    /// [`OsError::PendAbort`] once it runs again. Suspension does not nest.
    pub fn task_suspend(&mut self, task: TaskId) -> OsResult<()> {
        let idx = self.task_check(task)?;
        if Some(idx as u8) == self.idle {
            return Err(OsError::TaskSuspendIdle);
        }

        match self.tasks[idx].task_state {
            OsTaskState::Suspended => return Ok(()),
            OsTaskState::Blocked => {
                self.wake_task(idx, OsPendStatus::Abort);
                self.ready_remove(idx);
            }
            _ => self.ready_remove(idx),
        }
        self.tasks[idx].task_state = OsTaskState::Suspended;
        self.reschedule();
        Ok(())
    }

    /// Make a suspended task ready again
    pub fn task_resume(&mut self, task: TaskId) -> OsResult<()> {
        self.task_resume_inner(task).map(|_| ())
    }

    fn task_resume_inner(&mut self, task: TaskId) -> OsResult<bool> {
        let idx = self.task_check(task)?;
        if self.tasks[idx].task_state != OsTaskState::Suspended {
            return Err(OsError::TaskNotSuspended);
        }
        self.ready_insert(idx);
        let preempts = self
            .current_index()
            .is_some_and(|cur| self.tasks[idx].prio > self.tasks[cur].prio);
        self.reschedule();
        Ok(preempts)
    }

    /// Change a task's base priority
    ///
    /// The effective priority follows unless an inherited priority is higher.
    pub fn task_priority_set(&mut self, task: TaskId, prio: OsPrio) -> OsResult<()> {
        if prio as usize >= CFG_MAX_PRIORITIES {
            return Err(OsError::PrioInvalid);
        }
        let idx = self.task_check(task)?;
        if Some(idx as u8) == self.idle && prio != CFG_PRIO_IDLE {
            return Err(OsError::PrioInvalid);
        }
        self.tasks[idx].base_prio = prio;
        self.refresh_priority(idx);
        self.reschedule();
        Ok(())
    }

    /// A task's base priority
    pub fn task_priority_get(&self, task: TaskId) -> OsResult<OsPrio> {
        let idx = self.task_check(task)?;
        Ok(self.tasks[idx].base_prio)
    }

    /// A task's state
    pub fn task_state(&self, task: TaskId) -> OsResult<OsTaskState> {
        let idx = self.task_check(task)?;
        Ok(self.tasks[idx].task_state)
    }

    /// One pass of the idle task's housekeeping
    ///
    /// Frees the slots of tasks that deleted themselves and gives way to
    /// other priority-0 tasks when configured to. Returns the number of
    /// slots reclaimed.
    pub fn idle_step(&mut self) -> usize {
        let current = self.current_index();
        let mut reclaimed = 0;
        for (idx, tcb) in self.tasks.iter_mut().enumerate() {
            if tcb.in_use && tcb.task_state == OsTaskState::Deleted && Some(idx) != current {
                tcb.release();
                reclaimed += 1;
            }
        }

        if self.config.idle_should_yield
            && current.is_some()
            && current == self.idle.map(usize::from)
            && self.ready.count_at(CFG_PRIO_IDLE) > 1
        {
            let _ = self.yield_now();
        }
        reclaimed
    }
}

impl Isr<'_> {
    /// Resume a suspended task from interrupt context
    pub fn task_resume(&mut self, task: TaskId) -> OsResult<bool> {
        let woken = self.kernel.task_resume_inner(task)?;
        Ok(self.note(woken))
    }
}
