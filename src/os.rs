//! Task-level API over the global kernel
//!
//! One [`Kernel`] lives in a critical-section cell. Every `os_*` function
//! enters the critical section, runs the matching kernel operation and, if
//! that left a context switch pending, pends PendSV on the way out. Calls
//! that may wait loop on [`OsError::Blocked`]: by the time the pended switch
//! returns control to the caller its wait has ended and the operation is
//! retried with the same deadline.
//!
//! Contract violations (see [`OsError::is_programming_error`]) are fatal
//! here; every other error is returned.

use core::ptr::addr_of_mut;

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::{KernelConfig, CFG_CPU_CLOCK_HZ, CFG_IDLE_TASK_STACK_DEPTH, CFG_TICK_RATE_HZ};
use crate::critical::{critical_section, is_isr_context};
use crate::cs_cell::CsCell;
use crate::error::{OsError, OsResult};
use crate::kernel::{Isr, Kernel};
use crate::sync::queue::Queue;
use crate::task::OsTaskFn;
use crate::time::{ms_to_ticks, Deadline};
use crate::types::{ObjId, OsPrio, OsStkElement, OsTaskState, OsTick, TaskId, TaskInfo, Timeout};

#[cfg(feature = "notify")]
use crate::sync::notify::NotifyAction;
#[cfg(feature = "sem")]
use crate::types::OsSemCtr;
#[cfg(feature = "notify")]
use crate::types::OsNotifyValue;

/// The kernel instance driven by this module
static KERNEL: CsCell<Kernel> = CsCell::new(Kernel::new(KernelConfig::DEFAULT));

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static RUNNING: AtomicBool = AtomicBool::new(false);

/// Tick count mirrored outside the kernel, readable without locking
static TICKS: AtomicU32 = AtomicU32::new(0);

static mut IDLE_STK: [OsStkElement; CFG_IDLE_TASK_STACK_DEPTH] = [0; CFG_IDLE_TASK_STACK_DEPTH];

// ============ Plumbing ============

/// Halt on contract violations, pass everything else through
fn checked<R>(result: OsResult<R>) -> OsResult<R> {
    if let Err(err) = result {
        if err.is_programming_error() {
            crate::error!("kernel contract violation: {}", err);
            panic!("kernel contract violation: {:?}", err);
        }
    }
    result
}

fn finish<R>((result, switch): (OsResult<R>, bool)) -> OsResult<R> {
    if switch {
        crate::port::os_ctx_sw();
    }
    checked(result)
}

/// Run one kernel operation
fn os_call<R>(f: impl FnOnce(&mut Kernel) -> OsResult<R>) -> OsResult<R> {
    finish(KERNEL.with(|k| {
        let result = f(k);
        (result, k.is_switch_pending())
    }))
}

/// Run a task-only operation
fn os_task_call<R>(f: impl FnOnce(&mut Kernel) -> OsResult<R>) -> OsResult<R> {
    if is_isr_context() {
        return checked(Err(OsError::PendIsr));
    }
    os_call(f)
}

/// Retry an attempt until it stops reporting that it blocked
fn retry<R>(mut attempt: impl FnMut() -> OsResult<R>) -> OsResult<R> {
    loop {
        match attempt() {
            Err(OsError::Blocked) => continue,
            other => return other,
        }
    }
}

/// Run a blocking kernel operation under one deadline
fn os_block<R>(
    timeout: Timeout,
    mut op: impl FnMut(&mut Kernel, &mut Deadline) -> OsResult<R>,
) -> OsResult<R> {
    if is_isr_context() {
        return checked(Err(OsError::PendIsr));
    }
    let mut deadline = KERNEL.with(|k| k.deadline(timeout));
    retry(|| os_call(|k| op(k, &mut deadline)))
}

/// Run operations from interrupt context
///
/// A context switch is pended on exit if anything `f` did readied a task
/// more urgent than the interrupted one.
pub fn os_isr<R>(f: impl FnOnce(&mut Isr<'_>) -> R) -> R {
    let (result, switch) = KERNEL.with(|k| {
        let mut isr = k.isr();
        let result = f(&mut isr);
        (result, isr.exit())
    });
    if switch {
        crate::port::os_ctx_sw();
    }
    result
}

/// Scheduler half of the context switch, called by the port
pub(crate) fn switch_from_isr(saved_sp: usize) -> usize {
    KERNEL.with(|k| k.switch_from(saved_sp))
}

// ============ Lifecycle ============

/// Initialize the kernel
///
/// Creates the idle task and, with the `timers` feature, the timer service
/// task and its command queue. Must be called once, before [`os_start`].
pub fn os_init() -> OsResult<()> {
    if INITIALIZED.swap(true, Ordering::AcqRel) {
        return Err(OsError::OsRunning);
    }

    // SAFETY: guarded by INITIALIZED, so the stack is handed out once
    let idle_stk = unsafe { &mut *addr_of_mut!(IDLE_STK) };
    os_call(|k| k.init(idle_stk))?;

    #[cfg(feature = "timers")]
    timer::init()?;

    crate::info!("kernel initialized");
    Ok(())
}

/// Start multitasking
///
/// Restores the most urgent ready task and does not return on success.
pub fn os_start() -> OsResult<()> {
    let first = os_call(|k| k.start())?;
    RUNNING.store(true, Ordering::Release);
    crate::debug!("starting task {}", first.index());

    crate::port::os_cpu_systick_init(CFG_CPU_CLOCK_HZ / CFG_TICK_RATE_HZ);
    // SAFETY: the kernel has dispatched its first task
    unsafe { crate::port::os_start_high_rdy() }
}

#[inline]
pub fn os_is_running() -> bool {
    RUNNING.load(Ordering::Acquire)
}

/// Ticks since start
#[inline]
pub fn os_tick_get() -> OsTick {
    TICKS.load(Ordering::Relaxed)
}

/// Tick interrupt body
pub fn os_tick_handler() {
    if !os_is_running() {
        return;
    }
    let now = os_isr(|isr| {
        isr.tick();
        isr.tick_count()
    });
    TICKS.store(now, Ordering::Relaxed);
}

/// SysTick interrupt handler
#[cfg(target_arch = "arm")]
#[no_mangle]
pub extern "C" fn SysTick() {
    os_tick_handler();
}

pub fn os_set_idle_hook(hook: fn()) {
    KERNEL.with(|k| k.set_idle_hook(hook));
}

pub fn os_set_stack_overflow_hook(hook: fn(TaskId, &'static str)) {
    KERNEL.with(|k| k.set_stack_overflow_hook(hook));
}

/// Idle task body
///
/// Reclaims deleted tasks and runs the idle hook outside the critical
/// section.
pub fn idle_task(_: *mut ()) -> ! {
    loop {
        let (hook, switch) = KERNEL.with(|k| {
            k.idle_step();
            (k.hooks().idle, k.is_switch_pending())
        });
        if switch {
            crate::port::os_ctx_sw();
        }
        if let Some(hook) = hook {
            hook();
        }
    }
}

// ============ Tasks ============

/// Create a task on a static stack
pub fn os_task_create(
    stack: &'static mut [OsStkElement],
    name: &'static str,
    task_fn: OsTaskFn,
    arg: *mut (),
    prio: OsPrio,
) -> OsResult<TaskId> {
    os_call(|k| k.task_create(stack, name, task_fn, arg, prio))
}

/// Delete a task; deleting the caller does not return
pub fn os_task_del(task: TaskId) -> OsResult<()> {
    os_task_call(|k| k.task_delete(task))
}

pub fn os_task_suspend(task: TaskId) -> OsResult<()> {
    os_task_call(|k| k.task_suspend(task))
}

pub fn os_task_resume(task: TaskId) -> OsResult<()> {
    os_task_call(|k| k.task_resume(task))
}

pub fn os_task_resume_from_isr(task: TaskId) -> OsResult<bool> {
    checked(os_isr(|isr| isr.task_resume(task)))
}

pub fn os_task_prio_set(task: TaskId, prio: OsPrio) -> OsResult<()> {
    os_call(|k| k.task_priority_set(task, prio))
}

pub fn os_task_prio_get(task: TaskId) -> OsResult<OsPrio> {
    os_call(|k| k.task_priority_get(task))
}

pub fn os_task_state(task: TaskId) -> OsResult<OsTaskState> {
    os_call(|k| k.task_state(task))
}

pub fn os_task_info(task: TaskId) -> OsResult<TaskInfo> {
    os_call(|k| k.task_info(task))
}

/// Force a blocked task out of its wait
pub fn os_task_abort_wait(task: TaskId) -> OsResult<()> {
    os_call(|k| k.task_abort_wait(task))
}

/// The calling task
pub fn os_task_current() -> Option<TaskId> {
    KERNEL.with(|k| k.current())
}

// ============ Scheduler and time ============

pub fn os_sched_yield() -> OsResult<()> {
    os_task_call(|k| k.yield_now())
}

pub fn os_sched_lock() -> OsResult<()> {
    os_task_call(|k| k.sched_lock())
}

pub fn os_sched_unlock() -> OsResult<u8> {
    os_task_call(|k| k.sched_unlock())
}

/// Delay the caller by `ticks`; zero only yields
pub fn os_time_dly(ticks: OsTick) -> OsResult<()> {
    os_task_call(|k| k.delay(ticks))
}

/// Delay the caller by at least `ms` milliseconds
pub fn os_time_dly_ms(ms: u32) -> OsResult<()> {
    os_time_dly(ms_to_ticks(ms))
}

/// Delay until `*last_wake + period` for a fixed-rate loop
pub fn os_time_dly_until(last_wake: &mut OsTick, period: OsTick) -> OsResult<bool> {
    os_task_call(|k| k.delay_until(last_wake, period))
}

// ============ Registry ============

/// Name an object for debuggers
pub fn os_registry_add(id: ObjId, name: &'static str) -> OsResult<()> {
    os_call(|k| k.registry_add(id, name))
}

pub fn os_registry_find(name: &str) -> Option<ObjId> {
    KERNEL.with(|k| k.registry_find(name))
}

// ============ Queues ============

/// A queue usable from a `static`
///
/// The item storage lives in its own critical-section cell next to the
/// global kernel; every operation borrows both inside one critical section.
///
/// ```ignore
/// static EVENTS: OsQueue<u32, 8> = OsQueue::new();
///
/// EVENTS.create()?;
/// EVENTS.send(42, Timeout::Ticks(10))?;
/// let ev = EVENTS.receive(Timeout::Forever)?;
/// ```
pub struct OsQueue<T: Copy, const N: usize> {
    inner: CsCell<Option<Queue<T, N>>>,
}

impl<T: Copy + Send, const N: usize> OsQueue<T, N> {
    pub const fn new() -> Self {
        OsQueue {
            inner: CsCell::new(None),
        }
    }

    fn with_queue<R>(
        &self,
        f: impl FnOnce(&mut Kernel, &mut Queue<T, N>) -> OsResult<R>,
    ) -> OsResult<R> {
        finish(critical_section(|cs| {
            KERNEL.with_cs(cs, |k| {
                let result = self.inner.with_cs(cs, |q| match q {
                    Some(q) => f(k, q),
                    None => Err(OsError::ObjInvalid),
                });
                (result, k.is_switch_pending())
            })
        }))
    }

    fn with_queue_isr<R>(
        &self,
        f: impl FnOnce(&mut Isr<'_>, &mut Queue<T, N>) -> OsResult<R>,
    ) -> OsResult<R> {
        finish(critical_section(|cs| {
            KERNEL.with_cs(cs, |k| {
                let mut isr = k.isr();
                let result = self.inner.with_cs(cs, |q| match q {
                    Some(q) => f(&mut isr, q),
                    None => Err(OsError::ObjInvalid),
                });
                (result, isr.exit())
            })
        }))
    }

    fn block<R>(
        &self,
        timeout: Timeout,
        mut op: impl FnMut(&mut Kernel, &mut Queue<T, N>, &mut Deadline) -> OsResult<R>,
    ) -> OsResult<R> {
        if is_isr_context() {
            return checked(Err(OsError::PendIsr));
        }
        let mut deadline = KERNEL.with(|k| k.deadline(timeout));
        retry(|| self.with_queue(|k, q| op(k, q, &mut deadline)))
    }

    /// Allocate the kernel object; a no-op once created
    pub fn create(&self) -> OsResult<()> {
        critical_section(|cs| {
            self.inner.with_cs(cs, |q| {
                if q.is_some() {
                    return Ok(());
                }
                *q = Some(KERNEL.with_cs(cs, Queue::create)?);
                Ok(())
            })
        })
    }

    /// Kernel object handle
    pub fn id(&self) -> OsResult<ObjId> {
        self.inner
            .with(|q| q.as_ref().map(Queue::id))
            .ok_or(OsError::ObjInvalid)
    }

    pub fn send(&self, item: T, timeout: Timeout) -> OsResult<()> {
        self.block(timeout, |k, q, d| q.send(k, item, d))
    }

    pub fn send_to_front(&self, item: T, timeout: Timeout) -> OsResult<()> {
        self.block(timeout, |k, q, d| q.send_to_front(k, item, d))
    }

    pub fn overwrite(&self, item: T) -> OsResult<()> {
        self.with_queue(|k, q| q.overwrite(k, item)).map(|_| ())
    }

    pub fn receive(&self, timeout: Timeout) -> OsResult<T> {
        self.block(timeout, |k, q, d| q.receive(k, d))
    }

    pub fn peek(&self) -> OsResult<T> {
        self.with_queue(|k, q| q.peek(k))
    }

    pub fn reset(&self) -> OsResult<()> {
        self.with_queue(|k, q| q.reset(k))
    }

    pub fn messages_waiting(&self) -> usize {
        self.inner.with(|q| q.as_ref().map_or(0, |q| q.messages_waiting()))
    }

    pub fn spaces_available(&self) -> usize {
        self.inner.with(|q| q.as_ref().map_or(0, |q| q.spaces_available()))
    }

    pub fn send_from_isr(&self, item: T) -> OsResult<bool> {
        self.with_queue_isr(|isr, q| q.send_from_isr(isr, item))
    }

    pub fn send_to_front_from_isr(&self, item: T) -> OsResult<bool> {
        self.with_queue_isr(|isr, q| q.send_to_front_from_isr(isr, item))
    }

    pub fn receive_from_isr(&self) -> OsResult<(T, bool)> {
        self.with_queue_isr(|isr, q| q.receive_from_isr(isr))
    }

    /// Free the kernel object; blocked tasks fail with [`OsError::ObjDel`]
    pub fn delete(&self) -> OsResult<()> {
        finish(critical_section(|cs| {
            KERNEL.with_cs(cs, |k| {
                let result = self.inner.with_cs(cs, |q| match q.take() {
                    Some(q) => q.delete(k),
                    None => Err(OsError::ObjInvalid),
                });
                (result, k.is_switch_pending())
            })
        }))
    }
}

impl<T: Copy + Send, const N: usize> Default for OsQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Semaphores ============

#[cfg(feature = "sem")]
pub fn os_sem_create(max: OsSemCtr, initial: OsSemCtr) -> OsResult<ObjId> {
    os_call(|k| k.sem_create(max, initial))
}

#[cfg(feature = "sem")]
pub fn os_sem_take(id: ObjId, timeout: Timeout) -> OsResult<()> {
    os_block(timeout, |k, d| k.sem_take(id, d))
}

#[cfg(feature = "sem")]
pub fn os_sem_give(id: ObjId) -> OsResult<()> {
    os_call(|k| k.sem_give(id))
}

#[cfg(feature = "sem")]
pub fn os_sem_give_from_isr(id: ObjId) -> OsResult<bool> {
    checked(os_isr(|isr| isr.sem_give(id)))
}

#[cfg(feature = "sem")]
pub fn os_sem_take_from_isr(id: ObjId) -> OsResult<bool> {
    checked(os_isr(|isr| isr.sem_take(id)))
}

#[cfg(feature = "sem")]
pub fn os_sem_count(id: ObjId) -> OsResult<OsSemCtr> {
    os_call(|k| k.sem_count(id))
}

#[cfg(feature = "sem")]
pub fn os_sem_delete(id: ObjId) -> OsResult<()> {
    os_call(|k| k.sem_delete(id))
}

// ============ Mutexes ============

#[cfg(feature = "mutex")]
pub fn os_mutex_create(recursive: bool) -> OsResult<ObjId> {
    os_call(|k| k.mutex_create(recursive))
}

#[cfg(feature = "mutex")]
pub fn os_mutex_lock(id: ObjId, timeout: Timeout) -> OsResult<()> {
    os_block(timeout, |k, d| k.mutex_lock(id, d))
}

#[cfg(feature = "mutex")]
pub fn os_mutex_unlock(id: ObjId) -> OsResult<()> {
    os_task_call(|k| k.mutex_unlock(id))
}

#[cfg(feature = "mutex")]
pub fn os_mutex_holder(id: ObjId) -> OsResult<Option<TaskId>> {
    os_call(|k| k.mutex_holder(id))
}

#[cfg(feature = "mutex")]
pub fn os_mutex_delete(id: ObjId) -> OsResult<()> {
    os_call(|k| k.mutex_delete(id))
}

// ============ Queue sets ============

#[cfg(feature = "queue-set")]
pub fn os_set_create(length: usize) -> OsResult<ObjId> {
    os_call(|k| k.set_create(length))
}

#[cfg(feature = "queue-set")]
pub fn os_set_add(set: ObjId, member: ObjId) -> OsResult<()> {
    os_call(|k| k.set_add(set, member))
}

#[cfg(feature = "queue-set")]
pub fn os_set_remove(set: ObjId, member: ObjId) -> OsResult<()> {
    os_call(|k| k.set_remove(set, member))
}

/// Wait for a member with an item; receive from it with `Timeout::NoWait`
#[cfg(feature = "queue-set")]
pub fn os_set_select(set: ObjId, timeout: Timeout) -> OsResult<ObjId> {
    os_block(timeout, |k, d| k.set_select(set, d))
}

#[cfg(feature = "queue-set")]
pub fn os_set_select_from_isr(set: ObjId) -> OsResult<Option<ObjId>> {
    checked(os_isr(|isr| isr.set_select(set)))
}

#[cfg(feature = "queue-set")]
pub fn os_set_pending(set: ObjId) -> OsResult<usize> {
    os_call(|k| k.set_len(set))
}

#[cfg(feature = "queue-set")]
pub fn os_set_delete(set: ObjId) -> OsResult<()> {
    os_call(|k| k.set_delete(set))
}

// ============ Notifications ============

#[cfg(feature = "notify")]
pub fn os_task_notify(task: TaskId, action: NotifyAction) -> OsResult<()> {
    os_call(|k| k.notify(task, action))
}

#[cfg(feature = "notify")]
pub fn os_task_notify_give(task: TaskId) -> OsResult<()> {
    os_call(|k| k.notify_give(task))
}

#[cfg(feature = "notify")]
pub fn os_task_notify_from_isr(task: TaskId, action: NotifyAction) -> OsResult<bool> {
    checked(os_isr(|isr| isr.notify(task, action)))
}

#[cfg(feature = "notify")]
pub fn os_task_notify_give_from_isr(task: TaskId) -> OsResult<bool> {
    checked(os_isr(|isr| isr.notify_give(task)))
}

#[cfg(feature = "notify")]
pub fn os_task_notify_wait(
    clear_on_entry: OsNotifyValue,
    clear_on_exit: OsNotifyValue,
    timeout: Timeout,
) -> OsResult<OsNotifyValue> {
    os_block(timeout, |k, d| k.notify_wait(clear_on_entry, clear_on_exit, d))
}

#[cfg(feature = "notify")]
pub fn os_task_notify_take(clear_on_exit: bool, timeout: Timeout) -> OsResult<OsNotifyValue> {
    os_block(timeout, |k, d| k.notify_take(clear_on_exit, d))
}

#[cfg(feature = "notify")]
pub fn os_task_notify_state_clear(task: TaskId) -> OsResult<bool> {
    os_call(|k| k.notify_state_clear(task))
}

// ============ Software timers ============

#[cfg(feature = "timers")]
pub use timer::{
    os_timer_change_period, os_timer_command_from_isr, os_timer_create, os_timer_delete,
    os_timer_reset, os_timer_start, os_timer_stop,
};

#[cfg(feature = "timers")]
mod timer {
    use core::ptr::addr_of_mut;

    use super::{os_call, os_tick_get, OsQueue};
    use crate::config::{
        CFG_TIMER_QUEUE_LENGTH, CFG_TIMER_TASK_PRIORITY, CFG_TIMER_TASK_STACK_DEPTH,
    };
    use crate::error::{OsError, OsResult};
    use crate::timer::{TimerCallback, TimerCommand, TimerId, TimerPool, TimerService};
    use crate::types::{OsStkElement, OsTick, Timeout};

    static TIMER_POOL: TimerPool = TimerPool::new();
    static TIMER_QUEUE: OsQueue<TimerCommand, CFG_TIMER_QUEUE_LENGTH> = OsQueue::new();

    static mut TIMER_STK: [OsStkElement; CFG_TIMER_TASK_STACK_DEPTH] =
        [0; CFG_TIMER_TASK_STACK_DEPTH];

    pub(super) fn init() -> OsResult<()> {
        TIMER_QUEUE.create()?;
        let queue = TIMER_QUEUE.id()?;
        os_call(|k| k.registry_add(queue, "TmrQ"))?;

        // SAFETY: only reached once, from os_init
        let stack = unsafe { &mut *addr_of_mut!(TIMER_STK) };
        os_call(|k| {
            k.task_create(
                stack,
                "Tmr Svc",
                timer_task,
                core::ptr::null_mut(),
                CFG_TIMER_TASK_PRIORITY,
            )
        })?;
        Ok(())
    }

    /// Timer service task
    ///
    /// Sleeps on the command queue until a command arrives or the earliest
    /// timer is due, then fires what expired and applies what was queued.
    fn timer_task(_: *mut ()) -> ! {
        let mut service = TimerService::new(os_tick_get());
        loop {
            service.expire_due(os_tick_get());

            let wait = service.wait_timeout(os_tick_get());
            if let Ok(cmd) = TIMER_QUEUE.receive(wait) {
                service.process_command(cmd, os_tick_get());
                while let Ok(cmd) = TIMER_QUEUE.receive(Timeout::NoWait) {
                    service.process_command(cmd, os_tick_get());
                }
            }
        }
    }

    fn reserved(id: TimerId) -> OsResult<TimerId> {
        if TIMER_POOL.is_reserved(id) {
            Ok(id)
        } else {
            super::checked(Err(OsError::TmrInvalid))
        }
    }

    /// Create a dormant timer
    pub fn os_timer_create(
        period: OsTick,
        auto_reload: bool,
        callback: TimerCallback,
        timeout: Timeout,
    ) -> OsResult<TimerId> {
        let id = TIMER_POOL.reserve()?;
        let sent = TimerCommand::create(id, period, auto_reload, callback)
            .and_then(|cmd| TIMER_QUEUE.send(cmd, timeout));
        match sent {
            Ok(()) => Ok(id),
            Err(err) => {
                TIMER_POOL.release(id);
                Err(err)
            }
        }
    }

    /// Start a timer; its first expiry is one period from now
    pub fn os_timer_start(id: TimerId, timeout: Timeout) -> OsResult<()> {
        let id = reserved(id)?;
        TIMER_QUEUE.send(TimerCommand::Start { id, issued: os_tick_get() }, timeout)
    }

    /// Restart a timer's period from now
    pub fn os_timer_reset(id: TimerId, timeout: Timeout) -> OsResult<()> {
        let id = reserved(id)?;
        TIMER_QUEUE.send(TimerCommand::Reset { id, issued: os_tick_get() }, timeout)
    }

    pub fn os_timer_stop(id: TimerId, timeout: Timeout) -> OsResult<()> {
        let id = reserved(id)?;
        TIMER_QUEUE.send(TimerCommand::Stop { id }, timeout)
    }

    /// Change the period; the timer (re)starts from now
    pub fn os_timer_change_period(id: TimerId, period: OsTick, timeout: Timeout) -> OsResult<()> {
        let id = reserved(id)?;
        let cmd = TimerCommand::change_period(id, period, os_tick_get())?;
        TIMER_QUEUE.send(cmd, timeout)
    }

    /// Delete a timer; its id is free for reuse once the command is queued
    pub fn os_timer_delete(id: TimerId, timeout: Timeout) -> OsResult<()> {
        let id = reserved(id)?;
        TIMER_QUEUE.send(TimerCommand::Delete { id }, timeout)?;
        TIMER_POOL.release(id);
        Ok(())
    }

    /// Queue a command from interrupt context
    pub fn os_timer_command_from_isr(cmd: TimerCommand) -> OsResult<bool> {
        reserved(cmd.id())?;
        if matches!(cmd, TimerCommand::Create { .. } | TimerCommand::Delete { .. }) {
            return super::checked(Err(OsError::TmrInvalid));
        }
        TIMER_QUEUE.send_from_isr(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_stops_on_first_non_blocked_result() {
        let mut calls = 0;
        let result: OsResult<u8> = retry(|| {
            calls += 1;
            if calls < 3 {
                Err(OsError::Blocked)
            } else {
                Ok(7)
            }
        });
        assert_eq!(result, Ok(7));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_checked_passes_recoverable_errors() {
        assert_eq!(checked::<()>(Err(OsError::Timeout)), Err(OsError::Timeout));
        assert_eq!(checked::<()>(Err(OsError::QFull)), Err(OsError::QFull));
    }

    #[test]
    #[should_panic(expected = "kernel contract violation")]
    fn test_checked_halts_on_contract_violation() {
        let _ = checked::<()>(Err(OsError::MutexNotOwner));
    }
}
