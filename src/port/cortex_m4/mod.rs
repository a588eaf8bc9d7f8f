//! Cortex-M4 port
//!
//! Context switching runs in the PendSV exception at the lowest interrupt
//! priority. The handler pushes R4-R11 and EXC_RETURN onto the outgoing
//! task's process stack, asks the kernel which task runs next, and pops the
//! incoming one. Hardware stacks the caller-saved half on exception entry.

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SCB;

use crate::config::CFG_KERNEL_INTERRUPT_PRIORITY;
use crate::task::OsTaskFn;
use crate::types::OsStkElement;

/// EXC_RETURN for thread mode on the process stack, no FP context
const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;
/// xPSR with only the Thumb bit set
const INITIAL_XPSR: u32 = 1 << 24;
/// SysTick counts down from a 24-bit reload value
const SYST_RELOAD_MAX: u32 = 0x00FF_FFFF;

/// Start SysTick with a period of `reload` core clocks
pub fn os_cpu_systick_init(reload: u32) {
    crate::kassert!(reload > 0 && reload - 1 <= SYST_RELOAD_MAX, "tick reload out of range");

    // SAFETY: SysTick belongs to the kernel once the scheduler starts
    let mut syst = unsafe { cortex_m::Peripherals::steal() }.SYST;
    syst.disable_counter();
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(reload - 1);
    syst.clear_current();
    syst.enable_interrupt();
    syst.enable_counter();
}

/// Hand the core to the scheduler
///
/// PSP is zeroed so that the first PendSV has no outgoing context to save.
///
/// # Safety
/// The kernel must have selected a first task, and this must be called from
/// thread mode on the main stack.
pub unsafe fn os_start_high_rdy() -> ! {
    // SAFETY: the scheduler takes over PendSV and SysTick from here on
    unsafe {
        let mut scb = cortex_m::Peripherals::steal().SCB;
        scb.set_priority(SystemHandler::PendSV, CFG_KERNEL_INTERRUPT_PRIORITY);
        scb.set_priority(SystemHandler::SysTick, CFG_KERNEL_INTERRUPT_PRIORITY);

        asm!("msr psp, {0}", in(reg) 0u32, options(nomem, nostack));
        cortex_m::interrupt::enable();
    }
    SCB::set_pendsv();

    // PendSV never returns to the main stack
    loop {
        cortex_m::asm::wfi();
    }
}

/// Pend a context switch. Valid from task and interrupt level alike.
#[inline(always)]
pub fn os_ctx_sw() {
    SCB::set_pendsv();
}

/// What PendSV pushes, lowest address first
#[repr(C)]
struct SoftwareFrame {
    r4_r11: [u32; 8],
    exc_return: u32,
}

/// What the core pushes on exception entry
#[repr(C)]
struct HardwareFrame {
    r0_r3: [u32; 4],
    r12: u32,
    lr: u32,
    pc: u32,
    xpsr: u32,
}

#[repr(C)]
struct InitialFrame {
    sw: SoftwareFrame,
    hw: HardwareFrame,
}

/// Lay out the first frame of a new task
///
/// Returns the stack pointer PendSV restores from. The task enters
/// `entry(arg)` in thread mode and lands in [`os_task_return`] if it ever
/// returns.
///
/// # Safety
/// `base..base + len` must be a stack owned by the new task and large enough
/// for one frame.
pub unsafe fn os_task_stk_init(
    entry: OsTaskFn,
    arg: *mut (),
    base: *mut OsStkElement,
    len: usize,
) -> usize {
    // AAPCS wants an 8-byte aligned stack at the exception boundary
    let top = (base as usize + len * core::mem::size_of::<OsStkElement>()) & !7;
    let frame = (top - core::mem::size_of::<InitialFrame>()) as *mut InitialFrame;

    // SAFETY: the frame lies inside the caller's stack region
    unsafe {
        frame.write(InitialFrame {
            sw: SoftwareFrame {
                r4_r11: [0; 8],
                exc_return: EXC_RETURN_THREAD_PSP,
            },
            hw: HardwareFrame {
                r0_r3: [arg as u32, 0, 0, 0],
                r12: 0,
                lr: os_task_return as usize as u32,
                pc: entry as usize as u32 | 1,
                xpsr: INITIAL_XPSR,
            },
        });
    }
    frame as usize
}

/// Scheduler half of PendSV: store `saved_sp`, return the next task's SP
#[no_mangle]
extern "C" fn os_switch_context(saved_sp: usize) -> usize {
    crate::os::switch_from_isr(saved_sp)
}

/// Context switch
///
/// `os_switch_context` takes the kernel critical section itself, so the
/// handler only needs to keep the callee-saved registers it owns.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "mrs r0, psp",
        // First switch: nothing to save
        "cbz r0, 1f",
        "stmdb r0!, {{r4-r11, lr}}",
        "1:",
        "bl os_switch_context",
        "ldmia r0!, {{r4-r11, lr}}",
        "msr psp, r0",
        "isb",
        "bx lr",
    );
}

#[no_mangle]
extern "C" fn os_task_return() -> ! {
    crate::error!("task returned from its entry function");
    loop {
        cortex_m::asm::wfi();
    }
}
