//! Kernel critical sections
//!
//! Kernel state is only mutated with interrupts masked at or below the
//! system-call ceiling (`CFG_MAX_SYSCALL_INTERRUPT_PRIORITY`). Interrupts more
//! urgent than the ceiling keep running and must not call into the kernel.

use crate::config::CFG_MAX_SYSCALL_INTERRUPT_PRIORITY;

/// Run `f` inside the kernel critical section
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(critical_section::CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}

/// True when called from an exception or interrupt handler
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        !matches!(
            cortex_m::peripheral::SCB::vect_active(),
            cortex_m::peripheral::scb::VectActive::ThreadMode
        )
    }

    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}

/// Raise BASEPRI to the system-call ceiling.
///
/// Returns `false` if a mask was already in place, in which case the caller
/// is nested and must not lift it again.
#[inline]
pub fn mask_kernel_interrupts() -> bool {
    #[cfg(target_arch = "arm")]
    {
        if cortex_m::register::basepri::read() != 0 {
            return false;
        }
        // SAFETY: raising the mask can't break a critical section
        unsafe { cortex_m::register::basepri::write(CFG_MAX_SYSCALL_INTERRUPT_PRIORITY) };
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
        true
    }

    #[cfg(not(target_arch = "arm"))]
    {
        let _ = CFG_MAX_SYSCALL_INTERRUPT_PRIORITY;
        true
    }
}

/// Lift the mask raised by [`mask_kernel_interrupts`]
///
/// # Safety
///
/// Only the outermost critical section may call this, after the state it
/// protects is consistent again.
#[inline]
pub unsafe fn unmask_kernel_interrupts() {
    #[cfg(target_arch = "arm")]
    unsafe {
        cortex_m::register::basepri::write(0)
    };
}
