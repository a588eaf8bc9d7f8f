//! CPU port
//!
//! Stack frame layout, the context switch and the tick timer. Everything
//! above this layer is target independent.

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::*;

/// Host port: no CPU to switch, so the kernel is driven by hand in tests
#[cfg(not(target_arch = "arm"))]
pub mod host {
    use crate::task::OsTaskFn;
    use crate::types::OsStkElement;

    pub unsafe fn os_start_high_rdy() -> ! {
        panic!("the host port cannot start the first task");
    }

    /// Switches are performed by the test driver calling `switch_context`
    pub fn os_ctx_sw() {}

    /// Initial stack pointer: the top of the region, nothing stacked
    pub unsafe fn os_task_stk_init(
        _entry: OsTaskFn,
        _arg: *mut (),
        base: *mut OsStkElement,
        len: usize,
    ) -> usize {
        base as usize + len * core::mem::size_of::<OsStkElement>()
    }

    pub fn os_cpu_systick_init(_reload: u32) {}
}

#[cfg(not(target_arch = "arm"))]
pub use host::*;
