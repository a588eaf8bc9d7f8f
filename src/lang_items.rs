//! Panic and fault handling on the target

// RTT transport for defmt frames; panics are reported over the same link
#[cfg(all(feature = "defmt", target_arch = "arm"))]
use {defmt_rtt as _, panic_probe as _};

#[cfg(all(feature = "defmt", target_arch = "arm"))]
#[defmt::panic_handler]
fn defmt_panic() -> ! {
    cortex_m::asm::udf()
}

#[cfg(all(not(feature = "defmt"), target_arch = "arm"))]
use panic_halt as _;

#[cfg(target_arch = "arm")]
#[cortex_m_rt::exception]
unsafe fn HardFault(frame: &cortex_m_rt::ExceptionFrame) -> ! {
    crate::error!("hard fault at pc {=u32:#x}, lr {=u32:#x}", frame.pc(), frame.lr());
    let _ = frame;
    loop {
        cortex_m::asm::bkpt();
    }
}

#[cfg(all(feature = "defmt", target_arch = "arm"))]
defmt::timestamp!("{=u32}", crate::os::os_tick_get());
