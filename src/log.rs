//! Logging macros for rtcore
//!
//! Every level funnels into `__klog!`, which forwards to `defmt` when the
//! `defmt` feature is on and expands to nothing otherwise.

#[doc(hidden)]
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! __klog {
    ($level:ident, $($arg:tt)*) => { ::defmt::$level!($($arg)*) };
}

#[doc(hidden)]
#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! __klog {
    ($level:ident, $($arg:tt)*) => {};
}

/// Scheduling decisions and per-tick events
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::__klog!(trace, $($arg)*) };
}

/// Object and task lifecycle
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::__klog!(debug, $($arg)*) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__klog!(info, $($arg)*) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__klog!(warn, $($arg)*) };
}

/// Failures that end in a panic or a halted core
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__klog!(error, $($arg)*) };
}

/// Kernel invariant check, kept in every build
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! kassert {
    ($($arg:tt)*) => { ::defmt::assert!($($arg)*) };
}

#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! kassert {
    ($($arg:tt)*) => { ::core::assert!($($arg)*) };
}
