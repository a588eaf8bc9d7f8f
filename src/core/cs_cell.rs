//! Critical section protected cell
//!
//! Wraps data that may only be touched with kernel interrupts masked. A
//! nested borrow of the same cell is a re-entrancy bug and panics.

use core::cell::RefCell;

use critical_section::Mutex;

/// A cell that can only be accessed within a critical section.
pub struct CsCell<T>(Mutex<RefCell<T>>);

impl<T> CsCell<T> {
    /// Create a new CsCell
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(Mutex::new(RefCell::new(value)))
    }

    /// Run `f` with exclusive access to the inner value
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| f(&mut self.0.borrow_ref_mut(cs)))
    }

    /// Run `f` inside an already-entered critical section
    #[inline]
    pub fn with_cs<R>(&self, cs: critical_section::CriticalSection<'_>, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.borrow_ref_mut(cs))
    }
}
