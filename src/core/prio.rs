//! Ready-level bitmap
//!
//! Bit `p` is set while priority `p` has at least one ready task. All
//! priorities fit one word, so the most urgent ready level is a single
//! count-leading-zeros.

use crate::config::CFG_MAX_PRIORITIES;
use crate::types::OsPrio;

const _: () = assert!(CFG_MAX_PRIORITIES <= u32::BITS as usize);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadyMask(u32);

impl ReadyMask {
    pub const EMPTY: ReadyMask = ReadyMask(0);

    #[inline]
    pub fn set(&mut self, prio: OsPrio) {
        debug_assert!((prio as usize) < CFG_MAX_PRIORITIES);
        self.0 |= 1 << prio;
    }

    #[inline]
    pub fn clear(&mut self, prio: OsPrio) {
        debug_assert!((prio as usize) < CFG_MAX_PRIORITIES);
        self.0 &= !(1 << prio);
    }

    #[inline]
    pub fn contains(self, prio: OsPrio) -> bool {
        self.0 & (1 << prio) != 0
    }

    /// Most urgent level with a ready task
    #[inline]
    pub fn highest(self) -> Option<OsPrio> {
        match self.0 {
            0 => None,
            bits => Some((u32::BITS - 1 - bits.leading_zeros()) as OsPrio),
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}
