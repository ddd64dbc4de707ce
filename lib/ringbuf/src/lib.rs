// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trace ring buffers for the BlueNRG-LP drivers.
//!
//! Drivers in this workspace do not format log text. Instead each driver
//! declares a static ring buffer of a small `Copy` event type and records
//! events into it as it runs; the buffer can then be read out of RAM with a
//! debugger (`print drv_bluenrg_rng::__RINGBUF` in GDB, for instance).
//!
//! ## Constraints
//!
//! The entry type must implement both `Copy` and `PartialEq`. Recording the
//! same payload from the same line twice in a row bumps the count of the
//! previous entry instead of taking a new slot.
//!
//! If you use the variants of the macros that leave the name of the buffer
//! implicit, you can only have one per module.
//!
//! ## Creating a ring buffer
//!
//! ```
//! ringbuf!(u32, 16, 0);
//!
//! ringbuf_entry!(sr_bits);
//! ```
//!
//! A named buffer is declared and used the same way:
//!
//! ```
//! ringbuf!(DIVIDER_RINGBUF, u32, 16, 0);
//!
//! ringbuf_entry!(DIVIDER_RINGBUF, cr_bits);
//! ```
//!
//! ## Counted ring buffers
//!
//! A ring buffer only remembers the last `N` events. For events where the
//! total number of occurrences matters (timeouts, say), declare the buffer
//! with [`counted_ringbuf!`] over an enum deriving [`Count`], and record with
//! [`count_entry!`]. A static named `NAME_COUNTS` then holds one counter per
//! variant.
//!
//! ## Interrupts
//!
//! Entries are recorded inside a [`critical_section`], so a driver may trace
//! from both thread and interrupt context. The target must provide a
//! `critical-section` implementation; host tests use the crate's `std`
//! feature.

#![cfg_attr(not(test), no_std)]

use core::cell::RefCell;

pub use critical_section;
#[cfg(feature = "derive")]
pub use ringbuf_macros::Count;
#[doc(hidden)]
#[cfg(feature = "derive")]
pub use ringbuf_macros::{declare_counts, incr_count};

/// Storage for a static ring buffer.
///
/// This is a `critical_section::Mutex` around a `RefCell`, with the borrow
/// and the critical section folded into one call.
pub struct TraceCell<T> {
    inner: critical_section::Mutex<RefCell<T>>,
}

impl<T> TraceCell<T> {
    pub const fn new(contents: T) -> Self {
        Self {
            inner: critical_section::Mutex::new(RefCell::new(contents)),
        }
    }

    /// Runs `body` with exclusive access to the contents.
    ///
    /// `body` must not record into the same buffer; the nested borrow will
    /// panic.
    pub fn with<R>(&self, body: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| {
            body(&mut *self.inner.borrow_ref_mut(cs))
        })
    }
}

/// Declares a ringbuffer in the current module or context.
///
/// `ringbuf!(NAME, Type, N, expr)` makes a ringbuffer named `NAME`,
/// containing entries of type `Type`, with room for `N` such entries, all of
/// which are initialized to `expr`.
///
/// The actual type of `NAME` will be `TraceCell<Ringbuf<Type, N>>`. If you
/// omit the name, it will default to `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[used]
        static $name: $crate::TraceCell<$crate::Ringbuf<$t, $n>> =
            $crate::TraceCell::new($crate::Ringbuf {
                last: None,
                buffer: [$crate::RingbufEntry {
                    line: 0,
                    generation: 0,
                    count: 0,
                    payload: $init,
                }; $n],
            });
    };
    ($t:ty, $n:expr, $init:expr) => {
        $crate::ringbuf!(__RINGBUF, $t, $n, $init);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
    ($t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
}

/// Declares a ringbuffer and a set of event counts in the current module.
///
/// Besides the ring buffer `NAME`, this generates a static of
/// `<Type as Count>::Counters` named `NAME_COUNTS`. Events should be recorded
/// with [`count_entry!`].
#[macro_export]
macro_rules! counted_ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        $crate::ringbuf!($name, $t, $n, $init);
        $crate::declare_counts!($name, $t);
    };
    ($t:ty, $n:expr, $init:expr) => {
        $crate::counted_ringbuf!(__RINGBUF, $t, $n, $init);
    };
}

/// Inserts data into a ringbuffer declared with [`ringbuf!`].
///
/// `ringbuf_entry!(NAME, expr)` inserts `expr` into `NAME`; without a name
/// the buffer defaults to `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        // Evaluate both buf and payload, without letting them access each
        // other.
        let (p, buf) = ($payload, &$buf);
        $crate::TraceCell::with(buf, |rb| {
            $crate::Ringbuf::entry(rb, line!() as u16, p)
        });
    }};
    ($payload:expr) => {
        $crate::ringbuf_entry!(__RINGBUF, $payload);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        let _ = &$buf;
        let _ = &$payload;
    }};
    ($payload:expr) => {{
        let _ = &$payload;
    }};
}

/// Inserts an event into a buffer declared with [`counted_ringbuf!`] and
/// bumps the event's counter.
#[macro_export]
macro_rules! count_entry {
    ($buf:expr, $event:expr) => {{
        let event = $event;
        $crate::critical_section::with(|_| {
            $crate::incr_count!($buf, &event);
        });
        $crate::ringbuf_entry!($buf, event);
    }};
    ($event:expr) => {
        $crate::count_entry!(__RINGBUF, $event);
    };
}

/// A single [`Ringbuf`] entry.
///
/// `line` is the source line that recorded the entry, `generation` is bumped
/// each time the slot is reused, and `count` is the number of consecutive
/// identical records folded into this entry.
#[derive(Debug, Copy, Clone)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u32,
    pub payload: T,
}

/// A ring buffer of parametrized type and size. See [`ringbuf!`].
#[derive(Debug)]
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    pub last: Option<usize>,
    pub buffer: [RingbufEntry<T>; N],
}

/// A countable ringbuf event.
///
/// This trait should be derived for an `enum` with `#[derive(Count)]`.
pub trait Count {
    /// One counter per (non-skipped) variant.
    type Counters;

    /// Initializer for a new set of counters, all zero.
    const NEW_COUNTERS: Self::Counters;

    /// Increment the counter for this event.
    ///
    /// The increment is a load followed by a store, so that targets without
    /// atomic read-modify-write (Cortex-M0+) are supported; callers must hold
    /// a critical section, as [`count_entry!`] does.
    fn count(&self, counters: &Self::Counters);
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, N> {
    pub fn entry(&mut self, line: u16, payload: T) {
        // On the first insertion `last` is None; treating it as an
        // out-of-range index means slot 0 is used and nothing is merged.
        let last = self.last.unwrap_or(usize::MAX);

        if let Some(ent) = self.buffer.get_mut(last) {
            if ent.line == line && ent.payload == payload {
                if let Some(new_count) = ent.count.checked_add(1) {
                    ent.count = new_count;
                    return;
                }
            }
        }

        // No hardware divide on Cortex-M0+, so wrap by comparison rather
        // than by remainder. usize::MAX wraps to 0 here as well.
        let ndx = {
            let last_plus_1 = last.wrapping_add(1);
            if last_plus_1 >= self.buffer.len() {
                0
            } else {
                last_plus_1
            }
        };

        let ent = &mut self.buffer[ndx];
        *ent = RingbufEntry {
            line,
            payload,
            count: 1,
            generation: ent.generation.wrapping_add(1),
        };

        self.last = Some(ndx);
    }

    /// Returns the most recently recorded entry, if any.
    pub fn last_entry(&self) -> Option<&RingbufEntry<T>> {
        self.last.and_then(|ndx| self.buffer.get(ndx))
    }

    /// Iterates over recorded entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &RingbufEntry<T>> + '_ {
        let start = match self.last {
            Some(last) => last.wrapping_add(1),
            None => self.buffer.len(),
        };
        let (newer, older) = self.buffer.split_at(start.min(N));
        older
            .iter()
            .chain(newer.iter())
            .filter(|ent| ent.generation != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Ringbuf<u32, 4> {
        Ringbuf {
            last: None,
            buffer: [RingbufEntry {
                line: 0,
                generation: 0,
                count: 0,
                payload: 0,
            }; 4],
        }
    }

    #[test]
    fn first_entry_lands_in_slot_zero() {
        let mut rb = fresh();
        rb.entry(10, 7);

        assert_eq!(rb.last, Some(0));
        let ent = rb.last_entry().unwrap();
        assert_eq!(ent.payload, 7);
        assert_eq!(ent.count, 1);
        assert_eq!(ent.generation, 1);
    }

    #[test]
    fn repeated_entry_is_folded() {
        let mut rb = fresh();
        rb.entry(10, 7);
        rb.entry(10, 7);
        rb.entry(10, 7);

        assert_eq!(rb.last, Some(0));
        assert_eq!(rb.last_entry().unwrap().count, 3);
    }

    #[test]
    fn same_payload_other_line_is_not_folded() {
        let mut rb = fresh();
        rb.entry(10, 7);
        rb.entry(11, 7);

        assert_eq!(rb.last, Some(1));
        assert_eq!(rb.buffer[0].count, 1);
        assert_eq!(rb.buffer[1].count, 1);
    }

    #[test]
    fn wraps_and_bumps_generation() {
        let mut rb = fresh();
        for i in 0..6 {
            rb.entry(10, i);
        }

        assert_eq!(rb.last, Some(1));
        assert_eq!(rb.buffer[0].payload, 4);
        assert_eq!(rb.buffer[0].generation, 2);
        assert_eq!(rb.buffer[2].generation, 1);
        let order: Vec<u32> = rb.iter().map(|e| e.payload).collect();
        assert_eq!(order, [2, 3, 4, 5]);
    }

    #[test]
    fn iter_survives_out_of_range_last() {
        let mut rb = fresh();
        rb.buffer[2] = RingbufEntry {
            line: 1,
            generation: 1,
            count: 1,
            payload: 5,
        };
        rb.last = Some(usize::MAX);

        let order: Vec<u32> = rb.iter().map(|e| e.payload).collect();
        assert_eq!(order, [5]);
    }

    #[test]
    fn iter_skips_unused_slots() {
        let mut rb = fresh();
        rb.entry(1, 9);
        rb.entry(2, 8);

        let order: Vec<u32> = rb.iter().map(|e| e.payload).collect();
        assert_eq!(order, [9, 8]);
    }

    #[test]
    fn corrupted_last_restarts_at_zero() {
        let mut rb = fresh();
        rb.last = Some(99);
        rb.entry(3, 5);

        assert_eq!(rb.last, Some(0));
    }

    ringbuf!(TEST_RINGBUF, u32, 8, 0);

    #[test]
    fn static_buffer_records_through_macro() {
        ringbuf_entry!(TEST_RINGBUF, 0xdead);
        let payload =
            TEST_RINGBUF.with(|rb| rb.last_entry().map(|e| e.payload));
        assert_eq!(payload, Some(0xdead));
    }
}
