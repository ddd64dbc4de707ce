// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common vocabulary for the BlueNRG-LP peripheral drivers.
//!
//! Each driver owns a handle for one peripheral instance. The handle is
//! generic over three things supplied by the board:
//!
//! - a [`Registers`] implementation, which is the memory-mapped register
//!   block on real hardware and a fake in host tests;
//! - a [`Ticks`] source, the platform's monotonic millisecond counter, used
//!   to bound every polling loop;
//! - an [`Msp`] implementation, the board-support hooks that turn on clocks
//!   and route pins when a peripheral is initialized.

#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "fakes"))]
pub mod fakes;

use num_derive::FromPrimitive;

/// Errors returned by driver operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive, ringbuf::Count)]
#[repr(u32)]
pub enum HalError {
    /// No handle was supplied; see [`with_handle`].
    NullHandle = 1,
    /// The handle is locked by an operation in progress, or the requested
    /// transfer is already running.
    Busy = 2,
    /// The handle is not in a state that permits the operation.
    InvalidState = 3,
    /// The hardware did not signal completion in time.
    Timeout = 4,
    /// An argument was unusable (e.g. an empty buffer).
    BadArg = 5,
}

impl From<HalError> for u32 {
    fn from(e: HalError) -> Self {
        e as u32
    }
}

/// Lifecycle state of a peripheral handle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum State {
    /// Not yet initialized, or deinitialized.
    #[default]
    Reset,
    /// Initialized and idle.
    Ready,
    /// An operation is in progress.
    Busy,
}

/// Re-entrancy guard for a handle.
///
/// Acquiring a held lock fails immediately; nothing ever waits on it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Lock {
    #[default]
    Unlocked,
    Locked,
}

impl Lock {
    pub fn acquire(&mut self) -> Result<(), HalError> {
        match self {
            Lock::Locked => Err(HalError::Busy),
            Lock::Unlocked => {
                *self = Lock::Locked;
                Ok(())
            }
        }
    }

    pub fn release(&mut self) {
        *self = Lock::Unlocked;
    }

    pub fn is_locked(&self) -> bool {
        *self == Lock::Locked
    }
}

/// Peripherals whose bring-up is delegated to board support.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Peripheral {
    Rng,
    Usart,
}

/// Board-support hooks run by a driver's `init` and `deinit`.
///
/// `init` is where a board enables the peripheral's bus clock and configures
/// any pins it uses; `deinit` undoes that. Both default to doing nothing.
pub trait Msp {
    fn init(&mut self, _peripheral: Peripheral) {}
    fn deinit(&mut self, _peripheral: Peripheral) {}
}

/// [`Msp`] for boards that need no per-peripheral setup.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoMsp;

impl Msp for NoMsp {}

/// A monotonic millisecond counter.
///
/// The counter is allowed to wrap; elapsed time is always computed with a
/// wrapping subtraction.
pub trait Ticks {
    fn now(&self) -> u32;

    /// Ticks elapsed since `start`.
    fn since(&self, start: u32) -> u32 {
        self.now().wrapping_sub(start)
    }
}

impl<F: Fn() -> u32> Ticks for F {
    fn now(&self) -> u32 {
        self()
    }
}

/// Word-wide access to one peripheral's register block.
pub trait Registers {
    /// Names the registers of the block.
    type Reg: Copy;

    fn read(&self, reg: Self::Reg) -> u32;

    fn write(&self, reg: Self::Reg, value: u32);

    /// Read-modify-write of a single register.
    fn modify(&self, reg: Self::Reg, f: impl FnOnce(u32) -> u32) {
        let v = self.read(reg);
        self.write(reg, f(v));
    }

    fn set_bits(&self, reg: Self::Reg, bits: u32) {
        self.modify(reg, |v| v | bits);
    }

    fn clear_bits(&self, reg: Self::Reg, bits: u32) {
        self.modify(reg, |v| v & !bits);
    }

    fn is_set(&self, reg: Self::Reg, bits: u32) -> bool {
        self.read(reg) & bits == bits
    }
}

impl<T: Registers + ?Sized> Registers for &T {
    type Reg = T::Reg;

    fn read(&self, reg: Self::Reg) -> u32 {
        (**self).read(reg)
    }

    fn write(&self, reg: Self::Reg, value: u32) {
        (**self).write(reg, value)
    }
}

/// A multi-bit field within a 32-bit register.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Field {
    pub shift: u32,
    pub width: u32,
}

impl Field {
    /// Panics, at compile time in a `const`, unless the field is at least
    /// one bit wide and fits in the word.
    pub const fn new(shift: u32, width: u32) -> Self {
        assert!(width != 0 && shift < 32 && width <= 32 - shift);
        Self { shift, width }
    }

    /// The field's bits, in place.
    pub const fn mask(&self) -> u32 {
        (u32::MAX >> (32 - self.width)) << self.shift
    }

    pub const fn get(&self, word: u32) -> u32 {
        (word & self.mask()) >> self.shift
    }

    /// Returns `word` with the field replaced by `value`. Bits of `value`
    /// that don't fit the field are dropped.
    pub const fn set(&self, word: u32, value: u32) -> u32 {
        (word & !self.mask()) | ((value << self.shift) & self.mask())
    }
}

/// Spins until `done` returns `true`, or fails with [`HalError::Timeout`]
/// once more than `timeout` ticks have elapsed.
///
/// `done` is always evaluated at least once, and is evaluated again after
/// the final tick check, so a condition that becomes true right at the
/// deadline is not reported as a timeout.
pub fn wait_until(
    ticks: &impl Ticks,
    timeout: u32,
    mut done: impl FnMut() -> bool,
) -> Result<(), HalError> {
    let start = ticks.now();
    loop {
        if done() {
            return Ok(());
        }
        if ticks.since(start) > timeout {
            return if done() { Ok(()) } else { Err(HalError::Timeout) };
        }
    }
}

/// Runs `body` against `handle`, or fails with [`HalError::NullHandle`] if
/// there is none.
///
/// Handles that live in a `static Option<_>` (set up during boot, say) can
/// be driven through this without unwrapping.
pub fn with_handle<H, R>(
    handle: Option<&mut H>,
    body: impl FnOnce(&mut H) -> Result<R, HalError>,
) -> Result<R, HalError> {
    match handle {
        Some(h) => body(h),
        None => Err(HalError::NullHandle),
    }
}
