// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver for the BlueNRG-LP true random number generator.
//!
//! The usual sequence is:
//!
//! 1. Build an [`Rng`] around the register block, the system tick counter
//!    and the board's [`Msp`] hooks (which should enable the RNG clock).
//! 2. [`Rng::init`] it with a sampling clock divider.
//! 3. Call [`Rng::generate_random_number`] for each 32-bit word.
//!
//! Generation polls `SR.DRDY` for at most [`RNG_TIMEOUT_TICKS`] ticks. A
//! timeout is recorded in [`Rng::error`] and the handle stays usable; the
//! caller decides whether to retry.

#![cfg_attr(not(test), no_std)]

pub mod regs;

use bitflags::bitflags;
use drv_bluenrg_hal_api::{
    wait_until, HalError, Lock, Msp, NoMsp, Peripheral, Registers, State,
    Ticks,
};
use num_derive::FromPrimitive;
use ringbuf::{count_entry, counted_ringbuf, ringbuf_entry};

use self::regs::{cr, sr, RngReg};

/// Ticks to wait for `SR.DRDY` before giving up on a word.
pub const RNG_TIMEOUT_TICKS: u32 = 2;

/// Ticks to wait for a new `CR.CLKDIV` value to stick.
pub const DIVIDER_SYNC_TIMEOUT: u32 = 2;

/// Sampling clock division applied to the RNG kernel clock.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[repr(u32)]
pub enum SamplingClockDivider {
    #[default]
    By1 = 0,
    By2,
    By4,
    By8,
    By16,
    By32,
    By64,
    By128,
    By256,
    By512,
    By1024,
    By2048,
    By4096,
    By8192,
    By16384,
    By32768,
}

impl SamplingClockDivider {
    /// Decodes a `CR.CLKDIV` field value.
    pub fn from_bits(bits: u32) -> Option<Self> {
        num_traits::FromPrimitive::from_u32(bits)
    }

    pub fn bits(self) -> u32 {
        self as u32
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct RngConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub sampling_clock_divider: SamplingClockDivider,
}

bitflags! {
    /// Sticky record of errors seen since the last `init`.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct RngErrorCode: u32 {
        /// `SR.DRDY` did not come up in time.
        const TIMEOUT = 1 << 1;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ringbuf::Count)]
enum Trace {
    #[count(skip)]
    None,
    Init(SamplingClockDivider),
    DividerRewrite(u32),
    DividerTimeout,
    Enabled,
    NotReady(State),
    Locked,
    Timeout,
    Generated,
    DeInit,
}

counted_ringbuf!(Trace, 16, Trace::None);

/// Handle for the RNG peripheral.
pub struct Rng<R, T, M = NoMsp> {
    regs: R,
    ticks: T,
    msp: M,
    config: RngConfig,
    state: State,
    error: RngErrorCode,
    lock: Lock,
    random_number: u32,
}

impl<R, T, M> Rng<R, T, M>
where
    R: Registers<Reg = RngReg>,
    T: Ticks,
    M: Msp,
{
    /// Creates a handle in the `Reset` state. Nothing touches the hardware
    /// until [`Rng::init`].
    pub fn new(regs: R, ticks: T, msp: M) -> Self {
        Self {
            regs,
            ticks,
            msp,
            config: RngConfig::default(),
            state: State::Reset,
            error: RngErrorCode::empty(),
            lock: Lock::Unlocked,
            random_number: 0,
        }
    }

    /// Programs the sampling clock divider and enables the generator.
    ///
    /// The first `init` after construction or [`Rng::deinit`] runs the MSP
    /// init hook. If the divider never reads back as written within
    /// [`DIVIDER_SYNC_TIMEOUT`] ticks, the generator is disabled, the MSP
    /// deinit hook runs and the handle goes back to `Reset` with a timeout
    /// in its error code. `HalError::Timeout` is returned.
    pub fn init(&mut self, config: RngConfig) -> Result<(), HalError> {
        if self.state == State::Reset {
            self.lock.release();
            self.msp.init(Peripheral::Rng);
        }

        self.state = State::Busy;
        self.config = config;
        count_entry!(Trace::Init(config.sampling_clock_divider));

        // A divider write made while an earlier one is still being
        // resynchronized is silently dropped, so keep writing until the
        // value we want is the value we read.
        let want = config.sampling_clock_divider.bits();
        let regs = &self.regs;
        let synced = wait_until(&self.ticks, DIVIDER_SYNC_TIMEOUT, || {
            let cr = regs.read(RngReg::Cr);
            let have = cr::CLKDIV.get(cr);
            if have == want {
                true
            } else {
                ringbuf_entry!(Trace::DividerRewrite(have));
                regs.write(RngReg::Cr, cr::CLKDIV.set(cr, want));
                false
            }
        });
        if let Err(e) = synced {
            count_entry!(Trace::DividerTimeout);
            // A re-init may find the generator running; `Reset` means off.
            self.regs.clear_bits(RngReg::Cr, cr::RNGEN);
            self.msp.deinit(Peripheral::Rng);
            self.state = State::Reset;
            self.error |= RngErrorCode::TIMEOUT;
            return Err(e);
        }

        self.regs.set_bits(RngReg::Cr, cr::RNGEN);
        ringbuf_entry!(Trace::Enabled);

        self.state = State::Ready;
        self.error = RngErrorCode::empty();
        Ok(())
    }

    /// Disables the generator, runs the MSP deinit hook and returns the
    /// handle to `Reset`.
    pub fn deinit(&mut self) -> Result<(), HalError> {
        self.msp.deinit(Peripheral::Rng);
        self.regs.clear_bits(RngReg::Cr, cr::RNGEN);
        count_entry!(Trace::DeInit);

        self.state = State::Reset;
        self.error = RngErrorCode::empty();
        self.lock.release();
        Ok(())
    }

    /// Waits for and returns the next 32-bit random word.
    ///
    /// Fails with `Busy` if the handle is locked, with `InvalidState` unless
    /// the handle is `Ready`, and with `Timeout` if no word arrives within
    /// [`RNG_TIMEOUT_TICKS`]. In every case the handle is left `Ready` (or
    /// in whatever non-busy state it was in), never `Busy`.
    pub fn generate_random_number(&mut self) -> Result<u32, HalError> {
        if let Err(e) = self.lock.acquire() {
            count_entry!(Trace::Locked);
            return Err(e);
        }
        let r = self.generate_locked();
        self.lock.release();
        r
    }

    fn generate_locked(&mut self) -> Result<u32, HalError> {
        if self.state != State::Ready {
            count_entry!(Trace::NotReady(self.state));
            return Err(HalError::InvalidState);
        }
        self.state = State::Busy;

        let regs = &self.regs;
        let ready = wait_until(&self.ticks, RNG_TIMEOUT_TICKS, || {
            regs.is_set(RngReg::Sr, sr::DRDY)
        });
        if let Err(e) = ready {
            count_entry!(Trace::Timeout);
            self.state = State::Ready;
            self.error |= RngErrorCode::TIMEOUT;
            return Err(e);
        }

        // Exactly one read: it consumes the word and clears DRDY.
        self.random_number = self.regs.read(RngReg::Dr);
        self.state = State::Ready;
        count_entry!(Trace::Generated);
        Ok(self.random_number)
    }

    /// Fills `dest` with random bytes, one generated word per four bytes
    /// (little-endian, the last word truncated). Stops at the first error;
    /// bytes before that point have already been written.
    pub fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), HalError> {
        for chunk in dest.chunks_mut(4) {
            let word = self.generate_random_number()?.to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
        Ok(())
    }

    /// The last word returned by [`Rng::generate_random_number`].
    pub fn read_last_random_number(&self) -> u32 {
        self.random_number
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn error(&self) -> RngErrorCode {
        self.error
    }

    pub fn config(&self) -> RngConfig {
        self.config
    }
}
