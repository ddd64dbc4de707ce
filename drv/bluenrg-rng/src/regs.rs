// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RNG register map.

use drv_bluenrg_hal_api::{Field, Registers};
use static_assertions::const_assert_eq;
use vcell::VolatileCell;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RngReg {
    /// Control register.
    Cr,
    /// Status register.
    Sr,
    /// Data register. Reading it consumes the current word and clears
    /// `SR.DRDY`.
    Dr,
}

pub mod cr {
    use super::Field;

    /// Peripheral enable.
    pub const RNGEN: u32 = 1 << 2;
    /// Sampling clock divider, `2^CLKDIV`. Writes are resynchronized into
    /// the RNG core clock domain, and a write that lands during a previous
    /// resynchronization is dropped.
    pub const CLKDIV: Field = Field::new(16, 4);
}

pub mod sr {
    /// A random word is ready in `DR`.
    pub const DRDY: u32 = 1 << 0;
}

/// The memory-mapped register block.
#[repr(C)]
pub struct RegisterBlock {
    pub cr: VolatileCell<u32>,
    pub sr: VolatileCell<u32>,
    pub dr: VolatileCell<u32>,
}

const_assert_eq!(core::mem::offset_of!(RegisterBlock, cr), 0x00);
const_assert_eq!(core::mem::offset_of!(RegisterBlock, sr), 0x04);
const_assert_eq!(core::mem::offset_of!(RegisterBlock, dr), 0x08);

impl RegisterBlock {
    /// Borrows the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of the RNG register block (as given by the
    /// device's PAC or reference manual), and nothing else may be driving
    /// the peripheral for as long as the reference is held.
    pub unsafe fn from_addr(base: usize) -> &'static Self {
        &*(base as *const Self)
    }
}

impl Registers for RegisterBlock {
    type Reg = RngReg;

    fn read(&self, reg: RngReg) -> u32 {
        match reg {
            RngReg::Cr => self.cr.get(),
            RngReg::Sr => self.sr.get(),
            RngReg::Dr => self.dr.get(),
        }
    }

    fn write(&self, reg: RngReg, value: u32) {
        match reg {
            RngReg::Cr => self.cr.set(value),
            RngReg::Sr => self.sr.set(value),
            // Read-only.
            RngReg::Dr => (),
        }
    }
}
