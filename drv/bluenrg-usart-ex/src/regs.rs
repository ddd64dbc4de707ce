// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! USART register map.
//!
//! Only the registers and fields this driver touches are named.

use drv_bluenrg_hal_api::{Field, Registers};
use static_assertions::const_assert_eq;
use vcell::VolatileCell;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UsartReg {
    Cr1,
    Cr2,
    Cr3,
    Brr,
    /// Interrupt and status register (read-only).
    Isr,
    /// Interrupt flag clear register (write-only).
    Icr,
    /// Receive data register; reading pops the RX FIFO.
    Rdr,
}

pub mod cr1 {
    use super::Field;

    pub const UE: u32 = 1 << 0;
    pub const RE: u32 = 1 << 2;
    pub const TE: u32 = 1 << 3;
    pub const IDLEIE: u32 = 1 << 4;
    pub const RXNEIE: u32 = 1 << 5;
    pub const PEIE: u32 = 1 << 8;
    pub const PS: u32 = 1 << 9;
    pub const PCE: u32 = 1 << 10;
    pub const M0: u32 = 1 << 12;
    pub const OVER8: u32 = 1 << 15;
    /// Driver enable de-assertion time, in sample time units.
    pub const DEDT: Field = Field::new(16, 5);
    /// Driver enable assertion time, in sample time units.
    pub const DEAT: Field = Field::new(21, 5);
    pub const M1: u32 = 1 << 28;
    pub const FIFOEN: u32 = 1 << 29;
    pub const TXFEIE: u32 = 1 << 30;
    pub const RXFFIE: u32 = 1 << 31;
}

pub mod cr2 {
    use super::Field;

    /// 7-bit (rather than 4-bit) address detection.
    pub const ADDM7: u32 = 1 << 4;
    pub const CLKEN: u32 = 1 << 11;
    pub const STOP: Field = Field::new(12, 2);
    pub const LINEN: u32 = 1 << 14;
}

pub mod cr3 {
    use super::Field;

    pub const EIE: u32 = 1 << 0;
    pub const IREN: u32 = 1 << 1;
    pub const HDSEL: u32 = 1 << 3;
    pub const SCEN: u32 = 1 << 5;
    pub const DMAR: u32 = 1 << 6;
    pub const RTSE: u32 = 1 << 8;
    pub const CTSE: u32 = 1 << 9;
    /// Driver enable mode.
    pub const DEM: u32 = 1 << 14;
    /// Driver enable polarity; set for active low.
    pub const DEP: u32 = 1 << 15;
    pub const RXFTCFG: Field = Field::new(25, 3);
    pub const TXFTCFG: Field = Field::new(29, 3);
}

pub mod isr {
    pub const PE: u32 = 1 << 0;
    pub const FE: u32 = 1 << 1;
    pub const NE: u32 = 1 << 2;
    pub const ORE: u32 = 1 << 3;
    pub const IDLE: u32 = 1 << 4;
    pub const RXNE: u32 = 1 << 5;
    pub const TEACK: u32 = 1 << 21;
    pub const REACK: u32 = 1 << 22;
    pub const TXFE: u32 = 1 << 23;
    pub const RXFF: u32 = 1 << 24;
}

pub mod icr {
    pub const PECF: u32 = 1 << 0;
    pub const FECF: u32 = 1 << 1;
    pub const NECF: u32 = 1 << 2;
    pub const ORECF: u32 = 1 << 3;
    pub const IDLECF: u32 = 1 << 4;
}

/// Smallest usable BRR value at 16x oversampling.
pub const BRR_MIN: u32 = 0x10;
pub const BRR_MAX: u32 = 0xFFFF;

/// The memory-mapped register block.
#[repr(C)]
pub struct RegisterBlock {
    pub cr1: VolatileCell<u32>,
    pub cr2: VolatileCell<u32>,
    pub cr3: VolatileCell<u32>,
    pub brr: VolatileCell<u32>,
    pub gtpr: VolatileCell<u32>,
    pub rtor: VolatileCell<u32>,
    pub rqr: VolatileCell<u32>,
    pub isr: VolatileCell<u32>,
    pub icr: VolatileCell<u32>,
    pub rdr: VolatileCell<u32>,
    /// Transmit data. There is no transmit path, so only the layout uses
    /// it.
    pub tdr: VolatileCell<u32>,
    pub presc: VolatileCell<u32>,
}

const_assert_eq!(core::mem::offset_of!(RegisterBlock, brr), 0x0C);
const_assert_eq!(core::mem::offset_of!(RegisterBlock, isr), 0x1C);
const_assert_eq!(core::mem::offset_of!(RegisterBlock, icr), 0x20);
const_assert_eq!(core::mem::offset_of!(RegisterBlock, rdr), 0x24);
const_assert_eq!(core::mem::offset_of!(RegisterBlock, tdr), 0x28);

impl RegisterBlock {
    /// Borrows the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a USART register block and the caller
    /// must be the only one driving that USART.
    pub unsafe fn from_addr(base: usize) -> &'static Self {
        &*(base as *const Self)
    }
}

impl Registers for RegisterBlock {
    type Reg = UsartReg;

    fn read(&self, reg: UsartReg) -> u32 {
        match reg {
            UsartReg::Cr1 => self.cr1.get(),
            UsartReg::Cr2 => self.cr2.get(),
            UsartReg::Cr3 => self.cr3.get(),
            UsartReg::Brr => self.brr.get(),
            UsartReg::Isr => self.isr.get(),
            UsartReg::Icr => 0,
            UsartReg::Rdr => self.rdr.get(),
        }
    }

    fn write(&self, reg: UsartReg, value: u32) {
        match reg {
            UsartReg::Cr1 => self.cr1.set(value),
            UsartReg::Cr2 => self.cr2.set(value),
            UsartReg::Cr3 => self.cr3.set(value),
            UsartReg::Brr => self.brr.set(value),
            UsartReg::Icr => self.icr.set(value),
            UsartReg::Isr | UsartReg::Rdr => (),
        }
    }
}
