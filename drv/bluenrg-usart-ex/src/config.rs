// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed configuration for the USART.
//!
//! Every value here is valid by construction; nothing downstream checks
//! ranges again.

use core::fmt;

use num_derive::FromPrimitive;

use crate::regs::{cr1, cr3, BRR_MAX, BRR_MIN};

/// Frame data length, parity bit included.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum WordLength {
    Seven,
    #[default]
    Eight,
    Nine,
}

impl WordLength {
    /// `CR1.M1`/`CR1.M0` for this length.
    pub fn cr1_bits(self) -> u32 {
        match self {
            WordLength::Seven => cr1::M1,
            WordLength::Eight => 0,
            WordLength::Nine => cr1::M0,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

impl Parity {
    /// `CR1.PCE`/`CR1.PS` for this parity.
    pub fn cr1_bits(self) -> u32 {
        match self {
            Parity::None => 0,
            Parity::Even => cr1::PCE,
            Parity::Odd => cr1::PCE | cr1::PS,
        }
    }
}

/// Stop bits, discriminants being the `CR2.STOP` encoding.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[repr(u32)]
pub enum StopBits {
    #[default]
    One = 0b00,
    Half = 0b01,
    Two = 0b10,
    OneAndHalf = 0b11,
}

/// Width of the node address matched in multiprocessor mode.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum AddressLength {
    #[default]
    FourBit,
    SevenBit,
}

/// FIFO fill level that raises the threshold flag, discriminants being the
/// `CR3.TXFTCFG`/`CR3.RXFTCFG` encoding.
///
/// For the transmit FIFO the level counts free entries, so `EightEighths`
/// there means "the FIFO is empty".
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[repr(u32)]
pub enum FifoThreshold {
    #[default]
    OneEighth = 0b000,
    OneQuarter = 0b001,
    Half = 0b010,
    ThreeQuarters = 0b011,
    SevenEighths = 0b100,
    EightEighths = 0b101,
}

impl FifoThreshold {
    pub fn from_bits(bits: u32) -> Option<Self> {
        num_traits::FromPrimitive::from_u32(bits)
    }

    pub fn bits(self) -> u32 {
        self as u32
    }

    /// The threshold as a `(numerator, denominator)` fraction of the FIFO
    /// depth.
    pub fn fraction(self) -> (u16, u16) {
        match self {
            FifoThreshold::OneEighth => (1, 8),
            FifoThreshold::OneQuarter => (1, 4),
            FifoThreshold::Half => (1, 2),
            FifoThreshold::ThreeQuarters => (3, 4),
            FifoThreshold::SevenEighths => (7, 8),
            FifoThreshold::EightEighths => (1, 1),
        }
    }

    /// Entries moved per interrupt with a FIFO of `depth` entries.
    pub fn data_to_process(self, depth: u16) -> u16 {
        let (num, den) = self.fraction();
        depth * num / den
    }
}

/// Level of the RS-485 driver enable output while transmitting.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DePolarity {
    #[default]
    ActiveHigh,
    ActiveLow,
}

impl DePolarity {
    pub fn cr3_bits(self) -> u32 {
        match self {
            DePolarity::ActiveHigh => 0,
            DePolarity::ActiveLow => cr3::DEP,
        }
    }
}

/// A driver enable assertion or de-assertion time, in sample time units
/// (1/16 of a bit at 16x oversampling). Fits the 5-bit `CR1.DEAT` and
/// `CR1.DEDT` fields.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8"))]
pub struct DeTime(u8);

impl DeTime {
    pub const MAX: u8 = 31;

    pub const fn new(units: u8) -> Option<Self> {
        if units <= Self::MAX {
            Some(Self(units))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

/// A [`DeTime`] outside `0..=31`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeTimeOutOfRange(pub u8);

impl fmt::Display for DeTimeOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "driver enable time {} exceeds {} sample times",
            self.0,
            DeTime::MAX
        )
    }
}

impl TryFrom<u8> for DeTime {
    type Error = DeTimeOutOfRange;

    fn try_from(units: u8) -> Result<Self, Self::Error> {
        Self::new(units).ok_or(DeTimeOutOfRange(units))
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Rs485Config {
    pub polarity: DePolarity,
    /// Time between DE rising and the start bit.
    pub assertion_time: DeTime,
    /// Time between the end of the last stop bit and DE falling.
    pub deassertion_time: DeTime,
}

/// Frame format and speed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct UartConfig {
    pub baud_rate: u32,
    /// USART kernel clock.
    pub clock_hz: u32,
    pub word_length: WordLength,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// RTS/CTS handshaking.
    pub hardware_flow_control: bool,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            clock_hz: 16_000_000,
            word_length: WordLength::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            hardware_flow_control: false,
        }
    }
}

impl UartConfig {
    /// `BRR` at 16x oversampling, rounded to nearest, or `None` if the
    /// divisor is out of the register's range.
    pub fn brr(&self) -> Option<u32> {
        if self.baud_rate == 0 {
            return None;
        }
        let div = (u64::from(self.clock_hz) + u64::from(self.baud_rate / 2))
            / u64::from(self.baud_rate);
        u32::try_from(div)
            .ok()
            .filter(|d| (BRR_MIN..=BRR_MAX).contains(d))
    }
}

/// Bits of `RDR` that carry data for a given frame format. The parity bit,
/// when there is one, takes the top bit of the word.
pub fn rx_data_mask(word_length: WordLength, parity: Parity) -> u16 {
    let with_parity = parity != Parity::None;
    match (word_length, with_parity) {
        (WordLength::Nine, false) => 0x1FF,
        (WordLength::Nine, true) => 0xFF,
        (WordLength::Eight, false) => 0xFF,
        (WordLength::Eight, true) => 0x7F,
        (WordLength::Seven, false) => 0x7F,
        (WordLength::Seven, true) => 0x3F,
    }
}
