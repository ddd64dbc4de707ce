// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BlueNRG-LP USART driver: the base handle plus the extended features.
//!
//! The base part is what the extensions lean on: bring-up ([`Uart::init`]),
//! teardown and the handle's state. The extensions are
//!
//! - frame word length and multiprocessor address length;
//! - the 8-entry TX/RX FIFOs and their interrupt thresholds;
//! - RS-485 driver enable (DE) control;
//! - receive-to-idle, where a reception ends either when the buffer is full
//!   or when the line goes idle after at least one byte, in blocking,
//!   interrupt-driven and DMA flavors.
//!
//! Interrupt and DMA completions are reported through [`UartEvents`]; the
//! board's USART and DMA interrupt handlers call [`Uart::handle_interrupt`]
//! and [`Uart::handle_dma_complete`].

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod regs;


use bitflags::bitflags;
use drv_bluenrg_hal_api::{
    wait_until, Field, HalError, Lock, Msp, NoMsp, Peripheral, Registers,
    State, Ticks,
};
use ringbuf::{count_entry, counted_ringbuf, ringbuf_entry};

pub use self::config::{
    rx_data_mask, AddressLength, DePolarity, DeTime, DeTimeOutOfRange,
    FifoThreshold, Parity, Rs485Config, StopBits, UartConfig, WordLength,
};
use self::regs::{cr1, cr2, cr3, icr, isr, UsartReg};

/// Ticks to wait for `ISR.TEACK`/`ISR.REACK` after enabling the USART.
pub const UART_ENABLE_TIMEOUT: u32 = 0x1FF_FFFF;

/// Entries in each of the TX and RX FIFOs.
pub const FIFO_DEPTH: u16 = 8;

bitflags! {
    /// Sticky record of receive errors.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct UartErrorCode: u32 {
        const PARITY = 1 << 0;
        const NOISE = 1 << 1;
        const FRAMING = 1 << 2;
        const OVERRUN = 1 << 3;
        /// The DMA channel reported a transfer error.
        const DMA = 1 << 4;
    }
}

/// Receive-side state, tracked apart from the handle's [`State`] so that a
/// reception can run while the transmitter is in use.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum RxState {
    #[default]
    Reset,
    Ready,
    /// A reception is in progress.
    Busy,
}

/// Completion callbacks, run from [`Uart::handle_interrupt`] and the DMA
/// hooks. All of them default to doing nothing.
pub trait UartEvents {
    /// A receive-to-idle reception finished with `len` bytes in the buffer.
    fn rx_event(&mut self, _len: usize) {}

    fn rx_fifo_full(&mut self) {}

    fn tx_fifo_empty(&mut self) {}

    /// Receive errors were flagged. Overruns end the reception; the others
    /// are reported and the reception carries on.
    fn error(&mut self, _code: UartErrorCode) {}
}

/// [`UartEvents`] that ignores everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoEvents;

impl UartEvents for NoEvents {}

/// A DMA channel wired to this USART's receive request.
///
/// The board configures the channel's source (`RDR`) and request routing;
/// the driver only says where to put the data and when to stop.
pub trait RxDma {
    /// Arms the channel to move up to `len` bytes into `dst`.
    fn start(&mut self, dst: *mut u8, len: usize);

    /// Bytes the channel has yet to move.
    fn remaining(&self) -> usize;

    fn stop(&mut self);
}

enum RxTransfer<'buf> {
    Interrupt {
        buf: &'buf mut [u8],
        received: usize,
    },
    Dma {
        len: usize,
        dma: &'buf mut dyn RxDma,
        // Held so nobody else touches the buffer while the channel writes.
        _buf: &'buf mut [u8],
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ringbuf::Count)]
enum Trace {
    #[count(skip)]
    None,
    Init { brr: u32 },
    BadBaud(u32),
    EnableTimeout { isr: u32 },
    DeInit,
    Locked,
    NotInitialized,
    WordLength(WordLength),
    AddressLength(AddressLength),
    FifoMode(bool),
    TxThreshold(FifoThreshold),
    RxThreshold(FifoThreshold),
    Rs485 { dea: u8, ded: u8 },
    RxRefused(#[count(children)] HalError),
    RxArmed(usize),
    RxTimeout(usize),
    RxDone(usize),
    RxError(UartErrorCode),
    RxAborted,
    RxFifoFull,
    TxFifoEmpty,
}

counted_ringbuf!(Trace, 32, Trace::None);

/// Handle for one USART instance.
///
/// `'buf` is the lifetime of the buffers lent to interrupt and DMA
/// receptions; the handle keeps them borrowed until the reception ends.
pub struct Uart<'buf, R, T, M = NoMsp, E = NoEvents> {
    regs: R,
    ticks: T,
    msp: M,
    events: E,
    config: UartConfig,
    g_state: State,
    rx_state: RxState,
    lock: Lock,
    error: UartErrorCode,
    fifo_mode: bool,
    nb_tx_data_to_process: u16,
    nb_rx_data_to_process: u16,
    mask: u16,
    rx: Option<RxTransfer<'buf>>,
}

impl<'buf, R, T, M, E> Uart<'buf, R, T, M, E>
where
    R: Registers<Reg = UsartReg>,
    T: Ticks,
    M: Msp,
    E: UartEvents,
{
    /// Creates a handle in the `Reset` state without touching the hardware.
    pub fn new(regs: R, ticks: T, msp: M, events: E) -> Self {
        let config = UartConfig::default();
        Self {
            regs,
            ticks,
            msp,
            events,
            config,
            g_state: State::Reset,
            rx_state: RxState::Reset,
            lock: Lock::Unlocked,
            error: UartErrorCode::empty(),
            fifo_mode: false,
            nb_tx_data_to_process: 1,
            nb_rx_data_to_process: 1,
            mask: rx_data_mask(config.word_length, config.parity),
            rx: None,
        }
    }

    /// Programs the frame format and baud rate, turns the USART on and
    /// waits for the transmitter and receiver to acknowledge.
    ///
    /// Fails with `BadArg`, before touching anything, if the baud rate
    /// can't be reached from `clock_hz`.
    pub fn init(&mut self, config: UartConfig) -> Result<(), HalError> {
        self.configure(config)?;

        // Plain asynchronous mode.
        self.regs.clear_bits(UsartReg::Cr2, cr2::LINEN | cr2::CLKEN);
        self.regs
            .clear_bits(UsartReg::Cr3, cr3::SCEN | cr3::HDSEL | cr3::IREN);

        self.regs.set_bits(UsartReg::Cr1, cr1::UE);
        self.check_idle_state()
    }

    /// Like [`Uart::init`], with the DE output driven around each
    /// transmission.
    pub fn rs485_init(
        &mut self,
        config: UartConfig,
        rs485: Rs485Config,
    ) -> Result<(), HalError> {
        self.configure(config)?;

        self.regs.modify(UsartReg::Cr3, |v| {
            (v & !cr3::DEP) | cr3::DEM | rs485.polarity.cr3_bits()
        });
        let (dea, ded) =
            (rs485.assertion_time.get(), rs485.deassertion_time.get());
        self.regs.modify(UsartReg::Cr1, |v| {
            let v = cr1::DEAT.set(v, u32::from(dea));
            cr1::DEDT.set(v, u32::from(ded))
        });
        ringbuf_entry!(Trace::Rs485 { dea, ded });

        self.regs.set_bits(UsartReg::Cr1, cr1::UE);
        self.check_idle_state()
    }

    /// The part of bring-up shared by the `init` flavors: leaves the USART
    /// disabled with `config` applied.
    fn configure(&mut self, config: UartConfig) -> Result<(), HalError> {
        let Some(brr) = config.brr() else {
            count_entry!(Trace::BadBaud(config.baud_rate));
            return Err(HalError::BadArg);
        };

        if self.g_state == State::Reset {
            self.lock.release();
            self.msp.init(Peripheral::Usart);
        }
        self.g_state = State::Busy;
        self.regs.clear_bits(UsartReg::Cr1, cr1::UE);

        let frame = config.word_length.cr1_bits()
            | config.parity.cr1_bits()
            | cr1::TE
            | cr1::RE;
        self.regs.modify(UsartReg::Cr1, |v| {
            let keep = !(cr1::M1
                | cr1::M0
                | cr1::PCE
                | cr1::PS
                | cr1::TE
                | cr1::RE
                | cr1::OVER8);
            (v & keep) | frame
        });
        self.regs.modify(UsartReg::Cr2, |v| {
            cr2::STOP.set(v, config.stop_bits as u32)
        });
        let flow = if config.hardware_flow_control {
            cr3::RTSE | cr3::CTSE
        } else {
            0
        };
        self.regs.modify(UsartReg::Cr3, |v| {
            (v & !(cr3::RTSE | cr3::CTSE)) | flow
        });
        self.regs.write(UsartReg::Brr, brr);

        self.config = config;
        self.mask = rx_data_mask(config.word_length, config.parity);
        count_entry!(Trace::Init { brr });
        Ok(())
    }

    /// Waits for the enabled halves of the USART to acknowledge, then marks
    /// the handle ready and releases the lock. The lock is released on
    /// timeout too. The receiver is marked ready only if no reception is
    /// armed.
    fn check_idle_state(&mut self) -> Result<(), HalError> {
        self.error = UartErrorCode::empty();

        let cr1 = self.regs.read(UsartReg::Cr1);
        let mut want = 0;
        if cr1 & cr1::TE != 0 {
            want |= isr::TEACK;
        }
        if cr1 & cr1::RE != 0 {
            want |= isr::REACK;
        }
        let regs = &self.regs;
        let r = wait_until(&self.ticks, UART_ENABLE_TIMEOUT, || {
            regs.is_set(UsartReg::Isr, want)
        });
        if r.is_err() {
            count_entry!(Trace::EnableTimeout {
                isr: self.regs.read(UsartReg::Isr)
            });
        }

        self.g_state = State::Ready;
        // A reception armed before a reconfiguration stays armed.
        if self.rx.is_none() {
            self.rx_state = RxState::Ready;
        }
        self.lock.release();
        r
    }

    /// Turns the USART off, clears its configuration and runs the MSP
    /// deinit hook. Any reception in progress is dropped without a
    /// callback.
    pub fn deinit(&mut self) -> Result<(), HalError> {
        self.g_state = State::Busy;
        self.end_rx();

        self.regs.clear_bits(UsartReg::Cr1, cr1::UE);
        self.regs.write(UsartReg::Cr1, 0);
        self.regs.write(UsartReg::Cr2, 0);
        self.regs.write(UsartReg::Cr3, 0);
        self.msp.deinit(Peripheral::Usart);
        count_entry!(Trace::DeInit);

        self.error = UartErrorCode::empty();
        self.fifo_mode = false;
        self.nb_tx_data_to_process = 1;
        self.nb_rx_data_to_process = 1;
        self.g_state = State::Reset;
        self.rx_state = RxState::Reset;
        self.lock.release();
        Ok(())
    }

    /// Takes the lock and marks the handle busy. Fails with `Busy` if the
    /// lock is held and with `InvalidState` before `init`.
    fn begin_reconfigure(&mut self) -> Result<(), HalError> {
        if let Err(e) = self.lock.acquire() {
            count_entry!(Trace::Locked);
            return Err(e);
        }
        if self.g_state == State::Reset {
            count_entry!(Trace::NotInitialized);
            self.lock.release();
            return Err(HalError::InvalidState);
        }
        self.g_state = State::Busy;
        Ok(())
    }

    /// Runs `body` with the USART disabled. `body` gets the `CR1` value from
    /// before and returns the value to write back, which puts `UE` back the
    /// way it was unless `body` changes it.
    fn reconfigure(
        &mut self,
        body: impl FnOnce(&mut Self, u32) -> u32,
    ) -> Result<(), HalError> {
        self.begin_reconfigure()?;

        let saved = self.regs.read(UsartReg::Cr1);
        self.regs.write(UsartReg::Cr1, saved & !cr1::UE);
        let restored = body(self, saved);
        self.update_data_to_process();
        self.regs.write(UsartReg::Cr1, restored);

        self.g_state = State::Ready;
        self.lock.release();
        Ok(())
    }

    /// Changes the frame length, parity bit included.
    pub fn set_word_length(
        &mut self,
        len: WordLength,
    ) -> Result<(), HalError> {
        self.reconfigure(|uart, cr1| {
            uart.config.word_length = len;
            uart.mask = rx_data_mask(len, uart.config.parity);
            (cr1 & !(cr1::M1 | cr1::M0)) | len.cr1_bits()
        })?;
        ringbuf_entry!(Trace::WordLength(len));
        Ok(())
    }

    /// Selects 4-bit or 7-bit address matching for multiprocessor mode,
    /// then re-enables the USART and waits for it to come back.
    pub fn set_address_length(
        &mut self,
        len: AddressLength,
    ) -> Result<(), HalError> {
        self.begin_reconfigure()?;

        self.regs.clear_bits(UsartReg::Cr1, cr1::UE);
        self.regs.modify(UsartReg::Cr2, |v| match len {
            AddressLength::FourBit => v & !cr2::ADDM7,
            AddressLength::SevenBit => v | cr2::ADDM7,
        });
        ringbuf_entry!(Trace::AddressLength(len));
        self.regs.set_bits(UsartReg::Cr1, cr1::UE);

        self.check_idle_state()
    }

    pub fn enable_fifo_mode(&mut self) -> Result<(), HalError> {
        self.reconfigure(|uart, cr1| {
            uart.fifo_mode = true;
            cr1 | cr1::FIFOEN
        })?;
        ringbuf_entry!(Trace::FifoMode(true));
        Ok(())
    }

    pub fn disable_fifo_mode(&mut self) -> Result<(), HalError> {
        self.reconfigure(|uart, cr1| {
            uart.fifo_mode = false;
            cr1 & !cr1::FIFOEN
        })?;
        ringbuf_entry!(Trace::FifoMode(false));
        Ok(())
    }

    pub fn set_tx_fifo_threshold(
        &mut self,
        threshold: FifoThreshold,
    ) -> Result<(), HalError> {
        self.reconfigure(|uart, cr1| {
            uart.regs.modify(UsartReg::Cr3, |v| {
                cr3::TXFTCFG.set(v, threshold.bits())
            });
            cr1
        })?;
        ringbuf_entry!(Trace::TxThreshold(threshold));
        Ok(())
    }

    pub fn set_rx_fifo_threshold(
        &mut self,
        threshold: FifoThreshold,
    ) -> Result<(), HalError> {
        self.reconfigure(|uart, cr1| {
            uart.regs.modify(UsartReg::Cr3, |v| {
                cr3::RXFTCFG.set(v, threshold.bits())
            });
            cr1
        })?;
        ringbuf_entry!(Trace::RxThreshold(threshold));
        Ok(())
    }

    /// Recomputes how many entries each interrupt moves, from the FIFO mode
    /// and the thresholds currently in `CR3`.
    fn update_data_to_process(&mut self) {
        if !self.fifo_mode {
            self.nb_tx_data_to_process = 1;
            self.nb_rx_data_to_process = 1;
            return;
        }
        let cr3 = self.regs.read(UsartReg::Cr3);
        let per_irq = |field: Field| {
            FifoThreshold::from_bits(field.get(cr3))
                .map_or(1, |t| t.data_to_process(FIFO_DEPTH))
        };
        self.nb_tx_data_to_process = per_irq(cr3::TXFTCFG);
        self.nb_rx_data_to_process = per_irq(cr3::RXFTCFG);
    }

    /// Checks that a reception may start into `buf`.
    fn check_rx_start(&self, buf: &[u8]) -> Result<(), HalError> {
        let refused = match self.rx_state {
            RxState::Busy => Some(HalError::Busy),
            RxState::Reset => Some(HalError::InvalidState),
            // A 9-bit data word doesn't fit a byte buffer.
            RxState::Ready if buf.is_empty() || self.mask > 0xFF => {
                Some(HalError::BadArg)
            }
            RxState::Ready => None,
        };
        match refused {
            Some(e) => {
                count_entry!(Trace::RxRefused(e));
                Err(e)
            }
            None => Ok(()),
        }
    }

    fn read_data(&self) -> u8 {
        (self.regs.read(UsartReg::Rdr) & u32::from(self.mask)) as u8
    }

    /// Receives into `buf` until it is full or the line goes idle after at
    /// least one byte, polling for at most `timeout` ticks overall. Returns
    /// the number of bytes received.
    ///
    /// On `Timeout` the bytes received so far are left in `buf`.
    pub fn receive_to_idle(
        &mut self,
        buf: &mut [u8],
        timeout: u32,
    ) -> Result<usize, HalError> {
        self.check_rx_start(buf)?;
        self.error = UartErrorCode::empty();
        self.rx_state = RxState::Busy;

        let start = self.ticks.now();
        let mut received = 0;
        let r = loop {
            let status = self.regs.read(UsartReg::Isr);
            if status & isr::IDLE != 0 {
                self.regs.write(UsartReg::Icr, icr::IDLECF);
                if received > 0 {
                    break Ok(received);
                }
            }
            if status & isr::RXNE != 0 {
                buf[received] = self.read_data();
                received += 1;
                if received == buf.len() {
                    break Ok(received);
                }
            }
            if timeout == 0 || self.ticks.since(start) > timeout {
                count_entry!(Trace::RxTimeout(received));
                break Err(HalError::Timeout);
            }
        };

        if let Ok(n) = r {
            count_entry!(Trace::RxDone(n));
        }
        self.rx_state = RxState::Ready;
        r
    }

    /// Starts an interrupt-driven receive-to-idle into `buf`. Completion is
    /// reported through [`UartEvents::rx_event`].
    pub fn receive_to_idle_it(
        &mut self,
        buf: &'buf mut [u8],
    ) -> Result<(), HalError> {
        self.check_rx_start(buf)?;
        self.error = UartErrorCode::empty();
        self.rx_state = RxState::Busy;
        ringbuf_entry!(Trace::RxArmed(buf.len()));
        self.rx = Some(RxTransfer::Interrupt { buf, received: 0 });

        self.enable_rx_error_irqs();
        self.regs.write(UsartReg::Icr, icr::IDLECF);
        self.regs.set_bits(UsartReg::Cr1, cr1::RXNEIE | cr1::IDLEIE);
        Ok(())
    }

    /// Starts a DMA receive-to-idle into `buf` through `dma`. Completion is
    /// reported through [`UartEvents::rx_event`], from either
    /// [`Uart::handle_interrupt`] (idle line) or
    /// [`Uart::handle_dma_complete`] (buffer full).
    pub fn receive_to_idle_dma(
        &mut self,
        buf: &'buf mut [u8],
        dma: &'buf mut dyn RxDma,
    ) -> Result<(), HalError> {
        self.check_rx_start(buf)?;
        self.error = UartErrorCode::empty();
        self.rx_state = RxState::Busy;

        let len = buf.len();
        dma.start(buf.as_mut_ptr(), len);
        ringbuf_entry!(Trace::RxArmed(len));
        self.rx = Some(RxTransfer::Dma {
            len,
            dma,
            _buf: buf,
        });

        self.enable_rx_error_irqs();
        self.regs.set_bits(UsartReg::Cr3, cr3::DMAR);
        self.regs.write(UsartReg::Icr, icr::IDLECF);
        self.regs.set_bits(UsartReg::Cr1, cr1::IDLEIE);
        Ok(())
    }

    fn enable_rx_error_irqs(&self) {
        if self.config.parity != Parity::None {
            self.regs.set_bits(UsartReg::Cr1, cr1::PEIE);
        }
        self.regs.set_bits(UsartReg::Cr3, cr3::EIE);
    }

    /// Stops any interrupt or DMA reception and returns the receiver to
    /// `Ready`. Nothing is reported through [`UartEvents`].
    pub fn abort_receive(&mut self) -> Result<(), HalError> {
        if self.rx.is_some() {
            count_entry!(Trace::RxAborted);
        }
        self.end_rx();
        self.regs.write(
            UsartReg::Icr,
            icr::PECF | icr::FECF | icr::NECF | icr::ORECF,
        );
        Ok(())
    }

    /// Tears down the reception in progress, if any.
    fn end_rx(&mut self) {
        self.regs.clear_bits(
            UsartReg::Cr1,
            cr1::RXNEIE | cr1::IDLEIE | cr1::PEIE,
        );
        self.regs.clear_bits(UsartReg::Cr3, cr3::EIE | cr3::DMAR);
        if let Some(RxTransfer::Dma { dma, .. }) = &mut self.rx {
            dma.stop();
        }
        self.rx = None;
        if self.rx_state == RxState::Busy {
            self.rx_state = RxState::Ready;
        }
    }

    fn complete_rx(&mut self, len: usize) {
        self.end_rx();
        count_entry!(Trace::RxDone(len));
        self.events.rx_event(len);
    }

    /// Services the USART interrupt.
    pub fn handle_interrupt(&mut self) {
        let status = self.regs.read(UsartReg::Isr);
        let cr1 = self.regs.read(UsartReg::Cr1);
        let cr3 = self.regs.read(UsartReg::Cr3);

        let mut errors = UartErrorCode::empty();
        if cr1 & cr1::PEIE != 0 && status & isr::PE != 0 {
            errors |= UartErrorCode::PARITY;
        }
        if cr3 & cr3::EIE != 0 {
            if status & isr::FE != 0 {
                errors |= UartErrorCode::FRAMING;
            }
            if status & isr::NE != 0 {
                errors |= UartErrorCode::NOISE;
            }
        }
        if (cr3 & cr3::EIE != 0 || cr1 & cr1::RXNEIE != 0)
            && status & isr::ORE != 0
        {
            errors |= UartErrorCode::OVERRUN;
        }
        if !errors.is_empty() {
            self.regs.write(
                UsartReg::Icr,
                icr::PECF | icr::FECF | icr::NECF | icr::ORECF,
            );
            self.error |= errors;
            count_entry!(Trace::RxError(errors));
            if errors.contains(UartErrorCode::OVERRUN) {
                self.end_rx();
            }
            self.events.error(errors);
        }

        if cr1 & cr1::RXNEIE != 0 {
            if let Some(len) = self.drain_rx() {
                self.complete_rx(len);
            }
        }

        // Reading RDR above may have changed the picture.
        let status = self.regs.read(UsartReg::Isr);
        if cr1 & cr1::IDLEIE != 0 && status & isr::IDLE != 0 {
            self.regs.write(UsartReg::Icr, icr::IDLECF);
            let received = match &self.rx {
                Some(RxTransfer::Interrupt { received, .. }) => *received,
                Some(RxTransfer::Dma { len, dma, .. }) => {
                    // A full buffer is the DMA completion's to report.
                    let n = len.saturating_sub(dma.remaining());
                    if n < *len {
                        n
                    } else {
                        0
                    }
                }
                None => 0,
            };
            if received > 0 {
                self.complete_rx(received);
            }
        }

        if cr1 & cr1::RXFFIE != 0 && status & isr::RXFF != 0 {
            ringbuf_entry!(Trace::RxFifoFull);
            self.events.rx_fifo_full();
        }
        if cr1 & cr1::TXFEIE != 0 && status & isr::TXFE != 0 {
            ringbuf_entry!(Trace::TxFifoEmpty);
            self.events.tx_fifo_empty();
        }
    }

    /// Moves up to one interrupt's worth of bytes from `RDR` into the
    /// interrupt-driven reception's buffer. Returns the byte count once the
    /// buffer is full.
    fn drain_rx(&mut self) -> Option<usize> {
        let Self {
            regs,
            rx,
            mask,
            nb_rx_data_to_process,
            ..
        } = self;
        let Some(RxTransfer::Interrupt { buf, received }) = rx else {
            return None;
        };
        for _ in 0..(*nb_rx_data_to_process).max(1) {
            let full = *received == buf.len();
            if full || !regs.is_set(UsartReg::Isr, isr::RXNE) {
                break;
            }
            let data = regs.read(UsartReg::Rdr) & u32::from(*mask);
            buf[*received] = data as u8;
            *received += 1;
        }
        (*received == buf.len()).then_some(*received)
    }

    /// Services the receive DMA channel's transfer-complete interrupt.
    pub fn handle_dma_complete(&mut self) {
        if let Some(RxTransfer::Dma { len, dma, .. }) = &self.rx {
            let received = len.saturating_sub(dma.remaining());
            self.complete_rx(received);
        }
    }

    /// Services the receive DMA channel's transfer-error interrupt. The
    /// reception ends without an `rx_event`.
    pub fn handle_dma_error(&mut self) {
        if matches!(self.rx, Some(RxTransfer::Dma { .. })) {
            self.error |= UartErrorCode::DMA;
            count_entry!(Trace::RxError(UartErrorCode::DMA));
            self.end_rx();
            self.events.error(UartErrorCode::DMA);
        }
    }

    pub fn g_state(&self) -> State {
        self.g_state
    }

    pub fn rx_state(&self) -> RxState {
        self.rx_state
    }

    pub fn error(&self) -> UartErrorCode {
        self.error
    }

    pub fn config(&self) -> UartConfig {
        self.config
    }

    pub fn fifo_mode(&self) -> bool {
        self.fifo_mode
    }

    /// Entries moved per transmit interrupt.
    pub fn nb_tx_data_to_process(&self) -> u16 {
        self.nb_tx_data_to_process
    }

    /// Entries moved per receive interrupt.
    pub fn nb_rx_data_to_process(&self) -> u16 {
        self.nb_rx_data_to_process
    }

    /// Bits of `RDR` kept for each received word.
    pub fn rx_data_mask(&self) -> u16 {
        self.mask
    }

    pub fn events(&self) -> &E {
        &self.events
    }
}
