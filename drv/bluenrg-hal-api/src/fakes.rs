// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Test doubles for host builds.

use core::cell::Cell;

use crate::{Msp, Peripheral, Ticks};

/// A tick counter that advances by a fixed step every time it is read.
pub struct FakeTicks {
    next: Cell<u32>,
    step: u32,
}

impl FakeTicks {
    /// Reads `start`, then `start + step`, and so on.
    pub fn stepping(start: u32, step: u32) -> Self {
        Self {
            next: Cell::new(start),
            step,
        }
    }

    /// Always reads `at`.
    pub fn frozen(at: u32) -> Self {
        Self::stepping(at, 0)
    }

    /// The value the next read will return.
    pub fn peek(&self) -> u32 {
        self.next.get()
    }

    pub fn set(&self, at: u32) {
        self.next.set(at);
    }
}

impl Ticks for FakeTicks {
    fn now(&self) -> u32 {
        let t = self.next.get();
        self.next.set(t.wrapping_add(self.step));
        t
    }
}

/// An [`Msp`] that remembers how often each hook ran.
#[derive(Debug, Default)]
pub struct CountingMsp {
    pub inits: u32,
    pub deinits: u32,
    pub last: Option<Peripheral>,
}

impl Msp for CountingMsp {
    fn init(&mut self, peripheral: Peripheral) {
        self.inits += 1;
        self.last = Some(peripheral);
    }

    fn deinit(&mut self, peripheral: Peripheral) {
        self.deinits += 1;
        self.last = Some(peripheral);
    }
}
