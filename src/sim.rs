//! # Simulated Device
//!
//! [`SimDevice`] is an in-memory stand-in for the mapped register window,
//! modeling the side effects the driver depends on:
//!
//! - a reset write clears the whole block,
//! - a start write with any channel enabled completes immediately, latching
//!   the completion event and signaling the waiter,
//! - the event ack clears the completion latch.
//!
//! Every register store is recorded in order, so tests can assert on the
//! exact programming sequence without hardware:
//!
//! ```ignore
//! let engine = BlendEngine::new(SimDevice::new());
//! engine.blend(&a, &b, None, &out)?;
//! assert!(engine.session().writes().iter().any(|&(o, _)| o == regs::BESTR));
//! ```

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::regs::{self, StartFlags};
use crate::session::{DeviceGate, DeviceSession};

const WORDS: usize = regs::WINDOW_LEN / 4;

struct SimState {
    regs: [u32; WORDS],
    writes: Vec<(u32, u32)>,
    irq_pending: bool,
}

/// Software model of the blend engine register block.
pub struct SimDevice {
    state: Mutex<SimState>,
    signaled: Condvar,
    gate: DeviceGate,
}

impl SimDevice {
    pub fn new() -> Self {
        SimDevice {
            state: Mutex::new(SimState {
                regs: [0; WORDS],
                writes: Vec::new(),
                irq_pending: false,
            }),
            signaled: Condvar::new(),
            gate: DeviceGate::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every `(offset, value)` stored since construction, in order.
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.state().writes.clone()
    }

    /// Current value of the register at `offset`.
    pub fn reg(&self, offset: u32) -> u32 {
        self.state().regs[offset as usize / 4]
    }

    /// Whether some caller currently holds the engine.
    pub fn is_locked(&self) -> bool {
        self.gate.is_held()
    }
}

impl Default for SimDevice {
    fn default() -> Self {
        SimDevice::new()
    }
}

impl DeviceSession for SimDevice {
    fn read_reg(&self, offset: u32) -> u32 {
        self.state().regs[offset as usize / 4]
    }

    fn write_reg(&self, offset: u32, value: u32) {
        let mut state = self.state();
        state.writes.push((offset, value));
        match offset {
            regs::BBRSTR if value & regs::BBRSTR_RESET != 0 => {
                state.regs = [0; WORDS];
            }
            regs::BESTR if value & StartFlags::CHON_ALL.bits() != 0 => {
                state.regs[offset as usize / 4] = value;
                // Zero-latency model: the operation is done as soon as it
                // starts, so the event latches right away.
                state.regs[regs::BEVTR as usize / 4] |= 1;
                state.irq_pending = true;
                self.signaled.notify_all();
            }
            regs::BEVTR if value & regs::BEVTR_CLEAR != 0 => {
                state.regs[offset as usize / 4] &= !1;
            }
            _ => {
                state.regs[offset as usize / 4] = value;
            }
        }
    }

    fn lock(&self) {
        self.gate.lock();
    }

    fn unlock(&self) {
        self.gate.unlock();
    }

    fn sleep_until_signaled(&self) {
        let mut state = self.state();
        while !state.irq_pending {
            state = self
                .signaled
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.irq_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_latches_the_completion_event() {
        let sim = SimDevice::new();
        sim.write_reg(regs::BESTR, StartFlags::CHON1.bits());
        assert_eq!(sim.reg(regs::BEVTR) & 1, 1);

        sim.sleep_until_signaled();
        sim.write_reg(regs::BEVTR, regs::BEVTR_CLEAR);
        assert_eq!(sim.reg(regs::BEVTR) & 1, 0);
    }

    #[test]
    fn reset_clears_the_block() {
        let sim = SimDevice::new();
        sim.write_reg(regs::BSWPR, 0xDEAD_BEEF);
        sim.write_reg(regs::BBRSTR, regs::BBRSTR_RESET);
        assert_eq!(sim.reg(regs::BSWPR), 0);
    }
}
