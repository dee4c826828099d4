//! # Device Sessions
//!
//! The blend engine is reached through a [`DeviceSession`]: the collaborator
//! that owns the hardware handle, the mapped register window, and the
//! primitives that serialize access to the one physical block. The driver
//! itself never maps memory or talks to the kernel — it only reads and writes
//! registers through this seam and relies on its lock and completion signal.
//!
//! [`UioSession`] is the hardware implementation, adopting a register window
//! the caller has already mapped (UIO-style) together with the interrupt
//! descriptor. [`SimDevice`](crate::sim::SimDevice) is the in-memory
//! implementation used by the test suite.
//!
//! Acquire/release bracket the session's lifetime the Rust way: constructing
//! the session acquires the device, dropping it releases it.

use std::fs::File;
use std::io::{Read, Write};
use std::ptr::NonNull;
use std::sync::{Condvar, Mutex, PoisonError};

use log::{trace, warn};
use volatile_register::RW;

use crate::BlendError;
use crate::regs;

/// Access to one blend engine: its register window, its exclusion lock, and
/// its completion signal.
///
/// `lock`/`unlock` bracket a whole operation, from the first programming
/// write until completion. `sleep_until_signaled` blocks the calling thread
/// until the engine raises its completion interrupt; the driver still polls
/// the busy flag afterwards, so a spurious wakeup is harmless.
pub trait DeviceSession {
    /// Read the 32-bit register at `offset` bytes into the window.
    fn read_reg(&self, offset: u32) -> u32;

    /// Write the 32-bit register at `offset` bytes into the window.
    fn write_reg(&self, offset: u32, value: u32);

    /// Take exclusive ownership of the engine, blocking until it is free.
    fn lock(&self);

    /// Release exclusive ownership of the engine.
    fn unlock(&self);

    /// Block until the engine delivers its completion interrupt.
    fn sleep_until_signaled(&self);
}

/// Blocking gate serializing callers onto the one physical engine.
pub(crate) struct DeviceGate {
    held: Mutex<bool>,
    freed: Condvar,
}

impl DeviceGate {
    pub(crate) const fn new() -> Self {
        DeviceGate {
            held: Mutex::new(false),
            freed: Condvar::new(),
        }
    }

    pub(crate) fn lock(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while *held {
            held = self.freed.wait(held).unwrap_or_else(PoisonError::into_inner);
        }
        *held = true;
    }

    pub(crate) fn unlock(&self) {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.freed.notify_one();
    }

    pub(crate) fn is_held(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Session over a register window the caller has already mapped.
///
/// The caller (typically via a UIO device: `mmap` of `/dev/uioN` plus the
/// same file descriptor for interrupts) hands over the mapping; this type
/// adds volatile access, the in-process device gate, and the blocking
/// interrupt wait.
///
/// ```ignore
/// let uio = OpenOptions::new().read(true).write(true).open("/dev/uio0")?;
/// let base = mmap_registers(&uio)?; // platform-specific
/// let session = unsafe { UioSession::new(base, 0x100, uio) }?;
/// let engine = BlendEngine::new(session);
/// ```
pub struct UioSession {
    regs: NonNull<RW<u32>>,
    len: usize,
    irq: File,
    gate: DeviceGate,
}

// The raw window pointer is plain MMIO; the gate serializes all register
// traffic between threads.
unsafe impl Send for UioSession {}
unsafe impl Sync for UioSession {}

impl UioSession {
    /// Adopt a mapped register window and its interrupt descriptor.
    ///
    /// # Safety
    ///
    /// `base` must point to a live mapping of at least `len` bytes over the
    /// engine's register block and stay valid for the session's lifetime.
    pub unsafe fn new(base: *mut u32, len: usize, irq: File) -> Result<Self, BlendError> {
        let Some(window) = NonNull::new(base.cast::<RW<u32>>()) else {
            return Err(BlendError::Device("null register window".into()));
        };
        if len < regs::WINDOW_LEN {
            return Err(BlendError::Device(format!(
                "register window too small: {len:#x} bytes"
            )));
        }
        Ok(UioSession {
            regs: window,
            len,
            irq,
            gate: DeviceGate::new(),
        })
    }

    fn reg(&self, offset: u32) -> *mut RW<u32> {
        debug_assert!(offset as usize + 4 <= self.len && offset % 4 == 0);
        unsafe { self.regs.as_ptr().add(offset as usize / 4) }
    }
}

impl DeviceSession for UioSession {
    fn read_reg(&self, offset: u32) -> u32 {
        unsafe { (*self.reg(offset)).read() }
    }

    fn write_reg(&self, offset: u32, value: u32) {
        unsafe { (*self.reg(offset)).write(value) }
    }

    fn lock(&self) {
        self.gate.lock();
    }

    fn unlock(&self) {
        self.gate.unlock();
    }

    fn sleep_until_signaled(&self) {
        // UIO delivery: write 1 to unmask, then a blocking read returns the
        // interrupt count once the engine fires.
        let mut irq = &self.irq;
        if let Err(e) = irq.write_all(&1u32.to_ne_bytes()) {
            warn!("could not unmask completion interrupt: {e}");
        }
        let mut count = [0u8; 4];
        match irq.read_exact(&mut count) {
            Ok(()) => trace!("completion interrupt #{}", u32::from_ne_bytes(count)),
            // The busy-flag poll after the ack still bounds the wait.
            Err(e) => warn!("interrupt wait failed: {e}"),
        }
    }
}
