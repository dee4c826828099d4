//! # Blend Operations
//!
//! [`BlendEngine`] drives a full compositing operation: it programs all four
//! register slots, reconciles colorspace conversion between inputs and
//! output, arms the completion interrupt, and kicks the engine.
//!
//! The engine composites asynchronously. [`BlendEngine::blend`] is the
//! synchronous entry point; [`BlendEngine::start_blend`] returns a
//! [`PendingBlend`] so the CPU can work while the hardware runs:
//!
//! ```ignore
//! let pending = engine.start_blend(&video, &osd, None, &frame)?;
//! decode_next_frame();   // runs while the engine composites
//! pending.wait();
//! ```
//!
//! The stacking order is fixed in silicon: source 1 is the back layer,
//! source 2 the middle, source 3 the front. Two sources and one destination
//! are mandatory; a third source must share source 2's pixel format because
//! both feed the same stage of the blend chain.
//!
//! Only one operation can be in flight per engine. `start_blend` takes the
//! session's device gate and `wait` releases it; a second caller blocks in
//! `start_blend` until then.

mod encode;

use std::marker::PhantomData;

use log::trace;

use crate::BlendError;
use crate::regs::{self, StartFlags};
use crate::session::DeviceSession;
use crate::surface::{ColorFamily, Surface};

use encode::SharedRegs;

/// Driver for one blend engine, generic over the [`DeviceSession`] that
/// reaches it.
pub struct BlendEngine<S: DeviceSession> {
    session: S,
}

impl<S: DeviceSession> BlendEngine<S> {
    /// Wrap an acquired device session.
    pub fn new(session: S) -> Self {
        BlendEngine { session }
    }

    /// The underlying session.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Give the session back, releasing the engine when the caller drops it.
    pub fn into_session(self) -> S {
        self.session
    }

    pub(crate) fn read(&self, offset: u32) -> u32 {
        let value = self.session.read_reg(offset);
        trace!("read_reg[{offset:#04X}] -> {value:#010X}");
        value
    }

    pub(crate) fn write(&self, offset: u32, value: u32) {
        trace!("write_reg[{offset:#04X}] <- {value:#010X}");
        self.session.write_reg(offset, value);
    }

    /// Program and kick one blend: `src1` under `src2` (under `src3`), into
    /// `dest`.
    ///
    /// Blocks until the engine is free, programs all slots, and starts the
    /// operation. On success the hardware is running and the returned
    /// [`PendingBlend`] must be waited on; on error nothing was started and
    /// the engine is released again.
    pub fn start_blend(
        &self,
        src1: &Surface,
        src2: &Surface,
        src3: Option<&Surface>,
        dest: &Surface,
    ) -> Result<PendingBlend<'_, S>, BlendError> {
        // Sources 2 and 3 feed the same blend stage and must agree on format.
        if let Some(src3) = src3 {
            if src3.format != src2.format {
                return Err(BlendError::MismatchedChain);
            }
        }

        self.session.lock();
        match self.program(src1, src2, src3, dest) {
            Ok(()) => Ok(PendingBlend {
                engine: self,
                waited: false,
                _pinned: PhantomData,
            }),
            Err(e) => {
                self.session.unlock();
                Err(e)
            }
        }
    }

    fn program(
        &self,
        src1: &Surface,
        src2: &Surface,
        src3: Option<&Surface>,
        dest: &Surface,
    ) -> Result<(), BlendError> {
        trace!("start_blend in");

        self.write(regs::BBRSTR, regs::BBRSTR_RESET);
        self.write(regs::BRCNTR, 0);
        self.write(regs::BRCHR, 0);

        let mut shared = SharedRegs::new();
        self.encode_source(0, Some(src1), &mut shared)?;
        self.encode_source(1, Some(src2), &mut shared)?;
        self.encode_source(2, src3, &mut shared)?;
        self.encode_dest(dest, &mut shared)?;
        self.flush_shared(&shared);

        // Both inputs in one family: source 1 joins the chain's colorspace.
        if src1.format.family() == src2.format.family() {
            let bsifr = self.read(regs::BSIFR);
            self.write(regs::BSIFR, bsifr | regs::BSIFR_IN1TE);
        }

        // Output leaves source 2's family: convert on the way out.
        if dest.format.family() != src2.format.family() {
            let mut bpkfr = self.read(regs::BPKFR) | regs::BPKFR_RY;
            if src2.format.family() == ColorFamily::Rgb {
                bpkfr |= regs::BPKFR_TE;
            }
            self.write(regs::BPKFR, bpkfr);
        }

        // Source 1 as parent; blended output routed to memory.
        self.write(regs::BBLCR1, regs::BBLCR1_OUTPUT_MEM);

        self.write(regs::BPROCR, 0);
        self.write(regs::BMWCR0, 0);
        self.write(regs::BPCCR0, 0);

        self.write(regs::BEIER, regs::BEIER_EN);

        let mut start = StartFlags::BEIVK | StartFlags::CHON1 | StartFlags::CHON2;
        if src3.is_some() {
            start |= StartFlags::CHON3;
        }
        self.write(regs::BESTR, start.bits());

        trace!("start_blend out");
        Ok(())
    }

    /// Blend synchronously: [`start_blend`](Self::start_blend) followed by
    /// [`wait`](PendingBlend::wait).
    pub fn blend(
        &self,
        src1: &Surface,
        src2: &Surface,
        src3: Option<&Surface>,
        dest: &Surface,
    ) -> Result<(), BlendError> {
        self.start_blend(src1, src2, src3, dest)?.wait();
        Ok(())
    }
}

/// A blend the hardware is currently executing.
///
/// Holds the device gate from the matching
/// [`start_blend`](BlendEngine::start_blend). [`wait`](PendingBlend::wait)
/// consumes the guard: it blocks until the completion interrupt, acknowledges
/// the event, and releases the engine. Dropping the guard without calling
/// `wait` performs the same completion, so the engine is never left locked.
///
/// The guard is not `Send`: completion happens on the thread that started
/// the operation.
pub struct PendingBlend<'a, S: DeviceSession> {
    engine: &'a BlendEngine<S>,
    waited: bool,
    _pinned: PhantomData<*const ()>,
}

impl<S: DeviceSession> PendingBlend<'_, S> {
    /// Block until the engine finishes, then release it.
    pub fn wait(mut self) {
        self.finish();
        self.waited = true;
    }

    fn finish(&self) {
        let engine = self.engine;
        engine.session.sleep_until_signaled();

        // Ack the completion event.
        engine.write(regs::BEVTR, regs::BEVTR_CLEAR);

        // The interrupt can land before the engine drops its busy flag.
        while engine.read(regs::BSTAR) & regs::BSTAR_BSY != 0 {
            std::hint::spin_loop();
        }

        engine.session.unlock();
    }
}

impl<S: DeviceSession> Drop for PendingBlend<'_, S> {
    fn drop(&mut self) {
        if !self.waited {
            self.finish();
        }
    }
}
