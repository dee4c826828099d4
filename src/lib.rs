//! # BEU
//!
//! Driver for the SH-Mobile blend engine unit: a fixed-function 2D
//! compositor that overlays up to three source surfaces onto one destination
//! surface in hardware, converting pixel formats and applying alpha on the
//! way. It runs **in parallel** with the CPU — start a blend, do other work,
//! then wait for completion.
//!
//! ## Blending
//!
//! ```ignore
//! use beu::{BlendEngine, PixelFormat, Surface, UioSession};
//!
//! let session = unsafe { UioSession::new(base, len, uio_fd)? };
//! let engine = BlendEngine::new(session);
//!
//! // Overlay `osd` on top of `video`, writing the result to `frame`.
//! engine.blend(&video, &osd, None, &frame)?;
//! ```
//!
//! [`BlendEngine::blend`] programs all four register slots, kicks the engine
//! and blocks until the completion interrupt. To overlap CPU work with the
//! hardware, use [`BlendEngine::start_blend`] and hold on to the returned
//! [`PendingBlend`]:
//!
//! ```ignore
//! let pending = engine.start_blend(&video, &osd, None, &frame)?;
//!
//! // All of this runs WHILE the engine composites.
//! decode_next_frame();
//! update_osd_text();
//!
//! pending.wait();
//! ```
//!
//! ## Surfaces
//!
//! A [`Surface`] names the bus addresses of its planes and its geometry.
//! Width, height and row stride must each be a multiple of 4 and at most
//! 4092 — out-of-range surfaces are rejected, never corrected. Sources may
//! carry a per-pixel alpha plane; without one, a constant plane alpha is
//! applied. The destination always covers the full frame.
//!
//! ## One engine, many callers
//!
//! The engine is a single physical block. `start_blend` takes the session's
//! device gate and `wait` releases it, so a second caller simply blocks
//! until the engine is free. No cancellation and no timeout exist in
//! hardware; bound the wait externally if you need to.
//!
//! ## Sessions
//!
//! All hardware access goes through a [`DeviceSession`]: [`UioSession`]
//! adopts a register window mapped by the caller (UIO-style), and
//! [`sim::SimDevice`] is an in-memory model for tests and bring-up.

pub mod blend;
pub mod regs;
pub mod session;
pub mod sim;
pub mod surface;

pub use blend::{BlendEngine, PendingBlend};
pub use regs::Slot;
pub use session::{DeviceSession, UioSession};
pub use sim::SimDevice;
pub use surface::{ColorFamily, PixelFormat, Surface};

use thiserror::Error;

/// Failure of a blend request.
///
/// Validation failures are final for the call: nothing is retried, and the
/// engine is released before the error is returned. The caller fixes the
/// request and calls again.
#[derive(Debug, Error)]
pub enum BlendError {
    /// The device session or its register window is unusable.
    #[error("blend engine unavailable: {0}")]
    Device(String),
    /// A surface failed geometry or format validation for its slot.
    #[error("invalid {0} surface")]
    InvalidSurface(Slot),
    /// A third source must share the second source's pixel format.
    #[error("source 2 and source 3 pixel formats differ")]
    MismatchedChain,
}
