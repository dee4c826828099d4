//! Slot encoding: one surface descriptor into one register group.
//!
//! Each call validates its surface (first failure wins: primary plane, then
//! alignment, then bound, then slot-specific rules, then format) and writes
//! the slot's own registers. Fields of the registers shared by all slots are
//! merged into a [`SharedRegs`] image instead and stored once by the
//! orchestrator.

use bit_field::BitField;
use log::debug;

use crate::BlendError;
use crate::regs::{self, Slot};
use crate::session::DeviceSession;
use crate::surface::Surface;

use super::BlendEngine;

/// In-memory image of the registers every slot contributes a field to.
///
/// `BSWPR` and `BBLCR0` carry one lane per slot. Building the value here and
/// flushing it once keeps each encode call from read-modify-writing a live
/// register.
#[derive(Debug)]
pub(crate) struct SharedRegs {
    /// `BSWPR` image: swap enable plus one swap lane per slot.
    pub(crate) swap: u32,
    /// `BBLCR0` image: stacking order plus constant-alpha lanes.
    pub(crate) blend_control: u32,
}

impl SharedRegs {
    pub(crate) fn new() -> Self {
        SharedRegs {
            swap: 0,
            blend_control: regs::BBLCR0_ORDER_123,
        }
    }
}

impl<S: DeviceSession> BlendEngine<S> {
    /// Program source slot `index` from `surface`.
    ///
    /// An absent surface leaves the slot unused and succeeds.
    pub(crate) fn encode_source(
        &self,
        index: usize,
        surface: Option<&Surface>,
        shared: &mut SharedRegs,
    ) -> Result<(), BlendError> {
        let Some(surface) = surface else {
            return Ok(());
        };
        let slot = Slot::SOURCES[index];
        let base = regs::SRC_BASE[index];

        debug!(
            "{slot}: fmt={:?} width={} height={} pitch={}",
            surface.format, surface.width, surface.height, surface.pitch
        );

        if surface.y_plane == 0 {
            return Err(reject(slot, "primary plane address missing"));
        }
        if !surface.geometry_aligned() {
            return Err(reject(slot, "geometry not 4-aligned"));
        }
        if !surface.geometry_bounded() {
            return Err(reject(slot, "geometry exceeds 4092"));
        }
        let Some(fmt) = surface.format.source_mode(surface.has_alpha_plane()) else {
            return Err(reject(slot, "format unsupported for a source"));
        };

        let mut size = 0u32;
        size.set_bits(0..12, surface.width);
        size.set_bits(16..28, surface.height);
        self.write(base + regs::BSSZR, size);
        self.write(base + regs::BSMWR, surface.pitch);
        self.write(base + regs::BSAYR, surface.y_plane);
        self.write(base + regs::BSACR, surface.c_plane);
        self.write(base + regs::BSAAR, surface.alpha_plane);
        self.write(base + regs::BSIFR, fmt);

        // Overlay position within the output frame.
        self.write(
            regs::BLOCR1 + 4 * index as u32,
            (surface.x << 16) | surface.y,
        );

        shared.swap |=
            regs::BSWPR_MODSEL | (surface.format.swap_pattern() << regs::src_swap_shift(index));

        // The constant lane only applies without a per-pixel alpha plane.
        if !surface.has_alpha_plane() {
            shared
                .blend_control
                .set_bits(index * 8..index * 8 + 8, u32::from(surface.alpha));
        }

        Ok(())
    }

    /// Program the destination slot from `surface`.
    pub(crate) fn encode_dest(
        &self,
        surface: &Surface,
        shared: &mut SharedRegs,
    ) -> Result<(), BlendError> {
        debug!(
            "dest: fmt={:?} width={} height={} pitch={}",
            surface.format, surface.width, surface.height, surface.pitch
        );

        if surface.y_plane == 0 {
            return Err(reject(Slot::Dest, "primary plane address missing"));
        }
        if !surface.geometry_aligned() {
            return Err(reject(Slot::Dest, "geometry not 4-aligned"));
        }
        if !surface.geometry_bounded() {
            return Err(reject(Slot::Dest, "geometry exceeds 4092"));
        }
        // The destination covers the whole frame and blends nothing in.
        if surface.x != 0 || surface.y != 0 || surface.has_alpha_plane() {
            return Err(reject(Slot::Dest, "offset or alpha plane on destination"));
        }
        let fmt = surface.format.dest_mode();

        self.write(regs::BDMWR, surface.pitch);
        self.write(regs::BDAYR, surface.y_plane);
        self.write(regs::BDACR, surface.c_plane);
        self.write(regs::BAFXR, 0);
        self.write(regs::BPKFR, fmt);

        shared.swap |= surface.format.swap_pattern() << regs::DEST_SWAP_SHIFT;

        Ok(())
    }

    /// Store the accumulated shared-register image.
    pub(crate) fn flush_shared(&self, shared: &SharedRegs) {
        self.write(regs::BSWPR, shared.swap);
        self.write(regs::BBLCR0, shared.blend_control);
    }
}

fn reject(slot: Slot, why: &str) -> BlendError {
    debug!("{slot} rejected: {why}");
    BlendError::InvalidSurface(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimDevice;
    use crate::surface::PixelFormat;

    fn nv12_with_alpha() -> Surface {
        Surface {
            format: PixelFormat::Nv12,
            width: 320,
            height: 240,
            pitch: 320,
            y_plane: 0x1000_0000,
            c_plane: 0x1010_0000,
            alpha_plane: 0x1020_0000,
            x: 16,
            y: 8,
            alpha: 0xFF,
        }
    }

    fn engine() -> BlendEngine<SimDevice> {
        BlendEngine::new(SimDevice::new())
    }

    #[test]
    fn source_slot_registers_are_programmed() {
        let engine = engine();
        let mut shared = SharedRegs::new();
        engine
            .encode_source(1, Some(&nv12_with_alpha()), &mut shared)
            .unwrap();

        let base = regs::SRC_BASE[1];
        let sim = engine.session();
        assert_eq!(sim.reg(base + regs::BSSZR), (240 << 16) | 320);
        assert_eq!(sim.reg(base + regs::BSMWR), 320);
        assert_eq!(sim.reg(base + regs::BSAYR), 0x1000_0000);
        assert_eq!(sim.reg(base + regs::BSACR), 0x1010_0000);
        assert_eq!(sim.reg(base + regs::BSAAR), 0x1020_0000);
        // NV12 with a per-pixel alpha plane.
        assert_eq!(sim.reg(base + regs::BSIFR), 0x500);
        assert_eq!(sim.reg(regs::BLOCR1 + 4), (16 << 16) | 8);
    }

    #[test]
    fn shared_fields_accumulate_without_touching_hardware() {
        let engine = engine();
        let mut shared = SharedRegs::new();

        let mut rgb565 = nv12_with_alpha();
        rgb565.format = PixelFormat::Rgb565;
        rgb565.alpha_plane = 0;
        rgb565.alpha = 0x40;
        engine.encode_source(0, Some(&rgb565), &mut shared).unwrap();

        let mut rgb32 = nv12_with_alpha();
        rgb32.format = PixelFormat::Rgb32;
        rgb32.alpha_plane = 0;
        rgb32.alpha = 0x80;
        engine.encode_source(1, Some(&rgb32), &mut shared).unwrap();

        // Nothing flushed yet.
        let sim = engine.session();
        assert_eq!(sim.reg(regs::BSWPR), 0);
        assert_eq!(sim.reg(regs::BBLCR0), 0);

        engine.flush_shared(&shared);
        assert_eq!(
            sim.reg(regs::BSWPR),
            regs::BSWPR_MODSEL | (0x6 << 8) | (0x7 << 16)
        );
        assert_eq!(sim.reg(regs::BBLCR0), 0x8040);
    }

    #[test]
    fn per_pixel_alpha_leaves_constant_lane_clear() {
        let engine = engine();
        let mut shared = SharedRegs::new();
        engine
            .encode_source(2, Some(&nv12_with_alpha()), &mut shared)
            .unwrap();
        assert_eq!(shared.blend_control, 0);
    }

    #[test]
    fn unused_source_slot_is_a_noop() {
        let engine = engine();
        let mut shared = SharedRegs::new();
        engine.encode_source(2, None, &mut shared).unwrap();
        assert!(engine.session().writes().is_empty());
        assert_eq!(shared.swap, 0);
    }

    #[test]
    fn dest_registers_are_programmed() {
        let engine = engine();
        let mut shared = SharedRegs::new();
        let dest = Surface {
            format: PixelFormat::Rgb32,
            width: 640,
            height: 480,
            pitch: 2560,
            y_plane: 0x2000_0000,
            c_plane: 0,
            alpha_plane: 0,
            x: 0,
            y: 0,
            alpha: 0,
        };
        engine.encode_dest(&dest, &mut shared).unwrap();

        let sim = engine.session();
        assert_eq!(sim.reg(regs::BDMWR), 2560);
        assert_eq!(sim.reg(regs::BDAYR), 0x2000_0000);
        assert_eq!(sim.reg(regs::BDACR), 0);
        assert_eq!(sim.reg(regs::BAFXR), 0);
        assert_eq!(sim.reg(regs::BPKFR), 0xB);
        assert_eq!(shared.swap, 0x70);
    }

    #[test]
    fn rgb565_source_with_alpha_plane_has_no_mode() {
        let engine = engine();
        let mut shared = SharedRegs::new();
        let mut surface = nv12_with_alpha();
        surface.format = PixelFormat::Rgb565;
        let err = engine
            .encode_source(0, Some(&surface), &mut shared)
            .unwrap_err();
        assert!(matches!(err, BlendError::InvalidSurface(Slot::Src1)));
    }
}
