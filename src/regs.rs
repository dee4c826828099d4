//! # Blend Engine Register Map
//!
//! Byte offsets and bit layouts for the BEU register window. Per-source
//! registers are listed at their source-1 position; add [`SRC_BASE`]`[n]` to
//! reach the same register for source `n`.
//!
//! | Offset  | Name     | Description                                      |
//! |---------|----------|--------------------------------------------------|
//! | `0x00`  | `BESTR`  | Start register (channel enables + kick)          |
//! | `0x10`  | `BSMWR`  | Source memory width (row stride, bytes)          |
//! | `0x14`  | `BSSZR`  | Source size (height:16..28, width:0..12)         |
//! | `0x18`  | `BSAYR`  | Source Y/single plane address                    |
//! | `0x1C`  | `BSACR`  | Source chroma plane address                      |
//! | `0x20`  | `BSAAR`  | Source alpha plane address                       |
//! | `0x24`  | `BSIFR`  | Source input format                              |
//! | `0xA0`  | `BBLCR0` | Blend control 0 (stacking order, constant alpha) |
//! | `0xA4`  | `BBLCR1` | Blend control 1 (parent select, output routing)  |
//! | `0xA8`  | `BPROCR` | Process control                                  |
//! | `0xAC`  | `BMWCR0` | Memory write control                             |
//! | `0xB0`  | `BLOCR1` | Source 1 overlay position (`+4` per source)      |
//! | `0xC0`  | `BPKFR`  | Output pack format                               |
//! | `0xC4`  | `BPCCR0` | Pixel colorspace control                         |
//! | `0xD0`  | `BDMWR`  | Destination memory width (row stride, bytes)     |
//! | `0xD4`  | `BDAYR`  | Destination Y/single plane address               |
//! | `0xD8`  | `BDACR`  | Destination chroma plane address                 |
//! | `0xDC`  | `BAFXR`  | Address fix register                             |
//! | `0xE0`  | `BSWPR`  | Byte/word swap control (shared by all slots)     |
//! | `0xE4`  | `BEIER`  | Event interrupt enable                           |
//! | `0xE8`  | `BEVTR`  | Event register (completion latch)                |
//! | `0xF0`  | `BSTAR`  | Status register (busy flag)                      |
//! | `0xF4`  | `BBRSTR` | Software reset                                   |
//! | `0xF8`  | `BRCNTR` | Raster counter                                   |
//! | `0xFC`  | `BRCHR`  | Raster latch                                     |
//!
//! The stacking order is a hardware contract, not a knob: source 1 is the back
//! layer, source 2 the middle, source 3 the front. Likewise completion is
//! always interrupt-plus-busy-poll.

use core::fmt;

/// Size of the register window in bytes.
pub const WINDOW_LEN: usize = 0x100;

/// Start register.
pub const BESTR: u32 = 0x00;

/// Base offsets of the three source register groups.
pub const SRC_BASE: [u32; 3] = [0x00, 0x18, 0x30];

/// Source memory width (row stride in bytes), relative to a source base.
pub const BSMWR: u32 = 0x10;
/// Source size, relative to a source base.
pub const BSSZR: u32 = 0x14;
/// Source Y/single plane address, relative to a source base.
pub const BSAYR: u32 = 0x18;
/// Source chroma plane address, relative to a source base.
pub const BSACR: u32 = 0x1C;
/// Source alpha plane address, relative to a source base.
pub const BSAAR: u32 = 0x20;
/// Source input format, relative to a source base.
pub const BSIFR: u32 = 0x24;

/// Blend control 0: stacking order field plus one constant-alpha lane per
/// source (source `n` in bits `n*8..n*8+8`).
pub const BBLCR0: u32 = 0xA0;
/// Blend control 1: parent select and output routing.
pub const BBLCR1: u32 = 0xA4;
/// Process control.
pub const BPROCR: u32 = 0xA8;
/// Memory write control.
pub const BMWCR0: u32 = 0xAC;
/// Overlay position of source 1; sources 2 and 3 follow at `+4` and `+8`.
pub const BLOCR1: u32 = 0xB0;
/// Output pack format.
pub const BPKFR: u32 = 0xC0;
/// Pixel colorspace control.
pub const BPCCR0: u32 = 0xC4;

/// Destination memory width (row stride in bytes).
pub const BDMWR: u32 = 0xD0;
/// Destination Y/single plane address.
pub const BDAYR: u32 = 0xD4;
/// Destination chroma plane address.
pub const BDACR: u32 = 0xD8;
/// Address fix register.
pub const BAFXR: u32 = 0xDC;

/// Byte/word swap control, shared by all four slots.
pub const BSWPR: u32 = 0xE0;
/// Event interrupt enable.
pub const BEIER: u32 = 0xE4;
/// Event register; the completion latch lives in bit 0.
pub const BEVTR: u32 = 0xE8;
/// Status register.
pub const BSTAR: u32 = 0xF0;
/// Software reset.
pub const BBRSTR: u32 = 0xF4;
/// Raster counter.
pub const BRCNTR: u32 = 0xF8;
/// Raster latch.
pub const BRCHR: u32 = 0xFC;

/// `BSIFR` bit: convert source 1 into the blend chain's colorspace.
pub const BSIFR_IN1TE: u32 = 1 << 12;
/// `BPKFR` bit: convert the blend chain's colorspace on output.
pub const BPKFR_RY: u32 = 1 << 11;
/// `BPKFR` bit: RGB type conversion on output.
pub const BPKFR_TE: u32 = 1 << 10;
/// `BBLCR1` value: source 1 as parent, blended output routed to memory.
pub const BBLCR1_OUTPUT_MEM: u32 = 1 << 16;
/// `BBLCR0` stacking-order field value for the fixed back-to-front chain.
pub const BBLCR0_ORDER_123: u32 = 0;

/// `BSWPR` bit: swap unit select enable.
pub const BSWPR_MODSEL: u32 = 1 << 31;
/// Swap pattern for 16-bit elements.
pub const SWAP_16BIT: u32 = 0x6;
/// Swap pattern for 32-bit and planar elements.
pub const SWAP_32BIT: u32 = 0x7;
/// Bit position of the destination's swap lane within `BSWPR`.
pub const DEST_SWAP_SHIFT: u32 = 4;

/// Bit position of source `index`'s swap lane within `BSWPR`.
pub const fn src_swap_shift(index: usize) -> u32 {
    (index as u32 + 1) * 8
}

/// `BEIER` value arming the completion interrupt.
pub const BEIER_EN: u32 = 1;
/// `BEVTR` value acknowledging the completion event (clears bit 0).
pub const BEVTR_CLEAR: u32 = 0x100;
/// `BSTAR` bit: engine busy.
pub const BSTAR_BSY: u32 = 1;
/// `BBRSTR` bit: reset the engine.
pub const BBRSTR_RESET: u32 = 1;

bitflags::bitflags! {
    /// Start register (`BESTR`) bits.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct StartFlags: u32 {
        /// Enable the source 1 channel.
        const CHON1 = 1 << 0;
        /// Enable the source 2 channel.
        const CHON2 = 1 << 1;
        /// Enable the source 3 channel.
        const CHON3 = 1 << 2;
        /// Kick the operation.
        const BEIVK = 1 << 16;

        /// All channel enables.
        const CHON_ALL = Self::CHON1.bits() | Self::CHON2.bits() | Self::CHON3.bits();
    }
}

/// One of the four register groups programmed per blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Source 1, the back layer.
    Src1,
    /// Source 2, the middle layer.
    Src2,
    /// Source 3, the front layer.
    Src3,
    /// The output surface.
    Dest,
}

impl Slot {
    /// Source slots in blend-chain order.
    pub(crate) const SOURCES: [Slot; 3] = [Slot::Src1, Slot::Src2, Slot::Src3];
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::Src1 => "source 1",
            Slot::Src2 => "source 2",
            Slot::Src3 => "source 3",
            Slot::Dest => "destination",
        })
    }
}
