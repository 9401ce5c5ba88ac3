//! Tile planes.
//!
//! Each plane is a 64x32-cell tilemap of big-endian words at the plane's
//! base register, row-major (128 bytes per row). Entry bits: 0-10 pattern
//! id (0 = empty), 11 h-flip, 12 v-flip, 13-14 palette row, 15 priority.
//! Scroll offsets are added to the screen position and the map wraps.

use super::sprite::LayerPixel;
use super::{Vdp, reg};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneId {
    A,
    B,
}

impl PlaneId {
    /// Register indices for (base, scroll x, scroll y).
    fn regs(self) -> (usize, usize, usize) {
        match self {
            PlaneId::A => (reg::PLANE_A, reg::PLANE_A_X, reg::PLANE_A_Y),
            PlaneId::B => (reg::PLANE_B, reg::PLANE_B_X, reg::PLANE_B_Y),
        }
    }
}

impl Vdp {
    /// Pixel of `plane` at screen position (`x`, `y`); `None` if transparent.
    pub(crate) fn plane_pixel(&self, plane: PlaneId, x: u16, y: u16) -> Option<LayerPixel> {
        let (base, sx, sy) = plane.regs();
        let sx = x.wrapping_add(self.regs[sx]);
        let sy = y.wrapping_add(self.regs[sy]);

        let column = (sx >> 3) & 63;
        let row = (sy >> 3) & 31;
        let entry = self.vram_word(
            self.regs[base]
                .wrapping_add(column << 1)
                .wrapping_add(row << 7),
        );

        let pattern = entry & 0x07FF;
        if pattern == 0 {
            return None;
        }

        let mut lx = sx & 7;
        let mut ly = sy & 7;
        if entry & 0x0800 != 0 {
            lx = 7 - lx;
        }
        if entry & 0x1000 != 0 {
            ly = 7 - ly;
        }

        let addr = (pattern << 5) + (ly << 2) + (lx >> 1);
        let nibble = self.pattern_nibble(addr, lx);
        if nibble == 0 {
            return None;
        }

        Some(LayerPixel {
            color: nibble | ((entry >> 9) & 0x30) as u8,
            priority: entry & 0x8000 != 0,
        })
    }
}
