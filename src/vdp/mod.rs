/*!
VDP implementation providing:
- the two-phase command protocol on device ports 0x0C..0x0D
- VDP-private memories: 16 registers, 64-entry palette (CRAM), 64 KiB VRAM,
  1 KiB font glyphs (CGRAM)
- a 320x224 frame renderer compositing a text layer, a linked sprite list and
  two scrolling tile planes

STRUCTURE:
- `Vdp` holds all state plus the two render-time caches (expanded palette,
  per-row visible sprites).
- `registers.rs` - command protocol (read and write sides)
- `memory.rs`    - toroidal fill / copy helpers used by bulk commands
- `sprite.rs`    - sprite list walk and per-pixel sprite sampling
- `plane.rs`     - tile plane sampling
- `renderer.rs`  - frame orchestration and layer priority resolution

NOTES:
- The renderer lives outside `impl Vdp` because blank vectors re-enter the
  evaluator, which needs the whole `Machine`. It borrows the VDP in short
  scopes around each `Machine::run`.
- VRAM layout (tiles, tilemaps, sprite list, text buffer) is a software
  convention. Nothing stops a program from overlapping them.
*/

use bitflags::bitflags;

pub(crate) mod memory;
pub(crate) mod plane;
pub(crate) mod registers;
pub(crate) mod renderer;
pub(crate) mod sprite;

pub use plane::PlaneId;
pub(crate) use renderer::render;
pub use sprite::SpriteEntry;

/// Screen width in pixels.
pub const WIDTH: usize = 320;
/// Screen height in pixels.
pub const HEIGHT: usize = 224;
/// Pixels per frame.
pub const PIXELS: usize = WIDTH * HEIGHT;

pub const VRAM_SIZE: usize = 0x1_0000;
pub const CGRAM_SIZE: usize = 1024;
pub const CRAM_SIZE: usize = 64;
pub const REG_COUNT: usize = 16;

/// Device port carrying the read handler (high byte of the command word).
pub const READ_PORT: u8 = 0x0C;
/// Device port carrying the write handler (low byte of the command word).
pub const WRITE_PORT: u8 = 0x0D;

/// Register indices.
pub mod reg {
    pub const COMMAND: usize = 0x0;
    pub const MODE: usize = 0x1;
    pub const USER_A: usize = 0x2;
    pub const USER_B: usize = 0x3;
    pub const USER_C: usize = 0x4;
    pub const HBLANK: usize = 0x5;
    pub const HBLANK_Y: usize = 0x6;
    pub const VBLANK: usize = 0x7;
    pub const TXTBUF: usize = 0x8;
    pub const SPRITES: usize = 0x9;
    pub const PLANE_A: usize = 0xA;
    pub const PLANE_A_X: usize = 0xB;
    pub const PLANE_A_Y: usize = 0xC;
    pub const PLANE_B: usize = 0xD;
    pub const PLANE_B_X: usize = 0xE;
    pub const PLANE_B_Y: usize = 0xF;
}

bitflags! {
    /// MODE register fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode: u16 {
        const TXTBUF = 1 << 0;      // Show text buffer
        const SPRITES = 1 << 1;     // Show sprites
        const PLANE_A = 1 << 2;     // Show tile plane A
        const PLANE_B = 1 << 3;     // Show tile plane B
        const BG_ROW = 0b11 << 4;   // Palette row of the background colour
        const HBLANK = 1 << 6;      // Enable H-blank vector
        const VBLANK = 1 << 7;      // Enable V-blank vector
        const REGS_W = 1 << 12;     // Registers written
        const VRAM_W = 1 << 13;     // VRAM written
        const CRAM_W = 1 << 14;     // Palette written
        const CGRAM_W = 1 << 15;    // Font written

        const DIRTY = Self::REGS_W.bits()
            | Self::VRAM_W.bits()
            | Self::CRAM_W.bits()
            | Self::CGRAM_W.bits();
    }
}

impl Mode {
    /// Background palette index (row bits, pixel value 0).
    #[inline]
    pub fn background(self) -> u8 {
        (self.bits() & Self::BG_ROW.bits()) as u8
    }
}

/// Expand a `0x0BGR` palette word to a `0x00RRGGBB` pixel.
#[inline]
pub fn expand_color(c: u16) -> u32 {
    let c = c as u32;
    ((c & 0x0F00) >> 4) | ((c & 0x00F0) << 8) | ((c & 0x000F) << 20)
}

/// Convert `0x00RRGGBB` pixels into opaque RGBA bytes. Stops at the end of
/// the shorter buffer.
pub fn to_rgba(frame: &[u32], out: &mut [u8]) {
    for (px, dst) in frame.iter().zip(out.chunks_exact_mut(4)) {
        dst.copy_from_slice(&[(px >> 16) as u8, (px >> 8) as u8, *px as u8, 0xFF]);
    }
}

/// Maximum visible sprites cached per row.
pub const SPRITES_PER_ROW: usize = 32;

pub struct Vdp {
    regs: [u16; REG_COUNT],
    cram: [u16; CRAM_SIZE],
    vram: Box<[u8; VRAM_SIZE]>,
    cgram: Box<[u8; CGRAM_SIZE]>,

    // Render-time caches
    palette: [u32; CRAM_SIZE],
    row_sprites: [SpriteEntry; SPRITES_PER_ROW],
    row_sprite_count: usize,
}

impl Default for Vdp {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Vdp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vdp")
            .field("regs", &self.regs)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

impl Vdp {
    pub fn new() -> Self {
        Self {
            regs: [0; REG_COUNT],
            cram: [0; CRAM_SIZE],
            vram: Box::new([0; VRAM_SIZE]),
            cgram: Box::new([0; CGRAM_SIZE]),
            palette: [0; CRAM_SIZE],
            row_sprites: [SpriteEntry::default(); SPRITES_PER_ROW],
            row_sprite_count: 0,
        }
    }

    #[inline]
    pub fn reg(&self, index: usize) -> u16 {
        self.regs[index & (REG_COUNT - 1)]
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        Mode::from_bits_retain(self.regs[reg::MODE])
    }

    #[inline]
    pub(crate) fn set_mode(&mut self, mode: Mode) {
        self.regs[reg::MODE] = mode.bits();
    }

    #[inline]
    pub fn command(&self) -> u16 {
        self.regs[reg::COMMAND]
    }

    #[inline]
    pub fn cram(&self, index: usize) -> u16 {
        self.cram[index & (CRAM_SIZE - 1)]
    }

    #[inline]
    pub fn vram(&self) -> &[u8; VRAM_SIZE] {
        &self.vram
    }

    #[inline]
    pub fn cgram(&self) -> &[u8; CGRAM_SIZE] {
        &self.cgram
    }

    /// Big-endian VRAM word, second byte wrapping at 64 KiB.
    #[inline]
    pub(crate) fn vram_word(&self, addr: u16) -> u16 {
        let hi = self.vram[addr as usize] as u16;
        let lo = self.vram[addr.wrapping_add(1) as usize] as u16;
        (hi << 8) | lo
    }

    /// Cached RGB value for a 6-bit palette index.
    #[inline]
    pub(crate) fn palette_color(&self, index: u8) -> u32 {
        self.palette[(index & 63) as usize]
    }

    pub(crate) fn refresh_palette(&mut self) {
        for (out, &c) in self.palette.iter_mut().zip(self.cram.iter()) {
            *out = expand_color(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_expansion_shifts_each_nibble() {
        // 0x0BGR -> 0x00RRGGBB with nibble << 4
        assert_eq!(expand_color(0x0F00), 0x0000_00F0);
        assert_eq!(expand_color(0x00F0), 0x0000_F000);
        assert_eq!(expand_color(0x000F), 0x00F0_0000);
        assert_eq!(expand_color(0x0123), 0x0030_2010);
    }

    #[test]
    fn rgba_conversion_is_opaque() {
        let mut out = [0u8; 8];
        to_rgba(&[0x00_12_34_56, 0x00_F0_00_0F], &mut out);
        assert_eq!(out, [0x12, 0x34, 0x56, 0xFF, 0xF0, 0x00, 0x0F, 0xFF]);
    }

    #[test]
    fn mode_background_row() {
        let m = Mode::from_bits_retain(0x0030 | Mode::TXTBUF.bits());
        assert_eq!(m.background(), 0x30);
        assert!(m.contains(Mode::TXTBUF));
        assert!(!m.intersects(Mode::DIRTY));
    }
}
