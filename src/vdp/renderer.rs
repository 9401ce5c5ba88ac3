#![doc = r#"
VDP renderer module

Responsibilities
- Runs the V-blank vector, decides whether the frame needs redrawing at all,
  and scans the 320x224 grid row by row.
- At the start of each row: rebuilds the visible-sprite cache, runs the
  H-blank vector on its trigger line, refreshes the palette cache if CRAM is
  dirty, then clears the dirty bits.
- Per pixel: the text layer short-circuits everything; otherwise sprite,
  plane A and plane B samples are resolved by priority.

Notes
- When no dirty bit is set after the V-blank vector, the buffer is left
  untouched and the previous frame stands.
- Dirty bits are cleared per row, so a palette write made by the H-blank
  vector takes effect from that row on.
- A text-layer pixel is the background colour, bitwise inverted once for a
  cell with bit 7 set and once more for a set glyph bit.
"#]

use super::sprite::LayerPixel;
use super::{HEIGHT, Mode, PlaneId, Vdp, WIDTH, reg};
use crate::machine::Machine;

/// Render one frame into `buffer`. Pixels beyond `buffer.len()` are skipped.
pub(crate) fn render(vm: &mut Machine, buffer: &mut [u32]) {
    if vm.vdp().mode().contains(Mode::VBLANK) {
        let vector = vm.vdp().reg(reg::VBLANK);
        vm.run(vector);
    }

    let mode = vm.vdp().mode();
    if !mode.intersects(Mode::DIRTY) {
        return;
    }
    vm.vdp_mut().set_mode(mode | Mode::CRAM_W);

    for (y, row) in buffer.chunks_mut(WIDTH).take(HEIGHT).enumerate() {
        let y = y as u16;
        begin_row(vm, y);

        let vdp = vm.vdp();
        for (x, out) in row.iter_mut().enumerate() {
            *out = vdp.pixel(x as u16, y);
        }
    }
}

/// Row prologue: sprite cache, H-blank vector, palette refresh, dirty reset.
fn begin_row(vm: &mut Machine, y: u16) {
    let vdp = vm.vdp_mut();
    if vdp.mode().contains(Mode::SPRITES) {
        vdp.collect_row_sprites(y);
    } else {
        vdp.row_sprite_count = 0;
    }

    let mode = vm.vdp().mode();
    if mode.contains(Mode::HBLANK) && y == vm.vdp().reg(reg::HBLANK_Y) {
        let vector = vm.vdp().reg(reg::HBLANK);
        vm.run(vector);
    }

    let vdp = vm.vdp_mut();
    let mode = vdp.mode();
    if mode.contains(Mode::CRAM_W) {
        vdp.refresh_palette();
    }
    vdp.set_mode(mode - Mode::DIRTY);
}

impl Vdp {
    /// Final colour of one pixel.
    pub(crate) fn pixel(&self, x: u16, y: u16) -> u32 {
        let mode = self.mode();

        if mode.contains(Mode::TXTBUF) {
            if let Some(c) = self.text_pixel(mode, x, y) {
                return c;
            }
        }

        let index = self.resolve_layers(mode, x, y);
        self.palette_color(index)
    }

    /// Text layer colour, or `None` if the cell is empty.
    fn text_pixel(&self, mode: Mode, x: u16, y: u16) -> Option<u32> {
        let cell = self.regs[reg::TXTBUF]
            .wrapping_add(x >> 3)
            .wrapping_add((WIDTH as u16 >> 3) * (y >> 3));
        let ch = self.vram[cell as usize];
        if ch == 0 {
            return None;
        }

        let mut color = self.palette_color(mode.background());
        if ch & 0x80 != 0 {
            color = !color;
        }
        let glyph = self.cgram[(((ch & 0x7F) as usize) << 3) + (y & 7) as usize];
        if (glyph >> (7 - (x & 7))) & 1 != 0 {
            color = !color;
        }
        Some(color)
    }

    /// Palette index after sprite / plane priority resolution.
    fn resolve_layers(&self, mode: Mode, x: u16, y: u16) -> u8 {
        let sprite = if mode.contains(Mode::SPRITES) {
            self.sprite_pixel(x, y)
        } else {
            None
        };
        if let Some(LayerPixel { color, priority: true }) = sprite {
            return color;
        }

        let plane_a = if mode.contains(Mode::PLANE_A) {
            self.plane_pixel(PlaneId::A, x, y)
        } else {
            None
        };
        if let Some(LayerPixel { color, priority: true }) = plane_a {
            return color;
        }

        let plane_b = if mode.contains(Mode::PLANE_B) {
            self.plane_pixel(PlaneId::B, x, y)
        } else {
            None
        };
        if let Some(LayerPixel { color, priority: true }) = plane_b {
            return color;
        }

        sprite
            .or(plane_a)
            .or(plane_b)
            .map_or(mode.background(), |p| p.color)
    }
}
