#![doc = r#"
VDP sprites

Sprite attribute list
- A singly-linked list of 8-byte entries in VRAM starting at the SPRITES
  register: four big-endian words.
    word 0 (`attr`): bits 0-10 pattern id, 11 h-flip, 12 v-flip,
                     13-14 palette row, 15 priority
    word 1 (`size`): bits 0-6 link, 8-9 width-1 in cells, 10-11 height-1
    word 2: x (9 bits, 320..511 wraps in from the left)
    word 3: y (8 bits)
- The next entry is at `SPRITES + link * 8`. The walk stops when an entry
  links to itself, or after `MAX_WALK` entries for cyclic lists.
- Pattern id 0 means an empty slot; it is skipped but still followed.

Row cache
- At the start of each row the list is walked once and up to
  `SPRITES_PER_ROW` entries covering that row are cached in list order.

Sampling
- Patterns are 4bpp, column-major by 8x8 cell: cell (cx, cy) of a sprite
  whose pattern is `pat` lives at tile `pat + cx * cells_high + cy`.
- A priority sprite wins immediately. Otherwise the first opaque sprite
  wins, though a later priority sprite can still override it.
"#]

use super::{SPRITES_PER_ROW, Vdp, WIDTH, reg};

/// Entries walked per row before giving up on the list.
pub const MAX_WALK: usize = 320;

/// One cached sprite attribute entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpriteEntry {
    pub attr: u16,
    pub size: u16,
    pub x: u16,
    pub y: u16,
}

impl SpriteEntry {
    #[inline]
    pub fn pattern(&self) -> u16 {
        self.attr & 0x07FF
    }

    #[inline]
    pub fn hflip(&self) -> bool {
        self.attr & 0x0800 != 0
    }

    #[inline]
    pub fn vflip(&self) -> bool {
        self.attr & 0x1000 != 0
    }

    /// Palette row bits already positioned at 0x30.
    #[inline]
    pub fn palette_row(&self) -> u8 {
        ((self.attr >> 9) & 0x30) as u8
    }

    #[inline]
    pub fn priority(&self) -> bool {
        self.attr & 0x8000 != 0
    }

    #[inline]
    pub fn width(&self) -> u16 {
        (((self.size >> 8) & 3) + 1) * 8
    }

    #[inline]
    pub fn height(&self) -> u16 {
        (((self.size >> 10) & 3) + 1) * 8
    }

    #[inline]
    pub fn link(&self) -> u16 {
        self.size & 0x7F
    }
}

/// A sampled layer pixel: a 6-bit palette index and its priority flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerPixel {
    pub color: u8,
    pub priority: bool,
}

impl Vdp {
    fn sprite_at(&self, addr: u16) -> SpriteEntry {
        SpriteEntry {
            attr: self.vram_word(addr),
            size: self.vram_word(addr.wrapping_add(2)),
            x: self.vram_word(addr.wrapping_add(4)) & 511,
            y: self.vram_word(addr.wrapping_add(6)) & 255,
        }
    }

    /// Walk the sprite list and cache the entries that cover row `y`.
    pub(crate) fn collect_row_sprites(&mut self, y: u16) {
        self.row_sprite_count = 0;
        let base = self.regs[reg::SPRITES];
        let mut link = base;

        for _ in 0..MAX_WALK {
            let s = self.sprite_at(link);

            let hidden_x = s.x >= WIDTH as u16 && s.x < 512 - s.width();
            let off_row = (y.wrapping_sub(s.y) as u8) as u16 >= s.height();
            if s.pattern() != 0 && !hidden_x && !off_row {
                self.row_sprites[self.row_sprite_count] = s;
                self.row_sprite_count += 1;
                if self.row_sprite_count == SPRITES_PER_ROW {
                    break;
                }
            }

            let next = base.wrapping_add(s.link() << 3);
            if next == link {
                break;
            }
            link = next;
        }
    }

    /// The cached sprites for the current row.
    pub fn row_sprites(&self) -> &[SpriteEntry] {
        &self.row_sprites[..self.row_sprite_count]
    }

    /// Sprite pixel at (`x`, `y`) from the row cache.
    pub(crate) fn sprite_pixel(&self, x: u16, y: u16) -> Option<LayerPixel> {
        let mut found: Option<LayerPixel> = None;

        for s in self.row_sprites() {
            let mut lx = x.wrapping_sub(s.x) & 511;
            let mut ly = y.wrapping_sub(s.y) & 255;
            let (w, h) = (s.width(), s.height());
            if lx >= w || ly >= h {
                continue;
            }
            if found.is_some() && !s.priority() {
                continue;
            }
            if s.hflip() {
                lx = w - 1 - lx;
            }
            if s.vflip() {
                ly = h - 1 - ly;
            }

            let tile = s.pattern() + (lx >> 3) * (h >> 3) + (ly >> 3);
            let addr = (tile << 5)
                .wrapping_add((ly & 7) << 2)
                .wrapping_add((lx & 7) >> 1);
            let nibble = self.pattern_nibble(addr, lx);
            if nibble == 0 {
                continue;
            }

            let px = LayerPixel {
                color: nibble | s.palette_row(),
                priority: s.priority(),
            };
            if px.priority {
                return Some(px);
            }
            found = Some(px);
        }
        found
    }

    /// 4bpp pixel from a pattern byte; even columns use the high nibble.
    #[inline]
    pub(crate) fn pattern_nibble(&self, addr: u16, column: u16) -> u8 {
        let b = self.vram[addr as usize];
        if column & 1 == 0 { b >> 4 } else { b & 0x0F }
    }
}
