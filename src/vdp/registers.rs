#![doc = r#"
VDP command protocol

Purpose
- Device-port semantics of the VDP: the two-phase write protocol on the
  command word at 0x0C..0x0D and the single-phase read protocol.

Write side (handler at 0x0D)
- COMMAND == 0: the written word is latched into COMMAND and nothing else
  happens.
- COMMAND != 0: the written word is the operand. The low 5 bits of COMMAND
  select the operation, its high byte is the parameter `p` (usually a
  register or palette index in `p & 15` / `p & 63` and a second register
  index in `p >> 4`). One dirty bit is set in MODE according to the memory
  the selector group targets, then COMMAND returns to 0.

Read side (handler at 0x0C)
- No latch phase: the low 4 bits of whatever COMMAND holds select register,
  palette or VRAM-word peek. The result is stored big-endian at 0x0C..0x0D,
  COMMAND returns to 0 and the byte at 0x0C is returned.

Notes
- Inherent methods on `Vdp`; the machine routes the two ports here.
"#]

use super::memory::{circ_copy, circ_fill};
use super::{CGRAM_SIZE, CRAM_SIZE, Mode, REG_COUNT, Vdp, reg};
use crate::bus::{DeviceBus, Ram};

/// Dirty bit for a write selector; `None` for selectors that do nothing.
fn dirty_bit(selector: u16) -> Option<Mode> {
    match selector {
        0x00..=0x03 => Some(Mode::REGS_W),
        0x04..=0x07 => Some(Mode::CRAM_W),
        0x08..=0x0F => Some(Mode::VRAM_W),
        0x10 => Some(Mode::CGRAM_W),
        _ => None,
    }
}

impl Vdp {
    /// Write handler. `port` is the low byte of the command word.
    pub(crate) fn write_command(&mut self, bus: &mut DeviceBus, ram: &Ram, port: u8) {
        let value = bus.field_ending_at(port);
        let command = self.regs[reg::COMMAND];

        if command == 0 {
            self.regs[reg::COMMAND] = value;
            return;
        }

        let p = (command >> 8) as usize;
        let selector = command & 31;
        // Selectors 1/2, 5/6, 9/A, D/E pick a single byte of the operand:
        // odd low bit -> low byte, even -> high byte.
        let byte = if command & 1 != 0 { value as u8 } else { (value >> 8) as u8 };
        let r_lo = p & (REG_COUNT - 1);
        let r_hi = p >> 4;

        log::trace!("vdp: cmd={command:#06x} sel={selector:#04x} p={p:#04x} operand={value:#06x}");

        match selector {
            0x00 => self.regs[r_lo] = 0,
            0x01 | 0x02 => self.regs[r_lo] = byte as u16,
            0x03 => self.regs[r_lo] = value,

            0x04 => self.cram[p & (CRAM_SIZE - 1)] = 0,
            0x05 | 0x06 => self.cram[p & (CRAM_SIZE - 1)] = byte as u16,
            0x07 => self.cram[p & (CRAM_SIZE - 1)] = value,

            0x08 => self.vram[value as usize] = 0,
            0x09 | 0x0A => {
                let addr = self.regs[r_lo];
                self.vram[addr as usize] = byte;
            }
            0x0B => {
                let (dst, src) = (self.regs[r_lo] as usize, self.regs[r_hi] as usize);
                circ_copy(&mut self.vram[..], dst, ram.as_slice(), src, value as usize);
            }

            0x0C => {
                let dst = self.regs[r_lo] as usize;
                circ_fill(&mut self.vram[..], dst, 0, value as usize);
            }
            0x0D | 0x0E => {
                let (dst, n) = (self.regs[r_lo] as usize, self.regs[r_hi] as usize);
                circ_fill(&mut self.vram[..], dst, byte, n);
            }
            0x0F => {
                let (dst, n) = (self.regs[r_lo] as usize, self.regs[r_hi] as usize);
                circ_copy(&mut self.vram[..], dst, &value.to_be_bytes(), 0, n);
            }

            0x10 => circ_copy(&mut self.cgram[..], 0, ram.as_slice(), value as usize, CGRAM_SIZE),

            _ => {}
        }

        if let Some(bit) = dirty_bit(selector) {
            let mode = self.mode() | bit;
            self.set_mode(mode);
        }
        self.regs[reg::COMMAND] = 0;
    }

    /// Read handler. `port` is the high byte of the command word.
    pub(crate) fn read_command(&mut self, bus: &mut DeviceBus, port: u8) -> u8 {
        let command = self.regs[reg::COMMAND];
        let p = (command >> 8) as usize;

        let data = match command & 15 {
            0x00 => self.regs[p & (REG_COUNT - 1)],
            0x01 => self.cram[p & (CRAM_SIZE - 1)],
            0x02 => self.vram_word(self.regs[p & (REG_COUNT - 1)]),
            _ => 0,
        };
        log::trace!("vdp: read cmd={command:#06x} -> {data:#06x}");

        bus.set_field_starting_at(port, data);
        self.regs[reg::COMMAND] = 0;
        bus.reg(port)
    }
}
