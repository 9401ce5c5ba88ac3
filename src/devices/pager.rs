//! ROM pager on port 0x09.
//!
//! Programs larger than main memory pull pages from the attached ROM image
//! with three consecutive writes to the 16-bit field at 0x08..0x09:
//!
//!   1. source page index (256-byte pages)
//!   2. destination address in main memory
//!   3. byte count; performs the copy and resets to step 1
//!
//! The source starts at `(page << 8) mod rom_len` and wraps at the ROM
//! length; the destination wraps at 64 KiB. Without a ROM the writes are
//! ignored and the sequence does not advance.

use std::any::Any;

use crate::bus::{Device, PortView, RAM_SIZE};
use crate::rom::Rom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Step {
    #[default]
    Source,
    Destination,
    Count,
}

#[derive(Debug, Default)]
pub struct RomPager {
    rom: Option<Rom>,
    step: Step,
    src_page: u16,
    dst: u16,
}

impl RomPager {
    pub fn new(rom: Option<Rom>) -> Self {
        // An empty image has nothing to page from.
        let rom = rom.filter(|r| !r.is_empty());
        Self {
            rom,
            ..Self::default()
        }
    }

    pub fn rom(&self) -> Option<&Rom> {
        self.rom.as_ref()
    }
}

impl Device for RomPager {
    fn name(&self) -> &'static str {
        "rom"
    }

    fn on_write(&mut self, view: &mut PortView<'_>) {
        let Some(rom) = self.rom.as_ref() else {
            return;
        };
        let value = view.field();
        match self.step {
            Step::Source => {
                self.src_page = value;
                self.step = Step::Destination;
            }
            Step::Destination => {
                self.dst = value;
                self.step = Step::Count;
            }
            Step::Count => {
                let bytes = rom.bytes();
                let len = bytes.len();
                let mut src = ((self.src_page as usize) << 8) % len;
                let mut dst = self.dst as usize;
                let mut left = value as usize;
                log::debug!("rom: page {:#06x} -> {:#06x}, {left} bytes", self.src_page, self.dst);

                let ram = view.machine().ram_mut().as_mut_slice();
                while left > 0 {
                    let n = (RAM_SIZE - dst).min(len - src).min(left);
                    ram[dst..dst + n].copy_from_slice(&bytes[src..src + n]);
                    dst = (dst + n) % RAM_SIZE;
                    src = (src + n) % len;
                    left -= n;
                }
                self.step = Step::Source;
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::machine::Machine;
    use crate::test_utils::paged_rom;

    fn page(vm: &mut Machine, src_page: u16, dst: u16, count: u16) {
        for v in [src_page, dst, count] {
            let [hi, lo] = v.to_be_bytes();
            vm.deo(0x08, hi);
            vm.deo(0x09, lo);
        }
    }

    #[test]
    fn copies_a_page_into_memory() {
        let rom = Rom::from_bytes(paged_rom(4));
        let mut vm = Machine::with_default_devices(MachineConfig::default(), Some(rom));
        page(&mut vm, 2, 0x3000, 0x100);
        assert!(vm.ram().as_slice()[0x3000..0x3100].iter().all(|&b| b == 3));
        assert_eq!(vm.ram().read(0x3100), 0);
    }

    #[test]
    fn source_wraps_at_rom_length_and_page_index_wraps() {
        let rom = Rom::from_bytes(paged_rom(2));
        let mut vm = Machine::with_default_devices(MachineConfig::default(), Some(rom));
        // page 3 of a 2-page ROM is page 1; 0x180 bytes runs off the end.
        page(&mut vm, 3, 0x1000, 0x180);
        let ram = vm.ram().as_slice();
        assert!(ram[0x1000..0x1100].iter().all(|&b| b == 2));
        assert!(ram[0x1100..0x1180].iter().all(|&b| b == 1));
        assert_eq!(ram[0x1180], 0);
    }

    #[test]
    fn destination_wraps_at_top_of_memory() {
        let rom = Rom::from_bytes(paged_rom(1));
        let mut vm = Machine::with_default_devices(MachineConfig::default(), Some(rom));
        vm.ram_mut().write(0x0010, 0xEE);
        page(&mut vm, 0, 0xFFF0, 0x20);
        assert_eq!(vm.ram().read(0xFFF0), 1);
        assert_eq!(vm.ram().read(0x000F), 1);
        assert_eq!(vm.ram().read(0x0010), 0xEE);
    }

    #[test]
    fn without_rom_writes_are_ignored() {
        let mut vm = Machine::with_default_devices(MachineConfig::default(), None);
        vm.ram_mut().write(0x2000, 0x77);
        page(&mut vm, 0, 0x2000, 1);
        assert_eq!(vm.ram().read(0x2000), 0x77);
    }
}
