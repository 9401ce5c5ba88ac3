//! Shared test utilities for building tiny programs and ROM images.
//!
//! These helpers de-duplicate program construction across tests in the
//! CPU, bus, device and VDP modules. They support just what the test suite
//! needs: hand-assembled byte programs, a VDP command sequence builder and
//! a minimal headered ROM image.
//!
//! Opcode byte layout used by `ops`:
//! - low 5 bits = base operation
//! - `SHORT` (0x20) = 16-bit operands
//! - `RETURN` (0x40) = return stack is active
//! - `KEEP` (0x80) = operands stay on the stack

#![allow(dead_code)]

use crate::config::MachineConfig;
use crate::machine::Machine;

/// Opcode bytes for hand-assembled test programs.
pub mod ops {
    pub const SHORT: u8 = 0x20;
    pub const RETURN: u8 = 0x40;
    pub const KEEP: u8 = 0x80;

    pub const BRK: u8 = 0x00;
    pub const JCI: u8 = 0x20;
    pub const JMI: u8 = 0x40;
    pub const JSI: u8 = 0x60;
    pub const LIT: u8 = 0x80;
    pub const LIT2: u8 = 0xA0;
    pub const LITR: u8 = 0xC0;
    pub const LIT2R: u8 = 0xE0;

    pub const INC: u8 = 0x01;
    pub const POP: u8 = 0x02;
    pub const NIP: u8 = 0x03;
    pub const SWP: u8 = 0x04;
    pub const ROT: u8 = 0x05;
    pub const DUP: u8 = 0x06;
    pub const OVR: u8 = 0x07;
    pub const EQU: u8 = 0x08;
    pub const NEQ: u8 = 0x09;
    pub const GTH: u8 = 0x0A;
    pub const LTH: u8 = 0x0B;
    pub const JMP: u8 = 0x0C;
    pub const JCN: u8 = 0x0D;
    pub const JSR: u8 = 0x0E;
    pub const STH: u8 = 0x0F;
    pub const LDZ: u8 = 0x10;
    pub const STZ: u8 = 0x11;
    pub const LDR: u8 = 0x12;
    pub const STR: u8 = 0x13;
    pub const LDA: u8 = 0x14;
    pub const STA: u8 = 0x15;
    pub const DEI: u8 = 0x16;
    pub const DEO: u8 = 0x17;
    pub const ADD: u8 = 0x18;
    pub const SUB: u8 = 0x19;
    pub const MUL: u8 = 0x1A;
    pub const DIV: u8 = 0x1B;
    pub const AND: u8 = 0x1C;
    pub const ORA: u8 = 0x1D;
    pub const EOR: u8 = 0x1E;
    pub const SFT: u8 = 0x1F;
}

/// A bare machine with `program` loaded at `base`.
pub fn machine_with_program(base: u16, program: &[u8]) -> Machine {
    let mut vm = Machine::new(MachineConfig::default().with_step_limit(100_000));
    vm.load(base, program);
    vm
}

/// Load `program` at 0x0100 on a bare machine, run it, and return the machine.
pub fn exec(program: &[u8]) -> Machine {
    let mut vm = machine_with_program(0x0100, program);
    vm.run(0x0100);
    vm
}

/// Program bytes that write a 16-bit `value` to the device port pair ending
/// at `port` (`LIT2 hi lo LIT port-1 DEO2`).
pub fn deo2(port: u8, value: u16) -> Vec<u8> {
    let [hi, lo] = value.to_be_bytes();
    vec![ops::LIT2, hi, lo, ops::LIT, port.wrapping_sub(1), ops::DEO | ops::SHORT]
}

/// Issue a complete two-phase VDP write command from the host side.
pub fn vdp_command(vm: &mut Machine, command: u16, operand: u16) {
    for word in [command, operand] {
        let [hi, lo] = word.to_be_bytes();
        vm.deo(0x0C, hi);
        vm.deo(0x0D, lo);
    }
}

/// Latch `command` (which must be non-zero and the command register idle),
/// then read the 16-bit result back through the read port.
pub fn vdp_read(vm: &mut Machine, command: u16) -> u16 {
    let [hi, lo] = command.to_be_bytes();
    vm.deo(0x0C, hi);
    vm.deo(0x0D, lo);
    let hi = vm.dei(0x0C) as u16;
    let lo = vm.bus().reg(0x0D) as u16;
    (hi << 8) | lo
}

/// A headerless ROM file image made of `pages` 256-byte pages; page `p`
/// is filled with `p + 1`.
pub fn paged_rom(pages: usize) -> Vec<u8> {
    (0..pages)
        .flat_map(|p| std::iter::repeat_n((p as u8).wrapping_add(1), 256))
        .collect()
}
