/*!
execute.rs - The evaluator loop and instruction semantics.

Every non-immediate instruction follows one pattern:

  1. take operands from the active stack (1 or 2 bytes each, per short mode)
  2. `commit`: in keep mode, restore the pointer saved before step 1
  3. perform the effect and give results back to the active stack

Keep mode therefore leaves the operands in place underneath any results.
Comparisons always give a single byte. Memory, device and jump effects
happen after `commit`, so a device handler that moves a stack pointer sees
the post-commit pointer.

Nothing here faults. Stack pointers, addresses and program counters all
wrap in their own width.
*/

use crate::cpu::decode::{BaseOp, Immediate, Opcode, decode};
use crate::cpu::state::StackId;
use crate::machine::Machine;

/// How a `run` invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A halt instruction was reached.
    Halted,
    /// The configured step limit was exhausted before a halt.
    RanOff,
}

impl RunOutcome {
    /// Host status code: 0 for halted, 1 for ran off.
    pub fn code(self) -> i32 {
        match self {
            RunOutcome::Halted => 0,
            RunOutcome::RanOff => 1,
        }
    }
}

/// Evaluate from `start` until a halt instruction or the step limit.
pub(crate) fn run(vm: &mut Machine, start: u16) -> RunOutcome {
    let limit = vm.config().step_limit;
    let mut pc = start;
    let mut steps: u64 = 0;

    loop {
        if limit.is_some_and(|l| steps >= l) {
            log::warn!("run({start:#06x}): step limit of {steps} reached at pc={pc:#06x}");
            return RunOutcome::RanOff;
        }
        steps += 1;

        let byte = vm.ram().read(pc);
        let op = decode(byte);
        log::trace!("{pc:04x}  {byte:02x}  {}", op.mnemonic());
        pc = pc.wrapping_add(1);

        if op.op == BaseOp::Immediate {
            match immediate(vm, op, pc) {
                Some(next) => pc = next,
                None => return RunOutcome::Halted,
            }
        } else {
            pc = Exec::new(vm, op).step(pc);
        }
    }
}

/// Execute one of the immediate forms. `None` means halt.
fn immediate(vm: &mut Machine, op: Opcode, pc: u16) -> Option<u16> {
    match op.immediate() {
        Immediate::Halt => None,
        Immediate::JumpIf => {
            let cond = vm.stacks_mut().get_mut(op.stack).pop();
            let disp = vm.ram().read_word(pc);
            let after = pc.wrapping_add(2);
            Some(if cond != 0 { after.wrapping_add(disp) } else { after })
        }
        Immediate::Jump => {
            let disp = vm.ram().read_word(pc);
            Some(pc.wrapping_add(2).wrapping_add(disp))
        }
        Immediate::Call => {
            let disp = vm.ram().read_word(pc);
            let after = pc.wrapping_add(2);
            vm.stacks_mut().get_mut(op.stack).push_word(after);
            Some(after.wrapping_add(disp))
        }
        Immediate::Literal => {
            let len: u16 = if op.short { 2 } else { 1 };
            for i in 0..len {
                let v = vm.ram().read(pc.wrapping_add(i));
                vm.stacks_mut().get_mut(op.stack).push(v);
            }
            Some(pc.wrapping_add(len))
        }
    }
}

/// One general instruction in flight.
struct Exec<'a> {
    vm: &'a mut Machine,
    op: Opcode,
    saved: u8,
}

impl<'a> Exec<'a> {
    fn new(vm: &'a mut Machine, op: Opcode) -> Self {
        let saved = vm.stack_ptr(op.stack);
        Self { vm, op, saved }
    }

    // --- operand plumbing ------------------------------------------------

    /// Pop one operand at the instruction's width.
    #[inline]
    fn take(&mut self) -> u16 {
        if self.op.short {
            self.take_word()
        } else {
            self.take_byte() as u16
        }
    }

    #[inline]
    fn take_byte(&mut self) -> u8 {
        self.vm.stacks_mut().get_mut(self.op.stack).pop()
    }

    #[inline]
    fn take_word(&mut self) -> u16 {
        self.vm.stacks_mut().get_mut(self.op.stack).pop_word()
    }

    /// End of the operand phase.
    #[inline]
    fn commit(&mut self) {
        if self.op.keep {
            let saved = self.saved;
            self.vm.set_stack_ptr(self.op.stack, saved);
        }
    }

    /// Push one result at the instruction's width (truncating in byte mode).
    #[inline]
    fn give(&mut self, v: u16) {
        self.give_to(self.op.stack, v);
    }

    #[inline]
    fn give_to(&mut self, id: StackId, v: u16) {
        let stack = self.vm.stacks_mut().get_mut(id);
        if self.op.short {
            stack.push_word(v);
        } else {
            stack.push(v as u8);
        }
    }

    #[inline]
    fn give_byte(&mut self, v: u8) {
        self.vm.stacks_mut().get_mut(self.op.stack).push(v);
    }

    /// Absolute target in short mode, signed byte displacement otherwise.
    #[inline]
    fn jump_target(&self, pc: u16, a: u16) -> u16 {
        if self.op.short {
            a
        } else {
            relative(pc, a as u8)
        }
    }

    // --- memory ----------------------------------------------------------

    fn load(&mut self, addr: u16, mask: u16) -> u16 {
        let ram = self.vm.ram();
        if self.op.short {
            ram.read_word_masked(addr, mask)
        } else {
            ram.read(addr & mask) as u16
        }
    }

    fn store(&mut self, addr: u16, mask: u16, v: u16) {
        let short = self.op.short;
        let ram = self.vm.ram_mut();
        if short {
            ram.write(addr & mask, (v >> 8) as u8);
            ram.write(addr.wrapping_add(1) & mask, v as u8);
        } else {
            ram.write(addr & mask, v as u8);
        }
    }

    // --- dispatch --------------------------------------------------------

    /// Execute the instruction; returns the next program counter.
    fn step(mut self, pc: u16) -> u16 {
        match self.op.op {
            BaseOp::Immediate => pc,

            BaseOp::Inc => {
                let a = self.take();
                self.commit();
                self.give(a.wrapping_add(1));
                pc
            }
            BaseOp::Pop => {
                self.take();
                self.commit();
                pc
            }
            BaseOp::Nip => {
                let x = self.take();
                self.take();
                self.commit();
                self.give(x);
                pc
            }
            BaseOp::Swp => {
                let x = self.take();
                let y = self.take();
                self.commit();
                self.give(x);
                self.give(y);
                pc
            }
            BaseOp::Rot => {
                let x = self.take();
                let y = self.take();
                let z = self.take();
                self.commit();
                self.give(y);
                self.give(x);
                self.give(z);
                pc
            }
            BaseOp::Dup => {
                let x = self.take();
                self.commit();
                self.give(x);
                self.give(x);
                pc
            }
            BaseOp::Ovr => {
                let x = self.take();
                let y = self.take();
                self.commit();
                self.give(y);
                self.give(x);
                self.give(y);
                pc
            }

            BaseOp::Equ | BaseOp::Neq | BaseOp::Gth | BaseOp::Lth => {
                let a = self.take();
                let b = self.take();
                self.commit();
                let r = match self.op.op {
                    BaseOp::Equ => b == a,
                    BaseOp::Neq => b != a,
                    BaseOp::Gth => b > a,
                    _ => b < a,
                };
                self.give_byte(r as u8);
                pc
            }

            BaseOp::Jmp => {
                let a = self.take();
                self.commit();
                self.jump_target(pc, a)
            }
            BaseOp::Jcn => {
                let a = self.take();
                let cond = self.take_byte();
                self.commit();
                if cond != 0 { self.jump_target(pc, a) } else { pc }
            }
            BaseOp::Jsr => {
                let a = self.take();
                self.commit();
                let other = self.op.stack.other();
                self.vm.stacks_mut().get_mut(other).push_word(pc);
                self.jump_target(pc, a)
            }
            BaseOp::Sth => {
                let x = self.take();
                self.commit();
                self.give_to(self.op.stack.other(), x);
                pc
            }

            BaseOp::Ldz => {
                let a = self.take_byte() as u16;
                self.commit();
                let v = self.load(a, 0x00FF);
                self.give(v);
                pc
            }
            BaseOp::Stz => {
                let a = self.take_byte() as u16;
                let y = self.take();
                self.commit();
                self.store(a, 0x00FF, y);
                pc
            }
            BaseOp::Ldr => {
                let a = relative(pc, self.take_byte());
                self.commit();
                let v = self.load(a, 0xFFFF);
                self.give(v);
                pc
            }
            BaseOp::Str => {
                let a = relative(pc, self.take_byte());
                let y = self.take();
                self.commit();
                self.store(a, 0xFFFF, y);
                pc
            }
            BaseOp::Lda => {
                let a = self.take_word();
                self.commit();
                let v = self.load(a, 0xFFFF);
                self.give(v);
                pc
            }
            BaseOp::Sta => {
                let a = self.take_word();
                let y = self.take();
                self.commit();
                self.store(a, 0xFFFF, y);
                pc
            }

            BaseOp::Dei => {
                let port = self.take_byte();
                self.commit();
                let v = if self.op.short {
                    let hi = self.vm.dei(port) as u16;
                    let lo = self.vm.dei(port.wrapping_add(1)) as u16;
                    (hi << 8) | lo
                } else {
                    self.vm.dei(port) as u16
                };
                self.give(v);
                pc
            }
            BaseOp::Deo => {
                let port = self.take_byte();
                let y = self.take();
                self.commit();
                if self.op.short {
                    self.vm.deo(port, (y >> 8) as u8);
                    self.vm.deo(port.wrapping_add(1), y as u8);
                } else {
                    self.vm.deo(port, y as u8);
                }
                pc
            }

            BaseOp::Add
            | BaseOp::Sub
            | BaseOp::Mul
            | BaseOp::Div
            | BaseOp::And
            | BaseOp::Ora
            | BaseOp::Eor => {
                let a = self.take();
                let b = self.take();
                self.commit();
                let r = match self.op.op {
                    BaseOp::Add => b.wrapping_add(a),
                    BaseOp::Sub => b.wrapping_sub(a),
                    BaseOp::Mul => b.wrapping_mul(a),
                    BaseOp::Div => b.checked_div(a).unwrap_or(0),
                    BaseOp::And => b & a,
                    BaseOp::Ora => b | a,
                    _ => b ^ a,
                };
                self.give(r);
                pc
            }
            BaseOp::Sft => {
                let a = self.take_byte() as u32;
                let b = self.take() as u32;
                self.commit();
                self.give(((b >> (a & 0x0F)) << (a >> 4)) as u16);
                pc
            }
        }
    }
}

/// `pc + disp` with `disp` read as a signed byte, wrapping at 64 KiB.
#[inline]
fn relative(pc: u16, disp: u8) -> u16 {
    pc.wrapping_add_signed(disp as i8 as i16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::test_utils::{exec, machine_with_program, ops};
    use proptest::prelude::*;

    fn working(vm: &Machine) -> Vec<u8> {
        let s = vm.stacks().working();
        s.window(s.ptr())
    }

    #[test]
    fn halt_at_zero_leaves_pointers_alone() {
        let mut vm = machine_with_program(0, &[ops::BRK]);
        assert_eq!(vm.run(0), RunOutcome::Halted);
        assert_eq!(vm.stacks().working().ptr(), 0);
        assert_eq!(vm.stacks().ret().ptr(), 0);
    }

    #[test]
    fn run_outcome_codes() {
        assert_eq!(RunOutcome::Halted.code(), 0);
        assert_eq!(RunOutcome::RanOff.code(), 1);
    }

    #[test]
    fn step_limit_reports_ran_off() {
        // JMI -3: jump back onto itself forever.
        let mut vm = Machine::new(MachineConfig::default().with_step_limit(100));
        vm.load(0, &[ops::JMI, 0xFF, 0xFD]);
        assert_eq!(vm.run(0), RunOutcome::RanOff);
    }

    #[test]
    fn literals_and_add() {
        let vm = exec(&[ops::LIT, 0x02, ops::LIT, 0x03, ops::ADD, ops::BRK]);
        assert_eq!(working(&vm), vec![0x05]);
    }

    #[test]
    fn short_mode_words_are_big_endian() {
        let vm = exec(&[ops::LIT2, 0x12, 0x34, ops::LIT2, 0x00, 0x01, ops::ADD | ops::SHORT, ops::BRK]);
        assert_eq!(working(&vm), vec![0x12, 0x35]);
    }

    #[test]
    fn keep_mode_dup_leaves_three_copies() {
        let vm = exec(&[ops::LIT, 0x2A, ops::DUP | ops::KEEP, ops::BRK]);
        assert_eq!(working(&vm), vec![0x2A, 0x2A, 0x2A]);
        let vm = exec(&[ops::LIT, 0x2A, ops::DUP, ops::BRK]);
        assert_eq!(working(&vm), vec![0x2A, 0x2A]);
    }

    #[test]
    fn keep_mode_add_keeps_operands() {
        let vm = exec(&[ops::LIT, 0x02, ops::LIT, 0x03, ops::ADD | ops::KEEP, ops::BRK]);
        assert_eq!(working(&vm), vec![0x02, 0x03, 0x05]);
    }

    #[test]
    fn stack_shuffles() {
        let vm = exec(&[ops::LIT, 1, ops::LIT, 2, ops::LIT, 3, ops::ROT, ops::BRK]);
        assert_eq!(working(&vm), vec![2, 3, 1]);
        let vm = exec(&[ops::LIT, 1, ops::LIT, 2, ops::SWP, ops::BRK]);
        assert_eq!(working(&vm), vec![2, 1]);
        let vm = exec(&[ops::LIT, 1, ops::LIT, 2, ops::OVR, ops::BRK]);
        assert_eq!(working(&vm), vec![1, 2, 1]);
        let vm = exec(&[ops::LIT, 1, ops::LIT, 2, ops::NIP, ops::BRK]);
        assert_eq!(working(&vm), vec![2]);
    }

    #[test]
    fn comparisons_give_one_byte_in_short_mode() {
        let vm = exec(&[ops::LIT2, 0x01, 0x00, ops::LIT2, 0x00, 0xFF, ops::GTH | ops::SHORT, ops::BRK]);
        assert_eq!(working(&vm), vec![1]);
    }

    #[test]
    fn sft_shifts_right_then_left() {
        // 0x34 >> 1 << 2 = 0x68
        let vm = exec(&[ops::LIT, 0x34, ops::LIT, 0x21, ops::SFT, ops::BRK]);
        assert_eq!(working(&vm), vec![0x68]);
        // Byte mode truncates: 0x80 << 1 = 0
        let vm = exec(&[ops::LIT, 0x80, ops::LIT, 0x10, ops::SFT, ops::BRK]);
        assert_eq!(working(&vm), vec![0x00]);
        // Short mode keeps 16 bits; the shift operand is still one byte.
        let vm = exec(&[ops::LIT2, 0x00, 0x80, ops::LIT, 0x10, ops::SFT | ops::SHORT, ops::BRK]);
        assert_eq!(working(&vm), vec![0x01, 0x00]);
    }

    #[test]
    fn jsi_pushes_return_address_on_return_stack() {
        // 0100: JSI +0002 -> 0105 ; 0103: BRK BRK ; 0105: LIT 7 BRK
        let vm = exec(&[ops::JSI, 0x00, 0x02, ops::BRK, ops::BRK, ops::LIT, 7, ops::BRK]);
        assert_eq!(working(&vm), vec![7]);
        assert_eq!(vm.stacks().ret().window(2), vec![0x01, 0x03]);
    }

    #[test]
    fn jci_skips_when_false() {
        // 0100: LIT 0 ; 0102: JCI +1 ; 0105: BRK ; 0106: LIT 9 BRK
        let vm = exec(&[ops::LIT, 0, ops::JCI, 0x00, 0x01, ops::BRK, ops::LIT, 9, ops::BRK]);
        assert_eq!(working(&vm), Vec::<u8>::new());
        let vm = exec(&[ops::LIT, 1, ops::JCI, 0x00, 0x01, ops::BRK, ops::LIT, 9, ops::BRK]);
        assert_eq!(working(&vm), vec![9]);
    }

    #[test]
    fn jsr_and_sth_use_other_stack() {
        let vm = exec(&[ops::LIT, 0x55, ops::STH, ops::BRK]);
        assert_eq!(working(&vm), Vec::<u8>::new());
        assert_eq!(vm.stacks().ret().window(1), vec![0x55]);

        // 0100: LIT 1 ; 0102: JSR (+1) -> 0104 ; 0103: BRK ; 0104: BRK
        let vm = exec(&[ops::LIT, 1, ops::JSR, ops::BRK, ops::BRK]);
        assert_eq!(vm.stacks().ret().window(2), vec![0x01, 0x03]);
    }

    #[test]
    fn zero_page_word_wraps_inside_page() {
        let mut vm = machine_with_program(0x0100, &[ops::LIT, 0xFF, ops::LDZ | ops::SHORT, ops::BRK]);
        vm.ram_mut().write(0x00FF, 0xAB);
        vm.ram_mut().write(0x0000, 0xCD);
        vm.run(0x0100);
        assert_eq!(working(&vm), vec![0xAB, 0xCD]);
    }

    #[test]
    fn absolute_store_then_load() {
        let vm = exec(&[
            ops::LIT2, 0xBE, 0xEF, ops::LIT2, 0x80, 0x00, ops::STA | ops::SHORT,
            ops::LIT2, 0x80, 0x00, ops::LDA | ops::SHORT, ops::BRK,
        ]);
        assert_eq!(working(&vm), vec![0xBE, 0xEF]);
        assert_eq!(vm.ram().read_word(0x8000), 0xBEEF);
    }

    #[test]
    fn nested_run_shares_stacks() {
        // A vector at 0x0200 pushes a byte and halts; calling it from the
        // host mid-program leaves the byte visible to the next invocation.
        let mut vm = machine_with_program(0x0200, &[ops::LIT, 0xEE, ops::BRK]);
        vm.load(0x0100, &[ops::POP, ops::BRK]);
        vm.run(0x0200);
        assert_eq!(vm.stacks().working().ptr(), 1);
        vm.run(0x0100);
        assert_eq!(vm.stacks().working().ptr(), 0);
    }

    proptest! {
        #[test]
        fn division_by_zero_is_zero(a in any::<u8>(), w in any::<u16>()) {
            let vm = exec(&[ops::LIT, a, ops::LIT, 0, ops::DIV, ops::BRK]);
            prop_assert_eq!(working(&vm), vec![0]);
            let [hi, lo] = w.to_be_bytes();
            let vm = exec(&[ops::LIT2, hi, lo, ops::LIT2, 0, 0, ops::DIV | ops::SHORT, ops::BRK]);
            prop_assert_eq!(working(&vm), vec![0, 0]);
        }

        #[test]
        fn relative_store_then_load(disp in any::<i8>(), value in any::<u8>(), base in any::<u16>()) {
            // LIT v LIT d STR  LIT d' LDR  BRK, where d' compensates for the
            // 3-byte advance between the two relative instructions.
            let store_pc = base.wrapping_add(5);
            let target = store_pc.wrapping_add_signed(disp as i16);
            let load_pc = base.wrapping_add(8);
            let back = target.wrapping_sub(load_pc) as i16;
            prop_assume!((-128..=127).contains(&back));
            // Keep the target clear of the program bytes themselves.
            let off = target.wrapping_sub(base);
            prop_assume!(off >= 9);

            let program = [
                ops::LIT, value, ops::LIT, disp as u8, ops::STR,
                ops::LIT, back as i8 as u8, ops::LDR, ops::BRK,
            ];
            let mut vm = machine_with_program(base, &program);
            vm.run(base);
            prop_assert_eq!(vm.ram().read(target), value);
            prop_assert_eq!(working(&vm), vec![value]);
        }
    }
}
