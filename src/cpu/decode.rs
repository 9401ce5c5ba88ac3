/*!
decode.rs - Opcode byte decoding.

Overview
========
An opcode byte packs one of 32 base operations and three mode flags:

```text
bit  7   6   5   4..0
     k   r   2   base operation
```

  * `2` (short mode): operands and results are 16-bit instead of 8-bit.
  * `r` (return mode): the return stack is the active stack.
  * `k` (keep mode): operands are read but stay on the stack.

Rather than enumerating all 256 combinations, `decode` splits the byte into
an `Opcode` carrying the three flags and a `BaseOp`; the evaluator then
matches once over 32 operations parameterized by those flags.

Base operation 0 does not follow the stack-operand pattern. Its flags select
one of the immediate forms instead (see `Immediate`).
*/

use crate::cpu::state::StackId;

pub const SHORT_MODE: u8 = 0x20;
pub const RETURN_MODE: u8 = 0x40;
pub const KEEP_MODE: u8 = 0x80;

/// The 32 base operations selected by the low five opcode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseOp {
    Immediate,
    Inc,
    Pop,
    Nip,
    Swp,
    Rot,
    Dup,
    Ovr,
    Equ,
    Neq,
    Gth,
    Lth,
    Jmp,
    Jcn,
    Jsr,
    Sth,
    Ldz,
    Stz,
    Ldr,
    Str,
    Lda,
    Sta,
    Dei,
    Deo,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Ora,
    Eor,
    Sft,
}

const BASE_OPS: [BaseOp; 32] = [
    BaseOp::Immediate,
    BaseOp::Inc,
    BaseOp::Pop,
    BaseOp::Nip,
    BaseOp::Swp,
    BaseOp::Rot,
    BaseOp::Dup,
    BaseOp::Ovr,
    BaseOp::Equ,
    BaseOp::Neq,
    BaseOp::Gth,
    BaseOp::Lth,
    BaseOp::Jmp,
    BaseOp::Jcn,
    BaseOp::Jsr,
    BaseOp::Sth,
    BaseOp::Ldz,
    BaseOp::Stz,
    BaseOp::Ldr,
    BaseOp::Str,
    BaseOp::Lda,
    BaseOp::Sta,
    BaseOp::Dei,
    BaseOp::Deo,
    BaseOp::Add,
    BaseOp::Sub,
    BaseOp::Mul,
    BaseOp::Div,
    BaseOp::And,
    BaseOp::Ora,
    BaseOp::Eor,
    BaseOp::Sft,
];

impl BaseOp {
    #[inline]
    pub fn from_index(index: u8) -> Self {
        BASE_OPS[(index & 0x1F) as usize]
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BaseOp::Immediate => "LIT",
            BaseOp::Inc => "INC",
            BaseOp::Pop => "POP",
            BaseOp::Nip => "NIP",
            BaseOp::Swp => "SWP",
            BaseOp::Rot => "ROT",
            BaseOp::Dup => "DUP",
            BaseOp::Ovr => "OVR",
            BaseOp::Equ => "EQU",
            BaseOp::Neq => "NEQ",
            BaseOp::Gth => "GTH",
            BaseOp::Lth => "LTH",
            BaseOp::Jmp => "JMP",
            BaseOp::Jcn => "JCN",
            BaseOp::Jsr => "JSR",
            BaseOp::Sth => "STH",
            BaseOp::Ldz => "LDZ",
            BaseOp::Stz => "STZ",
            BaseOp::Ldr => "LDR",
            BaseOp::Str => "STR",
            BaseOp::Lda => "LDA",
            BaseOp::Sta => "STA",
            BaseOp::Dei => "DEI",
            BaseOp::Deo => "DEO",
            BaseOp::Add => "ADD",
            BaseOp::Sub => "SUB",
            BaseOp::Mul => "MUL",
            BaseOp::Div => "DIV",
            BaseOp::And => "AND",
            BaseOp::Ora => "ORA",
            BaseOp::Eor => "EOR",
            BaseOp::Sft => "SFT",
        }
    }
}

/// Forms of base operation 0, chosen by the mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Immediate {
    /// 0x00: stop the current invocation.
    Halt,
    /// 0x20: pop a byte; jump by the 16-bit immediate if it is non-zero.
    JumpIf,
    /// 0x40: jump by the 16-bit immediate.
    Jump,
    /// 0x60: push the return address on the return stack, then jump.
    Call,
    /// 0x80 / 0xA0 / 0xC0 / 0xE0: push 1 or 2 immediate bytes.
    Literal,
}

/// A decoded opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub raw: u8,
    pub op: BaseOp,
    pub short: bool,
    pub stack: StackId,
    pub keep: bool,
}

impl Opcode {
    /// Immediate form, meaningful only when `op == BaseOp::Immediate`.
    #[inline]
    pub fn immediate(&self) -> Immediate {
        match (self.keep, self.stack, self.short) {
            (true, _, _) => Immediate::Literal,
            (false, StackId::Working, false) => Immediate::Halt,
            (false, StackId::Working, true) => Immediate::JumpIf,
            (false, StackId::Return, false) => Immediate::Jump,
            (false, StackId::Return, true) => Immediate::Call,
        }
    }

    /// Assembler-style name, e.g. `ADD2kr`, `JSI`, `LIT2r`.
    pub fn mnemonic(&self) -> String {
        if self.op == BaseOp::Immediate {
            match self.immediate() {
                Immediate::Halt => return "BRK".to_string(),
                Immediate::JumpIf => return "JCI".to_string(),
                Immediate::Jump => return "JMI".to_string(),
                Immediate::Call => return "JSI".to_string(),
                Immediate::Literal => {}
            }
        }
        let mut name = String::from(self.op.mnemonic());
        if self.short {
            name.push('2');
        }
        // LIT is always keep-mode; the `k` is implied.
        if self.keep && self.op != BaseOp::Immediate {
            name.push('k');
        }
        if self.stack == StackId::Return {
            name.push('r');
        }
        name
    }
}

/// Split an opcode byte into its base operation and mode flags.
#[inline]
pub fn decode(byte: u8) -> Opcode {
    Opcode {
        raw: byte,
        op: BaseOp::from_index(byte),
        short: byte & SHORT_MODE != 0,
        stack: if byte & RETURN_MODE != 0 {
            StackId::Return
        } else {
            StackId::Working
        },
        keep: byte & KEEP_MODE != 0,
    }
}
