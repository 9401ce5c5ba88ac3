//! Debug device on port 0x0E.
//!
//! Write 1 prints both stacks to the output sink, write 2 blocks until a
//! line arrives on the input source, anything else is ignored. Reads always
//! return 0.
//!
//! Stack dump format, one line per stack:
//!
//! ```text
//! WST 00 00 00 00 00 01 02 03 <03
//! ```
//!
//! The eight bytes below the pointer, oldest first. A `|` after the name
//! marks a pointer of exactly 8, and a `|` after a byte marks index 0xFF,
//! so the stack bottom is visible when the window wraps.

use std::any::Any;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};

use crate::bus::{Device, PortView};
use crate::cpu::Stack;

pub const PRINT_STACKS: u8 = 1;
pub const WAIT_LINE: u8 = 2;

pub struct DebugConsole {
    out: Box<dyn Write>,
    input: Option<Box<dyn BufRead>>,
}

impl std::fmt::Debug for DebugConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugConsole").finish_non_exhaustive()
    }
}

impl DebugConsole {
    /// Dump to stderr, wait on stdin.
    pub fn stdio() -> Self {
        Self {
            out: Box::new(io::stderr()),
            input: Some(Box::new(io::BufReader::new(io::stdin()))),
        }
    }

    /// Custom sinks. With no input source, "wait" returns immediately.
    pub fn with_io(out: Box<dyn Write>, input: Option<Box<dyn BufRead>>) -> Self {
        Self { out, input }
    }
}

/// One dump line for `stack` under `name`.
pub fn format_stack(name: &str, stack: &Stack) -> String {
    let ptr = stack.ptr();
    let mut line = String::with_capacity(40);
    line.push_str(name);
    line.push(if ptr == 8 { '|' } else { ' ' });
    let mut i = ptr.wrapping_sub(8);
    while i != ptr {
        let _ = write!(line, "{:02x}", stack.get(i));
        line.push(if i == 0xFF { '|' } else { ' ' });
        i = i.wrapping_add(1);
    }
    let _ = write!(line, "<{ptr:02x}");
    line
}

impl Device for DebugConsole {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn on_read(&mut self, _view: &mut PortView<'_>) -> u8 {
        0
    }

    fn on_write(&mut self, view: &mut PortView<'_>) {
        match view.byte() {
            PRINT_STACKS => {
                let stacks = view.machine().stacks();
                let wst = format_stack("WST", stacks.working());
                let rst = format_stack("RST", stacks.ret());
                if let Err(e) = writeln!(self.out, "{wst}\n{rst}") {
                    log::warn!("debug: stack dump failed: {e}");
                }
            }
            WAIT_LINE => {
                if let Some(input) = self.input.as_mut() {
                    let mut line = String::new();
                    if let Err(e) = input.read_line(&mut line) {
                        log::warn!("debug: wait failed: {e}");
                    }
                }
            }
            _ => {}
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
