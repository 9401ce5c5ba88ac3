//! Stack pointer device on ports 0x04 (working) and 0x05 (return).
//!
//! Reads return the live pointer; writes move it immediately, including for
//! the evaluator invocation that issued the write.

use std::any::Any;

use super::{RST_PORT, WST_PORT};
use crate::bus::{Device, PortView};
use crate::cpu::StackId;

#[derive(Debug, Default)]
pub struct StackPointers;

fn stack_for(port: u8) -> Option<StackId> {
    match port {
        WST_PORT => Some(StackId::Working),
        RST_PORT => Some(StackId::Return),
        _ => None,
    }
}

impl Device for StackPointers {
    fn name(&self) -> &'static str {
        "stack"
    }

    fn on_read(&mut self, view: &mut PortView<'_>) -> u8 {
        match stack_for(view.port()) {
            Some(id) => view.machine().stack_ptr(id),
            None => view.byte(),
        }
    }

    fn on_write(&mut self, view: &mut PortView<'_>) {
        if let Some(id) = stack_for(view.port()) {
            let ptr = view.byte();
            view.machine().set_stack_ptr(id, ptr);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MachineConfig;
    use crate::machine::Machine;
    use crate::test_utils::ops;

    #[test]
    fn reads_live_pointer() {
        // LIT 1 LIT 2 LIT 3 LIT 04 DEI BRK: three bytes below the read.
        let mut vm = Machine::with_default_devices(MachineConfig::default(), None);
        vm.load(0x0100, &[ops::LIT, 1, ops::LIT, 2, ops::LIT, 3, ops::LIT, 0x04, ops::DEI, ops::BRK]);
        vm.run(0x0100);
        assert_eq!(vm.stacks().working().window(4), vec![1, 2, 3, 3]);
    }

    #[test]
    fn write_moves_running_pointer() {
        // Push two bytes, then set the working pointer to 0 via DEO.
        let mut vm = Machine::with_default_devices(MachineConfig::default(), None);
        vm.load(
            0x0100,
            &[ops::LIT, 9, ops::LIT, 9, ops::LIT, 0, ops::LIT, 0x04, ops::DEO, ops::BRK],
        );
        vm.run(0x0100);
        assert_eq!(vm.stacks().working().ptr(), 0);
    }

    #[test]
    fn return_pointer_port() {
        let mut vm = Machine::with_default_devices(MachineConfig::default(), None);
        vm.deo(0x05, 0x42);
        assert_eq!(vm.stacks().ret().ptr(), 0x42);
        assert_eq!(vm.dei(0x05), 0x42);
    }
}
