use std::any::Any;

use crate::bus::{Device, Handler, PortView};
use crate::config::MachineConfig;
use crate::cpu::{RunOutcome, StackId};
use crate::machine::Machine;
use crate::test_utils::ops::*;
use crate::test_utils::{deo2, machine_with_program};

/// Runs the evaluator at the 16-bit field ending at its port.
struct Vectored {
    calls: usize,
}

impl Device for Vectored {
    fn name(&self) -> &'static str {
        "vectored"
    }

    fn on_write(&mut self, view: &mut PortView<'_>) {
        self.calls += 1;
        let vector = view.field();
        view.machine().run(vector);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Writes back to its own port from inside the handler.
struct Loopback {
    writes: usize,
    seen: Vec<u8>,
}

impl Device for Loopback {
    fn name(&self) -> &'static str {
        "loopback"
    }

    fn on_write(&mut self, view: &mut PortView<'_>) {
        self.writes += 1;
        self.seen.push(view.byte());
        let port = view.port();
        view.machine().deo(port, 0x77);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn handler_reentry_shares_the_stacks() {
    let mut program = vec![LIT, 0x11];
    program.extend(deo2(0x30, 0x0200));
    program.push(BRK);
    let mut vm = machine_with_program(0x0100, &program);
    vm.load(0x0200, &[LIT, 0x55, BRK]);
    let id = vm.attach_device(Box::new(Vectored { calls: 0 }));
    vm.register_write(0x30, id);

    assert_eq!(vm.run(0x0100), RunOutcome::Halted);
    // The nested run pushed onto the same working stack the outer run uses.
    assert_eq!(vm.stacks().working().window(2), vec![0x11, 0x55]);
    assert_eq!(vm.device_mut::<Vectored>(id).map(|d| d.calls), Some(1));
}

#[test]
fn busy_device_falls_back_to_storage() {
    let mut vm = Machine::default();
    let id = vm.attach_device(Box::new(Loopback { writes: 0, seen: Vec::new() }));
    vm.register_write(0x40, id);

    vm.deo(0x40, 0x12);
    assert_eq!(vm.bus().reg(0x40), 0x77);

    // Restored after the handler returns, so the next write dispatches again.
    vm.deo(0x40, 0x34);
    let dev = vm.device_mut::<Loopback>(id).map(|d| (d.writes, d.seen.clone()));
    assert_eq!(dev, Some((2, vec![0x12, 0x34])));
}

#[test]
fn unregistered_ports_are_storage_for_programs() {
    // LIT 99 LIT 50 DEO  LIT 50 DEI BRK
    let mut vm = machine_with_program(0x0100, &[LIT, 0x99, LIT, 0x50, DEO, LIT, 0x50, DEI, BRK]);
    assert_eq!(vm.run(0x0100), RunOutcome::Halted);
    assert_eq!(vm.stacks().working().window(1), vec![0x99]);
    assert_eq!(vm.stack_ptr(StackId::Working), 1);
}

#[test]
fn default_map_routes_vdp_ports() {
    let vm = Machine::with_default_devices(MachineConfig::default(), None);
    assert_eq!(vm.bus().read_handler(0x0C), Some(Handler::Vdp));
    assert_eq!(vm.bus().write_handler(0x0D), Some(Handler::Vdp));
    assert_eq!(vm.bus().read_handler(0x0D), None);
    assert_eq!(vm.bus().write_handler(0x0C), None);
    assert!(matches!(vm.bus().read_handler(0x04), Some(Handler::Device(_))));
}

#[test]
fn bare_machine_leaves_vdp_ports_unrouted() {
    let vm = Machine::default();
    assert_eq!(vm.bus().read_handler(0x0C), None);
    assert_eq!(vm.bus().write_handler(0x0D), None);
}

#[test]
fn program_reads_its_own_stack_pointer() {
    let mut vm = Machine::with_default_devices(MachineConfig::default().with_step_limit(1000), None);
    vm.load(0x0100, &[LIT, 0x01, LIT, 0x02, LIT, 0x04, DEI, BRK]);
    assert_eq!(vm.run(0x0100), RunOutcome::Halted);
    // DEI sees the pointer after its port operand was popped.
    assert_eq!(vm.stacks().working().window(3), vec![0x01, 0x02, 0x02]);
}

#[test]
fn controller_vector_set_by_program_handles_press() {
    let mut vm = Machine::with_default_devices(MachineConfig::default().with_step_limit(1000), None);
    let mut program = deo2(0x0B, 0x0300);
    program.push(BRK);
    vm.load(0x0100, &program);
    vm.load(0x0300, &[LIT, 0x0A, DEI, BRK]);
    assert_eq!(vm.run(0x0100), RunOutcome::Halted);

    vm.press(0x83);
    assert_eq!(vm.stacks().working().window(1), vec![0x83]);
    assert_eq!(vm.bus().reg(0x0A), 0x83);
}

#[test]
fn zeroed_memory_halts_immediately() {
    let mut vm = Machine::default();
    assert_eq!(vm.run(0x0000), RunOutcome::Halted);
    assert_eq!(vm.stack_ptr(StackId::Working), 0);
    assert_eq!(vm.stack_ptr(StackId::Return), 0);
}
