/*!
interfaces: the device handler trait and the positioned port view.

A device is anything that wants custom behavior when the CPU touches one of
its ports. It implements `Device` and is attached to the machine once, then
mapped to any number of read and/or write ports. Ports without a mapping
behave as plain storage, so a device only overrides what it needs.

`PortView` is what a handler receives: a cursor positioned at the port that
triggered it, over the 256-byte register file. Multi-byte fields are laid
out big-endian and, by convention, a write handler sits on the *last* byte
of its field, so `field()` reads the 16-bit value ending at the port.

The view also hands out the owning `Machine`. Handlers may read main
memory, poke stack pointers, or call `Machine::run` to dispatch a vector.
The nested evaluation shares stacks and memory with whatever invocation
issued the I/O instruction; there is no isolation.
*/

use std::any::Any;

use crate::machine::Machine;

/// Custom port behavior for one device.
///
/// Both methods default to plain register-file storage, matching an
/// unmapped port.
pub trait Device: Any {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Called when the CPU reads a port mapped to this device. The return
    /// value is what the CPU sees.
    fn on_read(&mut self, view: &mut PortView<'_>) -> u8 {
        view.byte()
    }

    /// Called after the written byte has been stored at the port.
    fn on_write(&mut self, _view: &mut PortView<'_>) {}

    /// Downcast hook so the host can reach concrete device state.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A view into the register file positioned at one port.
pub struct PortView<'a> {
    vm: &'a mut Machine,
    port: u8,
}

impl<'a> PortView<'a> {
    #[inline]
    pub(crate) fn new(vm: &'a mut Machine, port: u8) -> Self {
        Self { vm, port }
    }

    /// The port this view is positioned at.
    #[inline]
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Byte stored at the port.
    #[inline]
    pub fn byte(&self) -> u8 {
        self.vm.bus().reg(self.port)
    }

    #[inline]
    pub fn set_byte(&mut self, v: u8) {
        let port = self.port;
        self.vm.bus_mut().set_reg(port, v);
    }

    /// Big-endian 16-bit field whose low byte is this port.
    #[inline]
    pub fn field(&self) -> u16 {
        self.vm.bus().field_ending_at(self.port)
    }

    /// Store a big-endian 16-bit value starting at this port.
    #[inline]
    pub fn set_field_from_here(&mut self, v: u16) {
        let port = self.port;
        self.vm.bus_mut().set_field_starting_at(port, v);
    }

    /// The machine that owns the register file.
    #[inline]
    pub fn machine(&mut self) -> &mut Machine {
        self.vm
    }
}
