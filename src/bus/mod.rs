#![doc = r#"
Bus module: the device-register file and its dispatch tables.

Overview
- The console talks to its devices through a flat 256-byte register file.
  `DEO` stores a byte at a port and `DEI` reads one back.
- Two 256-slot dispatch tables, one for reads and one for writes, map a port
  to an optional `Handler`. An empty slot means plain storage: reads return
  the stored byte, writes only store it.
- A device "owns" a run of ports by convention only. Nothing prevents two
  devices from mapping overlapping ranges.

Modules and responsibilities
- ram: 64 KiB main memory (`Ram`).
- interfaces: `Device` trait and `PortView`, the positioned view a handler receives.
- tests: bus-level integration tests (dispatch, re-entrancy, reserved ports).

Dispatch itself lives on `Machine` (`Machine::dei` / `Machine::deo`), because
handlers need the whole machine: main memory, the stacks, and the evaluator.
This type only owns the storage and the tables.

Registration is expected once at startup, before evaluation begins.
"#]

pub mod interfaces;
pub mod ram;

#[cfg(test)]
mod tests;

pub use interfaces::{Device, PortView};
pub use ram::{RAM_SIZE, Ram};

/// Number of device ports.
pub const PORT_COUNT: usize = 0x100;

/// Index of a device attached to the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(usize);

impl DeviceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a mapped port dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// The built-in video display processor.
    Vdp,
    /// An attached external device.
    Device(DeviceId),
}

struct DeviceSlot {
    name: &'static str,
    // `None` while the device's own handler is running.
    device: Option<Box<dyn Device>>,
}

/// Register file, read/write dispatch tables and attached devices.
pub struct DeviceBus {
    regs: [u8; PORT_COUNT],
    reads: [Option<Handler>; PORT_COUNT],
    writes: [Option<Handler>; PORT_COUNT],
    devices: Vec<DeviceSlot>,
}

impl Default for DeviceBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.devices.iter().map(|s| s.name).collect();
        f.debug_struct("DeviceBus")
            .field("devices", &names)
            .finish_non_exhaustive()
    }
}

impl DeviceBus {
    pub fn new() -> Self {
        Self {
            regs: [0; PORT_COUNT],
            reads: [None; PORT_COUNT],
            writes: [None; PORT_COUNT],
            devices: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Register file
    // ---------------------------------------------------------------------

    #[inline]
    pub fn reg(&self, port: u8) -> u8 {
        self.regs[port as usize]
    }

    #[inline]
    pub fn set_reg(&mut self, port: u8, v: u8) {
        self.regs[port as usize] = v;
    }

    /// Big-endian 16-bit value stored at `port - 1` (high) and `port` (low).
    #[inline]
    pub fn field_ending_at(&self, port: u8) -> u16 {
        let hi = self.reg(port.wrapping_sub(1)) as u16;
        let lo = self.reg(port) as u16;
        (hi << 8) | lo
    }

    /// Store `v` big-endian at `port` (high) and `port + 1` (low).
    #[inline]
    pub fn set_field_starting_at(&mut self, port: u8, v: u16) {
        self.set_reg(port, (v >> 8) as u8);
        self.set_reg(port.wrapping_add(1), v as u8);
    }

    // ---------------------------------------------------------------------
    // Dispatch tables
    // ---------------------------------------------------------------------

    #[inline]
    pub fn read_handler(&self, port: u8) -> Option<Handler> {
        self.reads[port as usize]
    }

    #[inline]
    pub fn write_handler(&self, port: u8) -> Option<Handler> {
        self.writes[port as usize]
    }

    pub fn map_read(&mut self, port: u8, handler: Handler) {
        log::debug!("bus: read port {port:#04x} -> {}", self.handler_name(handler));
        self.reads[port as usize] = Some(handler);
    }

    pub fn map_write(&mut self, port: u8, handler: Handler) {
        log::debug!("bus: write port {port:#04x} -> {}", self.handler_name(handler));
        self.writes[port as usize] = Some(handler);
    }

    // ---------------------------------------------------------------------
    // Devices
    // ---------------------------------------------------------------------

    pub fn attach(&mut self, device: Box<dyn Device>) -> DeviceId {
        let id = DeviceId(self.devices.len());
        self.devices.push(DeviceSlot {
            name: device.name(),
            device: Some(device),
        });
        id
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Detach a device for the duration of one of its handlers.
    #[inline]
    pub(crate) fn take_device(&mut self, id: DeviceId) -> Option<Box<dyn Device>> {
        self.devices.get_mut(id.0).and_then(|s| s.device.take())
    }

    #[inline]
    pub(crate) fn restore_device(&mut self, id: DeviceId, device: Box<dyn Device>) {
        if let Some(slot) = self.devices.get_mut(id.0) {
            slot.device = Some(device);
        }
    }

    pub(crate) fn device_mut(&mut self, id: DeviceId) -> Option<&mut Box<dyn Device>> {
        self.devices.get_mut(id.0).and_then(|s| s.device.as_mut())
    }

    pub fn handler_name(&self, handler: Handler) -> &'static str {
        match handler {
            Handler::Vdp => "vdp",
            Handler::Device(id) => self.devices.get(id.0).map_or("?", |s| s.name),
        }
    }
}
