/*!
machine.rs - The owned console aggregate.

Overview
========
`Machine` holds every piece of console state: main memory, both stacks, the
device bus (register file, dispatch tables, attached devices), the VDP and
the host configuration. There is exactly one per emulated console and it is
passed by `&mut` to everything that needs it: the evaluator, device
handlers, and the frame renderer.

Re-entrancy
===========
Device handlers receive the whole machine through `PortView`, so they may
call `Machine::run` to dispatch a vector. The nested invocation shares the
stacks and memory of the invocation that issued the I/O instruction; nothing
is saved or restored around it.

While a device handler runs, that device is detached from the bus. If the
nested evaluation reaches the same device again, the port behaves as plain
storage for that access.
*/

use std::any::Any;

use crate::bus::{DeviceBus, DeviceId, Handler, PortView, RAM_SIZE, Ram};
use crate::config::MachineConfig;
use crate::controller::Controller;
use crate::cpu::{self, RunOutcome, StackId, Stacks};
use crate::devices;
use crate::rom::Rom;
use crate::vdp::{self, Vdp};

/// The console: memory, stacks, device bus and video processor.
#[derive(Debug)]
pub struct Machine {
    ram: Ram,
    stacks: Stacks,
    bus: DeviceBus,
    vdp: Vdp,
    config: MachineConfig,
    controller: Option<DeviceId>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

impl Machine {
    /// A bare machine: zeroed memories, pointers at 0, no handlers mapped.
    pub fn new(config: MachineConfig) -> Self {
        Self {
            ram: Ram::new(),
            stacks: Stacks::new(),
            bus: DeviceBus::new(),
            vdp: Vdp::new(),
            config,
            controller: None,
        }
    }

    /// A machine with the VDP and the standard device map installed.
    pub fn with_default_devices(config: MachineConfig, rom: Option<Rom>) -> Self {
        let mut vm = Self::new(config);
        devices::install_defaults(&mut vm, rom);
        vm
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // State access
    // ---------------------------------------------------------------------

    #[inline]
    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    #[inline]
    pub fn ram_mut(&mut self) -> &mut Ram {
        &mut self.ram
    }

    #[inline]
    pub fn stacks(&self) -> &Stacks {
        &self.stacks
    }

    #[inline]
    pub fn stacks_mut(&mut self) -> &mut Stacks {
        &mut self.stacks
    }

    #[inline]
    pub fn bus(&self) -> &DeviceBus {
        &self.bus
    }

    #[inline]
    pub fn bus_mut(&mut self) -> &mut DeviceBus {
        &mut self.bus
    }

    #[inline]
    pub fn vdp(&self) -> &Vdp {
        &self.vdp
    }

    #[inline]
    pub fn vdp_mut(&mut self) -> &mut Vdp {
        &mut self.vdp
    }

    /// Raw byte copy into main memory, wrapping at 64 KiB.
    pub fn load(&mut self, offset: u16, bytes: &[u8]) {
        log::debug!("load: {} bytes at {offset:#06x}", bytes.len());
        self.ram.load(offset, bytes);
    }

    /// Copy a boot image to address 0 and evaluate from `entry`. Bytes past
    /// the top of memory are left for the ROM pager.
    pub fn boot(&mut self, image: &[u8], entry: u16) -> RunOutcome {
        let len = image.len().min(RAM_SIZE);
        if len < image.len() {
            log::info!("boot: image is {} bytes, loading the first {len}", image.len());
        }
        self.load(0, &image[..len]);
        log::info!("boot: entry {entry:#06x}");
        self.run(entry)
    }

    // ---------------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------------

    /// Evaluate from `address` until a halt instruction (or the configured
    /// step limit). May be called re-entrantly from device handlers.
    pub fn run(&mut self, address: u16) -> RunOutcome {
        cpu::run(self, address)
    }

    /// Render one 320x224 frame into `buffer` (row-major, `0x00RRGGBB`).
    pub fn render(&mut self, buffer: &mut [u32]) {
        vdp::render(self, buffer);
    }

    // ---------------------------------------------------------------------
    // Device bus I/O
    // ---------------------------------------------------------------------

    /// Device read (`DEI`).
    pub fn dei(&mut self, port: u8) -> u8 {
        match self.bus.read_handler(port) {
            None => self.bus.reg(port),
            Some(Handler::Vdp) => self.vdp.read_command(&mut self.bus, port),
            Some(Handler::Device(id)) => match self.bus.take_device(id) {
                Some(mut device) => {
                    let value = device.on_read(&mut PortView::new(self, port));
                    self.bus.restore_device(id, device);
                    value
                }
                None => {
                    log::debug!("dei {port:#04x}: {} busy, raw read", self.bus.handler_name(Handler::Device(id)));
                    self.bus.reg(port)
                }
            },
        }
    }

    /// Device write (`DEO`). The byte is always stored before any handler runs.
    pub fn deo(&mut self, port: u8, value: u8) {
        self.bus.set_reg(port, value);
        match self.bus.write_handler(port) {
            None => {}
            Some(Handler::Vdp) => self.vdp.write_command(&mut self.bus, &self.ram, port),
            Some(Handler::Device(id)) => match self.bus.take_device(id) {
                Some(mut device) => {
                    device.on_write(&mut PortView::new(self, port));
                    self.bus.restore_device(id, device);
                }
                None => {
                    log::debug!("deo {port:#04x}: {} busy, raw write", self.bus.handler_name(Handler::Device(id)));
                }
            },
        }
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    pub fn attach_device(&mut self, device: Box<dyn crate::bus::Device>) -> DeviceId {
        let id = self.bus.attach(device);
        log::debug!("attached {} as device {}", self.bus.handler_name(Handler::Device(id)), id.index());
        id
    }

    pub fn register_read(&mut self, port: u8, id: DeviceId) {
        self.bus.map_read(port, Handler::Device(id));
    }

    pub fn register_write(&mut self, port: u8, id: DeviceId) {
        self.bus.map_write(port, Handler::Device(id));
    }

    /// Route the VDP command ports (read at 0x0C, write at 0x0D).
    pub fn install_vdp(&mut self) {
        self.bus.map_read(vdp::READ_PORT, Handler::Vdp);
        self.bus.map_write(vdp::WRITE_PORT, Handler::Vdp);
    }

    /// Typed access to an attached device. `None` if the id is stale, the
    /// device is mid-handler, or it is not a `T`.
    pub fn device_mut<T: Any>(&mut self, id: DeviceId) -> Option<&mut T> {
        self.bus
            .device_mut(id)
            .and_then(|d| d.as_any_mut().downcast_mut::<T>())
    }

    /// Remember which attached device is the controller, for `press`.
    pub fn set_controller(&mut self, id: DeviceId) {
        self.controller = Some(id);
    }

    /// Host-side input event: latch `code` and dispatch the controller vector.
    pub fn press(&mut self, code: u8) {
        let Some(id) = self.controller else {
            log::debug!("press {code:#04x}: no controller attached");
            return;
        };
        let Some(controller) = self.device_mut::<Controller>(id) else {
            return;
        };
        let vector = controller.latch(code);
        if vector != 0 {
            self.run(vector);
        }
    }

    // ---------------------------------------------------------------------
    // Stack pointers (used by the stack device)
    // ---------------------------------------------------------------------

    #[inline]
    pub fn stack_ptr(&self, id: StackId) -> u8 {
        self.stacks.get(id).ptr()
    }

    #[inline]
    pub fn set_stack_ptr(&mut self, id: StackId, ptr: u8) {
        self.stacks.get_mut(id).set_ptr(ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Device;

    struct Echo {
        reads: usize,
    }

    impl Device for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn on_read(&mut self, view: &mut PortView<'_>) -> u8 {
            self.reads += 1;
            view.byte().wrapping_add(1)
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn unmapped_ports_are_plain_storage() {
        let mut vm = Machine::default();
        vm.deo(0x40, 0x99);
        assert_eq!(vm.dei(0x40), 0x99);
    }

    #[test]
    fn read_handler_result_wins() {
        let mut vm = Machine::default();
        let id = vm.attach_device(Box::new(Echo { reads: 0 }));
        vm.register_read(0x20, id);
        vm.deo(0x20, 7);
        assert_eq!(vm.dei(0x20), 8);
        assert_eq!(vm.device_mut::<Echo>(id).map(|e| e.reads), Some(1));
    }

    #[test]
    fn device_mut_rejects_wrong_type() {
        let mut vm = Machine::default();
        let id = vm.attach_device(Box::new(Echo { reads: 0 }));
        assert!(vm.device_mut::<Controller>(id).is_none());
    }

    #[test]
    fn boot_loads_only_the_first_64k() {
        let mut image = vec![0u8; RAM_SIZE + 2];
        image[0] = 0x80; // LIT 0x2a, then BRK
        image[1] = 0x2A;
        image[RAM_SIZE] = 0xFF;
        let mut vm = Machine::default();
        assert_eq!(vm.boot(&image, 0), RunOutcome::Halted);
        assert_eq!(vm.ram().read(0), 0x80);
        assert_eq!(vm.stacks().working().get(0), 0x2A);
    }

    #[test]
    fn press_without_controller_is_ignored() {
        let mut vm = Machine::default();
        vm.press(0x81);
        assert_eq!(vm.stack_ptr(StackId::Working), 0);
    }
}
