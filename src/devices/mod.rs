/*!
devices::mod - The standard device map.

```text
Port  Read                   Write                      Device
0x04  working-stack pointer  set working-stack pointer  stack
0x05  return-stack pointer   set return-stack pointer   stack
0x07  -                      no-op                      meta
0x09  -                      paging step (0x08..0x09)   rom pager
0x0A  last event code        -                          controller
0x0B  -                      vector (0x0A..0x0B)        controller
0x0C  VDP command read       -                          vdp
0x0D  -                      VDP command write          vdp
0x0E  always 0               debug command              debug
```

Every other port is plain storage. `install_defaults` performs the whole
registration once, before any evaluation.
*/

use std::any::Any;

use crate::bus::{Device, PortView};
use crate::controller::{self, Controller};
use crate::machine::Machine;
use crate::rom::Rom;

pub mod debug;
pub mod pager;
pub mod stack;

pub use debug::DebugConsole;
pub use pager::RomPager;
pub use stack::StackPointers;

pub const WST_PORT: u8 = 0x04;
pub const RST_PORT: u8 = 0x05;
pub const META_PORT: u8 = 0x07;
pub const PAGER_PORT: u8 = 0x09;
pub const DEBUG_PORT: u8 = 0x0E;

/// Accepts and ignores writes to the metadata port.
#[derive(Debug, Default)]
pub struct Meta;

impl Device for Meta {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn on_write(&mut self, _view: &mut PortView<'_>) {}

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Register the VDP and the standard devices on `vm`.
pub fn install_defaults(vm: &mut Machine, rom: Option<Rom>) {
    let stack = vm.attach_device(Box::new(StackPointers));
    vm.register_read(WST_PORT, stack);
    vm.register_write(WST_PORT, stack);
    vm.register_read(RST_PORT, stack);
    vm.register_write(RST_PORT, stack);

    let meta = vm.attach_device(Box::new(Meta));
    vm.register_write(META_PORT, meta);

    let pager = vm.attach_device(Box::new(RomPager::new(rom)));
    vm.register_write(PAGER_PORT, pager);

    let pad = vm.attach_device(Box::new(Controller::new()));
    vm.register_read(controller::CODE_PORT, pad);
    vm.register_write(controller::VECTOR_PORT, pad);
    vm.set_controller(pad);

    vm.install_vdp();

    let debug = vm.attach_device(Box::new(DebugConsole::stdio()));
    vm.register_read(DEBUG_PORT, debug);
    vm.register_write(DEBUG_PORT, debug);

    log::debug!("standard devices installed ({} attached)", vm.bus().device_count());
}
