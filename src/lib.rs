#![doc = r#"
B6X library crate.

This crate exposes the console core for use by the host binaries and tests.

Modules:
- bus: main memory, device-register file, port dispatch tables and the `Device` trait
- config: host-selected machine options
- controller: event-driven controller device and key event codes
- cpu: stack-machine evaluator (decode + execute + stack state)
- devices: the standard device map (stack, meta, ROM pager, debug)
- error: host-facing error type
- machine: the owned console aggregate
- rom: ROM images, the optional header page and header stamping
- vdp: video display processor (command processor + frame renderer)
- display: winit + pixels window (feature `display`)
- screenshot: PNG export of a rendered frame (feature `screenshot`)

In tests, shared program builders are available under `crate::test_utils`.
"#]

pub mod bus;
pub mod config;
pub mod controller;
pub mod cpu;
pub mod devices;
pub mod error;
pub mod machine;
pub mod rom;
pub mod vdp;

#[cfg(feature = "display")]
pub mod display;
#[cfg(feature = "screenshot")]
pub mod screenshot;

// Re-export commonly used types at the crate root for convenience.
pub use bus::{Device, DeviceId, PortView};
pub use config::MachineConfig;
pub use cpu::RunOutcome;
pub use error::{Error, Result};
pub use machine::Machine;
pub use rom::Rom;
pub use vdp::{HEIGHT, Vdp, WIDTH};

// Shared test utilities (only compiled for tests)
#[cfg(test)]
pub mod test_utils;
