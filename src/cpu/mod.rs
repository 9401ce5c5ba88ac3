/*!
cpu::mod - The stack-machine evaluator.

Layout:

```text
state.rs    - The two 256-byte stacks and their wrapping pointers.
decode.rs   - Opcode byte -> (base operation, short, stack, keep).
execute.rs  - The evaluator loop and per-operation semantics.
```

The evaluator has no state of its own beyond a program counter local to
each `run` call; stacks and memory live on `Machine`. That is what makes
re-entrant evaluation from device handlers possible: a nested `run` simply
borrows the same machine again.

Usage:
```rust
use b6x::{Machine, MachineConfig, RunOutcome};

let mut vm = Machine::new(MachineConfig::default());
vm.load(0x0100, &[0x80, 0x2A, 0x00]); // LIT 2a BRK
assert_eq!(vm.run(0x0100), RunOutcome::Halted);
assert_eq!(vm.stacks().working().ptr(), 1);
```
*/

pub mod decode;
pub mod execute;
pub mod state;

pub use decode::{BaseOp, Immediate, Opcode, decode};
pub use execute::RunOutcome;
pub(crate) use execute::run;
pub use state::{STACK_SIZE, Stack, StackId, Stacks};
