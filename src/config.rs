/*!
Machine configuration.

`MachineConfig` carries the few knobs the host may turn before building a
`Machine`. Everything else about the console (memory sizes, screen size,
port map) is fixed hardware and lives as constants next to the code that
uses it.

Usage:
```rust
use b6x::MachineConfig;

let config = MachineConfig::default().with_step_limit(1_000_000);
assert_eq!(config.step_limit, Some(1_000_000));
```
*/

/// Host-selected machine options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineConfig {
    /// Maximum instructions a single `run` invocation may execute before it
    /// gives up and reports `RunOutcome::RanOff`. `None` runs until halt.
    pub step_limit: Option<u64>,
}

impl MachineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every evaluator invocation to `limit` instructions.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Remove any instruction bound (the console's native behavior).
    pub fn unbounded(mut self) -> Self {
        self.step_limit = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unbounded() {
        assert_eq!(MachineConfig::default().step_limit, None);
    }

    #[test]
    fn builder_round_trip() {
        let c = MachineConfig::new().with_step_limit(10);
        assert_eq!(c.step_limit, Some(10));
        assert_eq!(c.unbounded().step_limit, None);
    }
}
