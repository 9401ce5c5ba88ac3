/*!
Controller device: event-driven input on ports 0x0A / 0x0B.

Behavior:
- The host reports each key transition as an 8-bit event code:
  bit 7 = pressed (1) or released (0), low 4 bits = button index.
  Player 1 buttons are indices 0..=7, player 2 buttons 8..=15, in the order
  Start, A, B, C, Up, Down, Left, Right.
- On each event the code is stored and, if a vector has been set, the
  evaluator is run at that vector so the program can react immediately.
- Reading port 0x0A returns the last event code and also stores it in the
  port byte.
- Writing port 0x0B sets the vector from the 16-bit field at 0x0A..0x0B.

Notes:
- There is no polling state; a program that never sets a vector only sees
  the most recent event when it reads 0x0A.
*/

use std::any::Any;

use crate::bus::{Device, PortView};

/// Port holding the last event code (read handler).
pub const CODE_PORT: u8 = 0x0A;
/// Port completing the vector field 0x0A..0x0B (write handler).
pub const VECTOR_PORT: u8 = 0x0B;

/// Bit 7 of an event code.
pub const PRESSED: u8 = 0x80;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Button {
    Start,
    A,
    B,
    C,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    #[inline]
    fn index(self) -> u8 {
        match self {
            Button::Start => 0,
            Button::A => 1,
            Button::B => 2,
            Button::C => 3,
            Button::Up => 4,
            Button::Down => 5,
            Button::Left => 6,
            Button::Right => 7,
        }
    }
}

/// Which pad a button belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Player {
    One,
    Two,
}

/// Event code for a button transition.
pub fn event_code(player: Player, button: Button, pressed: bool) -> u8 {
    let base = match player {
        Player::One => 0,
        Player::Two => 8,
    };
    let state = if pressed { PRESSED } else { 0 };
    state | base | button.index()
}

#[derive(Clone, Debug, Default)]
pub struct Controller {
    // Last event code delivered by the host.
    code: u8,
    // Entry point run on each event; 0 = none.
    vector: u16,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an event code and return the vector to dispatch (0 = none).
    pub fn latch(&mut self, code: u8) -> u16 {
        self.code = code;
        self.vector
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn vector(&self) -> u16 {
        self.vector
    }
}

impl Device for Controller {
    fn name(&self) -> &'static str {
        "controller"
    }

    fn on_read(&mut self, view: &mut PortView<'_>) -> u8 {
        view.set_byte(self.code);
        self.code
    }

    fn on_write(&mut self, view: &mut PortView<'_>) {
        self.vector = view.field();
        log::debug!("controller: vector = {:#06x}", self.vector);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
