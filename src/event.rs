//! Events raised by a watcher.
//!
//! Device lifecycle and input changes share one enum, [`ShuttleEvent`], so a
//! single listener or channel sees them in the exact order they happened.
//!
//! ## Turn amounts
//! The two wheels do not encode their amount the same way:
//! - **Jog wheel** (outer ring): `amount` is always positive; the sign lives in
//!   [`Direction`] only.
//! - **Inner wheel**: `amount` is the *signed* step count, so a left turn
//!   carries a negative amount *and* `Direction::Left`.
//!
//! Consumers that want a uniform magnitude should use [`TurnEvent::magnitude`].

use crate::metadata::DeviceMeta;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a wheel was turned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

/// A wheel movement decoded from one report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnEvent {
    pub direction: Direction,
    /// Amount as reported; see the module docs for sign conventions.
    pub amount: i32,
}

impl TurnEvent {
    pub const fn new(direction: Direction, amount: i32) -> Self {
        Self { direction, amount }
    }

    /// Unsigned step count regardless of wheel.
    #[inline]
    pub fn magnitude(&self) -> u32 {
        self.amount.unsigned_abs()
    }
}

/// The five buttons on a ShuttleXpress, left to right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Button {
    Button1,
    Button2,
    Button3,
    Button4,
    Button5,
}

impl Button {
    pub const ALL: [Button; 5] = [
        Button::Button1,
        Button::Button2,
        Button::Button3,
        Button::Button4,
        Button::Button5,
    ];

    /// One-based button number.
    pub fn number(self) -> u8 {
        match self {
            Button::Button1 => 1,
            Button::Button2 => 2,
            Button::Button3 => 3,
            Button::Button4 => 4,
            Button::Button5 => 5,
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "button{}", self.number())
    }
}

/// Everything a watcher can report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ShuttleEvent {
    /// A matching device was opened.
    Attached(DeviceMeta),
    /// The attached device went away.
    Removed(DeviceMeta),
    /// Outer jog ring moved.
    JogWheelTurned(TurnEvent),
    /// Inner wheel moved.
    InnerWheelTurned(TurnEvent),
    /// A button went down (edge-triggered).
    ButtonPressed(Button),
}

impl ShuttleEvent {
    /// `Attached` or `Removed`.
    pub fn is_device(&self) -> bool {
        matches!(self, ShuttleEvent::Attached(_) | ShuttleEvent::Removed(_))
    }

    pub fn is_wheel(&self) -> bool {
        matches!(
            self,
            ShuttleEvent::JogWheelTurned(_) | ShuttleEvent::InnerWheelTurned(_)
        )
    }

    pub fn is_button(&self) -> bool {
        matches!(self, ShuttleEvent::ButtonPressed(_))
    }

    /// Metadata of the device for lifecycle events.
    pub fn device(&self) -> Option<&DeviceMeta> {
        match self {
            ShuttleEvent::Attached(meta) | ShuttleEvent::Removed(meta) => Some(meta),
            _ => None,
        }
    }
}
