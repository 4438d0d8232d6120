//! ShuttleXpress report decoder.
//!
//! The ShuttleXpress sends a 5-byte input report with no report ID:
//!
//! | offset | meaning |
//! |---|---|
//! | 0 | jog ring displacement since the last report |
//! | 1 | inner wheel position, wrapping `0..=255` |
//! | 2 | unused |
//! | 3 | buttons 1–4 as single bits (`0x10`, `0x20`, `0x40`, `0x80`) |
//! | 4 | button 5 (any non-zero value) |
//!
//! The jog ring reports small values `1..=7` when turned right and wraps to
//! `256 - n` when turned left. The inner wheel is an absolute counter, so its
//! movement is the shortest-arc difference from the previous report.
//!
//! Buttons are edge-triggered against the previous report: a press fires when
//! the button byte becomes non-zero *and* differs from the last report. Only
//! single-bit values are recognised for buttons 1–4; chords are ignored.
//!
//! [`decode`] is pure. [`ShuttleDecoder`] wraps it with the retained previous
//! report and implements [`ReportParser`] for use by the watcher.

use crate::device::ReportParser;
use crate::error::{Result, WatchError};
use crate::event::{Button, Direction, ShuttleEvent, TurnEvent};

/// Reports shorter than this carry no usable sample.
pub const MIN_REPORT_LEN: usize = 4;

/// Native ShuttleXpress input report size.
pub const REPORT_LEN: usize = 5;

const JOG_WHEEL: usize = 0;
const INNER_WHEEL: usize = 1;
const FIRST_FOUR_BUTTONS: usize = 3;
const FIFTH_BUTTON: usize = 4;

/// Largest raw jog value that still means "right".
const JOG_RIGHT_MAX: u8 = 7;

/// Events decoded from a single report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    pub jog: Option<TurnEvent>,
    pub inner: Option<TurnEvent>,
    pub buttons: Vec<Button>,
}

impl Decoded {
    pub fn is_empty(&self) -> bool {
        self.jog.is_none() && self.inner.is_none() && self.buttons.is_empty()
    }

    /// Flatten in dispatch order: jog, inner wheel, buttons.
    pub fn into_events(self) -> impl Iterator<Item = ShuttleEvent> {
        self.jog
            .map(ShuttleEvent::JogWheelTurned)
            .into_iter()
            .chain(self.inner.map(ShuttleEvent::InnerWheelTurned))
            .chain(self.buttons.into_iter().map(ShuttleEvent::ButtonPressed))
    }
}

/// Shortest-arc signed difference on a mod-256 counter, in `(-128, 128]`.
///
/// An exact half turn is ambiguous; it resolves to `+128`. The ShuttleXPress
/// driver's own `diff < -128` rule reads `128 -> 0` as `-128` instead.
pub fn wrap_diff(previous: u8, current: u8) -> i32 {
    let diff = i32::from(current) - i32::from(previous);
    if diff <= -128 {
        diff + 256
    } else if diff > 128 {
        diff - 256
    } else {
        diff
    }
}

/// Jog ring raw value to a turn. `0` means "not moving".
pub fn decode_jog(raw: u8) -> Option<TurnEvent> {
    match raw {
        0 => None,
        1..=JOG_RIGHT_MAX => Some(TurnEvent::new(Direction::Right, i32::from(raw))),
        _ => Some(TurnEvent::new(Direction::Left, 256 - i32::from(raw))),
    }
}

fn first_four_button(bits: u8) -> Option<Button> {
    match bits {
        0x10 => Some(Button::Button1),
        0x20 => Some(Button::Button2),
        0x40 => Some(Button::Button3),
        0x80 => Some(Button::Button4),
        _ => None,
    }
}

/// Reject reports too short to carry a sample.
pub fn check_report_len(report: &[u8]) -> Result<&[u8]> {
    if report.len() < MIN_REPORT_LEN {
        return Err(WatchError::MalformedReport { len: report.len() });
    }
    Ok(report)
}

/// Decode `current` against `previous`.
///
/// `None` for `previous` (first sample) behaves like an all-zero report. A
/// `previous` of a different length is treated the same way. Reports shorter
/// than [`MIN_REPORT_LEN`] decode to nothing.
pub fn decode(current: &[u8], previous: Option<&[u8]>) -> Decoded {
    let mut out = Decoded::default();
    if current.len() < MIN_REPORT_LEN {
        return out;
    }
    let previous = previous.filter(|p| p.len() == current.len());
    let prev_at = |i: usize| previous.and_then(|p| p.get(i).copied()).unwrap_or(0);

    out.jog = decode_jog(current[JOG_WHEEL]);

    let last_inner = prev_at(INNER_WHEEL);
    let inner = current[INNER_WHEEL];
    if inner != last_inner {
        let diff = wrap_diff(last_inner, inner);
        let direction = if diff > 0 {
            Direction::Right
        } else {
            Direction::Left
        };
        out.inner = Some(TurnEvent::new(direction, diff));
    }

    let buttons = current[FIRST_FOUR_BUTTONS];
    if buttons != 0 && buttons != prev_at(FIRST_FOUR_BUTTONS) {
        if let Some(button) = first_four_button(buttons) {
            out.buttons.push(button);
        }
    }

    if let Some(&fifth) = current.get(FIFTH_BUTTON) {
        if fifth != 0 && fifth != prev_at(FIFTH_BUTTON) {
            out.buttons.push(Button::Button5);
        }
    }

    out
}

/// Stateful decoder for one device.
#[derive(Debug, Default)]
pub struct ShuttleDecoder {
    previous: Option<Vec<u8>>,
}

impl ShuttleDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `current` and remember it as the previous report.
    ///
    /// Short reports are skipped entirely and do not replace the previous one.
    pub fn feed(&mut self, current: &[u8]) -> Decoded {
        let current = match check_report_len(current) {
            Ok(report) => report,
            Err(e) => {
                tracing::trace!(error = %e, "report skipped");
                return Decoded::default();
            }
        };
        let decoded = decode(current, self.previous.as_deref());
        self.previous = Some(current.to_vec());
        decoded
    }

    /// Last successfully decoded report.
    pub fn previous(&self) -> Option<&[u8]> {
        self.previous.as_deref()
    }
}

impl ReportParser for ShuttleDecoder {
    fn parse(&mut self, _report_id: u8, payload: &[u8], out: &mut Vec<ShuttleEvent>) {
        out.extend(self.feed(payload).into_events());
    }

    fn reset(&mut self) {
        self.previous = None;
    }

    fn input_report_len(&self) -> Option<usize> {
        Some(REPORT_LEN)
    }
}
