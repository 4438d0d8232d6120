//! Property tests for the ShuttleXpress decoder.

use proptest::prelude::*;
use shuttlewatch::{decode, wrap_diff, Button, Direction, ShuttleDecoder, TurnEvent};

fn report(jog: u8, inner: u8, buttons: u8, fifth: u8) -> [u8; 5] {
    [jog, inner, 0, buttons, fifth]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_jog_right_range(v in 1u8..=7) {
        let out = decode(&report(v, 0, 0, 0), None);
        prop_assert_eq!(out.jog, Some(TurnEvent::new(Direction::Right, i32::from(v))));
    }

    #[test]
    fn prop_jog_left_range(v in 8u8..=255) {
        let out = decode(&report(v, 0, 0, 0), None);
        prop_assert_eq!(out.jog, Some(TurnEvent::new(Direction::Left, 256 - i32::from(v))));
    }

    #[test]
    fn prop_wrap_diff_is_shortest_arc(prev in any::<u8>(), cur in any::<u8>()) {
        let diff = wrap_diff(prev, cur);
        prop_assert!(diff > -128 && diff <= 128, "diff {} out of range", diff);
        prop_assert_eq!((i32::from(prev) + diff).rem_euclid(256), i32::from(cur));
    }

    #[test]
    fn prop_inner_direction_follows_sign(prev in any::<u8>(), cur in any::<u8>()) {
        let out = decode(&report(0, cur, 0, 0), Some(&report(0, prev, 0, 0)[..]));
        if prev == cur {
            prop_assert_eq!(out.inner, None);
        } else {
            let turn = out.inner.expect("changed counter must turn");
            prop_assert_eq!(turn.amount, wrap_diff(prev, cur));
            let expected = if turn.amount > 0 { Direction::Right } else { Direction::Left };
            prop_assert_eq!(turn.direction, expected);
        }
    }

    #[test]
    fn prop_decode_is_pure(
        cur in proptest::collection::vec(any::<u8>(), 0..8),
        prev in proptest::collection::vec(any::<u8>(), 0..8),
    ) {
        let a = decode(&cur, Some(prev.as_slice()));
        let b = decode(&cur, Some(prev.as_slice()));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_short_reports_are_silent(
        cur in proptest::collection::vec(any::<u8>(), 0..4),
        prev in proptest::collection::vec(any::<u8>(), 0..8),
    ) {
        prop_assert!(decode(&cur, Some(prev.as_slice())).is_empty());
        prop_assert!(decode(&cur, None).is_empty());
        let mut d = ShuttleDecoder::new();
        prop_assert!(d.feed(&cur).is_empty());
    }

    #[test]
    fn prop_held_buttons_fire_once(buttons in any::<u8>(), fifth in any::<u8>()) {
        let mut d = ShuttleDecoder::new();
        let first = d.feed(&report(0, 0, buttons, fifth));
        let second = d.feed(&report(0, 0, buttons, fifth));
        prop_assert!(second.buttons.is_empty());
        prop_assert_eq!(first.buttons.contains(&Button::Button5), fifth != 0);
    }

    #[test]
    fn prop_only_single_bits_decode(buttons in any::<u8>()) {
        let out = decode(&report(0, 0, buttons, 0), None);
        let expected = match buttons {
            0x10 => vec![Button::Button1],
            0x20 => vec![Button::Button2],
            0x40 => vec![Button::Button3],
            0x80 => vec![Button::Button4],
            _ => vec![],
        };
        prop_assert_eq!(out.buttons, expected);
    }

    #[test]
    fn prop_never_panics(cur in proptest::collection::vec(any::<u8>(), 0..80)) {
        let mut d = ShuttleDecoder::new();
        let _ = d.feed(&cur);
        let _ = d.feed(&cur);
    }
}

#[test]
fn scenario_jog_from_rest() {
    let mut d = ShuttleDecoder::new();
    d.feed(&[0, 0, 0, 0]);
    let out = d.feed(&[5, 0, 0, 0]);
    assert_eq!(out.jog, Some(TurnEvent::new(Direction::Right, 5)));
    assert_eq!(out.inner, None);
    assert!(out.buttons.is_empty());
}

#[test]
fn scenario_inner_wrap_both_ways() {
    let fwd = decode(&[0, 4, 0, 0], Some(&[0, 250, 0, 0][..]));
    assert_eq!(fwd.inner, Some(TurnEvent::new(Direction::Right, 10)));

    let back = decode(&[0, 250, 0, 0], Some(&[0, 4, 0, 0][..]));
    assert_eq!(back.inner, Some(TurnEvent::new(Direction::Left, -10)));
}

#[test]
fn scenario_button1_once() {
    let mut d = ShuttleDecoder::new();
    d.feed(&[0, 0, 0, 0]);
    assert_eq!(d.feed(&[0, 0, 0, 16]).buttons, vec![Button::Button1]);
    assert!(d.feed(&[0, 0, 0, 16]).buttons.is_empty());
}
