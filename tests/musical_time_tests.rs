//! Musical time coordinates against a live transport.
//!
//! Run with:
//! ```bash
//! cargo test -p kairos --test musical_time_tests
//! ```

#[path = "helpers/mod.rs"]
mod helpers;

use helpers::{test_engine, TEST_BLOCK_SIZE};
use kairos::prelude::*;
use proptest::prelude::*;

#[test]
fn test_normalization_and_equality() {
    let p = Position::new(0, 5, 4).unwrap();
    assert_eq!((p.bar(), p.position(), p.division()), (1, 1, 4));
    assert_eq!(Position::new(0, 1, 2).unwrap(), Position::new(0, 2, 4).unwrap());
}

#[test]
fn test_subtraction() {
    let later = Position::new(1, 0, 4).unwrap();
    let earlier = Position::new(0, 2, 4).unwrap();
    assert_eq!(later - earlier, Duration::new(0, 2, 4).unwrap());
    assert!(earlier.checked_since(&later).is_err());
}

#[test]
fn test_frame_offset_follows_transport_tempo() {
    let (engine, _audio) = test_engine();
    let quarter_beat = Position::new(0, 1, 4).unwrap();

    engine.transport().set_bpm(120.0);
    assert_eq!(quarter_beat.frame_offset(&engine.transport().position()), 6_000);

    engine.transport().set_bpm(60.0);
    assert_eq!(quarter_beat.frame_offset(&engine.transport().position()), 12_000);
}

#[test]
fn test_bar_offset_uses_meter() {
    let (engine, _audio) = test_engine();
    engine.transport().configure(120.0, 3.0, 4.0);
    let second_bar = Position::new(1, 0, 1).unwrap();
    assert_eq!(second_bar.frame_offset(&engine.transport().position()), 72_000);
}

#[test]
fn test_position_matches_transport_after_rolling() {
    let (engine, mut audio) = test_engine();
    engine.transport().start();
    let target = Position::new(0, 1, 2).unwrap();
    let frames = target.frame_offset(&engine.transport().position());
    while engine.transport().frame() < frames {
        audio.process_block(TEST_BLOCK_SIZE);
    }
    // 12000 frames, reached at the end of the 47th block
    assert_eq!(frames, 12_000);
    assert_eq!(engine.transport().frame(), 12_032);
}

proptest! {
    /// Adding a duration and measuring it back gives the same duration.
    #[test]
    fn prop_add_then_since(
        bar in 0u32..64, pos in 0u32..64, div in 1u32..64,
        dbar in 0u32..8, dpos in 0u32..64, ddiv in 1u32..64,
    ) {
        let start = Position::new(bar, pos, div).unwrap();
        let span = Duration::new(dbar, dpos, ddiv).unwrap();
        let end = start + span;
        prop_assert!(end >= start);
        prop_assert_eq!(end.checked_since(&start).unwrap(), span);
    }
}
