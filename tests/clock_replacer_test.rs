//! Integration tests for the clock replacer

use crabtree::buffer::ClockReplacer;
use crabtree::common::FrameId;

#[test]
fn test_clock_scenario() {
    let replacer = ClockReplacer::new(7);

    // Frames 1..=6 become victim candidates.
    for i in 1..=6u32 {
        replacer.unpin(FrameId::new(i));
    }
    assert_eq!(replacer.size(), 6);

    // The sweep starts at the hand (slot 0, bit clear) and takes the
    // first three set bits in order.
    assert_eq!(replacer.victim(), Some(FrameId::new(1)));
    assert_eq!(replacer.victim(), Some(FrameId::new(2)));
    assert_eq!(replacer.victim(), Some(FrameId::new(3)));

    // Pinning removes candidates; unpinning restores them.
    replacer.pin(FrameId::new(4));
    replacer.pin(FrameId::new(5));
    assert_eq!(replacer.size(), 1);

    replacer.unpin(FrameId::new(4));
    assert_eq!(replacer.size(), 2);

    // The hand sits after frame 5; frame 6 comes before frame 4 on the
    // next revolution.
    assert_eq!(replacer.victim(), Some(FrameId::new(6)));
    assert_eq!(replacer.victim(), Some(FrameId::new(4)));
    assert_eq!(replacer.victim(), None);
    assert_eq!(replacer.size(), 0);
}

#[test]
fn test_clock_no_candidates_after_pin_all() {
    let replacer = ClockReplacer::new(3);

    for i in 0..3u32 {
        replacer.unpin(FrameId::new(i));
    }
    for i in 0..3u32 {
        replacer.pin(FrameId::new(i));
    }

    assert_eq!(replacer.size(), 0);
    assert_eq!(replacer.victim(), None);
}
