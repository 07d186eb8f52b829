//! Animation trait behaviour shared by tweens and springs.

use std::time::Duration;

use cardstack_core::animation::spring::presets;
use cardstack_core::animation::{Animation, Easing, Tween};

const FRAME: Duration = Duration::from_millis(16);

fn drive(anim: &mut dyn Animation, max_frames: usize) -> (usize, Vec<f64>) {
    let mut values = Vec::new();
    for frame in 0..max_frames {
        if anim.is_complete() {
            return (frame, values);
        }
        anim.tick(FRAME);
        values.push(anim.value());
    }
    (max_frames, values)
}

#[test]
fn every_animation_ends_at_one() {
    let mut anims: Vec<Box<dyn Animation>> = vec![
        Box::new(Tween::new(Duration::from_millis(300))),
        Box::new(Tween::new(Duration::from_millis(300)).easing(Easing::EaseInOut)),
        Box::new(presets::card_settle(0.0, 400.0)),
        Box::new(presets::snap_back(120.0, 0.0)),
        Box::new(presets::throw(0.0, -900.0)),
    ];
    for anim in &mut anims {
        let (frames, values) = drive(anim.as_mut(), 2000);
        assert!(frames < 2000);
        assert_eq!(anim.value(), 1.0);
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}

#[test]
fn tween_values_are_monotonic() {
    let mut tw = Tween::new(Duration::from_millis(250)).easing(Easing::EaseOut);
    let (_, values) = drive(&mut tw, 100);
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn reset_allows_replay() {
    let mut spring = presets::card_settle(0.0, 100.0);
    let (first, _) = drive(&mut spring, 2000);
    spring.reset();
    assert!(!spring.is_complete());
    let (second, _) = drive(&mut spring, 2000);
    assert_eq!(first, second);
}

#[test]
fn snap_back_finishes_within_a_few_hundred_ms() {
    let mut spring = presets::snap_back(0.0, 200.0);
    let (frames, _) = drive(&mut spring, 2000);
    assert!(frames * 16 <= 800, "took {} ms", frames * 16);
}
