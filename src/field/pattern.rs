//! Deterministic spiral sampling for one-shot imprints.

use std::f32::consts::TAU;

/// Archimedean spiral from `center` out to `radius` over `turns` revolutions.
///
/// Sample count is `ceil(turns * samples_per_turn)`, capped at `max_samples`;
/// the first sample is the centre itself and the last lies on the outer
/// radius. A non-positive or non-finite `turns` or `radius` degenerates to
/// the single centre point, and a non-finite centre yields nothing.
pub fn spiral_points(
    center: (f32, f32),
    radius: f32,
    turns: f32,
    samples_per_turn: usize,
    max_samples: usize,
) -> impl Iterator<Item = (f32, f32)> {
    let anchored = center.0.is_finite() && center.1.is_finite();
    let traced = anchored
        && turns.is_finite()
        && radius.is_finite()
        && turns > 0.0
        && radius > 0.0
        && samples_per_turn > 0;
    let samples = if traced {
        let wanted = (turns as f64 * samples_per_turn as f64).ceil();
        (wanted.min(max_samples as f64) as usize).max(1)
    } else {
        0
    };
    let points = if anchored { samples + 1 } else { 0 };
    let sweep = turns * TAU;
    (0..points).map(move |k| {
        if samples == 0 {
            return center;
        }
        let t = k as f32 / samples as f32;
        let theta = t * sweep;
        let r = radius * t;
        (center.0 + r * theta.cos(), center.1 + r * theta.sin())
    })
}
