use crate::disturbance::{DisturbanceKind, Placement};
use crate::profile::HeightProfile;
use crate::rng::RandomSource;

/// Manual targets below this height look for nearby material.
const EMPTY_CELL: f64 = 0.5;
/// Furthest offset searched when snapping a manual target.
const SNAP_RADIUS: usize = 20;
/// Random impacts favour cells above this fraction of the mean height.
const IMPACT_HIGH_FRACTION: f64 = 0.7;

pub fn select(
    profile: &HeightProfile,
    kind: DisturbanceKind,
    placement: Placement,
    rng: &mut impl RandomSource,
) -> usize {
    match (placement, kind) {
        (Placement::Manual { percent }, _) => manual(profile, percent),
        (Placement::Random, DisturbanceKind::Impact) => high_ground(profile, rng),
        (Placement::Random, _) => rng.range_usize(profile.len()),
    }
}

/// Cell at `percent` of the grid. If it is nearly empty, the nearest cell
/// within `SNAP_RADIUS` holding material is used instead, checking the left
/// side first at each distance.
pub fn manual(profile: &HeightProfile, percent: f64) -> usize {
    let n = profile.len();
    let target = ((percent / 100.0 * n as f64).floor() as usize).min(n - 1);
    if profile.get(target) >= EMPTY_CELL {
        return target;
    }

    for d in 1..=SNAP_RADIUS as isize {
        for delta in [-d, d] {
            if let Some(j) = profile.offset(target, delta)
                && profile.get(j) > EMPTY_CELL
            {
                return j;
            }
        }
    }
    target
}

/// Uniform pick among cells above `IMPACT_HIGH_FRACTION` of the mean height,
/// or anywhere if none qualify.
fn high_ground(profile: &HeightProfile, rng: &mut impl RandomSource) -> usize {
    let cutoff = profile.mean() * IMPACT_HIGH_FRACTION;
    let high: Vec<usize> = (0..profile.len())
        .filter(|&i| profile.get(i) > cutoff)
        .collect();
    if high.is_empty() {
        rng.range_usize(profile.len())
    } else {
        high[rng.range_usize(high.len())]
    }
}
