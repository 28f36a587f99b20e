//! Perturbation models. Each mutates the profile around one target cell.
//! All removals are floored at zero through `HeightProfile::remove`.

use crate::disturbance::DisturbanceKind;
use crate::profile::HeightProfile;
use crate::rng::RandomSource;

/// Erosion strength per unit of intensity.
const EROSION_PER_INTENSITY: f64 = 0.5;

// Rain
const SPLASH_MIN: f64 = 0.8;
const SPLASH_SPREAD: f64 = 0.4;
/// Share of the splash that stays on the pile (the rest washes away).
const RUNOFF_KEPT: f64 = 0.6;
const RUNOFF_NEIGHBOUR: f64 = 0.3;
const RUNOFF_DOWNSLOPE: f64 = 0.4;

// Impact
const CRATER_DEPTH: f64 = 1.5;
const EJECTA_FRACTION: f64 = 0.4;
const EJECTA_SPREAD: f64 = 0.15;
const EJECTA_RADIUS: isize = 3;
const SHOCK: f64 = 0.4;

// Vibration
const SHAKE_RADIUS: isize = 4;
const SETTLE: f64 = 0.3;
const SETTLE_SLIDE: f64 = 0.6;

pub fn apply(
    profile: &mut HeightProfile,
    kind: DisturbanceKind,
    target: usize,
    intensity: f64,
    rng: &mut impl RandomSource,
) {
    let erosion = intensity * EROSION_PER_INTENSITY;
    match kind {
        DisturbanceKind::Rain => rain(profile, target, erosion, rng),
        DisturbanceKind::Impact => impact(profile, target, erosion),
        DisturbanceKind::Vibration => vibration(profile, target, erosion),
    }
}

/// Splash erosion: a small crater, part of the splash landing on both
/// neighbours and part running 2-4 cells toward index 0.
pub fn rain(profile: &mut HeightProfile, target: usize, erosion: f64, rng: &mut impl RandomSource) {
    let splash = erosion * (SPLASH_MIN + SPLASH_SPREAD * rng.next_f64());
    profile.remove(target, splash);

    let kept = splash * RUNOFF_KEPT;
    for d in [-1, 1] {
        if let Some(j) = profile.offset(target, d) {
            profile.add(j, kept * RUNOFF_NEIGHBOUR);
        }
    }

    let run = 2 + (3.0 * rng.next_f64()).floor() as usize;
    profile.add(target.saturating_sub(run), kept * RUNOFF_DOWNSLOPE);
}

/// Crater with ejecta thrown up to three cells each way, falling off as
/// 1/distance, followed by a shock that knocks material off both neighbours.
pub fn impact(profile: &mut HeightProfile, target: usize, erosion: f64) {
    let ejected = profile.get(target) * EJECTA_FRACTION;
    profile.remove(target, erosion * CRATER_DEPTH);

    for d in -EJECTA_RADIUS..=EJECTA_RADIUS {
        if d == 0 {
            continue;
        }
        if let Some(j) = profile.offset(target, d) {
            profile.add(j, ejected / d.unsigned_abs() as f64 * EJECTA_SPREAD);
        }
    }

    for d in [-1, 1] {
        if let Some(j) = profile.offset(target, d) {
            profile.remove(j, erosion * SHOCK);
        }
    }
}

/// Compaction around the target, tapering linearly to zero at the edge of
/// the shaken zone. Part of what settles slides one cell away from the
/// grid centre; only mass actually removed can slide, so shaking never adds
/// material.
pub fn vibration(profile: &mut HeightProfile, target: usize, erosion: f64) {
    let half = profile.len() as f64 / 2.0;
    for d in -SHAKE_RADIUS..=SHAKE_RADIUS {
        let Some(pos) = profile.offset(target, d) else {
            continue;
        };
        if profile.get(pos) <= 0.0 {
            continue;
        }

        let falloff = 1.0 - d.unsigned_abs() as f64 / SHAKE_RADIUS as f64;
        let settled = profile.remove(pos, erosion * SETTLE * falloff);

        let downhill = if (pos as f64) < half { -1 } else { 1 };
        if let Some(j) = profile.offset(pos, downhill) {
            profile.add(j, settled * SETTLE_SLIDE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::tests::Scripted;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rain_splash_and_runoff() {
        // intensity 4 -> erosion 2; draws 0.5 -> splash 2.0, run = 2 + 1 = 3
        let mut p = HeightProfile::from_heights(&[0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0]);
        let mut rng = Scripted::new(&[0.5, 0.5]);
        apply(&mut p, DisturbanceKind::Rain, 5, 4.0, &mut rng);

        assert!(close(p.get(5), 3.0));
        assert!(close(p.get(4), 1.2 * 0.3));
        assert!(close(p.get(6), 1.2 * 0.3));
        assert!(close(p.get(2), 1.2 * 0.4));
    }

    #[test]
    fn rain_runoff_clamps_to_first_cell() {
        let mut p = HeightProfile::from_heights(&[0.0, 1.0, 0.0]);
        let mut rng = Scripted::new(&[0.0, 0.99]);
        rain(&mut p, 1, 1.0, &mut rng);
        // splash 0.8, kept 0.48: 0.144 from the neighbour share plus 0.192 runoff
        assert!(close(p.get(0), 0.144 + 0.192));
        assert!(close(p.get(1), 0.2));
    }

    #[test]
    fn impact_crater_ejecta_and_shock() {
        let mut p = HeightProfile::from_heights(&[1.0; 9]);
        impact(&mut p, 4, 1.0);
        // crater: 1.0 - 1.5 floored at 0; ejected = 0.4
        assert_eq!(p.get(4), 0.0);
        // neighbours: 1 + 0.4 * 0.15 - 0.4
        assert!(close(p.get(3), 1.0 + 0.06 - 0.4));
        assert!(close(p.get(5), 1.0 + 0.06 - 0.4));
        assert!(close(p.get(2), 1.0 + 0.03));
        assert!(close(p.get(7), 1.0 + 0.02));
        assert_eq!(p.get(0), 1.0);
    }

    #[test]
    fn impact_shock_never_leaves_negative_height() {
        let mut p = HeightProfile::from_heights(&[0.0, 0.1, 3.0, 0.1, 0.0]);
        impact(&mut p, 2, 5.0);
        assert!(p.as_slice().iter().all(|&h| h >= 0.0));
    }

    #[test]
    fn impact_at_grid_edge_throws_ejecta_one_way() {
        let mut p = HeightProfile::from_heights(&[2.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        impact(&mut p, 0, 1.0);
        // ejected = 0.8, crater 2.0 - 1.5; only cell 1 feels the shock
        assert!(close(p.get(0), 0.5));
        assert!(close(p.get(1), 1.0 + 0.8 * 0.15 - 0.4));
        assert!(close(p.get(2), 1.0 + 0.8 / 2.0 * 0.15));
        assert!(close(p.get(3), 1.0 + 0.8 / 3.0 * 0.15));
        assert_eq!(p.get(4), 1.0);

        let mut q = HeightProfile::from_heights(&[1.0, 1.0, 1.0, 1.0, 1.0, 2.0]);
        impact(&mut q, 5, 1.0);
        assert!(close(q.get(4), 1.0 + 0.8 * 0.15 - 0.4));
        assert!(close(q.get(2), 1.0 + 0.8 / 3.0 * 0.15));
        assert_eq!(q.get(1), 1.0);
    }

    #[test]
    fn vibration_settles_toward_edges() {
        let mut h = [0.0; 10];
        h[4] = 2.0;
        let mut p = HeightProfile::from_heights(&h);
        vibration(&mut p, 4, 1.0);
        // cell 4 is left of centre so it slides left
        assert!(close(p.get(4), 2.0 - 0.3));
        assert!(close(p.get(3), 0.3 * 0.6));

        // cell 5 sits at n/2 and three cells from the target: settles 0.075
        // and slides right; cell 6 is on the rim where falloff is zero
        let mut h = [0.0; 10];
        h[5] = 2.0;
        let mut p = HeightProfile::from_heights(&h);
        vibration(&mut p, 2, 1.0);
        assert!(close(p.get(5), 2.0 - 0.075));
        assert!(close(p.get(6), 0.075 * 0.6));
        assert_eq!(p.get(4), 0.0);
        assert_eq!(p.get(7), 0.0);
    }

    #[test]
    fn vibration_never_adds_mass_on_thin_cells() {
        let mut h = [0.0; 10];
        h[3] = 0.01;
        let mut p = HeightProfile::from_heights(&h);
        let before = p.sum();
        vibration(&mut p, 3, 2.5);
        assert!(p.sum() <= before);
        assert_eq!(p.get(3), 0.0);
        assert!(close(p.get(2), 0.01 * 0.6));
    }

    #[test]
    fn vibration_skips_empty_cells() {
        let mut p = HeightProfile::new(12);
        vibration(&mut p, 6, 3.0);
        assert_eq!(p.sum(), 0.0);
    }
}
