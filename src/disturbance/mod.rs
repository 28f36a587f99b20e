pub mod models;
pub mod target;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DisturbanceParams;
use crate::profile::HeightProfile;
use crate::rng::RandomSource;

/// Markers are dropped once they reach this age.
pub const MARKER_LIFETIME: u8 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisturbanceKind {
    #[default]
    Rain,
    Impact,
    Vibration,
}

impl DisturbanceKind {
    pub fn key(self) -> &'static str {
        match self {
            DisturbanceKind::Rain => "rain",
            DisturbanceKind::Impact => "impact",
            DisturbanceKind::Vibration => "vibration",
        }
    }
}

impl fmt::Display for DisturbanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How each perturbation point picks its target cell.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum Placement {
    #[default]
    Random,
    /// `percent` of the way across the grid, snapped to nearby material.
    Manual { percent: f64 },
}

/// One disturbance tick that changed the profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisturbanceEvent {
    pub timestamp: u64,
    pub kind: DisturbanceKind,
    pub intensity: f64,
    /// 1-based count of disturbance ticks in this run.
    pub sequence: u64,
}

/// Display-only record of where a perturbation landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DisturbanceMarker {
    pub position: usize,
    pub age: u8,
}

/// Perturbation points applied per tick.
pub fn points_per_tick(intensity: f64) -> usize {
    (intensity / 2.0).floor() as usize + 1
}

/// Apply one tick's worth of perturbations to `profile`, without relaxing.
///
/// Each point chooses a target against the profile as left by the previous
/// point. A point whose target has no material in or next to it is skipped.
/// Returns the targets that were actually perturbed, in application order.
pub fn perturb(
    profile: &mut HeightProfile,
    params: &DisturbanceParams,
    rng: &mut impl RandomSource,
) -> Vec<usize> {
    let mut hits = Vec::new();
    for _ in 0..points_per_tick(params.intensity) {
        let pos = target::select(profile, params.kind, params.placement, rng);
        if !profile.has_material_near(pos) {
            continue;
        }
        models::apply(profile, params.kind, pos, params.intensity, rng);
        hits.push(pos);
    }
    hits
}

/// Advance every marker by one refresh and drop expired ones.
pub fn age_markers(markers: &mut Vec<DisturbanceMarker>) {
    for m in markers.iter_mut() {
        m.age = m.age.saturating_add(1);
    }
    markers.retain(|m| m.age < MARKER_LIFETIME);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Rng;

    #[test]
    fn point_count_follows_intensity() {
        assert_eq!(points_per_tick(1.0), 1);
        assert_eq!(points_per_tick(2.0), 2);
        assert_eq!(points_per_tick(5.0), 3);
        assert_eq!(points_per_tick(10.0), 6);
    }

    #[test]
    fn empty_profile_is_never_perturbed() {
        let mut p = HeightProfile::new(30);
        let params = DisturbanceParams {
            kind: DisturbanceKind::Impact,
            intensity: 10.0,
            placement: Placement::Random,
        };
        let hits = perturb(&mut p, &params, &mut Rng::new(3));
        assert!(hits.is_empty());
        assert_eq!(p.sum(), 0.0);
    }

    #[test]
    fn markers_expire_after_five_refreshes() {
        let mut markers = vec![
            DisturbanceMarker { position: 1, age: 0 },
            DisturbanceMarker { position: 2, age: 3 },
        ];
        age_markers(&mut markers);
        assert_eq!(markers.len(), 2);
        age_markers(&mut markers);
        assert_eq!(markers, vec![DisturbanceMarker { position: 1, age: 2 }]);
        for _ in 0..3 {
            age_markers(&mut markers);
        }
        assert!(markers.is_empty());
    }
}
