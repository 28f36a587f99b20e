use serde::Serialize;

use crate::disturbance::DisturbanceKind;
use crate::material::Material;
use crate::profile::HeightProfile;
use crate::rng::RandomSource;
use crate::stability::{Threshold, local_slope};

/// Fraction of the base transfer that cohesion can hold back.
const COHESION_DAMPING: f64 = 0.3;
/// Largest amount a failing cell sheds toward one neighbour in one sweep.
const BASE_TRANSFER: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OriginPhase {
    Building,
    Disturbance,
}

/// What triggered a relaxation pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Origin {
    Building,
    Disturbance { kind: DisturbanceKind, intensity: f64 },
}

impl Origin {
    pub fn phase(&self) -> OriginPhase {
        match self {
            Origin::Building => OriginPhase::Building,
            Origin::Disturbance { .. } => OriginPhase::Disturbance,
        }
    }

    pub fn disturbance(&self) -> Option<(DisturbanceKind, f64)> {
        match *self {
            Origin::Building => None,
            Origin::Disturbance { kind, intensity } => Some((kind, intensity)),
        }
    }
}

/// One cell's redistribution during one sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AvalancheEvent {
    pub position: usize,
    /// Number of neighbours that received material (1 or 2).
    pub size: u8,
    pub timestamp: u64,
    pub origin: Origin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Convergence {
    /// A sweep moved no material.
    Settled,
    /// Every allowed sweep still moved material.
    SweepLimit,
}

#[derive(Clone, Debug)]
pub struct Relaxation {
    pub events: Vec<AvalancheEvent>,
    pub sweeps: usize,
    pub convergence: Convergence,
}

impl Relaxation {
    pub fn settled(&self) -> bool {
        self.convergence == Convergence::Settled
    }
}

/// Everything a relaxation pass needs besides the profile itself.
#[derive(Clone, Copy, Debug)]
pub struct RelaxConfig<'a> {
    pub material: &'a Material,
    pub uniform: bool,
    pub max_sweeps: usize,
}

/// Relax `profile` in place with synchronous sweeps until a sweep moves no
/// material or `max_sweeps` sweeps have run.
///
/// Each sweep reads only start-of-sweep heights and writes into a fresh
/// buffer, so the result is independent of transfer order within a sweep.
/// Transfers move mass between adjacent cells only; the total is conserved.
/// Events come out in cell order within a sweep, sweep by sweep, all stamped
/// with `timestamp`.
pub fn relax(
    profile: &mut HeightProfile,
    cfg: RelaxConfig<'_>,
    origin: Origin,
    timestamp: u64,
    rng: &mut impl RandomSource,
) -> Relaxation {
    let threshold = Threshold::for_material(cfg.material, cfg.uniform);
    let max_transfer = BASE_TRANSFER * (1.0 - cfg.material.cohesion * COHESION_DAMPING);

    let mut events = Vec::new();
    let mut next = profile.as_slice().to_vec();
    let mut sweeps = 0;

    let convergence = loop {
        if sweeps >= cfg.max_sweeps {
            break Convergence::SweepLimit;
        }
        sweeps += 1;

        next.copy_from_slice(profile.as_slice());
        let moved = sweep(
            profile.as_slice(),
            &mut next,
            threshold,
            max_transfer,
            origin,
            timestamp,
            &mut events,
            rng,
        );
        if moved == 0 {
            break Convergence::Settled;
        }
        profile.swap_buffer(&mut next);
    };

    tracing::trace!(sweeps, events = events.len(), "relaxation pass");

    Relaxation {
        events,
        sweeps,
        convergence,
    }
}

/// One Jacobi sweep from `h` into `out`. Returns the number of transfers.
#[allow(clippy::too_many_arguments)]
fn sweep(
    h: &[f64],
    out: &mut [f64],
    threshold: Threshold,
    max_transfer: f64,
    origin: Origin,
    timestamp: u64,
    events: &mut Vec<AvalancheEvent>,
    rng: &mut impl RandomSource,
) -> usize {
    let n = h.len();
    let mut moved = 0;

    for i in 0..n {
        let slope = local_slope(h, i);
        if slope <= threshold.sample(rng) {
            continue;
        }

        let mut size = 0u8;
        if i > 0 && h[i] > h[i - 1] {
            let t = max_transfer.min((h[i] - h[i - 1]) / 2.0);
            out[i] -= t;
            out[i - 1] += t;
            size += 1;
        }
        if i + 1 < n && h[i] > h[i + 1] {
            let t = max_transfer.min((h[i] - h[i + 1]) / 2.0);
            out[i] -= t;
            out[i + 1] += t;
            size += 1;
        }

        if size > 0 {
            moved += size as usize;
            events.push(AvalancheEvent {
                position: i,
                size,
                timestamp,
                origin,
            });
        }
    }

    moved
}
