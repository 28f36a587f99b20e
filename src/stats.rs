use serde::Serialize;

use crate::profile::HeightProfile;
use crate::relax::{AvalancheEvent, OriginPhase};

/// Cells at or below this height do not count toward the pile's base.
const BASE_CUTOFF: f64 = 0.1;
/// A flank ends at the first cell below this fraction of the peak.
const FLANK_CUTOFF: f64 = 0.1;

/// Measured angle of repose in degrees.
///
/// Each flank is scanned outward from the first peak to the first cell below
/// 10% of the peak height. A flank that never drops that low contributes 0,
/// so the average is biased low for piles that touch a grid edge.
pub fn angle_of_repose(profile: &HeightProfile) -> f64 {
    let (peak, peak_idx) = profile.peak();
    if peak <= 0.0 {
        return 0.0;
    }
    let h = profile.as_slice();
    let cutoff = peak * FLANK_CUTOFF;
    let angle = |j: usize, dist: usize| ((peak - h[j]) / dist as f64).atan().to_degrees();

    let left = (0..peak_idx)
        .rev()
        .find(|&j| h[j] < cutoff)
        .map_or(0.0, |j| angle(j, peak_idx - j));
    let right = (peak_idx + 1..h.len())
        .find(|&j| h[j] < cutoff)
        .map_or(0.0, |j| angle(j, j - peak_idx));

    (left + right) / 2.0
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PhaseStats {
    pub count: usize,
    pub mean_size: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub building: PhaseStats,
    pub disturbance: PhaseStats,
    pub total_avalanches: usize,
    pub disturbance_events: usize,
    /// Disturbance avalanches per building avalanche.
    pub disturbance_ratio: f64,
    pub max_height: f64,
    pub base_width: usize,
    pub aspect_ratio: f64,
}

fn phase_stats(events: &[AvalancheEvent], phase: OriginPhase) -> PhaseStats {
    let (count, total) = events
        .iter()
        .filter(|e| e.origin.phase() == phase)
        .fold((0usize, 0u64), |(c, t), e| (c + 1, t + e.size as u64));
    PhaseStats {
        count,
        mean_size: if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        },
    }
}

pub fn base_width(profile: &HeightProfile) -> usize {
    profile.as_slice().iter().filter(|&&h| h > BASE_CUTOFF).count()
}

pub fn aggregate(
    profile: &HeightProfile,
    events: &[AvalancheEvent],
    disturbance_events: usize,
) -> AggregateStats {
    let building = phase_stats(events, OriginPhase::Building);
    let disturbance = phase_stats(events, OriginPhase::Disturbance);
    let max_height = profile.max_height();
    let base_width = base_width(profile);

    let disturbance_ratio = if disturbance.count > 0 {
        disturbance.count as f64 / building.count.max(1) as f64
    } else {
        0.0
    };

    AggregateStats {
        building,
        disturbance,
        total_avalanches: events.len(),
        disturbance_events,
        disturbance_ratio,
        max_height,
        base_width,
        aspect_ratio: max_height / base_width.max(1) as f64,
    }
}
