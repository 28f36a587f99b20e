//! Flat, ordered records for downstream formatters (CSV, JSON, ...).
//!
//! Field declaration order is the serialization order and is part of the
//! contract: run parameters, per-cell heights, per-avalanche rows,
//! per-disturbance rows, then the summary block.

use serde::Serialize;

use crate::disturbance::DisturbanceKind;
use crate::relax::OriginPhase;
use crate::rng::RandomSource;
use crate::sim::Simulation;
use crate::stats::AggregateStats;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunParameters {
    pub material: &'static str,
    pub uniform: bool,
    pub density: f64,
    pub cohesion: f64,
    pub critical_angle_deg: f64,
    pub repose_angle_deg: f64,
    pub theoretical_repose_angle_deg: f64,
    pub target_particles: u32,
    pub particles_dropped: u32,
    pub max_height: f64,
    pub base_width: usize,
    pub aspect_ratio: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ProfileCell {
    pub index: usize,
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AvalancheRow {
    /// 1-based row number.
    pub index: usize,
    pub position: usize,
    pub size: u8,
    pub timestamp: u64,
    pub phase: OriginPhase,
    pub material: &'static str,
    pub from_disturbance: bool,
    pub disturbance_type: Option<DisturbanceKind>,
    pub disturbance_intensity: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisturbanceRow {
    /// 1-based row number.
    pub index: usize,
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub kind: DisturbanceKind,
    pub intensity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub stats: AggregateStats,
    /// Disturbance type selected at export time.
    pub disturbance_type: DisturbanceKind,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportRecord {
    pub parameters: RunParameters,
    pub profile: Vec<ProfileCell>,
    pub avalanches: Vec<AvalancheRow>,
    pub disturbances: Vec<DisturbanceRow>,
    pub summary: Summary,
}

pub fn export<R: RandomSource>(sim: &Simulation<R>) -> ExportRecord {
    let kind = sim.params().material;
    let material = kind.material();
    let stats = sim.stats();

    let parameters = RunParameters {
        material: material.name,
        uniform: sim.params().uniform,
        density: material.density,
        cohesion: material.cohesion,
        critical_angle_deg: material.critical_angle_deg,
        repose_angle_deg: sim.angle_of_repose(),
        theoretical_repose_angle_deg: material.critical_angle_deg,
        target_particles: sim.params().target_particles,
        particles_dropped: sim.particles_dropped(),
        max_height: stats.max_height,
        base_width: stats.base_width,
        aspect_ratio: stats.aspect_ratio,
    };

    let profile = sim
        .profile()
        .as_slice()
        .iter()
        .enumerate()
        .map(|(index, &height)| ProfileCell { index, height })
        .collect();

    let avalanches = sim
        .avalanches()
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let disturbance = e.origin.disturbance();
            AvalancheRow {
                index: i + 1,
                position: e.position,
                size: e.size,
                timestamp: e.timestamp,
                phase: e.origin.phase(),
                material: kind.key(),
                from_disturbance: disturbance.is_some(),
                disturbance_type: disturbance.map(|(k, _)| k),
                disturbance_intensity: disturbance.map(|(_, x)| x),
            }
        })
        .collect();

    let disturbances = sim
        .disturbance_events()
        .iter()
        .enumerate()
        .map(|(i, e)| DisturbanceRow {
            index: i + 1,
            timestamp: e.timestamp,
            kind: e.kind,
            intensity: e.intensity,
        })
        .collect();

    ExportRecord {
        parameters,
        profile,
        avalanches,
        disturbances,
        summary: Summary {
            stats,
            disturbance_type: sim.disturbance_params().kind,
        },
    }
}
