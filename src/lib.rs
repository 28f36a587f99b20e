pub mod config;
pub mod deposit;
pub mod disturbance;
pub mod error;
pub mod export;
pub mod material;
pub mod profile;
pub mod relax;
pub mod render;
pub mod rng;
pub mod sim;
pub mod stability;
pub mod stats;

use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use config::{DisturbanceParams, Params};
use error::SimError;
use sim::{Phase, Simulation};
use stats::AggregateStats;

pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// Disturbance stage of a headless run.
#[derive(Clone, Debug)]
pub struct DisturbancePlan {
    pub params: DisturbanceParams,
    pub ticks: usize,
}

/// Build a pile to `params.target_particles`, then optionally disturb it,
/// driving the engine directly instead of through a ticker.
pub fn simulate(
    seed: u64,
    params: &Params,
    plan: Option<&DisturbancePlan>,
) -> Result<(Simulation, Vec<Timing>), SimError> {
    let mut timings = Vec::new();
    let total_start = Instant::now();

    let mut sim = Simulation::new(params.clone(), seed)?;
    if let Some(plan) = plan {
        sim.set_disturbance(plan.params.clone())?;
    }

    // 1. Building phase
    let t = Instant::now();
    while sim.phase() == Phase::Building {
        sim.deposit()?;
    }
    timings.push(Timing {
        name: "build",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    // 2. Disturbance phase
    if let Some(plan) = plan {
        let t = Instant::now();
        sim.start_disturbance()?;
        for _ in 0..plan.ticks {
            sim.disturb()?;
            sim.refresh_markers();
        }
        sim.return_to_complete()?;
        timings.push(Timing {
            name: "disturb",
            ms: t.elapsed().as_secs_f64() * 1000.0,
        });
    }

    timings.push(Timing {
        name: "TOTAL",
        ms: total_start.elapsed().as_secs_f64() * 1000.0,
    });

    Ok((sim, timings))
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub repose_angle_deg: f64,
    pub stats: AggregateStats,
}

/// Independent seeded runs in parallel, one summary per seed in input order.
pub fn ensemble(
    seeds: &[u64],
    params: &Params,
    plan: Option<&DisturbancePlan>,
) -> Vec<Result<RunSummary, SimError>> {
    seeds
        .par_iter()
        .map(|&seed| {
            let (sim, _) = simulate(seed, params, plan)?;
            Ok(RunSummary {
                seed,
                repose_angle_deg: sim.angle_of_repose(),
                stats: sim.stats(),
            })
        })
        .collect()
}
