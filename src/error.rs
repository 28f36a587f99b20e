use thiserror::Error;

use crate::sim::Phase;

/// Invalid run or disturbance parameters. Raised before anything is mutated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid size must be at least 2, got {0}")]
    GridTooSmall(usize),

    #[error("unknown material: {0:?}")]
    UnknownMaterial(String),

    #[error("target particle count must be at least 1, got {0}")]
    TargetParticles(u32),

    #[error("deposition speed must be a positive finite number, got {0}")]
    Speed(f64),

    #[error("disturbance intensity must be within [1, 10], got {0}")]
    Intensity(f64),

    #[error("manual disturbance position must be within [0, 100] percent, got {0}")]
    ManualPosition(f64),

    #[error("relaxation sweep cap must be at least 1")]
    SweepCap,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{op} is not allowed in phase {phase:?}")]
    WrongPhase { op: &'static str, phase: Phase },

    #[error("material, uniformity and grid size are locked once particles have been dropped")]
    Locked,

    #[error("relaxation did not settle within {sweeps} sweeps")]
    NotConverged { sweeps: usize },
}
