use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::disturbance::{DisturbanceKind, Placement};
use crate::error::ConfigError;
use crate::material::MaterialKind;

/// Run parameters. Material, uniformity and grid size are frozen once the
/// first particle lands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub grid_size: usize,
    pub material: MaterialKind,
    pub uniform: bool,
    pub target_particles: u32,
    /// Deposits per second for the building-phase ticker.
    pub speed: f64,
    /// Upper bound on relaxation sweeps per tick.
    pub max_sweeps: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            grid_size: 100,
            material: MaterialKind::Sand,
            uniform: true,
            target_particles: 1000,
            speed: 50.0,
            max_sweeps: 100_000,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_grid_size(self.grid_size)?;
        if self.target_particles < 1 {
            return Err(ConfigError::TargetParticles(self.target_particles));
        }
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(ConfigError::Speed(self.speed));
        }
        if self.max_sweeps < 1 {
            return Err(ConfigError::SweepCap);
        }
        Ok(())
    }

    /// Delay between building-phase ticks.
    pub fn deposit_interval(&self) -> Duration {
        Duration::from_micros((1_000_000.0 / self.speed).round() as u64)
    }
}

pub fn validate_grid_size(grid_size: usize) -> Result<(), ConfigError> {
    if grid_size < 2 {
        return Err(ConfigError::GridTooSmall(grid_size));
    }
    Ok(())
}

/// Disturbance controls. May change at any time after the pile is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisturbanceParams {
    pub kind: DisturbanceKind,
    /// Within [1, 10].
    pub intensity: f64,
    pub placement: Placement,
}

impl Default for DisturbanceParams {
    fn default() -> Self {
        Self {
            kind: DisturbanceKind::Rain,
            intensity: 5.0,
            placement: Placement::Random,
        }
    }
}

/// Disturbance ticks never fire faster than this.
const MIN_DISTURBANCE_INTERVAL_MS: f64 = 200.0;

impl DisturbanceParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.intensity.is_finite() && (1.0..=10.0).contains(&self.intensity)) {
            return Err(ConfigError::Intensity(self.intensity));
        }
        if let Placement::Manual { percent } = self.placement {
            if !(percent.is_finite() && (0.0..=100.0).contains(&percent)) {
                return Err(ConfigError::ManualPosition(percent));
            }
        }
        Ok(())
    }

    /// Delay between disturbance ticks: `max(200ms, 1000ms / intensity)`.
    pub fn interval(&self) -> Duration {
        let ms = (1000.0 / self.intensity).max(MIN_DISTURBANCE_INTERVAL_MS);
        Duration::from_micros((ms * 1000.0).round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Params::default().validate(), Ok(()));
        assert_eq!(DisturbanceParams::default().validate(), Ok(()));
    }

    #[test]
    fn out_of_range_values_fail_fast() {
        let p = Params {
            grid_size: 1,
            ..Params::default()
        };
        assert_eq!(p.validate(), Err(ConfigError::GridTooSmall(1)));

        let p = Params {
            target_particles: 0,
            ..Params::default()
        };
        assert_eq!(p.validate(), Err(ConfigError::TargetParticles(0)));

        let p = Params {
            speed: f64::NAN,
            ..Params::default()
        };
        assert!(matches!(p.validate(), Err(ConfigError::Speed(_))));

        let d = DisturbanceParams {
            intensity: 0.5,
            ..DisturbanceParams::default()
        };
        assert_eq!(d.validate(), Err(ConfigError::Intensity(0.5)));

        let d = DisturbanceParams {
            placement: Placement::Manual { percent: 101.0 },
            ..DisturbanceParams::default()
        };
        assert_eq!(d.validate(), Err(ConfigError::ManualPosition(101.0)));
    }

    #[test]
    fn deposit_interval_follows_speed() {
        assert_eq!(Params::default().deposit_interval(), Duration::from_millis(20));
        let p = Params {
            speed: 3.0,
            ..Params::default()
        };
        assert_eq!(p.deposit_interval(), Duration::from_micros(333_333));
    }

    #[test]
    fn disturbance_interval_has_a_floor() {
        let mut d = DisturbanceParams::default();
        assert_eq!(d.interval(), Duration::from_millis(200));
        d.intensity = 2.0;
        assert_eq!(d.interval(), Duration::from_millis(500));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let p: Params = serde_json::from_str(r#"{"grid_size": 40, "material": "clay"}"#).unwrap();
        assert_eq!(p.grid_size, 40);
        assert_eq!(p.material, MaterialKind::Clay);
        assert_eq!(p.target_particles, 1000);

        let json = r#"{"kind": "impact", "placement": {"mode": "manual", "percent": 30.0}}"#;
        let d: DisturbanceParams = serde_json::from_str(json).unwrap();
        assert_eq!(d.kind, DisturbanceKind::Impact);
        assert_eq!(d.placement, Placement::Manual { percent: 30.0 });
    }
}
