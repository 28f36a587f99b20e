use serde::Serialize;

use crate::config::{DisturbanceParams, Params, validate_grid_size};
use crate::deposit;
use crate::disturbance::{self, DisturbanceEvent, DisturbanceMarker};
use crate::error::{ConfigError, SimError};
use crate::material::{Material, MaterialKind};
use crate::profile::HeightProfile;
use crate::relax::{self, AvalancheEvent, Origin, RelaxConfig, Relaxation};
use crate::rng::{RandomSource, Rng};
use crate::stats::{self, AggregateStats};

/// How long a caller should keep `recent_avalanche` highlighted.
pub const HIGHLIGHT_MS: u64 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Building,
    Complete,
    DisturbanceActive,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TickKind {
    Deposit { position: usize },
    /// Targets actually perturbed; empty when every point hit bare ground.
    Disturbance { targets: Vec<usize> },
}

/// What one tick did.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub kind: TickKind,
    pub avalanches: usize,
    pub sweeps: usize,
}

/// One simulation run: the height profile, event logs, counters and the
/// phase machine. All mutation goes through its methods.
///
/// Phases move `Building -> Complete -> DisturbanceActive`, with
/// `DisturbanceActive -> Complete` on request and `reset` returning any
/// phase to an empty `Building` state.
pub struct Simulation<R: RandomSource = Rng> {
    params: Params,
    disturbance: DisturbanceParams,
    phase: Phase,
    /// Whether `tick` should act in the current phase.
    running: bool,
    profile: HeightProfile,
    avalanches: Vec<AvalancheEvent>,
    disturbance_events: Vec<DisturbanceEvent>,
    markers: Vec<DisturbanceMarker>,
    recent_avalanche: Option<AvalancheEvent>,
    particles_dropped: u32,
    disturbance_count: u64,
    clock: u64,
    rng: R,
}

impl Simulation<Rng> {
    pub fn new(params: Params, seed: u64) -> Result<Self, SimError> {
        Self::with_rng(params, Rng::new(seed))
    }
}

impl<R: RandomSource> Simulation<R> {
    pub fn with_rng(params: Params, rng: R) -> Result<Self, SimError> {
        params.validate()?;
        Ok(Self {
            profile: HeightProfile::new(params.grid_size),
            params,
            disturbance: DisturbanceParams::default(),
            phase: Phase::Building,
            running: false,
            avalanches: Vec::new(),
            disturbance_events: Vec::new(),
            markers: Vec::new(),
            recent_avalanche: None,
            particles_dropped: 0,
            disturbance_count: 0,
            clock: 0,
            rng,
        })
    }

    // ---- reads ----

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn disturbance_params(&self) -> &DisturbanceParams {
        &self.disturbance
    }

    pub fn material(&self) -> &'static Material {
        self.params.material.material()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn profile(&self) -> &HeightProfile {
        &self.profile
    }

    pub fn avalanches(&self) -> &[AvalancheEvent] {
        &self.avalanches
    }

    pub fn building_avalanches(&self) -> impl Iterator<Item = &AvalancheEvent> {
        self.avalanches
            .iter()
            .filter(|e| matches!(e.origin, Origin::Building))
    }

    pub fn disturbance_avalanches(&self) -> impl Iterator<Item = &AvalancheEvent> {
        self.avalanches
            .iter()
            .filter(|e| matches!(e.origin, Origin::Disturbance { .. }))
    }

    pub fn disturbance_events(&self) -> &[DisturbanceEvent] {
        &self.disturbance_events
    }

    pub fn markers(&self) -> &[DisturbanceMarker] {
        &self.markers
    }

    pub fn recent_avalanche(&self) -> Option<&AvalancheEvent> {
        self.recent_avalanche.as_ref()
    }

    pub fn particles_dropped(&self) -> u32 {
        self.particles_dropped
    }

    pub fn total_avalanches(&self) -> usize {
        self.avalanches.len()
    }

    pub fn disturbance_count(&self) -> u64 {
        self.disturbance_count
    }

    pub fn angle_of_repose(&self) -> f64 {
        stats::angle_of_repose(&self.profile)
    }

    pub fn stats(&self) -> AggregateStats {
        stats::aggregate(&self.profile, &self.avalanches, self.disturbance_events.len())
    }

    // ---- configuration ----

    fn ensure_unlocked(&self) -> Result<(), SimError> {
        if self.particles_dropped > 0 {
            return Err(SimError::Locked);
        }
        Ok(())
    }

    pub fn set_material(&mut self, material: MaterialKind) -> Result<(), SimError> {
        self.ensure_unlocked()?;
        self.params.material = material;
        Ok(())
    }

    pub fn set_material_key(&mut self, key: &str) -> Result<(), SimError> {
        let kind = MaterialKind::from_key(key)?;
        self.set_material(kind)
    }

    pub fn set_uniform(&mut self, uniform: bool) -> Result<(), SimError> {
        self.ensure_unlocked()?;
        self.params.uniform = uniform;
        Ok(())
    }

    pub fn set_grid_size(&mut self, grid_size: usize) -> Result<(), SimError> {
        self.ensure_unlocked()?;
        validate_grid_size(grid_size)?;
        self.params.grid_size = grid_size;
        self.profile = HeightProfile::new(grid_size);
        Ok(())
    }

    pub fn set_target_particles(&mut self, target: u32) -> Result<(), SimError> {
        self.ensure_unlocked()?;
        if target < 1 {
            return Err(ConfigError::TargetParticles(target).into());
        }
        self.params.target_particles = target;
        Ok(())
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<(), SimError> {
        let next = Params {
            speed,
            ..self.params.clone()
        };
        next.validate()?;
        self.params = next;
        Ok(())
    }

    pub fn set_max_sweeps(&mut self, max_sweeps: usize) -> Result<(), SimError> {
        if max_sweeps < 1 {
            return Err(ConfigError::SweepCap.into());
        }
        self.params.max_sweeps = max_sweeps;
        Ok(())
    }

    pub fn set_disturbance(&mut self, params: DisturbanceParams) -> Result<(), SimError> {
        params.validate()?;
        self.disturbance = params;
        Ok(())
    }

    // ---- phase machine ----

    fn require(&self, op: &'static str, phase: Phase) -> Result<(), SimError> {
        if self.phase != phase {
            return Err(SimError::WrongPhase {
                op,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: Phase) {
        tracing::debug!(from = ?self.phase, to = ?to, "phase transition");
        self.phase = to;
    }

    /// Start or resume the building ticker.
    pub fn start(&mut self) -> Result<(), SimError> {
        self.require("start", Phase::Building)?;
        self.running = true;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SimError> {
        self.require("pause", Phase::Building)?;
        self.running = false;
        Ok(())
    }

    /// `Complete -> DisturbanceActive`, with the disturbance ticker running.
    pub fn start_disturbance(&mut self) -> Result<(), SimError> {
        self.require("start_disturbance", Phase::Complete)?;
        self.transition(Phase::DisturbanceActive);
        self.running = true;
        Ok(())
    }

    /// Pause or resume the disturbance ticker. Returns the new running flag.
    pub fn toggle_disturbance(&mut self) -> Result<bool, SimError> {
        self.require("toggle_disturbance", Phase::DisturbanceActive)?;
        self.running = !self.running;
        Ok(self.running)
    }

    /// `DisturbanceActive -> Complete`.
    pub fn return_to_complete(&mut self) -> Result<(), SimError> {
        self.require("return_to_complete", Phase::DisturbanceActive)?;
        self.transition(Phase::Complete);
        self.running = false;
        Ok(())
    }

    /// Back to an empty `Building` state. Parameters are kept.
    pub fn reset(&mut self) {
        tracing::debug!(from = ?self.phase, "reset");
        self.phase = Phase::Building;
        self.running = false;
        self.profile.clear();
        self.avalanches.clear();
        self.disturbance_events.clear();
        self.markers.clear();
        self.recent_avalanche = None;
        self.particles_dropped = 0;
        self.disturbance_count = 0;
        self.clock = 0;
    }

    /// One step of whichever ticker the current phase owns. Returns `None`
    /// when paused or in `Complete`.
    pub fn tick(&mut self) -> Result<Option<TickReport>, SimError> {
        if !self.running {
            return Ok(None);
        }
        match self.phase {
            Phase::Building => self.deposit().map(Some),
            Phase::DisturbanceActive => self.disturb().map(Some),
            Phase::Complete => Ok(None),
        }
    }

    // ---- mutation ----

    fn relax(&mut self, origin: Origin) -> Relaxation {
        let cfg = RelaxConfig {
            material: self.params.material.material(),
            uniform: self.params.uniform,
            max_sweeps: self.params.max_sweeps,
        };
        relax::relax(&mut self.profile, cfg, origin, self.clock, &mut self.rng)
    }

    /// Append a pass's events to the logs. The profile is already updated.
    fn record(&mut self, relaxation: &Relaxation) {
        if let Some(last) = relaxation.events.last() {
            self.recent_avalanche = Some(*last);
        }
        self.avalanches.extend_from_slice(&relaxation.events);
    }

    fn check_settled(relaxation: &Relaxation, origin: Origin) -> Result<(), SimError> {
        if relaxation.settled() {
            return Ok(());
        }
        tracing::warn!(sweeps = relaxation.sweeps, ?origin, "relaxation hit the sweep cap");
        Err(SimError::NotConverged {
            sweeps: relaxation.sweeps,
        })
    }

    /// Drop one particle and relax. Moves to `Complete` once the target
    /// count is reached.
    ///
    /// If relaxation hits the sweep cap the particle, events and counters are
    /// still committed before `NotConverged` is returned.
    pub fn deposit(&mut self) -> Result<TickReport, SimError> {
        self.require("deposit", Phase::Building)?;
        let pos = deposit::sample_drop_position(self.params.grid_size, &mut self.rng);
        self.deposit_at(pos)
    }

    /// `deposit` with a caller-chosen drop index.
    pub fn deposit_at(&mut self, pos: usize) -> Result<TickReport, SimError> {
        self.require("deposit", Phase::Building)?;
        let pos = pos.min(self.params.grid_size - 1);
        self.clock += 1;

        deposit::drop_particle(&mut self.profile, pos);
        let relaxation = self.relax(Origin::Building);
        self.record(&relaxation);
        self.particles_dropped += 1;

        if self.particles_dropped >= self.params.target_particles {
            tracing::info!(
                particles = self.particles_dropped,
                avalanches = self.avalanches.len(),
                "pile complete"
            );
            self.running = false;
            self.transition(Phase::Complete);
        }

        Self::check_settled(&relaxation, Origin::Building)?;
        Ok(TickReport {
            kind: TickKind::Deposit { position: pos },
            avalanches: relaxation.events.len(),
            sweeps: relaxation.sweeps,
        })
    }

    /// Apply one tick of the configured disturbance and relax.
    ///
    /// A tick in which no point found material is a no-op: no event, no
    /// relaxation, markers untouched.
    pub fn disturb(&mut self) -> Result<TickReport, SimError> {
        self.require("disturb", Phase::DisturbanceActive)?;
        self.clock += 1;

        let targets = disturbance::perturb(&mut self.profile, &self.disturbance, &mut self.rng);
        if targets.is_empty() {
            return Ok(TickReport {
                kind: TickKind::Disturbance { targets },
                avalanches: 0,
                sweeps: 0,
            });
        }

        self.disturbance_count += 1;
        self.disturbance_events.push(DisturbanceEvent {
            timestamp: self.clock,
            kind: self.disturbance.kind,
            intensity: self.disturbance.intensity,
            sequence: self.disturbance_count,
        });

        let origin = Origin::Disturbance {
            kind: self.disturbance.kind,
            intensity: self.disturbance.intensity,
        };
        let relaxation = self.relax(origin);
        self.record(&relaxation);
        self.markers = targets
            .iter()
            .map(|&position| DisturbanceMarker { position, age: 0 })
            .collect();

        Self::check_settled(&relaxation, origin)?;
        Ok(TickReport {
            kind: TickKind::Disturbance { targets },
            avalanches: relaxation.events.len(),
            sweeps: relaxation.sweeps,
        })
    }

    // ---- display side channel ----

    /// Age markers by one refresh, dropping expired ones.
    pub fn refresh_markers(&mut self) {
        disturbance::age_markers(&mut self.markers);
    }

    /// Call once `HIGHLIGHT_MS` has passed since the last tick.
    pub fn clear_recent_avalanche(&mut self) {
        self.recent_avalanche = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disturbance::{DisturbanceKind, Placement};

    fn small(target: u32) -> Params {
        Params {
            grid_size: 20,
            target_particles: target,
            ..Params::default()
        }
    }

    #[test]
    fn building_completes_at_target() {
        let mut sim = Simulation::new(small(5), 1).unwrap();
        for _ in 0..5 {
            sim.deposit().unwrap();
        }
        assert_eq!(sim.phase(), Phase::Complete);
        assert_eq!(sim.particles_dropped(), 5);
        assert!((sim.profile().sum() - 5.0).abs() < 1e-9);
        assert!(matches!(
            sim.deposit(),
            Err(SimError::WrongPhase { op: "deposit", phase: Phase::Complete })
        ));
    }

    #[test]
    fn tick_respects_running_flag() {
        let mut sim = Simulation::new(small(3), 2).unwrap();
        assert_eq!(sim.tick().unwrap(), None);
        sim.start().unwrap();
        while sim.phase() == Phase::Building {
            assert!(sim.tick().unwrap().is_some());
        }
        assert!(!sim.is_running());
        assert_eq!(sim.tick().unwrap(), None);
    }

    #[test]
    fn config_locks_after_first_drop() {
        let mut sim = Simulation::new(small(10), 3).unwrap();
        sim.set_material(MaterialKind::Clay).unwrap();
        sim.set_grid_size(30).unwrap();
        assert_eq!(sim.profile().len(), 30);
        assert_eq!(
            sim.set_material_key("granite"),
            Err(SimError::Config(ConfigError::UnknownMaterial("granite".into())))
        );

        assert_eq!(
            sim.set_target_particles(0),
            Err(SimError::Config(ConfigError::TargetParticles(0)))
        );
        sim.set_target_particles(12).unwrap();
        assert_eq!(sim.params().target_particles, 12);

        sim.deposit().unwrap();
        assert_eq!(sim.set_target_particles(50), Err(SimError::Locked));
        assert_eq!(sim.set_uniform(false), Err(SimError::Locked));
        assert_eq!(sim.set_grid_size(10), Err(SimError::Locked));
        assert_eq!(sim.set_material(MaterialKind::Sand), Err(SimError::Locked));
        // scheduling knobs stay adjustable
        sim.set_speed(10.0).unwrap();
        sim.set_max_sweeps(500).unwrap();
        assert_eq!(sim.params().max_sweeps, 500);
        assert_eq!(sim.set_max_sweeps(0), Err(SimError::Config(ConfigError::SweepCap)));

        sim.reset();
        sim.set_material(MaterialKind::Sand).unwrap();
    }

    #[test]
    fn disturbance_phase_round_trip() {
        let mut sim = Simulation::new(small(1), 4).unwrap();
        assert!(sim.start_disturbance().is_err());
        sim.deposit().unwrap();
        sim.start_disturbance().unwrap();
        assert_eq!(sim.phase(), Phase::DisturbanceActive);
        assert!(sim.is_running());
        assert!(!sim.toggle_disturbance().unwrap());
        assert_eq!(sim.tick().unwrap(), None);
        sim.return_to_complete().unwrap();
        assert_eq!(sim.phase(), Phase::Complete);
        sim.start_disturbance().unwrap();

        sim.reset();
        assert_eq!(sim.phase(), Phase::Building);
        assert_eq!(sim.particles_dropped(), 0);
        assert_eq!(sim.profile().sum(), 0.0);
        assert!(sim.avalanches().is_empty());
    }

    #[test]
    fn disturbance_tick_records_event_and_markers() {
        let mut sim = Simulation::new(small(200), 5).unwrap();
        while sim.phase() == Phase::Building {
            sim.deposit().unwrap();
        }
        sim.set_disturbance(DisturbanceParams {
            kind: DisturbanceKind::Impact,
            intensity: 4.0,
            placement: Placement::Manual { percent: 50.0 },
        })
        .unwrap();
        sim.start_disturbance().unwrap();

        let report = sim.disturb().unwrap();
        let TickKind::Disturbance { targets } = &report.kind else {
            panic!("expected a disturbance tick");
        };
        assert_eq!(targets.len(), 3);
        assert_eq!(sim.disturbance_count(), 1);
        let ev = sim.disturbance_events()[0];
        assert_eq!(ev.sequence, 1);
        assert_eq!(ev.kind, DisturbanceKind::Impact);
        assert_eq!(sim.markers().len(), 3);
        assert!(sim.profile().as_slice().iter().all(|&h| h >= 0.0));
        assert!(sim
            .disturbance_avalanches()
            .all(|e| e.origin.disturbance() == Some((DisturbanceKind::Impact, 4.0))));
    }

    #[test]
    fn sweep_cap_commits_then_reports() {
        let params = Params {
            max_sweeps: 1,
            ..small(10)
        };
        let mut sim = Simulation::new(params, 6).unwrap();
        // the first sweep moves material, so a single sweep can never confirm a settled pile
        let err = sim.deposit_at(10).unwrap_err();
        assert_eq!(err, SimError::NotConverged { sweeps: 1 });
        assert_eq!(sim.particles_dropped(), 1);
        assert_eq!(sim.avalanches().len(), 1);
        assert_eq!(sim.profile().get(9), 0.5);
        assert_eq!(sim.profile().get(11), 0.5);
        assert_eq!(sim.phase(), Phase::Building);
    }

    #[test]
    fn recent_avalanche_is_the_last_event() {
        let mut sim = Simulation::new(small(10), 7).unwrap();
        sim.deposit_at(10).unwrap();
        assert_eq!(sim.recent_avalanche(), sim.avalanches().last());
        sim.clear_recent_avalanche();
        assert!(sim.recent_avalanche().is_none());
    }
}
