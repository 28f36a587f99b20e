use crate::profile::HeightProfile;
use crate::rng::RandomSource;

/// Mass added by one particle.
pub const PARTICLE_MASS: f64 = 1.0;

/// Drop index drawn from a bell around the grid centre: sigma = n/8, shape
/// from the sum of three uniforms (Irwin-Hall), clamped to the grid.
pub fn sample_drop_position(grid_size: usize, rng: &mut impl RandomSource) -> usize {
    let center = grid_size as f64 / 2.0;
    let sigma = grid_size as f64 / 8.0;
    let bell = rng.next_f64() + rng.next_f64() + rng.next_f64() - 1.5;
    let pos = (center + sigma * bell).floor();
    pos.clamp(0.0, (grid_size - 1) as f64) as usize
}

pub fn drop_particle(profile: &mut HeightProfile, pos: usize) {
    profile.add(pos, PARTICLE_MASS);
}
