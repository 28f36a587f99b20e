use crate::material::Material;
use crate::rng::RandomSource;

/// Steepest absolute height step between cell `i` and its in-range neighbours.
/// Requires `h.len() >= 2`.
#[inline]
pub fn local_slope(h: &[f64], i: usize) -> f64 {
    let last = h.len() - 1;
    if i == 0 {
        (h[0] - h[1]).abs()
    } else if i == last {
        (h[last] - h[last - 1]).abs()
    } else {
        (h[i] - h[i - 1]).abs().max((h[i] - h[i + 1]).abs())
    }
}

/// Slope above which a cell fails.
///
/// Uniform material has a fixed threshold, computed once per relaxation.
/// Non-uniform material draws a fresh angle in
/// `critical ± variance/2` on every check: the noise is per check, not a
/// fixed roughness per cell.
#[derive(Clone, Copy, Debug)]
pub enum Threshold {
    Fixed(f64),
    Noisy { angle_deg: f64, variance_deg: f64 },
}

impl Threshold {
    pub fn for_material(material: &Material, uniform: bool) -> Self {
        if uniform {
            Threshold::Fixed(material.critical_angle_deg.to_radians().tan())
        } else {
            Threshold::Noisy {
                angle_deg: material.critical_angle_deg,
                variance_deg: material.variance_deg,
            }
        }
    }

    #[inline]
    pub fn sample(&self, rng: &mut impl RandomSource) -> f64 {
        match *self {
            Threshold::Fixed(t) => t,
            Threshold::Noisy {
                angle_deg,
                variance_deg,
            } => {
                let half = variance_deg / 2.0;
                let angle = angle_deg + rng.range_f64(-half, half);
                angle.to_radians().tan()
            }
        }
    }
}

/// One-shot form of `Threshold::for_material(..).sample(..)`.
pub fn critical_threshold(material: &Material, uniform: bool, rng: &mut impl RandomSource) -> f64 {
    Threshold::for_material(material, uniform).sample(rng)
}
