use rayon::prelude::*;

use crate::disturbance::{DisturbanceKind, DisturbanceMarker};
use crate::material::MaterialKind;
use crate::profile::HeightProfile;
use crate::relax::AvalancheEvent;

const BACKGROUND: [u8; 4] = [26, 26, 46, 255];
const GRID_LINE: [u8; 4] = [51, 51, 51, 255];
const CONTOUR: [u8; 4] = [255, 255, 255, 255];
const HIGHLIGHT: [u8; 4] = [255, 255, 0, 255];
const RAIN_MARK: [u8; 4] = [50, 100, 200, 255];
const HIT_MARK: [u8; 4] = [200, 50, 50, 255];
/// Top-of-pile colour for non-uniform piles fades through this to the base.
const MIXED_MID: [u8; 4] = [254, 202, 87, 255];
const MIXED_BASE: [u8; 4] = [139, 69, 19, 255];

/// Vertical headroom above the tallest cell, in height units.
const HEADROOM: f64 = 10.0;
const MARKER_RADIUS: f64 = 4.0;
/// Highlight blend weight.
const HIGHLIGHT_ALPHA: f32 = 0.3;

#[inline]
fn lerp_color(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t).round() as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t).round() as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t).round() as u8,
        255,
    ]
}

pub fn material_color(kind: MaterialKind) -> [u8; 4] {
    match kind {
        MaterialKind::Sand => [254, 202, 87, 255],
        MaterialKind::Soil | MaterialKind::WoodPellets => [139, 69, 19, 255],
        MaterialKind::Clay => [160, 82, 45, 255],
        MaterialKind::Gravel => [128, 128, 128, 255],
        MaterialKind::MixedSoil => [101, 67, 33, 255],
    }
}

/// Everything the profile view draws besides the heights themselves.
pub struct Overlay<'a> {
    pub material: MaterialKind,
    pub uniform: bool,
    pub recent: Option<&'a AvalancheEvent>,
    pub markers: &'a [DisturbanceMarker],
    pub disturbance: DisturbanceKind,
}

/// Side-view rasterization of the pile: filled cross-section, white contour,
/// the latest avalanche cell tinted and disturbance markers as dots.
pub fn render_profile(
    profile: &HeightProfile,
    overlay: &Overlay<'_>,
    w: usize,
    h: usize,
) -> Vec<u8> {
    let n = profile.len();
    let y_scale = h as f64 / (profile.max_height().max(1.0) + HEADROOM);
    let top = material_color(overlay.material);
    let column_cell: Vec<usize> = (0..w).map(|x| x * n / w).collect();
    // Surface row (0 = top of image) for each pixel column.
    let surface: Vec<f64> = column_cell
        .iter()
        .map(|&i| h as f64 - profile.get(i) * y_scale)
        .collect();
    let grid_every = (w / n.max(1)).max(1) * 10;

    let markers: Vec<(f64, f64)> = overlay
        .markers
        .iter()
        .filter(|m| m.position < n)
        .map(|m| {
            let x = (m.position as f64 + 0.5) * w as f64 / n as f64;
            let y = h as f64 - profile.get(m.position) * y_scale;
            (x, y)
        })
        .collect();
    let mark = match overlay.disturbance {
        DisturbanceKind::Rain => RAIN_MARK,
        _ => HIT_MARK,
    };

    let mut rgba = vec![0u8; w * h * 4];
    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        let yf = y as f64 + 0.5;
        let depth = y as f32 / h as f32;
        for x in 0..w {
            let s = surface[x];
            let mut color = if yf >= s {
                if overlay.uniform {
                    lerp_color(top, BACKGROUND, depth * 0.4)
                } else if depth < 0.5 {
                    lerp_color(top, MIXED_MID, depth * 2.0)
                } else {
                    lerp_color(MIXED_MID, MIXED_BASE, (depth - 0.5) * 2.0)
                }
            } else if x % grid_every == 0 {
                GRID_LINE
            } else {
                BACKGROUND
            };

            if (yf - s).abs() < 1.0 {
                color = CONTOUR;
            }
            if overlay.recent.is_some_and(|e| e.position == column_cell[x]) {
                color = lerp_color(color, HIGHLIGHT, HIGHLIGHT_ALPHA);
            }
            let xf = x as f64 + 0.5;
            let in_marker = |&(mx, my): &(f64, f64)| {
                (xf - mx).powi(2) + (yf - my).powi(2) <= MARKER_RADIUS * MARKER_RADIUS
            };
            if markers.iter().any(in_marker) {
                color = mark;
            }

            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}

/// Diagnostic: one grayscale pixel row per profile, brightness = height.
pub fn render_heightstrip(profile: &HeightProfile) -> Vec<u8> {
    let max_h = profile.max_height().max(1.0);
    let mut rgba = vec![0u8; profile.len() * 4];
    for (i, &height) in profile.as_slice().iter().enumerate() {
        let v = ((height / max_h) * 255.0).clamp(0.0, 255.0) as u8;
        rgba[i * 4..i * 4 + 4].copy_from_slice(&[v, v, v, 255]);
    }
    rgba
}
