//! Full-grid passes for the fields that are never stored-and-decayed on
//! their own: coherence, the intentional flow, and the sensory channels.

use super::diffusion::gradient_at;
use rand::Rng;
use rayon::prelude::*;

pub const SENSE_GRAD_VALUE_MASS: usize = 0;
pub const SENSE_GRAD_WILL: usize = 1;
pub const SENSE_DENSITY: usize = 2;
pub const SENSE_DANGER: usize = 3;
pub const SENSE_CALM: usize = 4;

/// `coherence = field_max * (1 - exp(-vm * will / scale))`
pub fn refresh_coherence(value_mass: &[f32], will: &[f32], out: &mut [f32], field_max: f32, scale: f32) {
    out.par_iter_mut()
        .zip(value_mass.par_iter().zip(will.par_iter()))
        .for_each(|(c, (vm, w))| {
            let product = (vm * w).max(0.0);
            *c = (field_max * (1.0 - (-product / scale).exp())).clamp(0.0, field_max);
        });
}

/// Unit vector along `-∇will`, written as two planes `[x..., y...]`.
pub fn refresh_intentional(will: &[f32], out: &mut [f32], width: usize, height: usize) {
    let plane = width * height;
    let (out_x, out_y) = out.split_at_mut(plane);
    out_x
        .par_chunks_mut(width)
        .zip(out_y.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (row_x, row_y))| {
            for x in 0..width {
                let (gx, gy) = gradient_at(will, width, height, x, y);
                let mag = (gx * gx + gy * gy).sqrt();
                if mag > 1e-6 {
                    row_x[x] = -gx / mag;
                    row_y[x] = -gy / mag;
                } else {
                    row_x[x] = 0.0;
                    row_y[x] = 0.0;
                }
            }
        });
}

/// Gradient magnitude of `src` into `out`, normalised so the grid maximum is 1.
pub fn refresh_gradient_magnitude(src: &[f32], out: &mut [f32], width: usize, height: usize) {
    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for x in 0..width {
            let (gx, gy) = gradient_at(src, width, height, x, y);
            row[x] = (gx * gx + gy * gy).sqrt();
        }
    });
    normalise(out);
}

/// Live agent count per cell, normalised by the densest cell.
pub fn refresh_density(occupancy: &[u32], out: &mut [f32]) {
    let peak = occupancy.iter().copied().max().unwrap_or(0);
    if peak == 0 {
        out.iter_mut().for_each(|v| *v = 0.0);
        return;
    }
    let inv = 1.0 / peak as f32;
    out.iter_mut()
        .zip(occupancy.iter())
        .for_each(|(v, n)| *v = *n as f32 * inv);
}

/// Low-amplitude uniform noise in `[0, amplitude)`.
pub fn inject_danger<R: Rng + ?Sized>(out: &mut [f32], amplitude: f32, rng: &mut R) {
    if amplitude <= 0.0 {
        out.iter_mut().for_each(|v| *v = 0.0);
        return;
    }
    for v in out.iter_mut() {
        *v = rng.gen::<f32>() * amplitude.min(1.0);
    }
}

fn normalise(data: &mut [f32]) {
    let peak = data.iter().cloned().fold(0.0f32, f32::max);
    if peak > 0.0 {
        let inv = 1.0 / peak;
        data.par_iter_mut().for_each(|v| *v = (*v * inv).clamp(0.0, 1.0));
    } else {
        data.iter_mut().for_each(|v| *v = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn coherence_saturates_below_ceiling() {
        let vm = vec![0.0, 1.0, 10.0];
        let will = vec![5.0, 1.0, 10.0];
        let mut out = vec![0.0; 3];
        refresh_coherence(&vm, &will, &mut out, 10.0, 4.0);
        assert_eq!(out[0], 0.0);
        assert!(out[1] > 0.0 && out[1] < out[2]);
        assert!(out[2] <= 10.0);
    }

    #[test]
    fn intentional_flows_down_the_will_slope() {
        let (w, h) = (5, 3);
        let will: Vec<f32> = (0..w * h).map(|i| (i % w) as f32).collect();
        let mut out = vec![0.0; 2 * w * h];
        refresh_intentional(&will, &mut out, w, h);
        let i = w + 2;
        assert!((out[i] + 1.0).abs() < 1e-6);
        assert!(out[w * h + i].abs() < 1e-6);
    }

    #[test]
    fn flat_will_has_no_intent() {
        let will = vec![2.0; 16];
        let mut out = vec![9.0; 32];
        refresh_intentional(&will, &mut out, 4, 4);
        assert!(out.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn density_is_normalised() {
        let occupancy = vec![0, 2, 4, 1];
        let mut out = vec![0.0; 4];
        refresh_density(&occupancy, &mut out);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 0.25]);
    }

    #[test]
    fn danger_noise_stays_small() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut out = vec![0.0; 64];
        inject_danger(&mut out, 0.05, &mut rng);
        assert!(out.iter().all(|v| *v >= 0.0 && *v < 0.05));
    }
}
