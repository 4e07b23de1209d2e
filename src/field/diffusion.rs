//! Finite-difference stencils over row-major `width × height` channels.
//!
//! Neighbours past the grid edge are clamped onto the edge cell, which makes
//! the boundary reflective: nothing leaks out and nothing flows in.

use rayon::prelude::*;

#[inline(always)]
fn neighbours(x: usize, y: usize, w: usize, h: usize) -> [(usize, usize); 4] {
    [
        (x.saturating_sub(1), y),
        ((x + 1).min(w - 1), y),
        (x, y.saturating_sub(1)),
        (x, (y + 1).min(h - 1)),
    ]
}

/// Paired diffusion of `value_mass` and `will`.
///
/// Both channels flow through the same conductance on each neighbour edge,
/// `d / (1 + coupling * mean(vm * will))`, so regions where the two fields
/// overlap spread more slowly. Every conductance is at most `d`, so with
/// `4d <= 1` each update is a convex combination of the old neighbourhood and
/// neither maximum can grow.
///
/// Returns `true` if any cell of either input was non-zero.
pub fn paired_diffuse(
    value_mass: &mut [f32],
    will: &mut [f32],
    width: usize,
    height: usize,
    d: f32,
    coupling: f32,
) -> bool {
    let active = value_mass.iter().chain(will.iter()).any(|v| *v != 0.0);
    if !active || d == 0.0 {
        return active;
    }

    let vm_src: &[f32] = value_mass;
    let w_src: &[f32] = will;
    let mut vm_next = vec![0.0f32; vm_src.len()];
    let mut w_next = vec![0.0f32; w_src.len()];

    vm_next
        .par_chunks_mut(width)
        .zip(w_next.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (vm_row, w_row))| {
            for x in 0..width {
                let i = y * width + x;
                let (vm_i, w_i) = (vm_src[i], w_src[i]);
                let overlap_i = vm_i * w_i;
                let mut dvm = 0.0;
                let mut dw = 0.0;
                for (nx, ny) in neighbours(x, y, width, height) {
                    let n = ny * width + nx;
                    if n == i {
                        continue;
                    }
                    let g = d / (1.0 + coupling * 0.5 * (overlap_i + vm_src[n] * w_src[n]));
                    dvm += g * (vm_src[n] - vm_i);
                    dw += g * (w_src[n] - w_i);
                }
                vm_row[x] = vm_i + dvm;
                w_row[x] = w_i + dw;
            }
        });

    value_mass.copy_from_slice(&vm_next);
    will.copy_from_slice(&w_next);
    true
}

/// Plain 5-point Laplacian diffusion of one channel.
pub fn laplacian_diffuse(data: &mut [f32], width: usize, height: usize, d: f32) {
    if d == 0.0 {
        return;
    }
    let src: &[f32] = data;
    let mut next = vec![0.0f32; src.len()];
    next.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for x in 0..width {
            let i = y * width + x;
            let laplacian: f32 = neighbours(x, y, width, height)
                .iter()
                .map(|(nx, ny)| src[ny * width + nx] - src[i])
                .sum();
            row[x] = src[i] + d * laplacian;
        }
    });
    data.copy_from_slice(&next);
}

/// Central-difference gradient at `(x, y)`, one-sided on the edges.
#[inline]
pub fn gradient_at(data: &[f32], width: usize, height: usize, x: usize, y: usize) -> (f32, f32) {
    let xl = x.saturating_sub(1);
    let xr = (x + 1).min(width - 1);
    let yl = y.saturating_sub(1);
    let yr = (y + 1).min(height - 1);
    let gx = if xr > xl {
        (data[y * width + xr] - data[y * width + xl]) / (xr - xl) as f32
    } else {
        0.0
    };
    let gy = if yr > yl {
        (data[yr * width + x] - data[yl * width + x]) / (yr - yl) as f32
    } else {
        0.0
    };
    (gx, gy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max(data: &[f32]) -> f32 {
        data.iter().cloned().fold(f32::MIN, f32::max)
    }

    #[test]
    fn paired_diffusion_conserves_mass_and_spreads_peak() {
        let (w, h) = (9, 9);
        let mut vm = vec![0.0; w * h];
        let mut will = vec![0.0; w * h];
        vm[4 * w + 4] = 8.0;
        will[4 * w + 4] = 2.0;

        assert!(paired_diffuse(&mut vm, &mut will, w, h, 0.2, 0.5));

        let total: f32 = vm.iter().sum();
        assert!((total - 8.0).abs() < 1e-4, "mass drifted to {}", total);
        assert!(vm[4 * w + 4] < 8.0);
        assert!(vm[4 * w + 5] > 0.0);
        assert!(max(&vm) <= 8.0 && max(&will) <= 2.0);
    }

    #[test]
    fn overlap_slows_diffusion() {
        let (w, h) = (5, 5);
        let centre = 2 * w + 2;

        let mut lone = vec![0.0; w * h];
        let mut empty = vec![0.0; w * h];
        lone[centre] = 4.0;
        paired_diffuse(&mut lone, &mut empty, w, h, 0.2, 0.5);

        let mut vm = vec![0.0; w * h];
        let mut will = vec![0.0; w * h];
        vm[centre] = 4.0;
        will[centre] = 4.0;
        paired_diffuse(&mut vm, &mut will, w, h, 0.2, 0.5);

        assert!(vm[centre] > lone[centre]);
    }

    #[test]
    fn empty_input_reports_inactive() {
        let mut a = vec![0.0; 16];
        let mut b = vec![0.0; 16];
        assert!(!paired_diffuse(&mut a, &mut b, 4, 4, 0.2, 0.5));
    }

    #[test]
    fn laplacian_is_flat_on_uniform_field() {
        let mut data = vec![3.0; 12];
        laplacian_diffuse(&mut data, 4, 3, 0.15);
        assert!(data.iter().all(|v| (*v - 3.0).abs() < 1e-6));
    }

    #[test]
    fn gradient_points_uphill() {
        let (w, h) = (4, 4);
        let data: Vec<f32> = (0..w * h).map(|i| (i % w) as f32).collect();
        let (gx, gy) = gradient_at(&data, w, h, 1, 1);
        assert!((gx - 1.0).abs() < 1e-6);
        assert_eq!(gy, 0.0);
        let (gx_edge, _) = gradient_at(&data, w, h, 0, 0);
        assert!((gx_edge - 1.0).abs() < 1e-6);
    }
}
