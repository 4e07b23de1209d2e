//! Two point masses on circular orbits around the grid centre.

use crate::core::config::ForceConfig;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CelestialBody {
    pub mass: f32,
    pub radius: f32,
    pub angular_speed: f32,
    pub phase: f32,
    pub position: [f32; 2],
}

pub struct CelestialSystem {
    center: [f32; 2],
    pub bodies: [CelestialBody; 2],
}

impl CelestialSystem {
    pub fn new(cfg: &ForceConfig, width: usize, height: usize) -> Self {
        let center = [width as f32 * 0.5, height as f32 * 0.5];
        let span = width.min(height) as f32;
        let body = |k: usize, phase: f32| CelestialBody {
            mass: cfg.celestial_masses[k],
            radius: cfg.celestial_radii[k] * span,
            angular_speed: cfg.celestial_speeds[k],
            phase,
            position: center,
        };
        let mut system = CelestialSystem {
            center,
            bodies: [body(0, 0.0), body(1, PI)],
        };
        system.advance(0);
        system
    }

    /// Place each body at `phase + speed * tick` on its orbit.
    pub fn advance(&mut self, tick: u64) {
        let t = tick as f32;
        for b in self.bodies.iter_mut() {
            let theta = b.phase + b.angular_speed * t;
            b.position = [
                self.center[0] + b.radius * theta.cos(),
                self.center[1] + b.radius * theta.sin(),
            ];
        }
    }
}
