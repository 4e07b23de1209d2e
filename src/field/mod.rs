//! Field Grid
//!
//! Owns every scalar and vector field over the fixed `width × height` grid
//! and their evolution rules. Storage is channel-major: channel `c` of a
//! k-channel field occupies `data[c * w * h .. (c + 1) * w * h]`, row-major
//! inside the channel.
//!
//! Bounds:
//! - value_mass, will, coherence, resource, event_*, soul, wave amplitude: [0, field_max]
//! - intentional: [-1, 1] (unit vectors)
//! - sensory: [0, 1]
//! - wave phase: [-π, π]

pub mod derived;
pub mod diffusion;
pub mod pattern;

use crate::core::config::GridConfig;
use crate::core::error::{WorldError, WorldResult};
use derived::{SENSE_CALM, SENSE_DANGER, SENSE_DENSITY, SENSE_GRAD_VALUE_MASS, SENSE_GRAD_WILL};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::str::FromStr;
use tracing::debug;

pub const SOUL_SPIRIT: usize = 0;
pub const SOUL_BODY: usize = 1;
pub const SOUL_SOUL: usize = 2;
pub const WAVE_AMPLITUDE: usize = 0;
pub const WAVE_PHASE: usize = 1;

/// `v.clamp(lo, hi)` with NaN mapped to `lo`.
#[inline(always)]
fn bounded(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() {
        lo
    } else {
        v.clamp(lo, hi)
    }
}

/// One multi-channel field with its declared bounds.
#[derive(Clone, Debug)]
pub struct Field {
    pub name: &'static str,
    pub data: Box<[f32]>,
    pub channels: usize,
    pub width: usize,
    pub height: usize,
    pub min: f32,
    pub max: f32,
}

impl Field {
    pub fn new(name: &'static str, channels: usize, width: usize, height: usize, min: f32, max: f32) -> Self {
        Field {
            name,
            data: vec![0.0; channels * width * height].into_boxed_slice(),
            channels,
            width,
            height,
            min,
            max,
        }
    }

    #[inline(always)]
    pub fn plane(&self) -> usize {
        self.width * self.height
    }

    pub fn channel(&self, ch: usize) -> &[f32] {
        let p = self.plane();
        &self.data[ch * p..(ch + 1) * p]
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let p = self.plane();
        &mut self.data[ch * p..(ch + 1) * p]
    }

    /// Value of channel `ch` at flat cell index `cell`.
    #[inline]
    pub fn at(&self, ch: usize, cell: usize) -> f32 {
        self.data[ch * self.plane() + cell]
    }

    #[inline]
    pub fn add(&mut self, ch: usize, cell: usize, amount: f32) {
        let i = ch * self.plane() + cell;
        self.data[i] = bounded(self.data[i] + amount, self.min, self.max);
    }

    pub fn scale(&mut self, factor: f32) {
        self.data.iter_mut().for_each(|v| *v *= factor);
    }

    pub fn clamp(&mut self) {
        let (lo, hi) = (self.min, self.max);
        self.data.iter_mut().for_each(|v| *v = bounded(*v, lo, hi));
    }

    pub fn max_value(&self, ch: usize) -> f32 {
        self.channel(ch).iter().cloned().fold(self.min.max(0.0), f32::max)
    }

    pub fn mean(&self, ch: usize) -> f32 {
        let c = self.channel(ch);
        c.iter().sum::<f32>() / c.len() as f32
    }

    pub fn verify(&self) -> WorldResult<()> {
        match self
            .data
            .iter()
            .position(|v| !(*v >= self.min && *v <= self.max))
        {
            None => Ok(()),
            Some(index) => Err(WorldError::FieldOutOfBounds {
                field: self.name,
                index,
                value: self.data[index],
                min: self.min,
                max: self.max,
            }),
        }
    }
}

/// Externally sanctioned ways of pushing energy into `will`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WillOperation {
    EntropyStabilization,
    Align,
}

impl WillOperation {
    /// Per-unit-strength increment added to every cell.
    pub fn increment(self) -> f32 {
        match self {
            WillOperation::EntropyStabilization => 0.01,
            WillOperation::Align => 0.05,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WillOperation::EntropyStabilization => "entropy_stabilization",
            WillOperation::Align => "align",
        }
    }
}

impl FromStr for WillOperation {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "entropy_stabilization" => Ok(WillOperation::EntropyStabilization),
            "align" => Ok(WillOperation::Align),
            other => Err(WorldError::UnknownWillOperation(other.to_string())),
        }
    }
}

/// Per-field maxima used by summaries and snapshots.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMaxima {
    pub value_mass: f32,
    pub will: f32,
    pub coherence: f32,
    pub resource: f32,
    pub event_reward: f32,
    pub event_danger: f32,
    pub soul: [f32; 3],
    pub wave_amplitude: f32,
    pub wave_phase_abs: f32,
}

/// All grid fields plus their evolution rules.
pub struct FieldGrid {
    cfg: GridConfig,
    pub value_mass: Field,
    pub will: Field,
    pub coherence: Field,
    pub resource: Field,
    pub intentional: Field,
    pub sensory: Field,
    pub event_reward: Field,
    pub event_danger: Field,
    pub soul: Field,
    pub wave_phase: Field,
    /// value_mass/will changed since the last derived refresh
    stale: bool,
}

impl FieldGrid {
    pub fn new(cfg: &GridConfig) -> Self {
        let (w, h, m) = (cfg.width, cfg.height, cfg.field_max);
        let mut grid = FieldGrid {
            cfg: cfg.clone(),
            value_mass: Field::new("value_mass", 1, w, h, 0.0, m),
            will: Field::new("will", 1, w, h, 0.0, m),
            coherence: Field::new("coherence", 1, w, h, 0.0, m),
            resource: Field::new("resource", 1, w, h, 0.0, m),
            intentional: Field::new("intentional", 2, w, h, -1.0, 1.0),
            sensory: Field::new("sensory", 5, w, h, 0.0, 1.0),
            event_reward: Field::new("event_reward", 1, w, h, 0.0, m),
            event_danger: Field::new("event_danger", 1, w, h, 0.0, m),
            soul: Field::new("soul", 3, w, h, 0.0, m),
            wave_phase: Field::new("wave_phase", 2, w, h, -PI, m.max(PI)),
            stale: true,
        };
        grid.resource.data.iter_mut().for_each(|v| *v = cfg.resource_initial.clamp(0.0, m));
        let calm = cfg.calm_bias.clamp(0.0, 1.0);
        grid.sensory.channel_mut(SENSE_CALM).iter_mut().for_each(|v| *v = calm);
        grid.refresh_derived();
        grid
    }

    pub fn width(&self) -> usize {
        self.cfg.width
    }

    pub fn height(&self) -> usize {
        self.cfg.height
    }

    pub fn field_max(&self) -> f32 {
        self.cfg.field_max
    }

    /// Flat index of the cell containing `(x, y)`; out-of-grid points snap to the edge.
    #[inline]
    pub fn cell_of(&self, x: f32, y: f32) -> usize {
        let cx = (x.max(0.0) as usize).min(self.cfg.width - 1);
        let cy = (y.max(0.0) as usize).min(self.cfg.height - 1);
        cy * self.cfg.width + cx
    }

    /// One tick of field dynamics.
    ///
    /// `occupancy` is the live agent count per cell and feeds the density
    /// sense. `dt` is clamped to `[0, max_dt]`; a non-finite `dt` counts as 0.
    pub fn evolve<R: Rng + ?Sized>(&mut self, dt: f32, occupancy: &[u32], rng: &mut R) {
        let dt = if dt.is_finite() { dt.clamp(0.0, self.cfg.max_dt) } else { 0.0 };
        let (w, h) = (self.cfg.width, self.cfg.height);

        // value_mass / will: paired diffusion, decay, clamp
        let active = diffusion::paired_diffuse(
            &mut self.value_mass.data,
            &mut self.will.data,
            w,
            h,
            self.cfg.diffusion * dt,
            self.cfg.coupling,
        );
        if active {
            self.value_mass.scale(self.cfg.value_mass_decay.powf(dt));
            self.will.scale(self.cfg.will_decay.powf(dt));
            self.value_mass.clamp();
            self.will.clamp();
            self.stale = true;
        }

        // resource: decay + regen
        let decay = self.cfg.resource_decay.powf(dt);
        let regen = self.cfg.resource_regen * dt;
        self.resource.data.iter_mut().for_each(|r| *r = *r * decay + regen);
        self.resource.clamp();

        self.evolve_events(dt, rng);
        self.refresh_derived();
        self.refresh_density(occupancy);
        derived::inject_danger(
            self.sensory.channel_mut(SENSE_DANGER),
            self.cfg.danger_amplitude,
            rng,
        );
        self.evolve_soul(dt);
        self.evolve_wave(dt);
    }

    fn evolve_events<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) {
        let decay = self.cfg.event_decay.powf(dt);
        self.event_reward.scale(decay);
        self.event_danger.scale(decay);
        let cells = self.cfg.width * self.cfg.height;
        for _ in 0..self.cfg.event_injections {
            let r = rng.gen_range(0..cells);
            self.event_reward.add(0, r, self.cfg.event_amplitude);
            let d = rng.gen_range(0..cells);
            self.event_danger.add(0, d, self.cfg.event_amplitude);
        }
        self.event_reward.clamp();
        self.event_danger.clamp();
    }

    fn evolve_soul(&mut self, dt: f32) {
        let nudge = self.cfg.soul_nudge * dt;
        let drivers: [&Field; 3] = [&self.event_reward, &self.resource, &self.coherence];
        let plane = self.soul.plane();
        for (ch, driver) in drivers.iter().enumerate() {
            let decay = self.cfg.soul_decay[ch].powf(dt);
            let src = driver.channel(0);
            let dst = &mut self.soul.data[ch * plane..(ch + 1) * plane];
            dst.iter_mut()
                .zip(src.iter())
                .for_each(|(s, d)| *s = *s * decay + nudge * d);
        }
        self.soul.clamp();
    }

    fn evolve_wave(&mut self, dt: f32) {
        let (w, h) = (self.cfg.width, self.cfg.height);
        let d = self.cfg.wave_diffusion * dt;
        diffusion::laplacian_diffuse(self.wave_phase.channel_mut(WAVE_AMPLITUDE), w, h, d);
        diffusion::laplacian_diffuse(self.wave_phase.channel_mut(WAVE_PHASE), w, h, d);

        let decay = self.cfg.wave_decay.powf(dt);
        let k = self.cfg.wave_perturbation;
        let advance = self.cfg.wave_frequency * dt;
        let max = self.cfg.field_max;
        let plane = w * h;
        let (amp, phase) = self.wave_phase.data.split_at_mut(plane);
        let reward = self.event_reward.channel(0);
        let danger = self.event_danger.channel(0);
        for i in 0..plane {
            amp[i] = (amp[i] * decay + k * (reward[i] + danger[i])).clamp(0.0, max);
            phase[i] = (phase[i] * decay + advance + k * (reward[i] - danger[i])).clamp(-PI, PI);
        }
    }

    /// Recompute coherence, intentional and the gradient senses if
    /// value_mass/will changed since the last refresh.
    pub fn refresh_derived(&mut self) {
        if !self.stale {
            return;
        }
        let (w, h) = (self.cfg.width, self.cfg.height);
        derived::refresh_coherence(
            &self.value_mass.data,
            &self.will.data,
            &mut self.coherence.data,
            self.cfg.field_max,
            self.cfg.coherence_scale,
        );
        derived::refresh_intentional(&self.will.data, &mut self.intentional.data, w, h);
        let plane = w * h;
        let (grad_vm, rest) = self.sensory.data.split_at_mut(plane);
        let grad_will = &mut rest[..plane];
        derived::refresh_gradient_magnitude(&self.value_mass.data, grad_vm, w, h);
        derived::refresh_gradient_magnitude(&self.will.data, grad_will, w, h);
        self.stale = false;
    }

    pub fn refresh_density(&mut self, occupancy: &[u32]) {
        debug_assert_eq!(occupancy.len(), self.sensory.plane());
        derived::refresh_density(occupancy, self.sensory.channel_mut(SENSE_DENSITY));
    }

    /// Decay `will`, push a kind-dependent increment into every cell, refresh.
    /// A non-finite `strength` is ignored.
    pub fn apply_will_operation(&mut self, kind: WillOperation, strength: f32) {
        if !strength.is_finite() {
            return;
        }
        let increment = kind.increment() * strength;
        let decay = self.cfg.will_decay;
        self.will.data.iter_mut().for_each(|v| *v = *v * decay + increment);
        self.will.clamp();
        self.stale = true;
        self.refresh_derived();
        debug!("[FieldGrid] will operation {} (strength={:.3})", kind.label(), strength);
    }

    /// Trace a spiral from `center` and add `strength * imprint_gain` to
    /// `will` and `value_mass` at every sampled in-grid cell.
    ///
    /// Returns the number of samples that landed on the grid. A non-finite
    /// `strength` imprints nothing.
    pub fn imprint_pattern(&mut self, center: (f32, f32), radius: f32, turns: f32, strength: f32) -> usize {
        let amount = strength * self.cfg.imprint_gain;
        if !amount.is_finite() {
            return 0;
        }
        let (w, h) = (self.cfg.width as f32, self.cfg.height as f32);
        let mut landed = 0;
        let points = pattern::spiral_points(
            center,
            radius,
            turns,
            self.cfg.imprint_samples_per_turn,
            self.cfg.imprint_max_samples,
        );
        for (x, y) in points {
            if x < 0.0 || y < 0.0 || x >= w || y >= h {
                continue;
            }
            let cell = self.cell_of(x, y);
            self.will.add(0, cell, amount);
            self.value_mass.add(0, cell, amount);
            landed += 1;
        }
        if landed > 0 {
            self.stale = true;
            self.refresh_derived();
        }
        landed
    }

    /// Agent feedback into value_mass and will at one cell.
    pub fn deposit(&mut self, cell: usize, value_mass: f32, will: f32) {
        if value_mass != 0.0 {
            self.value_mass.add(0, cell, value_mass);
            self.stale = true;
        }
        if will != 0.0 {
            self.will.add(0, cell, will);
            self.stale = true;
        }
    }

    /// Take up to `amount` resource from `cell`; returns what was taken.
    pub fn consume_resource(&mut self, cell: usize, amount: f32) -> f32 {
        let available = self.resource.data[cell];
        let taken = amount.max(0.0).min(available);
        self.resource.data[cell] = available - taken;
        taken
    }

    /// Downhill flow of the `value_mass + will_weight * will` potential at
    /// `cell`. The will part follows the `intentional` unit field, scaled by
    /// the local will slope.
    pub fn field_flow(&self, cell: usize, will_weight: f32) -> (f32, f32) {
        let (w, h) = (self.cfg.width, self.cfg.height);
        let (x, y) = (cell % w, cell / w);
        let (vx, vy) = diffusion::gradient_at(&self.value_mass.data, w, h, x, y);
        let (wx, wy) = diffusion::gradient_at(&self.will.data, w, h, x, y);
        let slope = will_weight * (wx * wx + wy * wy).sqrt();
        let (ix, iy) = (self.intentional.at(0, cell), self.intentional.at(1, cell));
        (-vx + slope * ix, -vy + slope * iy)
    }

    /// Scripted wave boost: amplitude `* scale + add`, phase `+ shift`.
    pub fn boost_wave(&mut self, scale: f32, add: f32, shift: f32) {
        let plane = self.wave_phase.plane();
        let max = self.cfg.field_max;
        let (amp, phase) = self.wave_phase.data.split_at_mut(plane);
        amp.iter_mut().for_each(|a| *a = (*a * scale + add).clamp(0.0, max));
        phase.iter_mut().for_each(|p| *p = (*p + shift).clamp(-PI, PI));
    }

    /// Scripted wave damping of both channels.
    pub fn damp_wave(&mut self, factor: f32) {
        let plane = self.wave_phase.plane();
        let max = self.cfg.field_max;
        let (amp, phase) = self.wave_phase.data.split_at_mut(plane);
        amp.iter_mut().for_each(|a| *a = (*a * factor).clamp(0.0, max));
        phase.iter_mut().for_each(|p| *p = (*p * factor).clamp(-PI, PI));
    }

    /// Check every field against its declared bounds.
    pub fn verify_bounds(&self) -> WorldResult<()> {
        for field in self.fields() {
            field.verify()?;
        }
        let amplitude = self.wave_phase.channel(WAVE_AMPLITUDE);
        if let Some(index) = amplitude
            .iter()
            .position(|a| !(*a >= 0.0 && *a <= self.cfg.field_max))
        {
            return Err(WorldError::FieldOutOfBounds {
                field: "wave_phase.amplitude",
                index,
                value: amplitude[index],
                min: 0.0,
                max: self.cfg.field_max,
            });
        }
        let phase = self.wave_phase.channel(WAVE_PHASE);
        if let Some(index) = phase.iter().position(|p| !(p.abs() <= PI)) {
            return Err(WorldError::FieldOutOfBounds {
                field: "wave_phase.phase",
                index,
                value: phase[index],
                min: -PI,
                max: PI,
            });
        }
        Ok(())
    }

    fn fields(&self) -> [&Field; 10] {
        [
            &self.value_mass,
            &self.will,
            &self.coherence,
            &self.resource,
            &self.intentional,
            &self.sensory,
            &self.event_reward,
            &self.event_danger,
            &self.soul,
            &self.wave_phase,
        ]
    }

    pub fn maxima(&self) -> FieldMaxima {
        FieldMaxima {
            value_mass: self.value_mass.max_value(0),
            will: self.will.max_value(0),
            coherence: self.coherence.max_value(0),
            resource: self.resource.max_value(0),
            event_reward: self.event_reward.max_value(0),
            event_danger: self.event_danger.max_value(0),
            soul: [
                self.soul.max_value(SOUL_SPIRIT),
                self.soul.max_value(SOUL_BODY),
                self.soul.max_value(SOUL_SOUL),
            ],
            wave_amplitude: self.wave_phase.max_value(WAVE_AMPLITUDE),
            wave_phase_abs: self
                .wave_phase
                .channel(WAVE_PHASE)
                .iter()
                .fold(0.0f32, |m, p| m.max(p.abs())),
        }
    }

    /// Sensory reading at one cell, indexed by the `derived::SENSE_*` constants.
    pub fn senses_at(&self, cell: usize) -> [f32; 5] {
        [
            self.sensory.at(SENSE_GRAD_VALUE_MASS, cell),
            self.sensory.at(SENSE_GRAD_WILL, cell),
            self.sensory.at(SENSE_DENSITY, cell),
            self.sensory.at(SENSE_DANGER, cell),
            self.sensory.at(SENSE_CALM, cell),
        ]
    }
}
