use crate::world::World;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;

/// Timing summary of a run of ticks.
#[derive(Clone, Debug, Serialize)]
pub struct BenchmarkReport {
    pub label: String,
    pub ticks: usize,
    pub total_ms: f64,
    pub mean_ms: f64,
    pub max_ms: f64,
    pub ticks_per_sec: f64,
    pub final_alive: usize,
}

/// Wall-clock timer for repeated ticks.
pub struct TickBenchmark {
    label: String,
    samples: Vec<Duration>,
}

impl TickBenchmark {
    pub fn new(label: &str) -> Self {
        TickBenchmark {
            label: label.to_string(),
            samples: Vec::new(),
        }
    }

    pub fn time<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let t0 = Instant::now();
        let out = f();
        self.samples.push(t0.elapsed());
        out
    }

    pub fn report(&self, final_alive: usize) -> BenchmarkReport {
        let ticks = self.samples.len();
        let total: Duration = self.samples.iter().sum();
        let max = self.samples.iter().max().copied().unwrap_or_default();
        let total_ms = total.as_secs_f64() * 1e3;
        let mean_ms = if ticks > 0 { total_ms / ticks as f64 } else { 0.0 };
        let ticks_per_sec = if total_ms > 0.0 {
            ticks as f64 / total.as_secs_f64()
        } else {
            0.0
        };
        BenchmarkReport {
            label: self.label.clone(),
            ticks,
            total_ms,
            mean_ms,
            max_ms: max.as_secs_f64() * 1e3,
            ticks_per_sec,
            final_alive,
        }
    }
}

/// Step `world` for `ticks` ticks and log the timing.
pub fn run_world(label: &str, world: &mut World, ticks: usize, dt: f32) -> BenchmarkReport {
    let mut bench = TickBenchmark::new(label);
    for _ in 0..ticks {
        bench.time(|| world.step(dt));
    }
    let report = bench.report(world.alive_count());
    info!(
        "📊 [Benchmark] {}: {} ticks, mean {:.3} ms, max {:.3} ms, {:.0} ticks/s, {} alive",
        report.label, report.ticks, report.mean_ms, report.max_ms, report.ticks_per_sec, report.final_alive
    );
    report
}
