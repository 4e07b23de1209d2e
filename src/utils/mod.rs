//! Run tooling that sits outside the tick loop.

pub mod benchmark;

pub use benchmark::{run_world, BenchmarkReport, TickBenchmark};
