//! Long-run population and field dynamics.
//!
//! Run: cargo test --release -- --nocapture --ignored

#[cfg(test)]
mod tests {
    use crate::core::config::{AgentConfig, GridConfig, WorldConfig};
    use crate::swarm::AgentProperties;
    use crate::utils::benchmark::run_world;
    use crate::world::World;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn seeded_world(width: usize, height: usize, capacity: usize, population: usize, seed: u64) -> World {
        let cfg = WorldConfig {
            grid: GridConfig {
                width,
                height,
                ..GridConfig::default()
            },
            agents: AgentConfig {
                capacity,
                ..AgentConfig::default()
            },
            ..WorldConfig::default()
        };
        let mut world = World::with_seed(cfg, seed).unwrap();
        let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
        for k in 0..population {
            let x = rng.gen_range(0.0..width as f32);
            let y = rng.gen_range(0.0..height as f32);
            let energy = rng.gen_range(100.0..700.0);
            world.add_agent(&format!("agent-{}", k), AgentProperties::at(x, y).with_energy(energy));
        }
        for k in 0..population {
            let j = rng.gen_range(0..population);
            world.add_connection(&format!("agent-{}", k), &format!("agent-{}", j), rng.gen_range(0.1..1.0));
        }
        world
    }

    /// 5000 ticks at full capacity pressure: every invariant holds at every tick.
    #[test]
    #[ignore]
    fn long_run_invariants() {
        let sep = "=".repeat(80);
        println!("\n{}", sep);
        println!("  LONG RUN: 128x128 grid, capacity 4096, 2000 founders");
        println!("{}\n", sep);

        let mut world = seeded_world(128, 128, 4096, 2000, 17);
        world.apply_will_operation_named("align", 4.0).unwrap();
        world.imprint_pattern((64.0, 64.0), 40.0, 5.0, 100.0);

        println!("{:<6} | {:<8} | {:<8} | {:<8} | {:<10} | {}", "Tick", "Alive", "Born", "Died", "Mean E", "Gain");
        println!("{}", "-".repeat(80));
        let (mut born, mut died) = (0usize, 0usize);
        for tick in 1..=5000u64 {
            let (b, _) = world.step(1.0);
            born += b.len();
            died += world.last_deaths().len();
            world.verify_invariants().unwrap();
            if tick % 500 == 0 {
                let s = world.store();
                println!(
                    "{:<6} | {:<8} | {:<8} | {:<8} | {:<10.2} | {:.3}",
                    tick,
                    world.alive_count(),
                    born,
                    died,
                    s.alive_mean(&s.energy),
                    world.policy().global_gain()
                );
            }
        }
        assert!(world.alive_count() <= 4096);
        println!("\n{}", world.summary());
    }

    /// Tick throughput at increasing population sizes.
    #[test]
    #[ignore]
    fn tick_throughput() {
        for &(side, population) in &[(64usize, 256usize), (128, 2048), (256, 16384)] {
            let mut world = seeded_world(side, side, population * 2, population, 99);
            let report = run_world(&format!("{}x{} / {}", side, side, population), &mut world, 200, 1.0);
            println!(
                "  {:<20} mean {:>8.3} ms  max {:>8.3} ms  {:>8.0} ticks/s",
                report.label, report.mean_ms, report.max_ms, report.ticks_per_sec
            );
            assert_eq!(report.ticks, 200);
        }
    }

    /// A seeded run is reproducible end to end.
    #[test]
    #[ignore]
    fn seeded_runs_match() {
        let run = || {
            let mut world = seeded_world(64, 64, 1024, 300, 5);
            for _ in 0..1000 {
                world.step(1.0);
            }
            (world.alive_count(), world.agents())
        };
        assert_eq!(run(), run());
    }
}
