//! Formation benchmarks
//!
//! Pattern generation and full registry ticks at squad through army sizes.
//! Larger formations cross the parallel steering threshold.
//!
//! Run with: cargo bench --bench formation_tick

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use formation_engine::config::FormationConfig;
use formation_engine::formation::pattern::{self, FormationType};
use formation_engine::formation::{AgentHandle, FormationRegistry};
use formation_engine::sim::SimulatedAgent;
use formation_engine::util::vec3::Vec3;
use rand::Rng;
use std::sync::Arc;

/// Randomly placed agents around the origin
fn spawn_agents(count: usize) -> Vec<Arc<SimulatedAgent>> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let radius = rng.gen_range(0.0..50.0);
            SimulatedAgent::with_speed(Vec3::from_angle_xz(angle, radius), 5.0)
        })
        .collect()
}

fn bench_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern");

    for formation_type in FormationType::ALL {
        group.bench_with_input(
            BenchmarkId::new(formation_type.as_str(), 64),
            &formation_type,
            |b, &t| b.iter(|| black_box(pattern::generate(t, 64, 3.0))),
        );
    }

    group.finish();
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.sample_size(50);

    for count in [8, 32, 128, 512] {
        let agents = spawn_agents(count);
        let handles: Vec<AgentHandle> = agents.iter().map(|a| a.clone() as AgentHandle).collect();
        let mut registry = FormationRegistry::new(FormationConfig {
            scatter_seed: Some(7),
            ..Default::default()
        });
        let id = registry
            .create_formation(FormationType::Wedge, &handles[0], &handles[1..])
            .expect("formation");
        registry
            .move_formation(id, Vec3::new(1000.0, 0.0, 1000.0))
            .expect("move");

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("wedge", count), &count, |b, _| {
            b.iter(|| {
                for agent in &agents {
                    agent.advance(0.1);
                }
                black_box(registry.tick(0.1))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_patterns, bench_tick);
criterion_main!(benches);
