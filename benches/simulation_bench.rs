use bevy::math::Vec2;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use defense_core::engine::{SimConfig, Simulation};
use defense_core::enemy::EnemyInstance;
use defense_core::persistence::MemoryStore;
use defense_core::pool::EntityPool;
use defense_core::tower::{stats, GlobalIncrements, TowerModel, UpgradeLevels};
use defense_core::waves::WaveCurve;

const DT: f32 = 1.0 / 30.0;

/// Short rests and dense waves so the pools churn constantly.
fn churn_config() -> SimConfig {
    let mut config = SimConfig {
        wave_curve: WaveCurve {
            base_enemy_count: 30.0,
            enemy_count_increase: 5.0,
            max_enemies_per_wave: 200,
            base_rest_time: 0.5,
            min_rest_time: 0.1,
            base_spawn_interval: 0.05,
            min_spawn_interval: 0.02,
            ..Default::default()
        },
        base_health: 1_000_000,
        ..Default::default()
    };
    config.tower_models[0].base_attack_speed = 20.0;
    config.tower_models[0].base_range = 30.0;
    config
}

fn warmed_simulation(seconds: f32) -> Simulation {
    let mut sim = Simulation::new(churn_config(), Box::new(MemoryStore::new()))
        .expect("bench config is valid");
    for _ in 0..(seconds / DT) as u32 {
        sim.tick(DT);
        sim.drain_events();
    }
    sim
}

fn bench_simulation_tick(c: &mut Criterion) {
    c.bench_function("tick_heavy_churn", |b| {
        b.iter_batched_ref(
            || warmed_simulation(10.0),
            |sim| {
                sim.tick(black_box(DT));
                black_box(sim.drain_events());
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("simulate_60s", |b| {
        b.iter(|| {
            let sim = warmed_simulation(black_box(60.0));
            black_box(sim.current_wave());
        })
    });
}

fn bench_pool_cycle(c: &mut Criterion) {
    c.bench_function("pool_acquire_release_64", |b| {
        let mut pool: EntityPool<EnemyInstance> = EntityPool::new();
        pool.register("grunt", Box::new(|| EnemyInstance::new("grunt")), 64)
            .expect("fresh pool");
        b.iter(|| {
            let handles: Vec<_> = (0..64)
                .filter_map(|i| pool.acquire("grunt", Vec2::new(i as f32, 0.0), 0.0, None).ok())
                .collect();
            for handle in handles {
                let _ = pool.release("grunt", handle);
            }
        })
    });
}

fn bench_stats_compute(c: &mut Criterion) {
    let model = TowerModel::default();
    let levels = UpgradeLevels {
        damage: 12,
        attack_speed: 7,
        range: 3,
        max_mana: 5,
        mana_regen: 2,
    };
    let increments = GlobalIncrements::default();
    c.bench_function("stats_compute", |b| {
        b.iter(|| {
            stats::compute(
                black_box(&model),
                black_box(&levels),
                black_box(&levels),
                &increments,
            )
        })
    });
}

criterion_group!(benches, bench_simulation_tick, bench_pool_cycle, bench_stats_compute);
criterion_main!(benches);
