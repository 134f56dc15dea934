use glam::Vec2;
use pixbonk::*;
use std::time::Instant;

fn lcg(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

fn unit(seed: &mut u32) -> f32 {
    lcg(seed) as f32 / u32::MAX as f32
}

fn main() {
    env_logger::init();

    let mut index = SpatialIndex::new(IndexConfig { enable_timing: true, ..Default::default() });

    let n = 5_000usize; // number of movable bodies
    let mut seed = 1u32;
    let t0 = Instant::now();
    for i in 0..n {
        let pos = Vec2::new(unit(&mut seed) * 2000.0, unit(&mut seed) * 2000.0);
        let vel = Vec2::new(unit(&mut seed) * 200.0 - 100.0, unit(&mut seed) * 200.0 - 100.0);
        let side = 4.0 + unit(&mut seed) * 12.0;
        let shape = if i % 2 == 0 { ShapeKind::Rectangle } else { ShapeKind::Circle };
        index.add(
            Body::new(pos, Vec2::splat(side))
                .with_velocity(vel)
                .with_mass(side * side)
                .with_restitution(0.8)
                .with_shape(shape),
        );
    }
    for i in 0..20 {
        index.add(Body::fixed(Vec2::new(i as f32 * 100.0, 1990.0), Vec2::new(100.0, 10.0)));
    }
    let t_add = t0.elapsed();

    let dt = 1.0 / 60.0;
    let mut total_ms = 0.0;
    let mut collisions = 0;
    let ticks = 60;
    for _ in 0..ticks {
        let t = index.update(dt, |body: &mut Body, dt: f32| body.position += body.velocity * dt);
        total_ms += t.update_ms;
        collisions += t.collisions;
    }

    let s = index.stats();
    println!(
        "N={} add={:?} avg_update={:.3}ms collisions={} cell=({:.1},{:.1}) partitions={} occupancy={} reoptimizations={}",
        n,
        t_add,
        total_ms / ticks as f64,
        collisions,
        s.cell_size.x,
        s.cell_size.y,
        s.partitions,
        s.occupancy,
        s.reoptimizations
    );
}
