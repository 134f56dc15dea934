use glam::Vec2;
use pixbonk::*;

const GRAVITY: f32 = 200.0;

fn main() -> Result<(), MaskError> {
    env_logger::init();

    let mut masks = MaskCache::in_memory();
    // A round-ish 5x5 sprite: corners transparent
    let blob = |x: u32, y: u32| -> u8 {
        let corner = (x == 0 || x == 4) && (y == 0 || y == 4);
        if corner { 0 } else { 255 }
    };
    let blob_mask = masks.get_or_build("demo/blob", &blob, 5, 5)?;

    let mut index = SpatialIndex::new(IndexConfig { enable_timing: true, ..Default::default() });
    let platform = index.add(Body::fixed(Vec2::new(0.0, 100.0), Vec2::splat(10.0)));
    let ball = index.add(
        Body::new(Vec2::new(2.0, 60.0), Vec2::splat(5.0))
            .with_restitution(0.6)
            .with_velocity(Vec2::new(0.0, 50.0))
            .with_mask(blob_mask),
    );

    println!("Inserted ball={:?} platform={:?}", ball, platform);

    let dt = 1.0 / 60.0;
    for tick in 0..120 {
        let t = index.update(dt, |body: &mut Body, dt: f32| {
            body.velocity.y += GRAVITY * dt;
            body.position += body.velocity * dt;
        });
        if t.collisions > 0 {
            if let Some(b) = index.body(ball) {
                println!(
                    "tick {:3}: bounce pos=({:.2},{:.2}) vel=({:.2},{:.2}) update={:.3}ms",
                    tick, b.position.x, b.position.y, b.velocity.x, b.velocity.y, t.update_ms
                );
            }
        }
    }

    let s = index.stats();
    println!(
        "bodies={} partitions={} occupancy={} cell=({:.1},{:.1}) reoptimizations={}",
        s.bodies, s.partitions, s.occupancy, s.cell_size.x, s.cell_size.y, s.reoptimizations
    );
    Ok(())
}
