use glam::Vec2;
use pixbonk::*;

fn integrate(body: &mut Body, dt: f32) {
    body.position += body.velocity * dt;
}

fn lcg(seed: &mut u32) -> f32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed as f32 / u32::MAX as f32
}

fn assert_membership(index: &SpatialIndex) {
    let mut total = 0;
    for &id in index.ids() {
        let body = index.body(id).unwrap();
        let expected = index.cell_keys(&body.bounds(), body.layer);
        assert_eq!(index.partitions_of(id).unwrap(), expected.as_slice());
        total += expected.len();
    }
    assert_eq!(index.stats().occupancy, total);
}

#[test]
fn platform_scenario() {
    let resolver = CollisionResolver::default();
    let mut platform = Body::fixed(Vec2::new(0.0, 100.0), Vec2::splat(10.0));
    let mut faller = Body::new(Vec2::new(2.0, 97.0), Vec2::splat(5.0))
        .with_restitution(0.8)
        .with_velocity(Vec2::new(0.0, 50.0));

    let contact = resolver.is_colliding(&faller, &platform).expect("bounds intersect");
    assert_eq!(contact.overlap, Rect::new(Vec2::new(2.0, 100.0), Vec2::new(5.0, 2.0)));

    let before = (platform.position, platform.velocity);
    resolver.resolve(&mut faller, &mut platform, &contact);
    assert!((faller.velocity.y + 40.0).abs() < 1e-4);
    assert!(faller.velocity.x.abs() < 1e-6);
    assert_eq!((platform.position, platform.velocity), before);
}

#[test]
fn head_on_energy_clamp() {
    let resolver = CollisionResolver::default();
    let mut a = Body::new(Vec2::new(0.0, 0.0), Vec2::splat(10.0))
        .with_mass(10.0)
        .with_velocity(Vec2::new(5.0, 0.0));
    let mut b = Body::new(Vec2::new(9.0, 0.0), Vec2::splat(10.0))
        .with_mass(10.0)
        .with_velocity(Vec2::new(-5.0, 0.0));
    let contact = resolver.is_colliding(&a, &b).unwrap();
    resolver.resolve(&mut a, &mut b, &contact);
    assert!(a.velocity.length() + b.velocity.length() <= 10.0 + 1e-4);
}

#[test]
fn random_pairs_never_gain_speed() {
    let resolver = CollisionResolver::default();
    let mut seed = 7u32;
    for _ in 0..500 {
        let mut a = Body::new(Vec2::ZERO, Vec2::splat(8.0))
            .with_mass(1.0 + lcg(&mut seed) * 9.0)
            .with_restitution(lcg(&mut seed))
            .with_velocity(Vec2::new(lcg(&mut seed) * 20.0, lcg(&mut seed) * 20.0 - 10.0));
        let mut b = Body::new(
            Vec2::new(2.0 + lcg(&mut seed) * 5.0, lcg(&mut seed) * 6.0 - 3.0),
            Vec2::splat(8.0),
        )
        .with_mass(1.0 + lcg(&mut seed) * 9.0)
        .with_restitution(lcg(&mut seed))
        .with_shape(if lcg(&mut seed) > 0.5 { ShapeKind::Circle } else { ShapeKind::Rectangle })
        .with_velocity(Vec2::new(-lcg(&mut seed) * 20.0, lcg(&mut seed) * 20.0 - 10.0));

        let Some(contact) = resolver.is_colliding(&a, &b) else { continue };
        let before = a.velocity.length() + b.velocity.length();
        resolver.resolve(&mut a, &mut b, &contact);
        let after = a.velocity.length() + b.velocity.length();
        assert!(after <= before * (1.0 + 1e-5), "{} > {}", after, before);
        assert!(a.velocity.is_finite() && b.velocity.is_finite());
        assert!(a.position.is_finite() && b.position.is_finite());
    }
}

#[test]
fn mask_round_trip_through_storage() {
    let dir = tempfile::tempdir().unwrap();
    // Ring sprite: opaque border, transparent interior
    let ring = |x: u32, y: u32| -> u8 {
        if x == 0 || y == 0 || x == 7 || y == 5 { 255 } else { 40 }
    };
    let built = MaskCache::new(Some(dir.path().to_path_buf()))
        .get_or_build("sprites/ring", &ring, 8, 6)
        .unwrap();
    assert!(dir.path().join("sprites").join("ring.csv").is_file());

    let mut reloaded = MaskCache::new(Some(dir.path().to_path_buf()));
    let loaded = reloaded.load_persisted("sprites/ring").unwrap().unwrap();
    assert_eq!(loaded.width(), 8);
    assert_eq!(loaded.height(), 6);
    for col in 0..8 {
        for row in 0..6 {
            assert_eq!(built.is_opaque_at(col, row), loaded.is_opaque_at(col, row));
            assert_eq!(loaded.is_opaque_at(col, row), ring(col as u32, row as u32) == 255);
        }
    }
}

#[test]
fn masked_bodies_pass_through_holes() {
    let mut cache = MaskCache::in_memory();
    // Hollow square: only the border is opaque
    let hollow = cache
        .get_or_build("hollow", &|x: u32, y: u32| -> u8 {
            if x == 0 || y == 0 || x == 9 || y == 9 { 255 } else { 0 }
        }, 10, 10)
        .unwrap();

    let mut index = SpatialIndex::new(IndexConfig::default());
    let frame = index.add(Body::fixed(Vec2::ZERO, Vec2::splat(10.0)).with_mask(hollow));
    // Small solid body approaching the frame's centre through the hole, never touching the border
    let pebble = index.add(
        Body::new(Vec2::new(2.0, 3.0), Vec2::splat(2.0)).with_velocity(Vec2::new(1.0, 1.0)),
    );
    let t = index.update(1.0, integrate);
    assert_eq!(t.pairs_tested, 1);
    assert_eq!(t.collisions, 0);
    assert_eq!(index.body(pebble).unwrap().velocity, Vec2::new(1.0, 1.0));
    assert_eq!(index.body(frame).unwrap().position, Vec2::ZERO);
}

#[test]
fn membership_invariant_under_churn() {
    let mut index = SpatialIndex::new(IndexConfig::default());
    let mut seed = 3u32;
    let mut live = Vec::new();
    for step in 0..200 {
        let r = lcg(&mut seed);
        if r < 0.55 || live.is_empty() {
            let body = Body::new(
                Vec2::new(lcg(&mut seed) * 300.0, lcg(&mut seed) * 300.0),
                Vec2::new(2.0 + lcg(&mut seed) * 30.0, 2.0 + lcg(&mut seed) * 30.0),
            )
            .with_velocity(Vec2::new(lcg(&mut seed) * 40.0 - 20.0, lcg(&mut seed) * 40.0 - 20.0))
            .with_layer((step % 2) as i32);
            let body = if lcg(&mut seed) < 0.2 { Body { is_static: true, ..body } } else { body };
            live.push(index.add(body));
        } else if r < 0.75 {
            let victim = live.swap_remove((lcg(&mut seed) * live.len() as f32) as usize % live.len());
            assert!(index.remove(victim).is_some());
        } else {
            index.update(0.1, integrate);
        }
        assert_membership(&index);
    }
}

#[test]
fn reoptimize_changes_cell_size_and_keeps_occupancy() {
    let mut index = SpatialIndex::new(IndexConfig::default());
    for i in 0..10 {
        index.add(Body::new(Vec2::new(i as f32 * 12.0, 0.0), Vec2::splat(8.0)));
    }
    let settled = index.cell_size();
    assert_eq!(settled, Vec2::splat(24.0));

    // One much larger body pushes the average past the threshold
    index.add(Body::new(Vec2::new(0.0, 40.0), Vec2::splat(80.0)));
    assert_ne!(index.cell_size(), settled);
    assert_membership(&index);

    let s = index.stats();
    let sum: usize = index.ids().iter().map(|&id| index.partitions_of(id).unwrap().len()).sum();
    assert_eq!(s.occupancy, sum);
}
