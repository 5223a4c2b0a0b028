//! Movement system - walks pawns toward their path destination

use crate::components::{Movement, Position, Vec3};
use hecs::{Entity, World};

/// Step every moving entity toward its destination; arrival removes `Movement`
pub fn movement_system(world: &mut World) {
    let mut arrived = Vec::new();

    for (entity, (pos, movement)) in world.query_mut::<(&mut Position, &Movement)>() {
        let to_target = movement.destination - pos.0;
        let distance = to_target.length();

        if distance <= movement.speed.max(Movement::ARRIVAL_RADIUS) {
            pos.0 = movement.destination;
            arrived.push(entity);
        } else {
            pos.0 = pos.0 + to_target.normalize() * movement.speed;
        }
    }

    for entity in arrived {
        let _ = world.remove_one::<Movement>(entity);
    }
}

/// Start walking toward `destination`. Already standing there is a no-op.
pub fn start_path(world: &mut World, entity: Entity, destination: Vec3, speed: f32) -> bool {
    let current = match world.get::<&Position>(entity) {
        Ok(pos) => pos.0,
        Err(_) => return false,
    };

    if current.distance(&destination) <= Movement::ARRIVAL_RADIUS {
        let _ = world.remove_one::<Movement>(entity);
        return true;
    }
    world
        .insert_one(entity, Movement::new(destination, speed))
        .is_ok()
}

/// Entity stands at `destination` with no path outstanding
pub fn has_arrived(world: &World, entity: Entity, destination: Vec3) -> bool {
    if world.get::<&Movement>(entity).is_ok() {
        return false;
    }
    world
        .get::<&Position>(entity)
        .map(|pos| pos.0.distance(&destination) <= Movement::ARRIVAL_RADIUS)
        .unwrap_or(false)
}
