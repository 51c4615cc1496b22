//! Per-tick ECS passes layered over the player-input handling in `simulation.rs`: a generic
//! velocity integrator shared by avatars and bullets, a TTL sweep, and a bullet/player AABB
//! collision check. Grounded on the original's `LifetimeSystem`/`EnemyShootSystem`, scaled down
//! to the bullet-only extension point `simulation.rs` wires them through — no enemy AI, no
//! weapon-config loading (both out of scope).

use hashbrown::HashSet;

use rt_ecs::{Entity, Registry};

use crate::components::{BoundingBox, Damage, EntityKind, Health, Lifetime, NetId, OwnedBy, Position, RoomId, Velocity};

/// Advances every entity that has both a `Position` and a `Velocity` by one fixed step. Shared
/// between player avatars (velocity set from input in `simulation::step_room`) and bullets
/// (velocity set once at spawn and left alone).
pub fn integrate_positions(registry: &Registry, dt: f32) {
    let moved: Vec<(Entity, f32, f32)> = registry
        .view::<(Position, Velocity)>()
        .iter()
        .map(|(e, (pos, vel))| (e, pos.x + vel.x * dt, pos.y + vel.y * dt))
        .collect();

    for (entity, x, y) in moved {
        if let Ok(mut pos) = registry.get_mut::<Position>(entity) {
            pos.x = x;
            pos.y = y;
        }
    }
}

/// One entity past its TTL, reported by `net_id`/`room_id` so the caller can broadcast its
/// `EntityDeath` before killing it.
pub struct Expired {
    pub net_id: u32,
    pub room_id: u32,
}

/// Ticks down every `Lifetime` by one step and reports entities that just crossed zero. Mirrors
/// `LifetimeSystem::update`'s sweep-then-destroy split: the caller broadcasts the death packet
/// and calls `Registry::kill` itself.
pub fn expire_lifetimes(registry: &Registry) -> Vec<Expired> {
    let ticked: Vec<(Entity, u32)> = registry
        .view::<(Lifetime,)>()
        .iter()
        .map(|(e, (l,))| (e, l.ticks_remaining.saturating_sub(1)))
        .collect();

    let mut expired = Vec::new();
    for (entity, remaining) in ticked {
        if let Ok(mut lifetime) = registry.get_mut::<Lifetime>(entity) {
            lifetime.ticks_remaining = remaining;
        }
        if remaining == 0 {
            if let (Ok(net_id), Ok(room_id)) = (registry.get::<NetId>(entity), registry.get::<RoomId>(entity)) {
                expired.push(Expired { net_id: net_id.0, room_id: room_id.0 });
            }
        }
    }
    expired
}

fn overlaps(a_pos: Position, a_box: BoundingBox, b_pos: Position, b_box: BoundingBox) -> bool {
    (a_pos.x - b_pos.x).abs() <= a_box.half_width + b_box.half_width
        && (a_pos.y - b_pos.y).abs() <= a_box.half_height + b_box.half_height
}

/// One bullet/player overlap: the bullet is always spent on contact; `killed` reports whether the
/// hit brought the player's health to zero.
pub struct Hit {
    pub bullet_net_id: u32,
    pub player_net_id: u32,
    pub room_id: u32,
    pub killed: bool,
}

/// AABB collision check between every live bullet and every player avatar, skipping a bullet's
/// own owner. A hit applies the bullet's damage to the player's `Health` and consumes the bullet.
/// Grounded on the original's collision handling in `GameManager.cpp`/`EnemyShootSystem.cpp`, cut
/// down to bullet-vs-player since there is no enemy entity in this implementation.
pub fn check_bullet_collisions(registry: &Registry) -> Vec<Hit> {
    let bullets: Vec<(Entity, Position, BoundingBox, Damage, OwnedBy)> = registry
        .view::<(Position, BoundingBox, Damage, OwnedBy)>()
        .iter()
        .map(|(e, (pos, bbox, dmg, owner))| (e, *pos, *bbox, *dmg, *owner))
        .collect();

    let players: Vec<(Entity, Position, BoundingBox, OwnedBy, NetId)> = registry
        .view::<(Position, BoundingBox, OwnedBy, NetId)>()
        .iter()
        .map(|(e, (pos, bbox, owner, net_id))| (e, *pos, *bbox, *owner, *net_id))
        .collect();

    let bullets: Vec<_> = bullets
        .into_iter()
        .filter(|(e, ..)| registry.get::<EntityKind>(*e).map_or(false, |k| *k == EntityKind::BULLET))
        .filter_map(|(e, pos, bbox, dmg, owner)| {
            let room_id = registry.get::<RoomId>(e).map(|r| r.0).ok()?;
            Some((e, pos, bbox, dmg, owner, room_id))
        })
        .collect();

    let players: Vec<_> = players
        .into_iter()
        .filter(|(e, ..)| registry.get::<EntityKind>(*e).map_or(false, |k| *k == EntityKind::PLAYER))
        .collect();

    let mut hits = Vec::new();
    let mut spent = HashSet::new();

    for (bullet, b_pos, b_box, dmg, b_owner, room_id) in bullets {
        if spent.contains(&bullet) {
            continue;
        }
        for &(player, p_pos, p_box, p_owner, p_net_id) in &players {
            if p_owner == b_owner || !overlaps(b_pos, b_box, p_pos, p_box) {
                continue;
            }

            let killed = match registry.get_mut::<Health>(player) {
                Ok(mut health) => {
                    health.current = health.current.saturating_sub(dmg.0);
                    health.current == 0
                }
                Err(_) => false,
            };

            let Ok(bullet_net_id) = registry.get::<NetId>(bullet).map(|n| n.0) else { break };
            spent.insert(bullet);
            hits.push(Hit { bullet_net_id, player_net_id: p_net_id.0, room_id, killed });
            break;
        }
    }
    hits
}
