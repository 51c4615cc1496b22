use rt_net::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

/// The wire-visible identifier for an entity (`netId` in the payloads), distinct from the ECS's
/// internal `Entity` handle so snapshots stay stable across component storage churn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetId(pub u32);

/// `EntityType` from the wire protocol. `1` is the player avatar, `2` a player-fired bullet;
/// others are left for whatever the gameplay layer above this one defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityKind(pub u8);

impl EntityKind {
    pub const PLAYER: EntityKind = EntityKind(1);
    pub const BULLET: EntityKind = EntityKind(2);
}

/// Marks the avatar entity as owned by a connected session, so death/leave bookkeeping can find
/// it without a reverse scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedBy(pub SessionId);

/// Ticks-remaining countdown for transient entities (e.g. projectiles). Reaching zero marks the
/// entity for despawn on the next lifetime sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime {
    pub ticks_remaining: u32,
}

/// The room a non-avatar entity (currently: bullets) belongs to. Avatars don't carry this; their
/// room comes from the owning session's `room_id` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomId(pub u32);

/// Axis-aligned half-extents centered on `Position`, used by the bullet/player collision sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub half_width: f32,
    pub half_height: f32,
}

/// Remaining hit points. Reaching zero despawns the entity and broadcasts `EntityDeath`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub current: u32,
}

/// Damage a bullet deals to whatever player it overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Damage(pub u32);

/// Per-avatar fire-rate and ammo state driving the `SHOOT` input bit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weapon {
    pub ammo: u16,
    pub max_ammo: u16,
    pub fire_rate: f32,
    pub cooldown_remaining: f32,
}
