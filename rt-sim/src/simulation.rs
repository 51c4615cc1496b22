use hashbrown::HashMap;
use slog::{debug, o, warn, Logger};

use rt_ecs::{Entity, Registry};
use rt_net::{Channel, NetEvent, Outbound, SessionId};
use rt_proto::{
    AmmoUpdatePayload, BooleanPayload, CreateRoomPayload, EntityDeathPayload, EntitySnapshotPayload,
    EntitySpawnPayload, InputPayload, JoinRoomPayload, LoginPayload, LoginResponsePayload, OpCode, Packet,
    Payload, PingPayload, RegisterResponsePayload, RoomChatPayload, RoomChatReceivedPayload, RoomInfo,
    RoomSnapshotPayload, SetReadyPayload, Vec2,
};
use rt_room::{CreateRoomParams, RoomManager};
use rt_session::{CredentialStore, SessionTable};

use crate::components::{
    BoundingBox, Damage, EntityKind, Health, Lifetime, NetId, OwnedBy, Position, RoomId, Velocity, Weapon,
};
use crate::systems;

/// How fast an avatar moves per unit of input-mask velocity, before the room's speed multiplier.
pub const BASE_SPEED: f32 = 200.0;
/// Starting/maximum hit points for a freshly spawned avatar.
const PLAYER_MAX_HEALTH: u32 = 100;
/// Avatar collision half-extents, matching the 32x32 sprite the client instantiates.
const PLAYER_HALF_SIZE: f32 = 16.0;
/// Starting ammo reserve and rounds/second for a freshly spawned avatar's default weapon.
const WEAPON_MAX_AMMO: u16 = 30;
const WEAPON_FIRE_RATE: f32 = 4.0;
/// Units/second a bullet travels once fired, and how far in front of the avatar it spawns.
const BULLET_SPEED: f32 = 600.0;
const BULLET_SPAWN_OFFSET_X: f32 = 20.0;
const BULLET_HALF_WIDTH: f32 = 4.0;
const BULLET_HALF_HEIGHT: f32 = 2.0;
const BULLET_DAMAGE: u32 = 10;
/// Ticks a bullet survives before despawning on its own, independent of hitting anything.
const BULLET_LIFETIME_TICKS: u32 = 180;

/// Owns the ECS, the session/room state machines, and the credential store. Runs entirely on the
/// simulation thread: `handle_event` drains the transport queue, `tick` advances one fixed step.
pub struct Simulation {
    registry: Registry,
    sessions: SessionTable,
    rooms: RoomManager,
    credentials: CredentialStore,
    entity_by_net_id: HashMap<u32, Entity>,
    next_entity_id: u32,
    server_tick: u32,
    outbound: crossbeam_channel::Sender<Outbound>,
    log: Logger,
}

impl Simulation {
    pub fn new(
        credentials: CredentialStore,
        outbound: crossbeam_channel::Sender<Outbound>,
        log: Logger,
    ) -> Simulation {
        let registry = Registry::new();
        registry.register::<Position>();
        registry.register::<Velocity>();
        registry.register::<NetId>();
        registry.register::<EntityKind>();
        registry.register::<OwnedBy>();
        registry.register::<Lifetime>();
        registry.register::<RoomId>();
        registry.register::<BoundingBox>();
        registry.register::<Health>();
        registry.register::<Damage>();
        registry.register::<Weapon>();

        Simulation {
            registry,
            sessions: SessionTable::new(),
            rooms: RoomManager::new(),
            credentials,
            entity_by_net_id: HashMap::new(),
            next_entity_id: 1,
            server_tick: 0,
            outbound,
            log: log.new(o!("component" => "rt-sim::simulation")),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    fn send_reliable(&self, id: SessionId, packet: Packet) {
        let _ = self.outbound.send(Outbound::Send(id, packet, Channel::Stream));
    }

    fn send_unreliable(&self, id: SessionId, packet: Packet) {
        let _ = self.outbound.send(Outbound::Send(id, packet, Channel::Datagram));
    }

    fn broadcast_reliable(&self, members: &[SessionId], packet: &Packet) {
        for &member in members {
            self.send_reliable(member, packet.clone());
        }
    }

    // ---- transport event handling ----------------------------------------------------------

    pub fn handle_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Connected(id) => {
                self.sessions.insert(id);
                debug!(self.log, "session connected"; "session" => id);
            }
            NetEvent::Disconnected(id) => self.handle_disconnect(id),
            NetEvent::Packet(id, packet, channel) => self.dispatch_packet(id, packet, channel),
        }
    }

    fn handle_disconnect(&mut self, id: SessionId) {
        let entity_id = self.sessions.with(id, |s| s.entity_id).unwrap_or(0);
        let room_id = self.rooms.disconnect(id);
        self.sessions.remove(id);

        if let (Some(room_id), true) = (room_id, entity_id != 0) {
            self.broadcast_entity_death(room_id, entity_id);
        }
        debug!(self.log, "session disconnected"; "session" => id);
    }

    fn dispatch_packet(&mut self, id: SessionId, mut packet: Packet, channel: Channel) {
        let op = packet.header.op_code;
        let result = match op {
            OpCode::LoginRequest => self.handle_login(id, &mut packet),
            OpCode::RegisterRequest => self.handle_register(id, &mut packet),
            OpCode::ListRooms => self.handle_list_rooms(id),
            OpCode::CreateRoom => self.handle_create_room(id, &mut packet),
            OpCode::JoinRoom => self.handle_join_room(id, &mut packet),
            OpCode::LeaveRoom => self.handle_leave_room(id),
            OpCode::SetReady => self.handle_set_ready(id, &mut packet),
            OpCode::RoomChatSent => self.handle_room_chat(id, &mut packet),
            OpCode::InputTick => self.handle_input_tick(id, &mut packet),
            OpCode::Ping => self.handle_ping(id, &mut packet, channel),
            other => {
                debug!(self.log, "ignoring opcode with no server-side handler"; "opcode" => ?other);
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(self.log, "dropping malformed packet"; "session" => id, "opcode" => ?op, "error" => %e);
        }
    }

    fn handle_login(&mut self, id: SessionId, packet: &mut Packet) -> Result<(), rt_proto::CodecError> {
        let req = LoginPayload::decode(packet)?;
        let success = self.credentials.login(&req.username, &req.password).is_ok();
        if success {
            self.sessions.with_mut(id, |s| {
                s.logged_in = true;
                s.username = Some(req.username.clone());
            });
        }

        let mut resp = Packet::new(OpCode::LoginResponse);
        LoginResponsePayload { success: success as u8, username: req.username }.encode(&mut resp)?;
        self.send_reliable(id, resp);
        Ok(())
    }

    fn handle_register(&mut self, id: SessionId, packet: &mut Packet) -> Result<(), rt_proto::CodecError> {
        let req = LoginPayload::decode(packet)?;
        let success = self.credentials.register(&req.username, &req.password).is_ok();

        let mut resp = Packet::new(OpCode::RegisterResponse);
        RegisterResponsePayload { success: success as u8, username: req.username }.encode(&mut resp)?;
        self.send_reliable(id, resp);
        Ok(())
    }

    fn handle_list_rooms(&mut self, id: SessionId) -> Result<(), rt_proto::CodecError> {
        let rooms = self.rooms.list_rooms();
        let mut resp = Packet::new(OpCode::RoomList);
        resp.write_pod(rooms.len() as u32);
        for room in &rooms {
            let info = RoomInfo {
                room_id: room.id,
                room_name: room.name.clone(),
                current_players: room.members.len() as u32,
                max_players: room.max_players,
                in_game: (room.state == rt_room::RoomState::InGame) as u8,
                difficulty: room.difficulty,
                speed: room.speed,
                duration: room.duration,
                seed: room.seed,
                level_id: room.level_id,
            };
            info.encode(&mut resp)?;
        }
        self.send_reliable(id, resp);
        Ok(())
    }

    fn handle_create_room(&mut self, id: SessionId, packet: &mut Packet) -> Result<(), rt_proto::CodecError> {
        let req = CreateRoomPayload::decode(packet)?;
        let room_id = self.rooms.create_room(
            id,
            CreateRoomParams {
                name: req.room_name,
                max_players: req.max_players,
                difficulty: req.difficulty,
                speed: req.speed,
                level_id: req.level_id,
                seed: req.seed,
                duration: req.duration,
            },
        );
        self.sessions.with_mut(id, |s| {
            s.room_id = room_id;
            s.ready = false;
        });
        Ok(())
    }

    fn handle_join_room(&mut self, id: SessionId, packet: &mut Packet) -> Result<(), rt_proto::CodecError> {
        let req = JoinRoomPayload::decode(packet)?;
        let username = self.sessions.with(id, |s| s.username.clone()).flatten().unwrap_or_default();

        match self.rooms.join_room(id, &username, req.room_id, req.is_spectator != 0) {
            Ok(outcome) => {
                self.sessions.with_mut(id, |s| {
                    s.room_id = req.room_id;
                    s.ready = outcome.ready;
                });

                let mut ack = Packet::new(OpCode::JoinRoom);
                BooleanPayload { status: 1 }.encode(&mut ack)?;
                self.send_reliable(id, ack);

                if outcome.was_already_in_game {
                    self.send_reliable(id, Packet::new(OpCode::StartGame));
                    self.resync_room_entities(req.room_id, id)?;
                }
            }
            Err(e) => {
                warn!(self.log, "join_room rejected"; "session" => id, "room" => req.room_id, "error" => %e);
                let mut ack = Packet::new(OpCode::JoinRoom);
                BooleanPayload { status: 0 }.encode(&mut ack)?;
                self.send_reliable(id, ack);
            }
        }
        Ok(())
    }

    fn handle_leave_room(&mut self, id: SessionId) -> Result<(), rt_proto::CodecError> {
        let entity_id = self.sessions.with(id, |s| s.entity_id).unwrap_or(0);
        let room_id = self.rooms.leave_room(id);

        self.sessions.with_mut(id, |s| {
            s.room_id = 0;
            s.ready = false;
            s.entity_id = 0;
        });

        if let (Some(room_id), true) = (room_id, entity_id != 0) {
            self.broadcast_entity_death(room_id, entity_id);
        }
        Ok(())
    }

    fn handle_set_ready(&mut self, id: SessionId, packet: &mut Packet) -> Result<(), rt_proto::CodecError> {
        let req = SetReadyPayload::decode(packet)?;
        self.rooms.set_ready(id, req.is_ready != 0);
        self.sessions.with_mut(id, |s| s.ready = req.is_ready != 0);
        Ok(())
    }

    fn handle_room_chat(&mut self, id: SessionId, packet: &mut Packet) -> Result<(), rt_proto::CodecError> {
        let req = RoomChatPayload::decode(packet)?;
        let (username, room_id) = self
            .sessions
            .with(id, |s| (s.username.clone().unwrap_or_default(), s.room_id))
            .unwrap_or_default();

        if room_id == 0 {
            return Ok(());
        }
        let Some(room) = self.rooms.get(room_id) else { return Ok(()) };

        let mut out = Packet::new(OpCode::RoomChatReceived);
        RoomChatReceivedPayload { session_id: id, username, message: req.message }.encode(&mut out)?;
        self.broadcast_reliable(&room.members, &out);
        Ok(())
    }

    fn handle_input_tick(&mut self, id: SessionId, packet: &mut Packet) -> Result<(), rt_proto::CodecError> {
        let req = InputPayload::decode(packet)?;
        self.sessions.with_mut(id, |s| s.input_mask = req.input_mask);
        Ok(())
    }

    fn handle_ping(&mut self, id: SessionId, packet: &mut Packet, channel: Channel) -> Result<(), rt_proto::CodecError> {
        let req = PingPayload::decode(packet)?;
        let mut resp = Packet::new(OpCode::Pong);
        req.encode(&mut resp)?;
        match channel {
            Channel::Stream => self.send_reliable(id, resp),
            Channel::Datagram => self.send_unreliable(id, resp),
        }
        Ok(())
    }

    // ---- entity lifecycle --------------------------------------------------------------------

    fn spawn_avatar(&mut self, room_id: u32, session_id: SessionId) -> u32 {
        let entity = self.registry.spawn().expect("entity index space exhausted");
        let net_id = self.next_entity_id;
        self.next_entity_id += 1;

        let _ = self.registry.add(entity, Position { x: 100.0, y: 100.0 });
        let _ = self.registry.add(entity, Velocity::default());
        let _ = self.registry.add(entity, NetId(net_id));
        let _ = self.registry.add(entity, EntityKind::PLAYER);
        let _ = self.registry.add(entity, OwnedBy(session_id));
        let _ = self.registry.add(entity, Health { current: PLAYER_MAX_HEALTH });
        let _ = self.registry.add(entity, BoundingBox { half_width: PLAYER_HALF_SIZE, half_height: PLAYER_HALF_SIZE });
        let _ = self.registry.add(
            entity,
            Weapon { ammo: WEAPON_MAX_AMMO, max_ammo: WEAPON_MAX_AMMO, fire_rate: WEAPON_FIRE_RATE, cooldown_remaining: 0.0 },
        );

        self.entity_by_net_id.insert(net_id, entity);
        self.sessions.with_mut(session_id, |s| {
            s.entity_id = net_id;
            s.position = (100.0, 100.0);
            s.velocity = (0.0, 0.0);
        });

        let _ = room_id;
        net_id
    }

    /// Broadcasts `EntityDeath` for `net_id` in `room_id`, then kills the entity and drops its
    /// `entity_by_net_id` entry. Used for avatar leave/disconnect, bullet TTL expiry, and a
    /// bullet or player going to zero health on collision.
    fn broadcast_entity_death(&mut self, room_id: u32, net_id: u32) {
        let Some(room) = self.rooms.get(room_id) else { return };
        let Some(&entity) = self.entity_by_net_id.get(&net_id) else { return };

        let position = self.registry.get::<Position>(entity).map(|p| Vec2::new(p.x, p.y)).unwrap_or_default();
        let entity_type = self.registry.get::<EntityKind>(entity).map(|k| k.0).unwrap_or(EntityKind::PLAYER.0);

        let mut packet = Packet::new(OpCode::EntityDeath);
        let payload = EntityDeathPayload { net_id, entity_type, position };
        if payload.encode(&mut packet).is_ok() {
            self.broadcast_reliable(&room.members, &packet);
        }

        self.registry.kill(entity);
        self.entity_by_net_id.remove(&net_id);
    }

    /// Spawns a bullet in front of `owner_entity`, travelling away from it on the X axis, and
    /// broadcasts its `EntitySpawn` to the room. Grounded on `EnemyShootSystem::spawnBullet`,
    /// trimmed to the single player-bullet case (no Boss2 beam variant, no weapon-config file).
    fn spawn_bullet(&mut self, room: &rt_room::Room, owner_entity: Entity, owner_session: SessionId) {
        let Ok(origin) = self.registry.get::<Position>(owner_entity).map(|p| (p.x, p.y)) else { return };

        let Ok(bullet) = self.registry.spawn() else { return };
        let net_id = self.next_entity_id;
        self.next_entity_id += 1;

        let spawn_x = origin.0 + BULLET_SPAWN_OFFSET_X;
        let spawn_y = origin.1;

        let _ = self.registry.add(bullet, Position { x: spawn_x, y: spawn_y });
        let _ = self.registry.add(bullet, Velocity { x: BULLET_SPEED, y: 0.0 });
        let _ = self.registry.add(bullet, NetId(net_id));
        let _ = self.registry.add(bullet, EntityKind::BULLET);
        let _ = self.registry.add(bullet, OwnedBy(owner_session));
        let _ = self.registry.add(bullet, RoomId(room.id));
        let _ = self.registry.add(bullet, BoundingBox { half_width: BULLET_HALF_WIDTH, half_height: BULLET_HALF_HEIGHT });
        let _ = self.registry.add(bullet, Damage(BULLET_DAMAGE));
        let _ = self.registry.add(bullet, Lifetime { ticks_remaining: BULLET_LIFETIME_TICKS });

        self.entity_by_net_id.insert(net_id, bullet);

        let mut packet = Packet::new(OpCode::EntitySpawn);
        let payload = EntitySpawnPayload {
            net_id,
            entity_type: EntityKind::BULLET.0,
            pos_x: spawn_x,
            pos_y: spawn_y,
            size_x: BULLET_HALF_WIDTH * 2.0,
            size_y: BULLET_HALF_HEIGHT * 2.0,
        };
        if payload.encode(&mut packet).is_ok() {
            self.broadcast_reliable(&room.members, &packet);
        }
    }

    /// Expires `Lifetime`d entities and resolves bullet/player collisions for this tick.
    /// Grounded on `LifetimeSystem::update`'s sweep-then-destroy split and the original's
    /// collision handling; the two run back to back since a bullet can both expire and hit
    /// something in the same window, and `broadcast_entity_death` is idempotent per `net_id`
    /// (the second call finds nothing in `entity_by_net_id` and is a no-op).
    fn run_bullet_systems(&mut self) {
        for expired in systems::expire_lifetimes(&self.registry) {
            self.broadcast_entity_death(expired.room_id, expired.net_id);
        }
        for hit in systems::check_bullet_collisions(&self.registry) {
            self.broadcast_entity_death(hit.room_id, hit.bullet_net_id);
            if hit.killed {
                self.broadcast_entity_death(hit.room_id, hit.player_net_id);
            }
        }
    }

    fn resync_room_entities(&mut self, room_id: u32, target: SessionId) -> Result<(), rt_proto::CodecError> {
        let Some(room) = self.rooms.get(room_id) else { return Ok(()) };
        for &member in &room.members {
            let net_id = self.sessions.with(member, |s| s.entity_id).unwrap_or(0);
            if net_id == 0 {
                continue;
            }
            let Some(&entity) = self.entity_by_net_id.get(&net_id) else { continue };
            let Ok(pos) = self.registry.get::<Position>(entity) else { continue };

            let mut packet = Packet::new(OpCode::EntitySpawn);
            let payload = EntitySpawnPayload {
                net_id,
                entity_type: EntityKind::PLAYER.0,
                pos_x: pos.x,
                pos_y: pos.y,
                size_x: 0.0,
                size_y: 0.0,
            };
            payload.encode(&mut packet)?;
            self.send_reliable(target, packet);
        }
        Ok(())
    }

    // ---- fixed-timestep tick ------------------------------------------------------------------

    /// Advances the simulation by one fixed step: bumps the tick counter, promotes any
    /// fully-ready rooms to `InGame` (spawning avatars for their members), steps every `InGame`
    /// room's movement, and broadcasts a snapshot of each.
    pub fn tick(&mut self, dt: f32) {
        self.server_tick += 1;

        let started = self.rooms.launch_ready_rooms();
        for room in &started {
            let mut spawned = Vec::with_capacity(room.members.len());
            for &member in &room.members {
                let net_id = self.spawn_avatar(room.id, member);
                spawned.push(EntitySpawnPayload {
                    net_id,
                    entity_type: EntityKind::PLAYER.0,
                    pos_x: 100.0,
                    pos_y: 100.0,
                    size_x: 0.0,
                    size_y: 0.0,
                });
            }
            for payload in &spawned {
                let mut packet = Packet::new(OpCode::EntitySpawn);
                if payload.encode(&mut packet).is_ok() {
                    self.broadcast_reliable(&room.members, &packet);
                }
            }
        }

        for room in self.rooms.list_rooms() {
            if room.state != rt_room::RoomState::InGame {
                continue;
            }
            self.step_room(&room, dt);
        }

        systems::integrate_positions(&self.registry, dt);
        self.run_bullet_systems();

        for room in self.rooms.list_rooms() {
            if room.state != rt_room::RoomState::InGame {
                continue;
            }
            self.sync_session_positions(&room);
            self.broadcast_snapshot(&room);
        }
    }

    /// Sets each member's avatar velocity from their latest input mask, and fires a bullet if the
    /// `SHOOT` bit is set and the avatar's weapon is off cooldown with ammo left. Position itself
    /// is advanced afterwards by the shared [`systems::integrate_positions`] pass.
    fn step_room(&mut self, room: &rt_room::Room, dt: f32) {
        for &member in &room.members {
            let Some(net_id) = self.sessions.with(member, |s| s.entity_id) else { continue };
            if net_id == 0 {
                continue;
            }
            let Some(&entity) = self.entity_by_net_id.get(&net_id) else { continue };
            let input_mask = self.sessions.with(member, |s| s.input_mask).unwrap_or(0);

            let speed = BASE_SPEED * room.speed;
            let vx = (((input_mask & InputPayload::RIGHT != 0) as i32)
                - ((input_mask & InputPayload::LEFT != 0) as i32)) as f32
                * speed;
            let vy = (((input_mask & InputPayload::DOWN != 0) as i32)
                - ((input_mask & InputPayload::UP != 0) as i32)) as f32
                * speed;

            if let Ok(mut v) = self.registry.get_mut::<Velocity>(entity) {
                v.x = vx;
                v.y = vy;
            }

            let wants_shoot = input_mask & InputPayload::SHOOT != 0;
            let fired = if let Ok(mut weapon) = self.registry.get_mut::<Weapon>(entity) {
                weapon.cooldown_remaining = (weapon.cooldown_remaining - dt).max(0.0);
                if wants_shoot && weapon.cooldown_remaining <= 0.0 && weapon.ammo > 0 {
                    weapon.ammo -= 1;
                    weapon.cooldown_remaining = 1.0 / weapon.fire_rate;
                    Some(AmmoUpdatePayload {
                        current: weapon.ammo,
                        max: weapon.max_ammo,
                        is_reloading: 0,
                        cooldown_remaining: weapon.cooldown_remaining,
                    })
                } else {
                    None
                }
            } else {
                None
            };

            if let Some(ammo) = fired {
                self.ammo_update(member, ammo);
                self.spawn_bullet(room, entity, member);
            }
        }
    }

    /// Mirrors each member's avatar position back onto its `Session` after a tick's integration,
    /// so chat/room bookkeeping that reads `session.position` sees the post-move value.
    fn sync_session_positions(&mut self, room: &rt_room::Room) {
        for &member in &room.members {
            let Some(net_id) = self.sessions.with(member, |s| s.entity_id) else { continue };
            if net_id == 0 {
                continue;
            }
            let Some(&entity) = self.entity_by_net_id.get(&net_id) else { continue };
            if let Ok(pos) = self.registry.get::<Position>(entity) {
                let (x, y) = (pos.x, pos.y);
                self.sessions.with_mut(member, |s| s.position = (x, y));
            }
        }
    }

    fn broadcast_snapshot(&self, room: &rt_room::Room) {
        let mut entities = Vec::with_capacity(room.members.len());
        for &member in &room.members {
            let Some(net_id) = self.sessions.with(member, |s| s.entity_id) else { continue };
            if net_id == 0 {
                continue;
            }
            let Some(&entity) = self.entity_by_net_id.get(&net_id) else { continue };
            let (Ok(pos), Ok(vel)) =
                (self.registry.get::<Position>(entity), self.registry.get::<Velocity>(entity))
            else {
                continue;
            };
            entities.push(EntitySnapshotPayload {
                net_id,
                position: Vec2::new(pos.x, pos.y),
                velocity: Vec2::new(vel.x, vel.y),
                rotation: 0.0,
            });
        }

        let bullets = self.registry.view::<(NetId, Position, Velocity, RoomId)>();
        for (_, (net_id, pos, vel, bullet_room)) in bullets.iter() {
            if bullet_room.0 != room.id {
                continue;
            }
            entities.push(EntitySnapshotPayload {
                net_id: net_id.0,
                position: Vec2::new(pos.x, pos.y),
                velocity: Vec2::new(vel.x, vel.y),
                rotation: 0.0,
            });
        }

        if entities.is_empty() {
            return;
        }

        let mut packet = Packet::new(OpCode::RoomUpdate);
        let header = RoomSnapshotPayload {
            room_id: room.id,
            current_players: room.members.len() as u32,
            server_tick: self.server_tick,
            entity_count: entities.len() as u16,
            in_game: 1,
        };
        if header.encode(&mut packet).is_err() {
            return;
        }
        for e in &entities {
            if e.encode(&mut packet).is_err() {
                return;
            }
        }

        for &member in &room.members {
            self.send_unreliable(member, packet.clone());
        }
    }

    pub fn ammo_update(&self, session_id: SessionId, ammo: AmmoUpdatePayload) {
        let mut packet = Packet::new(OpCode::AmmoUpdate);
        if ammo.encode(&mut packet).is_ok() {
            self.send_reliable(session_id, packet);
        }
    }
}
