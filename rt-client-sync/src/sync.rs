use hashbrown::HashMap;
use slog::{debug, o, warn, Logger};

use rt_ecs::{Entity, Registry};
use rt_proto::{
    AmmoUpdatePayload, BooleanPayload, CodecError, DebugModePayload, EntityDeathPayload,
    EntitySnapshotPayload, EntitySpawnPayload, LoginResponsePayload, OpCode, Packet, Payload,
    PingPayload, RoomChatReceivedPayload, RoomInfo, RoomSnapshotPayload,
};
use rt_sim::{NetId, Position, Velocity};

use crate::components::{Rotation, SpriteSize};
use crate::state::{AmmoStatus, ChatHistory, ChatLine, ClientState};

/// Applies inbound packets to a local mirror ECS and a handful of scene-level flags. Owned by
/// the client's network-sync layer; nothing here touches a socket directly.
pub struct ClientSync {
    registry: Registry,
    net_id_to_entity: HashMap<u32, Entity>,
    state: ClientState,
    logged_in: bool,
    username: String,
    ready: bool,
    udp_ready: bool,
    rooms: Vec<RoomInfo>,
    chat: ChatHistory,
    ammo: AmmoStatus,
    ping_ms: u32,
    debug_mode: bool,
    kicked: bool,
    log: Logger,
}

impl ClientSync {
    pub fn new(log: Logger) -> ClientSync {
        let registry = Registry::new();
        registry.register::<Position>();
        registry.register::<Velocity>();
        registry.register::<NetId>();
        registry.register::<SpriteSize>();
        registry.register::<Rotation>();

        ClientSync {
            registry,
            net_id_to_entity: HashMap::new(),
            state: ClientState::NotLogged,
            logged_in: false,
            username: String::new(),
            ready: false,
            udp_ready: false,
            rooms: Vec::new(),
            chat: ChatHistory::default(),
            ammo: AmmoStatus::default(),
            ping_ms: 0,
            debug_mode: false,
            kicked: false,
            log: log.new(o!("component" => "rt-client-sync")),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Dispatches one inbound packet by opcode. `now_ms` is the client's current monotonic clock,
    /// used to turn an echoed `Pong` timestamp into an RTT sample.
    pub fn apply(&mut self, now_ms: u64, packet: &mut Packet) -> Result<(), CodecError> {
        match packet.header.op_code {
            OpCode::LoginResponse | OpCode::RegisterResponse => self.on_login_response(packet),
            OpCode::RoomList => self.on_room_list(packet),
            OpCode::JoinRoom | OpCode::CreateRoom => self.on_room_ack(packet),
            OpCode::StartGame => {
                self.state = ClientState::InGame;
                Ok(())
            }
            OpCode::EntitySpawn => self.on_entity_spawn(packet),
            OpCode::EntityDeath => self.on_entity_death(packet),
            OpCode::RoomUpdate => self.on_room_update(packet),
            OpCode::RoomChatReceived => self.on_room_chat(packet),
            OpCode::AmmoUpdate => self.on_ammo_update(packet),
            OpCode::Pong => self.on_pong(now_ms, packet),
            OpCode::DebugModeUpdate => self.on_debug_mode(packet),
            OpCode::Kicked => {
                self.kicked = true;
                Ok(())
            }
            other => {
                debug!(self.log, "no client-side handler for opcode"; "opcode" => ?other);
                Ok(())
            }
        }
    }

    fn on_login_response(&mut self, packet: &mut Packet) -> Result<(), CodecError> {
        let resp = LoginResponsePayload::decode(packet)?;
        if resp.success != 0 {
            self.logged_in = true;
            self.username = resp.username;
            self.state = ClientState::InLobby;
        }
        Ok(())
    }

    fn on_room_list(&mut self, packet: &mut Packet) -> Result<(), CodecError> {
        let count: u32 = packet.read_pod()?;
        let mut rooms = Vec::with_capacity(count as usize);
        for _ in 0..count {
            rooms.push(RoomInfo::decode(packet)?);
        }
        self.rooms = rooms;
        Ok(())
    }

    fn on_room_ack(&mut self, packet: &mut Packet) -> Result<(), CodecError> {
        let ack = BooleanPayload::decode(packet)?;
        self.state = if ack.status != 0 { ClientState::InRoom } else { ClientState::InLobby };
        Ok(())
    }

    fn on_entity_spawn(&mut self, packet: &mut Packet) -> Result<(), CodecError> {
        let spawn = EntitySpawnPayload::decode(packet)?;
        if self.net_id_to_entity.contains_key(&spawn.net_id) {
            return Ok(());
        }

        let entity = self.registry.spawn().map_err(|_| CodecError::OutOfBounds)?;
        let _ = self.registry.add(entity, Position { x: spawn.pos_x, y: spawn.pos_y });
        let _ = self.registry.add(entity, Velocity::default());
        let _ = self.registry.add(entity, NetId(spawn.net_id));
        let _ = self.registry.add(entity, SpriteSize { width: spawn.size_x, height: spawn.size_y });
        let _ = self.registry.add(entity, Rotation::default());
        self.net_id_to_entity.insert(spawn.net_id, entity);
        Ok(())
    }

    fn on_entity_death(&mut self, packet: &mut Packet) -> Result<(), CodecError> {
        let death = EntityDeathPayload::decode(packet)?;
        if let Some(entity) = self.net_id_to_entity.remove(&death.net_id) {
            self.registry.kill(entity);
        }
        Ok(())
    }

    fn on_room_update(&mut self, packet: &mut Packet) -> Result<(), CodecError> {
        let header = RoomSnapshotPayload::decode(packet)?;
        for _ in 0..header.entity_count {
            let snap = EntitySnapshotPayload::decode(packet)?;
            let Some(&entity) = self.net_id_to_entity.get(&snap.net_id) else { continue };
            if let Ok(mut pos) = self.registry.get_mut::<Position>(entity) {
                pos.x = snap.position.x;
                pos.y = snap.position.y;
            }
            if let Ok(mut vel) = self.registry.get_mut::<Velocity>(entity) {
                vel.x = snap.velocity.x;
                vel.y = snap.velocity.y;
            }
            if let Ok(mut rot) = self.registry.get_mut::<Rotation>(entity) {
                rot.0 = snap.rotation;
            }
        }
        Ok(())
    }

    fn on_room_chat(&mut self, packet: &mut Packet) -> Result<(), CodecError> {
        let chat = RoomChatReceivedPayload::decode(packet)?;
        self.chat.push(ChatLine {
            session_id: chat.session_id,
            username: chat.username,
            message: chat.message,
        });
        Ok(())
    }

    fn on_ammo_update(&mut self, packet: &mut Packet) -> Result<(), CodecError> {
        let ammo = AmmoUpdatePayload::decode(packet)?;
        self.ammo = AmmoStatus {
            current: ammo.current,
            max: ammo.max,
            is_reloading: ammo.is_reloading != 0,
            cooldown_remaining: ammo.cooldown_remaining,
        };
        Ok(())
    }

    fn on_pong(&mut self, now_ms: u64, packet: &mut Packet) -> Result<(), CodecError> {
        let pong = PingPayload::decode(packet)?;
        self.ping_ms = now_ms.saturating_sub(pong.client_time_ms) as u32;
        self.udp_ready = true;
        Ok(())
    }

    fn on_debug_mode(&mut self, packet: &mut Packet) -> Result<(), CodecError> {
        let debug = DebugModePayload::decode(packet)?;
        self.debug_mode = debug.enabled != 0;
        Ok(())
    }

    // ---- accessors ----------------------------------------------------------------------------

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn is_in_room(&self) -> bool {
        matches!(self.state, ClientState::InRoom | ClientState::InGame)
    }

    pub fn is_in_game(&self) -> bool {
        self.state == ClientState::InGame
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready_flag(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn is_udp_ready(&self) -> bool {
        self.udp_ready
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn available_rooms(&self) -> &[RoomInfo] {
        &self.rooms
    }

    pub fn last_chat_message(&self) -> Option<&ChatLine> {
        self.chat.last()
    }

    pub fn chat_history(&self) -> impl Iterator<Item = &ChatLine> {
        self.chat.iter()
    }

    pub fn ammo(&self) -> AmmoStatus {
        self.ammo
    }

    pub fn ping_ms(&self) -> u32 {
        self.ping_ms
    }

    pub fn is_debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// Consumes and clears the one-shot kicked latch.
    pub fn consume_kicked(&mut self) -> bool {
        std::mem::take(&mut self.kicked)
    }

    pub fn net_id_of(&self, entity: Entity) -> Option<u32> {
        self.net_id_to_entity
            .iter()
            .find_map(|(&net_id, &e)| if e == entity { Some(net_id) } else { None })
    }
}

/// Builds the 1 Hz reliable heartbeat (and the startup unreliable probe) carrying the client's
/// current clock so the matching `Pong` can be turned into an RTT sample.
pub fn build_ping(client_time_ms: u64) -> Packet {
    let mut packet = Packet::new(OpCode::Ping);
    let _ = PingPayload { client_time_ms }.encode(&mut packet);
    packet
}

#[cfg(test)]
mod tests {
    use super::*;
    use rt_proto::Vec2;
    use slog::Discard;

    fn logger() -> Logger {
        Logger::root(Discard, o!())
    }

    fn roundtrip(op: OpCode, body: impl FnOnce(&mut Packet)) -> Packet {
        let mut packet = Packet::new(op);
        body(&mut packet);
        Packet::deserialize(&packet.serialize()).unwrap()
    }

    #[test]
    fn entity_spawn_then_death_round_trips_through_the_mirror() {
        let mut sync = ClientSync::new(logger());
        let mut spawn = roundtrip(OpCode::EntitySpawn, |p| {
            EntitySpawnPayload { net_id: 7, entity_type: 1, pos_x: 1.0, pos_y: 2.0, size_x: 16.0, size_y: 16.0 }
                .encode(p)
                .unwrap();
        });
        sync.apply(0, &mut spawn).unwrap();
        assert_eq!(sync.net_id_to_entity.len(), 1);

        let mut death = roundtrip(OpCode::EntityDeath, |p| {
            EntityDeathPayload { net_id: 7, entity_type: 1, position: Vec2::new(1.0, 2.0) }
                .encode(p)
                .unwrap();
        });
        sync.apply(0, &mut death).unwrap();
        assert!(sync.net_id_to_entity.is_empty());
    }

    #[test]
    fn room_update_moves_only_mapped_entities() {
        let mut sync = ClientSync::new(logger());
        let mut spawn = roundtrip(OpCode::EntitySpawn, |p| {
            EntitySpawnPayload { net_id: 1, entity_type: 1, pos_x: 0.0, pos_y: 0.0, size_x: 0.0, size_y: 0.0 }
                .encode(p)
                .unwrap();
        });
        sync.apply(0, &mut spawn).unwrap();

        let mut update = roundtrip(OpCode::RoomUpdate, |p| {
            RoomSnapshotPayload { room_id: 1, current_players: 1, server_tick: 1, entity_count: 2, in_game: 1 }
                .encode(p)
                .unwrap();
            EntitySnapshotPayload { net_id: 1, position: Vec2::new(10.0, 20.0), velocity: Vec2::new(1.0, 0.0), rotation: 0.0 }
                .encode(p)
                .unwrap();
            EntitySnapshotPayload { net_id: 99, position: Vec2::new(-5.0, -5.0), velocity: Vec2::default(), rotation: 0.0 }
                .encode(p)
                .unwrap();
        });
        sync.apply(0, &mut update).unwrap();

        let entity = *sync.net_id_to_entity.get(&1).unwrap();
        let pos = sync.registry.get::<Position>(entity).unwrap();
        assert_eq!((pos.x, pos.y), (10.0, 20.0));
    }

    #[test]
    fn chat_history_is_capped_at_eight() {
        let mut sync = ClientSync::new(logger());
        for i in 0..10 {
            let mut chat = roundtrip(OpCode::RoomChatReceived, |p| {
                RoomChatReceivedPayload { session_id: 1, username: "bob".into(), message: format!("msg{i}") }
                    .encode(p)
                    .unwrap();
            });
            sync.apply(0, &mut chat).unwrap();
        }
        assert_eq!(sync.chat_history().count(), 8);
        assert_eq!(sync.last_chat_message().unwrap().message, "msg9");
    }

    #[test]
    fn pong_computes_rtt_from_the_echoed_timestamp() {
        let mut sync = ClientSync::new(logger());
        let mut pong = roundtrip(OpCode::Pong, |p| {
            PingPayload { client_time_ms: 1_000 }.encode(p).unwrap();
        });
        sync.apply(1_050, &mut pong).unwrap();
        assert_eq!(sync.ping_ms(), 50);
        assert!(sync.is_udp_ready());
    }
}
