use hashbrown::HashMap;
use rt_net::SessionId;
use std::sync::Mutex;

use crate::error::RoomError;
use crate::room::{Room, RoomState, RoomType};

pub const LOBBY_ID: u32 = 1;

#[derive(Debug, Clone, Copy)]
pub struct JoinOutcome {
    pub ready: bool,
    pub was_already_in_game: bool,
}

#[derive(Debug, Clone)]
pub struct CreateRoomParams {
    pub name: String,
    pub max_players: u32,
    pub difficulty: f32,
    pub speed: f32,
    pub level_id: u32,
    pub seed: u32,
    pub duration: u32,
}

struct Inner {
    rooms: HashMap<u32, Room>,
    session_room: HashMap<SessionId, u32>,
    next_room_id: u32,
}

/// Rooms, membership, and readiness, guarded by one mutex. The lobby (id [`LOBBY_ID`]) exists
/// for the process lifetime, has no capacity limit, and never becomes `InGame`.
pub struct RoomManager {
    inner: Mutex<Inner>,
}

impl Default for RoomManager {
    fn default() -> Self {
        RoomManager::new()
    }
}

impl RoomManager {
    pub fn new() -> RoomManager {
        let mut rooms = HashMap::new();
        rooms.insert(LOBBY_ID, Room::lobby(LOBBY_ID));
        RoomManager {
            inner: Mutex::new(Inner { rooms, session_room: HashMap::new(), next_room_id: LOBBY_ID + 1 }),
        }
    }

    pub fn create_room(&self, owner: SessionId, params: CreateRoomParams) -> u32 {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_room_id;
        inner.next_room_id += 1;

        let mut room = Room {
            id,
            name: params.name,
            max_players: params.max_players,
            difficulty: params.difficulty,
            speed: params.speed,
            duration: params.duration,
            seed: params.seed,
            level_id: params.level_id,
            owner,
            room_type: RoomType::Public,
            state: RoomState::Waiting,
            members: Vec::new(),
            ready: Default::default(),
            banned_usernames: Default::default(),
        };
        room.members.push(owner);
        inner.rooms.insert(id, room);
        Self::remove_from_current_room(&mut inner, owner);
        inner.session_room.insert(owner, id);
        id
    }

    pub fn join_room(
        &self,
        session_id: SessionId,
        username: &str,
        room_id: u32,
        as_spectator: bool,
    ) -> Result<JoinOutcome, RoomError> {
        let mut inner = self.inner.lock().unwrap();

        let was_already_in_game = {
            let target = inner.rooms.get(&room_id).ok_or(RoomError::RoomNotFound)?;
            if !target.is_lobby() && target.is_banned(username) {
                return Err(RoomError::SessionBanned);
            }
            if target.state == RoomState::InGame && !as_spectator {
                return Err(RoomError::RoomAlreadyInGame);
            }
            if target.is_full() && !as_spectator {
                return Err(RoomError::RoomFull);
            }
            target.state == RoomState::InGame
        };

        Self::remove_from_current_room(&mut inner, session_id);

        let ready = as_spectator || was_already_in_game;
        let room = inner.rooms.get_mut(&room_id).expect("checked above");
        room.members.push(session_id);
        if ready {
            room.ready.insert(session_id);
        }
        inner.session_room.insert(session_id, room_id);

        Ok(JoinOutcome { ready, was_already_in_game })
    }

    /// Removes `session_id` from whatever room it's in. Returns the room it left, if any.
    pub fn leave_room(&self, session_id: SessionId) -> Option<u32> {
        let mut inner = self.inner.lock().unwrap();
        Self::remove_from_current_room(&mut inner, session_id)
    }

    pub fn disconnect(&self, session_id: SessionId) -> Option<u32> {
        self.leave_room(session_id)
    }

    fn remove_from_current_room(inner: &mut Inner, session_id: SessionId) -> Option<u32> {
        let old_id = inner.session_room.remove(&session_id)?;
        if let Some(room) = inner.rooms.get_mut(&old_id) {
            room.members.retain(|&m| m != session_id);
            room.ready.remove(&session_id);
            if !room.is_lobby() && room.is_empty() {
                inner.rooms.remove(&old_id);
            }
        }
        Some(old_id)
    }

    pub fn set_ready(&self, session_id: SessionId, ready: bool) -> Option<u32> {
        let mut inner = self.inner.lock().unwrap();
        let room_id = *inner.session_room.get(&session_id)?;
        let room = inner.rooms.get_mut(&room_id)?;
        if ready {
            room.ready.insert(session_id);
        } else {
            room.ready.remove(&session_id);
        }
        Some(room_id)
    }

    pub fn list_rooms(&self) -> Vec<Room> {
        let inner = self.inner.lock().unwrap();
        inner.rooms.values().filter(|r| !r.is_lobby()).cloned().collect()
    }

    pub fn get(&self, room_id: u32) -> Option<Room> {
        self.inner.lock().unwrap().rooms.get(&room_id).cloned()
    }

    pub fn room_of(&self, session_id: SessionId) -> Option<u32> {
        self.inner.lock().unwrap().session_room.get(&session_id).copied()
    }

    pub fn ban(&self, room_id: u32, username: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(room) = inner.rooms.get_mut(&room_id) {
            room.banned_usernames.insert(username.to_string());
        }
    }

    pub fn unban(&self, room_id: u32, username: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(room) = inner.rooms.get_mut(&room_id) {
            room.banned_usernames.remove(username);
        }
    }

    /// Transitions every fully-ready `Public`/`Waiting` room to `InGame` and returns the rooms
    /// that just started, so the caller (the simulation layer) can spawn their avatars.
    pub fn launch_ready_rooms(&self) -> Vec<Room> {
        let mut inner = self.inner.lock().unwrap();
        let ids: Vec<u32> = inner
            .rooms
            .values()
            .filter(|r| r.room_type == RoomType::Public && r.state == RoomState::Waiting && r.all_ready())
            .map(|r| r.id)
            .collect();

        ids.into_iter()
            .map(|id| {
                let room = inner.rooms.get_mut(&id).expect("id came from rooms");
                room.state = RoomState::InGame;
                room.clone()
            })
            .collect()
    }
}
