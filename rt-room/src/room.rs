use hashbrown::HashSet;
use rt_net::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomType {
    Lobby,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Waiting,
    InGame,
}

/// One matchmaking room. The lobby is a singleton `Room` with `room_type == Lobby`; it never
/// transitions to `InGame` and has no member cap.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: u32,
    pub name: String,
    pub max_players: u32,
    pub difficulty: f32,
    pub speed: f32,
    pub duration: u32,
    pub seed: u32,
    pub level_id: u32,
    pub owner: SessionId,
    pub room_type: RoomType,
    pub state: RoomState,
    pub members: Vec<SessionId>,
    pub ready: HashSet<SessionId>,
    pub banned_usernames: HashSet<String>,
}

impl Room {
    pub fn lobby(id: u32) -> Room {
        Room {
            id,
            name: "lobby".to_string(),
            max_players: 0,
            difficulty: 1.0,
            speed: 1.0,
            duration: 0,
            seed: 0,
            level_id: 0,
            owner: 0,
            room_type: RoomType::Lobby,
            state: RoomState::Waiting,
            members: Vec::new(),
            ready: HashSet::new(),
            banned_usernames: HashSet::new(),
        }
    }

    pub fn is_lobby(&self) -> bool {
        self.room_type == RoomType::Lobby
    }

    pub fn is_full(&self) -> bool {
        !self.is_lobby() && self.max_players != 0 && self.members.len() as u32 >= self.max_players
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// All non-lobby members are ready and there's at least one of them.
    pub fn all_ready(&self) -> bool {
        !self.is_lobby()
            && !self.members.is_empty()
            && self.members.iter().all(|m| self.ready.contains(m))
    }

    pub fn is_banned(&self, username: &str) -> bool {
        self.banned_usernames.contains(username)
    }
}
