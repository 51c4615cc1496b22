use hashbrown::HashMap;
use rt_net::SessionId;
use std::sync::Mutex;

/// Server-side record for one connected client. `room_id == 0` means "no room"; `entity_id == 0`
/// means "no avatar spawned yet".
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub username: Option<String>,
    pub logged_in: bool,
    pub room_id: u32,
    pub ready: bool,
    pub entity_id: u32,
    pub input_mask: u8,
    pub position: (f32, f32),
    pub velocity: (f32, f32),
}

impl Session {
    pub fn new(id: SessionId) -> Session {
        Session {
            id,
            username: None,
            logged_in: false,
            room_id: 0,
            ready: false,
            entity_id: 0,
            input_mask: 0,
            position: (0.0, 0.0),
            velocity: (0.0, 0.0),
        }
    }

    pub fn in_room(&self) -> bool {
        self.room_id != 0
    }
}

/// The session table, guarded by one mutex. Critical sections here are always a map lookup plus
/// a small field mutation, and never nest with the room table's lock.
#[derive(Default)]
pub struct SessionTable {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionTable {
    pub fn new() -> SessionTable {
        SessionTable::default()
    }

    pub fn insert(&self, id: SessionId) {
        self.sessions.lock().unwrap().insert(id, Session::new(id));
    }

    pub fn remove(&self, id: SessionId) -> Option<Session> {
        self.sessions.lock().unwrap().remove(&id)
    }

    pub fn with<R>(&self, id: SessionId, f: impl FnOnce(&Session) -> R) -> Option<R> {
        self.sessions.lock().unwrap().get(&id).map(f)
    }

    pub fn with_mut<R>(&self, id: SessionId, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.sessions.lock().unwrap().get_mut(&id).map(f)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().unwrap().contains_key(&id)
    }

    pub fn snapshot(&self) -> Vec<Session> {
        self.sessions.lock().unwrap().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_mutate_round_trip() {
        let table = SessionTable::new();
        table.insert(1);

        table.with_mut(1, |s| {
            s.username = Some("bob".into());
            s.logged_in = true;
        });

        let username = table.with(1, |s| s.username.clone()).flatten();
        assert_eq!(username, Some("bob".to_string()));
    }

    #[test]
    fn remove_drops_the_record() {
        let table = SessionTable::new();
        table.insert(2);
        assert!(table.contains(2));
        table.remove(2);
        assert!(!table.contains(2));
    }
}
