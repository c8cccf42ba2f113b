use std::collections::{BTreeMap, HashMap, HashSet};

use super::{ConnId, Connection, RoomId, UserId};

/// Outcome of inserting a member.
#[derive(Debug)]
pub struct Joined {
    pub count: usize,
    /// The connection previously registered under the same user id, if any.
    pub displaced: Option<Connection>,
}

/// Outcome of removing a connection that was a member somewhere.
#[derive(Debug, PartialEq, Eq)]
pub struct Left {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub count: usize,
}

/// Per-room `user id -> connection` maps, the set of live connections, and
/// an index from connection to its membership.
#[derive(Debug, Default)]
pub struct Membership {
    rooms: HashMap<RoomId, BTreeMap<UserId, Connection>>,
    live: HashSet<ConnId>,
    index: HashMap<ConnId, (RoomId, UserId)>,
}

impl Membership {
    pub fn open_room(&mut self, room_id: RoomId) {
        self.rooms.entry(room_id).or_default();
    }

    /// Drops the room's (empty) member map. Returns `false` and keeps it if
    /// anyone is still in it.
    pub fn close_room(&mut self, room_id: &str) -> bool {
        if self.count(room_id) > 0 {
            return false;
        }
        self.rooms.remove(room_id);
        true
    }

    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Last writer wins on a repeated user id.
    pub fn insert(&mut self, room_id: &str, user_id: UserId, conn: Connection) -> Option<Joined> {
        let members = self.rooms.get_mut(room_id)?;

        let id = conn.id();
        self.live.insert(id);
        self.index.insert(id, (room_id.to_owned(), user_id.clone()));

        let mut displaced = members.insert(user_id, conn);
        if let Some(old) = &displaced {
            if old.id() == id {
                displaced = None;
            } else {
                self.index.remove(&old.id());
            }
        }

        Some(Joined { count: members.len(), displaced })
    }

    /// Forgets `conn` entirely. `None` when it held no membership, e.g. it was
    /// displaced by a newer connection for the same user.
    pub fn remove(&mut self, conn: ConnId) -> Option<Left> {
        self.live.remove(&conn);

        let (room_id, user_id) = self.index.remove(&conn)?;
        let members = self.rooms.get_mut(&room_id)?;
        if members.get(&user_id).is_none_or(|current| current.id() != conn) {
            return None;
        }
        members.remove(&user_id);

        Some(Left { count: members.len(), room_id, user_id })
    }

    pub fn count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, BTreeMap::len)
    }

    pub fn users(&self, room_id: &str) -> Option<Vec<UserId>> {
        self.rooms.get(room_id).map(|members| members.keys().cloned().collect())
    }

    /// Snapshot of the room's connections, to send to after the lock is released.
    pub fn recipients(&self, room_id: &str) -> Vec<Connection> {
        self.rooms
            .get(room_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_of(&self, conn: ConnId) -> Option<&RoomId> {
        self.index.get(&conn).map(|(room_id, _)| room_id)
    }

    pub fn is_live(&self, conn: ConnId) -> bool {
        self.live.contains(&conn)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
