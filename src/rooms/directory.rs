use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::error::{RoomError, RoomResult};

use super::RoomId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDetails {
    pub name: String,
    /// Empty means the room is open.
    pub password: String,
    pub is_private: bool,
}

impl RoomDetails {
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Join rule: an open room accepts any password.
    pub fn admits(&self, password: &str) -> bool {
        !self.has_password() || self.password == password
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub has_password: bool,
    pub is_private: bool,
    pub user_count: usize,
}

/// Room metadata keyed by id. Names are unique among existing rooms.
#[derive(Debug, Default)]
pub struct Directory {
    rooms: BTreeMap<RoomId, RoomDetails>,
    created: u64,
}

impl Directory {
    pub fn insert(&mut self, details: RoomDetails) -> RoomResult<RoomId> {
        if self.rooms.values().any(|room| room.name == details.name) {
            return Err(RoomError::DuplicateName(details.name));
        }

        self.created += 1;
        let id = if details.is_private {
            private_room_id(&details.name, OffsetDateTime::now_utc().unix_timestamp_nanos())
        } else {
            self.created.to_string()
        };

        self.rooms.insert(id.clone(), details);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<&RoomDetails> {
        self.rooms.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<RoomDetails> {
        self.rooms.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RoomId, &RoomDetails)> {
        self.rooms.iter()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }
}

/// First 8 hex chars of sha256(name ++ timestamp). Collisions are not checked.
pub fn private_room_id(name: &str, timestamp_nanos: i128) -> RoomId {
    let digest = Sha256::digest(format!("{name}{timestamp_nanos}").as_bytes());
    hex::encode(digest)[..8].to_owned()
}
