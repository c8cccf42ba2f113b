use std::{collections::HashMap, sync::Arc, time::Duration};

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::{RoomError, RoomResult};

use super::{
    Connection, RoomId, UserId,
    broadcast::fan_out,
    directory::{Directory, RoomDetails, RoomSummary},
    membership::Membership,
    presence::{self, PresenceEvent, PresenceSender},
    reaper::IdleTimers,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerConfig {
    /// How long an empty room survives before it is deleted.
    pub idle_grace: Duration,
    /// Period of the `user_count` announcement.
    pub user_count_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            idle_grace: Duration::from_secs(5 * 60),
            user_count_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedRoom {
    pub id: RoomId,
    pub name: String,
    pub is_private: bool,
}

#[derive(Default)]
struct Registry {
    directory: Directory,
    members: Membership,
    timers: IdleTimers,
    presence: HashMap<RoomId, PresenceSender>,
}

impl Registry {
    fn announce(&self, room_id: &str, event: PresenceEvent) {
        if let Some(tx) = self.presence.get(room_id) {
            let _ = tx.send(event);
        }
    }

    fn delete_if_idle(&mut self, room_id: &str) -> bool {
        if !self.directory.contains(room_id) || !self.members.close_room(room_id) {
            return false;
        }

        self.directory.remove(room_id);
        self.timers.cancel(room_id);
        self.presence.remove(room_id);
        true
    }
}

pub(super) struct Shared {
    config: ManagerConfig,
    registry: Mutex<Registry>,
}

impl Shared {
    /// `None` once the room no longer exists.
    pub(super) async fn recipients(&self, room_id: &str) -> Option<Vec<Connection>> {
        let registry = self.registry.lock().await;
        registry
            .members
            .has_room(room_id)
            .then(|| registry.members.recipients(room_id))
    }

    async fn reap(&self, room_id: &str, generation: u64) {
        let mut registry = self.registry.lock().await;
        if !registry.timers.disarm_fired(room_id, generation) {
            return;
        }

        if registry.delete_if_idle(room_id) {
            log::info!("room {room_id} deleted due to inactivity");
        } else {
            log::debug!("room {room_id} is occupied again, not deleting");
        }
    }
}

/// Registry of rooms and their live connections, behind one lock.
///
/// Cheap to clone; every clone talks to the same registry.
#[derive(Clone)]
pub struct RoomManager {
    shared: Arc<Shared>,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl RoomManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    /// Fails with `DuplicateName` if any existing room already uses `name`.
    /// An empty password means the room is open.
    pub async fn create_room(
        &self,
        name: String,
        password: String,
        is_private: bool,
    ) -> RoomResult<CreatedRoom> {
        let mut registry = self.shared.registry.lock().await;

        let id = registry.directory.insert(RoomDetails {
            name: name.clone(),
            password,
            is_private,
        })?;
        registry.members.open_room(id.clone());

        let presence = presence::spawn(
            id.clone(),
            self.shared.config.user_count_interval,
            Arc::downgrade(&self.shared),
        );
        registry.presence.insert(id.clone(), presence);

        log::info!("created room {id} ({name:?}, private: {is_private})");
        Ok(CreatedRoom { id, name, is_private })
    }

    pub async fn room(&self, room_id: &str) -> RoomResult<RoomDetails> {
        let registry = self.shared.registry.lock().await;
        registry
            .directory
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_owned()))
    }

    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let registry = self.shared.registry.lock().await;
        registry
            .directory
            .iter()
            .map(|(id, details)| RoomSummary {
                id: id.clone(),
                name: details.name.clone(),
                has_password: details.has_password(),
                is_private: details.is_private,
                user_count: registry.members.count(id),
            })
            .collect()
    }

    pub async fn users(&self, room_id: &str) -> RoomResult<Vec<UserId>> {
        let registry = self.shared.registry.lock().await;
        registry
            .members
            .users(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_owned()))
    }

    /// Exact comparison: a room without a password only accepts an empty one here.
    pub async fn check_password(&self, room_id: &str, password: &str) -> RoomResult<()> {
        let details = self.room(room_id).await?;
        if details.password != password {
            return Err(RoomError::InvalidPassword);
        }
        Ok(())
    }

    /// Registers `conn` as `user_id` in the room. Nothing changes on error.
    ///
    /// A connection already registered under the same user id is replaced
    /// and closed.
    pub async fn join(
        &self,
        room_id: &str,
        user_id: UserId,
        conn: Connection,
        password: &str,
    ) -> RoomResult<()> {
        let mut registry = self.shared.registry.lock().await;

        let details = registry
            .directory
            .get(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_owned()))?;
        if !details.admits(password) {
            log::info!("rejected {user_id} from room {room_id}: invalid password");
            return Err(RoomError::InvalidPassword);
        }

        let conn_id = conn.id();
        let joined = registry
            .members
            .insert(room_id, user_id.clone(), conn)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_owned()))?;

        if let Some(displaced) = joined.displaced {
            log::info!("{user_id} rejoined room {room_id}, closing connection {}", displaced.id());
            displaced.close();
        }
        if registry.timers.cancel(room_id) {
            log::debug!("room {room_id} is occupied again, deletion cancelled");
        }

        log::info!("{user_id} joined room {room_id} on {conn_id} ({} members)", joined.count);
        registry.announce(room_id, PresenceEvent::Joined { user_id, count: joined.count });
        Ok(())
    }

    /// Forgets `conn` and closes it. Safe to call more than once.
    pub async fn leave(&self, conn: &Connection) {
        {
            let mut registry = self.shared.registry.lock().await;

            if let Some(left) = registry.members.remove(conn.id()) {
                log::info!("{} left room {} ({} members)", left.user_id, left.room_id, left.count);

                if left.count == 0 {
                    let shared = Arc::downgrade(&self.shared);
                    let room_id = left.room_id.clone();
                    registry.timers.arm(
                        left.room_id.clone(),
                        self.shared.config.idle_grace,
                        move |generation| async move {
                            if let Some(shared) = shared.upgrade() {
                                shared.reap(&room_id, generation).await;
                            }
                        },
                    );
                }

                registry.announce(
                    &left.room_id,
                    PresenceEvent::Left { user_id: left.user_id, count: left.count },
                );
            }
        }

        conn.close();
    }

    /// Sends `payload` to every member of the room. Returns how many
    /// connections it was handed to.
    pub async fn broadcast(&self, room_id: &str, payload: Arc<str>) -> usize {
        let recipients = {
            let registry = self.shared.registry.lock().await;
            registry.members.recipients(room_id)
        };
        fan_out(room_id, &recipients, &payload)
    }

    /// Relays one inbound frame from `conn` to its room, verbatim. Frames
    /// that are not a JSON object, or that come from a connection with no
    /// membership, are dropped. The `type` tag is only logged; every type
    /// is relayed the same way.
    pub async fn relay(&self, conn: &Connection, frame: &[u8]) -> usize {
        let message = match serde_json::from_slice::<Map<String, Value>>(frame) {
            Ok(message) => message,
            Err(err) => {
                log::debug!("invalid JSON from {}: {err}", conn.id());
                return 0;
            }
        };
        let Ok(text) = std::str::from_utf8(frame) else {
            return 0;
        };

        let room_id = {
            let registry = self.shared.registry.lock().await;
            match registry.members.room_of(conn.id()) {
                Some(room_id) => room_id.clone(),
                None => return 0,
            }
        };

        log::trace!("relaying {:?} message in room {room_id}", message.get("type"));
        self.broadcast(&room_id, text.into()).await
    }

    /// Deletes the room if nobody is in it. Returns whether it was deleted.
    pub async fn delete_room(&self, room_id: &str) -> bool {
        let deleted = self.shared.registry.lock().await.delete_if_idle(room_id);
        if deleted {
            log::info!("room {room_id} deleted");
        }
        deleted
    }

    pub async fn room_count(&self) -> usize {
        self.shared.registry.lock().await.directory.len()
    }

    pub async fn user_count(&self, room_id: &str) -> usize {
        self.shared.registry.lock().await.members.count(room_id)
    }

    /// Connections currently holding a room membership, across all rooms.
    pub async fn live_connections(&self) -> usize {
        self.shared.registry.lock().await.members.live_count()
    }

    pub async fn is_live(&self, conn: &Connection) -> bool {
        self.shared.registry.lock().await.members.is_live(conn.id())
    }

    pub async fn deletion_pending(&self, room_id: &str) -> bool {
        self.shared.registry.lock().await.timers.is_armed(room_id)
    }
}
