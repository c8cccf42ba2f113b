use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior},
};

use super::{Connection, RoomId, UserId, broadcast::fan_out, manager::Shared};

/// Room-wide membership notifications, as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    NewPeer {
        #[serde(rename = "peerId")]
        peer_id: UserId,
    },
    PeerLeft {
        #[serde(rename = "peerId")]
        peer_id: UserId,
    },
    UserCount { user_count: usize },
}

impl Notification {
    pub fn to_payload(&self) -> serde_json::Result<Arc<str>> {
        Ok(serde_json::to_string(self)?.into())
    }
}

fn announce(room_id: &str, recipients: &[Connection], notification: &Notification) {
    match notification.to_payload() {
        Ok(payload) => {
            fan_out(room_id, recipients, &payload);
        }
        Err(err) => log::warn!("failed to serialize {notification:?}: {err}"),
    }
}

/// A membership change, queued in the order the registry applied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    Joined { user_id: UserId, count: usize },
    Left { user_id: UserId, count: usize },
}

impl PresenceEvent {
    fn notifications(self) -> [Notification; 2] {
        match self {
            PresenceEvent::Joined { user_id, count } => [
                Notification::NewPeer { peer_id: user_id },
                Notification::UserCount { user_count: count },
            ],
            PresenceEvent::Left { user_id, count } => [
                Notification::PeerLeft { peer_id: user_id },
                Notification::UserCount { user_count: count },
            ],
        }
    }
}

pub type PresenceSender = mpsc::UnboundedSender<PresenceEvent>;

/// Longest gap between periodic `user_count` sends; longer periods are cut
/// to this so tick deadlines stay representable.
pub const MAX_USER_COUNT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Spawns the room's announcer. It drains membership events in order and,
/// every `period`, sends the current `user_count` while the room has
/// members. It stops once the sender is dropped (the room was deleted) or
/// the manager is gone.
pub(super) fn spawn(room_id: RoomId, period: Duration, shared: Weak<Shared>) -> PresenceSender {
    let (tx, mut events) = mpsc::unbounded_channel::<PresenceEvent>();

    let period = period.min(MAX_USER_COUNT_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(event) => Some(event),
                    None => break,
                },
                _ = ticker.tick() => None,
            };

            let Some(shared) = shared.upgrade() else {
                break;
            };
            let Some(recipients) = shared.recipients(&room_id).await else {
                break;
            };
            drop(shared);

            match event {
                Some(event) => {
                    for notification in event.notifications() {
                        announce(&room_id, &recipients, &notification);
                    }
                }
                None if !recipients.is_empty() => {
                    let count = Notification::UserCount { user_count: recipients.len() };
                    announce(&room_id, &recipients, &count);
                }
                None => {}
            }
        }

        log::debug!("presence for room {room_id} stopped");
    });

    tx
}
