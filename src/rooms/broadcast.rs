use std::sync::Arc;

use super::Connection;

/// Sends `payload` to every recipient. A failed recipient is logged and
/// skipped; it stays a member until its own read loop notices. Returns how
/// many sends succeeded.
pub fn fan_out(room_id: &str, recipients: &[Connection], payload: &Arc<str>) -> usize {
    let mut delivered = 0;
    for conn in recipients {
        match conn.send(payload.clone()) {
            Ok(()) => delivered += 1,
            Err(err) => log::warn!("room {room_id}: {err}"),
        }
    }
    delivered
}
