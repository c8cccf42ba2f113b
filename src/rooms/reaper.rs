use std::{collections::HashMap, future::Future, time::Duration};

use tokio::task::JoinHandle;

use super::RoomId;

struct IdleTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// At most one armed deletion timer per room.
///
/// Each armed timer carries a generation. The firing task passes it back to
/// [`IdleTimers::disarm_fired`], which only succeeds if that exact timer is
/// still the armed one, so a timer that was cancelled or replaced while it
/// was firing does nothing.
#[derive(Default)]
pub struct IdleTimers {
    timers: HashMap<RoomId, IdleTimer>,
    next_generation: u64,
}

impl IdleTimers {
    /// Arms (or re-arms) the timer for `room_id`. `fire` receives the
    /// generation and runs after `delay`.
    pub fn arm<F, Fut>(&mut self, room_id: RoomId, delay: Duration, fire: F)
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.next_generation += 1;
        let generation = self.next_generation;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(generation).await;
        });

        if let Some(previous) = self.timers.insert(room_id, IdleTimer { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Cancels a pending timer. No-op if none is armed.
    pub fn cancel(&mut self, room_id: &str) -> bool {
        match self.timers.remove(room_id) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Called from a firing timer: removes the entry if `generation` is still
    /// the armed one.
    pub fn disarm_fired(&mut self, room_id: &str, generation: u64) -> bool {
        if self.timers.get(room_id).is_some_and(|timer| timer.generation == generation) {
            self.timers.remove(room_id);
            return true;
        }
        false
    }

    pub fn is_armed(&self, room_id: &str) -> bool {
        self.timers.contains_key(room_id)
    }
}

impl Drop for IdleTimers {
    fn drop(&mut self) {
        for timer in self.timers.values() {
            timer.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, atomic::{AtomicU64, Ordering}};

    use pretty_assertions::assert_eq;

    use super::*;

    const DELAY: Duration = Duration::from_secs(10);

    #[test_log::test(tokio::test(start_paused = true))]
    async fn fires_once_after_delay() {
        let fired = Arc::new(AtomicU64::new(0));
        let mut timers = IdleTimers::default();

        let seen = fired.clone();
        timers.arm("1".into(), DELAY, move |generation| async move {
            seen.store(generation, Ordering::SeqCst);
        });

        tokio::time::sleep(DELAY / 2).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(DELAY).await;
        let generation = fired.load(Ordering::SeqCst);
        assert!(generation > 0);
        assert!(timers.disarm_fired("1", generation));
        assert!(!timers.is_armed("1"));
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn cancel_prevents_firing() {
        let fired = Arc::new(AtomicU64::new(0));
        let mut timers = IdleTimers::default();

        let seen = fired.clone();
        timers.arm("1".into(), DELAY, move |generation| async move {
            seen.store(generation, Ordering::SeqCst);
        });
        assert!(timers.cancel("1"));
        assert!(!timers.cancel("1"));

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn stale_generation_is_ignored() {
        let mut timers = IdleTimers::default();
        timers.arm("1".into(), DELAY, |_| async {});
        timers.arm("1".into(), DELAY, |_| async {});

        assert!(!timers.disarm_fired("1", 1));
        assert!(timers.is_armed("1"));
        assert!(timers.disarm_fired("1", 2));
        assert!(!timers.disarm_fired("1", 2));
    }
}
