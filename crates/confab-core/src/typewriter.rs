//! The single-slot typewriter metronome.
//!
//! Playback reveals an already-known answer one character per fixed
//! interval, for display effect only. The reveal itself lives in the
//! reducer (`PlaybackTick`); this module owns the timer: one cancellable
//! tokio task per playback slot, guarded by a `CancellationToken`. Starting
//! a new playback supersedes the previous one, and a session reset cancels
//! the slot so no timer keeps firing into a cleared list.

use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;

use std::time::Duration;

use crate::session::SessionEvent;

/// Owner of the one playback timer slot.
#[derive(Debug)]
pub struct Typewriter {
    interval: Duration,
    slot: Option<CancellationToken>,
}

impl Typewriter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            slot: None,
        }
    }

    /// Start ticking into `events`. An active playback is superseded: its
    /// token is cancelled before the new timer task is spawned.
    pub fn start(&mut self, events: mpsc::Sender<SessionEvent>) {
        self.cancel();
        let token = CancellationToken::new();
        let guard = token.clone();
        let period = self.interval;
        self.slot = Some(token);

        tokio::spawn(async move {
            // First reveal lands one interval after start, matching a
            // plain repeating timer.
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    _ = guard.cancelled() => break,
                    _ = ticker.tick() => {
                        if events.send(SessionEvent::PlaybackTick).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Cancel the active playback, if any. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(token) = self.slot.take() {
            token.cancel();
        }
    }

    /// Whether a playback timer currently occupies the slot.
    pub fn is_active(&self) -> bool {
        self.slot.is_some()
    }
}

impl Drop for Typewriter {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    const TICK: Duration = Duration::from_millis(20);

    #[tokio::test(start_paused = true)]
    async fn ticks_arrive_at_the_configured_interval() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut tw = Typewriter::new(TICK);
        tw.start(tx);
        assert!(tw.is_active());

        for _ in 0..3 {
            advance(TICK).await;
            let event = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
            assert!(matches!(event, Some(SessionEvent::PlaybackTick)));
        }
        tw.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_timer() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut tw = Typewriter::new(TICK);
        tw.start(tx);
        advance(TICK).await;
        assert!(rx.recv().await.is_some());

        tw.cancel();
        assert!(!tw.is_active());
        advance(TICK * 10).await;
        // The task exits on cancellation; its sender drops and the channel
        // drains to a close with no further ticks.
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_supersedes_previous_playback() {
        let (tx1, mut rx1) = mpsc::channel(16);
        let (tx2, mut rx2) = mpsc::channel(16);
        let mut tw = Typewriter::new(TICK);

        tw.start(tx1);
        tw.start(tx2);
        advance(TICK).await;
        tokio::task::yield_now().await;

        // Only the second playback's channel receives ticks.
        assert!(rx2.recv().await.is_some());
        assert!(rx1.try_recv().is_err());
        tw.cancel();
    }
}
