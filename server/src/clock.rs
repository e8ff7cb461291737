//! Tick scheduling for active sessions
//!
//! Sessions never touch a timer primitive directly; they hold a [`Ticker`]
//! that can be started, stopped, and queried. A running ticker is a spawned
//! interval task emitting [`ClockEvent::Tick`] onto the core loop's channel,
//! so all state mutation stays on the single-writer path.

use log::debug;
use shared::SessionId;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Timing events delivered to the core loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// One fixed-rate simulation step for the session.
    Tick(SessionId),
    /// The pairing-announcement delay elapsed; the match may begin.
    MatchStart(SessionId),
}

/// Fixed-rate tick driver for a single session.
///
/// Missed ticks are skipped rather than replayed: each delivered tick
/// advances exactly one logical step, and a delayed timer never produces a
/// burst of catch-up steps. `start` and `stop` are both idempotent: the
/// win-condition path and the disconnect path can race to stop the same
/// ticker without harm.
pub struct Ticker {
    session: SessionId,
    period: Duration,
    events: mpsc::UnboundedSender<ClockEvent>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new(
        session: SessionId,
        period: Duration,
        events: mpsc::UnboundedSender<ClockEvent>,
    ) -> Self {
        Ticker {
            session,
            period,
            events,
            handle: None,
        }
    }

    /// Spawns the interval task. A no-op if the ticker is already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        let session = self.session;
        let period = self.period;
        let events = self.events.clone();

        self.handle = Some(tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval fires immediately
            timer.tick().await;

            loop {
                timer.tick().await;
                if events.send(ClockEvent::Tick(session)).is_err() {
                    // Core loop is gone; nothing left to drive.
                    break;
                }
            }
        }));

        debug!("Ticker started for session {}", self.session);
    }

    /// Aborts the interval task. Safe to call when already stopped or
    /// never started.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Ticker stopped for session {}", self.session);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One-shot timer covering the delay between the pairing announcement and
/// the actual match start.
pub fn schedule_match_start(
    delay: Duration,
    session: SessionId,
    events: mpsc::UnboundedSender<ClockEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep(delay).await;
        let _ = events.send(ClockEvent::MatchStart(session));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_ticker_emits_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = Ticker::new(7, Duration::from_millis(1), tx);

        ticker.start();
        assert!(ticker.is_running());

        for _ in 0..3 {
            let event = timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("tick should arrive")
                .expect("channel open");
            assert_eq!(event, ClockEvent::Tick(7));
        }

        ticker.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut ticker = Ticker::new(1, Duration::from_millis(1), tx);

        // Stop before ever starting.
        ticker.stop();
        assert!(!ticker.is_running());

        ticker.start();
        assert!(ticker.is_running());

        ticker.stop();
        ticker.stop();
        assert!(!ticker.is_running());
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = Ticker::new(2, Duration::from_millis(50), tx);

        ticker.start();
        ticker.start();
        assert!(ticker.is_running());

        // A second start must not double the tick rate: within ~70ms of a
        // 50ms period only one tick can have fired.
        sleep(Duration::from_millis(70)).await;
        ticker.stop();

        let mut ticks = 0;
        while rx.try_recv().is_ok() {
            ticks += 1;
        }
        assert!(ticks <= 2, "unexpected tick count {}", ticks);
    }

    #[tokio::test]
    async fn test_stopped_ticker_emits_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = Ticker::new(3, Duration::from_millis(1), tx);

        ticker.start();
        let _ = timeout(Duration::from_secs(1), rx.recv()).await;
        ticker.stop();

        // Drain anything in flight, then confirm silence.
        while rx.try_recv().is_ok() {}
        sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_match_start_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        schedule_match_start(Duration::from_millis(5), 9, tx);

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("start event should arrive")
            .expect("channel open");
        assert_eq!(event, ClockEvent::MatchStart(9));

        // One-shot: the channel closes once the task exits.
        assert!(timeout(Duration::from_millis(50), rx.recv())
            .await
            .expect("sender dropped")
            .is_none());
    }
}
