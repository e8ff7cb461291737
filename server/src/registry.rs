//! Session ownership, pairing, and per-connection event routing
//!
//! The registry is the single writer for all matchmaking and session
//! state. It is a plain injectable struct: the transport hands it a
//! broadcaster and a clock-event sender, tests construct isolated
//! instances with their own channels and timing.

use crate::broadcast::Broadcaster;
use crate::clock::{schedule_match_start, ClockEvent, Ticker};
use crate::matchmaking::MatchQueue;
use crate::session::Session;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ClientId, ServerPacket, SessionId, MATCH_START_DELAY_MS, TICK_RATE};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Owns the matchmaking queue and every live session.
pub struct SessionRegistry {
    queue: MatchQueue,
    sessions: HashMap<SessionId, Session>,
    next_session: SessionId,
    clock: mpsc::UnboundedSender<ClockEvent>,
    broadcaster: Arc<dyn Broadcaster>,
    tick_period: Duration,
    start_delay: Duration,
}

impl SessionRegistry {
    pub fn new(
        clock: mpsc::UnboundedSender<ClockEvent>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self::with_timing(
            clock,
            broadcaster,
            Duration::from_micros(1_000_000 / TICK_RATE as u64),
            Duration::from_millis(MATCH_START_DELAY_MS),
        )
    }

    /// Registry with custom tick period and pairing delay; tests use this
    /// to run with instant or manual timing.
    pub fn with_timing(
        clock: mpsc::UnboundedSender<ClockEvent>,
        broadcaster: Arc<dyn Broadcaster>,
        tick_period: Duration,
        start_delay: Duration,
    ) -> Self {
        SessionRegistry {
            queue: MatchQueue::new(),
            sessions: HashMap::new(),
            next_session: 1,
            clock,
            broadcaster,
            tick_period,
            start_delay,
        }
    }

    /// A fresh connection enters matchmaking. With an opponent already
    /// waiting a session is created on the spot; otherwise the newcomer is
    /// told to wait.
    pub fn handle_connect(&mut self, client: ClientId) {
        self.queue.enqueue(client);

        match self.queue.dequeue_pair() {
            Some((first, second)) => {
                self.create_session(first, second);
            }
            None => {
                self.broadcaster
                    .emit(client, ServerPacket::WaitingForOpponent);
            }
        }
    }

    fn create_session(&mut self, first: ClientId, second: ClientId) -> SessionId {
        let id = self.next_session;
        self.next_session += 1;

        let ticker = Ticker::new(id, self.tick_period, self.clock.clone());
        let session = Session::new(
            id,
            first,
            second,
            StdRng::from_entropy(),
            ticker,
            Arc::clone(&self.broadcaster),
        );

        for participant in session.participants() {
            self.broadcaster.emit(
                participant.client,
                ServerPacket::PlayerAssigned {
                    slot: participant.slot,
                    session_id: id,
                },
            );
        }

        info!(
            "Session {} created for clients {} and {}",
            id, first, second
        );
        self.sessions.insert(id, session);
        schedule_match_start(self.start_delay, id, self.clock.clone());
        id
    }

    /// Applies a paddle command if the handle belongs to an active
    /// session; silently ignored otherwise.
    pub fn route_paddle_move(&mut self, client: ClientId, direction: i8) {
        if let Some(session) = self.find_session_mut(client) {
            session.queue_move(client, direction);
        }
    }

    /// Forwards a restart request to the owning session, which applies its
    /// own preconditions.
    pub fn route_restart(&mut self, client: ClientId) {
        if let Some(session) = self.find_session_mut(client) {
            session.restart(client);
        }
    }

    /// A connection went away: drop it from the queue if it was still
    /// unmatched, or run the session's closing transition, removing the
    /// session once nobody is left in it.
    pub fn route_disconnect(&mut self, client: ClientId) {
        self.queue.remove(client);

        let owning = self
            .sessions
            .iter()
            .find(|(_, session)| session.contains(client))
            .map(|(&id, _)| id);

        if let Some(id) = owning {
            if let Some(session) = self.sessions.get_mut(&id) {
                session.disconnect(client);
            }
            self.remove_if_empty(id);
        }
    }

    /// One simulation step for the session; ticks for sessions that no
    /// longer exist are dropped.
    pub fn handle_tick(&mut self, session: SessionId) {
        if let Some(session) = self.sessions.get_mut(&session) {
            session.tick();
        }
    }

    /// The pairing-announcement delay elapsed for the session.
    pub fn handle_match_start(&mut self, session: SessionId) {
        if let Some(session) = self.sessions.get_mut(&session) {
            session.start();
        }
    }

    pub fn remove_if_empty(&mut self, id: SessionId) {
        let empty = self.sessions.get(&id).map(Session::is_empty);
        if empty == Some(true) {
            self.sessions.remove(&id);
            info!("Session {} removed", id);
        }
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn session_of(&self, client: ClientId) -> Option<&Session> {
        self.sessions.values().find(|s| s.contains(client))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn waiting_count(&self) -> usize {
        self.queue.len()
    }

    // Linear scan over live sessions; fine at the expected scale of
    // dozens. Swap in a handle-to-session index if that ever changes.
    fn find_session_mut(&mut self, client: ClientId) -> Option<&mut Session> {
        self.sessions.values_mut().find(|s| s.contains(client))
    }
}
