//! Per-match lifecycle, input buffering, and simulation ownership
//!
//! A session owns one match end to end: the two participant slots, the
//! authoritative [`GameState`], the latest-wins paddle-command buffer, the
//! per-session RNG, and the ticker driving its simulation. All mutation
//! happens through the owning registry's single-writer loop, so no
//! locking is needed here.

use crate::broadcast::Broadcaster;
use crate::clock::Ticker;
use crate::physics::{self, PaddleCommands};
use log::info;
use rand::rngs::StdRng;
use shared::{ClientId, GameState, ServerPacket, SessionId, Slot};
use std::sync::Arc;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Both slots assigned, waiting out the pairing-announcement delay.
    Waiting,
    /// Simulation ticking.
    Active,
    /// A winner exists; the simulation is stopped but may be restarted.
    Ended,
    /// A participant left; the session lives only until the other does.
    Closed,
}

/// One participant of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participant {
    pub client: ClientId,
    pub slot: Slot,
}

/// One matched pair's full game lifecycle from pairing to closure.
pub struct Session {
    id: SessionId,
    phase: Phase,
    participants: Vec<Participant>,
    state: GameState,
    commands: PaddleCommands,
    rng: StdRng,
    ticker: Ticker,
    broadcaster: Arc<dyn Broadcaster>,
}

impl Session {
    /// The first-matched connection takes slot A and the left paddle.
    pub fn new(
        id: SessionId,
        first: ClientId,
        second: ClientId,
        mut rng: StdRng,
        ticker: Ticker,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        let state = physics::serve(&mut rng);

        Session {
            id,
            phase: Phase::Waiting,
            participants: vec![
                Participant {
                    client: first,
                    slot: Slot::A,
                },
                Participant {
                    client: second,
                    slot: Slot::B,
                },
            ],
            state,
            commands: PaddleCommands::default(),
            rng,
            ticker,
            broadcaster,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn contains(&self, client: ClientId) -> bool {
        self.participants.iter().any(|p| p.client == client)
    }

    pub fn slot_of(&self, client: ClientId) -> Option<Slot> {
        self.participants
            .iter()
            .find(|p| p.client == client)
            .map(|p| p.slot)
    }

    /// `Waiting -> Active` once the pairing-announcement delay elapsed.
    ///
    /// Ignored outside `Waiting`, since the delay can outlive a session whose
    /// participant disconnected before the match ever began.
    pub fn start(&mut self) {
        if self.phase != Phase::Waiting || self.participants.len() != 2 {
            return;
        }

        self.phase = Phase::Active;
        info!("Session {} started", self.id);
        self.emit_to_all(ServerPacket::GameStart);
        self.ticker.start();
    }

    /// Buffers a paddle command for the participant's slot; the latest
    /// command per paddle wins at the next tick boundary. Ignored unless
    /// the session is active and the sender is a participant.
    pub fn queue_move(&mut self, client: ClientId, direction: i8) {
        if self.phase != Phase::Active {
            return;
        }

        if let Some(slot) = self.slot_of(client) {
            self.commands.set(slot, direction);
        }
    }

    /// Advances exactly one simulation step and broadcasts the snapshot.
    ///
    /// A tick arriving for a non-active session (in flight while the
    /// ticker was stopping) is dropped.
    pub fn tick(&mut self) {
        if self.phase != Phase::Active {
            return;
        }

        let commands = self.commands;
        self.commands.clear();
        physics::advance(&mut self.state, &commands, &mut self.rng);
        self.broadcast_state();

        if let (false, Some(winner)) = (self.state.active, self.state.winner) {
            info!("Session {} won by {}", self.id, winner);
            self.phase = Phase::Ended;
            self.ticker.stop();
        }
    }

    /// `Ended -> Active` with a fresh serve-configuration state.
    ///
    /// Accepted only from a participant, only while ended with a winner
    /// recorded, and only while both participants remain; everything else
    /// is a silent no-op (a lone survivor goes back through matchmaking,
    /// not through restart).
    pub fn restart(&mut self, client: ClientId) {
        if self.phase != Phase::Ended || self.participants.len() != 2 {
            return;
        }

        if !self.contains(client) {
            return;
        }

        self.state = physics::serve(&mut self.rng);
        self.commands.clear();
        self.phase = Phase::Active;
        info!("Session {} restarted", self.id);
        self.broadcast_state();
        self.ticker.start();
    }

    /// Removes a departing participant: the simulation stops, the state is
    /// marked inactive, and the survivor (if any) is notified.
    pub fn disconnect(&mut self, client: ClientId) {
        let Some(position) = self.participants.iter().position(|p| p.client == client) else {
            return;
        };

        let departed = self.participants.remove(position);
        info!(
            "Client {} ({}) left session {}",
            departed.client, departed.slot, self.id
        );

        self.state.active = false;
        self.ticker.stop();
        self.phase = Phase::Closed;

        self.emit_to_all(ServerPacket::PlayerDisconnected);
    }

    fn broadcast_state(&self) {
        self.emit_to_all(ServerPacket::GameState { state: self.state });
    }

    fn emit_to_all(&self, packet: ServerPacket) {
        for participant in &self.participants {
            self.broadcaster.emit(participant.client, packet.clone());
        }
    }
}
