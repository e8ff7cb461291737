use serde::{Deserialize, Serialize};
use std::fmt;

pub const FIELD_WIDTH: f32 = 800.0;
pub const FIELD_HEIGHT: f32 = 400.0;
pub const PADDLE_HEIGHT: f32 = 80.0;
pub const PADDLE_THICKNESS: f32 = 10.0;
pub const PADDLE_MARGIN: f32 = 20.0;
pub const BALL_RADIUS: f32 = 8.0;
pub const PADDLE_SPEED: f32 = 5.0;
pub const BALL_SPEED: f32 = 4.0;
pub const BALL_SPIN: f32 = 4.0;
pub const WIN_SCORE: u32 = 5;
pub const TICK_RATE: u32 = 60;
pub const MATCH_START_DELAY_MS: u64 = 1_000;
pub const PROTOCOL_VERSION: u32 = 1;

/// Transport-level connection identifier, assigned by the server.
pub type ClientId = u32;

/// Unique identifier of one matched pair's session.
pub type SessionId = u64;

/// One of the two fixed participant identities of a session.
///
/// `A` is the first-matched connection and owns the left paddle, `B` the
/// second-matched and the right paddle.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    #[serde(rename = "slotA")]
    A,
    #[serde(rename = "slotB")]
    B,
}

impl Slot {
    pub fn opponent(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::A => "slotA",
            Slot::B => "slotB",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ball position and velocity, one simulation step per tick.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

/// Vertical offset of each paddle's top edge.
///
/// Offsets stay within `[0, FIELD_HEIGHT - PADDLE_HEIGHT]`; commands that
/// would leave that range are clamped, not rejected.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Paddles {
    #[serde(rename = "slotA")]
    pub slot_a: f32,
    #[serde(rename = "slotB")]
    pub slot_b: f32,
}

impl Paddles {
    /// Both paddles vertically centered, the serve configuration.
    pub fn centered() -> Self {
        let offset = (FIELD_HEIGHT - PADDLE_HEIGHT) / 2.0;
        Paddles {
            slot_a: offset,
            slot_b: offset,
        }
    }

    pub fn offset(&self, slot: Slot) -> f32 {
        match slot {
            Slot::A => self.slot_a,
            Slot::B => self.slot_b,
        }
    }

    pub fn offset_mut(&mut self, slot: Slot) -> &mut f32 {
        match slot {
            Slot::A => &mut self.slot_a,
            Slot::B => &mut self.slot_b,
        }
    }
}

/// Per-slot point counters, monotone until an explicit restart.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scores {
    #[serde(rename = "slotA")]
    pub slot_a: u32,
    #[serde(rename = "slotB")]
    pub slot_b: u32,
}

impl Scores {
    pub fn get(&self, slot: Slot) -> u32 {
        match slot {
            Slot::A => self.slot_a,
            Slot::B => self.slot_b,
        }
    }

    pub fn get_mut(&mut self, slot: Slot) -> &mut u32 {
        match slot {
            Slot::A => &mut self.slot_a,
            Slot::B => &mut self.slot_b,
        }
    }
}

/// The full authoritative state of one session, broadcast as-is.
///
/// Mutated only by the owning session's tick and by accepted paddle
/// commands. `active` drops to false with `winner` set when a score
/// reaches `WIN_SCORE`, or with `winner` unset when a participant leaves.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GameState {
    pub ball: Ball,
    pub paddles: Paddles,
    pub scores: Scores,
    pub active: bool,
    pub winner: Option<Slot>,
}

/// Packets a client sends to the server.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum ClientPacket {
    Connect { client_version: u32 },
    PaddleMove { direction: i8 },
    RestartGame,
    Heartbeat { timestamp: u64 },
    Disconnect,
}

/// Packets the server sends to a client.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum ServerPacket {
    Connected { client_id: ClientId },
    WaitingForOpponent,
    PlayerAssigned { slot: Slot, session_id: SessionId },
    GameStart,
    GameState { state: GameState },
    PlayerDisconnected,
    Disconnected { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> GameState {
        GameState {
            ball: Ball {
                x: FIELD_WIDTH / 2.0,
                y: FIELD_HEIGHT / 2.0,
                dx: BALL_SPEED,
                dy: -1.5,
            },
            paddles: Paddles::centered(),
            scores: Scores::default(),
            active: true,
            winner: None,
        }
    }

    #[test]
    fn test_slot_opponent() {
        assert_eq!(Slot::A.opponent(), Slot::B);
        assert_eq!(Slot::B.opponent(), Slot::A);
        assert_eq!(Slot::A.opponent().opponent(), Slot::A);
    }

    #[test]
    fn test_slot_display() {
        assert_eq!(Slot::A.to_string(), "slotA");
        assert_eq!(Slot::B.to_string(), "slotB");
    }

    #[test]
    fn test_paddles_centered() {
        let paddles = Paddles::centered();
        assert_eq!(paddles.slot_a, (FIELD_HEIGHT - PADDLE_HEIGHT) / 2.0);
        assert_eq!(paddles.slot_a, paddles.slot_b);
    }

    #[test]
    fn test_paddles_slot_access() {
        let mut paddles = Paddles::centered();
        *paddles.offset_mut(Slot::A) = 10.0;
        *paddles.offset_mut(Slot::B) = 20.0;

        assert_eq!(paddles.offset(Slot::A), 10.0);
        assert_eq!(paddles.offset(Slot::B), 20.0);
    }

    #[test]
    fn test_scores_slot_access() {
        let mut scores = Scores::default();
        assert_eq!(scores.get(Slot::A), 0);
        assert_eq!(scores.get(Slot::B), 0);

        *scores.get_mut(Slot::B) += 1;
        assert_eq!(scores.get(Slot::A), 0);
        assert_eq!(scores.get(Slot::B), 1);
    }

    #[test]
    fn test_game_state_serialization_roundtrip() {
        let state = sample_state();
        let serialized = bincode::serialize(&state).unwrap();
        let deserialized: GameState = bincode::deserialize(&serialized).unwrap();

        assert_eq!(deserialized, state);
    }

    #[test]
    fn test_game_state_with_winner_roundtrip() {
        let mut state = sample_state();
        state.active = false;
        state.winner = Some(Slot::B);
        state.scores.slot_b = WIN_SCORE;

        let serialized = bincode::serialize(&state).unwrap();
        let deserialized: GameState = bincode::deserialize(&serialized).unwrap();

        assert_eq!(deserialized, state);
        assert_eq!(deserialized.winner, Some(Slot::B));
    }

    #[test]
    fn test_client_packet_serialization() {
        let packets = vec![
            ClientPacket::Connect {
                client_version: PROTOCOL_VERSION,
            },
            ClientPacket::PaddleMove { direction: -1 },
            ClientPacket::RestartGame,
            ClientPacket::Heartbeat { timestamp: 123456 },
            ClientPacket::Disconnect,
        ];

        for packet in packets {
            let serialized = bincode::serialize(&packet).unwrap();
            let deserialized: ClientPacket = bincode::deserialize(&serialized).unwrap();

            match (&packet, &deserialized) {
                (
                    ClientPacket::Connect { client_version: a },
                    ClientPacket::Connect { client_version: b },
                ) => assert_eq!(a, b),
                (
                    ClientPacket::PaddleMove { direction: a },
                    ClientPacket::PaddleMove { direction: b },
                ) => assert_eq!(a, b),
                (ClientPacket::RestartGame, ClientPacket::RestartGame) => {}
                (
                    ClientPacket::Heartbeat { timestamp: a },
                    ClientPacket::Heartbeat { timestamp: b },
                ) => assert_eq!(a, b),
                (ClientPacket::Disconnect, ClientPacket::Disconnect) => {}
                _ => panic!("Packet type mismatch after roundtrip"),
            }
        }
    }

    #[test]
    fn test_server_packet_serialization() {
        let packet = ServerPacket::PlayerAssigned {
            slot: Slot::B,
            session_id: 7,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: ServerPacket = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            ServerPacket::PlayerAssigned { slot, session_id } => {
                assert_eq!(slot, Slot::B);
                assert_eq!(session_id, 7);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_snapshot_packet_serialization() {
        let packet = ServerPacket::GameState {
            state: sample_state(),
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: ServerPacket = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            ServerPacket::GameState { state } => assert_eq!(state, sample_state()),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_constants_agree_with_reference() {
        assert_eq!(FIELD_WIDTH, 800.0);
        assert_eq!(FIELD_HEIGHT, 400.0);
        assert_eq!(PADDLE_HEIGHT, 80.0);
        assert_eq!(BALL_RADIUS, 8.0);
        assert_eq!(WIN_SCORE, 5);
        assert_eq!(TICK_RATE, 60);
    }
}
