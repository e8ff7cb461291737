//! # Paddle Rally Server
//!
//! Authoritative core of a real-time two-player paddle-and-ball game.
//! Anonymous connections are paired into sessions, each session runs a
//! deterministic fixed-timestep simulation, and every tick's state is
//! streamed back to both participants so their renderers stay in sync.
//!
//! ## Architecture
//!
//! All game state is mutated from a single place: the select loop in
//! [`network::Server::run`]. Network tasks, the timeout sweeper, and the
//! per-session tickers only ever *send events into* that loop, which makes
//! the concurrency story trivial: there is no lock around matchmaking or
//! session state at all, only around the connection table that the socket
//! sender task reads addresses from.
//!
//! The flow of a match:
//!
//! 1. A connection arrives and enters the [`matchmaking::MatchQueue`].
//! 2. When two are waiting, the [`registry::SessionRegistry`] pairs the
//!    two oldest into a [`session::Session`], announces the slot
//!    assignments, and schedules the match start one second out.
//! 3. The session's [`clock::Ticker`] then drives [`physics::advance`] at
//!    the fixed tick rate; each tick's snapshot goes out through the
//!    [`broadcast::Broadcaster`] seam.
//! 4. Scoring, win detection, restarts, and disconnects are all state
//!    machine transitions on the session; the registry garbage-collects a
//!    session once both participants are gone.
//!
//! ## Module Organization
//!
//! - [`physics`] - pure ball/paddle simulation, one call per tick
//! - [`session`] - per-match lifecycle state machine and input buffering
//! - [`matchmaking`] - FIFO pairing queue
//! - [`registry`] - session ownership, routing, and garbage collection
//! - [`clock`] - start/stoppable fixed-rate tick driver per session
//! - [`broadcast`] - fire-and-forget delivery seam to the transport
//! - [`connection`] - transport handle bookkeeping and liveness
//! - [`network`] - UDP framing, helper tasks, and the core loop
//!
//! ## Design Properties
//!
//! The simulation is deterministic given a session's RNG seed, ticks are
//! never replayed to catch up after a stall, ticker stop is idempotent
//! (win and disconnect can race to it safely), and every ill-timed or
//! misaddressed event is silently dropped rather than surfaced, so a stray
//! packet from a closing connection can never crash or desync a match.

pub mod broadcast;
pub mod clock;
pub mod connection;
pub mod matchmaking;
pub mod network;
pub mod physics;
pub mod registry;
pub mod session;
