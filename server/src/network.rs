//! UDP transport layer and the single-writer core loop
//!
//! Packets are bincode-framed datagrams. A receiver task turns datagrams
//! into [`ServerMessage`]s, a sender task drains the broadcast channel and
//! resolves client ids back to addresses, and a timeout sweeper expires
//! silent connections. All core mutation (matchmaking, sessions, physics)
//! happens on the `run` loop, which is the sole writer.

use crate::broadcast::{Broadcaster, ChannelBroadcaster};
use crate::clock::ClockEvent;
use crate::connection::ConnectionTable;
use crate::registry::SessionRegistry;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{ClientId, ClientPacket, ServerPacket, MATCH_START_DELAY_MS, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from network tasks to the core loop.
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: ClientPacket,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: ClientId,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Converts a tick rate in Hz to the fixed tick period.
pub fn tick_period(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / tick_rate.max(1) as u64)
}

/// Main server coordinating networking, matchmaking, and simulation.
pub struct Server {
    socket: Arc<UdpSocket>,
    connections: Arc<RwLock<ConnectionTable>>,
    registry: SessionRegistry,
    broadcaster: ChannelBroadcaster,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    clock_rx: mpsc::UnboundedReceiver<ClockEvent>,
    outbound_rx: Option<mpsc::UnboundedReceiver<(ClientId, ServerPacket)>>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_rate: u32,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (clock_tx, clock_rx) = mpsc::unbounded_channel();
        let (broadcaster, outbound_rx) = ChannelBroadcaster::new();

        let registry = SessionRegistry::with_timing(
            clock_tx,
            Arc::new(broadcaster.clone()),
            tick_period(tick_rate),
            Duration::from_millis(MATCH_START_DELAY_MS),
        );

        Ok(Server {
            socket,
            connections: Arc::new(RwLock::new(ConnectionTable::new(max_clients))),
            registry,
            broadcaster,
            server_tx,
            server_rx,
            clock_rx,
            outbound_rx: Some(outbound_rx),
        })
    }

    /// Spawns the task that continuously listens for incoming datagrams.
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<ClientPacket>(&buffer[0..len]) {
                            if server_tx
                                .send(ServerMessage::PacketReceived { packet, addr })
                                .is_err()
                            {
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the broadcast channel onto the socket,
    /// resolving client ids to addresses as it goes. Packets for clients
    /// that vanished in the meantime are dropped.
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let connections = Arc::clone(&self.connections);
        let Some(mut outbound_rx) = self.outbound_rx.take() else {
            return;
        };

        tokio::spawn(async move {
            while let Some((client, packet)) = outbound_rx.recv().await {
                let addr = {
                    let connections = connections.read().await;
                    connections.addr_of(client)
                };

                let Some(addr) = addr else {
                    debug!("Dropping packet for departed client {}", client);
                    continue;
                };

                if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                    error!("Failed to send to client {}: {}", client, e);
                }
            }
        });
    }

    /// Spawns the task that sweeps silent connections.
    fn spawn_timeout_checker(&self) {
        let connections = Arc::clone(&self.connections);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut connections = connections.write().await;
                    connections.check_timeouts()
                };

                for client_id in timed_out {
                    if server_tx
                        .send(ServerMessage::ClientTimeout { client_id })
                        .is_err()
                    {
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &ServerPacket,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Direct send used before a connection has an id (rejects).
    async fn send_to_addr(&self, packet: &ServerPacket, addr: SocketAddr) {
        if let Err(e) = Self::send_packet_impl(&self.socket, packet, addr).await {
            error!("Failed to send packet to {}: {}", addr, e);
        }
    }

    /// Dispatches one inbound packet on the core loop.
    async fn handle_packet(&mut self, packet: ClientPacket, addr: SocketAddr) {
        match packet {
            ClientPacket::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    let response = ServerPacket::Disconnected {
                        reason: "Protocol version mismatch".to_string(),
                    };
                    self.send_to_addr(&response, addr).await;
                    return;
                }

                // A reconnect from the same address supersedes the old
                // connection entirely.
                let existing = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };
                if let Some(existing) = existing {
                    info!("Replacing existing client {} from {}", existing, addr);
                    self.connections.write().await.remove(existing);
                    self.registry.route_disconnect(existing);
                }

                let client_id = {
                    let mut connections = self.connections.write().await;
                    connections.add(addr)
                };

                match client_id {
                    Some(client_id) => {
                        self.broadcaster
                            .emit(client_id, ServerPacket::Connected { client_id });
                        self.registry.handle_connect(client_id);
                    }
                    None => {
                        let response = ServerPacket::Disconnected {
                            reason: "Server full".to_string(),
                        };
                        self.send_to_addr(&response, addr).await;
                    }
                }
            }

            ClientPacket::PaddleMove { direction } => {
                if let Some(client_id) = self.identify(addr).await {
                    self.registry.route_paddle_move(client_id, direction);
                } else {
                    debug!("Paddle move from unknown address {}", addr);
                }
            }

            ClientPacket::RestartGame => {
                if let Some(client_id) = self.identify(addr).await {
                    self.registry.route_restart(client_id);
                }
            }

            ClientPacket::Heartbeat { .. } => {
                if self.identify(addr).await.is_none() {
                    debug!("Heartbeat from unknown address {}", addr);
                }
            }

            ClientPacket::Disconnect => {
                let client_id = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    self.connections.write().await.remove(client_id);
                    self.registry.route_disconnect(client_id);
                }
            }
        }
    }

    /// Resolves the sender and refreshes its liveness.
    async fn identify(&self, addr: SocketAddr) -> Option<ClientId> {
        let mut connections = self.connections.write().await;
        let client_id = connections.find_by_addr(addr)?;
        connections.touch(client_id);
        Some(client_id)
    }

    /// Main loop: the sole writer over matchmaking and session state.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        }
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.registry.route_disconnect(client_id);
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                event = self.clock_rx.recv() => {
                    match event {
                        Some(ClockEvent::Tick(session)) => {
                            self.registry.handle_tick(session);
                        }
                        Some(ClockEvent::MatchStart(session)) => {
                            self.registry.handle_match_start(session);
                        }
                        None => break,
                    }
                },
            }
        }

        Ok(())
    }
}
