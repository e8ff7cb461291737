//! Headless probe client for manual smoke testing.
//!
//! Connects, waits for matchmaking, then wiggles its paddle for a while
//! and prints whatever the server says. Run two of these against a local
//! server to watch a full match happen.

use bincode::{deserialize, serialize};
use shared::{ClientPacket, ServerPacket, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::time::timeout;

fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    let server_addr = "127.0.0.1:8080".parse::<SocketAddr>()?;

    let connect = ClientPacket::Connect {
        client_version: PROTOCOL_VERSION,
    };
    println!("Sending connect to {}", server_addr);
    socket.send_to(&serialize(&connect)?, server_addr).await?;

    let mut buf = [0u8; 2048];
    let mut direction: i8 = 1;
    let mut snapshots = 0u32;

    // Run for roughly 15 seconds, heartbeating and moving the paddle,
    // printing a sample of the snapshot stream.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);

    while tokio::time::Instant::now() < deadline {
        let received = timeout(Duration::from_millis(500), socket.recv_from(&mut buf)).await;

        match received {
            Ok(Ok((len, _))) => match deserialize::<ServerPacket>(&buf[0..len]) {
                Ok(ServerPacket::Connected { client_id }) => {
                    println!("Connected with client ID {}", client_id);
                }
                Ok(ServerPacket::WaitingForOpponent) => {
                    println!("Waiting for an opponent...");
                }
                Ok(ServerPacket::PlayerAssigned { slot, session_id }) => {
                    println!("Assigned {} in session {}", slot, session_id);
                }
                Ok(ServerPacket::GameStart) => {
                    println!("Game on!");
                }
                Ok(ServerPacket::GameState { state }) => {
                    snapshots += 1;
                    if snapshots % 60 == 0 {
                        println!(
                            "ball=({:.0},{:.0}) score {}:{} active={}",
                            state.ball.x,
                            state.ball.y,
                            state.scores.slot_a,
                            state.scores.slot_b,
                            state.active
                        );
                    }
                    if let Some(winner) = state.winner {
                        println!("Winner: {}", winner);
                    }
                }
                Ok(ServerPacket::PlayerDisconnected) => {
                    println!("Opponent disconnected");
                }
                Ok(ServerPacket::Disconnected { reason }) => {
                    println!("Server closed the connection: {}", reason);
                    return Ok(());
                }
                Err(e) => println!("Failed to deserialize packet: {}", e),
            },
            Ok(Err(e)) => println!("Error receiving packet: {}", e),
            Err(_) => {
                // Quiet half-second: reverse course and keep the
                // connection alive.
                direction = -direction;
                let heartbeat = ClientPacket::Heartbeat {
                    timestamp: get_timestamp(),
                };
                socket.send_to(&serialize(&heartbeat)?, server_addr).await?;
            }
        }

        let paddle_move = ClientPacket::PaddleMove { direction };
        socket
            .send_to(&serialize(&paddle_move)?, server_addr)
            .await?;
    }

    println!("Sending disconnect");
    socket
        .send_to(&serialize(&ClientPacket::Disconnect)?, server_addr)
        .await?;
    println!("Test client finished ({} snapshots seen)", snapshots);

    Ok(())
}
