//! Outbound delivery seam between the core and the transport layer

use shared::{ClientId, ServerPacket};
use tokio::sync::mpsc;

/// Fire-and-forget delivery of a server packet to one participant.
///
/// Implementations must never block the caller: failing to reach one
/// participant is the transport layer's problem and cannot be allowed to
/// stall the tick or the other participant's delivery.
pub trait Broadcaster: Send + Sync {
    fn emit(&self, to: ClientId, packet: ServerPacket);
}

/// Broadcaster that queues addressed packets on an unbounded channel.
///
/// In production the receiving end feeds the socket sender task; tests
/// drain it directly to observe exactly what the core said to whom.
#[derive(Clone)]
pub struct ChannelBroadcaster {
    outbound: mpsc::UnboundedSender<(ClientId, ServerPacket)>,
}

impl ChannelBroadcaster {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(ClientId, ServerPacket)>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (ChannelBroadcaster { outbound }, rx)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn emit(&self, to: ClientId, packet: ServerPacket) {
        // A send error means the sender task is gone; the packet is lost
        // and the tick carries on.
        let _ = self.outbound.send((to, packet));
    }
}
