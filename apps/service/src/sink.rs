use std::sync::atomic::{AtomicU64, Ordering};

use alivemon::{PacketSink, PortRef, ProbeError};
use async_trait::async_trait;
use tracing::debug;

/// Packet-out path that logs frames instead of handing them to a switch
#[derive(Debug, Default)]
pub struct LoggingSink {
    sent: AtomicU64,
}

impl LoggingSink {
    /// Frames transmitted so far
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PacketSink for LoggingSink {
    async fn transmit(&self, egress: PortRef, frame: Vec<u8>) -> Result<(), ProbeError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        debug!(%egress, len = frame.len(), frame = %hex::encode(&frame), "Packet out");
        Ok(())
    }
}
