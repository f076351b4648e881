use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use system::ParticipantId;

use crate::connection::ConnectionEvent;

/// Ordered, never-dropped egress towards one connection.
pub type ReliableTx = mpsc::UnboundedSender<ConnectionEvent>;

/// Best-effort egress. When a connection's volatile queue is full the frame
/// is discarded; the next pointer frame supersedes it anyway.
pub type VolatileTx = mpsc::Sender<ConnectionEvent>;

/// Per-connection volatile queue depth.
pub const VOLATILE_QUEUE_CAPACITY: usize = 8;

struct ConnectionTx {
    reliable: ReliableTx,
    volatile: VolatileTx,
}

/// The relay's send side for every connected participant.
pub struct ConnectionTxStorage {
    connection_txs: HashMap<ParticipantId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, participant_id: ParticipantId, reliable: ReliableTx, volatile: VolatileTx) {
        self.connection_txs
            .insert(participant_id, ConnectionTx { reliable, volatile });
    }

    pub fn remove(&mut self, participant_id: ParticipantId) -> bool {
        self.connection_txs.remove(&participant_id).is_some()
    }

    /// Participants whose connection actor is gone without a disconnect.
    pub fn closed_connections(&self) -> Vec<ParticipantId> {
        self.connection_txs
            .iter()
            .filter(|(_, tx)| tx.reliable.is_closed())
            .map(|(participant_id, _)| *participant_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connection_txs.len()
    }

    pub fn send_reliable(&self, to: ParticipantId, event: ConnectionEvent) {
        if let Some(tx) = self.connection_txs.get(&to) {
            if tx.reliable.send(event).is_err() {
                log::warn!("connection {} closed its reliable mailbox", to);
            }
        } else {
            log::debug!("no connection {} for reliable send", to);
        }
    }

    pub fn send_volatile(&self, to: ParticipantId, event: ConnectionEvent) {
        if let Some(tx) = self.connection_txs.get(&to) {
            match tx.volatile.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::trace!("volatile frame to {} dropped: queue full", to);
                }
                Err(TrySendError::Closed(_)) => {
                    log::warn!("connection {} closed its volatile mailbox", to);
                }
            }
        } else {
            log::debug!("no connection {} for volatile send", to);
        }
    }
}
