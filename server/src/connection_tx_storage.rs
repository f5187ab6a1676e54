use crate::connection::ConnectionEvent;
use relay::ConnectionId;
use std::collections::HashMap;

pub type ConnectionTx = tokio::sync::mpsc::Sender<ConnectionEvent>;

pub struct ConnectionTxStorage {
    connection_txs: HashMap<ConnectionId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.connection_txs.insert(connection_id, tx);
    }

    /// Sends one event to one connection. A missing entry or a closed
    /// receiver is logged and swallowed; one dead target must never
    /// disturb delivery to the rest of a fan-out.
    pub async fn send(&mut self, to: ConnectionId, message: ConnectionEvent) {
        if let Some(tx) = self.connection_txs.get_mut(&to) {
            if tx.send(message).await.is_err() {
                log::warn!("Send to connection {} failed; dropping", to);
            }
        } else {
            log::debug!("No outbound channel for connection {}", to);
        }
    }

    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(&connection_id)
    }
}
