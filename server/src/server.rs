use tokio::sync::mpsc::{channel, Sender};

use relay::{ClientMessage, ConnectionId};

use super::connection::{ConnectionCommand, ConnectionEvent};
use crate::connection_tx_storage::ConnectionTxStorage;
use crate::server_state::ServerState;

pub type ServerTx = Sender<ConnectionCommand>;

/// The relay loop's state: the membership table plus the outbound channel
/// of every live connection. All mutation happens on the one task spawned
/// by `spawn_server`, so none of it needs locking.
struct Server {
    state: ServerState,
    connections: ConnectionTxStorage,
}

impl Server {
    fn new() -> Self {
        Self {
            state: ServerState::new(),
            connections: ConnectionTxStorage::new(),
        }
    }

    async fn handle_connection_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Connect { tx } => {
                let connection_id = self.state.create_connection();
                self.connections.insert(connection_id, tx);
                self.connections
                    .send(connection_id, ConnectionEvent::Connected { connection_id })
                    .await;
            }
            ConnectionCommand::Disconnect { from } => {
                self.state.disconnect(from);
                self.connections.remove(from);
            }
            ConnectionCommand::Inbound { from, text } => match ClientMessage::parse(&text) {
                Some(ClientMessage::Join { session_id }) => {
                    if session_id.is_empty() {
                        log::debug!("Dropping join with empty session id from {}", from);
                    } else {
                        self.state.join_session(from, &session_id);
                    }
                }
                Some(ClientMessage::Drawing) => self.relay_drawing(from, text).await,
                None => {
                    log::debug!("Dropping unrecognized message from {}", from);
                }
            },
        }
    }

    /// Fans the original text frame out to every other member of the
    /// sender's session. An unjoined sender, like an expired session, is
    /// a silent drop. Each send stands alone; see ConnectionTxStorage.
    async fn relay_drawing(&mut self, from: ConnectionId, text: String) {
        let session_id = match self.state.current_session(from) {
            Some(session_id) => session_id.clone(),
            None => {
                log::debug!("Dropping drawing from unjoined connection {}", from);
                return;
            }
        };
        let targets: Vec<ConnectionId> = self
            .state
            .registry
            .broadcast_targets(&session_id, from)
            .collect();
        for target in targets {
            self.connections
                .send(target, ConnectionEvent::Relay(text.clone()))
                .await;
        }
    }
}

pub fn spawn_server() -> ServerTx {
    let (srv_tx, mut srv_rx) = channel::<ConnectionCommand>(16);

    tokio::spawn(async move {
        let mut server = Box::new(Server::new());

        while let Some(command) = srv_rx.recv().await {
            server.handle_connection_command(command).await;
        }
    });

    return srv_tx;
}
