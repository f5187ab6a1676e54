use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use relay::ConnectionId;

use crate::connection_tx_storage::ConnectionTx;
use crate::server::ServerTx;

#[derive(Debug)]
pub enum ConnectionCommand {
    Connect {
        tx: ConnectionTx,
    },
    Disconnect {
        from: ConnectionId,
    },
    Inbound {
        from: ConnectionId,
        text: String,
    },
}

#[derive(Debug)]
pub enum ConnectionEvent {
    Connected { connection_id: ConnectionId },
    Relay(String),
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ConnectionEvent);

enum ActorState {
    Idle,
    Connected(ConnectionId),
}

struct ConnectionActor {
    state: ActorState,
    srv_tx: ServerTx,
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<ConnectionEvent>(32);

        self.srv_tx
            .try_send(ConnectionCommand::Connect { tx })
            .expect("server must not be not closed yet");

        let addr = ctx.address().recipient();

        tokio::spawn(async move {
            let addr = addr;
            log::debug!("connection green thread - started");
            while let Some(event) = rx.recv().await {
                if addr.try_send(ConnectionActorMessage(event)).is_err() {
                    break;
                }
            }
            log::debug!("connection green thread - terminated");
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        if let ActorState::Connected(id) = self.state {
            if self
                .srv_tx
                .try_send(ConnectionCommand::Disconnect { from: id })
                .is_err()
            {
                log::warn!("Could not notify relay of connection {} closing", id);
            }
        }

        Running::Stop
    }
}

/// Ingress. Frames arriving before the relay has replied with our
/// ConnectionId are dropped; binary frames are not part of the protocol
/// and are ignored without closing the connection.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => {
                if let ActorState::Connected(from) = self.state {
                    log::debug!("Ingress from {}: {} bytes", from, text.len());
                    if self
                        .srv_tx
                        .try_send(ConnectionCommand::Inbound { from, text })
                        .is_err()
                    {
                        log::warn!("Relay channel full; dropping frame from {}", from);
                    }
                }
            }
            Ok(ws::Message::Close(_)) => {
                ctx.stop();
            }
            _ => (),
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        match msg.0 {
            ConnectionEvent::Connected { connection_id } => {
                self.state = ActorState::Connected(connection_id);
            }
            ConnectionEvent::Relay(text) => {
                ctx.text(text);
            }
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    srv_tx: web::Data<ServerTx>,
) -> Result<HttpResponse, Error> {
    ws::start(
        ConnectionActor {
            srv_tx: srv_tx.get_ref().clone(),
            state: ActorState::Idle,
        },
        &req,
        stream,
    )
}
