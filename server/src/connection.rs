use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::{mpsc, oneshot};

use system::{ClientSocketEvent, ParticipantId, ServerSocketEvent};

use crate::connection_tx_storage::{ReliableTx, VolatileTx, VOLATILE_QUEUE_CAPACITY};
use crate::relay::{RelayStats, RelayTx};

/// Commands the relay loop consumes.
#[derive(Debug)]
pub enum RelayCommand {
    Connect {
        reliable: ReliableTx,
        volatile: VolatileTx,
    },
    Incoming {
        from: ParticipantId,
        event: ClientSocketEvent,
    },
    Disconnect {
        from: ParticipantId,
    },
    Stats {
        reply: oneshot::Sender<RelayStats>,
    },
}

/// Events the relay pushes back towards one connection.
#[derive(Debug)]
pub enum ConnectionEvent {
    Connected { participant_id: ParticipantId },
    Event(ServerSocketEvent),
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ConnectionEvent);

enum ConnectionState {
    Idle,
    Connected(ParticipantId),
}

/// One websocket connection, bridging the socket to the relay loop.
struct ConnectionActor {
    state: ConnectionState,
    relay_tx: RelayTx,
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (reliable_tx, mut reliable_rx) = mpsc::unbounded_channel::<ConnectionEvent>();
        let (volatile_tx, mut volatile_rx) = mpsc::channel::<ConnectionEvent>(VOLATILE_QUEUE_CAPACITY);

        if let Err(err) = self.relay_tx.send(RelayCommand::Connect {
            reliable: reliable_tx,
            volatile: volatile_tx,
        }) {
            log::error!("relay unavailable, dropping connection: {}", err);
            ctx.stop();
            return;
        }

        let addr = ctx.address().recipient();
        actix_web::rt::spawn(async move {
            while let Some(event) = reliable_rx.recv().await {
                if addr.try_send(ConnectionActorMessage(event)).is_err() {
                    break;
                }
            }
        });

        let addr = ctx.address().recipient();
        actix_web::rt::spawn(async move {
            while let Some(event) = volatile_rx.recv().await {
                if addr.try_send(ConnectionActorMessage(event)).is_err() {
                    break;
                }
            }
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        // If the socket died before the connect ack round-tripped there is
        // no id to report; the relay notices the closed mailbox instead.
        if let ConnectionState::Connected(from) = self.state {
            if self.relay_tx.send(RelayCommand::Disconnect { from }).is_err() {
                log::warn!("relay unavailable while disconnecting {}", from);
            }
        }
        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => ctx.pong(&payload),
            Ok(ws::Message::Text(text)) => {
                let from = match self.state {
                    ConnectionState::Connected(from) => from,
                    ConnectionState::Idle => {
                        log::debug!("dropping frame received before connect ack");
                        return;
                    }
                };
                match ClientSocketEvent::decode(&text) {
                    Ok(event) => {
                        // Only fails when the relay loop itself is gone.
                        if self.relay_tx.send(RelayCommand::Incoming { from, event }).is_err() {
                            log::error!("relay unavailable, closing connection {}", from);
                            ctx.stop();
                        }
                    }
                    // Malformed input is logged and dropped; the
                    // connection stays open.
                    Err(err) => log::warn!("discarding malformed frame from {}: {}", from, err),
                }
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => (),
            Err(err) => {
                log::warn!("websocket protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, msg: ConnectionActorMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg.0 {
            ConnectionEvent::Connected { participant_id } => {
                self.state = ConnectionState::Connected(participant_id);
            }
            ConnectionEvent::Event(event) => match event.encode() {
                Ok(serialized) => ctx.text(serialized),
                Err(err) => log::error!("failed to encode server event: {}", err),
            },
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    relay_tx: web::Data<RelayTx>,
) -> Result<HttpResponse, Error> {
    ws::start(
        ConnectionActor {
            state: ConnectionState::Idle,
            relay_tx: relay_tx.get_ref().clone(),
        },
        &req,
        stream,
    )
}
