use std::num::Wrapping;

use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use system::{ClientSocketEvent, ParticipantId, RoomId, ServerSocketEvent};

use crate::connection::{ConnectionEvent, RelayCommand};
use crate::connection_tx_storage::ConnectionTxStorage;
use crate::room_registry::RoomRegistry;

// Commands must never be rejected: a lost `Incoming` drops a reliable
// frame, a lost `Disconnect` leaks the membership entry.
pub type RelayTx = UnboundedSender<RelayCommand>;

#[derive(Debug, Clone, Copy)]
pub struct RelayStats {
    pub room_count: usize,
    pub connection_count: usize,
}

/// Fan-out router between one participant's inbound events and the rest of
/// its room. Holds no scene state; broadcast payloads pass through opaquely.
pub struct Relay {
    registry: RoomRegistry,
    connections: ConnectionTxStorage,
    participant_id_source: Wrapping<ParticipantId>,
}

impl Relay {
    pub fn new(registry: RoomRegistry) -> Self {
        Self {
            registry,
            connections: ConnectionTxStorage::new(),
            participant_id_source: Wrapping(0),
        }
    }

    pub fn handle_command(&mut self, command: RelayCommand) {
        // A socket can die without its actor ever learning its participant
        // id, in which case no Disconnect arrives. Sweep before each command.
        self.reap_closed();
        match command {
            RelayCommand::Connect { reliable, volatile } => {
                let participant_id = self.new_participant_id();
                self.connections.insert(participant_id, reliable, volatile);
                self.connections.send_reliable(
                    participant_id,
                    ConnectionEvent::Connected { participant_id },
                );
                // Prompt the client to announce which room it wants.
                self.connections.send_reliable(
                    participant_id,
                    ConnectionEvent::Event(ServerSocketEvent::InitRoom),
                );
                log::info!("participant {} connected", participant_id);
            }
            RelayCommand::Incoming { from, event } => self.handle_socket_event(from, event),
            RelayCommand::Disconnect { from } => {
                self.drop_connection(from);
                log::info!("participant {} disconnected", from);
            }
            RelayCommand::Stats { reply } => {
                let _ = reply.send(RelayStats {
                    room_count: self.registry.room_count(),
                    connection_count: self.connections.len(),
                });
            }
        }
    }

    fn handle_socket_event(&mut self, from: ParticipantId, event: ClientSocketEvent) {
        match event {
            ClientSocketEvent::JoinRoom { room_id } => {
                if let Some(vacated) = self.registry.join(&room_id, from) {
                    self.broadcast_presence(&vacated);
                }
                self.broadcast_presence(&room_id);
                for member in self.members_except(&room_id, from) {
                    self.connections.send_reliable(
                        member,
                        ConnectionEvent::Event(ServerSocketEvent::NewUser {
                            participant_id: from,
                        }),
                    );
                }
            }
            ClientSocketEvent::ServerBroadcast { room_id, data, iv } => {
                for member in self.members_except(&room_id, from) {
                    self.connections.send_reliable(
                        member,
                        ConnectionEvent::Event(ServerSocketEvent::ClientBroadcast {
                            data: data.clone(),
                            iv: iv.clone(),
                        }),
                    );
                }
            }
            ClientSocketEvent::ServerVolatileBroadcast { room_id, data, iv } => {
                for member in self.members_except(&room_id, from) {
                    self.connections.send_volatile(
                        member,
                        ConnectionEvent::Event(ServerSocketEvent::ClientBroadcast {
                            data: data.clone(),
                            iv: iv.clone(),
                        }),
                    );
                }
            }
            ClientSocketEvent::UserFollow { payload } => {
                // Forwarded verbatim to the sender's room.
                if let Some(room_id) = self.registry.room_of(from).cloned() {
                    for member in self.members_except(&room_id, from) {
                        self.connections.send_reliable(
                            member,
                            ConnectionEvent::Event(ServerSocketEvent::UserFollow {
                                payload: payload.clone(),
                            }),
                        );
                    }
                }
            }
        }
    }

    /// Member-list notification to every member of the affected room.
    fn broadcast_presence(&self, room_id: &RoomId) {
        let members = self.registry.members_of(room_id).to_vec();
        for member in &members {
            self.connections.send_reliable(
                *member,
                ConnectionEvent::Event(ServerSocketEvent::RoomUserChange {
                    participant_ids: members.clone(),
                }),
            );
        }
    }

    fn drop_connection(&mut self, participant_id: ParticipantId) {
        if let Some((room_id, survives)) = self.registry.leave(participant_id) {
            if survives {
                self.broadcast_presence(&room_id);
            }
        }
        self.connections.remove(participant_id);
    }

    fn reap_closed(&mut self) {
        for participant_id in self.connections.closed_connections() {
            log::info!("reaping participant {}: mailbox closed", participant_id);
            self.drop_connection(participant_id);
        }
    }

    fn members_except(&self, room_id: &RoomId, without: ParticipantId) -> Vec<ParticipantId> {
        self.registry
            .members_of(room_id)
            .iter()
            .copied()
            .filter(|member| *member != without)
            .collect()
    }

    fn new_participant_id(&mut self) -> ParticipantId {
        self.participant_id_source += Wrapping(1);
        self.participant_id_source.0
    }
}

pub fn spawn_relay() -> RelayTx {
    let (relay_tx, mut relay_rx) = unbounded_channel::<RelayCommand>();

    tokio::spawn(async move {
        let mut relay = Relay::new(RoomRegistry::new());

        while let Some(command) = relay_rx.recv().await {
            relay.handle_command(command);
        }
    });

    relay_tx
}
