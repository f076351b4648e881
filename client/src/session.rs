use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use thiserror::Error;

use system::{
    reconcile, BroadcastEnvelope, ClientSocketEvent, ParticipantId, PointerUpdate, ProtocolError,
    RoomId, SceneElement, ServerSocketEvent,
};

use crate::{Collaborator, SceneVersionStore};

/// Pointer frames are throttled to roughly thirty per second; a dropped or
/// suppressed frame is superseded within the next interval.
pub const POINTER_BROADCAST_INTERVAL: Duration = Duration::from_millis(33);

/// Self-healing full snapshot cadence. Guards against lost volatile frames
/// and version-store divergence.
pub const FULL_SYNC_INTERVAL: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Joining,
    InRoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneBroadcastKind {
    Init,
    Update,
}

/// Outbound frame with its delivery tier. The host forwards `Reliable`
/// frames over the ordered channel and `Volatile` frames over the droppable
/// one.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Reliable(ClientSocketEvent),
    Volatile(ClientSocketEvent),
}

/// What the session surfaces to its host after processing server events.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The scene replica changed; re-render from [`CollabSession::scene`].
    SceneReplaced,
    /// Someone joined; the host should answer with a SCENE_INIT snapshot
    /// (`broadcast_scene(Init, elements, true)`).
    NewUser(ParticipantId),
    RoomUserChange(Vec<ParticipantId>),
    CollaboratorPointer(ParticipantId),
    UserFollow(system::serde_json::Value),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is not open")]
    NotOpen,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Client half of the collaboration protocol.
///
/// Never touches a socket or a timer. The host feeds decoded server events
/// plus the current time in, drains `poll_outbound` into the transport,
/// drains `poll_event` into the UI, and calls `tick` on its own schedule.
#[derive(Debug, Default)]
pub struct CollabSession {
    state: InnerState,
    scene: Vec<SceneElement>,
    version_store: SceneVersionStore,
    collaborators: HashMap<ParticipantId, Collaborator>,
    outbox: VecDeque<OutboundMessage>,
    events: VecDeque<SessionEvent>,
    last_pointer_broadcast: Option<Instant>,
    pending_pointer: Option<PointerUpdate>,
    last_full_sync: Option<Instant>,
}

#[derive(Debug)]
enum InnerState {
    Disconnected,
    Joining { room_id: RoomId },
    InRoom { room_id: RoomId },
}

impl Default for InnerState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl CollabSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts joining `room_id`. Returns false (and changes nothing) when a
    /// session is already open: the previous session must be closed first,
    /// otherwise one logical participant would register twice.
    pub fn open(&mut self, room_id: RoomId) -> bool {
        if !matches!(self.state, InnerState::Disconnected) {
            log::warn!("session already open; close it before opening another room");
            return false;
        }
        log::info!("joining room {}", room_id);
        self.state = InnerState::Joining { room_id };
        true
    }

    /// Tears the session down and resets all broadcast bookkeeping. Nothing
    /// scheduled before `close` survives into a later `open`: no stale
    /// join-room, no stale pointer frame, no stale version suppression.
    pub fn close(&mut self) {
        self.state = InnerState::Disconnected;
        self.version_store.clear();
        self.collaborators.clear();
        self.outbox.clear();
        self.events.clear();
        self.last_pointer_broadcast = None;
        self.pending_pointer = None;
        self.last_full_sync = None;
    }

    /// True once the room is set and the join handshake completed (the first
    /// membership notification arrived).
    pub fn is_open(&self) -> bool {
        matches!(self.state, InnerState::InRoom { .. })
    }

    pub fn state(&self) -> SessionState {
        match self.state {
            InnerState::Disconnected => SessionState::Disconnected,
            InnerState::Joining { .. } => SessionState::Joining,
            InnerState::InRoom { .. } => SessionState::InRoom,
        }
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        match &self.state {
            InnerState::Disconnected => None,
            InnerState::Joining { room_id } | InnerState::InRoom { room_id } => Some(room_id),
        }
    }

    /// Local scene replica, replaced wholesale by reconciliation.
    pub fn scene(&self) -> &[SceneElement] {
        &self.scene
    }

    pub fn collaborators(&self) -> &HashMap<ParticipantId, Collaborator> {
        &self.collaborators
    }

    pub fn poll_outbound(&mut self) -> Option<OutboundMessage> {
        self.outbox.pop_front()
    }

    pub fn poll_event(&mut self) -> Option<SessionEvent> {
        self.events.pop_front()
    }

    pub fn handle_server_event(&mut self, event: ServerSocketEvent, now: Instant) {
        if matches!(self.state, InnerState::Disconnected) {
            log::debug!("ignoring server event on a closed session");
            return;
        }
        match event {
            ServerSocketEvent::InitRoom => {
                // The server's cue to (re-)announce membership.
                if let Some(room_id) = self.room_id().cloned() {
                    self.outbox
                        .push_back(OutboundMessage::Reliable(ClientSocketEvent::JoinRoom {
                            room_id,
                        }));
                }
            }
            ServerSocketEvent::RoomUserChange { participant_ids } => {
                if let InnerState::Joining { room_id } = &self.state {
                    let room_id = room_id.clone();
                    self.state = InnerState::InRoom { room_id };
                    self.last_full_sync = Some(now);
                }
                self.collaborators
                    .retain(|id, _| participant_ids.contains(id));
                self.events
                    .push_back(SessionEvent::RoomUserChange(participant_ids));
            }
            ServerSocketEvent::NewUser { participant_id } => {
                self.events.push_back(SessionEvent::NewUser(participant_id));
            }
            ServerSocketEvent::ClientBroadcast { data, iv: _ } => {
                self.handle_broadcast(&data);
            }
            ServerSocketEvent::UserFollow { payload } => {
                self.events.push_back(SessionEvent::UserFollow(payload));
            }
        }
    }

    fn handle_broadcast(&mut self, data: &str) {
        match BroadcastEnvelope::decode(data) {
            Ok(BroadcastEnvelope::SceneInit { elements })
            | Ok(BroadcastEnvelope::SceneUpdate { elements }) => {
                for element in &elements {
                    self.version_store.record(element);
                }
                self.scene = reconcile(&self.scene, &elements);
                self.events.push_back(SessionEvent::SceneReplaced);
            }
            Ok(BroadcastEnvelope::MouseLocation(update)) => {
                let collaborator = self
                    .collaborators
                    .entry(update.participant_id)
                    .or_insert_with(|| Collaborator::new(update.participant_id));
                collaborator.pointer = Some(update.pointer);
                collaborator.button = update.button;
                collaborator.selected_element_ids = update.selected_element_ids;
                collaborator.display_name = update.display_name;
                self.events
                    .push_back(SessionEvent::CollaboratorPointer(update.participant_id));
            }
            Err(err) => {
                // Malformed payloads are the receiver's problem and only the
                // receiver's: log, drop, stay connected.
                log::warn!("discarding malformed broadcast envelope: {}", err);
            }
        }
    }

    /// Queues a scene broadcast on the reliable tier. Without `sync_all`
    /// only elements newer than their recorded version are sent; `sync_all`
    /// forces the full list (SCENE_INIT for a newcomer, periodic resync).
    pub fn broadcast_scene(
        &mut self,
        kind: SceneBroadcastKind,
        elements: &[SceneElement],
        sync_all: bool,
    ) -> Result<(), SessionError> {
        let room_id = match &self.state {
            InnerState::InRoom { room_id } => room_id.clone(),
            _ => return Err(SessionError::NotOpen),
        };

        let to_send: Vec<SceneElement> = elements
            .iter()
            .filter(|element| sync_all || self.version_store.is_newer(element))
            .cloned()
            .collect();
        if to_send.is_empty() && !sync_all {
            return Ok(());
        }
        for element in &to_send {
            self.version_store.record(element);
        }

        let envelope = match kind {
            SceneBroadcastKind::Init => BroadcastEnvelope::SceneInit { elements: to_send },
            SceneBroadcastKind::Update => BroadcastEnvelope::SceneUpdate { elements: to_send },
        };
        let data = envelope.encode()?;
        self.outbox.push_back(OutboundMessage::Reliable(
            ClientSocketEvent::ServerBroadcast {
                room_id,
                data,
                iv: None,
            },
        ));
        Ok(())
    }

    /// Replaces the local replica with the host's current scene and
    /// broadcasts whatever moved past its recorded version.
    pub fn commit_local(&mut self, elements: Vec<SceneElement>) -> Result<(), SessionError> {
        if self.is_open() {
            self.broadcast_scene(SceneBroadcastKind::Update, &elements, false)?;
        }
        self.scene = elements;
        Ok(())
    }

    /// Queues a pointer frame on the volatile tier, throttled to
    /// [`POINTER_BROADCAST_INTERVAL`]. A frame arriving inside the interval
    /// is stashed and flushed by the next due `tick`, so the cursor never
    /// freezes one frame behind.
    pub fn broadcast_mouse_location(
        &mut self,
        update: PointerUpdate,
        now: Instant,
    ) -> Result<(), SessionError> {
        if !self.is_open() {
            return Err(SessionError::NotOpen);
        }
        if self.pointer_broadcast_due(now) {
            self.send_pointer(update, now)?;
        } else {
            self.pending_pointer = Some(update);
        }
        Ok(())
    }

    /// Drives the session's scheduled work: the trailing pointer frame and
    /// the periodic `sync_all` snapshot. `current_elements` is the host's
    /// current scene, used for the resync.
    pub fn tick(
        &mut self,
        now: Instant,
        current_elements: &[SceneElement],
    ) -> Result<(), SessionError> {
        if !self.is_open() {
            return Ok(());
        }

        if self.pointer_broadcast_due(now) {
            if let Some(update) = self.pending_pointer.take() {
                self.send_pointer(update, now)?;
            }
        }

        if self
            .last_full_sync
            .map_or(false, |at| now.duration_since(at) >= FULL_SYNC_INTERVAL)
        {
            self.broadcast_scene(SceneBroadcastKind::Update, current_elements, true)?;
            self.last_full_sync = Some(now);
        }
        Ok(())
    }

    fn pointer_broadcast_due(&self, now: Instant) -> bool {
        self.last_pointer_broadcast
            .map_or(true, |at| now.duration_since(at) >= POINTER_BROADCAST_INTERVAL)
    }

    fn send_pointer(&mut self, update: PointerUpdate, now: Instant) -> Result<(), SessionError> {
        let room_id = match &self.state {
            InnerState::InRoom { room_id } => room_id.clone(),
            _ => return Err(SessionError::NotOpen),
        };
        let data = BroadcastEnvelope::MouseLocation(update).encode()?;
        self.outbox.push_back(OutboundMessage::Volatile(
            ClientSocketEvent::ServerVolatileBroadcast {
                room_id,
                data,
                iv: None,
            },
        ));
        self.last_pointer_broadcast = Some(now);
        Ok(())
    }
}
