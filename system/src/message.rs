use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ElementId, ParticipantId, PointerUpdate, RoomId, SceneElement};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown envelope type: {0}")]
    UnknownEnvelopeType(String),
    #[error("envelope payload is missing elements")]
    MissingElements,
}

/// Unused encryption slot. The wire format reserves it; it is always null.
pub type IvPlaceholder = Option<Vec<u8>>;

/// The application payload relayed between peers. The relay never looks
/// inside; both broadcast tiers carry the same serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BroadcastEnvelope {
    #[serde(rename = "SCENE_INIT")]
    SceneInit { elements: Vec<SceneElement> },
    #[serde(rename = "SCENE_UPDATE")]
    SceneUpdate { elements: Vec<SceneElement> },
    #[serde(rename = "MOUSE_LOCATION")]
    MouseLocation(PointerUpdate),
}

impl BroadcastEnvelope {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes an envelope, skipping malformed entries inside element
    /// batches: one bad element must never abort the rest of the batch.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        #[derive(Deserialize)]
        struct RawEnvelope {
            #[serde(rename = "type")]
            kind: String,
            #[serde(default)]
            payload: serde_json::Value,
        }

        let raw: RawEnvelope = serde_json::from_str(raw)?;
        match raw.kind.as_str() {
            "SCENE_INIT" => Ok(Self::SceneInit {
                elements: decode_elements(raw.payload)?,
            }),
            "SCENE_UPDATE" => Ok(Self::SceneUpdate {
                elements: decode_elements(raw.payload)?,
            }),
            "MOUSE_LOCATION" => Ok(Self::MouseLocation(serde_json::from_value(raw.payload)?)),
            _ => Err(ProtocolError::UnknownEnvelopeType(raw.kind)),
        }
    }
}

fn decode_elements(payload: serde_json::Value) -> Result<Vec<SceneElement>, ProtocolError> {
    let entries = match payload {
        serde_json::Value::Object(mut map) => match map.remove("elements") {
            Some(serde_json::Value::Array(entries)) => entries,
            _ => return Err(ProtocolError::MissingElements),
        },
        _ => return Err(ProtocolError::MissingElements),
    };

    let mut elements = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<SceneElement>(entry) {
            Ok(element) => elements.push(element),
            Err(err) => log::warn!("skipping malformed scene element: {}", err),
        }
    }
    Ok(elements)
}

/// Events a client sends to the relay, framed as JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientSocketEvent {
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    ServerBroadcast {
        room_id: RoomId,
        data: String,
        iv: IvPlaceholder,
    },
    #[serde(rename_all = "camelCase")]
    ServerVolatileBroadcast {
        room_id: RoomId,
        data: String,
        iv: IvPlaceholder,
    },
    UserFollow { payload: serde_json::Value },
}

impl ClientSocketEvent {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Events the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerSocketEvent {
    InitRoom,
    #[serde(rename_all = "camelCase")]
    NewUser { participant_id: ParticipantId },
    #[serde(rename_all = "camelCase")]
    RoomUserChange { participant_ids: Vec<ParticipantId> },
    ClientBroadcast { data: String, iv: IvPlaceholder },
    UserFollow { payload: serde_json::Value },
}

impl ServerSocketEvent {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

pub fn element_ids(elements: &[SceneElement]) -> Vec<ElementId> {
    elements.iter().map(|e| e.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElementKind, Pointer, PointerTool};

    #[test]
    fn it_round_trips_scene_update_envelope() {
        let envelope = BroadcastEnvelope::SceneUpdate {
            elements: vec![SceneElement::new("a", ElementKind::Rectangle)],
        };
        let raw = envelope.encode().expect("must encode");
        assert!(raw.contains(r#""type":"SCENE_UPDATE""#));
        let back = BroadcastEnvelope::decode(&raw).expect("must decode");
        assert_eq!(back, envelope);
    }

    #[test]
    fn it_skips_malformed_elements_without_aborting_the_batch() {
        let raw = r#"{
            "type": "SCENE_INIT",
            "payload": {
                "elements": [
                    {"id": "a", "version": 1},
                    {"version": 9},
                    {"id": "b", "version": 2}
                ]
            }
        }"#;
        match BroadcastEnvelope::decode(raw).expect("must decode") {
            BroadcastEnvelope::SceneInit { elements } => {
                assert_eq!(element_ids(&elements), vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected envelope: {:?}", other),
        }
    }

    #[test]
    fn it_rejects_unknown_envelope_tags() {
        let err = BroadcastEnvelope::decode(r#"{"type":"SCENE_DROP","payload":{}}"#)
            .expect_err("must reject");
        assert!(matches!(err, ProtocolError::UnknownEnvelopeType(_)));
    }

    #[test]
    fn it_round_trips_mouse_location_envelope() {
        let envelope = BroadcastEnvelope::MouseLocation(PointerUpdate {
            participant_id: 4,
            pointer: Pointer {
                x: 3.0,
                y: 4.0,
                tool: PointerTool::Laser,
            },
            button: Default::default(),
            selected_element_ids: vec![],
            display_name: "bob".into(),
        });
        let raw = envelope.encode().expect("must encode");
        let back = BroadcastEnvelope::decode(&raw).expect("must decode");
        assert_eq!(back, envelope);
    }

    #[test]
    fn it_uses_kebab_case_socket_event_tags() {
        let event = ClientSocketEvent::JoinRoom {
            room_id: "r1".into(),
        };
        let raw = event.encode().expect("must encode");
        assert!(raw.contains(r#""event":"join-room""#));
        assert!(raw.contains(r#""roomId":"r1""#));

        let event = ServerSocketEvent::RoomUserChange {
            participant_ids: vec![1, 2],
        };
        let raw = event.encode().expect("must encode");
        assert!(raw.contains(r#""event":"room-user-change""#));
        assert_eq!(ServerSocketEvent::decode(&raw).expect("must decode"), event);
    }

    #[test]
    fn it_decodes_init_room_without_data() {
        let event = ServerSocketEvent::decode(r#"{"event":"init-room"}"#).expect("must decode");
        assert_eq!(event, ServerSocketEvent::InitRoom);
    }

    #[test]
    fn it_keeps_the_iv_slot_null() {
        let event = ClientSocketEvent::ServerBroadcast {
            room_id: "r1".into(),
            data: "{}".into(),
            iv: None,
        };
        let raw = event.encode().expect("must encode");
        assert!(raw.contains(r#""iv":null"#));
    }
}
