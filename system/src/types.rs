use serde::{Deserialize, Serialize};

/// Opaque room token. Usually the fragment of a shareable link, otherwise
/// minted with [`random_room_id`].
pub type RoomId = String;

/// Per-connection identity assigned by the relay. Not stable across
/// reconnects.
pub type ParticipantId = u32;

pub type ElementId = String;

pub fn random_room_id() -> RoomId {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
    pub tool: PointerTool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerTool {
    Pointer,
    Laser,
}

impl Default for PointerTool {
    fn default() -> Self {
        Self::Pointer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonState {
    Up,
    Down,
}

impl Default for ButtonState {
    fn default() -> Self {
        Self::Up
    }
}

/// Transient pointer state of one participant, carried by MOUSE_LOCATION.
/// Every received update replaces the previous one; nothing accumulates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerUpdate {
    pub participant_id: ParticipantId,
    pub pointer: Pointer,
    #[serde(default)]
    pub button: ButtonState,
    #[serde(default)]
    pub selected_element_ids: Vec<ElementId>,
    #[serde(default)]
    pub display_name: String,
}
