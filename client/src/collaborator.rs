use system::{ButtonState, ElementId, ParticipantId, Pointer};

/// Fill/stroke pair used to render a remote cursor and selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorColor {
    pub fill: String,
    pub stroke: String,
}

impl CollaboratorColor {
    /// Derives a stable color from the participant id. Golden-angle hue
    /// stepping keeps nearby ids visually distinct.
    pub fn for_participant(participant_id: ParticipantId) -> Self {
        let hue = (u64::from(participant_id) * 137) % 360;
        Self {
            fill: format!("hsl({}, 83%, 64%)", hue),
            stroke: format!("hsl({}, 76%, 48%)", hue),
        }
    }
}

/// One remote peer. Names and pointer state arrive peer-to-peer over the
/// cursor channel; the relay only ever reports ids.
#[derive(Debug, Clone)]
pub struct Collaborator {
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub color: CollaboratorColor,
    pub pointer: Option<Pointer>,
    pub button: ButtonState,
    pub selected_element_ids: Vec<ElementId>,
}

impl Collaborator {
    pub fn new(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            display_name: String::new(),
            color: CollaboratorColor::for_participant(participant_id),
            pointer: None,
            button: ButtonState::Up,
            selected_element_ids: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_derives_stable_distinct_colors() {
        let a = CollaboratorColor::for_participant(1);
        let b = CollaboratorColor::for_participant(2);
        assert_eq!(a, CollaboratorColor::for_participant(1));
        assert_ne!(a, b);
    }
}
