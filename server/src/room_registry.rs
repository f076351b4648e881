use std::collections::HashMap;

use system::{ParticipantId, RoomId};

/// Room → members mapping, mutated only from the relay loop.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Vec<ParticipantId>>,
    locations: HashMap<ParticipantId, RoomId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            locations: HashMap::new(),
        }
    }

    /// Last join wins: a join while still a member elsewhere replaces the
    /// prior membership, and the vacated room id is returned.
    pub fn join(&mut self, room_id: &RoomId, participant_id: ParticipantId) -> Option<RoomId> {
        if self.locations.get(&participant_id) == Some(room_id) {
            return None;
        }
        let vacated = self.leave(participant_id).map(|(room, _)| room);
        self.rooms
            .entry(room_id.clone())
            .or_default()
            .push(participant_id);
        self.locations.insert(participant_id, room_id.clone());
        log::info!("participant {} joined room {}", participant_id, room_id);
        vacated
    }

    /// Returns the vacated room and whether it still exists. Emptied rooms
    /// are removed immediately.
    pub fn leave(&mut self, participant_id: ParticipantId) -> Option<(RoomId, bool)> {
        let room_id = self.locations.remove(&participant_id)?;
        let mut emptied = false;
        if let Some(members) = self.rooms.get_mut(&room_id) {
            members.retain(|id| *id != participant_id);
            emptied = members.is_empty();
        }
        if emptied {
            self.rooms.remove(&room_id);
            log::info!("room {} emptied and removed", room_id);
        }
        log::info!("participant {} left room {}", participant_id, room_id);
        Some((room_id, !emptied))
    }

    pub fn members_of(&self, room_id: &RoomId) -> &[ParticipantId] {
        self.rooms.get(room_id).map_or(&[], Vec::as_slice)
    }

    pub fn room_of(&self, participant_id: ParticipantId) -> Option<&RoomId> {
        self.locations.get(&participant_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_tracks_membership_in_join_order() {
        let mut registry = RoomRegistry::new();
        registry.join(&"abc".to_string(), 1);
        registry.join(&"abc".to_string(), 2);
        assert_eq!(registry.members_of(&"abc".to_string()), &[1, 2]);
        assert_eq!(registry.room_of(1), Some(&"abc".to_string()));
    }

    #[test]
    fn it_is_idempotent_for_a_repeated_join() {
        let mut registry = RoomRegistry::new();
        registry.join(&"abc".to_string(), 1);
        registry.join(&"abc".to_string(), 1);
        assert_eq!(registry.members_of(&"abc".to_string()), &[1]);
    }

    #[test]
    fn it_removes_the_room_when_the_last_member_leaves() {
        let mut registry = RoomRegistry::new();
        registry.join(&"abc".to_string(), 1);
        registry.join(&"abc".to_string(), 2);

        assert_eq!(registry.leave(1), Some(("abc".to_string(), true)));
        assert_eq!(registry.members_of(&"abc".to_string()), &[2]);

        assert_eq!(registry.leave(2), Some(("abc".to_string(), false)));
        assert_eq!(registry.room_count(), 0);

        // A later join starts the room from scratch.
        registry.join(&"abc".to_string(), 3);
        assert_eq!(registry.members_of(&"abc".to_string()), &[3]);
    }

    #[test]
    fn it_replaces_membership_on_a_second_join() {
        let mut registry = RoomRegistry::new();
        registry.join(&"a".to_string(), 1);
        let vacated = registry.join(&"b".to_string(), 1);
        assert_eq!(vacated, Some("a".to_string()));
        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.members_of(&"b".to_string()), &[1]);
    }

    #[test]
    fn it_ignores_leave_for_an_unknown_participant() {
        let mut registry = RoomRegistry::new();
        assert_eq!(registry.leave(7), None);
    }
}
