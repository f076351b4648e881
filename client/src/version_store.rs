use std::collections::HashMap;

use system::{ElementId, SceneElement};

/// Highest element version already broadcast or received, per element id.
/// An element whose version has not moved past the recorded one is not
/// re-sent. Reset whenever the session closes.
#[derive(Debug, Default)]
pub struct SceneVersionStore {
    versions: HashMap<ElementId, u64>,
}

impl SceneVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the element carries a version we have not yet broadcast or
    /// received.
    pub fn is_newer(&self, element: &SceneElement) -> bool {
        self.versions
            .get(&element.id)
            .map_or(true, |&recorded| element.version > recorded)
    }

    /// Records the element's version. Never regresses a recorded version.
    pub fn record(&mut self, element: &SceneElement) {
        let recorded = self.versions.entry(element.id.clone()).or_insert(0);
        if element.version > *recorded {
            *recorded = element.version;
        }
    }

    pub fn clear(&mut self) {
        self.versions.clear();
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
