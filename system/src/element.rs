use serde::{Deserialize, Serialize};

use crate::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Rectangle,
    Ellipse,
    Diamond,
    Arrow,
    Line,
    Text,
    Freedraw,
}

impl Default for ElementKind {
    fn default() -> Self {
        Self::Rectangle
    }
}

/// One drawable unit of the shared scene.
///
/// `version` increases with every local edit of the element and
/// `version_nonce` breaks ties between concurrent edits that landed on the
/// same version. Deletion is a mutation like any other: `is_deleted` is a
/// tombstone that propagates through reconciliation instead of removing the
/// element, so a later edit with a higher version can resurrect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneElement {
    pub id: ElementId,
    pub version: u64,
    #[serde(default)]
    pub version_nonce: u32,
    #[serde(rename = "type", default)]
    pub kind: ElementKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

fn default_stroke_color() -> String {
    "#1e1e1e".into()
}

fn default_background_color() -> String {
    "transparent".into()
}

fn default_stroke_width() -> f64 {
    1.0
}

fn default_opacity() -> f64 {
    100.0
}

impl SceneElement {
    pub fn new(id: impl Into<ElementId>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            version: 1,
            version_nonce: 0,
            kind,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            angle: 0.0,
            stroke_color: default_stroke_color(),
            background_color: default_background_color(),
            stroke_width: default_stroke_width(),
            opacity: default_opacity(),
            text: None,
            is_deleted: false,
        }
    }

    /// Marks this element as one local edit newer.
    pub fn bump_version(&mut self, nonce: u32) {
        self.version += 1;
        self.version_nonce = nonce;
    }

    /// Soft-deletes the element. The tombstone is itself an edit and must
    /// win reconciliation against older live states.
    pub fn tombstone(&mut self, nonce: u32) {
        self.is_deleted = true;
        self.bump_version(nonce);
    }
}
