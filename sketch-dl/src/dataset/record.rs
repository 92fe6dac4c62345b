use crate::common::*;

/// One pen stroke, stored as parallel x and y coordinate runs.
///
/// The serialized form is `[[x0, x1, ...], [y0, y1, ...]]` with coordinates
/// in `[0, 255]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stroke(pub Vec<u8>, pub Vec<u8>);

impl Stroke {
    pub fn xs(&self) -> &[u8] {
        &self.0
    }

    pub fn ys(&self) -> &[u8] {
        &self.1
    }

    /// The stroke vertices in drawing order, truncated to the shorter run if
    /// the coordinate runs disagree in length.
    pub fn points(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.0.iter().copied().zip(self.1.iter().copied())
    }
}

/// One sketch as stored in the Quick Draw data files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchRecord {
    /// The class name of the sketch.
    pub word: String,
    /// Whether the upstream recognizer accepted the sketch.
    #[serde(default)]
    pub recognized: bool,
    /// The ordered list of strokes.
    pub drawing: Vec<Stroke>,
}
