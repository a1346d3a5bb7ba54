use std::collections::BTreeSet;

use crate::model::Frame;

/// Ordered frame sequence of one project. A frame's position is its index.
///
/// Every operation is synchronous and leaves the sequence consistent; invalid indices turn the
/// call into a no-op instead of an error.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FrameStore {
    frames: Vec<Frame>,
}

impl FrameStore {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn as_slice(&self) -> &[Frame] {
        &self.frames
    }

    /// Add to the end and return the new length.
    pub fn append(&mut self, frame: Frame) -> usize {
        self.frames.push(frame);
        self.frames.len()
    }

    /// Insert at `index`, clamped to `[0, len]`.
    pub fn insert_at(&mut self, index: usize, frame: Frame) -> usize {
        let index = index.min(self.frames.len());
        self.frames.insert(index, frame);
        index
    }

    /// Remove the frame at `from` and re-insert it at `to`, where `to` is read against the
    /// shortened sequence (clamped to its end). Returns `false` for the documented no-op cases:
    /// `from == to` or `from` out of bounds.
    pub fn move_to(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.frames.len() {
            return false;
        }
        let frame = self.frames.remove(from);
        self.insert_at(to, frame);
        true
    }

    pub fn delete_at(&mut self, index: usize) -> Option<Frame> {
        (index < self.frames.len()).then(|| self.frames.remove(index))
    }

    /// Remove every frame whose pre-deletion index is in `indices`. Out-of-range indices are
    /// ignored. Returns the number of removed frames.
    pub fn delete_indices(&mut self, indices: &BTreeSet<usize>) -> usize {
        let before = self.frames.len();
        let mut index = 0usize;
        self.frames.retain(|_| {
            let keep = !indices.contains(&index);
            index += 1;
            keep
        });
        before - self.frames.len()
    }

    /// Append copies (fresh ids, same payloads) of the referenced frames in ascending source
    /// order. Returns the number of appended frames.
    pub fn duplicate_indices(&mut self, indices: &BTreeSet<usize>) -> usize {
        let copies: Vec<Frame> = indices
            .iter()
            .filter_map(|&i| self.frames.get(i))
            .map(Frame::duplicate)
            .collect();
        let n = copies.len();
        self.frames.extend(copies);
        n
    }
}

impl<'a> IntoIterator for &'a FrameStore {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

impl FromIterator<Frame> for FrameStore {
    fn from_iter<T: IntoIterator<Item = Frame>>(iter: T) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}
