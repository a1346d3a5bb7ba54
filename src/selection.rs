use std::collections::BTreeSet;

/// Multi-select set of indices into the current frame sequence.
///
/// Indices are only meaningful until the next structural edit; the session clears the selection
/// whenever the sequence is moved, deleted from, duplicated into or appended to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    indices: BTreeSet<usize>,
}

impl Selection {
    /// Non-additive: select exactly `index`. Additive: flip membership of `index`.
    pub fn toggle(&mut self, index: usize, additive: bool) {
        if !additive {
            self.indices.clear();
            self.indices.insert(index);
        } else if !self.indices.remove(&index) {
            self.indices.insert(index);
        }
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn indices(&self) -> &BTreeSet<usize> {
        &self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_click_replaces_selection() {
        let mut s = Selection::default();
        s.toggle(1, true);
        s.toggle(4, true);
        s.toggle(2, false);
        assert_eq!(s.indices().iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn additive_click_flips_membership() {
        let mut s = Selection::default();
        s.toggle(3, true);
        s.toggle(5, true);
        assert!(s.contains(3) && s.contains(5));
        s.toggle(3, true);
        assert!(!s.contains(3));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn plain_click_on_sole_selection_keeps_it() {
        let mut s = Selection::default();
        s.toggle(0, false);
        s.toggle(0, false);
        assert!(s.contains(0));
    }
}
