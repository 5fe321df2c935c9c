#![forbid(unsafe_code)]

//! Plain-list oracle.
//!
//! Every operation here acts on a bare `Vec<T>` with the semantics of a
//! native dynamic list and reports the same [`SequenceError`]s a
//! [`HookedSequence`](hookedup::HookedSequence) with no hooks would. Slice
//! assignment uses `splice` for unit steps and per-position writes for
//! extended slices, independent of the hooked implementation.

use hookedup::{IndexOp, SequenceError, SequenceResult, Slice, clamp_insert_index, resolve_index};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceList<T> {
    items: Vec<T>,
}

impl<T: Clone> ReferenceList<T> {
    #[must_use]
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: isize) -> SequenceResult<T> {
        resolve_index(index, self.items.len())
            .map(|pos| self.items[pos].clone())
            .ok_or(SequenceError::IndexOutOfRange { op: IndexOp::Access })
    }

    pub fn get_slice(&self, slice: &Slice) -> SequenceResult<Vec<T>> {
        let range = slice.indices(self.items.len())?;
        Ok(range.positions().map(|pos| self.items[pos].clone()).collect())
    }

    pub fn append(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn insert(&mut self, index: isize, item: T) {
        let pos = clamp_insert_index(index, self.items.len());
        self.items.insert(pos, item);
    }

    pub fn pop_at(&mut self, index: isize) -> SequenceResult<T> {
        if self.items.is_empty() {
            return Err(SequenceError::PopFromEmpty);
        }
        let pos = resolve_index(index, self.items.len())
            .ok_or(SequenceError::IndexOutOfRange { op: IndexOp::Pop })?;
        Ok(self.items.remove(pos))
    }

    pub fn set(&mut self, index: isize, value: T) -> SequenceResult<()> {
        let pos = resolve_index(index, self.items.len()).ok_or(SequenceError::IndexOutOfRange {
            op: IndexOp::Assignment,
        })?;
        self.items[pos] = value;
        Ok(())
    }

    pub fn delete_at(&mut self, index: isize) -> SequenceResult<()> {
        let pos = resolve_index(index, self.items.len()).ok_or(SequenceError::IndexOutOfRange {
            op: IndexOp::Assignment,
        })?;
        self.items.remove(pos);
        Ok(())
    }

    pub fn set_slice(&mut self, slice: &Slice, replacement: Vec<T>) -> SequenceResult<()> {
        let range = slice.indices(self.items.len())?;
        if !slice.is_extended() {
            let start = range.start as usize;
            let end = range.stop.max(range.start) as usize;
            self.items.splice(start..end, replacement);
            return Ok(());
        }
        if range.len() != replacement.len() {
            return Err(SequenceError::SizeMismatch {
                replacement: replacement.len(),
                slice: range.len(),
            });
        }
        let positions: Vec<usize> = range.positions().collect();
        for (pos, value) in positions.into_iter().zip(replacement) {
            self.items[pos] = value;
        }
        Ok(())
    }

    pub fn delete_slice(&mut self, slice: &Slice) -> SequenceResult<()> {
        let range = slice.indices(self.items.len())?;
        let mut positions: Vec<usize> = range.positions().collect();
        positions.sort_unstable_by(|a, b| b.cmp(a));
        for pos in positions {
            self.items.remove(pos);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
