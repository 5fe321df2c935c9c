#![forbid(unsafe_code)]

//! Observable list with vetoable structural mutations.
//!
//! # Design
//!
//! [`HookedSequence<T>`] wraps a `Vec<T>` in shared, reference-counted
//! storage (`Rc<..>` with a `RefCell` around the items). Reads behave like a
//! native list. Every structural mutation (add, remove, replace) runs the
//! pre-hook for that action first; if it proceeds, storage is mutated and
//! the post-hook fires. A vetoed item is left exactly as it was.
//!
//! Multi-item operations (`clear`, `extend`, slice assignment and deletion,
//! repetition) apply that protocol per item. A veto on one item does not
//! roll back or block its siblings.
//!
//! # Performance
//!
//! | Operation        | Complexity                      |
//! |------------------|---------------------------------|
//! | `get()` / `len()`| O(1)                            |
//! | `append()`       | O(1) amortized + hook cost      |
//! | `insert()`       | O(n) + hook cost                |
//! | `set_slice()`    | O(n * k) for k affected items   |
//! | Memory           | ~64 bytes + items + hook table  |
//!
//! # Failure Modes
//!
//! - **Reentrant mutation**: hooks receive the sequence handle and may
//!   mutate it. No storage borrow is held while a hook runs, and every loop
//!   re-reads the live length, so reentrant changes are visible to the
//!   remaining steps of the outer operation. If a hook shrinks the sequence
//!   so that a pending slice position no longer exists, the loop stops.
//! - **Hook failure**: a [`HookError`](crate::HookError) propagates as
//!   [`SequenceError::Hook`]. An error from a pre-hook leaves the item
//!   untouched; an error from a post-hook arrives after the mutation
//!   committed.
//! - **`with()` reentrancy**: mutating the sequence from inside the closure
//!   given to [`HookedSequence::with`] panics (RefCell borrow rules).

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{IndexOp, SequenceError, SequenceResult};
use crate::hooks::{HookArgs, HookConfig, HookPoint, HookRegistry, Outcome};
use crate::slice::{SeqIndex, Slice, clamp_insert_index, resolve_index};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a sequence, shared by all of its handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceId(u64);

impl SequenceId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq#{}", self.0)
    }
}

/// Shared interior for [`HookedSequence<T>`].
struct Shared<T> {
    id: SequenceId,
    items: RefCell<Vec<T>>,
    registry: HookRegistry<T>,
    /// Committed structural mutations.
    version: Cell<u64>,
}

/// An ordered container whose structural mutations pass through hooks.
///
/// Cloning a `HookedSequence` creates a new handle to the **same** storage,
/// hooks, and counters.
///
/// # Invariants
///
/// 1. `len()` is always the true number of stored items.
/// 2. Per item: either the pre-hook proceeds, storage changes, and the
///    post-hook fires, or the pre-hook aborts and neither happens.
/// 3. Index and slice validation happens before any hook runs; no hook
///    fires for an out-of-range access.
/// 4. `version` increments by exactly 1 per committed item mutation.
pub struct HookedSequence<T> {
    shared: Rc<Shared<T>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for HookedSequence<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for HookedSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookedSequence")
            .field("id", &self.shared.id)
            .field("items", &*self.shared.items.borrow())
            .field("version", &self.shared.version.get())
            .field("hooks", self.shared.registry.config())
            .field("aborts", &self.shared.registry.aborts().snapshot())
            .finish()
    }
}

impl<T> Default for HookedSequence<T> {
    fn default() -> Self {
        Self::with_hooks(Vec::new(), HookConfig::new())
    }
}

impl<T> HookedSequence<T> {
    /// Empty sequence without hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence holding `items`, without hooks.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        Self::with_hooks(items, HookConfig::new())
    }

    /// Sequence holding `items` with the given hook table.
    ///
    /// Initial items are stored directly; no hook fires for them.
    pub fn with_hooks(items: impl IntoIterator<Item = T>, hooks: HookConfig<T>) -> Self {
        Self {
            shared: Rc::new(Shared {
                id: SequenceId::next(),
                items: RefCell::new(items.into_iter().collect()),
                registry: HookRegistry::new(hooks),
                version: Cell::new(0),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> SequenceId {
        self.shared.id
    }

    /// True when both handles point at the same sequence.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// The hook table fixed at construction.
    #[must_use]
    pub fn hooks(&self) -> &HookConfig<T> {
        self.shared.registry.config()
    }

    /// How many times the pre-hook at `point` vetoed an action.
    ///
    /// Always 0 for post-hook points.
    #[must_use]
    pub fn abort_count(&self, point: HookPoint) -> u64 {
        self.shared.registry.aborts().get(point)
    }

    /// Veto counts for every pre-hook point.
    #[must_use]
    pub fn abort_counts(&self) -> BTreeMap<HookPoint, u64> {
        self.shared.registry.aborts().snapshot()
    }

    /// Number of committed item mutations since construction.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.version.get()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.items.borrow().is_empty()
    }

    /// Access the items by reference without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` mutates this sequence.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.shared.items.borrow())
    }

    fn bump_version(&self) {
        self.shared.version.set(self.shared.version.get() + 1);
    }

    fn invoke(&self, point: HookPoint, args: HookArgs<'_, T>) -> SequenceResult<Outcome> {
        self.shared.registry.invoke(self, point, args)
    }
}

impl<T: Clone> HookedSequence<T> {
    // ── Reads ────────────────────────────────────────────────────────────

    /// Item at `index`; negative indices count from the end.
    ///
    /// # Errors
    ///
    /// `list index out of range` outside `[-len, len)`.
    pub fn get(&self, index: isize) -> SequenceResult<T> {
        let items = self.shared.items.borrow();
        resolve_index(index, items.len())
            .map(|pos| items[pos].clone())
            .ok_or(SequenceError::IndexOutOfRange { op: IndexOp::Access })
    }

    /// Items selected by `slice`.
    ///
    /// # Errors
    ///
    /// `slice step cannot be zero`.
    pub fn get_slice(&self, slice: &Slice) -> SequenceResult<Vec<T>> {
        let items = self.shared.items.borrow();
        let range = slice.indices(items.len())?;
        Ok(range.positions().map(|pos| items[pos].clone()).collect())
    }

    #[must_use]
    pub fn first(&self) -> Option<T> {
        self.shared.items.borrow().first().cloned()
    }

    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.shared.items.borrow().last().cloned()
    }

    /// Snapshot of the current items.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.shared.items.borrow().clone()
    }

    /// Iterate over a snapshot; later mutations do not affect it.
    #[must_use]
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.to_vec().into_iter()
    }

    fn item_at(&self, pos: usize) -> Option<T> {
        self.shared.items.borrow().get(pos).cloned()
    }

    // ── Add ──────────────────────────────────────────────────────────────

    /// Append `item` unless `pre_add` vetoes.
    ///
    /// # Errors
    ///
    /// Propagates hook failures.
    pub fn append(&self, item: T) -> SequenceResult<Outcome> {
        self.add(None, item)
    }

    /// Insert `item` before `index` unless `pre_add` vetoes.
    ///
    /// Out-of-range indices clamp to the nearest end, as a native insert.
    ///
    /// # Errors
    ///
    /// Propagates hook failures.
    pub fn insert(&self, index: isize, item: T) -> SequenceResult<Outcome> {
        self.add(Some(index), item)
    }

    fn add(&self, index: Option<isize>, item: T) -> SequenceResult<Outcome> {
        if self.invoke(HookPoint::PreAdd, HookArgs::Add { item: &item })?.is_abort() {
            return Ok(Outcome::Abort);
        }
        let added = item.clone();
        {
            let mut items = self.shared.items.borrow_mut();
            let pos = index.map_or(items.len(), |i| clamp_insert_index(i, items.len()));
            items.insert(pos, item);
        }
        self.bump_version();
        self.invoke(HookPoint::PostAdd, HookArgs::Add { item: &added })?;
        Ok(Outcome::Proceed)
    }

    /// Append every item of `items`, one at a time, each through `pre_add`.
    ///
    /// Partial extension is possible when hooks start vetoing midway.
    ///
    /// # Errors
    ///
    /// Propagates the first hook failure; items appended before it stay.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) -> SequenceResult<()> {
        let _span = tracing::debug_span!("hooked_sequence.extend", id = %self.id()).entered();
        for item in items {
            self.append(item)?;
        }
        Ok(())
    }

    /// In-place concatenation (`+=`). Same as [`extend`](Self::extend) but
    /// hands back the sequence itself.
    ///
    /// # Errors
    ///
    /// Propagates hook failures.
    pub fn concat_in_place(&self, items: impl IntoIterator<Item = T>) -> SequenceResult<&Self> {
        self.extend(items)?;
        Ok(self)
    }

    /// In-place repetition (`*=`).
    ///
    /// `times <= 0` clears the sequence. For `times > 1` the current items
    /// are snapshotted once and appended `times - 1` times, so hooks that
    /// add items cannot feed the repetition.
    ///
    /// # Errors
    ///
    /// Propagates hook failures.
    pub fn repeat_in_place(&self, times: isize) -> SequenceResult<&Self> {
        let _span =
            tracing::debug_span!("hooked_sequence.repeat", id = %self.id(), times).entered();
        if times <= 0 {
            self.clear()?;
        } else if times > 1 {
            let snapshot = self.to_vec();
            if snapshot.is_empty() {
                return Ok(self);
            }
            for _ in 1..times {
                self.extend(snapshot.iter().cloned())?;
            }
        }
        Ok(self)
    }

    // ── Remove ───────────────────────────────────────────────────────────

    /// Remove and return the last item.
    ///
    /// A veto from `pre_remove` still returns the item, but leaves it in
    /// place.
    ///
    /// # Errors
    ///
    /// `pop from empty list`, or hook failures.
    pub fn pop(&self) -> SequenceResult<T> {
        self.pop_at(-1)
    }

    /// Remove and return the item at `index`.
    ///
    /// A veto from `pre_remove` still returns the item, but leaves it in
    /// place.
    ///
    /// # Errors
    ///
    /// `pop from empty list`, `pop index out of range`, or hook failures.
    pub fn pop_at(&self, index: isize) -> SequenceResult<T> {
        self.take(index, IndexOp::Pop).map(|(item, _)| item)
    }

    /// Delete the item at `index` unless `pre_remove` vetoes.
    ///
    /// # Errors
    ///
    /// `list assignment index out of range`, or hook failures.
    pub fn delete_at(&self, index: isize) -> SequenceResult<Outcome> {
        self.take(index, IndexOp::Assignment).map(|(_, outcome)| outcome)
    }

    /// Shared path for `pop_at` and `delete_at`: validate, consult
    /// `pre_remove`, remove. Returns the targeted item either way.
    fn take(&self, index: isize, op: IndexOp) -> SequenceResult<(T, Outcome)> {
        let out_of_range = || {
            if op == IndexOp::Pop && self.is_empty() {
                SequenceError::PopFromEmpty
            } else {
                SequenceError::IndexOutOfRange { op }
            }
        };
        let len = self.len();
        let target = resolve_index(index, len)
            .and_then(|pos| self.item_at(pos))
            .ok_or_else(out_of_range)?;

        if self
            .invoke(HookPoint::PreRemove, HookArgs::Remove { item: &target })?
            .is_abort()
        {
            return Ok((target, Outcome::Abort));
        }

        let removed = {
            let mut items = self.shared.items.borrow_mut();
            match resolve_index(index, items.len()) {
                Some(pos) => items.remove(pos),
                None => {
                    drop(items);
                    return Err(out_of_range());
                }
            }
        };
        self.bump_version();
        self.invoke(HookPoint::PostRemove, HookArgs::Remove { item: &removed })?;
        Ok((removed, Outcome::Proceed))
    }

    /// Remove whatever currently sits at `pos` through the remove protocol.
    ///
    /// Returns `None` when `pos` is past the live end.
    fn remove_live(&self, pos: usize) -> SequenceResult<Option<Outcome>> {
        let Some(item) = self.item_at(pos) else {
            return Ok(None);
        };
        if self
            .invoke(HookPoint::PreRemove, HookArgs::Remove { item: &item })?
            .is_abort()
        {
            return Ok(Some(Outcome::Abort));
        }
        let removed = {
            let mut items = self.shared.items.borrow_mut();
            if pos >= items.len() {
                return Ok(None);
            }
            items.remove(pos)
        };
        self.bump_version();
        self.invoke(HookPoint::PostRemove, HookArgs::Remove { item: &removed })?;
        Ok(Some(Outcome::Proceed))
    }

    /// Remove items at `positions` (slice order, original coordinates).
    ///
    /// Ascending walks compensate for earlier successful removals; a veto
    /// skips its position and is never retried.
    fn remove_positions(&self, positions: &[usize], ascending: bool) -> SequenceResult<()> {
        let mut removed = 0usize;
        for &pos in positions {
            let live = if ascending { pos - removed } else { pos };
            match self.remove_live(live)? {
                Some(Outcome::Proceed) => removed += 1,
                Some(Outcome::Abort) => {}
                None => {
                    tracing::debug!(
                        position = live,
                        len = self.len(),
                        "sequence shrank under slice removal, stopping"
                    );
                    break;
                }
            }
        }
        Ok(())
    }

    /// Remove every item, front to back, each through `pre_remove`.
    ///
    /// Vetoed items stay, in their original relative order.
    ///
    /// # Errors
    ///
    /// Propagates hook failures.
    pub fn clear(&self) -> SequenceResult<()> {
        let _span =
            tracing::debug_span!("hooked_sequence.clear", id = %self.id(), len = self.len())
                .entered();
        let mut cursor = 0usize;
        while let Some(outcome) = self.remove_live(cursor)? {
            if outcome.is_abort() {
                cursor += 1;
            }
        }
        Ok(())
    }

    /// Delete the items selected by `slice`, each through `pre_remove`.
    ///
    /// # Errors
    ///
    /// `slice step cannot be zero`, or hook failures.
    pub fn delete_slice(&self, slice: &Slice) -> SequenceResult<()> {
        let range = slice.indices(self.len())?;
        let _span = tracing::debug_span!(
            "hooked_sequence.delete_slice",
            id = %self.id(),
            %slice,
            selected = range.len()
        )
        .entered();
        let positions: Vec<usize> = range.positions().collect();
        self.remove_positions(&positions, range.is_ascending())
    }

    /// Delete by integer index or slice.
    ///
    /// # Errors
    ///
    /// See [`delete_at`](Self::delete_at) and
    /// [`delete_slice`](Self::delete_slice).
    pub fn delete(&self, index: impl Into<SeqIndex>) -> SequenceResult<()> {
        match index.into() {
            SeqIndex::Index(i) => self.delete_at(i).map(|_| ()),
            SeqIndex::Slice(slice) => self.delete_slice(&slice),
        }
    }

    // ── Replace ──────────────────────────────────────────────────────────

    /// Replace the item at `index` unless `pre_replace` vetoes.
    ///
    /// # Errors
    ///
    /// `list assignment index out of range`, or hook failures.
    pub fn set(&self, index: isize, value: T) -> SequenceResult<Outcome> {
        let out_of_range = || SequenceError::IndexOutOfRange {
            op: IndexOp::Assignment,
        };
        let pos = resolve_index(index, self.len()).ok_or_else(out_of_range)?;
        self.replace_live(pos, value)?.ok_or_else(out_of_range)
    }

    /// Replace the item at live position `pos`.
    ///
    /// Returns `None` when `pos` is past the end, either up front or after
    /// `pre_replace` shrank the sequence.
    fn replace_live(&self, pos: usize, value: T) -> SequenceResult<Option<Outcome>> {
        let Some(old) = self.item_at(pos) else {
            return Ok(None);
        };

        let args = HookArgs::Replace {
            old: &old,
            new: &value,
        };
        if self.invoke(HookPoint::PreReplace, args)?.is_abort() {
            return Ok(Some(Outcome::Abort));
        }

        let displaced = {
            let mut items = self.shared.items.borrow_mut();
            let Some(slot) = items.get_mut(pos) else {
                return Ok(None);
            };
            std::mem::replace(slot, value.clone())
        };
        self.bump_version();
        self.invoke(
            HookPoint::PostReplace,
            HookArgs::Replace {
                old: &displaced,
                new: &value,
            },
        )?;
        Ok(Some(Outcome::Proceed))
    }

    /// Assign `replacement` to the items selected by `slice`.
    ///
    /// 1. Extended slices (step given and not 1) require a replacement of
    ///    exactly the selected length; a mismatch fails before any hook.
    /// 2. Selected positions and replacement items are paired and replaced
    ///    one by one through `pre_replace`. If a hook shrinks the sequence
    ///    past a pending position, assignment stops there.
    /// 3. Surplus selected positions are removed through `pre_remove`.
    /// 4. Surplus replacement items are inserted, in order, just past the
    ///    last replaced position through `pre_add`.
    ///
    /// # Errors
    ///
    /// `slice step cannot be zero`, `attempt to assign sequence of size R to
    /// extended slice of size S`, or hook failures.
    pub fn set_slice(
        &self,
        slice: &Slice,
        replacement: impl IntoIterator<Item = T>,
    ) -> SequenceResult<()> {
        let replacement: Vec<T> = replacement.into_iter().collect();
        let range = slice.indices(self.len())?;
        if slice.is_extended() && range.len() != replacement.len() {
            return Err(SequenceError::SizeMismatch {
                replacement: replacement.len(),
                slice: range.len(),
            });
        }
        let _span = tracing::debug_span!(
            "hooked_sequence.set_slice",
            id = %self.id(),
            %slice,
            selected = range.len(),
            replacement = replacement.len()
        )
        .entered();

        let positions: Vec<usize> = range.positions().collect();
        let paired = positions.len().min(replacement.len());
        let mut values = replacement.into_iter();

        for &pos in &positions[..paired] {
            let Some(value) = values.next() else { break };
            if self.replace_live(pos, value)?.is_none() {
                tracing::debug!(
                    position = pos,
                    len = self.len(),
                    "sequence shrank under slice assignment, stopping"
                );
                return Ok(());
            }
        }

        if positions.len() > paired {
            return self.remove_positions(&positions[paired..], range.is_ascending());
        }

        // Only unit-step slices reach here with surplus items, so the
        // insertion point is contiguous with the replaced run.
        let mut cursor = range.start + paired as isize;
        for value in values {
            if self.add(Some(cursor), value)?.is_proceed() {
                cursor += 1;
            }
        }
        Ok(())
    }
}

impl<T: Clone + PartialEq> HookedSequence<T> {
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.shared.items.borrow().contains(item)
    }

    /// Number of items equal to `item`.
    #[must_use]
    pub fn count(&self, item: &T) -> usize {
        self.shared
            .items
            .borrow()
            .iter()
            .filter(|x| *x == item)
            .count()
    }

    /// Position of the first item equal to `item`.
    #[must_use]
    pub fn position(&self, item: &T) -> Option<usize> {
        self.shared.items.borrow().iter().position(|x| x == item)
    }

    /// Remove the first item equal to `item` unless `pre_remove` vetoes.
    ///
    /// # Errors
    ///
    /// `list.remove(x): x not in list` (checked before any hook), or hook
    /// failures.
    pub fn remove(&self, item: &T) -> SequenceResult<Outcome> {
        if !self.contains(item) {
            return Err(SequenceError::NotFound);
        }
        if self
            .invoke(HookPoint::PreRemove, HookArgs::Remove { item })?
            .is_abort()
        {
            return Ok(Outcome::Abort);
        }
        let removed = {
            let mut items = self.shared.items.borrow_mut();
            let pos = items
                .iter()
                .position(|x| x == item)
                .ok_or(SequenceError::NotFound)?;
            items.remove(pos)
        };
        self.bump_version();
        self.invoke(HookPoint::PostRemove, HookArgs::Remove { item: &removed })?;
        Ok(Outcome::Proceed)
    }
}

impl<T> FromIterator<T> for HookedSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

impl<T> From<Vec<T>> for HookedSequence<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_items(items)
    }
}

impl<T: Clone> IntoIterator for &HookedSequence<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq<U>, U> PartialEq<HookedSequence<U>> for HookedSequence<T> {
    fn eq(&self, other: &HookedSequence<U>) -> bool {
        *self.shared.items.borrow() == *other.shared.items.borrow()
    }
}

impl<T: PartialEq<U>, U> PartialEq<Vec<U>> for HookedSequence<T> {
    fn eq(&self, other: &Vec<U>) -> bool {
        *self.shared.items.borrow() == *other
    }
}

impl<T: PartialEq<U>, U> PartialEq<[U]> for HookedSequence<T> {
    fn eq(&self, other: &[U]) -> bool {
        self.shared.items.borrow().as_slice() == other
    }
}

impl<T: PartialEq<U>, U> PartialEq<&[U]> for HookedSequence<T> {
    fn eq(&self, other: &&[U]) -> bool {
        self.shared.items.borrow().as_slice() == *other
    }
}

impl<T: PartialEq<U>, U, const N: usize> PartialEq<[U; N]> for HookedSequence<T> {
    fn eq(&self, other: &[U; N]) -> bool {
        self.shared.items.borrow().as_slice() == other.as_slice()
    }
}

impl<T: PartialEq<U>, U> PartialEq<HookedSequence<U>> for Vec<T> {
    fn eq(&self, other: &HookedSequence<U>) -> bool {
        *self == *other.shared.items.borrow()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
