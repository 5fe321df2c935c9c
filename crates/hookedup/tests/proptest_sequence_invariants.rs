//! Property-based invariant tests for `HookedSequence`.
//!
//! These tests check, for arbitrary contents and operation streams, the
//! guarantees a hooked sequence gives relative to a plain `Vec`:
//!
//! 1. Reads (length, indexing, slicing, iteration, equality) match a `Vec`
//!    built from the same items.
//! 2. Every successful mutation fires its pre-hook and post-hook exactly
//!    once per affected item.
//! 3. A pre-hook that always aborts suppresses its post-hook and leaves the
//!    contents untouched; `pop` still yields the targeted item.
//! 4. Out-of-range integer indices fail with the native message and fire no
//!    hook at all.
//! 5. An empty hook table behaves exactly like a `Vec` under any stream of
//!    mutating operations.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use hookedup::{
    HookAction, HookConfig, HookPoint, HookedSequence, IndexOp, Outcome, SequenceError, Slice,
    clamp_insert_index, resolve_index,
};
use proptest::prelude::*;

// ── Helpers ──────────────────────────────────────────────────────────────

type Calls = Rc<RefCell<BTreeMap<HookPoint, usize>>>;

/// Register a counting hook at each of `points`. Pre-hooks answer `reply`.
fn counting(points: &[HookPoint], reply: Outcome) -> (HookConfig<i32>, Calls) {
    let calls: Calls = Rc::default();
    let mut config = HookConfig::<i32>::new();
    for &point in points {
        let calls = Rc::clone(&calls);
        config = config.on(point, move |_, _| {
            *calls.borrow_mut().entry(point).or_default() += 1;
            Ok(if point.is_pre() { reply } else { Outcome::Proceed })
        });
    }
    (config, calls)
}

fn count(calls: &Calls, point: HookPoint) -> usize {
    calls.borrow().get(&point).copied().unwrap_or(0)
}

fn total(calls: &Calls) -> usize {
    calls.borrow().values().sum()
}

fn points_for(action: HookAction) -> [HookPoint; 2] {
    match action {
        HookAction::Add => [HookPoint::PreAdd, HookPoint::PostAdd],
        HookAction::Remove => [HookPoint::PreRemove, HookPoint::PostRemove],
        HookAction::Replace => [HookPoint::PreReplace, HookPoint::PostReplace],
    }
}

/// Native selection of `slice` over `items`.
fn vec_slice(items: &[i32], slice: &Slice) -> Vec<i32> {
    let range = slice.indices(items.len()).unwrap();
    range.positions().map(|pos| items[pos]).collect()
}

// ── Strategies ───────────────────────────────────────────────────────────

fn items_strategy() -> impl Strategy<Value = Vec<i32>> {
    proptest::collection::vec(-50i32..50, 0..12)
}

fn slice_strategy() -> impl Strategy<Value = Slice> {
    let bound = proptest::option::of(-15isize..15);
    let step = proptest::option::of(prop_oneof![-4isize..0, 1isize..5]);
    (bound.clone(), bound, step).prop_map(|(start, stop, step)| Slice { start, stop, step })
}

fn action_strategy() -> impl Strategy<Value = HookAction> {
    prop_oneof![
        Just(HookAction::Add),
        Just(HookAction::Remove),
        Just(HookAction::Replace),
    ]
}

/// Mutations whose effect on a `Vec` is easy to state directly.
#[derive(Debug, Clone)]
enum Op {
    Append(i32),
    Insert(isize, i32),
    Pop,
    PopAt(isize),
    Remove(i32),
    Clear,
    Extend(Vec<i32>),
    Set(isize, i32),
    DeleteAt(isize),
    Repeat(isize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-50i32..50).prop_map(Op::Append),
        (-20isize..20, -50i32..50).prop_map(|(i, v)| Op::Insert(i, v)),
        Just(Op::Pop),
        (-15isize..15).prop_map(Op::PopAt),
        (-50i32..50).prop_map(Op::Remove),
        Just(Op::Clear),
        proptest::collection::vec(-50i32..50, 0..4).prop_map(Op::Extend),
        (-15isize..15, -50i32..50).prop_map(|(i, v)| Op::Set(i, v)),
        (-15isize..15).prop_map(Op::DeleteAt),
        (-1isize..3).prop_map(Op::Repeat),
    ]
}

/// Apply `op` to a plain `Vec`, returning the error message a native list
/// would raise.
fn apply_vec(items: &mut Vec<i32>, op: &Op) -> Result<(), String> {
    let assignment = || SequenceError::IndexOutOfRange {
        op: IndexOp::Assignment,
    }
    .to_string();
    match op {
        Op::Append(v) => items.push(*v),
        Op::Insert(i, v) => {
            let pos = clamp_insert_index(*i, items.len());
            items.insert(pos, *v);
        }
        Op::Pop => {
            items
                .pop()
                .ok_or_else(|| SequenceError::PopFromEmpty.to_string())?;
        }
        Op::PopAt(i) => {
            if items.is_empty() {
                return Err(SequenceError::PopFromEmpty.to_string());
            }
            let pos = resolve_index(*i, items.len())
                .ok_or_else(|| SequenceError::IndexOutOfRange { op: IndexOp::Pop }.to_string())?;
            items.remove(pos);
        }
        Op::Remove(v) => {
            let pos = items
                .iter()
                .position(|x| x == v)
                .ok_or_else(|| SequenceError::NotFound.to_string())?;
            items.remove(pos);
        }
        Op::Clear => items.clear(),
        Op::Extend(vs) => items.extend_from_slice(vs),
        Op::Set(i, v) => {
            let pos = resolve_index(*i, items.len()).ok_or_else(assignment)?;
            items[pos] = *v;
        }
        Op::DeleteAt(i) => {
            let pos = resolve_index(*i, items.len()).ok_or_else(assignment)?;
            items.remove(pos);
        }
        Op::Repeat(n) => {
            if *n <= 0 {
                items.clear();
            } else {
                *items = items.repeat(*n as usize);
            }
        }
    }
    Ok(())
}

fn apply_seq(seq: &HookedSequence<i32>, op: &Op) -> Result<(), String> {
    let result = match op {
        Op::Append(v) => seq.append(*v).map(drop),
        Op::Insert(i, v) => seq.insert(*i, *v).map(drop),
        Op::Pop => seq.pop().map(drop),
        Op::PopAt(i) => seq.pop_at(*i).map(drop),
        Op::Remove(v) => seq.remove(v).map(drop),
        Op::Clear => seq.clear(),
        Op::Extend(vs) => seq.extend(vs.iter().copied()),
        Op::Set(i, v) => seq.set(*i, *v).map(drop),
        Op::DeleteAt(i) => seq.delete_at(*i).map(drop),
        Op::Repeat(n) => seq.repeat_in_place(*n).map(drop),
    };
    result.map_err(|err| err.to_string())
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Read equivalence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn reads_match_vec(
        items in items_strategy(),
        index in -15isize..15,
        slice in slice_strategy(),
    ) {
        let seq = HookedSequence::from_items(items.clone());

        prop_assert_eq!(seq.len(), items.len());
        prop_assert_eq!(seq.is_empty(), items.is_empty());
        prop_assert_eq!(seq.to_vec(), items.clone());
        prop_assert_eq!(seq.iter().collect::<Vec<_>>(), items.clone());
        prop_assert!(seq == items);
        prop_assert_eq!(seq.first(), items.first().copied());
        prop_assert_eq!(seq.last(), items.last().copied());

        match resolve_index(index, items.len()) {
            Some(pos) => prop_assert_eq!(seq.get(index).unwrap(), items[pos]),
            None => prop_assert_eq!(
                seq.get(index).unwrap_err().to_string(),
                "list index out of range"
            ),
        }

        prop_assert_eq!(seq.get_slice(&slice).unwrap(), vec_slice(&items, &slice));

        if let Some(&probe) = items.first() {
            prop_assert!(seq.contains(&probe));
            prop_assert_eq!(seq.count(&probe), items.iter().filter(|&&x| x == probe).count());
            prop_assert_eq!(seq.position(&probe), items.iter().position(|&x| x == probe));
        }
    }

    #[test]
    fn reads_do_not_fire_hooks(items in items_strategy(), slice in slice_strategy()) {
        let (config, calls) = counting(&HookPoint::ALL, Outcome::Proceed);
        let seq = HookedSequence::with_hooks(items, config);
        let _ = seq.get(0);
        let _ = seq.get_slice(&slice);
        let _ = seq.to_vec();
        let _ = seq.iter().count();
        prop_assert_eq!(total(&calls), 0);
        prop_assert_eq!(seq.version(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Hook completeness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn each_successful_mutation_fires_once(
        action in action_strategy(),
        items in proptest::collection::vec(-50i32..50, 1..12),
        n in 1usize..8,
        only_pre in any::<bool>(),
    ) {
        let [pre, post] = points_for(action);
        let watched = if only_pre { pre } else { post };
        let (config, calls) = counting(&[watched], Outcome::Proceed);
        let seq = HookedSequence::with_hooks(items.clone(), config);

        let mut done = 0usize;
        for k in 0..n {
            let result = match action {
                HookAction::Add => seq.append(k as i32),
                HookAction::Remove if seq.is_empty() => break,
                HookAction::Remove => seq.delete_at(0),
                HookAction::Replace => seq.set(-1, k as i32),
            };
            prop_assert_eq!(result.unwrap(), Outcome::Proceed);
            done += 1;
        }

        prop_assert_eq!(count(&calls, watched), done);
        prop_assert_eq!(seq.version(), done as u64);
    }

    #[test]
    fn multi_item_operations_fire_per_item(items in items_strategy(), extra in items_strategy()) {
        let (config, calls) = counting(&HookPoint::ALL, Outcome::Proceed);
        let seq = HookedSequence::with_hooks(items.clone(), config);

        seq.extend(extra.iter().copied()).unwrap();
        prop_assert_eq!(count(&calls, HookPoint::PreAdd), extra.len());
        prop_assert_eq!(count(&calls, HookPoint::PostAdd), extra.len());

        seq.clear().unwrap();
        let removed = items.len() + extra.len();
        prop_assert_eq!(count(&calls, HookPoint::PreRemove), removed);
        prop_assert_eq!(count(&calls, HookPoint::PostRemove), removed);
        prop_assert!(seq.is_empty());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Abort suppresses post and preserves state
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn vetoes_preserve_contents(
        items in proptest::collection::vec(-50i32..50, 1..12),
        ops in proptest::collection::vec(op_strategy(), 1..10),
        slice in slice_strategy(),
    ) {
        let (config, calls) = counting(&HookPoint::ALL, Outcome::Abort);
        let seq = HookedSequence::with_hooks(items.clone(), config);

        for op in &ops {
            let _ = apply_seq(&seq, op);
        }
        let _ = seq.delete_slice(&slice);
        let _ = seq.set_slice(&Slice::new(0, 2), [7, 8, 9]);

        prop_assert_eq!(seq.to_vec(), items);
        prop_assert_eq!(seq.version(), 0);
        for point in HookPoint::ALL {
            if !point.is_pre() {
                prop_assert_eq!(count(&calls, point), 0, "{} fired after a veto", point);
            }
        }
        let vetoes: u64 = seq.abort_counts().values().sum();
        prop_assert_eq!(vetoes as usize, total(&calls));
    }

    #[test]
    fn vetoed_pop_still_yields_target(
        items in proptest::collection::vec(-50i32..50, 1..12),
        index in -12isize..12,
    ) {
        let (config, _calls) = counting(&[HookPoint::PreRemove], Outcome::Abort);
        let seq = HookedSequence::with_hooks(items.clone(), config);
        if let Some(pos) = resolve_index(index, items.len()) {
            prop_assert_eq!(seq.pop_at(index).unwrap(), items[pos]);
        }
        prop_assert_eq!(seq.pop().unwrap(), *items.last().unwrap());
        prop_assert_eq!(seq.to_vec(), items);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Bounds parity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn out_of_range_fires_no_hook(items in items_strategy()) {
        let k = items.len() as isize;
        let (config, calls) = counting(&HookPoint::ALL, Outcome::Proceed);
        let seq = HookedSequence::with_hooks(items.clone(), config);

        for index in [k, -k - 1, k + 3] {
            prop_assert_eq!(
                seq.get(index).unwrap_err().to_string(),
                "list index out of range"
            );
            prop_assert_eq!(
                seq.set(index, 0).unwrap_err().to_string(),
                "list assignment index out of range"
            );
            prop_assert_eq!(
                seq.delete_at(index).unwrap_err().to_string(),
                "list assignment index out of range"
            );
            let expected = if items.is_empty() {
                "pop from empty list"
            } else {
                "pop index out of range"
            };
            prop_assert_eq!(seq.pop_at(index).unwrap_err().to_string(), expected);
        }

        prop_assert_eq!(total(&calls), 0);
        prop_assert_eq!(seq.to_vec(), items);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Empty hook table equals a plain Vec
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn empty_config_matches_vec(
        items in items_strategy(),
        ops in proptest::collection::vec(op_strategy(), 0..24),
    ) {
        let mut model = items.clone();
        let plain = HookedSequence::from_items(items.clone());
        let configured = HookedSequence::with_hooks(items, HookConfig::new());

        for op in &ops {
            let expected = apply_vec(&mut model, op);
            prop_assert_eq!(apply_seq(&plain, op), expected.clone(), "op {:?}", op);
            prop_assert_eq!(apply_seq(&configured, op), expected, "op {:?}", op);
            prop_assert_eq!(plain.to_vec(), model.clone());
            prop_assert_eq!(configured.to_vec(), model.clone());
        }
        prop_assert_eq!(plain.abort_counts().values().sum::<u64>(), 0);
    }
}
