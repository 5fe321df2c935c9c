#![forbid(unsafe_code)]

//! Observable mutable sequences with vetoable hooks.
//!
//! This crate provides a list type that behaves like a native dynamic list
//! for reads, indexing and slicing, while routing every structural mutation
//! through user-supplied callbacks:
//!
//! - [`HookedSequence`]: shared, list-like storage that fires hooks around
//!   every add, remove and replace.
//! - [`HookConfig`]: the table of optional pre/post hooks for the three
//!   mutation actions.
//! - [`Slice`] / [`SeqIndex`]: index expressions with native list semantics
//!   (negative indices, clamped bounds, extended slices).
//! - [`AttributeGuard`]: named slots that refuse to silently rebind a
//!   hooked sequence.
//!
//! # Invariants
//!
//! 1. With an empty [`HookConfig`], every operation yields exactly the
//!    contents and errors a plain list would.
//! 2. Each item added, removed or replaced passes through the matching
//!    pre-hook exactly once; a proceeding pre-hook is followed by exactly
//!    one post-hook for that item.
//! 3. A vetoed item is left unchanged and bumps the abort counter for its
//!    pre-hook point. Vetoes never raise.
//! 4. Validation errors (bounds, slice shape, zero step, missing item) are
//!    raised before any hook fires.
//!
//! # Example
//!
//! ```
//! use hookedup::{HookConfig, HookedSequence, Outcome};
//!
//! let capped = HookConfig::<u32>::new().pre_add(|seq, _| {
//!     Ok(if seq.len() >= 2 { Outcome::Abort } else { Outcome::Proceed })
//! });
//! let seq = HookedSequence::with_hooks([], capped);
//! seq.extend([1, 2, 3]).unwrap();
//! assert_eq!(seq, [1, 2]);
//! assert_eq!(seq.abort_count(hookedup::HookPoint::PreAdd), 1);
//! ```

pub mod error;
pub mod guard;
pub mod hooks;
pub mod sequence;
pub mod slice;

pub use error::{ErrorKind, IndexOp, SequenceError, SequenceResult};
pub use guard::{AttributeGuard, Bindable, GuardError};
pub use hooks::{
    Hook, HookAction, HookArgs, HookConfig, HookError, HookPoint, HookResult, Outcome,
    UnknownHookPoint, hook,
};
pub use sequence::{HookedSequence, SequenceId};
pub use slice::{SeqIndex, Slice, SliceRange, clamp_insert_index, resolve_index};
