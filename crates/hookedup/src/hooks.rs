#![forbid(unsafe_code)]

//! Hook points, hook configuration, and the abort protocol.
//!
//! # Design
//!
//! A [`HookConfig<T>`] is a fixed-shape table with one optional callback per
//! [`HookPoint`]. Empty slots behave as a no-op that always proceeds.
//!
//! Pre-hooks decide whether a mutation happens by returning an [`Outcome`].
//! `Outcome::Abort` is the veto signal: the mutation is skipped, the
//! matching post-hook does not fire, and the abort counter for that point is
//! bumped. A genuine failure is returned as [`HookError`] and propagates to
//! the caller of the mutating method unchanged.
//!
//! Post-hooks run after the mutation has committed. Their outcome is
//! ignored; only an error propagates.
//!
//! # Failure Modes
//!
//! - **Unknown configuration key**: [`HookConfig::from_named`] skips it and
//!   emits a `warn` event naming every rejected key. Construction still
//!   succeeds.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::error::{SequenceError, SequenceResult};
use crate::sequence::HookedSequence;

/// Places where a hook can be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookPoint {
    /// Before an item is added. May veto.
    PreAdd,
    /// After an item was added.
    PostAdd,
    /// Before an item is removed. May veto.
    PreRemove,
    /// After an item was removed.
    PostRemove,
    /// Before an item is replaced. May veto.
    PreReplace,
    /// After an item was replaced.
    PostReplace,
}

/// The structural action a hook point guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookAction {
    Add,
    Remove,
    Replace,
}

impl HookPoint {
    /// Every hook point, pre before post, in action order.
    pub const ALL: [HookPoint; 6] = [
        HookPoint::PreAdd,
        HookPoint::PostAdd,
        HookPoint::PreRemove,
        HookPoint::PostRemove,
        HookPoint::PreReplace,
        HookPoint::PostReplace,
    ];

    /// The pre-action points, the only ones that can veto.
    pub const PRE: [HookPoint; 3] = [
        HookPoint::PreAdd,
        HookPoint::PreRemove,
        HookPoint::PreReplace,
    ];

    /// Canonical configuration key.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PreAdd => "pre_add",
            Self::PostAdd => "post_add",
            Self::PreRemove => "pre_remove",
            Self::PostRemove => "post_remove",
            Self::PreReplace => "pre_replace",
            Self::PostReplace => "post_replace",
        }
    }

    #[must_use]
    pub const fn action(self) -> HookAction {
        match self {
            Self::PreAdd | Self::PostAdd => HookAction::Add,
            Self::PreRemove | Self::PostRemove => HookAction::Remove,
            Self::PreReplace | Self::PostReplace => HookAction::Replace,
        }
    }

    /// True for the vetoing half of a pair.
    #[must_use]
    pub const fn is_pre(self) -> bool {
        matches!(self, Self::PreAdd | Self::PreRemove | Self::PreReplace)
    }

    /// Post-action point paired with this one.
    #[must_use]
    pub const fn post(self) -> HookPoint {
        match self.action() {
            HookAction::Add => Self::PostAdd,
            HookAction::Remove => Self::PostRemove,
            HookAction::Replace => Self::PostReplace,
        }
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized hook configuration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownHookPoint {
    pub name: String,
}

impl fmt::Display for UnknownHookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown hook point '{}'", self.name)
    }
}

impl std::error::Error for UnknownHookPoint {}

impl FromStr for HookPoint {
    type Err = UnknownHookPoint;

    /// Accepts the canonical `pre_add` form and the hyphenated `pre-add`
    /// alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|point| point.name() == normalized)
            .ok_or_else(|| UnknownHookPoint {
                name: s.to_string(),
            })
    }
}

/// Arguments handed to a hook.
pub enum HookArgs<'a, T> {
    /// Item being (or just) added.
    Add { item: &'a T },
    /// Item being (or just) removed.
    Remove { item: &'a T },
    /// Item at a position and the value replacing it.
    Replace { old: &'a T, new: &'a T },
}

impl<'a, T> HookArgs<'a, T> {
    /// The item the action is about: the added or removed item, or the
    /// incoming value of a replacement.
    #[must_use]
    pub fn item(&self) -> &'a T {
        match *self {
            Self::Add { item } | Self::Remove { item } => item,
            Self::Replace { new, .. } => new,
        }
    }

    /// The outgoing value of a replacement.
    #[must_use]
    pub fn replaced(&self) -> Option<&'a T> {
        match *self {
            Self::Replace { old, .. } => Some(old),
            _ => None,
        }
    }

    #[must_use]
    pub fn action(&self) -> HookAction {
        match self {
            Self::Add { .. } => HookAction::Add,
            Self::Remove { .. } => HookAction::Remove,
            Self::Replace { .. } => HookAction::Replace,
        }
    }
}

impl<T> Clone for HookArgs<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for HookArgs<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for HookArgs<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { item } => f.debug_struct("Add").field("item", item).finish(),
            Self::Remove { item } => f.debug_struct("Remove").field("item", item).finish(),
            Self::Replace { old, new } => f
                .debug_struct("Replace")
                .field("old", old)
                .field("new", new)
                .finish(),
        }
    }
}

/// What a hook decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Outcome {
    /// Let the action happen.
    #[default]
    Proceed,
    /// Veto the action. Only meaningful from a pre-hook.
    Abort,
}

impl Outcome {
    #[must_use]
    pub const fn is_abort(self) -> bool {
        matches!(self, Self::Abort)
    }

    #[must_use]
    pub const fn is_proceed(self) -> bool {
        matches!(self, Self::Proceed)
    }
}

/// A genuine hook failure, distinct from the abort signal.
pub struct HookError {
    inner: Box<dyn std::error::Error + 'static>,
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

impl HookError {
    /// Wrap an existing error.
    pub fn new<E: std::error::Error + 'static>(error: E) -> Self {
        Self {
            inner: Box::new(error),
        }
    }

    /// Error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Recover the concrete error a hook returned.
    #[must_use]
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}

impl fmt::Debug for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HookError").field(&self.inner).finish()
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for HookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Return type of every hook.
pub type HookResult = Result<Outcome, HookError>;

/// A hook callback. Receives the sequence handle, so it may inspect or
/// mutate the container before deciding.
pub type Hook<T> = Rc<dyn Fn(&HookedSequence<T>, HookArgs<'_, T>) -> HookResult>;

/// Box a closure as a [`Hook`].
pub fn hook<T, F>(f: F) -> Hook<T>
where
    F: Fn(&HookedSequence<T>, HookArgs<'_, T>) -> HookResult + 'static,
{
    Rc::new(f)
}

/// Hook table for a [`HookedSequence`]. Fixed once the sequence is built.
pub struct HookConfig<T> {
    slots: [Option<Hook<T>>; 6],
    unrecognized: Vec<String>,
}

impl<T> Default for HookConfig<T> {
    fn default() -> Self {
        Self {
            slots: Default::default(),
            unrecognized: Vec::new(),
        }
    }
}

// Manual Clone: hooks are shared `Rc`s, `T` need not be `Clone`.
impl<T> Clone for HookConfig<T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            unrecognized: self.unrecognized.clone(),
        }
    }
}

impl<T> fmt::Debug for HookConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<&str> = self.registered().map(HookPoint::name).collect();
        f.debug_struct("HookConfig")
            .field("registered", &registered)
            .field("unrecognized", &self.unrecognized)
            .finish()
    }
}

impl<T> HookConfig<T> {
    /// Empty table: every action proceeds, nothing observes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, hook)` pairs.
    ///
    /// Keys are matched against the canonical names (`pre_add`, ...) and the
    /// hyphenated aliases. Unrecognized keys are skipped with a warning and
    /// kept in [`unrecognized`](Self::unrecognized).
    pub fn from_named<I, K>(hooks: I) -> Self
    where
        I: IntoIterator<Item = (K, Hook<T>)>,
        K: AsRef<str>,
    {
        let mut config = Self::new();
        for (key, hook) in hooks {
            let key = key.as_ref();
            match key.parse::<HookPoint>() {
                Ok(point) => config.slots[point.slot()] = Some(hook),
                Err(_) => config.unrecognized.push(key.to_string()),
            }
        }
        if !config.unrecognized.is_empty() {
            tracing::warn!(
                keys = ?config.unrecognized,
                "ignoring unrecognized hook configuration keys"
            );
        }
        config
    }

    /// Install `hook` at `point`, replacing any previous one.
    #[must_use]
    pub fn with(mut self, point: HookPoint, hook: Hook<T>) -> Self {
        self.slots[point.slot()] = Some(hook);
        self
    }

    /// Install a closure at `point`.
    #[must_use]
    pub fn on<F>(self, point: HookPoint, f: F) -> Self
    where
        F: Fn(&HookedSequence<T>, HookArgs<'_, T>) -> HookResult + 'static,
    {
        self.with(point, Rc::new(f))
    }

    #[must_use]
    pub fn pre_add<F>(self, f: F) -> Self
    where
        F: Fn(&HookedSequence<T>, HookArgs<'_, T>) -> HookResult + 'static,
    {
        self.on(HookPoint::PreAdd, f)
    }

    #[must_use]
    pub fn post_add<F>(self, f: F) -> Self
    where
        F: Fn(&HookedSequence<T>, HookArgs<'_, T>) -> HookResult + 'static,
    {
        self.on(HookPoint::PostAdd, f)
    }

    #[must_use]
    pub fn pre_remove<F>(self, f: F) -> Self
    where
        F: Fn(&HookedSequence<T>, HookArgs<'_, T>) -> HookResult + 'static,
    {
        self.on(HookPoint::PreRemove, f)
    }

    #[must_use]
    pub fn post_remove<F>(self, f: F) -> Self
    where
        F: Fn(&HookedSequence<T>, HookArgs<'_, T>) -> HookResult + 'static,
    {
        self.on(HookPoint::PostRemove, f)
    }

    #[must_use]
    pub fn pre_replace<F>(self, f: F) -> Self
    where
        F: Fn(&HookedSequence<T>, HookArgs<'_, T>) -> HookResult + 'static,
    {
        self.on(HookPoint::PreReplace, f)
    }

    #[must_use]
    pub fn post_replace<F>(self, f: F) -> Self
    where
        F: Fn(&HookedSequence<T>, HookArgs<'_, T>) -> HookResult + 'static,
    {
        self.on(HookPoint::PostReplace, f)
    }

    /// Hook installed at `point`, if any.
    #[must_use]
    pub fn get(&self, point: HookPoint) -> Option<&Hook<T>> {
        self.slots[point.slot()].as_ref()
    }

    #[must_use]
    pub fn is_registered(&self, point: HookPoint) -> bool {
        self.slots[point.slot()].is_some()
    }

    /// Points with a hook installed, in [`HookPoint::ALL`] order.
    pub fn registered(&self) -> impl Iterator<Item = HookPoint> + '_ {
        HookPoint::ALL
            .into_iter()
            .filter(|point| self.is_registered(*point))
    }

    /// True when no hook is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Keys rejected by [`from_named`](Self::from_named).
    #[must_use]
    pub fn unrecognized(&self) -> &[String] {
        &self.unrecognized
    }
}

/// Per pre-hook veto counts. Diagnostics only.
#[derive(Debug, Default)]
pub(crate) struct AbortCounters {
    counts: [Cell<u64>; 6],
}

impl AbortCounters {
    fn record(&self, point: HookPoint) -> u64 {
        let cell = &self.counts[point.slot()];
        let next = cell.get() + 1;
        cell.set(next);
        next
    }

    pub(crate) fn get(&self, point: HookPoint) -> u64 {
        self.counts[point.slot()].get()
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<HookPoint, u64> {
        HookPoint::PRE
            .into_iter()
            .map(|point| (point, self.get(point)))
            .collect()
    }
}

/// Hook table plus abort statistics: the invocation side of the protocol.
pub(crate) struct HookRegistry<T> {
    config: HookConfig<T>,
    aborts: AbortCounters,
}

impl<T> HookRegistry<T> {
    pub(crate) fn new(config: HookConfig<T>) -> Self {
        Self {
            config,
            aborts: AbortCounters::default(),
        }
    }

    pub(crate) fn config(&self) -> &HookConfig<T> {
        &self.config
    }

    pub(crate) fn aborts(&self) -> &AbortCounters {
        &self.aborts
    }

    /// Run the hook at `point`.
    ///
    /// Returns `Abort` only for a vetoing pre-hook. Post-hook outcomes are
    /// folded into `Proceed`. Hook errors come back as
    /// [`SequenceError::Hook`].
    pub(crate) fn invoke(
        &self,
        seq: &HookedSequence<T>,
        point: HookPoint,
        args: HookArgs<'_, T>,
    ) -> SequenceResult<Outcome> {
        let Some(hook) = self.config.get(point) else {
            return Ok(Outcome::Proceed);
        };
        let outcome = hook(seq, args).map_err(|error| SequenceError::Hook { point, error })?;
        match outcome {
            Outcome::Abort if point.is_pre() => {
                let total = self.aborts.record(point);
                tracing::debug!(%point, total, "pre-hook vetoed mutation");
                Ok(Outcome::Abort)
            }
            Outcome::Abort => {
                tracing::trace!(%point, "post-hook abort ignored");
                Ok(Outcome::Proceed)
            }
            Outcome::Proceed => Ok(Outcome::Proceed),
        }
    }
}
