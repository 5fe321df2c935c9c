#![forbid(unsafe_code)]

//! Hook call recorder with scripted vetoes.
//!
//! A [`HookRecorder`] builds a [`HookConfig`] that registers a hook on every
//! point. Each call is appended to a shared trace (point, item, live length,
//! decision) so tests can assert the exact order of hook traffic, and the
//! trace can be exported as JSONL for diffing between runs.
//!
//! # JSONL schema
//!
//! One object per call:
//!
//! ```text
//! {"seq":0,"point":"pre_add","action":"add","item":"7","replaced":null,"len":3,"outcome":"abort"}
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use hookedup::{HookAction, HookConfig, HookPoint, HookedSequence, Outcome};
use serde_json::{Value, json};

/// Decision a recorded pre-hook makes.
#[derive(Debug, Clone, PartialEq)]
pub enum VetoPolicy<T> {
    /// Never veto.
    Allow,
    /// Veto every call.
    Always,
    /// Veto while the sequence holds at least this many items.
    AtCapacity(usize),
    /// Veto calls whose item equals this value.
    Item(T),
}

impl<T: PartialEq> VetoPolicy<T> {
    fn decide(&self, len: usize, item: &T) -> Outcome {
        let veto = match self {
            Self::Allow => false,
            Self::Always => true,
            Self::AtCapacity(cap) => len >= *cap,
            Self::Item(target) => target == item,
        };
        if veto { Outcome::Abort } else { Outcome::Proceed }
    }
}

/// One recorded hook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEvent {
    /// Position in the trace.
    pub seq: usize,
    pub point: HookPoint,
    /// `Debug` rendering of the item (the new value for replacements).
    pub item: String,
    /// `Debug` rendering of the displaced value, for replacements only.
    pub replaced: Option<String>,
    /// Live sequence length when the hook ran.
    pub len: usize,
    pub outcome: Outcome,
}

impl HookEvent {
    #[must_use]
    pub fn to_json(&self) -> Value {
        let action = match self.point.action() {
            HookAction::Add => "add",
            HookAction::Remove => "remove",
            HookAction::Replace => "replace",
        };
        json!({
            "seq": self.seq,
            "point": self.point.name(),
            "action": action,
            "item": self.item,
            "replaced": self.replaced,
            "len": self.len,
            "outcome": if self.outcome.is_abort() { "abort" } else { "proceed" },
        })
    }
}

/// Records every hook call made by the sequences it configures.
pub struct HookRecorder<T> {
    events: Rc<RefCell<Vec<HookEvent>>>,
    policies: BTreeMap<HookPoint, VetoPolicy<T>>,
}

impl<T> Default for HookRecorder<T> {
    fn default() -> Self {
        Self {
            events: Rc::default(),
            policies: BTreeMap::new(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for HookRecorder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRecorder")
            .field("events", &self.events.borrow().len())
            .field("policies", &self.policies)
            .finish()
    }
}

impl<T> HookRecorder<T>
where
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the decision of a pre-hook. Post points ignore policies.
    #[must_use]
    pub fn veto(mut self, point: HookPoint, policy: VetoPolicy<T>) -> Self {
        self.policies.insert(point, policy);
        self
    }

    /// A hook table with a recording hook on every point.
    #[must_use]
    pub fn config(&self) -> HookConfig<T> {
        let mut config = HookConfig::new();
        for point in HookPoint::ALL {
            let events = Rc::clone(&self.events);
            let policy = if point.is_pre() {
                self.policies.get(&point).cloned().unwrap_or(VetoPolicy::Allow)
            } else {
                VetoPolicy::Allow
            };
            config = config.on(point, move |seq, args| {
                let len = seq.len();
                let outcome = policy.decide(len, args.item());
                let mut events = events.borrow_mut();
                let seq_no = events.len();
                events.push(HookEvent {
                    seq: seq_no,
                    point,
                    item: format!("{:?}", args.item()),
                    replaced: args.replaced().map(|old| format!("{:?}", old)),
                    len,
                    outcome,
                });
                Ok(outcome)
            });
        }
        config
    }

    /// Fresh sequence wired to this recorder.
    #[must_use]
    pub fn sequence(&self, items: impl IntoIterator<Item = T>) -> HookedSequence<T> {
        HookedSequence::with_hooks(items, self.config())
    }

    #[must_use]
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.borrow().clone()
    }

    /// Number of calls made at `point`.
    #[must_use]
    pub fn calls(&self, point: HookPoint) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.point == point)
            .count()
    }

    /// Points in call order.
    #[must_use]
    pub fn points(&self) -> Vec<HookPoint> {
        self.events.borrow().iter().map(|event| event.point).collect()
    }

    pub fn reset(&self) {
        self.events.borrow_mut().clear();
    }

    /// The trace as JSONL, one event per line.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for event in self.events.borrow().iter() {
            out.push_str(&event.to_json().to_string());
            out.push('\n');
        }
        out
    }
}

/// Parse a JSONL trace back into values.
///
/// # Errors
///
/// The first line that is not valid JSON.
pub fn parse_jsonl(input: &str) -> Result<Vec<Value>, serde_json::Error> {
    input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect()
}
