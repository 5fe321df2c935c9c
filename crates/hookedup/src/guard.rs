#![forbid(unsafe_code)]

//! Named slots that refuse to silently rebind a hooked sequence.
//!
//! Once a slot holds a [`HookedSequence`], assigning anything else to that
//! name fails. Re-assigning the very same sequence is allowed, which keeps
//! in-place updates such as `slot = slot.concat_in_place(..)` working.
//! Slots holding plain values can be rebound freely.
//!
//! Whether a slot is guarded is decided by the bound value through
//! [`Bindable`], never by the caller.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::hash::BuildHasher;

use crate::sequence::{HookedSequence, SequenceId};

/// A value that can be stored in an [`AttributeGuard`] slot.
///
/// Plain types keep the default. Implement it for your own types with an
/// empty `impl Bindable for MyType {}`.
pub trait Bindable: Any {
    /// Identity of the hooked sequence this value is, if any.
    fn hooked_id(&self) -> Option<SequenceId> {
        None
    }
}

impl<T: 'static> Bindable for HookedSequence<T> {
    fn hooked_id(&self) -> Option<SequenceId> {
        Some(self.id())
    }
}

macro_rules! plain_bindable {
    ($($ty:ty),* $(,)?) => {
        $(impl Bindable for $ty {})*
    };
}

plain_bindable!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, &'static str,
);

impl<T: 'static> Bindable for Vec<T> {}
impl<T: 'static> Bindable for VecDeque<T> {}
impl<T: 'static> Bindable for Option<T> {}
impl<T: 'static> Bindable for Box<T> {}
impl<K: 'static, V: 'static> Bindable for BTreeMap<K, V> {}
impl<K: 'static, V: 'static, S: BuildHasher + 'static> Bindable for HashMap<K, V, S> {}

/// Errors raised by [`AttributeGuard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// The slot holds a hooked sequence and the new value is a different one.
    OverwriteProhibited { name: String },
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OverwriteProhibited { name } => write!(
                f,
                "overwrite prohibited: '{}' is bound to a hooked sequence",
                name
            ),
        }
    }
}

impl std::error::Error for GuardError {}

struct Slot {
    value: Box<dyn Any>,
    hooked: Option<SequenceId>,
}

/// A table of named attributes with overwrite protection for hooked values.
#[derive(Default)]
pub struct AttributeGuard {
    slots: BTreeMap<String, Slot>,
}

impl fmt::Debug for AttributeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, slot) in &self.slots {
            map.entry(name, &slot.hooked);
        }
        map.finish()
    }
}

impl AttributeGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `name`.
    ///
    /// # Errors
    ///
    /// [`GuardError::OverwriteProhibited`] if `name` currently holds a
    /// hooked sequence and `value` is not that same sequence.
    pub fn bind<V: Bindable>(
        &mut self,
        name: impl Into<String>,
        value: V,
    ) -> Result<(), GuardError> {
        let hooked = value.hooked_id();
        self.store(name.into(), Box::new(value), hooked)
    }

    fn store(
        &mut self,
        name: String,
        value: Box<dyn Any>,
        hooked: Option<SequenceId>,
    ) -> Result<(), GuardError> {
        if let Some(current) = self.slots.get(&name).and_then(|slot| slot.hooked) {
            if hooked != Some(current) {
                tracing::debug!(%name, %current, "refusing to rebind hooked attribute");
                return Err(GuardError::OverwriteProhibited { name });
            }
        }
        self.slots.insert(name, Slot { value, hooked });
        Ok(())
    }

    /// Value bound to `name`, if it has type `V`.
    #[must_use]
    pub fn get<V: Any>(&self, name: &str) -> Option<&V> {
        self.slots.get(name)?.value.downcast_ref::<V>()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// True when `name` currently holds a hooked value.
    #[must_use]
    pub fn is_hooked(&self, name: &str) -> bool {
        self.slots.get(name).is_some_and(|slot| slot.hooked.is_some())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{HookConfig, Outcome};

    #[test]
    fn first_binding_always_allowed() {
        let mut guard = AttributeGuard::new();
        guard.bind("children", HookedSequence::from_items([1, 2])).unwrap();
        guard.bind("name", "root".to_string()).unwrap();
        assert!(guard.is_hooked("children"));
        assert!(!guard.is_hooked("name"));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn rebinding_hooked_slot_is_rejected() {
        let mut guard = AttributeGuard::new();
        guard.bind("children", HookedSequence::from_items([1])).unwrap();

        let err = guard.bind("children", HookedSequence::from_items([1])).unwrap_err();
        assert_eq!(
            err,
            GuardError::OverwriteProhibited {
                name: "children".into()
            }
        );
        assert_eq!(
            err.to_string(),
            "overwrite prohibited: 'children' is bound to a hooked sequence"
        );
        assert!(guard.bind("children", vec![1]).is_err());

        let kept = guard.get::<HookedSequence<i32>>("children").unwrap();
        assert_eq!(kept.to_vec(), vec![1]);
    }

    #[test]
    fn same_sequence_can_be_rebound_after_in_place_update() {
        let mut guard = AttributeGuard::new();
        let seq = HookedSequence::with_hooks(
            [1, 2],
            HookConfig::<i32>::new().pre_add(|_, _| Ok(Outcome::Proceed)),
        );
        guard.bind("children", seq.clone()).unwrap();

        let updated = seq.concat_in_place([3]).unwrap().clone();
        guard.bind("children", updated).unwrap();
        let repeated = seq.repeat_in_place(2).unwrap().clone();
        guard.bind("children", repeated).unwrap();

        let bound = guard.get::<HookedSequence<i32>>("children").unwrap();
        assert_eq!(bound.to_vec(), vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn plain_slots_rebind_freely() {
        let mut guard = AttributeGuard::new();
        guard.bind("count", 1u32).unwrap();
        guard.bind("count", 2u32).unwrap();
        assert_eq!(guard.get::<u32>("count"), Some(&2));
        assert_eq!(guard.get::<i64>("count"), None);

        // A plain slot may be upgraded to a hooked one.
        guard.bind("count", HookedSequence::<u32>::new()).unwrap();
        assert!(guard.is_hooked("count"));
    }

    #[test]
    fn guard_follows_the_bound_value() {
        let mut guard = AttributeGuard::new();
        let seq = HookedSequence::from_items([1, 2]);
        guard.bind("children", seq.clone()).unwrap();
        assert!(guard.is_hooked("children"));

        assert!(guard.bind("children", 5u32).is_err());
        assert!(guard.bind("children", "leaf").is_err());
        assert!(guard.bind("children", Some(seq.clone())).is_err());
        assert_eq!(guard.get::<HookedSequence<i32>>("children"), Some(&seq));

        guard.bind("children", seq).unwrap();
        assert!(guard.is_hooked("children"));
    }

    #[test]
    fn custom_plain_type_binds_unguarded() {
        #[derive(Debug, PartialEq)]
        struct Label(&'static str);
        impl Bindable for Label {}

        let mut guard = AttributeGuard::new();
        guard.bind("label", Label("a")).unwrap();
        guard.bind("label", Label("b")).unwrap();
        assert!(!guard.is_hooked("label"));
        assert_eq!(guard.get::<Label>("label"), Some(&Label("b")));
    }

    #[test]
    fn missing_slot() {
        let guard = AttributeGuard::new();
        assert!(guard.is_empty());
        assert!(!guard.contains("x"));
        assert_eq!(guard.get::<u8>("x"), None);
    }
}
