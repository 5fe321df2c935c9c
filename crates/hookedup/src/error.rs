#![forbid(unsafe_code)]

//! Error types for hooked sequence operations.
//!
//! Messages mirror the ones a native dynamic list reports for the same
//! condition, so callers comparing against a plain list see identical text.

use std::fmt;

use crate::hooks::{HookError, HookPoint};

/// Result alias for sequence operations.
pub type SequenceResult<T> = Result<T, SequenceError>;

/// Which operation performed a failed integer index lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexOp {
    /// Plain read access (`seq[i]`).
    Access,
    /// Replace or delete (`seq[i] = v`, `del seq[i]`).
    Assignment,
    /// `pop(i)`.
    Pop,
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Integer index outside `[-len, len)` or pop on an empty sequence.
    Bounds,
    /// Extended-slice replacement with a different length than the selection.
    Shape,
    /// Index expression that is neither an integer nor a slice.
    Type,
    /// `remove` of an absent item.
    NotFound,
    /// Slice step of zero.
    ZeroStep,
    /// A hook reported a genuine failure.
    Hook,
}

/// Errors raised by [`HookedSequence`](crate::HookedSequence) operations.
///
/// Every variant except [`SequenceError::Hook`] is raised before any hook
/// runs, leaving the sequence untouched.
#[derive(Debug)]
pub enum SequenceError {
    /// Integer index out of range for the given operation.
    IndexOutOfRange { op: IndexOp },
    /// `pop` on an empty sequence.
    PopFromEmpty,
    /// Extended slice assigned a sequence of a different size.
    SizeMismatch { replacement: usize, slice: usize },
    /// Index expression could not be read as an integer or a slice.
    InvalidIndex { found: String },
    /// A slice bound or step could not be read as an integer.
    InvalidSliceComponent { found: String },
    /// `remove(x)` where `x` is not present.
    NotFound,
    /// Slice step of zero.
    ZeroStep,
    /// Failure returned by a hook, passed through unmodified.
    Hook { point: HookPoint, error: HookError },
}

impl SequenceError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IndexOutOfRange { .. } | Self::PopFromEmpty => ErrorKind::Bounds,
            Self::SizeMismatch { .. } => ErrorKind::Shape,
            Self::InvalidIndex { .. } | Self::InvalidSliceComponent { .. } => ErrorKind::Type,
            Self::NotFound => ErrorKind::NotFound,
            Self::ZeroStep => ErrorKind::ZeroStep,
            Self::Hook { .. } => ErrorKind::Hook,
        }
    }

    /// The hook failure carried by this error, if any.
    #[must_use]
    pub fn hook_error(&self) -> Option<&HookError> {
        match self {
            Self::Hook { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { op } => match op {
                IndexOp::Access => write!(f, "list index out of range"),
                IndexOp::Assignment => write!(f, "list assignment index out of range"),
                IndexOp::Pop => write!(f, "pop index out of range"),
            },
            Self::PopFromEmpty => write!(f, "pop from empty list"),
            Self::SizeMismatch { replacement, slice } => write!(
                f,
                "attempt to assign sequence of size {} to extended slice of size {}",
                replacement, slice
            ),
            Self::InvalidIndex { found } => {
                write!(f, "list indices must be integers or slices, not {}", found)
            }
            Self::InvalidSliceComponent { found } => {
                write!(f, "slice indices must be integers or None, not '{}'", found)
            }
            Self::NotFound => write!(f, "list.remove(x): x not in list"),
            Self::ZeroStep => write!(f, "slice step cannot be zero"),
            Self::Hook { point, error } => write!(f, "{} hook failed: {}", point, error),
        }
    }
}

impl std::error::Error for SequenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Hook { error, .. } => Some(error),
            _ => None,
        }
    }
}

// Lets hooks that mutate the sequence reentrantly use `?`.
impl From<SequenceError> for HookError {
    fn from(error: SequenceError) -> Self {
        HookError::new(error)
    }
}
