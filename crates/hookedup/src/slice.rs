#![forbid(unsafe_code)]

//! Index and slice resolution with native list semantics.
//!
//! Integer indices wrap once from the end (`-1` is the last element), insert
//! positions clamp to the ends instead of failing, and slices resolve against
//! a length exactly the way a native `slice.indices(len)` does: bounds are
//! clamped, `None` picks the direction-appropriate end, and a zero step is
//! rejected.
//!
//! # Textual form
//!
//! [`Slice`] and [`SeqIndex`] parse from the usual `start:stop:step`
//! notation, so tests and tools can write `"4:0:-1".parse()`.

use std::fmt;
use std::str::FromStr;

use crate::error::SequenceError;

/// Resolve a possibly-negative index against `len`.
///
/// Returns `None` when the index falls outside `[-len, len)`.
#[inline]
#[must_use]
pub fn resolve_index(index: isize, len: usize) -> Option<usize> {
    let len = len as isize;
    let idx = if index < 0 { index + len } else { index };
    (0..len).contains(&idx).then_some(idx as usize)
}

/// Clamp an insert position the way a native `insert` does.
///
/// Negative positions count from the end; anything past either end lands
/// on that end. Never fails.
#[inline]
#[must_use]
pub fn clamp_insert_index(index: isize, len: usize) -> usize {
    if index < 0 {
        (index + len as isize).max(0) as usize
    } else {
        (index as usize).min(len)
    }
}

/// A slice expression with optional bounds and step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl Slice {
    /// `start:stop`.
    #[must_use]
    pub const fn new(start: isize, stop: isize) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    /// `start:stop:step`.
    #[must_use]
    pub const fn with_step(start: isize, stop: isize, step: isize) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
            step: Some(step),
        }
    }

    /// `:` (the whole sequence).
    #[must_use]
    pub const fn full() -> Self {
        Self {
            start: None,
            stop: None,
            step: None,
        }
    }

    /// True when the step is given and is not 1. Extended slices only
    /// accept replacements of exactly the selected length.
    #[must_use]
    pub fn is_extended(&self) -> bool {
        matches!(self.step, Some(step) if step != 1)
    }

    /// Resolve against a sequence of length `len`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::ZeroStep`] when the step is zero.
    pub fn indices(&self, len: usize) -> Result<SliceRange, SequenceError> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(SequenceError::ZeroStep);
        }
        let len_i = len as isize;
        let (lower, upper) = if step < 0 { (-1, len_i - 1) } else { (0, len_i) };

        let clamp = |bound: Option<isize>, default: isize| -> isize {
            match bound {
                None => default,
                Some(b) if b < 0 => (b + len_i).max(lower),
                Some(b) => b.min(upper),
            }
        };
        let start = clamp(self.start, if step < 0 { upper } else { lower });
        let stop = clamp(self.stop, if step < 0 { lower } else { upper });

        // `unsigned_abs` keeps `isize::MIN` steps from overflowing.
        let count = if step > 0 && start < stop {
            (stop - start - 1) as usize / step.unsigned_abs() + 1
        } else if step < 0 && stop < start {
            (start - stop - 1) as usize / step.unsigned_abs() + 1
        } else {
            0
        };

        Ok(SliceRange {
            start,
            stop,
            step,
            len: count,
        })
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |v: Option<isize>| v.map(|v| v.to_string()).unwrap_or_default();
        write!(f, "{}:{}", part(self.start), part(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{}", step)?;
        }
        Ok(())
    }
}

impl FromStr for Slice {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(SequenceError::InvalidIndex {
                found: "str".to_string(),
            });
        }
        let component = |raw: &str| -> Result<Option<isize>, SequenceError> {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            raw.parse::<isize>()
                .map(Some)
                .map_err(|_| SequenceError::InvalidSliceComponent {
                    found: raw.to_string(),
                })
        };
        Ok(Self {
            start: component(parts[0])?,
            stop: component(parts[1])?,
            step: match parts.get(2) {
                Some(raw) => component(raw)?,
                None => None,
            },
        })
    }
}

/// A slice resolved against a concrete length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    /// First selected position (or the insertion point when empty).
    pub start: isize,
    /// Exclusive end in the direction of `step`.
    pub stop: isize,
    /// Non-zero step.
    pub step: isize,
    len: usize,
}

impl SliceRange {
    /// Number of selected positions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing is selected.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when positions advance towards the end of the sequence.
    #[inline]
    #[must_use]
    pub fn is_ascending(&self) -> bool {
        self.step > 0
    }

    /// Selected positions in slice order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).map(move |k| (self.start + k as isize * self.step) as usize)
    }
}

/// An index expression: a single position or a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqIndex {
    Index(isize),
    Slice(Slice),
}

impl From<isize> for SeqIndex {
    fn from(index: isize) -> Self {
        Self::Index(index)
    }
}

impl From<Slice> for SeqIndex {
    fn from(slice: Slice) -> Self {
        Self::Slice(slice)
    }
}

impl fmt::Display for SeqIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Slice(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for SeqIndex {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            return s.parse().map(Self::Slice);
        }
        s.trim()
            .parse::<isize>()
            .map(Self::Index)
            .map_err(|_| SequenceError::InvalidIndex {
                found: "str".to_string(),
            })
    }
}
