#![forbid(unsafe_code)]

//! Differential test harness for `hookedup`.
//!
//! - [`reference::ReferenceList`]: a plain `Vec` with native list semantics,
//!   used as the oracle for parity tests.
//! - [`recorder::HookRecorder`]: installs a hook on every point, records each
//!   call in order, applies configurable veto policies, and exports the
//!   trace as JSONL.

pub mod recorder;
pub mod reference;

pub use recorder::{HookEvent, HookRecorder, VetoPolicy, parse_jsonl};
pub use reference::ReferenceList;
