//! Shared constants used across the library.

/// Default label width in bytes, re-exported here for callers that only
/// need the constant rather than the full [`crate::config`] types.
pub use crate::config::DEFAULT_NUM_BYTES;

/// How many gates/input-wires/transport steps elapse between progress-bar
/// updates. Kept large enough that small circuits never trigger a redraw.
pub const PROGRESS_UPDATE_INTERVAL: u32 = 64;
