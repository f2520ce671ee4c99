//! storia-core
//!
//! Core types, driver traits, and the history-assembly pipeline shared
//! across the storia ecosystem.
//!
//! - `types`: common data structures (periods, field masks, bars).
//! - `driver`: the `HistoryDriver`/`BarFeed` capability traits and the
//!   cooperative `CancelFlag`.
//! - `session`: per-source pull state (`DriverSession`) and its drain loop.
//! - `pipeline`: the pure stages that turn frozen sessions into a series —
//!   normalize, adjust, merge, assemble.
//!
//! Async runtime (Tokio)
//! ---------------------
//! Drivers are async trait objects; any code that drains a feed must run
//! under a Tokio 1.x runtime. The pipeline stages themselves are
//! synchronous and only ever run after every session reached a terminal
//! state.
//!
#![warn(missing_docs)]

/// Columnar chunks of pulled bars.
pub mod block;
/// Driver capability traits and cancellation.
pub mod driver;
mod error;
/// The final columnar series and its period transforms.
pub mod history;
/// Pipeline stages: normalize, adjust, merge, assemble.
pub mod pipeline;
/// Per-source pull sessions.
pub mod session;
/// Common data structures (periods, field masks, bars).
pub mod types;

pub use block::{BLOCK_CAPACITY, DataBlock};
pub use driver::{BarFeed, CancelFlag, DriverParameters, HistoryDriver, PullOutcome, PullRequest};
pub use error::HistoryError;
pub use history::History;
pub use pipeline::adjust::{SplitAdjust, ValueAdjust, apply_split_adjust, apply_value_adjust};
pub use pipeline::assemble::assemble;
pub use pipeline::merge::{MergeOp, MergePlan, plan_merge};
pub use pipeline::normalize::{normalize_sessions, resolve_target_period};
pub use session::{DriverSession, SessionState};
pub use types::*;
