//! Per-partition device state management
//!
//! # Architecture
//!
//! - `array`: named per-vertex arrays with host/device residency and budgets
//! - `data_slice`: the per-(partition, device) working set and its lifecycle
//! - `problem`: multi-device orchestration and global-order extraction

pub mod array;
pub mod data_slice;
pub mod problem;

pub use array::{MemoryBudget, SliceArray, Target};
pub use data_slice::{DataSlice, PingPong, RANK_SEED};
pub use problem::{RankConfig, RankProblem};
