//! rankslice: per-partition GPU state management for hub/authority ranking
//!
//! # Overview
//!
//! rankslice owns, allocates, resets, and tears down the numeric working set
//! an iterative hub/authority (HITS-style) ranking computation needs across
//! iterations. A graph is partitioned across one or more GPU devices; each
//! partition gets a [`DataSlice`] holding double-buffered rank vectors,
//! degree tables, and visited markers, and a [`RankProblem`] drives the
//! slices' Init/Reset/Extract/Release lifecycle in device order. The
//! iteration-driving enactor and its compute kernels live outside this
//! crate: they read `curr`, write `next`, and flip the buffers once per
//! iteration.
//!
//! # Quick Start
//!
//! ```no_run
//! use rankslice::{CsrGraph, NodeId, RankConfig, RankProblem, Target};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = CsrGraph::new();
//! graph.add_edge(NodeId(0), NodeId(1))?;
//! graph.add_edge(NodeId(1), NodeId(2))?;
//!
//! let mut problem = RankProblem::new(RankConfig::default());
//! problem.init(&graph, Target::Both).await?;
//! problem.reset(Target::Both)?;
//!
//! // ... enactor runs iterations, swapping buffers each time ...
//! problem.swap_buffers();
//!
//! let mut hub = vec![0.0_f32; graph.num_vertices()];
//! let mut auth = vec![0.0_f32; graph.num_vertices()];
//! problem.extract(&mut hub, &mut auth, Target::Device).await?;
//!
//! problem.release(Target::Both);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Storage**: CSR graphs (forward + reverse) and the multi-device
//!   partitioner
//! - **GPU**: wgpu device pool (one queue per device), topology migration,
//!   staging-buffer readback
//! - **Slices**: the double-buffered per-device working set and its
//!   Init/Reset/Extract/Release lifecycle

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod gpu;
pub mod slice;
pub mod storage;

// Re-export core types
pub use error::SliceError;
pub use gpu::{DevicePool, GpuDevice, PartitionTopology};
pub use slice::{
    DataSlice, MemoryBudget, PingPong, RankConfig, RankProblem, SliceArray, Target, RANK_SEED,
};
pub use storage::{partition, CsrGraph, GraphPartition, NodeId, PartitionPolicy, PartitionTable};
