//! Graph storage layer
//!
//! Provides the CSR (Compressed Sparse Row) graph representation and the
//! multi-device partitioner.

pub mod csr;
pub mod partition;

pub use csr::{CsrGraph, NodeId};
pub use partition::{partition, GraphPartition, PartitionPolicy, PartitionTable};
