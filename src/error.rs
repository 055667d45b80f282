//! Crate-level error taxonomy for slice lifecycle operations
//!
//! Every failure is surfaced immediately to the caller; nothing is retried or
//! swallowed. A half-initialized problem is left in the last state it
//! reached and stays releasable.

use thiserror::Error;

/// Errors raised by slice, problem, and device lifecycle operations
#[derive(Debug, Error)]
pub enum SliceError {
    /// Requested allocation exceeds the device memory budget
    #[error("allocation of {requested} bytes for {label} exceeds budget of {budget} bytes")]
    AllocationExceedsBudget {
        /// Name of the array being allocated
        label: &'static str,
        /// Requested size in bytes
        requested: u64,
        /// Budget ceiling in bytes
        budget: u64,
    },

    /// No compatible GPU adapter found
    #[error("No compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device
    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(String),

    /// Device-side operation issued against a slice with no bound device
    #[error("{0}: device operation without a bound device context")]
    DeviceUnbound(&'static str),

    /// Partitioner cannot split the graph across the requested device count
    #[error("cannot partition {vertices} vertices across {devices} devices")]
    Partition {
        /// Vertex count of the graph being partitioned
        vertices: usize,
        /// Requested device count
        devices: usize,
    },

    /// Host/device copy did not complete
    #[error("host/device transfer failed: {0}")]
    Transfer(String),

    /// Lifecycle call issued before `init`
    #[error("{0} called before init")]
    Uninitialized(&'static str),

    /// `init` called twice on the same slice
    #[error("data slice already initialized")]
    AlreadyInitialized,

    /// Extract output buffer does not match the global vertex count
    #[error("output buffer length {got} does not match vertex count {expected}")]
    OutputLength {
        /// Global vertex count
        expected: usize,
        /// Caller-supplied buffer length
        got: usize,
    },
}
