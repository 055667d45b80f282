//! GPU device and memory plumbing for the data slices
//!
//! Based on research from:
//! - **Gunrock** (Wang et al., ACM `ToPC` 2017) - GPU graph processing primitives
//! - **`cuGraph`** (Bader et al., 2022) - GPU-accelerated graph analytics
//!
//! # Architecture
//!
//! - `device`: GPU device initialization and the per-index device pool
//! - `topology`: device-resident partition CSR buffers
//! - `transfer`: staging-buffer readback and queued fills

mod device;
mod topology;
pub mod transfer;

pub use device::{DevicePool, GpuDevice};
pub use topology::PartitionTopology;
