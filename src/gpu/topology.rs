//! Device-resident partition topology
//!
//! Uploads one partition's local CSR (forward and reverse) to its bound
//! device. Rank-propagation kernels read these buffers every iteration, so
//! they are migrated once at slice init and live until release.

use super::GpuDevice;
use crate::error::SliceError;
use crate::storage::GraphPartition;

/// GPU buffers holding one partition's CSR topology
#[derive(Debug)]
pub struct PartitionTopology {
    /// Number of vertices in the partition
    pub num_vertices: usize,

    /// Number of intra-partition edges
    pub num_edges: usize,

    /// Forward CSR offsets (size: `num_vertices` + 1)
    pub row_offsets: wgpu::Buffer,

    /// Forward CSR targets (size: `num_edges`)
    pub col_indices: wgpu::Buffer,

    /// Reverse CSR offsets (size: `num_vertices` + 1)
    pub rev_row_offsets: wgpu::Buffer,

    /// Reverse CSR sources (size: `num_edges`)
    pub rev_col_indices: wgpu::Buffer,
}

impl PartitionTopology {
    /// Upload a partition's local CSR to the device
    ///
    /// # Errors
    ///
    /// Returns error if buffer creation fails
    pub fn upload(ctx: &GpuDevice, partition: &GraphPartition) -> Result<Self, SliceError> {
        let usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;

        let row_offsets = ctx.create_buffer_init(
            "Partition row_offsets",
            bytemuck::cast_slice(&partition.row_offsets),
            usage,
        )?;
        let col_indices = ctx.create_buffer_init(
            "Partition col_indices",
            bytemuck::cast_slice(&partition.col_indices),
            usage,
        )?;
        let rev_row_offsets = ctx.create_buffer_init(
            "Partition rev_row_offsets",
            bytemuck::cast_slice(&partition.rev_row_offsets),
            usage,
        )?;
        let rev_col_indices = ctx.create_buffer_init(
            "Partition rev_col_indices",
            bytemuck::cast_slice(&partition.rev_col_indices),
            usage,
        )?;

        Ok(Self {
            num_vertices: partition.num_vertices(),
            num_edges: partition.num_edges(),
            row_offsets,
            col_indices,
            rev_row_offsets,
            rev_col_indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{partition, CsrGraph, NodeId, PartitionPolicy};

    #[tokio::test]
    async fn test_upload_partition_topology() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_upload_partition_topology: GPU not available");
            return;
        }

        let ctx = GpuDevice::new().await.unwrap();

        let graph = CsrGraph::from_edge_list(&[
            (NodeId(0), NodeId(1)),
            (NodeId(1), NodeId(2)),
        ])
        .unwrap();
        let (parts, _) = partition(&graph, 1, PartitionPolicy::Contiguous).unwrap();

        let topology = PartitionTopology::upload(&ctx, &parts[0]).unwrap();
        assert_eq!(topology.num_vertices, 3);
        assert_eq!(topology.num_edges, 2);
        assert_eq!(topology.row_offsets.size(), 4 * 4);
    }
}
