//! Graph partitioning for multi-device execution
//!
//! Splits a [`CsrGraph`] into disjoint per-device partitions and produces the
//! shared vertex → device / global → local lookup table that `Extract` later
//! uses to reassemble per-device results into global vertex order.
//!
//! Cross-partition edges are counted but dropped from each partition's local
//! CSR; exchanging rank mass across them is an extension point above this
//! layer. Full-graph degrees are captured per partition so that rank
//! normalization is unaffected by the cut.

use std::sync::Arc;

use crate::error::SliceError;
use crate::storage::CsrGraph;

/// Vertex-to-device assignment policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionPolicy {
    /// Even contiguous vertex ranges: device d owns `[d * ceil(n/D), ...)`
    Contiguous,
    /// Round-robin: vertex v goes to device `v % D`
    Striped,
}

/// Shared read-only vertex → (device, local index) lookup table
///
/// Built once by [`partition`]; nothing mutates it afterwards.
#[derive(Debug)]
pub struct PartitionTable {
    /// Owning device per global vertex, length = global vertex count
    device_of: Vec<u32>,
    /// Local index within the owning device's partition, per global vertex
    local_of: Vec<u32>,
    /// Vertices per device
    counts: Vec<usize>,
}

impl PartitionTable {
    /// Device owning global vertex `v`
    #[must_use]
    pub fn device_of(&self, v: usize) -> usize {
        self.device_of[v] as usize
    }

    /// Local index of global vertex `v` within its owning partition
    #[must_use]
    pub fn local_of(&self, v: usize) -> usize {
        self.local_of[v] as usize
    }

    /// Global vertex count
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.device_of.len()
    }

    /// Number of devices the table spans
    #[must_use]
    pub fn num_devices(&self) -> usize {
        self.counts.len()
    }

    /// Vertex count of device `d`'s partition
    #[must_use]
    pub fn partition_len(&self, d: usize) -> usize {
        self.counts[d]
    }
}

/// One device's disjoint share of the graph, renumbered to local vertex ids
///
/// `row_offsets`/`col_indices` (and the reverse pair) cover only edges whose
/// endpoints both fall in this partition. `out_degrees`/`in_degrees` are the
/// vertices' *full-graph* degrees.
#[derive(Debug, Clone)]
pub struct GraphPartition {
    /// Device this partition is assigned to
    pub device_index: usize,

    /// Local → global vertex id, length = partition vertex count
    pub global_ids: Vec<u32>,

    /// Local forward CSR offsets, length = vertex count + 1
    pub row_offsets: Vec<u32>,

    /// Local forward CSR targets
    pub col_indices: Vec<u32>,

    /// Local reverse CSR offsets, length = vertex count + 1
    pub rev_row_offsets: Vec<u32>,

    /// Local reverse CSR sources
    pub rev_col_indices: Vec<u32>,

    /// Full-graph out-degree per local vertex
    pub out_degrees: Vec<u32>,

    /// Full-graph in-degree per local vertex
    pub in_degrees: Vec<u32>,

    /// Edges crossing out of this partition (dropped from the local CSR)
    pub edge_cut: usize,
}

impl GraphPartition {
    /// Vertex count of this partition
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.global_ids.len()
    }

    /// Intra-partition edge count
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.col_indices.len()
    }
}

/// Split `graph` across `device_count` devices
///
/// Returns one partition per device (ascending device order, possibly empty)
/// plus the shared lookup table. Partitions are disjoint and total: every
/// vertex has exactly one owner.
///
/// # Errors
///
/// Returns [`SliceError::Partition`] if `device_count` is zero.
#[allow(clippy::cast_possible_truncation)]
pub fn partition(
    graph: &CsrGraph,
    device_count: usize,
    policy: PartitionPolicy,
) -> Result<(Vec<Arc<GraphPartition>>, Arc<PartitionTable>), SliceError> {
    let num_vertices = graph.num_vertices();
    if device_count == 0 {
        return Err(SliceError::Partition {
            vertices: num_vertices,
            devices: device_count,
        });
    }

    // Assign every vertex an owner and a local index, ascending global order
    let mut device_of = vec![0_u32; num_vertices];
    let mut local_of = vec![0_u32; num_vertices];
    let mut counts = vec![0_usize; device_count];

    let chunk = num_vertices.div_ceil(device_count).max(1);
    for v in 0..num_vertices {
        let d = match policy {
            PartitionPolicy::Contiguous => (v / chunk).min(device_count - 1),
            PartitionPolicy::Striped => v % device_count,
        };
        device_of[v] = d as u32;
        local_of[v] = counts[d] as u32;
        counts[d] += 1;
    }

    let (row_offsets, col_indices) = graph.csr_components();
    let (rev_row_offsets, rev_col_indices) = graph.rev_csr_components();

    let mut partitions = Vec::with_capacity(device_count);
    for d in 0..device_count {
        let global_ids: Vec<u32> = (0..num_vertices)
            .filter(|&v| device_of[v] == d as u32)
            .map(|v| v as u32)
            .collect();

        let mut out_degrees = Vec::with_capacity(global_ids.len());
        let mut in_degrees = Vec::with_capacity(global_ids.len());

        let (local_row_offsets, local_col_indices, edge_cut) = induce_csr(
            &global_ids,
            row_offsets,
            col_indices,
            &device_of,
            &local_of,
            d as u32,
        );
        let (local_rev_row_offsets, local_rev_col_indices, _cut_rev) = induce_csr(
            &global_ids,
            rev_row_offsets,
            rev_col_indices,
            &device_of,
            &local_of,
            d as u32,
        );

        for &g in &global_ids {
            let g = g as usize;
            out_degrees.push(row_offsets[g + 1] - row_offsets[g]);
            in_degrees.push(rev_row_offsets[g + 1] - rev_row_offsets[g]);
        }

        partitions.push(Arc::new(GraphPartition {
            device_index: d,
            global_ids,
            row_offsets: local_row_offsets,
            col_indices: local_col_indices,
            rev_row_offsets: local_rev_row_offsets,
            rev_col_indices: local_rev_col_indices,
            out_degrees,
            in_degrees,
            edge_cut,
        }));
    }

    let table = Arc::new(PartitionTable {
        device_of,
        local_of,
        counts,
    });

    log::debug!(
        "partitioned {} vertices across {} devices ({:?})",
        num_vertices,
        device_count,
        policy
    );

    Ok((partitions, table))
}

/// Extract the partition-local CSR for one device's vertices
///
/// Keeps edges whose other endpoint is also local, remapped to local ids;
/// returns the count of dropped (cut) edges alongside.
fn induce_csr(
    global_ids: &[u32],
    offsets: &[u32],
    indices: &[u32],
    device_of: &[u32],
    local_of: &[u32],
    device: u32,
) -> (Vec<u32>, Vec<u32>, usize) {
    let mut local_offsets = Vec::with_capacity(global_ids.len() + 1);
    let mut local_indices = Vec::new();
    let mut cut = 0_usize;

    local_offsets.push(0);
    for &g in global_ids {
        let g = g as usize;
        let start = offsets[g] as usize;
        let end = offsets[g + 1] as usize;
        for &other in &indices[start..end] {
            if device_of[other as usize] == device {
                local_indices.push(local_of[other as usize]);
            } else {
                cut += 1;
            }
        }
        #[allow(clippy::cast_possible_truncation)]
        local_offsets.push(local_indices.len() as u32);
    }

    (local_offsets, local_indices, cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NodeId;

    fn chain_graph() -> CsrGraph {
        // 0 → 1 → 2 → 3
        CsrGraph::from_edge_list(&[
            (NodeId(0), NodeId(1)),
            (NodeId(1), NodeId(2)),
            (NodeId(2), NodeId(3)),
        ])
        .unwrap()
    }

    #[test]
    fn test_zero_devices_rejected() {
        let graph = chain_graph();
        let err = partition(&graph, 0, PartitionPolicy::Contiguous).unwrap_err();
        assert!(matches!(
            err,
            SliceError::Partition {
                vertices: 4,
                devices: 0
            }
        ));
    }

    #[test]
    fn test_single_device_is_identity() {
        let graph = chain_graph();
        let (parts, table) = partition(&graph, 1, PartitionPolicy::Contiguous).unwrap();

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].num_vertices(), 4);
        assert_eq!(parts[0].num_edges(), 3);
        assert_eq!(parts[0].edge_cut, 0);
        assert_eq!(parts[0].global_ids, vec![0, 1, 2, 3]);

        for v in 0..4 {
            assert_eq!(table.device_of(v), 0);
            assert_eq!(table.local_of(v), v);
        }
    }

    #[test]
    fn test_contiguous_two_devices() {
        let graph = chain_graph();
        let (parts, table) = partition(&graph, 2, PartitionPolicy::Contiguous).unwrap();

        // {0,1} → device 0, {2,3} → device 1
        assert_eq!(table.device_of(0), 0);
        assert_eq!(table.device_of(1), 0);
        assert_eq!(table.device_of(2), 1);
        assert_eq!(table.device_of(3), 1);
        assert_eq!(table.local_of(2), 0);
        assert_eq!(table.local_of(3), 1);
        assert_eq!(table.partition_len(0), 2);
        assert_eq!(table.partition_len(1), 2);

        // Edge 1→2 crosses the cut; each side keeps one internal edge
        assert_eq!(parts[0].num_edges(), 1);
        assert_eq!(parts[1].num_edges(), 1);
        assert_eq!(parts[0].edge_cut, 1);

        // Local CSR is renumbered: device 1's edge is local 0 → local 1
        assert_eq!(parts[1].col_indices, vec![1]);
        assert_eq!(parts[1].row_offsets, vec![0, 1, 1]);
    }

    #[test]
    fn test_full_graph_degrees_survive_the_cut() {
        let graph = chain_graph();
        let (parts, _) = partition(&graph, 2, PartitionPolicy::Contiguous).unwrap();

        // Vertex 1 keeps out-degree 1 even though its edge leaves the partition
        assert_eq!(parts[0].out_degrees, vec![1, 1]);
        assert_eq!(parts[0].in_degrees, vec![0, 1]);
        assert_eq!(parts[1].in_degrees, vec![1, 1]);
    }

    #[test]
    fn test_striped_assignment() {
        let graph = chain_graph();
        let (parts, table) = partition(&graph, 2, PartitionPolicy::Striped).unwrap();

        assert_eq!(table.device_of(0), 0);
        assert_eq!(table.device_of(1), 1);
        assert_eq!(table.device_of(2), 0);
        assert_eq!(table.device_of(3), 1);
        assert_eq!(parts[0].global_ids, vec![0, 2]);
        assert_eq!(parts[1].global_ids, vec![1, 3]);

        // Every chain edge crosses devices under striping
        assert_eq!(parts[0].num_edges(), 0);
        assert_eq!(parts[1].num_edges(), 0);
    }

    #[test]
    fn test_more_devices_than_vertices() {
        let graph = CsrGraph::from_edge_list(&[(NodeId(0), NodeId(1))]).unwrap();
        let (parts, table) = partition(&graph, 4, PartitionPolicy::Contiguous).unwrap();

        assert_eq!(parts.len(), 4);
        assert_eq!(table.num_devices(), 4);
        let total: usize = (0..4).map(|d| parts[d].num_vertices()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_empty_graph() {
        let graph = CsrGraph::new();
        let (parts, table) = partition(&graph, 2, PartitionPolicy::Contiguous).unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(table.num_vertices(), 0);
        assert_eq!(parts[0].num_vertices(), 0);
        assert_eq!(parts[0].row_offsets, vec![0]);
    }
}
