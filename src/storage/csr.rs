//! CSR (Compressed Sparse Row) graph representation
//!
//! Hub/authority propagation walks edges in both directions, so the graph
//! keeps a forward CSR (outgoing edges) and a reverse CSR (incoming edges)
//! side by side.
//!
//! # CSR Format
//!
//! ```text
//! Graph: 0 → 1, 0 → 2, 1 → 2
//!
//! CSR:
//!   row_offsets: [0, 2, 3, 3]  // Vertex 0: edges [0..2), vertex 1: [2..3), vertex 2: [3..3)
//!   col_indices: [1, 2, 2]     // Edge targets
//! ```

use anyhow::{anyhow, Result};

/// Vertex identifier (zero-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Directed graph in CSR form, unweighted
///
/// Optimized for:
/// - O(1) access to outgoing edges (via forward CSR)
/// - O(1) access to incoming edges (via reverse CSR)
/// - O(1) per-vertex degree queries (for rank normalization)
/// - GPU-friendly flat memory layout
///
/// # Example
///
/// ```
/// use rankslice::{CsrGraph, NodeId};
///
/// let mut graph = CsrGraph::new();
/// graph.add_edge(NodeId(0), NodeId(1)).unwrap();
/// graph.add_edge(NodeId(0), NodeId(2)).unwrap();
///
/// assert_eq!(graph.out_degree(NodeId(0)).unwrap(), 2);
/// assert_eq!(graph.in_degree(NodeId(2)).unwrap(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CsrGraph {
    /// Forward CSR: vertex i's outgoing edges are
    /// `col_indices[row_offsets[i]..row_offsets[i + 1]]`
    row_offsets: Vec<u32>,

    /// Forward CSR: edge targets, length = `num_edges`
    col_indices: Vec<u32>,

    /// Reverse CSR: vertex i's incoming edges are
    /// `rev_col_indices[rev_row_offsets[i]..rev_row_offsets[i + 1]]`
    rev_row_offsets: Vec<u32>,

    /// Reverse CSR: edge sources, length = `num_edges`
    rev_col_indices: Vec<u32>,

    /// Number of vertices
    num_vertices: usize,
}

impl CsrGraph {
    /// Create new empty graph
    #[must_use]
    pub fn new() -> Self {
        Self {
            row_offsets: vec![0],
            col_indices: Vec::new(),
            rev_row_offsets: vec![0],
            rev_col_indices: Vec::new(),
            num_vertices: 0,
        }
    }

    /// Create graph from an edge list
    ///
    /// # Errors
    ///
    /// Returns error if the edge list cannot be sized
    pub fn from_edge_list(edges: &[(NodeId, NodeId)]) -> Result<Self> {
        if edges.is_empty() {
            return Ok(Self::new());
        }

        let max_vertex = edges
            .iter()
            .flat_map(|(src, dst)| [src.0, dst.0])
            .max()
            .ok_or_else(|| anyhow!("Empty edge list"))?;

        let num_vertices = (max_vertex + 1) as usize;

        // Temporary adjacency lists, forward and reverse
        let mut adj: Vec<Vec<u32>> = vec![Vec::new(); num_vertices];
        let mut rev_adj: Vec<Vec<u32>> = vec![Vec::new(); num_vertices];

        for (src, dst) in edges {
            adj[src.0 as usize].push(dst.0);
            rev_adj[dst.0 as usize].push(src.0);
        }

        let (row_offsets, col_indices) = Self::flatten(&adj);
        let (rev_row_offsets, rev_col_indices) = Self::flatten(&rev_adj);

        Ok(Self {
            row_offsets,
            col_indices,
            rev_row_offsets,
            rev_col_indices,
            num_vertices,
        })
    }

    /// Flatten adjacency lists into (offsets, indices)
    fn flatten(adj: &[Vec<u32>]) -> (Vec<u32>, Vec<u32>) {
        let mut offsets = Vec::with_capacity(adj.len() + 1);
        let mut indices = Vec::new();

        let mut offset = 0_u32;
        offsets.push(offset);

        for neighbors in adj {
            #[allow(clippy::cast_possible_truncation)] // Graphs >4B edges not supported yet
            let len_u32 = neighbors.len() as u32;
            offset += len_u32;
            offsets.push(offset);
            indices.extend_from_slice(neighbors);
        }

        (offsets, indices)
    }

    /// Add edge to graph (dynamic insertion)
    ///
    /// Note: For large graphs, use `from_edge_list` for better performance.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for CSR variants that reject
    /// insertion after finalization.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId) -> Result<()> {
        let max_vertex = src.0.max(dst.0) as usize;
        if max_vertex >= self.num_vertices {
            self.expand_to(max_vertex + 1);
        }

        // Forward edge (src → dst)
        let src_idx = src.0 as usize;
        let end = self.row_offsets[src_idx + 1] as usize;
        self.col_indices.insert(end, dst.0);
        for offset in &mut self.row_offsets[src_idx + 1..] {
            *offset += 1;
        }

        // Reverse edge (dst ← src)
        let dst_idx = dst.0 as usize;
        let rev_end = self.rev_row_offsets[dst_idx + 1] as usize;
        self.rev_col_indices.insert(rev_end, src.0);
        for offset in &mut self.rev_row_offsets[dst_idx + 1..] {
            *offset += 1;
        }

        Ok(())
    }

    /// Get outgoing neighbors of a vertex
    ///
    /// # Errors
    ///
    /// Returns error if vertex ID is out of bounds
    pub fn outgoing_neighbors(&self, vertex: NodeId) -> Result<&[u32]> {
        if (vertex.0 as usize) >= self.num_vertices {
            return Err(anyhow!("Vertex ID {} out of bounds", vertex.0));
        }

        let idx = vertex.0 as usize;
        let start = self.row_offsets[idx] as usize;
        let end = self.row_offsets[idx + 1] as usize;
        Ok(&self.col_indices[start..end])
    }

    /// Get incoming neighbors of a vertex via the reverse CSR
    ///
    /// # Errors
    ///
    /// Returns error if vertex ID is out of bounds
    pub fn incoming_neighbors(&self, vertex: NodeId) -> Result<&[u32]> {
        if (vertex.0 as usize) >= self.num_vertices {
            return Err(anyhow!("Vertex ID {} out of bounds", vertex.0));
        }

        let idx = vertex.0 as usize;
        let start = self.rev_row_offsets[idx] as usize;
        let end = self.rev_row_offsets[idx + 1] as usize;
        Ok(&self.rev_col_indices[start..end])
    }

    /// Number of outgoing edges of a vertex
    ///
    /// # Errors
    ///
    /// Returns error if vertex ID is out of bounds
    #[allow(clippy::cast_possible_truncation)]
    pub fn out_degree(&self, vertex: NodeId) -> Result<u32> {
        Ok(self.outgoing_neighbors(vertex)?.len() as u32)
    }

    /// Number of incoming edges of a vertex
    ///
    /// # Errors
    ///
    /// Returns error if vertex ID is out of bounds
    #[allow(clippy::cast_possible_truncation)]
    pub fn in_degree(&self, vertex: NodeId) -> Result<u32> {
        Ok(self.incoming_neighbors(vertex)?.len() as u32)
    }

    /// Get number of vertices
    #[must_use]
    pub const fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// Get number of edges
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.col_indices.len()
    }

    /// Forward CSR components `(row_offsets, col_indices)`
    #[must_use]
    pub fn csr_components(&self) -> (&[u32], &[u32]) {
        (&self.row_offsets, &self.col_indices)
    }

    /// Reverse CSR components `(rev_row_offsets, rev_col_indices)`
    #[must_use]
    pub fn rev_csr_components(&self) -> (&[u32], &[u32]) {
        (&self.rev_row_offsets, &self.rev_col_indices)
    }

    /// Expand graph to accommodate new vertices
    fn expand_to(&mut self, new_size: usize) {
        if new_size <= self.num_vertices {
            return;
        }

        // New vertices have no edges: repeat the last offset
        let last_offset = *self.row_offsets.last().unwrap_or(&0);
        for _ in self.num_vertices..new_size {
            self.row_offsets.push(last_offset);
        }

        let rev_last_offset = *self.rev_row_offsets.last().unwrap_or(&0);
        for _ in self.num_vertices..new_size {
            self.rev_row_offsets.push(rev_last_offset);
        }

        self.num_vertices = new_size;
    }
}

impl Default for CsrGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph() {
        let graph = CsrGraph::new();
        assert_eq!(graph.num_vertices(), 0);
        assert_eq!(graph.num_edges(), 0);
    }

    #[test]
    fn test_from_edge_list_simple() {
        let edges = vec![
            (NodeId(0), NodeId(1)),
            (NodeId(0), NodeId(2)),
            (NodeId(1), NodeId(2)),
        ];

        let graph = CsrGraph::from_edge_list(&edges).unwrap();

        assert_eq!(graph.num_vertices(), 3);
        assert_eq!(graph.num_edges(), 3);

        let (row_offsets, col_indices) = graph.csr_components();
        assert_eq!(row_offsets, &[0, 2, 3, 3]);
        assert_eq!(col_indices, &[1, 2, 2]);
    }

    #[test]
    fn test_outgoing_neighbors() {
        let edges = vec![(NodeId(0), NodeId(1)), (NodeId(0), NodeId(2))];
        let graph = CsrGraph::from_edge_list(&edges).unwrap();

        let neighbors = graph.outgoing_neighbors(NodeId(0)).unwrap();
        assert_eq!(neighbors, &[1, 2]);

        let neighbors = graph.outgoing_neighbors(NodeId(1)).unwrap();
        let empty: &[u32] = &[];
        assert_eq!(neighbors, empty);

        assert!(graph.outgoing_neighbors(NodeId(3)).is_err());
    }

    #[test]
    fn test_incoming_neighbors() {
        let edges = vec![(NodeId(0), NodeId(2)), (NodeId(1), NodeId(2))];
        let graph = CsrGraph::from_edge_list(&edges).unwrap();

        let sources = graph.incoming_neighbors(NodeId(2)).unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources.contains(&0));
        assert!(sources.contains(&1));
    }

    #[test]
    fn test_degrees() {
        let edges = vec![
            (NodeId(0), NodeId(1)),
            (NodeId(0), NodeId(2)),
            (NodeId(1), NodeId(2)),
        ];
        let graph = CsrGraph::from_edge_list(&edges).unwrap();

        assert_eq!(graph.out_degree(NodeId(0)).unwrap(), 2);
        assert_eq!(graph.out_degree(NodeId(2)).unwrap(), 0);
        assert_eq!(graph.in_degree(NodeId(2)).unwrap(), 2);
        assert_eq!(graph.in_degree(NodeId(0)).unwrap(), 0);
    }

    #[test]
    fn test_add_edge_dynamic() {
        let mut graph = CsrGraph::new();

        graph.add_edge(NodeId(0), NodeId(1)).unwrap();
        graph.add_edge(NodeId(0), NodeId(2)).unwrap();

        assert_eq!(graph.num_vertices(), 3);
        assert_eq!(graph.num_edges(), 2);

        let neighbors = graph.outgoing_neighbors(NodeId(0)).unwrap();
        assert_eq!(neighbors, &[1, 2]);

        let incoming = graph.incoming_neighbors(NodeId(1)).unwrap();
        assert_eq!(incoming, &[0]);
    }

    #[test]
    fn test_multi_edges_counted() {
        // Duplicate edges count toward degrees
        let edges = vec![
            (NodeId(0), NodeId(1)),
            (NodeId(0), NodeId(1)),
            (NodeId(2), NodeId(1)),
        ];
        let graph = CsrGraph::from_edge_list(&edges).unwrap();

        assert_eq!(graph.in_degree(NodeId(1)).unwrap(), 3);
        assert_eq!(graph.out_degree(NodeId(0)).unwrap(), 2);
    }
}
