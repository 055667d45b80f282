//! Multi-device problem orchestration
//!
//! A [`RankProblem`] owns one [`DataSlice`] per device, maps a graph onto
//! them through the partitioner, and drives their Init/Reset/Release
//! lifecycle in ascending device order. [`RankProblem::extract`] is the
//! single host-facing exit point: it reassembles per-device results into
//! global vertex order via the shared partition table.

use std::sync::Arc;

use crate::error::SliceError;
use crate::gpu::{DevicePool, GpuDevice};
use crate::slice::array::{MemoryBudget, Target};
use crate::slice::data_slice::DataSlice;
use crate::storage::{partition, CsrGraph, PartitionPolicy, PartitionTable};

/// Parameter registry for one ranking run
#[derive(Debug, Clone)]
pub struct RankConfig {
    /// Number of devices to partition across
    pub num_devices: usize,

    /// Iteration bound handed to every slice
    pub max_iter: u32,

    /// Vertex-to-device assignment policy
    pub policy: PartitionPolicy,

    /// Per-device memory budgets; missing entries are unlimited
    pub budgets: Vec<MemoryBudget>,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            num_devices: 1,
            max_iter: 20,
            policy: PartitionPolicy::Contiguous,
            budgets: Vec::new(),
        }
    }
}

impl RankConfig {
    /// Budget for device `d`
    #[must_use]
    pub fn budget_for(&self, d: usize) -> MemoryBudget {
        self.budgets
            .get(d)
            .copied()
            .unwrap_or_else(MemoryBudget::unlimited)
    }
}

/// Per-run owner of the device slices and the partition mapping
#[derive(Debug)]
pub struct RankProblem {
    config: RankConfig,
    data_slices: Vec<DataSlice>,
    table: Option<Arc<PartitionTable>>,
    devices: Vec<Arc<GpuDevice>>,
}

impl RankProblem {
    /// Create a problem with no slices yet
    #[must_use]
    pub const fn new(config: RankConfig) -> Self {
        Self {
            config,
            data_slices: Vec::new(),
            table: None,
            devices: Vec::new(),
        }
    }

    /// Partition `graph` and initialize one slice per device
    ///
    /// Devices are initialized in ascending index order. When `target`
    /// includes the device, a device pool is acquired first (one logical
    /// device per partition). Any failure is propagated immediately;
    /// already-initialized slices are kept and remain releasable, while the
    /// problem keeps reporting uninitialized until `release` clears them.
    ///
    /// # Errors
    ///
    /// - [`SliceError::AlreadyInitialized`] on a second call (successful or
    ///   not) before a full release
    /// - [`SliceError::Partition`] when the graph cannot be split
    /// - [`SliceError::NoAdapter`] / [`SliceError::DeviceRequest`] when the
    ///   device pool cannot be acquired
    /// - [`SliceError::AllocationExceedsBudget`] from slice allocation
    pub async fn init(&mut self, graph: &CsrGraph, target: Target) -> Result<(), SliceError> {
        if self.table.is_some() || !self.data_slices.is_empty() {
            return Err(SliceError::AlreadyInitialized);
        }

        let (partitions, table) = partition(graph, self.config.num_devices, self.config.policy)?;

        if target.has_device() && self.devices.is_empty() {
            let pool = DevicePool::acquire(self.config.num_devices).await?;
            self.devices = (0..pool.len()).filter_map(|i| pool.get(i)).collect();
        }

        for (d, part) in partitions.into_iter().enumerate() {
            let ctx = if target.has_device() {
                self.devices.get(d).cloned()
            } else {
                None
            };
            let mut slice = DataSlice::new(self.config.max_iter);
            let result = slice.init(
                part,
                self.config.num_devices,
                d,
                target,
                ctx,
                self.config.budget_for(d),
            );
            // Keep the slice even on failure: whatever it allocated before
            // the failure must stay releasable
            self.data_slices.push(slice);
            result?;
        }

        // The table lands only once every slice initialized, so a failed
        // init leaves the problem reporting uninitialized while its partial
        // slices stay releasable
        self.table = Some(table);

        log::debug!(
            "problem initialized: {} slices, {} vertices",
            self.data_slices.len(),
            graph.num_vertices()
        );
        Ok(())
    }

    /// Reset every slice in device order
    ///
    /// Fails fast on the first failing device; already-reset slices stay
    /// reset, not-yet-reached slices stay untouched. Safe to retry entirely
    /// since reset is idempotent.
    ///
    /// # Errors
    ///
    /// - [`SliceError::Uninitialized`] before [`RankProblem::init`]
    /// - any error from [`DataSlice::reset`]
    pub fn reset(&mut self, target: Target) -> Result<(), SliceError> {
        if self.table.is_none() {
            return Err(SliceError::Uninitialized("reset"));
        }
        for slice in &mut self.data_slices {
            slice.reset(target)?;
        }
        Ok(())
    }

    /// Copy final hub/authority ranks into caller-supplied host buffers
    ///
    /// When `source` includes the device, each slice's `curr` buffers are
    /// first brought back to their host shadows (with a per-device sync
    /// barrier). Results are then reassembled into the original global
    /// vertex numbering through the partition table; the single-device case
    /// takes a direct copy path.
    ///
    /// # Errors
    ///
    /// - [`SliceError::Uninitialized`] before [`RankProblem::init`]
    /// - [`SliceError::OutputLength`] when either output buffer does not
    ///   match the global vertex count
    /// - [`SliceError::Transfer`] when a readback fails or a slice's host
    ///   shadow does not cover its partition
    pub async fn extract(
        &mut self,
        hub_out: &mut [f32],
        auth_out: &mut [f32],
        source: Target,
    ) -> Result<(), SliceError> {
        let table = self
            .table
            .clone()
            .ok_or(SliceError::Uninitialized("extract"))?;
        let n = table.num_vertices();

        if hub_out.len() != n {
            return Err(SliceError::OutputLength {
                expected: n,
                got: hub_out.len(),
            });
        }
        if auth_out.len() != n {
            return Err(SliceError::OutputLength {
                expected: n,
                got: auth_out.len(),
            });
        }

        if source.has_device() {
            for slice in &mut self.data_slices {
                slice.read_back_ranks().await?;
            }
        }

        if self.data_slices.len() == 1 {
            // Single device: local order is global order
            let slice = &self.data_slices[0];
            let hub = slice.hrank.curr().host();
            let auth = slice.arank.curr().host();
            if hub.len() != n || auth.len() != n {
                return Err(SliceError::Transfer(format!(
                    "host shadow holds {} of {} vertices",
                    hub.len().min(auth.len()),
                    n
                )));
            }
            hub_out.copy_from_slice(hub);
            auth_out.copy_from_slice(auth);
            return Ok(());
        }

        // Multi-device: reassemble through the partition table
        for v in 0..n {
            let d = table.device_of(v);
            let l = table.local_of(v);
            let slice = self
                .data_slices
                .get(d)
                .ok_or_else(|| missing_local(d, l))?;
            hub_out[v] = slice
                .hrank
                .curr()
                .host()
                .get(l)
                .copied()
                .ok_or_else(|| missing_local(d, l))?;
            auth_out[v] = slice
                .arank
                .curr()
                .host()
                .get(l)
                .copied()
                .ok_or_else(|| missing_local(d, l))?;
        }

        log::debug!("extracted {} vertices from {} slices", n, self.data_slices.len());
        Ok(())
    }

    /// Release every slice at `target`
    ///
    /// The slice array itself is dropped only once every device reports its
    /// device-side storage empty; a host-only release keeps the slices (and
    /// their device memory) alive.
    pub fn release(&mut self, target: Target) {
        for slice in &mut self.data_slices {
            slice.release(target);
        }
        if !self.data_slices.is_empty()
            && self.data_slices.iter().all(DataSlice::is_device_empty)
        {
            self.data_slices.clear();
            self.table = None;
            log::debug!("problem released");
        }
    }

    /// Flip every slice's ping-pong buffers, the per-iteration handoff
    pub fn swap_buffers(&mut self) {
        for slice in &mut self.data_slices {
            slice.swap_buffers();
        }
    }

    /// Cross-device rank exchange hook
    ///
    /// Partitions run independently in the current single-pass scheme, and
    /// `extract` reassembles their results through the partition table; a
    /// multi-pass scheme would merge boundary rank mass here between
    /// iterations.
    pub fn exchange_boundary_ranks(&mut self) -> Result<(), SliceError> {
        if self.data_slices.len() > 1 {
            log::trace!(
                "boundary exchange over {} devices: single-pass mode, nothing to merge",
                self.data_slices.len()
            );
        }
        Ok(())
    }

    /// Whether `init` completed successfully
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.table.is_some()
    }

    /// The slices in ascending device order
    #[must_use]
    pub fn data_slices(&self) -> &[DataSlice] {
        &self.data_slices
    }

    /// Slice for device `d`
    #[must_use]
    pub fn data_slice(&self, d: usize) -> Option<&DataSlice> {
        self.data_slices.get(d)
    }

    /// Mutable slice for device `d` (the enactor's per-iteration handle)
    pub fn data_slice_mut(&mut self, d: usize) -> Option<&mut DataSlice> {
        self.data_slices.get_mut(d)
    }

    /// The shared partition table, once initialized
    #[must_use]
    pub fn partition_table(&self) -> Option<&Arc<PartitionTable>> {
        self.table.as_ref()
    }

    /// The configuration this problem was built with
    #[must_use]
    pub const fn config(&self) -> &RankConfig {
        &self.config
    }
}

fn missing_local(device: usize, local: usize) -> SliceError {
    SliceError::Transfer(format!(
        "device {device} host shadow missing local vertex {local}"
    ))
}
