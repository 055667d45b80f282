//! Per-partition, per-device working set for rank propagation
//!
//! A [`DataSlice`] owns every numeric array one graph partition needs on one
//! device: double-buffered hub and authority rank vectors, degree tables,
//! and per-vertex visited markers. It exposes no iteration logic; the
//! external enactor reads `curr`, writes `next`, and flips the buffers once
//! per iteration via [`DataSlice::swap_buffers`].

use std::sync::Arc;

use crate::error::SliceError;
use crate::gpu::{GpuDevice, PartitionTopology};
use crate::slice::array::{MemoryBudget, SliceArray, Target};
use crate::storage::GraphPartition;

/// Seed value written to `curr` buffers by Reset
pub const RANK_SEED: f32 = 1.0;

/// Two-slot rank-vector arena with a selector index
///
/// `curr()` is the authoritative buffer consumers read during an iteration;
/// `next()` is the iteration's write target. [`PingPong::swap`] flips the
/// selector in O(1): no copy, no reallocation, and the new `curr` is exactly
/// the allocation that was `next` before the flip.
#[derive(Debug)]
pub struct PingPong {
    slots: [SliceArray<f32>; 2],
    selector: usize,
}

impl PingPong {
    /// Create a named, unallocated buffer pair
    #[must_use]
    pub const fn new(labels: [&'static str; 2]) -> Self {
        Self {
            slots: [SliceArray::new(labels[0]), SliceArray::new(labels[1])],
            selector: 0,
        }
    }

    /// The buffer currently holding authoritative values
    #[must_use]
    pub fn curr(&self) -> &SliceArray<f32> {
        &self.slots[self.selector]
    }

    /// Mutable handle to the authoritative buffer
    pub fn curr_mut(&mut self) -> &mut SliceArray<f32> {
        &mut self.slots[self.selector]
    }

    /// The buffer collecting this iteration's output
    #[must_use]
    pub fn next(&self) -> &SliceArray<f32> {
        &self.slots[self.selector ^ 1]
    }

    /// Mutable handle to the output buffer
    pub fn next_mut(&mut self) -> &mut SliceArray<f32> {
        &mut self.slots[self.selector ^ 1]
    }

    /// Exchange the roles of `curr` and `next`, O(1)
    pub fn swap(&mut self) {
        self.selector ^= 1;
    }

    /// Current selector index (0 or 1)
    #[must_use]
    pub const fn selector(&self) -> usize {
        self.selector
    }

    /// Point the selector back at slot 0
    pub fn reset_selector(&mut self) {
        self.selector = 0;
    }

    /// Allocate both slots to `len` elements at `target`
    ///
    /// # Errors
    ///
    /// Propagates the first failing slot allocation.
    pub fn allocate(
        &mut self,
        len: usize,
        target: Target,
        ctx: Option<&GpuDevice>,
        budget: &MemoryBudget,
    ) -> Result<(), SliceError> {
        for slot in &mut self.slots {
            slot.allocate(len, target, ctx, budget)?;
        }
        Ok(())
    }

    /// Grow both slots to at least `len` elements at `target`
    ///
    /// # Errors
    ///
    /// Propagates the first failing slot growth.
    pub fn ensure_len(
        &mut self,
        len: usize,
        target: Target,
        ctx: Option<&GpuDevice>,
        budget: &MemoryBudget,
    ) -> Result<(), SliceError> {
        for slot in &mut self.slots {
            slot.ensure_len(len, target, ctx, budget)?;
        }
        Ok(())
    }

    /// Free both slots at `target`; idempotent
    pub fn release(&mut self, target: Target) {
        for slot in &mut self.slots {
            slot.release(target);
        }
    }

    /// Whether both slots' device sides are empty
    #[must_use]
    pub const fn is_device_empty(&self) -> bool {
        self.slots[0].is_device_empty() && self.slots[1].is_device_empty()
    }
}

/// The device-resident working set of one graph partition
///
/// Constructed empty, bound to a partition and device by [`DataSlice::init`]
/// (exactly once), re-seeded by [`DataSlice::reset`] before each run, and
/// torn down by [`DataSlice::release`] or drop.
#[derive(Debug)]
pub struct DataSlice {
    /// Hub rank double buffer
    pub hrank: PingPong,

    /// Authority rank double buffer
    pub arank: PingPong,

    /// Full-graph in-degree per local vertex
    pub in_degrees: SliceArray<u32>,

    /// Full-graph out-degree per local vertex
    pub out_degrees: SliceArray<u32>,

    /// Per-vertex traversal markers for the enactor
    pub visited: SliceArray<u32>,

    max_iter: u32,
    device_index: usize,
    num_devices: usize,
    partition: Option<Arc<GraphPartition>>,
    ctx: Option<Arc<GpuDevice>>,
    topology: Option<PartitionTopology>,
    budget: MemoryBudget,
    initialized: bool,
}

impl DataSlice {
    /// Create a named, unallocated slice
    #[must_use]
    pub const fn new(max_iter: u32) -> Self {
        Self {
            hrank: PingPong::new(["hrank[0]", "hrank[1]"]),
            arank: PingPong::new(["arank[0]", "arank[1]"]),
            in_degrees: SliceArray::new("in_degrees"),
            out_degrees: SliceArray::new("out_degrees"),
            visited: SliceArray::new("visited"),
            max_iter,
            device_index: 0,
            num_devices: 1,
            partition: None,
            ctx: None,
            topology: None,
            budget: MemoryBudget::unlimited(),
            initialized: false,
        }
    }

    /// Bind the slice to a partition and device, allocating its working set
    ///
    /// Allocates all seven arrays to the partition's vertex count at
    /// `target`; when `target` includes the device, also migrates the
    /// partition's CSR topology to that device. Binds the slice's device-side
    /// operations to `ctx` for the slice's remaining lifetime. Must be
    /// called exactly once before any [`DataSlice::reset`].
    ///
    /// On failure, arrays allocated before the failing one stay allocated
    /// and the slice remains releasable.
    ///
    /// # Errors
    ///
    /// - [`SliceError::AlreadyInitialized`] on a second call
    /// - [`SliceError::DeviceUnbound`] when `target` includes the device but
    ///   no context is supplied
    /// - [`SliceError::AllocationExceedsBudget`] from any array allocation
    pub fn init(
        &mut self,
        partition: Arc<GraphPartition>,
        num_devices: usize,
        device_index: usize,
        target: Target,
        ctx: Option<Arc<GpuDevice>>,
        budget: MemoryBudget,
    ) -> Result<(), SliceError> {
        if self.initialized {
            return Err(SliceError::AlreadyInitialized);
        }
        if target.has_device() && ctx.is_none() {
            return Err(SliceError::DeviceUnbound("data_slice"));
        }

        self.device_index = device_index;
        self.num_devices = num_devices;
        self.budget = budget;
        self.ctx = ctx;
        let n = partition.num_vertices();
        let device = self.ctx.as_deref();

        self.hrank.allocate(n, target, device, &budget)?;
        self.arank.allocate(n, target, device, &budget)?;
        self.in_degrees.allocate(n, target, device, &budget)?;
        self.out_degrees.allocate(n, target, device, &budget)?;
        self.visited.allocate(n, target, device, &budget)?;

        if target.has_device() {
            let device = self
                .ctx
                .as_deref()
                .ok_or(SliceError::DeviceUnbound("data_slice"))?;
            self.topology = Some(PartitionTopology::upload(device, &partition)?);
        }

        log::debug!(
            "slice {}/{}: initialized {} vertices, {} local edges",
            device_index,
            num_devices,
            n,
            partition.num_edges()
        );

        self.partition = Some(partition);
        self.initialized = true;
        Ok(())
    }

    /// Re-seed the working set for a fresh run
    ///
    /// Ensures every array's capacity covers the partition vertex count
    /// (growing if needed, never shrinking), then overwrites contents:
    /// degree and visited arrays to 0, `curr` rank buffers to
    /// [`RANK_SEED`], `next` rank buffers to 0.0, selectors back to slot 0.
    /// When `target` includes the device, blocks until all queued fills have
    /// landed. Callable repeatedly, once per run, without re-init.
    ///
    /// # Errors
    ///
    /// - [`SliceError::Uninitialized`] before [`DataSlice::init`]
    /// - [`SliceError::AllocationExceedsBudget`] when growth is over budget
    pub fn reset(&mut self, target: Target) -> Result<(), SliceError> {
        let n = self
            .partition
            .as_ref()
            .filter(|_| self.initialized)
            .ok_or(SliceError::Uninitialized("reset"))?
            .num_vertices();
        let budget = self.budget;
        let ctx = self.ctx.clone();
        let device = ctx.as_deref();

        self.hrank.ensure_len(n, target, device, &budget)?;
        self.arank.ensure_len(n, target, device, &budget)?;
        self.in_degrees.ensure_len(n, target, device, &budget)?;
        self.out_degrees.ensure_len(n, target, device, &budget)?;
        self.visited.ensure_len(n, target, device, &budget)?;

        self.hrank.reset_selector();
        self.arank.reset_selector();
        self.hrank.curr_mut().fill(RANK_SEED, target, device)?;
        self.hrank.next_mut().fill(0.0, target, device)?;
        self.arank.curr_mut().fill(RANK_SEED, target, device)?;
        self.arank.next_mut().fill(0.0, target, device)?;
        self.in_degrees.fill(0, target, device)?;
        self.out_degrees.fill(0, target, device)?;
        self.visited.fill(0, target, device)?;

        if target.has_device() {
            if let Some(device) = device {
                // All queued fills must have landed before the call returns
                device.sync();
            }
        }

        log::trace!("slice {}: reset {} vertices", self.device_index, n);
        Ok(())
    }

    /// Seed the degree tables from the partition topology
    ///
    /// Reset zeroes the degree arrays; this fills them with the vertices'
    /// full-graph degrees so the first iteration can normalize by them.
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::Uninitialized`] before [`DataSlice::init`].
    pub fn load_degrees(&mut self, target: Target) -> Result<(), SliceError> {
        let partition = self
            .partition
            .clone()
            .filter(|_| self.initialized)
            .ok_or(SliceError::Uninitialized("load_degrees"))?;
        let ctx = self.ctx.clone();
        let device = ctx.as_deref();

        self.out_degrees
            .write(&partition.out_degrees, target, device)?;
        self.in_degrees
            .write(&partition.in_degrees, target, device)?;
        Ok(())
    }

    /// Exchange the roles of `curr` and `next` for both rank quantities
    ///
    /// The per-iteration handoff: O(1), no copy, no reallocation.
    pub fn swap_buffers(&mut self) {
        self.hrank.swap();
        self.arank.swap();
    }

    /// Copy the device-side `curr` rank buffers into their host shadows
    ///
    /// Blocks until the transfers complete.
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::DeviceUnbound`] when the slice has no bound
    /// device or its rank buffers are not device-resident.
    pub async fn read_back_ranks(&mut self) -> Result<(), SliceError> {
        let ctx = self
            .ctx
            .clone()
            .ok_or(SliceError::DeviceUnbound("data_slice"))?;
        self.hrank.curr_mut().read_back(&ctx).await?;
        self.arank.curr_mut().read_back(&ctx).await?;
        ctx.sync();
        Ok(())
    }

    /// Free the working set at `target`
    ///
    /// Released arrays read back as empty; calling again is a no-op. When
    /// `target` includes the device, the migrated topology is freed too.
    pub fn release(&mut self, target: Target) {
        self.hrank.release(target);
        self.arank.release(target);
        self.in_degrees.release(target);
        self.out_degrees.release(target);
        self.visited.release(target);
        if target.has_device() {
            self.topology = None;
        }
    }

    /// Vertex count of the bound partition (0 before init)
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.partition
            .as_ref()
            .map_or(0, |p| p.num_vertices())
    }

    /// Iteration bound supplied at construction
    #[must_use]
    pub const fn max_iter(&self) -> u32 {
        self.max_iter
    }

    /// Device index this slice is bound to
    #[must_use]
    pub const fn device_index(&self) -> usize {
        self.device_index
    }

    /// The bound partition, if initialized
    #[must_use]
    pub fn partition(&self) -> Option<&Arc<GraphPartition>> {
        self.partition.as_ref()
    }

    /// The bound device context, if any
    #[must_use]
    pub fn device_context(&self) -> Option<&Arc<GpuDevice>> {
        self.ctx.as_ref()
    }

    /// Device-resident topology, if migrated
    #[must_use]
    pub const fn topology(&self) -> Option<&PartitionTopology> {
        self.topology.as_ref()
    }

    /// Whether `init` has completed
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether no device-side storage remains (arrays and topology)
    #[must_use]
    pub const fn is_device_empty(&self) -> bool {
        self.hrank.is_device_empty()
            && self.arank.is_device_empty()
            && self.in_degrees.is_device_empty()
            && self.out_degrees.is_device_empty()
            && self.visited.is_device_empty()
            && self.topology.is_none()
    }
}
