//! Named per-vertex arrays with host and device residency
//!
//! A [`SliceArray`] is the unit of storage a data slice is built from: a
//! labelled array that can live in host memory, device memory, or both. The
//! host side is a plain vector (the "host shadow"), the device side a wgpu
//! storage buffer. Every lifecycle operation names a [`Target`] saying which
//! side it acts on, and device allocations are checked against a
//! [`MemoryBudget`] before any buffer is created.

use bytemuck::{Pod, Zeroable};

use crate::error::SliceError;
use crate::gpu::{transfer, GpuDevice};

/// Memory location(s) a lifecycle operation acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// No location (no-op target)
    None,
    /// Host memory only
    Host,
    /// Device memory only
    Device,
    /// Both host and device memory
    Both,
}

impl Target {
    /// Whether this target includes host memory
    #[must_use]
    pub const fn has_host(self) -> bool {
        matches!(self, Self::Host | Self::Both)
    }

    /// Whether this target includes device memory
    #[must_use]
    pub const fn has_device(self) -> bool {
        matches!(self, Self::Device | Self::Both)
    }
}

/// Per-device allocation ceiling
///
/// A single allocation request larger than the ceiling fails immediately
/// with [`SliceError::AllocationExceedsBudget`]; nothing is retried.
#[derive(Debug, Clone, Copy)]
pub struct MemoryBudget {
    max_allocation: u64,
}

impl MemoryBudget {
    /// No ceiling
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_allocation: u64::MAX,
        }
    }

    /// Explicit ceiling in bytes
    #[must_use]
    pub const fn with_max_allocation(bytes: u64) -> Self {
        Self {
            max_allocation: bytes,
        }
    }

    /// Derive a budget from the device's buffer-size limit
    ///
    /// Uses 70% of the reported limit, leaving headroom for staging buffers
    /// and the topology arrays.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn detect(ctx: &GpuDevice) -> Self {
        let limit = ctx.device().limits().max_buffer_size;
        Self {
            max_allocation: (limit as f64 * 0.7) as u64,
        }
    }

    /// Check a single allocation request against the ceiling
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::AllocationExceedsBudget`] if `bytes` exceeds
    /// the ceiling.
    pub fn check(&self, label: &'static str, bytes: u64) -> Result<(), SliceError> {
        if bytes > self.max_allocation {
            return Err(SliceError::AllocationExceedsBudget {
                label,
                requested: bytes,
                budget: self.max_allocation,
            });
        }
        Ok(())
    }
}

/// A labelled per-vertex array with a host shadow and an optional device buffer
#[derive(Debug)]
pub struct SliceArray<T: Pod> {
    label: &'static str,
    host: Vec<T>,
    device: Option<wgpu::Buffer>,
    device_len: usize,
}

impl<T: Pod> SliceArray<T> {
    const USAGE: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
        .union(wgpu::BufferUsages::COPY_DST)
        .union(wgpu::BufferUsages::COPY_SRC);

    /// Create a named, unallocated array
    #[must_use]
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            host: Vec::new(),
            device: None,
            device_len: 0,
        }
    }

    /// Array label (used in errors and buffer labels)
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Allocate `len` zeroed elements at `target`
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::AllocationExceedsBudget`] when the request is
    /// over budget, or [`SliceError::DeviceUnbound`] when `target` includes
    /// the device and no context is supplied.
    pub fn allocate(
        &mut self,
        len: usize,
        target: Target,
        ctx: Option<&GpuDevice>,
        budget: &MemoryBudget,
    ) -> Result<(), SliceError> {
        let bytes = (len * std::mem::size_of::<T>()) as u64;
        budget.check(self.label, bytes)?;

        if target.has_host() {
            self.host = vec![T::zeroed(); len];
        }

        if target.has_device() {
            let ctx = ctx.ok_or(SliceError::DeviceUnbound(self.label))?;
            self.device = if len == 0 {
                None
            } else {
                Some(ctx.create_buffer(self.label, bytes, Self::USAGE)?)
            };
            self.device_len = len;
        }

        Ok(())
    }

    /// Ensure capacity of at least `len` elements at `target`
    ///
    /// Grows (zero-extending) when the current allocation is smaller; never
    /// shrinks. Idempotent when the size already fits.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SliceArray::allocate`].
    pub fn ensure_len(
        &mut self,
        len: usize,
        target: Target,
        ctx: Option<&GpuDevice>,
        budget: &MemoryBudget,
    ) -> Result<(), SliceError> {
        if target.has_host() && self.host.len() < len {
            budget.check(self.label, (len * std::mem::size_of::<T>()) as u64)?;
            self.host.resize(len, T::zeroed());
        }

        if target.has_device() && self.device_len < len {
            let bytes = (len * std::mem::size_of::<T>()) as u64;
            budget.check(self.label, bytes)?;
            let ctx = ctx.ok_or(SliceError::DeviceUnbound(self.label))?;
            // Grown device arrays start fresh; resizing happens only inside
            // Init/Reset, which overwrite contents anyway
            self.device = Some(ctx.create_buffer(self.label, bytes, Self::USAGE)?);
            self.device_len = len;
        }

        Ok(())
    }

    /// Overwrite every element at `target` with `value`
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::DeviceUnbound`] when `target` includes the
    /// device, a device buffer exists, and no context is supplied.
    pub fn fill(
        &mut self,
        value: T,
        target: Target,
        ctx: Option<&GpuDevice>,
    ) -> Result<(), SliceError> {
        if target.has_host() {
            self.host.fill(value);
        }

        if target.has_device() {
            if let Some(buffer) = &self.device {
                let ctx = ctx.ok_or(SliceError::DeviceUnbound(self.label))?;
                transfer::fill_buffer(ctx, buffer, value, self.device_len);
            }
        }

        Ok(())
    }

    /// Overwrite the array's prefix at `target` with `data`
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::Transfer`] when `data` is longer than the
    /// allocation, or [`SliceError::DeviceUnbound`] for an unbound device
    /// write.
    pub fn write(
        &mut self,
        data: &[T],
        target: Target,
        ctx: Option<&GpuDevice>,
    ) -> Result<(), SliceError> {
        if target.has_host() {
            if data.len() > self.host.len() {
                return Err(SliceError::Transfer(format!(
                    "{}: write of {} elements into host allocation of {}",
                    self.label,
                    data.len(),
                    self.host.len()
                )));
            }
            self.host[..data.len()].copy_from_slice(data);
        }

        if target.has_device() {
            if data.len() > self.device_len {
                return Err(SliceError::Transfer(format!(
                    "{}: write of {} elements into device allocation of {}",
                    self.label,
                    data.len(),
                    self.device_len
                )));
            }
            if let Some(buffer) = &self.device {
                let ctx = ctx.ok_or(SliceError::DeviceUnbound(self.label))?;
                transfer::write_buffer(ctx, buffer, data);
            }
        }

        Ok(())
    }

    /// Copy the device contents into the host shadow
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::DeviceUnbound`] when no device buffer exists,
    /// or [`SliceError::Transfer`] when the readback fails.
    pub async fn read_back(&mut self, ctx: &GpuDevice) -> Result<(), SliceError> {
        let buffer = self
            .device
            .as_ref()
            .ok_or(SliceError::DeviceUnbound(self.label))?;
        self.host = transfer::read_buffer(ctx, buffer, self.device_len).await?;
        Ok(())
    }

    /// Free storage at `target`
    ///
    /// Released sides read back as empty. Calling again is a no-op.
    pub fn release(&mut self, target: Target) {
        if target.has_host() {
            self.host = Vec::new();
        }
        if target.has_device() {
            self.device = None;
            self.device_len = 0;
        }
    }

    /// Host shadow contents
    #[must_use]
    pub fn host(&self) -> &[T] {
        &self.host
    }

    /// Mutable host shadow contents
    pub fn host_mut(&mut self) -> &mut [T] {
        &mut self.host
    }

    /// Host shadow length
    #[must_use]
    pub fn host_len(&self) -> usize {
        self.host.len()
    }

    /// Device-side element count
    #[must_use]
    pub const fn device_len(&self) -> usize {
        self.device_len
    }

    /// Device buffer handle, if device-resident
    #[must_use]
    pub const fn device_buffer(&self) -> Option<&wgpu::Buffer> {
        self.device.as_ref()
    }

    /// Whether the device side holds no storage
    #[must_use]
    pub const fn is_device_empty(&self) -> bool {
        self.device.is_none()
    }
}
