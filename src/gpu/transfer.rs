//! Host/device transfer helpers
//!
//! Device → host readback goes through a staging buffer: copy into a
//! `MAP_READ` buffer, map it asynchronously, and hand the mapped bytes back
//! as a host vector. Host → device writes go through the device queue and
//! are ordered by submission.

use bytemuck::Pod;

use super::GpuDevice;
use crate::error::SliceError;

/// Read `len` elements back from a device buffer into a host vector
///
/// Submits a buffer-to-buffer copy into a staging buffer, then maps the
/// staging buffer and blocks the device until the map completes.
///
/// # Errors
///
/// Returns [`SliceError::Transfer`] if the copy or the mapping fails.
pub async fn read_buffer<T: Pod>(
    ctx: &GpuDevice,
    source: &wgpu::Buffer,
    len: usize,
) -> Result<Vec<T>, SliceError> {
    if len == 0 {
        return Ok(Vec::new());
    }

    let size = (len * std::mem::size_of::<T>()) as u64;
    let staging_buffer = ctx.create_buffer(
        "Readback Staging",
        size,
        wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
    )?;

    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    encoder.copy_buffer_to_buffer(source, 0, &staging_buffer, 0, size);
    ctx.queue().submit(Some(encoder.finish()));

    let buffer_slice = staging_buffer.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();

    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    ctx.device().poll(wgpu::Maintain::Wait);
    rx.receive()
        .await
        .ok_or_else(|| SliceError::Transfer("map result channel closed".to_string()))?
        .map_err(|e| SliceError::Transfer(format!("buffer mapping failed: {e:?}")))?;

    let data = buffer_slice.get_mapped_range();
    let values: Vec<T> = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging_buffer.unmap();

    Ok(values)
}

/// Overwrite a device buffer with `len` copies of `value`
///
/// The write is queued; callers needing completion guarantees follow up with
/// [`GpuDevice::sync`].
pub fn fill_buffer<T: Pod>(ctx: &GpuDevice, target: &wgpu::Buffer, value: T, len: usize) {
    if len == 0 {
        return;
    }
    let contents = vec![value; len];
    ctx.queue()
        .write_buffer(target, 0, bytemuck::cast_slice(&contents));
}

/// Overwrite a device buffer with the given host elements
pub fn write_buffer<T: Pod>(ctx: &GpuDevice, target: &wgpu::Buffer, contents: &[T]) {
    if contents.is_empty() {
        return;
    }
    ctx.queue()
        .write_buffer(target, 0, bytemuck::cast_slice(contents));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fill_and_read_back() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_fill_and_read_back: GPU not available");
            return;
        }

        let ctx = GpuDevice::new().await.unwrap();
        let buffer = ctx
            .create_buffer(
                "fill_target",
                16 * std::mem::size_of::<f32>() as u64,
                wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            )
            .unwrap();

        fill_buffer(&ctx, &buffer, 1.0_f32, 16);
        ctx.sync();

        let values: Vec<f32> = read_buffer(&ctx, &buffer, 16).await.unwrap();
        assert_eq!(values, vec![1.0; 16]);
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_write_and_read_back: GPU not available");
            return;
        }

        let ctx = GpuDevice::new().await.unwrap();
        let seed: Vec<f32> = (0..8).map(|i| i as f32 * 0.5).collect();
        let buffer = ctx
            .create_buffer_init(
                "write_target",
                bytemuck::cast_slice(&seed),
                wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            )
            .unwrap();

        let values: Vec<f32> = read_buffer(&ctx, &buffer, 8).await.unwrap();
        assert_eq!(values, seed);
    }

    #[tokio::test]
    async fn test_read_back_zero_len() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_read_back_zero_len: GPU not available");
            return;
        }

        let ctx = GpuDevice::new().await.unwrap();
        let buffer = ctx
            .create_buffer("empty", 4, wgpu::BufferUsages::COPY_SRC)
            .unwrap();
        let values: Vec<f32> = read_buffer(&ctx, &buffer, 0).await.unwrap();
        assert!(values.is_empty());
    }
}
