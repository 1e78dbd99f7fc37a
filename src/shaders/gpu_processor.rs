// SPDX-License-Identifier: GPL-3.0-only

//! Shared GPU readback infrastructure
//!
//! Provides the pieces every synchronous readback needs:
//! - Staging buffer sizing with dimension caching
//! - Row pitch alignment for texture-to-buffer copies
//! - Buffer mapping (map, poll, read, unmap)

use crate::constants::COPY_ROW_ALIGNMENT;
use crate::gpu::wgpu;

/// Cached resource dimensions - avoids reallocation when dimensions match
#[derive(Default, Clone, Copy, PartialEq, Debug)]
pub struct CachedDimensions {
    pub width: u32,
    pub height: u32,
}

impl CachedDimensions {
    /// Check if dimensions have changed and need update
    pub fn needs_update(&self, width: u32, height: u32) -> bool {
        self.width != width || self.height != height
    }

    /// Update cached dimensions
    pub fn update(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Check if dimensions are initialized (non-zero)
    pub fn is_initialized(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Bytes per row of a texture copy, padded to the copy alignment
#[inline]
pub fn aligned_bytes_per_row(width: u32, bytes_per_texel: u32) -> u32 {
    (width * bytes_per_texel).div_ceil(COPY_ROW_ALIGNMENT) * COPY_ROW_ALIGNMENT
}

/// Drop the alignment padding from a mapped texture copy
pub fn strip_row_padding(data: &[u8], width: u32, height: u32, bytes_per_texel: u32) -> Vec<u8> {
    let padded = aligned_bytes_per_row(width, bytes_per_texel) as usize;
    let row = (width * bytes_per_texel) as usize;

    let mut out = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        let start = y * padded;
        out.extend_from_slice(&data[start..start + row]);
    }
    out
}

/// Helper for async buffer readback (map, poll, read, unmap)
///
/// # Arguments
/// * `device` - The wgpu device for polling
/// * `buffer` - The buffer to read from (must be MAP_READ)
///
/// # Returns
/// The buffer contents as a Vec<u8>
pub async fn read_buffer_async(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> Result<Vec<u8>, String> {
    let slice = buffer.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    let _ = device.poll(wgpu::PollType::wait_indefinitely());

    receiver
        .await
        .map_err(|_| "Failed to receive buffer mapping".to_string())?
        .map_err(|e| format!("Failed to map buffer: {:?}", e))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_dimensions() {
        let mut dims = CachedDimensions::default();
        assert!(!dims.is_initialized());
        assert!(dims.needs_update(640, 1));

        dims.update(640, 1);
        assert!(dims.is_initialized());
        assert!(!dims.needs_update(640, 1));
        assert!(dims.needs_update(160, 1));
    }

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(aligned_bytes_per_row(1, 4), 256);
        assert_eq!(aligned_bytes_per_row(64, 4), 256);
        assert_eq!(aligned_bytes_per_row(65, 4), 512);
        assert_eq!(aligned_bytes_per_row(400, 4), 1792);

        // Rgba32Uint rows fill the alignment four times faster
        assert_eq!(aligned_bytes_per_row(1, 16), 256);
        assert_eq!(aligned_bytes_per_row(16, 16), 256);
        assert_eq!(aligned_bytes_per_row(17, 16), 512);
        assert_eq!(aligned_bytes_per_row(400, 16), 6400);
    }

    #[test]
    fn test_strip_row_padding() {
        let width = 2;
        let height = 2;
        let mut data = vec![0u8; 256 * 2];
        data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data[256..264].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);

        let packed = strip_row_padding(&data, width, height, 4);
        assert_eq!(packed, (1..=16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_strip_row_padding_wide_texels() {
        // 3 texels of 16 bytes per row, padded to 256
        let mut data = vec![0u8; 256 * 2];
        data[..48].fill(1);
        data[256..304].fill(2);

        let packed = strip_row_padding(&data, 3, 2, 16);
        assert_eq!(packed.len(), 96);
        assert!(packed[..48].iter().all(|&b| b == 1));
        assert!(packed[48..].iter().all(|&b| b == 2));
    }
}
