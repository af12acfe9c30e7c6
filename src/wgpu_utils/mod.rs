//! WGPU utility functions and helpers

pub mod uniform_buffer;

pub use uniform_buffer::UniformBuffer;

/// `wgpu` requires texture-to-buffer copies to use rows aligned to
/// [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`].
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_rows() {
        assert_eq!(padded_bytes_per_row(64, 4), 256);
        assert_eq!(padded_bytes_per_row(65, 4), 512);
        assert_eq!(padded_bytes_per_row(320, 4), 1280);
        assert_eq!(padded_bytes_per_row(1, 4), 256);
    }
}
