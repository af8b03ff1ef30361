use bytemuck::{Pod, Zeroable};

use crate::error::RendererError;

/// Viewport dimensions in pixels.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Checked constructor. Both dimensions must be non-zero and the pixel
    /// count must fit in `usize`.
    pub fn new(width: u32, height: u32) -> Result<Self, RendererError> {
        if width == 0 || height == 0 {
            return Err(RendererError::invalid(format!(
                "viewport must be non-empty, got {}x{}",
                width, height
            )));
        }
        let size = Size { width, height };
        size.checked_pixel_count()
            .ok_or(RendererError::Allocation { len: usize::MAX })?;
        Ok(size)
    }

    fn checked_pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Bytes in one tightly packed row of 4-byte pixels.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * 4
    }

    pub fn half_width(&self) -> u32 {
        self.width / 2
    }

    pub fn half_height(&self) -> u32 {
        self.height / 2
    }
}
