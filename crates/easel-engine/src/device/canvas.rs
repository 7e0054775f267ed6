use futures::channel::oneshot;

use super::Gpu;
use crate::error::GpuResourceError;

/// Pixel format of every canvas.
pub const CANVAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Offscreen color target standing in for a window's drawing buffer.
pub struct Canvas {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl Canvas {
    pub fn new(gpu: &Gpu, width: u32, height: u32) -> Result<Self, GpuResourceError> {
        if width == 0 || height == 0 {
            return Err(GpuResourceError::Empty { what: "canvas" });
        }
        let limit = gpu.limits().max_texture_dimension_2d;
        let largest = width.max(height);
        if largest > limit {
            return Err(GpuResourceError::LimitExceeded {
                what: "canvas dimension",
                requested: largest as u64,
                limit: limit as u64,
            });
        }

        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("easel canvas"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CANVAS_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self { texture, view, width, height })
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Reads the canvas back as tightly packed RGBA8, top row first.
    ///
    /// Blocks until the GPU has finished every submitted command.
    pub fn read_pixels(&self, gpu: &Gpu) -> Result<Vec<u8>, GpuResourceError> {
        let bytes_per_pixel: u32 = 4;
        let bytes_per_row = bytes_per_pixel * self.width;
        let padded_bytes_per_row = bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let buffer = gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("easel canvas readback"),
            size: padded_bytes_per_row as u64 * self.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("easel readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        gpu.submit(encoder);

        let slice = buffer.slice(..);
        let (tx, rx) = oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        gpu.device()
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GpuResourceError::Device(e.to_string()))?;

        match pollster::block_on(rx) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(GpuResourceError::Device(e.to_string())),
            Err(oneshot::Canceled) => return Err(GpuResourceError::ContextLost),
        }

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((bytes_per_row * self.height) as usize);
        for row in 0..self.height as usize {
            let start = row * padded_bytes_per_row as usize;
            pixels.extend_from_slice(&data[start..start + bytes_per_row as usize]);
        }
        drop(data);
        buffer.unmap();

        Ok(pixels)
    }
}
