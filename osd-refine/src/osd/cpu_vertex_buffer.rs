use bytemuck::Pod;

use super::buffer_descriptor::BufferDescriptor;
use super::compute_context::BufferBinding;
use crate::{Error, Result};

/// Concrete vertex buffer for CPU subdivision.
///
/// Stores `vertices_len` elements of `elements_len` tightly packed `f32`
/// channels. Controllers never require this type, any `&mut [f32]` with a
/// [`BufferDescriptor`] will do. It is just a convenient owner for a single
/// primvar.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CpuVertexBuffer {
    elements_len: usize,
    vertices_len: usize,
    data: Vec<f32>,
}

impl CpuVertexBuffer {
    /// Create a zero-filled buffer.
    #[inline]
    pub fn new(elements_len: usize, vertices_len: usize) -> Result<CpuVertexBuffer> {
        if 0 == elements_len {
            return Err(Error::InvalidDescriptor {
                offset: 0,
                length: 0,
                stride: 0,
            });
        }

        Ok(CpuVertexBuffer {
            elements_len,
            vertices_len,
            data: vec![0.0; elements_len * vertices_len],
        })
    }

    /// Returns how many elements defined in this vertex buffer.
    #[inline]
    pub fn elements_len(&self) -> usize {
        self.elements_len
    }

    /// Returns how many vertices allocated in this vertex buffer.
    #[inline]
    pub fn vertices_len(&self) -> usize {
        self.vertices_len
    }

    /// The descriptor of the packed layout of this buffer.
    #[inline]
    pub fn descriptor(&self) -> BufferDescriptor {
        BufferDescriptor::packed(self.elements_len as u32)
    }

    /// Get the contents of this vertex buffer as a slice of [`f32`].
    #[inline]
    pub fn bind_cpu_buffer(&self) -> &[f32] {
        &self.data
    }

    /// Get the contents of this vertex buffer as a mutable slice of [`f32`].
    #[inline]
    pub fn bind_cpu_buffer_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Bind the whole buffer with its packed descriptor, e.g. for
    /// [`ComputeController::refine()`](crate::osd::ComputeController::refine).
    #[inline]
    pub fn binding(&mut self) -> BufferBinding<'_> {
        let desc = self.descriptor();
        BufferBinding::new(&mut self.data, desc)
    }

    /// This method is meant to be used in client code in order to provide
    /// coarse vertices data.
    ///
    /// Copies `vertices_len` vertices from `src` into this buffer, starting
    /// at vertex `start_vertex`.
    #[inline]
    pub fn update_data(
        &mut self,
        src: &[f32],
        start_vertex: usize,
        vertices_len: usize,
    ) -> Result<()> {
        let elements_len = self.elements_len;

        Error::check_buffer_size(vertices_len * elements_len, src.len())?;
        Error::check_buffer_size((start_vertex + vertices_len) * elements_len, self.data.len())?;

        let start = start_vertex * elements_len;
        let len = vertices_len * elements_len;
        self.data[start..start + len].copy_from_slice(&src[..len]);

        Ok(())
    }

    /// Like [`update_data()`](Self::update_data) but takes vertices as plain
    /// old data, e.g. `&[[f32; 3]]` or a `#[repr(C)]` vertex struct of `f32`s.
    #[inline]
    pub fn update_vertices<T: Pod>(&mut self, vertices: &[T], start_vertex: usize) -> Result<()> {
        let src: &[f32] = bytemuck::try_cast_slice(vertices).map_err(|_| {
            Error::InvalidBufferSize {
                expected: self.elements_len * std::mem::size_of::<f32>(),
                actual: std::mem::size_of::<T>(),
            }
        })?;
        if 0 != src.len() % self.elements_len {
            return Err(Error::InvalidBufferSize {
                expected: self.elements_len,
                actual: std::mem::size_of::<T>() / std::mem::size_of::<f32>(),
            });
        }
        let vertices_len = src.len() / self.elements_len;
        self.update_data(src, start_vertex, vertices_len)
    }

    /// View the buffer as `&[T]`, e.g. `&[[f32; 3]]` for positions.
    ///
    /// Returns `None` if `T` doesn't tile the buffer.
    #[inline]
    pub fn vertices<T: Pod>(&self) -> Option<&[T]> {
        bytemuck::try_cast_slice(&self.data).ok()
    }
}
