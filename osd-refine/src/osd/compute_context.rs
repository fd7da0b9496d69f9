use std::sync::Arc;

use super::buffer_descriptor::BufferDescriptor;
use crate::far::{StencilTable, SubdivisionTables, VertexEditTable};
use crate::{Error, Result};

/// A host vertex buffer together with the layout of the primvar to refine.
///
/// The buffer holds the coarse vertices followed by room for every refined
/// level.
#[derive(Debug)]
pub struct BufferBinding<'a> {
    pub data: &'a mut [f32],
    pub desc: BufferDescriptor,
}

impl<'a> BufferBinding<'a> {
    #[inline]
    pub fn new(data: &'a mut [f32], desc: BufferDescriptor) -> Self {
        Self { data, desc }
    }

    /// Number of whole elements the buffer holds.
    pub fn elements_len(&self) -> usize {
        let stride = self.desc.stride as usize;
        let start = self.desc.offset as usize + self.desc.length as usize;
        if 0 == stride || self.data.len() < start {
            0
        } else {
            (self.data.len() - start) / stride + 1
        }
    }

    fn check(&self) -> Result<()> {
        if self.desc.is_valid() {
            Ok(())
        } else {
            Err(Error::InvalidDescriptor {
                offset: self.desc.offset,
                length: self.desc.length,
                stride: self.desc.stride,
            })
        }
    }
}

/// The tables of one mesh for batch refinement by
/// [`ComputeController`](super::ComputeController).
///
/// A context is immutable and can be shared between threads; bind it to
/// vertex buffers with [`bind()`](Self::bind).
#[derive(Clone, Debug)]
pub struct ComputeContext {
    tables: Arc<SubdivisionTables>,
    edit_tables: Vec<VertexEditTable>,
    stencil_table: Option<Arc<StencilTable>>,
}

impl ComputeContext {
    pub fn new(tables: Arc<SubdivisionTables>) -> Self {
        Self {
            tables,
            edit_tables: Vec::new(),
            stencil_table: None,
        }
    }

    /// Hierarchical edit tables, addressed by
    /// [`KernelBatch::table_index`](crate::far::KernelBatch::table_index).
    pub fn with_edit_tables(mut self, edit_tables: Vec<VertexEditTable>) -> Self {
        self.edit_tables = edit_tables;
        self
    }

    /// Stencils for [`KernelType::Stencils`](crate::far::KernelType::Stencils)
    /// batches.
    pub fn with_stencil_table(mut self, stencil_table: Arc<StencilTable>) -> Self {
        self.stencil_table = Some(stencil_table);
        self
    }

    #[inline]
    pub fn tables(&self) -> &SubdivisionTables {
        &self.tables
    }

    #[inline]
    pub fn edit_tables(&self) -> &[VertexEditTable] {
        &self.edit_tables
    }

    #[inline]
    pub fn stencil_table(&self) -> Option<&StencilTable> {
        self.stencil_table.as_deref()
    }

    /// Bind the vertex buffer and, optionally, a varying buffer.
    ///
    /// Both descriptors must be [valid](BufferDescriptor::is_valid) and
    /// every edit table's primvar window must fit into the vertex
    /// descriptor. Buffer lengths are checked per dispatch, against the
    /// vertices the batches actually write.
    ///
    /// The buffers stay borrowed until the returned handle is dropped.
    pub fn bind<'a>(
        &'a self,
        vertex: BufferBinding<'a>,
        varying: Option<BufferBinding<'a>>,
    ) -> Result<BoundComputeContext<'a>> {
        vertex.check()?;
        if let Some(varying) = &varying {
            varying.check()?;
        }

        for edits in &self.edit_tables {
            if (vertex.desc.length as usize) < edits.primvar_end() {
                return Err(Error::InvalidEditTable(format!(
                    "Edits write channels [{}, {}) but the vertex layout only has {}.",
                    edits.primvar_offset(),
                    edits.primvar_end(),
                    vertex.desc.length
                )));
            }
        }

        log::trace!(
            "Bound compute context ({} vertex elements, varying: {})",
            vertex.elements_len(),
            varying.is_some()
        );

        Ok(BoundComputeContext {
            context: self,
            vertex,
            varying,
        })
    }
}

/// A [`ComputeContext`] with vertex buffers bound.
///
/// Dropping the handle unbinds the buffers.
#[derive(Debug)]
pub struct BoundComputeContext<'a> {
    context: &'a ComputeContext,
    pub(crate) vertex: BufferBinding<'a>,
    pub(crate) varying: Option<BufferBinding<'a>>,
}

impl<'a> BoundComputeContext<'a> {
    #[inline]
    pub fn context(&self) -> &'a ComputeContext {
        self.context
    }

    /// The bound vertex buffer.
    #[inline]
    pub fn vertex(&self) -> &[f32] {
        &*self.vertex.data
    }

    /// The bound varying buffer, if any.
    #[inline]
    pub fn varying(&self) -> Option<&[f32]> {
        self.varying.as_ref().map(|varying| &*varying.data)
    }
}

impl Drop for BoundComputeContext<'_> {
    fn drop(&mut self) {
        log::trace!("Unbound compute context");
    }
}
