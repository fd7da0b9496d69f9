//! Batches of refined vertices sharing one subdivision rule.
//!
//! A refinement is described as an ordered sequence of [`KernelBatch`]es.
//! Each batch covers a contiguous range of refined vertices computed by the
//! same kernel. The order of the sequence is a dependency order: a batch may
//! read anything written by an earlier batch, never the reverse. Within a
//! batch all elements are independent of each other.
//!
//! For one *Catmull-Clark* level the sequence typically looks like this:
//!
//! | kernel                | writes               | reads                       |
//! |-----------------------|----------------------|-----------------------------|
//! | `FaceVertices`        | face points          | parent level                |
//! | `EdgeVertices`        | edge points          | parent level, face points   |
//! | `VertexVerticesB`     | smooth vertex points | parent level, face points   |
//! | `VertexVerticesA1`    | crease/corner points | parent level                |
//! | `VertexVerticesA2`    | crease/corner points | parent level (accumulating) |
//! | `HierarchicalEdit`    | any vertex of level  | the edit values             |
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The rule a [`KernelBatch`] applies to each of its elements.
///
/// The raw `u32` codes are stable, so batch sequences can be ingested from
/// external producers via [`KernelType::try_from()`].
#[repr(u32)]
#[derive(
    TryFromPrimitive, IntoPrimitive, Copy, Clone, Debug, PartialEq, Eq, Hash, derive_more::Display,
)]
pub enum KernelType {
    /// Face points: the centroid of the parent face.
    FaceVertices = 0,
    /// Edge points.
    EdgeVertices = 1,
    /// Vertex points of smooth vertices, computed from the parent vertex and
    /// its ring of neighbors.
    VertexVerticesB = 2,
    /// First pass for crease and corner vertex points. Clears the
    /// destination.
    VertexVerticesA1 = 3,
    /// Second pass for crease and corner vertex points. Accumulates onto the
    /// result of an earlier pass.
    VertexVerticesA2 = 4,
    /// Hierarchical edits applied to already refined vertices.
    HierarchicalEdit = 5,
    /// Rows of a [`StencilTable`](crate::far::StencilTable).
    Stencils = 6,
}

impl KernelType {
    /// Number of kernel types; the size of per-scheme kernel lookup tables.
    pub const COUNT: usize = 7;
}

/// A contiguous range of refined vertices computed by the same kernel.
///
/// Element `i` in `start..end` reads table row `i + table_offset` and writes
/// vertex `i + vertex_offset` of the bound vertex buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KernelBatch {
    /// The rule applied to every element.
    pub kernel_type: KernelType,
    /// The refinement level the batch produces (1 for the first level).
    pub level: u32,
    /// Index of the [`VertexEditTable`](crate::far::VertexEditTable) used by
    /// [`KernelType::HierarchicalEdit`] batches. Ignored otherwise.
    pub table_index: u32,
    /// First element (inclusive).
    pub start: u32,
    /// Last element (exclusive).
    pub end: u32,
    /// Offset added to an element to get its table row.
    pub table_offset: u32,
    /// Offset added to an element to get its destination vertex.
    pub vertex_offset: u32,
}

impl KernelBatch {
    /// A batch covering `range` at `level` with zero table and vertex
    /// offsets.
    ///
    /// # Panics
    ///
    /// If `range.start > range.end`.
    pub fn new(kernel_type: KernelType, level: u32, range: std::ops::Range<u32>) -> Self {
        assert!(
            range.start <= range.end,
            "KernelBatch range {}..{} is reversed",
            range.start,
            range.end
        );
        Self {
            kernel_type,
            level,
            table_index: 0,
            start: range.start,
            end: range.end,
            table_offset: 0,
            vertex_offset: 0,
        }
    }

    /// Set the table row offset.
    pub fn table_offset(mut self, table_offset: u32) -> Self {
        self.table_offset = table_offset;
        self
    }

    /// Set the destination vertex offset.
    pub fn vertex_offset(mut self, vertex_offset: u32) -> Self {
        self.vertex_offset = vertex_offset;
        self
    }

    /// Set the edit table index.
    pub fn table_index(mut self, table_index: u32) -> Self {
        self.table_index = table_index;
        self
    }

    /// Build a batch from raw codes as produced by an external far-mesh
    /// layer: `[kernel_type, level, table_index, start, end, table_offset,
    /// vertex_offset]`.
    pub fn from_raw(raw: [u32; 7]) -> crate::Result<Self> {
        let [kernel_type, level, table_index, start, end, table_offset, vertex_offset] = raw;
        if start > end {
            return Err(crate::Error::IndexOutOfBounds {
                index: start as usize,
                max: end as usize,
            });
        }
        Ok(Self {
            kernel_type: KernelType::try_from(kernel_type)?,
            level,
            table_index,
            start,
            end,
            table_offset,
            vertex_offset,
        })
    }

    /// Number of elements in the batch.
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }

    /// Table rows read by this batch.
    #[inline]
    pub fn table_rows(&self) -> std::ops::Range<usize> {
        let offset = self.table_offset as usize;
        self.start as usize + offset..self.end as usize + offset
    }

    /// Destination vertices written by this batch.
    #[inline]
    pub fn vertices(&self) -> std::ops::Range<usize> {
        let offset = self.vertex_offset as usize;
        self.start as usize + offset..self.end as usize + offset
    }
}

/// An ordered batch sequence. Order is authoritative.
pub type KernelBatchVector = Vec<KernelBatch>;

/// Returns the highest level any batch in `batches` refines to.
pub fn max_level(batches: &[KernelBatch]) -> Option<u32> {
    batches.iter().map(|batch| batch.level).max()
}
