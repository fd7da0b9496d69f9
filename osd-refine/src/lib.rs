//#![warn(missing_docs)]
//! # Parallel Subdivision Refinement
//!
//! This crate refines vertex primvar data (positions, colors, texture
//! coordinates, ...) of [subdivision surfaces](https://en.wikipedia.org/wiki/Subdivision_surface)
//! from precomputed tables, in parallel on the CPU.
//!
//! The tables themselves, i.e. which control vertices contribute to a
//! refined vertex and with what weight, are built once per topology by an
//! external topology analyzer. This crate only *consumes* them:
//!
//! * [`far`] holds the immutable, shareable table data: the
//!   [`StencilTable`](far::StencilTable), the per-rule
//!   [`SubdivisionTables`](far::SubdivisionTables), hierarchical
//!   [`VertexEditTable`](far::VertexEditTable)s and the ordered
//!   [`KernelBatch`](far::KernelBatch) sequence.
//! * [`osd`] holds everything that touches vertex buffers: the
//!   [`BufferDescriptor`](osd::BufferDescriptor) describing interleaved
//!   layouts, the contexts binding host buffers for the duration of one
//!   call, and the controllers that fan the per-vertex work out over a
//!   worker pool.
//!
//! The code is optimized for deforming surfaces with static topology: the
//! tables are built once and re-applied every frame to fresh control data.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use osd_refine::{far, osd};
//!
//! # fn main() -> osd_refine::Result<()> {
//! // Two refined vertices: the midpoint of both control vertices and a copy
//! // of the second one.
//! let table = Arc::new(far::StencilTable::from_stencils([
//!     (&[0u32, 1][..], &[0.5f32, 0.5][..]),
//!     (&[1u32][..], &[1.0f32][..]),
//! ])?);
//!
//! let desc = osd::BufferDescriptor::packed(3);
//! let context = osd::EvalStencilsContext::new(table, desc, desc);
//! let controller = osd::EvalStencilsController::new(Default::default())?;
//!
//! let control = [1.0f32, 2.0, 3.0, 3.0, 4.0, 5.0];
//! let mut refined = [0.0f32; 6];
//! {
//!     let mut bound = context.bind(osd::StencilBuffers {
//!         control: Some(&control),
//!         output: Some(&mut refined),
//!         ..Default::default()
//!     })?;
//!     assert_eq!(controller.update_values(&mut bound), 2);
//! }
//! controller.synchronize();
//!
//! assert_eq!(refined, [2.0, 3.0, 4.0, 3.0, 4.0, 5.0]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
#![doc = document_features::document_features!()]
//!
//! ## API Conventions
//!
//! * Canonical Rust naming – `num_stencils()` becomes `len()`,
//!   `num_control_vertices()` becomes `control_vertex_count()`.
//! * Option structs use the [init struct
//!   pattern](https://xaeroxe.github.io/init-struct-pattern/).
//! * Unsigned integer types (`u32`, `usize`) are used for anything that can
//!   only contain positive values (indices, sizes, counts, valences).
//! * Host buffers are never owned. Binding them to a context yields a handle
//!   that borrows them; dropping the handle unbinds.

pub mod error;
pub mod far;
pub mod osd;

pub use error::{Error, Result};

/// A vertex, edge, or face index in the topology.
///
/// # Examples
///
/// ```
/// use osd_refine::Index;
///
/// // Create an index from a u32
/// let idx = Index::from(42u32);
/// assert_eq!(idx.0, 42);
///
/// // Convert back to usize for slice addressing
/// let as_usize: usize = idx.into();
/// assert_eq!(as_usize, 42);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    bytemuck::Pod,
    bytemuck::Zeroable,
    derive_more::Display,
)]
#[repr(transparent)]
pub struct Index(pub u32);

impl From<u32> for Index {
    fn from(value: u32) -> Self {
        Index(value)
    }
}

impl From<Index> for u32 {
    fn from(index: Index) -> Self {
        index.0
    }
}

impl From<usize> for Index {
    fn from(value: usize) -> Self {
        Index(value as u32)
    }
}

impl From<Index> for usize {
    fn from(index: Index) -> Self {
        index.0 as usize
    }
}

impl Index {
    /// Returns the index as a `usize`, for addressing slices.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}
