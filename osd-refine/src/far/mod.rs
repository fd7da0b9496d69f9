//! `Far` holds the device independent, immutable refinement data.
//!
//! Everything here is produced once per topology by an external topology
//! analyzer and then re-applied to fresh primvar data as often as needed.
//! None of these structs reference vertex buffers; they are shared
//! read-only between any number of concurrent evaluations (wrap them in an
//! [`Arc`](std::sync::Arc)).
//!
//! The main structs are:
//!
//! * [`StencilTable`] – A compressed sparse-row table mapping each refined
//!   vertex to a run of (control vertex, weight) pairs, optionally with
//!   first derivative weights.
//! * [`SubdivisionTables`] – Per-rule tables (face-, edge- and vertex-vertex
//!   rows) for level-by-level refinement under the *Bilinear*,
//!   *Catmull-Clark* or *Loop* scheme.
//! * [`VertexEditTable`] – Hierarchical edits applied to refined vertices.
//! * [`KernelBatch`] – A contiguous range of refined vertices sharing one
//!   rule. An ordered [`KernelBatchVector`] encodes the data dependencies
//!   between refinement levels.
pub mod kernel_batch;
pub use kernel_batch::*;

pub mod stencil_table;
pub use stencil_table::*;

pub mod subdivision_tables;
pub use subdivision_tables::*;

pub mod vertex_edit_table;
pub use vertex_edit_table::*;
