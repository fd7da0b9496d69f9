//! # Osd
//! `osd` applies the [`far`](crate::far) tables to vertex buffers on the CPU.
//! The main roles of `osd` are:
//! * **Stencil Evaluation**
//!
//!   Compute refined vertices, and optionally their first derivatives, from
//!   a [`StencilTable`](crate::far::StencilTable) with an
//!   [`EvalStencilsController`].
//! * **Batch Refinement**
//!
//!   Run an ordered [`KernelBatch`](crate::far::KernelBatch) sequence over
//!   [`SubdivisionTables`](crate::far::SubdivisionTables) in place, level by
//!   level, with a [`ComputeController`].
//! * **Interleaved Buffer Configuration**
//!
//!   Every primvar is located by a [`BufferDescriptor`], so positions,
//!   colors, and whatever else may share one buffer.
//!
//! Controllers don't own vertex buffers. Clients bind their own slices to a
//! context for the duration of one call; the returned handle borrows them
//! and unbinds on drop. Contexts and tables can be shared between threads,
//! a bound context can't.
//!
//! Within one controller call, refined vertices are computed in parallel on
//! the controller's worker pool. The call returns only once every worker is
//! done, so [`EvalStencilsController::synchronize()`] and
//! [`ComputeController::synchronize()`] have nothing left to wait for.
pub mod buffer_descriptor;
pub use buffer_descriptor::*;

pub mod compute_context;
pub use compute_context::*;

pub mod compute_controller;
pub use compute_controller::*;

pub mod controller_options;
pub use controller_options::*;

pub(crate) mod cpu_kernel;

pub mod cpu_vertex_buffer;
pub use cpu_vertex_buffer::*;

pub mod eval_stencils_context;
pub use eval_stencils_context::*;

pub mod eval_stencils_controller;
pub use eval_stencils_controller::*;
