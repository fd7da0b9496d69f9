use super::compute_context::{BoundComputeContext, BufferBinding, ComputeContext};
use super::controller_options::ControllerOptions;
use super::cpu_kernel::{self, Accumulator, Rule};
use crate::far::{
    EditOperation, KernelBatch, KernelType, StencilTable, SubdivisionTables, VertexEditTable,
};
use crate::{Error, Result};

/// Runs [`KernelBatch`] sequences over bound vertex buffers on a fixed-size
/// worker pool.
///
/// Batches run strictly in the given order; batch `k + 1` starts only once
/// every element of batch `k` is written. Within a batch, elements are
/// computed in parallel and in no particular order. A batch may only read
/// vertices before its first destination vertex, i.e. the coarse vertices
/// and those written by earlier batches; [`dispatch()`](Self::dispatch)
/// rejects sequences that don't. This makes the result independent of the
/// number of threads.
///
/// ```
/// use std::sync::Arc;
/// use osd_refine::{far, osd, Index};
///
/// # fn main() -> osd_refine::Result<()> {
/// // Bilinear refinement of one edge: its midpoint becomes vertex 2.
/// let tables = Arc::new(far::SubdivisionTables {
///     scheme: far::Scheme::Bilinear,
///     edge_vertices: vec![far::EdgeVertexRule::sharp([Index(0), Index(1)])],
///     ..Default::default()
/// });
/// let batches = [far::KernelBatch::new(far::KernelType::EdgeVertices, 1, 0..1).vertex_offset(2)];
///
/// let context = osd::ComputeContext::new(tables);
/// let controller = osd::ComputeController::new(Default::default())?;
///
/// let mut vertices = [0.0f32, 0.0, 2.0, 4.0, 0.0, 0.0];
/// let desc = osd::BufferDescriptor::packed(2);
/// controller.refine(&context, &batches, osd::BufferBinding::new(&mut vertices, desc), None)?;
///
/// assert_eq!(vertices[4..], [1.0, 2.0]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ComputeController {
    pool: rayon::ThreadPool,
}

impl ComputeController {
    pub fn new(options: ControllerOptions) -> Result<Self> {
        Ok(Self {
            pool: options.build_thread_pool()?,
        })
    }

    /// Number of worker threads.
    #[inline]
    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Bind `vertex` (and `varying`) to `context`, run all `batches` and
    /// unbind.
    ///
    /// Returns the number of refined elements written.
    pub fn refine(
        &self,
        context: &ComputeContext,
        batches: &[KernelBatch],
        vertex: BufferBinding<'_>,
        varying: Option<BufferBinding<'_>>,
    ) -> Result<usize> {
        let mut bound = context.bind(vertex, varying)?;
        self.dispatch(&mut bound, batches, None)
    }

    /// Like [`refine()`](Self::refine) but skips batches above `max_level`.
    pub fn refine_to_level(
        &self,
        context: &ComputeContext,
        batches: &[KernelBatch],
        max_level: u32,
        vertex: BufferBinding<'_>,
        varying: Option<BufferBinding<'_>>,
    ) -> Result<usize> {
        let mut bound = context.bind(vertex, varying)?;
        self.dispatch(&mut bound, batches, Some(max_level))
    }

    /// Run `batches` in order on an already bound context, skipping those
    /// above `max_level` if given.
    ///
    /// Every batch that is going to run is validated before the first one
    /// starts; on error the buffers are untouched. Returns the number of
    /// refined elements written.
    pub fn dispatch(
        &self,
        bound: &mut BoundComputeContext<'_>,
        batches: &[KernelBatch],
        max_level: Option<u32>,
    ) -> Result<usize> {
        let context = bound.context();
        let active = || {
            batches
                .iter()
                .filter(move |batch| max_level.map_or(true, |max_level| batch.level <= max_level))
        };

        for batch in active() {
            validate(context, bound, batch)?;
        }

        log::debug!(
            "Dispatching {} of {} batches (max level: {:?})",
            active().count(),
            batches.len(),
            max_level
        );

        let tables = context.tables();
        let mut processed = 0;
        for batch in active() {
            log::trace!(
                "{} batch, level {}, rows {:?} -> vertices {:?}",
                batch.kernel_type,
                batch.level,
                batch.table_rows(),
                batch.vertices()
            );

            match batch.kernel_type {
                KernelType::HierarchicalEdit => {
                    let edits = &context.edit_tables()[batch.table_index as usize];
                    apply_edits(edits, batch, &mut bound.vertex);
                }
                KernelType::Stencils => {
                    if let Some(table) = context.stencil_table() {
                        self.run_stencils(table, batch, &mut bound.vertex);
                    }
                }
                kernel_type => {
                    if let Some(kernel) = cpu_kernel::rule_kernel(tables.scheme, kernel_type) {
                        self.run_rule(kernel.vertex, tables, batch, &mut bound.vertex);
                        if let (Some(rule), Some(varying)) = (kernel.varying, &mut bound.varying) {
                            self.run_rule(rule, tables, batch, varying);
                        }
                    }
                }
            }

            processed += batch.len();
        }

        Ok(processed)
    }

    /// Wait for outstanding work. Dispatch is synchronous, so this returns
    /// immediately.
    #[inline]
    pub fn synchronize(&self) {}

    fn run_rule(
        &self,
        rule: Rule,
        tables: &SubdivisionTables,
        batch: &KernelBatch,
        binding: &mut BufferBinding<'_>,
    ) {
        let desc = binding.desc;
        let row = batch.table_rows().start;

        self.pool.install(|| {
            cpu_kernel::for_each_element(
                binding.data,
                desc,
                batch.vertices().start,
                batch.len(),
                |src, i, dst| rule(tables, row + i, &mut Accumulator::new(src, desc, dst)),
            )
        });
    }

    fn run_stencils(&self, table: &StencilTable, batch: &KernelBatch, binding: &mut BufferBinding<'_>) {
        let desc = binding.desc;
        let row = batch.table_rows().start;

        self.pool.install(|| {
            cpu_kernel::for_each_element(
                binding.data,
                desc,
                batch.vertices().start,
                batch.len(),
                |src, i, dst| {
                    cpu_kernel::stencil(
                        table,
                        table.weights(),
                        row + i,
                        &mut Accumulator::new(src, desc, dst),
                    )
                },
            )
        });
    }
}

/// Edits may hit the same vertex more than once, so they are applied in row
/// order on the calling thread.
fn apply_edits(edits: &VertexEditTable, batch: &KernelBatch, binding: &mut BufferBinding<'_>) {
    let desc = binding.desc;
    let primvar_offset = edits.primvar_offset() as usize;

    for row in batch.table_rows() {
        let Some((vertex, values)) = edits.edit(row) else {
            continue;
        };
        let start =
            desc.element_start(vertex.idx() + batch.vertex_offset as usize) + primvar_offset;
        let dst = &mut binding.data[start..start + values.len()];

        match edits.operation() {
            EditOperation::Set => dst.copy_from_slice(values),
            EditOperation::Add => {
                for (dst, value) in dst.iter_mut().zip(values) {
                    *dst += value;
                }
            }
        }
    }
}

fn check_rows(rows: std::ops::Range<usize>, max: usize) -> Result<()> {
    if max < rows.end {
        Err(Error::IndexOutOfBounds {
            index: rows.end - 1,
            max,
        })
    } else {
        Ok(())
    }
}

fn check_capacity(binding: &BufferBinding<'_>, vertices_end: usize) -> Result<()> {
    Error::check_buffer_size(binding.desc.required_len(vertices_end), binding.data.len())
}

/// Checks that `batch` can run against `bound` without touching anything
/// outside its tables and buffers.
fn validate(context: &ComputeContext, bound: &BoundComputeContext<'_>, batch: &KernelBatch) -> Result<()> {
    let tables = context.tables();

    match batch.kernel_type {
        KernelType::HierarchicalEdit => {
            let edits = context
                .edit_tables()
                .get(batch.table_index as usize)
                .ok_or(Error::IndexOutOfBounds {
                    index: batch.table_index as usize,
                    max: context.edit_tables().len(),
                })?;
            if batch.is_empty() {
                return Ok(());
            }
            check_rows(batch.table_rows(), edits.len())?;

            let last = edits.vertex_indices()[batch.table_rows()]
                .iter()
                .map(|vertex| vertex.idx())
                .max()
                .unwrap_or(0);
            check_capacity(&bound.vertex, last + batch.vertex_offset as usize + 1)
        }
        KernelType::Stencils => {
            let table = context.stencil_table().ok_or(Error::MissingStencilTable)?;
            if batch.is_empty() {
                return Ok(());
            }
            check_rows(batch.table_rows(), table.len())?;

            // Stencils read the buffer in place, ahead of the batch.
            let first = batch.vertices().start;
            if first < table.control_vertex_count() {
                return Err(Error::IndexOutOfBounds {
                    index: table.control_vertex_count() - 1,
                    max: first,
                });
            }
            check_capacity(&bound.vertex, batch.vertices().end)
        }
        kernel_type => {
            let kernel = cpu_kernel::rule_kernel(tables.scheme, kernel_type).ok_or(
                Error::UnsupportedKernel {
                    kernel: kernel_type,
                    scheme: tables.scheme,
                },
            )?;
            if batch.is_empty() {
                return Ok(());
            }
            check_rows(batch.table_rows(), tables.rows(kernel_type))?;
            check_capacity(&bound.vertex, batch.vertices().end)?;

            // Rules read the buffer in place, ahead of the batch.
            let first = batch.vertices().start;
            for row in batch.table_rows() {
                let mut last = None;
                tables.for_each_source(kernel_type, row, |vertex| {
                    last = last.max(Some(vertex.idx()));
                })?;
                if let Some(index) = last.filter(|&index| first <= index) {
                    return Err(Error::IndexOutOfBounds { index, max: first });
                }
            }

            match (&bound.varying, kernel.varying) {
                (Some(varying), Some(_)) => check_capacity(varying, batch.vertices().end),
                _ => Ok(()),
            }
        }
    }
}
