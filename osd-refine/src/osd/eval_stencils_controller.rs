use std::ops::Range;

use super::controller_options::ControllerOptions;
use super::cpu_kernel::{self, Accumulator};
use super::eval_stencils_context::BoundEvalStencilsContext;
use crate::far::StencilTable;
use crate::Result;

/// Applies stencil tables to bound host buffers on a fixed-size worker pool.
///
/// Every call blocks until all refined elements are written. Each element is
/// computed by exactly one worker, starting from zero, so calls are
/// idempotent and the result does not depend on the number of threads.
///
/// The evaluation methods return the number of elements processed. Zero
/// means nothing was written: the table is empty, the control layout lacks
/// channels the destination asks for, or a buffer the evaluation needs
/// isn't bound.
#[derive(Debug)]
pub struct EvalStencilsController {
    pool: rayon::ThreadPool,
}

impl EvalStencilsController {
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

    /// Compute refined positions for every stencil.
    pub fn update_values(&self, bound: &mut BoundEvalStencilsContext<'_>) -> usize {
        self.update_values_range(bound, 0..usize::MAX)
    }

    /// Compute refined positions for the stencils in `range`, clamped to the
    /// table. Output elements outside `range` are left untouched.
    pub fn update_values_range(
        &self,
        bound: &mut BoundEvalStencilsContext<'_>,
        range: Range<usize>,
    ) -> usize {
        let context = bound.context();
        let table: &StencilTable = context.stencil_table();
        let control_desc = context.control_desc();
        let output_desc = context.output_desc();

        let range = clamp(range, table.len());
        if range.is_empty() {
            log::debug!("Stencil values: nothing to evaluate");
            return 0;
        }
        if !control_desc.can_eval(&output_desc) {
            log::debug!(
                "Stencil values: control layout {:?} can't feed output layout {:?}",
                control_desc,
                output_desc
            );
            return 0;
        }
        let Some(control) = bound.control() else {
            log::debug!("Stencil values: no control buffer bound");
            return 0;
        };
        let Some(output) = bound.output_mut() else {
            log::debug!("Stencil values: no output buffer bound");
            return 0;
        };

        log::debug!("Evaluating stencils {:?}", range);

        let first = range.start;
        self.pool.install(|| {
            cpu_kernel::for_each_element(output, output_desc, first, range.len(), |_, i, dst| {
                let mut acc = Accumulator::new(control, control_desc, dst);
                cpu_kernel::stencil(table, table.weights(), first + i, &mut acc);
            })
        });

        range.len()
    }

    /// Compute first derivatives for every stencil.
    pub fn update_derivs(&self, bound: &mut BoundEvalStencilsContext<'_>) -> usize {
        self.update_derivs_range(bound, 0..usize::MAX)
    }

    /// Compute first derivatives for the stencils in `range`, clamped to the
    /// table.
    ///
    /// Both derivative buffers must be bound and the table must carry
    /// derivative weights. Each derivative accumulates over its own
    /// descriptor's channels.
    pub fn update_derivs_range(
        &self,
        bound: &mut BoundEvalStencilsContext<'_>,
        range: Range<usize>,
    ) -> usize {
        let context = bound.context();
        let table: &StencilTable = context.stencil_table();
        let control_desc = context.control_desc();
        let du_desc = context.du_desc();
        let dv_desc = context.dv_desc();

        let range = clamp(range, table.len());
        if range.is_empty() {
            log::debug!("Stencil derivatives: nothing to evaluate");
            return 0;
        }
        if !table.has_1st_derivatives() {
            log::debug!("Stencil derivatives: table has no derivative weights");
            return 0;
        }
        if !control_desc.can_eval(&du_desc) || !control_desc.can_eval(&dv_desc) {
            log::debug!(
                "Stencil derivatives: control layout {:?} can't feed du {:?} / dv {:?}",
                control_desc,
                du_desc,
                dv_desc
            );
            return 0;
        }
        let Some(control) = bound.control() else {
            log::debug!("Stencil derivatives: no control buffer bound");
            return 0;
        };
        let Some((du, dv)) = bound.derivs_mut() else {
            log::debug!("Stencil derivatives: du and dv buffers must both be bound");
            return 0;
        };

        log::debug!("Evaluating stencil derivatives {:?}", range);

        let first = range.start;
        let count = range.len();
        self.pool.install(|| {
            rayon::join(
                || {
                    cpu_kernel::for_each_element(du, du_desc, first, count, |_, i, dst| {
                        let mut acc = Accumulator::new(control, control_desc, dst);
                        cpu_kernel::stencil(table, table.du_weights(), first + i, &mut acc);
                    })
                },
                || {
                    cpu_kernel::for_each_element(dv, dv_desc, first, count, |_, i, dst| {
                        let mut acc = Accumulator::new(control, control_desc, dst);
                        cpu_kernel::stencil(table, table.dv_weights(), first + i, &mut acc);
                    })
                },
            )
        });

        count
    }

    /// Wait for outstanding work. Evaluation is synchronous, so this
    /// returns immediately.
    #[inline]
    pub fn synchronize(&self) {}
}

#[inline]
fn clamp(range: Range<usize>, len: usize) -> Range<usize> {
    range.start.min(len)..range.end.min(len)
}
