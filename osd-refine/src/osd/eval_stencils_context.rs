use std::sync::Arc;

use super::buffer_descriptor::BufferDescriptor;
use crate::far::StencilTable;
use crate::{Error, Result};

/// Everything [`EvalStencilsController`](super::EvalStencilsController)
/// needs besides the host buffers: the stencils and where each primvar lives
/// in its buffer.
///
/// A context is immutable and cheap to clone. Bind it to buffers with
/// [`bind()`](Self::bind) for the duration of one or more evaluation calls.
#[derive(Clone, Debug)]
pub struct EvalStencilsContext {
    stencil_table: Arc<StencilTable>,
    control_desc: BufferDescriptor,
    output_desc: BufferDescriptor,
    du_desc: BufferDescriptor,
    dv_desc: BufferDescriptor,
}

/// Host buffers to bind to an [`EvalStencilsContext`].
///
/// Leave a buffer `None` if the evaluation that needs it is not going to
/// run. An evaluation whose source or destination is missing processes zero
/// elements.
#[derive(Debug, Default)]
pub struct StencilBuffers<'a> {
    pub control: Option<&'a [f32]>,
    pub output: Option<&'a mut [f32]>,
    pub du: Option<&'a mut [f32]>,
    pub dv: Option<&'a mut [f32]>,
}

impl EvalStencilsContext {
    /// Create a context for evaluating refined positions.
    ///
    /// The derivative descriptors default to empty descriptors, which can
    /// be evaluated from any control layout but make
    /// [`bind()`](Self::bind) reject `du`/`dv` buffers. Use
    /// [`with_derivative_descriptors()`](Self::with_derivative_descriptors)
    /// to set them.
    pub fn new(
        stencil_table: Arc<StencilTable>,
        control_desc: BufferDescriptor,
        output_desc: BufferDescriptor,
    ) -> Self {
        Self {
            stencil_table,
            control_desc,
            output_desc,
            du_desc: BufferDescriptor::default(),
            dv_desc: BufferDescriptor::default(),
        }
    }

    /// Set the layouts of the first derivative buffers.
    pub fn with_derivative_descriptors(
        mut self,
        du_desc: BufferDescriptor,
        dv_desc: BufferDescriptor,
    ) -> Self {
        self.du_desc = du_desc;
        self.dv_desc = dv_desc;
        self
    }

    #[inline]
    pub fn stencil_table(&self) -> &Arc<StencilTable> {
        &self.stencil_table
    }

    #[inline]
    pub fn control_desc(&self) -> BufferDescriptor {
        self.control_desc
    }

    #[inline]
    pub fn output_desc(&self) -> BufferDescriptor {
        self.output_desc
    }

    #[inline]
    pub fn du_desc(&self) -> BufferDescriptor {
        self.du_desc
    }

    #[inline]
    pub fn dv_desc(&self) -> BufferDescriptor {
        self.dv_desc
    }

    /// Bind host buffers.
    ///
    /// Every supplied buffer must have a [valid](BufferDescriptor::is_valid)
    /// descriptor and be long enough for every element the stencil table
    /// addresses. On error nothing is bound.
    ///
    /// The buffers stay borrowed until the returned handle is dropped.
    pub fn bind<'a>(&'a self, buffers: StencilBuffers<'a>) -> Result<BoundEvalStencilsContext<'a>> {
        let control_len = self.stencil_table.control_vertex_count();
        let output_len = self.stencil_table.len();

        if let Some(control) = buffers.control {
            check_binding(self.control_desc, control.len(), control_len)?;
        }
        if let Some(output) = &buffers.output {
            check_binding(self.output_desc, output.len(), output_len)?;
        }
        if let Some(du) = &buffers.du {
            check_binding(self.du_desc, du.len(), output_len)?;
        }
        if let Some(dv) = &buffers.dv {
            check_binding(self.dv_desc, dv.len(), output_len)?;
        }

        log::trace!(
            "Bound stencil context ({} stencils, {} control vertices)",
            output_len,
            control_len
        );

        Ok(BoundEvalStencilsContext {
            context: self,
            buffers,
        })
    }
}

fn check_binding(desc: BufferDescriptor, actual: usize, elements: usize) -> Result<()> {
    if !desc.is_valid() {
        return Err(Error::InvalidDescriptor {
            offset: desc.offset,
            length: desc.length,
            stride: desc.stride,
        });
    }
    Error::check_buffer_size(desc.required_len(elements), actual)
}

/// An [`EvalStencilsContext`] with host buffers bound.
///
/// Dropping the handle unbinds the buffers.
#[derive(Debug)]
pub struct BoundEvalStencilsContext<'a> {
    context: &'a EvalStencilsContext,
    buffers: StencilBuffers<'a>,
}

impl<'a> BoundEvalStencilsContext<'a> {
    #[inline]
    pub fn context(&self) -> &'a EvalStencilsContext {
        self.context
    }

    #[inline]
    pub(crate) fn control(&self) -> Option<&'a [f32]> {
        self.buffers.control
    }

    #[inline]
    pub(crate) fn output_mut(&mut self) -> Option<&mut [f32]> {
        self.buffers.output.as_deref_mut()
    }

    #[inline]
    pub(crate) fn derivs_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        match (&mut self.buffers.du, &mut self.buffers.dv) {
            (Some(du), Some(dv)) => Some((&mut **du, &mut **dv)),
            _ => None,
        }
    }
}

impl Drop for BoundEvalStencilsContext<'_> {
    fn drop(&mut self) {
        log::trace!("Unbound stencil context");
    }
}
