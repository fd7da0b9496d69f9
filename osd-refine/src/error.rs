//! Error types for the osd-refine crate.

use thiserror::Error;

use crate::far::{KernelType, Scheme};

/// Main error type for osd-refine operations.
///
/// Evaluation itself never fails: the checks the evaluators perform right
/// before fanning out (empty tables, channel capability, missing source
/// buffers) are reported as a zero processed-element count. The variants
/// here cover table construction, buffer binding and batch validation.
#[derive(Debug, Error)]
pub enum Error {
    /// Stencil table arrays are inconsistent.
    #[error("Invalid stencil table: {0}")]
    InvalidStencilTable(String),

    /// Subdivision tables are inconsistent.
    #[error("Invalid subdivision tables: {0}")]
    InvalidSubdivisionTables(String),

    /// Hierarchical edit table is inconsistent.
    #[error("Invalid vertex edit table: {0}")]
    InvalidEditTable(String),

    /// Buffer descriptor layout is not usable for the bound buffer.
    #[error("Invalid buffer descriptor (offset: {offset}, length: {length}, stride: {stride})")]
    InvalidDescriptor { offset: u32, length: u32, stride: u32 },

    /// Index out of bounds.
    #[error("Index {index} out of bounds (max: {max})")]
    IndexOutOfBounds { index: usize, max: usize },

    /// Invalid buffer size.
    #[error("Invalid buffer size: expected {expected}, got {actual}")]
    InvalidBufferSize { expected: usize, actual: usize },

    /// The kernel has no rule for the scheme of the bound tables.
    #[error("Kernel {kernel} is not supported by the {scheme} scheme")]
    UnsupportedKernel { kernel: KernelType, scheme: Scheme },

    /// A raw kernel type code does not name a kernel.
    #[error("Unknown kernel type code {0}")]
    UnknownKernelType(u32),

    /// A raw scheme code does not name a scheme.
    #[error("Unknown subdivision scheme code {0}")]
    UnknownScheme(u32),

    /// A stencil batch was dispatched against a context without stencils.
    #[error("Stencil batch dispatched but the compute context has no stencil table")]
    MissingStencilTable,

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl From<num_enum::TryFromPrimitiveError<KernelType>> for Error {
    fn from(error: num_enum::TryFromPrimitiveError<KernelType>) -> Self {
        Error::UnknownKernelType(error.number)
    }
}

impl From<num_enum::TryFromPrimitiveError<Scheme>> for Error {
    fn from(error: num_enum::TryFromPrimitiveError<Scheme>) -> Self {
        Error::UnknownScheme(error.number)
    }
}

impl Error {
    /// Check that a slice of `actual` elements can hold `expected` elements.
    pub(crate) fn check_buffer_size(expected: usize, actual: usize) -> Result<()> {
        if actual < expected {
            Err(Error::InvalidBufferSize { expected, actual })
        } else {
            Ok(())
        }
    }
}
