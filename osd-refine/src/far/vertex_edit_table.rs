//! Hierarchical edits of refined vertex primvars.
//!
//! An edit table overrides (`Set`) or offsets (`Add`) a sub-range of a
//! primvar on individual refined vertices, after the vertices of its level
//! have been computed. Tables are applied by
//! [`KernelType::HierarchicalEdit`](crate::far::KernelType::HierarchicalEdit)
//! batches, which select the table with `table_index`.
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{Error, Index, Result};

/// How an edit combines with the refined value.
#[repr(u32)]
#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EditOperation {
    /// Replace the refined value.
    Set = 0,
    /// Add to the refined value.
    Add = 1,
}

/// One table of hierarchical edits, all sharing an operation and a primvar
/// window.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexEditTable {
    operation: EditOperation,
    primvar_offset: u32,
    primvar_width: u32,
    vertex_indices: Vec<Index>,
    values: Vec<f32>,
}

impl VertexEditTable {
    /// Create an edit table.
    ///
    /// * `primvar_offset` – First channel of each vertex element edited,
    ///   relative to the vertex buffer descriptor.
    /// * `primvar_width` – Number of channels edited.
    /// * `vertex_indices` – The edited vertex of each row, relative to the
    ///   batch's `vertex_offset`.
    /// * `values` – `primvar_width` values per row.
    pub fn new(
        operation: EditOperation,
        primvar_offset: u32,
        primvar_width: u32,
        vertex_indices: Vec<Index>,
        values: Vec<f32>,
    ) -> Result<Self> {
        if 0 == primvar_width {
            return Err(Error::InvalidEditTable(
                "Primvar width must not be zero.".to_string(),
            ));
        }
        let expected = vertex_indices.len() * primvar_width as usize;
        if values.len() != expected {
            return Err(Error::InvalidEditTable(format!(
                "{} edits of width {} need {} values, got {}.",
                vertex_indices.len(),
                primvar_width,
                expected,
                values.len()
            )));
        }

        Ok(Self {
            operation,
            primvar_offset,
            primvar_width,
            vertex_indices,
            values,
        })
    }

    #[inline]
    pub fn operation(&self) -> EditOperation {
        self.operation
    }

    #[inline]
    pub fn primvar_offset(&self) -> u32 {
        self.primvar_offset
    }

    #[inline]
    pub fn primvar_width(&self) -> u32 {
        self.primvar_width
    }

    /// Returns the number of edits (rows).
    #[inline]
    pub fn len(&self) -> usize {
        self.vertex_indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_indices.is_empty()
    }

    #[inline]
    pub fn vertex_indices(&self) -> &[Index] {
        &self.vertex_indices
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns the edited vertex and the values of row `row`.
    #[inline]
    pub fn edit(&self, row: usize) -> Option<(Index, &[f32])> {
        let width = self.primvar_width as usize;
        let vertex = *self.vertex_indices.get(row)?;
        Some((vertex, &self.values[row * width..(row + 1) * width]))
    }

    /// One past the last channel touched in a vertex element.
    #[inline]
    pub fn primvar_end(&self) -> usize {
        self.primvar_offset as usize + self.primvar_width as usize
    }
}
