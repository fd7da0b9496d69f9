//! Table of subdivision stencils.
//!
//! Stencils are the most direct method of evaluating refined or limit
//! locations of a surface. Every refined vertex can be computed by linearly
//! blending a collection of coarse control vertices.
//!
//! A stencil assigns a series of control vertex indices with a blending weight
//! to one refined vertex. When the control vertices move in space, the refined
//! location can be very efficiently recomputed simply by applying the blending
//! weights to the series of coarse control vertices.
//!
//! The table is stored in compressed sparse-row form: per stencil a size and
//! an offset into the flat `control_indices` and `weights` arrays. Tables that
//! carry first derivative weights (`du`, `dv`) share the index runs with the
//! position weights.
//!
//! ## Example
//!
//! ```
//! use osd_refine::{far::StencilTable, Index};
//!
//! let table = StencilTable::from_sizes(
//!     vec![2, 1],
//!     vec![Index(0), Index(1), Index(1)],
//!     vec![0.5, 0.5, 1.0],
//! )
//! .unwrap();
//!
//! assert_eq!(table.len(), 2);
//! assert_eq!(table.offsets(), &[Index(0), Index(2)]);
//! assert_eq!(table.control_vertex_count(), 2);
//! ```
use crate::{Error, Index, Result};

/// Gives read access to a single stencil in a [`StencilTable`].
#[derive(Clone, Copy, Debug)]
pub struct Stencil<'a> {
    indices: &'a [Index],
    weights: &'a [f32],
    du_weights: &'a [f32],
    dv_weights: &'a [f32],
}

impl<'a> Stencil<'a> {
    /// Returns the indices of the control vertices.
    #[inline]
    pub fn indices(&self) -> &'a [Index] {
        self.indices
    }

    /// Returns the stencil interpolation weights.
    #[inline]
    pub fn weights(&self) -> &'a [f32] {
        self.weights
    }

    /// Returns the du derivative weights (empty if the table has none).
    #[inline]
    pub fn du_weights(&self) -> &'a [f32] {
        self.du_weights
    }

    /// Returns the dv derivative weights (empty if the table has none).
    #[inline]
    pub fn dv_weights(&self) -> &'a [f32] {
        self.dv_weights
    }

    /// Returns the number of control vertices this stencil blends.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Container for stencil data.
///
/// Immutable once built. Share it between contexts and threads with an
/// [`Arc`](std::sync::Arc).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StencilTable {
    sizes: Vec<u32>,
    offsets: Vec<Index>,
    control_indices: Vec<Index>,
    weights: Vec<f32>,
    du_weights: Vec<f32>,
    dv_weights: Vec<f32>,
    has_derivatives: bool,
    control_vertex_count: usize,
}

impl StencilTable {
    /// Create a stencil table from its four parallel arrays.
    ///
    /// * `sizes` – Number of control vertices of each stencil.
    /// * `offsets` – Start of each stencil's run in `control_indices` and
    ///   `weights`.
    /// * `control_indices` – Flat control vertex indices.
    /// * `weights` – Flat interpolation weights, parallel to
    ///   `control_indices`.
    ///
    /// With the `table_validation` feature the shape of the arrays is
    /// checked. Control indices are not checked against any buffer here;
    /// that happens when buffers are bound.
    pub fn new(
        sizes: Vec<u32>,
        offsets: Vec<Index>,
        control_indices: Vec<Index>,
        weights: Vec<f32>,
    ) -> Result<Self> {
        #[cfg(feature = "table_validation")]
        {
            if sizes.len() != offsets.len() {
                return Err(Error::InvalidStencilTable(format!(
                    "{} sizes but {} offsets",
                    sizes.len(),
                    offsets.len()
                )));
            }
            if control_indices.len() != weights.len() {
                return Err(Error::InvalidStencilTable(format!(
                    "{} control indices but {} weights",
                    control_indices.len(),
                    weights.len()
                )));
            }
            for (i, (&size, &offset)) in sizes.iter().zip(offsets.iter()).enumerate() {
                let end = offset.idx() + size as usize;
                if control_indices.len() < end {
                    return Err(Error::InvalidStencilTable(format!(
                        "Stencil {} spans [{}, {}) past the end of the index array ({}).",
                        i,
                        offset,
                        end,
                        control_indices.len()
                    )));
                }
            }
        }

        let control_vertex_count = control_indices
            .iter()
            .map(|index| index.idx() + 1)
            .max()
            .unwrap_or(0);

        Ok(Self {
            sizes,
            offsets,
            control_indices,
            weights,
            du_weights: Vec::new(),
            dv_weights: Vec::new(),
            has_derivatives: false,
            control_vertex_count,
        })
    }

    /// Create a stencil table from sizes alone; the offsets are the
    /// exclusive prefix sum of `sizes`.
    pub fn from_sizes(
        sizes: Vec<u32>,
        control_indices: Vec<Index>,
        weights: Vec<f32>,
    ) -> Result<Self> {
        let offsets = sizes
            .iter()
            .scan(0u32, |running, &size| {
                let offset = *running;
                *running += size;
                Some(Index(offset))
            })
            .collect();

        Self::new(sizes, offsets, control_indices, weights)
    }

    /// Collect a table from per-stencil `(indices, weights)` runs.
    pub fn from_stencils<I, W>(stencils: impl IntoIterator<Item = (I, W)>) -> Result<Self>
    where
        I: AsRef<[u32]>,
        W: AsRef<[f32]>,
    {
        let mut sizes = Vec::new();
        let mut control_indices = Vec::new();
        let mut weights = Vec::new();

        for (i, (stencil_indices, stencil_weights)) in stencils.into_iter().enumerate() {
            let (stencil_indices, stencil_weights) =
                (stencil_indices.as_ref(), stencil_weights.as_ref());
            if stencil_indices.len() != stencil_weights.len() {
                return Err(Error::InvalidStencilTable(format!(
                    "Stencil {} has {} indices but {} weights",
                    i,
                    stencil_indices.len(),
                    stencil_weights.len()
                )));
            }
            sizes.push(stencil_indices.len() as u32);
            control_indices.extend(stencil_indices.iter().copied().map(Index));
            weights.extend_from_slice(stencil_weights);
        }

        Self::from_sizes(sizes, control_indices, weights)
    }

    /// Attach first derivative weights sharing the index runs of this table.
    pub fn with_derivatives(mut self, du_weights: Vec<f32>, dv_weights: Vec<f32>) -> Result<Self> {
        if du_weights.len() != self.weights.len() || dv_weights.len() != self.weights.len() {
            return Err(Error::InvalidStencilTable(format!(
                "Derivative weights ({} du, {} dv) must match the {} position weights",
                du_weights.len(),
                dv_weights.len(),
                self.weights.len()
            )));
        }
        self.du_weights = du_weights;
        self.dv_weights = dv_weights;
        self.has_derivatives = true;
        Ok(self)
    }

    /// Returns the number of stencils in the table.
    #[inline]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }

    /// Returns the number of control vertices indexed in the table.
    ///
    /// This is one past the largest control index referenced by any stencil,
    /// i.e. the minimum number of elements a bound control buffer must hold.
    #[inline]
    pub fn control_vertex_count(&self) -> usize {
        self.control_vertex_count
    }

    /// Returns a [`Stencil`] at index `i` in the table.
    #[inline]
    pub fn stencil(&self, i: Index) -> Option<Stencil<'_>> {
        if self.len() <= i.idx() {
            None
        } else {
            let run = self.run(i.idx());
            Some(Stencil {
                indices: &self.control_indices[run.clone()],
                weights: &self.weights[run.clone()],
                du_weights: self.du_weights.get(run.clone()).unwrap_or(&[]),
                dv_weights: self.dv_weights.get(run).unwrap_or(&[]),
            })
        }
    }

    /// Iterate over all stencils in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Stencil<'_>> + '_ {
        (0..self.len()).map(move |i| Stencil {
            indices: &self.control_indices[self.run(i)],
            weights: &self.weights[self.run(i)],
            du_weights: self.du_weights.get(self.run(i)).unwrap_or(&[]),
            dv_weights: self.dv_weights.get(self.run(i)).unwrap_or(&[]),
        })
    }

    /// Range of stencil `i` in the flat index and weight arrays.
    #[inline]
    pub(crate) fn run(&self, i: usize) -> std::ops::Range<usize> {
        let offset = self.offsets[i].idx();
        offset..offset + self.sizes[i] as usize
    }

    /// Returns the number of control vertices of each stencil in the table.
    #[inline]
    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    /// Returns the offset to a given stencil.
    #[inline]
    pub fn offsets(&self) -> &[Index] {
        &self.offsets
    }

    /// Returns the indices of the control vertices.
    #[inline]
    pub fn control_indices(&self) -> &[Index] {
        &self.control_indices
    }

    /// Returns the stencil interpolation weights.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Returns the du derivative weights.
    #[inline]
    pub fn du_weights(&self) -> &[f32] {
        &self.du_weights
    }

    /// Returns the dv derivative weights.
    #[inline]
    pub fn dv_weights(&self) -> &[f32] {
        &self.dv_weights
    }

    /// Whether 1st derivative weights (du, dv) are present.
    #[inline]
    pub fn has_1st_derivatives(&self) -> bool {
        self.has_derivatives
    }
}
