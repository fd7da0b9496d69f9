//! Per-rule subdivision tables for level-by-level refinement.
//!
//! Where a [`StencilTable`](crate::far::StencilTable) expresses every refined
//! vertex directly in terms of the coarse control vertices, subdivision
//! tables express each refined vertex in terms of the previous level only.
//! Refining level by level keeps the tables small; the price is a chain of
//! dependent [`KernelBatch`](crate::far::KernelBatch)es.
//!
//! Rows come in three flavors, one per kind of refined vertex:
//!
//! * [`FaceVertexRule`] – a face point, averaging the parent face's vertices.
//! * [`EdgeVertexRule`] – an edge point, blending the edge endpoints and
//!   optionally the adjacent face points.
//! * [`VertexVertexRule`] – a vertex point, blending the parent vertex with
//!   its ring of neighbors (smooth) or with its crease edges (crease/corner).
//!
//! The weights stored in the rows have been decided by the topology
//! analyzer (creases, boundaries, semi-sharp transitions); the kernels only
//! apply them.
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::far::KernelType;
use crate::{Error, Index, Result};

/// The subdivision scheme the tables were built for.
#[repr(u32)]
#[derive(
    TryFromPrimitive,
    IntoPrimitive,
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    derive_more::Display,
)]
pub enum Scheme {
    /// *Bilinear* interpolation.
    Bilinear = 0,
    /// [*Catmull-Clark* subdivision](https://en.wikipedia.org/wiki/Catmull%E2%80%93Clark_subdivision_surface).
    CatmullClark = 1,
    /// [*Loop* subdivision](https://en.wikipedia.org/wiki/Loop_subdivision_surface).
    Loop = 2,
}

/// A face point: the centroid of `valence` vertices starting at `offset` in
/// [`SubdivisionTables::face_indices`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FaceVertexRule {
    pub offset: u32,
    pub valence: u32,
}

/// An edge point.
///
/// *Bilinear* takes the midpoint of `vertices` and ignores the rest.
/// *Catmull-Clark* and *Loop* weigh both `vertices` with `vertex_weight` and,
/// for smooth edges, both `faces` (the adjacent face points, resp. opposite
/// vertices for *Loop*) with `face_weight`. Boundary and infinitely sharp
/// edges have no `faces`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct EdgeVertexRule {
    pub vertices: [Index; 2],
    pub faces: Option<[Index; 2]>,
    pub vertex_weight: f32,
    pub face_weight: f32,
}

impl EdgeVertexRule {
    /// A smooth interior edge with the given end points and face points.
    pub fn smooth(vertices: [Index; 2], faces: [Index; 2], scheme: Scheme) -> Self {
        let (vertex_weight, face_weight) = match scheme {
            Scheme::Bilinear => (0.5, 0.0),
            Scheme::CatmullClark => (0.25, 0.25),
            Scheme::Loop => (0.375, 0.125),
        };
        Self {
            vertices,
            faces: Some(faces),
            vertex_weight,
            face_weight,
        }
    }

    /// A boundary or infinitely sharp edge: the midpoint of its end points.
    pub fn sharp(vertices: [Index; 2]) -> Self {
        Self {
            vertices,
            faces: None,
            vertex_weight: 0.5,
            face_weight: 0.0,
        }
    }
}

/// A vertex point.
///
/// * `offset`, `valence` – the ring of neighbors in
///   [`SubdivisionTables::vertex_indices`]. *Catmull-Clark* stores `2 *
///   valence` entries (alternating edge-adjacent vertex and face point),
///   *Loop* stores `valence` entries, *Bilinear* none.
/// * `parent` – the vertex of the previous level this point refines.
/// * `crease_edges` – the two crease neighbors used by the crease rule;
///   `None` selects the corner rule.
/// * `corner_crease` – marks a vertex that is a corner for the first crease
///   pass and a crease for the second.
/// * `weight` – the blend between the smooth and the crease/corner rule
///   (1 for a fully smooth vertex).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VertexVertexRule {
    pub offset: u32,
    pub valence: u32,
    pub parent: Index,
    pub crease_edges: Option<[Index; 2]>,
    pub corner_crease: bool,
    pub weight: f32,
}

/// Subdivision tables of one mesh, covering all refinement levels.
///
/// Levels are laid out back to back; a [`KernelBatch`](crate::far::KernelBatch)
/// selects its rows with `table_offset`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubdivisionTables {
    pub scheme: Scheme,
    pub face_vertices: Vec<FaceVertexRule>,
    pub face_indices: Vec<Index>,
    pub edge_vertices: Vec<EdgeVertexRule>,
    pub vertex_vertices: Vec<VertexVertexRule>,
    pub vertex_indices: Vec<Index>,
}

impl SubdivisionTables {
    /// Number of neighbor entries a vertex row of the given valence reads.
    #[inline]
    pub fn ring_len(scheme: Scheme, valence: u32) -> usize {
        match scheme {
            Scheme::Bilinear => 0,
            Scheme::CatmullClark => 2 * valence as usize,
            Scheme::Loop => valence as usize,
        }
    }

    /// Validate the tables.
    ///
    /// With the `table_validation` feature this checks that every face and
    /// vertex row stays within the flat index arrays and that the scheme has
    /// no face rows if it can't use them. Without the feature this is a
    /// no-op.
    pub fn validate(&self) -> Result<()> {
        #[cfg(feature = "table_validation")]
        {
            if Scheme::Loop == self.scheme && !self.face_vertices.is_empty() {
                return Err(Error::InvalidSubdivisionTables(format!(
                    "{} face vertex rows given for the Loop scheme, which has no face points.",
                    self.face_vertices.len()
                )));
            }
            for (i, face) in self.face_vertices.iter().enumerate() {
                let end = face.offset as usize + face.valence as usize;
                if 0 == face.valence || self.face_indices.len() < end {
                    return Err(Error::InvalidSubdivisionTables(format!(
                        "Face vertex row {} spans [{}, {}) (face index array has {}).",
                        i,
                        face.offset,
                        end,
                        self.face_indices.len()
                    )));
                }
            }
            for (i, vertex) in self.vertex_vertices.iter().enumerate() {
                let end = vertex.offset as usize + Self::ring_len(self.scheme, vertex.valence);
                if self.vertex_indices.len() < end {
                    return Err(Error::InvalidSubdivisionTables(format!(
                        "Vertex vertex row {} spans [{}, {}) (vertex index array has {}).",
                        i,
                        vertex.offset,
                        end,
                        self.vertex_indices.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Validate and return the tables, for chaining after an init struct.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Number of rows the given kernel can address.
    pub fn rows(&self, kernel_type: KernelType) -> usize {
        match kernel_type {
            KernelType::FaceVertices => self.face_vertices.len(),
            KernelType::EdgeVertices => self.edge_vertices.len(),
            KernelType::VertexVerticesB
            | KernelType::VertexVerticesA1
            | KernelType::VertexVerticesA2 => self.vertex_vertices.len(),
            KernelType::HierarchicalEdit | KernelType::Stencils => 0,
        }
    }

    /// Calls `source` with every vertex that row `row` of `kernel_type`
    /// reads, under this table's scheme.
    ///
    /// Fails if the row, or the index run it points to, lies outside the
    /// tables.
    pub(crate) fn for_each_source(
        &self,
        kernel_type: KernelType,
        row: usize,
        mut source: impl FnMut(Index),
    ) -> Result<()> {
        let missing_row = |max| Error::IndexOutOfBounds { index: row, max };

        match kernel_type {
            KernelType::FaceVertices => {
                let face = self
                    .face_vertices
                    .get(row)
                    .ok_or(missing_row(self.face_vertices.len()))?;
                let start = face.offset as usize;
                let end = start + face.valence as usize;
                let run = self
                    .face_indices
                    .get(start..end)
                    .ok_or(Error::IndexOutOfBounds {
                        index: end - 1,
                        max: self.face_indices.len(),
                    })?;
                run.iter().copied().for_each(source);
            }
            KernelType::EdgeVertices => {
                let edge = self
                    .edge_vertices
                    .get(row)
                    .ok_or(missing_row(self.edge_vertices.len()))?;
                edge.vertices.into_iter().for_each(&mut source);
                // Bilinear edges are midpoints.
                match edge.faces {
                    Some(faces) if Scheme::Bilinear != self.scheme => {
                        faces.into_iter().for_each(source)
                    }
                    _ => {}
                }
            }
            KernelType::VertexVerticesB
            | KernelType::VertexVerticesA1
            | KernelType::VertexVerticesA2 => {
                let vertex = self
                    .vertex_vertices
                    .get(row)
                    .ok_or(missing_row(self.vertex_vertices.len()))?;
                source(vertex.parent);

                let ring_len = Self::ring_len(self.scheme, vertex.valence);
                if KernelType::VertexVerticesB == kernel_type && 0 < ring_len {
                    let start = vertex.offset as usize;
                    let end = start + ring_len;
                    let ring = self
                        .vertex_indices
                        .get(start..end)
                        .ok_or(Error::IndexOutOfBounds {
                            index: end.saturating_sub(1),
                            max: self.vertex_indices.len(),
                        })?;
                    ring.iter().copied().for_each(source);
                } else if let Some(edges) = vertex.crease_edges {
                    edges.into_iter().for_each(source);
                }
            }
            KernelType::HierarchicalEdit | KernelType::Stencils => {}
        }
        Ok(())
    }
}

impl Default for Scheme {
    fn default() -> Self {
        Scheme::CatmullClark
    }
}

impl Scheme {
    /// Decode a raw scheme code.
    pub fn from_raw(code: u32) -> Result<Self> {
        Ok(Scheme::try_from(code)?)
    }
}
