//! Per-element CPU refinement kernels.
//!
//! Every kernel computes one refined vertex from vertices that were computed
//! before it. Kernels for the subdivision tables are plain function pointers,
//! looked up per [`Scheme`] and [`KernelType`] in static tables; adding a
//! scheme means adding a table, not touching the controller.
//!
//! Kernels write through an [`Accumulator`], which owns the destination
//! element exclusively and reads sources from a slice that ends where the
//! batch's first destination element begins.
use std::f32::consts::PI;

use rayon::prelude::*;

use super::buffer_descriptor::BufferDescriptor;
use crate::far::{KernelType, Scheme, StencilTable, SubdivisionTables};
use crate::Index;

/// Accumulates weighted source elements into one destination element.
pub(crate) struct Accumulator<'a> {
    src: &'a [f32],
    src_desc: BufferDescriptor,
    dst: &'a mut [f32],
}

impl<'a> Accumulator<'a> {
    #[inline]
    pub(crate) fn new(src: &'a [f32], src_desc: BufferDescriptor, dst: &'a mut [f32]) -> Self {
        Self { src, src_desc, dst }
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.dst.fill(0.0);
    }

    /// `dst += weight * src[vertex]` over the destination's channels.
    #[inline]
    pub(crate) fn add_with_weight(&mut self, vertex: Index, weight: f32) {
        let src = self.src_desc.element(self.src, vertex.idx());
        for (dst, src) in self.dst.iter_mut().zip(src) {
            *dst += weight * src;
        }
    }
}

/// Computes table row `row` into the accumulator.
pub(crate) type Rule = fn(&SubdivisionTables, usize, &mut Accumulator<'_>);

/// The vertex and varying rule of one kernel type.
#[derive(Copy, Clone)]
pub(crate) struct Kernel {
    pub vertex: Rule,
    /// `None` leaves the varying buffer untouched.
    pub varying: Option<Rule>,
}

type KernelTable = [Option<Kernel>; KernelType::COUNT];

static BILINEAR_KERNELS: KernelTable = [
    // FaceVertices
    Some(Kernel {
        vertex: face_vertex,
        varying: Some(face_vertex),
    }),
    // EdgeVertices
    Some(Kernel {
        vertex: edge_midpoint,
        varying: Some(edge_midpoint),
    }),
    // VertexVerticesB
    Some(Kernel {
        vertex: copy_parent,
        varying: Some(copy_parent),
    }),
    None,
    None,
    None,
    None,
];

static CATMARK_KERNELS: KernelTable = [
    Some(Kernel {
        vertex: face_vertex,
        varying: Some(face_vertex),
    }),
    Some(Kernel {
        vertex: edge_vertex,
        varying: Some(edge_midpoint),
    }),
    Some(Kernel {
        vertex: catmark_vertex_b,
        varying: Some(copy_parent),
    }),
    Some(Kernel {
        vertex: crease_vertex_a1,
        varying: Some(copy_parent),
    }),
    Some(Kernel {
        vertex: crease_vertex_a2,
        varying: None,
    }),
    None,
    None,
];

static LOOP_KERNELS: KernelTable = [
    None,
    Some(Kernel {
        vertex: edge_vertex,
        varying: Some(edge_midpoint),
    }),
    Some(Kernel {
        vertex: loop_vertex_b,
        varying: Some(copy_parent),
    }),
    Some(Kernel {
        vertex: crease_vertex_a1,
        varying: Some(copy_parent),
    }),
    Some(Kernel {
        vertex: crease_vertex_a2,
        varying: None,
    }),
    None,
    None,
];

/// Returns the table-driven kernel for `kernel_type` under `scheme`.
///
/// [`KernelType::HierarchicalEdit`] and [`KernelType::Stencils`] are not
/// table-driven and always return `None` here.
#[inline]
pub(crate) fn rule_kernel(scheme: Scheme, kernel_type: KernelType) -> Option<Kernel> {
    let table = match scheme {
        Scheme::Bilinear => &BILINEAR_KERNELS,
        Scheme::CatmullClark => &CATMARK_KERNELS,
        Scheme::Loop => &LOOP_KERNELS,
    };
    table[kernel_type as usize]
}

fn face_vertex(tables: &SubdivisionTables, row: usize, acc: &mut Accumulator<'_>) {
    let face = tables.face_vertices[row];
    let start = face.offset as usize;
    let weight = 1.0 / face.valence as f32;

    acc.clear();
    for &vertex in &tables.face_indices[start..start + face.valence as usize] {
        acc.add_with_weight(vertex, weight);
    }
}

fn edge_midpoint(tables: &SubdivisionTables, row: usize, acc: &mut Accumulator<'_>) {
    let [v0, v1] = tables.edge_vertices[row].vertices;

    acc.clear();
    acc.add_with_weight(v0, 0.5);
    acc.add_with_weight(v1, 0.5);
}

fn edge_vertex(tables: &SubdivisionTables, row: usize, acc: &mut Accumulator<'_>) {
    let edge = tables.edge_vertices[row];
    let [v0, v1] = edge.vertices;

    acc.clear();
    acc.add_with_weight(v0, edge.vertex_weight);
    acc.add_with_weight(v1, edge.vertex_weight);

    if let Some([f0, f1]) = edge.faces {
        acc.add_with_weight(f0, edge.face_weight);
        acc.add_with_weight(f1, edge.face_weight);
    }
}

fn copy_parent(tables: &SubdivisionTables, row: usize, acc: &mut Accumulator<'_>) {
    acc.clear();
    acc.add_with_weight(tables.vertex_vertices[row].parent, 1.0);
}

fn catmark_vertex_b(tables: &SubdivisionTables, row: usize, acc: &mut Accumulator<'_>) {
    let vertex = tables.vertex_vertices[row];
    let n = vertex.valence as f32;

    acc.clear();
    if 0 == vertex.valence {
        acc.add_with_weight(vertex.parent, vertex.weight);
        return;
    }

    let wp = 1.0 / (n * n);
    let wv = (n - 2.0) * n * wp;

    acc.add_with_weight(vertex.parent, vertex.weight * wv);

    let start = vertex.offset as usize;
    for &neighbor in &tables.vertex_indices[start..start + 2 * vertex.valence as usize] {
        acc.add_with_weight(neighbor, vertex.weight * wp);
    }
}

fn loop_vertex_b(tables: &SubdivisionTables, row: usize, acc: &mut Accumulator<'_>) {
    let vertex = tables.vertex_vertices[row];
    let n = vertex.valence as f32;

    acc.clear();
    if 0 == vertex.valence {
        acc.add_with_weight(vertex.parent, vertex.weight);
        return;
    }

    let wp = 1.0 / n;
    let beta = 0.25 * (2.0 * PI * wp).cos() + 0.375;
    let beta = (0.625 - beta * beta) * wp;

    acc.add_with_weight(vertex.parent, vertex.weight * (1.0 - beta * n));

    let start = vertex.offset as usize;
    for &neighbor in &tables.vertex_indices[start..start + vertex.valence as usize] {
        acc.add_with_weight(neighbor, vertex.weight * beta);
    }
}

/// Crease and corner vertex points. The first pass clears the destination,
/// the second accumulates onto it.
#[inline]
fn crease_vertex(
    tables: &SubdivisionTables,
    row: usize,
    acc: &mut Accumulator<'_>,
    second_pass: bool,
) {
    let vertex = tables.vertex_vertices[row];

    let mut weight = if second_pass {
        vertex.weight
    } else {
        1.0 - vertex.weight
    };
    // Fractional weights are stored as seen by the smooth kernel.
    if weight > 0.0 && weight < 1.0 && vertex.valence > 0 && !vertex.corner_crease {
        weight = 1.0 - weight;
    }

    if !second_pass {
        acc.clear();
    }

    match vertex.crease_edges {
        Some([e0, e1]) if second_pass || !vertex.corner_crease => {
            acc.add_with_weight(vertex.parent, weight * 0.75);
            acc.add_with_weight(e0, weight * 0.125);
            acc.add_with_weight(e1, weight * 0.125);
        }
        _ => acc.add_with_weight(vertex.parent, weight),
    }
}

fn crease_vertex_a1(tables: &SubdivisionTables, row: usize, acc: &mut Accumulator<'_>) {
    crease_vertex(tables, row, acc, false);
}

fn crease_vertex_a2(tables: &SubdivisionTables, row: usize, acc: &mut Accumulator<'_>) {
    crease_vertex(tables, row, acc, true);
}

/// Applies stencil `row` of `table` using `weights` (position, du or dv).
#[inline]
pub(crate) fn stencil(table: &StencilTable, weights: &[f32], row: usize, acc: &mut Accumulator<'_>) {
    let run = table.run(row);

    acc.clear();
    for (&vertex, &weight) in table.control_indices()[run.clone()].iter().zip(&weights[run]) {
        acc.add_with_weight(vertex, weight);
    }
}

/// Runs `element(i, dst)` for the `count` elements of `dst_desc` starting at
/// element `first`, in parallel on the current rayon pool.
///
/// `buffer` is split right before element `first`; `element` gets the part
/// before the split as its read-only source. Every destination element is
/// handed to exactly one task.
pub(crate) fn for_each_element<F>(
    buffer: &mut [f32],
    dst_desc: BufferDescriptor,
    first: usize,
    count: usize,
    element: F,
) where
    F: Fn(&[f32], usize, &mut [f32]) + Sync,
{
    if 0 == count {
        return;
    }

    let (src, dst) = buffer.split_at_mut(dst_desc.element_start(first));
    let src: &[f32] = src;
    let length = dst_desc.length as usize;

    dst.par_chunks_mut(dst_desc.stride as usize)
        .take(count)
        .enumerate()
        .for_each(|(i, chunk)| element(src, i, &mut chunk[..length]));
}
