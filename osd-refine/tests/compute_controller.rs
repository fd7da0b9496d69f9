//! Tests for batch refinement with the compute controller.

use std::sync::Arc;

use osd_refine::far::{
    EdgeVertexRule, EditOperation, FaceVertexRule, KernelBatch, KernelType, Scheme, StencilTable,
    SubdivisionTables, VertexEditTable, VertexVertexRule,
};
use osd_refine::osd::{
    BufferBinding, BufferDescriptor, ComputeContext, ComputeController, CpuVertexBuffer,
};
use osd_refine::{Error, Index};

const SENTINEL: f32 = -999.0;

const QUAD: [[f32; 2]; 4] = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]];

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (actual, expected)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (actual - expected).abs() < 1e-5,
            "channel {i}: {actual} != {expected}"
        );
    }
}

fn corner(parent: u32) -> VertexVertexRule {
    VertexVertexRule {
        parent: Index(parent),
        ..Default::default()
    }
}

/// One Catmull-Clark level of a single boundary quad: a face point, four
/// sharp boundary edges and four corners.
fn quad_tables() -> SubdivisionTables {
    SubdivisionTables {
        scheme: Scheme::CatmullClark,
        face_vertices: vec![FaceVertexRule {
            offset: 0,
            valence: 4,
        }],
        face_indices: vec![Index(0), Index(1), Index(2), Index(3)],
        edge_vertices: [[0, 1], [1, 2], [2, 3], [3, 0]]
            .into_iter()
            .map(|[a, b]| EdgeVertexRule::sharp([Index(a), Index(b)]))
            .collect(),
        vertex_vertices: (0..4).map(corner).collect(),
        ..Default::default()
    }
}

/// Level 1 of the quad: face point at 4, edge points at 5..9, vertex points
/// at 9..13.
fn quad_batches() -> Vec<KernelBatch> {
    vec![
        KernelBatch::new(KernelType::FaceVertices, 1, 0..1).vertex_offset(4),
        KernelBatch::new(KernelType::EdgeVertices, 1, 0..4).vertex_offset(5),
        KernelBatch::new(KernelType::VertexVerticesA1, 1, 0..4).vertex_offset(9),
    ]
}

#[test]
fn test_refine_quad() -> anyhow::Result<()> {
    init_logging();

    let context = ComputeContext::new(Arc::new(quad_tables().validated()?));
    let controller = ComputeController::new(Default::default())?;

    let mut buffer = CpuVertexBuffer::new(2, 13)?;
    buffer.update_vertices(&QUAD, 0)?;

    assert_eq!(
        controller.refine(&context, &quad_batches(), buffer.binding(), None)?,
        9
    );
    controller.synchronize();

    let vertices: &[[f32; 2]] = buffer.vertices().expect("xy tiles the buffer");
    assert_eq!(
        vertices[4..],
        [
            [1.0, 1.0],
            [1.0, 0.0],
            [2.0, 1.0],
            [1.0, 2.0],
            [0.0, 1.0],
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 2.0],
            [0.0, 2.0],
        ]
    );

    Ok(())
}

#[test]
fn test_refine_varying() -> anyhow::Result<()> {
    let context = ComputeContext::new(Arc::new(quad_tables()));
    let controller = ComputeController::new(Default::default())?;

    let mut vertex = vec![0.0f32; 13 * 2];
    vertex[..8].copy_from_slice(bytemuck::cast_slice(&QUAD));
    let mut varying = vec![SENTINEL; 13];
    varying[..4].copy_from_slice(&[0.0, 1.0, 2.0, 3.0]);

    controller.refine(
        &context,
        &quad_batches(),
        BufferBinding::new(&mut vertex, BufferDescriptor::packed(2)),
        Some(BufferBinding::new(&mut varying, BufferDescriptor::packed(1))),
    )?;

    assert_eq!(
        varying,
        [0.0, 1.0, 2.0, 3.0, 1.5, 0.5, 1.5, 2.5, 1.5, 0.0, 1.0, 2.0, 3.0]
    );

    Ok(())
}

#[test]
fn test_catmark_smooth_rules() -> anyhow::Result<()> {
    // Face point at 4, then a smooth edge and a valence-3 vertex reading it.
    let tables = SubdivisionTables {
        scheme: Scheme::CatmullClark,
        face_vertices: vec![FaceVertexRule {
            offset: 0,
            valence: 4,
        }],
        face_indices: vec![Index(0), Index(1), Index(2), Index(3)],
        edge_vertices: vec![EdgeVertexRule::smooth(
            [Index(0), Index(1)],
            [Index(4), Index(4)],
            Scheme::CatmullClark,
        )],
        vertex_vertices: vec![VertexVertexRule {
            offset: 0,
            valence: 3,
            parent: Index(0),
            weight: 1.0,
            ..Default::default()
        }],
        vertex_indices: [1, 4, 2, 4, 3, 4].into_iter().map(Index).collect(),
    }
    .validated()?;

    let batches = [
        KernelBatch::new(KernelType::FaceVertices, 1, 0..1).vertex_offset(4),
        KernelBatch::new(KernelType::EdgeVertices, 1, 0..1).vertex_offset(5),
        KernelBatch::new(KernelType::VertexVerticesB, 1, 0..1).vertex_offset(6),
    ];

    let context = ComputeContext::new(Arc::new(tables));
    let controller = ComputeController::new(Default::default())?;

    let mut vertices = [0.0, 4.0, 8.0, 12.0, SENTINEL, SENTINEL, SENTINEL];
    controller.refine(
        &context,
        &batches,
        BufferBinding::new(&mut vertices, BufferDescriptor::packed(1)),
        None,
    )?;

    assert_close(&vertices[4..], &[6.0, 4.0, 42.0 / 9.0]);

    Ok(())
}

#[test]
fn test_semi_sharp_vertex_blends_smooth_and_crease() -> anyhow::Result<()> {
    let tables = SubdivisionTables {
        scheme: Scheme::CatmullClark,
        vertex_vertices: vec![VertexVertexRule {
            offset: 0,
            valence: 4,
            parent: Index(0),
            crease_edges: Some([Index(1), Index(5)]),
            corner_crease: false,
            weight: 0.25,
        }],
        vertex_indices: (1..9).map(Index).collect(),
        ..Default::default()
    };

    // Smooth part first, then the crease part accumulates onto it.
    let batches = [
        KernelBatch::new(KernelType::VertexVerticesB, 1, 0..1).vertex_offset(9),
        KernelBatch::new(KernelType::VertexVerticesA2, 1, 0..1).vertex_offset(9),
    ];

    let context = ComputeContext::new(Arc::new(tables));
    let controller = ComputeController::new(Default::default())?;

    let mut vertices = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, SENTINEL];
    controller.refine(
        &context,
        &batches,
        BufferBinding::new(&mut vertices, BufferDescriptor::packed(1)),
        None,
    )?;

    // 0.25 * smooth (36 / 16) + 0.75 * crease (0.125 * (1 + 5)).
    assert_close(&vertices[9..], &[1.125]);

    Ok(())
}

#[test]
fn test_corner_crease_passes() -> anyhow::Result<()> {
    let tables = SubdivisionTables {
        scheme: Scheme::CatmullClark,
        vertex_vertices: vec![VertexVertexRule {
            parent: Index(0),
            crease_edges: Some([Index(1), Index(2)]),
            corner_crease: true,
            weight: 0.25,
            ..Default::default()
        }],
        ..Default::default()
    };

    let batches = [
        KernelBatch::new(KernelType::VertexVerticesA1, 1, 0..1).vertex_offset(3),
        KernelBatch::new(KernelType::VertexVerticesA2, 1, 0..1).vertex_offset(3),
    ];

    let context = ComputeContext::new(Arc::new(tables));
    let controller = ComputeController::new(Default::default())?;

    let mut vertices = [8.0, 0.0, 24.0, SENTINEL];
    let mut varying = [8.0, 0.0, 24.0, SENTINEL];
    controller.refine(
        &context,
        &batches,
        BufferBinding::new(&mut vertices, BufferDescriptor::packed(1)),
        Some(BufferBinding::new(&mut varying, BufferDescriptor::packed(1))),
    )?;

    // 0.75 * corner + 0.25 * crease.
    assert_close(&vertices[3..], &[0.75 * 8.0 + 0.25 * (6.0 + 3.0)]);
    // Varying vertices copy their parent.
    assert_eq!(varying[3], 8.0);

    Ok(())
}

#[test]
fn test_loop_rules() -> anyhow::Result<()> {
    let tables = SubdivisionTables {
        scheme: Scheme::Loop,
        edge_vertices: vec![EdgeVertexRule::smooth(
            [Index(0), Index(1)],
            [Index(2), Index(3)],
            Scheme::Loop,
        )],
        vertex_vertices: vec![VertexVertexRule {
            offset: 0,
            valence: 3,
            parent: Index(0),
            weight: 1.0,
            ..Default::default()
        }],
        vertex_indices: vec![Index(1), Index(2), Index(3)],
        ..Default::default()
    }
    .validated()?;

    let batches = [
        KernelBatch::new(KernelType::EdgeVertices, 1, 0..1).vertex_offset(4),
        KernelBatch::new(KernelType::VertexVerticesB, 1, 0..1).vertex_offset(5),
    ];

    let context = ComputeContext::new(Arc::new(tables));
    let controller = ComputeController::new(Default::default())?;

    let mut vertices = [0.0, 8.0, 16.0, 0.0, SENTINEL, SENTINEL];
    controller.refine(
        &context,
        &batches,
        BufferBinding::new(&mut vertices, BufferDescriptor::packed(1)),
        None,
    )?;

    // Edge: 3/8 * (0 + 8) + 1/8 * (16 + 0). Vertex: beta = 3/16 for
    // valence 3, all of it on the ring.
    assert_close(&vertices[4..], &[5.0, 0.1875 * 24.0]);

    Ok(())
}

#[test]
fn test_bilinear_rules() -> anyhow::Result<()> {
    let tables = SubdivisionTables {
        scheme: Scheme::Bilinear,
        ..quad_tables()
    };
    let batches = [
        KernelBatch::new(KernelType::FaceVertices, 1, 0..1).vertex_offset(4),
        KernelBatch::new(KernelType::EdgeVertices, 1, 0..4).vertex_offset(5),
        KernelBatch::new(KernelType::VertexVerticesB, 1, 0..4).vertex_offset(9),
    ];

    let context = ComputeContext::new(Arc::new(tables));
    let controller = ComputeController::new(Default::default())?;

    let mut buffer = CpuVertexBuffer::new(2, 13)?;
    buffer.update_vertices(&QUAD, 0)?;
    assert_eq!(controller.refine(&context, &batches, buffer.binding(), None)?, 9);

    let vertices: &[[f32; 2]] = buffer.vertices().expect("xy tiles the buffer");
    assert_eq!(vertices[4], [1.0, 1.0]);
    assert_eq!(vertices[6], [2.0, 1.0]);
    assert_eq!(vertices[9..], QUAD);

    // Bilinear has no crease passes.
    assert!(matches!(
        controller.refine(
            &context,
            &[KernelBatch::new(KernelType::VertexVerticesA1, 1, 0..4).vertex_offset(9)],
            buffer.binding(),
            None,
        ),
        Err(Error::UnsupportedKernel {
            kernel: KernelType::VertexVerticesA1,
            scheme: Scheme::Bilinear
        })
    ));

    Ok(())
}

#[test]
fn test_loop_has_no_face_vertices() -> anyhow::Result<()> {
    let context = ComputeContext::new(Arc::new(SubdivisionTables {
        scheme: Scheme::Loop,
        ..Default::default()
    }));
    let controller = ComputeController::new(Default::default())?;

    let mut vertices = [0.0f32; 4];
    let result = controller.refine(
        &context,
        &[KernelBatch::new(KernelType::FaceVertices, 1, 0..0)],
        BufferBinding::new(&mut vertices, BufferDescriptor::packed(1)),
        None,
    );

    assert!(matches!(result, Err(Error::UnsupportedKernel { .. })));

    Ok(())
}

#[test]
fn test_hierarchical_edits() -> anyhow::Result<()> {
    let edits = vec![
        VertexEditTable::new(EditOperation::Set, 1, 1, vec![Index(0)], vec![5.0])?,
        // The same vertex twice: both edits apply.
        VertexEditTable::new(
            EditOperation::Add,
            0,
            1,
            vec![Index(1), Index(1)],
            vec![1.0, 1.0],
        )?,
    ];
    let context = ComputeContext::new(Arc::new(quad_tables())).with_edit_tables(edits);
    let controller = ComputeController::new(Default::default())?;

    let mut batches = quad_batches();
    batches.push(
        KernelBatch::new(KernelType::HierarchicalEdit, 1, 0..1)
            .table_index(0)
            .vertex_offset(4),
    );
    batches.push(
        KernelBatch::new(KernelType::HierarchicalEdit, 1, 0..2)
            .table_index(1)
            .vertex_offset(4),
    );

    let mut buffer = CpuVertexBuffer::new(2, 13)?;
    buffer.update_vertices(&QUAD, 0)?;
    assert_eq!(controller.refine(&context, &batches, buffer.binding(), None)?, 12);

    let vertices: &[[f32; 2]] = buffer.vertices().expect("xy tiles the buffer");
    assert_eq!(vertices[4], [1.0, 5.0]);
    assert_eq!(vertices[5], [3.0, 0.0]);

    Ok(())
}

#[test]
fn test_edit_validation() -> anyhow::Result<()> {
    let controller = ComputeController::new(Default::default())?;
    let mut vertices = [0.0f32; 26];

    // Edits write past the primvar.
    let context = ComputeContext::new(Arc::new(quad_tables())).with_edit_tables(vec![
        VertexEditTable::new(EditOperation::Set, 1, 2, vec![Index(0)], vec![1.0, 1.0])?,
    ]);
    assert!(matches!(
        context.bind(
            BufferBinding::new(&mut vertices, BufferDescriptor::packed(2)),
            None
        ),
        Err(Error::InvalidEditTable(_))
    ));

    // A window at the very end of the channel range.
    let context = ComputeContext::new(Arc::new(quad_tables())).with_edit_tables(vec![
        VertexEditTable::new(EditOperation::Add, u32::MAX, 1, vec![Index(0)], vec![1.0])?,
    ]);
    assert!(matches!(
        context.bind(
            BufferBinding::new(&mut vertices, BufferDescriptor::packed(2)),
            None
        ),
        Err(Error::InvalidEditTable(_))
    ));

    // No edit table 1.
    let context = ComputeContext::new(Arc::new(quad_tables())).with_edit_tables(vec![
        VertexEditTable::new(EditOperation::Set, 0, 1, vec![Index(0)], vec![1.0])?,
    ]);
    assert!(matches!(
        controller.refine(
            &context,
            &[KernelBatch::new(KernelType::HierarchicalEdit, 1, 0..1).table_index(1)],
            BufferBinding::new(&mut vertices, BufferDescriptor::packed(2)),
            None,
        ),
        Err(Error::IndexOutOfBounds { index: 1, max: 1 })
    ));

    // Edited vertex outside the buffer.
    assert!(matches!(
        controller.refine(
            &context,
            &[KernelBatch::new(KernelType::HierarchicalEdit, 1, 0..1).vertex_offset(13)],
            BufferBinding::new(&mut vertices, BufferDescriptor::packed(2)),
            None,
        ),
        Err(Error::InvalidBufferSize { .. })
    ));

    assert!(VertexEditTable::new(EditOperation::Add, 0, 0, vec![], vec![]).is_err());
    assert!(VertexEditTable::new(EditOperation::Add, 0, 2, vec![Index(0)], vec![1.0]).is_err());

    Ok(())
}

#[test]
fn test_stencil_batches() -> anyhow::Result<()> {
    let stencils = StencilTable::from_stencils([
        (&[0u32, 1][..], &[0.5f32, 0.5][..]),
        (&[2][..], &[1.0][..]),
    ])?;
    let context =
        ComputeContext::new(Arc::new(SubdivisionTables::default())).with_stencil_table(Arc::new(stencils));
    let controller = ComputeController::new(Default::default())?;

    let mut buffer = CpuVertexBuffer::new(2, 6)?;
    buffer.update_vertices(&QUAD, 0)?;
    assert_eq!(
        controller.refine(
            &context,
            &[KernelBatch::new(KernelType::Stencils, 1, 0..2).vertex_offset(4)],
            buffer.binding(),
            None,
        )?,
        2
    );

    let vertices: &[[f32; 2]] = buffer.vertices().expect("xy tiles the buffer");
    assert_eq!(vertices[4..], [[1.0, 0.0], [2.0, 2.0]]);

    // Stencils can't overwrite the control vertices they read.
    assert!(matches!(
        controller.refine(
            &context,
            &[KernelBatch::new(KernelType::Stencils, 1, 0..2).vertex_offset(1)],
            buffer.binding(),
            None,
        ),
        Err(Error::IndexOutOfBounds { .. })
    ));

    let context = ComputeContext::new(Arc::new(SubdivisionTables::default()));
    assert!(matches!(
        controller.refine(
            &context,
            &[KernelBatch::new(KernelType::Stencils, 1, 0..2).vertex_offset(4)],
            buffer.binding(),
            None,
        ),
        Err(Error::MissingStencilTable)
    ));

    Ok(())
}

#[test]
fn test_max_level() -> anyhow::Result<()> {
    let mut tables = quad_tables();
    tables.face_vertices.push(FaceVertexRule {
        offset: 4,
        valence: 4,
    });
    tables.face_indices.extend([4, 5, 6, 7].map(Index));

    let mut batches = quad_batches();
    batches.push(
        KernelBatch::new(KernelType::FaceVertices, 2, 0..1)
            .table_offset(1)
            .vertex_offset(13),
    );
    assert_eq!(osd_refine::far::max_level(&batches), Some(2));

    let context = ComputeContext::new(Arc::new(tables.validated()?));
    let controller = ComputeController::new(Default::default())?;

    let mut vertices = [SENTINEL; 14 * 2];
    vertices[..8].copy_from_slice(bytemuck::cast_slice(&QUAD));
    let desc = BufferDescriptor::packed(2);

    assert_eq!(
        controller.refine_to_level(&context, &batches, 1, BufferBinding::new(&mut vertices, desc), None)?,
        9
    );
    assert_eq!(vertices[26..], [SENTINEL, SENTINEL]);

    assert_eq!(
        controller.refine(&context, &batches, BufferBinding::new(&mut vertices, desc), None)?,
        10
    );
    assert_eq!(vertices[26..], [1.25, 1.0]);

    Ok(())
}

#[test]
fn test_failing_sequence_writes_nothing() -> anyhow::Result<()> {
    let context = ComputeContext::new(Arc::new(quad_tables()));
    let controller = ComputeController::new(Default::default())?;

    let mut vertices = [SENTINEL; 13 * 2];
    vertices[..8].copy_from_slice(bytemuck::cast_slice(&QUAD));
    let before = vertices;

    // The second batch reads rows the tables don't have.
    let batches = [
        KernelBatch::new(KernelType::FaceVertices, 1, 0..1).vertex_offset(4),
        KernelBatch::new(KernelType::EdgeVertices, 1, 0..5).vertex_offset(5),
    ];
    assert!(matches!(
        controller.refine(
            &context,
            &batches,
            BufferBinding::new(&mut vertices, BufferDescriptor::packed(2)),
            None,
        ),
        Err(Error::IndexOutOfBounds { index: 4, max: 4 })
    ));
    assert_eq!(vertices, before);

    // The last batch writes past the buffer.
    let mut short = [0.0f32; 12 * 2];
    assert!(matches!(
        controller.refine(
            &context,
            &quad_batches(),
            BufferBinding::new(&mut short, BufferDescriptor::packed(2)),
            None,
        ),
        Err(Error::InvalidBufferSize {
            expected: 26,
            actual: 24
        })
    ));
    assert!(short.iter().all(|&value| 0.0 == value));

    Ok(())
}

#[test]
fn test_rules_reading_ahead_are_rejected() -> anyhow::Result<()> {
    let controller = ComputeController::new(Default::default())?;

    // The face row reads vertex 5, which is at or past its own destination.
    let tables = SubdivisionTables {
        scheme: Scheme::CatmullClark,
        face_vertices: vec![FaceVertexRule {
            offset: 0,
            valence: 2,
        }],
        face_indices: vec![Index(0), Index(5)],
        edge_vertices: vec![EdgeVertexRule::sharp([Index(0), Index(1)])],
        ..Default::default()
    }
    .validated()?;
    let context = ComputeContext::new(Arc::new(tables));

    let mut vertices = [1.0, 3.0, -7.0, 9.0, 9.0, 9.0];
    let before = vertices;
    let batches = [
        KernelBatch::new(KernelType::EdgeVertices, 1, 0..1).vertex_offset(2),
        KernelBatch::new(KernelType::FaceVertices, 1, 0..1).vertex_offset(3),
    ];
    assert!(matches!(
        controller.refine(
            &context,
            &batches,
            BufferBinding::new(&mut vertices, BufferDescriptor::packed(1)),
            None,
        ),
        Err(Error::IndexOutOfBounds { index: 5, max: 3 })
    ));
    assert_eq!(vertices, before);

    // A crease neighbor that is the vertex being written.
    let context = ComputeContext::new(Arc::new(SubdivisionTables {
        scheme: Scheme::CatmullClark,
        vertex_vertices: vec![VertexVertexRule {
            parent: Index(0),
            crease_edges: Some([Index(1), Index(3)]),
            weight: 0.5,
            ..Default::default()
        }],
        ..Default::default()
    }));
    let mut vertices = [SENTINEL; 4];
    assert!(matches!(
        controller.refine(
            &context,
            &[KernelBatch::new(KernelType::VertexVerticesA2, 1, 0..1).vertex_offset(3)],
            BufferBinding::new(&mut vertices, BufferDescriptor::packed(1)),
            None,
        ),
        Err(Error::IndexOutOfBounds { index: 3, max: 3 })
    ));
    assert_eq!(vertices, [SENTINEL; 4]);

    // Bilinear edges never read their face points.
    let context = ComputeContext::new(Arc::new(SubdivisionTables {
        scheme: Scheme::Bilinear,
        edge_vertices: vec![EdgeVertexRule::smooth(
            [Index(0), Index(1)],
            [Index(7), Index(8)],
            Scheme::Bilinear,
        )],
        ..Default::default()
    }));
    let mut vertices = [2.0, 4.0, SENTINEL];
    controller.refine(
        &context,
        &[KernelBatch::new(KernelType::EdgeVertices, 1, 0..1).vertex_offset(2)],
        BufferBinding::new(&mut vertices, BufferDescriptor::packed(1)),
        None,
    )?;
    assert_eq!(vertices, [2.0, 4.0, 3.0]);

    Ok(())
}

#[test]
fn test_overflowing_offsets_are_rejected() -> anyhow::Result<()> {
    let context = ComputeContext::new(Arc::new(quad_tables()));
    let controller = ComputeController::new(Default::default())?;

    let mut vertices = [SENTINEL; 13 * 2];
    for raw in [[1, 1, 0, 1, 2, u32::MAX, 0], [1, 1, 0, 1, 2, 0, u32::MAX]] {
        let result = controller.refine(
            &context,
            &[KernelBatch::from_raw(raw)?],
            BufferBinding::new(&mut vertices, BufferDescriptor::packed(2)),
            None,
        );
        assert!(result.is_err());
    }
    assert_eq!(vertices, [SENTINEL; 13 * 2]);

    Ok(())
}

#[test]
fn test_empty_sequence() -> anyhow::Result<()> {
    let context = ComputeContext::new(Arc::new(quad_tables()));
    let controller = ComputeController::new(Default::default())?;

    let mut vertices = [SENTINEL; 4];
    assert_eq!(
        controller.refine(
            &context,
            &[],
            BufferBinding::new(&mut vertices, BufferDescriptor::packed(2)),
            None,
        )?,
        0
    );
    assert_eq!(vertices, [SENTINEL; 4]);

    // Binding still validates the layout.
    assert!(matches!(
        controller.refine(
            &context,
            &[],
            BufferBinding::new(&mut vertices, BufferDescriptor::new(0, 3, 2)),
            None,
        ),
        Err(Error::InvalidDescriptor { .. })
    ));

    Ok(())
}

#[test]
fn test_dispatch_on_bound_context() -> anyhow::Result<()> {
    let context = ComputeContext::new(Arc::new(quad_tables()));
    let controller = ComputeController::new(Default::default())?;

    // Positions interleaved with a second primvar the batches must not
    // touch.
    let mut vertices = [SENTINEL; 13 * 4];
    for (i, [x, y]) in QUAD.into_iter().enumerate() {
        vertices[i * 4..i * 4 + 2].copy_from_slice(&[x, y]);
    }
    let desc = BufferDescriptor::new(0, 2, 4);

    let binding = BufferBinding::new(&mut vertices, desc);
    assert_eq!(binding.elements_len(), 13);

    let mut bound = context.bind(binding, None)?;
    let batches = quad_batches();
    assert_eq!(controller.dispatch(&mut bound, &batches, None)?, 9);
    let first = bound.vertex().to_vec();
    assert_eq!(controller.dispatch(&mut bound, &batches, None)?, 9);
    assert_eq!(bound.vertex(), first);
    assert!(bound.varying().is_none());
    drop(bound);

    assert_eq!(vertices[4 * 4..4 * 4 + 4], [1.0, 1.0, SENTINEL, SENTINEL]);
    assert!(vertices
        .chunks(4)
        .all(|vertex| SENTINEL == vertex[2] && SENTINEL == vertex[3]));

    Ok(())
}

/// Three levels of pseudo-random rows, each reading the output of the
/// previous batches.
fn scattered_refinement() -> (SubdivisionTables, Vec<KernelBatch>, usize) {
    let mut state = 0x9e37_79b9_u32;
    let mut next = move |bound: usize| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        Index(state % bound as u32)
    };

    let coarse = 64;
    let faces = 256;
    let edges = 512;
    let vertices = 256;

    let face_indices: Vec<Index> = (0..faces * 4).map(|_| next(coarse)).collect();
    let face_end = coarse + faces;

    let edge_vertices = (0..edges)
        .map(|_| {
            EdgeVertexRule::smooth(
                [next(face_end), next(face_end)],
                [next(face_end), next(face_end)],
                Scheme::CatmullClark,
            )
        })
        .collect();
    let edge_end = face_end + edges;

    let vertex_indices: Vec<Index> = (0..vertices * 6).map(|_| next(edge_end)).collect();
    let vertex_vertices = (0..vertices)
        .map(|i| VertexVertexRule {
            offset: (i * 6) as u32,
            valence: 3,
            parent: next(coarse),
            weight: 1.0,
            ..Default::default()
        })
        .collect();

    let tables = SubdivisionTables {
        scheme: Scheme::CatmullClark,
        face_vertices: (0..faces)
            .map(|i| FaceVertexRule {
                offset: (i * 4) as u32,
                valence: 4,
            })
            .collect(),
        face_indices,
        edge_vertices,
        vertex_vertices,
        vertex_indices,
    };

    let batches = vec![
        KernelBatch::new(KernelType::FaceVertices, 1, 0..faces as u32).vertex_offset(coarse as u32),
        KernelBatch::new(KernelType::EdgeVertices, 1, 0..edges as u32).vertex_offset(face_end as u32),
        KernelBatch::new(KernelType::VertexVerticesB, 1, 0..vertices as u32)
            .vertex_offset(edge_end as u32),
    ];

    (tables, batches, edge_end + vertices)
}

#[test]
fn test_thread_count_independence() -> anyhow::Result<()> {
    init_logging();

    let (tables, batches, len) = scattered_refinement();
    let context = ComputeContext::new(Arc::new(tables.validated()?));
    let desc = BufferDescriptor::packed(3);

    let coarse: Vec<f32> = (0..64 * 3).map(|i| (i as f32 * 0.61).cos()).collect();
    let refine = |thread_count: i32| -> anyhow::Result<Vec<f32>> {
        let controller = ComputeController::new(thread_count.into())?;
        assert_eq!(controller.thread_count(), thread_count as usize);

        let mut vertices = vec![SENTINEL; len * 3];
        vertices[..coarse.len()].copy_from_slice(&coarse);
        controller.refine(&context, &batches, BufferBinding::new(&mut vertices, desc), None)?;
        Ok(vertices)
    };

    let serial = refine(1)?;
    assert!(serial.iter().all(|&value| SENTINEL != value));
    assert_eq!(serial, refine(3)?);
    assert_eq!(serial, refine(8)?);

    Ok(())
}
