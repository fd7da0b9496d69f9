//! Refines a single quad one level, once with subdivision tables and once
//! with the equivalent stencils, and prints the refined vertices.
//!
//! Run with `RUST_LOG=debug` to see what the controllers do.
use std::sync::Arc;

use osd_refine::{far, osd, Index};

const COARSE: [[f32; 3]; 4] = [
    [-0.5, -0.5, 0.0],
    [0.5, -0.5, 0.0],
    [0.5, 0.5, 0.0],
    [-0.5, 0.5, 0.0],
];

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Level 1 of a boundary quad: one face point, four boundary edge
    // points, four corners.
    let tables = far::SubdivisionTables {
        scheme: far::Scheme::CatmullClark,
        face_vertices: vec![far::FaceVertexRule {
            offset: 0,
            valence: 4,
        }],
        face_indices: (0..4).map(Index).collect(),
        edge_vertices: (0..4)
            .map(|i| far::EdgeVertexRule::sharp([Index(i), Index((i + 1) % 4)]))
            .collect(),
        vertex_vertices: (0..4)
            .map(|i| far::VertexVertexRule {
                parent: Index(i),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
    .validated()?;

    let batches = [
        far::KernelBatch::new(far::KernelType::FaceVertices, 1, 0..1).vertex_offset(4),
        far::KernelBatch::new(far::KernelType::EdgeVertices, 1, 0..4).vertex_offset(5),
        far::KernelBatch::new(far::KernelType::VertexVerticesA1, 1, 0..4).vertex_offset(9),
    ];

    let context = osd::ComputeContext::new(Arc::new(tables));
    let controller = osd::ComputeController::new(osd::ControllerOptions::default())?;

    let mut vertex_buffer = osd::CpuVertexBuffer::new(3, 13)?;
    vertex_buffer.update_vertices(&COARSE, 0)?;

    let refined = controller.refine(&context, &batches, vertex_buffer.binding(), None)?;
    controller.synchronize();

    println!("Subdivision tables: {refined} refined vertices");
    let vertices: &[[f32; 3]] = vertex_buffer.vertices().unwrap_or(&[]);
    for (i, [x, y, z]) in vertices.iter().enumerate().skip(4) {
        println!("  v {i:2}: {x:5.2} {y:5.2} {z:5.2}");
    }

    // The same level as stencils over the coarse vertices.
    let stencils = far::StencilTable::from_stencils([
        (vec![0u32, 1, 2, 3], vec![0.25f32; 4]),
        (vec![0, 1], vec![0.5; 2]),
        (vec![1, 2], vec![0.5; 2]),
        (vec![2, 3], vec![0.5; 2]),
        (vec![3, 0], vec![0.5; 2]),
        (vec![0], vec![1.0]),
        (vec![1], vec![1.0]),
        (vec![2], vec![1.0]),
        (vec![3], vec![1.0]),
    ])?;

    let desc = osd::BufferDescriptor::packed(3);
    let context = osd::EvalStencilsContext::new(Arc::new(stencils), desc, desc);
    let controller = osd::EvalStencilsController::new(osd::ControllerOptions::default())?;

    let control: &[f32] = bytemuck::cast_slice(&COARSE);
    let mut output = vec![0.0f32; 9 * 3];
    let evaluated = {
        let mut bound = context.bind(osd::StencilBuffers {
            control: Some(control),
            output: Some(&mut output),
            ..Default::default()
        })?;
        controller.update_values(&mut bound)
    };

    println!("Stencils: {evaluated} refined vertices");
    for (i, vertex) in output.chunks(3).enumerate() {
        println!(
            "  v {:2}: {:5.2} {:5.2} {:5.2}",
            i + 4,
            vertex[0],
            vertex[1],
            vertex[2]
        );
    }

    Ok(())
}
