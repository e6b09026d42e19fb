use glam::DVec3;
use tracing::info;

use crate::{
    builder::{IndexingMode, MeshBuilder, SequentialSink, SurfaceSink},
    error::{ConstructionError, Error},
    mesh::QuadMesh,
};

/**
 * Feed a `w` x `h` grid of unit quads into `sink`.
 *
 * Vertex `(i, j)` is the `j`-th vertex of the `i`-th row. It is placed at
 * `(j, i, 0)` and added in row major order, so its position in the sequence
 * is `i * (w + 1) + j`. That is also its id. The facet of cell `(i, j)` has the
 * id `i * w + j` and the corners `(i, j)`, `(i + 1, j)`, `(i + 1, j + 1)`,
 * `(i, j + 1)` in that order, which gives all facets the same orientation.
 */
pub fn generate_grid(sink: &mut impl SurfaceSink, w: usize, h: usize) -> Result<(), Error> {
    if w == 0 || h == 0 {
        return Err(ConstructionError::InvalidGridSize { w, h }.into());
    }
    let stride = w + 1;
    let corner = |i: usize, j: usize| i * stride + j;
    for i in 0..=h {
        for j in 0..=w {
            sink.add_vertex(DVec3::new(j as f64, i as f64, 0.0), corner(i, j))?;
        }
    }
    for i in 0..h {
        for j in 0..w {
            sink.add_face(
                [
                    corner(i, j),
                    corner(i + 1, j),
                    corner(i + 1, j + 1),
                    corner(i, j + 1),
                ],
                i * w + j,
            )?;
        }
    }
    Ok(())
}

impl QuadMesh {
    /// Create a procedural `w` x `h` grid of quads. See [`generate_grid`] for
    /// the layout of the vertices and facets.
    pub fn grid(w: usize, h: usize) -> Result<Self, Error> {
        let mut mesh = QuadMesh::new();
        let mut builder = MeshBuilder::new(&mut mesh);
        let nedges = w * (h + 1) + h * (w + 1);
        builder.begin_surface(
            (w + 1) * (h + 1),
            w * h,
            2 * nedges,
            IndexingMode::Relative,
        )?;
        let result = SequentialSink::new(&mut builder)
            .map_err(Error::from)
            .and_then(|mut sink| generate_grid(&mut sink, w, h));
        match result {
            Ok(()) => builder.end_surface()?,
            Err(e) => {
                builder.rollback()?;
                return Err(e);
            }
        }
        info!(w, h, faces = mesh.num_faces(), "Created grid");
        Ok(mesh)
    }
}
