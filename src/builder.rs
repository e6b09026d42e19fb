use std::collections::HashMap;

use glam::DVec3;
use tracing::{debug, trace};

use crate::{
    element::{FH, Handle, VH},
    error::{ConstructionError, Error},
    mesh::QuadMesh,
};

/// How the builder interprets the vertex indices of a facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexingMode {
    /// Offsets into the vertices created since the surface was opened.
    #[default]
    Relative,
    /// Indices into all vertices of the mesh, including the ones that existed
    /// before the surface was opened.
    Absolute,
}

struct OpenFacet {
    id: usize,
    corners: Vec<VH>,
}

struct Surface {
    mode: IndexingMode,
    first_vertex: usize,
    snapshot: QuadMesh,
    facet: Option<OpenFacet>,
    erased: bool,
}

/**
 * Incremental construction of a [`QuadMesh`].
 *
 * Vertices and facets are added between [`MeshBuilder::begin_surface`] and
 * [`MeshBuilder::end_surface`]. A facet is described by
 * [`MeshBuilder::begin_facet`], followed by one
 * [`MeshBuilder::add_vertex_to_facet`] per corner, and closed by
 * [`MeshBuilder::end_facet`]. A surface that fails half way can be discarded
 * with [`MeshBuilder::rollback`], which restores the mesh to its state before
 * the surface was opened.
 */
pub struct MeshBuilder<'a> {
    mesh: &'a mut QuadMesh,
    surface: Option<Surface>,
}

impl<'a> MeshBuilder<'a> {
    pub fn new(mesh: &'a mut QuadMesh) -> Self {
        MeshBuilder {
            mesh,
            surface: None,
        }
    }

    pub fn mesh(&self) -> &QuadMesh {
        self.mesh
    }

    pub fn is_open(&self) -> bool {
        self.surface.is_some()
    }

    pub fn mode(&self) -> Option<IndexingMode> {
        self.surface.as_ref().map(|s| s.mode)
    }

    fn surface(&self) -> Result<&Surface, ConstructionError> {
        self.surface.as_ref().ok_or(ConstructionError::SurfaceNotOpen)
    }

    fn surface_mut(&mut self) -> Result<&mut Surface, ConstructionError> {
        self.surface.as_mut().ok_or(ConstructionError::SurfaceNotOpen)
    }

    /// Open a new surface. The counts are only used to reserve storage, and
    /// zero is a valid hint when the counts are not known up front.
    pub fn begin_surface(
        &mut self,
        nverts: usize,
        nfaces: usize,
        nhalfedges: usize,
        mode: IndexingMode,
    ) -> Result<(), ConstructionError> {
        if self.surface.is_some() {
            return Err(ConstructionError::SurfaceAlreadyOpen);
        }
        let snapshot = self.mesh.clone();
        self.mesh.reserve(nverts, nhalfedges / 2, nfaces);
        debug!(
            ?mode,
            vertices = nverts,
            faces = nfaces,
            halfedges = nhalfedges,
            "Opened surface"
        );
        self.surface = Some(Surface {
            mode,
            first_vertex: self.mesh.num_vertices(),
            snapshot,
            facet: None,
            erased: false,
        });
        Ok(())
    }

    pub fn add_vertex(&mut self, pos: DVec3, id: usize) -> Result<VH, ConstructionError> {
        self.surface()?;
        self.mesh.add_vertex(pos, id)
    }

    pub fn begin_facet(&mut self, id: usize) -> Result<(), ConstructionError> {
        let exists = self.mesh.find_face(id).is_some();
        let surface = self.surface_mut()?;
        if surface.facet.is_some() {
            return Err(ConstructionError::FacetAlreadyOpen);
        }
        if exists {
            return Err(ConstructionError::DuplicateFacetId(id));
        }
        surface.facet = Some(OpenFacet {
            id,
            corners: Vec::with_capacity(4),
        });
        Ok(())
    }

    /// Add a corner to the open facet. The index is interpreted according to
    /// the indexing mode of the surface.
    pub fn add_vertex_to_facet(&mut self, index: usize) -> Result<(), ConstructionError> {
        let nverts = self.mesh.num_vertices();
        let surface = self.surface()?;
        let (first, count) = match surface.mode {
            IndexingMode::Relative => (surface.first_vertex, nverts - surface.first_vertex),
            IndexingMode::Absolute => (0, nverts),
        };
        if index >= count {
            return Err(ConstructionError::VertexIndexOutOfRange { index, count });
        }
        let v: VH = ((first + index) as u32).into();
        if self.mesh.topol.is_deleted_vertex(v) {
            return Err(ConstructionError::VertexIndexOutOfRange { index, count });
        }
        match self.surface_mut()?.facet.as_mut() {
            Some(facet) => {
                facet.corners.push(v);
                Ok(())
            }
            None => Err(ConstructionError::NoOpenFacet),
        }
    }

    pub fn end_facet(&mut self) -> Result<FH, ConstructionError> {
        let facet = self
            .surface_mut()?
            .facet
            .take()
            .ok_or(ConstructionError::NoOpenFacet)?;
        let f = self.mesh.add_face(&facet.corners, facet.id)?;
        trace!(id = facet.id, corners = facet.corners.len(), "Added facet");
        Ok(f)
    }

    /// Delete the facet with the given id. The halfedges of the facet become
    /// border halfedges, and vertices left without incident edges are
    /// deleted with it. Storage is compacted when the surface ends.
    pub fn erase_facet(&mut self, id: usize) -> Result<(), ConstructionError> {
        self.surface()?;
        let f = self
            .mesh
            .find_face(id)
            .ok_or(ConstructionError::UnknownFacetId(id))?;
        self.mesh.delete_face(f);
        self.surface_mut()?.erased = true;
        debug!(id, "Erased facet");
        Ok(())
    }

    pub fn end_surface(&mut self) -> Result<(), ConstructionError> {
        if self.surface()?.facet.is_some() {
            return Err(ConstructionError::FacetNotClosed);
        }
        let surface = self.surface.take().ok_or(ConstructionError::SurfaceNotOpen)?;
        if surface.erased && self.mesh.has_deleted_elements() {
            self.mesh.garbage_collection();
        }
        debug!(
            vertices = self.mesh.num_vertices(),
            faces = self.mesh.num_faces(),
            "Closed surface"
        );
        Ok(())
    }

    /// Discard the open surface, restoring the mesh to its state before the
    /// surface was opened.
    pub fn rollback(&mut self) -> Result<(), ConstructionError> {
        let surface = self.surface.take().ok_or(ConstructionError::SurfaceNotOpen)?;
        *self.mesh = surface.snapshot;
        debug!(
            vertices = self.mesh.num_vertices(),
            faces = self.mesh.num_faces(),
            "Rolled back surface"
        );
        Ok(())
    }
}

/// Receives the vertices and faces produced by a grid generator or by a
/// raster source.
pub trait SurfaceSink {
    fn add_vertex(&mut self, position: DVec3, id: usize) -> Result<(), Error>;

    fn add_face(&mut self, corners: [usize; 4], id: usize) -> Result<(), Error>;
}

/// Sink for generators that know the order in which they create vertices.
/// Corners are positions in the sequence of vertices added to the surface.
pub struct SequentialSink<'b, 'a> {
    builder: &'b mut MeshBuilder<'a>,
}

impl<'b, 'a> SequentialSink<'b, 'a> {
    /// The surface of the builder must be open in relative indexing mode.
    pub fn new(builder: &'b mut MeshBuilder<'a>) -> Result<Self, ConstructionError> {
        match builder.mode() {
            None => Err(ConstructionError::SurfaceNotOpen),
            Some(IndexingMode::Relative) => Ok(SequentialSink { builder }),
            Some(mode) => Err(ConstructionError::WrongIndexingMode(mode)),
        }
    }
}

impl SurfaceSink for SequentialSink<'_, '_> {
    fn add_vertex(&mut self, position: DVec3, id: usize) -> Result<(), Error> {
        self.builder.add_vertex(position, id)?;
        Ok(())
    }

    fn add_face(&mut self, corners: [usize; 4], id: usize) -> Result<(), Error> {
        self.builder.begin_facet(id)?;
        for i in corners {
            self.builder.add_vertex_to_facet(i)?;
        }
        self.builder.end_facet()?;
        Ok(())
    }
}

/**
 * Sink for sources that address vertices by their external ids, and may
 * report the same vertex more than once.
 *
 * Every vertex of the mesh is indexed by its id when the sink is created.
 * Adding a vertex whose id is already indexed does nothing, so the first
 * writer wins. Faces refer to their corners by id.
 */
pub struct IdIndexedSink<'b, 'a> {
    builder: &'b mut MeshBuilder<'a>,
    index: HashMap<usize, usize>,
}

impl<'b, 'a> IdIndexedSink<'b, 'a> {
    /// The surface of the builder must be open in absolute indexing mode.
    pub fn new(builder: &'b mut MeshBuilder<'a>) -> Result<Self, ConstructionError> {
        match builder.mode() {
            None => return Err(ConstructionError::SurfaceNotOpen),
            Some(IndexingMode::Absolute) => {}
            Some(mode) => return Err(ConstructionError::WrongIndexingMode(mode)),
        }
        let mesh = builder.mesh();
        let index: HashMap<usize, usize> = mesh
            .vertices()
            .map(|v| (mesh.vertex_id(v), v.index() as usize))
            .collect();
        debug!(vertices = index.len(), "Indexed existing vertices");
        Ok(IdIndexedSink { builder, index })
    }

    pub fn num_indexed(&self) -> usize {
        self.index.len()
    }
}

impl SurfaceSink for IdIndexedSink<'_, '_> {
    fn add_vertex(&mut self, position: DVec3, id: usize) -> Result<(), Error> {
        if self.index.contains_key(&id) {
            return Ok(());
        }
        let v = self.builder.add_vertex(position, id)?;
        self.index.insert(id, v.index() as usize);
        Ok(())
    }

    fn add_face(&mut self, corners: [usize; 4], id: usize) -> Result<(), Error> {
        let mut indices = [0usize; 4];
        for (dst, cid) in indices.iter_mut().zip(corners) {
            *dst = *self
                .index
                .get(&cid)
                .ok_or(ConstructionError::UnindexedVertexId { id: cid, facet: id })?;
        }
        self.builder.begin_facet(id)?;
        for i in indices {
            self.builder.add_vertex_to_facet(i)?;
        }
        self.builder.end_facet()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use glam::DVec3;

    use crate::{
        error::{ConstructionError, Error},
        mesh::QuadMesh,
    };

    use super::{IdIndexedSink, IndexingMode, MeshBuilder, SequentialSink, SurfaceSink};

    fn unit_square(builder: &mut MeshBuilder, first_id: usize) {
        for (i, (x, y)) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .into_iter()
            .enumerate()
        {
            builder
                .add_vertex(DVec3::new(x, y, 0.0), first_id + i)
                .expect("Cannot add vertex");
        }
    }

    #[test]
    fn t_relative_indexing() {
        let mut mesh = QuadMesh::new();
        let mut builder = MeshBuilder::new(&mut mesh);
        builder
            .begin_surface(4, 1, 8, IndexingMode::Relative)
            .expect("Cannot open surface");
        unit_square(&mut builder, 0);
        builder.begin_facet(0).expect("Cannot begin facet");
        for i in 0..4 {
            builder.add_vertex_to_facet(i).expect("Cannot add corner");
        }
        builder.end_facet().expect("Cannot end facet");
        builder.end_surface().expect("Cannot end surface");
        // A second surface addresses only its own vertices.
        builder
            .begin_surface(0, 0, 0, IndexingMode::Relative)
            .expect("Cannot open surface");
        unit_square(&mut builder, 100);
        builder.begin_facet(1).expect("Cannot begin facet");
        builder.add_vertex_to_facet(0).expect("Cannot add corner");
        assert_eq!(
            builder.add_vertex_to_facet(4),
            Err(ConstructionError::VertexIndexOutOfRange { index: 4, count: 4 })
        );
        for i in 1..4 {
            builder.add_vertex_to_facet(i).expect("Cannot add corner");
        }
        let f = builder.end_facet().expect("Cannot end facet");
        builder.end_surface().expect("Cannot end surface");
        let corners: Vec<_> = mesh
            .fv_ccw_iter(f)
            .map(|v| mesh.vertex_id(v))
            .collect();
        assert_eq!(corners, [100, 101, 102, 103]);
        assert_eq!(mesh.num_faces(), 2);
    }

    #[test]
    fn t_absolute_indexing() {
        let mut mesh = QuadMesh::new();
        let mut builder = MeshBuilder::new(&mut mesh);
        builder
            .begin_surface(0, 0, 0, IndexingMode::Relative)
            .expect("Cannot open surface");
        unit_square(&mut builder, 0);
        builder.end_surface().expect("Cannot end surface");
        builder
            .begin_surface(0, 0, 0, IndexingMode::Absolute)
            .expect("Cannot open surface");
        builder
            .add_vertex(DVec3::new(2.0, 0.0, 0.0), 4)
            .expect("Cannot add vertex");
        builder
            .add_vertex(DVec3::new(2.0, 1.0, 0.0), 5)
            .expect("Cannot add vertex");
        builder.begin_facet(7).expect("Cannot begin facet");
        for i in [1, 4, 5, 2] {
            builder.add_vertex_to_facet(i).expect("Cannot add corner");
        }
        builder.end_facet().expect("Cannot end facet");
        builder.end_surface().expect("Cannot end surface");
        let f = mesh.find_face(7).expect("Cannot find facet");
        let corners: Vec<_> = mesh
            .fv_ccw_iter(f)
            .map(|v| mesh.vertex_id(v))
            .collect();
        assert_eq!(corners, [1, 4, 5, 2]);
    }

    #[test]
    fn t_surface_protocol_errors() {
        let mut mesh = QuadMesh::new();
        let mut builder = MeshBuilder::new(&mut mesh);
        assert_eq!(
            builder.add_vertex(DVec3::ZERO, 0),
            Err(ConstructionError::SurfaceNotOpen)
        );
        assert_eq!(builder.begin_facet(0), Err(ConstructionError::SurfaceNotOpen));
        assert_eq!(builder.end_surface(), Err(ConstructionError::SurfaceNotOpen));
        assert_eq!(builder.rollback(), Err(ConstructionError::SurfaceNotOpen));
        builder
            .begin_surface(0, 0, 0, IndexingMode::Relative)
            .expect("Cannot open surface");
        assert_eq!(
            builder.begin_surface(0, 0, 0, IndexingMode::Relative),
            Err(ConstructionError::SurfaceAlreadyOpen)
        );
        assert_eq!(
            builder.add_vertex_to_facet(0),
            Err(ConstructionError::VertexIndexOutOfRange { index: 0, count: 0 })
        );
        unit_square(&mut builder, 0);
        assert_eq!(
            builder.add_vertex_to_facet(0),
            Err(ConstructionError::NoOpenFacet)
        );
        assert_eq!(builder.end_facet(), Err(ConstructionError::NoOpenFacet));
        builder.begin_facet(0).expect("Cannot begin facet");
        assert_eq!(builder.begin_facet(1), Err(ConstructionError::FacetAlreadyOpen));
        assert_eq!(builder.end_surface(), Err(ConstructionError::FacetNotClosed));
        builder.add_vertex_to_facet(0).expect("Cannot add corner");
        builder.add_vertex_to_facet(1).expect("Cannot add corner");
        assert_eq!(
            builder.end_facet(),
            Err(ConstructionError::DegenerateFacet { id: 0, corners: 2 })
        );
        builder.end_surface().expect("Cannot end surface");
        assert_eq!(mesh.num_faces(), 0);
        assert_eq!(mesh.num_vertices(), 4);
    }

    #[test]
    fn t_repeated_corner() {
        let mut mesh = QuadMesh::new();
        let mut builder = MeshBuilder::new(&mut mesh);
        builder
            .begin_surface(4, 1, 8, IndexingMode::Relative)
            .expect("Cannot open surface");
        unit_square(&mut builder, 0);
        for corners in [[0, 1, 1, 2], [0, 1, 2, 0], [0, 1, 0, 2]] {
            builder.begin_facet(0).expect("Cannot begin facet");
            for i in corners {
                builder.add_vertex_to_facet(i).expect("Cannot add corner");
            }
            assert!(matches!(
                builder.end_facet(),
                Err(ConstructionError::RepeatedCorner { id: 0, .. })
            ));
        }
        // The failed facets leave nothing behind.
        assert_eq!(builder.mesh().num_faces(), 0);
        assert_eq!(builder.mesh().num_edges(), 0);
        builder.begin_facet(0).expect("Cannot begin facet");
        for i in 0..4 {
            builder.add_vertex_to_facet(i).expect("Cannot add corner");
        }
        builder.end_facet().expect("Cannot add facet");
        builder.end_surface().expect("Cannot end surface");
        assert_eq!(mesh.num_faces(), 1);
        mesh.check_topology().expect("Topology is broken");
    }

    #[test]
    fn t_duplicate_facet_id() {
        let mut mesh = QuadMesh::grid(2, 1).expect("Cannot build grid");
        let mut builder = MeshBuilder::new(&mut mesh);
        builder
            .begin_surface(0, 0, 0, IndexingMode::Absolute)
            .expect("Cannot open surface");
        assert_eq!(builder.begin_facet(1), Err(ConstructionError::DuplicateFacetId(1)));
        builder.rollback().expect("Cannot roll back");
    }

    #[test]
    fn t_non_manifold_facet() {
        let mut mesh = QuadMesh::grid(2, 2).expect("Cannot build grid");
        let mut builder = MeshBuilder::new(&mut mesh);
        builder
            .begin_surface(0, 0, 0, IndexingMode::Absolute)
            .expect("Cannot open surface");
        // The center vertex of the grid is interior.
        builder.begin_facet(100).expect("Cannot begin facet");
        for i in [4, 0, 1] {
            builder.add_vertex_to_facet(i).expect("Cannot add corner");
        }
        assert!(matches!(
            builder.end_facet(),
            Err(ConstructionError::ComplexVertex(_))
        ));
        builder.rollback().expect("Cannot roll back");
        assert_eq!(mesh.num_faces(), 4);
        mesh.check_topology().expect("Topology is broken");
    }

    #[test]
    fn t_rollback_restores_mesh() {
        let mut mesh = QuadMesh::grid(3, 2).expect("Cannot build grid");
        let before = mesh.summary();
        let mut builder = MeshBuilder::new(&mut mesh);
        builder
            .begin_surface(0, 0, 0, IndexingMode::Absolute)
            .expect("Cannot open surface");
        builder
            .add_vertex(DVec3::new(4.0, 0.0, 0.0), 1000)
            .expect("Cannot add vertex");
        builder.erase_facet(0).expect("Cannot erase facet");
        builder.erase_facet(4).expect("Cannot erase facet");
        builder.rollback().expect("Cannot roll back");
        assert!(!builder.is_open());
        assert_eq!(mesh.summary(), before);
        assert!(mesh.find_vertex(1000).is_none());
        assert!(mesh.find_face(0).is_some());
    }

    #[test]
    fn t_erase_facet() {
        let mut mesh = QuadMesh::grid(3, 2).expect("Cannot build grid");
        let mut builder = MeshBuilder::new(&mut mesh);
        builder
            .begin_surface(0, 0, 0, IndexingMode::Absolute)
            .expect("Cannot open surface");
        assert_eq!(
            builder.erase_facet(42),
            Err(ConstructionError::UnknownFacetId(42))
        );
        // Corner facet, its corner vertex is left without any edge.
        builder.erase_facet(0).expect("Cannot erase facet");
        builder.end_surface().expect("Cannot end surface");
        assert_eq!(mesh.num_faces(), 5);
        assert_eq!(mesh.num_vertices(), 11);
        assert_eq!(mesh.num_edges(), 15);
        assert!(mesh.find_vertex(0).is_none());
        assert!(mesh.find_face(0).is_none());
        for id in 1..6 {
            let f = mesh.find_face(id).expect("Cannot find facet");
            assert_eq!(mesh.face_id(f), id);
        }
        mesh.check_topology().expect("Topology is broken");
        assert_eq!(mesh.num_border_halfedges(), 10);
    }

    #[test]
    fn t_erase_interior_facet_keeps_vertices() {
        let mut mesh = QuadMesh::grid(3, 3).expect("Cannot build grid");
        let mut builder = MeshBuilder::new(&mut mesh);
        builder
            .begin_surface(0, 0, 0, IndexingMode::Absolute)
            .expect("Cannot open surface");
        builder.erase_facet(4).expect("Cannot erase facet");
        builder.end_surface().expect("Cannot end surface");
        assert_eq!(mesh.num_faces(), 8);
        assert_eq!(mesh.num_vertices(), 16);
        assert_eq!(mesh.num_edges(), 24);
        // The hole adds a second border loop.
        assert_eq!(mesh.num_border_halfedges(), 12 + 4);
        mesh.check_topology().expect("Topology is broken");
    }

    #[test]
    fn t_sink_mode_checks() {
        let mut mesh = QuadMesh::new();
        let mut builder = MeshBuilder::new(&mut mesh);
        assert!(matches!(
            SequentialSink::new(&mut builder),
            Err(ConstructionError::SurfaceNotOpen)
        ));
        builder
            .begin_surface(0, 0, 0, IndexingMode::Relative)
            .expect("Cannot open surface");
        assert!(matches!(
            IdIndexedSink::new(&mut builder),
            Err(ConstructionError::WrongIndexingMode(IndexingMode::Relative))
        ));
        builder.end_surface().expect("Cannot end surface");
        builder
            .begin_surface(0, 0, 0, IndexingMode::Absolute)
            .expect("Cannot open surface");
        assert!(matches!(
            SequentialSink::new(&mut builder),
            Err(ConstructionError::WrongIndexingMode(IndexingMode::Absolute))
        ));
    }

    #[test]
    fn t_first_writer_wins() {
        let mut mesh = QuadMesh::grid(1, 1).expect("Cannot build grid");
        let mut builder = MeshBuilder::new(&mut mesh);
        builder
            .begin_surface(0, 0, 0, IndexingMode::Absolute)
            .expect("Cannot open surface");
        {
            let mut sink = IdIndexedSink::new(&mut builder).expect("Cannot create sink");
            assert_eq!(sink.num_indexed(), 4);
            // Same id, different position: ignored.
            sink.add_vertex(DVec3::new(50.0, 50.0, 50.0), 3)
                .expect("Cannot add vertex");
            sink.add_vertex(DVec3::new(2.0, 0.0, 0.0), 10)
                .expect("Cannot add vertex");
            sink.add_vertex(DVec3::new(2.0, 0.0, 0.0), 10)
                .expect("Cannot add vertex");
            sink.add_vertex(DVec3::new(2.0, 1.0, 0.0), 11)
                .expect("Cannot add vertex");
            assert_eq!(sink.num_indexed(), 6);
            // Grid facets wind clockwise, so the new facet does too.
            assert_eq!(
                sink.add_face([1, 3, 12, 10], 5),
                Err(Error::Construction(ConstructionError::UnindexedVertexId {
                    id: 12,
                    facet: 5
                }))
            );
            sink.add_face([1, 3, 11, 10], 5).expect("Cannot add face");
        }
        builder.end_surface().expect("Cannot end surface");
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_faces(), 2);
        let v = mesh.find_vertex(3).expect("Cannot find vertex");
        assert_eq!(mesh.point(v), DVec3::new(1.0, 1.0, 0.0));
        mesh.check_topology().expect("Topology is broken");
    }
}
