use std::collections::{HashMap, HashSet};

use glam::DVec3;
use tracing::debug;

use crate::{
    element::{EH, FH, HH, Handle, VH},
    error::{ConstructionError, LogicError},
    iterator,
    topol::{TopolCache, Topology},
};

/// A halfedge mesh whose vertices and faces carry external ids.
///
/// The ids are assigned by whoever builds the mesh and need not be dense,
/// contiguous or zero based. They are unique within a mesh. The mesh can only
/// be modified through a [`crate::MeshBuilder`].
pub struct QuadMesh {
    pub(crate) topol: Topology,
    cache: TopolCache,
    points: Vec<DVec3>,
    vertex_ids: Vec<usize>,
    face_ids: Vec<usize>,
    vertex_lookup: HashMap<usize, VH>,
    face_lookup: HashMap<usize, FH>,
}

/// Statistics about the mesh, as produced by [`QuadMesh::summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshSummary {
    pub num_vertices: usize,
    pub num_edges: usize,
    pub num_faces: usize,
    pub border_halfedges: usize,
    pub interior_halfedges: usize,
    /// Whether every face has exactly 4 corners.
    pub all_quads: bool,
    /// Ids of faces with at least one border edge, in storage order.
    pub border_faces: Vec<usize>,
    /// Whether [`QuadMesh::check_topology`] passed.
    pub valid: bool,
}

impl Default for QuadMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for QuadMesh {
    fn clone(&self) -> Self {
        QuadMesh {
            topol: self.topol.clone(),
            cache: TopolCache::default(),
            points: self.points.clone(),
            vertex_ids: self.vertex_ids.clone(),
            face_ids: self.face_ids.clone(),
            vertex_lookup: self.vertex_lookup.clone(),
            face_lookup: self.face_lookup.clone(),
        }
    }
}

impl QuadMesh {
    pub fn new() -> Self {
        QuadMesh {
            topol: Topology::new(),
            cache: TopolCache::default(),
            points: Vec::new(),
            vertex_ids: Vec::new(),
            face_ids: Vec::new(),
            vertex_lookup: HashMap::new(),
            face_lookup: HashMap::new(),
        }
    }

    pub(crate) fn reserve(&mut self, nverts: usize, nedges: usize, nfaces: usize) {
        self.topol.reserve(nverts, nedges, nfaces);
        self.points.reserve(nverts);
        self.vertex_ids.reserve(nverts);
        self.vertex_lookup.reserve(nverts);
        self.face_ids.reserve(nfaces);
        self.face_lookup.reserve(nfaces);
    }

    /// Number of vertices, including deleted vertices that are not yet
    /// garbage collected.
    pub fn num_vertices(&self) -> usize {
        self.topol.num_vertices()
    }

    pub fn num_edges(&self) -> usize {
        self.topol.num_edges()
    }

    pub fn num_halfedges(&self) -> usize {
        self.topol.num_halfedges()
    }

    pub fn num_faces(&self) -> usize {
        self.topol.num_faces()
    }

    pub fn num_border_halfedges(&self) -> usize {
        self.halfedges()
            .filter(|h| h.is_boundary(self))
            .count()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> + use<'_> {
        self.topol.vertices()
    }

    pub fn halfedges(&self) -> impl Iterator<Item = HH> + use<'_> {
        self.topol.halfedges()
    }

    pub fn edges(&self) -> impl Iterator<Item = EH> + use<'_> {
        self.topol.edges()
    }

    /// Live faces in storage order.
    pub fn faces(&self) -> impl Iterator<Item = FH> + use<'_> {
        self.topol.faces()
    }

    pub fn is_boundary_halfedge(&self, h: HH) -> bool {
        self.topol.is_boundary_halfedge(h)
    }

    pub fn is_boundary_edge(&self, e: EH) -> bool {
        self.topol.is_boundary_edge(e)
    }

    pub fn opposite_halfedge(&self, h: HH) -> HH {
        self.topol.opposite_halfedge(h)
    }

    pub fn halfedge_face(&self, h: HH) -> Option<FH> {
        self.topol.halfedge_face(h)
    }

    pub fn face_halfedge(&self, f: FH) -> HH {
        self.topol.face_halfedge(f)
    }

    pub fn from_vertex(&self, h: HH) -> VH {
        self.topol.from_vertex(h)
    }

    pub fn to_vertex(&self, h: HH) -> VH {
        self.topol.to_vertex(h)
    }

    pub fn vertex_valence(&self, v: VH) -> usize {
        self.topol.vertex_valence(v)
    }

    pub fn face_valence(&self, f: FH) -> usize {
        self.topol.face_valence(f)
    }

    pub fn point(&self, v: VH) -> DVec3 {
        self.points[v.index() as usize]
    }

    pub fn vertex_id(&self, v: VH) -> usize {
        self.vertex_ids[v.index() as usize]
    }

    pub fn face_id(&self, f: FH) -> usize {
        self.face_ids[f.index() as usize]
    }

    pub fn find_vertex(&self, id: usize) -> Option<VH> {
        self.vertex_lookup.get(&id).copied()
    }

    pub fn find_face(&self, id: usize) -> Option<FH> {
        self.face_lookup.get(&id).copied()
    }

    /// The mean of the positions of the corners of the face.
    pub fn face_centroid(&self, f: FH) -> DVec3 {
        let (sum, count) = self
            .fv_ccw_iter(f)
            .fold((DVec3::ZERO, 0usize), |(sum, count), v| {
                (sum + self.point(v), count + 1)
            });
        sum / count as f64
    }

    pub fn voh_ccw_iter(&self, v: VH) -> impl Iterator<Item = HH> + use<'_> {
        iterator::voh_ccw_iter(&self.topol, v)
    }

    pub fn fh_ccw_iter(&self, f: FH) -> impl Iterator<Item = HH> + use<'_> {
        iterator::fh_ccw_iter(&self.topol, f)
    }

    pub fn fv_ccw_iter(&self, f: FH) -> impl Iterator<Item = VH> + use<'_> {
        iterator::fv_ccw_iter(&self.topol, f)
    }

    pub fn ff_ccw_iter(&self, f: FH) -> impl Iterator<Item = FH> + use<'_> {
        iterator::ff_ccw_iter(&self.topol, f)
    }

    /// Check the topology of the mesh.
    ///
    /// This function will return an error if any errors are found in the topolgy.
    pub fn check_topology(&self) -> Result<(), LogicError> {
        self.topol.check()
    }

    /// Check that no two live faces share an id.
    pub fn check_face_ids(&self) -> Result<(), LogicError> {
        let mut seen = HashSet::with_capacity(self.num_faces());
        for f in self.faces() {
            let id = self.face_id(f);
            if !seen.insert(id) {
                return Err(LogicError::DuplicateFacetId(id));
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> MeshSummary {
        let border_halfedges = self.num_border_halfedges();
        let summary = MeshSummary {
            num_vertices: self.vertices().count(),
            num_edges: self.edges().count(),
            num_faces: self.faces().count(),
            border_halfedges,
            interior_halfedges: self.halfedges().count() - border_halfedges,
            all_quads: self.faces().all(|f| f.valence(self) == 4),
            border_faces: self
                .faces()
                .filter(|f| {
                    self.fh_ccw_iter(*f)
                        .any(|h| h.opposite().is_boundary(self))
                })
                .map(|f| self.face_id(f))
                .collect(),
            valid: self.check_topology().is_ok() && self.check_face_ids().is_ok(),
        };
        debug!(
            vertices = summary.num_vertices,
            faces = summary.num_faces,
            border = summary.border_halfedges,
            interior = summary.interior_halfedges,
            all_quads = summary.all_quads,
            valid = summary.valid,
            "Mesh summary"
        );
        summary
    }

    pub(crate) fn add_vertex(&mut self, pos: DVec3, id: usize) -> Result<VH, ConstructionError> {
        if self.vertex_lookup.contains_key(&id) {
            return Err(ConstructionError::DuplicateVertexId(id));
        }
        let v = self.topol.add_vertex();
        self.points.push(pos);
        self.vertex_ids.push(id);
        self.vertex_lookup.insert(id, v);
        Ok(v)
    }

    pub(crate) fn add_face(&mut self, verts: &[VH], id: usize) -> Result<FH, ConstructionError> {
        if verts.len() < 3 {
            return Err(ConstructionError::DegenerateFacet {
                id,
                corners: verts.len(),
            });
        }
        if self.face_lookup.contains_key(&id) {
            return Err(ConstructionError::DuplicateFacetId(id));
        }
        if let Some(vertex) = verts
            .iter()
            .enumerate()
            .find_map(|(i, v)| verts[..i].contains(v).then_some(*v))
        {
            return Err(ConstructionError::RepeatedCorner { id, vertex });
        }
        let f = self.topol.add_face(verts, &mut self.cache)?;
        self.face_ids.push(id);
        self.face_lookup.insert(id, f);
        Ok(f)
    }

    /// Delete a face. The ids of the face and of any vertex left without
    /// incident edges are released.
    pub(crate) fn delete_face(&mut self, f: FH) {
        let corners: Vec<VH> = self.fv_ccw_iter(f).collect();
        self.topol.delete_face(f, &mut self.cache);
        self.face_lookup.remove(&self.face_ids[f.index() as usize]);
        for v in corners {
            if self.topol.is_deleted_vertex(v) {
                self.vertex_lookup.remove(&self.vertex_ids[v.index() as usize]);
            }
        }
    }

    pub(crate) fn has_deleted_elements(&self) -> bool {
        self.topol.has_deleted_elements()
    }

    /// Compact storage after deleting faces. Handles to vertices and faces
    /// are invalidated.
    pub(crate) fn garbage_collection(&mut self) {
        fn compact<T: Copy>(values: &[T], remap: &[Option<u32>]) -> Vec<T> {
            values
                .iter()
                .zip(remap.iter())
                .filter_map(|(v, m)| m.map(|_| *v))
                .collect()
        }
        let remap = self.topol.garbage_collection();
        self.points = compact(&self.points, &remap.vertices);
        self.vertex_ids = compact(&self.vertex_ids, &remap.vertices);
        self.face_ids = compact(&self.face_ids, &remap.faces);
        self.vertex_lookup = self
            .vertex_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, VH::from(i as u32)))
            .collect();
        self.face_lookup = self
            .face_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, FH::from(i as u32)))
            .collect();
        debug!(
            vertices = self.num_vertices(),
            faces = self.num_faces(),
            "Garbage collected mesh"
        );
    }
}
