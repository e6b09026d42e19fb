use crate::{
    element::{EH, Edge, FH, Face, HH, Halfedge, Handle, VH, Vertex},
    error::ConstructionError,
    iterator,
    status::Status,
};

enum TentativeEdge {
    Old(HH),
    New {
        index: u32,
        from: VH,
        to: VH,
        prev: Option<HH>,
        next: Option<HH>,
        opp_prev: Option<HH>,
        opp_next: Option<HH>,
    },
}

/// Scratch buffers reused across calls to [`Topology::add_face`] and
/// [`Topology::delete_face`].
#[derive(Default)]
pub struct TopolCache {
    loop_halfedges: Vec<Option<HH>>,
    needs_adjust: Vec<bool>,
    next_cache: Vec<(HH, HH)>,
    tentative: Vec<TentativeEdge>,
    halfedges: Vec<HH>,
    edges: Vec<EH>,
    vertices: Vec<VH>,
}

impl TopolCache {
    fn clear(&mut self) {
        self.loop_halfedges.clear();
        self.needs_adjust.clear();
        self.next_cache.clear();
        self.tentative.clear();
        self.halfedges.clear();
        self.edges.clear();
        self.vertices.clear();
    }
}

/// Mapping from old to new indices produced by garbage collection. `None`
/// means the element was deleted.
pub struct IndexRemap {
    pub(crate) vertices: Vec<Option<u32>>,
    pub(crate) faces: Vec<Option<u32>>,
}

#[derive(Clone, Default)]
pub struct Topology {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
    vstatus: Vec<Status>,
    estatus: Vec<Status>,
    fstatus: Vec<Status>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&mut self, nverts: usize, nedges: usize, nfaces: usize) {
        self.vertices.reserve(nverts);
        self.vstatus.reserve(nverts);
        self.edges.reserve(nedges);
        self.estatus.reserve(nedges);
        self.faces.reserve(nfaces);
        self.fstatus.reserve(nfaces);
    }

    pub(crate) fn halfedge(&self, h: HH) -> &Halfedge {
        &self.edges[(h.index() >> 1) as usize].halfedges[(h.index() & 1) as usize]
    }

    fn halfedge_mut(&mut self, h: HH) -> &mut Halfedge {
        &mut self.edges[(h.index() >> 1) as usize].halfedges[(h.index() & 1) as usize]
    }

    pub fn vertex_halfedge(&self, v: VH) -> Option<HH> {
        self.vertices[v.index() as usize].halfedge
    }

    pub fn to_vertex(&self, h: HH) -> VH {
        self.halfedge(h).vertex
    }

    pub fn from_vertex(&self, h: HH) -> VH {
        self.halfedge(h.opposite()).vertex
    }

    pub fn prev_halfedge(&self, h: HH) -> HH {
        self.halfedge(h).prev
    }

    pub fn next_halfedge(&self, h: HH) -> HH {
        self.halfedge(h).next
    }

    pub fn halfedge_face(&self, h: HH) -> Option<FH> {
        self.halfedge(h).face
    }

    pub fn face_halfedge(&self, f: FH) -> HH {
        self.faces[f.index() as usize].halfedge
    }

    pub fn opposite_halfedge(&self, h: HH) -> HH {
        h.opposite()
    }

    pub fn is_boundary_halfedge(&self, h: HH) -> bool {
        self.halfedge(h).face.is_none()
    }

    pub fn is_boundary_edge(&self, e: EH) -> bool {
        let (h, oh) = e.halfedges();
        self.is_boundary_halfedge(h) || self.is_boundary_halfedge(oh)
    }

    pub fn is_boundary_vertex(&self, v: VH) -> bool {
        match self.vertices[v.index() as usize].halfedge {
            Some(h) => self.is_boundary_halfedge(h),
            None => true,
        }
    }

    pub fn is_deleted_vertex(&self, v: VH) -> bool {
        self.vstatus[v.index() as usize].deleted()
    }

    pub fn is_deleted_edge(&self, e: EH) -> bool {
        self.estatus[e.index() as usize].deleted()
    }

    pub fn is_deleted_face(&self, f: FH) -> bool {
        self.fstatus[f.index() as usize].deleted()
    }

    pub fn has_deleted_elements(&self) -> bool {
        self.vstatus
            .iter()
            .chain(self.estatus.iter())
            .chain(self.fstatus.iter())
            .any(|s| s.deleted())
    }

    /// Number of vertex slots, including deleted vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edge slots, including deleted edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_halfedges(&self) -> usize {
        self.num_edges() * 2
    }

    /// Number of face slots, including deleted faces.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> + use<'_> {
        (0..(self.num_vertices() as u32))
            .map(|i| i.into())
            .filter(|v| !self.is_deleted_vertex(*v))
    }

    pub fn edges(&self) -> impl Iterator<Item = EH> + use<'_> {
        (0..(self.num_edges() as u32))
            .map(|i| i.into())
            .filter(|e| !self.is_deleted_edge(*e))
    }

    pub fn halfedges(&self) -> impl Iterator<Item = HH> + use<'_> {
        self.edges().flat_map(|e| {
            let (h, oh) = e.halfedges();
            [h, oh]
        })
    }

    pub fn faces(&self) -> impl Iterator<Item = FH> + use<'_> {
        (0..(self.num_faces() as u32))
            .map(|i| i.into())
            .filter(|f| !self.is_deleted_face(*f))
    }

    pub fn find_halfedge(&self, from: VH, to: VH) -> Option<HH> {
        iterator::voh_ccw_iter(self, from).find(|h| self.to_vertex(*h) == to)
    }

    fn adjust_outgoing_halfedge(&mut self, v: VH) {
        let h = iterator::voh_ccw_iter(self, v).find(|h| self.is_boundary_halfedge(*h));
        if let Some(h) = h {
            self.set_vertex_halfedge(v, h)
        }
    }

    pub fn add_vertex(&mut self) -> VH {
        let vi = self.vertices.len() as u32;
        self.vertices.push(Vertex { halfedge: None });
        self.vstatus.push(Status::default());
        vi.into()
    }

    fn new_edge(
        &mut self,
        from: VH,
        to: VH,
        prev: HH,
        next: HH,
        opp_prev: HH,
        opp_next: HH,
    ) -> u32 {
        let ei = self.edges.len() as u32;
        self.edges.push(Edge {
            halfedges: [
                Halfedge {
                    face: None,
                    vertex: to,
                    next,
                    prev,
                },
                Halfedge {
                    face: None,
                    vertex: from,
                    next: opp_next,
                    prev: opp_prev,
                },
            ],
        });
        self.estatus.push(Status::default());
        ei
    }

    fn new_face(&mut self, halfedge: HH) -> FH {
        let fi = self.faces.len() as u32;
        self.faces.push(Face { halfedge });
        self.fstatus.push(Status::default());
        fi.into()
    }

    pub fn set_vertex_halfedge(&mut self, v: VH, h: HH) {
        self.vertices[v.index() as usize].halfedge = Some(h);
    }

    pub fn set_next_halfedge(&mut self, hprev: HH, hnext: HH) {
        self.halfedge_mut(hprev).next = hnext;
        self.halfedge_mut(hnext).prev = hprev;
    }

    /// Add a face with the given loop of vertices.
    ///
    /// The vertices must be on the boundary, and the edges between
    /// consecutive vertices must either not exist yet or be border
    /// halfedges. Faces may be added in any order: when the new face joins
    /// two existing boundary fans at a vertex, the boundary loops around that
    /// vertex are relinked.
    pub fn add_face(&mut self, verts: &[VH], cache: &mut TopolCache) -> Result<FH, ConstructionError> {
        cache.clear();
        cache.loop_halfedges.reserve(verts.len());
        cache.needs_adjust.reserve(verts.len());
        cache.next_cache.reserve(verts.len() * 6);
        // Check for topological errors.
        for i in 0..verts.len() {
            if !self.is_boundary_vertex(verts[i]) {
                // Ensure vertex is manifold.
                return Err(ConstructionError::ComplexVertex(verts[i]));
            }
            // Ensure edge is manifold.
            let h = self.find_halfedge(verts[i], verts[(i + 1) % verts.len()]);
            match h {
                Some(h) if !self.is_boundary_halfedge(h) => {
                    return Err(ConstructionError::ComplexHalfedge(h));
                }
                _ => {} // Do nothing.
            }
            cache.loop_halfedges.push(h);
            cache.needs_adjust.push(false);
        }
        // If any vertex has more than two incident boundary edges, relinking might be necessary.
        for (prev, next) in (0..verts.len()).filter_map(|i| {
            match (
                cache.loop_halfedges[i],
                cache.loop_halfedges[(i + 1) % verts.len()],
            ) {
                (Some(prev), Some(next)) if self.next_halfedge(prev) != next => Some((prev, next)),
                _ => None,
            }
        }) {
            // Relink the patch.
            let boundprev = {
                let mut out = next.opposite();
                loop {
                    out = self.next_halfedge(out).opposite();
                    if self.is_boundary_halfedge(out) {
                        break;
                    }
                }
                out
            };
            let boundnext = self.next_halfedge(boundprev);
            if boundprev == prev {
                return Err(ConstructionError::PatchRelinkingFailed);
            }
            debug_assert!(
                self.is_boundary_halfedge(boundprev) && self.is_boundary_halfedge(boundnext)
            );
            let pstart = self.next_halfedge(prev);
            let pend = self.prev_halfedge(next);
            cache.next_cache.extend_from_slice(&[
                (boundprev, pstart),
                (pend, boundnext),
                (prev, next),
            ]);
        }
        // Create boundary loop.
        cache.tentative.reserve(verts.len());
        {
            let mut ei = self.edges.len() as u32;
            cache
                .tentative
                .extend((0..verts.len()).map(|i| match cache.loop_halfedges[i] {
                    Some(h) => TentativeEdge::Old(h),
                    None => TentativeEdge::New {
                        index: {
                            let current = ei;
                            ei += 1;
                            current << 1
                        },
                        from: verts[i],
                        to: verts[(i + 1) % verts.len()],
                        prev: None,
                        next: None,
                        opp_prev: None,
                        opp_next: None,
                    },
                }));
        }
        for (i, j) in (0..verts.len()).map(|i| (i, (i + 1) % verts.len())) {
            let (e0, e1) = if j == 0 {
                let (right, left) = cache.tentative.split_at_mut(i);
                (&mut left[0], &mut right[0])
            } else {
                let (left, right) = cache.tentative.split_at_mut(j);
                (&mut left[left.len() - 1], &mut right[0])
            };
            let v = verts[j];
            match (e0, e1) {
                (TentativeEdge::Old(_), TentativeEdge::Old(innernext)) => {
                    cache.needs_adjust[j] = self.vertex_halfedge(v) == Some(*innernext);
                }
                (
                    TentativeEdge::New {
                        index: innerprev,
                        opp_prev,
                        next,
                        ..
                    },
                    TentativeEdge::Old(innernext),
                ) => {
                    let innernext = *innernext;
                    let innerprev: HH = (*innerprev).into();
                    let outernext = innerprev.opposite();
                    let boundprev = self.prev_halfedge(innernext);
                    cache.next_cache.push((boundprev, outernext));
                    *opp_prev = Some(boundprev);
                    cache.next_cache.push((innerprev, innernext));
                    *next = Some(innernext);
                    self.set_vertex_halfedge(v, outernext);
                }
                (
                    TentativeEdge::Old(innerprev),
                    TentativeEdge::New {
                        index: innernext,
                        prev,
                        opp_next,
                        ..
                    },
                ) => {
                    let innerprev = *innerprev;
                    let innernext: HH = (*innernext).into();
                    let outerprev = innernext.opposite();
                    let boundnext = self.next_halfedge(innerprev);
                    cache.next_cache.push((outerprev, boundnext));
                    *opp_next = Some(boundnext);
                    cache.next_cache.push((innerprev, innernext));
                    *prev = Some(innerprev);
                    self.set_vertex_halfedge(v, boundnext);
                }
                (
                    TentativeEdge::New {
                        index: innerprev,
                        next,
                        opp_prev,
                        ..
                    },
                    TentativeEdge::New {
                        index: innernext,
                        prev,
                        opp_next,
                        ..
                    },
                ) => {
                    let innerprev: HH = (*innerprev).into();
                    let innernext: HH = (*innernext).into();
                    let outernext = innerprev.opposite();
                    let outerprev = innernext.opposite();
                    if let Some(boundnext) = self.vertex_halfedge(v) {
                        let boundprev = self.prev_halfedge(boundnext);
                        cache
                            .next_cache
                            .extend(&[(boundprev, outernext), (outerprev, boundnext)]);
                        *next = Some(innernext);
                        *opp_prev = Some(boundprev);
                        *prev = Some(innerprev);
                        *opp_next = Some(boundnext);
                    } else {
                        self.set_vertex_halfedge(v, outernext);
                        *next = Some(innernext);
                        *opp_prev = Some(outerprev);
                        *prev = Some(innerprev);
                        *opp_next = Some(outernext);
                    }
                }
            };
        }
        // Convert tentative edges into real edges.
        cache.halfedges.reserve(cache.tentative.len());
        for tedge in &cache.tentative {
            let h = match tedge {
                TentativeEdge::Old(h) => *h,
                TentativeEdge::New {
                    index,
                    from,
                    to,
                    prev,
                    next,
                    opp_prev,
                    opp_next,
                } => {
                    let (prev, next, opp_prev, opp_next) = match (prev, next, opp_prev, opp_next) {
                        (Some(p), Some(n), Some(op), Some(on)) => (*p, *n, *op, *on),
                        _ => return Err(ConstructionError::PatchRelinkingFailed),
                    };
                    let ei = self.new_edge(*from, *to, prev, next, opp_prev, opp_next);
                    debug_assert_eq!(*index >> 1, ei, "Failed to create an edge loop");
                    (*index).into()
                }
            };
            cache.halfedges.push(h);
        }
        // Create the face.
        let fnew = match cache.halfedges.last() {
            Some(h) => self.new_face(*h),
            None => return Err(ConstructionError::PatchRelinkingFailed),
        };
        for h in &cache.halfedges {
            self.halfedge_mut(*h).face = Some(fnew);
        }
        for (prev, next) in cache.next_cache.drain(..) {
            self.set_next_halfedge(prev, next);
        }
        // Adjust vertices' halfedge handles.
        for i in 0..verts.len() {
            if cache.needs_adjust[i] {
                self.adjust_outgoing_halfedge(verts[i]);
            }
        }
        Ok(fnew)
    }

    /// Delete a face.
    ///
    /// The halfedges of the face become border halfedges. Edges whose both
    /// halfedges are border halfedges after this are deleted, and so are the
    /// vertices left without any incident edge. Deleted elements stay in
    /// storage until [`Topology::garbage_collection`].
    pub fn delete_face(&mut self, f: FH, cache: &mut TopolCache) {
        cache.clear();
        cache.halfedges.extend(iterator::fh_ccw_iter(self, f));
        for h in cache.halfedges.drain(..) {
            self.halfedge_mut(h).face = None;
            if self.is_boundary_halfedge(h.opposite()) {
                cache.edges.push(h.edge());
            }
            cache.vertices.push(self.to_vertex(h));
        }
        for e in cache.edges.drain(..) {
            let (h0, h1) = e.halfedges();
            let (v0, next0, prev0) = (
                self.to_vertex(h0),
                self.next_halfedge(h0),
                self.prev_halfedge(h0),
            );
            let (v1, next1, prev1) = (
                self.to_vertex(h1),
                self.next_halfedge(h1),
                self.prev_halfedge(h1),
            );
            self.set_next_halfedge(prev0, next1);
            self.set_next_halfedge(prev1, next0);
            self.estatus[e.index() as usize].set_deleted(true);
            if self.vertex_halfedge(v0) == Some(h1) {
                if next0 == h1 {
                    self.vertices[v0.index() as usize].halfedge = None;
                    self.vstatus[v0.index() as usize].set_deleted(true);
                } else {
                    self.set_vertex_halfedge(v0, next0);
                }
            }
            if self.vertex_halfedge(v1) == Some(h0) {
                if next1 == h0 {
                    self.vertices[v1.index() as usize].halfedge = None;
                    self.vstatus[v1.index() as usize].set_deleted(true);
                } else {
                    self.set_vertex_halfedge(v1, next1);
                }
            }
        }
        for v in cache.vertices.drain(..) {
            if !self.is_deleted_vertex(v) {
                self.adjust_outgoing_halfedge(v);
            }
        }
        self.fstatus[f.index() as usize].set_deleted(true);
    }

    /// Remove deleted elements from storage and compact the indices of the
    /// remaining elements. Returns the old to new index mapping of vertices
    /// and faces so that per-element data can be compacted alongside.
    pub fn garbage_collection(&mut self) -> IndexRemap {
        fn remap(status: &[Status]) -> Vec<Option<u32>> {
            let mut next = 0u32;
            status
                .iter()
                .map(|s| {
                    if s.deleted() {
                        None
                    } else {
                        let i = next;
                        next += 1;
                        Some(i)
                    }
                })
                .collect()
        }
        let vmap = remap(&self.vstatus);
        let emap = remap(&self.estatus);
        let fmap = remap(&self.fstatus);
        // Live elements never refer to deleted ones, so the fallbacks below
        // only guard against inconsistent input.
        let map_h = |h: HH| -> HH {
            match emap[(h.index() >> 1) as usize] {
                Some(e) => ((e << 1) | (h.index() & 1)).into(),
                None => h,
            }
        };
        let map_v = |v: VH| -> VH { vmap[v.index() as usize].map_or(v, VH::from) };
        let map_f = |f: FH| -> FH { fmap[f.index() as usize].map_or(f, FH::from) };
        let mut vertices = Vec::with_capacity(self.vertices.len());
        for (v, _) in self
            .vertices
            .iter()
            .zip(vmap.iter())
            .filter(|(_, m)| m.is_some())
        {
            vertices.push(Vertex {
                halfedge: v.halfedge.map(map_h),
            });
        }
        let mut edges = Vec::with_capacity(self.edges.len());
        for (e, _) in self.edges.iter().zip(emap.iter()).filter(|(_, m)| m.is_some()) {
            edges.push(Edge {
                halfedges: e.halfedges.map(|h| Halfedge {
                    face: h.face.map(map_f),
                    vertex: map_v(h.vertex),
                    next: map_h(h.next),
                    prev: map_h(h.prev),
                }),
            });
        }
        let mut faces = Vec::with_capacity(self.faces.len());
        for (f, _) in self.faces.iter().zip(fmap.iter()).filter(|(_, m)| m.is_some()) {
            faces.push(Face {
                halfedge: map_h(f.halfedge),
            });
        }
        self.vstatus = vec![Status::default(); vertices.len()];
        self.estatus = vec![Status::default(); edges.len()];
        self.fstatus = vec![Status::default(); faces.len()];
        self.vertices = vertices;
        self.edges = edges;
        self.faces = faces;
        IndexRemap {
            vertices: vmap,
            faces: fmap,
        }
    }

    pub fn vertex_valence(&self, v: VH) -> usize {
        iterator::voh_ccw_iter(self, v).count()
    }

    pub fn face_valence(&self, f: FH) -> usize {
        iterator::fh_ccw_iter(self, f).count()
    }

    #[cfg(test)]
    pub(crate) fn corrupt_next(&mut self, hprev: HH, hnext: HH) {
        self.halfedge_mut(hprev).next = hnext;
    }

    #[cfg(test)]
    pub(crate) fn corrupt_face(&mut self, h: HH, f: Option<FH>) {
        self.halfedge_mut(h).face = f;
    }
}
