use crate::{
    element::{HH, Handle},
    error::LogicError,
    iterator,
    topol::Topology,
};

fn check_vertices(topol: &Topology, hvisited: &mut [bool]) -> Result<(), LogicError> {
    hvisited.fill(false);
    for v in topol.vertices() {
        if let Some(h) = topol.vertex_halfedge(v) {
            if h.index() as usize >= topol.num_halfedges() {
                return Err(LogicError::InvalidOutgoingHalfedges(v));
            }
            if topol.is_deleted_edge(h.edge()) {
                return Err(LogicError::DeletedHalfedge(h));
            }
            // The outgoing halfedge must be a boundary halfedge, or none of the
            // halfedges are boundary.
            if !topol.is_boundary_halfedge(h)
                && iterator::voh_ccw_iter(topol, v).any(|h| topol.is_boundary_halfedge(h))
            {
                return Err(LogicError::InvalidOutgoingHalfedges(v));
            }
            if topol.from_vertex(h) != v {
                return Err(LogicError::InvalidOutgoingHalfedges(v));
            }
        }
        for h in iterator::voh_ccw_iter(topol, v) {
            if std::mem::replace(&mut hvisited[h.index() as usize], true) {
                return Err(LogicError::InvalidOutgoingHalfedges(v));
            }
        }
        for h in iterator::voh_cw_iter(topol, v) {
            if !std::mem::replace(&mut hvisited[h.index() as usize], false) {
                return Err(LogicError::InvalidOutgoingHalfedges(v));
            }
        }
    }
    Ok(())
}

fn check_links(topol: &Topology, h: HH) -> Result<(), LogicError> {
    let hedge = topol.halfedge(h);
    for other in [hedge.prev, hedge.next] {
        if topol.is_deleted_edge(other.edge()) {
            return Err(LogicError::DeletedHalfedge(other));
        }
    }
    if topol.is_deleted_vertex(hedge.vertex) {
        return Err(LogicError::InvalidHalfedgeLink(h));
    }
    if hedge.face.is_some_and(|f| topol.is_deleted_face(f)) {
        return Err(LogicError::InvalidHalfedgeLink(h));
    }
    let head = topol.to_vertex(h);
    let tail = topol.from_vertex(h);
    if topol.next_halfedge(hedge.prev) != h
        || topol.prev_halfedge(hedge.next) != h
        || head != topol.from_vertex(hedge.next)
        || tail != topol.to_vertex(hedge.prev)
    {
        return Err(LogicError::InvalidHalfedgeLink(h));
    }
    Ok(())
}

fn check_edges(topol: &Topology, hflags: &mut [bool]) -> Result<(), LogicError> {
    for h in topol.halfedges() {
        if topol.from_vertex(h) == topol.to_vertex(h) {
            return Err(LogicError::DegenerateHalfedge(h));
        }
        check_links(topol, h)?;
        // Must be found in the circulators around head and tail.
        if !iterator::voh_ccw_iter(topol, topol.from_vertex(h)).any(|hh| hh == h)
            || !iterator::vih_ccw_iter(topol, topol.to_vertex(h)).any(|hh| hh == h)
        {
            return Err(LogicError::InvalidHalfedgeLink(h));
        }
    }
    // Every loop must close, and all its halfedges must share one face.
    // The first pass sets the flags and the second clears them.
    for (set, h) in topol
        .halfedges()
        .map(|h| (true, h))
        .chain(topol.halfedges().map(|h| (false, h)))
    {
        if hflags[h.index() as usize] == set {
            continue;
        }
        let f = topol.halfedge_face(h);
        for h in iterator::loop_ccw_iter(topol, h) {
            if std::mem::replace(&mut hflags[h.index() as usize], set) == set {
                return Err(match f {
                    Some(f) => LogicError::OpenFacetRing(f),
                    None => LogicError::InvalidHalfedgeLink(h),
                });
            }
            if topol.halfedge_face(h) != f {
                return Err(LogicError::InconsistentFaceInLoop(h));
            }
        }
    }
    debug_assert!(hflags.iter().all(|f| !f));
    Ok(())
}

fn check_faces(topol: &Topology) -> Result<(), LogicError> {
    for f in topol.faces() {
        let h = topol.face_halfedge(f);
        if topol.is_deleted_edge(h.edge()) {
            return Err(LogicError::DeletedHalfedge(h));
        }
        if topol.halfedge_face(h) != Some(f) {
            return Err(LogicError::InvalidFaceHalfedgeLink(f, h));
        }
        if topol.face_valence(f) < 3 {
            return Err(LogicError::RingTooShort(f));
        }
    }
    Ok(())
}

impl Topology {
    /// Check the connectivity of every live element.
    ///
    /// Faces are checked last because walking their rings is only safe once
    /// all loops are known to close.
    pub fn check(&self) -> Result<(), LogicError> {
        // To keep track of visited halfedges.
        let mut hvisited = vec![false; self.num_halfedges()].into_boxed_slice();
        check_vertices(self, &mut hvisited)?;
        check_edges(self, &mut hvisited)?;
        check_faces(self)?;
        Ok(())
    }
}
