use crate::{
    element::{FH, HH, VH},
    topol::Topology,
};

struct OutgoingHalfedgeIter<'a, const CCW: bool> {
    topol: &'a Topology,
    hstart: Option<HH>,
    hcurrent: Option<HH>,
}

impl Iterator for OutgoingHalfedgeIter<'_, true> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        match self.hcurrent {
            Some(current) => {
                let next = self.topol.prev_halfedge(current).opposite();
                self.hcurrent = match self.hstart {
                    Some(start) if start != next => Some(next),
                    _ => None,
                };
                Some(current)
            }
            None => None,
        }
    }
}

impl Iterator for OutgoingHalfedgeIter<'_, false> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        match self.hcurrent {
            Some(current) => {
                let next = self.topol.next_halfedge(current.opposite());
                self.hcurrent = match self.hstart {
                    Some(start) if start != next => Some(next),
                    _ => None,
                };
                Some(current)
            }
            None => None,
        }
    }
}

/// Walks a loop of halfedges by following `next` until it comes back to the
/// first halfedge.
struct LoopHalfedgeIter<'a> {
    topol: &'a Topology,
    hstart: HH,
    hcurrent: Option<HH>,
}

impl Iterator for LoopHalfedgeIter<'_> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        match self.hcurrent {
            Some(current) => {
                let next = self.topol.next_halfedge(current);
                self.hcurrent = if next == self.hstart {
                    None
                } else {
                    Some(next)
                };
                Some(current)
            }
            None => None,
        }
    }
}

pub(crate) fn voh_ccw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = HH> + use<'_> {
    let h = topol.vertex_halfedge(v);
    OutgoingHalfedgeIter::<true> {
        topol,
        hstart: h,
        hcurrent: h,
    }
}

pub(crate) fn voh_cw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = HH> + use<'_> {
    let h = topol.vertex_halfedge(v);
    OutgoingHalfedgeIter::<false> {
        topol,
        hstart: h,
        hcurrent: h,
    }
}

pub(crate) fn vih_ccw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = HH> + use<'_> {
    voh_ccw_iter(topol, v).map(|h| h.opposite())
}

pub(crate) fn loop_ccw_iter(topol: &Topology, h: HH) -> impl Iterator<Item = HH> + use<'_> {
    LoopHalfedgeIter {
        topol,
        hstart: h,
        hcurrent: Some(h),
    }
}

/// The ring of a face, starting at the halfedge stored on the face.
pub(crate) fn fh_ccw_iter(topol: &Topology, f: FH) -> impl Iterator<Item = HH> + use<'_> {
    loop_ccw_iter(topol, topol.face_halfedge(f))
}

pub(crate) fn fv_ccw_iter(topol: &Topology, f: FH) -> impl Iterator<Item = VH> + use<'_> {
    fh_ccw_iter(topol, f).map(|h| topol.to_vertex(h))
}

/// Faces across the non-border edges of a face.
pub(crate) fn ff_ccw_iter(topol: &Topology, f: FH) -> impl Iterator<Item = FH> + use<'_> {
    fh_ccw_iter(topol, f).filter_map(|h| topol.halfedge_face(h.opposite()))
}

#[cfg(test)]
mod test {
    use crate::{
        element::Handle,
        iterator::{ff_ccw_iter, fh_ccw_iter, fv_ccw_iter, vih_ccw_iter, voh_ccw_iter, voh_cw_iter},
        topol::test::quad_grid,
    };

    #[test]
    fn t_grid_voh_iter() {
        let grid = quad_grid();
        for v in grid.vertices() {
            assert!(
                voh_ccw_iter(&grid, v)
                    .all(|h| grid.from_vertex(h) == v && grid.to_vertex(h) != v)
            );
            assert!(
                voh_cw_iter(&grid, v).all(|h| grid.from_vertex(h) == v && grid.to_vertex(h) != v)
            );
            assert_eq!(
                voh_ccw_iter(&grid, v).count(),
                voh_cw_iter(&grid, v).count()
            );
        }
    }

    #[test]
    fn t_grid_vih_iter() {
        let grid = quad_grid();
        for v in grid.vertices() {
            assert!(
                vih_ccw_iter(&grid, v)
                    .all(|h| grid.to_vertex(h) == v && grid.from_vertex(h) != v)
            );
        }
    }

    #[test]
    fn t_grid_fv_ccw_iter() {
        let grid = quad_grid();
        // Face rings start at the halfedge closing the loop, which points to
        // the first vertex.
        for (fi, vis) in [
            (0u32, [0u32, 1, 5, 4]),
            (1u32, [1u32, 2, 6, 5]),
            (4u32, [5u32, 6, 10, 9]),
            (5u32, [6u32, 7, 11, 10]),
        ] {
            let ring = fv_ccw_iter(&grid, fi.into())
                .map(|v| v.index())
                .collect::<Vec<_>>();
            assert_eq!(ring, vis);
        }
    }

    #[test]
    fn t_grid_ff_ccw_iter() {
        let grid = quad_grid();
        for (fi, mut fis) in [
            (0u32, vec![1u32, 3]),
            (1u32, vec![0u32, 2, 4]),
            (4u32, vec![1u32, 3, 5]),
            (5u32, vec![2u32, 4]),
        ] {
            let mut found = ff_ccw_iter(&grid, fi.into())
                .map(|f| f.index())
                .collect::<Vec<_>>();
            found.sort();
            fis.sort();
            assert_eq!(found, fis);
        }
    }

    #[test]
    fn t_ring_is_stable() {
        let grid = quad_grid();
        for f in grid.faces() {
            let a = fh_ccw_iter(&grid, f).collect::<Vec<_>>();
            let b = fh_ccw_iter(&grid, f).collect::<Vec<_>>();
            assert_eq!(a, b);
            assert!(a.iter().all(|h| grid.halfedge_face(*h) == Some(f)));
        }
    }
}
