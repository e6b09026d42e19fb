use std::collections::{BTreeSet, HashMap, VecDeque};

use glam::DVec3;
use tracing::{debug, info, trace};

use crate::{
    dset::DisjointSet,
    element::{FH, Handle},
    error::Error,
    mesh::QuadMesh,
};

/// A maximal connected set of equivalent facets.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Id of the root facet of the set this cluster was formed from.
    pub root: usize,
    /// Ids of the member facets, sorted.
    pub members: Vec<usize>,
    /// Mean of the centroids of the member facets.
    pub centroid: DVec3,
    /// Id of the member whose centroid is nearest to the centroid of the
    /// cluster. Ties go to the lowest id.
    pub representative: usize,
    /// Roots of the clusters sharing an edge with this one, sorted.
    pub neighbors: Vec<usize>,
    /// Whether any member has an edge on the border of the mesh.
    pub touches_border: bool,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The clusters of a mesh, in the order of the first facet of each cluster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterReport {
    pub clusters: Vec<Cluster>,
    root_of: HashMap<usize, usize>,
    index_of: HashMap<usize, usize>,
}

impl ClusterReport {
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    /// Root of the cluster the facet with the given id belongs to.
    pub fn root_of(&self, facet: usize) -> Option<usize> {
        self.root_of.get(&facet).copied()
    }

    pub fn cluster_of(&self, facet: usize) -> Option<&Cluster> {
        let root = self.root_of(facet)?;
        self.index_of.get(&root).map(|i| &self.clusters[*i])
    }

    /// The sets of member ids, independent of which facets are the roots.
    pub fn partition(&self) -> BTreeSet<Vec<usize>> {
        self.clusters.iter().map(|c| c.members.clone()).collect()
    }
}

/// Class of each facet, keyed by facet id. Two facets are equivalent when
/// both have a class and the classes are equal.
#[derive(Debug, Clone)]
pub struct ClassMap<T> {
    classes: HashMap<usize, T>,
}

impl<T> Default for ClassMap<T> {
    fn default() -> Self {
        ClassMap {
            classes: HashMap::new(),
        }
    }
}

impl<T: PartialEq> ClassMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, facet: usize, class: T) -> Option<T> {
        self.classes.insert(facet, class)
    }

    pub fn get(&self, facet: usize) -> Option<&T> {
        self.classes.get(&facet)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn equivalent(&self, a: usize, b: usize) -> bool {
        matches!((self.get(a), self.get(b)), (Some(ca), Some(cb)) if ca == cb)
    }
}

impl<T> FromIterator<(usize, T)> for ClassMap<T> {
    fn from_iter<I: IntoIterator<Item = (usize, T)>>(iter: I) -> Self {
        ClassMap {
            classes: iter.into_iter().collect(),
        }
    }
}

/// Root of the facet's set, after the sets have been compressed.
fn root(dset: &DisjointSet, mesh: &QuadMesh, f: FH) -> usize {
    let id = mesh.face_id(f);
    dset.parent(id).unwrap_or(id)
}

/// Union the sets of equivalent adjacent facets. Every adjacency is seen from
/// both of its facets.
fn union_equivalent<F>(mesh: &QuadMesh, dset: &mut DisjointSet, mut equivalent: F)
where
    F: FnMut(usize, usize) -> bool,
{
    for f in mesh.faces() {
        let fid = mesh.face_id(f);
        dset.make_set(fid);
        for g in mesh.ff_ccw_iter(f) {
            let gid = mesh.face_id(g);
            dset.make_set(gid);
            if equivalent(fid, gid) {
                dset.union_set(fid, gid);
            }
        }
    }
}

/// Collect the cluster grown from `seed`, marking its members as visited.
fn collect_cluster(
    mesh: &QuadMesh,
    dset: &DisjointSet,
    seed: FH,
    visited: &mut [bool],
    queue: &mut VecDeque<FH>,
) -> Cluster {
    let croot = root(dset, mesh, seed);
    let mut members: Vec<(usize, DVec3)> = Vec::new();
    let mut neighbors = BTreeSet::new();
    let mut touches_border = false;
    visited[seed.index() as usize] = true;
    queue.clear();
    queue.push_back(seed);
    while let Some(f) = queue.pop_front() {
        members.push((mesh.face_id(f), mesh.face_centroid(f)));
        for h in mesh.fh_ccw_iter(f) {
            let g = match h.opposite().face(mesh) {
                Some(g) => g,
                None => {
                    touches_border = true;
                    continue;
                }
            };
            let groot = root(dset, mesh, g);
            if groot != croot {
                neighbors.insert(groot);
            } else if !std::mem::replace(&mut visited[g.index() as usize], true) {
                queue.push_back(g);
            }
        }
    }
    let centroid =
        members.iter().fold(DVec3::ZERO, |sum, (_, c)| sum + *c) / members.len() as f64;
    let representative = members
        .iter()
        .map(|(id, c)| (c.distance_squared(centroid), *id))
        .min_by(|(da, ia), (db, ib)| da.total_cmp(db).then(ia.cmp(ib)))
        .map_or(mesh.face_id(seed), |(_, id)| id);
    let mut members: Vec<usize> = members.into_iter().map(|(id, _)| id).collect();
    members.sort_unstable();
    trace!(
        root = croot,
        size = members.len(),
        representative,
        "Collected cluster"
    );
    Cluster {
        root: croot,
        members,
        centroid,
        representative,
        neighbors: neighbors.into_iter().collect(),
        touches_border,
    }
}

/**
 * Partition the facets of `mesh` into clusters.
 *
 * Two adjacent facets are in the same cluster if `equivalent` returns true
 * for their ids. The predicate should be symmetric, but it need not be
 * transitive: clusters are the connected components of the adjacency graph
 * restricted to equivalent pairs. An empty mesh yields an empty report.
 *
 * The mesh topology and the uniqueness of facet ids are checked first, and
 * no report is produced if either check fails.
 */
pub fn cluster<F>(mesh: &QuadMesh, equivalent: F) -> Result<ClusterReport, Error>
where
    F: FnMut(usize, usize) -> bool,
{
    mesh.check_topology()?;
    mesh.check_face_ids()?;
    let nfaces = mesh.faces().count();
    let mut dset = DisjointSet::with_capacity(nfaces);
    union_equivalent(mesh, &mut dset, equivalent);
    dset.compress_sets(mesh.faces().map(|f| mesh.face_id(f)));
    debug!(
        facets = nfaces,
        sets = dset.count_sets(mesh.faces().map(|f| mesh.face_id(f))),
        "Merged equivalent facets"
    );
    let mut visited = vec![false; mesh.num_faces()];
    let mut queue = VecDeque::new();
    let mut report = ClusterReport::default();
    for f in mesh.faces() {
        if visited[f.index() as usize] {
            continue;
        }
        let cluster = collect_cluster(mesh, &dset, f, &mut visited, &mut queue);
        for id in &cluster.members {
            report.root_of.insert(*id, cluster.root);
        }
        report.index_of.insert(cluster.root, report.clusters.len());
        report.clusters.push(cluster);
    }
    info!(
        facets = nfaces,
        clusters = report.len(),
        "Clustered facets"
    );
    Ok(report)
}

/// Cluster the facets of `mesh` by their class. Facets without a class are
/// never equivalent to anything.
pub fn cluster_by_class<T: PartialEq>(
    mesh: &QuadMesh,
    classes: &ClassMap<T>,
) -> Result<ClusterReport, Error> {
    cluster(mesh, |a, b| classes.equivalent(a, b))
}
