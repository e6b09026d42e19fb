/*!
Regions of equivalent cells on a regular grid, found with a halfedge mesh and
a disjoint set.

# Overview

+ A halfedge datastructure is used to represent the topology of a grid of
  quads, i.e. the connectivity of vertices, edges and faces. Each vertex and
  each face of a [`QuadMesh`] carries an external id, which need not be dense.

+ A [`QuadMesh`] is only ever modified through a [`MeshBuilder`]. The builder
  adds vertices and facets between [`MeshBuilder::begin_surface`] and
  [`MeshBuilder::end_surface`], addressing the corners of facets either
  relative to the surface or absolutely, see [`IndexingMode`]. A surface can
  be rolled back.

+ Grids come from one of two places:

  + [`QuadMesh::grid`] generates a procedural grid through a
    [`SequentialSink`].

  + [`QuadMesh::append_from`] reads a raster one block at a time through a
    [`GridSource`]. The blocks may arrive in any order, vertices shared by
    blocks are matched by id in an [`IdIndexedSink`]. The raster itself is
    behind the [`RasterReader`] trait, and [`MemoryRaster`] is an in-memory
    implementation of it.

+ [`cluster`] partitions the facets into maximal connected regions of facets
  that are equivalent according to a caller supplied predicate, using a
  [`DisjointSet`] keyed by facet id. For each region it reports the centroid,
  the facet nearest to it, the neighboring regions, and whether the region
  touches the border of the grid. [`cluster_by_class`] does the same for
  facets labelled with a [`ClassMap`].
*/

mod builder;
mod check;
mod cluster;
mod dset;
mod element;
mod error;
mod grid;
mod iterator;
mod macros;
mod mesh;
mod raster;
mod source;
mod status;
mod topol;

pub use builder::{IdIndexedSink, IndexingMode, MeshBuilder, SequentialSink, SurfaceSink};
pub use cluster::{ClassMap, Cluster, ClusterReport, cluster, cluster_by_class};
pub use dset::DisjointSet;
pub use element::{EH, FH, HH, Handle, HasTopology, VH};
pub use error::{ConstructionError, Error, LogicError, SourceError};
pub use grid::generate_grid;
pub use mesh::{MeshSummary, QuadMesh};
pub use raster::{BlockLayout, GeoTransform, MemoryRaster};
pub use source::{Block, GridSource, RasterReader};
