use thiserror::Error;

use crate::{
    builder::IndexingMode,
    element::{FH, HH, VH},
};

/// Errors raised while building a mesh. They are fatal to the surface being
/// built, which is discarded with [`crate::MeshBuilder::rollback`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("a surface is already open")]
    SurfaceAlreadyOpen,
    #[error("no surface is open")]
    SurfaceNotOpen,
    #[error("a facet is already open")]
    FacetAlreadyOpen,
    #[error("facet is still open when ending the surface")]
    FacetNotClosed,
    #[error("no facet is open")]
    NoOpenFacet,
    #[error("the surface is open in {0:?} indexing mode")]
    WrongIndexingMode(IndexingMode),
    #[error("vertex index {index} is out of range, {count} vertices are addressable")]
    VertexIndexOutOfRange { index: usize, count: usize },
    #[error("facet {facet} references vertex id {id} which is not indexed")]
    UnindexedVertexId { id: usize, facet: usize },
    #[error("vertex id {0} already exists")]
    DuplicateVertexId(usize),
    #[error("facet id {0} already exists")]
    DuplicateFacetId(usize),
    #[error("facet {id} has {corners} corners, at least 3 are required")]
    DegenerateFacet { id: usize, corners: usize },
    #[error("facet {id} uses vertex {vertex} more than once")]
    RepeatedCorner { id: usize, vertex: VH },
    #[error("vertex {0} is not on the boundary, cannot attach a facet")]
    ComplexVertex(VH),
    #[error("halfedge {0} already has a facet")]
    ComplexHalfedge(HH),
    #[error("failed to relink the boundary around a new facet")]
    PatchRelinkingFailed,
    #[error("no facet with id {0}")]
    UnknownFacetId(usize),
    #[error("invalid grid size {w} x {h}")]
    InvalidGridSize { w: usize, h: usize },
}

/// Errors raised by the raster collaborator or the adapter reading it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("raster has no samples")]
    EmptyRaster,
    #[error("band has {found} samples, expected {expected}")]
    BandSizeMismatch { expected: usize, found: usize },
    #[error("invalid block size {width} x {height}")]
    InvalidBlockSize { width: usize, height: usize },
    #[error("no block has been loaded")]
    NoBlockLoaded,
    #[error("row {y} is outside the raster of height {height}")]
    RowOutOfRange { y: usize, height: usize },
    #[error("block ({bx}, {by}) is outside the block grid")]
    BlockOutOfRange { bx: usize, by: usize },
    #[error("block ({bx}, {by}) is visited more than once")]
    RepeatedBlock { bx: usize, by: usize },
    #[error("row {y} has {found} samples, expected at least {expected}")]
    ShortRow {
        y: usize,
        expected: usize,
        found: usize,
    },
    #[error("raster I/O failed: {0}")]
    Io(String),
}

/// Errors caused by a mesh whose topology is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogicError {
    #[error("ring of facet {0} does not close")]
    OpenFacetRing(FH),
    #[error("ring of facet {0} has fewer than 3 halfedges")]
    RingTooShort(FH),
    #[error("halfedge {0} belongs to a loop with a different face")]
    InconsistentFaceInLoop(HH),
    #[error("halfedge {0} has inconsistent next / prev links")]
    InvalidHalfedgeLink(HH),
    #[error("halfedge {0} starts and ends at the same vertex")]
    DegenerateHalfedge(HH),
    #[error("facet {0} points to halfedge {1} which does not belong to it")]
    InvalidFaceHalfedgeLink(FH, HH),
    #[error("outgoing halfedges of vertex {0} are inconsistent")]
    InvalidOutgoingHalfedges(VH),
    #[error("element refers to deleted halfedge {0}")]
    DeletedHalfedge(HH),
    #[error("facet id {0} occurs more than once")]
    DuplicateFacetId(usize),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Logic(#[from] LogicError),
}
