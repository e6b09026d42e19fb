use glam::DVec3;
use tracing::{debug, info, trace};

use crate::{
    builder::{IdIndexedSink, IndexingMode, MeshBuilder, SurfaceSink},
    error::{Error, SourceError},
    mesh::QuadMesh,
};

/// A rectangle of samples, in sample coordinates of the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/**
 * A raster that is read one block at a time.
 *
 * This is the interface to the raster driver. The samples of the raster are
 * the vertices of the grid, and every square of four adjacent samples is a
 * cell.
 */
pub trait RasterReader {
    /// Number of samples per row, and number of rows.
    fn size(&self) -> (usize, usize);

    /// Move to the next block. `None`, or a block with zero width, means all
    /// blocks have been read.
    fn next_block(&mut self) -> Result<Option<Block>, Error>;

    /// Projected coordinates of the samples of row `y`, as `(x, y,
    /// elevation)`, starting at the first column of the current block. The
    /// row includes the first column past the block if the raster has one.
    fn row(&mut self, y: usize) -> Result<Vec<DVec3>, Error>;
}

/**
 * Turns the blocks of a [`RasterReader`] into vertices and faces.
 *
 * The id of the sample in column `x` of row `y` is `x + y * W`, where `W` is
 * the width of the raster. A cell is identified by the id of its first
 * corner. Samples on the edges of a block are reported by both blocks that
 * share them, so the sink must ignore vertex ids it has already seen.
 */
pub struct GridSource<R> {
    reader: R,
    width: usize,
    height: usize,
}

impl<R: RasterReader> GridSource<R> {
    pub fn new(reader: R) -> Result<Self, Error> {
        let (width, height) = reader.size();
        if width == 0 || height == 0 {
            return Err(SourceError::EmptyRaster.into());
        }
        Ok(GridSource {
            reader,
            width,
            height,
        })
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next block into `sink`. Returns `false` once there are no
    /// blocks left.
    pub fn read_block(&mut self, sink: &mut impl SurfaceSink) -> Result<bool, Error> {
        let block = match self.reader.next_block()? {
            Some(block) if block.width > 0 => block,
            _ => return Ok(false),
        };
        debug!(
            x = block.x,
            y = block.y,
            width = block.width,
            height = block.height,
            "Reading block"
        );
        let w = self.width;
        // One extra row and column to close the cells on the far edges of the
        // block, unless the block is already on the edge of the raster.
        let xend = (block.x + block.width + 1).min(w);
        let yend = (block.y + block.height + 1).min(self.height);
        let ncols = xend.saturating_sub(block.x);
        for y in block.y..yend {
            let row = self.reader.row(y)?;
            if row.len() < ncols {
                return Err(SourceError::ShortRow {
                    y,
                    expected: ncols,
                    found: row.len(),
                }
                .into());
            }
            trace!(y, samples = ncols, "Read row");
            for (x, pos) in (block.x..xend).zip(row) {
                sink.add_vertex(pos, x + y * w)?;
            }
        }
        for py in block.y..(block.y + block.height).min(yend.saturating_sub(1)) {
            for px in block.x..(block.x + block.width).min(xend.saturating_sub(1)) {
                sink.add_face(
                    [
                        px + py * w,
                        (px + 1) + py * w,
                        (px + 1) + (py + 1) * w,
                        px + (py + 1) * w,
                    ],
                    px + py * w,
                )?;
            }
        }
        Ok(true)
    }
}

fn stream_blocks<R: RasterReader>(
    builder: &mut MeshBuilder,
    source: &mut GridSource<R>,
) -> Result<usize, Error> {
    let mut sink = IdIndexedSink::new(builder)?;
    let mut nblocks = 0usize;
    while source.read_block(&mut sink)? {
        nblocks += 1;
    }
    Ok(nblocks)
}

impl QuadMesh {
    /**
     * Append the grid read from `reader` to this mesh.
     *
     * Vertices are matched by id against the vertices already in the mesh,
     * and against each other, so blocks may arrive in any order. If anything
     * fails, the mesh is left as it was before the call.
     */
    pub fn append_from<R: RasterReader>(&mut self, reader: R) -> Result<(), Error> {
        let mut source = GridSource::new(reader)?;
        let (width, height) = source.size();
        info!(width, height, "Appending raster");
        let mut builder = MeshBuilder::new(self);
        builder.begin_surface(0, 0, 0, IndexingMode::Absolute)?;
        let nblocks = match stream_blocks(&mut builder, &mut source) {
            Ok(n) => n,
            Err(e) => {
                builder.rollback()?;
                return Err(e);
            }
        };
        builder.end_surface()?;
        info!(
            blocks = nblocks,
            vertices = self.num_vertices(),
            faces = self.num_faces(),
            "Appended raster"
        );
        Ok(())
    }

    /// Build a mesh from the grid read from `reader`.
    pub fn from_source<R: RasterReader>(reader: R) -> Result<Self, Error> {
        let mut mesh = QuadMesh::new();
        mesh.append_from(reader)?;
        Ok(mesh)
    }
}
