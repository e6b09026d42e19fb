use std::collections::HashSet;

use glam::DVec3;
use tracing::trace;

use crate::{
    cluster::ClassMap,
    error::{Error, SourceError},
    source::{Block, RasterReader},
};

/// Affine map from sample coordinates to projected coordinates:
///
/// ```text
/// x = t[0] + col * t[1] + row * t[2]
/// y = t[3] + col * t[4] + row * t[5]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl Default for GeoTransform {
    fn default() -> Self {
        GeoTransform([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }
}

impl GeoTransform {
    pub fn apply(&self, col: usize, row: usize) -> (f64, f64) {
        let t = &self.0;
        let (col, row) = (col as f64, row as f64);
        (t[0] + col * t[1] + row * t[2], t[3] + col * t[4] + row * t[5])
    }
}

/// Size of the blocks a raster is tiled with. The last block of a row or a
/// column of blocks is clipped to the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    width: usize,
    height: usize,
}

impl BlockLayout {
    pub fn new(width: usize, height: usize) -> Result<Self, SourceError> {
        if width == 0 || height == 0 {
            return Err(SourceError::InvalidBlockSize { width, height });
        }
        Ok(BlockLayout { width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of blocks along each axis of a raster of the given size.
    pub fn count(&self, size: (usize, usize)) -> (usize, usize) {
        (size.0.div_ceil(self.width), size.1.div_ceil(self.height))
    }

    /// The block at `(bx, by)` in the grid of blocks.
    pub fn block(&self, size: (usize, usize), bx: usize, by: usize) -> Result<Block, SourceError> {
        let (nx, ny) = self.count(size);
        if bx >= nx || by >= ny {
            return Err(SourceError::BlockOutOfRange { bx, by });
        }
        let (x, y) = (bx * self.width, by * self.height);
        Ok(Block {
            x,
            y,
            width: self.width.min(size.0 - x),
            height: self.height.min(size.1 - y),
        })
    }
}

/**
 * Raster held in memory, read through [`RasterReader`].
 *
 * The raster has an optional elevation band, used for the `z` coordinate of
 * the samples, and an optional band of integer classes. Blocks are visited in
 * row major order unless another order is given with
 * [`MemoryRaster::with_block_order`].
 */
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    width: usize,
    height: usize,
    transform: GeoTransform,
    layout: BlockLayout,
    elevation: Option<Vec<f64>>,
    classes: Option<Vec<u32>>,
    order: Vec<(usize, usize)>,
    cursor: usize,
    current: Option<Block>,
}

impl MemoryRaster {
    /// Raster read as a single block.
    pub fn new(width: usize, height: usize) -> Result<Self, SourceError> {
        let layout = BlockLayout::new(width, height).map_err(|_| SourceError::EmptyRaster)?;
        Ok(MemoryRaster {
            width,
            height,
            transform: GeoTransform::default(),
            layout,
            elevation: None,
            classes: None,
            order: vec![(0, 0)],
            cursor: 0,
            current: None,
        })
    }

    fn check_band(&self, len: usize) -> Result<(), SourceError> {
        let expected = self.width * self.height;
        if len != expected {
            return Err(SourceError::BandSizeMismatch {
                expected,
                found: len,
            });
        }
        Ok(())
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Tile the raster with blocks of the given size. This resets the block
    /// order to row major.
    pub fn with_layout(mut self, layout: BlockLayout) -> Self {
        self.layout = layout;
        let (nx, ny) = self.block_count();
        self.order = (0..ny)
            .flat_map(|by| (0..nx).map(move |bx| (bx, by)))
            .collect();
        self.rewind();
        self
    }

    /// Visit the blocks in the given order. Blocks may be left out, but each
    /// block is visited at most once: a block read twice would add its facets
    /// twice.
    pub fn with_block_order(mut self, order: Vec<(usize, usize)>) -> Result<Self, SourceError> {
        let (nx, ny) = self.block_count();
        let mut seen = HashSet::with_capacity(order.len());
        for &(bx, by) in &order {
            if bx >= nx || by >= ny {
                return Err(SourceError::BlockOutOfRange { bx, by });
            }
            if !seen.insert((bx, by)) {
                return Err(SourceError::RepeatedBlock { bx, by });
            }
        }
        self.order = order;
        self.rewind();
        Ok(self)
    }

    /// Elevation of every sample in row major order.
    pub fn with_elevation(mut self, band: Vec<f64>) -> Result<Self, SourceError> {
        self.check_band(band.len())?;
        self.elevation = Some(band);
        Ok(self)
    }

    /// Class of every sample in row major order.
    pub fn with_classes(mut self, band: Vec<u32>) -> Result<Self, SourceError> {
        self.check_band(band.len())?;
        self.classes = Some(band);
        Ok(self)
    }

    pub fn transform(&self) -> GeoTransform {
        self.transform
    }

    pub fn layout(&self) -> BlockLayout {
        self.layout
    }

    pub fn block_count(&self) -> (usize, usize) {
        self.layout.count((self.width, self.height))
    }

    /// Start reading blocks from the beginning again.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.current = None;
    }

    /// Class of the sample at `(x, y)`, if the raster has a class band.
    pub fn class(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.classes.as_ref().map(|band| band[x + y * self.width])
    }

    /// Classes of the cells of the grid read from this raster. A cell takes
    /// the class of its first corner sample, and is keyed by the same id the
    /// cell gets when it is read through a [`crate::GridSource`].
    pub fn cell_classes(&self) -> ClassMap<u32> {
        let w = self.width;
        (0..self.height.saturating_sub(1))
            .flat_map(|y| (0..w.saturating_sub(1)).map(move |x| (x, y)))
            .filter_map(|(x, y)| self.class(x, y).map(|c| (x + y * w, c)))
            .collect()
    }
}

impl RasterReader for MemoryRaster {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn next_block(&mut self) -> Result<Option<Block>, Error> {
        self.current = match self.order.get(self.cursor) {
            Some(&(bx, by)) => {
                self.cursor += 1;
                Some(self.layout.block((self.width, self.height), bx, by)?)
            }
            None => None,
        };
        Ok(self.current)
    }

    fn row(&mut self, y: usize) -> Result<Vec<DVec3>, Error> {
        let block = self.current.ok_or(SourceError::NoBlockLoaded)?;
        if y >= self.height {
            return Err(SourceError::RowOutOfRange {
                y,
                height: self.height,
            }
            .into());
        }
        let end = (block.x + block.width + 1).min(self.width);
        trace!(y, x = block.x, samples = end - block.x, "Row");
        Ok((block.x..end)
            .map(|x| {
                let (px, py) = self.transform.apply(x, y);
                let z = self
                    .elevation
                    .as_ref()
                    .map_or(0.0, |band| band[x + y * self.width]);
                DVec3::new(px, py, z)
            })
            .collect())
    }
}
