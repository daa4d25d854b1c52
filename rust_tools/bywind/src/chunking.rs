use crate::error::{BywindError, Result};
use log::debug;

/// Pixel window of one block, max bounds exclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkBounds {
    pub x_min: usize,
    pub y_min: usize,
    pub x_max: usize,
    pub y_max: usize,
}

impl ChunkBounds {
    pub fn width(&self) -> usize {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> usize {
        self.y_max - self.y_min
    }

    pub fn offset(&self) -> (isize, isize) {
        (self.x_min as isize, self.y_min as isize)
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width(), self.height())
    }
}

/// Splits a raster into square blocks so large GeoTIFFs can be streamed
pub struct ChunkGrid {
    raster_width: usize,
    raster_height: usize,
    chunk_size: usize,
    pub num_chunks_x: usize,
    pub num_chunks_y: usize,
    pub total_chunks: usize,
}

impl ChunkGrid {
    pub fn new(raster_width: usize, raster_height: usize, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(BywindError::InvalidChunkSize(chunk_size));
        }

        let num_chunks_x = raster_width.div_ceil(chunk_size);
        let num_chunks_y = raster_height.div_ceil(chunk_size);
        let total_chunks = num_chunks_x * num_chunks_y;

        debug!(
            "ChunkGrid: {}x{} raster, chunk_size={} → {}x{} chunks ({} total)",
            raster_width, raster_height, chunk_size, num_chunks_x, num_chunks_y, total_chunks
        );

        Ok(Self {
            raster_width,
            raster_height,
            chunk_size,
            num_chunks_x,
            num_chunks_y,
            total_chunks,
        })
    }

    pub fn iter(&self) -> ChunkIterator<'_> {
        ChunkIterator {
            grid: self,
            current_idx: 0,
        }
    }

    pub fn get_chunk_bounds(&self, chunk_idx: usize) -> ChunkBounds {
        let chunk_y = chunk_idx / self.num_chunks_x;
        let chunk_x = chunk_idx % self.num_chunks_x;

        ChunkBounds {
            x_min: chunk_x * self.chunk_size,
            y_min: chunk_y * self.chunk_size,
            x_max: ((chunk_x + 1) * self.chunk_size).min(self.raster_width),
            y_max: ((chunk_y + 1) * self.chunk_size).min(self.raster_height),
        }
    }
}

pub struct ChunkIterator<'a> {
    grid: &'a ChunkGrid,
    current_idx: usize,
}

impl Iterator for ChunkIterator<'_> {
    type Item = (usize, ChunkBounds);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_idx < self.grid.total_chunks {
            let bounds = self.grid.get_chunk_bounds(self.current_idx);
            let idx = self.current_idx;
            self.current_idx += 1;
            Some((idx, bounds))
        } else {
            None
        }
    }
}
