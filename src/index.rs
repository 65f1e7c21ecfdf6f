//! Splitting a reconstructed grid back into named icons
//!
//! Tile `i` of the grid belongs to catalog entry `i`. The binding is purely
//! positional, so the mapper uses the very same [`TileGeometry`] the montage
//! was built with, scaled by the upscale factor.

use crate::catalog::{Catalog, IconIdentity};
use crate::tiling::TileGeometry;
use image::imageops;
use image::RgbaImage;
use thiserror::Error;

/// Error when splitting a grid into icons
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The grid is not a whole number of tiles
    #[error("Grid {width}x{height} is not a whole number of {pitch}px tiles in {columns} columns")]
    Misaligned { width: u32, height: u32, pitch: u32, columns: u32 },
    /// The grid has fewer tiles than the catalog has icons
    #[error("Grid holds {tiles} tiles but the catalog lists {expected} icons")]
    TooFewTiles { tiles: usize, expected: usize },
}

/// An upscaled icon bound to its catalog identity.
#[derive(Debug, Clone)]
pub struct IndexedIcon {
    pub identity: IconIdentity,
    pub image: RgbaImage,
}

impl IndexedIcon {
    pub fn name(&self) -> &str {
        &self.identity.name
    }
}

/// Crops grid tiles and binds them to catalog entries by position.
#[derive(Debug, Clone, Copy)]
pub struct IconIndexMapper {
    geometry: TileGeometry,
}

impl IconIndexMapper {
    /// Create a mapper for grids laid out with `geometry`.
    ///
    /// `geometry` must already be scaled to the grid's resolution.
    pub fn new(geometry: TileGeometry) -> Self {
        Self { geometry }
    }

    /// Every tile of the grid, padding included, in row-major order.
    ///
    /// Each tile is cropped to its icon area, dropping the margin.
    pub fn split(&self, grid: &RgbaImage) -> Result<Vec<RgbaImage>, IndexError> {
        let (width, height) = grid.dimensions();
        let count = self.geometry.tile_count(width, height).ok_or(IndexError::Misaligned {
            width,
            height,
            pitch: self.geometry.pitch(),
            columns: self.geometry.columns,
        })?;

        let size = self.geometry.icon_size;
        Ok((0..count)
            .map(|index| {
                let (x, y) = self.geometry.icon_origin(index);
                imageops::crop_imm(grid, x, y, size, size).to_image()
            })
            .collect())
    }

    /// Split the grid and bind tile `i` to catalog entry `i`.
    ///
    /// Tiles beyond the catalog length are padding and are discarded.
    pub fn map(&self, grid: &RgbaImage, catalog: &Catalog) -> Result<Vec<IndexedIcon>, IndexError> {
        let mut tiles = self.split(grid)?;
        if tiles.len() < catalog.len() {
            return Err(IndexError::TooFewTiles { tiles: tiles.len(), expected: catalog.len() });
        }
        tiles.truncate(catalog.len());

        Ok(catalog
            .entries()
            .iter()
            .zip(tiles)
            .map(|(entry, image)| IndexedIcon { identity: entry.identity.clone(), image })
            .collect())
    }
}
