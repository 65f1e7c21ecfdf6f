//! Tile geometry shared by the montage builder and the index mapper
//!
//! Icons are bound back to their names purely by tile position, so the grid
//! builder and the cropper must agree exactly on tile size, margin and order.
//! Both take the same [`TileGeometry`] value; neither derives it on its own.

/// Icon edge length of the source icon sets.
pub const DEFAULT_ICON_SIZE: u32 = 16;

/// Border added around each icon inside its tile.
pub const DEFAULT_MARGIN: u32 = 2;

/// Tiles per grid row.
pub const DEFAULT_COLUMNS: u32 = 50;

/// Layout of square icon tiles in a row-major grid.
///
/// Every tile is `pitch() x pitch()` pixels: the icon area plus `margin`
/// pixels on each side. Tile `i` sits at column `i % columns`, row
/// `i / columns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    /// Edge length of the icon area inside each tile
    pub icon_size: u32,
    /// Border on each side of the icon area
    pub margin: u32,
    /// Number of tiles per row
    pub columns: u32,
}

impl Default for TileGeometry {
    fn default() -> Self {
        Self::new(DEFAULT_ICON_SIZE, DEFAULT_MARGIN, DEFAULT_COLUMNS)
    }
}

impl TileGeometry {
    /// Create a geometry. A column count of zero is treated as one.
    pub fn new(icon_size: u32, margin: u32, columns: u32) -> Self {
        Self { icon_size, margin, columns: columns.max(1) }
    }

    /// Distance between the origins of two neighbouring tiles.
    pub fn pitch(&self) -> u32 {
        self.icon_size + 2 * self.margin
    }

    /// Number of rows needed for `count` tiles.
    pub fn rows_for(&self, count: usize) -> u32 {
        (count as u32).div_ceil(self.columns)
    }

    /// Grid dimensions `(width, height)` holding `count` tiles.
    ///
    /// The width is always a full row of `columns` tiles; trailing tiles of
    /// the last row are padding.
    pub fn grid_size(&self, count: usize) -> (u32, u32) {
        (self.columns * self.pitch(), self.rows_for(count) * self.pitch())
    }

    /// Top-left corner of tile `index`.
    pub fn tile_origin(&self, index: usize) -> (u32, u32) {
        let index = index as u32;
        let col = index % self.columns;
        let row = index / self.columns;
        (col * self.pitch(), row * self.pitch())
    }

    /// Top-left corner of the icon area of tile `index`.
    pub fn icon_origin(&self, index: usize) -> (u32, u32) {
        let (x, y) = self.tile_origin(index);
        (x + self.margin, y + self.margin)
    }

    /// The same layout after every pixel has been scaled by `factor`.
    pub fn scaled(&self, factor: u32) -> Self {
        Self {
            icon_size: self.icon_size * factor,
            margin: self.margin * factor,
            columns: self.columns,
        }
    }

    /// Number of whole tiles in a grid of the given size.
    ///
    /// Returns `None` when the grid is not a whole number of tiles in either
    /// direction, or is not exactly `columns` tiles wide.
    pub fn tile_count(&self, width: u32, height: u32) -> Option<usize> {
        let pitch = self.pitch();
        if pitch == 0 || width % pitch != 0 || height % pitch != 0 {
            return None;
        }
        if width / pitch != self.columns {
            return None;
        }
        Some((self.columns * (height / pitch)) as usize)
    }
}
