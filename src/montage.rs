//! Dual-background montage building
//!
//! The upscaler only produces opaque images, so every base icon is rendered
//! twice: once onto a green background and once onto a magenta one. The two
//! grids share tile geometry and tile content exactly; only the background
//! differs. Comparing the two upscaled grids later reveals how transparent
//! each pixel was.
//!
//! Two hues far apart on the color wheel are used instead of black and white
//! so that no plausible foreground color composites to the same value on
//! both backgrounds at any partial alpha.

use crate::color::max_channel_difference;
use crate::compose::composite_at;
use crate::tiling::TileGeometry;
use image::{Rgba, RgbaImage};
use thiserror::Error;

/// CSS/ImageMagick `green`.
pub const GREEN: Rgba<u8> = Rgba([0, 128, 0, 255]);

/// CSS/ImageMagick `magenta`.
pub const MAGENTA: Rgba<u8> = Rgba([255, 0, 255, 255]);

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Error when building a montage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MontageError {
    /// No icons to lay out
    #[error("Cannot build a montage from zero icons")]
    Empty,
    /// An icon does not fit the icon area of its tile
    #[error("Icon #{index} is {width}x{height}, larger than the {icon_size}x{icon_size} tile area")]
    IconTooLarge { index: usize, width: u32, height: u32, icon_size: u32 },
}

/// The two opaque background colors of a montage pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundPair {
    pub green: Rgba<u8>,
    pub magenta: Rgba<u8>,
}

impl Default for BackgroundPair {
    fn default() -> Self {
        Self { green: GREEN, magenta: MAGENTA }
    }
}

impl BackgroundPair {
    /// Smallest separation (largest-channel difference) accepted between the
    /// two backgrounds.
    pub const MIN_SEPARATION: u8 = 128;

    pub fn new(green: Rgba<u8>, magenta: Rgba<u8>) -> Self {
        Self { green, magenta }
    }

    /// Largest per-channel difference between the two backgrounds.
    pub fn separation(&self) -> u8 {
        max_channel_difference(&self.green, &self.magenta)
    }

    /// Whether the backgrounds are far enough apart to recover alpha.
    pub fn is_separable(&self) -> bool {
        self.separation() >= Self::MIN_SEPARATION
    }
}

/// Two grids with identical layout and content but different backgrounds.
#[derive(Debug, Clone)]
pub struct MontagePair {
    pub green: RgbaImage,
    pub magenta: RgbaImage,
}

/// Lays the ordered base icons out into background grids.
#[derive(Debug, Clone, Copy)]
pub struct MontageBuilder {
    geometry: TileGeometry,
    backgrounds: BackgroundPair,
}

impl MontageBuilder {
    pub fn new(geometry: TileGeometry, backgrounds: BackgroundPair) -> Self {
        Self { geometry, backgrounds }
    }

    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    pub fn backgrounds(&self) -> &BackgroundPair {
        &self.backgrounds
    }

    /// Build the green and magenta grids for `icons`, in order.
    pub fn build(&self, icons: &[RgbaImage]) -> Result<MontagePair, MontageError> {
        Ok(MontagePair {
            green: self.render(icons, self.backgrounds.green)?,
            magenta: self.render(icons, self.backgrounds.magenta)?,
        })
    }

    /// Build a single grid on a transparent background.
    ///
    /// Used when the upscaler keeps transparency and no background pair is
    /// needed.
    pub fn build_transparent(&self, icons: &[RgbaImage]) -> Result<RgbaImage, MontageError> {
        self.render(icons, TRANSPARENT)
    }

    /// Render one grid: each icon centered in its tile over `background`.
    fn render(&self, icons: &[RgbaImage], background: Rgba<u8>) -> Result<RgbaImage, MontageError> {
        if icons.is_empty() {
            return Err(MontageError::Empty);
        }

        let size = self.geometry.icon_size;
        let (width, height) = self.geometry.grid_size(icons.len());
        let mut grid = RgbaImage::from_pixel(width, height, background);

        for (index, icon) in icons.iter().enumerate() {
            let (w, h) = icon.dimensions();
            if w > size || h > size {
                return Err(MontageError::IconTooLarge { index, width: w, height: h, icon_size: size });
            }

            let (x, y) = self.geometry.icon_origin(index);
            let x = x + (size - w) / 2;
            let y = y + (size - h) / 2;
            composite_at(&mut grid, icon, x as i64, y as i64);
        }

        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(columns: u32) -> MontageBuilder {
        MontageBuilder::new(TileGeometry::new(4, 1, columns), BackgroundPair::default())
    }

    #[test]
    fn test_grids_differ_only_in_background() {
        let icon = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let pair = builder(2).build(&[icon.clone(), icon.clone(), icon]).unwrap();

        assert_eq!(pair.green.dimensions(), (12, 12));
        assert_eq!(pair.green.dimensions(), pair.magenta.dimensions());

        // Icon pixels identical, margins and padding tile differ
        assert_eq!(pair.green.get_pixel(1, 1), pair.magenta.get_pixel(1, 1));
        assert_eq!(*pair.green.get_pixel(0, 0), GREEN);
        assert_eq!(*pair.magenta.get_pixel(0, 0), MAGENTA);
        // Fourth tile is padding
        assert_eq!(*pair.green.get_pixel(8, 8), GREEN);
    }

    #[test]
    fn test_translucent_icon_composited_over_background() {
        let icon = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 0]));
        let pair = builder(1).build(&[icon]).unwrap();
        assert_eq!(*pair.green.get_pixel(2, 2), GREEN);
        assert_eq!(*pair.magenta.get_pixel(2, 2), MAGENTA);
    }

    #[test]
    fn test_small_icon_is_centered() {
        let icon = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        let grid = builder(1).build_transparent(&[icon]).unwrap();
        // Tile origin (0,0), icon area starts at (1,1), centered at (2,2)
        assert_eq!(*grid.get_pixel(1, 1), TRANSPARENT);
        assert_eq!(*grid.get_pixel(2, 2), Rgba([1, 2, 3, 255]));
        assert_eq!(*grid.get_pixel(3, 3), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_tile_order_row_major() {
        let colors = [Rgba([255, 0, 0, 255]), Rgba([0, 255, 0, 255]), Rgba([0, 0, 255, 255])];
        let icons: Vec<_> = colors.iter().map(|c| RgbaImage::from_pixel(4, 4, *c)).collect();
        let grid = builder(2).build_transparent(&icons).unwrap();

        assert_eq!(*grid.get_pixel(1, 1), colors[0]);
        assert_eq!(*grid.get_pixel(7, 1), colors[1]);
        assert_eq!(*grid.get_pixel(1, 7), colors[2]);
    }

    #[test]
    fn test_oversized_icon_rejected() {
        let icon = RgbaImage::new(5, 4);
        let result = builder(1).build(&[icon]);
        assert_eq!(
            result.unwrap_err(),
            MontageError::IconTooLarge { index: 0, width: 5, height: 4, icon_size: 4 }
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(builder(1).build(&[]).unwrap_err(), MontageError::Empty);
    }

    #[test]
    fn test_default_backgrounds_separable() {
        assert!(BackgroundPair::default().is_separable());
        let close = BackgroundPair::new(GREEN, Rgba([0, 140, 0, 255]));
        assert!(!close.is_separable());
    }
}
