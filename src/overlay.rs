//! Variant badge placement
//!
//! A variant icon is its base icon with a small badge (arrow, plus, ...) in
//! one corner. The upscaler only ever sees base icons, so variants are
//! rebuilt afterwards by compositing a badge onto the upscaled base. Which
//! corner the badge belongs in is read off the low-resolution sources: the
//! quadrant where the variant differs most from its base.
//!
//! # Algorithm
//!
//! 1. Apply the displacement correction, if any, as a circular horizontal
//!    shift: `k` pixels on the low-resolution base, `2k` on the upscaled one.
//! 2. Premultiply base and variant by their own alpha and take the absolute
//!    per-channel difference, averaged over channels. Fully transparent
//!    borders can never register as different.
//! 3. Block-average the difference into a 2x2 pool and take the hottest
//!    cell as the corner.
//! 4. Alpha-over the badge at that corner of the upscaled base.

use crate::catalog::{self, VariantKind};
use crate::compose::{composite_at_corner, Corner};
use crate::corrections::{Corrections, DerivedVariant};
use crate::upscale::SCALE;
use image::imageops;
use image::RgbaImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error when placing a badge
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OverlayError {
    /// A badge or source image could not be loaded
    #[error("Failed to load '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// A badge image is missing from the badge directory
    #[error("Badge for '{kind}' not found at '{}'", path.display())]
    MissingBadge { kind: VariantKind, path: PathBuf },
    /// Base and variant sources must share dimensions
    #[error("'{icon}' base is {}x{} but its '{kind}' variant is {}x{}", base.0, base.1, variant.0, variant.1)]
    DimensionMismatch { icon: String, kind: VariantKind, base: (u32, u32), variant: (u32, u32) },
}

/// Mean premultiplied difference per image quadrant.
///
/// Cells are indexed `[row][col]`; row 0 is the top half, col 0 the left
/// half. For odd sizes the middle row/column belongs to the bottom/right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadrantEnergyMap {
    cells: [[f32; 2]; 2],
}

impl QuadrantEnergyMap {
    /// Measure where `variant` differs from `base`.
    ///
    /// Both images must have the same dimensions.
    pub fn measure(base: &RgbaImage, variant: &RgbaImage) -> Self {
        let (width, height) = base.dimensions();
        let (half_w, half_h) = (width / 2, height / 2);
        let mut sums = [[0.0f32; 2]; 2];
        let mut counts = [[0u32; 2]; 2];

        for (x, y, b) in base.enumerate_pixels() {
            let v = variant.get_pixel(x, y);
            let b = premultiply(b.0);
            let v = premultiply(v.0);
            let difference = (0..4).map(|c| (b[c] - v[c]).abs()).sum::<f32>() / 4.0;

            let row = usize::from(y >= half_h);
            let col = usize::from(x >= half_w);
            sums[row][col] += difference;
            counts[row][col] += 1;
        }

        let mut cells = [[0.0f32; 2]; 2];
        for row in 0..2 {
            for col in 0..2 {
                if counts[row][col] > 0 {
                    cells[row][col] = sums[row][col] / counts[row][col] as f32;
                }
            }
        }
        Self { cells }
    }

    /// Energy of the cell at `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> f32 {
        self.cells[row][col]
    }

    /// Corner of the largest cell; the first in pool order wins ties.
    pub fn hottest(&self) -> Corner {
        let flat = [self.cells[0][0], self.cells[0][1], self.cells[1][0], self.cells[1][1]];
        let mut best = 0;
        for i in 1..flat.len() {
            if flat[i] > flat[best] {
                best = i;
            }
        }
        Corner::from_pool_index(best).unwrap_or(Corner::TopLeft)
    }
}

/// Premultiplied RGBA in 0-255 float space.
fn premultiply(p: [u8; 4]) -> [f32; 4] {
    let alpha = p[3] as f32 / 255.0;
    [p[0] as f32 * alpha, p[1] as f32 * alpha, p[2] as f32 * alpha, p[3] as f32]
}

/// Circularly shift `image` horizontally by `offset` pixels.
///
/// Positive offsets move content right; pixels leaving one edge re-enter
/// at the other.
pub fn roll_horizontal(image: &RgbaImage, offset: i32) -> RgbaImage {
    let width = image.width() as i64;
    if width == 0 || offset as i64 % width == 0 {
        return image.clone();
    }

    let mut out = RgbaImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let dest = (x as i64 + offset as i64).rem_euclid(width) as u32;
        out.put_pixel(dest, y, *pixel);
    }
    out
}

/// Corner where `variant` differs most from `base` once the base is
/// shifted right by `offset` native pixels.
///
/// Both images must have the same dimensions.
pub fn badge_corner(base: &RgbaImage, variant: &RgbaImage, offset: i32) -> Corner {
    let energy = if offset != 0 {
        QuadrantEnergyMap::measure(&roll_horizontal(base, offset), variant)
    } else {
        QuadrantEnergyMap::measure(base, variant)
    };
    energy.hottest()
}

/// Composite `badge` at `corner` of `upscaled_base`, after shifting the
/// base by the upscaled equivalent of `offset`.
pub fn compose_variant(
    upscaled_base: &RgbaImage,
    badge: &RgbaImage,
    corner: Corner,
    offset: i32,
    margin: u32,
) -> RgbaImage {
    let mut image = if offset != 0 {
        roll_horizontal(upscaled_base, offset * SCALE as i32)
    } else {
        upscaled_base.clone()
    };
    composite_at_corner(&mut image, badge, corner, margin);
    image
}

/// Badge images for every variant kind, at native resolution.
#[derive(Debug, Clone)]
pub struct BadgeSet {
    badges: HashMap<VariantKind, RgbaImage>,
    mirrored_pencil: RgbaImage,
}

impl BadgeSet {
    /// Build from one image per kind. The mirrored pencil is derived by
    /// flipping the pencil horizontally.
    ///
    /// Returns `None` if any kind is missing.
    pub fn from_images(badges: HashMap<VariantKind, RgbaImage>) -> Option<Self> {
        if !VariantKind::ALL.iter().all(|k| badges.contains_key(k)) {
            return None;
        }
        let mirrored_pencil = imageops::flip_horizontal(&badges[&VariantKind::Pencil]);
        Some(Self { badges, mirrored_pencil })
    }

    /// Load `<dir>/<kind>.png` for every kind.
    pub fn load(dir: &Path) -> Result<Self, OverlayError> {
        let mut badges = HashMap::new();
        for kind in VariantKind::ALL {
            let path = catalog::source_path(dir, kind.as_str());
            if !path.exists() {
                return Err(OverlayError::MissingBadge { kind, path });
            }
            let image = image::open(&path)
                .map_err(|source| OverlayError::Image { path: path.clone(), source })?
                .to_rgba8();
            badges.insert(kind, image);
        }
        let mirrored_pencil = imageops::flip_horizontal(&badges[&VariantKind::Pencil]);
        Ok(Self { badges, mirrored_pencil })
    }

    /// Badge for `kind`; `mirrored` selects the flipped pencil.
    pub fn badge(&self, kind: VariantKind, mirrored: bool) -> &RgbaImage {
        if kind == VariantKind::Pencil && mirrored {
            &self.mirrored_pencil
        } else {
            &self.badges[&kind]
        }
    }
}

/// A composited variant icon and where its badge went.
#[derive(Debug, Clone)]
pub struct Placement {
    pub corner: Corner,
    pub image: RgbaImage,
}

/// Places variant badges onto upscaled base icons.
#[derive(Debug, Clone, Copy)]
pub struct QuadrantOverlayPlacer<'a> {
    badges: &'a BadgeSet,
    corrections: &'a Corrections,
    margin: u32,
}

impl<'a> QuadrantOverlayPlacer<'a> {
    pub fn new(badges: &'a BadgeSet, corrections: &'a Corrections) -> Self {
        Self { badges, corrections, margin: 0 }
    }

    /// Inset the badge by `margin` pixels from the corner edges.
    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Decide which corner of `icon` the `kind` badge belongs in.
    ///
    /// `base` and `variant` are the low-resolution sources.
    pub fn locate(
        &self,
        icon: &str,
        kind: VariantKind,
        base: &RgbaImage,
        variant: &RgbaImage,
    ) -> Result<Corner, OverlayError> {
        if base.dimensions() != variant.dimensions() {
            return Err(OverlayError::DimensionMismatch {
                icon: icon.to_string(),
                kind,
                base: base.dimensions(),
                variant: variant.dimensions(),
            });
        }

        Ok(badge_corner(base, variant, self.corrections.displacement(icon, kind)))
    }

    /// Build the `kind` variant of `icon` from its upscaled base and the
    /// low-resolution base and variant sources.
    pub fn place(
        &self,
        icon: &str,
        kind: VariantKind,
        upscaled_base: &RgbaImage,
        base: &RgbaImage,
        variant: &RgbaImage,
    ) -> Result<Placement, OverlayError> {
        let corner = self.locate(icon, kind, base, variant)?;

        let offset = self.corrections.displacement(icon, kind);
        let badge = self.badges.badge(kind, self.corrections.uses_mirrored_pencil(icon));
        let image = compose_variant(upscaled_base, badge, corner, offset, self.margin);
        Ok(Placement { corner, image })
    }

    /// Like [`place`](Self::place), loading the sources from `source_dir`.
    ///
    /// Returns `Ok(None)` when the variant source does not exist: that is
    /// how a source set says an icon has no such variant.
    pub fn place_from_sources(
        &self,
        icon: &str,
        kind: VariantKind,
        upscaled_base: &RgbaImage,
        base: &RgbaImage,
        source_dir: &Path,
    ) -> Result<Option<Placement>, OverlayError> {
        let path = catalog::source_path(source_dir, &catalog::variant_name(icon, kind));
        if !path.exists() {
            log::debug!("No '{}' variant source for '{}'", kind, icon);
            return Ok(None);
        }

        let variant = image::open(&path)
            .map_err(|source| OverlayError::Image { path: path.clone(), source })?
            .to_rgba8();
        self.place(icon, kind, upscaled_base, base, &variant).map(Some)
    }

    /// Build a variant that does not follow the naming convention: the plain
    /// badge at a fixed corner, no quadrant search, no displacement.
    pub fn place_derived(&self, derived: &DerivedVariant, upscaled_base: &RgbaImage) -> RgbaImage {
        let mut image = upscaled_base.clone();
        composite_at_corner(&mut image, self.badges.badge(derived.kind, false), derived.corner, self.margin);
        image
    }
}
