//! Alpha channel reconstruction from two opaque background renders
//!
//! A pixel with color `c` and alpha `a` composited over background `bg`
//! shows `a*c + (1 - a)*bg`. Rendered over two different backgrounds the
//! observed colors differ by `(1 - a)*(bg_g - bg_m)`, so the size of the
//! difference measures transparency: zero where the art is opaque, maximal
//! where only background shows through.
//!
//! # Algorithm
//!
//! 1. Per pixel, take the largest absolute channel difference between the
//!    green and magenta renders. Using the maximum rather than the mean keeps
//!    a single coincidentally matching channel from underestimating alpha.
//! 2. Auto-level that field to `[0, 1]` and invert it to get alpha.
//! 3. Invert the compositing equation against each background separately.
//! 4. Average both recovered colors to cancel per-render upscaler noise.
//! 5. Zero out near-transparent pixels so the division leaves no halo.

use crate::montage::BackgroundPair;
use image::{Rgba, RgbaImage};
use thiserror::Error;

/// Alpha below which a reconstructed pixel is forced fully transparent.
pub const DEFAULT_ALPHA_CUTOFF: f32 = 0.02;

/// Error when reconstructing alpha
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconstructError {
    /// The two renders must come from identical upscaler invocations
    #[error("Background renders differ in size: green is {}x{}, magenta is {}x{}", green.0, green.1, magenta.0, magenta.1)]
    DimensionMismatch { green: (u32, u32), magenta: (u32, u32) },
}

/// Turns two opaque-background renders into one transparent image.
///
/// Implementations receive both grids already upscaled and opaque.
pub trait AlphaRecovery {
    fn reconstruct(&self, green: &RgbaImage, magenta: &RgbaImage)
        -> Result<RgbaImage, ReconstructError>;
}

/// Per-pixel alpha in `[0, 1]`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaPlane {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl AlphaPlane {
    /// Estimate alpha from the max-channel difference of two renders.
    ///
    /// The difference field is auto-levelled: its smallest observed value
    /// maps to alpha 1 and its largest to alpha 0. A flat field is fully
    /// opaque when it is all zero and fully transparent otherwise.
    pub fn estimate(green: &RgbaImage, magenta: &RgbaImage) -> Result<Self, ReconstructError> {
        check_dimensions(green, magenta)?;

        let differences: Vec<u8> = green
            .pixels()
            .zip(magenta.pixels())
            .map(|(g, m)| (0..3).map(|c| g[c].abs_diff(m[c])).max().unwrap_or(0))
            .collect();

        let min = differences.iter().copied().min().unwrap_or(0);
        let max = differences.iter().copied().max().unwrap_or(0);

        let values = if max == min {
            let flat = if max == 0 { 1.0 } else { 0.0 };
            vec![flat; differences.len()]
        } else {
            let range = (max - min) as f32;
            differences.iter().map(|&d| 1.0 - (d - min) as f32 / range).collect()
        };

        Ok(Self { width: green.width(), height: green.height(), values })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Alpha at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.width + x) as usize]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Recovers alpha and unpremultiplied color from a green/magenta pair.
#[derive(Debug, Clone, Copy)]
pub struct AlphaChannelReconstructor {
    backgrounds: BackgroundPair,
    cutoff: f32,
    sample_background: bool,
}

impl AlphaChannelReconstructor {
    pub fn new(backgrounds: BackgroundPair) -> Self {
        Self { backgrounds, cutoff: DEFAULT_ALPHA_CUTOFF, sample_background: false }
    }

    /// Set the near-transparent cleanup threshold.
    pub fn with_cutoff(mut self, cutoff: f32) -> Self {
        self.cutoff = cutoff.clamp(0.0, 1.0);
        self
    }

    /// Read each background from the top-left pixel of its render instead of
    /// using the configured color.
    ///
    /// With a non-zero tile margin that pixel is pure background, so it shows
    /// what the upscaler made of it. Without a margin it is icon art and the
    /// recovered colors are wrong; configuration validation rejects that.
    pub fn with_sampled_background(mut self, sample: bool) -> Self {
        self.sample_background = sample;
        self
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    fn background_of(&self, render: &RgbaImage, configured: Rgba<u8>) -> Rgba<u8> {
        if self.sample_background && render.width() > 0 && render.height() > 0 {
            *render.get_pixel(0, 0)
        } else {
            configured
        }
    }
}

impl AlphaRecovery for AlphaChannelReconstructor {
    fn reconstruct(
        &self,
        green: &RgbaImage,
        magenta: &RgbaImage,
    ) -> Result<RgbaImage, ReconstructError> {
        let plane = AlphaPlane::estimate(green, magenta)?;
        let bg_green = self.background_of(green, self.backgrounds.green);
        let bg_magenta = self.background_of(magenta, self.backgrounds.magenta);

        let mut out = RgbaImage::new(green.width(), green.height());
        for ((out_pixel, (g, m)), &alpha) in
            out.pixels_mut().zip(green.pixels().zip(magenta.pixels())).zip(plane.values())
        {
            if alpha < self.cutoff {
                *out_pixel = Rgba([0, 0, 0, 0]);
                continue;
            }

            let channel = |c: usize| -> u8 {
                let from_green = unpremultiply(g[c], alpha, bg_green[c]);
                let from_magenta = unpremultiply(m[c], alpha, bg_magenta[c]);
                ((from_green + from_magenta) / 2.0).round() as u8
            };
            *out_pixel = Rgba([channel(0), channel(1), channel(2), (alpha * 255.0).round() as u8]);
        }

        Ok(out)
    }
}

/// Invert `observed = alpha*color + (1 - alpha)*background` for `color`.
///
/// Zero alpha has no defined color and yields 0.
fn unpremultiply(observed: u8, alpha: f32, background: u8) -> f32 {
    if alpha <= 0.0 {
        return 0.0;
    }
    let color = (observed as f32 - (1.0 - alpha) * background as f32) / alpha;
    color.clamp(0.0, 255.0)
}

fn check_dimensions(green: &RgbaImage, magenta: &RgbaImage) -> Result<(), ReconstructError> {
    if green.dimensions() != magenta.dimensions() {
        return Err(ReconstructError::DimensionMismatch {
            green: green.dimensions(),
            magenta: magenta.dimensions(),
        });
    }
    Ok(())
}
