//! icon2x - Library for regenerating an icon set at double resolution
//!
//! This library provides functionality to:
//! - Lay out an icon set into montages over two solid backgrounds
//! - Upscale the montages 2x with an external, alpha-unaware upscaler
//! - Recover transparency from the two upscaled renders
//! - Split the result back into named icons
//! - Recompose variant badges at the corner read off the low-resolution sources

pub mod alpha;
pub mod catalog;
pub mod cli;
pub mod color;
pub mod compose;
pub mod config;
pub mod corrections;
pub mod index;
pub mod montage;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod tiling;
pub mod upscale;
