//! Pipeline orchestration for one icon set.
//!
//! A pass runs the stages strictly in order: catalog, montage, upscale,
//! alpha reconstruction, index mapping, then badge placement. Every stage
//! failure halts the pass; a missing variant source only skips that variant.

use crate::alpha::{AlphaChannelReconstructor, AlphaRecovery, ReconstructError};
use crate::catalog::{Catalog, CatalogError};
use crate::color::{self, ColorError};
use crate::config::{ConfigError, Icon2xConfig, IconSetConfig, UpscalerBackend};
use crate::corrections::Corrections;
use crate::index::{IconIndexMapper, IndexError};
use crate::montage::{BackgroundPair, MontageBuilder, MontageError};
use crate::output::{self, OutputError};
use crate::overlay::{BadgeSet, OverlayError, QuadrantOverlayPlacer};
use crate::tiling::TileGeometry;
use crate::upscale::{self, ExternalUpscaler, NearestUpscaler, UpscaleError, Upscaler, SCALE};
use image::RgbaImage;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Error that halts a pass.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid background color: {0}")]
    Color(#[from] ColorError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Montage failed: {0}")]
    Montage(#[from] MontageError),
    #[error(transparent)]
    Upscale(#[from] UpscaleError),
    #[error("Alpha reconstruction failed: {0}")]
    Reconstruct(#[from] ReconstructError),
    #[error("Index mapping failed: {0}")]
    Index(#[from] IndexError),
    #[error(transparent)]
    Overlay(#[from] OverlayError),
    #[error("Failed to write output: {0}")]
    Output(#[from] OutputError),
    #[error("Unknown icon set '{0}'")]
    UnknownSet(String),
}

/// Summary of one finished pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    /// Icon set name
    pub set: String,
    /// Base icons written
    pub base_icons: usize,
    /// Variant icons written, derived variants included
    pub variants_written: usize,
    /// Listed variants whose low-resolution source was missing
    pub variants_skipped: usize,
    /// Every file written to the output directory
    pub outputs: Vec<PathBuf>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl PassReport {
    fn new(set: &str) -> Self {
        Self { set: set.to_string(), ..Default::default() }
    }

    fn record(&mut self, path: PathBuf) {
        self.outputs.push(path);
    }
}

/// Create the upscaler selected by the configuration.
pub fn upscaler_for(config: &Icon2xConfig) -> Box<dyn Upscaler> {
    match config.upscaler.backend {
        UpscalerBackend::External => Box::new(ExternalUpscaler::new(
            config.upscaler.program.clone(),
            config.upscaler.args.clone(),
            config.work_dir.clone(),
        )),
        UpscalerBackend::Nearest => Box::new(NearestUpscaler),
    }
}

/// Create the alpha reconstructor described by the configuration.
pub fn reconstructor_for(config: &Icon2xConfig) -> Result<AlphaChannelReconstructor, ColorError> {
    Ok(AlphaChannelReconstructor::new(config.montage.backgrounds()?)
        .with_cutoff(config.alpha.cutoff)
        .with_sampled_background(config.alpha.sample_background))
}

/// One run of the pipeline over a single icon set.
pub struct IconSetPass<'a> {
    set: &'a IconSetConfig,
    geometry: TileGeometry,
    backgrounds: BackgroundPair,
    work_dir: &'a Path,
    badge_dir: &'a Path,
    badge_margin: u32,
    corrections: Corrections,
    upscaler: &'a dyn Upscaler,
    recovery: &'a dyn AlphaRecovery,
}

impl<'a> IconSetPass<'a> {
    /// Prepare a pass over `set` using the shared settings in `config`.
    pub fn new(
        config: &'a Icon2xConfig,
        set: &'a IconSetConfig,
        upscaler: &'a dyn Upscaler,
        recovery: &'a dyn AlphaRecovery,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            set,
            geometry: config.montage.geometry(),
            backgrounds: config.montage.backgrounds()?,
            work_dir: &config.work_dir,
            badge_dir: &config.overlay.badge_dir,
            badge_margin: config.overlay.margin,
            corrections: config.corrections(),
            upscaler,
            recovery,
        })
    }

    /// Load the catalog from the manifest if one is configured, otherwise
    /// from the source directory listing.
    pub fn catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.set.manifest {
            Some(manifest) => Catalog::load_manifest(manifest, &self.set.renames, &self.corrections),
            None => Catalog::from_directory(&self.set.source, &self.set.renames, &self.corrections),
        }
    }

    /// Run every stage and write the output directory.
    pub fn run(&self) -> Result<PassReport, PipelineError> {
        let start = Instant::now();
        let name = self.set.name.as_str();
        let mut report = PassReport::new(name);

        let catalog = self.catalog()?;
        info!(
            "{}: {} base icons, {} variants listed",
            name,
            catalog.len(),
            catalog.variant_count()
        );
        let sources = catalog.load_sources(&self.set.source)?;

        let grid = self.upscaled_grid(&sources)?;
        output::save_png(&grid, &output::grid_output_path(self.work_dir, name))?;

        let mapper = IconIndexMapper::new(self.geometry.scaled(SCALE));
        let icons = mapper.map(&grid, &catalog)?;
        info!("{}: split {} icons from {}x{} grid", name, icons.len(), grid.width(), grid.height());

        let badges = BadgeSet::load(self.badge_dir)?;
        let placer =
            QuadrantOverlayPlacer::new(&badges, &self.corrections).with_margin(self.badge_margin);
        let out = &self.set.out;

        for ((icon, entry), source) in icons.iter().zip(catalog.entries()).zip(&sources) {
            let path = output::base_output_path(out, icon.name());
            output::save_png(&icon.image, &path)?;
            report.base_icons += 1;
            report.record(path);

            if entry.displaced {
                debug!("{}: applying displacement correction", icon.name());
            }

            for &kind in &entry.variants {
                let placed =
                    placer.place_from_sources(icon.name(), kind, &icon.image, source, &self.set.source)?;
                match placed {
                    Some(placement) => {
                        debug!("{}--{}: badge at {}", icon.name(), kind, placement.corner);
                        let path = output::variant_output_path(out, icon.name(), kind);
                        output::save_png(&placement.image, &path)?;
                        report.variants_written += 1;
                        report.record(path);
                    }
                    None => report.variants_skipped += 1,
                }
            }
        }

        for derived in self.corrections.derived() {
            match icons.iter().find(|icon| icon.name() == derived.base) {
                Some(icon) => {
                    let image = placer.place_derived(derived, &icon.image);
                    let path = output::base_output_path(out, derived.output);
                    output::save_png(&image, &path)?;
                    report.variants_written += 1;
                    report.record(path);
                }
                None => warn!(
                    "{}: skipping '{}', base icon '{}' is not in the catalog",
                    name, derived.output, derived.base
                ),
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "{}: wrote {} base icons and {} variants to {} ({} skipped) in {}ms",
            name,
            report.base_icons,
            report.variants_written,
            out.display(),
            report.variants_skipped,
            report.duration_ms
        );
        Ok(report)
    }

    /// Montage, upscale and, unless the upscaler keeps transparency,
    /// reconstruct alpha. Montages are kept in the work directory.
    fn upscaled_grid(&self, sources: &[RgbaImage]) -> Result<RgbaImage, PipelineError> {
        let name = self.set.name.as_str();
        let builder = MontageBuilder::new(self.geometry, self.backgrounds);

        if self.upscaler.preserves_alpha() {
            let montage = builder.build_transparent(sources)?;
            output::save_png(&montage, &self.work_dir.join(format!("{}-montage.png", name)))?;
            info!("{}: upscaling transparent {}x{} montage", name, montage.width(), montage.height());
            return Ok(upscale::upscale_transparent(self.upscaler, name, &montage)?);
        }

        let montages = builder.build(sources)?;
        output::save_png(&montages.green, &self.work_dir.join(format!("{}-montage-green.png", name)))?;
        output::save_png(
            &montages.magenta,
            &self.work_dir.join(format!("{}-montage-magenta.png", name)),
        )?;
        info!(
            "{}: upscaling {}x{} montages over {} and {}",
            name,
            montages.green.width(),
            montages.green.height(),
            color::to_hex(&self.backgrounds.green),
            color::to_hex(&self.backgrounds.magenta)
        );

        let upscaled = upscale::upscale_pair(self.upscaler, name, &montages)?;
        info!("{}: reconstructing alpha", name);
        Ok(self.recovery.reconstruct(&upscaled.green, &upscaled.magenta)?)
    }
}

/// Run a pass for every configured set, or only the one named `only`.
pub fn run_sets(config: &Icon2xConfig, only: Option<&str>) -> Result<Vec<PassReport>, PipelineError> {
    let sets: Vec<&IconSetConfig> = match only {
        Some(name) => {
            vec![config.set(name).ok_or_else(|| PipelineError::UnknownSet(name.to_string()))?]
        }
        None => config.sets.iter().collect(),
    };

    let upscaler = upscaler_for(config);
    let recovery = reconstructor_for(config)?;

    sets.into_iter()
        .map(|set| IconSetPass::new(config, set, upscaler.as_ref(), &recovery)?.run())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VariantKind;
    use image::Rgba;
    use tempfile::TempDir;

    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);
    const RED: Rgba<u8> = Rgba([200, 40, 40, 255]);

    fn save(image: &RgbaImage, path: &Path) {
        output::save_png(image, path).unwrap();
    }

    fn icon() -> RgbaImage {
        let mut image = RgbaImage::from_pixel(16, 16, CLEAR);
        for y in 4..12 {
            for x in 4..12 {
                image.put_pixel(x, y, RED);
            }
        }
        image
    }

    fn write_badges(dir: &Path) {
        for kind in VariantKind::ALL {
            save(&RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255])), &dir.join(format!("{}.png", kind)));
        }
    }

    fn config(root: &Path) -> Icon2xConfig {
        let mut config = Icon2xConfig::default();
        config.work_dir = root.join("tmp");
        config.upscaler.backend = UpscalerBackend::Nearest;
        config.overlay.badge_dir = root.join("badges");
        let mut set = IconSetConfig::fugue("icons");
        set.source = root.join("src");
        set.out = root.join("out");
        config.sets = vec![set];
        config
    }

    #[test]
    fn test_run_sets_unknown_set() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        let result = run_sets(&config, Some("nope"));
        assert!(matches!(result, Err(PipelineError::UnknownSet(name)) if name == "nope"));
    }

    #[test]
    fn test_catalog_prefers_manifest() {
        let temp = TempDir::new().unwrap();
        let mut config = config(temp.path());
        save(&icon(), &temp.path().join("src/zeta.png"));
        save(&icon(), &temp.path().join("src/alpha.png"));
        std::fs::write(temp.path().join("order.txt"), "zeta.png\nalpha.png\n").unwrap();
        config.sets[0].manifest = Some(temp.path().join("order.txt"));

        let recovery = reconstructor_for(&config).unwrap();
        let pass = IconSetPass::new(&config, &config.sets[0], &NearestUpscaler, &recovery).unwrap();
        let names: Vec<_> = pass.catalog().unwrap().entries().iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_pass_writes_intermediates_and_derived_variant() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        write_badges(&temp.path().join("badges"));
        save(&icon(), &temp.path().join("src/layout-hf-2.png"));
        save(&icon(), &temp.path().join("src/other.png"));

        let reports = run_sets(&config, None).unwrap();
        let report = &reports[0];
        assert_eq!(report.base_icons, 2);
        assert_eq!(report.variants_written, 1);
        assert_eq!(report.variants_skipped, 0);

        assert!(temp.path().join("tmp/icons-montage-green.png").exists());
        assert!(temp.path().join("tmp/icons-montage-magenta.png").exists());
        assert!(temp.path().join("tmp/icons-2x.png").exists());

        let derived = image::open(temp.path().join("out/layout-design.png")).unwrap().to_rgba8();
        assert_eq!(derived.dimensions(), (32, 32));
        // Plain pencil at bottom-left
        assert_eq!(*derived.get_pixel(0, 31), Rgba([0, 0, 255, 255]));
        assert_eq!(derived.get_pixel(31, 0)[3], 0);
    }

    #[test]
    fn test_missing_badges_halt_the_pass() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        save(&icon(), &temp.path().join("src/solo.png"));

        let result = run_sets(&config, None);
        assert!(matches!(result, Err(PipelineError::Overlay(OverlayError::MissingBadge { .. }))));
    }

    #[test]
    fn test_preserving_upscaler_skips_reconstruction() {
        struct Transparent;
        impl Upscaler for Transparent {
            fn upscale(&self, name: &str, image: &RgbaImage) -> Result<RgbaImage, UpscaleError> {
                NearestUpscaler.upscale(name, image)
            }
            fn preserves_alpha(&self) -> bool {
                true
            }
        }
        struct Unreachable;
        impl AlphaRecovery for Unreachable {
            fn reconstruct(&self, _: &RgbaImage, _: &RgbaImage) -> Result<RgbaImage, ReconstructError> {
                panic!("reconstruction must be bypassed")
            }
        }

        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        write_badges(&temp.path().join("badges"));
        save(&icon(), &temp.path().join("src/solo.png"));

        let pass = IconSetPass::new(&config, &config.sets[0], &Transparent, &Unreachable).unwrap();
        let report = pass.run().unwrap();
        assert_eq!(report.base_icons, 1);
        assert!(temp.path().join("tmp/icons-montage.png").exists());

        let out = image::open(temp.path().join("out/solo.png")).unwrap().to_rgba8();
        assert_eq!(out.dimensions(), (32, 32));
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(*out.get_pixel(16, 16), RED);
    }
}
