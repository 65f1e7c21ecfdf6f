//! Icon catalog: the ordered base icons of one icon set
//!
//! The catalog order is the only link between an icon's name and its pixels
//! once the icons have been through the montage and the upscaler. Ordinals
//! are assigned once, contiguously from zero, and never change afterwards.

use crate::corrections::{self, Corrections};
use glob::glob;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Separator between a base icon name and its variant kind.
pub const VARIANT_SEPARATOR: &str = "--";

/// The five kinds of overlay badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    Arrow,
    Exclamation,
    Minus,
    Pencil,
    Plus,
}

impl VariantKind {
    pub const ALL: [VariantKind; 5] = [
        VariantKind::Arrow,
        VariantKind::Exclamation,
        VariantKind::Minus,
        VariantKind::Pencil,
        VariantKind::Plus,
    ];

    /// Parse a variant kind from its file-name spelling
    pub fn from_str(s: &str) -> Option<VariantKind> {
        match s {
            "arrow" => Some(VariantKind::Arrow),
            "exclamation" => Some(VariantKind::Exclamation),
            "minus" => Some(VariantKind::Minus),
            "pencil" => Some(VariantKind::Pencil),
            "plus" => Some(VariantKind::Plus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Arrow => "arrow",
            VariantKind::Exclamation => "exclamation",
            VariantKind::Minus => "minus",
            VariantKind::Pencil => "pencil",
            VariantKind::Plus => "plus",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// Manifest could not be read
    #[error("Failed to read manifest '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The same base icon appears twice
    #[error("Duplicate icon '{0}' in catalog")]
    Duplicate(String),
    /// No base icons at all
    #[error("Catalog contains no base icons")]
    Empty,
    /// A catalog entry has no source file
    #[error("Icon '{name}' is listed in the catalog but '{}' does not exist", path.display())]
    MissingSource { name: String, path: PathBuf },
    /// A source file could not be decoded
    #[error("Failed to load '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// Directory scan pattern was invalid
    #[error("Invalid source directory pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Stable name and position of a base icon.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IconIdentity {
    pub name: String,
    pub ordinal: usize,
}

/// One base icon and what the catalog knows about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub identity: IconIdentity,
    /// Variant kinds this icon has, in [`VariantKind::ALL`] order
    pub variants: Vec<VariantKind>,
    /// Whether any of its variants needs displacement correction
    pub displaced: bool,
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn has_variant(&self, kind: VariantKind) -> bool {
        self.variants.contains(&kind)
    }
}

/// File stem of the `kind` variant of `base`.
pub fn variant_name(base: &str, kind: VariantKind) -> String {
    format!("{}{}{}", base, VARIANT_SEPARATOR, kind)
}

/// Split a file stem into `(base, kind)` if it names a known variant.
pub fn split_variant(stem: &str) -> Option<(&str, VariantKind)> {
    if corrections::is_double_hyphen_base(stem) {
        return None;
    }
    let (base, suffix) = stem.rsplit_once(VARIANT_SEPARATOR)?;
    VariantKind::from_str(suffix).map(|kind| (base, kind))
}

/// Path of the source file for icon `stem` inside `dir`.
pub fn source_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}.png", stem))
}

/// Ordered base icons of one icon set.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from an ordered list of file names.
    ///
    /// Entries are icon file names with or without the `.png` suffix. Names
    /// found in `renames` are substituted before classification. Variant
    /// entries (`<base>--<kind>`) tag their base icon; every other entry
    /// becomes a base icon in list order.
    pub fn from_names<'a, I>(
        names: I,
        renames: &HashMap<String, String>,
        corrections: &Corrections,
    ) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut bases: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        let mut variants: HashMap<String, BTreeSet<VariantKind>> = HashMap::new();

        for raw in names {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let stem = trimmed.strip_suffix(".png").unwrap_or(trimmed);
            let stem = renames.get(stem).map(String::as_str).unwrap_or(stem);

            if let Some((base, kind)) = split_variant(stem) {
                variants.entry(base.to_string()).or_default().insert(kind);
            } else if stem.contains(VARIANT_SEPARATOR) && !corrections::is_double_hyphen_base(stem)
            {
                log::debug!("Ignoring '{}': unknown variant kind", stem);
            } else {
                if !seen.insert(stem.to_string()) {
                    return Err(CatalogError::Duplicate(stem.to_string()));
                }
                bases.push(stem.to_string());
            }
        }

        if bases.is_empty() {
            return Err(CatalogError::Empty);
        }

        let entries = bases
            .into_iter()
            .enumerate()
            .map(|(ordinal, name)| {
                let kinds = variants.remove(&name).map(|k| k.into_iter().collect()).unwrap_or_default();
                let displaced = corrections.is_displaced(&name);
                CatalogEntry { identity: IconIdentity { name, ordinal }, variants: kinds, displaced }
            })
            .collect();

        for orphan in variants.keys() {
            log::debug!("Ignoring variants of '{}': no such base icon", orphan);
        }

        Ok(Self { entries })
    }

    /// Parse a plain-text manifest with one icon file name per line.
    pub fn from_manifest(
        text: &str,
        renames: &HashMap<String, String>,
        corrections: &Corrections,
    ) -> Result<Self, CatalogError> {
        Self::from_names(text.lines(), renames, corrections)
    }

    /// Read and parse a manifest file.
    pub fn load_manifest(
        path: &Path,
        renames: &HashMap<String, String>,
        corrections: &Corrections,
    ) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| CatalogError::Io { path: path.to_path_buf(), source })?;
        Self::from_manifest(&text, renames, corrections)
    }

    /// Build a catalog from every `*.png` in `dir`, sorted by file stem.
    pub fn from_directory(
        dir: &Path,
        renames: &HashMap<String, String>,
        corrections: &Corrections,
    ) -> Result<Self, CatalogError> {
        let pattern = format!("{}/*.png", glob::Pattern::escape(&dir.display().to_string()));
        let mut stems: Vec<String> = glob(&pattern)?
            .filter_map(Result::ok)
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        stems.sort();

        Self::from_names(stems.iter().map(String::as_str), renames, corrections)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a base icon by name.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Total number of variants across all base icons.
    pub fn variant_count(&self) -> usize {
        self.entries.iter().map(|e| e.variants.len()).sum()
    }

    /// Load the low-resolution source image of every base icon, in order.
    ///
    /// A catalog entry without a source file is a fatal error.
    pub fn load_sources(&self, dir: &Path) -> Result<Vec<RgbaImage>, CatalogError> {
        self.entries.iter().map(|entry| load_icon(dir, entry.name())).collect()
    }
}

/// Load one icon from `dir`, failing if it does not exist.
pub fn load_icon(dir: &Path, stem: &str) -> Result<RgbaImage, CatalogError> {
    let path = source_path(dir, stem);
    if !path.exists() {
        return Err(CatalogError::MissingSource { name: stem.to_string(), path });
    }
    image::open(&path)
        .map(|img| img.to_rgba8())
        .map_err(|source| CatalogError::Image { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_renames() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_manifest_order_and_ordinals() {
        let manifest = "zebra.png\napple.png\n\nmango.png\n";
        let catalog =
            Catalog::from_manifest(manifest, &no_renames(), &Corrections::builtin()).unwrap();

        let names: Vec<_> = catalog.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["zebra", "apple", "mango"]);
        for (i, entry) in catalog.entries().iter().enumerate() {
            assert_eq!(entry.identity.ordinal, i);
        }
    }

    #[test]
    fn test_variants_tag_base() {
        let manifest = "folder.png\nfolder--plus.png\nfolder--minus.png\nfolder--sparkle.png\nbox.png";
        let catalog =
            Catalog::from_manifest(manifest, &no_renames(), &Corrections::builtin()).unwrap();

        assert_eq!(catalog.len(), 2);
        let folder = catalog.get("folder").unwrap();
        assert_eq!(folder.variants, vec![VariantKind::Minus, VariantKind::Plus]);
        assert!(catalog.get("box").unwrap().variants.is_empty());
        assert_eq!(catalog.variant_count(), 2);
        assert!(catalog.get("folder--sparkle").is_none());
    }

    #[test]
    fn test_double_hyphen_base_is_kept() {
        let manifest = "exclamation.png\nexclamation--frame.png";
        let catalog =
            Catalog::from_manifest(manifest, &no_renames(), &Corrections::builtin()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("exclamation--frame").is_some());
    }

    #[test]
    fn test_renames_applied_before_classification() {
        let renames = HashMap::from([("folder-plus".to_string(), "folder--plus".to_string())]);
        let manifest = "folder.png\nfolder-plus.png";
        let catalog = Catalog::from_manifest(manifest, &renames, &Corrections::builtin()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("folder").unwrap().has_variant(VariantKind::Plus));
    }

    #[test]
    fn test_duplicate_is_fatal() {
        let result = Catalog::from_manifest("a.png\na.png", &no_renames(), &Corrections::builtin());
        assert!(matches!(result, Err(CatalogError::Duplicate(name)) if name == "a"));
    }

    #[test]
    fn test_empty_is_fatal() {
        let result = Catalog::from_manifest("\n\n", &no_renames(), &Corrections::builtin());
        assert!(matches!(result, Err(CatalogError::Empty)));
    }

    #[test]
    fn test_displaced_flag() {
        let corrections = Corrections::builtin().with_displacement("gear", VariantKind::Plus, 1);
        let catalog = Catalog::from_manifest("gear\ngear--plus\ncog", &no_renames(), &corrections)
            .unwrap();
        assert!(catalog.get("gear").unwrap().displaced);
        assert!(!catalog.get("cog").unwrap().displaced);
    }

    #[test]
    fn test_split_variant() {
        assert_eq!(split_variant("folder--plus"), Some(("folder", VariantKind::Plus)));
        assert_eq!(split_variant("a--b--pencil"), Some(("a--b", VariantKind::Pencil)));
        assert_eq!(split_variant("folder"), None);
        assert_eq!(split_variant("exclamation--frame"), None);
        assert_eq!(variant_name("folder", VariantKind::Arrow), "folder--arrow");
    }

    #[test]
    fn test_from_directory_sorted() {
        let temp = TempDir::new().unwrap();
        for name in ["b", "a", "a--plus", "c"] {
            let img = RgbaImage::new(2, 2);
            img.save(temp.path().join(format!("{}.png", name))).unwrap();
        }
        std::fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let catalog =
            Catalog::from_directory(temp.path(), &no_renames(), &Corrections::builtin()).unwrap();
        let names: Vec<_> = catalog.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(catalog.get("a").unwrap().has_variant(VariantKind::Plus));
    }

    #[test]
    fn test_load_sources_missing_is_fatal() {
        let temp = TempDir::new().unwrap();
        RgbaImage::new(2, 2).save(temp.path().join("present.png")).unwrap();

        let catalog =
            Catalog::from_manifest("present\nabsent", &no_renames(), &Corrections::builtin())
                .unwrap();
        let result = catalog.load_sources(temp.path());
        assert!(matches!(result, Err(CatalogError::MissingSource { name, .. }) if name == "absent"));
    }
}
