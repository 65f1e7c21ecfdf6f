//! Per-icon exceptions to the generic variant derivation
//!
//! A handful of icons in the source sets do not follow the regular rules:
//! their badge glyph is mirrored, their badge-bearing glyph is shifted, or
//! their variant is published under an unrelated name. All of those
//! exceptions live in this module as lookup tables so the placement algorithm
//! itself stays uniform.

use crate::catalog::VariantKind;
use crate::compose::Corner;
use std::collections::{HashMap, HashSet};

/// Icons whose name contains the variant separator but which are plain base
/// icons, not variants.
pub const DOUBLE_HYPHEN_BASES: &[&str] = &["exclamation--frame"];

/// Icons whose `pencil` variant carries a horizontally flipped pencil.
pub const MIRRORED_PENCILS: &[&str] = &[
    "ear",
    "tag",
    "leaf",
    "pill",
    "plug",
    "broom",
    "eraser",
    "puzzle",
    "ticket",
    "bookmark",
    "lightning",
];

/// A variant icon published under a name unrelated to its base icon.
///
/// It is produced by compositing the plain badge for `kind` onto the
/// upscaled `base` at a fixed `corner`, with no quadrant search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedVariant {
    /// Output file stem
    pub output: &'static str,
    /// Base icon whose upscaled image receives the badge
    pub base: &'static str,
    /// Badge to composite
    pub kind: VariantKind,
    /// Fixed anchor corner
    pub corner: Corner,
}

/// Variants that do not follow the `<base>--<variant>` convention.
pub const DERIVED_VARIANTS: &[DerivedVariant] = &[DerivedVariant {
    output: "layout-design",
    base: "layout-hf-2",
    kind: VariantKind::Pencil,
    corner: Corner::BottomLeft,
}];

/// Whether `stem` is a base icon despite containing the variant separator.
pub fn is_double_hyphen_base(stem: &str) -> bool {
    DOUBLE_HYPHEN_BASES.contains(&stem)
}

/// All per-icon corrections in effect for one pass.
///
/// Displacement offsets are measured in native (low-resolution) pixels;
/// positive values shift right.
#[derive(Debug, Clone, Default)]
pub struct Corrections {
    displacements: HashMap<(String, VariantKind), i32>,
    mirrored_pencils: HashSet<String>,
    derived: Vec<DerivedVariant>,
}

impl Corrections {
    /// The built-in tables with no displacement entries.
    pub fn builtin() -> Self {
        Self {
            displacements: HashMap::new(),
            mirrored_pencils: MIRRORED_PENCILS.iter().map(|s| s.to_string()).collect(),
            derived: DERIVED_VARIANTS.to_vec(),
        }
    }

    /// Register a displacement offset for `(icon, kind)`.
    ///
    /// A zero offset removes any existing entry.
    pub fn with_displacement(mut self, icon: &str, kind: VariantKind, offset: i32) -> Self {
        self.set_displacement(icon, kind, offset);
        self
    }

    pub fn set_displacement(&mut self, icon: &str, kind: VariantKind, offset: i32) {
        let key = (icon.to_string(), kind);
        if offset == 0 {
            self.displacements.remove(&key);
        } else {
            self.displacements.insert(key, offset);
        }
    }

    /// Offset in native pixels for `(icon, kind)`, zero when uncorrected.
    pub fn displacement(&self, icon: &str, kind: VariantKind) -> i32 {
        self.displacements.get(&(icon.to_string(), kind)).copied().unwrap_or(0)
    }

    /// Whether any variant of `icon` needs displacement correction.
    pub fn is_displaced(&self, icon: &str) -> bool {
        self.displacements.keys().any(|(name, _)| name == icon)
    }

    /// Whether the pencil variant of `icon` uses the mirrored pencil badge.
    pub fn uses_mirrored_pencil(&self, icon: &str) -> bool {
        self.mirrored_pencils.contains(icon)
    }

    pub fn derived(&self) -> &[DerivedVariant] {
        &self.derived
    }
}
