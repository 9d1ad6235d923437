//! Export class classification.
//!
//! Class names are discovered at runtime from package tables, so this is a
//! data-driven lookup from name to category, not a dispatch hierarchy.

use crate::PackageSummary;

/// The four tracked content categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    /// Skeletal or destructible meshes.
    SkeletalMesh,
    /// Static meshes.
    StaticMesh,
    /// Animation assets.
    Animation,
    /// Any texture class.
    Texture,
}

/// Map a class name to its tracked category, case-insensitively.
///
/// Texture classes come in many variants (`Texture2D`, `TextureCube`, ...)
/// and are matched by prefix; everything else is an exact name.
pub fn classify_class_name(class_name: &str) -> Option<AssetClass> {
    if class_name
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("texture"))
    {
        return Some(AssetClass::Texture);
    }

    const SKELETAL: &[&str] = &["SkeletalMesh", "DestructibleMesh"];
    const ANIMATION: &[&str] = &["AnimSequence", "AnimSet", "MeshAnimation"];

    if SKELETAL.iter().any(|n| n.eq_ignore_ascii_case(class_name)) {
        Some(AssetClass::SkeletalMesh)
    } else if class_name.eq_ignore_ascii_case("StaticMesh") {
        Some(AssetClass::StaticMesh)
    } else if ANIMATION.iter().any(|n| n.eq_ignore_ascii_case(class_name)) {
        Some(AssetClass::Animation)
    } else {
        None
    }
}

/// Per-package tallies of the tracked categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    pub skeletal_mesh: u32,
    pub static_mesh: u32,
    pub animation: u32,
    pub texture: u32,
}

impl ClassCounts {
    /// Increment the counter for a category.
    pub fn add(&mut self, class: AssetClass) {
        match class {
            AssetClass::SkeletalMesh => self.skeletal_mesh += 1,
            AssetClass::StaticMesh => self.static_mesh += 1,
            AssetClass::Animation => self.animation += 1,
            AssetClass::Texture => self.texture += 1,
        }
    }

    /// Scan a summary's export table once and tally matching classes.
    /// Non-matching classes are ignored.
    pub fn tally(summary: &PackageSummary) -> Self {
        let mut counts = Self::default();
        for export in &summary.exports {
            if let Some(class) = summary
                .export_class_name(export)
                .and_then(classify_class_name)
            {
                counts.add(class);
            }
        }
        counts
    }

    /// Whether no export matched any tracked category.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::build::package_bytes;

    #[test]
    fn test_classify_names() {
        assert_eq!(
            classify_class_name("SkeletalMesh"),
            Some(AssetClass::SkeletalMesh)
        );
        assert_eq!(
            classify_class_name("destructiblemesh"),
            Some(AssetClass::SkeletalMesh)
        );
        assert_eq!(classify_class_name("STATICMESH"), Some(AssetClass::StaticMesh));
        assert_eq!(classify_class_name("AnimSequence"), Some(AssetClass::Animation));
        assert_eq!(classify_class_name("Texture2D"), Some(AssetClass::Texture));
        assert_eq!(classify_class_name("TextureCube"), Some(AssetClass::Texture));
        assert_eq!(classify_class_name("texture"), Some(AssetClass::Texture));
        assert_eq!(classify_class_name("Material"), None);
        assert_eq!(classify_class_name("Tex"), None);
    }

    #[test]
    fn test_tally_counts() {
        let data = package_bytes(
            &["StaticMesh", "Texture2D", "Material"],
            &[
                ("SM_A", 0),
                ("SM_B", 0),
                ("SM_C", 0),
                ("T_D", 1),
                ("M_E", 2), // untracked class, ignored
            ],
            b"",
        );
        let summary = PackageSummary::parse(&data).unwrap();
        assert_eq!(
            summary.classes,
            ClassCounts {
                skeletal_mesh: 0,
                static_mesh: 3,
                animation: 0,
                texture: 1,
            }
        );
        assert!(!summary.classes.is_empty());
    }
}
