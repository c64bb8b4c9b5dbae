//! Material classification: equivalence groups, exclusions and rarity.
//!
//! Loaded once per run (see `io::materials`) and treated as immutable.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Table mapping material ids to their storage-equivalence groups.
///
/// The serialized form is the on-disk `materials.json` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialClassification {
    /// Material id -> ids that must each find a landing slot before the
    /// material may be removed (e.g. an ore and the items it yields).
    pub equivalents: BTreeMap<String, Vec<String>>,
    /// Ids never treated as desirable, even next to a rare find.
    pub excluded: BTreeSet<String>,
    /// Ids whose discovery widens vein expansion to any adjacent occupied cell.
    pub rare: BTreeSet<String>,
}

impl MaterialClassification {
    /// Ids that must all have room in storage for `material` to be removed.
    ///
    /// Unlisted materials form a singleton group.
    pub fn equivalence_set(&self, material: &str) -> Vec<String> {
        match self.equivalents.get(material) {
            Some(group) if !group.is_empty() => group.clone(),
            _ => vec![material.to_string()],
        }
    }

    pub fn is_excluded(&self, material: &str) -> bool {
        self.excluded.contains(material)
    }

    pub fn is_rare(&self, material: &str) -> bool {
        self.rare.contains(material) && !self.is_excluded(material)
    }

    /// True if vein exploration should expand into `material`.
    pub fn is_desirable(&self, material: &str) -> bool {
        if self.is_excluded(material) {
            return false;
        }
        self.equivalents.contains_key(material)
            || self.rare.contains(material)
            || looks_like_ore(material)
    }
}

/// `namespace:iron_ore` and `iron_ore` both count; `ore_lamp` does not.
fn looks_like_ore(material: &str) -> bool {
    let name = material
        .rsplit_once(':')
        .map_or(material, |(_, name)| name);
    name.ends_with("_ore")
}
