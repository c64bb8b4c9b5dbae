//! Storage-capacity decision for a single removal.
//!
//! Slots are discrete with per-slot stacking limits and unlike materials never
//! share a slot, so "is there room" depends on which materials the removal
//! will produce.

use serde::{Deserialize, Serialize};

/// Snapshot of one storage slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Material held, `None` when the slot is empty.
    pub material: Option<String>,
    pub count: u32,
    /// Units that can still be added to this slot.
    pub space: u32,
}

impl Slot {
    pub fn empty(space: u32) -> Self {
        Self {
            material: None,
            count: 0,
            space,
        }
    }

    pub fn holding(material: &str, count: u32, space: u32) -> Self {
        Self {
            material: Some(material.to_string()),
            count,
            space,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.material.is_none() || self.count == 0
    }

    fn accepts(&self, material: &str) -> bool {
        self.space > 0 && self.material.as_deref() == Some(material)
    }
}

/// Decide whether removing a cell that yields `equivalence_set` fits in `slots`.
///
/// - Any fully empty slot can absorb one new material: permitted.
/// - Otherwise every member of the set needs a partially filled slot already
///   holding exactly that material with spare room.
pub fn removal_permitted(slots: &[Slot], equivalence_set: &[String]) -> bool {
    if slots.iter().any(Slot::is_empty) {
        return true;
    }
    equivalence_set
        .iter()
        .all(|material| slots.iter().any(|slot| slot.accepts(material)))
}
