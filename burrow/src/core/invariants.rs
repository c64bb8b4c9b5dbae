//! Semantic invariants not expressible via JSON Schema.

use crate::core::materials::MaterialClassification;
use crate::core::path_stack::PathStack;

/// Check the material table:
/// - No id is both rare and excluded
/// - Equivalence groups are non-empty and free of excluded ids
pub fn validate_materials(table: &MaterialClassification) -> Vec<String> {
    let mut errors = Vec::new();
    for id in table.rare.intersection(&table.excluded) {
        errors.push(format!("'{id}' is both rare and excluded"));
    }
    for (id, group) in &table.equivalents {
        if group.is_empty() {
            errors.push(format!("equivalents['{id}'] must not be empty"));
        }
        for member in group {
            if table.excluded.contains(member) {
                errors.push(format!(
                    "equivalents['{id}'] contains excluded id '{member}'"
                ));
            }
        }
    }
    errors
}

/// Check that every entry is a single unit step on its axis.
pub fn validate_path_stack(stack: &PathStack) -> Vec<String> {
    stack
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.target.abs_diff(entry.origin) != 1)
        .map(|(index, entry)| {
            format!(
                "path[{index}]: {} move {} -> {} is not a unit step",
                entry.axis, entry.origin, entry.target
            )
        })
        .collect()
}
