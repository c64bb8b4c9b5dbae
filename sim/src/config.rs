//! Agent configuration merging.
//!
//! Applies case-specific overrides to the default agent configuration.

use anyhow::{Result, bail};
use burrow::io::config::AgentConfig;

use crate::case::CaseConfig;

/// Apply case configuration overrides to the base agent config.
pub fn apply_case_config(mut base: AgentConfig, overrides: &CaseConfig) -> Result<AgentConfig> {
    if let Some(reserve) = overrides.reserve {
        base.fuel.reserve = reserve;
    }
    if let Some(refuel_target) = overrides.refuel_target {
        base.fuel.refuel_target = refuel_target;
    }
    if let Some(debris_retries) = overrides.debris_retries {
        base.excavation.debris_retries = debris_retries;
    }
    if let Some(travel_y) = overrides.travel_y {
        base.base.travel_y = travel_y;
    }
    if let Some(direction) = overrides.drop_direction {
        base.base.drop_direction = direction;
    }
    if let Some(direction) = overrides.fuel_direction {
        base.base.fuel_direction = direction;
    }
    if base.base.drop_direction == base.base.fuel_direction {
        bail!("drop and fuel containers must be in different directions");
    }
    base.validate()?;
    Ok(base)
}
