//! Registry status aggregation.

use serde::Serialize;

use crate::model::Entity;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Counts per collection plus the global gate. Recomputed on every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatus {
    pub enabled: bool,
    pub tools_count: usize,
    pub enabled_tools_count: usize,
    pub prompts_count: usize,
    pub enabled_prompts_count: usize,
    pub resources_count: usize,
    pub enabled_resources_count: usize,
}

/// Total and enabled count of one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub enabled: usize,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Counts {
    /// Count the entities in a collection.
    pub fn of<T: Entity>(items: &[T]) -> Self {
        Self {
            total: items.len(),
            enabled: items.iter().filter(|item| item.enabled()).count(),
        }
    }
}

impl RegistryStatus {
    pub fn new(enabled: bool, tools: Counts, prompts: Counts, resources: Counts) -> Self {
        Self {
            enabled,
            tools_count: tools.total,
            enabled_tools_count: tools.enabled,
            prompts_count: prompts.total,
            enabled_prompts_count: prompts.enabled,
            resources_count: resources.total,
            enabled_resources_count: resources.enabled,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
