use crate::api_types::ModelInfo;

/// Identifiers containing this (case-insensitive) belong to the primary family.
pub const LINEAGE_MARKER: &str = "llama-3";

pub fn is_primary_family(identifier: &str) -> bool {
    identifier.to_lowercase().contains(LINEAGE_MARKER)
}

/// Split models into (primary family, alternatives), preserving order within each side.
pub fn partition(models: Vec<ModelInfo>) -> (Vec<ModelInfo>, Vec<ModelInfo>) {
    models
        .into_iter()
        .partition(|model| is_primary_family(&model.name))
}
