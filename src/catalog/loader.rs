//! Catalog loading from JSON documents.
//!
//! Accepts either a bare array of action descriptors or an object with an
//! `actions` array. A malformed descriptor fails the whole load.

use crate::catalog::types::{ActionDescriptor, Catalog};
use crate::error::CatalogError;
use serde_json::Value;
use std::path::Path;

/// Read and validate a catalog from a JSON file.
pub fn load_catalog_file(path: &Path) -> Result<Catalog, CatalogError> {
    let raw = std::fs::read_to_string(path)?;
    let json: Value = serde_json::from_str(&raw)?;
    let catalog = parse_catalog(&json)?;

    tracing::info!(
        path = %path.display(),
        actions = catalog.len(),
        connectors = catalog.connectors().len(),
        "Catalog loaded"
    );

    Ok(catalog)
}

/// Build a catalog from an already parsed JSON document.
pub fn parse_catalog(json: &Value) -> Result<Catalog, CatalogError> {
    let entries = extract_actions_array(json)?;

    let mut descriptors = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        descriptors.push(parse_descriptor(idx, entry)?);
    }

    tracing::debug!(total = descriptors.len(), "Action descriptors parsed");

    Catalog::new(descriptors)
}

/// Navigates to the descriptor list: root array, or root -> actions.
fn extract_actions_array(json: &Value) -> Result<&Vec<Value>, CatalogError> {
    json.as_array()
        .or_else(|| json.get("actions").and_then(|a| a.as_array()))
        .ok_or_else(|| {
            CatalogError::malformed(
                "<catalog>",
                "expected a JSON array or an object with an 'actions' array",
            )
        })
}

fn parse_descriptor(idx: usize, entry: &Value) -> Result<ActionDescriptor, CatalogError> {
    // Name first so parse failures can say which action is broken.
    let label = entry
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("<entry {}>", idx));

    serde_json::from_value(entry.clone()).map_err(|e| {
        tracing::error!(index = idx, action = %label, error = %e, "Malformed action descriptor");
        CatalogError::malformed(&label, e.to_string())
    })
}
