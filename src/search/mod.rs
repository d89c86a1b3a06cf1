//! Local lexical search over action catalogs.
//!
//! This is the in-process default for discovery: no model files, no network,
//! and the same query over the same catalog always ranks the same way.

pub mod index;
pub mod synonyms;
pub mod tokenize;

pub use index::{ScoredDocument, ScoringWeights, SearchIndex};
pub use synonyms::Synonyms;
pub use tokenize::{tokenize, tokenize_identifier};

use crate::catalog::{ActionDescriptor, Catalog};

/// How many times name tokens are repeated in an action's document.
pub const DEFAULT_NAME_WEIGHT: usize = 3;

/// Searchable text for an action: name tokens (repeated `name_weight`
/// times so exact name matches rank first), description, parameter names.
pub fn action_document(action: &ActionDescriptor, name_weight: usize) -> String {
    let name_tokens = tokenize_identifier(&action.name).join(" ");

    let mut parts: Vec<&str> = Vec::with_capacity(name_weight + 2);
    for _ in 0..name_weight.max(1) {
        parts.push(&name_tokens);
    }
    parts.push(&action.description);

    let param_tokens: Vec<String> = action
        .parameters
        .keys()
        .flat_map(|p| tokenize_identifier(p))
        .collect();
    let param_tokens = param_tokens.join(" ");
    parts.push(&param_tokens);

    parts.join(" ")
}

/// Build an index over every action of `catalog`.
pub fn index_catalog(
    catalog: &Catalog,
    name_weight: usize,
    weights: ScoringWeights,
    synonyms: Synonyms,
) -> SearchIndex {
    let documents = catalog
        .iter()
        .map(|action| (action.name.clone(), action_document(action, name_weight)))
        .collect();
    SearchIndex::build_with(documents, weights, synonyms)
}
