//! Collaborator interfaces: sending requests and semantic ranking.
//!
//! The engine never talks to the network itself. A [`Transport`] receives a
//! fully resolved request; a [`SemanticRanker`] may replace the lexical
//! ranking during discovery. Both are supplied by the embedding application.

use crate::dispatch::ResolvedRequest;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Sends a resolved request and returns the response body.
pub trait Transport: Send + Sync {
    fn send(&self, request: &ResolvedRequest) -> Result<Value, TransportError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RankerError(pub String);

/// One ranked action name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAction {
    pub name: String,
    pub score: f64,
}

impl RankedAction {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// External ranking service (for example an embedding-based search API).
///
/// Returns action names best first. Names may come back in a versioned form
/// such as `bamboohr_1.0.0_bamboohr_list_employees_global`; discovery
/// normalises them before matching against the catalog.
pub trait SemanticRanker: Send + Sync {
    fn rank(
        &self,
        query: &str,
        candidates: &[String],
        limit: usize,
    ) -> Result<Vec<RankedAction>, RankerError>;
}
