//! actiondex - tool catalog and retrieval engine for AI agents
//!
//! Loads a catalog of declarative API actions, narrows it with glob
//! filters, finds actions for a natural-language intent with a local
//! BM25 + TF-IDF index (or an external semantic ranker) and resolves
//! action calls into concrete HTTP requests.

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod search;
pub mod snapshot;
pub mod state;
pub mod transport;

// Re-export key types for convenience
pub use catalog::{load_catalog_file, parse_catalog, ActionDescriptor, Catalog, ParamSchema};
pub use config::Config;
pub use discovery::{AccountRequest, BoundAction, DiscoverOptions, LinkedAccount, Toolset};
pub use dispatch::{build_request, ResolvedRequest};
pub use error::{AppError, CatalogError, DispatchError, Result};
pub use filter::{filter, select, FilterSet};
pub use search::SearchIndex;
pub use state::AppState;
pub use transport::{RankedAction, RankerError, SemanticRanker, Transport, TransportError};
