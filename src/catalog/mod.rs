//! Action catalog: descriptors, parameter schemas and JSON loading.
//!
//! A catalog is built once per session from an external source and is
//! read-only afterwards. Everything else in the crate borrows from it.

pub mod loader;
pub mod schema;
pub mod types;

pub use loader::{load_catalog_file, parse_catalog};
pub use schema::{ParamSchema, SchemaKind};
pub use types::{
    connector_of, ActionDescriptor, BodyEncoding, Catalog, ExecuteTemplate, HttpMethod,
    ParameterLocation, ACCOUNT_HEADER,
};
