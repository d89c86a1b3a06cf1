//! Type definitions for the action catalog.

use crate::catalog::schema::ParamSchema;
use crate::error::CatalogError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Header that scopes a request to a linked account.
pub const ACCOUNT_HEADER: &str = "x-account-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "delete")]
    Delete,
    #[serde(alias = "head")]
    Head,
    #[serde(alias = "options")]
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter goes in the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyEncoding {
    Json,
    #[serde(alias = "form-urlencoded")]
    Form,
}

/// How an action turns into an HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteTemplate {
    #[serde(default)]
    pub method: HttpMethod,
    /// URL with `{name}` placeholders for path parameters.
    pub url: String,
    #[serde(default)]
    pub parameter_locations: IndexMap<String, ParameterLocation>,
    #[serde(default)]
    pub body_type: Option<BodyEncoding>,
    /// Headers sent with every request for this action.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl ExecuteTemplate {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            parameter_locations: IndexMap::new(),
            body_type: None,
            headers: BTreeMap::new(),
        }
    }

    /// Names of the `{placeholder}` segments in the URL template, in order.
    pub fn path_placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.url.as_str();
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    names.push(&after[..end]);
                    rest = &after[end + 1..];
                }
                None => break,
            }
        }
        names
    }
}

/// Immutable description of one remote operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: IndexMap<String, ParamSchema>,
    pub execute: ExecuteTemplate,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>, execute: ExecuteTemplate) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: IndexMap::new(),
            execute,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        schema: ParamSchema,
        location: ParameterLocation,
    ) -> Self {
        let name = name.into();
        self.execute
            .parameter_locations
            .insert(name.clone(), location);
        self.parameters.insert(name, schema);
        self
    }

    /// Effective location of a declared parameter.
    ///
    /// Parameters without an explicit location go to the body when the action
    /// has a body encoding and to the query string otherwise.
    pub fn location_of(&self, param: &str) -> ParameterLocation {
        match self.execute.parameter_locations.get(param) {
            Some(location) => *location,
            None if self.execute.body_type.is_some() => ParameterLocation::Body,
            None => ParameterLocation::Query,
        }
    }

    /// Name of the account-scoping header parameter, if the action declares one.
    pub fn account_header_param(&self) -> Option<&str> {
        self.parameters
            .keys()
            .find(|name| {
                name.eq_ignore_ascii_case(ACCOUNT_HEADER)
                    && self.location_of(name) == ParameterLocation::Header
            })
            .map(String::as_str)
    }

    /// Lowercase connector prefix, e.g. `hris` for `hris_list_employees`.
    pub fn connector(&self) -> String {
        connector_of(&self.name)
    }

    /// Check the structural invariants of the descriptor.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.is_empty() {
            return Err(CatalogError::malformed("<unnamed>", "action name is empty"));
        }

        for placeholder in self.execute.path_placeholders() {
            if !self.parameters.contains_key(placeholder) {
                return Err(CatalogError::malformed(
                    &self.name,
                    format!("url placeholder '{{{}}}' has no parameter", placeholder),
                ));
            }
            if self.location_of(placeholder) != ParameterLocation::Path {
                return Err(CatalogError::malformed(
                    &self.name,
                    format!("url placeholder '{{{}}}' is not located at path", placeholder),
                ));
            }
        }

        let placeholders = self.execute.path_placeholders();
        for (param, location) in &self.execute.parameter_locations {
            if !self.parameters.contains_key(param) {
                return Err(CatalogError::malformed(
                    &self.name,
                    format!("location given for undeclared parameter '{}'", param),
                ));
            }
            match location {
                ParameterLocation::Path if !placeholders.contains(&param.as_str()) => {
                    return Err(CatalogError::malformed(
                        &self.name,
                        format!("path parameter '{}' does not appear in the url", param),
                    ));
                }
                ParameterLocation::Body if self.execute.body_type.is_none() => {
                    return Err(CatalogError::malformed(
                        &self.name,
                        format!("parameter '{}' targets the body but no body_type is set", param),
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Connector prefix of an action name (text before the first `_`, lowercased).
pub fn connector_of(name: &str) -> String {
    name.split('_').next().unwrap_or(name).to_lowercase()
}

/// An ordered collection of descriptors with unique names.
///
/// Cloning is cheap: descriptors are reference counted and shared between
/// the full catalog and any filtered working sets derived from it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    actions: Vec<Arc<ActionDescriptor>>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, validating every descriptor and name uniqueness.
    pub fn new(descriptors: Vec<ActionDescriptor>) -> Result<Self, CatalogError> {
        let mut actions = Vec::with_capacity(descriptors.len());
        let mut by_name = HashMap::with_capacity(descriptors.len());

        for descriptor in descriptors {
            descriptor.validate()?;
            if by_name.contains_key(&descriptor.name) {
                return Err(CatalogError::DuplicateName(descriptor.name));
            }
            by_name.insert(descriptor.name.clone(), actions.len());
            actions.push(Arc::new(descriptor));
        }

        Ok(Self { actions, by_name })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ActionDescriptor>> {
        self.by_name.get(name).map(|&idx| &self.actions[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ActionDescriptor>> {
        self.actions.iter()
    }

    /// Action names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|a| a.name.as_str())
    }

    /// Distinct connector prefixes across the catalog.
    pub fn connectors(&self) -> BTreeSet<String> {
        self.actions.iter().map(|a| a.connector()).collect()
    }

    /// A new catalog holding the actions for which `keep` returns true,
    /// preserving order. Descriptors are shared, not copied.
    pub fn retain<F>(&self, mut keep: F) -> Catalog
    where
        F: FnMut(&ActionDescriptor) -> bool,
    {
        let mut actions = Vec::new();
        let mut by_name = HashMap::new();
        for action in &self.actions {
            if keep(action) {
                by_name.insert(action.name.clone(), actions.len());
                actions.push(Arc::clone(action));
            }
        }
        Catalog { actions, by_name }
    }
}
