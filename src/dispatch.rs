//! Declarative request dispatch.
//!
//! [`build_request`] turns an [`ActionDescriptor`] plus caller arguments into
//! a transport-ready [`ResolvedRequest`]. It performs no I/O, so identical
//! inputs always produce identical requests; sending is left to a
//! [`Transport`](crate::transport::Transport).
//!
//! # Flow
//! 1. Required parameters present (account header may come from context)
//! 2. No undeclared arguments
//! 3. Structural check of each value against its schema
//! 4. Defaults applied for absent parameters
//! 5. Values partitioned into path / query / header / body

use crate::catalog::{
    ActionDescriptor, BodyEncoding, HttpMethod, ParameterLocation, SchemaKind,
};
use crate::error::DispatchError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A fully resolved HTTP request. Maps are sorted so serialisation is stable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<BodyEncoding>,
}

impl ResolvedRequest {
    /// URL including the percent-encoded query string.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, query.join("&"))
    }
}

/// Build the request for `descriptor` from `args`.
///
/// `account_header` supplies the `x-account-id` header when the action
/// declares it and the caller did not pass it explicitly.
pub fn build_request(
    descriptor: &ActionDescriptor,
    account_header: Option<&str>,
    args: &Map<String, Value>,
) -> Result<ResolvedRequest, DispatchError> {
    let account_param = descriptor.account_header_param();

    // 1. Required parameters
    for (name, schema) in &descriptor.parameters {
        if !schema.is_required() || args.contains_key(name) {
            continue;
        }
        if Some(name.as_str()) == account_param {
            if account_header.is_none() {
                return Err(DispatchError::MissingAccountContext(name.clone()));
            }
            continue;
        }
        return Err(DispatchError::MissingParameter(name.clone()));
    }

    // 2. Undeclared arguments
    if let Some(unknown) = args.keys().find(|k| !descriptor.parameters.contains_key(*k)) {
        return Err(DispatchError::UnknownParameter(unknown.clone()));
    }

    // 3. Structural check. Null on a defaulted parameter means "leave it out".
    for (name, value) in args {
        let schema = &descriptor.parameters[name.as_str()];
        if value.is_null() && schema.default.is_some() {
            continue;
        }
        schema
            .check(value)
            .map_err(|reason| DispatchError::invalid(name, reason))?;
    }

    let mut url = descriptor.execute.url.clone();
    let mut headers = descriptor.execute.headers.clone();
    let mut query = BTreeMap::new();
    let mut body = Map::new();

    for (name, schema) in &descriptor.parameters {
        // 4. Explicit null omits; absence falls back to default, then account context.
        let value = match args.get(name) {
            Some(Value::Null) => None,
            Some(value) => Some(value.clone()),
            None => schema.default.clone().or_else(|| {
                (Some(name.as_str()) == account_param)
                    .then(|| account_header.map(|a| Value::String(a.to_string())))
                    .flatten()
            }),
        };

        // 5. Partition
        match descriptor.location_of(name) {
            ParameterLocation::Path => {
                let value = value.ok_or_else(|| {
                    DispatchError::malformed(
                        &descriptor.name,
                        format!("path parameter '{}' has no value", name),
                    )
                })?;
                let placeholder = format!("{{{}}}", name);
                if !url.contains(&placeholder) {
                    return Err(DispatchError::malformed(
                        &descriptor.name,
                        format!("path parameter '{}' does not appear in the url", name),
                    ));
                }
                let encoded = urlencoding::encode(&scalar_string(&value)).into_owned();
                url = url.replace(&placeholder, &encoded);
            }
            ParameterLocation::Query => {
                if let Some(value) = value {
                    let proxy = matches!(schema.kind, SchemaKind::Object { .. });
                    push_query(&mut query, name, &value, proxy);
                }
            }
            ParameterLocation::Header => {
                if let Some(value) = value {
                    headers.insert(name.clone(), scalar_string(&value));
                }
            }
            ParameterLocation::Body => {
                if descriptor.execute.body_type.is_none() {
                    return Err(DispatchError::malformed(
                        &descriptor.name,
                        format!("parameter '{}' targets the body but no body_type is set", name),
                    ));
                }
                if let Some(value) = value {
                    body.insert(name.clone(), value);
                }
            }
        }
    }

    if let Some(leftover) = unresolved_placeholder(&url) {
        return Err(DispatchError::malformed(
            &descriptor.name,
            format!("url placeholder '{{{}}}' has no path parameter", leftover),
        ));
    }

    let (body, body_type) = match descriptor.execute.body_type {
        Some(encoding) if !body.is_empty() => (Some(Value::Object(body)), Some(encoding)),
        _ => (None, None),
    };

    Ok(ResolvedRequest {
        method: descriptor.execute.method,
        url,
        headers,
        query,
        body,
        body_type,
    })
}

/// Add a query value. Arrays are comma-joined; object-typed parameters are
/// proxy pass-throughs expanded to `parent[key]` entries.
fn push_query(query: &mut BTreeMap<String, String>, key: &str, value: &Value, proxy: bool) {
    match value {
        Value::Null => {}
        Value::Object(fields) if proxy => {
            for (nested, field) in fields {
                push_query(query, &format!("{}[{}]", key, nested), field, true);
            }
        }
        Value::Array(items) => {
            let joined: Vec<String> = items
                .iter()
                .filter(|v| !v.is_null())
                .map(scalar_string)
                .collect();
            query.insert(key.to_string(), joined.join(","));
        }
        other => {
            query.insert(key.to_string(), scalar_string(other));
        }
    }
}

/// Strings verbatim, other scalars via their JSON text, composites as JSON.
fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unresolved_placeholder(url: &str) -> Option<&str> {
    let start = url.find('{')?;
    let end = url[start..].find('}')?;
    Some(&url[start + 1..start + end])
}
