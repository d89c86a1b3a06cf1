//! Meta-tools that let an agent search the catalog and run what it finds.
//!
//! Instead of handing an agent thousands of tool schemas, it gets two:
//! `tool_search` to discover actions and `tool_execute` to run one by name.
//! A third, `meta_collect_tool_feedback`, reports back how the tools did.

use crate::catalog::ActionDescriptor;
use crate::discovery::feedback::{self, feedback_action, DEFAULT_FEEDBACK_URL, TOOL_FEEDBACK};
use crate::discovery::{DiscoverOptions, Toolset};
use crate::dispatch::build_request;
use crate::error::{AppError, Result};
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const TOOL_SEARCH: &str = "tool_search";
pub const TOOL_EXECUTE: &str = "tool_execute";

const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Agent-facing tool definition with a JSON-schema input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Definition for a catalog action. Required parameters are listed in
    /// `required`, in declaration order.
    pub fn from_action(action: &ActionDescriptor) -> Self {
        let properties: Map<String, Value> = action
            .parameters
            .iter()
            .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
            .collect();
        let required: Vec<&str> = action
            .parameters
            .iter()
            .filter(|(_, schema)| schema.is_required())
            .map(|(name, _)| name.as_str())
            .collect();

        Self {
            name: action.name.clone(),
            description: action.description.clone(),
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

/// Definitions of `tool_search`, `tool_execute` and the feedback tool.
pub fn meta_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: TOOL_SEARCH.to_string(),
            description: "Search for relevant tools by describing what you need to do. \
                Returns tool names, descriptions and relevance scores. Call tool_execute \
                with one of the returned names to run it."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Natural language description of the task, e.g. 'terminate an employee'"
                    },
                    "limit": {
                        "type": "number",
                        "description": "Maximum number of tools to return (default 5)"
                    },
                    "minScore": {
                        "type": "number",
                        "description": "Minimum relevance score between 0 and 1 (default 0)"
                    },
                    "connector": {
                        "type": "string",
                        "description": "Only return tools of this connector, e.g. 'bamboohr'"
                    },
                    "accountIds": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Only return tools reachable through these linked accounts"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: TOOL_EXECUTE.to_string(),
            description: "Execute a tool found with tool_search by its exact name.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "toolName": {
                        "type": "string",
                        "description": "Exact tool name returned by tool_search"
                    },
                    "params": {
                        "type": "object",
                        "description": "Parameters for the tool, matching its input schema"
                    }
                },
                "required": ["toolName"]
            }),
        },
        ToolDefinition::from_action(&feedback_action(DEFAULT_FEEDBACK_URL)),
    ]
}

#[derive(Debug, Deserialize)]
struct ToolSearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(rename = "minScore", default)]
    min_score: Option<f64>,
    #[serde(default)]
    connector: Option<String>,
    #[serde(rename = "accountIds", default)]
    account_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ToolExecuteArgs {
    #[serde(rename = "toolName")]
    tool_name: String,
    #[serde(default)]
    params: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
struct FoundTool {
    name: String,
    description: String,
    score: f64,
}

impl Toolset {
    /// Run a meta-tool call.
    ///
    /// `tool_execute` and the feedback tool send through `transport` when
    /// one is given and otherwise return the resolved request under
    /// `request`.
    pub fn invoke_meta_tool(
        &self,
        name: &str,
        args: &Value,
        transport: Option<&dyn Transport>,
    ) -> Result<Value> {
        match name {
            TOOL_SEARCH => {
                let args: ToolSearchArgs = serde_json::from_value(args.clone()).map_err(|e| {
                    AppError::ValidationError(format!("Invalid {} arguments: {}", TOOL_SEARCH, e))
                })?;
                if args.query.trim().is_empty() {
                    return Err(AppError::ValidationError(
                        "Query cannot be empty".to_string(),
                    ));
                }

                let options = DiscoverOptions {
                    limit: args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
                    min_score: args.min_score.unwrap_or(0.0),
                    connector: args.connector,
                    account_ids: args.account_ids,
                };
                let tools: Vec<FoundTool> = self
                    .discover_with(&args.query, &options)
                    .into_iter()
                    .map(|hit| FoundTool {
                        description: self
                            .get(&hit.name)
                            .map(|a| a.description.clone())
                            .unwrap_or_default(),
                        name: hit.name,
                        score: hit.score,
                    })
                    .collect();

                Ok(json!({ "tools": tools }))
            }
            TOOL_EXECUTE => {
                let args: ToolExecuteArgs = serde_json::from_value(args.clone()).map_err(|e| {
                    AppError::ValidationError(format!("Invalid {} arguments: {}", TOOL_EXECUTE, e))
                })?;
                let params = args.params.unwrap_or_default();

                match transport {
                    Some(transport) => self.call(&args.tool_name, &params, transport),
                    None => {
                        let request = self.execute_by_name(&args.tool_name, &params)?;
                        Ok(json!({ "request": request }))
                    }
                }
            }
            TOOL_FEEDBACK => {
                let params = feedback::clean_args(args)?;
                let request = build_request(&feedback_action(self.feedback_url()), None, &params)?;
                tracing::info!(url = %request.url, "Tool feedback resolved");

                match transport {
                    Some(transport) => transport
                        .send(&request)
                        .map_err(|e| AppError::TransportError(e.to_string())),
                    None => Ok(json!({ "request": request })),
                }
            }
            other => Err(AppError::ValidationError(format!(
                "Unknown meta tool: {}",
                other
            ))),
        }
    }
}
