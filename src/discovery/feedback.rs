//! `meta_collect_tool_feedback`: forwards what a user said about the tools
//! to a feedback endpoint.
//!
//! The tool is an ordinary declarative action (a JSON `POST`), so it resolves
//! through the same dispatcher as catalog actions. Arguments are cleaned
//! before dispatch: strings are trimmed and blank tool names dropped.

use crate::catalog::{
    ActionDescriptor, BodyEncoding, ExecuteTemplate, HttpMethod, ParamSchema, ParameterLocation,
    SchemaKind,
};
use crate::error::{AppError, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub const TOOL_FEEDBACK: &str = "meta_collect_tool_feedback";
pub const DEFAULT_FEEDBACK_URL: &str = "https://api.stackone.com/ai/tool-feedback";

const DESCRIPTION: &str = "Collects user feedback on tool performance. First ask the user \
    whether they are ok with sending feedback and mention that the assistant will send it. \
    Call this tool only when the user explicitly answers yes.";

/// Descriptor of the feedback tool posting to `url`.
pub fn feedback_action(url: &str) -> ActionDescriptor {
    let mut template = ExecuteTemplate::new(HttpMethod::Post, url);
    template.body_type = Some(BodyEncoding::Json);

    ActionDescriptor::new(TOOL_FEEDBACK, template)
        .with_description(DESCRIPTION)
        .with_parameter(
            "feedback",
            ParamSchema::string()
                .with_description("Verbatim feedback from the user about their experience with the tools."),
            ParameterLocation::Body,
        )
        .with_parameter(
            "account_id",
            ParamSchema::string().with_description("Account identifier (e.g., \"acc_123456\")"),
            ParameterLocation::Body,
        )
        .with_parameter(
            "tool_names",
            ParamSchema::new(SchemaKind::Array {
                items: Some(Box::new(ParamSchema::string())),
            })
            .with_description("Array of tool names being reviewed"),
            ParameterLocation::Body,
        )
}

#[derive(Debug, Deserialize)]
struct FeedbackArgs {
    feedback: String,
    account_id: String,
    tool_names: Vec<String>,
}

/// Validate and clean feedback arguments into dispatcher input.
pub(crate) fn clean_args(args: &Value) -> Result<Map<String, Value>> {
    let args: FeedbackArgs = serde_json::from_value(args.clone()).map_err(|e| {
        AppError::ValidationError(format!("Invalid {} arguments: {}", TOOL_FEEDBACK, e))
    })?;

    let feedback = non_empty("feedback", &args.feedback)?;
    let account_id = non_empty("account_id", &args.account_id)?;
    let tool_names: Vec<&str> = args
        .tool_names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();
    if tool_names.is_empty() {
        return Err(AppError::ValidationError(
            "tool_names: At least one tool name is required".to_string(),
        ));
    }

    let cleaned = json!({
        "feedback": feedback,
        "account_id": account_id,
        "tool_names": tool_names,
    });
    Ok(cleaned.as_object().cloned().unwrap_or_default())
}

fn non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(format!(
            "{}: Field must be a non-empty string",
            field
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::build_request;

    #[test]
    fn test_action_shape() {
        let action = feedback_action("https://feedback.example.com/ai/tool-feedback");
        action.validate().unwrap();
        assert_eq!(action.execute.method, HttpMethod::Post);
        assert_eq!(action.location_of("tool_names"), ParameterLocation::Body);
        assert!(action.parameters.values().all(|p| p.is_required()));
    }

    #[test]
    fn test_clean_args_trims_and_drops_blank_names() {
        let cleaned = clean_args(&json!({
            "feedback": "  Great tools!  ",
            "account_id": " acc_1 ",
            "tool_names": [" hris_list_employees ", "", "   ", "ats_list_jobs"]
        }))
        .unwrap();

        assert_eq!(cleaned["feedback"], "Great tools!");
        assert_eq!(cleaned["account_id"], "acc_1");
        assert_eq!(
            cleaned["tool_names"],
            json!(["hris_list_employees", "ats_list_jobs"])
        );
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        let err = clean_args(&json!({
            "feedback": "   ",
            "account_id": "acc_1",
            "tool_names": ["a"]
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m.starts_with("feedback:")));

        let err = clean_args(&json!({
            "feedback": "ok",
            "account_id": "",
            "tool_names": ["a"]
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m.starts_with("account_id:")));
    }

    #[test]
    fn test_tool_names_must_survive_cleaning() {
        let err = clean_args(&json!({
            "feedback": "ok",
            "account_id": "acc_1",
            "tool_names": [" ", ""]
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::ValidationError(ref m) if m.contains("At least one tool name is required")
        ));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        assert!(clean_args(&json!({ "feedback": "ok", "tool_names": ["a"] })).is_err());
    }

    #[test]
    fn test_cleaned_args_resolve_to_json_post() {
        let action = feedback_action(DEFAULT_FEEDBACK_URL);
        let cleaned = clean_args(&json!({
            "feedback": "works",
            "account_id": "acc_1",
            "tool_names": ["hris_list_employees"]
        }))
        .unwrap();

        let request = build_request(&action, None, &cleaned).unwrap();
        assert_eq!(request.url, DEFAULT_FEEDBACK_URL);
        assert_eq!(request.body_type, Some(BodyEncoding::Json));
        assert_eq!(
            request.body,
            Some(json!({
                "feedback": "works",
                "account_id": "acc_1",
                "tool_names": ["hris_list_employees"]
            }))
        );
    }
}
