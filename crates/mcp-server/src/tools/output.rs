use crate::bridge_client::BridgeCallError;
use gdbridge_protocol::ErrorEnvelope;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::json;

/// JSON text block plus the same value as `structured_content`.
pub(crate) fn json_result<T: Serialize>(tool: &str, payload: &T) -> CallToolResult {
    let value = match serde_json::to_value(payload) {
        Ok(value) => value,
        Err(err) => {
            return internal_error(format!("failed to serialize {tool} result ({err})"));
        }
    };
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    let mut result = CallToolResult::success(vec![Content::text(text)]);
    result.structured_content = Some(value);
    result
}

pub(crate) fn error_envelope(error: ErrorEnvelope) -> CallToolResult {
    let mut text = format!("error: {}\n{}", error.code, error.message);
    if let Some(hint) = error.hint.as_deref().filter(|hint| !hint.trim().is_empty()) {
        text.push_str(&format!("\nhint: {hint}"));
    }
    if let Some(details) = error.details.as_ref() {
        text.push_str(&format!("\ndetails: {details}"));
    }
    for action in &error.next_actions {
        text.push_str(&format!("\nnext: {} ({})", action.tool, action.reason));
    }
    let mut result = CallToolResult::error(vec![Content::text(text)]);
    result.structured_content = Some(json!({ "ok": false, "error": error }));
    result
}

pub(crate) fn bridge_error(err: &BridgeCallError) -> CallToolResult {
    log::debug!("bridge call failed: {err}");
    error_envelope(err.to_envelope())
}

pub(crate) fn invalid_request(message: impl Into<String>, hint: Option<&str>) -> CallToolResult {
    let envelope = ErrorEnvelope::new("invalid_request", message);
    error_envelope(match hint {
        Some(hint) => envelope.with_hint(hint),
        None => envelope,
    })
}

pub(crate) fn internal_error(message: impl Into<String>) -> CallToolResult {
    error_envelope(ErrorEnvelope::new("internal", message))
}
