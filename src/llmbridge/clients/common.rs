//! Request plumbing shared by every provider client: credential checks, the HTTP round
//! trip and failure classification.

use reqwest::RequestBuilder;
use serde_json::Value;

use crate::llmbridge::error::BridgeError;
use crate::llmbridge::provider::Provider;

/// Longest slice of an error body echoed back to the caller.
const MAX_ERROR_DETAIL_CHARS: usize = 500;

/// Fail with an authentication error when no key was configured, without touching the network.
pub fn require_api_key(provider: Provider, api_key: &str) -> Result<(), BridgeError> {
    if api_key.trim().is_empty() {
        return Err(BridgeError::authentication(
            provider,
            "no API key configured",
        ));
    }
    Ok(())
}

/// Send `body` with `request`, classify failures and decode the JSON response.
pub async fn post_json(
    provider: Provider,
    request: RequestBuilder,
    body: &Value,
) -> Result<Value, BridgeError> {
    let response = request
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|err| {
            log::error!("{} request failed: {}", provider, err);
            BridgeError::provider(provider, format!("request failed: {}", err))
        })?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let err = classify_status(provider, status.as_u16(), &text);
        log::error!("{} returned HTTP {}: {}", provider, status, err);
        return Err(err);
    }

    response.json::<Value>().await.map_err(|err| {
        BridgeError::provider(provider, format!("invalid JSON response: {}", err))
    })
}

/// How a failed response should be reported, judged from its status and error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Authentication,
    RateLimited,
    Other,
}

/// Map a non-success HTTP status to the error taxonomy.
///
/// Google APIs reject a bad key with HTTP 400 and report the real cause in
/// `error.status` / `error.details[].reason`, so the body is consulted before the status.
pub fn classify_status(provider: Provider, status: u16, body: &str) -> BridgeError {
    let detail = error_detail(body);
    let kind = match (status, body_failure_kind(body)) {
        (_, Some(kind)) => kind,
        (401 | 403, None) => FailureKind::Authentication,
        (429, None) => FailureKind::RateLimited,
        _ => FailureKind::Other,
    };
    match kind {
        FailureKind::Authentication => BridgeError::authentication(provider, detail),
        FailureKind::RateLimited => BridgeError::rate_limited(provider, detail),
        FailureKind::Other => {
            BridgeError::provider(provider, format!("HTTP {}: {}", status, detail))
        }
    }
}

fn body_failure_kind(body: &str) -> Option<FailureKind> {
    let json = serde_json::from_str::<Value>(body).ok()?;
    let error = json.get("error")?;

    let api_key_invalid = error
        .get("details")
        .and_then(Value::as_array)
        .map(|details| {
            details
                .iter()
                .any(|d| d.get("reason").and_then(Value::as_str) == Some("API_KEY_INVALID"))
        })
        .unwrap_or(false);
    if api_key_invalid {
        return Some(FailureKind::Authentication);
    }

    match error.get("status").and_then(Value::as_str)? {
        "UNAUTHENTICATED" | "PERMISSION_DENIED" => Some(FailureKind::Authentication),
        "RESOURCE_EXHAUSTED" => Some(FailureKind::RateLimited),
        _ => None,
    }
}

/// The provider's own error message when the body is the usual `{"error": {"message": ..}}`
/// envelope, otherwise the (truncated) body text.
pub fn error_detail(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let message = json
            .pointer("/error/message")
            .or_else(|| json.get("message"))
            .and_then(Value::as_str);
        if let Some(message) = message {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no error details".to_string();
    }
    if trimmed.chars().count() > MAX_ERROR_DETAIL_CHARS {
        let cut: String = trimmed.chars().take(MAX_ERROR_DETAIL_CHARS).collect();
        format!("{}...", cut)
    } else {
        trimmed.to_string()
    }
}

/// Read a non-negative integer at `pointer`, defaulting to zero.
pub fn usage_field(raw: &Value, pointer: &str) -> usize {
    raw.pointer(pointer).and_then(Value::as_u64).unwrap_or(0) as usize
}
