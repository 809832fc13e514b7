use llmbridge::clients::claude::ClaudeClient;
use llmbridge::clients::common::{classify_status, error_detail};
use llmbridge::clients::gemini::GeminiClient;
use llmbridge::clients::grok::GrokClient;
use llmbridge::clients::openai::OpenAIClient;
use llmbridge::clients::client_for;
use llmbridge::context::{assemble, MessageShape};
use llmbridge::{BridgeConfig, BridgeError, ClientWrapper, Provider, Turn};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn history() -> Vec<Turn> {
    vec![Turn::user("What is 2+2?"), Turn::assistant("4")]
}

#[test]
fn test_openai_body_keeps_system_in_messages() {
    let context = assemble(&history(), "And 3+3?", "Be terse.", MessageShape::RoleAnnotated);
    let body = OpenAIClient::build_request_body(&context, "gpt-4.1-mini", None);

    let roles: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(body["messages"][3]["content"], "And 3+3?");
    assert!(body.get("tools").is_none());
}

#[test]
fn test_claude_body_lifts_system_to_top_level() {
    let context = assemble(&history(), "And 3+3?", "Be terse.", MessageShape::SideChannel);
    let tools = json!([{ "name": "calc", "input_schema": { "type": "object" } }]);
    let body = ClaudeClient::build_request_body(&context, "claude-sonnet-4-0", 1024, Some(&tools));

    assert_eq!(body["system"], "Be terse.");
    assert_eq!(body["max_tokens"], 1024);
    assert_eq!(body["model"], "claude-sonnet-4-0");
    assert_eq!(body["tools"], tools);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| m["role"] != "system"));
}

#[test]
fn test_gemini_body_uses_model_role_and_system_instruction() {
    let context = assemble(&history(), "And 3+3?", "Be terse.", MessageShape::RoleRelabeled);
    let body = GeminiClient::build_request_body(&context, None);

    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be terse.");
    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["role"], "user");
    assert_eq!(contents[1]["role"], "model");
    assert_eq!(contents[1]["parts"][0]["text"], "4");
    assert_eq!(contents[2]["parts"][0]["text"], "And 3+3?");
}

#[test]
fn test_text_and_usage_extraction() {
    let openai = json!({
        "choices": [{ "message": { "role": "assistant", "content": "Hi!" } }],
        "usage": { "prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7 }
    });
    assert_eq!(OpenAIClient::extract_text(&openai).as_deref(), Some("Hi!"));
    assert_eq!(OpenAIClient::extract_usage(&openai).unwrap().total_tokens, 7);

    let claude = json!({
        "content": [
            { "type": "text", "text": "Let me check." },
            { "type": "tool_use", "id": "t1", "name": "calc", "input": {} },
            { "type": "text", "text": "Done." }
        ],
        "usage": { "input_tokens": 11, "output_tokens": 4 }
    });
    assert_eq!(
        ClaudeClient::extract_text(&claude).as_deref(),
        Some("Let me check.\nDone.")
    );
    let usage = ClaudeClient::extract_usage(&claude).unwrap();
    assert_eq!((usage.input_tokens, usage.output_tokens, usage.total_tokens), (11, 4, 15));

    let gemini = json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": "Hel" }, { "text": "lo" }] } }],
        "usageMetadata": { "promptTokenCount": 3, "candidatesTokenCount": 1 }
    });
    assert_eq!(GeminiClient::extract_text(&gemini).as_deref(), Some("Hello"));
    assert_eq!(GeminiClient::extract_usage(&gemini).unwrap().input_tokens, 3);

    let tool_only = json!({ "choices": [{ "message": { "content": null } }] });
    assert!(OpenAIClient::extract_text(&tool_only).is_none());
    assert!(OpenAIClient::extract_usage(&tool_only).is_none());
}

#[test]
fn test_http_status_classification() {
    let err = classify_status(Provider::OpenAI, 401, r#"{"error":{"message":"bad key"}}"#);
    assert!(matches!(err, BridgeError::Authentication { .. }));
    assert!(err.to_string().contains("OPENAI_API_KEY"));
    assert!(err.to_string().contains("bad key"));

    let err = classify_status(Provider::Claude, 429, "slow down");
    assert!(err.is_rate_limited());
    assert_eq!(err.provider_kind(), Some(Provider::Claude));

    let err = classify_status(Provider::Gemini, 500, "");
    assert_eq!(
        err,
        BridgeError::provider(Provider::Gemini, "HTTP 500: no error details")
    );

    let gemini_bad_key = r#"{
      "error": {
        "code": 400,
        "message": "API key not valid. Please pass a valid API key.",
        "status": "INVALID_ARGUMENT",
        "details": [{
          "@type": "type.googleapis.com/google.rpc.ErrorInfo",
          "reason": "API_KEY_INVALID",
          "domain": "googleapis.com"
        }]
      }
    }"#;
    let err = classify_status(Provider::Gemini, 400, gemini_bad_key);
    assert!(matches!(err, BridgeError::Authentication { .. }), "{}", err);
    assert!(err.to_string().contains("GEMINI_API_KEY"));
    assert!(err.to_string().contains("API key not valid"));

    let err = classify_status(
        Provider::Gemini,
        403,
        r#"{"error": {"code": 403, "status": "PERMISSION_DENIED", "message": "denied"}}"#,
    );
    assert!(matches!(err, BridgeError::Authentication { .. }));

    let err = classify_status(
        Provider::Gemini,
        400,
        r#"{"error": {"code": 400, "status": "UNAUTHENTICATED", "message": "no creds"}}"#,
    );
    assert!(matches!(err, BridgeError::Authentication { .. }));

    let err = classify_status(
        Provider::Gemini,
        400,
        r#"{"error": {"code": 400, "status": "RESOURCE_EXHAUSTED", "message": "quota"}}"#,
    );
    assert!(err.is_rate_limited());

    let err = classify_status(
        Provider::Gemini,
        400,
        r#"{"error": {"code": 400, "status": "INVALID_ARGUMENT", "message": "bad field"}}"#,
    );
    assert_eq!(err, BridgeError::provider(Provider::Gemini, "HTTP 400: bad field"));

    let long_body = "x".repeat(2000);
    assert!(error_detail(&long_body).ends_with("..."));
    assert!(error_detail(&long_body).len() < 600);
}

#[tokio::test]
async fn test_missing_keys_fail_before_network() {
    let config = BridgeConfig::default();
    for provider in Provider::ALL {
        let client = client_for(provider, &config);
        assert_eq!(client.provider(), provider);

        let context = assemble(&[], "hello", "preamble", provider.message_shape());
        let err = client
            .send_message(&context, client.default_model(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Authentication { .. }), "{}", err);
        assert!(err.to_string().contains(provider.credential_env_var()));
        assert!(client.get_last_usage().is_none());
    }
}

#[test]
fn test_client_for_uses_configured_models() {
    let mut config = BridgeConfig::default();
    config.provider_mut(Provider::Grok).default_model = "grok-4".to_string();

    assert_eq!(client_for(Provider::Grok, &config).default_model(), "grok-4");
    assert_eq!(
        client_for(Provider::OpenAI, &config).default_model(),
        "gpt-4.1-mini"
    );
    assert_eq!(
        client_for(Provider::Gemini, &config).default_model(),
        "gemini-2.0-flash"
    );

    let grok = GrokClient::new_with_model_str("", "grok-3");
    assert_eq!(grok.default_model(), "grok-3");
}

/// Serve exactly one HTTP response on a local port and hand back the raw request text.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + body_len {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&request).to_string()
    });

    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn test_openai_send_path_returns_native_response() {
    let served = json!({
        "id": "chatcmpl-1",
        "choices": [{ "message": { "role": "assistant", "content": "pong", "refusal": null } }],
        "usage": { "prompt_tokens": 9, "completion_tokens": 1, "total_tokens": 10 },
        "system_fingerprint": "fp_x"
    });
    let (base, server) = serve_once("200 OK", served.to_string()).await;
    let client = OpenAIClient::new_with_base_url("sk-test", "gpt-4o", &format!("{}/v1", base));

    let context = assemble(&[], "ping", "Be terse.", MessageShape::RoleAnnotated);
    let response = client.send_message(&context, "gpt-4o-mini", None).await.unwrap();

    assert_eq!(response.raw, served);
    assert_eq!(response.answer, "pong");
    assert_eq!(client.get_last_usage().unwrap().total_tokens, 10);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions HTTP/1.1\r\n"), "{}", request);
    assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
    let body: Value = serde_json::from_str(request.split("\r\n\r\n").nth(1).unwrap()).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"][1]["content"], "ping");
}

#[tokio::test]
async fn test_claude_send_path_uses_messages_endpoint_and_headers() {
    let served = json!({
        "id": "msg_1",
        "type": "message",
        "content": [{ "type": "text", "text": "Hello." }],
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 12, "output_tokens": 2 }
    });
    let (base, server) = serve_once("200 OK", served.to_string()).await;
    let client = ClaudeClient::new_with_base_url("ant-key", "claude-sonnet-4-0", &format!("{}/v1", base));

    let context = assemble(&[], "hi", "Be terse.", MessageShape::SideChannel);
    let response = client
        .send_message(&context, client.default_model(), None)
        .await
        .unwrap();
    assert_eq!(response.raw, served);
    assert_eq!(response.answer, "Hello.");

    let request = server.await.unwrap();
    let lower = request.to_lowercase();
    assert!(request.starts_with("POST /v1/messages HTTP/1.1\r\n"), "{}", request);
    assert!(lower.contains("x-api-key: ant-key"));
    assert!(lower.contains("anthropic-version: 2023-06-01"));
    let body: Value = serde_json::from_str(request.split("\r\n\r\n").nth(1).unwrap()).unwrap();
    assert_eq!(body["system"], "Be terse.");
}

#[tokio::test]
async fn test_gemini_send_path_targets_model_url() {
    let served = json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "functionCall": { "name": "lookup", "args": { "q": "rust" } } }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 4, "candidatesTokenCount": 3, "totalTokenCount": 7 }
    });
    let (base, server) = serve_once("200 OK", served.to_string()).await;
    let client = GeminiClient::new_with_base_url("g-key", "gemini-2.0-flash", &format!("{}/v1beta", base));

    let context = assemble(&[], "search", "Be terse.", MessageShape::RoleRelabeled);
    let response = client
        .send_message(&context, "gemini-2.0-flash", None)
        .await
        .unwrap();

    // Tool-call-only responses keep the native JSON for normalization.
    assert_eq!(response.raw, served);
    assert_eq!(response.answer, llmbridge::client_wrapper::NO_TEXT_PLACEHOLDER);

    let request = server.await.unwrap();
    assert!(
        request.starts_with("POST /v1beta/models/gemini-2.0-flash:generateContent HTTP/1.1\r\n"),
        "{}",
        request
    );
    assert!(request.to_lowercase().contains("x-goog-api-key: g-key"));
}

#[tokio::test]
async fn test_gemini_rejected_key_is_an_authentication_failure() {
    let served = json!({
        "error": {
            "code": 400,
            "message": "API key not valid. Please pass a valid API key.",
            "status": "INVALID_ARGUMENT",
            "details": [{ "@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID" }]
        }
    });
    let (base, server) = serve_once("400 Bad Request", served.to_string()).await;
    let client = GeminiClient::new_with_base_url("wrong", "gemini-2.0-flash", &base);

    let context = assemble(&[], "q", "p", MessageShape::RoleRelabeled);
    let err = client
        .send_message(&context, "gemini-2.0-flash", None)
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Authentication { .. }), "{}", err);
    assert!(err.to_string().contains("GEMINI_API_KEY"));
    server.await.unwrap();
}

#[tokio::test]
async fn test_non_success_statuses_are_classified_end_to_end() {
    let (base, server) = serve_once(
        "401 Unauthorized",
        json!({ "error": { "message": "Incorrect API key provided" } }).to_string(),
    )
    .await;
    let grok = GrokClient::new_with_base_url("xai-bad", "grok-3-mini", &base);
    let context = assemble(&[], "q", "p", MessageShape::RoleAnnotated);
    let err = grok.send_message(&context, "grok-3-mini", None).await.unwrap_err();
    assert!(matches!(err, BridgeError::Authentication { provider: Provider::Grok, .. }));
    assert!(err.to_string().contains("XAI_API_KEY"));
    assert!(server.await.unwrap().starts_with("POST /chat/completions HTTP/1.1"));

    let (base, server) = serve_once(
        "429 Too Many Requests",
        json!({ "error": { "message": "Rate limit reached" } }).to_string(),
    )
    .await;
    let openai = OpenAIClient::new_with_base_url("sk-test", "gpt-4o", &base);
    let err = openai.send_message(&context, "gpt-4o", None).await.unwrap_err();
    assert!(err.is_rate_limited());
    assert!(err.to_string().contains("Rate limit reached"));
    server.await.unwrap();
}
