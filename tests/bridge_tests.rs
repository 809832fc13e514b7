use async_trait::async_trait;
use llmbridge::client_wrapper::NO_TEXT_PLACEHOLDER;
use llmbridge::context::AssembledContext;
use llmbridge::normalizer::ToolCallSource;
use llmbridge::tool_protocol::{AskInput, ClearInput};
use llmbridge::{
    BridgeConfig, BridgeError, ClientWrapper, LLMBridge, Provider, ProviderResponse, Role, Turn,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock should do on its next call.
enum Reply {
    Ok { text: Option<&'static str>, raw: Value },
    Fail(BridgeError),
    Hang,
}

// Mock client recording every request it receives
struct MockClient {
    provider: Provider,
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<(AssembledContext, String, Option<Value>)>>,
}

impl MockClient {
    fn new(provider: Provider) -> Self {
        Self {
            provider,
            replies: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn reply_text(self, text: &'static str) -> Self {
        self.reply(Reply::Ok {
            text: Some(text),
            raw: json!({ "text": text }),
        })
    }

    fn reply(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    fn requests(&self) -> Vec<(AssembledContext, String, Option<Value>)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientWrapper for MockClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn send_message(
        &self,
        context: &AssembledContext,
        model: &str,
        tools: Option<&Value>,
    ) -> Result<ProviderResponse, BridgeError> {
        self.seen
            .lock()
            .unwrap()
            .push((context.clone(), model.to_string(), tools.cloned()));

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Ok { text, raw }) => {
                Ok(ProviderResponse::new(text.map(str::to_string), raw, None))
            }
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("the bridge deadline should fire first")
            }
            None => Ok(ProviderResponse::new(Some("default reply".into()), json!({}), None)),
        }
    }
}

fn bridge_with(client: Arc<MockClient>) -> LLMBridge {
    let mut config = BridgeConfig::default();
    config.system_prompt = "PREAMBLE".to_string();
    config.request_timeout = Duration::from_millis(200);
    LLMBridge::new(&config).with_client(client)
}

#[tokio::test]
async fn test_fresh_session_records_exchange_and_echoes_id() {
    let client = Arc::new(MockClient::new(Provider::OpenAI).reply_text("Paris."));
    let bridge = bridge_with(client.clone());

    let response = bridge
        .ask(Provider::OpenAI, AskInput::new("Capital of France?"))
        .await
        .unwrap();

    assert_ne!(response.session_id, "default");
    assert!(response.content[0].text.starts_with("Paris."));
    assert!(response.content[0].text.contains(&response.session_id));
    assert_eq!(response.content.len(), 1);
    assert!(response.tool_call.is_none());

    assert_eq!(
        bridge.sessions().snapshot(&response.session_id),
        vec![Turn::user("Capital of France?"), Turn::assistant("Paris.")]
    );

    let (context, model, tools) = client.requests().remove(0);
    assert_eq!(model, "mock-model");
    assert!(tools.is_none());
    assert_eq!(context.messages[0].role, "system");
    assert_eq!(context.messages[0].content, "PREAMBLE");
}

#[tokio::test]
async fn test_resumed_session_threads_history() {
    let client = Arc::new(
        MockClient::new(Provider::Gemini)
            .reply_text("Two.")
            .reply_text("Three."),
    );
    let bridge = bridge_with(client.clone());

    let first = bridge
        .ask(Provider::Gemini, AskInput::new("One plus one?"))
        .await
        .unwrap();
    let second = bridge
        .ask(
            Provider::Gemini,
            AskInput::new("Plus one more?").with_session_id(first.session_id.clone()),
        )
        .await
        .unwrap();

    assert_eq!(first.session_id, second.session_id);

    let (context, _, _) = client.requests().remove(1);
    let roles: Vec<&str> = context.messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "model", "user"]);
    assert_eq!(context.messages[2].content, "Two.");
    assert_eq!(bridge.sessions().snapshot(&second.session_id).len(), 4);
}

#[tokio::test]
async fn test_omitting_session_id_starts_unlinked_conversations() {
    let client = Arc::new(MockClient::new(Provider::OpenAI));
    let bridge = bridge_with(client.clone());

    let a = bridge.ask(Provider::OpenAI, AskInput::new("q1")).await.unwrap();
    let b = bridge.ask(Provider::OpenAI, AskInput::new("q2")).await.unwrap();

    assert_ne!(a.session_id, b.session_id);
    let (second_context, _, _) = client.requests().remove(1);
    assert_eq!(second_context.messages.len(), 2);
}

#[tokio::test]
async fn test_side_channel_provider_gets_preamble_out_of_band() {
    let client = Arc::new(MockClient::new(Provider::Claude).reply_text("ok"));
    let bridge = bridge_with(client.clone());

    bridge
        .ask(Provider::Claude, AskInput::new("hello"))
        .await
        .unwrap();

    let (context, _, _) = client.requests().remove(0);
    assert_eq!(context.system.as_deref(), Some("PREAMBLE"));
    assert!(context.messages.iter().all(|m| m.content != "PREAMBLE"));
}

#[tokio::test]
async fn test_model_override_and_tools_are_forwarded() {
    let client = Arc::new(MockClient::new(Provider::Grok));
    let bridge = bridge_with(client.clone());
    let tools = json!([{ "type": "function", "function": { "name": "lookup" } }]);

    bridge
        .ask(
            Provider::Grok,
            AskInput::new("q").with_model("grok-4").with_tools(tools.clone()),
        )
        .await
        .unwrap();

    let (_, model, forwarded) = client.requests().remove(0);
    assert_eq!(model, "grok-4");
    assert_eq!(forwarded, Some(tools));
}

#[tokio::test]
async fn test_tool_call_is_normalized_into_envelope() {
    let raw = json!({
        "choices": [{
            "message": {
                "content": null,
                "tool_calls": [{ "function": { "name": "get_time", "arguments": "{\"tz\":\"UTC\"}" } }]
            }
        }]
    });
    let client = Arc::new(MockClient::new(Provider::OpenAI).reply(Reply::Ok { text: None, raw }));
    let bridge = bridge_with(client);

    let response = bridge
        .ask(Provider::OpenAI, AskInput::new("What time is it?"))
        .await
        .unwrap();

    let call = response.tool_call.clone().expect("tool call");
    assert_eq!(call.source, ToolCallSource::ToolCalls);
    assert_eq!(call.args, Some(json!({"tz": "UTC"})));

    assert!(response.content[0].text.starts_with(NO_TEXT_PLACEHOLDER));
    assert_eq!(response.content.len(), 2);
    assert!(response.content[1].text.contains("get_time"));

    let history = bridge.sessions().snapshot(&response.session_id);
    assert_eq!(history[1].content, NO_TEXT_PLACEHOLDER);
}

#[tokio::test]
async fn test_failure_leaves_no_history() {
    let client = Arc::new(
        MockClient::new(Provider::Claude)
            .reply_text("first answer")
            .reply(Reply::Fail(BridgeError::rate_limited(Provider::Claude, "too many requests"))),
    );
    let bridge = bridge_with(client);

    let first = bridge
        .ask(Provider::Claude, AskInput::new("q1"))
        .await
        .unwrap();
    let err = bridge
        .ask(
            Provider::Claude,
            AskInput::new("q2").with_session_id(first.session_id.clone()),
        )
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
    assert!(err.to_string().contains("Claude"));
    assert_eq!(bridge.sessions().snapshot(&first.session_id).len(), 2);
}

#[tokio::test]
async fn test_failed_fresh_session_is_not_created() {
    let client = Arc::new(MockClient::new(Provider::Gemini).reply(Reply::Fail(
        BridgeError::authentication(Provider::Gemini, "no API key configured"),
    )));
    let bridge = bridge_with(client);

    let err = bridge
        .ask(Provider::Gemini, AskInput::new("q"))
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Authentication { .. }));
    assert!(err.to_string().contains("GEMINI_API_KEY"));
    assert_eq!(bridge.sessions().session_count(), 0);
}

#[tokio::test]
async fn test_deadline_turns_into_timeout_without_recording() {
    let client = Arc::new(MockClient::new(Provider::OpenAI).reply(Reply::Hang));
    let bridge = bridge_with(client);

    let err = bridge
        .ask(
            Provider::OpenAI,
            AskInput::new("slow question").with_session_id("slow-session"),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BridgeError::Timeout {
            provider: Provider::OpenAI,
            ..
        }
    ));
    assert!(bridge.sessions().snapshot("slow-session").is_empty());
}

#[tokio::test]
async fn test_clear_drops_history_and_echoes_id() {
    let client = Arc::new(MockClient::new(Provider::OpenAI));
    let bridge = bridge_with(client.clone());
    bridge.sessions().append("keep-me", Role::User, "hi");

    let response = bridge
        .ask(Provider::OpenAI, AskInput::new("q").with_session_id("to-clear"))
        .await
        .unwrap();
    assert_eq!(bridge.sessions().snapshot("to-clear").len(), 2);

    let cleared = bridge.clear(ClearInput {
        session_id: response.session_id.clone(),
    });
    assert_eq!(cleared.session_id, "to-clear");
    assert!(cleared.content[0].text.contains("to-clear"));
    assert!(bridge.sessions().snapshot("to-clear").is_empty());
    assert_eq!(bridge.sessions().snapshot("keep-me").len(), 1);

    // idempotent
    bridge.clear(ClearInput {
        session_id: "to-clear".into(),
    });

    bridge
        .ask(Provider::OpenAI, AskInput::new("again").with_session_id("to-clear"))
        .await
        .unwrap();
    let (context, _, _) = client.requests().remove(1);
    assert_eq!(context.messages.len(), 2);
}

#[tokio::test]
async fn test_history_sent_to_provider_stays_bounded() {
    let client = Arc::new(MockClient::new(Provider::OpenAI));
    let bridge = bridge_with(client.clone());

    for i in 0..15 {
        bridge
            .ask(
                Provider::OpenAI,
                AskInput::new(format!("q{}", i)).with_session_id("long"),
            )
            .await
            .unwrap();
    }

    assert_eq!(bridge.sessions().snapshot("long").len(), 20);
    let (context, _, _) = client.requests().pop().unwrap();
    // preamble + 20 stored turns + the new question
    assert_eq!(context.messages.len(), 22);
    assert_eq!(context.messages[1].content, "q4");
}
