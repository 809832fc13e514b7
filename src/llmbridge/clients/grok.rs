use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

use crate::llmbridge::client_wrapper::{ClientWrapper, ProviderResponse, TokenUsage};
use crate::llmbridge::clients::openai::OpenAIClient;
use crate::llmbridge::context::AssembledContext;
use crate::llmbridge::error::BridgeError;
use crate::llmbridge::provider::Provider;

pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";

/// xAI's API is OpenAI compatible, so this client delegates to an [`OpenAIClient`] that
/// reports its failures as Grok's.
pub struct GrokClient {
    client: OpenAIClient,
}

pub enum Model {
    Grok4,
    Grok3,
    Grok3Mini,
    Grok3MiniFastBeta, // $0.60/MMT input $4.00/MMT output
    Grok3FastBeta,     // $5/MMT input $25/MMT output
}

pub fn model_to_string(model: Model) -> String {
    match model {
        Model::Grok4 => "grok-4".to_string(),
        Model::Grok3 => "grok-3".to_string(),
        Model::Grok3Mini => "grok-3-mini".to_string(),
        Model::Grok3MiniFastBeta => "grok-3-mini-fast-beta".to_string(),
        Model::Grok3FastBeta => "grok-3-fast-beta".to_string(),
    }
}

impl GrokClient {
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_str(secret_key, &model_to_string(model))
    }

    pub fn new_with_model_str(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        GrokClient {
            client: OpenAIClient::for_provider(Provider::Grok, secret_key, model_name, base_url),
        }
    }
}

#[async_trait]
impl ClientWrapper for GrokClient {
    fn provider(&self) -> Provider {
        Provider::Grok
    }

    fn default_model(&self) -> &str {
        self.client.default_model()
    }

    async fn send_message(
        &self,
        context: &AssembledContext,
        model: &str,
        tools: Option<&Value>,
    ) -> Result<ProviderResponse, BridgeError> {
        self.client.send_message(context, model, tools).await
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        self.client.usage_slot()
    }
}

#[tokio::test]
async fn test_grok_without_key_fails_authentication() {
    use crate::llmbridge::context::{assemble, MessageShape};

    let client = GrokClient::new_with_model_enum("", Model::Grok3MiniFastBeta);
    let context = assemble(&[], "What is 2+2?", "You are a math professor.", MessageShape::RoleAnnotated);

    let err = client
        .send_message(&context, client.default_model(), None)
        .await
        .unwrap_err();
    assert_eq!(err.provider_kind(), Some(Provider::Grok));
    assert!(err.to_string().contains("XAI_API_KEY"));
}
