//! The provider families llmbridge can dispatch to.

use std::fmt;

use crate::llmbridge::context::MessageShape;

/// A language-model provider family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAI,
    Claude,
    Gemini,
    Grok,
}

impl Provider {
    /// Every provider, in the order their tools are listed.
    pub const ALL: [Provider; 4] = [
        Provider::OpenAI,
        Provider::Claude,
        Provider::Gemini,
        Provider::Grok,
    ];

    /// Human readable name used in error messages and tool descriptions.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Claude => "Claude",
            Provider::Gemini => "Gemini",
            Provider::Grok => "Grok",
        }
    }

    /// Name of the MCP tool that asks this provider a question.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "ask_openai",
            Provider::Claude => "ask_claude",
            Provider::Gemini => "ask_gemini",
            Provider::Grok => "ask_grok",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn credential_env_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Claude => "ANTHROPIC_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Grok => "XAI_API_KEY",
        }
    }

    /// How the conversation must be laid out for this provider's wire format.
    pub fn message_shape(&self) -> MessageShape {
        match self {
            Provider::OpenAI | Provider::Grok => MessageShape::RoleAnnotated,
            Provider::Claude => MessageShape::SideChannel,
            Provider::Gemini => MessageShape::RoleRelabeled,
        }
    }

    /// Reverse lookup from an MCP tool name.
    pub fn from_tool_name(name: &str) -> Option<Provider> {
        Provider::ALL.iter().copied().find(|p| p.tool_name() == name)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip() {
        for provider in Provider::ALL {
            assert_eq!(Provider::from_tool_name(provider.tool_name()), Some(provider));
        }
        assert_eq!(Provider::from_tool_name("clear_session"), None);
    }
}
