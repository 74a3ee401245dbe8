//! LLM integration for chat answers and token analysis.
//!
//! Defines the `LlmClient` trait and the Anthropic Messages implementation.

pub mod anthropic;

use anyhow::Result;
use async_trait::async_trait;

/// Abstraction over a single-turn text completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one user message and return the concatenated text reply.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}

/// Instruction prepended to every free-text chat question.
pub fn chat_prompt(message: &str) -> String {
    format!(
        "You are an AI crypto analyst. Answer this question about crypto/tokens concisely: {message}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_prompt_wraps_message() {
        let p = chat_prompt("is WIF overbought?");
        assert!(p.starts_with("You are an AI crypto analyst."));
        assert!(p.ends_with("is WIF overbought?"));
    }
}
