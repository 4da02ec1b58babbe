//! Narrative summarization
//!
//! Turns an account narrative into a customer-facing paragraph with a single
//! chat-completion call. No retries: failures go straight back to the caller.

use crate::error::InsightError;
use crate::models::{AccountNarrative, ChatCompletionResponse, ChatMessage, SummaryResult};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub const SYSTEM_INSTRUCTION: &str = "You will be provided with banking information. \
Create a polite paragraph summarising all of the information for the customer. \
Finish by inviting the customer to contact us if they need any assistance and wish them a great day. \
Do not add a signature or any closing such as \"yours truly\".";

/// Chat-completion backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<ChatCompletionResponse>;
}

pub struct Summarizer {
    provider: Arc<dyn CompletionProvider>,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Summarize `narrative`, returning the first generated message
    pub async fn summarize(&self, narrative: AccountNarrative) -> Result<SummaryResult> {
        let messages = build_messages(narrative);

        let response = self.provider.complete(messages).await?;

        let Some(choice) = response.choices.into_iter().next() else {
            warn!("Completion returned no choices");
            return Err(InsightError::NoCompletionError);
        };

        let Some(text) = choice.message.content else {
            warn!(role = %choice.message.role, "First choice carried no content");
            return Err(InsightError::NoCompletionError);
        };

        info!(chars = text.len(), "Summary generated");

        Ok(SummaryResult { text })
    }
}

/// Exactly two messages: the fixed instruction and the narrative verbatim
fn build_messages(narrative: AccountNarrative) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_INSTRUCTION),
        ChatMessage::user(narrative.into_inner()),
    ]
}
