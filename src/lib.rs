//! Account Insight Orchestrator
//!
//! Produces a natural-language summary of a bank account and can deliver it
//! as a synthesized voice call:
//! - Aggregates balance, category spending and direct debits from the bank
//! - Summarizes the resulting narrative with a chat-completion model
//! - Formats the summary into an escaped TwiML call request
//!
//! PIPELINE:
//! FETCH → SUMMARIZE → READY → (on demand) NOTIFY

pub mod api;
pub mod banking;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod openai;
pub mod pipeline;
pub mod summarizer;

pub use error::Result;

// Re-export common types
pub use config::Config;
pub use error::{BankResource, InsightError};
pub use models::*;
pub use pipeline::{InsightPipeline, PipelineSnapshot, PipelineState};

use banking::{BankDataAggregator, StarlingClient};
use notify::{NotificationDispatcher, TwilioClient};
use openai::OpenAiClient;
use std::sync::Arc;
use summarizer::Summarizer;

/// Wire the production providers from configuration
pub fn build_pipeline(config: &Config) -> Result<InsightPipeline> {
    let bank = StarlingClient::new(&config.banking)?;
    let completion = OpenAiClient::new(&config.completion)?;
    let voice = TwilioClient::new(&config.voice)?;

    Ok(InsightPipeline::new(
        BankDataAggregator::new(Arc::new(bank), config.banking.customer_name.clone()),
        Summarizer::new(Arc::new(completion)),
        NotificationDispatcher::new(Arc::new(voice)).with_voice(config.voice.voice.clone()),
    ))
}
