//! Voice-call delivery of the summary
//!
//! The summary text comes from an LLM and is embedded in a TwiML document,
//! so it is always XML-escaped before it reaches the voice provider.

use crate::Result;
use async_trait::async_trait;
use quick_xml::escape::escape;
use std::sync::Arc;
use tracing::{error, info};

pub mod twilio;
pub use twilio::TwilioClient;

/// Places an outbound call that plays a TwiML instruction document
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    async fn place_call(&self, twiml: &str) -> Result<()>;
}

pub struct NotificationDispatcher {
    provider: Arc<dyn VoiceProvider>,
    voice: Option<String>,
}

impl NotificationDispatcher {
    pub fn new(provider: Arc<dyn VoiceProvider>) -> Self {
        Self {
            provider,
            voice: None,
        }
    }

    /// Use a specific synthesized voice for the `<Say>` directive
    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }

    /// Deliver `text` as a voice call. Failures are logged and returned.
    pub async fn call(&self, text: &str) -> Result<()> {
        let twiml = build_say_instruction(text, self.voice.as_deref());

        match self.provider.place_call(&twiml).await {
            Ok(()) => {
                info!(chars = text.len(), "Summary call placed");
                Ok(())
            }
            Err(e) => {
                error!("Error calling user: {}", e);
                Err(e)
            }
        }
    }
}

/// `<Response><Say>text</Say></Response>` with text and voice escaped
pub fn build_say_instruction(text: &str, voice: Option<&str>) -> String {
    let say_open = match voice {
        Some(voice) => format!("<Say voice=\"{}\">", escape(voice)),
        None => "<Say>".to_string(),
    };

    format!("<Response>{}{}</Say></Response>", say_open, escape(text))
}
