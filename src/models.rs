//! Core data models for the account insight pipeline
//!
//! Banking and completion shapes decode straight from the provider wire
//! format; unknown fields are ignored.

use serde::{Deserialize, Serialize};

//
// ================= Banking =================
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyAmount {
    pub currency: String,
    pub minor_units: i64,
}

/// Balance snapshot from a single provider call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub amount: CurrencyAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingCategory {
    #[serde(rename = "spendingCategory")]
    pub name: String,
    pub total_spent: f64,
}

/// Category spending for one period. Categories keep provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingBreakdown {
    pub total_spent: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(rename = "breakdown", default)]
    pub categories: Vec<SpendingCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mandate {
    pub reference: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectDebitSet {
    #[serde(default)]
    pub mandates: Vec<Mandate>,
}

/// Text composed from balance, spending and direct debits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNarrative(pub String);

impl AccountNarrative {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

//
// ================= Summary =================
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub text: String,
}

//
// ================= Chat Completion =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Generated message. `content` is null for refusals and tool calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: CompletionMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}
