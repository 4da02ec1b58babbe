//! Environment configuration
//!
//! Credentials and endpoints for the three providers are read once at
//! startup and handed to the client constructors.

use crate::error::InsightError;
use crate::Result;
use chrono::{Datelike, Month, NaiveDate, Utc};
use std::env;

const DEFAULT_STARLING_BASE_URL: &str = "https://api-sandbox.starlingbank.com";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";
const DEFAULT_CUSTOMER_NAME: &str = "there";
const DEFAULT_API_PORT: u16 = 8080;

/// Year and month the category spending insight is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendingPeriod {
    pub year: i32,
    pub month: Month,
}

impl SpendingPeriod {
    /// The calendar month before `today`
    pub fn previous_month(today: NaiveDate) -> Self {
        let (year, month) = if today.month() == 1 {
            (today.year() - 1, 12)
        } else {
            (today.year(), today.month() - 1)
        };

        Self {
            year,
            month: month_from_number(month).unwrap_or(Month::January),
        }
    }

    /// Month name as the banking API expects it, e.g. `FEBRUARY`
    pub fn month_param(&self) -> String {
        self.month.name().to_uppercase()
    }
}

#[derive(Debug, Clone)]
pub struct BankingConfig {
    pub base_url: String,
    pub access_token: String,
    pub account_uid: String,
    pub customer_name: String,
    pub spending_period: SpendingPeriod,
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub store: bool,
}

#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub to_number: String,
    pub from_number: String,
    pub voice: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub banking: BankingConfig,
    pub completion: CompletionConfig,
    pub voice: VoiceConfig,
    pub api_port: u16,
}

impl Config {
    /// Load configuration from the process environment (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let spending_period = match (
            optional("STARLING_SPENDING_YEAR"),
            optional("STARLING_SPENDING_MONTH"),
        ) {
            (Some(year), Some(month)) => parse_period(&year, &month)?,
            (None, None) => SpendingPeriod::previous_month(Utc::now().date_naive()),
            _ => {
                return Err(InsightError::ConfigError(
                    "STARLING_SPENDING_YEAR and STARLING_SPENDING_MONTH must be set together"
                        .to_string(),
                ))
            }
        };

        let banking = BankingConfig {
            base_url: optional("STARLING_BASE_URL")
                .unwrap_or_else(|| DEFAULT_STARLING_BASE_URL.to_string()),
            access_token: required("STARLING_ACCESS_TOKEN")?,
            account_uid: required("STARLING_ACCOUNT_UID")?,
            customer_name: optional("INSIGHT_CUSTOMER_NAME")
                .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string()),
            spending_period,
        };

        let completion = CompletionConfig {
            base_url: optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            api_key: required("OPENAI_API_KEY")?,
            model: optional("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            store: match optional("OPENAI_STORE") {
                Some(value) => parse_bool("OPENAI_STORE", &value)?,
                None => true,
            },
        };

        let voice = VoiceConfig {
            base_url: optional("TWILIO_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TWILIO_BASE_URL.to_string()),
            account_sid: required("TWILIO_ACCOUNT_SID")?,
            auth_token: required("TWILIO_AUTH_TOKEN")?,
            to_number: required("TWILIO_TO_NUMBER")?,
            from_number: required("TWILIO_FROM_NUMBER")?,
            voice: optional("TWILIO_VOICE"),
        };

        let api_port = match optional("PORT").or_else(|| optional("API_PORT")) {
            Some(port) => port.parse().map_err(|_| {
                InsightError::ConfigError(format!("Invalid port: {}", port))
            })?,
            None => DEFAULT_API_PORT,
        };

        Ok(Self {
            banking,
            completion,
            voice,
            api_port,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).ok_or_else(|| InsightError::ConfigError(format!("{} is not set", key)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(InsightError::ConfigError(format!(
            "{} must be a boolean, got {}",
            key, value
        ))),
    }
}

fn month_from_number(month: u32) -> Option<Month> {
    u8::try_from(month).ok().and_then(|m| Month::try_from(m).ok())
}

/// Parse a year plus a month given either as a number (`2`) or a name (`february`)
fn parse_period(year: &str, month: &str) -> Result<SpendingPeriod> {
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| InsightError::ConfigError(format!("Invalid spending year: {}", year)))?;

    let month_value = month.trim();
    let parsed = match month_value.parse::<u32>() {
        Ok(number) => month_from_number(number),
        Err(_) => month_value.parse::<Month>().ok(),
    };

    let month = parsed.ok_or_else(|| {
        InsightError::ConfigError(format!("Invalid spending month: {}", month_value))
    })?;

    Ok(SpendingPeriod { year, month })
}
