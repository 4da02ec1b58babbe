//! Banking data aggregation
//!
//! Fetches balance, category spending and direct debits from the banking
//! provider and composes them into a single account narrative.

use crate::models::{AccountBalance, AccountNarrative, DirectDebitSet, SpendingBreakdown};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub mod starling;
pub use starling::StarlingClient;

/// Read-only access to one account at the banking provider
#[async_trait]
pub trait BankingProvider: Send + Sync {
    async fn fetch_balance(&self) -> Result<AccountBalance>;
    async fn fetch_spending(&self) -> Result<SpendingBreakdown>;
    async fn fetch_direct_debits(&self) -> Result<DirectDebitSet>;
}

/// Builds one [`AccountNarrative`] out of three independent fetches
pub struct BankDataAggregator {
    provider: Arc<dyn BankingProvider>,
    customer_name: String,
}

impl BankDataAggregator {
    pub fn new(provider: Arc<dyn BankingProvider>, customer_name: impl Into<String>) -> Self {
        Self {
            provider,
            customer_name: customer_name.into(),
        }
    }

    /// Fetch all three resources and compose the narrative.
    ///
    /// The fetches run concurrently; the first failure drops the others and
    /// is returned as-is, so no partial narrative is ever produced.
    pub async fn collect(&self) -> Result<AccountNarrative> {
        debug!("Fetching balance, spending and direct debits");

        let (balance, spending, debits) = tokio::try_join!(
            self.provider.fetch_balance(),
            self.provider.fetch_spending(),
            self.provider.fetch_direct_debits(),
        )?;

        info!(
            categories = spending.categories.len(),
            mandates = debits.mandates.len(),
            "Banking data collected"
        );

        Ok(compose_narrative(
            &self.customer_name,
            &balance,
            &spending,
            &debits,
        ))
    }
}

/// Compose the narrative in fixed order: greeting, balance, total spend,
/// categories, mandates.
pub fn compose_narrative(
    customer_name: &str,
    balance: &AccountBalance,
    spending: &SpendingBreakdown,
    debits: &DirectDebitSet,
) -> AccountNarrative {
    let mut lines = Vec::with_capacity(3 + spending.categories.len() + debits.mandates.len());

    lines.push(format!(
        "Hello {}, hope you are doing great. We would like to provide a quick summary of your account and remind you of upcoming debits.",
        customer_name
    ));

    lines.push(format!(
        "Balance: {}",
        format_minor_units(balance.amount.minor_units, &balance.amount.currency)
    ));

    let spending_currency = spending
        .currency
        .as_deref()
        .unwrap_or(&balance.amount.currency);

    lines.push(format!(
        "The total spending of last month was {}. The top spendings are:",
        format_major_units(spending.total_spent, spending_currency)
    ));

    for category in &spending.categories {
        lines.push(format!(
            "{}: {}",
            category.name,
            format_major_units(category.total_spent, spending_currency)
        ));
    }

    for mandate in &debits.mandates {
        lines.push(format!("Upcoming direct debit: {}", mandate.reference));
    }

    AccountNarrative(lines.join("\n"))
}

/// Render an integer minor-unit amount (pence, cents) in major units
pub fn format_minor_units(minor_units: i64, currency: &str) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    let major = format!("{}.{:02}", abs / 100, abs % 100);
    format!("{}{}", sign, with_currency(&major, currency))
}

pub fn format_major_units(amount: f64, currency: &str) -> String {
    let major = format!("{:.2}", amount.abs());
    // sign goes in front of the symbol; "-0.00" renders unsigned
    let sign = if amount < 0.0 && major.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{}{}", sign, with_currency(&major, currency))
}

fn with_currency(amount: &str, currency: &str) -> String {
    match currency.to_uppercase().as_str() {
        "GBP" => format!("£{}", amount),
        "EUR" => format!("€{}", amount),
        "USD" => format!("${}", amount),
        other => format!("{} {}", amount, other),
    }
}
