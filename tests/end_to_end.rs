use account_insight::config::{
    BankingConfig, CompletionConfig, Config, SpendingPeriod, VoiceConfig,
};
use account_insight::{build_pipeline, InsightError, PipelineState};
use chrono::Month;
use httpmock::prelude::*;
use serde_json::json;

fn config_for(bank: &MockServer, llm: &MockServer, voice: &MockServer) -> Config {
    Config {
        banking: BankingConfig {
            base_url: bank.base_url(),
            access_token: "starling-token".to_string(),
            account_uid: "acc-1".to_string(),
            customer_name: "Mike".to_string(),
            spending_period: SpendingPeriod {
                year: 2025,
                month: Month::February,
            },
        },
        completion: CompletionConfig {
            base_url: llm.base_url(),
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            store: true,
        },
        voice: VoiceConfig {
            base_url: voice.base_url(),
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            to_number: "+447700900001".to_string(),
            from_number: "+447700900002".to_string(),
            voice: None,
        },
        api_port: 0,
    }
}

async fn mock_bank(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/accounts/acc-1/balance");
            then.status(200).json_body(json!({
                "amount": {"currency": "GBP", "minorUnits": 123456}
            }));
        })
        .await;

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/accounts/acc-1/spending-insights/spending-category");
            then.status(200).json_body(json!({
                "totalSpent": 200.0,
                "breakdown": [
                    {"spendingCategory": "Groceries", "totalSpent": 80.0},
                    {"spendingCategory": "Transport", "totalSpent": 40.0}
                ]
            }));
        })
        .await;

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/direct-debit/mandates/account/acc-1");
            then.status(200).json_body(json!({
                "mandates": [{"reference": "Gym", "status": "active"}]
            }));
        })
        .await;
}

#[tokio::test]
async fn summary_is_produced_and_delivered() {
    let bank = MockServer::start_async().await;
    let llm = MockServer::start_async().await;
    let voice = MockServer::start_async().await;

    mock_bank(&bank).await;

    let completion = llm
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_contains("Groceries: £80.00")
                .body_contains("Upcoming direct debit: Gym");
            then.status(200).json_body(json!({
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello, your balance is fine."}
                }]
            }));
        })
        .await;

    let call = voice
        .mock_async(|when, then| {
            when.method(POST)
                .path("/2010-04-01/Accounts/AC123/Calls.json")
                .x_www_form_urlencoded_tuple(
                    "Twiml",
                    "<Response><Say>Hello, your balance is fine.</Say></Response>",
                );
            then.status(201).body(r#"{"sid": "CA1"}"#);
        })
        .await;

    let pipeline = build_pipeline(&config_for(&bank, &llm, &voice)).unwrap();

    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.text, "Hello, your balance is fine.");
    assert_eq!(pipeline.state(), PipelineState::Ready);

    pipeline.notify().await.unwrap();

    completion.assert_async().await;
    call.assert_hits_async(1).await;
}

#[tokio::test]
async fn empty_choices_fail_without_calling() {
    let bank = MockServer::start_async().await;
    let llm = MockServer::start_async().await;
    let voice = MockServer::start_async().await;

    mock_bank(&bank).await;

    llm.mock_async(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(json!({ "choices": [] }));
    })
    .await;

    let call = voice
        .mock_async(|when, then| {
            when.method(POST);
            then.status(201);
        })
        .await;

    let pipeline = build_pipeline(&config_for(&bank, &llm, &voice)).unwrap();

    assert!(matches!(
        pipeline.run().await,
        Err(InsightError::NoCompletionError)
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);

    assert!(matches!(
        pipeline.notify().await,
        Err(InsightError::NotReadyError)
    ));
    call.assert_hits_async(0).await;
}
