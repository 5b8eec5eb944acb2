//! End-to-end behaviour of the counter chaincode through the host shim.

use counter_chaincode::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn identity() -> ClientIdentity {
    ClientIdentity::new("Org1MSP")
        .with_attribute("ChannelId", "mychannel")
        .with_attribute("AppId", "counter")
}

fn host() -> ChaincodeHost<CounterChaincode> {
    let config = ChaincodeConfig::parse("counter:1.0").unwrap();
    ChaincodeHost::new(
        CounterChaincode::new(config).unwrap(),
        Arc::new(InMemoryLedger::new()),
        "mychannel",
    )
}

async fn call(host: &ChaincodeHost<CounterChaincode>, function: &str, args: &[&str]) -> Response {
    host.invoke(Proposal::new(function, args).with_identity(identity()))
        .await
}

async fn counter(host: &ChaincodeHost<CounterChaincode>, key: &str) -> String {
    let response = call(host, "get", &[key]).await;
    assert!(response.is_success(), "get {key}: {}", response.message);
    String::from_utf8(response.payload.unwrap()).unwrap()
}

fn json_payload(response: &Response) -> Value {
    serde_json::from_slice(response.payload.as_deref().unwrap()).unwrap()
}

#[tokio::test]
async fn get_on_never_written_key_fails() {
    let host = host();
    let response = call(&host, "get", &["CAR0"]).await;

    assert_eq!(response.status, ResponseStatus::ErrorThreshold);
    assert_eq!(response.message, "CAR0 does not exist");
}

#[tokio::test]
async fn increment_then_get() {
    let host = host();

    assert!(call(&host, "increment", &["c"]).await.is_success());
    assert_eq!(counter(&host, "c").await, "1");

    assert!(call(&host, "increment", &["c"]).await.is_success());
    assert_eq!(counter(&host, "c").await, "2");

    // The explicit amount is added on top of the usual step.
    assert!(call(&host, "increment", &["c", "10"]).await.is_success());
    assert_eq!(counter(&host, "c").await, "13");
}

#[tokio::test]
async fn increment_returns_no_payload() {
    let host = host();
    let response = call(&host, "increment", &["c"]).await;
    assert!(response.is_success());
    assert_eq!(response.payload, None);
}

#[tokio::test]
async fn decrement_floors_at_zero() {
    let host = host();
    call(&host, "increment", &["c"]).await;

    assert!(call(&host, "decrement", &["c"]).await.is_success());
    assert_eq!(counter(&host, "c").await, "0");

    assert!(call(&host, "decrement", &["c"]).await.is_success());
    assert_eq!(counter(&host, "c").await, "0");
}

#[tokio::test]
async fn get_all_cars_on_empty_ledger() {
    let host = host();
    let response = call(&host, "getAllCars", &[""]).await;

    assert!(response.is_success());
    assert_eq!(response.payload, Some(b"[]".to_vec()));
    assert_eq!(host.ledger().open_iterators(), 0);
}

#[tokio::test]
async fn get_all_cars_is_half_open() {
    let host = host();
    for key in ["k1", "k2", "k3"] {
        call(&host, "increment", &[key]).await;
    }

    let response = call(&host, "getAllCars", &["k1", "k3"]).await;

    assert!(response.is_success());
    assert_eq!(
        json_payload(&response),
        json!([{"Key": "k1", "Record": 1}, {"Key": "k2", "Record": 1}])
    );
    assert_eq!(host.ledger().open_iterators(), 0);
}

#[tokio::test]
async fn get_all_cars_decodes_json_and_text() {
    let host = host();
    call(&host, "set", &["CAR0", r#"{"make":"Toyota","owner":"Tomoko"}"#]).await;
    call(&host, "set", &["CAR1", "plain text"]).await;

    let response = call(&host, "getAllCars", &["CAR0", "CAR9"]).await;

    assert_eq!(
        json_payload(&response),
        json!([
            {"Key": "CAR0", "Record": {"make": "Toyota", "owner": "Tomoko"}},
            {"Key": "CAR1", "Record": "plain text"}
        ])
    );
}

#[tokio::test]
async fn every_mutation_emits_one_event_matching_state() {
    let host = host();
    let mut events = host.ledger().subscribe();

    call(&host, "increment", &["c"]).await;
    call(&host, "increment", &["c", "3"]).await;
    call(&host, "decrement", &["c"]).await;

    let mut payloads = Vec::new();
    for _ in 0..3 {
        let committed = events.recv().await.unwrap();
        assert_eq!(committed.event.name, PUT_STATE_EVENT);
        payloads.push(String::from_utf8(committed.event.payload).unwrap());
    }
    assert_eq!(payloads, vec!["1", "5", "4"]);
    assert_eq!(counter(&host, "c").await, "4");
    assert_eq!(host.ledger().committed_events().unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_function_changes_nothing() {
    let host = host();
    call(&host, "set", &["k", "v"]).await;

    let response = call(&host, "transfer", &["k", "w"]).await;

    assert_eq!(response.status, ResponseStatus::NotFound);
    assert_eq!(response.status.code(), 404);
    assert_eq!(response.message, "Received unknown function transfer invocation");
    assert_eq!(host.ledger().state("k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(host.ledger().committed_events().unwrap().len(), 1);
}

#[tokio::test]
async fn identity_mismatch_changes_nothing() {
    let host = host();
    let wrong_channel = ClientIdentity::new("Org1MSP")
        .with_attribute("ChannelId", "otherchannel")
        .with_attribute("AppId", "counter");
    let wrong_app = ClientIdentity::new("Org1MSP")
        .with_attribute("ChannelId", "mychannel")
        .with_attribute("AppId", "marbles");

    for identity in [wrong_channel, wrong_app, ClientIdentity::new("Org1MSP")] {
        let response = host
            .invoke(Proposal::new("increment", &["c"]).with_identity(identity))
            .await;
        assert_eq!(response.status.code(), 400);
        assert_eq!(response.message, "Unauthorized");
    }

    assert_eq!(host.ledger().state("c").unwrap(), None);
    assert!(host.ledger().committed_events().unwrap().is_empty());
    assert_eq!(host.chaincode().stats().await.unauthorized, 3);
}

#[tokio::test]
async fn channel_attribute_follows_invocation_channel() {
    let host = host();
    let identity = ClientIdentity::new("Org1MSP")
        .with_attribute("ChannelId", "otherchannel")
        .with_attribute("AppId", "counter");

    let response = host
        .invoke(
            Proposal::new("increment", &["c"])
                .with_identity(identity)
                .on_channel("otherchannel"),
        )
        .await;

    assert!(response.is_success());
}

#[tokio::test]
async fn failed_validation_persists_nothing() {
    let host = host();
    call(&host, "set", &["c", "7"]).await;

    let response = call(&host, "increment", &["c", "seven"]).await;

    assert_eq!(response.status, ResponseStatus::ErrorThreshold);
    assert_eq!(counter(&host, "c").await, "7");
    assert_eq!(host.ledger().committed_events().unwrap().len(), 1);
}

#[tokio::test]
async fn increment_of_out_of_range_value_fails() {
    let host = host();
    call(&host, "set", &["d", "9223372036854775808"]).await;

    let response = call(&host, "increment", &["d"]).await;

    assert_eq!(response.status, ResponseStatus::ErrorThreshold);
    assert_eq!(response.message, "counter overflow for key d");
    assert_eq!(counter(&host, "d").await, "9223372036854775808");
    assert_eq!(host.ledger().committed_events().unwrap().len(), 1);
}

#[tokio::test]
async fn history_lists_every_committed_value() {
    let host = host();
    call(&host, "increment", &["c"]).await;
    call(&host, "increment", &["c"]).await;
    call(&host, "decrement", &["c"]).await;

    let response = call(&host, "getHistory", &["c"]).await;
    let history = json_payload(&response);
    let entries = history.as_array().unwrap();

    let values: Vec<&Value> = entries.iter().map(|e| &e["Value"]).collect();
    assert_eq!(values, vec![&json!(1), &json!(2), &json!(1)]);
    assert!(entries.iter().all(|e| e["IsDelete"] == "false"));
    assert!(entries.iter().all(|e| e["TxId"].as_str().unwrap().len() == 32));
}

#[tokio::test]
async fn init_leaves_state_untouched() {
    let host = host();
    let response = host
        .init(Proposal::new("init", &[]).with_identity(identity()))
        .await;

    assert!(response.is_success());
    assert!(host.ledger().is_empty().unwrap());
}
