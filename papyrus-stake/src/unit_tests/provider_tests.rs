// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use alloy_primitives::U256;
use alloy_sol_types::SolCall as _;
use assert_matches::assert_matches;
use futures::StreamExt as _;
use serde_json::json;

use super::*;
use crate::{
    common::BIOS_ADDRESS,
    contract::{stakesCall, ContractHandle, TransactionKind},
    test_utils::{ether, MockChain, MockNode, TEST_ACCOUNT},
};

fn fast_watcher(confirmations: u64) -> WatcherConfig {
    WatcherConfig {
        poll_interval: Duration::from_millis(10),
        confirmations,
    }
}

#[test]
fn test_send_transaction_params() {
    let contract = ContractHandle::new(BIOS_ADDRESS);
    let freeze = TransactionRequest::freeze(TEST_ACCOUNT, &contract, U256::from(16));
    let params = serde_json::to_value(SendTransactionParams::from(&freeze)).unwrap();
    assert_eq!(params["value"], json!("0x10"));
    assert_eq!(params.get("gas"), None);

    let withdraw = TransactionRequest::withdraw(TEST_ACCOUNT, &contract);
    let params = serde_json::to_value(SendTransactionParams::from(&withdraw)).unwrap();
    assert_eq!(params["gas"], json!("0x186a0"));
    assert_eq!(params.get("value"), None);
    assert_eq!(params["data"], json!("0x3ccfd60b"));
}

#[test_log::test(tokio::test)]
async fn test_queries() -> anyhow::Result<()> {
    let node = MockNode::start(MockChain::default()).await?;
    let provider = HttpWalletProvider::new(node.url(), WatcherConfig::default());

    assert_eq!(provider.accounts().await?, [TEST_ACCOUNT]);
    assert_eq!(provider.network_id().await?, 323138);
    assert_eq!(provider.balance(TEST_ACCOUNT).await?, ether(5));

    let data = stakesCall {
        account: TEST_ACCOUNT,
    }
    .abi_encode();
    let output = provider.call(TEST_ACCOUNT, BIOS_ADDRESS, data.into()).await?;
    assert_eq!(stakesCall::abi_decode_returns(&output)?, ether(2));

    assert_eq!(
        node.methods(),
        ["eth_accounts", "net_version", "eth_getBalance", "eth_call"]
    );
    // Ids increase from 1.
    let ids = node
        .requests()
        .iter()
        .map(|request| request.body["id"].as_u64().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(ids, [1, 2, 3, 4]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_raw_request_error() -> anyhow::Result<()> {
    let node = MockNode::start(MockChain::default()).await?;
    let provider = HttpWalletProvider::new(node.url(), WatcherConfig::default());
    let error = provider
        .request("eth_unknown", json!([]))
        .await
        .unwrap_err();
    assert!(error.to_string().contains("does not exist"), "{error}");
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_transaction_events() -> anyhow::Result<()> {
    let node = MockNode::start(MockChain {
        blocks_mined_after: 2,
        ..MockChain::default()
    })
    .await?;
    let provider = HttpWalletProvider::new(node.url(), fast_watcher(2));
    let contract = ContractHandle::new(BIOS_ADDRESS);
    let request = TransactionRequest::freeze(TEST_ACCOUNT, &contract, ether(1));
    assert_eq!(request.kind, TransactionKind::Freeze);

    let events = provider
        .send_transaction(request)
        .await
        .collect::<Vec<_>>()
        .await;
    let TransactionEvent::HashAssigned(hash) = events[0] else {
        panic!("unexpected first event: {:?}", events[0]);
    };
    let mined_at = node.chain().receipts[&hash].block_number;
    assert_eq!(
        events[1..],
        [
            TransactionEvent::Confirmation(0),
            TransactionEvent::Confirmation(1),
            TransactionEvent::Confirmation(2),
            TransactionEvent::Receipt {
                block_number: mined_at
            },
        ]
    );
    assert_eq!(node.chain().stakes[&TEST_ACCOUNT], ether(3));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_rejected_transaction() -> anyhow::Result<()> {
    let node = MockNode::start(MockChain {
        rejection: Some("User denied transaction signature".to_string()),
        ..MockChain::default()
    })
    .await?;
    let provider = HttpWalletProvider::new(node.url(), fast_watcher(0));
    let contract = ContractHandle::new(BIOS_ADDRESS);
    let events = provider
        .send_transaction(TransactionRequest::withdraw(TEST_ACCOUNT, &contract))
        .await
        .collect::<Vec<_>>()
        .await;
    assert_eq!(events.len(), 1);
    assert!(
        matches!(&events[0], TransactionEvent::Failed(message) if message.contains("User denied")),
        "{events:?}"
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_reverted_transaction() -> anyhow::Result<()> {
    let node = MockNode::start(MockChain::default()).await?;
    let provider = HttpWalletProvider::new(node.url(), fast_watcher(0));
    let contract = ContractHandle::new(BIOS_ADDRESS);
    // More than the 2 units staked by the test account.
    let request = TransactionRequest::melt(TEST_ACCOUNT, &contract, ether(10));
    let events = provider
        .send_transaction(request)
        .await
        .collect::<Vec<_>>()
        .await;
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], TransactionEvent::HashAssigned(_)));
    assert_eq!(
        events[1],
        TransactionEvent::Failed("transaction reverted".to_string())
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_watcher_stops_once_the_events_are_dropped() -> anyhow::Result<()> {
    let node = MockNode::start(MockChain {
        mining: false,
        ..MockChain::default()
    })
    .await?;
    let provider = HttpWalletProvider::new(node.url(), fast_watcher(0));
    let contract = ContractHandle::new(BIOS_ADDRESS);
    let mut events = provider
        .send_transaction(TransactionRequest::withdraw(TEST_ACCOUNT, &contract))
        .await;
    assert_matches!(events.next().await, Some(TransactionEvent::HashAssigned(_)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(node.receipt_polls() > 0);

    drop(events);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let polls = node.receipt_polls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(node.receipt_polls(), polls);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_watcher_stops_waiting_for_confirmations() -> anyhow::Result<()> {
    let node = MockNode::start(MockChain::default()).await?;
    let provider = HttpWalletProvider::new(node.url(), fast_watcher(5));
    let contract = ContractHandle::new(BIOS_ADDRESS);
    let mut events = provider
        .send_transaction(TransactionRequest::withdraw(TEST_ACCOUNT, &contract))
        .await;
    assert_matches!(events.next().await, Some(TransactionEvent::HashAssigned(_)));
    assert_eq!(events.next().await, Some(TransactionEvent::Confirmation(0)));

    // No block is mined on top, so the watcher would wait forever.
    drop(events);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let polls = node
        .methods()
        .iter()
        .filter(|method| *method == "eth_blockNumber")
        .count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let later = node
        .methods()
        .iter()
        .filter(|method| *method == "eth_blockNumber")
        .count();
    assert_eq!(later, polls);
    Ok(())
}
