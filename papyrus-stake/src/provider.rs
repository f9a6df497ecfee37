// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_lock::Mutex;
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedSender;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::{
    client::JsonRpcClient,
    common::ProviderError,
    contract::TransactionRequest,
    lifecycle::{self, TransactionEvent, TransactionEvents},
};

/// The capability a wallet provider grants to the session client.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// The accounts the provider can sign for. The first one is the active account.
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// The identifier of the network the provider is connected to.
    async fn network_id(&self) -> Result<u64, ProviderError>;

    /// The native balance of `address` at the latest block.
    async fn balance(&self, address: Address) -> Result<U256, ProviderError>;

    /// Executes a read-only contract call at the latest block.
    async fn call(&self, from: Address, to: Address, data: Bytes) -> Result<Bytes, ProviderError>;

    /// Submits a transaction. Rejections are reported in the returned event stream.
    async fn send_transaction(&self, request: TransactionRequest) -> TransactionEvents;

    /// Forwards a raw JSON-RPC request and returns its `result`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

#[async_trait]
impl<P: WalletProvider + ?Sized> WalletProvider for Arc<P> {
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        (**self).accounts().await
    }

    async fn network_id(&self) -> Result<u64, ProviderError> {
        (**self).network_id().await
    }

    async fn balance(&self, address: Address) -> Result<U256, ProviderError> {
        (**self).balance(address).await
    }

    async fn call(&self, from: Address, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        (**self).call(from, to, data).await
    }

    async fn send_transaction(&self, request: TransactionRequest) -> TransactionEvents {
        (**self).send_transaction(request).await
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        (**self).request(method, params).await
    }
}

/// A JSON-RPC endpoint reached over HTTP.
pub struct HttpJsonRpcClient {
    pub url: Url,
    pub id: Mutex<u64>,
    client: Client,
}

#[async_trait]
impl JsonRpcClient for HttpJsonRpcClient {
    type Error = ProviderError;

    async fn get_id(&self) -> u64 {
        let mut id = self.id.lock().await;
        let current = *id;
        *id += 1;
        current
    }

    async fn request_inner(&self, payload: Vec<u8>) -> Result<Vec<u8>, Self::Error> {
        let res = self
            .client
            .post(self.url.clone())
            .body(payload)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(ProviderError::HttpStatus(res.status()));
        }
        let body = res.bytes().await?;
        Ok(body.as_ref().to_vec())
    }
}

impl HttpJsonRpcClient {
    /// Creates a client for the endpoint at `url`. The first request uses the id 1.
    pub fn new(url: Url) -> Self {
        let id = Mutex::new(1);
        Self {
            url,
            id,
            client: Client::new(),
        }
    }
}

/// Fields of `eth_sendTransaction`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendTransactionParams {
    from: Address,
    to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<U256>,
    data: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas: Option<U64>,
}

impl From<&TransactionRequest> for SendTransactionParams {
    fn from(request: &TransactionRequest) -> Self {
        Self {
            from: request.from,
            to: request.to,
            value: request.value,
            data: request.data.clone(),
            gas: (request.gas_limit != 0).then(|| U64::from(request.gas_limit)),
        }
    }
}

/// The subset of a transaction receipt the client looks at.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<U64>,
    #[serde(default)]
    pub status: Option<U64>,
}

/// Settings of the receipt watcher spawned for each submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Delay between two receipt or block number queries.
    pub poll_interval: Duration,
    /// Number of blocks to wait on top of the one including the transaction.
    pub confirmations: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            confirmations: 0,
        }
    }
}

/// A wallet provider backed by a node that manages the user's accounts.
#[derive(Clone)]
pub struct HttpWalletProvider {
    client: Arc<HttpJsonRpcClient>,
    watcher: WatcherConfig,
}

impl HttpWalletProvider {
    pub fn new(url: Url, watcher: WatcherConfig) -> Self {
        Self {
            client: Arc::new(HttpJsonRpcClient::new(url)),
            watcher,
        }
    }

    pub fn url(&self) -> &Url {
        &self.client.url
    }

    async fn receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>, ProviderError> {
        self.client
            .request("eth_getTransactionReceipt", [hash])
            .await
    }

    async fn block_number(&self) -> Result<u64, ProviderError> {
        let number: U64 = self.client.request("eth_blockNumber", json!([])).await?;
        Ok(number.to())
    }

    /// Polls until the transaction is mined, then emits confirmations and the receipt.
    async fn watch(self, hash: B256, sender: UnboundedSender<TransactionEvent>) {
        if let Err(error) = self.watch_inner(hash, &sender).await {
            tracing::warn!(%hash, %error, "lost track of transaction");
            let _ = sender.unbounded_send(TransactionEvent::Failed(error.to_string()));
        }
    }

    async fn watch_inner(
        &self,
        hash: B256,
        sender: &UnboundedSender<TransactionEvent>,
    ) -> Result<(), ProviderError> {
        let (receipt, mined_at) = loop {
            if sender.is_closed() {
                tracing::debug!(%hash, "stopped watching an unmined transaction");
                return Ok(());
            }
            if let Some(receipt) = self.receipt(hash).await? {
                if let Some(block_number) = receipt.block_number {
                    break (receipt, block_number.to::<u64>());
                }
            }
            tokio::time::sleep(self.watcher.poll_interval).await;
        };
        if receipt.status == Some(U64::ZERO) {
            let _ = sender.unbounded_send(TransactionEvent::Failed(
                "transaction reverted".to_string(),
            ));
            return Ok(());
        }
        let mut confirmed = 0;
        let _ = sender.unbounded_send(TransactionEvent::Confirmation(confirmed));
        while confirmed < self.watcher.confirmations {
            tokio::time::sleep(self.watcher.poll_interval).await;
            if sender.is_closed() {
                tracing::debug!(%hash, confirmed, "stopped waiting for confirmations");
                return Ok(());
            }
            let depth = self.block_number().await?.saturating_sub(mined_at);
            while confirmed < depth.min(self.watcher.confirmations) {
                confirmed += 1;
                let _ = sender.unbounded_send(TransactionEvent::Confirmation(confirmed));
            }
        }
        let _ = sender.unbounded_send(TransactionEvent::Receipt {
            block_number: mined_at,
        });
        Ok(())
    }
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.client.request("eth_accounts", json!([])).await
    }

    async fn network_id(&self) -> Result<u64, ProviderError> {
        let version: String = self.client.request("net_version", json!([])).await?;
        Ok(version.parse()?)
    }

    async fn balance(&self, address: Address) -> Result<U256, ProviderError> {
        self.client
            .request("eth_getBalance", json!([address, "latest"]))
            .await
    }

    async fn call(&self, from: Address, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        let call = json!({ "from": from, "to": to, "data": data });
        self.client.request("eth_call", json!([call, "latest"])).await
    }

    async fn send_transaction(&self, request: TransactionRequest) -> TransactionEvents {
        let (sender, events) = lifecycle::channel();
        let params = SendTransactionParams::from(&request);
        match self
            .client
            .request::<_, B256>("eth_sendTransaction", [params])
            .await
        {
            Ok(hash) => {
                let _ = sender.unbounded_send(TransactionEvent::HashAssigned(hash));
                tokio::spawn(self.clone().watch(hash, sender));
            }
            Err(error) => {
                let _ = sender.unbounded_send(TransactionEvent::Failed(error.to_string()));
            }
        }
        events
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.client.request_value(method, params).await
    }
}

#[cfg(test)]
#[path = "unit_tests/provider_tests.rs"]
mod tests;
