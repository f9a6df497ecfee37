// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! An in-memory Papyrus chain, reachable either directly as a [`WalletProvider`] or over
//! HTTP through [`MockNode`].

use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
};

use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall as _, SolValue as _};
use async_trait::async_trait;
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use futures::StreamExt as _;
use serde_json::{json, Value};
use url::Url;

use crate::{
    common::{ProviderError, RpcErrorObject, BIOS_ADDRESS, PAPYRUS_NETWORK_ID},
    contract::{biosCall, freezeCall, meltCall, stakesCall, versionCall, withdrawCall},
    contract::{TransactionKind, TransactionRequest},
    lifecycle::{TransactionEvent, TransactionEvents},
    limit::GET_LIMIT_METHOD,
    provider::WalletProvider,
};

/// The account the mock chain unlocks by default.
pub const TEST_ACCOUNT: Address = address!("00000000000000000000000000000000000000aa");

/// The versioner contract of the mock chain, when one is configured.
pub const TEST_VERSIONER: Address = address!("0000000000000000000000000000000000000011");

/// One unit, i.e. `10^18` raw units.
pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u128.pow(18))
}

fn rpc_error(message: impl Into<String>) -> RpcErrorObject {
    RpcErrorObject {
        code: -32000,
        message: message.into(),
        data: None,
    }
}

/// A mined transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockReceipt {
    pub hash: B256,
    pub block_number: u64,
    pub success: bool,
}

/// The state of the mock chain.
#[derive(Clone, Debug)]
pub struct MockChain {
    pub accounts: Vec<Address>,
    pub network_id: u64,
    pub balances: BTreeMap<Address, U256>,
    /// The address returned by the versioner's `bios()`.
    pub versioned_bios: Address,
    pub bios: Address,
    pub version: String,
    pub stakes: BTreeMap<Address, U256>,
    pub limit: Result<Value, RpcErrorObject>,
    pub block_number: u64,
    pub receipts: BTreeMap<B256, MockReceipt>,
    /// When set, `eth_sendTransaction` fails with this message.
    pub rejection: Option<String>,
    /// Blocks mined on top of each transaction right after it.
    pub blocks_mined_after: u64,
    /// When unset, accepted transactions stay pending forever.
    pub mining: bool,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            accounts: vec![TEST_ACCOUNT],
            network_id: PAPYRUS_NETWORK_ID,
            balances: BTreeMap::from([(TEST_ACCOUNT, ether(5)), (BIOS_ADDRESS, ether(100))]),
            versioned_bios: BIOS_ADDRESS,
            bios: BIOS_ADDRESS,
            version: "1.0.0".to_string(),
            stakes: BTreeMap::from([(TEST_ACCOUNT, ether(2))]),
            limit: Ok(json!("0x2a")),
            block_number: 1,
            receipts: BTreeMap::new(),
            rejection: None,
            blocks_mined_after: 0,
            mining: true,
        }
    }
}

impl MockChain {
    pub fn balance(&self, address: Address) -> U256 {
        self.balances.get(&address).copied().unwrap_or_default()
    }

    /// Executes a read-only call.
    pub fn call(&self, to: Address, data: &[u8]) -> Result<Bytes, RpcErrorObject> {
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|selector| selector.try_into().ok())
            .ok_or_else(|| rpc_error("missing selector"))?;
        if to == TEST_VERSIONER && selector == biosCall::SELECTOR {
            return Ok((self.versioned_bios,).abi_encode_params().into());
        }
        if to != self.bios {
            return Err(rpc_error("execution reverted"));
        }
        if selector == versionCall::SELECTOR {
            Ok((self.version.clone(),).abi_encode_params().into())
        } else if selector == stakesCall::SELECTOR {
            let call = stakesCall::abi_decode(data).map_err(|e| rpc_error(e.to_string()))?;
            let stake = self.stakes.get(&call.account).copied().unwrap_or_default();
            Ok((stake,).abi_encode_params().into())
        } else {
            Err(rpc_error("execution reverted"))
        }
    }

    /// Applies a transaction and mines it in a new block, unless mining is off.
    pub fn execute(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        data: &[u8],
    ) -> Result<MockReceipt, RpcErrorObject> {
        if let Some(message) = &self.rejection {
            return Err(rpc_error(message.clone()));
        }
        if self.balance(from) < value {
            return Err(rpc_error("insufficient funds for gas * price + value"));
        }
        let success = self.mining && to == self.bios && self.apply(from, value, data);
        self.block_number += 1;
        let mut hash = [0xab; 32];
        hash[24..].copy_from_slice(&self.block_number.to_be_bytes());
        let hash = B256::from(hash);
        let receipt = MockReceipt {
            hash,
            block_number: self.block_number,
            success,
        };
        if self.mining {
            self.receipts.insert(hash, receipt.clone());
            self.block_number += self.blocks_mined_after;
        }
        Ok(receipt)
    }

    fn apply(&mut self, from: Address, value: U256, data: &[u8]) -> bool {
        let Some(selector) = data.get(..4).and_then(|prefix| <[u8; 4]>::try_from(prefix).ok())
        else {
            return false;
        };
        if selector == freezeCall::SELECTOR {
            *self.balances.entry(from).or_default() -= value;
            *self.balances.entry(self.bios).or_default() += value;
            *self.stakes.entry(from).or_default() += value;
            true
        } else if selector == meltCall::SELECTOR {
            let Ok(call) = meltCall::abi_decode(data) else {
                return false;
            };
            let stake = self.stakes.entry(from).or_default();
            if *stake < call.amount || !value.is_zero() {
                return false;
            }
            *stake -= call.amount;
            true
        } else {
            selector == withdrawCall::SELECTOR && value.is_zero()
        }
    }

    fn limit(&self) -> Result<Value, RpcErrorObject> {
        self.limit.clone()
    }
}

/// A call received by a [`MockWalletProvider`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockCall {
    Accounts,
    NetworkId,
    Balance(Address),
    Call { to: Address, selector: [u8; 4] },
    SendTransaction(TransactionKind),
    Request(String),
}

/// A [`WalletProvider`] answering from a [`MockChain`] and logging every call.
#[derive(Default)]
pub struct MockWalletProvider {
    chain: Mutex<MockChain>,
    calls: Mutex<Vec<MockCall>>,
    sent: Mutex<Vec<TransactionRequest>>,
    scripted_events: Mutex<Option<Vec<TransactionEvent>>>,
}

impl MockWalletProvider {
    pub fn new(chain: MockChain) -> Self {
        Self {
            chain: Mutex::new(chain),
            ..Self::default()
        }
    }

    pub fn chain(&self) -> MutexGuard<'_, MockChain> {
        self.chain.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// The number of contract calls made, versioner lookups included.
    pub fn contract_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockCall::Call { .. }))
            .count()
    }

    pub fn sent_transactions(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Makes the next submitted transaction report exactly `events`, without touching
    /// the chain.
    pub fn script_events(&self, events: Vec<TransactionEvent>) {
        *self.scripted_events.lock().unwrap() = Some(events);
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.record(MockCall::Accounts);
        Ok(self.chain().accounts.clone())
    }

    async fn network_id(&self) -> Result<u64, ProviderError> {
        self.record(MockCall::NetworkId);
        Ok(self.chain().network_id)
    }

    async fn balance(&self, address: Address) -> Result<U256, ProviderError> {
        self.record(MockCall::Balance(address));
        Ok(self.chain().balance(address))
    }

    async fn call(&self, _from: Address, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        let mut selector = [0; 4];
        if let Some(prefix) = data.get(..4) {
            selector.copy_from_slice(prefix);
        }
        self.record(MockCall::Call { to, selector });
        Ok(self.chain().call(to, &data)?)
    }

    async fn send_transaction(&self, request: TransactionRequest) -> TransactionEvents {
        self.record(MockCall::SendTransaction(request.kind));
        self.sent.lock().unwrap().push(request.clone());
        if let Some(events) = self.scripted_events.lock().unwrap().take() {
            return futures::stream::iter(events).boxed();
        }
        let (mining, result) = {
            let mut chain = self.chain();
            let result = chain.execute(
                request.from,
                request.to,
                request.value.unwrap_or_default(),
                &request.data,
            );
            (chain.mining, result)
        };
        let events = match result {
            Err(error) => vec![TransactionEvent::Failed(error.to_string())],
            Ok(receipt) if !mining => vec![TransactionEvent::HashAssigned(receipt.hash)],
            Ok(receipt) if !receipt.success => vec![
                TransactionEvent::HashAssigned(receipt.hash),
                TransactionEvent::Failed("transaction reverted".to_string()),
            ],
            Ok(receipt) => vec![
                TransactionEvent::HashAssigned(receipt.hash),
                TransactionEvent::Confirmation(0),
                TransactionEvent::Receipt {
                    block_number: receipt.block_number,
                },
            ],
        };
        futures::stream::iter(events).boxed()
    }

    async fn request(&self, method: &str, _params: Value) -> Result<Value, ProviderError> {
        self.record(MockCall::Request(method.to_string()));
        if method == GET_LIMIT_METHOD {
            Ok(self.chain().limit()?)
        } else {
            Err(rpc_error(format!("the method {method} does not exist")).into())
        }
    }
}

/// A request received by a [`MockNode`].
#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedRequest {
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct NodeState {
    chain: Arc<Mutex<MockChain>>,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

/// A JSON-RPC node serving a [`MockChain`] over HTTP on a local port.
pub struct MockNode {
    address: SocketAddr,
    state: NodeState,
}

impl MockNode {
    pub async fn start(chain: MockChain) -> anyhow::Result<Self> {
        let state = NodeState {
            chain: Arc::new(Mutex::new(chain)),
            requests: Arc::default(),
        };
        let app = Router::new()
            .route("/", post(serve_json_rpc))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                panic!("Error serving the mock node: {}", e);
            }
        });
        Ok(Self { address, state })
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.address)).expect("valid URL")
    }

    pub fn chain(&self) -> MutexGuard<'_, MockChain> {
        self.state.chain.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// The number of `eth_getTransactionReceipt` requests received so far.
    pub fn receipt_polls(&self) -> usize {
        self.methods()
            .iter()
            .filter(|method| *method == "eth_getTransactionReceipt")
            .count()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|request| request.body["method"].as_str().map(str::to_string))
            .collect()
    }
}

async fn serve_json_rpc(
    State(state): State<NodeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(ReceivedRequest {
        content_type,
        body: body.clone(),
    });
    let id = body["id"].clone();
    let method = body["method"].as_str().unwrap_or_default();
    let params = &body["params"];
    let mut chain = state.chain.lock().unwrap();
    let response = match answer(&mut chain, method, params) {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(error) => json!({ "jsonrpc": "2.0", "id": id, "error": error }),
    };
    Json(response)
}

fn parse<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, RpcErrorObject> {
    serde_json::from_value(value.clone()).map_err(|error| RpcErrorObject {
        code: -32602,
        message: error.to_string(),
        data: None,
    })
}

fn answer(chain: &mut MockChain, method: &str, params: &Value) -> Result<Value, RpcErrorObject> {
    match method {
        "eth_accounts" => Ok(json!(chain.accounts)),
        "net_version" => Ok(json!(chain.network_id.to_string())),
        "eth_blockNumber" => Ok(json!(format!("{:#x}", chain.block_number))),
        "eth_getBalance" => {
            let address: Address = parse(&params[0])?;
            Ok(json!(chain.balance(address)))
        }
        "eth_call" => {
            let to: Address = parse(&params[0]["to"])?;
            let data: Bytes = parse(&params[0]["data"])?;
            Ok(json!(chain.call(to, &data)?))
        }
        "eth_sendTransaction" => {
            let from: Address = parse(&params[0]["from"])?;
            let to: Address = parse(&params[0]["to"])?;
            let value: Option<U256> = parse(&params[0]["value"])?;
            let data: Bytes = parse(&params[0]["data"])?;
            let receipt = chain.execute(from, to, value.unwrap_or_default(), &data)?;
            Ok(json!(receipt.hash))
        }
        "eth_getTransactionReceipt" => {
            let hash: B256 = parse(&params[0])?;
            Ok(match chain.receipts.get(&hash) {
                Some(receipt) => json!({
                    "transactionHash": receipt.hash,
                    "blockNumber": format!("{:#x}", receipt.block_number),
                    "status": if receipt.success { "0x1" } else { "0x0" },
                }),
                None => Value::Null,
            })
        }
        GET_LIMIT_METHOD => chain.limit(),
        method => Err(RpcErrorObject {
            code: -32601,
            message: format!("the method {method} does not exist"),
            data: None,
        }),
    }
}
