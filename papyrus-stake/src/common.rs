// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::num::ParseIntError;

use alloy_primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The network identifier of the Papyrus deployment.
pub const PAPYRUS_NETWORK_ID: u64 = 323138;

/// The address the bios contract is deployed at on the Papyrus network.
pub const BIOS_ADDRESS: Address = address!("0000000000000000000000000000000000000022");

/// Number of decimals between the raw balance unit and the displayed one.
pub const DECIMALS: u32 = 18;

/// The error object carried by a failed JSON-RPC response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("RPC error {code}: {message}")]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum JsonRpcError {
    /// The id should be matching
    #[error("the response id {received} does not match the request id {expected}")]
    IdIsNotMatching { expected: u64, received: u64 },

    /// wrong jsonrpc version
    #[error("wrong jsonrpc version {0:?}")]
    WrongJsonRpcVersion(String),

    /// Neither `result` nor `error` was present in the response
    #[error("the response has no result")]
    MissingResult,

    /// The node answered with an error object
    #[error(transparent)]
    Rpc(#[from] RpcErrorObject),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Malformed or failed JSON-RPC exchange
    #[error(transparent)]
    JsonRpc(#[from] JsonRpcError),

    /// Parsing error
    #[error(transparent)]
    ParseIntError(#[from] ParseIntError),

    /// ABI decoding error
    #[error(transparent)]
    AbiError(#[from] alloy_sol_types::Error),

    /// `serde_json` error
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// Reqwest error
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// The gateway answered with a non-success HTTP status
    #[error("HTTP request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
}

impl From<RpcErrorObject> for ProviderError {
    fn from(error: RpcErrorObject) -> Self {
        ProviderError::JsonRpc(JsonRpcError::Rpc(error))
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("wallet provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("the wallet provider did not expose any account")]
    NoAccount,
}

/// Formats a raw amount scaled down by `10^18`, e.g. `1500000000000000000` as `1.5`.
///
/// The conversion is exact: trailing zeros of the fractional part are dropped and no
/// decimal point is printed for whole amounts.
pub fn format_scaled(raw: U256) -> String {
    let unit = U256::from(10u128.pow(DECIMALS));
    let (whole, fraction) = raw.div_rem(unit);
    if fraction.is_zero() {
        return whole.to_string();
    }
    let fraction = format!("{:0>width$}", fraction.to_string(), width = DECIMALS as usize);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

#[cfg(test)]
#[path = "unit_tests/common_tests.rs"]
mod tests;
