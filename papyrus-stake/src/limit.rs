// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The `eth_getLimit` extension of the Papyrus nodes.
//!
//! The method is not part of the contract ABI. Its result is passed through without
//! interpretation.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::{
    client::JsonRpcClient as _, common::ProviderError, provider::HttpJsonRpcClient,
    provider::WalletProvider,
};

pub const GET_LIMIT_METHOD: &str = "eth_getLimit";

/// Where to send the `eth_getLimit` query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitSource {
    /// Through the raw JSON-RPC passthrough of the wallet provider.
    #[default]
    Provider,
    /// Directly to a JSON-RPC gateway over HTTP.
    Gateway(Url),
}

fn params(account: Address) -> Value {
    json!([account, "latest"])
}

/// Queries the limit of `account` and returns the raw `result` field.
pub async fn get_limit<P>(
    source: &LimitSource,
    provider: &P,
    account: Address,
) -> Result<Value, ProviderError>
where
    P: WalletProvider + ?Sized,
{
    match source {
        LimitSource::Provider => provider.request(GET_LIMIT_METHOD, params(account)).await,
        LimitSource::Gateway(url) => {
            // A fresh client, so the request carries the id 1.
            let client = HttpJsonRpcClient::new(url.clone());
            client.request_value(GET_LIMIT_METHOD, params(account)).await
        }
    }
}

/// The text shown for a limit value: strings as-is, anything else as JSON.
pub fn limit_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        value => value.to_string(),
    }
}

#[cfg(test)]
#[path = "unit_tests/limit_tests.rs"]
mod tests;
