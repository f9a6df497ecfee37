// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::common::{JsonRpcError, RpcErrorObject};

pub const JSON_RPC_VERSION: &str = "2.0";

/// The outgoing JSON-RPC envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a, T> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: T,
    pub id: u64,
}

impl<'a, T> JsonRpcRequest<'a, T> {
    pub fn new(id: u64, method: &'a str, params: T) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION,
            method,
            params,
            id,
        }
    }
}

/// The incoming JSON-RPC envelope, before its `result` is interpreted.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: u64,
    /// `Some(Value::Null)` for an explicit `null`, `None` when the field is absent.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl JsonRpcResponse {
    /// Checks the envelope against the request `id` and extracts the raw result.
    pub fn into_result(self, id: u64) -> Result<Value, JsonRpcError> {
        if self.jsonrpc != JSON_RPC_VERSION {
            return Err(JsonRpcError::WrongJsonRpcVersion(self.jsonrpc));
        }
        if self.id != id {
            return Err(JsonRpcError::IdIsNotMatching {
                expected: id,
                received: self.id,
            });
        }
        if let Some(error) = self.error {
            return Err(error.into());
        }
        // A `null` result is legitimate, e.g. for a receipt that is not mined yet.
        self.result.ok_or(JsonRpcError::MissingResult)
    }
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A transport able to carry JSON-RPC payloads to a node.
#[async_trait]
pub trait JsonRpcClient: Send + Sync {
    type Error: From<serde_json::Error> + From<JsonRpcError> + Send;

    /// Returns the id to use for the next request.
    async fn get_id(&self) -> u64;

    /// Sends a serialized request and returns the serialized response.
    async fn request_inner(&self, payload: Vec<u8>) -> Result<Vec<u8>, Self::Error>;

    /// Sends a request and returns the raw `result` value of the response.
    async fn request_value<T>(&self, method: &str, params: T) -> Result<Value, Self::Error>
    where
        T: Serialize + Send,
    {
        let id = self.get_id().await;
        let payload = serde_json::to_vec(&JsonRpcRequest::new(id, method, params))?;
        tracing::debug!(method, id, "sending JSON-RPC request");
        let body = self.request_inner(payload).await?;
        let response: JsonRpcResponse = serde_json::from_slice(&body)?;
        Ok(response.into_result(id)?)
    }

    /// Sends a request and deserializes the `result` of the response.
    async fn request<T, S>(&self, method: &str, params: T) -> Result<S, Self::Error>
    where
        T: Serialize + Send,
        S: DeserializeOwned,
    {
        let value = self.request_value(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
#[path = "unit_tests/client_tests.rs"]
mod tests;
