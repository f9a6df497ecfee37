// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! This module provides a session client for staking on the Papyrus network through a
//! wallet provider.

pub mod client;
pub mod common;
pub mod contract;
pub mod display;
pub mod lifecycle;
pub mod limit;
pub mod provider;
pub mod session;

/// Helper types for tests.
#[cfg(any(test, feature = "test"))]
pub mod test_utils;

pub use common::{ClientError, ProviderError};
pub use session::{ClientConfig, Initialization, Session, StakeClient, TransactionOutcome};
