// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The ABI of the bios staking contract and of the versioner that points to it.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};

use crate::{common::ProviderError, provider::WalletProvider};

sol! {
    function version() external view returns (string);

    function stakes(address account) external view returns (uint256);

    function freeze() external payable;

    function melt(uint256 amount) external;

    function withdraw() external;

    function bios() external view returns (address);
}

/// Gas limit hint sent with `freeze` and `melt`. Zero lets the provider estimate it.
pub const STAKE_GAS_LIMIT: u64 = 0;

/// Gas limit sent with `withdraw`.
pub const WITHDRAW_GAS_LIMIT: u64 = 100_000;

/// Where to find the bios contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractLocator {
    /// The contract lives at a configured address.
    Direct(Address),
    /// The address is read from the `bios()` view of a versioner contract.
    Versioner(Address),
}

/// The outcome of locating the bios contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Deployed(Address),
    NotDeployed,
}

impl Resolution {
    fn from_address(address: Address) -> Self {
        if address.is_zero() {
            Resolution::NotDeployed
        } else {
            Resolution::Deployed(address)
        }
    }

    /// The address to display, the zero address when nothing is deployed.
    pub fn address(&self) -> Address {
        match self {
            Resolution::Deployed(address) => *address,
            Resolution::NotDeployed => Address::ZERO,
        }
    }
}

impl ContractLocator {
    /// Resolves the live contract address, querying the versioner if needed.
    pub async fn resolve<P>(&self, provider: &P, from: Address) -> Result<Resolution, ProviderError>
    where
        P: WalletProvider + ?Sized,
    {
        match self {
            ContractLocator::Direct(address) => Ok(Resolution::from_address(*address)),
            ContractLocator::Versioner(versioner) => {
                let data = provider
                    .call(from, *versioner, biosCall {}.abi_encode().into())
                    .await?;
                let address = biosCall::abi_decode_returns(&data)?;
                tracing::debug!(%versioner, %address, "resolved bios address");
                Ok(Resolution::from_address(address))
            }
        }
    }
}

/// The bios contract at a resolved address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContractHandle {
    address: Address,
}

impl ContractHandle {
    pub(crate) fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn version<P>(&self, provider: &P, from: Address) -> Result<String, ProviderError>
    where
        P: WalletProvider + ?Sized,
    {
        let data = provider
            .call(from, self.address, versionCall {}.abi_encode().into())
            .await?;
        Ok(versionCall::abi_decode_returns(&data)?)
    }

    pub async fn stakes<P>(
        &self,
        provider: &P,
        from: Address,
        account: Address,
    ) -> Result<U256, ProviderError>
    where
        P: WalletProvider + ?Sized,
    {
        let data = provider
            .call(from, self.address, stakesCall { account }.abi_encode().into())
            .await?;
        Ok(stakesCall::abi_decode_returns(&data)?)
    }

    /// The native balance held by the contract, i.e. the total amount staked.
    pub async fn total_staked<P>(&self, provider: &P) -> Result<U256, ProviderError>
    where
        P: WalletProvider + ?Sized,
    {
        provider.balance(self.address).await
    }
}

/// The state-changing methods of the bios contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Freeze,
    Melt,
    Withdraw,
}

/// A transaction ready to be handed to the wallet provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub kind: TransactionKind,
    pub from: Address,
    pub to: Address,
    pub value: Option<U256>,
    pub data: Bytes,
    pub gas_limit: u64,
}

impl TransactionRequest {
    pub(crate) fn freeze(from: Address, contract: &ContractHandle, value: U256) -> Self {
        Self {
            kind: TransactionKind::Freeze,
            from,
            to: contract.address,
            value: Some(value),
            data: freezeCall {}.abi_encode().into(),
            gas_limit: STAKE_GAS_LIMIT,
        }
    }

    pub(crate) fn melt(from: Address, contract: &ContractHandle, amount: U256) -> Self {
        Self {
            kind: TransactionKind::Melt,
            from,
            to: contract.address,
            value: None,
            data: meltCall { amount }.abi_encode().into(),
            gas_limit: STAKE_GAS_LIMIT,
        }
    }

    pub(crate) fn withdraw(from: Address, contract: &ContractHandle) -> Self {
        Self {
            kind: TransactionKind::Withdraw,
            from,
            to: contract.address,
            value: None,
            data: withdrawCall {}.abi_encode().into(),
            gas_limit: WITHDRAW_GAS_LIMIT,
        }
    }
}

#[cfg(test)]
#[path = "unit_tests/contract_tests.rs"]
mod tests;
