// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall as _;

use super::*;
use crate::{
    common::BIOS_ADDRESS,
    test_utils::{ether, MockCall, MockChain, MockWalletProvider, TEST_ACCOUNT, TEST_VERSIONER},
};

#[test]
fn test_selectors() {
    // Values given by `cast sig`.
    assert_eq!(versionCall::SELECTOR, [0x54, 0xfd, 0x4d, 0x50]);
    assert_eq!(withdrawCall::SELECTOR, [0x3c, 0xcf, 0xd6, 0x0b]);
}

#[test]
fn test_transaction_requests() {
    let contract = ContractHandle::new(BIOS_ADDRESS);

    let freeze = TransactionRequest::freeze(TEST_ACCOUNT, &contract, ether(3));
    assert_eq!(freeze.kind, TransactionKind::Freeze);
    assert_eq!(freeze.to, BIOS_ADDRESS);
    assert_eq!(freeze.value, Some(ether(3)));
    assert_eq!(freeze.data.as_ref(), freezeCall::SELECTOR.as_slice());
    assert_eq!(freeze.gas_limit, 0);

    let melt = TransactionRequest::melt(TEST_ACCOUNT, &contract, U256::from(17));
    assert_eq!(melt.value, None);
    assert_eq!(melt.gas_limit, 0);
    let decoded = meltCall::abi_decode(&melt.data).unwrap();
    assert_eq!(decoded.amount, U256::from(17));

    let withdraw = TransactionRequest::withdraw(TEST_ACCOUNT, &contract);
    assert_eq!(withdraw.value, None);
    assert_eq!(withdraw.gas_limit, 100_000);
    assert_eq!(withdraw.data.as_ref(), withdrawCall::SELECTOR.as_slice());
}

#[tokio::test]
async fn test_direct_resolution_makes_no_call() {
    let provider = MockWalletProvider::new(MockChain::default());
    let resolution = ContractLocator::Direct(BIOS_ADDRESS)
        .resolve(&provider, TEST_ACCOUNT)
        .await
        .unwrap();
    assert_eq!(resolution, Resolution::Deployed(BIOS_ADDRESS));
    assert!(provider.calls().is_empty());

    let resolution = ContractLocator::Direct(Address::ZERO)
        .resolve(&provider, TEST_ACCOUNT)
        .await
        .unwrap();
    assert_eq!(resolution, Resolution::NotDeployed);
    assert_eq!(resolution.address(), Address::ZERO);
}

#[tokio::test]
async fn test_versioner_resolution() {
    let provider = MockWalletProvider::new(MockChain::default());
    let locator = ContractLocator::Versioner(TEST_VERSIONER);
    let resolution = locator.resolve(&provider, TEST_ACCOUNT).await.unwrap();
    assert_eq!(resolution, Resolution::Deployed(BIOS_ADDRESS));
    assert_eq!(
        provider.calls(),
        [MockCall::Call {
            to: TEST_VERSIONER,
            selector: biosCall::SELECTOR,
        }]
    );

    provider.chain().versioned_bios = Address::ZERO;
    let resolution = locator.resolve(&provider, TEST_ACCOUNT).await.unwrap();
    assert_eq!(resolution, Resolution::NotDeployed);
}

#[tokio::test]
async fn test_view_calls() {
    let provider = MockWalletProvider::new(MockChain::default());
    let contract = ContractHandle::new(BIOS_ADDRESS);
    assert_eq!(
        contract.version(&provider, TEST_ACCOUNT).await.unwrap(),
        "1.0.0"
    );
    assert_eq!(
        contract
            .stakes(&provider, TEST_ACCOUNT, TEST_ACCOUNT)
            .await
            .unwrap(),
        ether(2)
    );
    assert_eq!(
        contract
            .stakes(&provider, TEST_ACCOUNT, BIOS_ADDRESS)
            .await
            .unwrap(),
        U256::ZERO
    );
    assert_eq!(contract.total_staked(&provider).await.unwrap(), ether(100));
}
