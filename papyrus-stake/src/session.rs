// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The session client: from "no wallet" to live contract state, and transactions through
//! to completion.

use alloy_primitives::{Address, B256, U256};
use futures::StreamExt as _;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    common::{format_scaled, ClientError, BIOS_ADDRESS, PAPYRUS_NETWORK_ID},
    contract::{ContractHandle, ContractLocator, Resolution, TransactionRequest},
    display::{DisplaySink, Region, Slot},
    lifecycle::{self, PendingTransaction, TransactionEvent, TransactionState, Transition},
    limit::{self, LimitSource},
    provider::WalletProvider,
};

/// Settings of a [`StakeClient`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// The network the bios contract is deployed on.
    pub expected_network_id: u64,
    /// How to find the bios contract.
    pub contract: ContractLocator,
    /// Where to send the `eth_getLimit` query.
    pub limit_source: LimitSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            expected_network_id: PAPYRUS_NETWORK_ID,
            contract: ContractLocator::Direct(BIOS_ADDRESS),
            limit_source: LimitSource::Provider,
        }
    }
}

/// An authenticated account on the expected network, with the contract it stakes on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    account: Address,
    network_id: u64,
    contract: ContractHandle,
}

impl Session {
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    pub fn contract(&self) -> &ContractHandle {
        &self.contract
    }

    /// Stakes `amount` by sending it along with `freeze()`.
    pub fn stake(&self, amount: U256) -> TransactionRequest {
        TransactionRequest::freeze(self.account, &self.contract, amount)
    }

    /// Unstakes `amount` with `melt(amount)`.
    pub fn unstake(&self, amount: U256) -> TransactionRequest {
        TransactionRequest::melt(self.account, &self.contract, amount)
    }

    /// Withdraws the unstaked funds.
    pub fn withdraw(&self) -> TransactionRequest {
        TransactionRequest::withdraw(self.account, &self.contract)
    }
}

/// How [`StakeClient::initialize`] ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Initialization {
    /// All the state was read and displayed.
    Ready(Session),
    /// No wallet provider is available.
    NoProviderAvailable,
    /// The provider is connected to another network.
    WrongNetwork { network_id: u64 },
    /// The bios contract has no address yet.
    ContractNotDeployed,
}

impl Initialization {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Initialization::Ready(session) => Some(session),
            _ => None,
        }
    }
}

/// How a tracked transaction ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// The transaction was mined and the state was read again. `refreshed` is `None` when
    /// reading the state failed.
    Settled {
        hash: B256,
        block_number: u64,
        refreshed: Option<Initialization>,
    },
    /// The transaction was rejected.
    Failed { message: String },
    /// The provider stopped reporting before the transaction settled.
    Abandoned { state: TransactionState },
}

/// Drives a wallet provider and mirrors what it reports on a display.
pub struct StakeClient<P, D> {
    provider: Option<P>,
    display: D,
    config: ClientConfig,
}

impl<P, D> StakeClient<P, D>
where
    P: WalletProvider,
    D: DisplaySink,
{
    /// Creates a client. `provider` is `None` when no wallet provider could be found.
    pub fn new(provider: Option<P>, display: D, config: ClientConfig) -> Self {
        Self {
            provider,
            display,
            config,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn provider(&self) -> Option<&P> {
        self.provider.as_ref()
    }

    /// Reads the account, the network and the contract state and displays them.
    ///
    /// Running it again with unchanged external state displays the same values.
    #[instrument(level = "debug", skip(self))]
    pub async fn initialize(&self) -> Result<Initialization, ClientError> {
        let Some(provider) = &self.provider else {
            self.display.show(Region::NoProviderError, true);
            return Ok(Initialization::NoProviderAvailable);
        };

        let account = *provider
            .accounts()
            .await?
            .first()
            .ok_or(ClientError::NoAccount)?;
        self.display.set_text(Slot::Account, &account.to_string());

        let network_id = provider.network_id().await?;
        if network_id != self.config.expected_network_id {
            warn!(
                network_id,
                expected = self.config.expected_network_id,
                "the wallet provider is connected to another network"
            );
            self.display.set_text(Slot::NetworkId, &network_id.to_string());
            self.display.show(Region::WrongNetworkError, true);
            return Ok(Initialization::WrongNetwork { network_id });
        }

        let balance = provider.balance(account).await?;
        self.display.set_text(Slot::Balance, &balance.to_string());
        self.display.set_text(Slot::ScaledBalance, &format_scaled(balance));

        let resolution = self.config.contract.resolve(provider, account).await?;
        self.display.set_text(Slot::Address, &resolution.address().to_string());
        let Resolution::Deployed(address) = resolution else {
            info!("the bios contract is not deployed yet");
            return Ok(Initialization::ContractNotDeployed);
        };
        let contract = ContractHandle::new(address);

        let (version, stake, total_staked, limit) = futures::join!(
            contract.version(provider, account),
            contract.stakes(provider, account, account),
            contract.total_staked(provider),
            limit::get_limit(&self.config.limit_source, provider, account),
        );
        self.display.set_text(Slot::Version, &version?);
        self.display.set_text(Slot::TotalStaked, &total_staked?.to_string());
        self.display.set_text(Slot::Stake, &stake?.to_string());
        match limit {
            Ok(value) => self.display.set_text(Slot::Limit, &limit::limit_text(&value)),
            Err(error) => warn!(%error, "failed to query the limit"),
        }

        Ok(Initialization::Ready(Session {
            account,
            network_id,
            contract,
        }))
    }

    /// Hands `request` to the wallet provider.
    #[instrument(level = "debug", skip(self))]
    pub async fn submit(&self, request: TransactionRequest) -> PendingTransaction {
        let kind = request.kind;
        let events = match &self.provider {
            Some(provider) => provider.send_transaction(request).await,
            None => {
                let (sender, events) = lifecycle::channel();
                let _ = sender.unbounded_send(TransactionEvent::Failed(
                    "no wallet provider available".to_string(),
                ));
                events
            }
        };
        PendingTransaction::new(kind, events)
    }

    pub async fn submit_stake(&self, session: &Session, amount: U256) -> PendingTransaction {
        self.submit(session.stake(amount)).await
    }

    pub async fn submit_unstake(&self, session: &Session, amount: U256) -> PendingTransaction {
        self.submit(session.unstake(amount)).await
    }

    pub async fn submit_withdraw(&self, session: &Session) -> PendingTransaction {
        self.submit(session.withdraw()).await
    }

    /// Follows a submitted transaction, updating the display, and refreshes the whole
    /// state once it is mined.
    #[instrument(level = "debug", skip_all, fields(kind = ?pending.kind()))]
    pub async fn track_transaction(&self, mut pending: PendingTransaction) -> TransactionOutcome {
        let mut state = TransactionState::Submitted;
        while let Some(event) = pending.next().await {
            match state.apply(event.clone()) {
                Transition::HashAssigned(hash) => {
                    info!(%hash, "transaction hash");
                    self.display.set_text(Slot::TransactionId, &hash.to_string());
                    self.display.show(Region::TransactionInfo, true);
                }
                Transition::Confirmed(confirmations) => {
                    info!(confirmations, "confirmation");
                }
                Transition::Settled { hash, block_number } => {
                    self.display.show(Region::TransactionInfo, false);
                    info!(%hash, block_number, "mined");
                    let refreshed = match self.initialize().await {
                        Ok(initialization) => Some(initialization),
                        Err(error) => {
                            warn!(%error, "failed to refresh the state after the transaction");
                            None
                        }
                    };
                    return TransactionOutcome::Settled {
                        hash,
                        block_number,
                        refreshed,
                    };
                }
                Transition::Failed(message) => {
                    warn!(%message, "transaction rejected");
                    return TransactionOutcome::Failed { message };
                }
                Transition::Ignored => {
                    warn!(?event, ?state, "ignoring out-of-order transaction event");
                }
            }
        }
        TransactionOutcome::Abandoned { state }
    }
}

#[cfg(test)]
#[path = "unit_tests/session_tests.rs"]
mod tests;
