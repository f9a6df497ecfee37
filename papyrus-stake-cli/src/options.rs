// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{num::ParseIntError, time::Duration};

use alloy_primitives::{Address, U256};
use papyrus_stake::{
    common::{BIOS_ADDRESS, PAPYRUS_NETWORK_ID},
    contract::ContractLocator,
    limit::LimitSource,
    provider::WatcherConfig,
    ClientConfig,
};
use url::Url;

#[derive(Clone, Debug, clap::Parser)]
#[command(
    name = "papyrus-stake",
    version,
    about = "View and manage stakes on the Papyrus bios contract through a wallet provider"
)]
pub struct ClientOptions {
    /// JSON-RPC endpoint of the wallet provider. Without one, no wallet is available.
    #[arg(long, env = "PAPYRUS_PROVIDER_URL")]
    pub provider_url: Option<Url>,

    /// The network id the wallet provider must be connected to.
    #[arg(long, env = "PAPYRUS_NETWORK_ID", default_value_t = PAPYRUS_NETWORK_ID)]
    pub expected_network_id: u64,

    /// Address of the bios contract.
    #[arg(long, env = "PAPYRUS_BIOS_ADDRESS", default_value_t = BIOS_ADDRESS)]
    pub bios_address: Address,

    /// Look up the bios contract through this versioner contract instead.
    #[arg(long, env = "PAPYRUS_VERSIONER_ADDRESS", conflicts_with = "bios_address")]
    pub versioner_address: Option<Address>,

    /// Send the `eth_getLimit` query to this gateway rather than to the wallet provider.
    #[arg(long, env = "PAPYRUS_LIMIT_GATEWAY")]
    pub limit_gateway: Option<Url>,

    /// Delay between two polls of a pending transaction, in milliseconds.
    #[arg(long = "poll-interval-ms", default_value = "1000", value_parser = parse_millis)]
    pub poll_interval: Duration,

    /// Blocks to wait on top of the one including a transaction.
    #[arg(long, default_value = "0")]
    pub confirmations: u64,

    /// How to print the display.
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: ClientCommand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One `slot: text` line per display update, as they happen.
    Plain,
    /// The final display state and outcome as a JSON object.
    Json,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::Subcommand)]
pub enum ClientCommand {
    /// Show the account, its balance and the contract state.
    Status,

    /// Stake an amount, in raw units.
    Stake {
        #[arg(value_parser = parse_amount)]
        amount: U256,
    },

    /// Unstake an amount, in raw units.
    Unstake {
        #[arg(value_parser = parse_amount)]
        amount: U256,
    },

    /// Withdraw the unstaked funds.
    Withdraw,
}

impl ClientOptions {
    pub fn client_config(&self) -> ClientConfig {
        let contract = match self.versioner_address {
            Some(versioner) => ContractLocator::Versioner(versioner),
            None => ContractLocator::Direct(self.bios_address),
        };
        let limit_source = match &self.limit_gateway {
            Some(url) => LimitSource::Gateway(url.clone()),
            None => LimitSource::Provider,
        };
        ClientConfig {
            expected_network_id: self.expected_network_id,
            contract,
            limit_source,
        }
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval: self.poll_interval,
            confirmations: self.confirmations,
        }
    }
}

impl ClientCommand {
    /// The name of the log file for this command.
    pub fn log_name(&self) -> &'static str {
        match self {
            ClientCommand::Status => "status",
            ClientCommand::Stake { .. }
            | ClientCommand::Unstake { .. }
            | ClientCommand::Withdraw => "transaction",
        }
    }
}

pub fn parse_millis(s: &str) -> Result<Duration, ParseIntError> {
    Ok(Duration::from_millis(s.parse()?))
}

/// Parses a decimal or `0x`-prefixed amount of raw units.
pub fn parse_amount(s: &str) -> Result<U256, String> {
    s.trim()
        .parse::<U256>()
        .map_err(|error| format!("invalid amount `{s}`: {error}"))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::Parser as _;

    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::try_parse_from(["papyrus-stake", "status"]).unwrap();
        assert_eq!(options.command, ClientCommand::Status);
        assert_eq!(options.format, OutputFormat::Plain);
        assert_eq!(options.watcher_config(), WatcherConfig::default());
        let config = options.client_config();
        assert_eq!(config.expected_network_id, 323138);
        assert_eq!(config.contract, ContractLocator::Direct(BIOS_ADDRESS));
        assert_eq!(config.limit_source, LimitSource::Provider);
    }

    #[test]
    fn test_transaction_options() {
        let options = ClientOptions::try_parse_from([
            "papyrus-stake",
            "--versioner-address",
            "0x0000000000000000000000000000000000000011",
            "--limit-gateway",
            "http://localhost:8545",
            "--poll-interval-ms",
            "50",
            "--confirmations",
            "3",
            "--format",
            "json",
            "stake",
            "1000000000000000000",
        ])
        .unwrap();
        assert_eq!(
            options.command,
            ClientCommand::Stake {
                amount: U256::from(10u128.pow(18))
            }
        );
        assert_eq!(options.format, OutputFormat::Json);
        assert_eq!(
            options.watcher_config(),
            WatcherConfig {
                poll_interval: Duration::from_millis(50),
                confirmations: 3,
            }
        );
        let config = options.client_config();
        assert_matches!(config.contract, ContractLocator::Versioner(_));
        assert_matches!(config.limit_source, LimitSource::Gateway(url) if url.port() == Some(8545));
    }

    #[test]
    fn test_amounts() {
        assert_eq!(parse_amount("0x10"), Ok(U256::from(16)));
        assert_eq!(parse_amount(" 42 "), Ok(U256::from(42)));
        assert!(parse_amount("1.5").is_err());
        assert!(ClientOptions::try_parse_from(["papyrus-stake", "unstake", "-1"]).is_err());
    }
}
