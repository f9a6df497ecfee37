// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

mod logging;
mod options;
mod terminal;

use std::{process, sync::Arc};

use anyhow::Context as _;
use papyrus_stake::{
    display::{DisplaySink, RecordingDisplay},
    provider::HttpWalletProvider,
    Initialization, StakeClient, TransactionOutcome,
};
use serde_json::{json, Value};
use tracing::Instrument as _;

use crate::{
    options::{ClientCommand, ClientOptions, OutputFormat},
    terminal::TerminalDisplay,
};

/// What the command ended with, for the user and for the exit code.
struct Report {
    summary: Value,
    success: bool,
}

impl Report {
    fn initialization(initialization: &Initialization) -> Self {
        let summary = match initialization {
            Initialization::Ready(session) => json!({
                "status": "ready",
                "account": session.account(),
                "networkId": session.network_id(),
                "contract": session.contract().address(),
            }),
            Initialization::NoProviderAvailable => json!({ "status": "no-provider" }),
            Initialization::WrongNetwork { network_id } => {
                json!({ "status": "wrong-network", "networkId": network_id })
            }
            Initialization::ContractNotDeployed => json!({ "status": "not-deployed" }),
        };
        Self {
            summary,
            success: matches!(initialization, Initialization::Ready(_)),
        }
    }

    fn transaction(outcome: &TransactionOutcome) -> Self {
        match outcome {
            TransactionOutcome::Settled {
                hash,
                block_number,
                refreshed,
            } => Self {
                summary: json!({
                    "status": "settled",
                    "hash": hash,
                    "blockNumber": block_number,
                    "refreshed": refreshed
                        .as_ref()
                        .map(|refreshed| Self::initialization(refreshed).summary),
                }),
                success: true,
            },
            TransactionOutcome::Failed { message } => Self {
                summary: json!({ "status": "failed", "message": message }),
                success: false,
            },
            TransactionOutcome::Abandoned { state } => Self {
                summary: json!({ "status": "abandoned", "hash": state.hash() }),
                success: false,
            },
        }
    }
}

async fn run(options: &ClientOptions) -> anyhow::Result<i32> {
    let recording = Arc::new(RecordingDisplay::new());
    let display: Arc<dyn DisplaySink> = match options.format {
        OutputFormat::Plain => Arc::new(TerminalDisplay::stdout()),
        OutputFormat::Json => recording.clone(),
    };
    let provider = options
        .provider_url
        .clone()
        .map(|url| HttpWalletProvider::new(url, options.watcher_config()));
    let client = StakeClient::new(provider, display, options.client_config());

    let initialization = client
        .initialize()
        .await
        .context("failed to read the staking state")?;
    let pending = match (initialization.session(), &options.command) {
        (Some(session), ClientCommand::Stake { amount }) => {
            Some(client.submit_stake(session, *amount).await)
        }
        (Some(session), ClientCommand::Unstake { amount }) => {
            Some(client.submit_unstake(session, *amount).await)
        }
        (Some(session), ClientCommand::Withdraw) => Some(client.submit_withdraw(session).await),
        (_, ClientCommand::Status) | (None, _) => None,
    };
    let report = match pending {
        Some(pending) => {
            let outcome = client.track_transaction(pending).await;
            Report::transaction(&outcome)
        }
        None => Report::initialization(&initialization),
    };

    match options.format {
        OutputFormat::Plain => println!("{}", report.summary),
        OutputFormat::Json => {
            let output = json!({
                "outcome": report.summary,
                "display": recording.snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(if report.success { 0 } else { 1 })
}

fn main() -> anyhow::Result<()> {
    let options = <ClientOptions as clap::Parser>::parse();
    logging::init(options.command.log_name())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create the Tokio runtime")?;
    let span = tracing::info_span!("papyrus_stake::main");
    let result = runtime.block_on(run(&options).instrument(span));

    let error_code = match result {
        Ok(code) => code,
        Err(error) => {
            tracing::error!("Error is {:?}", error);
            2
        }
    };
    process::exit(error_code);
}
