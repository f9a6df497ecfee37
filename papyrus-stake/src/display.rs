// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The display surface the session client writes to.

use std::{collections::BTreeMap, fmt, sync::Mutex};

use serde::{Deserialize, Serialize};

/// A named text slot of the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "account")]
    Account,
    #[serde(rename = "balance")]
    Balance,
    #[serde(rename = "balance_eth")]
    ScaledBalance,
    #[serde(rename = "network-id")]
    NetworkId,
    #[serde(rename = "version")]
    Version,
    #[serde(rename = "address")]
    Address,
    #[serde(rename = "all-stakes")]
    TotalStaked,
    #[serde(rename = "stake")]
    Stake,
    #[serde(rename = "limit")]
    Limit,
    #[serde(rename = "tx-id")]
    TransactionId,
}

/// A region of the display that can be shown or hidden.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "no-web3-error")]
    NoProviderError,
    #[serde(rename = "no-papyrus-network")]
    WrongNetworkError,
    #[serde(rename = "tx-info")]
    TransactionInfo,
}

impl Slot {
    pub const ALL: [Slot; 10] = [
        Slot::Account,
        Slot::Balance,
        Slot::ScaledBalance,
        Slot::NetworkId,
        Slot::Version,
        Slot::Address,
        Slot::TotalStaked,
        Slot::Stake,
        Slot::Limit,
        Slot::TransactionId,
    ];

    /// The identifier of the slot in the page.
    pub fn id(&self) -> &'static str {
        match self {
            Slot::Account => "account",
            Slot::Balance => "balance",
            Slot::ScaledBalance => "balance_eth",
            Slot::NetworkId => "network-id",
            Slot::Version => "version",
            Slot::Address => "address",
            Slot::TotalStaked => "all-stakes",
            Slot::Stake => "stake",
            Slot::Limit => "limit",
            Slot::TransactionId => "tx-id",
        }
    }
}

impl Region {
    pub fn id(&self) -> &'static str {
        match self {
            Region::NoProviderError => "no-web3-error",
            Region::WrongNetworkError => "no-papyrus-network",
            Region::TransactionInfo => "tx-info",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A sink for display updates. Implementations only render; they never call back into
/// the client.
pub trait DisplaySink: Send + Sync {
    fn set_text(&self, slot: Slot, text: &str);

    fn show(&self, region: Region, visible: bool);
}

impl<D: DisplaySink + ?Sized> DisplaySink for std::sync::Arc<D> {
    fn set_text(&self, slot: Slot, text: &str) {
        (**self).set_text(slot, text)
    }

    fn show(&self, region: Region, visible: bool) {
        (**self).show(region, visible)
    }
}

/// The content of a display at some point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayState {
    pub slots: BTreeMap<Slot, String>,
    pub regions: BTreeMap<Region, bool>,
}

impl DisplayState {
    pub fn text(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    /// Regions are hidden until shown.
    pub fn is_visible(&self, region: Region) -> bool {
        self.regions.get(&region).copied().unwrap_or(false)
    }
}

/// One update received by a [`RecordingDisplay`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayUpdate {
    Text(Slot, String),
    Visibility(Region, bool),
}

/// A display that keeps its state and the history of updates in memory.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    state: Mutex<(DisplayState, Vec<DisplayUpdate>)>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DisplayState {
        self.lock().0.clone()
    }

    pub fn updates(&self) -> Vec<DisplayUpdate> {
        self.lock().1.clone()
    }

    pub fn text(&self, slot: Slot) -> Option<String> {
        self.lock().0.slots.get(&slot).cloned()
    }

    pub fn is_visible(&self, region: Region) -> bool {
        self.lock().0.is_visible(region)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, (DisplayState, Vec<DisplayUpdate>)> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DisplaySink for RecordingDisplay {
    fn set_text(&self, slot: Slot, text: &str) {
        let mut guard = self.lock();
        guard.0.slots.insert(slot, text.to_string());
        guard.1.push(DisplayUpdate::Text(slot, text.to_string()));
    }

    fn show(&self, region: Region, visible: bool) {
        let mut guard = self.lock();
        guard.0.regions.insert(region, visible);
        guard.1.push(DisplayUpdate::Visibility(region, visible));
    }
}

#[cfg(test)]
#[path = "unit_tests/display_tests.rs"]
mod tests;
