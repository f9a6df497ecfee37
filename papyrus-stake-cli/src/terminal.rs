// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{
    io::{self, Write},
    sync::Mutex,
};

use papyrus_stake::display::{DisplaySink, Region, Slot};

/// Writes every display update as a line of text.
pub struct TerminalDisplay<W> {
    writer: Mutex<W>,
}

impl TerminalDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W> TerminalDisplay<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> TerminalDisplay<W> {
    fn write_line(&self, line: std::fmt::Arguments<'_>) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(error) = writer.write_fmt(line).and_then(|()| writer.write_all(b"\n")) {
            tracing::warn!(%error, "failed to write to the terminal");
        }
    }
}

impl<W: Write + Send> DisplaySink for TerminalDisplay<W> {
    fn set_text(&self, slot: Slot, text: &str) {
        self.write_line(format_args!("{slot}: {text}"));
    }

    fn show(&self, region: Region, visible: bool) {
        let message = match (region, visible) {
            (Region::NoProviderError, true) => {
                "No wallet provider available: set --provider-url or PAPYRUS_PROVIDER_URL"
            }
            (Region::WrongNetworkError, true) => {
                "The wallet provider is not connected to the Papyrus network"
            }
            (Region::TransactionInfo, true) => "Transaction pending...",
            (Region::TransactionInfo, false) => "Transaction mined",
            (_, false) => return,
        };
        self.write_line(format_args!("[{region}] {message}"));
    }
}
