// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use super::*;

#[test]
fn test_ids_match_serialization() {
    for slot in Slot::ALL {
        assert_eq!(serde_json::to_value(slot).unwrap(), slot.id());
    }
    for region in [
        Region::NoProviderError,
        Region::WrongNetworkError,
        Region::TransactionInfo,
    ] {
        assert_eq!(serde_json::to_value(region).unwrap(), region.to_string());
    }
}

#[test]
fn test_recording_display() {
    let display = Arc::new(RecordingDisplay::new());
    assert!(!display.is_visible(Region::TransactionInfo));

    display.set_text(Slot::TransactionId, "0xabc");
    display.show(Region::TransactionInfo, true);
    display.show(Region::TransactionInfo, false);

    assert_eq!(display.text(Slot::TransactionId).as_deref(), Some("0xabc"));
    assert!(!display.is_visible(Region::TransactionInfo));
    assert_eq!(
        display.updates(),
        [
            DisplayUpdate::Text(Slot::TransactionId, "0xabc".to_string()),
            DisplayUpdate::Visibility(Region::TransactionInfo, true),
            DisplayUpdate::Visibility(Region::TransactionInfo, false),
        ]
    );
}

#[test]
fn test_snapshot_json() {
    let display = RecordingDisplay::new();
    display.set_text(Slot::ScaledBalance, "5");
    display.show(Region::WrongNetworkError, true);
    let snapshot = display.snapshot();
    assert_eq!(snapshot.text(Slot::ScaledBalance), Some("5"));
    assert_eq!(
        serde_json::to_value(&snapshot).unwrap(),
        serde_json::json!({
            "slots": { "balance_eth": "5" },
            "regions": { "no-papyrus-network": true },
        })
    );
}
