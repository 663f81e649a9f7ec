// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ck_core::FakeClock;

#[test]
fn records_accumulate_totals_and_averages() {
    let telemetry = Telemetry::without_bus(FakeClock::new());
    telemetry.record_duration("build_image", 100, true);
    telemetry.record_duration("build_image", 200, false);
    let stats = telemetry.stats("build_image").unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.failure, 1);
    assert_eq!(stats.avg_latency_ms, 150.0);
}

#[test]
fn rolling_window_caps_at_capacity() {
    let telemetry = Telemetry::without_bus(FakeClock::new());
    for i in 0..150u64 {
        telemetry.record_duration("tool", i, true);
    }
    let stats = telemetry.stats("tool").unwrap();
    assert_eq!(stats.total, 150);
    // p95 is computed only over the last 100 samples (50..=149), so it
    // must reflect that window, not the full 150-sample history.
    assert!(stats.p95_latency_ms >= 140.0);
}

#[test]
fn unknown_tool_has_no_stats() {
    let telemetry = Telemetry::without_bus(FakeClock::new());
    assert!(telemetry.stats("nope").is_none());
}

#[test]
fn export_metrics_covers_every_tool_seen() {
    let telemetry = Telemetry::without_bus(FakeClock::new());
    telemetry.record_duration("a", 1, true);
    telemetry.record_duration("b", 2, true);
    let snapshot = telemetry.export_metrics();
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn publish_delivers_to_subscriber() {
    let (telemetry, rx) = Telemetry::new(FakeClock::new());
    let mut rx = rx.unwrap();
    telemetry.publish(TelemetryEvent::Started {
        tool: "build_image".to_string(),
        session_id: None,
        correlation_id: "c1".to_string(),
    });
    let event = rx.recv().await.unwrap();
    assert_eq!(
        event,
        TelemetryEvent::Started {
            tool: "build_image".to_string(),
            session_id: None,
            correlation_id: "c1".to_string(),
        }
    );
}

#[test]
fn publish_without_bus_is_a_no_op() {
    let telemetry = Telemetry::without_bus(FakeClock::new());
    telemetry.publish(TelemetryEvent::Started {
        tool: "x".to_string(),
        session_id: None,
        correlation_id: "c".to_string(),
    });
}
