// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter behavior against a mock platform and a temporary queue.

use std::sync::Arc;
use std::time::Duration;

use tinyrelay_channel::{AdapterSettings, InboundOutcome, RelayAdapter, RESET_REPLY};
use tinyrelay_core::{Channel, InboundText, PlatformCapabilities};
use tinyrelay_processor::{ProcessorSettings, QueueProcessor};
use tinyrelay_test_utils::{MockBackend, MockPlatform, MockTarget, QueueHarness};
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

fn inbound(text: &str, target: MockTarget) -> InboundText<MockTarget> {
    InboundText {
        sender: "Alice".to_string(),
        sender_id: "alice".to_string(),
        text: text.to_string(),
        reply_target: target,
    }
}

fn adapter(
    harness: &QueueHarness,
    platform: &MockPlatform,
    settings: AdapterSettings,
) -> RelayAdapter<MockPlatform> {
    RelayAdapter::new(
        platform.clone(),
        harness.store(),
        harness.reset_flag(),
        settings,
    )
}

fn fast_settings() -> AdapterSettings {
    AdapterSettings {
        poll_interval: Duration::from_millis(20),
        ..AdapterSettings::default()
    }
}

async fn queue_one(
    adapter: &RelayAdapter<MockPlatform>,
    text: &str,
    target: MockTarget,
) -> tinyrelay_core::MessageId {
    match adapter.handle_inbound(inbound(text, target)).await.unwrap() {
        InboundOutcome::Queued(id) => id,
        other => panic!("expected Queued, got {other:?}"),
    }
}

#[tokio::test]
async fn inbound_text_is_queued_and_tracked() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Telegram);
    let adapter = adapter(&harness, &platform, fast_settings());

    let id = queue_one(&adapter, "hello", MockTarget::new("chat-1", 11)).await;

    let expected = format!("telegram_{id}.json");
    assert_eq!(harness.incoming_files(), vec![expected]);
    assert_eq!(adapter.pending_count().await, 1);
    assert_eq!(platform.typing_count().await, 1);
    assert!(platform.sent().await.is_empty());
}

#[tokio::test]
async fn reset_command_bypasses_queue() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Discord);
    let adapter = adapter(&harness, &platform, fast_settings());

    let outcome = adapter
        .handle_inbound(inbound("/RESET", MockTarget::new("chan", 5)))
        .await
        .unwrap();

    assert_eq!(outcome, InboundOutcome::Reset);
    assert!(harness.incoming_files().is_empty());
    assert_eq!(adapter.pending_count().await, 0);
    assert!(harness.reset_flag().is_set().await);

    let sent = platform.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, RESET_REPLY);
}

#[tokio::test]
async fn blank_text_is_ignored() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Whatsapp);
    let adapter = adapter(&harness, &platform, fast_settings());

    let outcome = adapter
        .handle_inbound(inbound("   ", MockTarget::new("c", 1)))
        .await
        .unwrap();
    assert_eq!(outcome, InboundOutcome::Ignored);
    assert!(harness.incoming_files().is_empty());
}

#[tokio::test]
async fn matched_reply_is_sent_threaded_and_file_deleted() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Telegram);
    let adapter = adapter(&harness, &platform, fast_settings());
    let target = MockTarget::new("chat-1", 11);

    let id = queue_one(&adapter, "hello", target.clone()).await;
    harness
        .plant_response(Channel::Telegram, id.as_str(), "hi there")
        .await
        .unwrap();

    assert_eq!(adapter.poll_outgoing().await.unwrap(), 1);

    let sent = platform.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "hi there");
    assert_eq!(sent[0].target, target);
    assert!(sent[0].threaded);
    assert!(harness.outgoing_files().is_empty());
    assert_eq!(adapter.pending_count().await, 0);

    // A second poll finds nothing to send again.
    assert_eq!(adapter.poll_outgoing().await.unwrap(), 0);
    assert_eq!(platform.sent().await.len(), 1);
}

#[tokio::test]
#[traced_test]
async fn orphaned_outgoing_file_is_deleted_without_sending() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Discord);
    let adapter = adapter(&harness, &platform, fast_settings());

    harness
        .plant_response(Channel::Discord, "D1", "nobody is waiting")
        .await
        .unwrap();

    assert_eq!(adapter.poll_outgoing().await.unwrap(), 0);
    assert!(platform.sent().await.is_empty());
    assert!(harness.outgoing_files().is_empty());
    assert!(logs_contain("no pending reply for outgoing message"));
}

#[tokio::test]
async fn expired_entry_never_routes_late_reply() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Telegram);
    let adapter = adapter(
        &harness,
        &platform,
        AdapterSettings {
            pending_ttl: Duration::from_millis(50),
            ..fast_settings()
        },
    );

    let id = queue_one(&adapter, "slow question", MockTarget::new("chat-1", 3)).await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    harness
        .plant_response(Channel::Telegram, id.as_str(), "too late")
        .await
        .unwrap();

    assert_eq!(adapter.poll_outgoing().await.unwrap(), 0);
    assert!(platform.sent().await.is_empty());
    assert!(harness.outgoing_files().is_empty());
}

#[tokio::test]
async fn other_channels_files_are_left_alone() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Telegram);
    let adapter = adapter(&harness, &platform, fast_settings());

    harness
        .plant_response(Channel::Discord, "D1", "for discord")
        .await
        .unwrap();
    adapter.poll_outgoing().await.unwrap();

    assert_eq!(harness.outgoing_files(), vec!["discord_D1.json"]);
}

#[tokio::test]
async fn long_reply_is_split_and_only_first_chunk_threaded() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Discord).with_capabilities(PlatformCapabilities {
        max_message_length: 10,
        typing_interval: Duration::from_millis(50),
        supports_threaded_reply: true,
    });
    let adapter = adapter(&harness, &platform, fast_settings());

    let id = queue_one(&adapter, "tell me", MockTarget::new("chan", 9)).await;
    harness
        .plant_response(Channel::Discord, id.as_str(), "aaaa bbbb cccc dddd")
        .await
        .unwrap();
    adapter.poll_outgoing().await.unwrap();

    let sent = platform.sent().await;
    let texts: Vec<_> = sent.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["aaaa bbbb", "cccc dddd"]);
    assert!(sent[0].threaded);
    assert!(!sent[1].threaded);
}

#[tokio::test]
async fn send_failure_is_swallowed_and_file_still_consumed() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Whatsapp);
    let adapter = adapter(&harness, &platform, fast_settings());

    let id = queue_one(&adapter, "hi", MockTarget::new("+15550001", 1)).await;
    harness
        .plant_response(Channel::Whatsapp, id.as_str(), "hello")
        .await
        .unwrap();

    platform.fail_sends(true);
    assert_eq!(adapter.poll_outgoing().await.unwrap(), 0);
    assert!(harness.outgoing_files().is_empty());
    assert_eq!(adapter.pending_count().await, 0);
}

#[tokio::test]
async fn typing_refresh_covers_pending_and_evicts_stale() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Telegram);
    let adapter = adapter(
        &harness,
        &platform,
        AdapterSettings {
            pending_ttl: Duration::from_millis(100),
            ..fast_settings()
        },
    );

    queue_one(&adapter, "one", MockTarget::new("a", 1)).await;
    queue_one(&adapter, "two", MockTarget::new("b", 2)).await;
    let after_queue = platform.typing_count().await;

    adapter.refresh_typing().await;
    assert_eq!(platform.typing_count().await, after_queue + 2);

    tokio::time::sleep(Duration::from_millis(150)).await;
    adapter.refresh_typing().await;
    assert_eq!(adapter.pending_count().await, 0);
    assert_eq!(platform.typing_count().await, after_queue + 2);
}

#[tokio::test]
async fn typing_refresh_sends_once_per_chat() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Telegram);
    let adapter = adapter(&harness, &platform, fast_settings());

    queue_one(&adapter, "one", MockTarget::new("a", 1)).await;
    queue_one(&adapter, "two", MockTarget::new("a", 2)).await;
    queue_one(&adapter, "three", MockTarget::new("a", 3)).await;
    queue_one(&adapter, "other chat", MockTarget::new("b", 4)).await;
    assert_eq!(adapter.pending_count().await, 4);
    let after_queue = platform.typing_count().await;

    adapter.refresh_typing().await;
    assert_eq!(platform.typing_count().await, after_queue + 2);
}

#[tokio::test]
async fn adapter_and_processor_round_trip() {
    let harness = QueueHarness::new().await.unwrap();
    let platform = MockPlatform::new(Channel::Telegram);
    let adapter = Arc::new(adapter(&harness, &platform, fast_settings()));
    let backend = MockBackend::with_replies(vec!["first reply", "second reply"]);
    let mut processor = QueueProcessor::new(
        harness.store(),
        harness.reset_flag(),
        Arc::new(backend.clone()),
        ProcessorSettings {
            poll_interval: Duration::from_millis(20),
            ..ProcessorSettings::default()
        },
    );

    let cancel = CancellationToken::new();
    let adapter_task = {
        let adapter = Arc::clone(&adapter);
        let cancel = cancel.clone();
        tokio::spawn(async move { adapter.run(cancel).await })
    };
    let processor_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { processor.run(cancel).await })
    };

    // Spaced out so the two queued files never share an mtime.
    platform
        .inject("Alice", "question one", MockTarget::new("chat-1", 100))
        .await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    platform.inject("Alice", "/reset", MockTarget::new("chat-1", 101)).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    platform
        .inject("Alice", "question two", MockTarget::new("chat-1", 102))
        .await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while platform.sent().await.len() < 3 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out, sent so far: {:?}",
            platform.sent().await
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    cancel.cancel();
    adapter_task.await.unwrap().unwrap();
    processor_task.await.unwrap().unwrap();

    let sent = platform.sent().await;
    let reset_ack = sent.iter().find(|s| s.text == RESET_REPLY).unwrap();
    assert_eq!(reset_ack.target.message_id, Some(101));

    let first = sent.iter().find(|s| s.text == "first reply").unwrap();
    assert_eq!(first.target.message_id, Some(100));
    let second = sent.iter().find(|s| s.text == "second reply").unwrap();
    assert_eq!(second.target.message_id, Some(102));

    let calls = backend.invocations().await;
    let messages: Vec<_> = calls.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(messages, vec!["question one", "question two"]);
    assert!(harness.outgoing_files().is_empty());
    assert_eq!(adapter.pending_count().await, 0);
}
