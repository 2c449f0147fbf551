use super::*;
use serde_json::json;

/// Simulates the relay: validate + normalize, then encode as it goes on the wire
fn relay(raw: serde_json::Value, now: i64) -> String {
    let message = validate(&raw).map(|m| normalize_at(m, now)).unwrap();
    serde_json::to_string(&StreamMessage::from(message)).unwrap()
}

#[test]
fn test_typing_then_message_shows_final_text_only() {
    let wire = vec![
        serde_json::to_string(&StreamMessage::connection_established(1)).unwrap(),
        relay(json!({"type": "typing", "text": "", "isIncremental": true}), 2),
        relay(json!({"type": "message", "text": "hello cli"}), 3),
    ];

    let mut reconciler = Reconciler::new();
    for line in &wire {
        let event: StreamMessage = serde_json::from_str(line).unwrap();
        reconciler.apply(event);
    }

    assert_eq!(reconciler.status(), ConnectionStatus::Connected);
    assert_eq!(reconciler.history().len(), 1);
    assert_eq!(reconciler.history()[0].text, "hello cli");
    assert_eq!(reconciler.history()[0].timestamp, Some(3));
}

#[test]
fn test_producer_typing_policy_round_trips_through_reconciler() {
    use std::time::{Duration, Instant};

    let mut policy = TypingPolicy::new(Duration::from_millis(100));
    let mut reconciler = Reconciler::new();
    let t0 = Instant::now();

    if let Some(action) = policy.on_input("draft", t0) {
        reconciler.apply(normalize(action.into_message(None)).into());
    }
    assert!(reconciler.typing().is_some());

    if let Some(action) = policy.poll(t0 + Duration::from_millis(150)) {
        reconciler.apply(normalize(action.into_message(None)).into());
    }
    assert!(reconciler.typing().is_none());
    assert!(reconciler.history().is_empty());
}

#[test]
fn test_wire_clear_with_unknown_scope() {
    let mut reconciler = Reconciler::new();
    reconciler.apply(Message::message("keep").with_timestamp(1).into());
    reconciler.apply(Message::typing("t", true).with_timestamp(2).into());

    let event: StreamMessage = serde_json::from_str(&relay(
        json!({"type": "clear", "text": "", "clearScope": "galaxy"}),
        3,
    ))
    .unwrap();
    assert_eq!(reconciler.apply(event), Transition::Cleared { removed: 1 });
    assert_eq!(reconciler.history()[0].text, "keep");
}
