//! Integration tests for the label sweep.
//!
//! These run the public rule engine and sweep service against an in-memory
//! mailbox. Each module carries its own unit tests for detailed logic.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

use mailreap::domain::{Age, AgeUnit, Label, ThreadId, ThreadSummary};
use mailreap::providers::email::{AppliedChange, MemoryProvider};
use mailreap::services::{
    default_bindings, BindingReport, RuleEngine, SweepError, SweepService, ThreadAction,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 31, 9, 30, 0).unwrap()
}

fn thread(id: &str, last: DateTime<Utc>) -> ThreadSummary {
    ThreadSummary::new(id, last)
}

// ============================================================================
// Age parsing
// ============================================================================

#[test]
fn parses_every_unit_in_any_case_with_surrounding_text() {
    let units = [
        ("day", AgeUnit::Day),
        ("week", AgeUnit::Week),
        ("month", AgeUnit::Month),
        ("year", AgeUnit::Year),
    ];

    for (word, unit) in units {
        for text in [
            format!("{}{}", 3, word),
            format!("3 {}s", word),
            format!("after 3 {} or so", word.to_uppercase()),
        ] {
            assert_eq!(Age::parse(&text), Some(Age::new(3, unit)), "{}", text);
        }
    }
}

#[test]
fn month_cutoff_rolls_like_calendar_fields() {
    // 2024-02-31 does not exist and rolls into March.
    assert_eq!(
        Age::new(1, AgeUnit::Month).cutoff(now()),
        Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap()
    );
}

// ============================================================================
// Rule engine scenarios
// ============================================================================

#[tokio::test]
async fn engine_matches_only_prefixed_labels() {
    let provider = MemoryProvider::new()
        .with_label(
            Label::new("l1", "TTL: 30 days"),
            vec![thread("a", now() - Duration::days(31))],
        )
        .with_label(
            Label::new("l2", "TTL: 2 years"),
            vec![thread("b", now() - Duration::days(800))],
        )
        .with_label(
            Label::new("l3", "Inbox"),
            vec![thread("c", now() - Duration::days(5000))],
        );

    let engine = RuleEngine::new(&provider);
    let labels: Vec<String> = engine
        .matching_labels("TTL:")
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.name)
        .collect();
    let expired = engine.apply("TTL:", now()).await.unwrap();

    assert_eq!(labels, vec!["TTL: 30 days", "TTL: 2 years"]);
    assert_eq!(
        expired.iter().map(|t| t.id.clone()).collect::<Vec<_>>(),
        vec![ThreadId::from("a"), ThreadId::from("b")]
    );
}

#[tokio::test]
async fn engine_rejects_unparseable_label() {
    let provider = MemoryProvider::new()
        .with_label(
            Label::new("l1", "TTL: 30 days"),
            vec![thread("a", now() - Duration::days(31))],
        )
        .with_label(Label::new("l2", "TTL: banana"), vec![]);

    let err = RuleEngine::new(&provider)
        .apply("TTL:", now())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("banana"));
}

#[tokio::test]
async fn engine_week_rule_is_strict() {
    let provider = MemoryProvider::new().with_label(
        Label::new("l1", "TTR: 1 week"),
        vec![
            thread("eight", now() - Duration::days(8)),
            thread("six", now() - Duration::days(6)),
            thread("now", now()),
        ],
    );

    let expired = RuleEngine::new(&provider).apply("TTR:", now()).await.unwrap();

    assert_eq!(expired, vec![thread("eight", now() - Duration::days(8))]);
}

// ============================================================================
// Sweep service
// ============================================================================

#[tokio::test]
async fn default_sweep_trashes_and_marks_read() {
    let provider = MemoryProvider::new()
        .with_label(
            Label::new("l1", "TTL: 1 month"),
            vec![thread("t1", now() - Duration::days(60))],
        )
        .with_label(
            Label::new("l2", "TTR: 3 days"),
            vec![thread("t2", now() - Duration::days(4))],
        );
    let mut service = SweepService::new(provider, default_bindings());

    let report = service.run_at(now()).await.unwrap();

    assert_eq!(report.total_processed, 2);
    assert_eq!(
        report.bindings,
        vec![
            BindingReport {
                prefix: "TTL:".to_string(),
                action: ThreadAction::Trash,
                matched: 1,
            },
            BindingReport {
                prefix: "TTR:".to_string(),
                action: ThreadAction::MarkRead,
                matched: 1,
            },
        ]
    );
    assert_eq!(
        service.provider().changes().unwrap(),
        vec![
            AppliedChange::Trash(ThreadId::from("t1")),
            AppliedChange::MarkRead(ThreadId::from("t2")),
        ]
    );
}

#[test]
fn sweep_stops_on_bad_label_in_later_binding() {
    let provider = MemoryProvider::new()
        .with_label(
            Label::new("l1", "TTL: 1 day"),
            vec![thread("t1", now() - Duration::days(2))],
        )
        .with_label(Label::new("l2", "TTR: whenever"), vec![]);
    let mut service = SweepService::with_default_bindings(provider);

    let result = tokio_test::block_on(service.run_at(now()));

    match result {
        Err(SweepError::UnparseableAge { suffix, .. }) => assert_eq!(suffix, "whenever"),
        other => panic!("expected UnparseableAge, got {:?}", other),
    }
    assert_eq!(service.total_processed(), 1);
}

#[tokio::test]
async fn oversized_age_expires_nothing_and_sweep_continues() {
    let provider = MemoryProvider::new()
        .with_label(
            Label::new("l1", "TTL: 99999999999 days"),
            vec![thread("kept", now() - Duration::days(20_000))],
        )
        .with_label(
            Label::new("l2", "TTR: 1 day"),
            vec![thread("t2", now() - Duration::days(2))],
        );
    let mut service = SweepService::with_default_bindings(provider);

    let report = service.run_at(now()).await.unwrap();

    assert_eq!(report.total_processed, 1);
    assert_eq!(
        service.provider().changes().unwrap(),
        vec![AppliedChange::MarkRead(ThreadId::from("t2"))]
    );
}
