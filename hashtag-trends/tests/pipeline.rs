use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use hashtag_trends::{
    pipeline::{Pipeline, PipelineSettings},
    reporter::{ReportMode, WindowMode},
    sink::MemorySink,
    source::{channel_source, line_source, EventSource},
};

fn tweet(author: &str, mentions: &[&str], hashtags: &[&str]) -> Value {
    json!({
        "user": {"screen_name": author},
        "entities": {
            "hashtags": hashtags.iter().map(|h| json!({"text": h})).collect::<Vec<_>>(),
            "user_mentions": mentions.iter().map(|m| json!({"screen_name": m})).collect::<Vec<_>>(),
        }
    })
}

fn payload(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

fn settings(run_for: Duration, n_top: usize) -> PipelineSettings {
    let mut settings = PipelineSettings::new(run_for, Duration::from_millis(50), n_top);
    settings.drain_grace = Duration::from_secs(1);
    settings
}

#[tokio::test]
async fn counts_a_finite_stream() {
    let (tx, source) = channel_source(16);
    for event in [
        tweet("alice", &["bob"], &["a", "b"]),
        tweet("carol", &[], &["a"]),
        tweet("dave", &["erin"], &[]),
    ] {
        tx.send(payload(&event)).await.unwrap();
    }
    drop(tx);

    let sink = Arc::new(MemorySink::default());
    let pipeline = Pipeline::new(settings(Duration::from_secs(10), 10));
    let counter = pipeline.counter();
    let summary = pipeline
        .run(Arc::new(source), sink.clone())
        .await
        .unwrap();

    let snapshot = counter.snapshot();
    assert_eq!(snapshot.get("#a"), Some(2));
    assert_eq!(snapshot.get("#b"), Some(1));
    assert_eq!(snapshot.len(), 2);

    let report = summary.final_report.unwrap();
    assert!(report.is_final);
    assert_eq!(report.value, 2);
    assert_eq!(report.ranked.first(), Some(("#a", 2)));

    assert_eq!(summary.events_received, 3);
    assert_eq!(summary.events_counted, 2);
    assert_eq!(summary.hashtags_counted, 3);
    assert_eq!(summary.workers_aborted, 0);
    assert_eq!(sink.values().last(), Some(&2));
}

#[tokio::test]
async fn bad_payloads_do_not_stop_the_run() {
    let (tx, source) = channel_source(16);
    tx.send(b"not json".to_vec()).await.unwrap();
    tx.send(Vec::new()).await.unwrap();
    tx.send(payload(&json!({"delete": {"status": {"id": 1}}})))
        .await
        .unwrap();
    tx.send(payload(&tweet("alice", &[], &["kept"]))).await.unwrap();
    drop(tx);

    let sink = Arc::new(MemorySink::default());
    let summary = Pipeline::new(settings(Duration::from_secs(10), 10))
        .run(Arc::new(source), sink.clone())
        .await
        .unwrap();

    assert_eq!(summary.events_received, 4);
    assert_eq!(summary.hashtags_counted, 1);
    let report = summary.final_report.unwrap();
    assert_eq!(report.ranked.first(), Some(("#kept", 1)));
}

#[tokio::test]
async fn top_n_caps_the_value_and_distinct_does_not() {
    let events: Vec<_> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|tag| payload(&tweet("alice", &[], &[*tag])))
        .collect();

    for (mode, expected) in [(ReportMode::TopN, 3), (ReportMode::Distinct, 5)] {
        let (tx, source) = channel_source(16);
        for event in &events {
            tx.send(event.clone()).await.unwrap();
        }
        drop(tx);

        let mut settings = settings(Duration::from_secs(10), 3);
        settings.report_mode = mode;
        let summary = Pipeline::new(settings)
            .run(Arc::new(source), Arc::new(MemorySink::default()))
            .await
            .unwrap();

        let report = summary.final_report.unwrap();
        assert_eq!(report.value, expected);
        assert_eq!(report.ranked.cardinality(), 3);
        assert_eq!(report.ranked.distinct_hashtags(), 5);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stops_on_time_with_an_endless_source() {
    let (tx, source) = channel_source(64);
    let producer = tokio::spawn(async move {
        let event = payload(&tweet("alice", &["bob"], &["endless"]));
        while tx.send(event.clone()).await.is_ok() {}
    });

    let run_for = Duration::from_millis(500);
    let sink = Arc::new(MemorySink::default());
    let started = Instant::now();
    let summary = Pipeline::new(settings(run_for, 10))
        .run(Arc::new(source), sink.clone())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= run_for);
    assert!(elapsed < run_for + Duration::from_secs(1) + Duration::from_secs(2));
    assert!(summary.events_received > 0);

    // Periodic reports plus the final one
    let reports = sink.reports();
    assert!(reports.len() >= 2);
    assert!(reports.last().unwrap().is_final);
    assert!(reports.iter().rev().skip(1).all(|report| !report.is_final));

    producer.abort();
}

#[tokio::test]
async fn reports_on_schedule_while_the_source_is_quiet() {
    let (_tx, source) = channel_source(1);
    let sink = Arc::new(MemorySink::default());

    let summary = Pipeline::new(settings(Duration::from_millis(300), 10))
        .run(Arc::new(source), sink.clone())
        .await
        .unwrap();

    assert_eq!(summary.events_received, 0);
    assert!(sink.values().len() >= 2);
    assert!(sink.values().iter().all(|value| *value == 0));
}

#[tokio::test]
async fn tumbling_windows_start_from_zero() {
    let (tx, source) = channel_source(16);
    let sink = Arc::new(MemorySink::default());

    let mut settings = settings(Duration::from_secs(10), 10);
    settings.window_mode = WindowMode::Tumbling;
    settings.report_interval = Duration::from_millis(100);
    let run = tokio::spawn(
        Pipeline::new(settings).run(Arc::new(source), sink.clone()),
    );

    tx.send(payload(&tweet("alice", &[], &["a", "b"])))
        .await
        .unwrap();
    // Let a few windows go by, so the later ones are empty
    tokio::time::sleep(Duration::from_millis(450)).await;
    drop(tx);

    let summary = run.await.unwrap().unwrap();
    let values = sink.values();
    assert_eq!(values.iter().sum::<usize>(), 2);
    assert_eq!(values.last(), Some(&0));
    assert_eq!(summary.hashtags_counted, 2);
}

#[tokio::test]
async fn reads_newline_delimited_payloads() {
    let mut input = Vec::new();
    for event in [
        tweet("alice", &["bob"], &["rust"]),
        tweet("carol", &[], &["rust", "tokio"]),
    ] {
        input.extend(payload(&event));
        input.extend(b"\r\n");
    }
    input.extend(b"\n");

    let source: Arc<dyn EventSource> = Arc::new(line_source(Cursor::new(input), 1024).unwrap());
    let summary = Pipeline::new(settings(Duration::from_secs(10), 1))
        .run(source, Arc::new(MemorySink::default()))
        .await
        .unwrap();

    let report = summary.final_report.unwrap();
    assert_eq!(report.value, 1);
    assert_eq!(report.ranked.first(), Some(("#rust", 2)));
    assert_eq!(report.ranked.distinct_hashtags(), 2);
}
