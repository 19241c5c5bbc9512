//! Batch scheduling end-to-end with a real HTTP resolver

use redirect_resolver::config::{load_config_with_hash, Config};
use redirect_resolver::input::read_urls;
use redirect_resolver::output::write_results;
use redirect_resolver::scheduler::{
    ChannelSink, Invocation, MemoryProgressStore, MemorySink, ProgressStore,
};
use redirect_resolver::{ContinuationToken, HttpResolver, Scheduler, StreamEvent};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Loads a configuration tuned for fast tests from a temporary TOML file
fn test_config(per_invocation_limit: usize) -> Config {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    write!(
        file,
        r#"
[resolver]
max-redirects = 5
request-timeout-ms = 1000
url-timeout-ms = 3000
max-retries = 0
default-scheme = "http"

[scheduler]
batch-size = 2
max-concurrent-batches = 2
per-invocation-limit = {}
inter-request-delay-ms = 0
invocation-timeout-ms = 30000

[user-agent]
client-name = "TestBot"
client-version = "1.0.0"
contact-url = "https://example.com/contact"
"#,
        per_invocation_limit
    )
    .expect("Failed to write config");

    let (config, hash) = load_config_with_hash(file.path()).expect("Failed to load config");
    assert_eq!(hash.len(), 64);
    config
}

/// Every `/r/N` redirects to `/ok/N`, which answers 200
async fn redirecting_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path_regex(r"^/r/\d+$"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/ok"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path_regex(r"^/ok$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    server
}

fn scheduler(config: &Config) -> Scheduler<HttpResolver> {
    let resolver = HttpResolver::new(config.resolver.clone(), &config.user_agent)
        .expect("Failed to build resolver");
    Scheduler::new(resolver, config.scheduler.clone())
}

fn list(server: &MockServer, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}/r/{}", server.uri(), i)).collect()
}

#[tokio::test]
async fn test_full_list_in_one_invocation() {
    let server = redirecting_server().await;
    let config = test_config(100);
    let urls = list(&server, 5);
    let sink = Arc::new(MemorySink::new());

    let outcome = scheduler(&config)
        .run(&urls, 0, sink.clone())
        .await
        .expect("Invocation failed");

    assert!(outcome.continuation.is_none());
    let sources: Vec<_> = outcome.results.iter().map(|r| r.source_url.clone()).collect();
    assert_eq!(sources, urls);
    for result in &outcome.results {
        assert_eq!(result.status_chain(), vec![301, 200]);
        assert_eq!(result.target_url, format!("{}/ok", server.uri()));
    }

    let events = sink.events();
    assert_eq!(events.first(), Some(&StreamEvent::Start { total_urls: 5 }));
    assert!(matches!(
        events.last(),
        Some(StreamEvent::Complete {
            success: true,
            total_processed: 5,
            total_urls: 5,
            ..
        })
    ));
}

#[tokio::test]
async fn test_continuation_round_trip() {
    let server = redirecting_server().await;
    let config = test_config(3);
    let urls = list(&server, 7);
    let scheduler = scheduler(&config);

    let mut collected = Vec::new();
    let mut invocation = Invocation::Fresh(urls.clone());
    let mut invocations = 0;

    loop {
        invocations += 1;
        let sink = Arc::new(MemorySink::new());
        let outcome = scheduler
            .invoke(invocation, None, sink.clone())
            .await
            .expect("Invocation failed");
        collected.extend(outcome.results);

        let starts = sink
            .events()
            .iter()
            .filter(|event| matches!(event, StreamEvent::Start { .. }))
            .count();
        assert_eq!(starts, if invocations == 1 { 1 } else { 0 });

        match outcome.continuation {
            Some(token) => {
                // Tokens survive a trip through JSON
                let json = token.to_json().expect("Failed to serialize token");
                let token = ContinuationToken::from_json(&json).expect("Token rejected");
                assert_eq!(token.start_index, collected.len());
                invocation = Invocation::Resume(token);
            }
            None => break,
        }
    }

    assert_eq!(invocations, 3);
    let sources: Vec<_> = collected.iter().map(|r| r.source_url.clone()).collect();
    assert_eq!(sources, urls);
}

#[tokio::test]
async fn test_events_over_channel() {
    let server = redirecting_server().await;
    let config = test_config(2);
    let urls = list(&server, 3);
    let (sink, mut receiver) = ChannelSink::new();

    let outcome = scheduler(&config)
        .run(&urls, 0, Arc::new(sink))
        .await
        .expect("Invocation failed");

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }

    assert_eq!(events.first(), Some(&StreamEvent::Start { total_urls: 3 }));
    match events.last() {
        Some(StreamEvent::BatchComplete {
            results,
            processed,
            total,
            continuation,
        }) => {
            assert_eq!(results.len(), 2);
            assert_eq!(*processed, 2);
            assert_eq!(*total, 3);
            assert_eq!(continuation.remaining_urls, vec![urls[2].clone()]);
            assert_eq!(Some(continuation), outcome.continuation.as_ref());
        }
        other => panic!("unexpected last event: {:?}", other),
    }
    assert!(events.iter().filter(|e| e.is_terminal()).count() == 1);
}

#[tokio::test]
async fn test_progress_store_marks_completion() {
    let server = redirecting_server().await;
    let config = test_config(100);
    let store = Arc::new(MemoryProgressStore::default());
    let scheduler = scheduler(&config).with_progress_store(store.clone());

    scheduler
        .invoke(
            Invocation::Fresh(list(&server, 4)),
            Some("job-42"),
            Arc::new(MemorySink::new()),
        )
        .await
        .expect("Invocation failed");

    let snapshot = store
        .get("job-42")
        .expect("Store failed")
        .expect("Snapshot missing");
    assert_eq!(snapshot.processed, 4);
    assert_eq!(snapshot.percent, 100);
    assert!(snapshot.complete);
}

#[tokio::test]
async fn test_file_input_to_csv_output() {
    let server = redirecting_server().await;
    let config = test_config(100);

    let mut input = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(input, "url,label").unwrap();
    writeln!(input, "{}/r/1,first", server.uri()).unwrap();
    writeln!(input, ",blank").unwrap();
    writeln!(input, "{}/r/2,second", server.uri()).unwrap();

    let urls = read_urls(input.path()).expect("Failed to read input");
    assert_eq!(urls.len(), 2);

    let outcome = scheduler(&config)
        .run(&urls, 0, Arc::new(MemorySink::new()))
        .await
        .expect("Invocation failed");

    let mut csv = Vec::new();
    let rows = write_results(&outcome.results, &mut csv, true).expect("Failed to write CSV");
    let csv = String::from_utf8(csv).unwrap();

    assert_eq!(rows, 2);
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("\"301 → 200\",\"1\",\"\""));
}

#[tokio::test]
async fn test_unreachable_host_does_not_stop_the_batch() {
    let server = redirecting_server().await;
    let config = test_config(100);
    let urls = vec![
        format!("{}/r/1", server.uri()),
        "http://127.0.0.1:9/closed".to_string(),
        format!("{}/r/2", server.uri()),
    ];

    let outcome = scheduler(&config)
        .run(&urls, 0, Arc::new(MemorySink::new()))
        .await
        .expect("Invocation failed");

    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.results[0].is_success());
    assert!(outcome.results[1].error.starts_with("Network error"));
    assert!(outcome.results[2].is_success());
}
