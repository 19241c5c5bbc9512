//! Chain resolution against mock servers

use redirect_resolver::config::{HopMethod, ResolverConfig, UserAgentConfig};
use redirect_resolver::{HttpResolver, RedirectHop, Resolve};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a resolver configuration with short timeouts and no retries
fn test_config() -> ResolverConfig {
    ResolverConfig {
        max_redirects: 10,
        request_timeout_ms: 1_000,
        url_timeout_ms: 3_000,
        max_retries: 0,
        retry_delay_ms: 10,
        default_scheme: "http".to_string(),
        method: HopMethod::Head,
        head_fallback_to_get: false,
    }
}

fn resolver(config: ResolverConfig) -> HttpResolver {
    let user_agent = UserAgentConfig {
        client_name: "TestBot".to_string(),
        client_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
    };
    HttpResolver::new(config, &user_agent).expect("Failed to build resolver")
}

#[tokio::test]
async fn test_single_redirect_then_ok() {
    let server = MockServer::start().await;
    let target = format!("{}/b", server.uri());

    Mock::given(method("HEAD"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", target.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let source = format!("{}/a", server.uri());
    let result = resolver(test_config()).resolve(&source).await;

    assert_eq!(result.source_url, source);
    assert_eq!(result.target_url, target);
    assert_eq!(result.initial_status, 301);
    assert_eq!(result.final_status, Some(200));
    assert_eq!(result.error, "");
    assert_eq!(
        result.redirect_chain,
        vec![RedirectHop {
            status: 301,
            url: target.clone(),
            final_status: Some(200),
        }]
    );
}

#[tokio::test]
async fn test_no_redirect() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let source = format!("{}/plain", server.uri());
    let result = resolver(test_config()).resolve(&source).await;

    assert_eq!(result.initial_status, 200);
    assert_eq!(result.final_status, Some(200));
    assert!(result.redirect_chain.is_empty());
    assert_eq!(result.target_url, source);
    assert!(result.is_success());
}

#[tokio::test]
async fn test_multi_hop_with_relative_location() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/middle"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/middle"))
        .respond_with(ResponseTemplate::new(307).insert_header("Location", "end?x=1"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/end"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = resolver(test_config())
        .resolve(&format!("{}/start", server.uri()))
        .await;

    assert_eq!(result.error, "");
    assert_eq!(result.target_url, format!("{}/end?x=1", server.uri()));
    assert_eq!(result.status_chain(), vec![302, 307, 200]);
    assert_eq!(result.redirect_chain[0].final_status, None);
    assert_eq!(result.redirect_chain[1].final_status, Some(200));
}

#[tokio::test]
async fn test_redirect_loop_hits_limit() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.max_redirects = 5;
    let result = resolver(config)
        .resolve(&format!("{}/loop", server.uri()))
        .await;

    assert_eq!(result.error, "Too many redirects (limit 5)");
    assert_eq!(result.redirect_chain.len(), 5);
    assert_eq!(result.initial_status, 302);
    assert_eq!(result.final_status, None);
}

#[tokio::test]
async fn test_redirect_without_location_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(302))
        .mount(&server)
        .await;

    let result = resolver(test_config())
        .resolve(&format!("{}/nowhere", server.uri()))
        .await;

    assert_eq!(result.error, "");
    assert_eq!(result.initial_status, 302);
    assert_eq!(result.final_status, Some(302));
    assert!(result.redirect_chain.is_empty());
}

#[tokio::test]
async fn test_not_found_is_a_terminal_status() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/missing"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = resolver(test_config())
        .resolve(&format!("{}/gone", server.uri()))
        .await;

    assert!(result.is_success());
    assert_eq!(result.final_status, Some(404));
    assert_eq!(result.status_chain(), vec![301, 404]);
}

#[tokio::test]
async fn test_head_rejected_with_405() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let source = format!("{}/head-averse", server.uri());
    let result = resolver(test_config()).resolve(&source).await;

    assert_eq!(result.error, "Method not allowed (405)");
    assert_eq!(result.initial_status, 405);
    assert_eq!(result.final_status, None);
}

#[tokio::test]
async fn test_head_405_falls_back_to_get() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/head-averse"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/landing"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.head_fallback_to_get = true;
    let result = resolver(config)
        .resolve(&format!("{}/head-averse", server.uri()))
        .await;

    assert_eq!(result.error, "");
    assert_eq!(result.status_chain(), vec![301, 200]);
    assert_eq!(result.target_url, format!("{}/landing", server.uri()));
}

#[tokio::test]
async fn test_get_method_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.method = HopMethod::Get;
    let result = resolver(config).resolve(&server.uri()).await;

    assert_eq!(result.final_status, Some(200));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.request_timeout_ms = 200;
    config.url_timeout_ms = 500;
    let result = resolver(config)
        .resolve(&format!("{}/slow", server.uri()))
        .await;

    assert_eq!(result.error, "Request timeout");
    assert_eq!(result.final_status, None);
    assert!(result.processing_time < 2_000);
}

#[tokio::test]
async fn test_chain_deadline_keeps_partial_chain() {
    let server = MockServer::start().await;

    // Each hop is quick on its own but the chain never ends
    Mock::given(method("HEAD"))
        .and(path("/slow-loop"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/slow-loop")
                .set_delay(Duration::from_millis(150)),
        )
        .mount(&server)
        .await;

    let mut config = test_config();
    config.max_redirects = 50;
    config.request_timeout_ms = 1_000;
    config.url_timeout_ms = 1_000;
    let result = resolver(config)
        .resolve(&format!("{}/slow-loop", server.uri()))
        .await;

    assert_eq!(result.error, "Request timeout");
    assert!(!result.redirect_chain.is_empty());
    assert!(result.redirect_chain.len() < 50);
    assert_eq!(result.initial_status, 302);
    assert_eq!(result.final_status, None);
    assert!(result.processing_time < 2_000);
}

#[tokio::test]
async fn test_retry_recovers_after_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.request_timeout_ms = 200;
    config.url_timeout_ms = 500;
    config.max_retries = 1;
    let result = resolver(config)
        .resolve(&format!("{}/flaky", server.uri()))
        .await;

    assert_eq!(result.error, "");
    assert_eq!(result.final_status, Some(200));
    assert!(result.processing_time >= 200);
}

#[tokio::test]
async fn test_invalid_redirect_target() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/ftp"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", "ftp://files.example.com/x"),
        )
        .mount(&server)
        .await;

    let result = resolver(test_config())
        .resolve(&format!("{}/ftp", server.uri()))
        .await;

    assert!(
        result.error.starts_with("Invalid redirect URL"),
        "unexpected error: {}",
        result.error
    );
    assert_eq!(result.initial_status, 301);
    assert!(result.redirect_chain.is_empty());
}

#[tokio::test]
async fn test_scheme_is_added_to_bare_input() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // "http://127.0.0.1:PORT" without its scheme
    let bare = server.uri().trim_start_matches("http://").to_string();
    let result = resolver(test_config()).resolve(&bare).await;

    assert_eq!(result.source_url, bare);
    assert!(result.target_url.starts_with("http://"));
    assert_eq!(result.final_status, Some(200));
}

#[tokio::test]
async fn test_resolution_is_repeatable() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(308).insert_header("Location", "/b"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let resolver = resolver(test_config());
    let source = format!("{}/a", server.uri());
    let first = resolver.resolve(&source).await;
    let second = resolver.resolve(&source).await;

    assert_eq!(first.target_url, second.target_url);
    assert_eq!(first.redirect_chain, second.redirect_chain);
    assert_eq!(first.status_chain(), second.status_chain());
}
