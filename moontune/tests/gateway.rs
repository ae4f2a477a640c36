use indexmap::IndexMap;
use mooncache::ManualClock;
use moontune::{
    Gateway, LyricLine, ParseRequest, Quality, RequestArgs, ResultKind, TuneHubError,
    TuneHubSettings, USER_AGENT,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DAY: Duration = Duration::from_secs(24 * 3600);

fn settings(server: &MockServer, api_key: Option<&str>) -> TuneHubSettings {
    TuneHubSettings {
        enabled: true,
        base_url: format!("{}/api/", server.uri()),
        api_key: api_key.map(str::to_string),
        cache_ttl: DAY,
    }
}

fn gateway(server: &MockServer, api_key: Option<&str>) -> (Gateway, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let gateway = Gateway::with_clock(settings(server, api_key), reqwest::Client::new(), clock.clone());
    (gateway, clock)
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn method_config_is_served_from_cache_within_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/methods/netease/search"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"url": "https://music.example/search", "params": {"s": "{{keyword}}"}}
        })))
        .mount(&server)
        .await;
    let (gateway, clock) = gateway(&server, None);

    let first = gateway.method_config("netease", "search").await.unwrap();
    clock.advance(DAY - Duration::from_secs(1));
    let second = gateway.method_config("netease", "search").await.unwrap();

    assert_eq!(request_count(&server).await, 1);
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );

    clock.advance(Duration::from_secs(1));
    gateway.method_config("netease", "search").await.unwrap();
    assert_eq!(request_count(&server).await, 2);

    // The refetch refreshed the timestamp
    clock.advance(Duration::from_secs(60));
    gateway.method_config("netease", "search").await.unwrap();
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn methods_and_platform_methods_use_their_own_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/methods"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": ["netease"]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/methods/qq"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": ["search"]})))
        .mount(&server)
        .await;
    let (gateway, _) = gateway(&server, None);

    assert_eq!(gateway.methods().await.unwrap()["data"][0], "netease");
    assert_eq!(gateway.platform_methods("qq").await.unwrap()["data"][0], "search");
    gateway.methods().await.unwrap();
    gateway.platform_methods("qq").await.unwrap();

    assert_eq!(request_count(&server).await, 2);
    let stats = gateway.cache_stats().await;
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.hits, 2);
}

#[tokio::test]
async fn proxy_appends_extra_params_but_keys_on_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/playlist"))
        .and(query_param("id", "1"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"list": [{"id": 1}]})))
        .mount(&server)
        .await;
    let (gateway, _) = gateway(&server, None);
    let target = format!("{}/playlist?id=1", server.uri());

    let first = gateway
        .proxy(&target, &[("limit".to_string(), "20".to_string())])
        .await
        .unwrap();
    let second = gateway
        .proxy(&target, &[("limit".to_string(), "50".to_string())])
        .await
        .unwrap();

    assert_eq!(first, json!({"list": [{"id": 1}]}));
    assert_eq!(first, second);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn failed_reads_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/methods"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let (gateway, _) = gateway(&server, None);

    for _ in 0..2 {
        match gateway.methods().await {
            Err(TuneHubError::Status { status, .. }) => assert_eq!(status, 502),
            other => panic!("expected a status error, got {:?}", other),
        }
    }
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn parse_without_api_key_makes_no_upstream_call() {
    let server = MockServer::start().await;
    let (gateway, _) = gateway(&server, None);

    let request = ParseRequest {
        platform: Some("netease".to_string()),
        ids: Some(json!("186016")),
        quality: None,
    };
    let err = gateway.parse(request).await.unwrap_err();

    assert!(matches!(err, TuneHubError::MissingApiKey));
    assert_eq!(err.status_code().as_u16(), 403);
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn parse_sends_key_and_default_quality() {
    let server = MockServer::start().await;
    let upstream = json!({
        "code": 0,
        "data": {"data": [{"url": "https://cdn.example/a.mp3", "success": true, "lyrics": "[00:01]a"}]}
    });
    Mock::given(method("POST"))
        .and(path("/api/v1/parse"))
        .and(header("x-api-key", "secret"))
        .and(header("user-agent", USER_AGENT))
        .and(body_json(json!({"platform": "netease", "ids": "186016", "quality": "320k"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream.clone()))
        .expect(1)
        .mount(&server)
        .await;
    let (gateway, _) = gateway(&server, Some("secret"));

    let envelope = gateway
        .parse(ParseRequest {
            platform: Some("netease".to_string()),
            ids: Some(json!("186016")),
            quality: Some(" ".to_string()),
        })
        .await
        .unwrap();

    assert!(envelope.is_success());
    assert_eq!(serde_json::to_value(&envelope).unwrap(), upstream);
}

#[tokio::test]
async fn parse_failures_are_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/parse"))
        .and(body_json(json!({"platform": "qq", "ids": "1", "quality": "flac"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 1001, "error": "vip only"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/parse"))
        .and(body_json(json!({"platform": "kuwo", "ids": "1", "quality": "320k"})))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    let (gateway, _) = gateway(&server, Some("secret"));

    let rejected = gateway
        .parse(ParseRequest {
            platform: Some("qq".to_string()),
            ids: Some(json!("1")),
            quality: Some("flac".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&rejected).unwrap(),
        json!({"code": 1001, "message": "vip only", "error": "vip only"})
    );

    let broken = gateway
        .parse(ParseRequest {
            platform: Some("kuwo".to_string()),
            ids: Some(json!("1")),
            quality: None,
        })
        .await
        .unwrap();
    assert_eq!(broken.code, -1);
    assert_eq!(broken.message.as_deref(), Some("parse request failed"));
    assert!(broken.error.is_some());
}

#[tokio::test]
async fn resolve_song_returns_url_cover_and_timed_lyrics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/parse"))
        .and(body_json(json!({"platform": "netease", "ids": "186016", "quality": "flac"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"data": [{
                "id": "186016",
                "success": true,
                "url": "https://cdn.example/186016.flac",
                "cover": "https://cdn.example/186016.jpg",
                "lyrics": "[00:29.50]故事的小黄花\n[00:01.00]晴天"
            }]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (gateway, _) = gateway(&server, Some("secret"));

    let song = gateway
        .resolve_song("netease", "186016", Quality::Lossless)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(song.url, "https://cdn.example/186016.flac");
    assert_eq!(song.cover.as_deref(), Some("https://cdn.example/186016.jpg"));
    assert_eq!(
        song.lyric_lines,
        vec![
            LyricLine { time: 1.0, text: "晴天".to_string() },
            LyricLine { time: 29.5, text: "故事的小黄花".to_string() },
        ]
    );
}

#[tokio::test]
async fn resolve_song_distinguishes_unplayable_and_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/parse"))
        .and(body_json(json!({"platform": "qq", "ids": "1", "quality": "320k"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"data": [{"id": "1", "success": false, "url": ""}]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/parse"))
        .and(body_json(json!({"platform": "kuwo", "ids": "1", "quality": "320k"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 1001, "message": "vip only"})))
        .mount(&server)
        .await;
    let (gateway, _) = gateway(&server, Some("secret"));

    let unplayable = gateway.resolve_song("qq", "1", Quality::High).await.unwrap();
    assert!(unplayable.is_none());

    let err = gateway
        .resolve_song("kuwo", "1", Quality::High)
        .await
        .unwrap_err();
    assert!(matches!(err, TuneHubError::Upstream(ref m) if m == "vip only"));
}

#[tokio::test]
async fn proxy_post_relays_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/relay"))
        .and(header("user-agent", USER_AGENT))
        .and(header("content-type", "text/plain"))
        .and(header("referer", "https://y.qq.com"))
        .and(body_json(json!({"req": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    let (gateway, _) = gateway(&server, None);

    let mut headers = IndexMap::new();
    headers.insert("Content-Type".to_string(), "text/plain".to_string());
    headers.insert("Referer".to_string(), "https://y.qq.com".to_string());

    let payload = gateway
        .proxy_post(&format!("{}/relay", server.uri()), Some(&json!({"req": 1})), &headers)
        .await
        .unwrap();
    assert_eq!(payload, json!({"ok": true}));
}

#[tokio::test]
async fn run_method_builds_fetches_and_transforms() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/methods/netease/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "url": format!("{}/cloudsearch", server.uri()),
                "params": {"s": "{{keyword}}", "limit": "{{limit}}", "offset": "{{offset}}"},
                "transform": {
                    "root": "result.songs",
                    "fields": {
                        "id": "id",
                        "name": "name",
                        "artist": {"path": "ar.*.name", "join": "/"}
                    }
                }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloudsearch"))
        .and(query_param("s", "晴天"))
        .and(query_param("limit", "20"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"songs": [{"id": 186016, "name": "晴天", "ar": [{"name": "周杰伦"}]}]}
        })))
        .mount(&server)
        .await;
    let (gateway, _) = gateway(&server, None);
    let args = RequestArgs::new().keyword("晴天");

    let songs = gateway
        .run_method("netease", "search", &args, ResultKind::Songs)
        .await
        .unwrap();
    assert_eq!(songs, vec![json!({"id": 186016, "name": "晴天", "artist": "周杰伦"})]);

    // Descriptor and payload both come from the cache the second time
    gateway
        .run_method("netease", "search", &args, ResultKind::Songs)
        .await
        .unwrap();
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn run_method_reports_missing_descriptor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/methods/kuwo/toplist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 404, "data": Value::Null})))
        .mount(&server)
        .await;
    let (gateway, _) = gateway(&server, None);

    let err = gateway
        .run_method("kuwo", "toplist", &RequestArgs::new(), ResultKind::Playlists)
        .await
        .unwrap_err();
    assert!(matches!(err, TuneHubError::Upstream(_)));
}
