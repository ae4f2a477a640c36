use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use mooncache::{KeyValueStoreExt, MemoryStore};
use moonconfig::Config;
use moonsearch::{ConfiguredSources, SearchState, create_router};
use moonserver::CookieAuthorizer;
use moonsource::{LocalIndex, METAINFO_KEY};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn site_yaml(server: &MockServer, extra: &str) -> String {
    format!(
        r#"
api_sites:
  - key: good
    name: Good
    api: {uri}/good
  - key: broken
    name: Broken
    api: {uri}/broken
site:
  cache_time: 600
{extra}
"#,
        uri = server.uri()
    )
}

fn state(config: Config, local_index: Option<Arc<LocalIndex>>) -> SearchState {
    let config = Arc::new(config);
    SearchState {
        config: config.clone(),
        authorizer: Arc::new(CookieAuthorizer),
        sources: Arc::new(ConfiguredSources::new(
            config,
            moonsource::default_client().unwrap(),
        )),
        local_index,
    }
}

fn auth_cookie() -> String {
    format!("auth={}", urlencoding::encode(r#"{"username":"alice"}"#))
}

async fn get(state: SearchState, uri: &str, authenticated: bool) -> Response {
    let mut request = Request::get(uri);
    if authenticated {
        request = request.header("cookie", auth_cookie());
    }
    create_router(state)
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn mount_sites(server: &MockServer, type_name: &str) {
    Mock::given(method("GET"))
        .and(path("/good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pagecount": 1,
            "list": [{
                "vod_id": 7,
                "vod_name": "Dune",
                "vod_play_url": "正片$https://v.example/dune.m3u8",
                "type_name": type_name
            }]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

#[tokio::test]
async fn unauthenticated_request_is_rejected() {
    let server = MockServer::start().await;
    let config = Config::from_yaml_str(&site_yaml(&server, "")).unwrap();

    let response = get(state(config, None), "/search?q=dune", false).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({"error": "Unauthorized"}));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_query_is_cacheable_and_queries_nothing() {
    let server = MockServer::start().await;
    let config = Config::from_yaml_str(&site_yaml(&server, "")).unwrap();

    let response = get(state(config, None), "/search?q=", true).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["cache-control"],
        "public, max-age=600, s-maxage=600"
    );
    assert_eq!(body_json(response).await, json!({"results": []}));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn failing_site_does_not_fail_the_search() {
    let server = MockServer::start().await;
    mount_sites(&server, "科幻片").await;
    let config = Config::from_yaml_str(&site_yaml(&server, "")).unwrap();

    let response = get(state(config, None), "/search?q=dune", true).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["cdn-cache-control"], "public, s-maxage=600");
    assert_eq!(response.headers()["netlify-vary"], "query");
    let body = body_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["source"], "good");
    assert_eq!(results[0]["title"], "Dune");
}

#[tokio::test]
async fn filtered_out_results_are_not_cached() {
    let server = MockServer::start().await;
    mount_sites(&server, "福利片").await;

    let filtered = Config::from_yaml_str(&site_yaml(&server, "")).unwrap();
    let response = get(state(filtered, None), "/search?q=dune", true).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("cache-control").is_none());
    assert_eq!(body_json(response).await, json!({"results": []}));

    let unfiltered =
        Config::from_yaml_str(&site_yaml(&server, "  disable_yellow_filter: true")).unwrap();
    let response = get(state(unfiltered, None), "/search?q=dune", true).await;
    assert!(response.headers().get("cache-control").is_some());
    assert_eq!(body_json(response).await["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn private_library_results_come_first() {
    let server = MockServer::start().await;
    mount_sites(&server, "科幻片").await;

    let store = Arc::new(MemoryStore::new());
    store
        .put_json(
            METAINFO_KEY,
            &json!({"folders": {"Dune.2021": {
                "title": "Dune",
                "release_date": "2021-10-22",
                "overview": "Arrakis",
                "media_type": "movie"
            }}}),
        )
        .await
        .unwrap();
    let index = Arc::new(LocalIndex::new(store, "/"));

    let openlist = r#"
openlist:
  enabled: true
  url: https://list.example
  username: admin
  password: secret
"#;
    let config = Config::from_yaml_str(&site_yaml(&server, openlist)).unwrap();

    let response = get(state(config, Some(index)), "/search?q=dune", true).await;
    let body = body_json(response).await;
    let sources: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["source"].as_str().unwrap())
        .collect();
    assert_eq!(sources, vec!["openlist", "good"]);
}
