use moonconfig::ApiSite;
use moonsource::{ApiSiteSource, SearchSource, SourceError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn site(server: &MockServer) -> ApiSite {
    ApiSite {
        key: "mock".into(),
        name: "Mock Site".into(),
        api: format!("{}/api.php/provide/vod", server.uri()),
        detail: None,
        disabled: false,
    }
}

fn item(id: u32, name: &str, play_url: &str) -> serde_json::Value {
    json!({
        "vod_id": id,
        "vod_name": name,
        "vod_pic": format!("https://img.example/{}.jpg", id),
        "vod_play_url": play_url,
        "vod_year": "2023",
        "vod_content": "<p>desc</p>",
        "type_name": "剧情片"
    })
}

#[tokio::test]
async fn search_reads_first_page_and_drops_unplayable_items() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api.php/provide/vod"))
        .and(query_param("ac", "videolist"))
        .and(query_param("wd", "dune"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1,
            "pagecount": 1,
            "list": [
                item(1, "Dune", "正片$https://v.example/dune.m3u8"),
                item(2, "Dune trailer", "预告$https://v.example/trailer.mp4")
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = ApiSiteSource::new(site(&server)).unwrap();
    let results = source.search("dune").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "1");
    assert_eq!(results[0].source, "mock");
    assert_eq!(results[0].source_name, "Mock Site");
    assert_eq!(results[0].episodes, vec!["https://v.example/dune.m3u8"]);
}

#[tokio::test]
async fn search_follows_pagecount_up_to_max_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param_is_missing("pg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pagecount": 10,
            "list": [item(1, "Page one", "1$https://v/1.m3u8")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("pg", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pagecount": 10,
            "list": [item(2, "Page two", "1$https://v/2.m3u8")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("pg", "3"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let source = ApiSiteSource::new(site(&server)).unwrap().max_pages(3);
    let results = source.search("anything").await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn first_page_failure_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = ApiSiteSource::new(site(&server)).unwrap();
    match source.search("x").await {
        Err(SourceError::Status { source_key, status }) => {
            assert_eq!(source_key, "mock");
            assert_eq!(status, 503);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn slow_page_hits_request_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"list": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let source = ApiSiteSource::new(site(&server))
        .unwrap()
        .request_timeout(Duration::from_millis(100));
    assert!(matches!(source.search("x").await, Err(SourceError::Http(_))));
}
