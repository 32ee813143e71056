//! HTTP surface tests against a server on an ephemeral port.

mod common;

use serde_json::{json, Value};
use std::sync::Arc;

use common::{TestEnv, PARTICIPATION_ID, REALIZATION_ID};
use odp_search::server::router;
use odp_search::service::QueryService;

async fn spawn_server(env: &TestEnv) -> String {
    let service = Arc::new(QueryService::open(env.config()).await.unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(service)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn rebuild(client: &reqwest::Client, base: &str) -> String {
    client
        .post(format!("{base}/index/rebuild"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_availability() {
    let env = TestEnv::new();
    let base = spawn_server(&env).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["term_index"], false);

    rebuild(&client, &base).await;
    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["term_index"], true);
    assert_eq!(health["vector_index"], true);
    assert!(health["generation"].is_string());
}

#[tokio::test]
async fn test_rebuild_and_search() {
    let env = TestEnv::new();
    let base = spawn_server(&env).await;
    let client = reqwest::Client::new();

    let status = rebuild(&client, &base).await;
    assert!(status.starts_with("Indexed 2 patterns"), "status: {status}");

    let resp = client
        .get(format!("{base}/search"))
        .query(&[("query", "What are the participants in that event?")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let results: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(results[0]["pattern"]["id"], PARTICIPATION_ID);
    assert_eq!(results[0]["pattern"]["name"], "Nary Participation");
    let confidence = results[0]["confidence"].as_f64().unwrap();
    assert!(confidence > 0.0 && confidence <= 1.0);

    let results: Vec<Value> = client
        .post(format!("{base}/search"))
        .json(&json!({ "query": "information event", "filter": { "category": "Semiotics" } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r["pattern"]["id"] == REALIZATION_ID));
}

#[tokio::test]
async fn test_bad_queries_return_empty_list() {
    let env = TestEnv::new();
    let base = spawn_server(&env).await;
    let client = reqwest::Client::new();

    // before any rebuild, and with a query that has no terms
    for query in ["participation", "", "?? !!"] {
        let resp = client
            .get(format!("{base}/search"))
            .query(&[("query", query)])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let results: Vec<Value> = resp.json().await.unwrap();
        assert!(results.is_empty());
    }
}

#[tokio::test]
async fn test_unparsable_search_requests_return_empty_list() {
    let env = TestEnv::new();
    let base = spawn_server(&env).await;
    let client = reqwest::Client::new();
    rebuild(&client, &base).await;

    let resp = client
        .get(format!("{base}/search"))
        .query(&[("query", "participation"), ("dolce", "maybe")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let results: Vec<Value> = resp.json().await.unwrap();
    assert!(results.is_empty());

    let bodies = [
        ("application/json", "{not json"),
        ("application/json", r#"{"query": 5}"#),
        ("application/json", r#"{"query": "event", "filter": {"dolce": "maybe"}}"#),
    ];
    for (content_type, body) in bodies {
        let resp = client
            .post(format!("{base}/search"))
            .header("content-type", content_type)
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "body: {body}");
        let results: Vec<Value> = resp.json().await.unwrap();
        assert!(results.is_empty(), "body: {body}");
    }

    // no content type at all is still read as JSON
    let resp = client
        .post(format!("{base}/search"))
        .body(r#"{"query": "participation"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let results: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(results[0]["pattern"]["id"], PARTICIPATION_ID);
}

#[tokio::test]
async fn test_pattern_lookup() {
    let env = TestEnv::new();
    let base = spawn_server(&env).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/patterns"))
        .query(&[("id", PARTICIPATION_ID)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "index_unavailable");

    rebuild(&client, &base).await;

    let record: Value = client
        .get(format!("{base}/patterns"))
        .query(&[("id", PARTICIPATION_ID)])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["name"], "Nary Participation");
    assert_eq!(record["categories"], json!(["General"]));
    assert_eq!(
        record["competencyQuestions"],
        json!(["What are the participants in that event at this time?"])
    );

    let resp = client
        .get(format!("{base}/patterns"))
        .query(&[("id", "http://example.org/none.owl")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    let resp = client.get(format!("{base}/patterns")).send().await.unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_categories() {
    let env = TestEnv::new();
    let base = spawn_server(&env).await;
    let client = reqwest::Client::new();
    rebuild(&client, &base).await;

    let categories: Vec<String> = client
        .get(format!("{base}/categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(categories, vec!["Any", "General", "Semiotics"]);

    let listed: Vec<Value> = client
        .get(format!("{base}/categories/Semiotics/patterns"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        listed,
        vec![json!({ "id": REALIZATION_ID, "name": "Information Realization" })]
    );

    let all: Vec<Value> = client
        .get(format!("{base}/categories/Any/patterns"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}
