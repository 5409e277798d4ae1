use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::db::memory::MemoryStore;
use crate::models::CaseType;
use crate::state::test_helpers::test_state;

fn seeded_case(id: &str) -> TestCase {
    TestCase {
        id: id.into(),
        kind: CaseType::Happy,
        title: format!("Existing {id}"),
        steps: vec!["go".into()],
        expected: "ok".into(),
        sample_payload: serde_json::Map::new(),
    }
}

fn suggested(id: &str) -> Value {
    json!({
        "id": id,
        "type": "edge",
        "title": format!("Suggested {id}"),
        "steps": ["Paste 10k characters"],
        "expected": "Input is truncated",
        "samplePayload": { "length": 10000 }
    })
}

#[tokio::test]
async fn append_adds_cases_at_the_end_in_order() {
    let store = Arc::new(MemoryStore::new());
    let project = store.seed_project("Shop");
    let suite = store.seed_suite(project.id, "Login", vec![seeded_case("TC_1"), seeded_case("TC_2")]);
    let state = test_state(store.clone(), None);

    let updated = append(
        &state,
        AppendRequest {
            suite_id: Some(suite.id.to_string()),
            test_cases: Some(json!([suggested("TC_extra_1"), suggested("TC_extra_2")])),
        },
    )
    .await
    .unwrap();

    let ids: Vec<&str> = updated.test_cases.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["TC_1", "TC_2", "TC_extra_1", "TC_extra_2"]);
    assert_eq!(updated.test_cases[3].kind, CaseType::Edge);
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn append_requires_suite_id_and_array() {
    let state = test_state(Arc::new(MemoryStore::new()), None);

    let missing_id = AppendRequest { suite_id: None, test_cases: Some(json!([])) };
    assert_eq!(append(&state, missing_id).await.unwrap_err().to_string(), "suiteId and testCases are required");

    let not_array = AppendRequest { suite_id: Some(Uuid::new_v4().to_string()), test_cases: Some(json!("TC_1")) };
    assert_eq!(append(&state, not_array).await.unwrap_err().to_string(), "suiteId and testCases are required");
}

#[tokio::test]
async fn append_rejects_invalid_case_without_writing() {
    let store = Arc::new(MemoryStore::new());
    let project = store.seed_project("Shop");
    let suite = store.seed_suite(project.id, "Login", vec![seeded_case("TC_1")]);
    let state = test_state(store.clone(), None);

    let mut bad = suggested("TC_extra_2");
    bad["type"] = json!("sideways");
    let err = append(
        &state,
        AppendRequest { suite_id: Some(suite.id.to_string()), test_cases: Some(json!([suggested("TC_extra_1"), bad])) },
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    assert!(err.to_string().starts_with("testCases[1]"));
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn append_to_unknown_suite_is_not_found() {
    let state = test_state(Arc::new(MemoryStore::new()), None);
    let err = append(
        &state,
        AppendRequest { suite_id: Some(Uuid::new_v4().to_string()), test_cases: Some(json!([suggested("TC_extra_1")])) },
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Suite not found");
}

#[tokio::test]
async fn get_treats_malformed_id_as_missing() {
    let store = Arc::new(MemoryStore::new());
    let project = store.seed_project("Shop");
    let suite = store.seed_suite(project.id, "Login", vec![]);
    let state = test_state(store, None);

    assert_eq!(get(&state, &suite.id.to_string()).await.unwrap().id, suite.id);
    assert_eq!(get(&state, "TC_1").await.unwrap_err().to_string(), "Suite not found");
}

#[tokio::test]
async fn list_filters_by_project() {
    let store = Arc::new(MemoryStore::new());
    let shop = store.seed_project("Shop");
    let blog = store.seed_project("Blog");
    store.seed_suite(shop.id, "Login", vec![]);
    store.seed_suite(blog.id, "Posts", vec![]);
    let state = test_state(store, None);

    let shop_id = shop.id.to_string();
    let suites = list(&state, Some(&shop_id)).await.unwrap();
    assert_eq!(suites.len(), 1);
    assert_eq!(suites[0].feature_name, "Login");
    assert_eq!(list(&state, None).await.unwrap().len(), 2);
    assert!(list(&state, Some("shop")).await.is_err());
}
