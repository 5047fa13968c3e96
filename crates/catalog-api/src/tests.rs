use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use catalog_core::{reconcile::ReconcileOptions, store::CatalogStore};
use catalog_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::api_router;

async fn app() -> (Router, Arc<SqliteStore>) {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let options = ReconcileOptions { tag_skip_list: vec!["Internal".into()], ..Default::default() };
  (api_router(store.clone(), options), store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, json)
}

fn snapshot() -> Value {
  json!([
    {
      "external_code": "0201",
      "name": "Algebra 1",
      "credits": 1.0,
      "subject": "Mathematics",
      "tags": ["Core", "Internal"],
      "grades": [{ "grade": 9 }]
    },
    {
      "external_code": "0075A",
      "name": "Geometry A",
      "credits": 0.5,
      "prerequisites": [{
        "requires_all": false,
        "alternatives": [
          { "course_code": "0201", "description": "Algebra 1" },
          { "course_code": "0202", "description": "Algebra 1 Honors" }
        ]
      }],
      "variants": [{ "variant_code": "0075A-V", "name": "Geometry A - VirSup" }]
    }
  ])
}

async fn course_id(store: &SqliteStore, code: &str) -> Uuid {
  store.find_course_by_code(code.into()).await.unwrap().unwrap().course_id
}

#[tokio::test]
async fn reconcile_returns_stats() {
  let (app, _) = app().await;

  let (status, stats) = send(&app, "POST", "/reconcile", Some(snapshot())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["created"], 2);
  assert_eq!(stats["tags_created"], 1);
  assert_eq!(stats["relationships_created"], 2);
  assert_eq!(stats["variants_created"], 1);

  let wrapped = json!({ "courses": snapshot(), "count": 2 });
  let (status, stats) = send(&app, "POST", "/reconcile", Some(wrapped)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["created"], 0);
  assert_eq!(stats["updated"], 2);
}

#[tokio::test]
async fn refused_snapshots_are_unprocessable() {
  let (app, _) = app().await;

  let (status, body) = send(&app, "POST", "/reconcile", Some(json!([]))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["stats"].is_null());

  let (status, body) = send(&app, "POST", "/reconcile", Some(json!([{ "name": "x" }]))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["stats"]["errors"], 1);
  assert_eq!(body["stats"]["error_details"][0]["code"], "#0");
}

#[tokio::test]
async fn unreadable_entries_are_reported_not_refused() {
  let (app, store) = app().await;
  send(&app, "POST", "/reconcile", Some(snapshot())).await;

  let mut entries = snapshot();
  entries[1]["credits"] = Value::Null;
  let (status, stats) = send(&app, "POST", "/reconcile", Some(entries)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["total"], 2);
  assert_eq!(stats["updated"], 1);
  assert_eq!(stats["deactivated"], 0);
  assert_eq!(stats["errors"], 1);
  assert_eq!(stats["error_details"][0]["code"], "0075A");

  let geometry = store.find_course_by_code("0075A".into()).await.unwrap().unwrap();
  assert!(geometry.is_offered);
}

#[tokio::test]
async fn extractor_rejections_use_the_error_shape() {
  let (app, store) = app().await;
  send(&app, "POST", "/reconcile", Some(snapshot())).await;

  let (status, body) = send(&app, "GET", "/resolve", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());

  let uri = format!("/courses/{}/prerequisites/check", course_id(&store, "0075A").await);
  let (status, body) = send(&app, "POST", &uri, Some(json!({ "completed": 5 }))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["error"].is_string());

  let (status, body) = send(&app, "POST", "/reconcile", Some(json!("not a snapshot"))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn course_view_and_listing() {
  let (app, store) = app().await;
  send(&app, "POST", "/reconcile", Some(snapshot())).await;
  let id = course_id(&store, "0075A").await;

  let (status, view) = send(&app, "GET", &format!("/courses/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(view["course"]["external_code"], "0075A");
  assert_eq!(view["course"]["subject"], "Unknown");
  assert_eq!(view["variants"][0]["variant_code"], "0075A-V");

  let (status, _) = send(&app, "GET", &format!("/courses/{}", Uuid::new_v4()), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, body) = send(&app, "GET", "/courses/not-a-uuid", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());

  let (_, all) = send(&app, "GET", "/courses", None).await;
  assert_eq!(all.as_array().unwrap().len(), 2);

  // Retire Geometry.
  let algebra_only = json!([snapshot()[0].clone()]);
  send(&app, "POST", "/reconcile", Some(algebra_only)).await;
  let (_, offered) = send(&app, "GET", "/courses?offered_only=true", None).await;
  assert_eq!(offered.as_array().unwrap().len(), 1);
  assert_eq!(offered[0]["external_code"], "0201");
}

#[tokio::test]
async fn curated_notes_survive_a_cycle() {
  let (app, store) = app().await;
  send(&app, "POST", "/reconcile", Some(snapshot())).await;
  let id = course_id(&store, "0201").await;

  let curated = json!({ "description": "Foundations.", "notes": "Summer section fills fast." });
  let (status, course) = send(&app, "PUT", &format!("/courses/{id}/curated"), Some(curated)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(course["notes"], "Summer section fills fast.");

  send(&app, "POST", "/reconcile", Some(snapshot())).await;
  let (_, view) = send(&app, "GET", &format!("/courses/{id}"), None).await;
  assert_eq!(view["course"]["description"], "Foundations.");
  assert_eq!(view["course"]["notes"], "Summer section fills fast.");

  let missing = format!("/courses/{}/curated", Uuid::new_v4());
  let (status, _) =
    send(&app, "PUT", &missing, Some(json!({ "description": "", "notes": "" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn prerequisite_check_endpoint() {
  let (app, store) = app().await;
  send(&app, "POST", "/reconcile", Some(snapshot())).await;
  let uri = format!("/courses/{}/prerequisites/check", course_id(&store, "0075A").await);

  let (status, check) = send(&app, "POST", &uri, Some(json!({ "completed": ["0202"] }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(check["met"], true);

  let (_, check) = send(&app, "POST", &uri, Some(json!({ "completed": ["0101"] }))).await;
  assert_eq!(check["met"], false);
  assert_eq!(check["unmet"][0], "Algebra 1 or Algebra 1 Honors");
}

#[tokio::test]
async fn unresolved_relationships_are_repairable() {
  let (app, store) = app().await;
  send(&app, "POST", "/reconcile", Some(snapshot())).await;

  let (status, rows) = send(&app, "GET", "/relationships/unresolved", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(rows.as_array().unwrap().len(), 1);
  assert_eq!(rows[0]["related_course_code"], "0202");
  let rel_id = rows[0]["relationship_id"].as_str().unwrap().to_owned();

  let uri = format!("/relationships/{rel_id}/repair");
  let (status, rel) = send(&app, "POST", &uri, Some(json!({ "code": "020" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(rel["related_course_code"], "020");
  assert_eq!(rel["related_course_id"], course_id(&store, "0201").await.to_string());

  let (_, rows) = send(&app, "GET", "/relationships/unresolved", None).await;
  assert!(rows.as_array().unwrap().is_empty());

  let (status, _) = send(&app, "POST", &uri, Some(json!({ "code": "" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let missing = format!("/relationships/{}/repair", Uuid::new_v4());
  let (status, _) = send(&app, "POST", &missing, Some(json!({ "code": "0201" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hand_added_relationships() {
  let (app, store) = app().await;
  send(&app, "POST", "/reconcile", Some(snapshot())).await;
  let algebra = course_id(&store, "0201").await;
  let geometry = course_id(&store, "0075A").await;
  let uri = format!("/courses/{algebra}/relationships");

  let body = json!({
    "target": { "kind": "code", "value": "0075" },
    "relationship_type": "recommended",
    "description": "Take Geometry next"
  });
  let (status, rel) = send(&app, "POST", &uri, Some(body)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(rel["related_course_id"], geometry.to_string());
  assert_eq!(rel["group_id"], Value::Null);

  let (_, rows) = send(&app, "GET", &format!("{uri}?type=recommended"), None).await;
  assert_eq!(rows.as_array().unwrap().len(), 1);
  let (_, rows) = send(&app, "GET", &format!("{uri}?type=prerequisite"), None).await;
  assert!(rows.as_array().unwrap().is_empty());

  let self_ref = json!({
    "target": { "kind": "id", "value": algebra },
    "relationship_type": "prerequisite"
  });
  let (status, _) = send(&app, "POST", &uri, Some(self_ref)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn resolve_endpoint() {
  let (app, store) = app().await;
  send(&app, "POST", "/reconcile", Some(snapshot())).await;

  let (_, found) = send(&app, "GET", "/resolve?code=0075", None).await;
  assert_eq!(found["course_id"], course_id(&store, "0075A").await.to_string());

  let (_, missing) = send(&app, "GET", "/resolve?code=9999", None).await;
  assert_eq!(missing["course_id"], Value::Null);
}
