//! End-to-end tests for the HTTP surface, run against the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use rocket::error::ErrorKind;
use rocket::figment::Figment;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use rocket::serde::json::{json, Value};
use rsvp_service::models::{Attendance, Rsvp, Stats};
use rsvp_service::store::{RsvpStore, StoreError, StoreResult};

const KEY: &str = "test-admin-key";

fn test_figment() -> Figment {
    Figment::from(rocket::Config::debug_default())
        .merge(("store", "memory"))
        .merge(("admin_key", KEY))
        .merge(("origin", "*"))
        .merge(("log_level", "off"))
}

async fn client() -> Client {
    Client::tracked(rsvp_service::build(test_figment()))
        .await
        .expect("valid rocket instance")
}

async fn post_json(client: &Client, body: Value) -> LocalResponse<'_> {
    client
        .post("/api/rsvp")
        .header(ContentType::JSON)
        .header(Header::new("User-Agent", "integration-test"))
        .body(body.to_string())
        .dispatch()
        .await
}

async fn rows(client: &Client) -> Vec<Value> {
    let response = client
        .get(format!("/api/admin/rsvps?key={KEY}"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("json body");
    body["rows"].as_array().expect("rows array").clone()
}

async fn stats(client: &Client) -> Value {
    let response = client
        .get("/api/admin/stats")
        .header(Header::new("x-admin-key", KEY))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    response.into_json().await.expect("json body")
}

fn anna() -> Value {
    json!({
        "name": "Anna Muster",
        "guests": "Tom, Lea",
        "kidsCount": 2,
        "attendance": "wir_kommen",
        "notes": "",
    })
}

#[rocket::async_test]
async fn submission_is_stored_as_given() {
    let client = client().await;
    let before = stats(&client).await;

    let response = post_json(&client, anna()).await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["ok"], true);
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 12);

    let rows = rows(&client).await;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["id"], id.as_str());
    assert_eq!(row["name"], "Anna Muster");
    assert_eq!(row["guests"], "Tom, Lea");
    assert_eq!(row["kids_count"], 2);
    assert_eq!(row["attendance"], "yes");
    assert_eq!(row["notes"], Value::Null);
    assert_eq!(row["user_agent"], "integration-test");
    assert!(row["created_at"].as_str().unwrap().ends_with('Z'));

    let after = stats(&client).await;
    assert_eq!(after["yes"], before["yes"].as_i64().unwrap() + 1);
    assert_eq!(after["kids"], before["kids"].as_i64().unwrap() + 2);
}

#[rocket::async_test]
async fn empty_name_is_rejected() {
    let client = client().await;

    let response = post_json(&client, json!({ "name": "", "attendance": "wir_kommen" })).await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

    let response = post_json(&client, json!({ "name": "   ", "attendance": "wir_kommen" })).await;
    assert_eq!(response.status(), Status::BadRequest);

    assert!(rows(&client).await.is_empty());
}

#[rocket::async_test]
async fn unknown_attendance_is_rejected() {
    let client = client().await;

    for attendance in [json!("vielleicht"), json!("yes"), json!(null), json!(3)] {
        let response =
            post_json(&client, json!({ "name": "Anna", "attendance": attendance })).await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    assert!(rows(&client).await.is_empty());
}

#[rocket::async_test]
async fn malformed_kids_count_is_dropped() {
    let client = client().await;

    let response = post_json(
        &client,
        json!({ "name": "Ben", "kidsCount": "viele", "attendance": "wir_kommen_am_freitag" }),
    )
    .await;
    assert_eq!(response.status(), Status::Ok);

    let response = post_json(
        &client,
        json!({ "name": "Cem", "kidsCount": "3", "attendance": "wir_kommen_nicht" }),
    )
    .await;
    assert_eq!(response.status(), Status::Ok);

    let rows = rows(&client).await;
    let ben = rows.iter().find(|r| r["name"] == "Ben").unwrap();
    let cem = rows.iter().find(|r| r["name"] == "Cem").unwrap();
    assert_eq!(ben["kids_count"], Value::Null);
    assert_eq!(ben["attendance"], "friday");
    assert_eq!(cem["kids_count"], 3);
    assert_eq!(cem["attendance"], "no");
}

#[rocket::async_test]
async fn stats_agree_with_rows() {
    let client = client().await;
    let answers = [
        ("A", "wir_kommen", json!(1)),
        ("B", "wir_kommen", json!(null)),
        ("C", "wir_kommen_nicht", json!(0)),
        ("D", "wir_kommen_am_freitag", json!(4)),
    ];
    for (name, attendance, kids) in answers {
        let response = post_json(
            &client,
            json!({ "name": name, "attendance": attendance, "kidsCount": kids }),
        )
        .await;
        assert_eq!(response.status(), Status::Ok);
    }

    let stats = stats(&client).await;
    assert_eq!(
        stats,
        json!({ "total": 4, "yes": 2, "no": 1, "friday": 1, "kids": 5 })
    );

    let rows = rows(&client).await;
    assert_eq!(rows.len() as i64, stats["total"].as_i64().unwrap());
    let kids: i64 = rows.iter().filter_map(|r| r["kids_count"].as_i64()).sum();
    assert_eq!(kids, stats["kids"].as_i64().unwrap());
}

#[rocket::async_test]
async fn form_posts_are_accepted() {
    let client = client().await;

    let response = client
        .post("/api/rsvp")
        .header(ContentType::Form)
        .body("name=Dora&guests=&kidsCount=1&attendance=wir_kommen&notes=Bis+bald")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let rows = rows(&client).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Dora");
    assert_eq!(rows[0]["guests"], Value::Null);
    assert_eq!(rows[0]["kids_count"], 1);
    assert_eq!(rows[0]["notes"], "Bis bald");
}

#[rocket::async_test]
async fn forwarded_for_is_recorded() {
    let client = client().await;

    let response = client
        .post("/api/rsvp")
        .header(ContentType::JSON)
        .header(Header::new("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
        .body(anna().to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let rows = rows(&client).await;
    assert_eq!(rows[0]["ip"], "203.0.113.7");
}

#[rocket::async_test]
async fn admin_endpoints_require_the_key() {
    let client = client().await;

    for path in ["/api/admin/rsvps", "/api/admin/stats", "/api/admin/export.csv"] {
        let response = client.get(path).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized, "{path} without key");
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], "Unauthorized");

        let response = client.get(format!("{path}?key=wrong")).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized, "{path} with wrong key");

        let response = client
            .get(path)
            .header(Header::new("x-admin-key", format!("{KEY}x")))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized, "{path} with wrong header");

        let response = client.get(format!("{path}?key={KEY}")).dispatch().await;
        assert_eq!(response.status(), Status::Ok, "{path} with key");

        let response = client
            .get(path)
            .header(Header::new("x-admin-key", KEY))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok, "{path} with header");
    }
}

#[rocket::async_test]
async fn csv_export_is_an_attachment() {
    let client = client().await;
    let response = post_json(
        &client,
        json!({ "name": "Eva", "attendance": "wir_kommen", "notes": "Sie sagt \"Hallo\"" }),
    )
    .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .get(format!("/api/admin/export.csv?key={KEY}"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::CSV));

    let disposition = response
        .headers()
        .get_one("Content-Disposition")
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"rsvps_"));
    assert!(disposition.ends_with(".csv\""));

    let body = response.into_string().await.unwrap();
    let mut lines = body.lines();
    assert_eq!(
        lines.next(),
        Some("id,created_at,name,guests,kids_count,attendance,notes,user_agent,ip")
    );
    let row = lines.next().unwrap();
    assert!(row.contains(r#","Eva","","","yes","Sie sagt ""Hallo""","#));
    assert_eq!(lines.next(), None);
}

#[rocket::async_test]
async fn unknown_routes_answer_in_json() {
    let client = client().await;
    let response = client.get("/api/nope").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "Not found");
}

#[rocket::async_test]
async fn cors_reflects_the_origin() {
    let client = client().await;
    let response = client
        .options("/api/rsvp")
        .header(Header::new("Origin", "https://hochzeit.example"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NoContent);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some("https://hochzeit.example")
    );
    assert!(response
        .headers()
        .get_one("Access-Control-Allow-Headers")
        .unwrap()
        .contains("X-Admin-Key"));
}

/// A store whose database is gone: every call fails with a detail that must
/// never reach the client.
struct UnreachableStore;

const LEAKED_DETAIL: &str = "secret detail";

fn gone<T>() -> StoreResult<T> {
    Err(StoreError::Pool(LEAKED_DETAIL.into()))
}

#[async_trait]
impl RsvpStore for UnreachableStore {
    async fn insert(&self, _record: &Rsvp) -> StoreResult<()> {
        gone()
    }

    async fn list_all(&self) -> StoreResult<Vec<Rsvp>> {
        gone()
    }

    async fn count_by_attendance(&self, _attendance: Attendance) -> StoreResult<i64> {
        gone()
    }

    async fn count_all(&self) -> StoreResult<i64> {
        gone()
    }

    async fn sum_kids(&self) -> StoreResult<i64> {
        gone()
    }

    async fn stats(&self) -> StoreResult<Stats> {
        gone()
    }
}

async fn assert_server_error(response: LocalResponse<'_>, what: &str) {
    assert_eq!(response.status(), Status::InternalServerError, "{what}");
    let body = response.into_string().await.expect("body");
    assert!(!body.contains(LEAKED_DETAIL), "{what} leaked: {body}");
    let body: Value = rocket::serde::json::from_str(&body).expect("json body");
    assert_eq!(body, json!({ "error": "Server error" }), "{what}");
}

#[rocket::async_test]
async fn store_failures_answer_with_a_generic_500() {
    let rocket = rsvp_service::build_with(test_figment(), Arc::new(UnreachableStore));
    let client = Client::tracked(rocket).await.expect("valid rocket instance");

    let response = post_json(&client, anna()).await;
    assert_server_error(response, "POST /api/rsvp").await;

    for path in ["/api/admin/rsvps", "/api/admin/stats", "/api/admin/export.csv"] {
        let response = client
            .get(path)
            .header(Header::new("x-admin-key", KEY))
            .dispatch()
            .await;
        assert_server_error(response, path).await;
    }
}

#[rocket::async_test]
async fn invalid_store_setting_stops_ignition() {
    let figment = test_figment().merge(("store", "sqlite"));
    match Client::tracked(rsvp_service::build(figment)).await {
        Ok(_) => panic!("ignition should fail for an unknown store"),
        Err(e) => assert!(matches!(e.kind(), ErrorKind::FailedFairings(_))),
    }
}

#[rocket::async_test]
async fn padded_attendance_token_is_rejected() {
    let client = client().await;

    let response =
        post_json(&client, json!({ "name": "Anna", "attendance": " wir_kommen " })).await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "Please choose whether you are coming.");

    assert!(rows(&client).await.is_empty());
}
