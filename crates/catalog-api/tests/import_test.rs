//! Import API integration tests.
//!
//! Run with: `cargo test -p catalog-api --test import_test`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use helpers::fixtures::import_image_form;
use helpers::{get, post_json, setup_test_app, staff_auth};
use serde_json::{json, Value};

#[tokio::test]
async fn test_import_health_reports_user() {
    let app = setup_test_app().await;

    let response = get(&app, "/upload/api/health/").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["username"], helpers::STAFF_USERNAME);
}

#[tokio::test]
async fn test_create_entry_then_duplicate_conflicts() {
    let app = setup_test_app().await;
    let request = json!({
        "name": "Knight Captain",
        "publisher": "Acme Minis",
        "range": "",
        "tags": { "Faction": ["Order", "Order", " "], "Scale": ["32mm"] }
    });

    let created = post_json(&app, "/upload/api/create-entry/", &request).await;
    assert_eq!(created.status_code(), 201, "{}", created.text());
    let created: Value = created.json();
    assert_eq!(created["entry_name"], "Knight Captain");
    assert_eq!(created["tags_assigned"], 2);
    let entry_id = created["entry_id"].as_str().unwrap().to_string();

    // blank range matches the stored NULL
    let duplicate = post_json(&app, "/upload/api/create-entry/", &request).await;
    assert_eq!(duplicate.status_code(), 409);
    let duplicate: Value = duplicate.json();
    assert_eq!(duplicate["error"], "Entry already exists");
    assert_eq!(duplicate["entry_id"], entry_id.as_str());

    let check = get(
        &app,
        "/upload/api/check-duplicate/?name=Knight%20Captain&publisher=Acme%20Minis",
    )
    .await;
    assert_eq!(check.status_code(), 200);
    let check: Value = check.json();
    assert_eq!(check["exists"], true);
    assert_eq!(check["entry_id"], entry_id.as_str());

    let tags: Value = get(&app, "/upload/api/get-tags/").await.json();
    assert_eq!(tags["tags"]["Faction"], json!(["Order"]));
    assert_eq!(tags["tags"]["Scale"], json!(["32mm"]));
}

#[tokio::test]
async fn test_create_entry_without_tags_sets_up_importer_tag_types() {
    let app = setup_test_app().await;
    let created = post_json(
        &app,
        "/upload/api/create-entry/",
        &json!({ "name": "Lone Scout", "publisher": "Acme Minis", "tags": {} }),
    )
    .await;
    assert_eq!(created.status_code(), 201, "{}", created.text());
    assert_eq!(created.json::<Value>()["tags_assigned"], 0);

    let tags: Value = get(&app, "/upload/api/get-tags/").await.json();
    for type_name in ["Publisher", "Faction Tag", "Army Role", "GW Alternative"] {
        assert_eq!(tags["tags"][type_name], json!([]), "missing {type_name}");
    }
}

#[tokio::test]
async fn test_check_duplicate_requires_name() {
    let app = setup_test_app().await;

    let response = get(&app, "/upload/api/check-duplicate/?publisher=Acme").await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["error"], "Name parameter required");
}

#[tokio::test]
async fn test_create_entry_rejects_blank_name_and_bad_json() {
    let app = setup_test_app().await;

    let blank = post_json(&app, "/upload/api/create-entry/", &json!({ "name": "  " })).await;
    assert_eq!(blank.status_code(), 400);
    assert_eq!(blank.json::<Value>()["error"], "Name is required");

    let garbage = app
        .client()
        .post("/upload/api/create-entry/")
        .add_header("Authorization", staff_auth())
        .add_header("Content-Type", "application/json")
        .text("{not json")
        .await;
    assert_eq!(garbage.status_code(), 400);
    assert_eq!(garbage.json::<Value>()["error"], "Invalid JSON");
}

#[tokio::test]
async fn test_three_uploads_keep_one_primary() {
    let app = setup_test_app().await;
    let created: Value = post_json(
        &app,
        "/upload/api/create-entry/",
        &json!({ "name": "Dragon", "publisher": "Acme Minis", "range": "Legends" }),
    )
    .await
    .json();
    let entry_id = created["entry_id"].as_str().unwrap().to_string();

    for (file, primary) in [("a.png", true), ("b.PNG", true), ("c.png", false)] {
        let response = app
            .client()
            .post("/upload/api/upload-image/")
            .add_header("Authorization", staff_auth())
            .multipart(import_image_form(&entry_id, file, primary))
            .await;
        assert_eq!(response.status_code(), 201, "{}", response.text());
        let body: Value = response.json();
        assert!(body["filename"].as_str().unwrap().ends_with(".png"));
    }

    let detail: Value = get(&app, &format!("/api/entries/{}", entry_id)).await.json();
    let images = detail["images"].as_array().unwrap();
    assert_eq!(images.len(), 3);
    let primaries: Vec<&Value> = images.iter().filter(|i| i["is_primary"] == true).collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(detail["display_image"]["id"], primaries[0]["id"]);
    for image in images {
        assert_eq!(image["name"], "Dragon");
        let key = image["file_path"].as_str().unwrap();
        assert!(key.starts_with("uploaded_images/"));
        assert!(app.media_exists(key));
    }
}

#[tokio::test]
async fn test_upload_image_to_unknown_entry_is_not_found() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/upload/api/upload-image/")
        .add_header("Authorization", staff_auth())
        .multipart(import_image_form("not-a-uuid", "a.png", false))
        .await;

    assert_eq!(response.status_code(), 404);
    assert_eq!(response.json::<Value>()["error"], "Entry not-a-uuid not found");
}
