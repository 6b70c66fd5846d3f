//! Entry, image and file integration tests.
//!
//! Run with: `cargo test -p catalog-api --test entries_test`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use catalog_core::FileMetadata;
use helpers::fixtures::png_part;
use helpers::{get, setup_test_app, staff_auth, TestApp};
use serde_json::{json, Value};

/// Create an entry through the upload flow; returns the response body
async fn upload_entry(app: &TestApp, name: &str, publisher: &str) -> Value {
    let form = MultipartForm::new()
        .add_text("name", name.to_string())
        .add_text("publisher", publisher.to_string())
        .add_text("range", "Heroes")
        .add_part("image", png_part("photo.png"));
    let response = app
        .client()
        .post("/api/entries")
        .add_header("Authorization", staff_auth())
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    response.json()
}

#[tokio::test]
async fn test_upload_flow_stores_initial_primary_image() {
    let app = setup_test_app().await;

    let created = upload_entry(&app, "Knight Captain", "Acme Minis").await;

    let expected = FileMetadata::new("Knight Captain", Some("Acme Minis"), Some("Heroes"))
        .initial_filename(".png");
    assert_eq!(created["image"]["filename"], expected.as_str());
    assert_eq!(created["image"]["is_primary"], true);
    assert!(app.media_exists(created["image"]["file_path"].as_str().unwrap()));
}

#[tokio::test]
async fn test_upload_flow_rejects_non_image() {
    let app = setup_test_app().await;
    let form = MultipartForm::new().add_text("name", "Knight").add_part(
        "image",
        Part::bytes(b"solid".to_vec()).file_name("model.stl"),
    );

    let response = app
        .client()
        .post("/api/entries")
        .add_header("Authorization", staff_auth())
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_promote_and_only_image_rules() {
    let app = setup_test_app().await;
    let created = upload_entry(&app, "Dragon", "Acme Minis").await;
    let entry_id = created["entry"]["id"].as_str().unwrap().to_string();
    let first_image = created["image"]["id"].as_str().unwrap().to_string();

    // the only image cannot go
    let response = app
        .client()
        .delete(&format!("/api/entries/{}/images/{}", entry_id, first_image))
        .add_header("Authorization", staff_auth())
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(
        response.json::<Value>()["error"],
        "Cannot delete the only image of an entry"
    );

    let added = app
        .client()
        .post(&format!("/api/entries/{}/images", entry_id))
        .add_header("Authorization", staff_auth())
        .multipart(MultipartForm::new().add_part("images", png_part("second.png")))
        .await;
    assert_eq!(added.status_code(), 201, "{}", added.text());
    let added: Value = added.json();
    let second_image = added[0]["id"].as_str().unwrap().to_string();
    assert_eq!(added[0]["is_primary"], false);

    let promoted = app
        .client()
        .post(&format!(
            "/api/entries/{}/images/{}/primary",
            entry_id, second_image
        ))
        .add_header("Authorization", staff_auth())
        .await;
    assert_eq!(promoted.status_code(), 200);
    assert_eq!(promoted.json::<Value>()["is_primary"], true);

    // deleting the primary promotes the remaining image
    let deleted = app
        .client()
        .delete(&format!("/api/entries/{}/images/{}", entry_id, second_image))
        .add_header("Authorization", staff_auth())
        .await;
    assert_eq!(deleted.status_code(), 204);

    let detail: Value = get(&app, &format!("/api/entries/{}", entry_id)).await.json();
    let images = detail["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["id"], first_image.as_str());
    assert_eq!(images[0]["is_primary"], true);
}

/// Add one image through the images endpoint; returns its id
async fn add_image(app: &TestApp, entry_id: &str, filename: &str) -> String {
    let response = app
        .client()
        .post(&format!("/api/entries/{}/images", entry_id))
        .add_header("Authorization", staff_auth())
        .multipart(MultipartForm::new().add_part("images", png_part(filename)))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    response.json::<Value>()[0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_deleting_primary_promotes_oldest_remaining() {
    let app = setup_test_app().await;
    let created = upload_entry(&app, "Wyvern", "Acme Minis").await;
    let entry_id = created["entry"]["id"].as_str().unwrap().to_string();
    let first_image = created["image"]["id"].as_str().unwrap().to_string();
    let second_image = add_image(&app, &entry_id, "second.png").await;
    let third_image = add_image(&app, &entry_id, "third.png").await;

    let deleted = app
        .client()
        .delete(&format!("/api/entries/{}/images/{}", entry_id, first_image))
        .add_header("Authorization", staff_auth())
        .await;
    assert_eq!(deleted.status_code(), 204);

    let detail: Value = get(&app, &format!("/api/entries/{}", entry_id)).await.json();
    let images = detail["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    let primary: Vec<&Value> = images.iter().filter(|i| i["is_primary"] == true).collect();
    assert_eq!(primary.len(), 1);
    assert_eq!(primary[0]["id"], second_image.as_str());
    assert!(images
        .iter()
        .any(|i| i["id"] == third_image.as_str() && i["is_primary"] == false));
}

#[tokio::test]
async fn test_publisher_change_renames_media() {
    let app = setup_test_app().await;
    let created = upload_entry(&app, "Dragon", "Acme Minis").await;
    let entry_id = created["entry"]["id"].as_str().unwrap().to_string();
    let old_key = created["image"]["file_path"].as_str().unwrap().to_string();

    let stl = app
        .client()
        .post(&format!("/api/entries/{}/files/stl", entry_id))
        .add_header("Authorization", staff_auth())
        .multipart(MultipartForm::new().add_part(
            "files",
            Part::bytes(b"solid dragon".to_vec()).file_name("Dragon.STL"),
        ))
        .await;
    assert_eq!(stl.status_code(), 201, "{}", stl.text());

    let response = app
        .client()
        .put(&format!("/api/entries/{}", entry_id))
        .add_header("Authorization", staff_auth())
        .json(&json!({ "name": "Dragon", "publisher": "Forge Works", "range": "Heroes" }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    let detail: Value = response.json();

    let stem = FileMetadata::new("Dragon", Some("Forge Works"), Some("Heroes")).stem();
    let image = &detail["images"][0];
    assert_eq!(detail["publisher"], "Forge Works");
    let new_key = image["file_path"].as_str().unwrap();
    assert!(new_key.starts_with(&format!("uploaded_images/{}_", stem)), "{}", new_key);
    assert!(new_key.ends_with(".png"));
    assert!(app.media_exists(new_key));
    assert!(!app.media_exists(&old_key));

    let stl_key = detail["stl_files"][0]["file_path"].as_str().unwrap();
    let stl_dir = FileMetadata::new("Dragon", Some("Forge Works"), Some("Heroes"))
        .file_dir(catalog_core::models::FileKind::Stl);
    assert!(stl_key.starts_with(&stl_dir), "{}", stl_key);
    assert!(stl_key.ends_with(".stl"));
    assert!(app.media_exists(stl_key));
}

#[tokio::test]
async fn test_file_kind_and_extension_checks() {
    let app = setup_test_app().await;
    let created = upload_entry(&app, "Wyrm", "Acme Minis").await;
    let entry_id = created["entry"]["id"].as_str().unwrap().to_string();

    let unknown_kind = app
        .client()
        .post(&format!("/api/entries/{}/files/sculpt", entry_id))
        .add_header("Authorization", staff_auth())
        .multipart(MultipartForm::new().add_part("files", png_part("a.png")))
        .await;
    assert_eq!(unknown_kind.status_code(), 400);

    let wrong_ext = app
        .client()
        .post(&format!("/api/entries/{}/files/print", entry_id))
        .add_header("Authorization", staff_auth())
        .multipart(MultipartForm::new().add_part("files", png_part("a.png")))
        .await;
    assert_eq!(wrong_ext.status_code(), 400);

    let print = app
        .client()
        .post(&format!("/api/entries/{}/files/user_print", entry_id))
        .add_header("Authorization", staff_auth())
        .multipart(MultipartForm::new().add_part("files", png_part("painted.png")))
        .await;
    assert_eq!(print.status_code(), 201);
    let file_id = print.json::<Value>()[0]["id"].as_str().unwrap().to_string();
    let key = print.json::<Value>()[0]["file_path"].as_str().unwrap().to_string();
    assert!(key.starts_with("user_prints/"));

    let deleted = app
        .client()
        .delete(&format!("/api/entries/{}/files/{}", entry_id, file_id))
        .add_header("Authorization", staff_auth())
        .await;
    assert_eq!(deleted.status_code(), 204);
    assert!(!app.media_exists(&key));
}

#[tokio::test]
async fn test_delete_entry_removes_media() {
    let app = setup_test_app().await;
    let created = upload_entry(&app, "Ogre", "Acme Minis").await;
    let entry_id = created["entry"]["id"].as_str().unwrap().to_string();
    let key = created["image"]["file_path"].as_str().unwrap().to_string();

    let response = app
        .client()
        .delete(&format!("/api/entries/{}", entry_id))
        .add_header("Authorization", staff_auth())
        .await;
    assert_eq!(response.status_code(), 204);
    assert!(!app.media_exists(&key));

    let missing = get(&app, &format!("/api/entries/{}", entry_id)).await;
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn test_gallery_lists_entries_with_filters() {
    let app = setup_test_app().await;
    upload_entry(&app, "Ogre", "Acme Minis").await;
    upload_entry(&app, "Troll", "Forge Works").await;

    let all: Value = get(&app, "/api/entries").await.json();
    assert_eq!(all["total"], 2);
    assert_eq!(all["publishers"], json!(["Acme Minis", "Forge Works"]));

    let filtered: Value = get(&app, "/api/entries?publisher=Forge%20Works").await.json();
    assert_eq!(filtered["total"], 1);
    assert_eq!(filtered["entries"][0]["name"], "Troll");

    let stats: Value = get(&app, "/api/stats").await.json();
    assert_eq!(stats["total_publishers"], 2);
    assert_eq!(stats["total_images"], 2);
}
