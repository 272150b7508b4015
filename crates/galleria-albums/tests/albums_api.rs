//! Album API tests through the full dispatch engine.

mod common;

use common::{log_in, logged_in};
use serde_json::{json, Value};

async fn create(client: &galleria_test::TestClient, body: Value) -> Value {
    let response = client.post("/api/v1/albums").json(&body).send().await;
    response.assert_status_code(201);
    response.data().unwrap()
}

#[tokio::test]
async fn test_anonymous_api_request_redirects_to_login() {
    let client = common::client();

    let response = client.get("/api/v1/albums?page=2").send().await;
    response.assert_redirect("/auth/login");

    let destination = log_in(&client, "ada-code").await;
    assert_eq!(destination, "/api/v1/albums?page=2");
}

#[tokio::test]
async fn test_create_and_fetch_album() {
    let client = logged_in("ada-code").await;

    let album = create(
        &client,
        json!({"name": "Summer", "description": "", "coverPhotoUrl": "https://cdn.example.com/s.jpg"}),
    )
    .await;
    assert_eq!(album["name"], "Summer");
    assert_eq!(album["status"], "draft");
    assert_eq!(album["tenantId"], "org-1");
    assert_eq!(album["description"], Value::Null);
    assert_eq!(album["deletedAt"], Value::Null);

    let id = album["id"].as_str().unwrap();
    let fetched = client.get(format!("/api/v1/albums/{id}")).send().await;
    fetched.assert_status_code(200);
    assert_eq!(fetched.data().unwrap(), album);
    assert!(fetched.meta().unwrap()["serverTime"].is_string());
}

#[tokio::test]
async fn test_create_from_form_body() {
    let client = logged_in("ada-code").await;

    let response = client
        .post("/api/v1/albums")
        .form(&[("name", "Winter"), ("status", "published")])
        .send()
        .await;
    response.assert_status_code(201);
    assert_eq!(response.data().unwrap()["status"], "published");
}

#[tokio::test]
async fn test_validation_failure_shape() {
    let client = logged_in("ada-code").await;

    let response = client
        .post("/api/v1/albums")
        .json(&json!({"name": "", "coverPhotoUrl": "not a url"}))
        .send()
        .await;
    response.assert_status_code(422);

    let error = response.error().unwrap();
    assert_eq!(error["message"], "Validation failed");
    let paths: Vec<&str> = error["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|issue| issue["path"].as_str())
        .collect();
    assert!(paths.contains(&"name"));
    assert!(paths.contains(&"coverPhotoUrl"));
}

#[tokio::test]
async fn test_duplicate_name_conflicts() {
    let client = logged_in("ada-code").await;
    create(&client, json!({"name": "Summer"})).await;

    let response = client
        .post("/api/v1/albums")
        .json(&json!({"name": "summer"}))
        .send()
        .await;
    response.assert_status_code(409);
    assert!(response.error_message().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_list_paginates_with_meta() {
    let client = logged_in("ada-code").await;
    for name in ["A", "B", "C"] {
        create(&client, json!({ "name": name })).await;
    }

    let response = client
        .get("/api/v1/albums")
        .query(&[("limit", "2"), ("page", "2"), ("sortBy", "name"), ("sortDirection", "asc")])
        .send()
        .await;
    response.assert_status_code(200);

    let data = response.data().unwrap();
    assert_eq!(data.as_array().unwrap().len(), 1);
    assert_eq!(data[0]["name"], "C");

    let meta = response.meta().unwrap();
    assert_eq!(meta["page"], 2);
    assert_eq!(meta["limit"], 2);
    assert_eq!(meta["total"], 3);
    assert!(meta["serverTime"].is_string());
}

#[tokio::test]
async fn test_list_limit_over_maximum_is_rejected() {
    let client = logged_in("ada-code").await;

    let response = client.get("/api/v1/albums?limit=101").send().await;
    response.assert_status_code(422);
    assert_eq!(response.error().unwrap()["details"][0]["path"], "limit");
}

#[tokio::test]
async fn test_list_garbled_limit_is_rejected_not_defaulted() {
    let client = logged_in("ada-code").await;

    for query in ["limit=abc", "limit=%zz"] {
        let response = client.get(format!("/api/v1/albums?{query}")).send().await;
        response.assert_status_code(422);
        assert_eq!(response.error().unwrap()["details"][0]["path"], "limit");
    }
}

#[tokio::test]
async fn test_list_filters_by_search_and_status() {
    let client = logged_in("ada-code").await;
    create(&client, json!({"name": "Beach", "description": "sunny days"})).await;
    create(&client, json!({"name": "Mountains", "status": "published"})).await;

    let search = client.get("/api/v1/albums?search=SUNNY").send().await;
    assert_eq!(search.meta().unwrap()["total"], 1);
    assert_eq!(search.data().unwrap()[0]["name"], "Beach");

    let published = client.get("/api/v1/albums?status=published").send().await;
    assert_eq!(published.data().unwrap()[0]["name"], "Mountains");
}

#[tokio::test]
async fn test_update_album() {
    let client = logged_in("ada-code").await;
    let album = create(&client, json!({"name": "Summer", "description": "beach"})).await;
    let id = album["id"].as_str().unwrap();

    let response = client
        .put(format!("/api/v1/albums/{id}"))
        .json(&json!({"description": null, "status": "archived"}))
        .send()
        .await;
    response.assert_status_code(200);

    let updated = response.data().unwrap();
    assert_eq!(updated["name"], "Summer");
    assert_eq!(updated["description"], Value::Null);
    assert_eq!(updated["status"], "archived");
}

#[tokio::test]
async fn test_delete_album() {
    let client = logged_in("ada-code").await;
    let album = create(&client, json!({"name": "Summer"})).await;
    let path = format!("/api/v1/albums/{}", album["id"].as_str().unwrap());

    let response = client.delete(&path).send().await;
    response.assert_status_code(200);
    assert_eq!(response.data().unwrap(), json!({"deleted": true}));

    client.get(&path).send().await.assert_status_code(404);
    client.delete(&path).send().await.assert_status_code(404);

    // The name is free again once the album is gone.
    create(&client, json!({"name": "Summer"})).await;
}

#[tokio::test]
async fn test_malformed_id_is_not_found() {
    let client = logged_in("ada-code").await;

    let response = client.get("/api/v1/albums/not-a-uuid").send().await;
    response.assert_status_code(404);
    assert_eq!(response.error_message().unwrap(), "Album not found");
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let ada = logged_in("ada-code").await;
    let album = create(&ada, json!({"name": "Private"})).await;
    let path = format!("/api/v1/albums/{}", album["id"].as_str().unwrap());

    let grace = ada.fresh_session();
    log_in(&grace, "grace-code").await;

    grace.get(&path).send().await.assert_status_code(404);
    grace
        .put(&path)
        .json(&json!({"name": "Mine now"}))
        .send()
        .await
        .assert_status_code(404);
    assert_eq!(grace.get("/api/v1/albums").send().await.meta().unwrap()["total"], 0);

    // Same name in another tenant is fine.
    create(&grace, json!({"name": "Private"})).await;
}

#[tokio::test]
async fn test_user_without_tenant_is_forbidden() {
    let client = logged_in("loner-code").await;

    let response = client.get("/api/v1/albums").send().await;
    response.assert_status_code(403);
}
