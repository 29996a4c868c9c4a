//! End-to-end API tests against a running server.
//!
//! Start the server with Postgres and Redis available and
//! `MYVENTORY_AUTH__REQUIRE_CONFIRMED_EMAIL=false`. The first account ever
//! registered becomes an administrator, so register one by hand on a fresh
//! database before running:
//! `cargo test --test api_tests -- --ignored`

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Register a fresh account and log in. Returns (token, user id).
async fn new_user(client: &Client) -> (String, i64) {
    let username = unique("u");
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "correct horse"
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": username, "password": "correct horse" }))
        .send()
        .await
        .expect("Failed to send login request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse login response");
    let token = body["token"].as_str().expect("No token in response").to_string();
    let id = body["user"]["id"].as_i64().expect("No user id in response");
    (token, id)
}

async fn create_item(client: &Client, token: &str, name: &str, quantity: i32) -> i64 {
    let response = client
        .post(format!("{}/items", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "name": name, "quantity": quantity }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No item id")
}

async fn item_quantity(client: &Client, token: &str, id: i64) -> i64 {
    let body: Value = client
        .get(format!("{}/items/{}", BASE_URL, id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["quantity"].as_i64().expect("No quantity")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_login_and_me() {
    let client = Client::new();
    let (token, id) = new_user(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["id"], id);
    assert!(body.get("password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_duplicate_username_conflicts() {
    let client = Client::new();
    let username = unique("dup");
    let register = |email: String| {
        client
            .post(format!("{}/auth/register", BASE_URL))
            .json(&json!({ "username": username, "email": email, "password": "long enough" }))
            .send()
    };

    let first = register(format!("{}@example.com", username)).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let second = register(format!("other-{}@example.com", username)).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_repeated_bad_passwords_lock_the_account() {
    let client = Client::new();
    let username = unique("lock");
    client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "right password"
        }))
        .send()
        .await
        .unwrap();

    // Default max_failed_logins is 5
    for _ in 0..5 {
        let response = client
            .post(format!("{}/auth/login", BASE_URL))
            .json(&json!({ "login": username, "password": "wrong password" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": username, "password": "right password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("locked"));
}

#[tokio::test]
#[ignore]
async fn test_forgot_password_does_not_reveal_accounts() {
    let client = Client::new();
    let response = client
        .post(format!("{}/auth/forgot-password", BASE_URL))
        .json(&json!({ "email": format!("{}@nowhere.example", unique("ghost")) }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
#[ignore]
async fn test_lending_moves_quantities() {
    let client = Client::new();
    let (lender, _) = new_user(&client).await;
    let (_, borrower_id) = new_user(&client).await;
    let item = create_item(&client, &lender, "Drill", 3).await;

    let response = client
        .post(format!("{}/lendings", BASE_URL))
        .bearer_auth(&lender)
        .json(&json!({
            "borrower_id": borrower_id,
            "due_date": Utc::now() + Duration::days(7),
            "items": [{ "item_id": item, "quantity": 2 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let lending: Value = response.json().await.unwrap();
    assert_eq!(lending["status"], "open");
    assert_eq!(item_quantity(&client, &lender, item).await, 1);

    // Only one left on hand
    let response = client
        .post(format!("{}/lendings", BASE_URL))
        .bearer_auth(&lender)
        .json(&json!({
            "borrower_name": "Neighbour",
            "items": [{ "item_id": item, "quantity": 2 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = client
        .post(format!("{}/lendings/{}/end", BASE_URL, lending["id"]))
        .bearer_auth(&lender)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(item_quantity(&client, &lender, item).await, 3);

    let response = client
        .post(format!("{}/lendings/{}/end", BASE_URL, lending["id"]))
        .bearer_auth(&lender)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_location_cannot_become_its_own_ancestor() {
    let client = Client::new();
    let (token, _) = new_user(&client).await;

    let create = |name: &str, parent: Option<i64>| {
        client
            .post(format!("{}/locations", BASE_URL))
            .bearer_auth(&token)
            .json(&json!({ "name": name, "parent_id": parent }))
            .send()
    };
    let house: Value = create("House", None).await.unwrap().json().await.unwrap();
    let room: Value = create("Room", house["id"].as_i64()).await.unwrap().json().await.unwrap();
    let shelf: Value = create("Shelf", room["id"].as_i64()).await.unwrap().json().await.unwrap();

    let response = client
        .put(format!("{}/locations/{}", BASE_URL, house["id"]))
        .bearer_auth(&token)
        .json(&json!({ "parent_id": shelf["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let tree: Value = client
        .get(format!("{}/locations/tree", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tree.as_array().unwrap().len(), 1);
    assert_eq!(tree[0]["children"][0]["children"][0]["name"], "Shelf");
}

#[tokio::test]
#[ignore]
async fn test_attribute_values_are_type_checked() {
    let client = Client::new();
    let (token, _) = new_user(&client).await;
    let item = create_item(&client, &token, "Book", 1).await;

    let attribute: Value = client
        .post(format!("{}/attributes", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": unique("Weight"), "data_type": "number" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .put(format!("{}/items/{}/attributes", BASE_URL, item))
        .bearer_auth(&token)
        .json(&json!({ "values": [{ "attribute_id": attribute["id"], "value": "heavy" }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .put(format!("{}/items/{}/attributes", BASE_URL, item))
        .bearer_auth(&token)
        .json(&json!({ "values": [{ "attribute_id": attribute["id"], "value": "1.5" }] }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_group_sharing_controls_visibility() {
    let client = Client::new();
    let (owner, _) = new_user(&client).await;
    let (friend, friend_id) = new_user(&client).await;
    let item = create_item(&client, &owner, "Tent", 1).await;

    // Not shared yet
    let response = client
        .get(format!("{}/items/{}", BASE_URL, item))
        .bearer_auth(&friend)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let group: Value = client
        .post(format!("{}/groups", BASE_URL))
        .bearer_auth(&owner)
        .json(&json!({ "name": "Campers" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let group_id = group["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/groups/{}/members", BASE_URL, group_id))
        .bearer_auth(&owner)
        .json(&json!({ "user_id": friend_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{}/groups/{}/items", BASE_URL, group_id))
        .bearer_auth(&owner)
        .json(&json!({ "item_id": item }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .get(format!("{}/items/{}", BASE_URL, item))
        .bearer_auth(&friend)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // A member can read but not modify
    let response = client
        .put(format!("{}/items/{}", BASE_URL, item))
        .bearer_auth(&friend)
        .json(&json!({ "name": "Mine now" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The founder cannot leave
    let response = client
        .post(format!("{}/groups/{}/leave", BASE_URL, group_id))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = client
        .post(format!("{}/groups/{}/leave", BASE_URL, group_id))
        .bearer_auth(&friend)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{}/items/{}", BASE_URL, item))
        .bearer_auth(&friend)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_item_search_matches_exact_barcode() {
    let client = Client::new();
    let (token, _) = new_user(&client).await;
    let barcode = "4006381333931";

    let response = client
        .post(format!("{}/items", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": "Highlighter", "quantity": 1, "barcode": barcode }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let search = |q: &'static str| {
        client
            .get(format!("{}/items", BASE_URL))
            .bearer_auth(&token)
            .query(&[("q", q)])
            .send()
    };

    let found: Value = search(" 4006381333931 ").await.unwrap().json().await.unwrap();
    assert_eq!(found["total"], 1);
    assert_eq!(found["items"][0]["barcode"], barcode);

    // Partial codes only match names and descriptions
    let partial: Value = search("40063813").await.unwrap().json().await.unwrap();
    assert_eq!(partial["total"], 0);
}

fn count_nodes(nodes: &Value) -> usize {
    nodes
        .as_array()
        .map(|nodes| nodes.iter().map(|n| 1 + count_nodes(&n["children"])).sum())
        .unwrap_or(0)
}

#[tokio::test]
#[ignore]
async fn test_concurrent_bad_passwords_still_lock_the_account() {
    let client = Client::new();
    let username = unique("race");
    client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "right password"
        }))
        .send()
        .await
        .unwrap();

    let mut guesses = Vec::new();
    for _ in 0..20 {
        let client = client.clone();
        let username = username.clone();
        guesses.push(tokio::spawn(async move {
            client
                .post(format!("{}/auth/login", BASE_URL))
                .json(&json!({ "login": username, "password": "wrong password" }))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for guess in guesses {
        assert_eq!(guess.await.unwrap(), StatusCode::UNAUTHORIZED);
    }

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": username, "password": "right password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("locked"));
}

#[tokio::test]
#[ignore]
async fn test_concurrent_moves_never_create_a_cycle() {
    let client = Client::new();
    let (token, _) = new_user(&client).await;

    let create = |name: String| {
        client
            .post(format!("{}/locations", BASE_URL))
            .bearer_auth(&token)
            .json(&json!({ "name": name }))
            .send()
    };

    let rounds = 15;
    for round in 0..rounds {
        let x: Value = create(format!("X{}", round)).await.unwrap().json().await.unwrap();
        let y: Value = create(format!("Y{}", round)).await.unwrap().json().await.unwrap();

        let mut moves = Vec::new();
        for (child, parent) in [(&x, &y), (&y, &x)] {
            let client = client.clone();
            let token = token.clone();
            let url = format!("{}/locations/{}", BASE_URL, child["id"]);
            let parent_id = parent["id"].clone();
            moves.push(tokio::spawn(async move {
                client
                    .put(url)
                    .bearer_auth(&token)
                    .json(&json!({ "parent_id": parent_id }))
                    .send()
                    .await
                    .unwrap()
                    .status()
            }));
        }

        let mut accepted = 0;
        for m in moves {
            let status = m.await.unwrap();
            if status.is_success() {
                accepted += 1;
            } else {
                assert_eq!(status, StatusCode::BAD_REQUEST);
            }
        }
        assert_eq!(accepted, 1);
    }

    // Every location is still reachable from a root
    let tree: Value = client
        .get(format!("{}/locations/tree", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tree.as_array().unwrap().len(), rounds);
    assert_eq!(count_nodes(&tree), rounds * 2);
}

#[tokio::test]
#[ignore]
async fn test_deleting_an_item_removes_everything_attached() {
    let client = Client::new();
    let (token, _) = new_user(&client).await;
    let (_, borrower_id) = new_user(&client).await;
    let item = create_item(&client, &token, "Lamp", 2).await;
    let other = create_item(&client, &token, "Bulb", 4).await;

    // 1x1 transparent PNG
    let png = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
    let image: Value = client
        .post(format!("{}/items/{}/images", BASE_URL, item))
        .bearer_auth(&token)
        .json(&json!({ "file_name": "lamp.png", "content_type": "image/png", "data": png }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .get(format!("{}/items/{}/images/{}", BASE_URL, item, image["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["content-type"], "image/png");

    let attribute: Value = client
        .post(format!("{}/attributes", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": unique("Wattage"), "data_type": "number" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let response = client
        .put(format!("{}/items/{}/attributes", BASE_URL, item))
        .bearer_auth(&token)
        .json(&json!({ "values": [{ "attribute_id": attribute["id"], "value": "60" }] }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let desk: Value = client
        .post(format!("{}/locations", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": "Desk" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let response = client
        .put(format!("{}/items/{}/locations", BASE_URL, item))
        .bearer_auth(&token)
        .json(&json!({ "location_ids": [desk["id"]] }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let group: Value = client
        .post(format!("{}/groups", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": "Household" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let response = client
        .post(format!("{}/groups/{}/items", BASE_URL, group["id"]))
        .bearer_auth(&token)
        .json(&json!({ "item_id": item }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // One lending with only this item, one that also carries another item
    let lend = |items: Value| {
        client
            .post(format!("{}/lendings", BASE_URL))
            .bearer_auth(&token)
            .json(&json!({ "borrower_id": borrower_id, "items": items }))
            .send()
    };
    let only: Value = lend(json!([{ "item_id": item, "quantity": 1 }]))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let mixed: Value = lend(json!([
        { "item_id": item, "quantity": 1 },
        { "item_id": other, "quantity": 1 }
    ]))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(mixed["items"].as_array().unwrap().len(), 2);

    let response = client
        .delete(format!("{}/items/{}", BASE_URL, item))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{}/items/{}", BASE_URL, item))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .get(format!("{}/items/{}/images", BASE_URL, item))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .get(format!("{}/lendings/{}", BASE_URL, only["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let remaining: Value = client
        .get(format!("{}/lendings/{}", BASE_URL, mixed["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let lines = remaining["items"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["item_id"].as_i64(), Some(other));

    let shared: Value = client
        .get(format!("{}/groups/{}/items", BASE_URL, group["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(shared.as_array().unwrap().is_empty());

    let desk: Value = client
        .get(format!("{}/locations/{}", BASE_URL, desk["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(desk["items"].as_array().unwrap().is_empty());
}
