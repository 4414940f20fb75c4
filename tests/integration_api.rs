//! HTTP-level tests driving the actix routes over the in-memory store.

mod common;

use actix_web::{http::StatusCode, test, App};
use serde_json::{json, Value};

use mysplit::routes;
use mysplit::views::{ExpenseView, GroupCreatedView, SignInView, UserView};

use common::{setup, PASSWORD};

macro_rules! app {
    () => {{
        let (_, state) = setup();
        test::init_service(App::new().configure(routes::configure(state))).await
    }};
}

fn user_body(name: &str) -> Value {
    json!({
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "mobileNumber": format!("+1-555-{name}"),
        "password": PASSWORD,
    })
}

#[actix_web::test]
async fn health_check() {
    let app = app!();
    let request = test::TestRequest::get().uri("/health").to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_web::test]
async fn register_hides_hash_and_rejects_duplicates() {
    let app = app!();

    let request = test::TestRequest::post()
        .uri("/api/users")
        .set_json(user_body("Ana"))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(response).await;
    assert!(body.get("password").is_none());
    assert_eq!(body["email"], "ana@example.com");

    let duplicate = test::TestRequest::post()
        .uri("/api/users")
        .set_json(user_body("Ana"))
        .to_request();
    let response = test::call_service(&app, duplicate).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["errorCode"], "conflict");
}

#[actix_web::test]
async fn malformed_body_is_invalid_input() {
    let app = app!();
    let request = test::TestRequest::post()
        .uri("/api/users")
        .set_json(json!({ "name": "Ana" }))
        .to_request();

    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["errorCode"], "invalid_input");
}

#[actix_web::test]
async fn full_sign_in_flow() {
    let app = app!();
    let mut users = Vec::new();
    for name in ["Ana", "Ben", "Cy"] {
        let request = test::TestRequest::post()
            .uri("/api/users")
            .set_json(user_body(name))
            .to_request();
        let user: UserView = test::call_and_read_body_json(&app, request).await;
        users.push(user);
    }

    let request = test::TestRequest::post()
        .uri("/api/groups")
        .set_json(json!({
            "name": "Flat",
            "creator": "ana@example.com",
            "emails": ["ben@example.com", "cy@example.com", "ghost@example.com"],
        }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let group: GroupCreatedView = test::read_body_json(response).await;
    assert_eq!(group.group.creator, users[0].id);
    assert_eq!(group.group.users.len(), 3);
    assert_eq!(group.skipped_emails, vec!["ghost@example.com".to_string()]);

    let request = test::TestRequest::post()
        .uri("/api/expenses")
        .set_json(json!({
            "groupId": group.group.id,
            "paidBy": users[1].id,
            "createdBy": users[0].id,
            "amount": 90.0,
            "description": "Groceries",
            "split": [
                { "userId": users[0].id, "amount": 30.0 },
                { "userId": users[1].id, "amount": 30.0 },
                { "userId": users[2].id, "amount": 30.0 },
            ],
        }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let expense: ExpenseView = test::read_body_json(response).await;
    assert_eq!(expense.created_at, expense.modified_at);

    let request = test::TestRequest::post()
        .uri("/api/signin")
        .set_json(json!({ "email": "ana@example.com", "password": PASSWORD }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let signed_in: SignInView = test::read_body_json(response).await;

    assert!(!signed_in.token.is_empty());
    assert_eq!(signed_in.groups.len(), 1);
    assert_eq!(signed_in.expenses, vec![expense]);
    let mut co_members: Vec<String> = signed_in
        .users_in_groups
        .iter()
        .map(|user| user.name.clone())
        .collect();
    co_members.sort();
    assert_eq!(co_members, vec!["Ben".to_string(), "Cy".to_string()]);

    // The token unlocks the lookup routes.
    let request = test::TestRequest::get()
        .uri("/api/user/phoneNumber?phoneNumber=%2B1-555-Ben")
        .insert_header(("Authorization", format!("Bearer {}", signed_in.token)))
        .to_request();
    let ben: UserView = test::call_and_read_body_json(&app, request).await;
    assert_eq!(ben.id, users[1].id);
}

#[actix_web::test]
async fn bad_credentials_are_unauthorized() {
    let app = app!();
    let request = test::TestRequest::post()
        .uri("/api/users")
        .set_json(user_body("Ana"))
        .to_request();
    test::call_service(&app, request).await;

    for (email, password) in [("ana@example.com", "wrong"), ("nobody@example.com", PASSWORD)] {
        let request = test::TestRequest::post()
            .uri("/api/signin")
            .set_json(json!({ "email": email, "password": password }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"], "Invalid credentials");
    }
}

#[actix_web::test]
async fn lookup_requires_a_session() {
    let app = app!();

    let anonymous = test::TestRequest::get()
        .uri("/api/user/email?email=ana@example.com")
        .to_request();
    assert_eq!(test::call_service(&app, anonymous).await.status(), StatusCode::UNAUTHORIZED);

    let forged = test::TestRequest::get()
        .uri("/api/user/email?email=ana@example.com")
        .insert_header(("Authorization", "Bearer not.a.token"))
        .to_request();
    assert_eq!(test::call_service(&app, forged).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn unknown_creator_is_bad_request() {
    let app = app!();
    let request = test::TestRequest::post()
        .uri("/api/groups")
        .set_json(json!({ "name": "Trip", "creator": "ghost@example.com", "emails": [] }))
        .to_request();

    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["errorCode"], "invalid_creator");
}

#[actix_web::test]
async fn expense_id_handling() {
    let app = app!();
    let missing = bson::oid::ObjectId::new().to_hex();

    let request = test::TestRequest::get().uri("/api/expenses/not-an-id").to_request();
    assert_eq!(test::call_service(&app, request).await.status(), StatusCode::NOT_FOUND);

    let request = test::TestRequest::get()
        .uri(&format!("/api/expenses/{missing}"))
        .to_request();
    assert_eq!(test::call_service(&app, request).await.status(), StatusCode::NOT_FOUND);

    let request = test::TestRequest::put()
        .uri("/api/expenses/not-an-id")
        .set_json(json!({ "amount": 5.0 }))
        .to_request();
    assert_eq!(test::call_service(&app, request).await.status(), StatusCode::BAD_REQUEST);

    let request = test::TestRequest::put()
        .uri(&format!("/api/expenses/{missing}"))
        .set_json(json!({ "amount": 5.0 }))
        .to_request();
    assert_eq!(test::call_service(&app, request).await.status(), StatusCode::NOT_FOUND);

    let request = test::TestRequest::delete()
        .uri(&format!("/api/expenses/{missing}"))
        .to_request();
    assert_eq!(test::call_service(&app, request).await.status(), StatusCode::NO_CONTENT);

    let request = test::TestRequest::get()
        .uri("/api/groups/not-an-id/expenses")
        .to_request();
    assert_eq!(test::call_service(&app, request).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn update_then_list_by_group() {
    let app = app!();
    let group_id = bson::oid::ObjectId::new().to_hex();
    let payer = bson::oid::ObjectId::new().to_hex();

    let request = test::TestRequest::post()
        .uri("/api/expenses")
        .set_json(json!({
            "groupId": group_id,
            "paidBy": payer,
            "createdBy": payer,
            "amount": 40.0,
            "description": "Taxi",
            "split": [{ "userId": payer, "amount": 12.5 }],
        }))
        .to_request();
    let created: ExpenseView = test::call_and_read_body_json(&app, request).await;

    let request = test::TestRequest::put()
        .uri(&format!("/api/expenses/{}", created.id))
        .set_json(json!({ "description": "Airport taxi" }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let request = test::TestRequest::get()
        .uri(&format!("/api/groups/{group_id}/expenses"))
        .to_request();
    let listed: Vec<ExpenseView> = test::call_and_read_body_json(&app, request).await;

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].description, "Airport taxi");
    assert_eq!(listed[0].amount, 40.0);
    assert_eq!(listed[0].split[0].amount, 12.5);
    assert!(listed[0].modified_at >= created.modified_at);
}

#[actix_web::test]
async fn malformed_split_user_is_invalid_input() {
    let app = app!();
    let id = bson::oid::ObjectId::new().to_hex();
    let request = test::TestRequest::post()
        .uri("/api/expenses")
        .set_json(json!({
            "groupId": id,
            "paidBy": id,
            "createdBy": id,
            "amount": 1.0,
            "split": [{ "userId": "zzz", "amount": 1.0 }],
        }))
        .to_request();

    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
