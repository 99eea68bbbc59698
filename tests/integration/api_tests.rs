//! Authentication, catalog, user and support endpoints

use reqwest::StatusCode;
use serde_json::json;

use crate::common::{spawn_app, PASSWORD};

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let (status, body) = app.get("/health/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = spawn_app().await;
    let (id, token) = app.reader("alice").await;

    let (status, body) = app.get("/auth/me/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["is_staff"], false);
    assert_eq!(body["is_blocked"], false);
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = spawn_app().await;
    app.reader("alice").await;

    let (status, body) = app
        .post(
            "/auth/register/",
            None,
            json!({ "username": "alice", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate");

    let (status, body) = app
        .post("/auth/register/", None, json!({ "username": "bo", "password": "123" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_bad_credentials_are_unauthorized() {
    let app = spawn_app().await;
    app.reader("alice").await;

    let (status, body) = app
        .post("/token/", None, json!({ "username": "alice", "password": "wrong-password" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);

    let (status, _) = app
        .post("/token/", None, json!({ "username": "nobody", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_flow() {
    let app = spawn_app().await;
    app.reader("alice").await;

    let (_, pair) = app
        .post("/token/", None, json!({ "username": "alice", "password": PASSWORD }))
        .await;
    let access = pair["access"].as_str().unwrap().to_string();
    let refresh = pair["refresh"].as_str().unwrap().to_string();

    let (status, body) = app.post("/token/refresh/", None, json!({ "refresh": refresh })).await;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["access"].as_str().unwrap().to_string();

    let (status, _) = app.get("/auth/me/", Some(&fresh)).await;
    assert_eq!(status, StatusCode::OK);

    // Token types are not interchangeable
    let (status, _) = app.get("/auth/me/", Some(&refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.post("/token/refresh/", None, json!({ "refresh": access })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let app = spawn_app().await;

    let (status, body) = app.get("/my-borrows/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");

    let (status, _) = app.get("/auth/me/", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_staff_get_forbidden_on_staff_endpoints() {
    let app = spawn_app().await;
    let (_, token) = app.reader("alice").await;

    let (status, body) = app.post("/authors/", Some(&token), json!({ "name": "X" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    for path in ["/borrows/", "/users/", "/support/"] {
        let (status, _) = app.get(path, Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "GET {}", path);
    }

    let (status, _) = app.post("/approve-fine/", Some(&token), json!({ "borrow_id": 1 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post("/claims/1/approve/", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .post("/claims/approve/", Some(&token), json!({ "claim_id": 1, "approve": true }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post("/users/", Some(&token), json!({ "username": "mallory" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The role is checked before the request is looked at
    let (status, _) = app.post("/approve-fine/", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post("/claims/1/reopen/", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post("/claims/approve/", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete("/claims/999/", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_author_crud_and_public_reads() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, created) = app
        .post(
            "/authors/",
            Some(&admin),
            json!({ "name": "Ursula K. Le Guin", "birth_date": "1929-10-21" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["biography"], "");
    let id = created["id"].as_i64().unwrap();

    let (status, list) = app.get("/authors/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, updated) = app
        .put(&format!("/authors/{}/", id), &admin, json!({ "biography": "Earthsea" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["biography"], "Earthsea");
    assert_eq!(updated["name"], "Ursula K. Le Guin");
    assert_eq!(updated["birth_date"], "1929-10-21");

    let (status, _) = app.get("/authors/999/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.post("/authors/", Some(&admin), json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_book_creation_validates_isbn_and_author() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let author_id = app.create_author(&admin, "Brian Kernighan").await;

    let (status, book) = app
        .post(
            "/books/",
            Some(&admin),
            json!({ "title": "The C Programming Language", "isbn": "978-0-13-110362-7", "author_id": author_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", book);
    assert_eq!(book["isbn"], "9780131103627");
    assert_eq!(book["author"]["name"], "Brian Kernighan");
    assert_eq!(book["total_copies"], 1);
    assert_eq!(book["copies_available"], 1);
    assert_eq!(book["lost_fine"], "0.00");

    let (status, body) = app
        .post(
            "/books/",
            Some(&admin),
            json!({ "title": "Again", "isbn": "9780131103627", "author_id": author_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate");

    let (status, _) = app
        .post(
            "/books/",
            Some(&admin),
            json!({ "title": "Bad", "isbn": "isbn1", "author_id": author_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/books/",
            Some(&admin),
            json!({ "title": "Orphan", "isbn": "9780306406157", "author_id": 999 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/books/",
            Some(&admin),
            json!({ "title": "Negative", "isbn": "9780306406157", "author_id": author_id, "lost_fine": "-1.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing required field is a validation error in the API error format
    let (status, body) = app.post("/books/", Some(&admin), json!({ "title": "No ISBN" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_book_filters() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, reader) = app.reader("alice").await;

    let dune = app.create_book(&admin, "9780306406157", 1, "0.00").await;
    app.create_book(&admin, "9781593278281", 2, "0.00").await;
    app.borrow(&reader, dune).await;

    let (_, all) = app.get("/books/", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, available) = app.get("/books/?available=true", None).await;
    let available = available.as_array().unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0]["isbn"], "9781593278281");

    let (_, by_isbn) = app.get("/books/?isbn=0306", None).await;
    assert_eq!(by_isbn.as_array().unwrap().len(), 1);

    let (_, by_search) = app.get("/books/?search=Herbert", None).await;
    assert_eq!(by_search.as_array().unwrap().len(), 2);

    let (status, _) = app.get("/books/?author_id=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_book_update_keeps_loans_counted() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, reader) = app.reader("alice").await;

    let book = app.create_book(&admin, "9780306406157", 2, "0.00").await;
    app.borrow(&reader, book).await;
    assert_eq!(app.copies(book).await, (1, 2));

    let (status, updated) = app
        .put(&format!("/books/{}/", book), &admin, json!({ "total_copies": 5, "lost_fine": "12.5" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["copies_available"], 4);
    assert_eq!(updated["lost_fine"], "12.50");

    // One copy is on loan, so the total cannot drop to zero
    let (status, _) = app
        .put(&format!("/books/{}/", book), &admin, json!({ "total_copies": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.copies(book).await, (4, 5));
}

#[tokio::test]
async fn test_deleting_an_author_deletes_their_books() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let book = app.create_book(&admin, "9780306406157", 1, "0.00").await;

    let (_, body) = app.get(&format!("/books/{}/", book), None).await;
    let author_id = body["author"]["id"].as_i64().unwrap();

    let (status, _) = app.delete(&format!("/authors/{}/", author_id), &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/books/{}/", book), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_staff_user_management() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, created) = app
        .post("/users/", Some(&admin), json!({ "username": "carol", "email": "carol@example.org" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let carol = created["id"].as_i64().unwrap();

    // Default password for staff-created accounts
    app.login("carol", "welcome").await;

    app.reader("alice").await;
    let (status, users) = app.get("/users/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["alice", "carol"]);

    let (status, body) = app
        .post(
            &format!("/users/{}/status/", carol),
            Some(&admin),
            json!({ "is_online": true, "is_blocked": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detail"], "status updated");
    assert_eq!(body["is_online"], true);
    assert_eq!(body["is_blocked"], true);

    let (status, _) = app
        .post("/users/999/status/", Some(&admin), json!({ "is_blocked": true }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_password_reset_restores_default_password() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (alice, _) = app.reader("alice").await;

    let (status, _) = app
        .post(
            &format!("/users/{}/status/", alice),
            Some(&admin),
            json!({ "reset_password": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.login("alice", "welcome").await;
    let (status, _) = app
        .post("/token/", None, json!({ "username": "alice", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_support_messages() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, created) = app
        .post(
            "/support/",
            None,
            json!({ "name": "Dora", "email": "dora@example.org", "message": "Opening hours?" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["processed"], false);

    let (status, _) = app.post("/support/", None, json!({ "message": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = app.get("/support/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["message"], "Opening hours?");
}
