//! Borrow, return, report-lost and fine approval

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::common::{spawn_app, spawn_app_on_disk, TestApp};

#[tokio::test]
async fn test_single_copy_scenario() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, alice) = app.reader("alice").await;
    let (_, bob) = app.reader("bob").await;

    let book = app.create_book(&admin, "9780306406157", 1, "0.00").await;

    let borrow_a = app.borrow(&alice, book).await;
    assert_eq!(app.copies(book).await, (0, 1));

    let (status, body) = app.post("/borrow/", Some(&bob), json!({ "book_id": book })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No copies available");

    let (status, returned) = app
        .post("/return/", Some(&alice), json!({ "borrow_id": borrow_a }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["status"], "returned");
    assert!(returned["return_date"].is_string());
    assert_eq!(returned["fine_due"], "0.00");
    assert_eq!(returned["fine_paid"], true);
    assert_eq!(app.copies(book).await, (1, 1));

    app.borrow(&bob, book).await;
    assert_eq!(app.copies(book).await, (0, 1));
}

#[tokio::test]
async fn test_borrow_details_and_due_date() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (alice_id, alice) = app.reader("alice").await;
    let book = app.create_book(&admin, "9780306406157", 3, "0.00").await;

    let (status, body) = app.post("/borrow/", Some(&alice), json!({ "book_id": book })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "active");
    assert_eq!(body["user"]["id"], alice_id);
    assert_eq!(body["book"]["isbn"], "9780306406157");
    assert_eq!(body["is_overdue"], false);

    let borrowed = chrono::DateTime::parse_from_rfc3339(body["borrow_date"].as_str().unwrap()).unwrap();
    let due = chrono::DateTime::parse_from_rfc3339(body["due_date"].as_str().unwrap()).unwrap();
    let loan = (due - borrowed).num_seconds();
    assert!((loan - 14 * 24 * 3600).abs() < 60, "loan period was {}s", loan);
}

#[tokio::test]
async fn test_no_two_active_borrows_for_the_same_book() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, alice) = app.reader("alice").await;
    let book = app.create_book(&admin, "9780306406157", 3, "0.00").await;

    app.borrow(&alice, book).await;

    let (status, body) = app.post("/borrow/", Some(&alice), json!({ "book_id": book })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already has an active borrow for this book");
    assert_eq!(app.copies(book).await, (2, 3));
}

#[tokio::test]
async fn test_borrow_request_validation() {
    let app = spawn_app().await;
    let (_, alice) = app.reader("alice").await;

    let (status, body) = app.post("/borrow/", Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "book_id is required");

    let (status, _) = app.post("/borrow/", Some(&alice), json!({ "book_id": 42 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.post("/return/", Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/return/", Some(&alice), json!({ "borrow_id": 42 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_returning_a_non_active_borrow_fails() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, alice) = app.reader("alice").await;
    let book = app.create_book(&admin, "9780306406157", 2, "0.00").await;

    let borrow = app.borrow(&alice, book).await;
    let (status, _) = app.post("/return/", Some(&alice), json!({ "borrow_id": borrow })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/return/", Some(&alice), json!({ "borrow_id": borrow })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "RuleViolation");
    assert_eq!(app.copies(book).await, (2, 2));

    // Lost borrows cannot be returned either
    let lost = app.borrow(&alice, book).await;
    app.post("/report-lost/", Some(&alice), json!({ "borrow_id": lost })).await;
    let (status, _) = app.post("/return/", Some(&alice), json!({ "borrow_id": lost })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.copies(book).await, (1, 2));
}

#[tokio::test]
async fn test_only_the_borrower_or_staff_act_on_a_borrow() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, alice) = app.reader("alice").await;
    let (_, bob) = app.reader("bob").await;
    let book = app.create_book(&admin, "9780306406157", 2, "0.00").await;

    let borrow = app.borrow(&alice, book).await;

    let (status, _) = app.post("/return/", Some(&bob), json!({ "borrow_id": borrow })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post("/report-lost/", Some(&bob), json!({ "borrow_id": borrow })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post("/return/", Some(&admin), json!({ "borrow_id": borrow })).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_report_lost_and_approve_fine() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, alice) = app.reader("alice").await;
    let book = app.create_book(&admin, "9780306406157", 2, "20.00").await;

    let borrow = app.borrow(&alice, book).await;
    let (status, lost) = app
        .post("/report-lost/", Some(&alice), json!({ "borrow_id": borrow }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lost["status"], "lost");
    assert_eq!(lost["fine_due"], "20.00");
    assert_eq!(lost["fine_paid"], false);
    assert_eq!(app.copies(book).await, (1, 2));

    let (status, body) = app
        .post("/report-lost/", Some(&alice), json!({ "borrow_id": borrow }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Borrow already marked lost");

    // Unpaid lost borrow still blocks a new borrow of the same title
    let (status, _) = app.post("/borrow/", Some(&alice), json!({ "book_id": book })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, paid) = app
        .post("/approve-fine/", Some(&admin), json!({ "borrow_id": borrow }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["fine_paid"], true);
    assert_eq!(paid["status"], "lost");
    // The lost copy stays out of circulation
    assert_eq!(app.copies(book).await, (1, 2));

    let (status, body) = app
        .post("/approve-fine/", Some(&admin), json!({ "borrow_id": borrow }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Fine already paid");

    // Settled, so the title can be borrowed again
    app.borrow(&alice, book).await;
    assert_eq!(app.copies(book).await, (0, 2));
}

#[tokio::test]
async fn test_approve_fine_needs_a_lost_or_fined_borrow() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, alice) = app.reader("alice").await;
    let book = app.create_book(&admin, "9780306406157", 1, "0.00").await;

    let borrow = app.borrow(&alice, book).await;
    let (status, _) = app
        .post("/approve-fine/", Some(&admin), json!({ "borrow_id": borrow }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_staff_borrow_on_behalf_and_blocked_users() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (alice_id, alice) = app.reader("alice").await;
    let book = app.create_book(&admin, "9780306406157", 3, "0.00").await;

    app.post(
        &format!("/users/{}/status/", alice_id),
        Some(&admin),
        json!({ "is_blocked": true }),
    )
    .await;

    let (status, body) = app.post("/borrow/", Some(&alice), json!({ "book_id": book })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "User is blocked");
    assert_eq!(app.copies(book).await, (3, 3));

    let (status, body) = app
        .post(
            "/borrow/",
            Some(&admin),
            json!({ "book_id": book, "username": "alice", "due_date": "2030-01-01T00:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["id"], alice_id);
    assert!(body["due_date"].as_str().unwrap().starts_with("2030-01-01"));

    let (status, _) = app
        .post("/borrow/", Some(&admin), json!({ "book_id": book, "username": "ghost" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/borrow/", Some(&admin), json!({ "book_id": book, "user_id": 999 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Readers cannot borrow for someone else; the field is ignored
    let (_, bob) = app.reader("bob").await;
    let (status, body) = app
        .post("/borrow/", Some(&bob), json!({ "book_id": book, "user_id": alice_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], "bob");
}

#[tokio::test]
async fn test_borrow_listings() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, alice) = app.reader("alice").await;
    let (_, bob) = app.reader("bob").await;
    let first = app.create_book(&admin, "9780306406157", 1, "0.00").await;
    let second = app.create_book(&admin, "9781593278281", 1, "0.00").await;

    app.borrow(&alice, first).await;
    app.borrow(&alice, second).await;
    let (status, _) = app.post("/borrow/", Some(&bob), json!({ "book_id": first })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, mine) = app.get("/my-borrows/", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 2);
    // Newest first
    assert_eq!(mine[0]["book"]["id"], second);

    let (_, theirs) = app.get("/my-borrows/", Some(&bob)).await;
    assert!(theirs.as_array().unwrap().is_empty());

    let (status, all) = app.get("/borrows/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);
}

/// Fire one `POST /borrow/` per reader at the same time
async fn borrow_all_at_once(app: &Arc<TestApp>, readers: Vec<String>, book: i64) -> Vec<(StatusCode, Value)> {
    let handles: Vec<_> = readers
        .into_iter()
        .map(|token| {
            let app = Arc::clone(app);
            tokio::spawn(async move {
                app.post("/borrow/", Some(&token), json!({ "book_id": book })).await
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("borrow task panicked"));
    }
    results
}

async fn readers(app: &TestApp, count: usize) -> Vec<String> {
    let mut tokens = Vec::new();
    for i in 0..count {
        let (_, token) = app.reader(&format!("reader{}", i)).await;
        tokens.push(token);
    }
    tokens
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_borrows_of_the_last_copy() {
    let app = Arc::new(spawn_app_on_disk().await);
    let admin = app.admin_token().await;
    let book = app.create_book(&admin, "9780306406157", 1, "0.00").await;
    let tokens = readers(&app, 8).await;

    let results = borrow_all_at_once(&app, tokens, book).await;

    let created = results.iter().filter(|(status, _)| *status == StatusCode::CREATED).count();
    assert_eq!(created, 1, "{:?}", results);
    for (status, body) in results.iter().filter(|(status, _)| *status != StatusCode::CREATED) {
        assert_eq!(*status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(body["message"], "No copies available");
    }
    assert_eq!(app.copies(book).await, (0, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_borrows_of_different_copies_all_succeed() {
    let app = Arc::new(spawn_app_on_disk().await);
    let admin = app.admin_token().await;
    let book = app.create_book(&admin, "9780306406157", 8, "0.00").await;
    let tokens = readers(&app, 8).await;

    let results = borrow_all_at_once(&app, tokens, book).await;

    for (status, body) in &results {
        assert_eq!(*status, StatusCode::CREATED, "{}", body);
    }
    assert_eq!(app.copies(book).await, (0, 8));

    let (_, all) = app.get("/borrows/", Some(&admin)).await;
    assert_eq!(all.as_array().unwrap().len(), 8);
}
