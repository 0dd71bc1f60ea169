//! Store-level invariant tests against a real Postgres. They are ignored
//! by default; point DATABASE_URL at a disposable database and run
//!
//!     cargo test -- --ignored

use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use workfair_api::errors::AppError;
use workfair_api::models::posting::PostingRow;
use workfair_api::models::user::UserRow;
use workfair_api::postings::store::{self as postings_store, CreatePosting, TimeWindow};
use workfair_api::postings::{PostingKind, PostingStatus};
use workfair_api::users::store::{self as users_store, CreateUser, UpdateUser};

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must point at a disposable Postgres");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("failed to connect");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to migrate");
    pool
}

fn unique(prefix: &str) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}-{}", SEQ.fetch_add(1, Ordering::Relaxed))
}

fn signup(username: String, email: String) -> CreateUser {
    CreateUser {
        username,
        password: "pw".to_string(),
        email,
        sex: None,
        birthday: None,
        image_url: None,
        company: None,
    }
}

async fn make_user(pool: &PgPool) -> UserRow {
    let payload = signup(unique("user"), format!("{}@example.com", unique("mail")));
    users_store::create_user(pool, &payload, "not-a-real-hash")
        .await
        .unwrap()
}

async fn make_posting(pool: &PgPool, kind: PostingKind, author_id: i64) -> PostingRow {
    let payload = CreatePosting {
        name: unique("posting"),
        description: String::new(),
        postal_code: None,
        prefecture: None,
        city: None,
        address: None,
        tags: vec![unique("tag")],
        times: vec![TimeWindow {
            start_time: Utc::now() + Duration::days(1),
            end_time: Utc::now() + Duration::days(2),
        }],
        purchase: None,
    };
    postings_store::create_posting(pool, kind, author_id, &payload)
        .await
        .unwrap()
}

async fn count(pool: &PgPool, table: &str, posting_id: i64) -> i64 {
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {table} WHERE posting_id = $1"
    ))
    .bind(posting_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
#[ignore]
async fn bookmark_toggle_flips_on_repeat() {
    let pool = test_pool().await;
    let author = make_user(&pool).await;
    let viewer = make_user(&pool).await;
    let job = make_posting(&pool, PostingKind::Job, author.id).await;

    assert!(
        postings_store::toggle_bookmark(&pool, PostingKind::Job, job.id, viewer.id)
            .await
            .unwrap()
    );
    assert!(
        !postings_store::toggle_bookmark(&pool, PostingKind::Job, job.id, viewer.id)
            .await
            .unwrap()
    );
    assert!(
        !postings_store::is_bookmarked(&pool, PostingKind::Job, job.id, viewer.id)
            .await
            .unwrap()
    );
}

#[tokio::test]
#[ignore]
async fn second_review_is_rejected() {
    let pool = test_pool().await;
    let author = make_user(&pool).await;
    let reviewer = make_user(&pool).await;
    let event = make_posting(&pool, PostingKind::Event, author.id).await;

    postings_store::create_review(&pool, PostingKind::Event, event.id, reviewer.id, "fine", 4)
        .await
        .unwrap();
    match postings_store::create_review(&pool, PostingKind::Event, event.id, reviewer.id, "again", 2)
        .await
    {
        Err(AppError::Validation(msg)) => assert_eq!(msg, "Review already exists"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
#[ignore]
async fn second_application_is_rejected() {
    let pool = test_pool().await;
    let author = make_user(&pool).await;
    let applicant = make_user(&pool).await;
    let job = make_posting(&pool, PostingKind::Job, author.id).await;

    postings_store::apply_to_job(&pool, job.id, applicant.id)
        .await
        .unwrap();
    match postings_store::apply_to_job(&pool, job.id, applicant.id).await {
        Err(AppError::Validation(msg)) => assert_eq!(msg, "Already applied"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
#[ignore]
async fn resolved_application_stays_resolved() {
    let pool = test_pool().await;
    let author = make_user(&pool).await;
    let applicant = make_user(&pool).await;
    let job = make_posting(&pool, PostingKind::Job, author.id).await;

    let application = postings_store::apply_to_job(&pool, job.id, applicant.id)
        .await
        .unwrap();
    let resolved = postings_store::resolve_application(&pool, job.id, application.id, "approved")
        .await
        .unwrap();
    assert_eq!(resolved.status, "approved");

    match postings_store::resolve_application(&pool, job.id, application.id, "rejected").await {
        Err(AppError::Validation(msg)) => assert_eq!(msg, "Application already resolved"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
#[ignore]
async fn duplicate_signup_is_rejected_with_exact_messages() {
    let pool = test_pool().await;
    let username = unique("user");
    let email = format!("{}@example.com", unique("mail"));
    users_store::create_user(&pool, &signup(username.clone(), email.clone()), "h")
        .await
        .unwrap();

    match users_store::create_user(&pool, &signup(unique("user"), email), "h").await {
        Err(AppError::Validation(msg)) => assert_eq!(msg, "Email already registered"),
        other => panic!("expected validation error, got {other:?}"),
    }
    match users_store::create_user(
        &pool,
        &signup(username, format!("{}@example.com", unique("mail"))),
        "h",
    )
    .await
    {
        Err(AppError::Validation(msg)) => assert_eq!(msg, "Username already registered"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
#[ignore]
async fn renaming_to_taken_username_or_email_is_rejected() {
    let pool = test_pool().await;
    let first = make_user(&pool).await;
    let second = make_user(&pool).await;

    let rename = UpdateUser {
        username: Some(first.username.clone()),
        email: None,
        sex: None,
        birthday: None,
        image_url: None,
    };
    match users_store::update_user(&pool, second.id, &rename).await {
        Err(AppError::Validation(msg)) => assert_eq!(msg, "Username already registered"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let remail = UpdateUser {
        username: None,
        email: Some(first.email.clone()),
        sex: None,
        birthday: None,
        image_url: None,
    };
    match users_store::update_user(&pool, second.id, &remail).await {
        Err(AppError::Validation(msg)) => assert_eq!(msg, "Email already registered"),
        other => panic!("expected validation error, got {other:?}"),
    }

    // Keeping your own name is not a collision.
    let keep = UpdateUser {
        username: Some(second.username.clone()),
        email: None,
        sex: None,
        birthday: None,
        image_url: None,
    };
    users_store::update_user(&pool, second.id, &keep).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn deleting_a_posting_removes_its_satellites() {
    let pool = test_pool().await;
    let author = make_user(&pool).await;
    let viewer = make_user(&pool).await;
    let job = make_posting(&pool, PostingKind::Job, author.id).await;

    postings_store::toggle_bookmark(&pool, PostingKind::Job, job.id, viewer.id)
        .await
        .unwrap();
    postings_store::create_review(&pool, PostingKind::Job, job.id, viewer.id, "ok", 3)
        .await
        .unwrap();

    postings_store::delete_posting(&pool, PostingKind::Job, job.id)
        .await
        .unwrap();

    assert_eq!(count(&pool, "job_tags", job.id).await, 0);
    assert_eq!(count(&pool, "job_times", job.id).await, 0);
    assert_eq!(count(&pool, "job_bookmarks", job.id).await, 0);
    let reviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE job_id = $1")
        .bind(job.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(reviews, 0);

    match postings_store::get_posting(&pool, PostingKind::Job, job.id).await {
        Err(AppError::NotFound(msg)) => assert_eq!(msg, "Job not found"),
        other => panic!("expected not-found, got {other:?}"),
    }
}

#[tokio::test]
#[ignore]
async fn deleting_a_user_removes_their_postings() {
    let pool = test_pool().await;
    let author = make_user(&pool).await;
    let event = make_posting(&pool, PostingKind::Event, author.id).await;

    users_store::delete_user(&pool, author.id).await.unwrap();

    match postings_store::get_posting(&pool, PostingKind::Event, event.id).await {
        Err(AppError::NotFound(msg)) => assert_eq!(msg, "Event not found"),
        other => panic!("expected not-found, got {other:?}"),
    }
}

#[tokio::test]
#[ignore]
async fn status_can_only_walk_the_lifecycle_edges() {
    let pool = test_pool().await;
    let author = make_user(&pool).await;
    let job = make_posting(&pool, PostingKind::Job, author.id).await;
    assert_eq!(job.status, "draft");

    // draft cannot skip to inactive
    match postings_store::change_status(&pool, PostingKind::Job, job.id, PostingStatus::Inactive)
        .await
    {
        Err(AppError::Validation(msg)) => assert!(msg.contains("Bad status transition")),
        other => panic!("expected validation error, got {other:?}"),
    }

    let activated =
        postings_store::change_status(&pool, PostingKind::Job, job.id, PostingStatus::Active)
            .await
            .unwrap();
    assert_eq!(activated.status, "active");

    // no edge back to draft once published
    match postings_store::change_status(&pool, PostingKind::Job, job.id, PostingStatus::Draft).await
    {
        Err(AppError::Validation(msg)) => assert!(msg.contains("Bad status transition")),
        other => panic!("expected validation error, got {other:?}"),
    }

    let paused =
        postings_store::change_status(&pool, PostingKind::Job, job.id, PostingStatus::Inactive)
            .await
            .unwrap();
    assert_eq!(paused.status, "inactive");
}
