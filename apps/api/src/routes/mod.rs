pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::auth::handlers as auth_handlers;
use crate::notices::handlers as notice_handlers;
use crate::plans::handlers as plan_handlers;
use crate::postings::handlers as posting_handlers;
use crate::state::AppState;
use crate::tags;
use crate::users::handlers as user_handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/auth/token", post(auth_handlers::login))
        .route(
            "/auth/send-verification-email",
            post(auth_handlers::send_verification_email),
        )
        .route(
            "/auth/email-confirmation/:token",
            get(auth_handlers::email_confirmation),
        )
        .route("/auth/forgot-password", post(auth_handlers::forgot_password))
        .route(
            "/auth/reset-password/:token",
            post(auth_handlers::reset_password),
        )
        // Users
        .route(
            "/users",
            post(user_handlers::create_user).get(user_handlers::list_users),
        )
        .route("/users/me", get(user_handlers::get_me))
        .route("/users/me/bookmarks", get(user_handlers::my_bookmarks))
        .route("/users/me/history", get(user_handlers::my_history))
        .route("/users/me/postings", get(user_handlers::my_postings))
        .route("/users/me/applications", get(user_handlers::my_applications))
        .route(
            "/users/:id",
            get(user_handlers::get_user)
                .put(user_handlers::update_user)
                .delete(user_handlers::delete_user),
        )
        // Jobs
        .route(
            "/jobs",
            get(posting_handlers::list_jobs).post(posting_handlers::create_job),
        )
        .route(
            "/jobs/:id",
            get(posting_handlers::get_job)
                .put(posting_handlers::update_job)
                .delete(posting_handlers::delete_job),
        )
        .route(
            "/jobs/:id/change-status",
            put(posting_handlers::change_job_status),
        )
        .route("/jobs/:id/apply", post(posting_handlers::apply_to_job))
        .route(
            "/jobs/:id/applications",
            get(posting_handlers::list_job_applications),
        )
        .route(
            "/jobs/:id/applications/:application_id",
            put(posting_handlers::resolve_job_application),
        )
        .route("/jobs/:id/bookmark", put(posting_handlers::bookmark_job))
        .route(
            "/jobs/:id/review",
            post(posting_handlers::create_job_review)
                .put(posting_handlers::update_job_review)
                .delete(posting_handlers::delete_job_review),
        )
        // Events (identical shape minus apply/applications)
        .route(
            "/events",
            get(posting_handlers::list_events).post(posting_handlers::create_event),
        )
        .route(
            "/events/:id",
            get(posting_handlers::get_event)
                .put(posting_handlers::update_event)
                .delete(posting_handlers::delete_event),
        )
        .route(
            "/events/:id/change-status",
            put(posting_handlers::change_event_status),
        )
        .route("/events/:id/bookmark", put(posting_handlers::bookmark_event))
        .route(
            "/events/:id/review",
            post(posting_handlers::create_event_review)
                .put(posting_handlers::update_event_review)
                .delete(posting_handlers::delete_event_review),
        )
        // Tags
        .route("/tags", get(tags::handle_list))
        // Plans & purchases
        .route(
            "/plans",
            get(plan_handlers::list_plans).post(plan_handlers::create_plan),
        )
        .route(
            "/plans/:id",
            put(plan_handlers::update_plan).delete(plan_handlers::delete_plan),
        )
        .route(
            "/purchases",
            get(plan_handlers::list_purchases).post(plan_handlers::create_purchase),
        )
        .route("/purchases/:id", delete(plan_handlers::cancel_purchase))
        .route("/purchases/:id/paid", put(plan_handlers::confirm_paid))
        // Notices
        .route(
            "/notices",
            get(notice_handlers::list_notices).post(notice_handlers::create_notice),
        )
        .route("/notices/:message_id/read", put(notice_handlers::mark_read))
        .with_state(state)
}
