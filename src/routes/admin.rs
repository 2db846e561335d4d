use crate::{AppState, handlers::admin};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

/// Admin Router Module
///
/// The back office, nested under `/admin`. Each handler extracts `AuthUser` and
/// checks `is_staff`, answering 403 otherwise.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/users
        // Mirrors an identity-provider account locally.
        .route("/users", post(admin::create_user))
        // GET/POST /admin/categories
        .route(
            "/categories",
            get(admin::list_categories).post(admin::create_category),
        )
        // PUT/DELETE /admin/categories/{id}
        // Deleting keeps the posts; they lose their category.
        .route(
            "/categories/{id}",
            put(admin::update_category).delete(admin::delete_category),
        )
        .route(
            "/locations",
            get(admin::list_locations).post(admin::create_location),
        )
        .route(
            "/locations/{id}",
            put(admin::update_location).delete(admin::delete_location),
        )
        // GET /admin/posts
        // Every post, unfiltered by publication state.
        .route("/posts", get(admin::list_posts))
        // PATCH /admin/posts/{id}
        // Publish, hide or reschedule.
        .route("/posts/{id}", patch(admin::update_post_publication))
}
