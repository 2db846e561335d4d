use crate::{
    AppState,
    handlers::{blog, pages},
};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only pages plus post editing, whose ownership check redirects refused
/// visitors (anonymous included) back to the post.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /?page=N
        .route("/", get(blog::index))
        // GET /category/{slug}/?page=N
        // 404 when the category is missing or unpublished.
        .route("/category/{slug}/", get(blog::category_posts))
        // GET /profile/{username}/?page=N
        // The owner also sees their unpublished and scheduled posts.
        .route("/profile/{username}/", get(blog::profile))
        // GET /posts/{id}/
        .route("/posts/{id}/", get(blog::post_detail))
        // GET/POST /posts/{id}/edit/
        .route(
            "/posts/{id}/edit/",
            get(blog::edit_post_form).post(blog::edit_post),
        )
        // Static pages.
        .route("/pages/about/", get(pages::about))
        .route("/pages/rules/", get(pages::rules))
}
