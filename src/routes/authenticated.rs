use crate::{AppState, handlers::blog};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes that need a session. The `AuthUser` middleware layered on this router in
/// `create_router` redirects anonymous visitors to the login page with `?next=`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/POST /profile/{username}/edit/
        // Another user's profile is 404.
        .route(
            "/profile/{username}/edit/",
            get(blog::edit_profile_form).post(blog::edit_profile),
        )
        // GET/POST /posts/create/
        .route(
            "/posts/create/",
            get(blog::create_post_form).post(blog::create_post),
        )
        // GET/POST /posts/{id}/delete/
        // Non-authors are sent back to the post.
        .route(
            "/posts/{id}/delete/",
            get(blog::delete_post_form).post(blog::delete_post),
        )
        // POST /posts/{id}/comment/
        // The post must be visible to the commenter.
        .route("/posts/{id}/comment/", post(blog::add_comment))
        // GET/POST /posts/{id}/edit_comment/{comment_id}/
        // Scoped to post and author; anything else is 404.
        .route(
            "/posts/{id}/edit_comment/{comment_id}/",
            get(blog::edit_comment_form).post(blog::edit_comment),
        )
        // POST /posts/{id}/delete_comment/{comment_id}/
        .route(
            "/posts/{id}/delete_comment/{comment_id}/",
            post(blog::delete_comment),
        )
}
