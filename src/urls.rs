//! Reverse routing: the paths handlers redirect to.

pub fn index() -> String {
    "/".to_string()
}

pub fn post_detail(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

pub fn profile(username: &str) -> String {
    format!("/profile/{username}/")
}

/// The login page with the originally requested path as `next`.
pub fn login(login_url: &str, next: &str) -> String {
    format!("{login_url}?next={next}")
}
