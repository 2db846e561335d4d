//! Who may see which posts and comments.
//!
//! The public predicate (`is_published ∧ category.is_published ∧ pub_date ≤ now`)
//! is defined once here, both as an SQL fragment for Postgres and as a plain
//! function for in-process filtering. Every listing, detail and profile route goes
//! through the operations below. `now` is always the request's clock reading.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{Category, Comment, Post},
    repository::Repository,
};

/// Visibility
///
/// The publication filter applied to a post query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only posts the public may see at instant `now`.
    Public { now: DateTime<Utc> },
    /// Every post, whatever its flags or date. Owners and staff only.
    Unrestricted,
}

impl Visibility {
    pub fn admits(&self, post: &Post) -> bool {
        match self {
            Visibility::Public { now } => is_publicly_visible(post, *now),
            Visibility::Unrestricted => true,
        }
    }

    /// Appends the SQL form of the predicate. Expects the post table aliased as
    /// `p` and the category table left-joined as `c`.
    pub fn push_predicate(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        if let Visibility::Public { now } = self {
            // A NULL category compares as unknown, so uncategorized posts drop out.
            builder.push(" AND p.is_published = TRUE AND c.is_published = TRUE AND p.pub_date <= ");
            builder.push_bind(*now);
        }
    }
}

/// The public-visibility predicate.
pub fn is_publicly_visible(post: &Post, now: DateTime<Utc>) -> bool {
    post.is_published && post.category_is_published == Some(true) && post.pub_date <= now
}

/// PostQuery
///
/// A post listing request: a visibility filter plus optional author and category
/// restrictions. Results are always ordered by `pub_date` descending, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostQuery {
    pub visibility: Visibility,
    pub author_id: Option<i64>,
    pub category_id: Option<i64>,
    /// `(offset, limit)` into the ordered result. `None` returns every match.
    pub window: Option<(usize, usize)>,
}

impl PostQuery {
    pub fn public(now: DateTime<Utc>) -> Self {
        Self {
            visibility: Visibility::Public { now },
            author_id: None,
            category_id: None,
            window: None,
        }
    }

    pub fn unrestricted() -> Self {
        Self {
            visibility: Visibility::Unrestricted,
            author_id: None,
            category_id: None,
            window: None,
        }
    }

    pub fn by_author(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn in_category(mut self, category_id: Option<i64>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn window(mut self, offset: usize, limit: usize) -> Self {
        self.window = Some((offset, limit));
        self
    }

    /// The filters only; `window` is applied after ordering.
    pub fn matches(&self, post: &Post) -> bool {
        self.visibility.admits(post)
            && self.author_id.is_none_or(|id| post.author_id == id)
            && self.category_id.is_none_or(|id| post.category_id == Some(id))
    }
}

// --- Operations ---

/// Public listing, optionally restricted to one category.
pub async fn list_public_posts(
    repo: &dyn Repository,
    category_id: Option<i64>,
    now: DateTime<Utc>,
) -> AppResult<Vec<Post>> {
    Ok(repo.find_posts(&public_posts_query(category_id, now)).await?)
}

pub fn public_posts_query(category_id: Option<i64>, now: DateTime<Utc>) -> PostQuery {
    PostQuery::public(now).in_category(category_id)
}

/// Resolves a category route. Missing and unpublished categories are both 404.
pub async fn published_category(repo: &dyn Repository, slug: &str) -> AppResult<Category> {
    repo.get_category_by_slug(slug)
        .await?
        .filter(|category| category.is_published)
        .ok_or(AppError::NotFound("category"))
}

/// A profile's post listing. The owner sees everything they wrote, scheduled and
/// unpublished posts included; every other viewer gets the public listing.
pub async fn list_posts_for_profile(
    repo: &dyn Repository,
    author_id: i64,
    viewer_id: Option<i64>,
    now: DateTime<Utc>,
) -> AppResult<Vec<Post>> {
    let query = profile_posts_query(author_id, viewer_id, now);
    Ok(repo.find_posts(&query).await?)
}

pub fn profile_posts_query(author_id: i64, viewer_id: Option<i64>, now: DateTime<Utc>) -> PostQuery {
    if viewer_id == Some(author_id) {
        PostQuery::unrestricted().by_author(author_id)
    } else {
        PostQuery::public(now).by_author(author_id)
    }
}

/// A single post as seen by `viewer_id`. Authors always see their own posts;
/// anyone else gets 404 unless the post is publicly visible.
pub async fn get_post_for_viewer(
    repo: &dyn Repository,
    post_id: i64,
    viewer_id: Option<i64>,
    now: DateTime<Utc>,
) -> AppResult<Post> {
    let post = repo
        .get_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;

    if viewer_id == Some(post.author_id) || is_publicly_visible(&post, now) {
        Ok(post)
    } else {
        Err(AppError::NotFound("post"))
    }
}

/// A comment addressed by id, parent post and author at once. Any mismatch is 404.
pub async fn get_comment_scoped(
    repo: &dyn Repository,
    comment_id: i64,
    post_id: i64,
    author_id: i64,
) -> AppResult<Comment> {
    repo.find_comment(comment_id, post_id, author_id)
        .await?
        .ok_or(AppError::NotFound("comment"))
}

/// Comments of a post, oldest first.
pub async fn list_comments(repo: &dyn Repository, post_id: i64) -> AppResult<Vec<Comment>> {
    Ok(repo.list_comments(post_id).await?)
}
