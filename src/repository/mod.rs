use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    models::{
        Category, CategoryInput, Comment, Location, LocationInput, NewUser, Post, PostInput,
        ProfileUpdate, PublicationUpdate, User,
    },
    visibility::PostQuery,
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    /// A unique constraint rejected the write; `field` names the offending input.
    #[error("value of `{field}` is already taken")]
    Conflict { field: &'static str },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Repository Trait
///
/// The persistence contract behind every handler. Visibility decisions are made by
/// the caller through [`PostQuery`]; the repository only evaluates the filter it is
/// given. Mutations of posts and comments take the author id and only touch rows
/// owned by that author, so ownership is enforced at the data layer as well.
///
/// **Send + Sync + async_trait** keep `Arc<dyn Repository>` shareable across Axum's
/// task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> RepoResult<Option<User>>;

    // --- Categories (back office) ---
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn get_category(&self, id: i64) -> RepoResult<Option<Category>>;
    async fn get_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>>;
    async fn create_category(&self, input: CategoryInput) -> RepoResult<Category>;
    async fn update_category(&self, id: i64, input: CategoryInput) -> RepoResult<Option<Category>>;
    /// Posts filed under the category lose their category; they are not deleted.
    async fn delete_category(&self, id: i64) -> RepoResult<bool>;

    // --- Locations (back office) ---
    async fn list_locations(&self) -> RepoResult<Vec<Location>>;
    async fn get_location(&self, id: i64) -> RepoResult<Option<Location>>;
    async fn create_location(&self, input: LocationInput) -> RepoResult<Location>;
    async fn update_location(&self, id: i64, input: LocationInput) -> RepoResult<Option<Location>>;
    async fn delete_location(&self, id: i64) -> RepoResult<bool>;

    // --- Posts ---
    /// Posts matching `query`, annotated with their comment count, newest `pub_date` first.
    async fn find_posts(&self, query: &PostQuery) -> RepoResult<Vec<Post>>;
    /// How many posts match `query`'s filters; its window is ignored.
    async fn count_posts(&self, query: &PostQuery) -> RepoResult<usize>;
    /// Any post by primary key, without visibility checks.
    async fn get_post(&self, id: i64) -> RepoResult<Option<Post>>;
    async fn create_post(&self, author_id: i64, input: PostInput) -> RepoResult<Post>;
    /// Owner-only: `None` unless `author_id` wrote the post.
    async fn update_post(&self, id: i64, author_id: i64, input: PostInput) -> RepoResult<Option<Post>>;
    /// Owner-only. Cascades to the post's comments.
    async fn delete_post(&self, id: i64, author_id: i64) -> RepoResult<bool>;
    /// Back-office override of the publication flags.
    async fn set_post_publication(&self, id: i64, update: PublicationUpdate) -> RepoResult<Option<Post>>;

    // --- Comments ---
    /// Comments of a post ordered by `created_at`, oldest first.
    async fn list_comments(&self, post_id: i64) -> RepoResult<Vec<Comment>>;
    /// Matches on id, parent post and author together.
    async fn find_comment(&self, id: i64, post_id: i64, author_id: i64) -> RepoResult<Option<Comment>>;
    async fn create_comment(&self, post_id: i64, author_id: i64, text: String) -> RepoResult<Comment>;
    async fn update_comment(&self, id: i64, author_id: i64, text: String) -> RepoResult<Option<Comment>>;
    async fn delete_comment(&self, id: i64, author_id: i64) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
