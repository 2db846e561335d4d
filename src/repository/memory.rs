use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{RepoError, RepoResult, Repository};
use crate::{
    models::{
        Category, CategoryInput, Comment, Location, LocationInput, NewUser, Post, PostInput,
        ProfileUpdate, PublicationUpdate, User,
    },
    visibility::PostQuery,
};

/// A `posts` row before the joins.
#[derive(Debug, Clone)]
struct PostRow {
    id: i64,
    title: String,
    text: String,
    pub_date: DateTime<Utc>,
    image: Option<String>,
    is_published: bool,
    created_at: DateTime<Utc>,
    author_id: i64,
    category_id: Option<i64>,
    location_id: Option<i64>,
}

#[derive(Debug, Clone)]
struct CommentRow {
    id: i64,
    text: String,
    is_published: bool,
    created_at: DateTime<Utc>,
    author_id: i64,
    post_id: i64,
}

/// One counter per table, like `BIGSERIAL`.
#[derive(Debug, Default)]
struct Sequences {
    users: i64,
    categories: i64,
    locations: i64,
    posts: i64,
    comments: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Default)]
struct Tables {
    seq: Sequences,
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    locations: BTreeMap<i64, Location>,
    posts: BTreeMap<i64, PostRow>,
    comments: BTreeMap<i64, CommentRow>,
}

impl Tables {
    /// Performs the joins and the comment count of the Postgres projection.
    fn hydrate_post(&self, row: &PostRow) -> Post {
        let category = row.category_id.and_then(|id| self.categories.get(&id));
        let location = row.location_id.and_then(|id| self.locations.get(&id));
        let comment_count = self
            .comments
            .values()
            .filter(|comment| comment.post_id == row.id)
            .count() as i64;

        Post {
            id: row.id,
            title: row.title.clone(),
            text: row.text.clone(),
            pub_date: row.pub_date,
            image: row.image.clone(),
            is_published: row.is_published,
            created_at: row.created_at,
            author_id: row.author_id,
            author_username: self
                .users
                .get(&row.author_id)
                .map(|user| user.username.clone())
                .unwrap_or_default(),
            category_id: category.map(|c| c.id),
            category_slug: category.map(|c| c.slug.clone()),
            category_title: category.map(|c| c.title.clone()),
            category_is_published: category.map(|c| c.is_published),
            location_id: location.map(|l| l.id),
            location_name: location.map(|l| l.name.clone()),
            comment_count,
        }
    }

    fn hydrate_comment(&self, row: &CommentRow) -> Comment {
        Comment {
            id: row.id,
            text: row.text.clone(),
            is_published: row.is_published,
            created_at: row.created_at,
            author_id: row.author_id,
            author_username: self
                .users
                .get(&row.author_id)
                .map(|user| user.username.clone())
                .unwrap_or_default(),
            post_id: row.post_id,
        }
    }

    fn slug_taken(&self, slug: &str, except: Option<i64>) -> bool {
        self.categories
            .values()
            .any(|c| c.slug == slug && Some(c.id) != except)
    }

    /// Foreign keys the Postgres schema would reject.
    fn check_post_refs(&self, author_id: i64, input: &PostInput) -> RepoResult<()> {
        let author_ok = self.users.contains_key(&author_id);
        let category_ok = self.categories.contains_key(&input.category_id);
        let location_ok = input
            .location_id
            .is_none_or(|id| self.locations.contains_key(&id));

        if author_ok && category_ok && location_ok {
            Ok(())
        } else {
            Err(RepoError::Sqlx(sqlx::Error::RowNotFound))
        }
    }
}

/// MemoryRepository
///
/// An in-process `Repository` holding the same tables as the Postgres schema and
/// mirroring its constraints: unique usernames and slugs, `ON DELETE CASCADE` from
/// posts to comments, `ON DELETE SET NULL` from categories and locations to posts.
///
/// Used by the test suite and by local runs without `DATABASE_URL`.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- USERS ---

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepoError::Conflict { field: "username" });
        }

        let id = next(&mut tables.seq.users);
        let user = User {
            id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> RepoResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.email = update.email;
            user.first_name = update.first_name;
            user.last_name = update.last_name;
            user.clone()
        }))
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> RepoResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn get_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(&self, input: CategoryInput) -> RepoResult<Category> {
        let mut tables = self.tables.write().await;
        if tables.slug_taken(&input.slug, None) {
            return Err(RepoError::Conflict { field: "slug" });
        }

        let id = next(&mut tables.seq.categories);
        let category = Category {
            id,
            title: input.title,
            description: input.description,
            slug: input.slug,
            is_published: input.is_published,
            created_at: Utc::now(),
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, input: CategoryInput) -> RepoResult<Option<Category>> {
        let mut tables = self.tables.write().await;
        if tables.slug_taken(&input.slug, Some(id)) {
            return Err(RepoError::Conflict { field: "slug" });
        }

        Ok(tables.categories.get_mut(&id).map(|category| {
            category.title = input.title;
            category.description = input.description;
            category.slug = input.slug;
            category.is_published = input.is_published;
            category.clone()
        }))
    }

    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for post in tables.posts.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
        Ok(true)
    }

    // --- LOCATIONS ---

    async fn list_locations(&self) -> RepoResult<Vec<Location>> {
        let tables = self.tables.read().await;
        let mut locations: Vec<Location> = tables.locations.values().cloned().collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(locations)
    }

    async fn get_location(&self, id: i64) -> RepoResult<Option<Location>> {
        Ok(self.tables.read().await.locations.get(&id).cloned())
    }

    async fn create_location(&self, input: LocationInput) -> RepoResult<Location> {
        let mut tables = self.tables.write().await;
        let id = next(&mut tables.seq.locations);
        let location = Location {
            id,
            name: input.name,
            is_published: input.is_published,
            created_at: Utc::now(),
        };
        tables.locations.insert(id, location.clone());
        Ok(location)
    }

    async fn update_location(&self, id: i64, input: LocationInput) -> RepoResult<Option<Location>> {
        let mut tables = self.tables.write().await;
        Ok(tables.locations.get_mut(&id).map(|location| {
            location.name = input.name;
            location.is_published = input.is_published;
            location.clone()
        }))
    }

    async fn delete_location(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.locations.remove(&id).is_none() {
            return Ok(false);
        }
        for post in tables.posts.values_mut() {
            if post.location_id == Some(id) {
                post.location_id = None;
            }
        }
        Ok(true)
    }

    // --- POSTS ---

    async fn find_posts(&self, query: &PostQuery) -> RepoResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .map(|row| tables.hydrate_post(row))
            .filter(|post| query.matches(post))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));

        if let Some((offset, limit)) = query.window {
            posts = posts.into_iter().skip(offset).take(limit).collect();
        }
        Ok(posts)
    }

    async fn count_posts(&self, query: &PostQuery) -> RepoResult<usize> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .filter(|row| query.matches(&tables.hydrate_post(row)))
            .count())
    }

    async fn get_post(&self, id: i64) -> RepoResult<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).map(|row| tables.hydrate_post(row)))
    }

    async fn create_post(&self, author_id: i64, input: PostInput) -> RepoResult<Post> {
        let mut tables = self.tables.write().await;
        tables.check_post_refs(author_id, &input)?;

        let id = next(&mut tables.seq.posts);
        let row = PostRow {
            id,
            title: input.title,
            text: input.text,
            pub_date: input.pub_date,
            image: input.image,
            is_published: true,
            created_at: Utc::now(),
            author_id,
            category_id: Some(input.category_id),
            location_id: input.location_id,
        };
        let post = tables.hydrate_post(&row);
        tables.posts.insert(id, row);
        Ok(post)
    }

    async fn update_post(&self, id: i64, author_id: i64, input: PostInput) -> RepoResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        if !tables.posts.get(&id).is_some_and(|row| row.author_id == author_id) {
            return Ok(None);
        }
        tables.check_post_refs(author_id, &input)?;

        let Some(row) = tables.posts.get_mut(&id) else {
            return Ok(None);
        };
        row.title = input.title;
        row.text = input.text;
        row.pub_date = input.pub_date;
        row.image = input.image;
        row.category_id = Some(input.category_id);
        row.location_id = input.location_id;
        let row = row.clone();

        Ok(Some(tables.hydrate_post(&row)))
    }

    async fn delete_post(&self, id: i64, author_id: i64) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.posts.get(&id).is_some_and(|row| row.author_id == author_id) {
            return Ok(false);
        }
        tables.posts.remove(&id);
        tables.comments.retain(|_, comment| comment.post_id != id);
        Ok(true)
    }

    async fn set_post_publication(&self, id: i64, update: PublicationUpdate) -> RepoResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(is_published) = update.is_published {
            row.is_published = is_published;
        }
        if let Some(pub_date) = update.pub_date {
            row.pub_date = pub_date;
        }
        let row = row.clone();

        Ok(Some(tables.hydrate_post(&row)))
    }

    // --- COMMENTS ---

    async fn list_comments(&self, post_id: i64) -> RepoResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|row| row.post_id == post_id)
            .map(|row| tables.hydrate_comment(row))
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn find_comment(&self, id: i64, post_id: i64, author_id: i64) -> RepoResult<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .get(&id)
            .filter(|row| row.post_id == post_id && row.author_id == author_id)
            .map(|row| tables.hydrate_comment(row)))
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, text: String) -> RepoResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&post_id) || !tables.users.contains_key(&author_id) {
            return Err(RepoError::Sqlx(sqlx::Error::RowNotFound));
        }

        let id = next(&mut tables.seq.comments);
        let row = CommentRow {
            id,
            text,
            is_published: true,
            created_at: Utc::now(),
            author_id,
            post_id,
        };
        let comment = tables.hydrate_comment(&row);
        tables.comments.insert(id, row);
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, author_id: i64, text: String) -> RepoResult<Option<Comment>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .comments
            .get_mut(&id)
            .filter(|row| row.author_id == author_id)
        else {
            return Ok(None);
        };
        row.text = text;
        let row = row.clone();

        Ok(Some(tables.hydrate_comment(&row)))
    }

    async fn delete_comment(&self, id: i64, author_id: i64) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.comments.get(&id).is_some_and(|row| row.author_id == author_id) {
            return Ok(false);
        }
        tables.comments.remove(&id);
        Ok(true)
    }
}
