use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};

use super::{RepoError, RepoResult, Repository};
use crate::{
    models::{
        Category, CategoryInput, Comment, Location, LocationInput, NewUser, Post, PostInput,
        ProfileUpdate, PublicationUpdate, User,
    },
    visibility::PostQuery,
};

/// Joined, comment-counted post projection. Always followed by `WHERE`-clause
/// fragments starting with ` AND `, then [`POST_GROUP_BY`].
const POST_SELECT: &str = r#"
    SELECT
        p.id, p.title, p.text, p.pub_date, p.image, p.is_published, p.created_at,
        p.author_id, u.username AS author_username,
        p.category_id, c.slug AS category_slug, c.title AS category_title,
        c.is_published AS category_is_published,
        p.location_id, l.name AS location_name,
        COUNT(cm.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
    LEFT JOIN comments cm ON cm.post_id = p.id
    WHERE TRUE
"#;

const POST_GROUP_BY: &str = " GROUP BY p.id, u.id, c.id, l.id";

/// Counts the rows [`POST_SELECT`] would return, given the same filters.
const POST_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM posts p
    LEFT JOIN categories c ON c.id = p.category_id
    WHERE TRUE
"#;

const COMMENT_SELECT: &str = r#"
    SELECT
        cm.id, cm.text, cm.is_published, cm.created_at,
        cm.author_id, u.username AS author_username, cm.post_id
    FROM comments cm
    JOIN users u ON u.id = cm.author_id
"#;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, is_staff, created_at";
const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";
const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Queries are checked at
/// runtime (`query_as` + `FromRow`); the schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations. Called once at startup.
    pub async fn migrate(&self) -> RepoResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn get_comment(&self, id: i64) -> RepoResult<Option<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE cm.id = $1");
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn get_post_or_vanished(&self, id: i64) -> RepoResult<Post> {
        self.get_post(id)
            .await?
            .ok_or(RepoError::Sqlx(sqlx::Error::RowNotFound))
    }
}

/// Appends the `WHERE` fragments of `query`: visibility, then author and category.
fn push_filters(builder: &mut QueryBuilder<'_, sqlx::Postgres>, query: &PostQuery) {
    query.visibility.push_predicate(builder);

    if let Some(author_id) = query.author_id {
        builder.push(" AND p.author_id = ");
        builder.push_bind(author_id);
    }

    if let Some(category_id) = query.category_id {
        builder.push(" AND p.category_id = ");
        builder.push_bind(category_id);
    }
}

fn to_sql_bound(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Maps a unique-constraint violation onto [`RepoError::Conflict`] for `field`.
fn unique_violation(field: &'static str) -> impl FnOnce(sqlx::Error) -> RepoError {
    move |err| {
        let is_unique = err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if is_unique {
            RepoError::Conflict { field }
        } else {
            RepoError::Sqlx(err)
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, first_name, last_name, is_staff) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.username)
            .bind(user.email)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(user.is_staff)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_violation("username"))
    }

    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET email = $2, first_name = $3, last_name = $4 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(update.email)
            .bind(update.first_name)
            .bind(update.last_name)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY title, id");
        Ok(sqlx::query_as::<_, Category>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_category(&self, id: i64) -> RepoResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_category(&self, input: CategoryInput) -> RepoResult<Category> {
        let sql = format!(
            "INSERT INTO categories (title, description, slug, is_published) \
             VALUES ($1, $2, $3, $4) RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(input.title)
            .bind(input.description)
            .bind(input.slug)
            .bind(input.is_published)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_violation("slug"))
    }

    async fn update_category(&self, id: i64, input: CategoryInput) -> RepoResult<Option<Category>> {
        let sql = format!(
            "UPDATE categories SET title = $2, description = $3, slug = $4, is_published = $5 \
             WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(input.title)
            .bind(input.description)
            .bind(input.slug)
            .bind(input.is_published)
            .fetch_optional(&self.pool)
            .await
            .map_err(unique_violation("slug"))
    }

    /// `posts.category_id` is `ON DELETE SET NULL`.
    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- LOCATIONS ---

    async fn list_locations(&self) -> RepoResult<Vec<Location>> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations ORDER BY name, id");
        Ok(sqlx::query_as::<_, Location>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_location(&self, id: i64) -> RepoResult<Option<Location>> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1");
        Ok(sqlx::query_as::<_, Location>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_location(&self, input: LocationInput) -> RepoResult<Location> {
        let sql = format!(
            "INSERT INTO locations (name, is_published) VALUES ($1, $2) RETURNING {LOCATION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Location>(&sql)
            .bind(input.name)
            .bind(input.is_published)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_location(&self, id: i64, input: LocationInput) -> RepoResult<Option<Location>> {
        let sql = format!(
            "UPDATE locations SET name = $2, is_published = $3 WHERE id = $1 RETURNING {LOCATION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Location>(&sql)
            .bind(id)
            .bind(input.name)
            .bind(input.is_published)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_location(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- POSTS ---

    /// find_posts
    ///
    /// Builds the listing with `QueryBuilder` so every filter value is bound, never
    /// interpolated. A window becomes `LIMIT`/`OFFSET` after the ordering.
    async fn find_posts(&self, query: &PostQuery) -> RepoResult<Vec<Post>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(POST_SELECT);
        push_filters(&mut builder, query);

        builder.push(POST_GROUP_BY);
        builder.push(" ORDER BY p.pub_date DESC, p.id DESC");

        if let Some((offset, limit)) = query.window {
            builder.push(" LIMIT ");
            builder.push_bind(to_sql_bound(limit));
            builder.push(" OFFSET ");
            builder.push_bind(to_sql_bound(offset));
        }

        Ok(builder
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_posts(&self, query: &PostQuery) -> RepoResult<usize> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(POST_COUNT);
        push_filters(&mut builder, query);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn get_post(&self, id: i64) -> RepoResult<Option<Post>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(POST_SELECT);
        builder.push(" AND p.id = ");
        builder.push_bind(id);
        builder.push(POST_GROUP_BY);

        Ok(builder
            .build_query_as::<Post>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_post(&self, author_id: i64, input: PostInput) -> RepoResult<Post> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (title, text, pub_date, image, author_id, category_id, location_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(input.title)
        .bind(input.text)
        .bind(input.pub_date)
        .bind(input.image)
        .bind(author_id)
        .bind(input.category_id)
        .bind(input.location_id)
        .fetch_one(&self.pool)
        .await?;

        self.get_post_or_vanished(id).await
    }

    /// update_post
    ///
    /// Owner-only: the `author_id` condition makes a non-owner update affect 0 rows.
    async fn update_post(&self, id: i64, author_id: i64, input: PostInput) -> RepoResult<Option<Post>> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE posts
            SET title = $3, text = $4, pub_date = $5, image = $6,
                category_id = $7, location_id = $8
            WHERE id = $1 AND author_id = $2
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(author_id)
        .bind(input.title)
        .bind(input.text)
        .bind(input.pub_date)
        .bind(input.image)
        .bind(input.category_id)
        .bind(input.location_id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.get_post(id).await,
            None => Ok(None),
        }
    }

    /// `comments.post_id` is `ON DELETE CASCADE`.
    async fn delete_post(&self, id: i64, author_id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_post_publication(&self, id: i64, update: PublicationUpdate) -> RepoResult<Option<Post>> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE posts
            SET is_published = COALESCE($2, is_published),
                pub_date = COALESCE($3, pub_date)
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(update.is_published)
        .bind(update.pub_date)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.get_post(id).await,
            None => Ok(None),
        }
    }

    // --- COMMENTS ---

    async fn list_comments(&self, post_id: i64) -> RepoResult<Vec<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE cm.post_id = $1 ORDER BY cm.created_at ASC, cm.id ASC");
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_comment(&self, id: i64, post_id: i64, author_id: i64) -> RepoResult<Option<Comment>> {
        let sql = format!(
            "{COMMENT_SELECT} WHERE cm.id = $1 AND cm.post_id = $2 AND cm.author_id = $3"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(post_id)
            .bind(author_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, text: String) -> RepoResult<Comment> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO comments (post_id, author_id, text) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        self.get_comment(id)
            .await?
            .ok_or(RepoError::Sqlx(sqlx::Error::RowNotFound))
    }

    async fn update_comment(&self, id: i64, author_id: i64, text: String) -> RepoResult<Option<Comment>> {
        let updated: Option<i64> = sqlx::query_scalar(
            "UPDATE comments SET text = $3 WHERE id = $1 AND author_id = $2 RETURNING id",
        )
        .bind(id)
        .bind(author_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.get_comment(id).await,
            None => Ok(None),
        }
    }

    async fn delete_comment(&self, id: i64, author_id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
