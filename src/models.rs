use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    forms::{CommentForm, PostForm, ProfileForm},
    pagination::Page,
};

// --- Core Entities (Mapped to Database) ---

/// User
///
/// The local mirror of an identity-provider account, stored in the `users` table.
/// `username` is the stable identifier used in profile URLs and is never edited here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    // Grants access to the `/admin` routes.
    pub is_staff: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Category
///
/// Back-office managed grouping of posts. An unpublished category hides every
/// post filed under it from the public listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Post
///
/// A post row joined with its author, category and location, and annotated with
/// the number of comments. This is the shape every listing and detail view returns.
///
/// The `category_*` fields are `None` when the post has no category (the category
/// was deleted); such a post is never publicly visible.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    // May lie in the future: the post is scheduled until then.
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    // Opaque storage key of the uploaded image.
    pub image: Option<String>,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,

    pub author_id: i64,
    pub author_username: String,

    pub category_id: Option<i64>,
    pub category_slug: Option<String>,
    pub category_title: Option<String>,
    pub category_is_published: Option<bool>,

    pub location_id: Option<i64>,
    pub location_name: Option<String>,

    pub comment_count: i64,
}

/// Comment
///
/// A comment row joined with its author's username.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub author_username: String,
    pub post_id: i64,
}

// --- Validated Inputs (Produced by the forms module) ---

/// NewUser
///
/// Mirrors an account created by the identity provider into the local `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
}

/// PostInput
///
/// Cleaned post form data. The author is always the acting user and is passed
/// separately; `is_published` keeps its current value (true for new posts).
#[derive(Debug, Clone, PartialEq)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
    pub category_id: i64,
    pub location_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryInput {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationInput {
    pub name: String,
    pub is_published: bool,
}

/// PublicationUpdate
///
/// Back-office override of a post's publication flags. `None` leaves a field as is.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default, PartialEq)]
pub struct PublicationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<DateTime<Utc>>,
}

// --- Page Contexts (Output) ---
//
// Each page is returned as the context a template would be rendered with.

#[derive(Debug, Clone, Serialize)]
pub struct IndexPage {
    pub page_obj: Page<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryPage {
    pub category: Category,
    pub page_obj: Page<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    pub profile: User,
    pub page_obj: Page<Post>,
}

/// PostDetail
///
/// A single post with its comments (oldest first) and an empty comment form.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub form: CommentForm,
}

/// PostFormPage
///
/// Context of the create/edit post page: the (pre-filled) form and the choices
/// for its category and location selects.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostFormPage {
    pub form: PostForm,
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostDeletePage {
    pub post: Post,
    pub form: PostForm,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentFormPage {
    pub comment: Comment,
    pub form: CommentForm,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileFormPage {
    pub profile: User,
    pub form: ProfileForm,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StaticPage {
    pub title: String,
    pub body: String,
}
