use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use chrono::Utc;

use crate::{
    AppState,
    auth::AuthUser,
    authorization::ensure_can_mutate,
    error::{AppError, AppResult},
    forms::{CommentForm, PostForm, ProfileForm},
    models::{
        CategoryPage, CommentFormPage, IndexPage, PostDeletePage, PostDetail, PostFormPage,
        ProfileFormPage, ProfilePage,
    },
    pagination::{PageParams, paginate_posts},
    urls, visibility,
};

// --- Listings ---

/// index
///
/// [Public Route] The paginated public listing, newest first.
#[utoipa::path(
    get,
    path = "/",
    params(PageParams),
    responses((status = 200, description = "Public posts, one page"))
)]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<IndexPage>> {
    let query = visibility::public_posts_query(None, Utc::now());

    Ok(Json(IndexPage {
        page_obj: paginate_posts(state.repo.as_ref(), query, params.number()).await?,
    }))
}

/// category_posts
///
/// [Public Route] The public listing restricted to one published category.
/// A missing or unpublished category is 404.
#[utoipa::path(
    get,
    path = "/category/{slug}/",
    params(("slug" = String, Path, description = "Category slug"), PageParams),
    responses(
        (status = 200, description = "Category posts, one page"),
        (status = 404, description = "Unknown or unpublished category")
    )
)]
pub async fn category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<CategoryPage>> {
    let repo = state.repo.as_ref();
    let category = visibility::published_category(repo, &slug).await?;
    let query = visibility::public_posts_query(Some(category.id), Utc::now());

    Ok(Json(CategoryPage {
        page_obj: paginate_posts(repo, query, params.number()).await?,
        category,
    }))
}

/// profile
///
/// [Public Route] A user's profile and posts. The owner also sees unpublished
/// and scheduled posts.
#[utoipa::path(
    get,
    path = "/profile/{username}/",
    params(("username" = String, Path, description = "Username"), PageParams),
    responses(
        (status = 200, description = "Profile with posts, one page"),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn profile(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<ProfilePage>> {
    let repo = state.repo.as_ref();
    let profile = repo
        .get_user_by_username(&username)
        .await?
        .ok_or(AppError::NotFound("profile"))?;

    let viewer_id = viewer.map(|user| user.id);
    let query = visibility::profile_posts_query(profile.id, viewer_id, Utc::now());

    Ok(Json(ProfilePage {
        page_obj: paginate_posts(repo, query, params.number()).await?,
        profile,
    }))
}

// --- Profile editing ---

/// edit_profile_form
///
/// [Authenticated Route] Users may only edit their own profile; any other
/// username is 404.
#[utoipa::path(
    get,
    path = "/profile/{username}/edit/",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Pre-filled profile form", body = ProfileFormPage),
        (status = 303, description = "Login required"),
        (status = 404, description = "Not the actor's profile")
    )
)]
pub async fn edit_profile_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileFormPage>> {
    if username != user.username {
        return Err(AppError::NotFound("profile"));
    }
    let profile = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or(AppError::NotFound("profile"))?;

    Ok(Json(ProfileFormPage {
        form: ProfileForm::from(&profile),
        profile,
    }))
}

#[utoipa::path(
    post,
    path = "/profile/{username}/edit/",
    params(("username" = String, Path, description = "Username")),
    request_body(content = ProfileForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved; redirect to the profile"),
        (status = 404, description = "Not the actor's profile"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn edit_profile(
    user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Form(form): Form<ProfileForm>,
) -> AppResult<Redirect> {
    if username != user.username {
        return Err(AppError::NotFound("profile"));
    }
    let update = form.clean()?;
    let profile = state
        .repo
        .update_profile(user.id, update)
        .await?
        .ok_or(AppError::NotFound("profile"))?;

    tracing::info!(user_id = profile.id, "Profile updated");
    Ok(Redirect::to(&urls::profile(&profile.username)))
}

// --- Posts ---

/// post_detail
///
/// [Public Route] A post with its comments, oldest first. Hidden posts are 404
/// for everyone but their author.
#[utoipa::path(
    get,
    path = "/posts/{id}/",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post detail", body = PostDetail),
        (status = 404, description = "Missing or not visible")
    )
)]
pub async fn post_detail(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<PostDetail>> {
    let repo = state.repo.as_ref();
    let viewer_id = viewer.map(|user| user.id);
    let post = visibility::get_post_for_viewer(repo, post_id, viewer_id, Utc::now()).await?;
    let comments = visibility::list_comments(repo, post.id).await?;

    Ok(Json(PostDetail {
        post,
        comments,
        form: CommentForm::default(),
    }))
}

/// create_post_form
///
/// [Authenticated Route] An empty post form with the category and location choices.
#[utoipa::path(
    get,
    path = "/posts/create/",
    responses(
        (status = 200, description = "Empty post form", body = PostFormPage),
        (status = 303, description = "Login required")
    )
)]
pub async fn create_post_form(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<PostFormPage>> {
    let categories = state.repo.list_categories().await?;
    let locations = state.repo.list_locations().await?;

    Ok(Json(PostFormPage {
        form: PostForm::default(),
        categories,
        locations,
    }))
}

/// create_post
///
/// [Authenticated Route] The actor becomes the author. Redirects to their profile.
#[utoipa::path(
    post,
    path = "/posts/create/",
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created; redirect to the author's profile"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> AppResult<Redirect> {
    let repo = state.repo.as_ref();
    let input = form.clean(repo).await?;
    let post = repo.create_post(user.id, input).await?;

    tracing::info!(post_id = post.id, author_id = user.id, "Post created");
    Ok(Redirect::to(&urls::profile(&user.username)))
}

/// edit_post_form
///
/// [Public Route] Only the author gets the form; anyone else, anonymous visitors
/// included, is sent back to the post.
#[utoipa::path(
    get,
    path = "/posts/{id}/edit/",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Pre-filled post form", body = PostFormPage),
        (status = 303, description = "Not the author; redirect to the post"),
        (status = 404, description = "Missing post")
    )
)]
pub async fn edit_post_form(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<PostFormPage>> {
    let repo = state.repo.as_ref();
    let post = repo
        .get_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    ensure_can_mutate(&post, actor.as_ref())?;

    Ok(Json(PostFormPage {
        form: PostForm::from(&post),
        categories: repo.list_categories().await?,
        locations: repo.list_locations().await?,
    }))
}

#[utoipa::path(
    post,
    path = "/posts/{id}/edit/",
    params(("id" = i64, Path, description = "Post id")),
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved, or not the author; redirect to the post"),
        (status = 404, description = "Missing post"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn edit_post(
    actor: Option<AuthUser>,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(form): Form<PostForm>,
) -> AppResult<Redirect> {
    let repo = state.repo.as_ref();
    let post = repo
        .get_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    ensure_can_mutate(&post, actor.as_ref())?;

    let input = form.clean(repo).await?;
    repo.update_post(post.id, post.author_id, input)
        .await?
        .ok_or(AppError::NotFound("post"))?;

    tracing::info!(post_id = post.id, "Post updated");
    Ok(Redirect::to(&urls::post_detail(post.id)))
}

/// delete_post_form
///
/// [Authenticated Route] The confirmation page: the post and its read-only form.
#[utoipa::path(
    get,
    path = "/posts/{id}/delete/",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Deletion confirmation", body = PostDeletePage),
        (status = 303, description = "Login required, or not the author"),
        (status = 404, description = "Missing post")
    )
)]
pub async fn delete_post_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<PostDeletePage>> {
    let post = state
        .repo
        .get_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    ensure_can_mutate(&post, Some(&user))?;

    Ok(Json(PostDeletePage {
        form: PostForm::from(&post),
        post,
    }))
}

/// delete_post
///
/// [Authenticated Route] Deletes the post and, by cascade, its comments, then
/// returns to the index.
#[utoipa::path(
    post,
    path = "/posts/{id}/delete/",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 303, description = "Deleted (redirect to the index) or not the author (redirect to the post)"),
        (status = 404, description = "Missing post")
    )
)]
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Redirect> {
    let repo = state.repo.as_ref();
    let post = repo
        .get_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    ensure_can_mutate(&post, Some(&user))?;

    if !repo.delete_post(post.id, user.id).await? {
        return Err(AppError::NotFound("post"));
    }

    tracing::info!(post_id = post.id, "Post deleted");
    Ok(Redirect::to(&urls::index()))
}

// --- Comments ---

/// add_comment
///
/// [Authenticated Route] Only posts the actor can see accept comments.
#[utoipa::path(
    post,
    path = "/posts/{id}/comment/",
    params(("id" = i64, Path, description = "Post id")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created; redirect to the post"),
        (status = 404, description = "Missing or not visible post"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn add_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Redirect> {
    let repo = state.repo.as_ref();
    let post = visibility::get_post_for_viewer(repo, post_id, Some(user.id), Utc::now()).await?;
    let text = form.clean()?;
    let comment = repo.create_comment(post.id, user.id, text).await?;

    tracing::info!(comment_id = comment.id, post_id = post.id, "Comment added");
    Ok(Redirect::to(&urls::post_detail(post.id)))
}

/// edit_comment_form
///
/// [Authenticated Route] A comment is addressed by post, id and author at once;
/// anything else is 404.
#[utoipa::path(
    get,
    path = "/posts/{id}/edit_comment/{comment_id}/",
    params(
        ("id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Pre-filled comment form", body = CommentFormPage),
        (status = 404, description = "Missing comment or not the author")
    )
)]
pub async fn edit_comment_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> AppResult<Json<CommentFormPage>> {
    let comment = visibility::get_comment_scoped(state.repo.as_ref(), comment_id, post_id, user.id).await?;
    ensure_can_mutate(&comment, Some(&user))?;

    Ok(Json(CommentFormPage {
        form: CommentForm::from(&comment),
        comment,
    }))
}

#[utoipa::path(
    post,
    path = "/posts/{id}/edit_comment/{comment_id}/",
    params(
        ("id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved; redirect to the post"),
        (status = 404, description = "Missing comment or not the author"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn edit_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> AppResult<Redirect> {
    let repo = state.repo.as_ref();
    let comment = visibility::get_comment_scoped(repo, comment_id, post_id, user.id).await?;
    ensure_can_mutate(&comment, Some(&user))?;

    let text = form.clean()?;
    repo.update_comment(comment.id, user.id, text)
        .await?
        .ok_or(AppError::NotFound("comment"))?;

    Ok(Redirect::to(&urls::post_detail(post_id)))
}

#[utoipa::path(
    post,
    path = "/posts/{id}/delete_comment/{comment_id}/",
    params(
        ("id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    responses(
        (status = 303, description = "Deleted; redirect to the post"),
        (status = 404, description = "Missing comment or not the author")
    )
)]
pub async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> AppResult<Redirect> {
    let repo = state.repo.as_ref();
    let comment = visibility::get_comment_scoped(repo, comment_id, post_id, user.id).await?;
    ensure_can_mutate(&comment, Some(&user))?;

    if !repo.delete_comment(comment.id, user.id).await? {
        return Err(AppError::NotFound("comment"));
    }

    tracing::info!(comment_id = comment.id, post_id, "Comment deleted");
    Ok(Redirect::to(&urls::post_detail(post_id)))
}
